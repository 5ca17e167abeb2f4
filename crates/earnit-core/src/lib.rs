//! Core abstractions for EarnIt: key/value backend contracts, the dual-backend
//! secure value store, session types and JWT payload decoding.
//! Concrete OS-backed storage lives in `earnit-storage`.

pub mod base64url;
pub mod jwt;
pub mod session;
pub mod storage;
