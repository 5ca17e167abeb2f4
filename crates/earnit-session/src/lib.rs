use anyhow::{bail, Context, Result};
use earnit_core::{
    jwt::{decode_jwt_payload, JwtPayload},
    session::{Role, Session, SessionState},
    storage::SecureValueStore,
};
use tracing::{debug, info, instrument};

pub const TOKEN_KEY: &str = "token";
pub const ROLE_KEY: &str = "role";

/// Owner of the persisted token/role pair, backed by a `SecureValueStore`.
///
/// There is no locking: two concurrent `store_session` calls race and the last
/// write wins per key.
#[derive(Clone)]
pub struct SessionManager {
    store: SecureValueStore,
}

impl SessionManager {
    pub fn new(store: SecureValueStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &SecureValueStore {
        &self.store
    }

    /// Persist a token, and the role only when one is given. Omitting the role,
    /// or passing an empty one, keeps whatever role was stored before.
    #[instrument(skip_all, fields(role = ?role))]
    pub async fn store_session(&self, token: &str, role: Option<&Role>) -> Result<()> {
        self.write(TOKEN_KEY, token).await?;
        if let Some(role) = role.filter(|r| !r.as_str().is_empty()) {
            self.write(ROLE_KEY, role.as_str()).await?;
        }
        info!("session stored");
        Ok(())
    }

    #[instrument(skip_all, fields(role = %role))]
    pub async fn store_role(&self, role: &Role) -> Result<()> {
        if role.as_str().is_empty() {
            bail!("role must not be empty");
        }
        self.write(ROLE_KEY, role.as_str()).await
    }

    /// Persist an ad hoc value (e.g. `parentCode`) in the same store.
    #[instrument(skip_all, fields(key = %key))]
    pub async fn store_value(&self, key: &str, value: &str) -> Result<()> {
        self.write(key, value).await
    }

    pub async fn value(&self, key: &str) -> Option<String> {
        self.store.read(key).await
    }

    /// Read token and role concurrently.
    #[instrument(skip_all)]
    pub async fn get_session(&self) -> Session {
        let (token, role) = tokio::join!(self.store.read(TOKEN_KEY), self.store.read(ROLE_KEY));
        Session {
            token,
            role: role.map(Role::from),
        }
    }

    /// Delete token and role from every backend. Best effort, never fails.
    #[instrument(skip_all)]
    pub async fn clear_session(&self) {
        tokio::join!(self.store.delete(TOKEN_KEY), self.store.delete(ROLE_KEY));
        info!("session cleared");
    }

    pub async fn state(&self) -> SessionState {
        self.get_session().await.state()
    }

    /// Decoded (unverified) claims of the stored token.
    pub async fn claims(&self) -> Option<JwtPayload> {
        let token = self.store.read(TOKEN_KEY).await;
        decode_jwt_payload(token.as_deref())
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        let placement = self
            .store
            .write(key, value)
            .await
            .with_context(|| format!("storing {key}"))?;
        debug!(key, ?placement, "value written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use earnit_core::{
        session::Landing,
        storage::{AvailabilityCache, MemoryBackend},
    };

    use super::*;

    fn manager(primary: &MemoryBackend, fallback: &MemoryBackend) -> SessionManager {
        SessionManager::new(SecureValueStore::with_cache(
            primary.clone(),
            fallback.clone(),
            Arc::new(AvailabilityCache::new()),
        ))
    }

    #[tokio::test]
    async fn stores_and_reads_session() {
        let primary = MemoryBackend::new();
        let fallback = MemoryBackend::new();
        let sessions = manager(&primary, &fallback);

        sessions
            .store_session("abc.def.ghi", Some(&Role::Child))
            .await
            .expect("store");

        let session = sessions.get_session().await;
        assert_eq!(session.token.as_deref(), Some("abc.def.ghi"));
        assert_eq!(session.role, Some(Role::Child));
        assert_eq!(primary.peek(TOKEN_KEY).as_deref(), Some("abc.def.ghi"));
        assert_eq!(primary.peek(ROLE_KEY).as_deref(), Some("child"));
        assert_eq!(fallback.stats().writes, 0);
    }

    #[tokio::test]
    async fn omitting_role_keeps_previous_role() {
        let primary = MemoryBackend::new();
        let fallback = MemoryBackend::new();
        let sessions = manager(&primary, &fallback);

        sessions
            .store_session("token-2", Some(&Role::Parent))
            .await
            .expect("store");
        sessions.store_session("token-1", None).await.expect("store");

        let session = sessions.get_session().await;
        assert_eq!(session.token.as_deref(), Some("token-1"));
        assert_eq!(session.role, Some(Role::Parent));
    }

    #[tokio::test]
    async fn empty_role_keeps_previous_role() {
        let primary = MemoryBackend::new();
        let fallback = MemoryBackend::new();
        let sessions = manager(&primary, &fallback);

        sessions
            .store_session("token-2", Some(&Role::Parent))
            .await
            .expect("store");
        sessions
            .store_session("token-1", Some(&Role::from("")))
            .await
            .expect("store");

        let session = sessions.get_session().await;
        assert_eq!(session.token.as_deref(), Some("token-1"));
        assert_eq!(session.role, Some(Role::Parent));
        assert_eq!(primary.peek(ROLE_KEY).as_deref(), Some("parent"));
    }

    #[tokio::test]
    async fn store_role_rejects_empty_role() {
        let primary = MemoryBackend::new();
        let fallback = MemoryBackend::new();
        let sessions = manager(&primary, &fallback);
        sessions.store_role(&Role::Child).await.expect("store role");

        let err = sessions
            .store_role(&Role::from(""))
            .await
            .expect_err("empty role should be rejected");
        assert!(err.to_string().contains("empty"));
        assert_eq!(sessions.get_session().await.role, Some(Role::Child));
    }

    #[tokio::test]
    async fn migrates_legacy_values_when_primary_is_empty() {
        let primary = MemoryBackend::new();
        let fallback = MemoryBackend::new();
        fallback.seed(TOKEN_KEY, "legacy-token");
        fallback.seed(ROLE_KEY, "legacy-role");
        let sessions = manager(&primary, &fallback);

        let session = sessions.get_session().await;
        assert_eq!(
            session,
            Session {
                token: Some("legacy-token".into()),
                role: Some(Role::Other("legacy-role".into())),
            }
        );
        assert_eq!(primary.peek(TOKEN_KEY).as_deref(), Some("legacy-token"));
        assert_eq!(primary.peek(ROLE_KEY).as_deref(), Some("legacy-role"));
        assert_eq!(fallback.peek(TOKEN_KEY), None);
        assert_eq!(fallback.peek(ROLE_KEY), None);
    }

    #[tokio::test]
    async fn clear_session_wipes_both_backends() {
        let primary = MemoryBackend::new();
        let fallback = MemoryBackend::new();
        primary.seed(TOKEN_KEY, "fresh");
        primary.seed(ROLE_KEY, "parent");
        fallback.seed(TOKEN_KEY, "stale");
        fallback.seed(ROLE_KEY, "child");
        let sessions = manager(&primary, &fallback);

        sessions.clear_session().await;

        assert_eq!(sessions.get_session().await, Session::anonymous());
        assert_eq!(sessions.state().await, SessionState::Anonymous);
        assert_eq!(fallback.peek(TOKEN_KEY), None);
        assert_eq!(fallback.peek(ROLE_KEY), None);
    }

    #[tokio::test]
    async fn clear_session_works_without_secure_backend() {
        let primary = MemoryBackend::unavailable();
        let fallback = MemoryBackend::new();
        let sessions = manager(&primary, &fallback);

        sessions
            .store_session("abc.def.ghi", Some(&Role::Parent))
            .await
            .expect("store");
        assert_eq!(sessions.get_session().await.landing(), Landing::Parent);

        sessions.clear_session().await;
        assert_eq!(sessions.get_session().await, Session::anonymous());
    }

    #[tokio::test]
    async fn store_value_and_role_use_same_store() {
        let primary = MemoryBackend::new();
        let fallback = MemoryBackend::new();
        let sessions = manager(&primary, &fallback);

        sessions
            .store_value("parentCode", "ABC123")
            .await
            .expect("store value");
        sessions.store_role(&Role::Parent).await.expect("store role");

        assert_eq!(sessions.value("parentCode").await.as_deref(), Some("ABC123"));
        assert_eq!(sessions.get_session().await.role, Some(Role::Parent));
        assert_eq!(sessions.state().await, SessionState::Anonymous);
    }

    #[tokio::test]
    async fn store_fails_only_when_every_backend_fails() {
        let primary = MemoryBackend::new();
        let fallback = MemoryBackend::new();
        primary.set_fail_writes(true);
        fallback.set_fail_writes(true);
        let sessions = manager(&primary, &fallback);

        let err = sessions
            .store_session("t", None)
            .await
            .expect_err("store should fail");
        assert!(err.to_string().contains("storing token"));
    }

    #[tokio::test]
    async fn claims_decode_stored_token() {
        let primary = MemoryBackend::new();
        let fallback = MemoryBackend::new();
        let sessions = manager(&primary, &fallback);

        assert!(sessions.claims().await.is_none());

        sessions
            .store_session(
                "eyJhbGciOiJIUzI1NiJ9.eyJyb2xlIjoicGFyZW50IiwidXNlcl9pZCI6NDJ9.sig",
                None,
            )
            .await
            .expect("store");
        let claims = sessions.claims().await.expect("claims");
        assert_eq!(claims.role(), Some(Role::Parent));
        assert_eq!(claims.user_id(), Some(42));
    }
}
