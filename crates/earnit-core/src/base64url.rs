//! URL-safe base64 helpers for token segments.
//!
//! Segments are normalised to the standard alphabet and padded before
//! decoding. With the `base64` feature (default) the `base64` crate does the
//! decoding; without it [`decode_lenient`] is used.

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
const INVALID: u8 = 0xFF;
const DECODE_TABLE: [u8; 256] = build_table();

const fn build_table() -> [u8; 256] {
    let mut table = [INVALID; 256];
    let mut i = 0;
    while i < ALPHABET.len() {
        table[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
}

/// Translate `-`/`_` back to `+`/`/` and right-pad with `=` to a multiple of four.
pub fn normalize(segment: &str) -> String {
    let mut out: String = segment
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    while out.len() % 4 != 0 {
        out.push('=');
    }
    out
}

/// Table-driven standard base64 decoder. Trailing `=` is dropped, characters
/// outside the alphabet are skipped and leftover bits are discarded, so it
/// never fails; garbage input simply yields garbage bytes.
pub fn decode_lenient(input: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() * 3 / 4);
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;

    for byte in input.trim_end_matches('=').bytes() {
        let sextet = DECODE_TABLE[byte as usize];
        if sextet == INVALID {
            continue;
        }
        buffer = (buffer << 6) | u32::from(sextet);
        bits += 6;
        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
            buffer &= (1 << bits) - 1;
        }
    }
    out
}

/// Decode a URL-safe, possibly unpadded, base64 segment.
pub fn decode_segment(segment: &str) -> Result<Vec<u8>, String> {
    let normalized = normalize(segment);
    decode_standard(&normalized)
}

#[cfg(feature = "base64")]
fn decode_standard(input: &str) -> Result<Vec<u8>, String> {
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    STANDARD.decode(input).map_err(|e| e.to_string())
}

#[cfg(not(feature = "base64"))]
fn decode_standard(input: &str) -> Result<Vec<u8>, String> {
    Ok(decode_lenient(input))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_translates_alphabet_and_pads() {
        assert_eq!(normalize("aGk_Pg"), "aGk/Pg==");
        assert_eq!(normalize("TWFu"), "TWFu");
        assert_eq!(normalize("TWE"), "TWE=");
        assert_eq!(normalize("a-b"), "a+b=");
    }

    #[test]
    fn lenient_decoder_handles_padding_and_full_blocks() {
        assert_eq!(decode_lenient("TWFu"), b"Man");
        assert_eq!(decode_lenient("TWE="), b"Ma");
        assert_eq!(decode_lenient("aGk/Pg=="), b"hi?>");
    }

    #[test]
    fn lenient_decoder_skips_unknown_characters() {
        assert_eq!(decode_lenient("TW\nFu"), b"Man");
        assert_eq!(decode_lenient("a==="), Vec::<u8>::new());
        assert_eq!(decode_lenient(""), Vec::<u8>::new());
    }

    #[test]
    fn segment_decoding_accepts_url_safe_input() {
        assert_eq!(decode_segment("aGk_Pg").expect("decode"), b"hi?>");
        assert_eq!(
            decode_segment("eyJyb2xlIjoicGFyZW50IiwidXNlcl9pZCI6NDJ9").expect("decode"),
            br#"{"role":"parent","user_id":42}"#
        );
    }

    #[cfg(feature = "base64")]
    #[test]
    fn crate_decoder_rejects_impossible_lengths() {
        assert!(decode_segment("a").is_err());
        assert!(decode_segment("ab!d").is_err());
    }
}
