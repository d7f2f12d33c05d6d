//! Opaque session tokens
//!
//! Tokens are random bytes in unpadded URL-safe base64, so they survive cookie
//! encoding unchanged. Only their SHA-256 digest is stored.

use base64::{
    Engine as _,
    engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::error::AppError;

/// Random bytes per issued token
pub const TOKEN_BYTES: usize = 32;

/// Generate an opaque token from `byte_len` random bytes
///
/// # Errors
/// Returns `AppError::Entropy` if the OS random source fails
pub fn generate_token(byte_len: usize) -> Result<String, AppError> {
    let mut bytes = vec![0_u8; byte_len];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Deterministic storage key for a token
pub fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    URL_SAFE.encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_url_safe_and_unique() {
        let first = generate_token(TOKEN_BYTES).unwrap();
        let second = generate_token(TOKEN_BYTES).unwrap();

        assert_ne!(first, second);
        // 32 bytes -> 43 base64 characters without padding
        assert_eq!(first.len(), 43);
        assert!(
            first
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        );
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash_token("abc"), hash_token("abc"));
        assert_ne!(hash_token("abc"), hash_token("abd"));
    }

    #[test]
    fn hash_matches_known_sha256() {
        // sha256("") = e3b0c442...b855
        assert_eq!(
            hash_token(""),
            "47DEQpj8HBSa-_TImW-5JCeuQeRkm5NMpJWZG3hSuFU="
        );
    }
}
