//! # Card Access Tokens
//!
//! A token is the SHA-256 digest of fresh OS randomness, hex encoded.

use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Bytes of randomness hashed into a card token.
pub const TOKEN_ENTROPY_BYTES: usize = 32;

/// Length of an encoded token in characters.
pub const TOKEN_LEN: usize = 64;

/// The OS random source failed.
#[derive(Debug, Error)]
#[error("can not generate rand bytes: {0}")]
pub struct TokenError(#[from] rand::Error);

/// Generates a token from `size` random bytes.
///
/// The result is always [`TOKEN_LEN`] lowercase hex characters,
/// independent of `size`.
///
/// # Errors
///
/// Returns [`TokenError`] if the OS random source is unavailable.
///
/// ```
/// use paystore::domain::value_objects::token::{generate_token, TOKEN_LEN};
///
/// let token = generate_token(32).unwrap();
/// assert_eq!(token.len(), TOKEN_LEN);
/// ```
pub fn generate_token(size: usize) -> Result<String, TokenError> {
    let mut bytes = vec![0u8; size];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn tokens_differ() {
        let a = generate_token(TOKEN_ENTROPY_BYTES).unwrap();
        let b = generate_token(TOKEN_ENTROPY_BYTES).unwrap();
        assert_ne!(a, b);
    }

    proptest! {
        #[test]
        fn token_is_lowercase_hex(size in 0usize..256) {
            let token = generate_token(size).unwrap();
            prop_assert_eq!(token.len(), TOKEN_LEN);
            prop_assert!(token.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
        }
    }
}
