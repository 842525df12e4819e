//! PKCE (Proof Key for Code Exchange) primitives
//!
//! Implements the RFC 7636 `S256` method for public clients that cannot hold
//! a client secret. The verifier uses the full 128 characters the RFC allows,
//! drawn from the unreserved URI character set.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use portcullis_domain::constants::{
    CODE_CHALLENGE_METHOD, PKCE_UNRESERVED_CHARSET, PKCE_VERIFIER_LENGTH, STATE_BYTES,
};
use portcullis_domain::{AuthError, AuthResult};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Largest multiple of the charset length that fits in a byte. Bytes at or
/// above it are rejected so every character is equally likely.
const REJECTION_THRESHOLD: usize = 256 - (256 % PKCE_UNRESERVED_CHARSET.len());

/// Verifier and challenge for one authorization attempt
///
/// The verifier stays in tab-scoped storage until the code is exchanged;
/// only the challenge leaves the client before that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengePair {
    pub verifier: String,
    pub challenge: String,
}

impl ChallengePair {
    /// Always `S256`; the `plain` method is never offered.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        CODE_CHALLENGE_METHOD
    }
}

/// Generate a fresh verifier and its `S256` challenge
///
/// # Errors
/// Returns [`AuthError::Randomness`] if the operating system RNG fails.
pub fn generate_challenge_pair() -> AuthResult<ChallengePair> {
    let verifier = generate_code_verifier()?;
    let challenge = generate_code_challenge(&verifier);
    Ok(ChallengePair { verifier, challenge })
}

/// Generate a 128 character code verifier
///
/// # Errors
/// Returns [`AuthError::Randomness`] if the operating system RNG fails.
pub fn generate_code_verifier() -> AuthResult<String> {
    let mut verifier = String::with_capacity(PKCE_VERIFIER_LENGTH);
    let mut buf = [0u8; PKCE_VERIFIER_LENGTH];

    while verifier.len() < PKCE_VERIFIER_LENGTH {
        fill_random(&mut buf)?;
        for byte in buf {
            let idx = usize::from(byte);
            if idx >= REJECTION_THRESHOLD {
                continue;
            }
            verifier.push(char::from(PKCE_UNRESERVED_CHARSET[idx % PKCE_UNRESERVED_CHARSET.len()]));
            if verifier.len() == PKCE_VERIFIER_LENGTH {
                break;
            }
        }
    }

    Ok(verifier)
}

/// `BASE64URL-NOPAD(SHA256(ASCII(verifier)))`
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// Generate an anti-forgery `state` value (16 random bytes, hex encoded)
///
/// # Errors
/// Returns [`AuthError::Randomness`] if the operating system RNG fails.
pub fn generate_state() -> AuthResult<String> {
    let mut bytes = [0u8; STATE_BYTES];
    fill_random(&mut bytes)?;
    Ok(hex::encode(bytes))
}

/// Compare the `state` returned on the callback with the one that was sent
///
/// Runs in time independent of where the values differ.
#[must_use]
pub fn validate_state(expected: &str, actual: &str) -> bool {
    if expected.is_empty() || expected.len() != actual.len() {
        return false;
    }
    expected.bytes().zip(actual.bytes()).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

fn fill_random(buf: &mut [u8]) -> AuthResult<()> {
    OsRng.try_fill_bytes(buf).map_err(|e| AuthError::Randomness(e.to_string()))
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::pkce.
    use std::collections::HashSet;

    use super::*;

    /// Validates `generate_code_verifier` for the length and charset scenario.
    ///
    /// Assertions:
    /// - Verifier is exactly 128 characters.
    /// - Every character belongs to the unreserved set.
    #[test]
    fn test_verifier_length_and_charset() {
        for _ in 0..20 {
            let verifier = generate_code_verifier().unwrap();
            assert_eq!(verifier.len(), 128);
            assert!(verifier.bytes().all(|b| PKCE_UNRESERVED_CHARSET.contains(&b)), "{verifier}");
        }
    }

    /// Validates `generate_code_challenge` against the RFC 7636 appendix B
    /// vector.
    #[test]
    fn test_challenge_matches_rfc_vector() {
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert_eq!(generate_code_challenge(verifier), "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    /// Validates `generate_challenge_pair` for the derived challenge scenario.
    ///
    /// Assertions:
    /// - Challenge is 43 characters with no padding.
    /// - Challenge recomputes from the verifier.
    /// - Method is `S256`.
    #[test]
    fn test_pair_is_consistent() {
        let pair = generate_challenge_pair().unwrap();
        assert_eq!(pair.challenge.len(), 43);
        assert!(!pair.challenge.contains('='));
        assert!(!pair.challenge.contains('+') && !pair.challenge.contains('/'));
        assert_eq!(pair.challenge, generate_code_challenge(&pair.verifier));
        assert_eq!(pair.method(), "S256");
    }

    #[test]
    fn test_unique_values() {
        let verifiers: HashSet<String> =
            (0..50).map(|_| generate_code_verifier().unwrap()).collect();
        assert_eq!(verifiers.len(), 50);

        let a = generate_state().unwrap();
        let b = generate_state().unwrap();
        assert_ne!(a, b);
    }

    /// Validates `generate_state` for the hex encoding scenario.
    #[test]
    fn test_state_is_32_hex_chars() {
        let state = generate_state().unwrap();
        assert_eq!(state.len(), 32);
        assert!(state.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_validate_state() {
        assert!(validate_state("abc123", "abc123"));
        assert!(!validate_state("abc123", "abc124"));
        assert!(!validate_state("abc123", ""));
        assert!(!validate_state("", ""));
    }
}
