//! Keyed digests over assembled URLs.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::SignedUrlError;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 signer for fully assembled URLs.
///
/// Pure and deterministic: the same secret and URL always produce the same
/// lowercase hex digest. The secret is fixed at construction and shared
/// read-only across calls.
#[derive(Debug)]
pub struct UrlSigner {
    secret: Vec<u8>,
}

impl UrlSigner {
    /// Signing must never silently proceed with no key.
    pub fn new(secret: &str) -> Result<Self, SignedUrlError> {
        if secret.is_empty() {
            return Err(SignedUrlError::MissingSigningKey);
        }
        Ok(Self {
            secret: secret.as_bytes().to_vec(),
        })
    }

    /// Compute the hex digest over an assembled URL.
    pub fn sign(&self, url: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(url.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Recompute the digest for `url` and compare it against a supplied
    /// signature. Lengths are compared first as a cheap short-circuit; the
    /// byte-wise comparison itself is constant time.
    pub fn verify(&self, url: &str, supplied: &str) -> bool {
        let expected = self.sign(url);
        if supplied.len() != expected.len() {
            return false;
        }
        constant_time_eq(supplied.as_bytes(), expected.as_bytes())
    }
}

/// Generate a random 256-bit secret, hex encoded.
pub fn generate_secret() -> String {
    use rand::Rng;
    let secret: [u8; 32] = rand::thread_rng().gen();
    hex::encode(secret)
}

/// Expired means strictly past the expiry instant. The boundary instant
/// itself is still valid.
pub fn signature_has_expired(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now > expires_at
}

/// Comparison whose running time does not depend on where the inputs first
/// differ. Inputs of unequal length compare unequal without inspection.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    const KEY: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_sign_is_deterministic() {
        let signer = UrlSigner::new(KEY).unwrap();
        let url = "https://example.com/verify/1.0/42?email=a%40b.com";
        assert_eq!(signer.sign(url), signer.sign(url));
    }

    #[test]
    fn test_sign_produces_64_hex_chars() {
        let signer = UrlSigner::new(KEY).unwrap();
        let digest = signer.sign("https://example.com/a");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_empty_key_is_rejected() {
        match UrlSigner::new("") {
            Err(SignedUrlError::MissingSigningKey) => {}
            other => panic!("Expected MissingSigningKey, got {other:?}"),
        }
    }

    #[test]
    fn test_verify_accepts_own_digest() {
        let signer = UrlSigner::new(KEY).unwrap();
        let url = "https://example.com/a?b=1";
        let digest = signer.sign(url);
        assert!(signer.verify(url, &digest));
    }

    #[test]
    fn test_verify_rejects_any_flipped_character() {
        let signer = UrlSigner::new(KEY).unwrap();
        let url = "https://example.com/a?b=1";
        let digest = signer.sign(url);

        for position in 0..digest.len() {
            let mut tampered: Vec<char> = digest.chars().collect();
            tampered[position] = if tampered[position] == '0' { '1' } else { '0' };
            let tampered: String = tampered.into_iter().collect();
            assert!(!signer.verify(url, &tampered), "accepted flip at {position}");
        }
    }

    #[test]
    fn test_verify_rejects_wrong_length() {
        let signer = UrlSigner::new(KEY).unwrap();
        assert!(!signer.verify("https://example.com/a", "abc123"));
    }

    #[test]
    fn test_different_keys_yield_different_digests() {
        let a = UrlSigner::new(KEY).unwrap();
        let b = UrlSigner::new("another-secret-another-secret-00").unwrap();
        let url = "https://example.com/a";
        assert_ne!(a.sign(url), b.sign(url));
    }

    #[test]
    fn test_generate_secret_is_64_hex_chars() {
        let secret = generate_secret();
        assert_eq!(secret.len(), 64);
        assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_expiry_boundary_instant_is_valid() {
        let expiry = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert!(!signature_has_expired(expiry, expiry));
    }

    #[test]
    fn test_one_millisecond_past_expiry_is_expired() {
        let expiry = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert!(signature_has_expired(
            expiry,
            expiry + Duration::milliseconds(1)
        ));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
        assert!(constant_time_eq(b"", b""));
    }
}
