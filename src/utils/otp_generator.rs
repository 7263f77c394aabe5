// utils/otp_generator.rs
use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

pub fn generate_otp() -> String {
    let mut rng = rand::rng();
    format!("{:06}", rng.random_range(100000..=999999))
}

/// Codes are stored as SHA-256 hex digests, never in plain text.
pub fn hash_otp(code: &str) -> String {
    hex::encode(Sha256::digest(code.trim().as_bytes()))
}

pub fn verify_otp(code: &str, expected_hash: &str) -> bool {
    let candidate = hash_otp(code);
    candidate.as_bytes().ct_eq(expected_hash.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_otp_is_six_digits() {
        for _ in 0..50 {
            let otp = generate_otp();
            assert_eq!(otp.len(), 6);
            assert!(otp.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_verify_otp() {
        let hash = hash_otp("123456");
        assert_eq!(hash.len(), 64);
        assert!(verify_otp("123456", &hash));
        assert!(verify_otp(" 123456 ", &hash));
        assert!(!verify_otp("654321", &hash));
        assert!(!verify_otp("123456", "not-a-hash"));
    }
}
