pub mod jwt;
pub mod middleware;
pub mod refresh;

use rand::RngCore;
use sha3::{Digest, Sha3_256};

/// Generate a random per-user salt, hex-encoded.
pub fn generate_salt() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Salted SHA3-256 password digest, hex-encoded.
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha3_256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    hash_password(password, salt) == expected_hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_roundtrip() {
        let salt = generate_salt();
        let hash = hash_password("hunter22hunter22", &salt);
        assert!(verify_password("hunter22hunter22", &salt, &hash));
        assert!(!verify_password("hunter22hunter23", &salt, &hash));
    }

    #[test]
    fn test_salt_changes_digest() {
        let first = hash_password("same-password", &generate_salt());
        let second = hash_password("same-password", &generate_salt());
        assert_ne!(first, second);
    }
}
