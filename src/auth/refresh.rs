//! Refresh token store.
//!
//! Opaque single-use tokens with a TTL, kept in-process. A successful
//! refresh rotates the token: the presented one is consumed and a new one
//! issued. Logout revokes every token a user holds.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::RngCore;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct RefreshEntry {
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}

pub struct RefreshTokenStore {
    tokens: DashMap<String, RefreshEntry>,
    ttl_seconds: u64,
}

impl RefreshTokenStore {
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            tokens: DashMap::new(),
            ttl_seconds,
        }
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    /// Issue a fresh token for a user.
    pub fn issue(&self, user_id: Uuid) -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);
        self.tokens.insert(
            token.clone(),
            RefreshEntry {
                user_id,
                expires_at: Utc::now() + Duration::seconds(self.ttl_seconds as i64),
            },
        );
        token
    }

    /// Consume a presented token and issue its replacement. Returns None
    /// for unknown or expired tokens; expired ones are dropped on the way.
    pub fn rotate(&self, token: &str) -> Option<(Uuid, String)> {
        let (_, entry) = self.tokens.remove(token)?;
        if entry.expires_at <= Utc::now() {
            return None;
        }
        let next = self.issue(entry.user_id);
        Some((entry.user_id, next))
    }

    /// Revoke every token the user holds.
    pub fn revoke_all(&self, user_id: Uuid) {
        self.tokens.retain(|_, entry| entry.user_id != user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_consumes_the_old_token() {
        let store = RefreshTokenStore::new(3600);
        let user = Uuid::new_v4();

        let token = store.issue(user);
        let (rotated_user, next) = store.rotate(&token).unwrap();
        assert_eq!(rotated_user, user);
        assert_ne!(next, token);

        // The old token is gone, the new one still works.
        assert!(store.rotate(&token).is_none());
        assert!(store.rotate(&next).is_some());
    }

    #[test]
    fn test_expired_token_rejected() {
        let store = RefreshTokenStore::new(0);
        let token = store.issue(Uuid::new_v4());
        assert!(store.rotate(&token).is_none());
    }

    #[test]
    fn test_revoke_all_clears_every_session() {
        let store = RefreshTokenStore::new(3600);
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();

        let first = store.issue(user);
        let second = store.issue(user);
        let kept = store.issue(other);

        store.revoke_all(user);
        assert!(store.rotate(&first).is_none());
        assert!(store.rotate(&second).is_none());
        assert!(store.rotate(&kept).is_some());
    }
}
