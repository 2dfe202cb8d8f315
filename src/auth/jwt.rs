use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,       // User id
    pub exp: i64,          // Expiration time
    pub iat: i64,          // Issued at
}

pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_seconds: u64,
}

impl JwtManager {
    pub fn new(secret: &str, expiry_seconds: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_seconds,
        }
    }

    /// Access tokens are short-lived; callers refresh through the
    /// refresh-token cookie.
    pub fn generate_token(&self, user_id: Uuid) -> anyhow::Result<(String, i64)> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expiry_seconds as i64);

        let claims = Claims {
            sub: user_id.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok((token, exp.timestamp()))
    }

    pub fn verify_token(&self, token: &str) -> anyhow::Result<Uuid> {
        let token_data: TokenData<Claims> =
            decode(token, &self.decoding_key, &Validation::default())?;
        Ok(Uuid::parse_str(&token_data.claims.sub)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test_secret", 3600);
        let user_id = Uuid::new_v4();

        let (token, expires_at) = manager.generate_token(user_id).unwrap();
        assert!(expires_at > Utc::now().timestamp());
        assert_eq!(manager.verify_token(&token).unwrap(), user_id);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let manager = JwtManager::new("test_secret", 3600);
        let other = JwtManager::new("other_secret", 3600);

        let (token, _) = manager.generate_token(Uuid::new_v4()).unwrap();
        assert!(other.verify_token(&token).is_err());
    }
}
