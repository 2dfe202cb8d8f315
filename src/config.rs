use serde::Deserialize;

/// Application configuration, loaded from the environment with sensible
/// development defaults. Variables carry the `PREDIX_` prefix
/// (e.g. `PREDIX_PORT`, `PREDIX_JWT_SECRET`).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub port: u16,
    pub environment: String,
    pub jwt_secret: String,
    pub access_token_ttl_secs: u64,
    pub refresh_token_ttl_secs: u64,
    pub auth_disabled: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let cfg = config::Config::builder()
            .set_default("port", 8080)?
            .set_default("environment", "development")?
            .set_default("jwt_secret", "dev-secret-change-me")?
            // Access tokens live 15 minutes, refresh tokens 7 days.
            .set_default("access_token_ttl_secs", 900)?
            .set_default("refresh_token_ttl_secs", 604_800)?
            .set_default("auth_disabled", false)?
            .add_source(config::Environment::with_prefix("PREDIX").try_parsing(true))
            .build()?;
        cfg.try_deserialize()
    }

    pub fn is_auth_disabled(&self) -> bool {
        self.auth_disabled
    }
}
