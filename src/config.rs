use std::{env, fmt::Display, str::FromStr};

/// Runtime settings read from the environment (and `.env`, if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub jwt_secret: String,
    pub jwt_refresh_secret: String,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
    pub max_payload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            log::warn!("JWT_SECRET not set, using default (not secure for production!)");
            "default_jwt_secret_change_me".to_string()
        });
        let jwt_refresh_secret =
            env::var("JWT_REFRESH_SECRET").unwrap_or_else(|_| format!("{}-refresh", jwt_secret));

        Self {
            port: try_load("PORT", 5000),
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "savory.db".to_string()),
            jwt_secret,
            jwt_refresh_secret,
            access_token_ttl_minutes: try_load("ACCESS_TOKEN_TTL_MINUTES", 30),
            refresh_token_ttl_days: try_load("REFRESH_TOKEN_TTL_DAYS", 30),
            max_payload_bytes: try_load("MAX_PAYLOAD_BYTES", 30 * 1024 * 1024),
        }
    }
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => parse_or(key, &raw, default),
        Err(_) => {
            log::debug!("{key} not set, using default: {default}");
            default
        }
    }
}

fn parse_or<T>(key: &str, raw: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    raw.trim().parse().unwrap_or_else(|e| {
        log::warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
        default
    })
}
