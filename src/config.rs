use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;

use crate::auth::capability::RoleCapabilities;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub log_dir: String,

    /// Upper bound on rows returned by any list endpoint.
    pub list_cap: u32,
    pub run_migrations: bool,

    pub role_capabilities: RoleCapabilities,
}

fn required(key: &str) -> Result<String> {
    env::var(key).map_err(|_| anyhow!("{key} must be set"))
}

fn parsed_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let role_capabilities = match env::var("ROLE_CAPABILITIES") {
            Ok(raw) => RoleCapabilities::parse(&raw)
                .map_err(|e| anyhow!("ROLE_CAPABILITIES has an invalid value: {e}"))?,
            Err(_) => RoleCapabilities::default(),
        };

        let list_cap: u32 = parsed_or("LIST_CAP", 500)?;
        if list_cap == 0 {
            return Err(anyhow!("LIST_CAP must be at least 1"));
        }

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parsed_or("ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: parsed_or("REFRESH_TOKEN_TTL", 604_800)?, // 7 days

            rate_login_per_min: parsed_or("RATE_LOGIN_PER_MIN", 60)?,
            rate_register_per_min: parsed_or("RATE_REGISTER_PER_MIN", 30)?,
            rate_refresh_per_min: parsed_or("RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: parsed_or("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            list_cap,
            run_migrations: parsed_or("RUN_MIGRATIONS", false)?,
            role_capabilities,
        })
    }

    /// Clamp a requested page size to `1..=list_cap`.
    pub fn page_size(&self, requested: Option<u32>) -> u32 {
        requested.unwrap_or(self.list_cap).clamp(1, self.list_cap)
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            database_url: "mysql://localhost/hrm_test".into(),
            jwt_secret: "test-secret".into(),
            server_addr: "127.0.0.1:0".into(),
            access_token_ttl: 900,
            refresh_token_ttl: 3600,
            rate_login_per_min: 60,
            rate_register_per_min: 30,
            rate_refresh_per_min: 30,
            rate_protected_per_min: 1000,
            api_prefix: "/api".into(),
            log_dir: "logs".into(),
            list_cap: 500,
            run_migrations: false,
            role_capabilities: RoleCapabilities::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_capped() {
        let config = Config::for_tests();
        assert_eq!(config.page_size(None), 500);
        assert_eq!(config.page_size(Some(0)), 1);
        assert_eq!(config.page_size(Some(20)), 20);
        assert_eq!(config.page_size(Some(10_000)), 500);
    }
}
