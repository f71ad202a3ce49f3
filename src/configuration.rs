use crate::auth::PasswordHasher;
use crate::error::ConfigError;

/// Longest accepted access token TTL (one day)
const MAX_ACCESS_TOKEN_TTL_SECONDS: i64 = 86_400;
/// Longest accepted refresh token lifetime (ten years)
const MAX_REFRESH_TOKEN_TTL_DAYS: i64 = 3_650;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub auth: AuthSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

impl ApplicationSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }
}

/// Session and credential settings
///
/// `jwt_secret` is the HMAC key for access tokens. It is never embedded in a
/// token and never logged, so this type deliberately has no `Debug` impl.
#[derive(serde::Deserialize, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    #[serde(default = "default_access_token_ttl")]
    pub access_token_ttl_seconds: i64, // 3600 = 1 hour
    #[serde(default = "default_refresh_token_ttl")]
    pub refresh_token_ttl_days: i64, // 60 days
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
    #[serde(default = "default_store_timeout")]
    pub store_timeout_ms: u64,
}

impl AuthSettings {
    pub fn access_token_ttl(&self) -> Result<chrono::Duration, ConfigError> {
        chrono::Duration::try_seconds(self.access_token_ttl_seconds).ok_or_else(|| {
            ConfigError::InvalidValue(format!(
                "auth.access_token_ttl_seconds {} out of range",
                self.access_token_ttl_seconds
            ))
        })
    }

    pub fn refresh_token_lifetime(&self) -> Result<chrono::Duration, ConfigError> {
        chrono::Duration::try_days(self.refresh_token_ttl_days).ok_or_else(|| {
            ConfigError::InvalidValue(format!(
                "auth.refresh_token_ttl_days {} out of range",
                self.refresh_token_ttl_days
            ))
        })
    }

    /// Hasher for new password hashes at the configured cost
    pub fn password_hasher(&self) -> PasswordHasher {
        PasswordHasher::new(self.bcrypt_cost)
    }

    /// `None` disables the per-call store deadline
    pub fn store_timeout(&self) -> Option<std::time::Duration> {
        match self.store_timeout_ms {
            0 => None,
            ms => Some(std::time::Duration::from_millis(ms)),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("auth.jwt_secret".to_string()));
        }
        if !(1..=MAX_ACCESS_TOKEN_TTL_SECONDS).contains(&self.access_token_ttl_seconds) {
            return Err(ConfigError::InvalidValue(format!(
                "auth.access_token_ttl_seconds {} outside 1..={}",
                self.access_token_ttl_seconds, MAX_ACCESS_TOKEN_TTL_SECONDS
            )));
        }
        if !(1..=MAX_REFRESH_TOKEN_TTL_DAYS).contains(&self.refresh_token_ttl_days) {
            return Err(ConfigError::InvalidValue(format!(
                "auth.refresh_token_ttl_days {} outside 1..={}",
                self.refresh_token_ttl_days, MAX_REFRESH_TOKEN_TTL_DAYS
            )));
        }
        // bcrypt accepts costs 4..=31
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(ConfigError::InvalidValue(format!(
                "auth.bcrypt_cost {} outside 4..=31",
                self.bcrypt_cost
            )));
        }
        Ok(())
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_access_token_ttl() -> i64 {
    3600
}

fn default_refresh_token_ttl() -> i64 {
    60
}

fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

fn default_store_timeout() -> u64 {
    5000
}

/// Load settings from `configuration.{yaml,toml,json}` (optional), then
/// `APP__<SECTION>__<KEY>` environment variables, e.g. `APP__AUTH__JWT_SECRET`.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(config::Environment::with_prefix("APP").separator("__"))
        .build()?;
    let settings = settings.try_deserialize::<Settings>()?;
    settings.auth.validate()?;
    Ok(settings)
}
