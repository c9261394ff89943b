use std::net::IpAddr;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub token_ttl_minutes: i64,
    pub max_body_size: usize,
    pub db_max_connections: u32,
    pub login: LoginLimits,
}

/// Failed-login budget per identity.
#[derive(Debug, Clone)]
pub struct LoginLimits {
    pub max_failures: u32,
    pub window_secs: u64,
}

impl Default for LoginLimits {
    fn default() -> Self {
        Self {
            max_failures: 5,
            window_secs: 15 * 60,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let jwt_secret = env_required("JWT_SECRET")?;
        if jwt_secret.len() < 16 {
            return Err("JWT_SECRET must be at least 16 characters".to_string());
        }

        let host: IpAddr = env_or("COFFEE_SHOP_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid COFFEE_SHOP_HOST: {e}"))?;

        let port: u16 = env_parse("COFFEE_SHOP_PORT", "5000")?;
        let log_level = env_or("COFFEE_SHOP_LOG_LEVEL", "info");

        let token_ttl_minutes: i64 = env_parse("COFFEE_SHOP_TOKEN_TTL_MINUTES", "15")?;
        if token_ttl_minutes <= 0 {
            return Err("COFFEE_SHOP_TOKEN_TTL_MINUTES must be positive".to_string());
        }

        let max_body_size: usize = env_parse("COFFEE_SHOP_MAX_BODY_SIZE", "65536")?;
        let db_max_connections: u32 = env_parse("COFFEE_SHOP_DB_MAX_CONNECTIONS", "10")?;

        let login = LoginLimits {
            max_failures: env_parse("COFFEE_SHOP_LOGIN_MAX_FAILURES", "5")?,
            window_secs: env_parse("COFFEE_SHOP_LOGIN_WINDOW_SECS", "900")?,
        };

        Ok(Config {
            database_url,
            jwt_secret,
            host,
            port,
            log_level,
            token_ttl_minutes,
            max_body_size,
            db_max_connections,
            login,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(key: &str, default: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env_or(key, default)
        .parse()
        .map_err(|e| format!("Invalid {key}: {e}"))
}
