use std::env;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub max_connections: u32,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_var("APP_PORT", env::var("APP_PORT").ok(), 3000)?;
        let token_ttl_hours = parse_var("TOKEN_TTL_HOURS", env::var("TOKEN_TTL_HOURS").ok(), 24)?;
        let max_connections = parse_var(
            "DATABASE_MAX_CONNECTIONS",
            env::var("DATABASE_MAX_CONNECTIONS").ok(),
            10,
        )?;
        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            token_ttl_hours,
            max_connections,
        })
    }
}

/// Unset falls back to `default`; a value that is set but unparsable is an error.
fn parse_var<T>(name: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("{name} has an invalid value: {value:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::parse_var;

    #[test]
    fn missing_value_uses_default() {
        let port: u16 = parse_var("APP_PORT", None, 3000).unwrap();
        assert_eq!(port, 3000);
    }

    #[test]
    fn present_value_is_parsed() {
        let ttl: i64 = parse_var("TOKEN_TTL_HOURS", Some(" 48 ".into()), 24).unwrap();
        assert_eq!(ttl, 48);
    }

    #[test]
    fn garbage_value_is_an_error() {
        let err = parse_var::<u16>("APP_PORT", Some("eighty".into()), 3000).unwrap_err();
        assert!(err.to_string().contains("APP_PORT"));
    }
}
