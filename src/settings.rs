//! Process settings from environment variables (a `.env` file is loaded first by the binary).

use crate::error::ConfigError;
use crate::repository::MatchMode;
use std::net::SocketAddr;

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/projectbase";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Which procedure backend `DATABASE_URL` selects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Backend {
    Postgres(String),
    Memory,
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub backend: Backend,
    pub bind_addr: SocketAddr,
    pub max_connections: u32,
    pub match_mode: MatchMode,
    pub body_limit: usize,
}

fn invalid(key: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` over an arbitrary source; unset keys take their defaults.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let url = get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into());
        let backend = if url.starts_with("memory:") {
            Backend::Memory
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Backend::Postgres(url)
        } else {
            return Err(invalid("DATABASE_URL", &url, "expected postgres:// or memory://"));
        };

        let bind = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into());
        let bind_addr = bind.parse::<SocketAddr>().map_err(|e| invalid("BIND_ADDR", &bind, e))?;

        let max_connections = match get("DB_MAX_CONNECTIONS") {
            Some(v) => match v.parse::<u32>() {
                Ok(n) if n > 0 => n,
                Ok(_) => return Err(invalid("DB_MAX_CONNECTIONS", &v, "must be at least 1")),
                Err(e) => return Err(invalid("DB_MAX_CONNECTIONS", &v, e)),
            },
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let match_mode = match get("MULTI_CONDITION_MODE") {
            Some(v) => v.parse::<MatchMode>().map_err(|e| invalid("MULTI_CONDITION_MODE", &v, e))?,
            None => MatchMode::default(),
        };

        let body_limit = match get("BODY_LIMIT_BYTES") {
            Some(v) => v.parse::<usize>().map_err(|e| invalid("BODY_LIMIT_BYTES", &v, e))?,
            None => DEFAULT_BODY_LIMIT,
        };

        Ok(Settings {
            backend,
            bind_addr,
            max_connections,
            match_mode,
            body_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.backend, Backend::Postgres(DEFAULT_DATABASE_URL.into()));
        assert_eq!(s.bind_addr.port(), 3000);
        assert_eq!(s.max_connections, 5);
        assert_eq!(s.match_mode, MatchMode::Any);
        assert_eq!(s.body_limit, DEFAULT_BODY_LIMIT);
    }

    #[test]
    fn overrides_and_rejections() {
        let s = settings(&[("DATABASE_URL", "memory://"), ("MULTI_CONDITION_MODE", "AND")]).unwrap();
        assert_eq!(s.backend, Backend::Memory);
        assert_eq!(s.match_mode, MatchMode::All);

        assert!(settings(&[("DATABASE_URL", "mysql://x")]).is_err());
        assert!(settings(&[("DB_MAX_CONNECTIONS", "0")]).is_err());
        let err = settings(&[("MULTI_CONDITION_MODE", "xor")]).unwrap_err();
        assert!(err.to_string().contains("MULTI_CONDITION_MODE"));
    }
}
