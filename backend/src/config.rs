use std::env;

pub const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
/// Origin of the frontend dev server.
pub const DEFAULT_FRONTEND_ORIGIN: &str = "http://localhost:5173";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub frontend_origin: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            frontend_origin: DEFAULT_FRONTEND_ORIGIN.to_string(),
        }
    }
}

impl Config {
    /// Reads `DATABASE_URL`, `BIND_ADDR` and `FRONTEND_ORIGIN`, falling back to
    /// the defaults for anything unset or blank.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            database_url: read("DATABASE_URL", DEFAULT_DATABASE_URL),
            bind_addr: read("BIND_ADDR", DEFAULT_BIND_ADDR),
            frontend_origin: read("FRONTEND_ORIGIN", DEFAULT_FRONTEND_ORIGIN),
        }
    }
}
