//! Runtime configuration parsed from environment variables.
//!
//! Call after `dotenvy::dotenv()` so a local `.env` can fill in values.
//! Unparseable values fall back to the default and log a warning.

use std::str::FromStr;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 168;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub session_ttl_hours: i64,
    pub cookie_secure: bool,
    pub seed_demo: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self { port: DEFAULT_PORT, session_ttl_hours: DEFAULT_SESSION_TTL_HOURS, cookie_secure: false, seed_demo: false }
    }
}

impl Config {
    /// Build config from environment variables.
    ///
    /// - `PORT`: default 3000
    /// - `SESSION_TTL_HOURS`: default 168 (one week)
    /// - `COOKIE_SECURE`: default false
    /// - `KAIZEN_SEED_DEMO`: default true
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` with an injectable lookup, so tests avoid the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let session_ttl_hours = match parse_or("SESSION_TTL_HOURS", lookup("SESSION_TTL_HOURS"), DEFAULT_SESSION_TTL_HOURS) {
            hours if hours > 0 => hours,
            hours => {
                tracing::warn!(hours, "SESSION_TTL_HOURS must be positive; using default");
                DEFAULT_SESSION_TTL_HOURS
            }
        };

        Self {
            port: parse_or("PORT", lookup("PORT"), DEFAULT_PORT),
            session_ttl_hours,
            cookie_secure: bool_or("COOKIE_SECURE", lookup("COOKIE_SECURE"), false),
            seed_demo: bool_or("KAIZEN_SEED_DEMO", lookup("KAIZEN_SEED_DEMO"), true),
        }
    }

    #[must_use]
    pub fn session_ttl(&self) -> time::Duration {
        time::Duration::hours(self.session_ttl_hours)
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    let Some(raw) = raw else {
        return default;
    };
    raw.trim().parse::<T>().unwrap_or_else(|_| {
        tracing::warn!(key, value = %raw, "unparseable config value; using default");
        default
    })
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn bool_or(key: &str, raw: Option<String>, default: bool) -> bool {
    let Some(raw) = raw else {
        return default;
    };
    parse_bool(&raw).unwrap_or_else(|| {
        tracing::warn!(key, value = %raw, "unparseable boolean config value; using default");
        default
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
