//! Application configuration loaded from environment variables.

use std::str::FromStr;

use chrono::TimeDelta;
use domain::Category;
use fulfillment::CategoryPolicy;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `DATABASE_URL` — PostgreSQL connection string; the in-memory store is
///   used when absent
/// - `WEBHOOK_SECRET` — shared secret for webhook signature verification
/// - `CATEGORY_KEYWORDS` — `keyword=category` pairs, comma separated,
///   overriding the default product-to-tier mapping
/// - `VALIDITY_DAYS` — credential validity period (default: `365`)
/// - `SWEEP_INTERVAL_SECS` — background TTL sweep period (default: `3600`,
///   `0` disables the sweep)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub webhook_secret: String,
    pub category_keywords: Option<String>,
    pub validity_days: i64,
    pub sweep_interval_secs: u64,
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            database_url: std::env::var("DATABASE_URL").ok(),
            webhook_secret: std::env::var("WEBHOOK_SECRET").unwrap_or_default(),
            category_keywords: std::env::var("CATEGORY_KEYWORDS").ok(),
            validity_days: std::env::var("VALIDITY_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(365),
            sweep_interval_secs: std::env::var("SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the credential validity period.
    pub fn validity(&self) -> TimeDelta {
        TimeDelta::days(self.validity_days)
    }

    /// Builds the category policy from `CATEGORY_KEYWORDS`, falling back
    /// to the default mapping. Entries that do not parse are skipped with
    /// a warning.
    pub fn category_policy(&self) -> CategoryPolicy {
        let Some(ref raw) = self.category_keywords else {
            return CategoryPolicy::default();
        };

        let mut keywords = Vec::new();
        for entry in raw.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            match entry.split_once('=') {
                Some((keyword, category)) => match Category::from_str(category.trim()) {
                    Ok(category) => keywords.push((keyword.trim().to_string(), category)),
                    Err(e) => {
                        tracing::warn!(entry, error = %e, "skipping category keyword entry");
                    }
                },
                None => {
                    tracing::warn!(entry, "skipping malformed category keyword entry");
                }
            }
        }

        if keywords.is_empty() {
            CategoryPolicy::default()
        } else {
            CategoryPolicy::new(keywords, Category::Education)
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            webhook_secret: String::new(),
            category_keywords: None,
            validity_days: 365,
            sweep_interval_secs: 3600,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.validity_days, 365);
        assert_eq!(config.sweep_interval_secs, 3600);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_validity_period() {
        let config = Config {
            validity_days: 30,
            ..Config::default()
        };
        assert_eq!(config.validity(), TimeDelta::days(30));
    }

    #[test]
    fn test_category_policy_default() {
        let config = Config::default();
        assert_eq!(config.category_policy().resolve("Pro Seat"), Category::Pro);
    }

    #[test]
    fn test_category_policy_override() {
        let config = Config {
            category_keywords: Some("seat=business, trial=education".to_string()),
            ..Config::default()
        };
        let policy = config.category_policy();
        assert_eq!(policy.resolve("Team Seat"), Category::Business);
        assert_eq!(policy.resolve("Free Trial"), Category::Education);
        assert_eq!(policy.resolve("anything"), Category::Education);
    }

    #[test]
    fn test_category_policy_skips_bad_entries() {
        let config = Config {
            category_keywords: Some("seat=business,bogus,tier=platinum".to_string()),
            ..Config::default()
        };
        let policy = config.category_policy();
        assert_eq!(policy.resolve("Team Seat"), Category::Business);
    }
}
