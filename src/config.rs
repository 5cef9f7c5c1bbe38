use config::ConfigError;
use std::str::FromStr;

use crate::lease::guard::DEFAULT_DUPLICATE_WINDOW_SECS;
use crate::reconcile::aggregator::DEFAULT_PAGE_SIZE;

#[derive(Debug, Clone, PartialEq)]
pub struct RegionConfig {
    pub id: String,
    /// `None` leaves the region registered but unconfigured
    pub database_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub regions: Vec<RegionConfig>,
    pub lease_database_url: Option<String>,
    pub duplicate_window_secs: i64,
    pub submission_page_size: i64,
    pub region_timeout_secs: u64,
    pub parallel_regions: bool,
    /// 0 disables the scheduled reconciliation job
    pub reconcile_interval_secs: u64,
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let region_ids = list(lookup("REGIONS").as_deref().unwrap_or("korea,japan,us"));
        if region_ids.is_empty() {
            return Err(ConfigError::Message("REGIONS must name at least one region".to_string()));
        }

        let regions = region_ids
            .into_iter()
            .map(|id| {
                let key = format!("REGION_{}_DATABASE_URL", id.to_uppercase());
                RegionConfig {
                    database_url: lookup(&key).filter(|url| !url.trim().is_empty()),
                    id: id.to_lowercase(),
                }
            })
            .collect();

        let config = Self {
            bind_address: lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            regions,
            lease_database_url: lookup("LEASE_DATABASE_URL").filter(|url| !url.trim().is_empty()),
            duplicate_window_secs: parse(&lookup, "DUPLICATE_WINDOW_SECS", DEFAULT_DUPLICATE_WINDOW_SECS)?,
            submission_page_size: parse(&lookup, "SUBMISSION_PAGE_SIZE", DEFAULT_PAGE_SIZE)?,
            region_timeout_secs: parse(&lookup, "REGION_TIMEOUT_SECS", 20)?,
            parallel_regions: parse(&lookup, "PARALLEL_REGIONS", false)?,
            reconcile_interval_secs: parse(&lookup, "RECONCILE_INTERVAL_SECS", 0)?,
            cors_allowed_origins: list(
                lookup("CORS_ALLOWED_ORIGINS")
                    .as_deref()
                    .unwrap_or("http://localhost:3000"),
            ),
        };

        if config.duplicate_window_secs < 0 {
            return Err(ConfigError::Message("DUPLICATE_WINDOW_SECS must not be negative".to_string()));
        }
        if config.submission_page_size < 1 {
            return Err(ConfigError::Message("SUBMISSION_PAGE_SIZE must be at least 1".to_string()));
        }
        if config.region_timeout_secs == 0 {
            return Err(ConfigError::Message("REGION_TIMEOUT_SECS must be at least 1".to_string()));
        }

        Ok(config)
    }
}

fn parse<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::Message(format!("{} is invalid ({:?}): {}", key, raw, e))),
        _ => Ok(default),
    }
}

fn list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:8080");
        let ids: Vec<&str> = config.regions.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["korea", "japan", "us"]);
        assert!(config.regions.iter().all(|r| r.database_url.is_none()));
        assert_eq!(config.duplicate_window_secs, 300);
        assert_eq!(config.submission_page_size, 500);
        assert_eq!(config.region_timeout_secs, 20);
        assert!(!config.parallel_regions);
        assert_eq!(config.reconcile_interval_secs, 0);
        assert_eq!(config.cors_allowed_origins, vec!["http://localhost:3000".to_string()]);
    }

    #[test]
    fn test_region_urls_and_overrides() {
        let config = config_from(&[
            ("REGIONS", "Korea, us"),
            ("REGION_KOREA_DATABASE_URL", "postgres://korea/db"),
            ("DUPLICATE_WINDOW_SECS", "60"),
            ("PARALLEL_REGIONS", "true"),
            ("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example"),
        ])
        .unwrap();

        assert_eq!(
            config.regions,
            vec![
                RegionConfig {
                    id: "korea".into(),
                    database_url: Some("postgres://korea/db".into()),
                },
                RegionConfig {
                    id: "us".into(),
                    database_url: None,
                },
            ]
        );
        assert_eq!(config.duplicate_window_secs, 60);
        assert!(config.parallel_regions);
        assert_eq!(config.cors_allowed_origins.len(), 2);
    }

    #[test]
    fn test_malformed_values_fail_startup() {
        assert!(config_from(&[("SUBMISSION_PAGE_SIZE", "lots")]).is_err());
        assert!(config_from(&[("PARALLEL_REGIONS", "yes")]).is_err());
        assert!(config_from(&[("SUBMISSION_PAGE_SIZE", "0")]).is_err());
        assert!(config_from(&[("DUPLICATE_WINDOW_SECS", "-1")]).is_err());
        assert!(config_from(&[("REGIONS", " , ")]).is_err());
    }
}
