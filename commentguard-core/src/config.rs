use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::policy::Denylist;
use crate::types::AccessToken;

pub const DEFAULT_GRAPH_API_BASE: &str = "https://graph.facebook.com";
pub const DEFAULT_LOOKBACK_MINUTES: u32 = 1;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_CONCURRENT_POSTS: usize = 4;

/// Environment variable naming a TOML config file. When set it replaces the
/// individual variables below.
pub const CONFIG_PATH_VAR: &str = "COMMENTGUARD_CONFIG";

const ACCESS_TOKEN_VAR: &str = "ACCESS_TOKEN";
const PAGE_VAR: &str = "PAGE";
const LOOKBACK_VAR: &str = "COMMENTS_SINCE_MIN";
const POST_LIMIT_VAR: &str = "POST_LIMIT";
const DENYLIST_VAR: &str = "OFFENSIVE_WORD";
const GRAPH_API_BASE_VAR: &str = "GRAPH_API_BASE";
const REQUEST_TIMEOUT_VAR: &str = "REQUEST_TIMEOUT_SECS";
const MAX_CONCURRENT_POSTS_VAR: &str = "MAX_CONCURRENT_POSTS";

/// Process-wide moderation settings. Read-only once loaded.
#[derive(Debug, Clone)]
pub struct ModerationConfig {
    pub account_token: AccessToken,
    /// `None` moderates every page the account manages.
    pub page_name: Option<String>,
    pub lookback_minutes: u32,
    /// `None` uses the API's default page size.
    pub post_limit: Option<u32>,
    pub denylist: Denylist,
    pub graph_api_base: String,
    pub request_timeout_secs: u64,
    pub max_concurrent_posts: usize,
}

#[derive(Debug, Deserialize)]
struct FileConfig {
    account_token: Option<AccessToken>,
    page_name: Option<String>,
    lookback_minutes: Option<i64>,
    post_limit: Option<i64>,
    #[serde(default)]
    denylist: Denylist,
    graph_api_base: Option<String>,
    request_timeout_secs: Option<i64>,
    max_concurrent_posts: Option<i64>,
}

impl ModerationConfig {
    /// Loads `.env` if present, then reads either the TOML file named by
    /// `COMMENTGUARD_CONFIG` or the individual environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::from_toml_file(path.trim()),
            _ => Self::from_env(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source using the environment
    /// variable names.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let account_token = get(ACCESS_TOKEN_VAR)
            .map(AccessToken::new)
            .ok_or_else(|| ConfigError::MissingField {
                field: ACCESS_TOKEN_VAR.to_string(),
            })?;

        let config = Self {
            account_token,
            // Matched exactly against page names, so surrounding spaces are kept.
            page_name: lookup(PAGE_VAR).filter(|name| !name.trim().is_empty()),
            lookback_minutes: match get(LOOKBACK_VAR) {
                Some(raw) => positive_u32(LOOKBACK_VAR, parse_int(LOOKBACK_VAR, &raw)?)?,
                None => DEFAULT_LOOKBACK_MINUTES,
            },
            post_limit: match get(POST_LIMIT_VAR) {
                Some(raw) => post_limit(parse_int(POST_LIMIT_VAR, &raw)?),
                None => None,
            },
            denylist: get(DENYLIST_VAR)
                .map(|raw| Denylist::parse(&raw))
                .unwrap_or_default(),
            graph_api_base: get(GRAPH_API_BASE_VAR)
                .unwrap_or_else(|| DEFAULT_GRAPH_API_BASE.to_string()),
            request_timeout_secs: match get(REQUEST_TIMEOUT_VAR) {
                Some(raw) => u64::from(positive_u32(
                    REQUEST_TIMEOUT_VAR,
                    parse_int(REQUEST_TIMEOUT_VAR, &raw)?,
                )?),
                None => DEFAULT_REQUEST_TIMEOUT_SECS,
            },
            max_concurrent_posts: match get(MAX_CONCURRENT_POSTS_VAR) {
                Some(raw) => positive_u32(
                    MAX_CONCURRENT_POSTS_VAR,
                    parse_int(MAX_CONCURRENT_POSTS_VAR, &raw)?,
                )? as usize,
                None => DEFAULT_MAX_CONCURRENT_POSTS,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        debug!("Loading configuration from {}", path.display());
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(raw)?;

        let account_token = file
            .account_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ConfigError::MissingField {
                field: "account_token".to_string(),
            })?;

        let config = Self {
            account_token,
            page_name: file.page_name.filter(|name| !name.trim().is_empty()),
            lookback_minutes: match file.lookback_minutes {
                Some(value) => positive_u32("lookback_minutes", value)?,
                None => DEFAULT_LOOKBACK_MINUTES,
            },
            post_limit: file.post_limit.and_then(post_limit),
            denylist: file.denylist,
            graph_api_base: file
                .graph_api_base
                .unwrap_or_else(|| DEFAULT_GRAPH_API_BASE.to_string()),
            request_timeout_secs: match file.request_timeout_secs {
                Some(value) => u64::from(positive_u32("request_timeout_secs", value)?),
                None => DEFAULT_REQUEST_TIMEOUT_SECS,
            },
            max_concurrent_posts: match file.max_concurrent_posts {
                Some(value) => positive_u32("max_concurrent_posts", value)? as usize,
                None => DEFAULT_MAX_CONCURRENT_POSTS,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.account_token.is_empty() {
            return Err(ConfigError::MissingField {
                field: "account_token".to_string(),
            });
        }
        if self.lookback_minutes == 0 {
            return Err(ConfigError::ValidationFailed {
                reason: "lookback_minutes must be greater than zero".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed {
                reason: "request_timeout_secs must be greater than zero".to_string(),
            });
        }
        if self.max_concurrent_posts == 0 {
            return Err(ConfigError::ValidationFailed {
                reason: "max_concurrent_posts must be at least one".to_string(),
            });
        }
        if !self.graph_api_base.starts_with("http://") && !self.graph_api_base.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue {
                field: "graph_api_base".to_string(),
                value: self.graph_api_base.clone(),
            });
        }
        if self.denylist.is_empty() {
            warn!("Denylist is empty; no comment will ever be hidden");
        }
        Ok(())
    }

    /// The scheduler period: one lookback window, so consecutive windows tile.
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.lookback_minutes) * 60)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_int(field: &str, raw: &str) -> Result<i64, ConfigError> {
    raw.parse::<i64>().map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        value: raw.to_string(),
    })
}

fn positive_u32(field: &str, value: i64) -> Result<u32, ConfigError> {
    u32::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        })
}

// Zero or negative limits fall back to the API default.
fn post_limit(value: i64) -> Option<u32> {
    u32::try_from(value).ok().filter(|v| *v > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_from_minimal_env() {
        let config = ModerationConfig::from_lookup(lookup(&[("ACCESS_TOKEN", "user-token")]))
            .unwrap();

        assert_eq!(config.account_token.secret(), "user-token");
        assert_eq!(config.page_name, None);
        assert_eq!(config.lookback_minutes, 1);
        assert_eq!(config.post_limit, None);
        assert!(config.denylist.is_empty());
        assert_eq!(config.graph_api_base, DEFAULT_GRAPH_API_BASE);
        assert_eq!(config.cycle_interval(), Duration::from_secs(60));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_full_env() {
        let config = ModerationConfig::from_lookup(lookup(&[
            ("ACCESS_TOKEN", "user-token"),
            ("PAGE", "Corner Bakery"),
            ("COMMENTS_SINCE_MIN", "5"),
            ("POST_LIMIT", "10"),
            ("OFFENSIVE_WORD", "Spam, scam"),
            ("MAX_CONCURRENT_POSTS", "2"),
        ]))
        .unwrap();

        assert_eq!(config.page_name.as_deref(), Some("Corner Bakery"));
        assert_eq!(config.lookback_minutes, 5);
        assert_eq!(config.post_limit, Some(10));
        assert_eq!(config.denylist.terms(), &["spam", "scam"]);
        assert_eq!(config.max_concurrent_posts, 2);
        assert_eq!(config.cycle_interval(), Duration::from_secs(300));
    }

    #[test]
    fn test_page_name_is_kept_verbatim() {
        let config = ModerationConfig::from_lookup(lookup(&[
            ("ACCESS_TOKEN", "t"),
            ("PAGE", " Corner Bakery "),
        ]))
        .unwrap();
        assert_eq!(config.page_name.as_deref(), Some(" Corner Bakery "));

        let config =
            ModerationConfig::from_lookup(lookup(&[("ACCESS_TOKEN", "t"), ("PAGE", "   ")]))
                .unwrap();
        assert_eq!(config.page_name, None);

        let config = ModerationConfig::from_toml_str(
            r#"
            account_token = "t"
            page_name = "Bakery  "
            "#,
        )
        .unwrap();
        assert_eq!(config.page_name.as_deref(), Some("Bakery  "));
    }

    #[test]
    fn test_missing_token_is_rejected() {
        let err = ModerationConfig::from_lookup(lookup(&[("PAGE", "x")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { field } if field == "ACCESS_TOKEN"));
    }

    #[test]
    fn test_lookback_must_be_positive() {
        let err = ModerationConfig::from_lookup(lookup(&[
            ("ACCESS_TOKEN", "t"),
            ("COMMENTS_SINCE_MIN", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = ModerationConfig::from_lookup(lookup(&[
            ("ACCESS_TOKEN", "t"),
            ("COMMENTS_SINCE_MIN", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_non_positive_post_limit_means_api_default() {
        for raw in ["0", "-3"] {
            let config = ModerationConfig::from_lookup(lookup(&[
                ("ACCESS_TOKEN", "t"),
                ("POST_LIMIT", raw),
            ]))
            .unwrap();
            assert_eq!(config.post_limit, None);
        }
    }

    #[test]
    fn test_toml_config() {
        let config = ModerationConfig::from_toml_str(
            r#"
            account_token = "user-token"
            page_name = "Corner Bakery"
            lookback_minutes = 3
            post_limit = 0
            denylist = ["Spam", "scam"]
            "#,
        )
        .unwrap();

        assert_eq!(config.page_name.as_deref(), Some("Corner Bakery"));
        assert_eq!(config.lookback_minutes, 3);
        assert_eq!(config.post_limit, None);
        assert_eq!(config.denylist.terms(), &["spam", "scam"]);
    }

    #[test]
    fn test_toml_rejects_bad_base_url() {
        let err = ModerationConfig::from_toml_str(
            r#"
            account_token = "user-token"
            graph_api_base = "graph.facebook.com"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field, .. } if field == "graph_api_base"));
    }

    #[test]
    fn test_toml_parse_error() {
        let err = ModerationConfig::from_toml_str("account_token = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
