use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use reddit_client::TokenGrant;

use crate::cache::DEFAULT_CACHE_TTL;
use crate::discovery::SearchDepths;
use crate::scheduling::workload::DEFAULT_WORKLOAD_CEILING;

pub const DEFAULT_USER_AGENT: &str = "AudienceFinder/0.1";

/// Configuration loaded from environment variables (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    // Reddit app credentials
    pub reddit_client_id: String,
    pub reddit_client_secret: String,
    pub reddit_refresh_token: Option<String>,
    pub reddit_user_agent: String,

    // Default search depths
    pub direct_search_depth: u32,
    pub post_search_depth: u32,
    pub comment_search_depth: u32,

    // Guards
    pub workload_ceiling: f64,
    pub result_cache_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            reddit_client_id: std::env::var("REDDIT_CLIENT_ID")
                .context("REDDIT_CLIENT_ID is required")?,
            reddit_client_secret: std::env::var("REDDIT_CLIENT_SECRET")
                .context("REDDIT_CLIENT_SECRET is required")?,
            reddit_refresh_token: std::env::var("REDDIT_REFRESH_TOKEN")
                .ok()
                .filter(|t| !t.is_empty()),
            reddit_user_agent: std::env::var("REDDIT_USER_AGENT")
                .unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string()),
            direct_search_depth: env_or("DIRECT_SEARCH_DEPTH", 7)?,
            post_search_depth: env_or("POST_SEARCH_DEPTH", 25)?,
            comment_search_depth: env_or("COMMENT_SEARCH_DEPTH", 10)?,
            workload_ceiling: env_or("WORKLOAD_CEILING", DEFAULT_WORKLOAD_CEILING)?,
            result_cache_ttl: Duration::from_secs(env_or(
                "RESULT_CACHE_TTL_SECS",
                DEFAULT_CACHE_TTL.as_secs(),
            )?),
        };

        config.log_keys();
        Ok(config)
    }

    pub fn depths(&self) -> SearchDepths {
        SearchDepths {
            direct: self.direct_search_depth,
            post: self.post_search_depth,
            comment: self.comment_search_depth,
        }
    }

    /// Refresh-token grant acts as the configured user; otherwise app-only.
    pub fn grant(&self) -> TokenGrant {
        match &self.reddit_refresh_token {
            Some(token) => TokenGrant::RefreshToken(token.clone()),
            None => TokenGrant::ClientCredentials,
        }
    }

    fn log_keys(&self) {
        fn preview(val: &str) -> String {
            let head: String = val.chars().take(5).collect();
            format!("{}...({} chars)", head, val.chars().count())
        }
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => preview(v),
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  REDDIT_CLIENT_ID: {}", preview(&self.reddit_client_id));
        tracing::info!("  REDDIT_CLIENT_SECRET: {}", preview(&self.reddit_client_secret));
        tracing::info!("  REDDIT_REFRESH_TOKEN: {}", preview_opt(&self.reddit_refresh_token));
        tracing::info!("  REDDIT_USER_AGENT: {}", self.reddit_user_agent);
        tracing::info!(
            "  depths: direct={} post={} comment={}",
            self.direct_search_depth,
            self.post_search_depth,
            self.comment_search_depth
        );
        tracing::info!("  WORKLOAD_CEILING: {}", self.workload_ceiling);
        tracing::info!("  RESULT_CACHE_TTL_SECS: {}", self.result_cache_ttl.as_secs());
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    parse_or(key, std::env::var(key).ok(), default)
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some(v) => v
            .parse()
            .with_context(|| format!("{key} must be a number, got {v:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_blank_uses_default() {
        assert_eq!(parse_or::<u32>("X", None, 7).unwrap(), 7);
        assert_eq!(parse_or::<u32>("X", Some("  ".into()), 7).unwrap(), 7);
    }

    #[test]
    fn parses_trimmed_value() {
        assert_eq!(parse_or::<u32>("X", Some(" 12 ".into()), 7).unwrap(), 12);
        assert_eq!(parse_or::<f64>("X", Some("2500.5".into()), 1.0).unwrap(), 2500.5);
    }

    #[test]
    fn garbage_names_the_variable() {
        let err = parse_or::<u32>("POST_SEARCH_DEPTH", Some("lots".into()), 7).unwrap_err();
        assert!(err.to_string().contains("POST_SEARCH_DEPTH"));
    }

    #[test]
    fn grant_follows_refresh_token() {
        let mut config = Config {
            reddit_client_id: "id".into(),
            reddit_client_secret: "secret".into(),
            reddit_refresh_token: None,
            reddit_user_agent: DEFAULT_USER_AGENT.into(),
            direct_search_depth: 7,
            post_search_depth: 25,
            comment_search_depth: 10,
            workload_ceiling: DEFAULT_WORKLOAD_CEILING,
            result_cache_ttl: DEFAULT_CACHE_TTL,
        };
        assert!(matches!(config.grant(), TokenGrant::ClientCredentials));

        config.reddit_refresh_token = Some("r".into());
        assert!(matches!(config.grant(), TokenGrant::RefreshToken(ref t) if t == "r"));
        assert_eq!(config.depths().post, 25);
    }
}
