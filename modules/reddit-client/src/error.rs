use thiserror::Error;

pub type Result<T> = std::result::Result<T, RedditError>;

#[derive(Debug, Error)]
pub enum RedditError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized (status {status}): token rejected or expired")]
    Unauthorized { status: u16 },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Token grant failed: {0}")]
    TokenGrant(String),
}

impl RedditError {
    /// True when the handle itself is unusable and retrying the same call
    /// with the same token cannot succeed.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            RedditError::Unauthorized { .. } | RedditError::TokenGrant(_)
        )
    }
}

impl From<reqwest::Error> for RedditError {
    fn from(err: reqwest::Error) -> Self {
        RedditError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for RedditError {
    fn from(err: serde_json::Error) -> Self {
        RedditError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_auth_variants_are_fatal() {
        assert!(RedditError::Unauthorized { status: 401 }.is_auth());
        assert!(RedditError::TokenGrant("invalid_grant".into()).is_auth());
        assert!(!RedditError::Network("reset".into()).is_auth());
        assert!(!RedditError::Api {
            status: 429,
            message: "slow down".into()
        }
        .is_auth());
    }
}
