use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Graph API error: {0}")]
    GraphApi(#[from] GraphApiError),

    #[error("Moderation error: {0}")]
    Moderation(#[from] ModerationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Operation timeout after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphApiError {
    #[error("Access token rejected")]
    InvalidToken,

    #[error("Permission denied for: {resource}")]
    PermissionDenied { resource: String },

    #[error("Object not found: {resource}")]
    NotFound { resource: String },

    #[error("Rate limit exceeded. Retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    #[error("Server error: {status_code}")]
    ServerError { status_code: u16 },

    #[error("Request timeout")]
    RequestTimeout,

    #[error("Invalid API response: {details}")]
    InvalidResponse { details: String },

    #[error("Request rejected (code {code}): {message}")]
    Rejected { code: i64, message: String },

    #[error("Mutation refused: {details}")]
    MutationRefused { details: String },
}

/// Failures of the moderation pipeline, each tied to the scope it was isolated to.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModerationError {
    #[error("Credential rejected for {scope}: {reason}")]
    Auth { scope: String, reason: String },

    #[error("No managed page named '{page_name}'")]
    PageNotFound { page_name: String },

    #[error("Failed to fetch {scope}: {reason}")]
    Fetch { scope: String, reason: String },

    #[error("Failed to hide comment {comment_id}: {reason}")]
    Action { comment_id: String, reason: String },
}

impl ModerationError {
    /// Classifies a failed list call. Rejected credentials become `Auth`,
    /// everything else is a transient `Fetch`.
    pub fn from_fetch(scope: impl Into<String>, error: &CoreError) -> Self {
        let scope = scope.into();
        let reason = error.to_string();
        if error.is_auth_failure() {
            ModerationError::Auth { scope, reason }
        } else {
            ModerationError::Fetch { scope, reason }
        }
    }

    pub fn from_action(comment_id: impl Into<String>, error: &CoreError) -> Self {
        ModerationError::Action {
            comment_id: comment_id.into(),
            reason: error.to_string(),
        }
    }
}

impl CoreError {
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            CoreError::GraphApi(GraphApiError::InvalidToken)
                | CoreError::GraphApi(GraphApiError::PermissionDenied { .. })
        )
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
