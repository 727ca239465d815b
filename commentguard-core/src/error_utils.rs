use crate::error::*;
use std::time::Duration;
use tracing::{error, info, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    fn is_retryable(&self) -> bool;
    fn retry_after(&self) -> Option<Duration>;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        match self {
            CoreError::GraphApi(e) => {
                error!("Graph API error details: {:?}", e);
            }
            CoreError::Moderation(e) => {
                error!("Moderation error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            _ => {}
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CoreError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            CoreError::GraphApi(e) => e.is_retryable(),
            CoreError::Network(e) => e.is_timeout() || e.is_connect(),
            CoreError::Timeout { .. } => true,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            CoreError::GraphApi(e) => e.retry_after(),
            CoreError::Timeout { seconds } => Some(Duration::from_secs(*seconds)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::GraphApi(e) => e.user_friendly_message(),
            CoreError::Moderation(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Network(_) => {
                "Network connection error. Please check your internet connection.".to_string()
            }
            CoreError::Timeout { .. } => {
                "The operation took too long to complete. It will be retried next cycle."
                    .to_string()
            }
            _ => "An unexpected error occurred.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::GraphApi(_) => "GRAPH_API".to_string(),
            CoreError::Moderation(_) => "MODERATION".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Io(_) => "IO".to_string(),
            CoreError::Serialization(_) => "SERIALIZATION".to_string(),
            CoreError::Network(_) => "NETWORK".to_string(),
            CoreError::Timeout { .. } => "TIMEOUT".to_string(),
            CoreError::Internal { .. } => "INTERNAL".to_string(),
        }
    }
}

impl ErrorExt for GraphApiError {
    fn log_error(&self) -> &Self {
        error!("GraphApiError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("GraphApiError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            GraphApiError::RateLimitExceeded { .. } => true,
            GraphApiError::RequestTimeout => true,
            GraphApiError::ServerError { status_code } => *status_code >= 500,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            GraphApiError::RateLimitExceeded { retry_after } => {
                Some(Duration::from_secs(*retry_after))
            }
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            GraphApiError::InvalidToken => {
                "The access token was rejected. Please issue a new token.".to_string()
            }
            GraphApiError::PermissionDenied { resource } => format!(
                "The token lacks the permission needed for {}. Check the page role and scopes.",
                resource
            ),
            GraphApiError::NotFound { resource } => {
                format!("'{}' does not exist or is not visible to this token.", resource)
            }
            GraphApiError::RateLimitExceeded { retry_after } => format!(
                "Too many requests. Please wait {} seconds before trying again.",
                retry_after
            ),
            GraphApiError::RequestTimeout => "Request to the Graph API timed out.".to_string(),
            _ => "Graph API error occurred. It will be retried next cycle.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            GraphApiError::InvalidToken => "GRAPH_INVALID_TOKEN".to_string(),
            GraphApiError::PermissionDenied { .. } => "GRAPH_PERMISSION_DENIED".to_string(),
            GraphApiError::NotFound { .. } => "GRAPH_NOT_FOUND".to_string(),
            GraphApiError::RateLimitExceeded { .. } => "GRAPH_RATE_LIMIT".to_string(),
            GraphApiError::ServerError { .. } => "GRAPH_SERVER_ERROR".to_string(),
            GraphApiError::RequestTimeout => "GRAPH_TIMEOUT".to_string(),
            GraphApiError::InvalidResponse { .. } => "GRAPH_INVALID_RESPONSE".to_string(),
            GraphApiError::Rejected { .. } => "GRAPH_REJECTED".to_string(),
            GraphApiError::MutationRefused { .. } => "GRAPH_MUTATION_REFUSED".to_string(),
        }
    }
}

impl ErrorExt for ModerationError {
    fn log_error(&self) -> &Self {
        error!("ModerationError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ModerationError (warning): {}", self);
        self
    }

    // Retries happen per request inside the client; the pipeline itself only
    // re-attempts on the next scheduled cycle.
    fn is_retryable(&self) -> bool {
        false
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ModerationError::Auth { scope, .. } => {
                format!("The credential for {} was rejected.", scope)
            }
            ModerationError::PageNotFound { page_name } => format!(
                "The account does not manage a page named '{}'. Check the PAGE setting.",
                page_name
            ),
            ModerationError::Fetch { scope, .. } => {
                format!("Could not load {}. It will be covered by the next cycle.", scope)
            }
            ModerationError::Action { comment_id, .. } => {
                format!("Comment {} could not be hidden.", comment_id)
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            ModerationError::Auth { .. } => "AUTH_ERROR".to_string(),
            ModerationError::PageNotFound { .. } => "PAGE_NOT_FOUND".to_string(),
            ModerationError::Fetch { .. } => "FETCH_ERROR".to_string(),
            ModerationError::Action { .. } => "ACTION_ERROR".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!("ConfigError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ConfigError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        false
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => {
                format!("Configuration file '{}' not found.", path)
            }
            ConfigError::MissingField { field } => {
                format!("Required configuration field '{}' is missing.", field)
            }
            ConfigError::InvalidValue { field, .. } => {
                format!("Invalid value for configuration field '{}'.", field)
            }
            _ => "Configuration error occurred. Please check your settings.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::MissingField { .. } => "CONFIG_MISSING_FIELD".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}

pub struct ErrorReporter {
    report_errors: bool,
    report_warnings: bool,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self {
            report_errors: true,
            report_warnings: true,
        }
    }

    pub fn with_error_reporting(mut self, enabled: bool) -> Self {
        self.report_errors = enabled;
        self
    }

    pub fn with_warning_reporting(mut self, enabled: bool) -> Self {
        self.report_warnings = enabled;
        self
    }

    pub fn report_error<E: ErrorExt>(&self, error: &E) {
        if self.report_errors {
            error.log_error();
            info!("Error code: {}", error.error_code());
            info!("User message: {}", error.user_friendly_message());
            if error.is_retryable() {
                if let Some(retry_after) = error.retry_after() {
                    info!("Error is retryable. Retry after: {:?}", retry_after);
                }
            }
        }
    }

    pub fn report_warning<E: ErrorExt>(&self, error: &E) {
        if self.report_warnings {
            error.log_warn();
        }
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}
