use std::time::Duration;
use thiserror::Error;

pub const GENERIC_UPSTREAM_MESSAGE: &str = "Error communicating with the completion service";

/// Local admission-control rejection. The rejected attempt still counts
/// against the limiter history.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Rate limit exceeded. Please try again later.")]
pub struct RateLimitExceeded {
    pub retry_after: Duration,
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Rate limit exceeded. Please try again in {}s.", whole_seconds_up(.retry_after))]
    RateLimited {
        retry_after: Duration,
    },
    #[error("{message}")]
    Upstream {
        status: u16,
        message: String,
    },
    #[error("An API key is required")]
    CredentialMissing,
    #[error("Cannot send an empty conversation")]
    EmptyTranscript,
    #[error("Failed to reach the completion service: {0}")]
    Transport(String),
    #[error("The completion service did not answer within {}s", .0.as_secs())]
    Timeout(Duration),
}

impl CompletionError {
    /// Whether the failure points at a bad or missing credential, in which
    /// case the view should ask for a new API key.
    pub fn indicates_credential_problem(&self) -> bool {
        match self {
            CompletionError::CredentialMissing => true,
            CompletionError::Upstream { status, message } => {
                *status == 401 || *status == 403 || message.to_lowercase().contains("api key")
            }
            _ => false,
        }
    }
}

fn whole_seconds_up(duration: &Duration) -> u64 {
    let secs = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
    secs.max(1)
}

impl From<RateLimitExceeded> for CompletionError {
    fn from(err: RateLimitExceeded) -> Self {
        CompletionError::RateLimited {
            retry_after: err.retry_after,
        }
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        CompletionError::Transport(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Credential store IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Credential store JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Could not determine config directory")]
    NoConfigDir,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid completion endpoint '{url}': {reason}")]
    InvalidEndpoint {
        url: String,
        reason: String,
    },
    #[error("Invalid setting {name}: {reason}")]
    InvalidSetting {
        name: &'static str,
        reason: String,
    },
    #[error("Unsupported credential store type: {0}")]
    UnsupportedStore(String),
}
