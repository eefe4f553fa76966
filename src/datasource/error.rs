use reqwest::StatusCode;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Network-level failure: no usable HTTP exchange took place.
#[derive(Debug, Error)]
#[error("{context}: {source}")]
pub struct TransportError {
    context: String,
    #[source]
    source: BoxError,
}

impl TransportError {
    pub fn new(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn context(&self) -> &str {
        &self.context
    }
}

/// The registry answered, but not with something we can use.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Registry service unavailable: {status}")]
    ServiceUnavailable { status: StatusCode },

    #[error("Unexpected registry response ({status}): {reason}")]
    UnexpectedResponse { status: StatusCode, reason: String },
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Invalid lookup request: {0}")]
    InvalidRequest(String),
}

impl LookupError {
    /// True when the remote host failed, either on the wire or with a 5xx.
    /// Callers treat both the same way: abort this lookup and maybe retry later.
    pub fn is_external_host_error(&self) -> bool {
        matches!(
            self,
            LookupError::Transport(_)
                | LookupError::Registry(RegistryError::ServiceUnavailable { .. })
        )
    }
}
