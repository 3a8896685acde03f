use std::path::PathBuf;
use thiserror::Error;

/// Status codes surfaced to the transport. Mirrors the gRPC code space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Unknown,
    InvalidArgument,
    PermissionDenied,
    Unauthenticated,
    Unavailable,
    Internal,
}

/// Per-call failures. Every variant short-circuits the interceptor chain.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("cannot get metadata from incoming call")]
    MetadataUnavailable,
    #[error("cannot get consumer")]
    NoConsumerIdentity,
    #[error("cannot get peer from incoming call")]
    PeerUnavailable,
    #[error("access denied: consumer {consumer:?} may not call {method}")]
    AccessDenied { consumer: String, method: String },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("stream delivery failed: {0}")]
    Forwarding(String),
    #[error("service is shutting down")]
    Unavailable,
    #[error("handler failed: {0}")]
    Handler(String),
}

impl CallError {
    pub fn code(&self) -> StatusCode {
        match self {
            CallError::MetadataUnavailable | CallError::PeerUnavailable => StatusCode::Internal,
            CallError::NoConsumerIdentity => StatusCode::Unauthenticated,
            CallError::AccessDenied { .. } => StatusCode::PermissionDenied,
            CallError::InvalidArgument(_) => StatusCode::InvalidArgument,
            CallError::Forwarding(_) => StatusCode::Unavailable,
            CallError::Unavailable => StatusCode::Unavailable,
            CallError::Handler(_) => StatusCode::Unknown,
        }
    }
}

/// Startup failures while loading the access policy. Fatal.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("malformed access policy: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("cannot read access policy from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no access policy configured (set policy, policy_path or CALLGATE_POLICY)")]
    MissingPolicy,
}

pub type CallResult<T> = Result<T, CallError>;
