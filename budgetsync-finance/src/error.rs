use budgetsync_ingest::UpstreamError;
use serde::Serialize;
use thiserror::Error;

/// Everything that can stop one sync invocation.
///
/// Unsupported products and classifier failures never show up here; they
/// are absorbed where they happen.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Required credentials or settings are missing
    #[error("{0}")]
    Config(String),

    /// Request rejected before any upstream call
    #[error("{0}")]
    InvalidRequest(String),

    /// Fatal upstream failure, or retries exhausted
    #[error("{call} failed after {attempts} attempt(s): {source}")]
    Upstream {
        call: &'static str,
        attempts: u32,
        #[source]
        source: UpstreamError,
    },
}

/// The single failure outcome handed to callers
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SyncFailure {
    /// Machine-readable reason
    pub error: &'static str,
    /// Human-readable detail
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream: Option<UpstreamError>,
}

impl SyncError {
    pub fn reason(&self) -> &'static str {
        match self {
            SyncError::Config(_) => "configuration_error",
            SyncError::InvalidRequest(_) => "invalid_request",
            SyncError::Upstream { .. } => "upstream_error",
        }
    }

    pub fn to_failure(&self) -> SyncFailure {
        SyncFailure {
            error: self.reason(),
            details: self.to_string(),
            upstream: match self {
                SyncError::Upstream { source, .. } => Some(source.clone()),
                _ => None,
            },
        }
    }
}
