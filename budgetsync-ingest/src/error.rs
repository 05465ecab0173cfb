use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by the aggregator or by the transport underneath it.
///
/// `code` is the aggregator's machine-readable error code; transport
/// failures carry none.
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
#[error("{}", self.describe())]
pub struct UpstreamError {
    pub code: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error_code: Option<String>,
    error_message: Option<String>,
    error_type: Option<String>,
    display_message: Option<String>,
}

impl UpstreamError {
    pub fn coded(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
            status: None,
            error_type: None,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            status: None,
            error_type: None,
        }
    }

    /// Build from a non-success HTTP reply. Bodies that are not aggregator
    /// error documents keep their raw text as the message.
    pub fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(b) => Self {
                code: b.error_code,
                message: b
                    .error_message
                    .or(b.display_message)
                    .unwrap_or_else(|| format!("HTTP {status}")),
                status: Some(status),
                error_type: b.error_type,
            },
            Err(_) => Self {
                code: None,
                message: if body.trim().is_empty() {
                    format!("HTTP {status}")
                } else {
                    body.trim().to_string()
                },
                status: Some(status),
                error_type: None,
            },
        }
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    fn describe(&self) -> String {
        match (&self.code, self.status) {
            (Some(code), Some(status)) => format!("{code}: {} (HTTP {status})", self.message),
            (Some(code), None) => format!("{code}: {}", self.message),
            (None, _) => self.message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_aggregator_error_body() {
        let body = r#"{"error_type":"ITEM_ERROR","error_code":"PRODUCT_NOT_READY","error_message":"the requested product is not yet ready","display_message":null}"#;
        let err = UpstreamError::from_response(400, body);
        assert_eq!(err.code(), Some("PRODUCT_NOT_READY"));
        assert_eq!(err.error_type.as_deref(), Some("ITEM_ERROR"));
        assert_eq!(
            err.to_string(),
            "PRODUCT_NOT_READY: the requested product is not yet ready (HTTP 400)"
        );
    }

    #[test]
    fn test_from_non_json_body() {
        let err = UpstreamError::from_response(502, "Bad Gateway");
        assert_eq!(err.code(), None);
        assert_eq!(err.message, "Bad Gateway");
        assert_eq!(err.status, Some(502));
    }

    #[test]
    fn test_transport_has_no_code() {
        let err = UpstreamError::transport("connection reset");
        assert!(err.code().is_none());
        assert_eq!(err.to_string(), "connection reset");
    }
}
