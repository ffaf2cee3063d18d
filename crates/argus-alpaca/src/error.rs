//! Error types for Alpaca device communication

/// Errors that can occur when talking to an Alpaca device
#[derive(Debug, thiserror::Error)]
pub enum AlpacaError {
    /// Caller input rejected before any request was made
    #[error("Validation error: {0}")]
    Validation(String),

    /// Connection-level failure: refused, reset, timeout, DNS
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-2xx HTTP status without a decodable Alpaca envelope
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// Response body was not a valid Alpaca envelope
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The device returned a non-zero ErrorNumber
    #[error("Device error {code}: {message}")]
    DeviceError { code: i32, message: String },

    /// The device does not implement this endpoint
    #[error("Endpoint not supported: {0}")]
    Unsupported(&'static str),
}

impl AlpacaError {
    /// Whether retrying the same request could plausibly succeed.
    ///
    /// Device errors and validation failures are deterministic. Transport
    /// failures, unexpected HTTP statuses, and garbled bodies are all
    /// transient from the caller's point of view.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AlpacaError::Transport(_)
                | AlpacaError::HttpStatus { .. }
                | AlpacaError::MalformedResponse(_)
        )
    }

    /// Whether this failure proves the endpoint is not implemented.
    ///
    /// HTTP 400 covers servers that reject unknown endpoint names, 404
    /// covers servers that route them nowhere, and ErrorNumber 0x400 is
    /// the Alpaca "not implemented" code. Transport failures say nothing
    /// about support and must not mark an endpoint unsupported.
    pub fn indicates_unsupported(&self) -> bool {
        match self {
            AlpacaError::HttpStatus { status, .. } => *status == 400 || *status == 404,
            AlpacaError::DeviceError { code, .. } => *code == 0x400,
            AlpacaError::Unsupported(_) => true,
            _ => false,
        }
    }
}

/// Result type alias for Alpaca operations
pub type Result<T> = std::result::Result<T, AlpacaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_is_retryable() {
        assert!(AlpacaError::Transport("connection refused".to_string()).is_retryable());
    }

    #[test]
    fn device_error_is_not_retryable() {
        let err = AlpacaError::DeviceError {
            code: 1025,
            message: "Invalid value".to_string(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn validation_is_not_retryable() {
        assert!(!AlpacaError::Validation("out of range".to_string()).is_retryable());
    }

    #[test]
    fn http_status_is_retryable() {
        let err = AlpacaError::HttpStatus {
            status: 500,
            body: "Internal Server Error".to_string(),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn malformed_response_is_retryable() {
        assert!(AlpacaError::MalformedResponse("not json".to_string()).is_retryable());
    }

    #[test]
    fn http_404_indicates_unsupported() {
        let err = AlpacaError::HttpStatus {
            status: 404,
            body: "Not Found".to_string(),
        };
        assert!(err.indicates_unsupported());
    }

    #[test]
    fn not_implemented_code_indicates_unsupported() {
        let err = AlpacaError::DeviceError {
            code: 0x400,
            message: "Property not implemented".to_string(),
        };
        assert!(err.indicates_unsupported());
    }

    #[test]
    fn transport_does_not_indicate_unsupported() {
        assert!(!AlpacaError::Transport("timeout".to_string()).indicates_unsupported());
    }

    #[test]
    fn http_500_does_not_indicate_unsupported() {
        let err = AlpacaError::HttpStatus {
            status: 500,
            body: "Internal Server Error".to_string(),
        };
        assert!(!err.indicates_unsupported());
    }
}
