//! Error types for the argus service

/// Errors that can occur in the argus service
#[derive(Debug, thiserror::Error)]
pub enum ArgusError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Device error: {0}")]
    Device(#[from] argus_alpaca::AlpacaError),

    #[error("Status server error: {0}")]
    Status(String),
}

/// Result type alias for argus operations
pub type Result<T> = std::result::Result<T, ArgusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_displays_message() {
        let err = ArgusError::Config("missing device name".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing device name");
    }

    #[test]
    fn device_errors_convert_from_the_client_library() {
        let err: ArgusError = argus_alpaca::AlpacaError::Transport("refused".to_string()).into();
        assert!(err.to_string().contains("refused"));
    }
}
