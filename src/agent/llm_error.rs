use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API request failed: {0}")]
    ApiRequestFailed(#[from] reqwest::Error),

    #[error("Provider error {status}: {message}")]
    ProviderError { status: u16, message: String },

    #[error("Rate limited (429): {0}")]
    RateLimit(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl LlmError {
    pub fn is_rate_limit(&self) -> bool {
        match self {
            LlmError::RateLimit(_) => true,
            LlmError::ProviderError { status, .. } => *status == 429,
            LlmError::ApiRequestFailed(e) => e.status().map(|s| s.as_u16() == 429).unwrap_or(false),
            _ => false,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            LlmError::ProviderError { status, .. } => Some(*status),
            LlmError::ApiRequestFailed(e) => e.status().map(|s| s.as_u16()),
            LlmError::RateLimit(_) => Some(429),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let err = LlmError::ProviderError {
            status: 403,
            message: "API key not valid".to_string(),
        };
        assert_eq!(err.status_code(), Some(403));
        assert!(!err.is_rate_limit());

        let err = LlmError::RateLimit("quota".to_string());
        assert_eq!(err.status_code(), Some(429));
        assert!(err.is_rate_limit());

        let err = LlmError::ConfigError("missing key".to_string());
        assert_eq!(err.status_code(), None);
        assert_eq!(err.to_string(), "Configuration error: missing key");
    }
}
