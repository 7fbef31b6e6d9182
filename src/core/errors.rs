use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API error: {code} - {message}")]
    ApiError { code: u16, message: String },

    #[error("Authentication error: {0}")]
    AuthError(String),

    /// Caller supplied a missing or empty identifier/credential
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::core::config::ConfigError),
}

impl SessionError {
    /// Reject an empty argument before any request is issued
    pub fn require(name: &str, value: &str) -> Result<(), Self> {
        if value.trim().is_empty() {
            return Err(Self::InvalidInput(format!("{} is required", name)));
        }
        Ok(())
    }

    pub const fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}
