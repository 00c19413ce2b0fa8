//! Error types for pi-compat.
//!
//! Normalization, parameter resolution and wrapper installation never fail;
//! errors only surface from configuration loading and from the providers the
//! agent streams through.

use thiserror::Error;

/// Result type alias using our error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pi-compat.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input that has the wrong overall shape
    #[error("Validation error: {0}")]
    Validation(String),

    /// Provider/API errors
    #[error("Provider error: {provider}: {message}")]
    Provider { provider: String, message: String },

    /// API errors (generic)
    #[error("API error: {0}")]
    Api(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] Box<std::io::Error>),

    /// JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] Box<serde_json::Error>),
}

impl Error {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a provider error.
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an API error.
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api(message.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Box::new(value))
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(Box::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn provider_error_names_the_provider() {
        let err = Error::provider("openrouter", "upstream rejected routing preference");
        assert_eq!(
            err.to_string(),
            "Provider error: openrouter: upstream rejected routing preference"
        );
    }

    #[test]
    fn json_errors_convert_through_box() {
        let parse = serde_json::from_str::<serde_json::Value>("{").expect_err("invalid json");
        let err: Error = parse.into();
        assert!(matches!(err, Error::Json(_)));
        assert!(err.to_string().starts_with("JSON error:"));
    }

    #[test]
    fn validation_error_display() {
        let err = Error::validation("Settings root is not a JSON object");
        assert_eq!(
            err.to_string(),
            "Validation error: Settings root is not a JSON object"
        );
    }

    #[test]
    fn io_errors_convert_through_box() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, Error::Io(_)));
    }
}
