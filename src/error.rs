// src/error.rs
use thiserror::Error;

/// Shown to the user for every failure that isn't a missing sign-in.
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";
pub const SIGN_IN_REQUIRED: &str = "Please sign in to chat with the assistant.";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("user must be authenticated")]
    Unauthenticated,

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl AppError {
    /// Collapses the error into the text a user gets to see.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Unauthenticated => SIGN_IN_REQUIRED,
            _ => GENERIC_FAILURE,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failures_collapse_to_generic_message() {
        let upstream = AppError::Upstream { status: 502, message: "bad gateway".to_string() };
        let invalid = AppError::InvalidInput("empty".to_string());
        let io = AppError::Storage(std::io::Error::new(std::io::ErrorKind::Other, "disk"));

        assert_eq!(upstream.user_message(), GENERIC_FAILURE);
        assert_eq!(invalid.user_message(), GENERIC_FAILURE);
        assert_eq!(io.user_message(), GENERIC_FAILURE);
        assert_eq!(AppError::Unauthenticated.user_message(), SIGN_IN_REQUIRED);
    }
}
