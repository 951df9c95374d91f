//! Error type for a single failed attempt
//!
//! Callers with their own error type don't need this; anything implementing
//! `std::error::Error` can flow through the retry loop. `AttemptError` covers
//! the common case where the provider adapter only has a message.

use thiserror::Error;

/// A failed attempt described by its human-readable message.
///
/// The classifier reads this message, so producers should render the failure
/// kind into it (e.g. `"429 Too Many Requests"`, `"Schema validation failed"`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct AttemptError {
    message: String,
}

impl AttemptError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for AttemptError {
    fn from(message: String) -> Self {
        AttemptError { message }
    }
}

impl From<&str> for AttemptError {
    fn from(message: &str) -> Self {
        AttemptError::new(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_the_message() {
        let err = AttemptError::new("503 Service Unavailable");
        assert_eq!(err.to_string(), "503 Service Unavailable");
        assert_eq!(err.message(), "503 Service Unavailable");
    }

    #[test]
    fn converts_from_strings() {
        let from_str: AttemptError = "network down".into();
        let from_string: AttemptError = String::from("network down").into();
        assert_eq!(from_str, from_string);
    }
}
