//! Error classification for retry decisions
//!
//! Classification is keyed on the error's message text. Rules are checked in
//! priority order and the first match wins: rate-limit and validation
//! signatures can overlap with the generic numeric-code patterns.

use regex_lite::Regex;
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

/// Fixed wait used for rate-limit errors instead of exponential backoff.
pub const RATE_LIMIT_DELAY: Duration = Duration::from_millis(5000);

const VALIDATION_MARKERS: &[&str] = &["validation", "schema", "parse", "invalid input", "zoderror"];
const RATE_LIMIT_MARKERS: &[&str] = &["429", "rate limit", "too many requests", "quota exceeded"];
const NETWORK_MARKERS: &[&str] = &["timeout", "network"];

/// Closed set of failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// Request or output failed validation (terminal)
    Validation,
    /// Provider throttled the caller (retryable, fixed delay)
    RateLimit,
    /// 4xx other than 429 (terminal)
    ClientError,
    /// 5xx (retryable)
    ServerError,
    /// Timeout or transport failure (retryable)
    NetworkError,
    /// Nothing matched (retryable)
    Unknown,
}

impl ErrorType {
    pub fn is_retryable(self) -> bool {
        !matches!(self, ErrorType::Validation | ErrorType::ClientError)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorType::Validation => "VALIDATION",
            ErrorType::RateLimit => "RATE_LIMIT",
            ErrorType::ClientError => "CLIENT_ERROR",
            ErrorType::ServerError => "SERVER_ERROR",
            ErrorType::NetworkError => "NETWORK_ERROR",
            ErrorType::Unknown => "UNKNOWN",
        }
    }

    /// Stable, human-readable reason for this kind.
    pub fn reason(self) -> &'static str {
        match self {
            ErrorType::Validation => "Validation errors are not retryable",
            ErrorType::RateLimit => "Rate limit error - using linear delay strategy",
            ErrorType::ClientError => "Client errors (4xx) are not retryable",
            ErrorType::ServerError => "Server error - using exponential backoff",
            ErrorType::NetworkError => "Network error - using exponential backoff",
            ErrorType::Unknown => "Unknown error type - using exponential backoff as fallback",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying one failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    pub should_retry: bool,
    pub error_type: ErrorType,
    pub reason: &'static str,
    /// Fixed wait overriding the computed backoff
    pub custom_delay: Option<Duration>,
}

impl RetryDecision {
    fn for_type(error_type: ErrorType) -> Self {
        let custom_delay = match error_type {
            ErrorType::RateLimit => Some(RATE_LIMIT_DELAY),
            _ => None,
        };
        Self {
            should_retry: error_type.is_retryable(),
            error_type,
            reason: error_type.reason(),
            custom_delay,
        }
    }
}

/// Classify a failure message.
///
/// `_attempt` is part of the contract but no current rule depends on it.
pub fn classify(message: &str, _attempt: u32) -> RetryDecision {
    RetryDecision::for_type(error_type_of(message))
}

/// Classify an error by its `Display` text.
pub fn classify_error<E>(error: &E, attempt: u32) -> RetryDecision
where
    E: fmt::Display + ?Sized,
{
    classify(&error.to_string(), attempt)
}

fn error_type_of(message: &str) -> ErrorType {
    let msg = message.to_lowercase();

    if contains_any(&msg, VALIDATION_MARKERS) {
        ErrorType::Validation
    } else if contains_any(&msg, RATE_LIMIT_MARKERS) {
        ErrorType::RateLimit
    } else if matches_code(client_code(), &msg) {
        ErrorType::ClientError
    } else if matches_code(server_code(), &msg) || msg.contains("internal server error") {
        ErrorType::ServerError
    } else if contains_any(&msg, NETWORK_MARKERS) {
        ErrorType::NetworkError
    } else {
        ErrorType::Unknown
    }
}

fn contains_any(msg: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| msg.contains(marker))
}

fn matches_code(pattern: Option<&Regex>, msg: &str) -> bool {
    pattern.is_some_and(|re| re.is_match(msg))
}

// Standalone three-digit codes only: "status 404" matches, "order 14045" does not.
fn client_code() -> Option<&'static Regex> {
    static CLIENT_CODE: OnceLock<Option<Regex>> = OnceLock::new();
    CLIENT_CODE
        .get_or_init(|| Regex::new(r"\b4\d{2}\b").ok())
        .as_ref()
}

fn server_code() -> Option<&'static Regex> {
    static SERVER_CODE: OnceLock<Option<Regex>> = OnceLock::new();
    SERVER_CODE
        .get_or_init(|| Regex::new(r"\b5\d{2}\b").ok())
        .as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_validation_not_retryable() {
        let decision = classify("Schema validation failed", 1);
        assert!(!decision.should_retry);
        assert_eq!(decision.error_type, ErrorType::Validation);
        assert_eq!(decision.reason, "Validation errors are not retryable");
        assert_eq!(decision.custom_delay, None);
    }

    #[test]
    fn test_validation_markers() {
        for msg in [
            "Failed to parse JSON output",
            "ZodError: expected string",
            "Invalid input: prompt empty",
            "response did not match SCHEMA",
        ] {
            assert_eq!(
                classify(msg, 1).error_type,
                ErrorType::Validation,
                "{msg} should classify as validation"
            );
        }
    }

    #[test]
    fn test_client_error_not_retryable() {
        let decision = classify("401 Unauthorized", 1);
        assert!(!decision.should_retry);
        assert_eq!(decision.error_type, ErrorType::ClientError);
        assert_eq!(decision.reason, "Client errors (4xx) are not retryable");

        assert_eq!(classify("403 Forbidden", 2).error_type, ErrorType::ClientError);
        assert_eq!(classify("HTTP 400", 1).error_type, ErrorType::ClientError);
    }

    #[test]
    fn test_rate_limit_uses_fixed_delay() {
        let decision = classify("429 Too Many Requests", 1);
        assert!(decision.should_retry);
        assert_eq!(decision.error_type, ErrorType::RateLimit);
        assert_eq!(decision.custom_delay, Some(Duration::from_millis(5000)));
        assert_eq!(
            decision.reason,
            "Rate limit error - using linear delay strategy"
        );
    }

    #[test]
    fn test_rate_limit_wins_over_client_code() {
        // "429" is a 4xx code; the rate-limit rule has priority.
        assert_eq!(classify("HTTP 429", 1).error_type, ErrorType::RateLimit);
        assert_eq!(
            classify("Quota exceeded for project", 1).error_type,
            ErrorType::RateLimit
        );
        assert_eq!(
            classify("Rate limit reached for requests", 1).error_type,
            ErrorType::RateLimit
        );
    }

    #[test]
    fn test_validation_wins_over_everything() {
        assert_eq!(
            classify("500 while parsing response", 1).error_type,
            ErrorType::Validation
        );
    }

    #[test]
    fn test_server_error_uses_backoff() {
        let decision = classify("500 Internal Server Error", 1);
        assert!(decision.should_retry);
        assert_eq!(decision.error_type, ErrorType::ServerError);
        assert_eq!(decision.custom_delay, None);
        assert_eq!(decision.reason, "Server error - using exponential backoff");

        assert_eq!(
            classify("503 Service Unavailable", 1).error_type,
            ErrorType::ServerError
        );
        assert_eq!(
            classify("upstream said: internal server error", 1).error_type,
            ErrorType::ServerError
        );
    }

    #[test]
    fn test_network_error() {
        let decision = classify("Request timeout after 30s", 1);
        assert!(decision.should_retry);
        assert_eq!(decision.error_type, ErrorType::NetworkError);
        assert_eq!(
            classify("Network unreachable", 1).error_type,
            ErrorType::NetworkError
        );
    }

    #[test]
    fn test_unknown_is_retried() {
        let decision = classify("something odd happened", 1);
        assert!(decision.should_retry);
        assert_eq!(decision.error_type, ErrorType::Unknown);
        assert_eq!(decision.custom_delay, None);
        assert_eq!(
            decision.reason,
            "Unknown error type - using exponential backoff as fallback"
        );
    }

    #[test]
    fn test_codes_inside_longer_numbers_do_not_match() {
        assert_eq!(
            classify("request id 14045 failed", 1).error_type,
            ErrorType::Unknown
        );
        assert_eq!(
            classify("processed 5000 tokens then stopped", 1).error_type,
            ErrorType::Unknown
        );
    }

    #[test]
    fn test_classify_error_uses_display() {
        let err = crate::error::AttemptError::new("502 Bad Gateway");
        assert_eq!(classify_error(&err, 3).error_type, ErrorType::ServerError);
    }

    #[test]
    fn test_error_type_display() {
        assert_eq!(ErrorType::Validation.to_string(), "VALIDATION");
        assert_eq!(ErrorType::ClientError.to_string(), "CLIENT_ERROR");
        assert_eq!(ErrorType::RateLimit.to_string(), "RATE_LIMIT");
        assert!(!ErrorType::ClientError.is_retryable());
        assert!(ErrorType::Unknown.is_retryable());
    }
}
