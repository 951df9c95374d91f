use crate::config::error::{ConfigError, Result};
use crate::config::loader::ResilienceConfig;
use crate::retry::CircuitBreakerConfig;

/// Validate a loaded configuration
///
/// Collects every violation so a single error reports all of them.
pub fn validate(config: &ResilienceConfig) -> Result<()> {
    let mut errors = Vec::new();
    let retry = &config.retry;

    if retry.max_attempts < 1 {
        errors.push(format!(
            "retry.max_attempts must be at least 1 (got {})",
            retry.max_attempts
        ));
    }
    if !retry.backoff_factor.is_finite() || retry.backoff_factor <= 0.0 {
        errors.push(format!(
            "retry.backoff_factor must be a positive number (got {})",
            retry.backoff_factor
        ));
    }
    if let Some(max_delay_ms) = retry.max_delay_ms
        && max_delay_ms < retry.initial_delay_ms
    {
        errors.push(format!(
            "retry.max_delay_ms ({max_delay_ms}) must not be below retry.initial_delay_ms ({})",
            retry.initial_delay_ms
        ));
    }
    if let Some(breaker) = &retry.circuit_breaker {
        check_breaker("retry.circuit_breaker", breaker, &mut errors);
    }
    if let Some(breaker) = &config.circuit_breaker {
        check_breaker("circuit_breaker", breaker, &mut errors);
    }

    if errors.is_empty() {
        return Ok(());
    }
    Err(ConfigError::ValidationError(format!(
        "Configuration validation failed ({} error{}):\n  - {}",
        errors.len(),
        if errors.len() == 1 { "" } else { "s" },
        errors.join("\n  - ")
    )))
}

fn check_breaker(path: &str, breaker: &CircuitBreakerConfig, errors: &mut Vec<String>) {
    if breaker.failure_threshold < 1 {
        errors.push(format!(
            "{path}.failure_threshold must be at least 1 (got {})",
            breaker.failure_threshold
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryConfig;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&ResilienceConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_every_violation() {
        let config = ResilienceConfig {
            retry: RetryConfig {
                max_attempts: 0,
                backoff_factor: f64::NAN,
                initial_delay_ms: 5000,
                max_delay_ms: Some(1000),
                ..Default::default()
            },
            circuit_breaker: Some(CircuitBreakerConfig {
                failure_threshold: 0,
                ..Default::default()
            }),
        };

        let err = validate(&config).expect_err("config is invalid");
        let msg = err.to_string();
        assert!(msg.contains("(4 errors)"), "{msg}");
        assert!(msg.contains("retry.max_attempts"), "{msg}");
        assert!(msg.contains("retry.backoff_factor"), "{msg}");
        assert!(msg.contains("retry.max_delay_ms"), "{msg}");
        assert!(msg.contains("circuit_breaker.failure_threshold"), "{msg}");
    }

    #[test]
    fn test_uncapped_delay_is_valid() {
        let config = ResilienceConfig {
            retry: RetryConfig {
                max_delay_ms: None,
                ..Default::default()
            },
            circuit_breaker: None,
        };
        assert!(validate(&config).is_ok());
    }
}
