//! Exponential backoff with jitter

use rand::Rng;
use std::time::Duration;

use super::policy::RetryConfig;

/// Jitter spread around the computed delay (±25%).
const JITTER_SPREAD: f64 = 0.25;

/// Delay to wait after the failed `attempt` (1-based).
///
/// `initial_delay_ms * backoff_factor^(attempt - 1)`, capped at `max_delay_ms`,
/// then multiplied by a uniform factor in `[0.75, 1.25]` when jitter is on.
/// Without jitter the result depends only on `(attempt, config)`.
/// `None` uses `RetryConfig::default()`.
pub fn calculate_delay(attempt: u32, config: Option<&RetryConfig>) -> Duration {
    match config {
        Some(config) => delay_for(attempt, config),
        None => delay_for(attempt, &RetryConfig::default()),
    }
}

fn delay_for(attempt: u32, config: &RetryConfig) -> Duration {
    let mut delay_ms = base_delay_ms(attempt, config);
    if config.jitter {
        delay_ms = apply_jitter(delay_ms);
    }
    millis_to_duration(delay_ms)
}

fn base_delay_ms(attempt: u32, config: &RetryConfig) -> f64 {
    let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
    let base = config.initial_delay_ms as f64 * config.backoff_factor.powi(exponent);
    match config.max_delay_ms {
        Some(max) => base.min(max as f64),
        None => base,
    }
}

fn apply_jitter(delay_ms: f64) -> f64 {
    let factor = rand::rng().random_range((1.0 - JITTER_SPREAD)..=(1.0 + JITTER_SPREAD));
    delay_ms * factor
}

// Negative and NaN clamp to zero; overflow saturates.
fn millis_to_duration(delay_ms: f64) -> Duration {
    if delay_ms.is_nan() || delay_ms <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_millis(delay_ms as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn fixed(max_delay_ms: Option<u64>) -> RetryConfig {
        RetryConfig {
            initial_delay_ms: 1000,
            backoff_factor: 2.0,
            max_delay_ms,
            jitter: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_exponential_progression() {
        let config = fixed(None);
        let delays: Vec<u128> = (1..=4)
            .map(|attempt| calculate_delay(attempt, Some(&config)).as_millis())
            .collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000]);
    }

    #[test]
    fn test_delay_capped_at_max() {
        let config = fixed(Some(5000));
        assert_eq!(calculate_delay(3, Some(&config)), Duration::from_millis(4000));
        assert_eq!(calculate_delay(4, Some(&config)), Duration::from_millis(5000));
        assert_eq!(calculate_delay(5, Some(&config)), Duration::from_millis(5000));
        assert_eq!(calculate_delay(40, Some(&config)), Duration::from_millis(5000));
    }

    #[test]
    fn test_jitter_stays_within_quarter() {
        let config = RetryConfig {
            jitter: true,
            ..fixed(None)
        };

        let mut seen = HashSet::new();
        for _ in 0..200 {
            let ms = calculate_delay(2, Some(&config)).as_millis();
            assert!(
                (1500..=2500).contains(&ms),
                "Jittered value {ms} out of range [1500, 2500]"
            );
            seen.insert(ms);
        }
        assert!(seen.len() > 1, "jitter should produce distinct values");
    }

    #[test]
    fn test_never_negative() {
        let configs = [
            fixed(None),
            fixed(Some(0)),
            RetryConfig {
                initial_delay_ms: 0,
                ..fixed(None)
            },
            RetryConfig {
                backoff_factor: 0.5,
                jitter: true,
                ..fixed(None)
            },
        ];
        for config in &configs {
            for attempt in 0..=20 {
                // Duration cannot be negative; make sure nothing panics or wraps.
                let delay = calculate_delay(attempt, Some(config));
                assert!(delay <= Duration::from_millis(1000 * 2u64.pow(20)));
            }
        }
    }

    #[test]
    fn test_attempt_zero_treated_as_first() {
        let config = fixed(None);
        assert_eq!(calculate_delay(0, Some(&config)), Duration::from_millis(1000));
    }

    #[test]
    fn test_uncapped_overflow_saturates() {
        let config = fixed(None);
        let delay = calculate_delay(u32::MAX, Some(&config));
        assert_eq!(delay, Duration::from_millis(u64::MAX));
    }

    #[test]
    fn test_default_config_used_when_absent() {
        for _ in 0..50 {
            let ms = calculate_delay(1, None).as_millis();
            assert!((750..=1250).contains(&ms), "default first delay {ms}");
        }
    }
}
