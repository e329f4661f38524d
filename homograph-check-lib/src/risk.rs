//! Age-based risk classification.

use crate::types::RiskLevel;
use chrono::{DateTime, Utc};

const SECONDS_PER_YEAR: f64 = 365.25 * 24.0 * 60.0 * 60.0;

/// Classify a registration age against the trust threshold.
///
/// Intervals are half-open:
///
/// | age | level |
/// |---|---|
/// | absent | `Unknown` |
/// | `age < t` | `High` |
/// | `t <= age < 2t` | `Medium` |
/// | `age >= 2t` | `Low` |
pub fn classify(age_years: Option<f64>, threshold_years: f64) -> RiskLevel {
    match age_years {
        None => RiskLevel::Unknown,
        Some(age) if age < threshold_years => RiskLevel::High,
        Some(age) if age < 2.0 * threshold_years => RiskLevel::Medium,
        Some(_) => RiskLevel::Low,
    }
}

/// Years elapsed between `created_at` and `now`, using Julian years.
///
/// A creation date in the future yields a negative age, which classifies as
/// `High`.
pub fn age_in_years(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - created_at).num_seconds() as f64 / SECONDS_PER_YEAR
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_boundaries_are_half_open() {
        let t = 2.0;
        assert_eq!(classify(Some(t - 0.01), t), RiskLevel::High);
        assert_eq!(classify(Some(t), t), RiskLevel::Medium);
        assert_eq!(classify(Some(2.0 * t - 0.01), t), RiskLevel::Medium);
        assert_eq!(classify(Some(2.0 * t), t), RiskLevel::Low);
        assert_eq!(classify(None, t), RiskLevel::Unknown);
    }

    #[test]
    fn test_boundaries_hold_for_other_thresholds() {
        for t in [0.5, 1.0, 3.0, 10.0] {
            assert_eq!(classify(Some(t - 0.01), t), RiskLevel::High);
            assert_eq!(classify(Some(t), t), RiskLevel::Medium);
            assert_eq!(classify(Some(2.0 * t), t), RiskLevel::Low);
        }
    }

    #[test]
    fn test_zero_threshold_is_never_high() {
        assert_eq!(classify(Some(0.0), 0.0), RiskLevel::Low);
        assert_eq!(classify(Some(-0.1), 0.0), RiskLevel::High);
    }

    #[test]
    fn test_age_in_years() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let created = now - Duration::days(365);
        let age = age_in_years(created, now);
        assert!(age > 0.99 && age < 1.0);
        assert_eq!(classify(Some(age), 2.0), RiskLevel::High);

        let future = now + Duration::days(30);
        assert!(age_in_years(future, now) < 0.0);
    }
}
