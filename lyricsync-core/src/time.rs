//! Time and duration conversion utilities.
//!
//! Lyric times are carried as `f64` seconds. Grouping and matching by start
//! time happens on whole milliseconds so that values parsed from different
//! textual forms (`.5`, `.50`, `.500`) compare equal.

use std::time::Duration;

/// Extension trait for safe Duration conversions.
pub trait DurationExt {
    /// Convert duration to milliseconds as u64, saturating at `u64::MAX`.
    fn as_millis_u64(&self) -> u64;

    /// Convert duration to seconds as u32, saturating at `u32::MAX`.
    ///
    /// In practice, this is always safe for audio tracks because
    /// `u32::MAX` seconds is approximately 136 years.
    fn as_secs_u32(&self) -> u32;
}

impl DurationExt for Duration {
    fn as_millis_u64(&self) -> u64 {
        u64::try_from(self.as_millis()).unwrap_or(u64::MAX)
    }

    fn as_secs_u32(&self) -> u32 {
        u32::try_from(self.as_secs()).unwrap_or(u32::MAX)
    }
}

/// Millisecond key for a time in seconds, used to group and match lines.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn millis_key(seconds: f64) -> i64 {
    (seconds * 1000.0).round() as i64
}

/// Shift a time by a signed number of seconds, clamping at zero.
#[must_use]
pub fn shift_clamped(seconds: f64, delta: f64) -> f64 {
    (seconds + delta).max(0.0)
}

/// Convert a millisecond count into seconds.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn millis_to_secs(millis: i64) -> f64 {
    millis as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_millis_u64() {
        let duration = Duration::from_millis(1234);
        assert_eq!(duration.as_millis_u64(), 1234);
    }

    #[test]
    fn test_as_millis_u64_zero() {
        assert_eq!(Duration::ZERO.as_millis_u64(), 0);
    }

    #[test]
    fn test_as_secs_u32() {
        let duration = Duration::from_secs(300);
        assert_eq!(duration.as_secs_u32(), 300);
    }

    #[test]
    fn test_as_secs_u32_large() {
        // Duration larger than u32::MAX seconds
        let duration = Duration::from_secs(u64::from(u32::MAX) + 1);
        assert_eq!(duration.as_secs_u32(), u32::MAX);
    }

    #[test]
    fn test_millis_key_equates_fraction_forms() {
        assert_eq!(millis_key(1.5), 1500);
        assert_eq!(millis_key(1.50), millis_key(1.500));
        // 0.1 + 0.2 style rounding noise collapses to the same key
        assert_eq!(millis_key(0.1 + 0.2), millis_key(0.3));
    }

    #[test]
    fn test_shift_clamped_never_negative() {
        assert!((shift_clamped(1.0, -0.25) - 0.75).abs() < 1e-9);
        assert!(shift_clamped(0.2, -1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_millis_to_secs() {
        assert!((millis_to_secs(2500) - 2.5).abs() < f64::EPSILON);
    }
}
