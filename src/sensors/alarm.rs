//! Threshold classification of a single reading.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tri-state alarm level of one reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmLevel {
    Ok,
    Warning,
    Critical,
}

impl AlarmLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            AlarmLevel::Ok => "ok",
            AlarmLevel::Warning => "warning",
            AlarmLevel::Critical => "critical",
        }
    }

    /// Parse the lowercase form written to log rows.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ok" => Some(AlarmLevel::Ok),
            "warning" => Some(AlarmLevel::Warning),
            "critical" => Some(AlarmLevel::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for AlarmLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Warning and critical bands for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub warn_lo: f64,
    pub warn_hi: f64,
    pub crit_lo: f64,
    pub crit_hi: f64,
}

impl Thresholds {
    pub const fn new(warn_lo: f64, warn_hi: f64, crit_lo: f64, crit_hi: f64) -> Self {
        Self {
            warn_lo,
            warn_hi,
            crit_lo,
            crit_hi,
        }
    }

    pub fn classify(&self, value: f64) -> AlarmLevel {
        classify(value, self.warn_lo, self.warn_hi, self.crit_lo, self.crit_hi)
    }
}

/// Classify `value` against a warning and a critical band.
///
/// The critical band is checked first. Comparisons are strict, so a value
/// sitting exactly on a bound falls into the inner band.
pub fn classify(value: f64, warn_lo: f64, warn_hi: f64, crit_lo: f64, crit_hi: f64) -> AlarmLevel {
    if value < crit_lo || value > crit_hi {
        AlarmLevel::Critical
    } else if value < warn_lo || value > warn_hi {
        AlarmLevel::Warning
    } else {
        AlarmLevel::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::Channel;

    #[test]
    fn test_co2_bands() {
        let co2 = Channel::Co2.thresholds();
        assert_eq!(co2.classify(2.9), AlarmLevel::Critical);
        assert_eq!(co2.classify(4.0), AlarmLevel::Warning);
        assert_eq!(co2.classify(5.0), AlarmLevel::Ok);
        assert_eq!(co2.classify(7.5), AlarmLevel::Critical);
    }

    #[test]
    fn test_exact_bounds_fall_inward() {
        let co2 = Channel::Co2.thresholds();
        assert_eq!(co2.classify(3.0), AlarmLevel::Warning);
        assert_eq!(co2.classify(7.0), AlarmLevel::Warning);
        assert_eq!(co2.classify(4.5), AlarmLevel::Ok);
        assert_eq!(co2.classify(5.5), AlarmLevel::Ok);
    }

    #[test]
    fn test_critical_checked_before_warning() {
        // Degenerate band where critical sits inside warning.
        assert_eq!(classify(5.0, 0.0, 10.0, 6.0, 9.0), AlarmLevel::Critical);
    }

    #[test]
    fn test_level_strings() {
        for level in [AlarmLevel::Ok, AlarmLevel::Warning, AlarmLevel::Critical] {
            assert_eq!(AlarmLevel::parse(level.as_str()), Some(level));
        }
        assert_eq!(AlarmLevel::parse("OK"), None);
    }
}
