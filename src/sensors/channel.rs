//! The six incubator channels and their fixed parameters.

use crate::sensors::alarm::Thresholds;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of simulated channels.
pub const CHANNEL_COUNT: usize = 6;

/// One environmental measurement channel.
///
/// The declaration order is the fixed order used for bank reads, report
/// output and CSV columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Temperature,
    Humidity,
    Co2,
    O2,
    Pressure,
    Ph,
}

/// Simulation parameters a sensor is created with at process start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorParams {
    pub initial: f64,
    pub target: f64,
    pub noise_scale: f64,
    pub min: f64,
    pub max: f64,
}

impl Channel {
    /// All channels in bank order.
    pub const ALL: [Channel; CHANNEL_COUNT] = [
        Channel::Temperature,
        Channel::Humidity,
        Channel::Co2,
        Channel::O2,
        Channel::Pressure,
        Channel::Ph,
    ];

    /// Position of this channel in bank order.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Name used in requests and reports.
    pub fn name(self) -> &'static str {
        match self {
            Channel::Temperature => "temperature",
            Channel::Humidity => "humidity",
            Channel::Co2 => "co2",
            Channel::O2 => "o2",
            Channel::Pressure => "pressure",
            Channel::Ph => "ph",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Channel::Temperature => "C",
            Channel::Humidity => "%RH",
            Channel::Co2 => "%",
            Channel::O2 => "%",
            Channel::Pressure => "mbar",
            Channel::Ph => "pH",
        }
    }

    /// Value column name in the CSV header.
    pub fn value_column(self) -> &'static str {
        match self {
            Channel::Temperature => "temperature_C",
            Channel::Humidity => "humidity_pct",
            Channel::Co2 => "co2_pct",
            Channel::O2 => "o2_pct",
            Channel::Pressure => "pressure_mbar",
            Channel::Ph => "ph",
        }
    }

    /// Alarm column name in the CSV header.
    pub fn alarm_column(self) -> &'static str {
        match self {
            Channel::Temperature => "temp_alarm",
            Channel::Humidity => "humidity_alarm",
            Channel::Co2 => "co2_alarm",
            Channel::O2 => "o2_alarm",
            Channel::Pressure => "pressure_alarm",
            Channel::Ph => "ph_alarm",
        }
    }

    /// Fixed alarm band for this channel.
    pub fn thresholds(self) -> Thresholds {
        match self {
            Channel::Temperature => Thresholds::new(36.5, 37.5, 35.0, 39.0),
            Channel::Humidity => Thresholds::new(90.0, 98.0, 80.0, 99.9),
            Channel::Co2 => Thresholds::new(4.5, 5.5, 3.0, 7.0),
            Channel::O2 => Thresholds::new(19.0, 22.0, 15.0, 24.0),
            Channel::Pressure => Thresholds::new(1005.0, 1020.0, 950.0, 1050.0),
            Channel::Ph => Thresholds::new(7.2, 7.6, 6.8, 7.8),
        }
    }

    /// Starting state of the simulated sensor.
    pub fn params(self) -> SensorParams {
        let (initial, target, noise_scale, min, max) = match self {
            Channel::Temperature => (36.5, 37.0, 0.04, 30.0, 45.0),
            Channel::Humidity => (93.0, 95.0, 0.15, 60.0, 100.0),
            Channel::Co2 => (4.8, 5.0, 0.05, 0.0, 20.0),
            Channel::O2 => (20.8, 21.0, 0.08, 0.0, 25.0),
            Channel::Pressure => (1012.0, 1013.0, 0.30, 900.0, 1100.0),
            Channel::Ph => (7.38, 7.4, 0.008, 6.0, 8.0),
        };
        SensorParams {
            initial,
            target,
            noise_scale,
            min,
            max,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a channel name is not one of the six known names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown channel: {0}")]
pub struct UnknownChannel(pub String);

impl FromStr for Channel {
    type Err = UnknownChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| UnknownChannel(s.to_string()))
    }
}
