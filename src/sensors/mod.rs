//! Simulated incubator sensors.
//!
//! This module contains:
//! - The channel table (units, simulation parameters, alarm bands)
//! - The single-channel stochastic sensor model
//! - Threshold classification
//! - The locked six-sensor bank

pub mod alarm;
pub mod bank;
pub mod channel;
pub mod model;

// Re-export commonly used types
pub use alarm::{classify, AlarmLevel, Thresholds};
pub use bank::{SensorBank, SkippedTarget, Snapshot, TargetError, TargetReport};
pub use channel::{Channel, SensorParams, UnknownChannel, CHANNEL_COUNT};
pub use model::Sensor;
