//! The six-sensor bank and its locking discipline.
//!
//! Every multi-sensor operation runs under one lock, so a snapshot is always
//! a single serialized pass over all channels. Polling and the logger's
//! periodic read contend on this lock; the critical sections never await or
//! touch the filesystem.

use crate::sensors::channel::{Channel, UnknownChannel, CHANNEL_COUNT};
use crate::sensors::model::Sensor;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

/// Values and targets captured in one locked pass, in channel order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    values: [f64; CHANNEL_COUNT],
    targets: [f64; CHANNEL_COUNT],
}

impl Snapshot {
    pub fn new(values: [f64; CHANNEL_COUNT], targets: [f64; CHANNEL_COUNT]) -> Self {
        Self { values, targets }
    }

    pub fn value(&self, channel: Channel) -> f64 {
        self.values[channel.index()]
    }

    pub fn target(&self, channel: Channel) -> f64 {
        self.targets[channel.index()]
    }

    pub fn values(&self) -> &[f64; CHANNEL_COUNT] {
        &self.values
    }

    /// `(channel, value)` pairs in bank order.
    pub fn iter(&self) -> impl Iterator<Item = (Channel, f64)> + '_ {
        Channel::ALL.into_iter().map(|c| (c, self.value(c)))
    }
}

/// Why a single target field was not applied.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TargetError {
    #[error(transparent)]
    UnknownChannel(#[from] UnknownChannel),
    #[error("{channel}: target must be a finite number")]
    NotFinite { channel: Channel },
    #[error("{channel}: target {value} outside sensor range [{min}, {max}]")]
    OutOfRange {
        channel: Channel,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// A target field that was skipped, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedTarget {
    pub field: String,
    pub reason: String,
}

/// Outcome of a partial target update.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TargetReport {
    pub applied: Vec<Channel>,
    pub skipped: Vec<SkippedTarget>,
}

impl TargetReport {
    /// Record a field rejected before it reached the bank.
    pub fn skip(&mut self, field: impl Into<String>, reason: impl ToString) {
        self.skipped.push(SkippedTarget {
            field: field.into(),
            reason: reason.to_string(),
        });
    }
}

struct BankState {
    sensors: [Sensor; CHANNEL_COUNT],
    rng: StdRng,
}

impl BankState {
    fn targets(&self) -> [f64; CHANNEL_COUNT] {
        self.sensors.each_ref().map(Sensor::target)
    }
}

/// Named collection of the six simulated sensors.
pub struct SensorBank {
    state: Mutex<BankState>,
}

impl SensorBank {
    /// Bank with every channel at its starting parameters and an entropy-seeded RNG.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Bank with a reproducible noise sequence.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let sensors = Channel::ALL.map(|c| Sensor::new(c.params()));
        Self {
            state: Mutex::new(BankState { sensors, rng }),
        }
    }

    /// Advance every sensor once, in channel order, under one lock.
    pub fn read_all(&self) -> Snapshot {
        let mut guard = self.state.lock();
        let BankState { sensors, rng } = &mut *guard;
        let mut values = [0.0; CHANNEL_COUNT];
        for (slot, sensor) in values.iter_mut().zip(sensors.iter_mut()) {
            *slot = sensor.read(rng);
        }
        Snapshot::new(values, guard.targets())
    }

    /// Current values without advancing the simulation.
    pub fn peek_all(&self) -> Snapshot {
        let guard = self.state.lock();
        Snapshot::new(guard.sensors.each_ref().map(Sensor::current), guard.targets())
    }

    /// Set one channel's target by name.
    pub fn set_target(&self, channel: &str, value: f64) -> Result<(), TargetError> {
        let channel: Channel = channel.parse()?;
        let mut guard = self.state.lock();
        Self::apply(&mut guard, channel, value)
    }

    /// Apply a batch of target updates under one lock.
    ///
    /// Each field is validated on its own: invalid fields are reported as
    /// skipped and the rest still apply.
    pub fn set_targets(&self, updates: &[(Channel, f64)]) -> TargetReport {
        let mut report = TargetReport::default();
        let mut guard = self.state.lock();
        for &(channel, value) in updates {
            match Self::apply(&mut guard, channel, value) {
                Ok(()) => report.applied.push(channel),
                Err(e) => report.skip(channel.name(), e),
            }
        }
        report
    }

    fn apply(state: &mut BankState, channel: Channel, value: f64) -> Result<(), TargetError> {
        if !value.is_finite() {
            return Err(TargetError::NotFinite { channel });
        }
        let sensor = &mut state.sensors[channel.index()];
        let (min, max) = sensor.limits();
        if value < min || value > max {
            return Err(TargetError::OutOfRange {
                channel,
                value,
                min,
                max,
            });
        }
        sensor.set_target(value);
        Ok(())
    }
}

impl Default for SensorBank {
    fn default() -> Self {
        Self::new()
    }
}
