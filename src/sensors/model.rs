//! Single-channel mean-reverting sensor simulation.

use crate::sensors::channel::SensorParams;
use rand::Rng;

/// Fraction of the distance to target covered on each read.
pub const REVERSION_RATE: f64 = 0.05;

/// A simulated sensor whose value drifts toward a target with bounded noise.
///
/// Not synchronized on its own; [`SensorBank`](crate::sensors::SensorBank)
/// holds every sensor behind one lock.
#[derive(Debug, Clone)]
pub struct Sensor {
    value: f64,
    target: f64,
    noise_scale: f64,
    min: f64,
    max: f64,
}

impl Sensor {
    pub fn new(params: SensorParams) -> Self {
        Self {
            value: params.initial.clamp(params.min, params.max),
            target: params.target,
            noise_scale: params.noise_scale,
            min: params.min,
            max: params.max,
        }
    }

    /// Advance the simulation one step and return the new value.
    ///
    /// Noise is drawn uniformly from `[-noise_scale, noise_scale]`.
    pub fn read<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f64 {
        let noise = if self.noise_scale > 0.0 {
            rng.gen_range(-self.noise_scale..=self.noise_scale)
        } else {
            0.0
        };
        let next = self.value + (self.target - self.value) * REVERSION_RATE + noise;
        self.value = next.clamp(self.min, self.max);
        self.value
    }

    /// Last computed value.
    pub fn current(&self) -> f64 {
        self.value
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    /// Replace the target; takes effect on the next [`read`](Self::read).
    pub fn set_target(&mut self, target: f64) {
        self.target = target;
    }

    pub fn limits(&self) -> (f64, f64) {
        (self.min, self.max)
    }
}
