//! Motion simulator - position, velocity and temperature per tick

use std::time::Duration;

use serde::{Deserialize, Serialize};

use rover_core::{
    Direction, RoverError, RoverResult, TelemetryRecord, TEMPERATURE_MAX, TEMPERATURE_MIN,
};
use rover_wire::scan_commands;

/// Motion simulator configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Speed set by a direction command (degrees per tick)
    pub step: f64,
    /// Half-width of the square the platform may roam (degrees)
    pub max_offset: f64,
    /// Temperature increase per tick
    pub temperature_step: f64,
    /// Temperature saturation point
    pub temperature_ceiling: f64,
    /// Tick interval
    #[serde(with = "rover_core::duration")]
    pub tick: Duration,
}

impl Default for MotionConfig {
    fn default() -> Self {
        MotionConfig {
            step: 0.0001,
            max_offset: 0.005,
            temperature_step: 0.01,
            temperature_ceiling: TEMPERATURE_MAX,
            tick: Duration::from_millis(100),
        }
    }
}

impl MotionConfig {
    pub fn validate(&self) -> RoverResult<()> {
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(RoverError::Config(format!(
                "step must be positive, got {}",
                self.step
            )));
        }
        if !(self.max_offset.is_finite() && self.max_offset >= 0.0) {
            return Err(RoverError::Config(format!(
                "max_offset must be non-negative, got {}",
                self.max_offset
            )));
        }
        if !(self.temperature_step.is_finite() && self.temperature_step >= 0.0) {
            return Err(RoverError::Config(format!(
                "temperature_step must be non-negative, got {}",
                self.temperature_step
            )));
        }
        if !(TEMPERATURE_MIN..=TEMPERATURE_MAX).contains(&self.temperature_ceiling) {
            return Err(RoverError::Config(format!(
                "temperature_ceiling must lie in [{}, {}], got {}",
                TEMPERATURE_MIN, TEMPERATURE_MAX, self.temperature_ceiling
            )));
        }
        if self.tick.is_zero() {
            return Err(RoverError::Config("tick must be non-zero".into()));
        }
        Ok(())
    }
}

/// Motion simulator
///
/// INVARIANT: after every tick, each axis of the position lies within
/// `origin ± max_offset`; an axis that hit the bound has zero velocity.
#[derive(Clone, Debug)]
pub struct MotionSimulator {
    config: MotionConfig,
    /// Starting point, fixed for the life of the simulator
    origin: TelemetryRecord,
    /// Live record, mutated every tick
    current: TelemetryRecord,
    velocity_lat: f64,
    velocity_lon: f64,
    direction: Direction,
    ticks: u64,
}

impl MotionSimulator {
    /// Start at the default record
    pub fn new(config: MotionConfig) -> Self {
        Self::with_origin(TelemetryRecord::default(), config)
    }

    /// Start at an arbitrary record
    pub fn with_origin(origin: TelemetryRecord, config: MotionConfig) -> Self {
        MotionSimulator {
            config,
            origin,
            current: origin,
            velocity_lat: 0.0,
            velocity_lon: 0.0,
            direction: Direction::default(),
            ticks: 0,
        }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    pub fn origin(&self) -> TelemetryRecord {
        self.origin
    }

    pub fn current(&self) -> TelemetryRecord {
        self.current
    }

    /// Velocity as (lat, lon) degrees per tick
    pub fn velocity(&self) -> (f64, f64) {
        (self.velocity_lat, self.velocity_lon)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Start moving in a direction at the configured step
    ///
    /// The other axis stops.
    pub fn apply_command(&mut self, direction: Direction) {
        let (lat, lon) = direction.unit();
        self.velocity_lat = lat * self.config.step;
        self.velocity_lon = lon * self.config.step;
        self.direction = direction;
        tracing::debug!(%direction, "heading changed");
    }

    /// Apply every command token found in a received chunk, in order
    ///
    /// Returns how many were applied.
    pub fn handle_chunk(&mut self, chunk: &str) -> usize {
        let mut applied = 0;
        for direction in scan_commands(chunk) {
            self.apply_command(direction);
            applied += 1;
        }
        if applied == 0 {
            tracing::debug!(chunk, "no command tokens in chunk");
        }
        applied
    }

    /// Advance one tick and return the updated record
    pub fn tick(&mut self) -> TelemetryRecord {
        let max = self.config.max_offset;

        self.current.latitude += self.velocity_lat;
        let lat_hit = Self::clamp_axis(&mut self.current.latitude, self.origin.latitude, max);
        if let Some(bound) = lat_hit {
            self.velocity_lat = 0.0;
            tracing::debug!(bound, "latitude boundary reached");
        }

        self.current.longitude += self.velocity_lon;
        let lon_hit = Self::clamp_axis(&mut self.current.longitude, self.origin.longitude, max);
        if let Some(bound) = lon_hit {
            self.velocity_lon = 0.0;
            tracing::debug!(bound, "longitude boundary reached");
        }

        self.current.temperature = (self.current.temperature + self.config.temperature_step)
            .min(self.config.temperature_ceiling)
            .max(TEMPERATURE_MIN);

        self.ticks += 1;
        self.current
    }

    /// Return to the origin at rest
    pub fn reset(&mut self) {
        self.current = self.origin;
        self.velocity_lat = 0.0;
        self.velocity_lon = 0.0;
        self.direction = Direction::default();
        self.ticks = 0;
    }

    /// Clamp one axis into `center ± max`, returning the bound if it was hit
    fn clamp_axis(value: &mut f64, center: f64, max: f64) -> Option<f64> {
        let (lo, hi) = (center - max, center + max);
        if *value > hi {
            *value = hi;
            Some(hi)
        } else if *value < lo {
            *value = lo;
            Some(lo)
        } else {
            None
        }
    }
}
