use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FleetError, FleetResult};

/// Default tick period (10 updates per second).
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;

/// Default ticks per segment; a progress increment of 0.05.
pub const DEFAULT_TICKS_PER_SEGMENT: u32 = 20;

/// Simulator tuning. Progress is counted in whole ticks so trajectories do not
/// depend on timer jitter: a segment always takes exactly `ticks_per_segment`
/// ticks, whatever the wall-clock spacing between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Period of each vehicle's tick task, in milliseconds.
    pub tick_interval_ms: u64,
    /// Number of ticks needed to traverse one segment between two stops.
    pub ticks_per_segment: u32,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            ticks_per_segment: DEFAULT_TICKS_PER_SEGMENT,
        }
    }
}

impl SimulatorConfig {
    pub fn with_tick_interval_ms(mut self, ms: u64) -> Self {
        self.tick_interval_ms = ms;
        self
    }

    pub fn with_ticks_per_segment(mut self, ticks: u32) -> Self {
        self.ticks_per_segment = ticks;
        self
    }

    pub fn validate(&self) -> FleetResult<()> {
        if self.tick_interval_ms == 0 {
            return Err(FleetError::InvalidConfig(
                "tick_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.ticks_per_segment == 0 {
            return Err(FleetError::InvalidConfig(
                "ticks_per_segment must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Fraction of a segment covered per tick.
    pub fn progress_increment(&self) -> f64 {
        1.0 / f64::from(self.ticks_per_segment.max(1))
    }
}
