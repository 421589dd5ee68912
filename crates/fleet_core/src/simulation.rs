//! Route progression for one vehicle.
//!
//! A [`Simulation`] walks a route segment by segment. Each call to
//! [`Simulation::advance`] is one tick: it moves the in-segment counter forward
//! by one and reports where the vehicle is now. Progress is derived from whole
//! tick counts (`step / ticks_per_segment`), so a segment always completes in
//! exactly `ticks_per_segment` ticks and the last stop is reached after
//! `(stops - 1) * ticks_per_segment` ticks, with no accumulated float error.

use std::sync::Arc;

use crate::geo::{bearing, interpolate, Coordinate};
use crate::routing::Route;

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Somewhere inside the current segment.
    Moved { position: Coordinate, heading: f64 },
    /// Exactly on an intermediate stop, now heading down the next segment.
    ReachedStop {
        stop_index: usize,
        position: Coordinate,
        heading: f64,
    },
    /// On the final stop. The route is finished.
    Completed { position: Coordinate, heading: f64 },
}

impl TickOutcome {
    pub fn position(&self) -> Coordinate {
        match *self {
            TickOutcome::Moved { position, .. }
            | TickOutcome::ReachedStop { position, .. }
            | TickOutcome::Completed { position, .. } => position,
        }
    }

    pub fn heading(&self) -> f64 {
        match *self {
            TickOutcome::Moved { heading, .. }
            | TickOutcome::ReachedStop { heading, .. }
            | TickOutcome::Completed { heading, .. } => heading,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, TickOutcome::Completed { .. })
    }
}

#[derive(Debug, Clone)]
pub struct Simulation {
    route: Arc<Route>,
    /// Index of the stop the vehicle is departing from.
    segment_index: usize,
    /// Ticks consumed in the current segment, `0..ticks_per_segment`.
    step: u32,
    ticks_per_segment: u32,
}

impl Simulation {
    /// Starts at the first stop. `route` must hold at least two stops.
    pub fn new(route: Arc<Route>, ticks_per_segment: u32) -> Self {
        Self {
            route,
            segment_index: 0,
            step: 0,
            ticks_per_segment: ticks_per_segment.max(1),
        }
    }

    pub fn route(&self) -> &Arc<Route> {
        &self.route
    }

    pub fn segment_index(&self) -> usize {
        self.segment_index
    }

    /// Fraction of the current segment traversed, in `[0, 1)`.
    pub fn progress(&self) -> f64 {
        f64::from(self.step) / f64::from(self.ticks_per_segment)
    }

    pub fn is_finished(&self) -> bool {
        self.segment_index >= self.route.segment_count()
    }

    /// Position and heading before the first tick: on the first stop, facing the second.
    pub fn start(&self) -> (Coordinate, f64) {
        match self.route.segment(0) {
            Some((from, to)) => (from, bearing(from, to)),
            None => (
                self.route
                    .first_stop()
                    .map(|s| s.coordinate)
                    .unwrap_or_default(),
                0.0,
            ),
        }
    }

    /// Advances one tick.
    pub fn advance(&mut self) -> TickOutcome {
        if self.is_finished() {
            return self.completed();
        }
        let Some((from, to)) = self.route.segment(self.segment_index) else {
            return self.completed();
        };

        self.step += 1;
        if self.step < self.ticks_per_segment {
            return TickOutcome::Moved {
                position: interpolate(from, to, self.progress()),
                heading: bearing(from, to),
            };
        }

        self.segment_index += 1;
        self.step = 0;
        match self.route.segment(self.segment_index) {
            Some((stop, next)) => TickOutcome::ReachedStop {
                stop_index: self.segment_index,
                position: stop,
                heading: bearing(stop, next),
            },
            None => self.completed(),
        }
    }

    fn completed(&self) -> TickOutcome {
        let last = self.route.segment_count().saturating_sub(1);
        match self.route.segment(last) {
            Some((from, to)) => TickOutcome::Completed {
                position: to,
                heading: bearing(from, to),
            },
            None => TickOutcome::Completed {
                position: self.start().0,
                heading: 0.0,
            },
        }
    }
}
