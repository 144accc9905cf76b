use std::time::Instant;

/// Timing fields stamped on a recorded event, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stamp {
    pub since_start: f64,
    pub since_previous: f64,
}

/// Monotonic elapsed-time tracker for a recording
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
    previous: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self {
            start,
            previous: start,
        }
    }

    /// Stamp an event happening now and make it the previous event
    pub fn tick(&mut self) -> Stamp {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> Stamp {
        let stamp = Stamp {
            since_start: now.saturating_duration_since(self.start).as_secs_f64(),
            since_previous: now.saturating_duration_since(self.previous).as_secs_f64(),
        };
        self.previous = now;
        stamp
    }
}
