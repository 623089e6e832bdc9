use std::time::{Duration, Instant};

/// Wall-clock cost of simulation ticks, measured against the fixed step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickTimings {
    pub ticks: u64,
    pub busy: Duration,
    pub slowest: Duration,
    /// Ticks whose update took longer than one fixed step.
    pub over_budget: u64,
}

impl TickTimings {
    pub fn record(&mut self, elapsed: Duration, budget: Duration) {
        self.ticks = self.ticks.saturating_add(1);
        self.busy = self.busy.saturating_add(elapsed);
        self.slowest = self.slowest.max(elapsed);
        if elapsed > budget {
            self.over_budget = self.over_budget.saturating_add(1);
        }
    }

    pub fn mean(&self) -> Duration {
        match u32::try_from(self.ticks) {
            Ok(0) => Duration::ZERO,
            Ok(ticks) => self.busy / ticks,
            Err(_) => Duration::from_secs_f64(self.busy.as_secs_f64() / self.ticks as f64),
        }
    }

    pub fn merge(&mut self, other: &TickTimings) {
        self.ticks = self.ticks.saturating_add(other.ticks);
        self.busy = self.busy.saturating_add(other.busy);
        self.slowest = self.slowest.max(other.slowest);
        self.over_budget = self.over_budget.saturating_add(other.over_budget);
    }

    /// Rate over `wall`; zero when no time has passed.
    pub fn ticks_per_second(&self, wall: Duration) -> f64 {
        let seconds = wall.as_secs_f64();
        if seconds <= 0.0 {
            0.0
        } else {
            self.ticks as f64 / seconds
        }
    }
}

/// One logging window of the loop: timings since the last report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct WindowReport {
    pub(crate) tps: f64,
    pub(crate) mean_tick_ms: f64,
    pub(crate) slowest_tick_ms: f64,
    pub(crate) over_budget: u64,
}

#[derive(Debug)]
pub(crate) struct TickWindow {
    started: Instant,
    interval: Duration,
    budget: Duration,
    current: TickTimings,
}

impl TickWindow {
    pub(crate) fn new(started: Instant, interval: Duration, budget: Duration) -> Self {
        Self {
            started,
            interval,
            budget,
            current: TickTimings::default(),
        }
    }

    pub(crate) fn record(&mut self, elapsed: Duration) {
        self.current.record(elapsed, self.budget);
    }

    /// Closes the window once `interval` has passed, handing back its timings
    /// for the caller to fold into the run total.
    pub(crate) fn close_if_due(&mut self, now: Instant) -> Option<(WindowReport, TickTimings)> {
        let wall = now.saturating_duration_since(self.started);
        if wall < self.interval {
            return None;
        }
        let timings = std::mem::take(&mut self.current);
        self.started = now;
        let report = WindowReport {
            tps: timings.ticks_per_second(wall),
            mean_tick_ms: timings.mean().as_secs_f64() * 1000.0,
            slowest_tick_ms: timings.slowest.as_secs_f64() * 1000.0,
            over_budget: timings.over_budget,
        };
        Some((report, timings))
    }

    /// Timings of the window still open when the loop stops.
    pub(crate) fn finish(self) -> TickTimings {
        self.current
    }
}
