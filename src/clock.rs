//! Time sources: the per-frame simulation clock and wall-clock readers.

use std::cell::Cell;


/// Milliseconds on a monotonic wall clock.
pub trait WallClock {
	fn now_ms(&self) -> f64;
}

/// `performance.now()` in the browser.
pub struct PerformanceClock {
	performance: web_sys::Performance,
}

impl PerformanceClock {
	pub fn new(performance: web_sys::Performance) -> Self {
		Self { performance }
	}
}

impl WallClock for PerformanceClock {
	fn now_ms(&self) -> f64 {
		self.performance.now()
	}
}

/// A clock that only moves when told to. Used by the headless runner and
/// tests.
#[derive(Default, Debug)]
pub struct ManualClock {
	now: Cell<f64>,
}

impl ManualClock {
	pub fn new(start_ms: f64) -> Self {
		Self { now: Cell::new(start_ms) }
	}

	pub fn advance(&self, ms: f64) {
		self.now.set(self.now.get() + ms);
	}
}

impl WallClock for ManualClock {
	fn now_ms(&self) -> f64 {
		self.now.get()
	}
}


/// Turns successive frame timestamps into `(dt, t)` in seconds. The first
/// tick reports `dt = 0`.
#[derive(Debug, Clone)]
pub struct FrameClock {
	start_ms: f64,
	last_ms: f64,
}

impl FrameClock {
	pub fn new(now_ms: f64) -> Self {
		Self {
			start_ms: now_ms,
			last_ms: now_ms,
		}
	}

	pub fn tick(&mut self, now_ms: f64) -> (f32, f32) {
		let dt = ((now_ms - self.last_ms).max(0.0) / 1000.0) as f32;
		self.last_ms = now_ms;
		let t = ((now_ms - self.start_ms) / 1000.0) as f32;
		(dt, t)
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn frame_clock_reports_seconds() {
		let mut clock = FrameClock::new(1000.0);
		assert_eq!(clock.tick(1000.0), (0.0, 0.0));
		assert_eq!(clock.tick(1500.0), (0.5, 0.5));
		assert_eq!(clock.tick(1750.0), (0.25, 0.75));
	}

	#[test]
	fn frame_clock_never_runs_backwards() {
		let mut clock = FrameClock::new(1000.0);
		clock.tick(2000.0);
		let (dt, _) = clock.tick(1900.0);
		assert_eq!(dt, 0.0);
	}

	#[test]
	fn manual_clock_advances() {
		let clock = ManualClock::new(10.0);
		clock.advance(590.0);
		assert_eq!(clock.now_ms(), 600.0);
	}
}
