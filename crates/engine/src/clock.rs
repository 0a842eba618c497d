use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Monotonic time source for the frame clock.
pub trait TimeSource {
    /// Time since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

/// Real time, measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct WallClock {
    origin: Instant,
}

impl Default for WallClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl TimeSource for WallClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven time for headless runs and tests.
///
/// Clones share the same reading, so the caller keeps one and advances it
/// while the engine holds another.
#[derive(Debug, Clone, Default)]
pub struct ManualTime(Rc<Cell<Duration>>);

impl ManualTime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.0.set(self.0.get() + by);
    }

    pub fn advance_secs(&self, secs: f32) {
        self.advance(Duration::from_secs_f32(secs));
    }

    pub fn set(&self, to: Duration) {
        self.0.set(to);
    }
}

impl TimeSource for ManualTime {
    fn now(&self) -> Duration {
        self.0.get()
    }
}

/// Frame clock. Measures the time between consecutive ticks.
pub struct Clock {
    source: Box<dyn TimeSource>,
    last: Option<Duration>,
    elapsed: f64,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(WallClock::default())
    }
}

impl Clock {
    pub fn new(source: impl TimeSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            last: None,
            elapsed: 0.0,
        }
    }

    /// Start measuring from now, with elapsed time back at zero.
    pub fn start(&mut self) {
        self.elapsed = 0.0;
        self.last = Some(self.source.now());
    }

    pub fn stop(&mut self) {
        self.last = None;
    }

    /// Drop the time that passed since the last reading, so it is not
    /// reported by the next [`delta`](Self::delta).
    pub fn rebase(&mut self) {
        self.last = Some(self.source.now());
    }

    /// Seconds since the previous call, clamped to `max`.
    ///
    /// Returns 0 when the clock was not started.
    pub fn delta(&mut self, max: f32) -> f32 {
        let now = self.source.now();
        let Some(last) = self.last.replace(now) else {
            return 0.0;
        };
        let raw = now.saturating_sub(last).as_secs_f32();
        let dt = if raw > max {
            tracing::warn!(raw, max, "frame delta clamped");
            max
        } else {
            raw
        };
        self.elapsed += dt as f64;
        dt
    }

    /// Total simulated seconds handed out by [`delta`](Self::delta).
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }
}

impl std::fmt::Debug for Clock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clock")
            .field("last", &self.last)
            .field("elapsed", &self.elapsed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_measures_between_calls() {
        let time = ManualTime::new();
        let mut clock = Clock::new(time.clone());
        clock.start();
        time.advance(Duration::from_millis(16));
        let dt = clock.delta(0.1);
        assert!((dt - 0.016).abs() < 1e-6);
        assert_eq!(clock.delta(0.1), 0.0);
    }

    #[test]
    fn long_gaps_are_clamped() {
        let time = ManualTime::new();
        let mut clock = Clock::new(time.clone());
        clock.start();
        time.advance(Duration::from_secs(5));
        assert_eq!(clock.delta(0.1), 0.1);
    }

    #[test]
    fn rebase_discards_gap() {
        let time = ManualTime::new();
        let mut clock = Clock::new(time.clone());
        clock.start();
        time.advance(Duration::from_secs(3));
        clock.rebase();
        time.advance(Duration::from_millis(10));
        assert!((clock.delta(0.1) - 0.010).abs() < 1e-6);
        assert!((clock.elapsed() - 0.010).abs() < 1e-6);

        time.advance(Duration::from_millis(20));
        clock.rebase();
        clock.delta(0.1);
        assert!((clock.elapsed() - 0.010).abs() < 1e-6);
    }

    #[test]
    fn restart_resets_elapsed() {
        let time = ManualTime::new();
        let mut clock = Clock::new(time.clone());
        clock.start();
        time.advance(Duration::from_millis(50));
        clock.delta(0.1);
        assert!(clock.elapsed() > 0.0);

        clock.stop();
        time.advance(Duration::from_secs(2));
        clock.start();
        assert_eq!(clock.elapsed(), 0.0);
        time.advance(Duration::from_millis(20));
        clock.delta(0.1);
        assert!((clock.elapsed() - 0.020).abs() < 1e-6);
    }

    #[test]
    fn stopped_clock_reports_zero() {
        let time = ManualTime::new();
        let mut clock = Clock::new(time.clone());
        time.advance(Duration::from_secs(1));
        assert_eq!(clock.delta(0.1), 0.0);
        clock.start();
        clock.stop();
        time.advance(Duration::from_secs(1));
        assert_eq!(clock.delta(0.1), 0.0);
    }
}
