use std::cell::Cell;
use std::rc::Rc;

/// Monotonic time source measured in seconds from an arbitrary origin.
pub trait TimeSource {
    fn now(&self) -> f64;
}

/// Time of one animation tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    pub elapsed: f64,
    pub delta: f64,
}

/// Frame clock; starts counting on the first tick so the first elapsed time is zero.
pub struct FrameClock {
    source: Box<dyn TimeSource>,
    start: Option<f64>,
    last_elapsed: f64,
}

impl FrameClock {
    pub fn new(source: Box<dyn TimeSource>) -> Self {
        Self {
            source,
            start: None,
            last_elapsed: 0.0,
        }
    }

    /// Clock backed by the platform's monotonic timer.
    pub fn system() -> Self {
        Self::new(Box::new(SystemTime::new()))
    }

    pub fn last_elapsed(&self) -> f64 {
        self.last_elapsed
    }

    /// Reads the elapsed time, derives the delta and records the new elapsed value.
    pub fn tick(&mut self) -> FrameTime {
        let now = self.source.now();
        let start = *self.start.get_or_insert(now);
        // A source that steps backwards must never yield a negative delta.
        let elapsed = (now - start).max(self.last_elapsed);
        let delta = elapsed - self.last_elapsed;
        self.last_elapsed = elapsed;
        FrameTime { elapsed, delta }
    }
}

impl std::fmt::Debug for FrameClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameClock")
            .field("start", &self.start)
            .field("last_elapsed", &self.last_elapsed)
            .finish()
    }
}

/// Hand-driven time source for headless runs and tests.
#[derive(Debug, Clone, Default)]
pub struct ManualTime {
    now: Rc<Cell<f64>>,
}

impl ManualTime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, seconds: f64) {
        self.now.set(self.now.get() + seconds.max(0.0));
    }

    pub fn set(&self, seconds: f64) {
        self.now.set(seconds);
    }
}

impl TimeSource for ManualTime {
    fn now(&self) -> f64 {
        self.now.get()
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub struct SystemTime {
    origin: std::time::Instant,
}

#[cfg(not(target_arch = "wasm32"))]
impl SystemTime {
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl TimeSource for SystemTime {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// `performance.now()` on the web, where `std::time::Instant` is unavailable.
#[cfg(target_arch = "wasm32")]
pub struct SystemTime {
    performance: Option<web_sys::Performance>,
}

#[cfg(target_arch = "wasm32")]
impl SystemTime {
    pub fn new() -> Self {
        Self {
            performance: web_sys::window().and_then(|window| window.performance()),
        }
    }
}

#[cfg(target_arch = "wasm32")]
impl TimeSource for SystemTime {
    fn now(&self) -> f64 {
        self.performance
            .as_ref()
            .map(|performance| performance.now() / 1000.0)
            .unwrap_or_else(|| js_sys::Date::now() / 1000.0)
    }
}

impl Default for SystemTime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_starts_at_zero() {
        let time = ManualTime::new();
        time.set(12.5);
        let mut clock = FrameClock::new(Box::new(time.clone()));
        let frame = clock.tick();
        assert_eq!(frame.elapsed, 0.0);
        assert_eq!(frame.delta, 0.0);
    }

    #[test]
    fn delta_is_difference_of_elapsed_times() {
        let time = ManualTime::new();
        let mut clock = FrameClock::new(Box::new(time.clone()));
        clock.tick();
        time.advance(0.25);
        let frame = clock.tick();
        assert_eq!(frame.elapsed, 0.25);
        assert_eq!(frame.delta, 0.25);
        time.advance(0.5);
        let frame = clock.tick();
        assert_eq!(frame.elapsed, 0.75);
        assert_eq!(frame.delta, 0.5);
        assert_eq!(clock.last_elapsed(), 0.75);
    }

    #[test]
    fn backwards_source_never_yields_negative_delta() {
        let time = ManualTime::new();
        let mut clock = FrameClock::new(Box::new(time.clone()));
        clock.tick();
        time.set(2.0);
        clock.tick();
        time.set(1.0);
        let frame = clock.tick();
        assert_eq!(frame.delta, 0.0);
        assert_eq!(frame.elapsed, 2.0);
    }
}
