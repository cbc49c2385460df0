use std::time::{Duration, Instant};

/// Timing of one frame, handed to the app with the frame context.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous tick, clamped.
    pub dt: f32,

    /// Seconds since the clock started or was last reset. Never clamped;
    /// the lessons animate from this.
    pub elapsed: f32,

    pub now: Instant,

    /// Ticks before this one.
    pub frame_index: u64,
}

/// Produces one [`FrameTime`] per redraw.
///
/// `dt` is kept within `[dt_min, dt_max]` so a stalled or minimized window
/// does not hand the app a multi-second step.
#[derive(Debug, Clone)]
pub struct FrameClock {
    start: Instant,
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    /// Clock with `dt` clamped to 100µs..250ms.
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        let now = Instant::now();
        Self {
            start: now,
            last: now,
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    /// Resets the clock baseline, including `elapsed`.
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.start = now;
        self.last = now;
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);

        self.last = now;

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            elapsed: now.saturating_duration_since(self.start).as_secs_f32(),
            now,
            frame_index: self.frame_index,
        };

        self.frame_index = self.frame_index.wrapping_add(1);

        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_index_counts_ticks() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.tick().frame_index, 0);
        assert_eq!(clock.tick().frame_index, 1);
    }

    #[test]
    fn tight_loop_is_clamped_up() {
        let mut clock = FrameClock::new();
        let start = clock.last;
        let ft = clock.tick_at(start);
        assert_eq!(ft.dt, Duration::from_micros(100).as_secs_f32());
    }

    #[test]
    fn long_stall_is_clamped_down() {
        let mut clock = FrameClock::new();
        let later = clock.last + Duration::from_secs(3);
        let ft = clock.tick_at(later);
        assert_eq!(ft.dt, 0.25);
        assert!((ft.elapsed - 3.0).abs() < 1e-6);
    }

    #[test]
    fn elapsed_accumulates_across_ticks() {
        let mut clock = FrameClock::new();
        let t0 = clock.start;
        clock.tick_at(t0 + Duration::from_millis(500));
        let ft = clock.tick_at(t0 + Duration::from_millis(1500));
        assert!((ft.elapsed - 1.5).abs() < 1e-6);
        assert!((ft.dt - 0.25).abs() < 1e-6);
    }

    #[test]
    fn reset_restarts_elapsed() {
        let mut clock = FrameClock::new();
        clock.tick_at(clock.start + Duration::from_secs(10));
        clock.reset();
        let ft = clock.tick_at(clock.start);
        assert_eq!(ft.elapsed, 0.0);
    }
}
