//! Frame timing.
//!
//! [`Time`] is the single clock the host reads each frame. Its delta is
//! clamped so a stalled frame (window drag, breakpoint, tab switch) cannot
//! fling particles across the scene. [`PerformanceMonitor`] watches the
//! same deltas for sustained slowdowns.
//!
//! ```ignore
//! use backdrop::time::Time;
//!
//! let mut time = Time::new();
//! // Once per frame:
//! let (now, dt) = time.update();
//! ```

use std::time::{Duration, Instant};

/// Largest delta handed to the simulation, in seconds.
pub const MAX_DELTA: f32 = 0.1;

/// Frame clock.
#[derive(Debug)]
pub struct Time {
    start: Instant,
    last_frame: Instant,
    elapsed_secs: f32,
    delta_secs: f32,
    frame_count: u64,
    paused: bool,
    /// Wall time spent paused, excluded from `elapsed`.
    pause_elapsed: Duration,
    /// Fixed delta for deterministic playback.
    fixed_delta: Option<f32>,
}

impl Time {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_frame: now,
            elapsed_secs: 0.0,
            delta_secs: 0.0,
            frame_count: 0,
            paused: false,
            pause_elapsed: Duration::ZERO,
            fixed_delta: None,
        }
    }

    /// Advance the clock. Call once per frame.
    ///
    /// Returns `(elapsed, delta)` in seconds.
    pub fn update(&mut self) -> (f32, f32) {
        let now = Instant::now();

        if self.paused {
            self.delta_secs = 0.0;
            return (self.elapsed_secs, self.delta_secs);
        }

        let raw_delta = now.duration_since(self.last_frame).as_secs_f32();
        self.delta_secs = self.fixed_delta.unwrap_or(raw_delta).min(MAX_DELTA);
        self.last_frame = now;

        let raw_elapsed = now.duration_since(self.start).saturating_sub(self.pause_elapsed);
        self.elapsed_secs = raw_elapsed.as_secs_f32();
        self.frame_count += 1;

        (self.elapsed_secs, self.delta_secs)
    }

    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed_secs
    }

    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Stop the clock. `delta()` reads 0 until [`resume`](Self::resume).
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        if self.paused {
            let now = Instant::now();
            self.pause_elapsed += now.duration_since(self.last_frame);
            self.last_frame = now;
            self.paused = false;
        }
    }

    /// Use a fixed delta instead of wall time. `None` restores wall time.
    pub fn set_fixed_delta(&mut self, delta: Option<f32>) {
        self.fixed_delta = delta;
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

/// Frames slower than this rate count toward a slowdown.
pub const LOW_FPS: f32 = 30.0;
/// Consecutive slow frames before a slowdown is reported.
pub const SLOW_FRAME_LIMIT: u32 = 60;

/// Rolling frame-rate measurement with a sustained-slowdown warning.
#[derive(Debug, Clone)]
pub struct PerformanceMonitor {
    window: f32,
    window_elapsed: f32,
    window_frames: u32,
    fps: f32,
    slow_streak: u32,
    warned: bool,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceMonitor {
    /// Monitor with a one-second measuring window.
    pub fn new() -> Self {
        Self {
            window: 1.0,
            window_elapsed: 0.0,
            window_frames: 0,
            fps: 0.0,
            slow_streak: 0,
            warned: false,
        }
    }

    /// Record one frame of `dt` seconds. Returns `true` on the frame a
    /// slowdown is first reported.
    pub fn record(&mut self, dt: f32) -> bool {
        self.window_elapsed += dt;
        self.window_frames += 1;
        if self.window_elapsed >= self.window {
            self.fps = self.window_frames as f32 / self.window_elapsed;
            self.window_elapsed = 0.0;
            self.window_frames = 0;
        }

        if dt > 1.0 / LOW_FPS {
            self.slow_streak += 1;
        } else {
            self.slow_streak = 0;
            self.warned = false;
        }

        if self.slow_streak > SLOW_FRAME_LIMIT && !self.warned {
            self.warned = true;
            log::warn!(
                "Frame rate below {LOW_FPS} fps for {} frames (last window {:.1} fps)",
                self.slow_streak,
                self.fps
            );
            return true;
        }
        false
    }

    /// Frames per second over the last complete window.
    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn slow_streak(&self) -> u32 {
        self.slow_streak
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_time_update() {
        let mut time = Time::new();
        thread::sleep(Duration::from_millis(10));
        let (elapsed, delta) = time.update();
        assert!(elapsed > 0.0);
        assert!(delta > 0.0);
        assert_eq!(time.frame(), 1);
    }

    #[test]
    fn test_delta_is_clamped() {
        let mut time = Time::new();
        time.set_fixed_delta(Some(5.0));
        let (_, delta) = time.update();
        assert_eq!(delta, MAX_DELTA);
    }

    #[test]
    fn test_pause() {
        let mut time = Time::new();
        time.update();
        time.pause();
        let before = time.elapsed();
        thread::sleep(Duration::from_millis(10));
        time.update();
        assert_eq!(time.elapsed(), before);
        assert_eq!(time.delta(), 0.0);
        time.resume();
        assert!(!time.is_paused());
    }

    #[test]
    fn test_fps_window() {
        let mut monitor = PerformanceMonitor::new();
        for _ in 0..61 {
            monitor.record(1.0 / 60.0);
        }
        assert!((monitor.fps() - 60.0).abs() < 0.5);
    }

    #[test]
    fn test_slowdown_warns_once_per_episode() {
        let mut monitor = PerformanceMonitor::new();
        let warnings = (0..200).filter(|_| monitor.record(0.05)).count();
        assert_eq!(warnings, 1);
        assert_eq!(monitor.slow_streak(), 200);

        monitor.record(0.01);
        assert_eq!(monitor.slow_streak(), 0);
        let warnings = (0..61).filter(|_| monitor.record(0.05)).count();
        assert_eq!(warnings, 1);
    }

    #[test]
    fn test_short_dips_do_not_warn() {
        let mut monitor = PerformanceMonitor::new();
        for _ in 0..10 {
            for _ in 0..30 {
                assert!(!monitor.record(0.05));
            }
            monitor.record(0.016);
        }
    }
}
