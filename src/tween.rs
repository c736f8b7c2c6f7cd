//! Scalar tweens driven by the frame clock.

use serde::{Deserialize, Serialize};

/// Easing curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ease {
    Linear,
    /// Cubic ease in and out.
    Power2InOut,
    /// Quintic ease out.
    Power4Out,
}

impl Ease {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Ease::Linear => t,
            Ease::Power2InOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Ease::Power4Out => 1.0 - (1.0 - t).powi(5),
        }
    }
}

/// Tween of a single value from `from` to `to`, optionally delayed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween {
    from: f32,
    to: f32,
    duration: f32,
    delay: f32,
    elapsed: f32,
    ease: Ease,
}

impl Tween {
    pub fn new(from: f32, to: f32, duration: f32, ease: Ease) -> Self {
        Self {
            from,
            to,
            duration,
            delay: 0.0,
            elapsed: 0.0,
            ease,
        }
    }

    pub fn with_delay(mut self, delay: f32) -> Self {
        self.delay = delay.max(0.0);
        self
    }

    /// Advance by `dt` seconds and return the current value.
    pub fn advance(&mut self, dt: f32) -> f32 {
        self.elapsed += dt.max(0.0);
        self.value()
    }

    pub fn value(&self) -> f32 {
        let running = self.elapsed - self.delay;
        if running <= 0.0 {
            return self.from;
        }
        if self.duration <= 0.0 {
            return self.to;
        }
        let t = self.ease.apply(running / self.duration);
        self.from + (self.to - self.from) * t
    }

    /// Whether the delay has passed.
    pub fn started(&self) -> bool {
        self.elapsed > self.delay
    }

    pub fn finished(&self) -> bool {
        self.elapsed - self.delay >= self.duration
    }

    /// Seconds until the tween reaches its end value.
    pub fn remaining(&self) -> f32 {
        (self.delay + self.duration - self.elapsed).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ease_endpoints() {
        for ease in [Ease::Linear, Ease::Power2InOut, Ease::Power4Out] {
            assert_eq!(ease.apply(0.0), 0.0);
            assert_eq!(ease.apply(1.0), 1.0);
        }
        assert!((Ease::Power2InOut.apply(0.5) - 0.5).abs() < 1e-6);
        assert!(Ease::Power4Out.apply(0.2) > 0.6);
    }

    #[test]
    fn test_delay_holds_start_value() {
        let mut tween = Tween::new(0.0, 1.0, 2.0, Ease::Linear).with_delay(0.3);
        assert_eq!(tween.advance(0.2), 0.0);
        assert!(!tween.started());
        assert!((tween.advance(1.1) - 0.5).abs() < 1e-5);
        assert!(!tween.finished());
        assert_eq!(tween.advance(5.0), 1.0);
        assert!(tween.finished());
        assert_eq!(tween.remaining(), 0.0);
    }

    #[test]
    fn test_zero_duration_jumps() {
        let mut tween = Tween::new(0.2, 1.0, 0.0, Ease::Power4Out);
        assert_eq!(tween.advance(0.01), 1.0);
        assert!(tween.finished());
    }
}
