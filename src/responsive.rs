//! Viewport-dependent sizing.
//!
//! Sprite size follows the viewport width and pixel ratio, and the
//! particle count follows whether the viewport is mobile-sized. Resize
//! notifications arrive in bursts, so they are debounced before anything
//! is re-derived.

use serde::{Deserialize, Serialize};

use crate::capability::SettingsBundle;
use crate::scene::SceneConfig;

/// Quiet period after the last resize before re-deriving.
pub const RESIZE_DEBOUNCE: f32 = 0.15;
/// Quiet period after an orientation change.
pub const ORIENTATION_DEBOUNCE: f32 = 0.5;
/// Widths at or below this count as a mobile layout.
pub const MOBILE_WIDTH: u32 = 768;

/// How sprite size reacts to the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponsiveCurve {
    /// Always 1.
    Fixed,
    /// Larger sprites on small touch screens, smaller on small desktop
    /// windows, slightly larger on dense displays.
    #[default]
    Boost,
    /// Much larger sprites on anything up to a laptop width, smaller on
    /// dense displays.
    Dense,
}

impl ResponsiveCurve {
    /// Scale factor for a viewport.
    pub fn scale(self, width: u32, device_pixel_ratio: f32, mobile: bool) -> f32 {
        match self {
            ResponsiveCurve::Fixed => 1.0,
            ResponsiveCurve::Boost => {
                let screen = if width <= 480 {
                    if mobile { 1.2 } else { 0.8 }
                } else if width <= MOBILE_WIDTH {
                    if mobile { 1.1 } else { 0.9 }
                } else {
                    1.0
                };
                let density = if device_pixel_ratio >= 3.0 {
                    1.1
                } else if device_pixel_ratio >= 2.0 {
                    1.05
                } else {
                    1.0
                };
                screen * density
            }
            ResponsiveCurve::Dense => {
                let screen = if width <= 1440 { 1.9 } else { 1.0 };
                let density = if device_pixel_ratio >= 3.0 {
                    0.8
                } else if device_pixel_ratio >= 2.0 {
                    0.9
                } else {
                    1.0
                };
                screen * density
            }
        }
    }
}

/// Size and density of the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub device_pixel_ratio: f32,
}

impl Viewport {
    pub fn new(width: u32, height: u32, device_pixel_ratio: f32) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio,
        }
    }

    /// Mobile if the host says so or the layout is narrow.
    pub fn is_mobile(&self, host_mobile: bool) -> bool {
        host_mobile || self.width <= MOBILE_WIDTH
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280, 720, 1.0)
    }
}

/// Values re-derived from a viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Derived {
    pub responsive_scale: f32,
    pub particle_count: u32,
}

/// Re-derive sprite scale and particle count for `viewport`.
pub fn derive(
    scene: &SceneConfig,
    settings: &SettingsBundle,
    viewport: &Viewport,
    host_mobile: bool,
) -> Derived {
    let mobile = viewport.is_mobile(host_mobile);
    Derived {
        responsive_scale: scene
            .responsive
            .scale(viewport.width, viewport.device_pixel_ratio, mobile),
        particle_count: scene.particle_count(settings, mobile),
    }
}

/// Trailing-edge debounce of resize notifications.
#[derive(Debug, Clone, Default)]
pub struct ResizeDebouncer {
    pending: Option<(Viewport, f32)>,
}

impl ResizeDebouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a resize at time `now`; restarts the quiet period.
    pub fn push(&mut self, viewport: Viewport, orientation_changed: bool, now: f32) {
        let wait = if orientation_changed {
            ORIENTATION_DEBOUNCE
        } else {
            RESIZE_DEBOUNCE
        };
        let deadline = now + wait;
        // An orientation change already waiting keeps its longer deadline.
        let deadline = match self.pending {
            Some((_, earlier)) => deadline.max(earlier),
            None => deadline,
        };
        self.pending = Some((viewport, deadline));
    }

    /// The latest viewport once its quiet period is over.
    pub fn poll(&mut self, now: f32) -> Option<Viewport> {
        match self.pending {
            Some((viewport, deadline)) if now >= deadline => {
                self.pending = None;
                Some(viewport)
            }
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{DeviceClass, Tier};

    #[test]
    fn test_boost_curve() {
        let curve = ResponsiveCurve::Boost;
        assert_eq!(curve.scale(1920, 1.0, false), 1.0);
        assert!((curve.scale(400, 3.0, true) - 1.2 * 1.1).abs() < 1e-6);
        assert!((curve.scale(400, 1.0, false) - 0.8).abs() < 1e-6);
        assert!((curve.scale(700, 2.0, true) - 1.1 * 1.05).abs() < 1e-6);
        assert!((curve.scale(700, 1.0, false) - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_dense_curve() {
        let curve = ResponsiveCurve::Dense;
        assert!((curve.scale(1440, 1.0, false) - 1.9).abs() < 1e-6);
        assert_eq!(curve.scale(1441, 1.0, false), 1.0);
        assert!((curve.scale(2560, 2.0, false) - 0.9).abs() < 1e-6);
        assert!((curve.scale(390, 3.0, true) - 1.9 * 0.8).abs() < 1e-6);
        assert_eq!(ResponsiveCurve::Fixed.scale(100, 3.0, true), 1.0);
    }

    #[test]
    fn test_derive_follows_width() {
        let scene = SceneConfig::sphere(DeviceClass::Desktop);
        let settings = SettingsBundle::for_tier(Tier::Low, false);
        let wide = derive(&scene, &settings, &Viewport::new(1920, 1080, 1.0), false);
        let narrow = derive(&scene, &settings, &Viewport::new(700, 900, 1.0), false);
        assert_eq!(wide.particle_count, 50_000);
        assert_eq!(narrow.particle_count, 70_000);
        assert!((narrow.responsive_scale - 1.1).abs() < 1e-6);
    }

    #[test]
    fn test_debounce_trailing_edge() {
        let mut debouncer = ResizeDebouncer::new();
        debouncer.push(Viewport::new(800, 600, 1.0), false, 0.0);
        debouncer.push(Viewport::new(900, 600, 1.0), false, 0.1);
        assert_eq!(debouncer.poll(0.2), None);
        let fired = debouncer.poll(0.26);
        assert_eq!(fired.map(|v| v.width), Some(900));
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.poll(1.0), None);
    }

    #[test]
    fn test_orientation_waits_longer() {
        let mut debouncer = ResizeDebouncer::new();
        debouncer.push(Viewport::new(390, 844, 3.0), true, 0.0);
        debouncer.push(Viewport::new(844, 390, 3.0), false, 0.01);
        assert_eq!(debouncer.poll(0.3), None);
        assert_eq!(debouncer.poll(0.5).map(|v| v.width), Some(844));
    }
}
