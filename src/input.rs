//! Input handling: raw window events and the pointer tracker.
//!
//! [`Input`] collects per-frame key presses, cursor position and wheel
//! motion from winit. [`PointerTracker`] turns the cursor's world position
//! into the pointer parameters of the control surface: a smoothed flow
//! direction and a relax strength that fades in once the pointer rests.
//!
//! ```ignore
//! let world = camera.cursor_on_plane(input.mouse_ndc())?;
//! tracker.move_to(world);
//! let update = tracker.update(dt);
//! ```

use glam::{Vec2, Vec3};
use std::collections::HashSet;
use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode as WinitKeyCode, PhysicalKey};

use crate::uniforms::{ControlUpdate, DisplacementMode};

/// Keys the demo host reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Escape,
    Other,
}

impl From<WinitKeyCode> for KeyCode {
    fn from(key: WinitKeyCode) -> Self {
        match key {
            WinitKeyCode::Digit1 | WinitKeyCode::Numpad1 => KeyCode::Key1,
            WinitKeyCode::Digit2 | WinitKeyCode::Numpad2 => KeyCode::Key2,
            WinitKeyCode::Digit3 | WinitKeyCode::Numpad3 => KeyCode::Key3,
            WinitKeyCode::Digit4 | WinitKeyCode::Numpad4 => KeyCode::Key4,
            WinitKeyCode::Digit5 | WinitKeyCode::Numpad5 => KeyCode::Key5,
            WinitKeyCode::Escape => KeyCode::Escape,
            _ => KeyCode::Other,
        }
    }
}

impl KeyCode {
    /// Displacement mode bound to a number key.
    pub fn displacement_mode(self) -> Option<DisplacementMode> {
        match self {
            KeyCode::Key1 => Some(DisplacementMode::Repel),
            KeyCode::Key2 => Some(DisplacementMode::Attract),
            KeyCode::Key3 => Some(DisplacementMode::Swirl),
            KeyCode::Key4 => Some(DisplacementMode::Tornado),
            KeyCode::Key5 => Some(DisplacementMode::Liquid),
            _ => None,
        }
    }
}

/// Per-frame keyboard, cursor and wheel state.
#[derive(Debug, Default)]
pub struct Input {
    keys_held: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,

    mouse_position: Vec2,
    mouse_ndc: Option<Vec2>,
    cursor_moved: bool,

    scroll_delta: f32,

    window_size: (u32, u32),
}

impl Input {
    pub fn new() -> Self {
        Self {
            window_size: (800, 600),
            ..Default::default()
        }
    }

    /// Whether a key went down this frame (repeats excluded).
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    pub fn pressed_keys(&self) -> impl Iterator<Item = KeyCode> + '_ {
        self.keys_pressed.iter().copied()
    }

    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position
    }

    /// Cursor in normalized device coordinates, `None` until the cursor
    /// enters the window or after it leaves.
    pub fn mouse_ndc(&self) -> Option<Vec2> {
        self.mouse_ndc
    }

    /// Whether the cursor moved this frame.
    pub fn cursor_moved(&self) -> bool {
        self.cursor_moved
    }

    /// Wheel motion this frame in lines. Positive scrolls up.
    pub fn scroll_delta(&self) -> f32 {
        self.scroll_delta
    }

    /// Clear per-frame state.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.cursor_moved = false;
        self.scroll_delta = 0.0;
    }

    pub fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_size = (width, height);
    }

    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(keycode) = event.physical_key {
                    let key = KeyCode::from(keycode);
                    match event.state {
                        ElementState::Pressed => {
                            if !self.keys_held.contains(&key) {
                                self.keys_pressed.insert(key);
                            }
                            self.keys_held.insert(key);
                        }
                        ElementState::Released => {
                            self.keys_held.remove(&key);
                        }
                    }
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                self.set_cursor(Vec2::new(position.x as f32, position.y as f32));
            }

            WindowEvent::CursorLeft { .. } => {
                self.mouse_ndc = None;
            }

            WindowEvent::MouseWheel { delta, .. } => {
                self.scroll_delta += match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                };
            }

            _ => {}
        }
    }

    fn set_cursor(&mut self, position: Vec2) {
        self.mouse_position = position;
        self.cursor_moved = true;
        let (w, h) = self.window_size;
        if w > 0 && h > 0 {
            self.mouse_ndc = Some(Vec2::new(
                (position.x / w as f32) * 2.0 - 1.0,
                1.0 - (position.y / h as f32) * 2.0,
            ));
        }
    }
}

/// Intersect a ray with the `z = 0` plane.
pub fn ray_plane_z0(origin: Vec3, direction: Vec3) -> Option<Vec3> {
    if direction.z.abs() < 1e-6 {
        return None;
    }
    let t = -origin.z / direction.z;
    if t < 0.0 {
        return None;
    }
    Some(origin + direction * t)
}

/// Seconds the pointer must rest before the liquid spring starts to relax.
pub const RELAX_DELAY: f32 = 0.25;
/// Seconds from the start of relaxing to full strength.
pub const RELAX_FADE: f32 = 0.9;

/// Liquid spring strength after the pointer has rested `since_move` seconds.
pub fn relax_strength(since_move: f32) -> f32 {
    if since_move <= RELAX_DELAY {
        0.0
    } else {
        ((since_move - RELAX_DELAY) / RELAX_FADE).min(1.0)
    }
}

/// Pointer parameters for one scene.
#[derive(Debug, Clone)]
pub struct PointerTracker {
    position: Vec3,
    previous: Vec3,
    direction: Vec3,
    since_move: f32,
    touch_only: bool,
    mode: DisplacementMode,
    mode_changed: bool,

    pub radius: f32,
    pub strength: f32,
    pub damping: f32,
    pub spring: f32,
}

impl Default for PointerTracker {
    fn default() -> Self {
        Self::new(1.0, 50.0, false)
    }
}

impl PointerTracker {
    /// A tracker with the given falloff radius and strength. Touch-only
    /// devices get a neutral pointer that never displaces.
    pub fn new(radius: f32, strength: f32, touch_only: bool) -> Self {
        Self {
            position: Vec3::ZERO,
            previous: Vec3::ZERO,
            direction: Vec3::ZERO,
            since_move: RELAX_DELAY + RELAX_FADE,
            touch_only,
            mode: DisplacementMode::Repel,
            mode_changed: true,
            radius,
            strength,
            damping: 3.0,
            spring: 6.0,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn mode(&self) -> DisplacementMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: DisplacementMode) {
        if mode != self.mode {
            self.mode = mode;
            self.mode_changed = true;
        }
    }

    /// Record a new pointer position on the interaction plane.
    pub fn move_to(&mut self, world: Vec3) {
        self.position = world;
        self.since_move = 0.0;
    }

    /// Advance the smoothing and produce this frame's pointer update.
    pub fn update(&mut self, dt: f32) -> ControlUpdate {
        self.since_move += dt;

        let mut update = if self.mode_changed {
            self.mode_changed = false;
            ControlUpdate::mode(self.mode)
        } else {
            ControlUpdate::default()
        };
        update.liquid_damping = Some(self.damping);
        update.liquid_spring = Some(self.spring);
        update.relax_strength = Some(relax_strength(self.since_move));

        if self.touch_only {
            self.direction = Vec3::ZERO;
            update.pointer_position = Some(Vec3::ZERO);
            update.pointer_direction = Some(Vec3::ZERO);
            update.pointer_radius = Some(0.0);
            update.pointer_strength = Some(0.0);
            return update;
        }

        let delta = self.position - self.previous;
        self.previous = self.position;
        if delta.length_squared() > 1e-9 {
            self.direction = self
                .direction
                .lerp(delta.normalize(), (dt * 12.0).min(1.0));
        } else {
            self.direction = self.direction.lerp(Vec3::ZERO, (dt * 6.0).min(1.0));
        }

        update.pointer_position = Some(self.position);
        update.pointer_direction = Some(self.direction);
        update.pointer_radius = Some(self.radius);
        update.pointer_strength = Some(self.strength);
        update
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_modes() {
        assert_eq!(KeyCode::Key3.displacement_mode(), Some(DisplacementMode::Swirl));
        assert_eq!(KeyCode::Key5.displacement_mode(), Some(DisplacementMode::Liquid));
        assert_eq!(KeyCode::Escape.displacement_mode(), None);
    }

    #[test]
    fn test_key_pressed_cleared_each_frame() {
        let mut input = Input::new();
        input.keys_pressed.insert(KeyCode::Key1);
        input.keys_held.insert(KeyCode::Key1);
        assert!(input.key_pressed(KeyCode::Key1));
        input.begin_frame();
        assert!(!input.key_pressed(KeyCode::Key1));
    }

    #[test]
    fn test_cursor_ndc() {
        let mut input = Input::new();
        input.set_window_size(800, 600);
        assert_eq!(input.mouse_ndc(), None);
        input.set_cursor(Vec2::new(400.0, 300.0));
        let ndc = input.mouse_ndc().unwrap();
        assert!(ndc.x.abs() < 1e-6 && ndc.y.abs() < 1e-6);
        assert!(input.cursor_moved());
    }

    #[test]
    fn test_ray_plane() {
        let hit = ray_plane_z0(Vec3::new(1.0, 2.0, 10.0), Vec3::NEG_Z).unwrap();
        assert_eq!(hit, Vec3::new(1.0, 2.0, 0.0));
        assert!(ray_plane_z0(Vec3::new(0.0, 0.0, 10.0), Vec3::Z).is_none());
        assert!(ray_plane_z0(Vec3::ZERO, Vec3::X).is_none());
    }

    #[test]
    fn test_relax_ramp() {
        assert_eq!(relax_strength(0.0), 0.0);
        assert_eq!(relax_strength(0.25), 0.0);
        assert!((relax_strength(0.7) - 0.5).abs() < 1e-6);
        assert_eq!(relax_strength(5.0), 1.0);
    }

    #[test]
    fn test_direction_smoothing() {
        let mut tracker = PointerTracker::default();
        tracker.update(1.0 / 60.0);
        tracker.move_to(Vec3::new(0.5, 0.0, 0.0));
        let update = tracker.update(1.0 / 60.0);
        let dir = update.pointer_direction.unwrap();
        assert!(dir.x > 0.0 && dir.x < 1.0);
        assert_eq!(update.relax_strength, Some(0.0));

        // Resting pointer decays toward zero.
        for _ in 0..120 {
            tracker.update(1.0 / 60.0);
        }
        assert!(tracker.direction().length() < 1e-3);
        assert_eq!(relax_strength(2.0), 1.0);
    }

    #[test]
    fn test_touch_only_is_neutral() {
        let mut tracker = PointerTracker::new(1.5, 100.0, true);
        tracker.move_to(Vec3::ONE);
        let update = tracker.update(0.016);
        assert_eq!(update.pointer_radius, Some(0.0));
        assert_eq!(update.pointer_strength, Some(0.0));
        assert_eq!(update.pointer_direction, Some(Vec3::ZERO));
    }

    #[test]
    fn test_mode_change_emitted_once() {
        let mut tracker = PointerTracker::default();
        assert!(tracker.update(0.016).displacement_weights.is_some());
        assert!(tracker.update(0.016).displacement_weights.is_none());
        tracker.set_mode(DisplacementMode::Tornado);
        let update = tracker.update(0.016);
        assert_eq!(update.displacement_weights, Some(DisplacementMode::Tornado.weights()));
        assert_eq!(update.is_liquid, Some(false));
    }
}
