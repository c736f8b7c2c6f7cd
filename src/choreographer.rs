//! Scroll and pointer choreography for one scene.
//!
//! A [`Choreographer`] consumes [`SceneEvent`]s from the host and turns
//! them into [`ControlUpdate`]s. Blasting scenes run a small state
//! machine over scroll progress:
//!
//! ```text
//!   Idle ──enter──▶ Forming ──tween done──▶ Holding
//!                      ▲                      │ p >= blast_start
//!                      │ p < reset_point      ▼
//!                      └──────────────── Blasting
//!                                             │ scrolled back up, guards hold
//!                                             ▼
//!                                        Rebuilding ──pulse over──▶ Holding
//! ```
//!
//! Every latch is a field here, so the same event sequence always gives
//! the same output.

use glam::Vec3;

use crate::input::PointerTracker;
use crate::responsive::{ResizeDebouncer, ResponsiveCurve, Viewport};
use crate::scene::{ChoreographyConfig, Palette, SceneConfig};
use crate::tween::{Ease, Tween};
use crate::uniforms::{ControlUpdate, DisplacementMode};

/// Where a scene is in its build / blast / rebuild cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Off screen, or waiting for the first build.
    Idle,
    /// Build tween running.
    Forming,
    /// Formed and following the pointer.
    Holding,
    Blasting,
    /// Fast re-formation after a blast.
    Rebuilding,
}

/// Host notifications a scene reacts to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SceneEvent {
    Resize {
        width: u32,
        height: u32,
        device_pixel_ratio: f32,
        orientation_changed: bool,
    },
    /// Scroll progress through the scene's region, `0..=1`.
    ScrollProgress { value: f32 },
    RegionEnter,
    RegionLeave,
    /// Pointer position on the interaction plane.
    PointerMove { world: Vec3 },
    /// Frame clock: absolute seconds and the frame's delta.
    Tick { now: f32, dt: f32 },
}

/// Event-driven controller of one scene's control surface.
#[derive(Debug, Clone)]
pub struct Choreographer {
    config: ChoreographyConfig,
    blasts: bool,
    shape_count: usize,
    palettes: Vec<Palette>,
    responsive: ResponsiveCurve,
    host_mobile: bool,

    phase: Phase,
    now: f32,
    should_animate: bool,

    last_progress: f32,
    max_progress: f32,
    scrolling_up: bool,
    velocity: f32,

    blast_progress: f32,
    blast_occurred: bool,
    blast_completed: bool,
    rebuild_latched: bool,
    last_rebuild: Option<f32>,
    rebuild_count: u32,
    below_reset: bool,

    build_progress: f32,
    build_tween: Option<Tween>,
    is_rebuild: bool,
    rebuild_remaining: f32,

    shape_index: usize,
    resample: Option<usize>,
    palette: Palette,
    colors: Palette,

    pointer: Option<PointerTracker>,
    debouncer: ResizeDebouncer,
    viewport: Option<Viewport>,

    pending: ControlUpdate,
}

impl Choreographer {
    /// A choreographer for `scene`. The first build tween starts after
    /// `config.build_delay`.
    pub fn new(scene: &SceneConfig, config: ChoreographyConfig) -> Self {
        let palette = scene.palette(0);
        let pointer = (scene.pointer_strength > 0.0)
            .then(|| PointerTracker::new(scene.pointer_radius, scene.pointer_strength, false));

        let build_progress = scene.initial_build_progress.clamp(0.0, 1.0);
        let build_tween = (build_progress < 1.0).then(|| {
            Tween::new(build_progress, 1.0, config.build_duration, Ease::Power2InOut)
                .with_delay(config.build_delay)
        });

        let pending = ControlUpdate {
            should_animate: Some(true),
            blast_progress: Some(0.0),
            build_progress: Some(build_progress),
            is_rebuild: Some(false),
            active_shape_index: Some(0),
            start_color: Some(palette.start),
            end_color: Some(palette.end),
            ..Default::default()
        };

        Self {
            config,
            blasts: scene.blast_speed.is_some(),
            shape_count: scene.shapes.len().max(1),
            palettes: (0..scene.shapes.len()).map(|i| scene.palette(i)).collect(),
            responsive: scene.responsive,
            host_mobile: false,
            phase: if build_tween.is_some() { Phase::Idle } else { Phase::Holding },
            now: 0.0,
            should_animate: true,
            last_progress: 0.0,
            max_progress: 0.0,
            scrolling_up: false,
            velocity: 0.0,
            blast_progress: 0.0,
            blast_occurred: false,
            blast_completed: false,
            rebuild_latched: false,
            last_rebuild: None,
            rebuild_count: 0,
            below_reset: true,
            build_progress,
            build_tween,
            is_rebuild: false,
            rebuild_remaining: 0.0,
            shape_index: 0,
            resample: None,
            palette,
            colors: palette,
            pointer,
            debouncer: ResizeDebouncer::new(),
            viewport: None,
            pending,
        }
    }

    /// Mark the host as a mobile device. Touch-only hosts get a neutral
    /// pointer.
    pub fn with_host(mut self, mobile: bool, touch_only: bool) -> Self {
        self.host_mobile = mobile;
        if let Some(pointer) = self.pointer.as_mut() {
            *pointer = PointerTracker::new(pointer.radius, pointer.strength, touch_only);
        }
        self
    }

    pub fn handle(&mut self, event: SceneEvent) {
        match event {
            SceneEvent::Resize {
                width,
                height,
                device_pixel_ratio,
                orientation_changed,
            } => {
                let viewport = Viewport::new(width, height, device_pixel_ratio);
                self.debouncer.push(viewport, orientation_changed, self.now);
            }
            SceneEvent::ScrollProgress { value } => self.scroll(value),
            SceneEvent::RegionEnter => self.set_animating(true),
            SceneEvent::RegionLeave => self.set_animating(false),
            SceneEvent::PointerMove { world } => {
                if let Some(pointer) = self.pointer.as_mut() {
                    pointer.move_to(world);
                }
            }
            SceneEvent::Tick { now, dt } => self.tick(now, dt),
        }
    }

    /// Switch the pointer interaction style. No-op for scenes without a
    /// pointer.
    pub fn set_mode(&mut self, mode: DisplacementMode) {
        if let Some(pointer) = self.pointer.as_mut() {
            pointer.set_mode(mode);
        }
    }

    /// Everything staged since the last call.
    pub fn take_update(&mut self) -> ControlUpdate {
        std::mem::take(&mut self.pending)
    }

    /// Shape index whose target field should be resampled.
    pub fn take_resample(&mut self) -> Option<usize> {
        self.resample.take()
    }

    /// Viewport that finished debouncing since the last call.
    pub fn take_viewport(&mut self) -> Option<Viewport> {
        self.viewport.take()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn blast_progress(&self) -> f32 {
        self.blast_progress
    }

    pub fn build_progress(&self) -> f32 {
        self.build_progress
    }

    pub fn is_rebuild(&self) -> bool {
        self.is_rebuild
    }

    /// Whether progress reached the active part of the blast this cycle.
    pub fn has_blasted(&self) -> bool {
        self.blast_occurred
    }

    /// Number of rebuilds fired so far.
    pub fn rebuild_count(&self) -> u32 {
        self.rebuild_count
    }

    pub fn shape_index(&self) -> usize {
        self.shape_index
    }

    pub fn colors(&self) -> Palette {
        self.colors
    }

    fn set_animating(&mut self, animate: bool) {
        self.should_animate = animate;
        self.pending.should_animate = Some(animate);
        self.settle_phase();
    }

    fn scroll(&mut self, progress: f32) {
        let progress = progress.clamp(0.0, 1.0);
        let delta = progress - self.last_progress;
        self.last_progress = progress;
        self.velocity = delta.abs();
        if delta.abs() > self.config.guards.direction_threshold {
            self.scrolling_up = delta < 0.0;
        }

        self.select_shape(progress);
        if self.blasts {
            self.scroll_blast(progress);
        }
        self.settle_phase();
    }

    fn select_shape(&mut self, progress: f32) {
        let len = self.shape_count;
        let index = ((progress * (len + 1) as f32).floor() as usize).min(len - 1);
        if index != self.shape_index {
            self.shape_index = index;
            self.resample = Some(index);
            self.palette = self.palettes.get(index).copied().unwrap_or(self.palette);
            self.pending.active_shape_index = Some(index as u32);
            log::debug!("Active shape -> {index}");
        }
    }

    fn scroll_blast(&mut self, p: f32) {
        let c = self.config;
        let guards = c.guards;

        if p >= c.blast_start {
            self.blast_progress = ((p - c.blast_start) / (1.0 - c.blast_start)).min(1.0);
            self.max_progress = self.max_progress.max(p);
            if p >= c.blast_active {
                self.blast_occurred = true;
            }
            if p >= c.blast_complete {
                self.blast_completed = true;
            }
            self.rebuild_latched = false;
            self.end_rebuild();
        } else {
            let cooled = self
                .last_rebuild
                .map_or(true, |last| self.now - last > guards.min_interval);
            let calm = guards.velocity_cap.map_or(true, |cap| self.velocity <= cap);
            let fire = self.blast_completed
                && self.max_progress >= c.blast_complete
                && self.scrolling_up
                && p < c.blast_start - guards.buffer_zone
                && !self.rebuild_latched
                && cooled
                && calm;

            if fire {
                self.fire_rebuild();
            } else if !self.blast_completed {
                self.blast_progress = 0.0;
            }
        }

        if p < c.reset_point {
            if !self.below_reset {
                self.below_reset = true;
                self.reset();
            }
        } else {
            self.below_reset = false;
        }

        self.pending.blast_progress = Some(self.blast_progress);
    }

    fn fire_rebuild(&mut self) {
        self.blast_progress = 0.0;
        self.rebuild_latched = true;
        self.last_rebuild = Some(self.now);
        self.rebuild_count += 1;
        self.is_rebuild = true;

        let mut tween_time = 0.0;
        if self.build_progress < 1.0 {
            let tween = Tween::new(
                self.build_progress,
                1.0,
                self.config.rebuild_duration,
                Ease::Power4Out,
            );
            tween_time = tween.remaining();
            self.build_tween = Some(tween);
        }
        self.rebuild_remaining = tween_time + self.config.rebuild_hold;
        self.pending.is_rebuild = Some(true);
        log::debug!("Rebuild #{} at t={:.2}", self.rebuild_count, self.now);
    }

    fn end_rebuild(&mut self) {
        if self.is_rebuild {
            self.is_rebuild = false;
            self.rebuild_remaining = 0.0;
            self.pending.is_rebuild = Some(false);
        }
    }

    /// Back at the top: start over. The rebuild timestamp survives so
    /// oscillating around the top cannot outrun `min_interval`.
    fn reset(&mut self) {
        self.blast_occurred = false;
        self.blast_completed = false;
        self.rebuild_latched = false;
        self.blast_progress = 0.0;
        self.max_progress = 0.0;
        self.end_rebuild();
        self.build_progress = 0.0;
        self.build_tween = Some(
            Tween::new(0.0, 1.0, self.config.build_duration, Ease::Power2InOut)
                .with_delay(self.config.reset_delay),
        );
        self.pending.build_progress = Some(0.0);
        log::debug!("Scene reset at t={:.2}", self.now);
    }

    fn tick(&mut self, now: f32, dt: f32) {
        self.now = now;

        if let Some(tween) = self.build_tween.as_mut() {
            self.build_progress = tween.advance(dt);
            if tween.finished() {
                self.build_tween = None;
            }
            self.pending.build_progress = Some(self.build_progress);
        }

        if self.is_rebuild {
            self.rebuild_remaining -= dt;
            if self.rebuild_remaining <= 0.0 {
                self.end_rebuild();
            }
        }

        let blend = dt.min(1.0);
        self.colors = Palette::new(
            self.colors.start.lerp(self.palette.start, blend),
            self.colors.end.lerp(self.palette.end, blend),
        );
        self.pending.start_color = Some(self.colors.start);
        self.pending.end_color = Some(self.colors.end);

        if let Some(pointer) = self.pointer.as_mut() {
            let update = pointer.update(dt);
            self.pending.merge(&update);
        }

        if let Some(viewport) = self.debouncer.poll(now) {
            let scale = self.responsive.scale(
                viewport.width,
                viewport.device_pixel_ratio,
                viewport.is_mobile(self.host_mobile),
            );
            log::debug!(
                "Viewport {}x{} @{} -> responsive scale {scale:.2}",
                viewport.width,
                viewport.height,
                viewport.device_pixel_ratio
            );
            self.pending.responsive_scale = Some(scale);
            self.viewport = Some(viewport);
        }

        self.settle_phase();
    }

    fn settle_phase(&mut self) {
        let next = if !self.should_animate {
            Phase::Idle
        } else if self.blast_progress > 0.0 {
            Phase::Blasting
        } else if self.is_rebuild {
            Phase::Rebuilding
        } else if let Some(tween) = &self.build_tween {
            if tween.started() {
                Phase::Forming
            } else {
                Phase::Idle
            }
        } else {
            Phase::Holding
        };
        if next != self.phase {
            log::debug!("Phase {:?} -> {:?}", self.phase, next);
            self.phase = next;
        }
    }
}
