//! Scroll choreography: blast/rebuild debouncing and the phase machine.

use backdrop::prelude::*;

const DT: f32 = 1.0 / 60.0;

struct Host {
    now: f32,
    choreographer: Choreographer,
    rebuild_toggles: u32,
    was_rebuilding: bool,
}

impl Host {
    fn new(scene: SceneConfig, class: DeviceClass) -> Self {
        Self {
            now: 0.0,
            choreographer: Choreographer::new(&scene, ChoreographyConfig::for_class(class)),
            rebuild_toggles: 0,
            was_rebuilding: false,
        }
    }

    fn sphere(class: DeviceClass) -> Self {
        Self::new(SceneConfig::sphere(class), class)
    }

    fn observe(&mut self) {
        let rebuilding = self.choreographer.is_rebuild();
        if rebuilding && !self.was_rebuilding {
            self.rebuild_toggles += 1;
        }
        self.was_rebuilding = rebuilding;
    }

    fn tick(&mut self) {
        self.now += DT;
        self.choreographer.handle(SceneEvent::Tick { now: self.now, dt: DT });
        self.observe();
    }

    fn run(&mut self, seconds: f32) {
        for _ in 0..(seconds / DT).round() as u32 {
            self.tick();
        }
    }

    fn scroll(&mut self, value: f32) {
        self.choreographer.handle(SceneEvent::ScrollProgress { value });
        self.observe();
    }

    /// Scroll from `from` to `to` in `steps` frames.
    fn glide(&mut self, from: f32, to: f32, steps: u32) {
        for i in 1..=steps {
            self.scroll(from + (to - from) * i as f32 / steps as f32);
            self.tick();
        }
    }

    /// Form the shape and blast it completely.
    fn blast_through(&mut self) {
        self.run(3.0);
        self.glide(0.5, 1.0, 30);
        assert_eq!(self.choreographer.blast_progress(), 1.0);
        assert!(self.choreographer.has_blasted());
    }
}

// ============================================================================
// Rebuild debounce
// ============================================================================

#[test]
fn test_oscillation_across_blast_start_is_debounced() {
    let class = DeviceClass::Desktop;
    let config = ChoreographyConfig::for_class(class);
    let mut host = Host::sphere(class);
    host.blast_through();

    let start = host.now;
    let low = config.blast_start - config.guards.buffer_zone - 0.02;
    let high = config.blast_start + 0.02;
    for frame in 0..600 {
        host.scroll(if frame % 2 == 0 { low } else { high });
        host.tick();
    }
    let total = host.now - start;

    let bound = (total / config.guards.min_interval).floor() as u32 + 1;
    assert!(
        host.rebuild_toggles <= bound,
        "{} rebuilds in {total:.2}s (bound {bound})",
        host.rebuild_toggles
    );
    assert!(host.rebuild_toggles >= 2, "oscillation never rebuilt");
    assert_eq!(host.choreographer.rebuild_count(), host.rebuild_toggles);
}

#[test]
fn test_oscillation_with_pauses_is_debounced() {
    let class = DeviceClass::Mobile;
    let config = ChoreographyConfig::for_class(class);
    let mut host = Host::sphere(class);
    host.blast_through();

    let start = host.now;
    for _ in 0..40 {
        host.scroll(0.95);
        host.run(0.1);
        host.scroll(0.5);
        host.run(0.15);
    }
    let total = host.now - start;
    let bound = (total / config.guards.min_interval).floor() as u32 + 1;
    assert!(host.rebuild_toggles <= bound);
    assert!(host.rebuild_toggles > 0);
}

#[test]
fn test_iphone_velocity_cap_blocks_flings() {
    let class = DeviceClass::IPhone;
    let mut host = Host::sphere(class);
    host.blast_through();

    // Large jumps back out of the blast never trigger a rebuild.
    for frame in 0..300 {
        host.scroll(if frame % 2 == 0 { 0.5 } else { 0.95 });
        host.tick();
    }
    assert_eq!(host.choreographer.rebuild_count(), 0);

    // A slow scroll up does.
    host.glide(1.0, 0.6, 50);
    assert_eq!(host.choreographer.rebuild_count(), 1);
}

#[test]
fn test_rebuild_needs_upward_scroll_past_buffer() {
    let class = DeviceClass::Desktop;
    let config = ChoreographyConfig::for_class(class);
    let mut host = Host::sphere(class);
    host.blast_through();

    // Inside the buffer zone: nothing.
    host.glide(1.0, config.blast_start - config.guards.buffer_zone * 0.5, 20);
    assert_eq!(host.choreographer.rebuild_count(), 0);

    host.glide(
        config.blast_start - config.guards.buffer_zone * 0.5,
        config.blast_start - config.guards.buffer_zone * 2.0,
        20,
    );
    assert_eq!(host.choreographer.rebuild_count(), 1);
    assert_eq!(host.choreographer.blast_progress(), 0.0);
    assert_eq!(host.choreographer.phase(), Phase::Rebuilding);
}

#[test]
fn test_incomplete_blast_reverses_without_rebuild() {
    let mut host = Host::sphere(DeviceClass::Desktop);
    host.run(3.0);
    host.glide(0.5, 0.93, 20);
    assert!(host.choreographer.blast_progress() > 0.0);

    host.glide(0.93, 0.5, 20);
    assert_eq!(host.choreographer.blast_progress(), 0.0);
    assert_eq!(host.choreographer.rebuild_count(), 0);
    assert_eq!(host.choreographer.phase(), Phase::Holding);
}

#[test]
fn test_rebuild_flag_is_a_bounded_pulse() {
    let class = DeviceClass::Desktop;
    let config = ChoreographyConfig::for_class(class);
    let mut host = Host::sphere(class);
    host.blast_through();
    host.glide(1.0, 0.5, 20);
    assert!(host.choreographer.is_rebuild());

    host.run(config.rebuild_duration + config.rebuild_hold + 0.2);
    assert!(!host.choreographer.is_rebuild());
    assert_eq!(host.choreographer.phase(), Phase::Holding);
}

// ============================================================================
// Reset and regions
// ============================================================================

#[test]
fn test_scrolling_to_top_restarts_build() {
    let mut host = Host::sphere(DeviceClass::Desktop);
    host.blast_through();
    host.glide(1.0, 0.0, 60);
    assert!(!host.choreographer.has_blasted());

    let update = host.choreographer.take_update();
    assert!(update.build_progress.is_some());

    host.run(0.05);
    assert!(host.choreographer.build_progress() < 0.1);
    host.run(3.0);
    assert_eq!(host.choreographer.build_progress(), 1.0);
}

#[test]
fn test_region_leave_pauses() {
    let mut host = Host::sphere(DeviceClass::Desktop);
    host.run(3.0);
    host.choreographer.take_update();

    host.choreographer.handle(SceneEvent::RegionLeave);
    assert_eq!(host.choreographer.phase(), Phase::Idle);
    assert_eq!(host.choreographer.take_update().should_animate, Some(false));

    host.choreographer.handle(SceneEvent::RegionEnter);
    assert_eq!(host.choreographer.phase(), Phase::Holding);
    assert_eq!(host.choreographer.take_update().should_animate, Some(true));
}

#[test]
fn test_non_blasting_scene_ignores_blast_zone() {
    let class = DeviceClass::Desktop;
    let mut host = Host::new(SceneConfig::torus(class), class);
    assert_eq!(host.choreographer.phase(), Phase::Holding);
    host.glide(0.0, 1.0, 30);
    host.glide(1.0, 0.0, 30);
    assert_eq!(host.choreographer.blast_progress(), 0.0);
    assert_eq!(host.choreographer.rebuild_count(), 0);
    assert_eq!(host.choreographer.phase(), Phase::Holding);
}

// ============================================================================
// Shapes, pointer and resize
// ============================================================================

#[test]
fn test_shape_shifter_walks_through_shapes() {
    let class = DeviceClass::Desktop;
    let scene = SceneConfig::shape_shifter(class);
    let shapes = scene.shapes.len();
    let mut host = Host::new(scene, class);

    let mut seen = Vec::new();
    for step in 0..=100 {
        host.scroll(step as f32 / 100.0);
        if let Some(index) = host.choreographer.take_resample() {
            seen.push(index);
        }
    }
    assert_eq!(seen, (1..shapes).collect::<Vec<_>>());
    assert_eq!(host.choreographer.shape_index(), shapes - 1);
}

#[test]
fn test_palette_crossfades_toward_shape_colors() {
    let class = DeviceClass::Desktop;
    let scene = SceneConfig::shape_shifter(class);
    let target = scene.palette(2);
    let mut host = Host::new(scene, class);

    host.scroll(0.4);
    assert_eq!(host.choreographer.shape_index(), 2);
    host.run(10.0);
    let colors = host.choreographer.colors();
    assert!((colors.start - target.start).length() < 1e-3);
    assert!((colors.end - target.end).length() < 1e-3);
}

#[test]
fn test_pointer_moves_reach_the_surface() {
    let class = DeviceClass::Desktop;
    let mut host = Host::new(SceneConfig::shape_shifter(class), class);
    host.choreographer.take_update();

    host.choreographer.handle(SceneEvent::PointerMove {
        world: Vec3::new(1.0, 0.5, 0.0),
    });
    host.tick();
    let update = host.choreographer.take_update();
    assert!(update.pointer_position.is_some());

    host.choreographer.set_mode(DisplacementMode::Liquid);
    host.tick();
    assert_eq!(host.choreographer.take_update().is_liquid, Some(true));
}

#[test]
fn test_resize_is_debounced() {
    let mut host = Host::sphere(DeviceClass::Desktop);
    for width in [1000, 900, 800] {
        host.choreographer.handle(SceneEvent::Resize {
            width,
            height: 700,
            device_pixel_ratio: 2.0,
            orientation_changed: false,
        });
        host.tick();
    }
    assert!(host.choreographer.take_viewport().is_none());

    host.run(0.3);
    let viewport = host.choreographer.take_viewport().expect("debounced viewport");
    assert_eq!(viewport.width, 800);
    assert!(host.choreographer.take_viewport().is_none());
    assert!(host.choreographer.take_update().responsive_scale.is_some());
}
