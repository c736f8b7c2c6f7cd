//! The control surface: per-instance parameters the choreographer drives.
//!
//! [`ControlSurface`] is uploaded as one uniform block every frame. It is
//! never validated; out-of-range values produce visually odd but harmless
//! output. The choreographer never writes it directly. It emits
//! [`ControlUpdate`]s, which the simulation applies at most once per frame.
//!
//! ```ignore
//! let update = ControlUpdate {
//!     blast_progress: Some(0.4),
//!     ..Default::default()
//! };
//! simulation.apply(&update);
//! ```

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::ShaderUniforms;

/// Externally settable parameters read by the kernel and the projection.
#[derive(ShaderUniforms, Clone, Copy, Debug, PartialEq)]
pub struct ControlSurface {
    pub should_animate: bool,
    pub blast_progress: f32,
    pub build_progress: f32,
    pub is_rebuild: bool,

    pub pointer_position: Vec3,
    pub pointer_radius: f32,
    pub pointer_direction: Vec3,
    pub pointer_strength: f32,

    /// Repel, attract, swirl and tornado weights. Not normalized.
    pub displacement_weights: Vec4,
    pub is_liquid: bool,
    pub liquid_damping: f32,
    pub liquid_spring: f32,
    /// Liquid spring multiplier, fades in after the pointer stops.
    pub relax_strength: f32,

    pub responsive_scale: f32,
    pub active_shape_index: u32,
    pub start_color: Vec3,
    pub end_color: Vec3,
}

impl Default for ControlSurface {
    fn default() -> Self {
        Self {
            should_animate: true,
            blast_progress: 0.0,
            build_progress: 0.0,
            is_rebuild: false,
            // Far away so an untouched surface never displaces anything.
            pointer_position: Vec3::splat(9999.0),
            pointer_radius: 1.0,
            pointer_direction: Vec3::ZERO,
            pointer_strength: 50.0,
            displacement_weights: DisplacementMode::Repel.weights(),
            is_liquid: false,
            liquid_damping: 3.0,
            liquid_spring: 6.0,
            relax_strength: 1.0,
            responsive_scale: 1.0,
            active_shape_index: 0,
            start_color: Vec3::ONE,
            end_color: Vec3::ONE,
        }
    }
}

impl ControlSurface {
    /// Set the displacement weights and liquid flag for a mode.
    pub fn set_mode(&mut self, mode: DisplacementMode) {
        self.displacement_weights = mode.weights();
        self.is_liquid = mode.is_liquid();
    }
}

/// Pointer interaction styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplacementMode {
    #[default]
    Repel,
    Attract,
    Swirl,
    Tornado,
    /// Velocity impulse along the pointer direction with a spring back.
    Liquid,
}

impl DisplacementMode {
    pub const ALL: [DisplacementMode; 5] = [
        DisplacementMode::Repel,
        DisplacementMode::Attract,
        DisplacementMode::Swirl,
        DisplacementMode::Tornado,
        DisplacementMode::Liquid,
    ];

    /// One-hot weights. Liquid uses none of them.
    pub fn weights(self) -> Vec4 {
        match self {
            DisplacementMode::Repel => Vec4::X,
            DisplacementMode::Attract => Vec4::Y,
            DisplacementMode::Swirl => Vec4::Z,
            DisplacementMode::Tornado => Vec4::W,
            DisplacementMode::Liquid => Vec4::ZERO,
        }
    }

    pub fn is_liquid(self) -> bool {
        self == DisplacementMode::Liquid
    }
}

/// A partial write to a [`ControlSurface`]. `None` leaves a field as is.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControlUpdate {
    pub should_animate: Option<bool>,
    pub blast_progress: Option<f32>,
    pub build_progress: Option<f32>,
    pub is_rebuild: Option<bool>,
    pub pointer_position: Option<Vec3>,
    pub pointer_direction: Option<Vec3>,
    pub pointer_radius: Option<f32>,
    pub pointer_strength: Option<f32>,
    pub displacement_weights: Option<Vec4>,
    pub is_liquid: Option<bool>,
    pub liquid_damping: Option<f32>,
    pub liquid_spring: Option<f32>,
    pub relax_strength: Option<f32>,
    pub active_shape_index: Option<u32>,
    pub responsive_scale: Option<f32>,
    pub start_color: Option<Vec3>,
    pub end_color: Option<Vec3>,
}

impl ControlUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Update that switches the pointer interaction style.
    pub fn mode(mode: DisplacementMode) -> Self {
        Self {
            displacement_weights: Some(mode.weights()),
            is_liquid: Some(mode.is_liquid()),
            ..Self::default()
        }
    }

    /// Overlay `other` on top of `self`; fields set in `other` win.
    pub fn merge(&mut self, other: &ControlUpdate) {
        macro_rules! take {
            ($($field:ident),* $(,)?) => {
                $(if other.$field.is_some() {
                    self.$field = other.$field;
                })*
            };
        }
        take!(
            should_animate,
            blast_progress,
            build_progress,
            is_rebuild,
            pointer_position,
            pointer_direction,
            pointer_radius,
            pointer_strength,
            displacement_weights,
            is_liquid,
            liquid_damping,
            liquid_spring,
            relax_strength,
            active_shape_index,
            responsive_scale,
            start_color,
            end_color,
        );
    }

    /// Write every set field into `surface`.
    pub fn apply(&self, surface: &mut ControlSurface) {
        macro_rules! assign {
            ($($field:ident),* $(,)?) => {
                $(if let Some(v) = self.$field {
                    surface.$field = v;
                })*
            };
        }
        assign!(
            should_animate,
            blast_progress,
            build_progress,
            is_rebuild,
            pointer_position,
            pointer_direction,
            pointer_radius,
            pointer_strength,
            displacement_weights,
            is_liquid,
            liquid_damping,
            liquid_spring,
            relax_strength,
            active_shape_index,
            responsive_scale,
            start_color,
            end_color,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_weights_are_one_hot() {
        for mode in DisplacementMode::ALL {
            let w = mode.weights();
            let sum = w.x + w.y + w.z + w.w;
            if mode.is_liquid() {
                assert_eq!(sum, 0.0);
            } else {
                assert_eq!(sum, 1.0);
            }
        }
    }

    #[test]
    fn test_apply_only_touches_set_fields() {
        let mut surface = ControlSurface::default();
        let update = ControlUpdate {
            blast_progress: Some(0.5),
            is_rebuild: Some(true),
            ..Default::default()
        };
        update.apply(&mut surface);
        assert_eq!(surface.blast_progress, 0.5);
        assert!(surface.is_rebuild);
        assert_eq!(surface.build_progress, 0.0);
        assert!(surface.should_animate);
    }

    #[test]
    fn test_merge_later_wins() {
        let mut a = ControlUpdate {
            blast_progress: Some(0.2),
            build_progress: Some(1.0),
            ..Default::default()
        };
        a.merge(&ControlUpdate {
            blast_progress: Some(0.7),
            ..Default::default()
        });
        assert_eq!(a.blast_progress, Some(0.7));
        assert_eq!(a.build_progress, Some(1.0));
    }

    #[test]
    fn test_mode_update_sets_liquid() {
        let mut surface = ControlSurface::default();
        ControlUpdate::mode(DisplacementMode::Liquid).apply(&mut surface);
        assert!(surface.is_liquid);
        assert_eq!(surface.displacement_weights, Vec4::ZERO);
    }

    #[test]
    fn test_gpu_layout() {
        assert_eq!(
            std::mem::size_of::<ControlSurfaceGpu>(),
            ControlSurface::SIZE as usize
        );
        assert_eq!(ControlSurface::SIZE % 16, 0);
        let offsets: std::collections::HashMap<_, _> =
            ControlSurface::FIELD_OFFSETS.iter().copied().collect();
        assert_eq!(offsets["pointer_position"] % 16, 0);
        assert_eq!(offsets["displacement_weights"] % 16, 0);
        assert_eq!(offsets["pointer_radius"], offsets["pointer_position"] + 12);
    }

    #[test]
    fn test_to_gpu_bools() {
        let surface = ControlSurface {
            is_rebuild: true,
            ..Default::default()
        };
        let gpu = surface.to_gpu();
        assert_eq!(gpu.is_rebuild, 1);
        assert_eq!(gpu.should_animate, 1);
        assert_eq!(gpu.is_liquid, 0);
    }
}
