//! Fixed perspective camera looking down -Z at the scene.

use glam::{Mat4, Vec2, Vec3};

/// Perspective camera for the backdrop layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    /// Vertical field of view in degrees.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 9.0),
            target: Vec3::ZERO,
            fov_y: 50.0,
            near: 0.1,
            far: 100.0,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y.to_radians(), aspect.max(1e-3), self.near, self.far)
    }

    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        self.projection(aspect) * self.view_matrix()
    }

    /// World-space right and up vectors for billboarding.
    pub fn billboard_axes(&self) -> (Vec3, Vec3) {
        let view = self.view_matrix();
        let right = Vec3::new(view.x_axis.x, view.y_axis.x, view.z_axis.x);
        let up = Vec3::new(view.x_axis.y, view.y_axis.y, view.z_axis.y);
        (right, up)
    }

    /// Ray through a point in normalized device coordinates.
    ///
    /// Returns `(origin, direction)` with a unit direction.
    pub fn ray(&self, ndc: Vec2, aspect: f32) -> (Vec3, Vec3) {
        let inverse = self.view_proj(aspect).inverse();
        let near = inverse.project_point3(ndc.extend(0.0));
        let far = inverse.project_point3(ndc.extend(1.0));
        (self.position, (far - near).normalize_or_zero())
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ray_plane_z0;

    #[test]
    fn test_billboard_axes() {
        let (right, up) = Camera::new().billboard_axes();
        assert!((right - Vec3::X).length() < 1e-5);
        assert!((up - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_center_ray_hits_origin() {
        let camera = Camera::new();
        let (origin, dir) = camera.ray(Vec2::ZERO, 16.0 / 9.0);
        let hit = ray_plane_z0(origin, dir).unwrap();
        assert!(hit.length() < 1e-4);
    }

    #[test]
    fn test_edge_ray_matches_fov() {
        let camera = Camera::new();
        let (origin, dir) = camera.ray(Vec2::new(0.0, 1.0), 1.0);
        let hit = ray_plane_z0(origin, dir).unwrap();
        let expected = 9.0 * (25.0_f32).to_radians().tan();
        assert!((hit.y - expected).abs() < 1e-3);
    }
}
