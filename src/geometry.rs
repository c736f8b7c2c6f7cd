//! Procedural source meshes for target fields.
//!
//! Only vertex positions matter here: the target-field sampler picks
//! vertices uniformly, so the generators reproduce the usual
//! three.js vertex layouts (seam vertices duplicated, caps included) to get
//! the same visual density distribution.

use std::f32::consts::{PI, TAU};

use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

use crate::capability::{GridSegments, RingSegments, SettingsBundle};

/// A vertex cloud.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Axis-aligned box centered on the origin.
    pub fn boxed(width: f32, height: f32, depth: f32, ws: u32, hs: u32, ds: u32) -> Self {
        let (ws, hs, ds) = (ws.max(1), hs.max(1), ds.max(1));
        let mut positions = Vec::new();
        // (u axis, v axis, w axis, udir, vdir, u size, v size, w size, grid u, grid v)
        let faces = [
            (2, 1, 0, -1.0, -1.0, depth, height, width, ds, hs),
            (2, 1, 0, 1.0, -1.0, depth, height, -width, ds, hs),
            (0, 2, 1, 1.0, 1.0, width, depth, height, ws, ds),
            (0, 2, 1, 1.0, -1.0, width, depth, -height, ws, ds),
            (0, 1, 2, 1.0, -1.0, width, height, depth, ws, hs),
            (0, 1, 2, -1.0, -1.0, width, height, -depth, ws, hs),
        ];
        for (u, v, w, udir, vdir, su, sv, sw, gu, gv) in faces {
            for iy in 0..=gv {
                let y = iy as f32 * sv / gv as f32 - sv / 2.0;
                for ix in 0..=gu {
                    let x = ix as f32 * su / gu as f32 - su / 2.0;
                    let mut p = [0.0f32; 3];
                    p[u] = x * udir;
                    p[v] = y * vdir;
                    p[w] = sw / 2.0;
                    positions.push(Vec3::from_array(p));
                }
            }
        }
        Self { positions }
    }

    /// UV sphere.
    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let (ws, hs) = (width_segments.max(3), height_segments.max(2));
        let mut positions = Vec::with_capacity(((ws + 1) * (hs + 1)) as usize);
        for iy in 0..=hs {
            let v = iy as f32 / hs as f32;
            for ix in 0..=ws {
                let u = ix as f32 / ws as f32;
                positions.push(Vec3::new(
                    -radius * (u * TAU).cos() * (v * PI).sin(),
                    radius * (v * PI).cos(),
                    radius * (u * TAU).sin() * (v * PI).sin(),
                ));
            }
        }
        Self { positions }
    }

    /// Torus in the XY plane.
    pub fn torus(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32) -> Self {
        let (rs, ts) = (radial_segments.max(2), tubular_segments.max(3));
        let mut positions = Vec::with_capacity(((rs + 1) * (ts + 1)) as usize);
        for j in 0..=rs {
            let v = j as f32 / rs as f32 * TAU;
            for i in 0..=ts {
                let u = i as f32 / ts as f32 * TAU;
                positions.push(Vec3::new(
                    (radius + tube * v.cos()) * u.cos(),
                    (radius + tube * v.cos()) * u.sin(),
                    tube * v.sin(),
                ));
            }
        }
        Self { positions }
    }

    /// Cone with its apex up, including the base cap.
    pub fn cone(radius: f32, height: f32, radial_segments: u32, height_segments: u32) -> Self {
        let (rs, hs) = (radial_segments.max(3), height_segments.max(1));
        let half = height / 2.0;
        let mut positions = Vec::new();

        for y in 0..=hs {
            let v = y as f32 / hs as f32;
            let r = v * radius;
            for x in 0..=rs {
                let theta = x as f32 / rs as f32 * TAU;
                positions.push(Vec3::new(r * theta.sin(), -v * height + half, r * theta.cos()));
            }
        }

        // Base cap: one center vertex per segment, then the rim.
        for _ in 0..rs {
            positions.push(Vec3::new(0.0, -half, 0.0));
        }
        for x in 0..=rs {
            let theta = x as f32 / rs as f32 * TAU;
            positions.push(Vec3::new(radius * theta.sin(), -half, radius * theta.cos()));
        }

        Self { positions }
    }

    /// (2, 3) torus knot.
    pub fn torus_knot(radius: f32, tube: f32, tubular_segments: u32, radial_segments: u32) -> Self {
        const P: f32 = 2.0;
        const Q: f32 = 3.0;

        let knot = |u: f32| {
            let cs = (Q / P * u).cos();
            Vec3::new(
                radius * (2.0 + cs) * 0.5 * u.cos(),
                radius * (2.0 + cs) * 0.5 * u.sin(),
                radius * (Q / P * u).sin() * 0.5,
            )
        };

        let (ts, rs) = (tubular_segments.max(3), radial_segments.max(3));
        let mut positions = Vec::with_capacity(((ts + 1) * (rs + 1)) as usize);
        for i in 0..=ts {
            let u = i as f32 / ts as f32 * P * TAU;
            let p1 = knot(u);
            let p2 = knot(u + 0.01);
            let t = p2 - p1;
            let n = p2 + p1;
            let b = t.cross(n).normalize_or_zero();
            let n = b.cross(t).normalize_or_zero();
            for j in 0..=rs {
                let v = j as f32 / rs as f32 * TAU;
                let cx = -tube * v.cos();
                let cy = tube * v.sin();
                positions.push(p1 + cx * n + cy * b);
            }
        }
        Self { positions }
    }

    pub fn rotate_z(mut self, angle: f32) -> Self {
        let m = Mat3::from_rotation_z(angle);
        for p in &mut self.positions {
            *p = m * *p;
        }
        self
    }

    pub fn translate(mut self, offset: Vec3) -> Self {
        for p in &mut self.positions {
            *p += offset;
        }
        self
    }
}

/// A named source shape with its dimensions. Subdivision comes from the
/// active [`SettingsBundle`], optionally raised to a floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    Box {
        size: f32,
    },
    Sphere {
        radius: f32,
        #[serde(default)]
        min_segments: Option<GridSegments>,
    },
    Torus {
        radius: f32,
        tube: f32,
        #[serde(default)]
        min_segments: Option<RingSegments>,
    },
    Cone {
        radius: f32,
        height: f32,
    },
    TorusKnot {
        radius: f32,
        tube: f32,
    },
    /// A box rotated a quarter turn about Z.
    RotatedBox {
        size: f32,
    },
}

impl Shape {
    pub fn name(&self) -> &'static str {
        match self {
            Shape::Box { .. } => "Box",
            Shape::Sphere { .. } => "Sphere",
            Shape::Torus { .. } => "Torus",
            Shape::Cone { .. } => "Cone",
            Shape::TorusKnot { .. } => "TorusKnot",
            Shape::RotatedBox { .. } => "RotatedBox",
        }
    }

    /// Generate the vertex cloud at the subdivision the settings allow.
    pub fn mesh(&self, settings: &SettingsBundle) -> Mesh {
        let b = settings.box_segments;
        match *self {
            Shape::Box { size } => Mesh::boxed(size, size, size, b, b, b),
            Shape::RotatedBox { size } => {
                Mesh::boxed(size, size, size, b, b, b).rotate_z(PI / 4.0)
            }
            Shape::Sphere {
                radius,
                min_segments,
            } => {
                let mut seg = settings.sphere_segments;
                if let Some(min) = min_segments {
                    seg.width = seg.width.max(min.width);
                    seg.height = seg.height.max(min.height);
                }
                Mesh::sphere(radius, seg.width, seg.height)
            }
            Shape::Torus {
                radius,
                tube,
                min_segments,
            } => {
                let mut seg = settings.torus_segments;
                if let Some(min) = min_segments {
                    seg.radial = seg.radial.max(min.radial);
                    seg.tubular = seg.tubular.max(min.tubular);
                }
                Mesh::torus(radius, tube, seg.radial, seg.tubular)
            }
            // Cone subdivision borrows the torus counts: tubular around, radial up.
            Shape::Cone { radius, height } => {
                let seg = settings.torus_segments;
                Mesh::cone(radius, height, seg.tubular, seg.radial)
            }
            Shape::TorusKnot { radius, tube } => {
                let seg = settings.torus_knot_segments;
                Mesh::torus_knot(radius, tube, seg.radial, seg.tubular)
            }
        }
    }
}
