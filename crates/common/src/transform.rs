use crate::cache::CacheCell;
use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// World matrix and the inverse-transpose used for normals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldMatrices {
    pub world: Mat4,
    pub world_inverse_transpose: Mat4,
}

/// Orthonormal orientation basis of a transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Basis {
    pub up: Vec3,
    pub right: Vec3,
    pub forward: Vec3,
}

/// Spatial transform: position, pitch/yaw/roll rotation, scale.
///
/// Left-handed: +X right, +Y up, +Z forward. The world matrix scales first,
/// then rotates (roll about Z, pitch about X, yaw about Y), then translates.
///
/// Derived data lives in two independent caches. Position and scale changes
/// only stale the matrices; rotation changes stale both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transform {
    position: Vec3,
    /// Pitch (x), yaw (y), roll (z) in radians.
    rotation: Vec3,
    scale: Vec3,
    #[serde(skip)]
    matrices: CacheCell<WorldMatrices>,
    #[serde(skip)]
    basis: CacheCell<Basis>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::new(Vec3::ZERO)
    }
}

impl PartialEq for Transform {
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position
            && self.rotation == other.rotation
            && self.scale == other.scale
    }
}

impl Transform {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            matrices: CacheCell::new(),
            basis: CacheCell::new(),
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Rotation as (pitch, yaw, roll) radians.
    pub fn pitch_yaw_roll(&self) -> Vec3 {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.matrices.invalidate();
    }

    pub fn set_rotation(&mut self, pitch_yaw_roll: Vec3) {
        self.rotation = pitch_yaw_roll;
        self.matrices.invalidate();
        self.basis.invalidate();
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.matrices.invalidate();
    }

    /// Translate along world axes.
    pub fn move_absolute(&mut self, delta: Vec3) {
        self.set_position(self.position + delta);
    }

    /// Translate along the transform's own axes.
    pub fn move_relative(&mut self, delta: Vec3) {
        let world_delta = self.orientation() * delta;
        self.set_position(self.position + world_delta);
    }

    /// Add to pitch/yaw/roll.
    pub fn rotate(&mut self, pitch_yaw_roll: Vec3) {
        self.set_rotation(self.rotation + pitch_yaw_roll);
    }

    /// Multiply the current scale component-wise.
    pub fn scale_by(&mut self, factor: Vec3) {
        self.set_scale(self.scale * factor);
    }

    pub fn orientation(&self) -> Quat {
        Quat::from_euler(
            EulerRot::YXZ,
            self.rotation.y,
            self.rotation.x,
            self.rotation.z,
        )
    }

    pub fn world_matrix(&self) -> Mat4 {
        self.matrices().world
    }

    pub fn world_inverse_transpose(&self) -> Mat4 {
        self.matrices().world_inverse_transpose
    }

    pub fn up(&self) -> Vec3 {
        self.basis().up
    }

    pub fn right(&self) -> Vec3 {
        self.basis().right
    }

    pub fn forward(&self) -> Vec3 {
        self.basis().forward
    }

    pub fn matrices(&self) -> WorldMatrices {
        self.matrices.get_or_compute(|| {
            let world =
                Mat4::from_scale_rotation_translation(self.scale, self.orientation(), self.position);
            WorldMatrices {
                world,
                world_inverse_transpose: world.inverse().transpose(),
            }
        })
    }

    pub fn basis(&self) -> Basis {
        self.basis.get_or_compute(|| {
            let q = self.orientation();
            Basis {
                up: q * Vec3::Y,
                right: q * Vec3::X,
                forward: q * Vec3::Z,
            }
        })
    }

    pub fn is_matrix_stale(&self) -> bool {
        self.matrices.is_stale()
    }

    pub fn is_basis_stale(&self) -> bool {
        self.basis.is_stale()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    const EPS: f32 = 1e-5;

    fn assert_vec3_near(a: Vec3, b: Vec3) {
        assert!(a.abs_diff_eq(b, EPS), "{a:?} != {b:?}");
    }

    #[test]
    fn default_is_identity() {
        let t = Transform::default();
        assert_eq!(t.world_matrix(), Mat4::IDENTITY);
        assert_eq!(t.world_inverse_transpose(), Mat4::IDENTITY);
        assert_eq!(t.up(), Vec3::Y);
        assert_eq!(t.right(), Vec3::X);
        assert_eq!(t.forward(), Vec3::Z);
    }

    #[test]
    fn repeated_reads_are_bit_identical() {
        let mut t = Transform::default();
        t.set_scale(Vec3::new(2.0, 0.5, 3.0));
        t.rotate(Vec3::new(0.3, -1.1, 0.7));
        t.move_relative(Vec3::new(1.0, 2.0, 3.0));

        let first = t.world_matrix();
        let first_it = t.world_inverse_transpose();
        for _ in 0..5 {
            assert_eq!(t.world_matrix().to_cols_array(), first.to_cols_array());
            assert_eq!(
                t.world_inverse_transpose().to_cols_array(),
                first_it.to_cols_array()
            );
        }
    }

    #[test]
    fn world_matrix_scales_then_rotates_then_translates() {
        let mut t = Transform::default();
        t.set_scale(Vec3::new(2.0, 1.0, 1.0));
        t.set_rotation(Vec3::new(0.0, FRAC_PI_2, 0.0));
        t.set_position(Vec3::new(10.0, 0.0, 0.0));
        let m = t.world_matrix();

        // (1,0,0) -> scaled (2,0,0) -> yawed (0,0,-2) -> translated (10,0,-2)
        assert_vec3_near(m.transform_point3(Vec3::X), Vec3::new(10.0, 0.0, -2.0));
        // (0,0,1) -> (0,0,1) -> (1,0,0) -> (11,0,0)
        assert_vec3_near(m.transform_point3(Vec3::Z), Vec3::new(11.0, 0.0, 0.0));
        assert_vec3_near(m.transform_point3(Vec3::ZERO), Vec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn inverse_transpose_keeps_normals_perpendicular() {
        let mut t = Transform::default();
        t.set_scale(Vec3::new(4.0, 1.0, 1.0));
        t.set_rotation(Vec3::new(0.0, 0.0, FRAC_PI_4));

        // Surface tangent and normal of the local plane x + y = 0.
        let tangent = Vec3::new(1.0, -1.0, 0.0);
        let normal = Vec3::new(1.0, 1.0, 0.0);
        let world_tangent = t.world_matrix().transform_vector3(tangent);
        let world_normal = t.world_inverse_transpose().transform_vector3(normal);
        assert!(world_tangent.dot(world_normal).abs() < EPS);
    }

    #[test]
    fn move_relative_matches_move_absolute_at_identity_rotation() {
        let delta = Vec3::new(1.5, -2.0, 4.25);
        let mut a = Transform::new(Vec3::new(1.0, 2.0, 3.0));
        let mut b = a.clone();
        a.move_relative(delta);
        b.move_absolute(delta);
        assert_eq!(a.position(), b.position());
        assert_eq!(a.world_matrix(), b.world_matrix());
    }

    #[test]
    fn move_relative_follows_orientation() {
        let mut t = Transform::default();
        t.set_rotation(Vec3::new(0.0, FRAC_PI_2, 0.0));
        t.move_relative(Vec3::Z);
        assert_vec3_near(t.position(), Vec3::X);
    }

    #[test]
    fn basis_stays_orthonormal() {
        let mut t = Transform::default();
        let steps = [
            Vec3::new(0.4, 1.3, -0.2),
            Vec3::new(-2.1, 0.05, 3.3),
            Vec3::new(7.0, -4.5, 0.9),
            Vec3::new(0.0, 0.0, 12.0),
        ];
        for step in steps {
            t.rotate(step);
            let b = t.basis();
            for v in [b.up, b.right, b.forward] {
                assert!((v.length() - 1.0).abs() < EPS);
            }
            assert!(b.up.dot(b.right).abs() < EPS);
            assert!(b.up.dot(b.forward).abs() < EPS);
            assert!(b.right.dot(b.forward).abs() < EPS);
        }
    }

    #[test]
    fn position_change_leaves_basis_valid() {
        let mut t = Transform::default();
        t.world_matrix();
        t.forward();
        assert!(!t.is_matrix_stale());
        assert!(!t.is_basis_stale());

        t.move_absolute(Vec3::ONE);
        assert!(t.is_matrix_stale());
        assert!(!t.is_basis_stale());

        t.scale_by(Vec3::splat(2.0));
        assert!(t.is_matrix_stale());
        assert!(!t.is_basis_stale());

        t.rotate(Vec3::new(0.0, 0.1, 0.0));
        assert!(t.is_basis_stale());

        t.world_matrix();
        assert!(!t.is_matrix_stale());
        assert!(t.is_basis_stale());
        t.up();
        assert!(!t.is_basis_stale());
    }

    #[test]
    fn scale_is_multiplicative() {
        let mut t = Transform::default();
        t.scale_by(Vec3::splat(2.0));
        t.scale_by(Vec3::new(1.0, 3.0, 0.5));
        assert_eq!(t.scale(), Vec3::new(2.0, 6.0, 1.0));
    }

    #[test]
    fn serde_keeps_state_and_drops_caches() {
        let mut t = Transform::new(Vec3::new(1.0, 2.0, 3.0));
        t.set_rotation(Vec3::new(0.1, 0.2, 0.3));
        let expected = t.world_matrix();

        let json = serde_json::to_string(&t).unwrap();
        let back: Transform = serde_json::from_str(&json).unwrap();
        assert!(back.is_matrix_stale());
        assert_eq!(back, t);
        assert_eq!(back.world_matrix(), expected);
    }
}
