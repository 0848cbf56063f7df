//! Decomposed bone transforms.
//!
//! Bones are posed with translation, rotation and scale kept separate so that
//! tools can edit one component without re-decomposing a matrix.

use std::ops::Mul;

use cgmath::{Matrix4, One, Quaternion, Vector3};

/// Translation, rotation (as quaternion) and non-uniform scale.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vector3<f32>,
    pub rotation: Quaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Transform {
    /// Identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            translation: Vector3::new(0.0, 0.0, 0.0),
            // `Quaternion::one()` is the identity quaternion (no rotation)
            rotation: Quaternion::one(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.translation)
            * Matrix4::from(self.rotation)
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

impl<'a, 'b> Mul<&'b Transform> for &'a Transform {
    type Output = Transform;

    /// Parent-times-child composition. Exact for uniform scales; with
    /// non-uniform parent scale the shear a matrix product would carry is dropped.
    fn mul(self, rhs: &'b Transform) -> Self::Output {
        let scaled_rhs = Vector3::new(
            self.scale.x * rhs.translation.x,
            self.scale.y * rhs.translation.y,
            self.scale.z * rhs.translation.z,
        );
        Transform {
            translation: self.translation + self.rotation * scaled_rhs,
            rotation: self.rotation * rhs.rotation,
            scale: Vector3::new(
                self.scale.x * rhs.scale.x,
                self.scale.y * rhs.scale.y,
                self.scale.z * rhs.scale.z,
            ),
        }
    }
}

impl Mul<Transform> for Transform {
    type Output = Self;

    fn mul(self, rhs: Transform) -> Self::Output {
        &self * &rhs
    }
}

impl From<Vector3<f32>> for Transform {
    fn from(translation: Vector3<f32>) -> Self {
        Transform {
            translation,
            ..Default::default()
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Deg, Rotation3, SquareMatrix};

    use super::*;

    fn assert_matrix_eq(a: Matrix4<f32>, b: Matrix4<f32>) {
        let a: [[f32; 4]; 4] = a.into();
        let b: [[f32; 4]; 4] = b.into();
        for (col_a, col_b) in a.iter().zip(b.iter()) {
            for (x, y) in col_a.iter().zip(col_b.iter()) {
                assert!((x - y).abs() < 1e-5, "{a:?} != {b:?}");
            }
        }
    }

    #[test]
    fn identity_matrix() {
        assert_matrix_eq(Transform::new().to_matrix(), Matrix4::identity());
    }

    #[test]
    fn composition_matches_matrix_product_for_uniform_scale() {
        let parent = Transform {
            translation: Vector3::new(1.0, 2.0, 3.0),
            rotation: Quaternion::from_angle_y(Deg(90.0)),
            scale: Vector3::new(2.0, 2.0, 2.0),
        };
        let child = Transform {
            translation: Vector3::new(0.5, 0.0, -1.0),
            rotation: Quaternion::from_angle_x(Deg(30.0)),
            scale: Vector3::new(1.0, 1.0, 1.0),
        };
        assert_matrix_eq(
            (&parent * &child).to_matrix(),
            parent.to_matrix() * child.to_matrix(),
        );
    }
}
