//! Rigid camera transforms.
//!
//! An extrinsics matrix `[R | t]` maps world points into the camera frame,
//! `X_cam = R * X_world + t`. A pose matrix is the inverse transform: its
//! rotation block is `R^T` and its last column is the camera center `c` in
//! world coordinates, so `t = -R * c`.

use nalgebra::{DMatrix, Matrix3, Matrix3x4, Vector3};

/// Tolerance used by [`ExtrinsicsMatrix::rigidity_error`] callers.
pub const RIGIDITY_TOLERANCE: f64 = 1e-6;

/// World-to-camera transform `[R | t]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtrinsicsMatrix {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
}

impl ExtrinsicsMatrix {
    pub fn new(rotation: Matrix3<f64>, translation: Vector3<f64>) -> Self {
        ExtrinsicsMatrix {
            rotation,
            translation,
        }
    }

    /// Take the top-left 3x4 block of `matrix` as `[R | t]`, unchanged.
    ///
    /// Returns `None` when `matrix` is smaller than 3x4.
    pub fn from_matrix(matrix: &DMatrix<f64>) -> Option<Self> {
        if matrix.nrows() < 3 || matrix.ncols() < 4 {
            return None;
        }
        let rotation = matrix.fixed_view::<3, 3>(0, 0).into_owned();
        let translation = matrix.fixed_view::<3, 1>(0, 3).into_owned();
        Some(ExtrinsicsMatrix::new(rotation, translation))
    }

    /// Invert a camera-to-world pose.
    ///
    /// With `R_p = pose[0:3, 0:3]` and `c = pose[0:3, 3]`, the result is
    /// `R = R_p^T` and `t = R * (-c)`. The closed form is exact for rigid poses;
    /// no general 4x4 inversion is performed. Returns `None` when `pose` is
    /// smaller than 3x4.
    pub fn from_pose(pose: &DMatrix<f64>) -> Option<Self> {
        if pose.nrows() < 3 || pose.ncols() < 4 {
            return None;
        }
        let rotation = pose.fixed_view::<3, 3>(0, 0).transpose();
        let center: Vector3<f64> = pose.fixed_view::<3, 1>(0, 3).into_owned();
        let translation = rotation * (-center);
        Some(ExtrinsicsMatrix::new(rotation, translation))
    }

    /// Camera center in world coordinates, `c = -R^T * t`.
    pub fn camera_center(&self) -> Vector3<f64> {
        -(self.rotation.transpose() * self.translation)
    }

    /// The 3x4 matrix `[R | t]`.
    pub fn to_matrix(&self) -> Matrix3x4<f64> {
        let mut m = Matrix3x4::zeros();
        m.fixed_view_mut::<3, 3>(0, 0).copy_from(&self.rotation);
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.translation);
        m
    }

    /// Rotation flattened in row-major order.
    pub fn rotation_row_major(&self) -> [f64; 9] {
        let r = &self.rotation;
        [
            r[(0, 0)],
            r[(0, 1)],
            r[(0, 2)],
            r[(1, 0)],
            r[(1, 1)],
            r[(1, 2)],
            r[(2, 0)],
            r[(2, 1)],
            r[(2, 2)],
        ]
    }

    pub fn translation_values(&self) -> [f64; 3] {
        [self.translation.x, self.translation.y, self.translation.z]
    }

    /// How far the rotation block is from a proper rotation.
    ///
    /// Returns the larger of `max |R * R^T - I|` and `|det(R) - 1|`.
    pub fn rigidity_error(&self) -> f64 {
        let orthonormality = (self.rotation * self.rotation.transpose() - Matrix3::identity()).amax();
        let determinant = (self.rotation.determinant() - 1.0).abs();
        orthonormality.max(determinant)
    }

    pub fn is_rigid(&self) -> bool {
        self.rigidity_error() <= RIGIDITY_TOLERANCE
    }
}
