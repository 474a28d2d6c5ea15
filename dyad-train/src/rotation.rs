//! Quaternion to rotation-matrix conversion
//!
//! Rotation parameters are optimized as unconstrained 4-vectors in
//! `(w, x, y, z)` order and normalized on use, so the unit-length constraint
//! never leaks into the optimizer state.

use dyad_data::RawQuat;
use glam::{Mat3, Vec3};

/// Maps a raw quaternion to an orthonormal rotation matrix.
pub trait RotationBuilder {
    /// Rotation matrix for `q`. Must normalize internally.
    fn matrix(&self, q: RawQuat) -> Mat3;

    /// Pull an upstream gradient `d_r = dL/dR` back to `dL/dq`.
    fn matrix_vjp(&self, q: RawQuat, d_r: Mat3) -> RawQuat;
}

/// Standard unit-quaternion rotation, `(w, x, y, z)` component order.
///
/// A zero (or non-finite) quaternion maps to the identity and receives no
/// gradient.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedQuaternion;

fn normalized(q: RawQuat) -> Option<(RawQuat, f32)> {
    let norm = q.iter().map(|c| c * c).sum::<f32>().sqrt();
    if norm > f32::EPSILON && norm.is_finite() {
        Some((q.map(|c| c / norm), norm))
    } else {
        None
    }
}

impl RotationBuilder for NormalizedQuaternion {
    fn matrix(&self, q: RawQuat) -> Mat3 {
        let Some(([w, x, y, z], _)) = normalized(q) else {
            return Mat3::IDENTITY;
        };
        Mat3::from_cols(
            Vec3::new(
                1.0 - 2.0 * (y * y + z * z),
                2.0 * (x * y + w * z),
                2.0 * (x * z - w * y),
            ),
            Vec3::new(
                2.0 * (x * y - w * z),
                1.0 - 2.0 * (x * x + z * z),
                2.0 * (y * z + w * x),
            ),
            Vec3::new(
                2.0 * (x * z + w * y),
                2.0 * (y * z - w * x),
                1.0 - 2.0 * (x * x + y * y),
            ),
        )
    }

    fn matrix_vjp(&self, q: RawQuat, d_r: Mat3) -> RawQuat {
        let Some((unit, norm)) = normalized(q) else {
            return [0.0; 4];
        };
        let [w, x, y, z] = unit;

        // g(r, c) = dL/dR[r][c]; glam stores columns
        let g = |r: usize, c: usize| d_r.col(c)[r];

        let dw = g(0, 1) * (-2.0 * z)
            + g(0, 2) * (2.0 * y)
            + g(1, 0) * (2.0 * z)
            + g(1, 2) * (-2.0 * x)
            + g(2, 0) * (-2.0 * y)
            + g(2, 1) * (2.0 * x);

        let dx = g(0, 1) * (2.0 * y)
            + g(0, 2) * (2.0 * z)
            + g(1, 0) * (2.0 * y)
            + g(1, 1) * (-4.0 * x)
            + g(1, 2) * (-2.0 * w)
            + g(2, 0) * (2.0 * z)
            + g(2, 1) * (2.0 * w)
            + g(2, 2) * (-4.0 * x);

        let dy = g(0, 0) * (-4.0 * y)
            + g(0, 1) * (2.0 * x)
            + g(0, 2) * (2.0 * w)
            + g(1, 0) * (2.0 * x)
            + g(1, 2) * (2.0 * z)
            + g(2, 0) * (-2.0 * w)
            + g(2, 1) * (2.0 * z)
            + g(2, 2) * (-4.0 * y);

        let dz = g(0, 0) * (-4.0 * z)
            + g(0, 1) * (-2.0 * w)
            + g(0, 2) * (2.0 * x)
            + g(1, 0) * (2.0 * w)
            + g(1, 1) * (-4.0 * z)
            + g(1, 2) * (2.0 * y)
            + g(2, 0) * (2.0 * x)
            + g(2, 1) * (2.0 * y);

        // Back through q = q_raw / |q_raw|: (I - q q^T) / |q_raw|
        let grad_unit = [dw, dx, dy, dz];
        let dot: f32 = unit.iter().zip(grad_unit.iter()).map(|(a, b)| a * b).sum();
        [
            (dw - w * dot) / norm,
            (dx - x * dot) / norm,
            (dy - y * dot) / norm,
            (dz - z * dot) / norm,
        ]
    }
}

/// Rotation increment `R_curr * R_prev^T` of a single point.
pub fn rotation_delta<B: RotationBuilder>(builder: &B, curr: RawQuat, prev: RawQuat) -> Mat3 {
    builder.matrix(curr) * builder.matrix(prev).transpose()
}

/// Rotation increments for every index-aligned pair of quaternions.
///
/// The result has `min(curr.len(), prev.len())` entries.
pub fn rotation_deltas<B: RotationBuilder>(
    builder: &B,
    curr: &[RawQuat],
    prev: &[RawQuat],
) -> Vec<Mat3> {
    curr.iter()
        .zip(prev.iter())
        .map(|(&c, &p)| rotation_delta(builder, c, p))
        .collect()
}

/// Pull `dL/dΔR` back to the two quaternions that produced `ΔR = R_c R_p^T`.
///
/// Returns `(dL/dq_curr, dL/dq_prev)`.
pub(crate) fn rotation_delta_vjp<B: RotationBuilder>(
    builder: &B,
    curr: RawQuat,
    prev: RawQuat,
    d_delta: Mat3,
) -> (RawQuat, RawQuat) {
    let r_curr = builder.matrix(curr);
    let r_prev = builder.matrix(prev);
    let d_curr = d_delta * r_prev;
    let d_prev = d_delta.transpose() * r_curr;
    (
        builder.matrix_vjp(curr, d_curr),
        builder.matrix_vjp(prev, d_prev),
    )
}
