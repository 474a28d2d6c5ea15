//! Gradient buffers returned by the loss backward passes.

use dyad_data::{AttributeSnapshot, RawQuat};
use glam::Vec3;

/// `dL/d(field)` for every attribute of one snapshot.
///
/// Buffers cover the whole snapshot; points outside the aligned range stay
/// zero. Feature gradients use the snapshot's `[N][coeffs][channels]` layout.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotGrad {
    pub position: Vec<Vec3>,
    pub rotation: Vec<RawQuat>,
    pub opacity: Vec<f32>,
    pub scaling: Vec<Vec3>,
    pub features_low: Vec<f32>,
    pub features_high: Vec<f32>,
}

impl SnapshotGrad {
    pub fn zeros_like(snapshot: &AttributeSnapshot) -> Self {
        let n = snapshot.len();
        Self {
            position: vec![Vec3::ZERO; n],
            rotation: vec![[0.0; 4]; n],
            opacity: vec![0.0; n],
            scaling: vec![Vec3::ZERO; n],
            features_low: vec![0.0; snapshot.features_low().as_slice().len()],
            features_high: vec![0.0; snapshot.features_high().as_slice().len()],
        }
    }

    pub(crate) fn add_rotation(&mut self, index: usize, grad: RawQuat) {
        let slot = &mut self.rotation[index];
        for (dst, src) in slot.iter_mut().zip(grad) {
            *dst += src;
        }
    }

    /// Largest absolute entry over all buffers.
    pub fn max_abs(&self) -> f32 {
        let vec3s = self.position.iter().chain(&self.scaling).map(|v| v.abs().max_element());
        let quats = self.rotation.iter().flatten().map(|c| c.abs());
        let scalars = self
            .opacity
            .iter()
            .chain(&self.features_low)
            .chain(&self.features_high)
            .map(|c| c.abs());
        vec3s.chain(quats).chain(scalars).fold(0.0, f32::max)
    }
}

/// Gradients with respect to both frames of a pair.
#[derive(Debug, Clone, PartialEq)]
pub struct LossGrads {
    pub curr: SnapshotGrad,
    pub prev: SnapshotGrad,
}

impl LossGrads {
    pub fn zeros(curr: &AttributeSnapshot, prev: &AttributeSnapshot) -> Self {
        Self {
            curr: SnapshotGrad::zeros_like(curr),
            prev: SnapshotGrad::zeros_like(prev),
        }
    }
}
