//! Core data types for per-frame point attributes.
//!
//! An [`AttributeSnapshot`] is the CPU-side record of every per-point attribute
//! at one timestep. Shapes are checked once, when the snapshot is built, so
//! consumers can index fields without re-validating them.

use glam::Vec3;
use thiserror::Error;

/// Raw rotation quaternion in `(w, x, y, z)` order.
///
/// Values are stored as optimized, so they are not required to be unit length.
pub type RawQuat = [f32; 4];

/// Identity rotation in `(w, x, y, z)` order.
pub const IDENTITY_QUAT: RawQuat = [1.0, 0.0, 0.0, 0.0];

/// Shape errors raised while assembling or pairing snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' has {actual} points, expected {expected}")]
    CountMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("field '{field}' holds {len} values, not a multiple of {coeffs}x{channels}")]
    FeatureLayout {
        field: &'static str,
        len: usize,
        coeffs: usize,
        channels: usize,
    },

    #[error("field '{field}' has {actual} coefficients per channel, expected {expected}")]
    CoefficientCount {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("field '{field}' layout {curr:?} does not match previous frame layout {prev:?}")]
    LayoutMismatch {
        field: &'static str,
        curr: (usize, usize),
        prev: (usize, usize),
    },
}

/// Dense `[N][coeffs][channels]` block of feature coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBlock {
    data: Vec<f32>,
    coeffs: usize,
    channels: usize,
}

impl FeatureBlock {
    /// Wrap row-major feature data. The point count is checked by
    /// [`SnapshotBuilder::build`].
    pub fn new(data: Vec<f32>, coeffs: usize, channels: usize) -> Self {
        Self {
            data,
            coeffs,
            channels,
        }
    }

    /// A block of `points` zeroed coefficients.
    pub fn zeros(points: usize, coeffs: usize, channels: usize) -> Self {
        Self::new(vec![0.0; points * coeffs * channels], coeffs, channels)
    }

    pub fn coeffs(&self) -> usize {
        self.coeffs
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// `(coeffs, channels)`
    pub fn layout(&self) -> (usize, usize) {
        (self.coeffs, self.channels)
    }

    /// Number of values stored per point.
    pub fn stride(&self) -> usize {
        self.coeffs * self.channels
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Coefficients of point `index`, flattened as `[coeffs][channels]`.
    pub fn point(&self, index: usize) -> &[f32] {
        let stride = self.stride();
        &self.data[index * stride..(index + 1) * stride]
    }

    /// The leading `points` rows of the block.
    pub fn leading(&self, points: usize) -> &[f32] {
        &self.data[..points * self.stride()]
    }

    fn check(&self, field: &'static str, expected: usize) -> Result<(), ShapeError> {
        let stride = self.stride();
        if stride == 0 {
            // Zero coefficients (e.g. degree-0 harmonics) hold no data for any N.
            return if self.data.is_empty() {
                Ok(())
            } else {
                Err(self.layout_error(field))
            };
        }
        if self.data.len() % stride != 0 {
            return Err(self.layout_error(field));
        }
        let actual = self.data.len() / stride;
        if actual != expected {
            return Err(ShapeError::CountMismatch {
                field,
                expected,
                actual,
            });
        }
        Ok(())
    }

    fn layout_error(&self, field: &'static str) -> ShapeError {
        ShapeError::FeatureLayout {
            field,
            len: self.data.len(),
            coeffs: self.coeffs,
            channels: self.channels,
        }
    }
}

/// Immutable per-point attributes of one timestep.
///
/// Every field shares the same leading count `N`. Two snapshots of different
/// frames may hold different `N`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSnapshot {
    position: Vec<Vec3>,
    rotation: Vec<RawQuat>,
    opacity: Vec<f32>,
    scaling: Vec<Vec3>,
    features_low: FeatureBlock,
    features_high: FeatureBlock,
}

impl AttributeSnapshot {
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::default()
    }

    /// Number of points `N`.
    pub fn len(&self) -> usize {
        self.position.len()
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_empty()
    }

    pub fn position(&self) -> &[Vec3] {
        &self.position
    }

    pub fn rotation(&self) -> &[RawQuat] {
        &self.rotation
    }

    pub fn opacity(&self) -> &[f32] {
        &self.opacity
    }

    pub fn scaling(&self) -> &[Vec3] {
        &self.scaling
    }

    /// Base (degree-0) feature coefficients, `[N][1][C]`.
    pub fn features_low(&self) -> &FeatureBlock {
        &self.features_low
    }

    /// Higher-order feature coefficients, `[N][K][C]`.
    pub fn features_high(&self) -> &FeatureBlock {
        &self.features_high
    }
}

/// Collects snapshot fields and validates them in [`SnapshotBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct SnapshotBuilder {
    position: Option<Vec<Vec3>>,
    rotation: Option<Vec<RawQuat>>,
    opacity: Option<Vec<f32>>,
    scaling: Option<Vec<Vec3>>,
    features_low: Option<FeatureBlock>,
    features_high: Option<FeatureBlock>,
}

impl SnapshotBuilder {
    pub fn position(mut self, position: Vec<Vec3>) -> Self {
        self.position = Some(position);
        self
    }

    pub fn rotation(mut self, rotation: Vec<RawQuat>) -> Self {
        self.rotation = Some(rotation);
        self
    }

    pub fn opacity(mut self, opacity: Vec<f32>) -> Self {
        self.opacity = Some(opacity);
        self
    }

    pub fn scaling(mut self, scaling: Vec<Vec3>) -> Self {
        self.scaling = Some(scaling);
        self
    }

    pub fn features_low(mut self, features_low: FeatureBlock) -> Self {
        self.features_low = Some(features_low);
        self
    }

    pub fn features_high(mut self, features_high: FeatureBlock) -> Self {
        self.features_high = Some(features_high);
        self
    }

    /// Check field presence and leading counts, then freeze the snapshot.
    ///
    /// The point count is taken from `position`. `features_low` holds exactly
    /// one coefficient per channel.
    pub fn build(self) -> Result<AttributeSnapshot, ShapeError> {
        let position = self.position.ok_or(ShapeError::MissingField("position"))?;
        let rotation = self.rotation.ok_or(ShapeError::MissingField("rotation"))?;
        let opacity = self.opacity.ok_or(ShapeError::MissingField("opacity"))?;
        let scaling = self.scaling.ok_or(ShapeError::MissingField("scaling"))?;
        let features_low = self
            .features_low
            .ok_or(ShapeError::MissingField("features_low"))?;
        let features_high = self
            .features_high
            .ok_or(ShapeError::MissingField("features_high"))?;

        let n = position.len();
        check_count("rotation", n, rotation.len())?;
        check_count("opacity", n, opacity.len())?;
        check_count("scaling", n, scaling.len())?;
        if features_low.coeffs() != 1 {
            return Err(ShapeError::CoefficientCount {
                field: "features_low",
                expected: 1,
                actual: features_low.coeffs(),
            });
        }
        features_low.check("features_low", n)?;
        features_high.check("features_high", n)?;

        Ok(AttributeSnapshot {
            position,
            rotation,
            opacity,
            scaling,
            features_low,
            features_high,
        })
    }
}

fn check_count(field: &'static str, expected: usize, actual: usize) -> Result<(), ShapeError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ShapeError::CountMismatch {
            field,
            expected,
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder(n: usize) -> SnapshotBuilder {
        AttributeSnapshot::builder()
            .position(vec![Vec3::ZERO; n])
            .rotation(vec![IDENTITY_QUAT; n])
            .opacity(vec![0.5; n])
            .scaling(vec![Vec3::splat(0.01); n])
            .features_low(FeatureBlock::zeros(n, 1, 3))
            .features_high(FeatureBlock::zeros(n, 15, 3))
    }

    #[test]
    fn test_build_valid_snapshot() {
        let snapshot = builder(4).build().unwrap();
        assert_eq!(snapshot.len(), 4);
        assert_eq!(snapshot.features_low().layout(), (1, 3));
        assert_eq!(snapshot.features_high().point(3).len(), 45);
    }

    #[test]
    fn test_build_missing_field() {
        let result = AttributeSnapshot::builder()
            .position(vec![Vec3::ZERO])
            .rotation(vec![IDENTITY_QUAT])
            .build();
        assert_eq!(result, Err(ShapeError::MissingField("opacity")));
    }

    #[test]
    fn test_build_count_mismatch() {
        let result = builder(3).opacity(vec![1.0; 2]).build();
        assert_eq!(
            result,
            Err(ShapeError::CountMismatch {
                field: "opacity",
                expected: 3,
                actual: 2,
            })
        );
    }

    #[test]
    fn test_build_feature_layout_error() {
        let result = builder(2)
            .features_low(FeatureBlock::new(vec![0.0; 5], 1, 3))
            .build();
        assert!(matches!(
            result,
            Err(ShapeError::FeatureLayout {
                field: "features_low",
                ..
            })
        ));
    }

    #[test]
    fn test_low_features_hold_one_coefficient() {
        let result = builder(2)
            .features_low(FeatureBlock::zeros(2, 4, 3))
            .build();
        assert_eq!(
            result,
            Err(ShapeError::CoefficientCount {
                field: "features_low",
                expected: 1,
                actual: 4,
            })
        );
    }

    #[test]
    fn test_zero_coefficient_block_accepts_any_count() {
        let snapshot = builder(5)
            .features_high(FeatureBlock::new(Vec::new(), 0, 3))
            .build()
            .unwrap();
        assert_eq!(snapshot.features_high().stride(), 0);
        assert!(snapshot.features_high().as_slice().is_empty());
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = builder(0).build().unwrap();
        assert!(snapshot.is_empty());
    }
}
