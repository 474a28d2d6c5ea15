//! Temporal attribute consistency
//!
//! Penalizes per-point attribute drift between consecutive frames. Each
//! point's contribution is attenuated by how far it moved, so points that
//! genuinely travel are free to change appearance.

use crate::config::TemporalLossConfig;
use crate::error::LossError;
use crate::frame::FramePair;
use crate::grad::LossGrads;
use crate::weight::point_weight;
use dyad_data::AttributeSnapshot;
use tracing::debug;

/// Weighted attribute drift between `curr` and `prev`.
///
/// `λ_o·mean(w·Δopacity²) + λ_s·mean(w·Δscaling²)
///  + λ_f·(mean(w·Δfeatures_low²) + mean(w·Δfeatures_high²))`
/// with `w = exp(-α|Δposition|²)` taken as a constant.
#[tracing::instrument(skip_all, fields(curr = curr.len(), prev = prev.len()))]
pub fn temporal_attribute_loss(
    curr: &AttributeSnapshot,
    prev: &AttributeSnapshot,
    config: &TemporalLossConfig,
) -> Result<f32, LossError> {
    evaluate(curr, prev, config, None)
}

/// [`temporal_attribute_loss`] together with its gradients.
///
/// Position and rotation gradients are always zero.
#[tracing::instrument(skip_all, fields(curr = curr.len(), prev = prev.len()))]
pub fn temporal_attribute_loss_and_grad(
    curr: &AttributeSnapshot,
    prev: &AttributeSnapshot,
    config: &TemporalLossConfig,
) -> Result<(f32, LossGrads), LossError> {
    let mut grads = LossGrads::zeros(curr, prev);
    let loss = evaluate(curr, prev, config, Some(&mut grads))?;
    Ok((loss, grads))
}

fn evaluate(
    curr: &AttributeSnapshot,
    prev: &AttributeSnapshot,
    config: &TemporalLossConfig,
    mut grads: Option<&mut LossGrads>,
) -> Result<f32, LossError> {
    config.validate()?;
    let pair = FramePair::new(curr, prev);
    let n = pair.aligned_len();
    if n == 0 {
        debug!("no aligned points, temporal attribute loss is zero");
        return Ok(0.0);
    }
    pair.check_feature_layouts()?;

    let weights: Vec<f32> = (0..n)
        .map(|i| point_weight(pair.displacement(i), config.alpha))
        .collect();
    let drift = WeightedDrift { weights: &weights };
    let lambdas = config.lambdas;

    let opacity = drift.term(
        &curr.opacity()[..n],
        &prev.opacity()[..n],
        1,
        lambdas.opacity,
        grads
            .as_deref_mut()
            .map(|g| (&mut g.curr.opacity[..n], &mut g.prev.opacity[..n])),
    );

    let scaling = drift.term(
        bytemuck::cast_slice(&curr.scaling()[..n]),
        bytemuck::cast_slice(&prev.scaling()[..n]),
        3,
        lambdas.scaling,
        grads.as_deref_mut().map(|g| {
            (
                bytemuck::cast_slice_mut(&mut g.curr.scaling[..n]),
                bytemuck::cast_slice_mut(&mut g.prev.scaling[..n]),
            )
        }),
    );

    let low_stride = curr.features_low().stride();
    let features_low = drift.term(
        curr.features_low().leading(n),
        prev.features_low().leading(n),
        low_stride,
        lambdas.features,
        grads.as_deref_mut().map(|g| {
            (
                &mut g.curr.features_low[..n * low_stride],
                &mut g.prev.features_low[..n * low_stride],
            )
        }),
    );

    let high_stride = curr.features_high().stride();
    let features_high = drift.term(
        curr.features_high().leading(n),
        prev.features_high().leading(n),
        high_stride,
        lambdas.features,
        grads.as_deref_mut().map(|g| {
            (
                &mut g.curr.features_high[..n * high_stride],
                &mut g.prev.features_high[..n * high_stride],
            )
        }),
    );

    let total = opacity + scaling + features_low + features_high;
    debug!(
        aligned = n,
        opacity, scaling, features_low, features_high, total, "temporal attribute loss"
    );
    Ok(total)
}

/// Per-point weights shared by every attribute term.
struct WeightedDrift<'w> {
    weights: &'w [f32],
}

impl WeightedDrift<'_> {
    /// `scale · mean(w · (curr − prev)²)` over `weights.len()` points of
    /// `stride` values each. An empty range yields 0.
    ///
    /// Accumulates `d/dcurr` and `d/dprev` into `grads` when present.
    fn term(
        &self,
        curr: &[f32],
        prev: &[f32],
        stride: usize,
        scale: f32,
        grads: Option<(&mut [f32], &mut [f32])>,
    ) -> f32 {
        let count = self.weights.len() * stride;
        if count == 0 {
            return 0.0;
        }
        let inv_count = 1.0 / count as f32;

        let mut sum = 0.0f64;
        for ((&w, c), p) in self
            .weights
            .iter()
            .zip(curr.chunks_exact(stride))
            .zip(prev.chunks_exact(stride))
        {
            let point: f32 = c.iter().zip(p).map(|(a, b)| (a - b) * (a - b)).sum();
            sum += f64::from(w * point);
        }

        if let Some((d_curr, d_prev)) = grads {
            let rows = d_curr
                .chunks_exact_mut(stride)
                .zip(d_prev.chunks_exact_mut(stride));
            for (((&w, c), p), (gc, gp)) in self
                .weights
                .iter()
                .zip(curr.chunks_exact(stride))
                .zip(prev.chunks_exact(stride))
                .zip(rows)
            {
                let factor = 2.0 * scale * w * inv_count;
                for k in 0..stride {
                    let g = factor * (c[k] - p[k]);
                    gc[k] += g;
                    gp[k] -= g;
                }
            }
        }

        scale * (sum as f32) * inv_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Lambdas;
    use dyad_data::{FeatureBlock, IDENTITY_QUAT, ShapeError};
    use glam::Vec3;

    struct Frame {
        position: Vec<Vec3>,
        opacity: Vec<f32>,
        scaling: Vec<Vec3>,
        low: Vec<f32>,
        high: Vec<f32>,
    }

    impl Frame {
        /// `n` points, 1 low coefficient and 2 high coefficients of 3 channels.
        fn new(n: usize) -> Self {
            Self {
                position: (0..n).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect(),
                opacity: vec![0.5; n],
                scaling: vec![Vec3::splat(0.1); n],
                low: vec![0.2; n * 3],
                high: vec![0.0; n * 6],
            }
        }

        fn build(self) -> AttributeSnapshot {
            let n = self.position.len();
            AttributeSnapshot::builder()
                .position(self.position)
                .rotation(vec![IDENTITY_QUAT; n])
                .opacity(self.opacity)
                .scaling(self.scaling)
                .features_low(FeatureBlock::new(self.low, 1, 3))
                .features_high(FeatureBlock::new(self.high, 2, 3))
                .build()
                .unwrap()
        }
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_identical_frames_have_zero_loss() {
        let mut frame = Frame::new(6);
        frame.high = (0..36).map(|i| i as f32 * 0.1).collect();
        let snapshot = frame.build();
        let loss =
            temporal_attribute_loss(&snapshot, &snapshot, &TemporalLossConfig::default()).unwrap();
        assert_eq!(loss, 0.0);
    }

    #[test]
    fn test_weighted_terms() {
        let prev = Frame::new(2).build();
        let mut curr = Frame::new(2);
        curr.opacity[0] = 1.0; // Δ = 0.5
        curr.scaling[1] = Vec3::new(0.4, 0.1, 0.1); // Δ = 0.3 on one of 6 values
        curr.low[3] = 0.6; // Δ = 0.4 on one of 6 values
        curr.high[0] = 1.2; // Δ = 1.2 on one of 12 values
        let curr = curr.build();

        let loss = temporal_attribute_loss(&curr, &prev, &TemporalLossConfig::default()).unwrap();
        let expected = 1.0 * (0.25 / 2.0)
            + 0.1 * (0.09 / 6.0)
            + 0.1 * (0.16 / 6.0 + 1.44 / 12.0);
        assert!(approx(loss, expected), "{loss} vs {expected}");
    }

    #[test]
    fn test_motion_attenuates_drift() {
        let prev = Frame::new(1).build();
        let mut still = Frame::new(1);
        still.opacity[0] = 0.9;
        let still = still.build();

        let mut moved = Frame::new(1);
        moved.opacity[0] = 0.9;
        moved.position[0] = Vec3::new(0.0, 0.2, 0.0);
        let moved = moved.build();

        let config = TemporalLossConfig::default();
        let base = temporal_attribute_loss(&still, &prev, &config).unwrap();
        let attenuated = temporal_attribute_loss(&moved, &prev, &config).unwrap();
        assert!(approx(attenuated, base * (-10.0f32 * 0.04).exp()));
    }

    #[test]
    fn test_custom_lambdas() {
        let prev = Frame::new(1).build();
        let mut curr = Frame::new(1);
        curr.opacity[0] = 0.7;
        curr.scaling[0] = Vec3::splat(0.4);
        let curr = curr.build();

        let config = TemporalLossConfig {
            alpha: 0.0,
            lambdas: Lambdas {
                opacity: 0.0,
                scaling: 2.0,
                features: 1.0,
            },
        };
        let loss = temporal_attribute_loss(&curr, &prev, &config).unwrap();
        assert!(approx(loss, 2.0 * 0.09));
    }

    #[test]
    fn test_only_aligned_points_participate() {
        let prev = Frame::new(2).build();
        let mut curr = Frame::new(3);
        curr.opacity[2] = 100.0;
        curr.low[8] = -50.0;
        let curr = curr.build();

        let loss = temporal_attribute_loss(&curr, &prev, &TemporalLossConfig::default()).unwrap();
        assert_eq!(loss, 0.0);
        let swapped =
            temporal_attribute_loss(&prev, &curr, &TemporalLossConfig::default()).unwrap();
        assert_eq!(swapped, 0.0);
    }

    #[test]
    fn test_empty_frames_yield_zero() {
        let empty = Frame::new(0).build();
        let other = Frame::new(4).build();
        let loss = temporal_attribute_loss(&empty, &other, &TemporalLossConfig::default()).unwrap();
        assert_eq!(loss, 0.0);
        assert!(!loss.is_nan());
    }

    #[test]
    fn test_empty_frame_with_different_layout_yields_zero() {
        // an empty PLY carries no f_rest properties, a populated one carries 15
        let empty = AttributeSnapshot::builder()
            .position(Vec::new())
            .rotation(Vec::new())
            .opacity(Vec::new())
            .scaling(Vec::new())
            .features_low(FeatureBlock::zeros(0, 1, 3))
            .features_high(FeatureBlock::zeros(0, 0, 3))
            .build()
            .unwrap();
        let full = AttributeSnapshot::builder()
            .position(vec![Vec3::ZERO; 4])
            .rotation(vec![IDENTITY_QUAT; 4])
            .opacity(vec![0.5; 4])
            .scaling(vec![Vec3::splat(0.1); 4])
            .features_low(FeatureBlock::zeros(4, 1, 3))
            .features_high(FeatureBlock::zeros(4, 15, 3))
            .build()
            .unwrap();
        let config = TemporalLossConfig::default();

        assert_eq!(temporal_attribute_loss(&empty, &full, &config), Ok(0.0));
        assert_eq!(temporal_attribute_loss(&full, &empty, &config), Ok(0.0));

        let (loss, grads) = temporal_attribute_loss_and_grad(&full, &empty, &config).unwrap();
        assert_eq!(loss, 0.0);
        assert_eq!(grads.curr.features_high.len(), 4 * 15 * 3);
        assert_eq!(grads.curr.max_abs(), 0.0);
    }

    #[test]
    fn test_layout_mismatch_is_shape_error() {
        let prev = Frame::new(2).build();
        let curr = AttributeSnapshot::builder()
            .position(vec![Vec3::ZERO; 2])
            .rotation(vec![IDENTITY_QUAT; 2])
            .opacity(vec![0.5; 2])
            .scaling(vec![Vec3::splat(0.1); 2])
            .features_low(FeatureBlock::zeros(2, 1, 3))
            .features_high(FeatureBlock::zeros(2, 0, 3))
            .build()
            .unwrap();

        let result = temporal_attribute_loss(&curr, &prev, &TemporalLossConfig::default());
        assert!(matches!(
            result,
            Err(LossError::ShapeMismatch(ShapeError::LayoutMismatch { .. }))
        ));
    }

    #[test]
    fn test_invalid_config() {
        let snapshot = Frame::new(1).build();
        let config = TemporalLossConfig {
            alpha: f32::NAN,
            ..Default::default()
        };
        assert!(matches!(
            temporal_attribute_loss(&snapshot, &snapshot, &config),
            Err(LossError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_gradients_skip_positions() {
        let prev = Frame::new(3).build();
        let mut curr = Frame::new(3);
        curr.position[1] += Vec3::new(0.1, 0.0, 0.0);
        curr.opacity[1] = 0.8;
        let curr = curr.build();

        let (_, grads) =
            temporal_attribute_loss_and_grad(&curr, &prev, &TemporalLossConfig::default()).unwrap();
        assert!(grads.curr.position.iter().all(|g| *g == Vec3::ZERO));
        assert!(grads.prev.position.iter().all(|g| *g == Vec3::ZERO));
        assert!(grads.curr.rotation.iter().flatten().all(|g| *g == 0.0));
        assert!(grads.curr.opacity[1] > 0.0);
        assert!(approx(grads.curr.opacity[1], -grads.prev.opacity[1]));
    }

    #[test]
    fn test_gradients_match_finite_differences() {
        let prev = Frame::new(3).build();
        let config = TemporalLossConfig::default();

        let make = |opacity: f32, scale_x: f32, high0: f32| {
            let mut frame = Frame::new(3);
            frame.position[2] += Vec3::new(0.0, 0.0, 0.3);
            frame.opacity[2] = opacity;
            frame.scaling[2].x = scale_x;
            frame.high[12] = high0;
            frame.build()
        };
        let (o, s, h) = (0.9, 0.6, -0.4);
        let (_, grads) = temporal_attribute_loss_and_grad(&make(o, s, h), &prev, &config).unwrap();

        let eps = 1e-2;
        let loss = |o, s, h| temporal_attribute_loss(&make(o, s, h), &prev, &config).unwrap();
        let d_opacity = (loss(o + eps, s, h) - loss(o - eps, s, h)) / (2.0 * eps);
        let d_scale = (loss(o, s + eps, h) - loss(o, s - eps, h)) / (2.0 * eps);
        let d_high = (loss(o, s, h + eps) - loss(o, s, h - eps)) / (2.0 * eps);

        assert!((d_opacity - grads.curr.opacity[2]).abs() < 1e-4);
        assert!((d_scale - grads.curr.scaling[2].x).abs() < 1e-4);
        assert!((d_high - grads.curr.features_high[12]).abs() < 1e-4);
    }

    #[test]
    fn test_gradients_beyond_aligned_range_are_zero() {
        let prev = Frame::new(2).build();
        let mut curr = Frame::new(4);
        curr.opacity[3] = 3.0;
        let curr = curr.build();

        let (_, grads) =
            temporal_attribute_loss_and_grad(&curr, &prev, &TemporalLossConfig::default()).unwrap();
        assert_eq!(grads.curr.opacity.len(), 4);
        assert_eq!(grads.curr.max_abs(), 0.0);
        assert_eq!(grads.prev.max_abs(), 0.0);
    }
}
