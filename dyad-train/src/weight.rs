//! Motion-attenuated weights
//!
//! Weights are derived from how far a point moved between frames. The
//! displacement is a constant for differentiation: nothing downstream of a
//! weight ever sends gradient back into the positions it was measured from.
//! [`Detached`] is the only input the weight functions accept, and no
//! backward pass in this crate reads through it.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Gate threshold on squared displacement used by the rigid-motion loss.
pub const DEFAULT_GATE_THRESHOLD: f32 = 0.002;

/// A value cut out of the gradient graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detached<T>(T);

impl<T: Copy> Detached<T> {
    pub fn get(self) -> T {
        self.0
    }
}

/// Copy `value` out of the gradient graph.
pub fn detach<T>(value: T) -> Detached<T> {
    Detached(value)
}

/// `exp(-alpha * |pos_diff|^2)`
///
/// Equals 1 at zero displacement and decays monotonically with distance.
pub fn point_weight(pos_diff: Detached<Vec3>, alpha: f32) -> f32 {
    (-alpha * pos_diff.get().length_squared()).exp()
}

/// [`point_weight`] with a hard cutoff: zero once `|pos_diff|^2 > threshold`.
///
/// Points that moved further than the threshold are treated as having lost
/// correspondence rather than being smoothly attenuated.
pub fn gated_edge_weight(pos_diff: Detached<Vec3>, alpha: f32, threshold: f32) -> f32 {
    let dist2 = pos_diff.get().length_squared();
    if dist2 > threshold {
        0.0
    } else {
        (-alpha * dist2).exp()
    }
}

/// Whether edge weights apply the hard displacement cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Gating {
    /// Smooth decay only.
    Off,
    /// Zero weight beyond `threshold` squared displacement.
    Hard { threshold: f32 },
}

impl Gating {
    pub fn weight(self, pos_diff: Detached<Vec3>, alpha: f32) -> f32 {
        match self {
            Gating::Off => point_weight(pos_diff, alpha),
            Gating::Hard { threshold } => gated_edge_weight(pos_diff, alpha, threshold),
        }
    }
}

impl Default for Gating {
    fn default() -> Self {
        Gating::Hard {
            threshold: DEFAULT_GATE_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_weight_at_rest() {
        for alpha in [0.0, 0.5, 10.0, 1000.0] {
            assert_eq!(point_weight(detach(Vec3::ZERO), alpha), 1.0);
        }
    }

    #[test]
    fn test_point_weight_decreasing_and_bounded() {
        let alpha = 10.0;
        let mut last = point_weight(detach(Vec3::ZERO), alpha);
        for step in 1..20 {
            let w = point_weight(detach(Vec3::new(0.02 * step as f32, 0.0, 0.0)), alpha);
            assert!(w > 0.0 && w <= 1.0);
            assert!(w < last, "weight must decrease with displacement");
            last = w;
        }
    }

    #[test]
    fn test_point_weight_value() {
        let w = point_weight(detach(Vec3::new(0.1, 0.2, 0.0)), 10.0);
        assert!((w - (-0.5f32).exp()).abs() < 1e-6);
    }

    #[test]
    fn test_gated_weight_cutoff() {
        let alpha = 10.0;
        let inside = detach(Vec3::new(0.04, 0.0, 0.0)); // 0.0016
        let outside = detach(Vec3::new(0.1, 0.0, 0.0)); // 0.01

        assert_eq!(
            gated_edge_weight(inside, alpha, DEFAULT_GATE_THRESHOLD),
            point_weight(inside, alpha)
        );
        assert_eq!(gated_edge_weight(outside, alpha, DEFAULT_GATE_THRESHOLD), 0.0);
    }

    #[test]
    fn test_gate_is_strict() {
        let d = detach(Vec3::new(0.5, 0.0, 0.0));
        assert!(gated_edge_weight(d, 1.0, 0.25) > 0.0);
        assert_eq!(gated_edge_weight(d, 1.0, 0.2499), 0.0);
    }

    #[test]
    fn test_gating_dispatch() {
        let d = detach(Vec3::new(0.1, 0.0, 0.0));
        assert_eq!(Gating::Off.weight(d, 10.0), point_weight(d, 10.0));
        assert_eq!(Gating::default().weight(d, 10.0), 0.0);
    }
}
