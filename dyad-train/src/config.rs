//! Loss configuration
//!
//! Every configuration is an immutable value with named defaults. Partial
//! JSON documents deserialize with the remaining fields defaulted.

use crate::error::LossError;
use crate::weight::Gating;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ALPHA: f32 = 10.0;

/// Per-attribute multipliers of the temporal attribute loss.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lambdas {
    pub opacity: f32,
    pub scaling: f32,
    /// Shared by the low- and high-order feature terms.
    pub features: f32,
}

impl Default for Lambdas {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            scaling: 0.1,
            features: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalLossConfig {
    /// Decay rate of the motion weight.
    pub alpha: f32,
    pub lambdas: Lambdas,
}

impl Default for TemporalLossConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            lambdas: Lambdas::default(),
        }
    }
}

impl TemporalLossConfig {
    pub fn validate(&self) -> Result<(), LossError> {
        check_alpha(self.alpha)?;
        let Lambdas {
            opacity,
            scaling,
            features,
        } = self.lambdas;
        for (name, value) in [("opacity", opacity), ("scaling", scaling), ("features", features)] {
            if !value.is_finite() {
                return Err(LossError::InvalidConfig(format!(
                    "lambda '{name}' must be finite, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigidMotionConfig {
    pub alpha: f32,
    pub gating: Gating,
}

impl Default for RigidMotionConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            gating: Gating::default(),
        }
    }
}

impl RigidMotionConfig {
    /// Smooth weighting without the displacement cutoff.
    pub fn ungated(alpha: f32) -> Self {
        Self {
            alpha,
            gating: Gating::Off,
        }
    }

    pub fn validate(&self) -> Result<(), LossError> {
        check_alpha(self.alpha)?;
        if let Gating::Hard { threshold } = self.gating {
            if !(threshold.is_finite() && threshold >= 0.0) {
                return Err(LossError::InvalidConfig(format!(
                    "gate threshold must be finite and non-negative, got {threshold}"
                )));
            }
        }
        Ok(())
    }
}

/// Both regularizers, as read from a configuration file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LossConfig {
    pub temporal: TemporalLossConfig,
    pub rigid_motion: RigidMotionConfig,
}

impl LossConfig {
    pub fn validate(&self) -> Result<(), LossError> {
        self.temporal.validate()?;
        self.rigid_motion.validate()
    }
}

fn check_alpha(alpha: f32) -> Result<(), LossError> {
    if alpha.is_finite() && alpha >= 0.0 {
        Ok(())
    } else {
        Err(LossError::InvalidConfig(format!(
            "alpha must be finite and non-negative, got {alpha}"
        )))
    }
}
