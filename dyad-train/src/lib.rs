//! Dyad Training Crate
//!
//! Temporal-consistency regularizers for dynamic point-based scenes. Given the
//! attribute snapshots of two consecutive frames, the losses here penalize
//! implausible frame-to-frame change.
//!
//! ## Modules
//!
//! - [`loss`]: temporal attribute drift and local rigid-motion consistency
//! - [`weight`]: motion-attenuated, gradient-stopped weights
//! - [`rotation`]: quaternion to rotation-matrix conversion and its gradient
//! - [`index`]: compute-once, scatter-by-index utility for edge graphs
//! - [`frame`]: index alignment of frames with different point counts
//! - [`config`]: loss hyperparameters

pub mod config;
pub mod error;
pub mod frame;
pub mod grad;
pub mod index;
pub mod loss;
pub mod rotation;
pub mod weight;

pub use config::{Lambdas, LossConfig, RigidMotionConfig, TemporalLossConfig};
pub use error::LossError;
pub use frame::FramePair;
pub use grad::{LossGrads, SnapshotGrad};
pub use index::UniqueIndex;
pub use loss::{
    RigidMotionLoss, RotationGather, rigid_motion_loss, rigid_motion_loss_and_grad,
    rigid_motion_loss_optimized, rigid_motion_loss_optimized_and_grad, temporal_attribute_loss,
    temporal_attribute_loss_and_grad,
};
pub use rotation::{NormalizedQuaternion, RotationBuilder, rotation_deltas};
pub use weight::{Detached, Gating, detach, gated_edge_weight, point_weight};
