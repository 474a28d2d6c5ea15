//! Temporal regularization terms
//!
//! Each loss maps a frame pair to one scalar, meant to be scaled and added to
//! a larger training objective by the caller. The `_and_grad` variants also
//! return gradients for both frames.

pub mod rigid;
pub mod temporal;

pub use rigid::{
    RigidMotionLoss, RotationGather, rigid_motion_loss, rigid_motion_loss_and_grad,
    rigid_motion_loss_optimized, rigid_motion_loss_optimized_and_grad,
};
pub use temporal::{temporal_attribute_loss, temporal_attribute_loss_and_grad};
