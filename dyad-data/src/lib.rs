//! Dyad Data Crate
//!
//! Per-frame attribute snapshots, neighbor edge lists and their loaders.
//! This crate is optimizer-agnostic and only describes and validates data.

pub mod edges;
pub mod error;
pub mod ply;
pub mod types;

pub use edges::{EdgeError, EdgeList, load_edges_from_json};
pub use error::LoadError;
pub use ply::load_snapshot_from_ply;
pub use types::{AttributeSnapshot, FeatureBlock, IDENTITY_QUAT, RawQuat, ShapeError, SnapshotBuilder};
