//! PLY loading for Gaussian-splat frames

mod layout;
mod loader;

pub use loader::load_snapshot_from_ply;
