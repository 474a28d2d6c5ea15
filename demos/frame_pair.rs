//! Frame pair regularization example
//!
//! Builds two frames of a small point grid in memory, moves part of it
//! rigidly and part of it erratically, and evaluates both regularizers.
//!
//! Usage:
//!   cargo run --example frame_pair

use dyad_data::{AttributeSnapshot, EdgeList, FeatureBlock, RawQuat};
use dyad_train::{
    LossConfig, RigidMotionConfig, rigid_motion_loss, rigid_motion_loss_optimized,
    temporal_attribute_loss,
};
use glam::{Quat, Vec3};
use std::error::Error;
use tracing::info;

const SIDE: u32 = 6;

fn grid_snapshot(
    positions: Vec<Vec3>,
    rotations: Vec<RawQuat>,
    opacity: f32,
) -> Result<AttributeSnapshot, Box<dyn Error>> {
    let n = positions.len();
    Ok(AttributeSnapshot::builder()
        .position(positions)
        .rotation(rotations)
        .opacity(vec![opacity; n])
        .scaling(vec![Vec3::splat(-4.0); n])
        .features_low(FeatureBlock::zeros(n, 1, 3))
        .features_high(FeatureBlock::zeros(n, 15, 3))
        .build()?)
}

/// 4-neighborhood of a `SIDE x SIDE` grid, both directions.
fn grid_edges() -> EdgeList {
    let id = |x: u32, y: u32| y * SIDE + x;
    let mut pairs = Vec::new();
    for y in 0..SIDE {
        for x in 0..SIDE {
            if x + 1 < SIDE {
                pairs.push((id(x, y), id(x + 1, y)));
                pairs.push((id(x + 1, y), id(x, y)));
            }
            if y + 1 < SIDE {
                pairs.push((id(x, y), id(x, y + 1)));
                pairs.push((id(x, y + 1), id(x, y)));
            }
        }
    }
    EdgeList::from_pairs(pairs)
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let spacing = 0.05;
    let prev_positions: Vec<Vec3> = (0..SIDE * SIDE)
        .map(|k| Vec3::new((k % SIDE) as f32, (k / SIDE) as f32, 0.0) * spacing)
        .collect();
    let count = prev_positions.len();
    let prev = grid_snapshot(prev_positions.clone(), vec![[1.0, 0.0, 0.0, 0.0]; count], 0.8)?;

    // Small rigid turn of the whole grid, then jitter the last row.
    let turn = Quat::from_rotation_z(0.02);
    let mut curr_positions: Vec<Vec3> = prev_positions.iter().map(|&p| turn * p).collect();
    for (k, p) in curr_positions.iter_mut().enumerate().skip(count - SIDE as usize) {
        *p += Vec3::new(0.0, 0.0, 0.01 * (k % 3) as f32);
    }
    let mut curr_rotations = vec![[turn.w, turn.x, turn.y, turn.z]; count];
    // One new point appears in the current frame.
    curr_positions.push(Vec3::splat(10.0));
    curr_rotations.push([1.0, 0.0, 0.0, 0.0]);
    let curr = grid_snapshot(curr_positions, curr_rotations, 0.75)?;

    let edges = grid_edges();
    let config = LossConfig::default();
    info!(
        "Frames: {} -> {} points, {} edges",
        prev.len(),
        curr.len(),
        edges.len()
    );

    let temporal = temporal_attribute_loss(&curr, &prev, &config.temporal)?;
    info!("E_temp = {:.6}", temporal);

    let reference = rigid_motion_loss(&curr, &prev, &edges, &config.rigid_motion)?;
    let optimized = rigid_motion_loss_optimized(&curr, &prev, &edges, &config.rigid_motion)?;
    info!("E_smooth (gated) = {:.6}, deduplicated = {:.6}", reference, optimized);

    let ungated = RigidMotionConfig::ungated(config.rigid_motion.alpha);
    let smooth = rigid_motion_loss_optimized(&curr, &prev, &edges, &ungated)?;
    info!("E_smooth (ungated) = {:.6}", smooth);

    Ok(())
}
