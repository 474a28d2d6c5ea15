//! Frame-pair evaluation for the command-line front end.

use crate::errors::AppError;
use dyad_data::{AttributeSnapshot, EdgeList, load_edges_from_json, load_snapshot_from_ply};
use dyad_train::{LossConfig, RigidMotionLoss, RotationGather, temporal_attribute_loss};
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub struct RunOptions {
    pub curr: PathBuf,
    pub prev: PathBuf,
    pub edges: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub gather: RotationGather,
}

/// Loss values of one frame pair. A term that could not be evaluated for
/// these inputs is reported as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LossReport {
    pub curr_points: usize,
    pub prev_points: usize,
    pub aligned_points: usize,
    pub edges: Option<usize>,
    pub temporal: Option<f32>,
    pub rigid_motion: Option<f32>,
}

pub fn run(options: &RunOptions) -> Result<LossReport, AppError> {
    let config = load_config(options.config.as_deref())?;
    info!("Loading frames {:?} and {:?}", options.curr, options.prev);
    let curr = load_snapshot_from_ply(&options.curr)?;
    let prev = load_snapshot_from_ply(&options.prev)?;
    let edges = options
        .edges
        .as_deref()
        .map(load_edges_from_json)
        .transpose()?;

    let report = evaluate(&curr, &prev, edges.as_ref(), &config, options.gather);
    info!(
        "Evaluated {} aligned points: temporal {:?}, rigid motion {:?}",
        report.aligned_points, report.temporal, report.rigid_motion
    );
    Ok(report)
}

fn load_config(path: Option<&Path>) -> Result<LossConfig, AppError> {
    let config = match path {
        Some(path) => {
            let file = File::open(path)?;
            serde_json::from_reader(BufReader::new(file))?
        }
        None => LossConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

/// Evaluate every term; a term that fails is logged and skipped.
pub fn evaluate(
    curr: &AttributeSnapshot,
    prev: &AttributeSnapshot,
    edges: Option<&EdgeList>,
    config: &LossConfig,
    gather: RotationGather,
) -> LossReport {
    let temporal = temporal_attribute_loss(curr, prev, &config.temporal)
        .inspect_err(|e| warn!("Skipping temporal attribute term: {}", e))
        .ok();

    let rigid_motion = edges.and_then(|edges| {
        RigidMotionLoss::new(config.rigid_motion, gather)
            .evaluate(curr, prev, edges)
            .inspect_err(|e| warn!("Skipping rigid motion term: {}", e))
            .ok()
    });

    LossReport {
        curr_points: curr.len(),
        prev_points: prev.len(),
        aligned_points: curr.len().min(prev.len()),
        edges: edges.map(EdgeList::len),
        temporal,
        rigid_motion,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dyad_data::{FeatureBlock, IDENTITY_QUAT};
    use glam::Vec3;

    fn snapshot(n: usize, opacity: f32) -> AttributeSnapshot {
        AttributeSnapshot::builder()
            .position((0..n).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect())
            .rotation(vec![IDENTITY_QUAT; n])
            .opacity(vec![opacity; n])
            .scaling(vec![Vec3::splat(0.01); n])
            .features_low(FeatureBlock::zeros(n, 1, 3))
            .features_high(FeatureBlock::zeros(n, 3, 3))
            .build()
            .unwrap()
    }

    #[test]
    fn test_report_without_edges() {
        let report = evaluate(
            &snapshot(3, 0.5),
            &snapshot(4, 0.5),
            None,
            &LossConfig::default(),
            RotationGather::PerEdge,
        );
        assert_eq!(report.aligned_points, 3);
        assert_eq!(report.temporal, Some(0.0));
        assert_eq!(report.edges, None);
        assert_eq!(report.rigid_motion, None);
    }

    #[test]
    fn test_failing_term_is_skipped() {
        let edges = EdgeList::from_pairs([(0, 1), (1, 5)]);
        let report = evaluate(
            &snapshot(3, 0.9),
            &snapshot(3, 0.5),
            Some(&edges),
            &LossConfig::default(),
            RotationGather::Deduplicated,
        );
        assert_eq!(report.edges, Some(2));
        assert!(report.temporal.is_some_and(|t| t > 0.0));
        assert_eq!(report.rigid_motion, None);
    }

    #[test]
    fn test_report_serializes_skipped_terms_as_null() {
        let report = LossReport {
            curr_points: 2,
            prev_points: 2,
            aligned_points: 2,
            edges: None,
            temporal: Some(0.25),
            rigid_motion: None,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["temporal"], 0.25);
        assert!(json["rigid_motion"].is_null());
    }
}
