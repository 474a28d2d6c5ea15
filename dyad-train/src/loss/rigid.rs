//! Local rigid-motion consistency
//!
//! For every neighbor edge `(i, j)` the previous-frame edge vector is carried
//! forward by point `i`'s own rotation increment `ΔR_i = R_curr[i] R_prev[i]^T`
//! and compared with the current-frame edge vector:
//!
//! ```text
//! residual = |ΔR_i (p_prev[j] - p_prev[i]) - (p_curr[j] - p_curr[i])|^2
//! loss     = Σ weight_i · residual / max(edges, 1)
//! ```
//!
//! Neighborhoods that move as one rigid body cost nothing. The edge weight
//! depends only on how far the source point moved and is never differentiated.

use crate::config::RigidMotionConfig;
use crate::error::LossError;
use crate::frame::FramePair;
use crate::grad::LossGrads;
use crate::index::UniqueIndex;
use crate::rotation::{
    NormalizedQuaternion, RotationBuilder, rotation_delta, rotation_delta_vjp, rotation_deltas,
};
use dyad_data::{AttributeSnapshot, EdgeList};
use glam::{Mat3, Vec3};
use tracing::debug;

/// How per-edge rotation increments are looked up.
///
/// Both strategies produce identical per-edge values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RotationGather {
    /// Rebuild `ΔR` of the source point for every edge.
    #[default]
    PerEdge,
    /// Build `ΔR` once per point and the edge weight once per distinct
    /// source, then expand both to edges through a [`UniqueIndex`]. Source-side
    /// position and rotation gradients are reduced per source before they are
    /// scattered back.
    Deduplicated,
}

/// Rigid-motion consistency loss over a neighbor edge graph.
#[derive(Debug, Clone, Copy)]
pub struct RigidMotionLoss<B = NormalizedQuaternion> {
    config: RigidMotionConfig,
    gather: RotationGather,
    builder: B,
}

impl RigidMotionLoss {
    pub fn new(config: RigidMotionConfig, gather: RotationGather) -> Self {
        Self::with_builder(config, gather, NormalizedQuaternion)
    }
}

impl<B: RotationBuilder> RigidMotionLoss<B> {
    pub fn with_builder(config: RigidMotionConfig, gather: RotationGather, builder: B) -> Self {
        Self {
            config,
            gather,
            builder,
        }
    }

    pub fn evaluate(
        &self,
        curr: &AttributeSnapshot,
        prev: &AttributeSnapshot,
        edges: &EdgeList,
    ) -> Result<f32, LossError> {
        self.run(FramePair::new(curr, prev), edges, None)
    }

    pub fn evaluate_with_grad(
        &self,
        curr: &AttributeSnapshot,
        prev: &AttributeSnapshot,
        edges: &EdgeList,
    ) -> Result<(f32, LossGrads), LossError> {
        let mut grads = LossGrads::zeros(curr, prev);
        let loss = self.run(FramePair::new(curr, prev), edges, Some(&mut grads))?;
        Ok((loss, grads))
    }

    fn run(
        &self,
        pair: FramePair<'_>,
        edges: &EdgeList,
        mut grads: Option<&mut LossGrads>,
    ) -> Result<f32, LossError> {
        self.config.validate()?;
        pair.check_edges(edges)?;

        let edge_count = edges.len();
        if edge_count == 0 {
            return Ok(0.0);
        }

        let n = pair.aligned_len();
        let (q_curr, q_prev) = (&pair.curr().rotation()[..n], &pair.prev().rotation()[..n]);
        let (p_curr, p_prev) = (pair.curr().position(), pair.prev().position());

        let sources = match self.gather {
            RotationGather::PerEdge => None,
            RotationGather::Deduplicated => Some(UniqueIndex::new(edges.sources())),
        };
        let (deltas, weights): (Vec<Mat3>, Vec<f32>) = match &sources {
            None => edges
                .sources()
                .iter()
                .map(|&i| {
                    let i = i as usize;
                    (
                        rotation_delta(&self.builder, q_curr[i], q_prev[i]),
                        self.edge_weight(&pair, i),
                    )
                })
                .unzip(),
            Some(index) => {
                let all = rotation_deltas(&self.builder, q_curr, q_prev);
                let per_source: Vec<f32> = index
                    .unique()
                    .iter()
                    .map(|&i| self.edge_weight(&pair, i as usize))
                    .collect();
                (index.expand(&index.gather(&all)), index.expand(&per_source))
            }
        };

        let inv_count = 1.0 / edge_count as f32;
        let backward = grads.is_some();
        let mut d_deltas = edge_buffer(backward, edge_count, Mat3::ZERO);
        let mut d_source_curr = edge_buffer(backward, edge_count, Vec3::ZERO);
        let mut d_source_prev = edge_buffer(backward, edge_count, Vec3::ZERO);
        let mut total = 0.0f64;
        let mut gated = 0usize;

        for (e, (i, j)) in edges.iter().enumerate() {
            let (i, j) = (i as usize, j as usize);
            let weight = weights[e];
            if weight == 0.0 {
                gated += 1;
                continue;
            }

            let d_prev = p_prev[j] - p_prev[i];
            let d_curr = p_curr[j] - p_curr[i];
            let residual = deltas[e] * d_prev - d_curr;
            total += f64::from(weight * residual.length_squared());

            if let Some(g) = grads.as_deref_mut() {
                let g_res = residual * (2.0 * weight * inv_count);
                let g_prev = deltas[e].transpose() * g_res;
                g.curr.position[j] -= g_res;
                g.prev.position[j] += g_prev;
                d_source_curr[e] = g_res;
                d_source_prev[e] = -g_prev;
                d_deltas[e] = outer(g_res, d_prev);
            }
        }

        if let Some(g) = grads {
            match &sources {
                None => {
                    for (e, &i) in edges.sources().iter().enumerate() {
                        let i = i as usize;
                        g.curr.position[i] += d_source_curr[e];
                        g.prev.position[i] += d_source_prev[e];
                        self.backprop_delta(&pair, g, i, d_deltas[e]);
                    }
                }
                Some(index) => {
                    index.scatter_add(
                        &index.reduce(&d_source_curr, Vec3::ZERO),
                        &mut g.curr.position,
                    );
                    index.scatter_add(
                        &index.reduce(&d_source_prev, Vec3::ZERO),
                        &mut g.prev.position,
                    );
                    let per_source = index.reduce(&d_deltas, Mat3::ZERO);
                    for (&i, &d_delta) in index.unique().iter().zip(&per_source) {
                        self.backprop_delta(&pair, g, i as usize, d_delta);
                    }
                }
            }
        }

        let loss = (total / edge_count as f64) as f32;
        debug!(
            aligned = n,
            edges = edge_count,
            gated,
            unique_sources = ?sources.as_ref().map(UniqueIndex::len),
            loss,
            "rigid motion loss"
        );
        Ok(loss)
    }

    /// Stop-gradient weight of every edge leaving point `i`.
    fn edge_weight(&self, pair: &FramePair<'_>, i: usize) -> f32 {
        self.config
            .gating
            .weight(pair.displacement(i), self.config.alpha)
    }

    /// Route `dL/dΔR_i` into the rotation gradients of point `i`.
    fn backprop_delta(&self, pair: &FramePair<'_>, grads: &mut LossGrads, i: usize, d_delta: Mat3) {
        if d_delta == Mat3::ZERO {
            return;
        }
        let (g_curr, g_prev) = rotation_delta_vjp(
            &self.builder,
            pair.curr().rotation()[i],
            pair.prev().rotation()[i],
            d_delta,
        );
        grads.curr.add_rotation(i, g_curr);
        grads.prev.add_rotation(i, g_prev);
    }
}

/// One slot per edge when a backward pass runs, nothing otherwise.
fn edge_buffer<T: Clone>(backward: bool, edge_count: usize, zero: T) -> Vec<T> {
    if backward {
        vec![zero; edge_count]
    } else {
        Vec::new()
    }
}

/// `a b^T`
fn outer(a: Vec3, b: Vec3) -> Mat3 {
    Mat3::from_cols(a * b.x, a * b.y, a * b.z)
}

/// Rigid-motion loss with per-edge rotation lookups.
#[tracing::instrument(skip_all, fields(curr = curr.len(), prev = prev.len(), edges = edges.len()))]
pub fn rigid_motion_loss(
    curr: &AttributeSnapshot,
    prev: &AttributeSnapshot,
    edges: &EdgeList,
    config: &RigidMotionConfig,
) -> Result<f32, LossError> {
    RigidMotionLoss::new(*config, RotationGather::PerEdge).evaluate(curr, prev, edges)
}

#[tracing::instrument(skip_all, fields(curr = curr.len(), prev = prev.len(), edges = edges.len()))]
pub fn rigid_motion_loss_and_grad(
    curr: &AttributeSnapshot,
    prev: &AttributeSnapshot,
    edges: &EdgeList,
    config: &RigidMotionConfig,
) -> Result<(f32, LossGrads), LossError> {
    RigidMotionLoss::new(*config, RotationGather::PerEdge).evaluate_with_grad(curr, prev, edges)
}

/// Same value as [`rigid_motion_loss`], with rotation increments shared
/// between edges that have the same source point.
#[tracing::instrument(skip_all, fields(curr = curr.len(), prev = prev.len(), edges = edges.len()))]
pub fn rigid_motion_loss_optimized(
    curr: &AttributeSnapshot,
    prev: &AttributeSnapshot,
    edges: &EdgeList,
    config: &RigidMotionConfig,
) -> Result<f32, LossError> {
    RigidMotionLoss::new(*config, RotationGather::Deduplicated).evaluate(curr, prev, edges)
}

#[tracing::instrument(skip_all, fields(curr = curr.len(), prev = prev.len(), edges = edges.len()))]
pub fn rigid_motion_loss_optimized_and_grad(
    curr: &AttributeSnapshot,
    prev: &AttributeSnapshot,
    edges: &EdgeList,
    config: &RigidMotionConfig,
) -> Result<(f32, LossGrads), LossError> {
    RigidMotionLoss::new(*config, RotationGather::Deduplicated)
        .evaluate_with_grad(curr, prev, edges)
}
