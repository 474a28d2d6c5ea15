//! Index-aligned pairs of consecutive frames

use crate::error::LossError;
use crate::weight::{Detached, detach};
use dyad_data::{AttributeSnapshot, EdgeList, ShapeError};
use tracing::debug;

/// The current and previous snapshot of a point population.
///
/// Points correspond by index only. When the frames differ in size, the
/// trailing points of the larger one (births or deaths between frames) are
/// left out of every computation on the pair.
#[derive(Debug, Clone, Copy)]
pub struct FramePair<'a> {
    curr: &'a AttributeSnapshot,
    prev: &'a AttributeSnapshot,
    aligned: usize,
}

impl<'a> FramePair<'a> {
    pub fn new(curr: &'a AttributeSnapshot, prev: &'a AttributeSnapshot) -> Self {
        let aligned = curr.len().min(prev.len());
        if curr.len() != prev.len() {
            debug!(
                "Frame sizes differ (curr {}, prev {}); excluding {} unmatched points",
                curr.len(),
                prev.len(),
                curr.len().max(prev.len()) - aligned
            );
        }
        Self {
            curr,
            prev,
            aligned,
        }
    }

    pub fn curr(&self) -> &'a AttributeSnapshot {
        self.curr
    }

    pub fn prev(&self) -> &'a AttributeSnapshot {
        self.prev
    }

    /// `N' = min(N_curr, N_prev)`
    pub fn aligned_len(&self) -> usize {
        self.aligned
    }

    /// Displacement of point `index` between frames, cut from the gradient graph.
    pub fn displacement(&self, index: usize) -> Detached<glam::Vec3> {
        detach(self.curr.position()[index] - self.prev.position()[index])
    }

    /// Both frames must agree on the per-point feature layout.
    pub fn check_feature_layouts(&self) -> Result<(), ShapeError> {
        let pairs = [
            ("features_low", self.curr.features_low(), self.prev.features_low()),
            ("features_high", self.curr.features_high(), self.prev.features_high()),
        ];
        for (field, curr, prev) in pairs {
            if curr.layout() != prev.layout() {
                return Err(ShapeError::LayoutMismatch {
                    field,
                    curr: curr.layout(),
                    prev: prev.layout(),
                });
            }
        }
        Ok(())
    }

    /// Every edge endpoint must fall inside the aligned range.
    pub fn check_edges(&self, edges: &EdgeList) -> Result<(), LossError> {
        let bound = self.aligned;
        for (edge, (i, j)) in edges.iter().enumerate() {
            for index in [i, j] {
                if index as usize >= bound {
                    return Err(LossError::IndexOutOfRange { edge, index, bound });
                }
            }
        }
        Ok(())
    }
}
