//! Directed neighbor edges between points of the same frame pair.

use crate::error::LoadError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EdgeError {
    #[error("edge index lists differ in length: indices_i has {indices_i}, indices_j has {indices_j}")]
    LengthMismatch { indices_i: usize, indices_j: usize },
}

/// Edge list as it appears on disk, before the length check.
#[derive(Debug, Deserialize)]
struct EdgeRecord {
    indices_i: Vec<u32>,
    indices_j: Vec<u32>,
}

/// Directed edges `indices_i[e] -> indices_j[e]` of a spatial neighbor graph.
///
/// Both sequences always have the same length. Index bounds depend on the
/// frame pair the list is used with and are checked by the consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EdgeRecord")]
pub struct EdgeList {
    indices_i: Vec<u32>,
    indices_j: Vec<u32>,
}

impl EdgeList {
    pub fn new(indices_i: Vec<u32>, indices_j: Vec<u32>) -> Result<Self, EdgeError> {
        if indices_i.len() != indices_j.len() {
            return Err(EdgeError::LengthMismatch {
                indices_i: indices_i.len(),
                indices_j: indices_j.len(),
            });
        }
        Ok(Self {
            indices_i,
            indices_j,
        })
    }

    /// Build from `(source, target)` pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (u32, u32)>) -> Self {
        let (indices_i, indices_j) = pairs.into_iter().unzip();
        Self {
            indices_i,
            indices_j,
        }
    }

    pub fn len(&self) -> usize {
        self.indices_i.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices_i.is_empty()
    }

    /// Edge source indices.
    pub fn sources(&self) -> &[u32] {
        &self.indices_i
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.indices_i
            .iter()
            .copied()
            .zip(self.indices_j.iter().copied())
    }
}

impl TryFrom<EdgeRecord> for EdgeList {
    type Error = EdgeError;

    fn try_from(record: EdgeRecord) -> Result<Self, Self::Error> {
        Self::new(record.indices_i, record.indices_j)
    }
}

/// Load an edge list from `{ "indices_i": [..], "indices_j": [..] }`.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_edges_from_json<P: AsRef<Path>>(path: P) -> Result<EdgeList, LoadError> {
    let file = File::open(path.as_ref())?;
    let edges: EdgeList = serde_json::from_reader(BufReader::new(file))?;
    debug!("Loaded {} edges", edges.len());
    Ok(edges)
}
