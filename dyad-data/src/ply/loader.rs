//! PLY file loading functions

use crate::error::LoadError;
use crate::ply::layout::{PlyRow, snapshot_from_rows};
use crate::types::AttributeSnapshot;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info, warn};

// serde_ply needs map rows to accept the variable f_rest_* property set
#[derive(Deserialize, Debug)]
struct PlyFile {
    #[serde(rename = "vertex")]
    vertex: Vec<PlyRow>,
}

/// Load one frame of a Gaussian-splat scene from a PLY file (ASCII or binary).
///
/// Expects `x, y, z`, `rot_0..3`, `opacity`, `scale_0..2`, `f_dc_*` and
/// optionally `f_rest_*`. Values are taken as stored (no activation is
/// applied to opacity or scale).
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_snapshot_from_ply<P: AsRef<Path>>(path: P) -> Result<AttributeSnapshot, LoadError> {
    debug!("Loading PLY snapshot");
    let file = File::open(path.as_ref())?;
    let reader = BufReader::new(file);

    let ply_data: PlyFile = serde_ply::from_reader(reader).map_err(|e| {
        warn!("Failed to parse PLY file: {}", e);
        LoadError::Ply(e.to_string())
    })?;

    let snapshot = snapshot_from_rows(&ply_data.vertex)?;
    info!(
        "PLY snapshot parsed: {} points, {} high-order coefficients x {} channels",
        snapshot.len(),
        snapshot.features_high().coeffs(),
        snapshot.features_high().channels()
    );
    Ok(snapshot)
}
