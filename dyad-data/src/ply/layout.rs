//! Gaussian-splat PLY property layout
//!
//! Splat trainers write one row per point with scalar properties:
//! `x y z`, `rot_0..3` (w first), `opacity`, `scale_0..2`, `f_dc_*` and
//! `f_rest_*`. Higher-order coefficients are stored channel-major, so
//! `f_rest_{c * K + k}` holds coefficient `k` of channel `c`.

use crate::error::LoadError;
use crate::types::{AttributeSnapshot, FeatureBlock};
use glam::Vec3;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

pub(crate) type PlyRow = HashMap<String, JsonValue>;

const POSITION: [&str; 3] = ["x", "y", "z"];
const ROTATION: [&str; 4] = ["rot_0", "rot_1", "rot_2", "rot_3"];
const SCALING: [&str; 3] = ["scale_0", "scale_1", "scale_2"];

/// Feature coefficient counts discovered from the first row.
#[derive(Debug, Clone)]
pub(crate) struct PropertyLayout {
    dc_names: Vec<String>,
    rest_names: Vec<String>,
}

impl PropertyLayout {
    pub(crate) fn from_row(row: &PlyRow) -> Result<Self, LoadError> {
        let dc_names = numbered_names(row, "f_dc_");
        if dc_names.is_empty() {
            return Err(LoadError::MissingProperty {
                property: "f_dc_0".to_string(),
                vertex: 0,
            });
        }
        let rest_names = numbered_names(row, "f_rest_");
        if rest_names.len() % dc_names.len() != 0 {
            return Err(LoadError::Ply(format!(
                "{} f_rest properties cannot be split across {} channels",
                rest_names.len(),
                dc_names.len()
            )));
        }
        Ok(Self {
            dc_names,
            rest_names,
        })
    }

    pub(crate) fn channels(&self) -> usize {
        self.dc_names.len()
    }

    /// Higher-order coefficients per channel (`K`).
    pub(crate) fn high_coeffs(&self) -> usize {
        self.rest_names.len() / self.channels()
    }
}

/// Count consecutive `prefix0, prefix1, ...` properties present in `row`.
fn numbered_names(row: &PlyRow, prefix: &str) -> Vec<String> {
    (0..)
        .map(|i| format!("{prefix}{i}"))
        .take_while(|name| row.contains_key(name))
        .collect()
}

fn get_f32(row: &PlyRow, property: &str, vertex: usize) -> Result<f32, LoadError> {
    let value = match row.get(property) {
        Some(JsonValue::Number(n)) => n.as_f64().map(|f| f as f32),
        _ => None,
    };
    value.ok_or_else(|| LoadError::MissingProperty {
        property: property.to_string(),
        vertex,
    })
}

fn get_vec3(row: &PlyRow, names: &[&str; 3], vertex: usize) -> Result<Vec3, LoadError> {
    Ok(Vec3::new(
        get_f32(row, names[0], vertex)?,
        get_f32(row, names[1], vertex)?,
        get_f32(row, names[2], vertex)?,
    ))
}

/// Decode splat rows into a validated snapshot.
pub(crate) fn snapshot_from_rows(rows: &[PlyRow]) -> Result<AttributeSnapshot, LoadError> {
    let Some(first) = rows.first() else {
        return Ok(AttributeSnapshot::builder()
            .position(Vec::new())
            .rotation(Vec::new())
            .opacity(Vec::new())
            .scaling(Vec::new())
            .features_low(FeatureBlock::new(Vec::new(), 1, 3))
            .features_high(FeatureBlock::new(Vec::new(), 0, 3))
            .build()?);
    };
    let layout = PropertyLayout::from_row(first)?;
    let channels = layout.channels();
    let k = layout.high_coeffs();
    let n = rows.len();

    let mut position = Vec::with_capacity(n);
    let mut rotation = Vec::with_capacity(n);
    let mut opacity = Vec::with_capacity(n);
    let mut scaling = Vec::with_capacity(n);
    let mut low = Vec::with_capacity(n * channels);
    let mut high = vec![0.0; n * k * channels];

    for (i, row) in rows.iter().enumerate() {
        position.push(get_vec3(row, &POSITION, i)?);
        rotation.push([
            get_f32(row, ROTATION[0], i)?,
            get_f32(row, ROTATION[1], i)?,
            get_f32(row, ROTATION[2], i)?,
            get_f32(row, ROTATION[3], i)?,
        ]);
        opacity.push(get_f32(row, "opacity", i)?);
        scaling.push(get_vec3(row, &SCALING, i)?);

        for name in &layout.dc_names {
            low.push(get_f32(row, name, i)?);
        }
        let base = i * k * channels;
        for (slot, name) in layout.rest_names.iter().enumerate() {
            let (c, coeff) = (slot / k, slot % k);
            high[base + coeff * channels + c] = get_f32(row, name, i)?;
        }
    }

    Ok(AttributeSnapshot::builder()
        .position(position)
        .rotation(rotation)
        .opacity(opacity)
        .scaling(scaling)
        .features_low(FeatureBlock::new(low, 1, channels))
        .features_high(FeatureBlock::new(high, k, channels))
        .build()?)
}
