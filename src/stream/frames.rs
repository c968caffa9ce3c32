//! Per-request frame lookup for queries that return frame hashes.

use std::collections::HashMap;

use crate::sql::{SqlBuilder, eq, p};
use crate::{
    BuiltQuery, EventStore, Frame, FrameType, ParamValue, ProfError, ProfResult, QueryParams, Row,
};

/// Frames of one profile keyed by `frame_hash`, loaded once per request and never shared.
#[derive(Debug, Clone, Default)]
pub struct FramesCache {
    frames: HashMap<i64, Frame>,
}

impl FramesCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(profile_id: &str) -> ProfResult<BuiltQuery> {
        let mut builder = SqlBuilder::select([
            "frame_hash",
            "class_name",
            "method_name",
            "frame_type",
            "line_number",
            "bytecode_index",
        ]);
        builder
            .from("frames")
            .filter(eq("profile_id", p("profile_id")));
        let mut params = QueryParams::new();
        params.insert("profile_id", ParamValue::Text(profile_id.to_string()));
        Ok(BuiltQuery::with_params(builder.build()?, params))
    }

    pub fn load(store: &dyn EventStore, profile_id: &str) -> ProfResult<Self> {
        let query = Self::query(profile_id)?;
        let mut cache = Self::new();
        for row in store.execute(&query)? {
            let row = row?;
            let hash = row
                .i64("frame_hash")?
                .ok_or_else(|| ProfError::DataMapping("frame row without frame_hash".to_string()))?;
            cache.insert(hash, frame_from_row(&row)?);
        }
        tracing::debug!(profile_id, frames = cache.len(), "loaded frames");
        Ok(cache)
    }

    pub fn insert(&mut self, hash: i64, frame: Frame) {
        self.frames.insert(hash, frame);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Resolves hashes in order; an unknown hash fails the row.
    pub fn resolve(&self, hashes: &[i64]) -> ProfResult<Vec<Frame>> {
        hashes
            .iter()
            .map(|hash| {
                self.frames
                    .get(hash)
                    .cloned()
                    .ok_or_else(|| ProfError::DataMapping(format!("unknown frame hash {hash}")))
            })
            .collect()
    }
}

fn frame_from_row(row: &Row) -> ProfResult<Frame> {
    let frame_type = match row.get("frame_type") {
        Some(crate::SqlValue::Int(index)) => u8::try_from(*index)
            .ok()
            .and_then(FrameType::from_index),
        _ => row.text("frame_type")?.and_then(FrameType::parse),
    }
    .ok_or_else(|| ProfError::DataMapping("frame row with unknown frame_type".to_string()))?;

    Ok(Frame {
        class_name: row.text("class_name")?.unwrap_or_default().to_string(),
        method_name: row.require_text("method_name")?.to_string(),
        frame_type,
        line_number: small(row, "line_number")?,
        bytecode_index: small(row, "bytecode_index")?,
    })
}

fn small(row: &Row, column: &str) -> ProfResult<u32> {
    let value = row.u64_or_zero(column)?;
    u32::try_from(value)
        .map_err(|_| ProfError::DataMapping(format!("column {column} out of range: {value}")))
}
