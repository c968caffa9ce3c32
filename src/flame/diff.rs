//! Event-type paired comparison of two profiles.

use serde::Serialize;

use crate::{EventType, EventTypeSummary, FlameGraphDocument, ProfResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffPair {
    #[serde(rename = "eventType")]
    pub event_type: EventType,
    pub label: String,
    pub primary: EventTypeSummary,
    pub secondary: EventTypeSummary,
}

/// Types present with samples on both sides, in primary order.
pub fn pair_event_types(
    primary: &[EventTypeSummary],
    secondary: &[EventTypeSummary],
) -> Vec<DiffPair> {
    primary
        .iter()
        .filter(|p| p.samples > 0)
        .filter_map(|p| {
            let s = secondary
                .iter()
                .find(|s| s.name == p.name && s.samples > 0)?;
            Some(DiffPair {
                event_type: EventType::from_code(&p.name),
                label: p.label.clone(),
                primary: p.clone(),
                secondary: s.clone(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffGraph {
    #[serde(rename = "eventType")]
    pub event_type: EventType,
    pub label: String,
    pub primary: FlameGraphDocument,
    pub secondary: FlameGraphDocument,
}

/// Builds both sides of every pair independently. Trees are never merged.
pub fn generate_diff<P, S>(
    pairs: &[DiffPair],
    mut primary: P,
    mut secondary: S,
) -> ProfResult<Vec<DiffGraph>>
where
    P: FnMut(&EventType) -> ProfResult<FlameGraphDocument>,
    S: FnMut(&EventType) -> ProfResult<FlameGraphDocument>,
{
    pairs
        .iter()
        .map(|pair| {
            Ok(DiffGraph {
                event_type: pair.event_type.clone(),
                label: pair.label.clone(),
                primary: primary(&pair.event_type)?,
                secondary: secondary(&pair.event_type)?,
            })
        })
        .collect()
}
