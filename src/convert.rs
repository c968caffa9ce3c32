//! Offline conversion of exported event containers into flame graphs.

use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;
use std::path::Path;

use crate::{
    EventType, EventTypeSummary, FlameGraph, FlameGraphDocument, FlameOptions, FlamegraphRecord,
    FlamegraphRecordBuilder, Frame, ProfError, ProfResult, RecordBuilder, ThreadInfo, TraceOptions,
};

/// Values below this are offsets rather than epoch milliseconds.
const ABSOLUTE_MILLIS_THRESHOLD: i64 = 1_500_000_000_000;

/// JSON export of one profile: its start time and a flat list of events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventContainer {
    #[serde(rename = "profileId", default)]
    pub profile_id: String,
    /// Epoch milliseconds.
    #[serde(rename = "startTime")]
    pub start_time: i64,
    #[serde(rename = "endTime", default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    #[serde(default)]
    pub events: Vec<ContainerEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerEvent {
    #[serde(rename = "eventType")]
    pub event_type: EventType,
    /// Milliseconds since `startTime`.
    #[serde(rename = "timestampFromStart", default)]
    pub timestamp_from_start: i64,
    #[serde(default = "one")]
    pub samples: u64,
    #[serde(default)]
    pub weight: u64,
    #[serde(rename = "weightEntity", default, skip_serializing_if = "Option::is_none")]
    pub weight_entity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<ThreadInfo>,
    /// Leaf first.
    #[serde(default)]
    pub frames: Vec<Frame>,
}

fn one() -> u64 {
    1
}

impl EventContainer {
    pub fn load(path: &Path) -> ProfResult<Self> {
        let bytes = std::fs::read(path)?;
        let container: Self = serde_json::from_slice(&bytes)?;
        tracing::debug!(
            "loaded {} events of profile {:?} from {}",
            container.events.len(),
            container.profile_id,
            path.display()
        );
        Ok(container)
    }

    /// Declared end, or the latest event when the export carries none.
    pub fn end_millis(&self) -> i64 {
        self.end_time.unwrap_or_else(|| {
            let last = self
                .events
                .iter()
                .map(|e| e.timestamp_from_start)
                .max()
                .unwrap_or(0);
            self.start_time.saturating_add(last)
        })
    }

    /// Resolves a window bound to epoch milliseconds. Negative values count back
    /// from the end, small values forward from the start.
    pub fn resolve_bound(&self, millis: i64) -> i64 {
        if millis < 0 {
            self.end_millis().saturating_add(millis)
        } else if millis < ABSOLUTE_MILLIS_THRESHOLD {
            self.start_time.saturating_add(millis)
        } else {
            millis
        }
    }

    /// Per-type totals, ordered by type code.
    pub fn summaries(&self) -> Vec<EventTypeSummary> {
        let mut totals = BTreeMap::<String, (u64, u64)>::new();
        for event in &self.events {
            let slot = totals.entry(event.event_type.code().to_string()).or_insert((0, 0));
            slot.0 = slot.0.saturating_add(event.samples);
            slot.1 = slot.1.saturating_add(event.weight);
        }
        totals
            .into_iter()
            .map(|(name, (samples, weight))| EventTypeSummary {
                label: name.clone(),
                name,
                samples,
                weight,
            })
            .collect()
    }
}

/// Which family of events a conversion draws from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    #[default]
    Cpu,
    Alloc,
    Lock,
    Live,
}

impl EventKind {
    pub fn event_types(self) -> Vec<EventType> {
        match self {
            Self::Cpu => vec![EventType::ExecutionSample, EventType::WallClockSample],
            Self::Alloc => vec![
                EventType::ObjectAllocationInNewTlab,
                EventType::ObjectAllocationOutsideTlab,
                EventType::ObjectAllocationSample,
            ],
            Self::Lock => vec![
                EventType::JavaMonitorEnter,
                EventType::JavaMonitorWait,
                EventType::ThreadPark,
            ],
            Self::Live => vec![EventType::LiveObject],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub flame: FlameOptions,
    pub trace: TraceOptions,
    pub event: EventKind,
    /// Window bounds, milliseconds; see `EventContainer::resolve_bound`.
    pub from: Option<i64>,
    pub to: Option<i64>,
}

/// Builds the flame graph of every matching event inside the window. Both window
/// bounds are inclusive.
pub fn convert(container: &EventContainer, options: &ConvertOptions) -> ProfResult<FlameGraphDocument> {
    convert_types(container, options, &options.event.event_types())
}

/// Same as `convert`, restricted to a single event type instead of a kind.
pub fn convert_event_type(
    container: &EventContainer,
    event_type: &EventType,
    options: &ConvertOptions,
) -> ProfResult<FlameGraphDocument> {
    convert_types(container, options, std::slice::from_ref(event_type))
}

fn convert_types(
    container: &EventContainer,
    options: &ConvertOptions,
    types: &[EventType],
) -> ProfResult<FlameGraphDocument> {
    let from = options.from.map(|m| container.resolve_bound(m));
    let to = options.to.map(|m| container.resolve_bound(m));
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(ProfError::InvalidArgument(format!(
                "time window starts at {from} after its end {to}"
            )));
        }
    }

    let mut builder =
        FlamegraphRecordBuilder::new(FlameGraph::new(options.flame.clone()), options.trace);
    let mut accepted = 0usize;
    for event in &container.events {
        if !types.contains(&event.event_type) {
            continue;
        }
        let at = container.start_time.saturating_add(event.timestamp_from_start);
        if from.is_some_and(|f| at < f) || to.is_some_and(|t| at > t) {
            continue;
        }
        builder.on_record(FlamegraphRecord {
            event_type: event.event_type.clone(),
            thread: event.thread.clone(),
            weight_entity: event.weight_entity.clone(),
            frames: event.frames.clone(),
            samples: event.samples,
            weight: event.weight,
        })?;
        accepted += 1;
    }
    tracing::debug!(
        "converted {accepted} of {} events of {} types",
        container.events.len(),
        types.len()
    );
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FrameType;

    fn event(ty: EventType, at: i64, method: &str) -> ContainerEvent {
        ContainerEvent {
            event_type: ty,
            timestamp_from_start: at,
            samples: 1,
            weight: 64,
            weight_entity: Some("java/lang/String".to_string()),
            thread: None,
            frames: vec![Frame {
                class_name: "com/acme/App".to_string(),
                method_name: method.to_string(),
                frame_type: FrameType::JitCompiled,
                line_number: 0,
                bytecode_index: 0,
            }],
        }
    }

    fn container() -> EventContainer {
        EventContainer {
            profile_id: "p1".to_string(),
            start_time: 1_700_000_000_000,
            end_time: None,
            events: vec![
                event(EventType::ExecutionSample, 0, "boot"),
                event(EventType::ExecutionSample, 5_000, "work"),
                event(EventType::ExecutionSample, 10_000, "shutdown"),
                event(EventType::ObjectAllocationSample, 6_000, "work"),
            ],
        }
    }

    fn level_titles(doc: &FlameGraphDocument, level: usize) -> Vec<String> {
        doc.levels[level].iter().map(|n| n.title.clone()).collect()
    }

    #[test]
    fn cpu_conversion_ignores_other_event_kinds() {
        let doc = convert(&container(), &ConvertOptions::default()).expect("convert");
        assert_eq!(doc.levels[0][0].width, 3);
        assert_eq!(
            level_titles(&doc, 1),
            ["com/acme/App.boot", "com/acme/App.shutdown", "com/acme/App.work"]
        );
    }

    #[test]
    fn allocation_conversion_adds_class_frame() {
        let options = ConvertOptions {
            event: EventKind::Alloc,
            ..ConvertOptions::default()
        };
        let doc = convert(&container(), &options).expect("convert");
        assert_eq!(level_titles(&doc, 2), ["java.lang.String"]);
    }

    #[test]
    fn window_bounds_resolve_relative_to_start_and_end() {
        let c = container();
        assert_eq!(c.resolve_bound(5_000), 1_700_000_005_000);
        assert_eq!(c.resolve_bound(-1_000), 1_700_000_009_000);
        assert_eq!(c.resolve_bound(1_700_000_001_000), 1_700_000_001_000);

        let options = ConvertOptions {
            from: Some(5_000),
            to: Some(-1),
            ..ConvertOptions::default()
        };
        let doc = convert(&c, &options).expect("convert");
        assert_eq!(level_titles(&doc, 1), ["com/acme/App.work"]);
    }

    #[test]
    fn inverted_window_is_rejected() {
        let options = ConvertOptions {
            from: Some(8_000),
            to: Some(2_000),
            ..ConvertOptions::default()
        };
        assert!(matches!(
            convert(&container(), &options),
            Err(ProfError::InvalidArgument(_))
        ));
    }

    #[test]
    fn single_type_conversion() {
        let doc = convert_event_type(
            &container(),
            &EventType::ObjectAllocationSample,
            &ConvertOptions::default(),
        )
        .expect("convert");
        assert_eq!(doc.levels[0][0].width, 1);
    }

    #[test]
    fn summaries_total_per_type() {
        let summaries = container().summaries();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].name, "jdk.ExecutionSample");
        assert_eq!(summaries[0].samples, 3);
        assert_eq!(summaries[1].weight, 64);
    }

    #[test]
    fn load_reads_json_exports() {
        let path = std::env::temp_dir().join(format!("profscope-container-{}.json", uuid::Uuid::new_v4()));
        let json = r#"{"startTime": 1000, "events": [{"eventType": "jdk.ExecutionSample",
            "frames": [{"methodName": "main", "frameType": "native"}]}]}"#;
        std::fs::write(&path, json).expect("write");
        let loaded = EventContainer::load(&path).expect("load");
        assert_eq!(loaded.events[0].samples, 1);
        assert_eq!(loaded.events[0].frames[0].frame_type, FrameType::Native);
        assert!(EventContainer::load(&path.with_extension("missing")).is_err());
    }
}
