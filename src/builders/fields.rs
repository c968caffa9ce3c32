//! Relabeled JSON fields of configuration-style events.

use serde_json::{Map, Value};

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::{GenericRecord, ProfResult, RecordBuilder};

/// Bookkeeping fields every recorded event carries.
const INTERNAL_FIELDS: [&str; 4] = ["startTime", "duration", "eventThread", "stackTrace"];

/// Immutable field-name to label table. Built once and shared by reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldLabels {
    labels: BTreeMap<String, String>,
    removed: BTreeSet<String>,
}

impl FieldLabels {
    fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            labels: pairs
                .iter()
                .map(|(field, label)| ((*field).to_string(), (*label).to_string()))
                .collect(),
            removed: INTERNAL_FIELDS.iter().map(|f| (*f).to_string()).collect(),
        }
    }

    pub fn gc_config() -> Self {
        Self::from_pairs(&[
            ("youngCollector", "Young Garbage Collector"),
            ("oldCollector", "Old Garbage Collector"),
            ("parallelGCThreads", "Parallel GC Threads"),
            ("concurrentGCThreads", "Concurrent GC Threads"),
            ("usesDynamicGCThreads", "Uses Dynamic GC Threads"),
            ("isExplicitGCConcurrent", "Concurrent Explicit GC"),
            ("isExplicitGCDisabled", "Disabled Explicit GC"),
            ("pauseTarget", "Pause Target"),
            ("gcTimeRatio", "GC Time Ratio"),
        ])
    }

    pub fn gc_heap_config() -> Self {
        Self::from_pairs(&[
            ("minSize", "Minimum Heap Size"),
            ("maxSize", "Maximum Heap Size"),
            ("initialSize", "Initial Heap Size"),
            ("usesCompressedOops", "Compressed Oops"),
            ("compressedOopsMode", "Compressed Oops Mode"),
            ("objectAlignment", "Object Alignment"),
            ("heapAddressBits", "Heap Address Size"),
        ])
    }

    pub fn jit_compiler_config() -> Self {
        Self::from_pairs(&[
            ("threadCount", "Compiler Threads"),
            ("tieredCompilation", "Tiered Compilation"),
            ("dynamicCompilerThreadCount", "Dynamic Compiler Threads"),
        ])
    }

    pub fn container_config() -> Self {
        Self::from_pairs(&[
            ("containerType", "Container Type"),
            ("cpuSlicePeriod", "CPU Slice Period"),
            ("cpuQuota", "CPU Quota"),
            ("cpuShares", "CPU Shares"),
            ("effectiveCpuCount", "Effective CPU Count"),
            ("memorySoftLimit", "Memory Soft Limit"),
            ("memoryLimit", "Memory Limit"),
            ("swapMemoryLimit", "Swap Memory Limit"),
            ("hostTotalMemory", "Host Total Memory"),
            ("hostTotalSwapMemory", "Host Total Swap Memory"),
        ])
    }

    /// A copy with `overrides` replacing or adding labels.
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, String>) -> Self {
        self.labels
            .extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn label(&self, field: &str) -> Option<&str> {
        self.labels.get(field).map(String::as_str)
    }

    pub fn is_removed(&self, field: &str) -> bool {
        self.removed.contains(field)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldsMode {
    /// Only the event latest on the relative time axis.
    Latest,
    /// Every event, in stream order, up to the bound.
    All(usize),
}

pub struct FieldsBuilder<'a> {
    labels: &'a FieldLabels,
    mode: FieldsMode,
    latest: Option<(Duration, Map<String, Value>)>,
    all: Vec<Map<String, Value>>,
    unmapped: BTreeSet<String>,
    dropped: u64,
}

impl<'a> FieldsBuilder<'a> {
    pub fn new(labels: &'a FieldLabels, mode: FieldsMode) -> Self {
        Self {
            labels,
            mode,
            latest: None,
            all: Vec::new(),
            unmapped: BTreeSet::new(),
            dropped: 0,
        }
    }

    fn relabel(&mut self, fields: Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::new();
        for (field, value) in fields {
            if self.labels.is_removed(&field) {
                continue;
            }
            match self.labels.label(&field) {
                Some(label) => {
                    out.insert(label.to_string(), value);
                }
                None => {
                    if self.unmapped.insert(field.clone()) {
                        tracing::warn!("no label for field {field}, passing it through");
                    }
                    out.insert(field, value);
                }
            }
        }
        out
    }
}

impl RecordBuilder<GenericRecord> for FieldsBuilder<'_> {
    type Output = Vec<Map<String, Value>>;

    fn on_record(&mut self, record: GenericRecord) -> ProfResult<()> {
        let at = record.timestamp_from_start;
        match self.mode {
            FieldsMode::Latest => {
                if self.latest.as_ref().is_some_and(|(seen, _)| *seen > at) {
                    return Ok(());
                }
                let fields = self.relabel(record.fields.unwrap_or_default());
                self.latest = Some((at, fields));
            }
            FieldsMode::All(max_events) => {
                if self.all.len() >= max_events {
                    self.dropped += 1;
                    return Ok(());
                }
                let fields = self.relabel(record.fields.unwrap_or_default());
                self.all.push(fields);
            }
        }
        Ok(())
    }

    fn build(self) -> Vec<Map<String, Value>> {
        if self.dropped > 0 {
            tracing::debug!("fields builder dropped {} events over the bound", self.dropped);
        }
        match self.mode {
            FieldsMode::Latest => self.latest.map(|(_, f)| f).into_iter().collect(),
            FieldsMode::All(_) => self.all,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(second: u64, fields: Value) -> GenericRecord {
        GenericRecord {
            timestamp_from_start: Duration::from_secs(second),
            fields: fields.as_object().cloned(),
            ..GenericRecord::default()
        }
    }

    #[test]
    fn latest_relabels_and_drops_internal_fields() {
        let labels = FieldLabels::gc_config();
        let mut builder = FieldsBuilder::new(&labels, FieldsMode::Latest);
        builder
            .on_record(record(5, json!({"youngCollector": "G1New", "startTime": 1})))
            .expect("newer");
        builder
            .on_record(record(1, json!({"youngCollector": "DefNew"})))
            .expect("older");
        let out = builder.build();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get("Young Garbage Collector"), Some(&json!("G1New")));
        assert!(!out[0].contains_key("startTime"));
    }

    #[test]
    fn unmapped_fields_pass_through() {
        let labels = FieldLabels::container_config();
        let mut builder = FieldsBuilder::new(&labels, FieldsMode::Latest);
        builder
            .on_record(record(0, json!({"cpuQuota": 2.0, "futureField": "x"})))
            .expect("record");
        let out = builder.build();
        assert_eq!(out[0].get("CPU Quota"), Some(&json!(2.0)));
        assert_eq!(out[0].get("futureField"), Some(&json!("x")));
    }

    #[test]
    fn all_mode_is_bounded_and_keeps_stream_order() {
        let labels = FieldLabels::jit_compiler_config();
        let mut builder = FieldsBuilder::new(&labels, FieldsMode::All(2));
        for count in [1, 2, 3] {
            builder
                .on_record(record(0, json!({"threadCount": count})))
                .expect("record");
        }
        let out = builder.build();
        let counts: Vec<&Value> = out.iter().filter_map(|f| f.get("Compiler Threads")).collect();
        assert_eq!(counts, [&json!(1), &json!(2)]);
    }

    #[test]
    fn empty_stream_builds_nothing() {
        let labels = FieldLabels::gc_heap_config();
        assert!(FieldsBuilder::new(&labels, FieldsMode::Latest).build().is_empty());
        assert!(FieldsBuilder::new(&labels, FieldsMode::All(10)).build().is_empty());
    }

    #[test]
    fn overrides_replace_preset_labels() {
        let overrides = BTreeMap::from([
            ("maxSize".to_string(), "Heap Limit".to_string()),
            ("custom".to_string(), "Custom".to_string()),
        ]);
        let labels = FieldLabels::gc_heap_config().with_overrides(&overrides);
        assert_eq!(labels.label("maxSize"), Some("Heap Limit"));
        assert_eq!(labels.label("minSize"), Some("Minimum Heap Size"));
        assert_eq!(labels.label("custom"), Some("Custom"));
    }
}
