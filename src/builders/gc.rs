//! Garbage-collection overview for every collector family.

use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::builders::round2;
use crate::builders::timeseries::{SecondSeries, SecondValue};
use crate::{
    EventType, GcConfig, GenericRecord, ProfError, ProfResult, RecordBuilder, RelativeTimeRange,
    TopK,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GarbageCollector {
    Serial,
    Parallel,
    G1,
    Z,
    Shenandoah,
}

impl GarbageCollector {
    /// Maps the young-collector name reported by `jdk.GCConfiguration`.
    pub fn from_young_collector(name: &str) -> Option<Self> {
        Some(match name {
            "DefNew" => Self::Serial,
            "ParallelScavenge" => Self::Parallel,
            "G1New" => Self::G1,
            "Z" | "ZGC Minor" => Self::Z,
            "Shenandoah" => Self::Shenandoah,
            _ => return None,
        })
    }

    pub fn young_collector(self) -> &'static str {
        match self {
            Self::Serial => "DefNew",
            Self::Parallel => "ParallelScavenge",
            Self::G1 => "G1New",
            Self::Z => "ZGC Minor",
            Self::Shenandoah => "Shenandoah",
        }
    }

    pub fn young_type(self) -> EventType {
        match self {
            Self::Z => EventType::ZYoungGarbageCollection,
            _ => EventType::YoungGarbageCollection,
        }
    }

    pub fn old_type(self) -> EventType {
        match self {
            Self::Parallel => EventType::ParallelOldGarbageCollection,
            Self::Z => EventType::ZOldGarbageCollection,
            _ => EventType::OldGarbageCollection,
        }
    }

    /// Collectors running marking cycles next to the application.
    pub fn is_concurrent(self) -> bool {
        matches!(self, Self::G1 | Self::Z | Self::Shenandoah)
    }

    /// Event types an overview of this collector reads.
    pub fn event_types(self) -> Vec<EventType> {
        let mut types = vec![
            EventType::GarbageCollection,
            EventType::GcHeapSummary,
            self.young_type(),
            self.old_type(),
        ];
        if self.is_concurrent() {
            types.push(EventType::GcPhaseConcurrent);
        }
        if self == Self::G1 {
            types.push(EventType::G1GarbageCollection);
        }
        types
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GcGeneration {
    Young,
    Old,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GcEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(rename = "timestampFromStart")]
    pub timestamp_from_start: u64,
    #[serde(rename = "gcId")]
    pub gc_id: i64,
    pub generation: GcGeneration,
    pub name: String,
    pub cause: String,
    pub duration: u64,
    #[serde(rename = "beforeGc")]
    pub before_gc: u64,
    #[serde(rename = "afterGc")]
    pub after_gc: u64,
    pub freed: u64,
    pub efficiency: f64,
    #[serde(rename = "sumOfPauses")]
    pub sum_of_pauses: u64,
    #[serde(rename = "longestPause")]
    pub longest_pause: u64,
    pub concurrent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManualGcCalls {
    #[serde(rename = "totalTime")]
    pub total_time: u64,
    #[serde(rename = "systemGcCalls")]
    pub system_gc_calls: u64,
    #[serde(rename = "diagnosticCommandCalls")]
    pub diagnostic_command_calls: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GcHeader {
    #[serde(rename = "totalCollections")]
    pub total_collections: u64,
    #[serde(rename = "youngCollections")]
    pub young_collections: u64,
    #[serde(rename = "oldCollections")]
    pub old_collections: u64,
    #[serde(rename = "maxPauseTime")]
    pub max_pause_time: u64,
    #[serde(rename = "p99PauseTime")]
    pub p99_pause_time: u64,
    #[serde(rename = "p95PauseTime")]
    pub p95_pause_time: u64,
    #[serde(rename = "totalMemoryFreed")]
    pub total_memory_freed: u64,
    #[serde(rename = "avgMemoryFreed")]
    pub avg_memory_freed: u64,
    pub throughput: f64,
    pub overhead: f64,
    #[serde(rename = "totalGcTime")]
    pub total_gc_time: u64,
    #[serde(rename = "collectionFrequency")]
    pub collection_frequency: f64,
    #[serde(rename = "manualGcCalls")]
    pub manual_gc_calls: ManualGcCalls,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PauseBucket {
    pub range: &'static str,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConcurrentPhase {
    pub name: String,
    pub duration: u64,
    #[serde(rename = "timestampFromStart")]
    pub timestamp_from_start: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConcurrentCycle {
    #[serde(rename = "gcId")]
    pub gc_id: i64,
    pub name: String,
    pub generation: GcGeneration,
    pub duration: u64,
    #[serde(rename = "timestampFromStart")]
    pub timestamp_from_start: u64,
    #[serde(rename = "sumOfPauses")]
    pub sum_of_pauses: u64,
    pub phases: Vec<ConcurrentPhase>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GcOverview {
    pub collector: GarbageCollector,
    pub header: GcHeader,
    #[serde(rename = "longestPauses")]
    pub longest_pauses: Vec<GcEvent>,
    #[serde(rename = "pauseDistribution")]
    pub pause_distribution: Vec<PauseBucket>,
    /// Longest pause per second, nanoseconds.
    #[serde(rename = "pauseSeries")]
    pub pause_series: Vec<SecondValue>,
    #[serde(rename = "countSeries")]
    pub count_series: Vec<SecondValue>,
    #[serde(rename = "concurrentCycles", skip_serializing_if = "Option::is_none")]
    pub concurrent_cycles: Option<Vec<ConcurrentCycle>>,
    #[serde(rename = "g1CollectionTypes", skip_serializing_if = "Option::is_none")]
    pub g1_collection_types: Option<BTreeMap<String, u64>>,
}

const PAUSE_BOUNDS_MS: [u64; 10] = [1, 5, 10, 20, 50, 100, 200, 500, 1000, u64::MAX];
const PAUSE_LABELS: [&str; 10] = [
    "0-1ms", "1-5ms", "5-10ms", "10-20ms", "20-50ms", "50-100ms", "100-200ms", "200-500ms",
    "500ms-1s", "1s+",
];

/// Significant digits kept by the pause histogram.
const PAUSE_PRECISION: u8 = 3;

fn pause_percentile(histogram: &Histogram<u64>, percentile: f64) -> u64 {
    if histogram.is_empty() {
        return 0;
    }
    histogram.value_at_percentile(percentile)
}

#[derive(Debug, Default)]
struct CycleState {
    phases: Vec<ConcurrentPhase>,
}

/// Accumulates pauses, heap usage and concurrent cycles of one collector.
///
/// Heap summaries are joined to their collection by `gcId` when the overview is built,
/// so the order of the two event types in the stream does not matter.
pub struct GcOverviewBuilder {
    collector: GarbageCollector,
    range: RelativeTimeRange,
    concurrent_limit: usize,
    total_collections: u64,
    young_collections: u64,
    old_collections: u64,
    total_gc_time: u64,
    max_pause: u64,
    manual: ManualGcCalls,
    histogram: Histogram<u64>,
    distribution: [u64; 10],
    pause_series: SecondSeries,
    count_series: SecondSeries,
    longest: TopK<GcEvent>,
    collected: BTreeSet<i64>,
    heap_before: BTreeMap<i64, u64>,
    heap_after: BTreeMap<i64, u64>,
    cycles: BTreeMap<i64, CycleState>,
    collections: BTreeMap<i64, (String, u64)>,
    g1_types: BTreeMap<String, u64>,
}

impl GcOverviewBuilder {
    pub fn new(
        collector: GarbageCollector,
        range: RelativeTimeRange,
        config: &GcConfig,
    ) -> ProfResult<Self> {
        let histogram = Histogram::<u64>::new(PAUSE_PRECISION)
            .map_err(|err| ProfError::InvalidArgument(format!("pause histogram: {err:?}")))?;
        Ok(Self {
            collector,
            range,
            concurrent_limit: config.concurrent_cycles,
            total_collections: 0,
            young_collections: 0,
            old_collections: 0,
            total_gc_time: 0,
            max_pause: 0,
            manual: ManualGcCalls {
                total_time: 0,
                system_gc_calls: 0,
                diagnostic_command_calls: 0,
            },
            histogram,
            distribution: [0; 10],
            pause_series: SecondSeries::new(&range),
            count_series: SecondSeries::new(&range),
            longest: TopK::new(config.longest_pauses),
            collected: BTreeSet::new(),
            heap_before: BTreeMap::new(),
            heap_after: BTreeMap::new(),
            cycles: BTreeMap::new(),
            collections: BTreeMap::new(),
            g1_types: BTreeMap::new(),
        })
    }

    fn generation(&self, name: &str) -> GcGeneration {
        if name == self.collector.young_collector() {
            GcGeneration::Young
        } else {
            GcGeneration::Old
        }
    }

    fn on_collection(&mut self, record: &GenericRecord) -> ProfResult<()> {
        let gc_id = required_i64(record, "gcId")?;
        let duration = nanos(record.duration);
        self.total_collections += 1;
        self.total_gc_time = self.total_gc_time.saturating_add(duration);
        self.max_pause = self.max_pause.max(duration);
        self.histogram.saturating_record(duration);

        let millis = duration / 1_000_000;
        if let Some(slot) = PAUSE_BOUNDS_MS.iter().position(|bound| millis < *bound) {
            self.distribution[slot] += 1;
        }
        let second = record.timestamp_from_start.as_secs();
        self.pause_series.max(second, duration);
        self.count_series.add(second, 1);

        let name = record.field_str("name").unwrap_or_default().to_string();
        let cause = record.field_str("cause").unwrap_or_default().to_string();
        match cause.as_str() {
            "System.gc()" => {
                self.manual.system_gc_calls += 1;
                self.manual.total_time = self.manual.total_time.saturating_add(duration);
            }
            "Diagnostic Command" => {
                self.manual.diagnostic_command_calls += 1;
                self.manual.total_time = self.manual.total_time.saturating_add(duration);
            }
            _ => {}
        }

        let sum_of_pauses = record.field_u64("sumOfPauses").unwrap_or(duration);
        self.collected.insert(gc_id);
        self.collections.insert(gc_id, (name.clone(), sum_of_pauses));
        let event = GcEvent {
            timestamp: record
                .start_timestamp
                .and_then(|t| i64::try_from(t.unix_timestamp_nanos() / 1_000_000).ok()),
            timestamp_from_start: millis_of(record.timestamp_from_start),
            gc_id,
            generation: self.generation(&name),
            name,
            cause,
            duration,
            before_gc: 0,
            after_gc: 0,
            freed: 0,
            efficiency: 0.0,
            sum_of_pauses,
            longest_pause: record.field_u64("longestPause").unwrap_or(duration),
            concurrent: false,
        };
        self.longest.offer(sum_of_pauses, event);
        Ok(())
    }

    fn on_heap_summary(&mut self, record: &GenericRecord) -> ProfResult<()> {
        let gc_id = required_i64(record, "gcId")?;
        let used = record.field_u64("heapUsed").ok_or_else(|| {
            ProfError::DataMapping(format!("heap summary of gc {gc_id} without heapUsed"))
        })?;
        match record.field_str("when") {
            Some("Before GC") => {
                self.heap_before.insert(gc_id, used);
            }
            Some("After GC") => {
                self.heap_after.insert(gc_id, used);
            }
            _ => {}
        }
        Ok(())
    }

    fn on_concurrent_phase(&mut self, record: &GenericRecord) -> ProfResult<()> {
        let gc_id = required_i64(record, "gcId")?;
        self.cycles.entry(gc_id).or_default().phases.push(ConcurrentPhase {
            name: record.field_str("name").unwrap_or_default().to_string(),
            duration: nanos(record.duration),
            timestamp_from_start: millis_of(record.timestamp_from_start),
        });
        Ok(())
    }

    fn window(&self) -> Duration {
        match (self.range.start, self.range.end) {
            (Some(start), Some(end)) => end.saturating_sub(start),
            (None, Some(end)) => end,
            _ => Duration::ZERO,
        }
    }

    fn build_cycles(&self) -> Vec<ConcurrentCycle> {
        let mut top = TopK::new(self.concurrent_limit);
        for (gc_id, state) in &self.cycles {
            if state.phases.is_empty() {
                continue;
            }
            let duration = state
                .phases
                .iter()
                .fold(0u64, |acc, p| acc.saturating_add(p.duration));
            let (name, sum_of_pauses) = self
                .collections
                .get(gc_id)
                .cloned()
                .unwrap_or_else(|| ("Concurrent GC".to_string(), 0));
            let cycle = ConcurrentCycle {
                gc_id: *gc_id,
                generation: self.generation(&name),
                name,
                duration,
                timestamp_from_start: state
                    .phases
                    .iter()
                    .map(|p| p.timestamp_from_start)
                    .min()
                    .unwrap_or(0),
                sum_of_pauses,
                phases: state.phases.clone(),
            };
            top.offer(duration, cycle);
        }
        top.into_sorted_vec()
    }
}

impl RecordBuilder<GenericRecord> for GcOverviewBuilder {
    type Output = GcOverview;

    fn on_record(&mut self, record: GenericRecord) -> ProfResult<()> {
        let Some(ty) = record.event_type.clone() else {
            return Ok(());
        };
        if ty == EventType::GarbageCollection {
            self.on_collection(&record)
        } else if ty == EventType::GcHeapSummary {
            self.on_heap_summary(&record)
        } else if ty == EventType::GcPhaseConcurrent {
            self.on_concurrent_phase(&record)
        } else if ty == self.collector.young_type() {
            self.young_collections += 1;
            Ok(())
        } else if ty == self.collector.old_type() {
            self.old_collections += 1;
            Ok(())
        } else if ty == EventType::G1GarbageCollection && self.collector == GarbageCollector::G1 {
            let kind = record.field_str("type").unwrap_or("Unknown").to_string();
            *self.g1_types.entry(kind).or_insert(0) += 1;
            Ok(())
        } else {
            Ok(())
        }
    }

    fn build(self) -> GcOverview {
        let total_freed = self
            .collected
            .iter()
            .map(|gc_id| {
                let (before, after) = heap_of(&self.heap_before, &self.heap_after, *gc_id);
                before.saturating_sub(after)
            })
            .fold(0u64, u64::saturating_add);

        let window = self.window();
        let overhead_ratio = if window.is_zero() {
            0.0
        } else {
            self.total_gc_time as f64 / window.as_nanos() as f64
        };
        let frequency = if window.as_secs() == 0 {
            0.0
        } else {
            round2(self.total_collections as f64 / window.as_secs() as f64)
        };

        let concurrent_cycles = self
            .collector
            .is_concurrent()
            .then(|| self.build_cycles());

        let longest_pauses = self
            .longest
            .into_sorted_vec()
            .into_iter()
            .map(|mut event| {
                let (before, after) = heap_of(&self.heap_before, &self.heap_after, event.gc_id);
                event.before_gc = before;
                event.after_gc = after;
                event.freed = before.saturating_sub(after);
                event.efficiency = if before > 0 {
                    round2(event.freed as f64 / before as f64 * 100.0)
                } else {
                    0.0
                };
                event.concurrent = self.cycles.contains_key(&event.gc_id);
                event
            })
            .collect::<Vec<_>>();

        let header = GcHeader {
            total_collections: self.total_collections,
            young_collections: self.young_collections,
            old_collections: self.old_collections,
            max_pause_time: self.max_pause,
            p99_pause_time: pause_percentile(&self.histogram, 99.0),
            p95_pause_time: pause_percentile(&self.histogram, 95.0),
            total_memory_freed: total_freed,
            avg_memory_freed: total_freed.checked_div(self.total_collections).unwrap_or(0),
            throughput: round2(100.0 - overhead_ratio * 100.0),
            overhead: round2(overhead_ratio * 100.0),
            total_gc_time: self.total_gc_time,
            collection_frequency: frequency,
            manual_gc_calls: self.manual,
        };

        GcOverview {
            collector: self.collector,
            header,
            longest_pauses,
            pause_distribution: PAUSE_LABELS
                .into_iter()
                .zip(self.distribution)
                .map(|(range, count)| PauseBucket { range, count })
                .collect(),
            pause_series: self.pause_series.into_points(),
            count_series: self.count_series.into_points(),
            concurrent_cycles,
            g1_collection_types: (self.collector == GarbageCollector::G1).then_some(self.g1_types),
        }
    }
}

fn required_i64(record: &GenericRecord, field: &str) -> ProfResult<i64> {
    record.field_i64(field).ok_or_else(|| {
        ProfError::DataMapping(format!(
            "{} event without {field}",
            record
                .event_type
                .as_ref()
                .map_or("unknown", |ty| ty.code())
        ))
    })
}

fn heap_of(before: &BTreeMap<i64, u64>, after: &BTreeMap<i64, u64>, gc_id: i64) -> (u64, u64) {
    (
        before.get(&gc_id).copied().unwrap_or(0),
        after.get(&gc_id).copied().unwrap_or(0),
    )
}

fn nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

fn millis_of(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn gc_record(ty: EventType, second: u64, duration_ms: u64, fields: serde_json::Value) -> GenericRecord {
        GenericRecord {
            event_type: Some(ty),
            timestamp_from_start: Duration::from_secs(second),
            duration: Duration::from_millis(duration_ms),
            fields: fields.as_object().cloned(),
            ..GenericRecord::default()
        }
    }

    fn collection(gc_id: i64, second: u64, duration_ms: u64, name: &str, cause: &str) -> GenericRecord {
        gc_record(
            EventType::GarbageCollection,
            second,
            duration_ms,
            json!({
                "gcId": gc_id,
                "name": name,
                "cause": cause,
                "sumOfPauses": duration_ms * 1_000_000,
                "longestPause": duration_ms * 1_000_000,
            }),
        )
    }

    fn heap(gc_id: i64, when: &str, used: u64) -> GenericRecord {
        gc_record(
            EventType::GcHeapSummary,
            0,
            0,
            json!({"gcId": gc_id, "when": when, "heapUsed": used}),
        )
    }

    fn config(longest_pauses: usize) -> GcConfig {
        GcConfig {
            longest_pauses,
            concurrent_cycles: 20,
        }
    }

    fn window() -> RelativeTimeRange {
        RelativeTimeRange::new(Duration::ZERO, Duration::from_secs(10))
    }

    fn overview_builder(collector: GarbageCollector, longest_pauses: usize) -> GcOverviewBuilder {
        GcOverviewBuilder::new(collector, window(), &config(longest_pauses)).expect("builder")
    }

    fn feed(builder: &mut GcOverviewBuilder, records: Vec<GenericRecord>) {
        for record in records {
            builder.on_record(record).expect("record");
        }
    }

    #[test]
    fn empty_stream_builds_zeroed_overview() {
        let overview = overview_builder(GarbageCollector::Parallel, 20).build();
        assert_eq!(overview.header.total_collections, 0);
        assert_eq!(overview.header.p99_pause_time, 0);
        assert_eq!(overview.header.throughput, 100.0);
        assert!(overview.longest_pauses.is_empty());
        assert_eq!(overview.pause_distribution.len(), 10);
        assert_eq!(overview.count_series.len(), 10);
        assert!(overview.concurrent_cycles.is_none());
        assert!(overview.g1_collection_types.is_none());
    }

    #[test]
    fn pauses_heap_and_manual_calls_are_tracked() {
        let mut builder = overview_builder(GarbageCollector::Serial, 2);
        feed(
            &mut builder,
            vec![
                collection(1, 0, 3, "DefNew", "Allocation Failure"),
                // heap summaries may follow their collection
                heap(1, "Before GC", 1_000),
                heap(1, "After GC", 400),
                collection(2, 1, 30, "SerialOld", "System.gc()"),
                collection(3, 1, 8, "DefNew", "Diagnostic Command"),
                gc_record(EventType::YoungGarbageCollection, 0, 3, json!({"gcId": 1})),
                gc_record(EventType::OldGarbageCollection, 1, 30, json!({"gcId": 2})),
            ],
        );
        let overview = builder.build();
        let header = &overview.header;
        assert_eq!(header.total_collections, 3);
        assert_eq!((header.young_collections, header.old_collections), (1, 1));
        assert_eq!(header.max_pause_time, 30_000_000);
        assert!((30_000_000..30_100_000).contains(&header.p99_pause_time));
        assert_eq!(header.total_memory_freed, 600);
        assert_eq!(header.manual_gc_calls.system_gc_calls, 1);
        assert_eq!(header.manual_gc_calls.diagnostic_command_calls, 1);
        assert_eq!(header.manual_gc_calls.total_time, 38_000_000);

        let ids: Vec<i64> = overview.longest_pauses.iter().map(|e| e.gc_id).collect();
        assert_eq!(ids, [2, 3]);
        assert_eq!(overview.longest_pauses[0].generation, GcGeneration::Old);

        let counts: Vec<u64> = overview.pause_distribution.iter().map(|b| b.count).collect();
        assert_eq!(counts, [0, 1, 1, 0, 1, 0, 0, 0, 0, 0]);
        assert_eq!(overview.count_series[1].value, 2);
        assert_eq!(overview.pause_series[1].value, 30_000_000);
    }

    #[test]
    fn heap_efficiency_is_filled_at_build() {
        let mut builder = overview_builder(GarbageCollector::Serial, 5);
        feed(
            &mut builder,
            vec![
                heap(7, "Before GC", 800),
                heap(7, "After GC", 200),
                collection(7, 2, 5, "DefNew", "Allocation Failure"),
            ],
        );
        let event = &builder.build().longest_pauses[0];
        assert_eq!((event.before_gc, event.after_gc, event.freed), (800, 200, 600));
        assert_eq!(event.efficiency, 75.0);
    }

    #[test]
    fn missing_gc_id_fails_the_row() {
        let mut builder = overview_builder(GarbageCollector::Serial, 5);
        let record = gc_record(EventType::GarbageCollection, 0, 1, json!({"name": "DefNew"}));
        assert!(matches!(builder.on_record(record), Err(ProfError::DataMapping(_))));
    }

    #[test]
    fn concurrent_collectors_report_cycles() {
        let mut builder = overview_builder(GarbageCollector::Z, 5);
        feed(
            &mut builder,
            vec![
                gc_record(EventType::GcPhaseConcurrent, 1, 40, json!({"gcId": 4, "name": "Concurrent Mark"})),
                gc_record(EventType::GcPhaseConcurrent, 2, 10, json!({"gcId": 4, "name": "Concurrent Relocate"})),
                gc_record(EventType::GcPhaseConcurrent, 3, 5, json!({"gcId": 5, "name": "Concurrent Mark"})),
                collection(4, 1, 1, "ZGC Major", "Proactive"),
            ],
        );
        let overview = builder.build();
        let cycles = overview.concurrent_cycles.expect("cycles");
        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[0].gc_id, 4);
        assert_eq!(cycles[0].duration, 50_000_000);
        assert_eq!(cycles[0].phases.len(), 2);
        assert_eq!(cycles[0].name, "ZGC Major");
        assert_eq!(cycles[1].name, "Concurrent GC");
        assert!(overview.longest_pauses[0].concurrent);
    }

    #[test]
    fn g1_counts_collection_types() {
        let mut builder = overview_builder(GarbageCollector::G1, 5);
        feed(
            &mut builder,
            vec![
                gc_record(EventType::G1GarbageCollection, 0, 1, json!({"gcId": 1, "type": "Normal"})),
                gc_record(EventType::G1GarbageCollection, 0, 1, json!({"gcId": 2, "type": "Mixed"})),
                gc_record(EventType::G1GarbageCollection, 0, 1, json!({"gcId": 3, "type": "Normal"})),
            ],
        );
        let types = builder.build().g1_collection_types.expect("g1");
        assert_eq!(types.get("Normal"), Some(&2));
        assert_eq!(types.get("Mixed"), Some(&1));
        assert!(GarbageCollector::G1.event_types().contains(&EventType::G1GarbageCollection));
    }

    #[test]
    fn pause_percentiles_keep_three_significant_digits() {
        let mut histogram = Histogram::<u64>::new(PAUSE_PRECISION).expect("histogram");
        for value in 1..=1000u64 {
            histogram.saturating_record(value * 1_000);
        }
        let p95 = pause_percentile(&histogram, 95.0);
        assert!((950_000..951_000).contains(&p95), "p95 {p95}");
        let p99 = pause_percentile(&histogram, 99.0);
        assert!((990_000..991_000).contains(&p99), "p99 {p99}");
        let empty = Histogram::<u64>::new(PAUSE_PRECISION).expect("histogram");
        assert_eq!(pause_percentile(&empty, 99.0), 0);
    }
}
