//! Event, frame and thread types shared by the query pipeline and the flame engine.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::time::Duration;

/// Recorded event type, identified by its JFR-style code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    ExecutionSample,
    WallClockSample,
    MethodTrace,
    Malloc,
    Free,
    NativeLeak,
    ObjectAllocationInNewTlab,
    ObjectAllocationOutsideTlab,
    ObjectAllocationSample,
    LiveObject,
    JavaMonitorEnter,
    JavaMonitorWait,
    ThreadPark,
    ThreadSleep,
    GarbageCollection,
    GcHeapSummary,
    YoungGarbageCollection,
    OldGarbageCollection,
    ParallelOldGarbageCollection,
    G1GarbageCollection,
    ZYoungGarbageCollection,
    ZOldGarbageCollection,
    GcPhaseConcurrent,
    GcConfiguration,
    GcHeapConfiguration,
    Compilation,
    CompilerConfiguration,
    CompilerStatistics,
    ContainerConfiguration,
    JvmInformation,
    CpuInformation,
    OsInformation,
    ActiveRecording,
    Other(String),
}

impl EventType {
    pub fn code(&self) -> &str {
        match self {
            Self::ExecutionSample => "jdk.ExecutionSample",
            Self::WallClockSample => "profiler.WallClockSample",
            Self::MethodTrace => "jdk.MethodTrace",
            Self::Malloc => "profiler.Malloc",
            Self::Free => "profiler.Free",
            Self::NativeLeak => "jeffrey.NativeLeak",
            Self::ObjectAllocationInNewTlab => "jdk.ObjectAllocationInNewTLAB",
            Self::ObjectAllocationOutsideTlab => "jdk.ObjectAllocationOutsideTLAB",
            Self::ObjectAllocationSample => "jdk.ObjectAllocationSample",
            Self::LiveObject => "profiler.LiveObject",
            Self::JavaMonitorEnter => "jdk.JavaMonitorEnter",
            Self::JavaMonitorWait => "jdk.JavaMonitorWait",
            Self::ThreadPark => "jdk.ThreadPark",
            Self::ThreadSleep => "jdk.ThreadSleep",
            Self::GarbageCollection => "jdk.GarbageCollection",
            Self::GcHeapSummary => "jdk.GCHeapSummary",
            Self::YoungGarbageCollection => "jdk.YoungGarbageCollection",
            Self::OldGarbageCollection => "jdk.OldGarbageCollection",
            Self::ParallelOldGarbageCollection => "jdk.ParallelOldGarbageCollection",
            Self::G1GarbageCollection => "jdk.G1GarbageCollection",
            Self::ZYoungGarbageCollection => "jdk.ZYoungGarbageCollection",
            Self::ZOldGarbageCollection => "jdk.ZOldGarbageCollection",
            Self::GcPhaseConcurrent => "jdk.GCPhaseConcurrent",
            Self::GcConfiguration => "jdk.GCConfiguration",
            Self::GcHeapConfiguration => "jdk.GCHeapConfiguration",
            Self::Compilation => "jdk.Compilation",
            Self::CompilerConfiguration => "jdk.CompilerConfiguration",
            Self::CompilerStatistics => "jdk.CompilerStatistics",
            Self::ContainerConfiguration => "jdk.ContainerConfiguration",
            Self::JvmInformation => "jdk.JVMInformation",
            Self::CpuInformation => "jdk.CPUInformation",
            Self::OsInformation => "jdk.OSInformation",
            Self::ActiveRecording => "jdk.ActiveRecording",
            Self::Other(code) => code,
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code {
            "jdk.ExecutionSample" => Self::ExecutionSample,
            "profiler.WallClockSample" => Self::WallClockSample,
            "jdk.MethodTrace" => Self::MethodTrace,
            "profiler.Malloc" => Self::Malloc,
            "profiler.Free" => Self::Free,
            "jeffrey.NativeLeak" => Self::NativeLeak,
            "jdk.ObjectAllocationInNewTLAB" => Self::ObjectAllocationInNewTlab,
            "jdk.ObjectAllocationOutsideTLAB" => Self::ObjectAllocationOutsideTlab,
            "jdk.ObjectAllocationSample" => Self::ObjectAllocationSample,
            "profiler.LiveObject" => Self::LiveObject,
            "jdk.JavaMonitorEnter" => Self::JavaMonitorEnter,
            "jdk.JavaMonitorWait" => Self::JavaMonitorWait,
            "jdk.ThreadPark" => Self::ThreadPark,
            "jdk.ThreadSleep" => Self::ThreadSleep,
            "jdk.GarbageCollection" => Self::GarbageCollection,
            "jdk.GCHeapSummary" => Self::GcHeapSummary,
            "jdk.YoungGarbageCollection" => Self::YoungGarbageCollection,
            "jdk.OldGarbageCollection" => Self::OldGarbageCollection,
            "jdk.ParallelOldGarbageCollection" => Self::ParallelOldGarbageCollection,
            "jdk.G1GarbageCollection" => Self::G1GarbageCollection,
            "jdk.ZYoungGarbageCollection" => Self::ZYoungGarbageCollection,
            "jdk.ZOldGarbageCollection" => Self::ZOldGarbageCollection,
            "jdk.GCPhaseConcurrent" => Self::GcPhaseConcurrent,
            "jdk.GCConfiguration" => Self::GcConfiguration,
            "jdk.GCHeapConfiguration" => Self::GcHeapConfiguration,
            "jdk.Compilation" => Self::Compilation,
            "jdk.CompilerConfiguration" => Self::CompilerConfiguration,
            "jdk.CompilerStatistics" => Self::CompilerStatistics,
            "jdk.ContainerConfiguration" => Self::ContainerConfiguration,
            "jdk.JVMInformation" => Self::JvmInformation,
            "jdk.CPUInformation" => Self::CpuInformation,
            "jdk.OSInformation" => Self::OsInformation,
            "jdk.ActiveRecording" => Self::ActiveRecording,
            other => Self::Other(other.to_string()),
        }
    }

    /// Events whose weight is attributed to a distinct entity (allocated class, address, lock).
    pub fn has_weight_entity(&self) -> bool {
        matches!(
            self,
            Self::Malloc
                | Self::NativeLeak
                | Self::ObjectAllocationInNewTlab
                | Self::ObjectAllocationOutsideTlab
                | Self::ObjectAllocationSample
                | Self::LiveObject
                | Self::JavaMonitorEnter
                | Self::JavaMonitorWait
                | Self::ThreadPark
        )
    }
}

impl From<String> for EventType {
    fn from(value: String) -> Self {
        Self::from_code(&value)
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        value.code().to_string()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Stack frame kind, indexed as the recorder encodes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameType {
    Interpreted,
    JitCompiled,
    Inlined,
    Native,
    Cpp,
    Kernel,
    C1Compiled,
}

impl FrameType {
    pub const ALL: [FrameType; 7] = [
        Self::Interpreted,
        Self::JitCompiled,
        Self::Inlined,
        Self::Native,
        Self::Cpp,
        Self::Kernel,
        Self::C1Compiled,
    ];

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(usize::from(index)).copied()
    }

    /// Title suffix the flame engine reads back to classify a frame.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Interpreted => "_[0]",
            Self::JitCompiled => "_[j]",
            Self::Inlined => "_[i]",
            Self::Native | Self::Cpp => "",
            Self::Kernel => "_[k]",
            Self::C1Compiled => "_[1]",
        }
    }

    /// Frames named by their raw symbol rather than `class.method`.
    pub fn is_native_symbol(self) -> bool {
        matches!(self, Self::Native | Self::Cpp | Self::Kernel)
    }

    /// Parses both the storage names (`JIT compiled`, `C++`...) and snake-case names.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Some(match normalized.as_str() {
            "interpreted" => Self::Interpreted,
            "jit_compiled" | "jit" => Self::JitCompiled,
            "inlined" => Self::Inlined,
            "native" => Self::Native,
            "cpp" | "c++" => Self::Cpp,
            "kernel" => Self::Kernel,
            "c1_compiled" | "c1" => Self::C1Compiled,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "className", default)]
    pub class_name: String,
    #[serde(rename = "methodName")]
    pub method_name: String,
    #[serde(rename = "frameType")]
    pub frame_type: FrameType,
    #[serde(rename = "lineNumber", default)]
    pub line_number: u32,
    #[serde(rename = "bytecodeIndex", default)]
    pub bytecode_index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadInfo {
    #[serde(rename = "osId")]
    pub os_id: i64,
    #[serde(rename = "javaId", skip_serializing_if = "Option::is_none")]
    pub java_id: Option<i64>,
    pub name: String,
    #[serde(rename = "isVirtual", default)]
    pub is_virtual: bool,
}

/// Window on the relative time axis, `[start, end)`; a missing bound is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelativeTimeRange {
    pub start: Option<Duration>,
    pub end: Option<Duration>,
}

impl RelativeTimeRange {
    pub fn new(start: Duration, end: Duration) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_bounded(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    pub fn contains(&self, at: Duration) -> bool {
        self.start.is_none_or(|s| at >= s) && self.end.is_none_or(|e| at < e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StacktraceType {
    pub id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StacktraceTag {
    pub id: i64,
    /// `false` excludes stacktraces carrying the tag.
    pub includes: bool,
}

/// Per-type totals used to pair two profiles for a diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTypeSummary {
    pub name: String,
    pub label: String,
    pub samples: u64,
    pub weight: u64,
}

/// Stacktrace aggregated by a flame-graph query. Frames are leaf first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlamegraphRecord {
    pub event_type: EventType,
    pub thread: Option<ThreadInfo>,
    pub weight_entity: Option<String>,
    pub frames: Vec<Frame>,
    pub samples: u64,
    pub weight: u64,
}

impl FlamegraphRecord {
    pub fn value(&self, use_weight: bool) -> u64 {
        if use_weight { self.weight } else { self.samples }
    }
}

/// Normalized row of the streaming pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenericRecord {
    #[serde(rename = "eventType")]
    pub event_type: Option<EventType>,
    #[serde(rename = "startTimestamp", skip_serializing_if = "Option::is_none")]
    pub start_timestamp: Option<time::OffsetDateTime>,
    #[serde(rename = "timestampFromStart")]
    pub timestamp_from_start: Duration,
    pub duration: Duration,
    pub samples: u64,
    pub weight: u64,
    #[serde(rename = "weightEntity", skip_serializing_if = "Option::is_none")]
    pub weight_entity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread: Option<ThreadInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames: Option<Vec<Frame>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(rename = "typeLabel", skip_serializing_if = "Option::is_none")]
    pub type_label: Option<String>,
}

impl GenericRecord {
    pub fn value(&self, use_weight: bool) -> u64 {
        if use_weight { self.weight } else { self.samples }
    }

    pub fn is_type(&self, ty: &EventType) -> bool {
        self.event_type.as_ref() == Some(ty)
    }

    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.fields.as_ref().and_then(|f| f.get(name))
    }

    pub fn field_i64(&self, name: &str) -> Option<i64> {
        self.field(name).and_then(|v| match v {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        })
    }

    pub fn field_u64(&self, name: &str) -> Option<u64> {
        self.field_i64(name).and_then(|v| u64::try_from(v).ok())
    }

    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(|v| v.as_str())
    }

    pub fn field_bool(&self, name: &str) -> Option<bool> {
        self.field(name).and_then(|v| match v {
            serde_json::Value::Bool(b) => Some(*b),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        })
    }
}
