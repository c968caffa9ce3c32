//! Turns aggregated stacktrace records into flame-graph traces.

use crate::{
    EventType, FlameGraph, FlameGraphDocument, FlamegraphRecord, Frame, FrameType, ProfResult,
    RecordBuilder, ThreadInfo,
};

/// How records are spelled out as frame titles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraceOptions {
    /// Thread frame at the root of every trace.
    pub threads: bool,
    /// Category frame below the thread frame.
    pub classify: bool,
    /// Weight instead of sample counts.
    pub total: bool,
    pub lines: bool,
    pub bci: bool,
    /// Class names without their package.
    pub simple: bool,
    /// `java.lang.String` rather than `java/lang/String`.
    pub dotted: bool,
    /// Strips numeric suffixes of generated classes such as lambdas.
    pub normalized: bool,
}

/// Leaf frame naming what a sample allocated, waited on or kept alive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntheticFrame {
    Allocation { class_name: String, outside_tlab: bool },
    Lock { class_name: String },
    LiveObject { class_name: String },
}

impl SyntheticFrame {
    pub fn from_record(record: &FlamegraphRecord) -> Option<Self> {
        let class_name = record.weight_entity.clone()?;
        Some(match record.event_type {
            EventType::ObjectAllocationInNewTlab | EventType::ObjectAllocationSample => {
                Self::Allocation {
                    class_name,
                    outside_tlab: false,
                }
            }
            EventType::ObjectAllocationOutsideTlab => Self::Allocation {
                class_name,
                outside_tlab: true,
            },
            EventType::JavaMonitorEnter | EventType::JavaMonitorWait | EventType::ThreadPark => {
                Self::Lock { class_name }
            }
            EventType::LiveObject => Self::LiveObject { class_name },
            _ => return None,
        })
    }

    pub fn title(&self, options: &TraceOptions) -> String {
        let (symbol, suffix) = match self {
            Self::Allocation {
                class_name,
                outside_tlab: true,
            } => (class_name, FrameType::Kernel.suffix()),
            Self::Allocation { class_name, .. }
            | Self::Lock { class_name }
            | Self::LiveObject { class_name } => (class_name, FrameType::Inlined.suffix()),
        };
        let dimensions = symbol.bytes().take_while(|b| *b == b'[').count();
        let mut title = java_class_name(&symbol[dimensions..], dimensions > 0, true, options);
        for _ in 0..dimensions {
            title.push_str("[]");
        }
        title.push_str(suffix);
        title
    }
}

/// Renders an internal class name. `descriptor` marks array element descriptors
/// (`B`, `Ljava/lang/String;`...).
fn java_class_name(symbol: &str, descriptor: bool, dotted: bool, options: &TraceOptions) -> String {
    let mut name = symbol;
    if descriptor {
        let primitive = match name.as_bytes().first() {
            Some(b'B') => Some("byte"),
            Some(b'C') => Some("char"),
            Some(b'S') => Some("short"),
            Some(b'I') => Some("int"),
            Some(b'J') => Some("long"),
            Some(b'Z') => Some("boolean"),
            Some(b'F') => Some("float"),
            Some(b'D') => Some("double"),
            _ => None,
        };
        if let Some(primitive) = primitive {
            return primitive.to_string();
        }
        if let Some(inner) = name.strip_prefix('L') {
            name = inner.strip_suffix(';').unwrap_or(inner);
        }
    }

    if options.normalized {
        // the last byte is never a separator and the first never a cut point
        let bytes = name.as_bytes();
        for i in (1..bytes.len().saturating_sub(1)).rev() {
            if matches!(bytes[i], b'/' | b'.') {
                if bytes[i + 1].is_ascii_digit() {
                    name = &name[..i];
                }
                break;
            }
        }
    }

    if options.simple {
        let package_end = name
            .char_indices()
            .filter(|(i, c)| {
                *c == '/'
                    && name[i + 1..]
                        .chars()
                        .next()
                        .is_some_and(|n| !n.is_ascii_digit())
            })
            .map(|(i, _)| i)
            .next_back();
        if let Some(end) = package_end {
            name = &name[end + 1..];
        }
    }

    if dotted {
        name.replace('/', ".")
    } else {
        name.to_string()
    }
}

pub fn method_title(frame: &Frame, options: &TraceOptions) -> String {
    let mut title = if frame.class_name.is_empty() || frame.frame_type.is_native_symbol() {
        frame.method_name.clone()
    } else {
        let class = java_class_name(&frame.class_name, false, options.dotted, options);
        if frame.method_name.is_empty() {
            class
        } else {
            format!("{class}.{}", frame.method_name)
        }
    };
    if options.lines && frame.line_number != 0 {
        title.push_str(&format!(":{}", frame.line_number));
    } else if options.bci && frame.bytecode_index != 0 {
        title.push_str(&format!("@{}", frame.bytecode_index));
    }
    title.push_str(frame.frame_type.suffix());
    title
}

pub fn thread_title(thread: &ThreadInfo) -> String {
    if thread.name.is_empty() {
        format!("[tid={}]", thread.os_id)
    } else if thread.name.starts_with("[tid=") {
        thread.name.clone()
    } else {
        format!("[{} tid={}]", thread.name, thread.os_id)
    }
}

/// Coarse category of where a stacktrace spends its time. Frames are leaf first.
pub fn category(frames: &[Frame]) -> &'static str {
    let mut vm_thread = false;
    for frame in frames.iter().rev() {
        match frame.frame_type {
            FrameType::Cpp => match frame.method_name.as_str() {
                "CompileBroker::compiler_thread_loop" => return "[jit]",
                "GCTaskThread::run" | "WorkerThread::run" | "ConcurrentGCThread::run" => {
                    return "[gc]";
                }
                "java_start" | "thread_native_entry" => vm_thread = true,
                _ => {}
            },
            FrameType::Native | FrameType::Kernel => {}
            _ => break,
        }
    }
    if vm_thread {
        return "[vm]";
    }

    for frame in frames {
        let name = frame.method_name.as_str();
        if name == "Verifier::verify" {
            return "[class_verify]";
        }
        if name.starts_with("InstanceKlass::link_class") {
            return "[class_init]";
        }
        if name == "loadClass" && frame.class_name.ends_with("ClassLoader") {
            return "[class_load]";
        }
        if name.starts_with("SystemDictionary::resolve") || name.starts_with("LinkResolver::resolve") {
            return "[class_resolve]";
        }
        if name == "InterpreterRuntime::resolve_invokedynamic" {
            return "[lambda_init]";
        }
    }

    let Some(leaf) = frames.first() else {
        return "[native]";
    };
    match leaf.frame_type {
        FrameType::Interpreted => "[Interpreter]",
        FrameType::C1Compiled => "[c1_comp]",
        FrameType::JitCompiled | FrameType::Inlined => "[c2_comp]",
        _ if leaf.method_name.contains("vtable stub") || leaf.method_name.contains("itable stub") => {
            "[vtable_stubs]"
        }
        _ if leaf.method_name.starts_with("Interpreter") => "[Interpreter]",
        _ => "[native]",
    }
}

/// Root-to-leaf titles of one record.
pub fn trace_titles(record: &FlamegraphRecord, options: &TraceOptions) -> Vec<String> {
    let mut trace = Vec::with_capacity(record.frames.len() + 3);
    if options.threads {
        if let Some(thread) = &record.thread {
            trace.push(thread_title(thread));
        }
    }
    if options.classify {
        trace.push(category(&record.frames).to_string());
    }
    trace.extend(record.frames.iter().rev().map(|f| method_title(f, options)));
    if let Some(synthetic) = SyntheticFrame::from_record(record) {
        trace.push(synthetic.title(options));
    }
    trace
}

/// Feeds records into a `FlameGraph` and renders its JSON levels.
pub struct FlamegraphRecordBuilder {
    graph: FlameGraph,
    options: TraceOptions,
    records: u64,
}

impl FlamegraphRecordBuilder {
    pub fn new(graph: FlameGraph, options: TraceOptions) -> Self {
        Self {
            graph,
            options,
            records: 0,
        }
    }
}

impl RecordBuilder<FlamegraphRecord> for FlamegraphRecordBuilder {
    type Output = FlameGraphDocument;

    fn on_record(&mut self, record: FlamegraphRecord) -> ProfResult<()> {
        let trace = trace_titles(&record, &self.options);
        self.graph.add_sample(&trace, record.value(self.options.total));
        self.records += 1;
        Ok(())
    }

    fn build(self) -> FlameGraphDocument {
        tracing::debug!("flame graph built from {} records", self.records);
        self.graph.dump_to_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FlameOptions;

    fn frame(class_name: &str, method_name: &str, frame_type: FrameType) -> Frame {
        Frame {
            class_name: class_name.to_string(),
            method_name: method_name.to_string(),
            frame_type,
            line_number: 42,
            bytecode_index: 7,
        }
    }

    fn record(event_type: EventType, frames: Vec<Frame>) -> FlamegraphRecord {
        FlamegraphRecord {
            event_type,
            thread: Some(ThreadInfo {
                os_id: 12,
                java_id: Some(1),
                name: "main".to_string(),
                is_virtual: false,
            }),
            weight_entity: None,
            frames,
            samples: 3,
            weight: 300,
        }
    }

    #[test]
    fn method_titles_follow_formatting_options() {
        let f = frame("com/acme/Service", "run", FrameType::JitCompiled);
        assert_eq!(method_title(&f, &TraceOptions::default()), "com/acme/Service.run_[j]");
        let dotted_lines = TraceOptions {
            dotted: true,
            lines: true,
            ..TraceOptions::default()
        };
        assert_eq!(method_title(&f, &dotted_lines), "com.acme.Service.run:42_[j]");
        let simple_bci = TraceOptions {
            simple: true,
            bci: true,
            ..TraceOptions::default()
        };
        assert_eq!(method_title(&f, &simple_bci), "Service.run@7_[j]");

        let native = frame("", "epoll_wait", FrameType::Native);
        assert_eq!(method_title(&native, &TraceOptions::default()), "epoll_wait");
        let kernel = frame("ignored", "do_syscall_64", FrameType::Kernel);
        assert_eq!(method_title(&kernel, &TraceOptions::default()), "do_syscall_64_[k]");
    }

    #[test]
    fn normalized_names_drop_generated_suffixes() {
        let options = TraceOptions {
            normalized: true,
            ..TraceOptions::default()
        };
        let lambda = frame("com/acme/Service$$Lambda/0x1234", "apply", FrameType::Interpreted);
        assert_eq!(method_title(&lambda, &options), "com/acme/Service$$Lambda.apply_[0]");

        let trailing = frame("com/acme/Proxy/42/", "call", FrameType::Interpreted);
        assert_eq!(method_title(&trailing, &options), "com/acme/Proxy.call_[0]");
        let named = frame("com/acme/Proxy/", "call", FrameType::Interpreted);
        assert_eq!(method_title(&named, &options), "com/acme/Proxy/.call_[0]");
    }

    #[test]
    fn synthetic_frames_by_event_kind() {
        let options = TraceOptions {
            dotted: true,
            ..TraceOptions::default()
        };
        let mut outside = record(EventType::ObjectAllocationOutsideTlab, vec![]);
        outside.weight_entity = Some("[Ljava/lang/String;".to_string());
        assert_eq!(
            SyntheticFrame::from_record(&outside).expect("alloc").title(&options),
            "java.lang.String[]_[k]"
        );

        let mut bytes = record(EventType::ObjectAllocationSample, vec![]);
        bytes.weight_entity = Some("[[B".to_string());
        assert_eq!(
            SyntheticFrame::from_record(&bytes).expect("alloc").title(&options),
            "byte[][]_[i]"
        );

        let mut lock = record(EventType::JavaMonitorEnter, vec![]);
        lock.weight_entity = Some("java/lang/Object".to_string());
        assert_eq!(
            SyntheticFrame::from_record(&lock).expect("lock").title(&options),
            "java.lang.Object_[i]"
        );

        assert!(SyntheticFrame::from_record(&record(EventType::ExecutionSample, vec![])).is_none());
    }

    #[test]
    fn traces_run_root_to_leaf_with_thread_and_category() {
        let frames = vec![
            frame("com/acme/Service", "leaf", FrameType::Interpreted),
            frame("java/lang/Thread", "run", FrameType::JitCompiled),
        ];
        let options = TraceOptions {
            threads: true,
            classify: true,
            ..TraceOptions::default()
        };
        let trace = trace_titles(&record(EventType::ExecutionSample, frames), &options);
        assert_eq!(
            trace,
            [
                "[main tid=12]",
                "[Interpreter]",
                "java/lang/Thread.run_[j]",
                "com/acme/Service.leaf_[0]",
            ]
        );
    }

    #[test]
    fn gc_threads_classify_as_gc() {
        let frames = vec![
            frame("", "G1ParScanThreadState::trim_queue", FrameType::Cpp),
            frame("", "GCTaskThread::run", FrameType::Cpp),
            frame("", "thread_native_entry", FrameType::Cpp),
            frame("", "start_thread", FrameType::Native),
        ];
        assert_eq!(category(&frames), "[gc]");
        assert_eq!(category(&[]), "[native]");
    }

    #[test]
    fn builder_uses_weight_when_total_is_set() {
        let options = TraceOptions {
            total: true,
            ..TraceOptions::default()
        };
        let mut builder =
            FlamegraphRecordBuilder::new(FlameGraph::new(FlameOptions::new("alloc")), options);
        let frames = vec![frame("com/acme/Service", "run", FrameType::JitCompiled)];
        builder
            .on_record(record(EventType::ExecutionSample, frames))
            .expect("record");
        let doc = builder.build();
        assert_eq!(doc.levels[0][0].width, 300);
        assert_eq!(doc.levels[1][0].title, "com/acme/Service.run");
    }

    #[test]
    fn thread_titles() {
        let mut thread = ThreadInfo {
            os_id: 7,
            java_id: None,
            name: String::new(),
            is_virtual: false,
        };
        assert_eq!(thread_title(&thread), "[tid=7]");
        thread.name = "[tid=9]".to_string();
        assert_eq!(thread_title(&thread), "[tid=9]");
        thread.name = "worker-1".to_string();
        assert_eq!(thread_title(&thread), "[worker-1 tid=7]");
    }
}
