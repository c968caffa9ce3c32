//! Flame-graph conversion commands (`profscope flame`, `profscope pair-diff`).

use clap::Args;
use serde::Serialize;

use std::path::{Path, PathBuf};

use profscope::{
    Config, ConvertOptions, DiffGraph, DiffPair, EventContainer, EventKind, FlameOptions,
    ProfError, ProfResult, TraceOptions, convert, convert_event_type, generate_diff,
    pair_event_types,
};

#[derive(Debug, Args)]
pub struct FlameArgs {
    /// Exported event container (JSON).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,
    /// Flame-graph JSON to write.
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,
    #[arg(long)]
    pub title: Option<String>,
    /// Keep samples with a frame matching this regex (whole title).
    #[arg(long)]
    pub include: Option<String>,
    /// Drop samples with a frame matching this regex (whole title).
    #[arg(long)]
    pub exclude: Option<String>,
    #[arg(long, default_value_t = 0)]
    pub skip: usize,
    #[arg(long)]
    pub reverse: bool,
    #[arg(long)]
    pub threads: bool,
    #[arg(long)]
    pub classify: bool,
    /// Weight instead of sample counts.
    #[arg(long)]
    pub total: bool,
    #[arg(long)]
    pub lines: bool,
    #[arg(long)]
    pub bci: bool,
    #[arg(long)]
    pub simple: bool,
    #[arg(long)]
    pub dot: bool,
    #[arg(long)]
    pub norm: bool,
    /// Window start: epoch ms, ms from start, or negative ms from end.
    #[arg(long, allow_hyphen_values = true)]
    pub from: Option<i64>,
    #[arg(long, allow_hyphen_values = true)]
    pub to: Option<i64>,
    #[arg(long, default_value = "cpu")]
    pub event: EventArg,
    #[arg(long)]
    pub min_percent: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
pub enum EventArg {
    Cpu,
    Alloc,
    Lock,
    Live,
}

impl clap::ValueEnum for EventArg {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Cpu, Self::Alloc, Self::Lock, Self::Live]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Cpu => clap::builder::PossibleValue::new("cpu"),
            Self::Alloc => clap::builder::PossibleValue::new("alloc"),
            Self::Lock => clap::builder::PossibleValue::new("lock"),
            Self::Live => clap::builder::PossibleValue::new("live"),
        })
    }
}

impl From<EventArg> for EventKind {
    fn from(value: EventArg) -> Self {
        match value {
            EventArg::Cpu => EventKind::Cpu,
            EventArg::Alloc => EventKind::Alloc,
            EventArg::Lock => EventKind::Lock,
            EventArg::Live => EventKind::Live,
        }
    }
}

#[derive(Debug, Args)]
pub struct PairDiffArgs {
    #[arg(value_name = "LEFT")]
    pub left: PathBuf,
    #[arg(value_name = "RIGHT")]
    pub right: PathBuf,
    /// Also write both flame graphs of every pair to this file.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlameSummary {
    pub title: String,
    pub event: String,
    pub depth: usize,
    pub total: u64,
    pub output: PathBuf,
}

impl FlameArgs {
    fn options(&self, config: &Config) -> ProfResult<ConvertOptions> {
        let title = self
            .title
            .clone()
            .unwrap_or_else(|| config.flame.title.clone());
        let mut flame = FlameOptions::new(title)
            .with_skip(self.skip)
            .with_reverse(self.reverse)
            .with_min_percent(self.min_percent.unwrap_or(config.flame.min_percent));
        if let Some(pattern) = &self.include {
            flame = flame.with_include(pattern)?;
        }
        if let Some(pattern) = &self.exclude {
            flame = flame.with_exclude(pattern)?;
        }
        Ok(ConvertOptions {
            flame,
            trace: TraceOptions {
                threads: self.threads,
                classify: self.classify,
                total: self.total,
                lines: self.lines,
                bci: self.bci,
                simple: self.simple,
                dotted: self.dot,
                normalized: self.norm,
            },
            event: self.event.into(),
            from: self.from,
            to: self.to,
        })
    }
}

pub fn flame_command(config: &Config, args: &FlameArgs) -> ProfResult<FlameSummary> {
    if args.min_percent.is_some_and(|p| !(0.0..=100.0).contains(&p)) {
        return Err(ProfError::InvalidArgument(
            "--min-percent must be between 0 and 100".to_string(),
        ));
    }
    let options = args.options(config)?;
    let container = EventContainer::load(&args.input)?;
    let document = convert(&container, &options)?;
    let summary = FlameSummary {
        title: document.title.clone(),
        event: format!("{:?}", options.event).to_lowercase(),
        depth: document.depth,
        total: document
            .levels
            .first()
            .and_then(|root| root.first())
            .map_or(0, |root| root.width),
        output: args.output.clone(),
    };
    write_json(&args.output, &document)?;
    Ok(summary)
}

pub fn pair_diff_command(config: &Config, args: &PairDiffArgs) -> ProfResult<Vec<DiffPair>> {
    let left = EventContainer::load(&args.left)?;
    let right = EventContainer::load(&args.right)?;
    let pairs = pair_event_types(&left.summaries(), &right.summaries());
    if let Some(out) = &args.out {
        let options = ConvertOptions {
            flame: FlameOptions::new(config.flame.title.clone())
                .with_min_percent(config.flame.min_percent),
            ..ConvertOptions::default()
        };
        let graphs: Vec<DiffGraph> = generate_diff(
            &pairs,
            |ty| convert_event_type(&left, ty, &options),
            |ty| convert_event_type(&right, ty, &options),
        )?;
        write_json(out, &graphs)?;
    }
    Ok(pairs)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> ProfResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_vec_pretty(value)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_workspace(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("profscope-{name}-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("mkdir");
        dir
    }

    fn write_container(dir: &Path, name: &str, events: serde_json::Value) -> PathBuf {
        let path = dir.join(name);
        let doc = serde_json::json!({"profileId": name, "startTime": 1_000, "events": events});
        std::fs::write(&path, serde_json::to_vec(&doc).expect("json")).expect("write");
        path
    }

    fn cpu_event(method: &str) -> serde_json::Value {
        serde_json::json!({
            "eventType": "jdk.ExecutionSample",
            "timestampFromStart": 10,
            "frames": [{"className": "com/acme/App", "methodName": method, "frameType": "jit_compiled"}],
        })
    }

    fn args(input: PathBuf, output: PathBuf) -> FlameArgs {
        FlameArgs {
            input,
            output,
            title: None,
            include: None,
            exclude: None,
            skip: 0,
            reverse: false,
            threads: false,
            classify: false,
            total: false,
            lines: false,
            bci: false,
            simple: true,
            dot: false,
            norm: false,
            from: None,
            to: None,
            event: EventArg::Cpu,
            min_percent: None,
        }
    }

    #[test]
    fn flame_writes_level_json() {
        let ws = temp_workspace("flame");
        let input = write_container(&ws, "in.json", serde_json::json!([cpu_event("run"), cpu_event("run")]));
        let output = ws.join("out/flame.json");
        let summary = flame_command(&Config::default(), &args(input, output.clone())).expect("flame");
        assert_eq!(summary.total, 2);
        assert_eq!(summary.title, "Flame Graph");
        assert_eq!(summary.event, "cpu");

        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&output).expect("read")).expect("json");
        assert_eq!(written["depth"], 2);
        assert_eq!(written["levels"][1][0]["title"], "App.run");
    }

    #[test]
    fn flame_rejects_bad_patterns_and_percentages() {
        let ws = temp_workspace("flame-bad");
        let input = write_container(&ws, "in.json", serde_json::json!([]));
        let mut bad_pattern = args(input.clone(), ws.join("a.json"));
        bad_pattern.include = Some("(".to_string());
        assert!(matches!(
            flame_command(&Config::default(), &bad_pattern),
            Err(ProfError::Pattern(_))
        ));
        let mut bad_percent = args(input, ws.join("b.json"));
        bad_percent.min_percent = Some(120.0);
        assert!(matches!(
            flame_command(&Config::default(), &bad_percent),
            Err(ProfError::InvalidArgument(_))
        ));
    }

    #[test]
    fn pair_diff_writes_both_sides() {
        let ws = temp_workspace("pair-diff");
        let left = write_container(&ws, "left.json", serde_json::json!([cpu_event("a")]));
        let right = write_container(&ws, "right.json", serde_json::json!([cpu_event("b"), cpu_event("b")]));
        let out = ws.join("diff.json");
        let pairs = pair_diff_command(
            &Config::default(),
            &PairDiffArgs {
                left,
                right,
                out: Some(out.clone()),
            },
        )
        .expect("pair-diff");
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].secondary.samples, 2);

        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&out).expect("read")).expect("json");
        assert_eq!(written[0]["primary"]["levels"][1][0]["title"], "com/acme/App.a");
        assert_eq!(written[0]["secondary"]["levels"][0][0]["width"], 2);
    }
}
