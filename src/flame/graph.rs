//! Flame-graph tree building and JSON level rendering.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::flame::node::{self, FlameNode};
use crate::flame::title;
use crate::{FrameType, ProfResult};

/// The root is synthetic and untitled.
pub const ROOT_TITLE: &str = "";

#[derive(Debug, Clone, Default)]
pub struct FlameOptions {
    pub title: String,
    /// Keep only samples with at least one title matching.
    pub include: Option<Regex>,
    /// Drop samples with any title matching.
    pub exclude: Option<Regex>,
    /// Frames skipped at the start of the walk.
    pub skip: usize,
    /// Walk leaf to root.
    pub reverse: bool,
    /// Nodes under this share of the root, in percent, are not rendered.
    pub min_percent: f64,
}

impl FlameOptions {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Patterns match whole titles.
    pub fn with_include(mut self, pattern: &str) -> ProfResult<Self> {
        self.include = Some(whole_title(pattern)?);
        Ok(self)
    }

    pub fn with_exclude(mut self, pattern: &str) -> ProfResult<Self> {
        self.exclude = Some(whole_title(pattern)?);
        Ok(self)
    }

    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn with_reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    pub fn with_min_percent(mut self, min_percent: f64) -> Self {
        self.min_percent = min_percent;
        self
    }
}

fn whole_title(pattern: &str) -> ProfResult<Regex> {
    Ok(Regex::new(&format!("^(?:{pattern})$"))?)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlameLevelNode {
    pub left: u64,
    pub width: u64,
    pub color: String,
    pub title: String,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlameGraphDocument {
    pub title: String,
    pub depth: usize,
    pub levels: Vec<Vec<FlameLevelNode>>,
}

/// Call tree under construction. `dump_to_json` consumes it, so no sample can be
/// added after rendering.
#[derive(Debug, Clone)]
pub struct FlameGraph {
    options: FlameOptions,
    root: FlameNode,
}

impl FlameGraph {
    pub fn new(options: FlameOptions) -> Self {
        Self {
            options,
            root: FlameNode::new(FrameType::Native),
        }
    }

    pub fn root(&self) -> &FlameNode {
        &self.root
    }

    fn accepts<S: AsRef<str>>(&self, trace: &[S]) -> bool {
        if let Some(exclude) = &self.options.exclude {
            if trace.iter().any(|t| exclude.is_match(t.as_ref())) {
                return false;
            }
        }
        match &self.options.include {
            Some(include) => trace.iter().any(|t| include.is_match(t.as_ref())),
            None => true,
        }
    }

    /// Adds one root-to-leaf trace. A filtered sample leaves the tree untouched.
    pub fn add_sample<S: AsRef<str>>(&mut self, trace: &[S], ticks: u64) {
        if !self.accepts(trace) {
            return;
        }
        self.root.add_total(ticks);

        let skip = self.options.skip;
        let mut node = &mut self.root;
        if self.options.reverse {
            for frame in trace.iter().rev().skip(skip) {
                node = node.descend(frame.as_ref(), ticks);
            }
        } else {
            for frame in trace.iter().skip(skip) {
                node = node.descend(frame.as_ref(), ticks);
            }
        }
        node.add_self(ticks);
    }

    pub fn dump_to_json(self) -> FlameGraphDocument {
        let min_samples = if self.options.min_percent > 0.0 {
            (self.root.samples() as f64 * self.options.min_percent / 100.0) as u64
        } else {
            0
        };
        let depth = self.root.depth(min_samples);
        let mut levels = vec![Vec::new(); depth];
        emit(&self.root, ROOT_TITLE, 0, 0, min_samples, &mut levels);
        FlameGraphDocument {
            title: self.options.title,
            depth,
            levels,
        }
    }
}

// Pruned children still advance their siblings' offset, so rendered nodes keep
// their position relative to the unpruned tree.
fn emit(
    node: &FlameNode,
    key: &str,
    level: usize,
    left: u64,
    min_samples: u64,
    levels: &mut [Vec<FlameLevelNode>],
) {
    levels[level].push(FlameLevelNode {
        left,
        width: node.samples(),
        color: node::color(node.render_type()).to_string(),
        title: title::display_title(key).to_string(),
        details: node.details(),
    });
    let mut child_left = left;
    for (child_key, child) in node.children_map() {
        if child.samples() >= min_samples {
            emit(child, child_key, level + 1, child_left, min_samples, levels);
        }
        child_left = child_left.saturating_add(child.samples());
    }
}
