//! Aggregated call-tree node.

use std::collections::BTreeMap;

use crate::FrameType;
use crate::flame::title::{self, TitleCounter};

/// One call-tree node. Children are keyed and ordered by title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlameNode {
    frame_type: FrameType,
    samples: u64,
    self_samples: u64,
    inlined: u64,
    c1: u64,
    interpreted: u64,
    children: BTreeMap<String, FlameNode>,
}

impl FlameNode {
    pub(crate) fn new(frame_type: FrameType) -> Self {
        Self {
            frame_type,
            samples: 0,
            self_samples: 0,
            inlined: 0,
            c1: 0,
            interpreted: 0,
            children: BTreeMap::new(),
        }
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn self_samples(&self) -> u64 {
        self.self_samples
    }

    /// Type assigned when the node was created.
    pub fn frame_type(&self) -> FrameType {
        self.frame_type
    }

    pub fn child(&self, title: &str) -> Option<&FlameNode> {
        self.children.get(title)
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &FlameNode)> {
        self.children.iter().map(|(title, node)| (title.as_str(), node))
    }

    pub(crate) fn add_total(&mut self, ticks: u64) {
        self.samples = self.samples.saturating_add(ticks);
    }

    pub(crate) fn add_self(&mut self, ticks: u64) {
        self.self_samples = self.self_samples.saturating_add(ticks);
    }

    /// Finds or creates the child for `raw_title` and charges `ticks` to it.
    pub(crate) fn descend(&mut self, raw_title: &str, ticks: u64) -> &mut FlameNode {
        let classified = title::classify(raw_title);
        let child = self
            .children
            .entry(classified.key.to_string())
            .or_insert_with(|| FlameNode::new(classified.frame_type));
        child.add_total(ticks);
        match classified.counter {
            Some(TitleCounter::Inlined) => child.inlined = child.inlined.saturating_add(ticks),
            Some(TitleCounter::C1) => child.c1 = child.c1.saturating_add(ticks),
            Some(TitleCounter::Interpreted) => {
                child.interpreted = child.interpreted.saturating_add(ticks)
            }
            None => {}
        }
        child
    }

    /// Majority re-classification used when rendering. Never stored.
    ///
    /// A counter must be non-zero to win: with `samples == 0` every ratio holds, and an
    /// empty root or a zero-tick node would otherwise render as inlined.
    pub fn render_type(&self) -> FrameType {
        if self.inlined > 0 && self.inlined.saturating_mul(3) >= self.samples {
            FrameType::Inlined
        } else if self.c1 > 0 && self.c1.saturating_mul(2) >= self.samples {
            FrameType::C1Compiled
        } else if self.interpreted > 0 && self.interpreted.saturating_mul(2) >= self.samples {
            FrameType::Interpreted
        } else {
            self.frame_type
        }
    }

    pub(crate) fn details(&self) -> String {
        [
            ("inlined", self.inlined),
            ("c1", self.c1),
            ("interpreted", self.interpreted),
        ]
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(name, count)| format!("{name}: {count}"))
        .collect::<Vec<_>>()
        .join(", ")
    }

    /// Levels below this node, counting only children at or above `min_samples`.
    pub(crate) fn depth(&self, min_samples: u64) -> usize {
        1 + self
            .children
            .values()
            .filter(|child| child.samples >= min_samples)
            .map(|child| child.depth(min_samples))
            .max()
            .unwrap_or(0)
    }

    pub(crate) fn children_map(&self) -> &BTreeMap<String, FlameNode> {
        &self.children
    }
}

pub(crate) fn color(frame_type: FrameType) -> &'static str {
    match frame_type {
        FrameType::Interpreted => "#b2e1b2",
        FrameType::JitCompiled => "#50e150",
        FrameType::Inlined => "#50cccc",
        FrameType::Native => "#e15a5a",
        FrameType::Cpp => "#c8c83c",
        FrameType::Kernel => "#e17d00",
        FrameType::C1Compiled => "#cce880",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_reclassify_at_render_time() {
        let mut root = FlameNode::new(FrameType::Native);
        root.descend("Foo.bar_[i]", 1);
        root.descend("Foo.bar_[j]", 2);
        let node = root.child("Foo.bar").expect("merged node");
        assert_eq!(node.samples(), 3);
        assert_eq!(node.frame_type(), FrameType::JitCompiled);
        // 1 * 3 >= 3
        assert_eq!(node.render_type(), FrameType::Inlined);
        assert_eq!(node.details(), "inlined: 1");

        root.descend("Foo.bar_[j]", 1);
        assert_eq!(root.child("Foo.bar").expect("node").render_type(), FrameType::JitCompiled);
    }

    #[test]
    fn c1_wins_over_interpreted() {
        let mut root = FlameNode::new(FrameType::Native);
        root.descend("Foo.baz_[1]", 2);
        root.descend("Foo.baz_[0]", 2);
        let node = root.child("Foo.baz").expect("node");
        assert_eq!(node.render_type(), FrameType::C1Compiled);
        assert_eq!(node.details(), "c1: 2, interpreted: 2");
    }

    #[test]
    fn zero_tick_nodes_keep_structural_type() {
        let mut root = FlameNode::new(FrameType::Native);
        assert_eq!(root.render_type(), FrameType::Native);
        root.descend("Foo.idle_[j]", 0);
        let node = root.child("Foo.idle").expect("node");
        assert_eq!(node.samples(), 0);
        assert_eq!(node.render_type(), FrameType::JitCompiled);
    }

    #[test]
    fn depth_ignores_pruned_children() {
        let mut root = FlameNode::new(FrameType::Native);
        root.descend("a", 10).descend("b", 10);
        root.descend("c", 1).descend("d", 1).descend("e", 1);
        assert_eq!(root.depth(0), 4);
        assert_eq!(root.depth(5), 3);
    }
}
