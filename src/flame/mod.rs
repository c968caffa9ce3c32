//! Flame-graph tree engine and its record adapters.

mod diff;
mod graph;
mod node;
mod record;
mod title;

pub use diff::*;
pub use graph::*;
pub use node::FlameNode;
pub use record::*;
