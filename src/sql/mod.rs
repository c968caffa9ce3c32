//! Composable SQL text builder for the event store.

mod builder;
mod condition;

pub use builder::*;
pub use condition::*;
