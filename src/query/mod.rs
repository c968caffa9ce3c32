//! Request description, query shapes and their rendering.

mod configurer;
mod formatter;
mod generic;
mod params;
mod strategy;

pub use configurer::*;
pub use formatter::*;
pub use generic::*;
pub use params::*;
pub use strategy::*;

/// A fully configured query, ready to hand to an event store.
pub trait QueryBuilder {
    fn build(&self) -> crate::ProfResult<BuiltQuery>;
}
