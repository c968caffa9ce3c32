//! Streaming execution: rows pulled from an event store, mapped and reduced one at a time.

mod cancel;
mod frames;
mod mapper;
mod repository;
mod row;

#[cfg(test)]
pub(crate) mod testing;

pub use cancel::*;
pub use frames::*;
pub use mapper::*;
pub use repository::*;
pub use row::*;
