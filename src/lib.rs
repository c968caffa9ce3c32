//! Profscope core library: event queries, streaming reducers and flame graphs.

mod builders;
mod config;
mod convert;
mod error;
mod flame;
mod model;
mod query;
pub mod sql;
mod stream;

pub use builders::*;
pub use config::*;
pub use convert::*;
pub use error::*;
pub use flame::*;
pub use model::*;
pub use query::*;
pub use sql::{Condition, JoinKind, SortOrder, SqlBuilder};
pub use stream::*;
