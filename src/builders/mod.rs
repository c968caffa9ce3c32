//! Single-pass reducers fed by the streaming pipeline.

mod fields;
mod gc;
mod jit;
mod subsecond;
mod timeseries;
mod topk;

pub use fields::*;
pub use gc::*;
pub use jit::*;
pub use subsecond::*;
pub use timeseries::*;
pub use topk::*;

use crate::ProfResult;

/// Terminal reducer of one stream. Consumed by `build`, so it cannot be reused for a
/// second stream. A stream with no rows still builds a well-defined empty output.
pub trait RecordBuilder<R> {
    type Output;

    fn on_record(&mut self, record: R) -> ProfResult<()>;

    fn build(self) -> Self::Output;
}

/// Collects every record. Only for streams known to be small.
impl<R> RecordBuilder<R> for Vec<R> {
    type Output = Vec<R>;

    fn on_record(&mut self, record: R) -> ProfResult<()> {
        self.push(record);
        Ok(())
    }

    fn build(self) -> Vec<R> {
        self
    }
}

/// Rounds to two decimals, the precision of every ratio in the overviews.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
