//! Heatmap of 20 ms buckets, one column per second.

use serde::Serialize;

use std::time::Duration;

use crate::{GenericRecord, ProfResult, RecordBuilder};

pub const BUCKET_MILLIS: u64 = 20;
pub const BUCKETS_PER_SECOND: usize = 50;
/// Columns kept at most; later seconds are dropped.
pub const MAX_SECONDS: usize = 3_600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubSecondData {
    #[serde(rename = "maxValue")]
    pub max_value: u64,
    /// One entry per second, each holding `BUCKETS_PER_SECOND` sums.
    pub columns: Vec<Vec<u64>>,
}

/// Columns are relative to `window_start`; records outside the window are ignored and
/// seconds without records come out as all-zero columns.
pub struct SubSecondBuilder {
    window_start: Duration,
    window_end: Option<Duration>,
    use_weight: bool,
    columns: Vec<[u64; BUCKETS_PER_SECOND]>,
    max_value: u64,
}

impl SubSecondBuilder {
    pub fn new(window_start: Duration, use_weight: bool) -> Self {
        Self {
            window_start,
            window_end: None,
            use_weight,
            columns: Vec::new(),
            max_value: 0,
        }
    }

    /// Records at or after `end` are ignored.
    pub fn with_window_end(mut self, end: Duration) -> Self {
        self.window_end = Some(end);
        self
    }

    fn add(&mut self, offset: Duration, value: u64) {
        let millis = u64::try_from(offset.as_millis()).unwrap_or(u64::MAX);
        let second = match usize::try_from(millis / 1000) {
            Ok(second) if second < MAX_SECONDS => second,
            _ => {
                tracing::debug!(millis, "sub-second sample beyond the column limit");
                return;
            }
        };
        // bucket index is below 50 by construction
        let bucket = ((millis % 1000) / BUCKET_MILLIS) as usize;
        if self.columns.len() <= second {
            self.columns.resize(second + 1, [0; BUCKETS_PER_SECOND]);
        }
        let slot = &mut self.columns[second][bucket];
        *slot = slot.saturating_add(value);
        self.max_value = self.max_value.max(*slot);
    }
}

impl RecordBuilder<GenericRecord> for SubSecondBuilder {
    type Output = SubSecondData;

    fn on_record(&mut self, record: GenericRecord) -> ProfResult<()> {
        if self
            .window_end
            .is_some_and(|end| record.timestamp_from_start >= end)
        {
            return Ok(());
        }
        if let Some(offset) = record.timestamp_from_start.checked_sub(self.window_start) {
            self.add(offset, record.value(self.use_weight));
        }
        Ok(())
    }

    fn build(self) -> SubSecondData {
        SubSecondData {
            max_value: self.max_value,
            columns: self.columns.iter().map(|c| c.to_vec()).collect(),
        }
    }
}
