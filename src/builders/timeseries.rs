//! Per-second series on the relative time axis.

use serde::Serialize;

use std::collections::BTreeMap;
use std::time::Duration;

use crate::{EventType, GenericRecord, ProfResult, RecordBuilder, RelativeTimeRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SecondValue {
    pub second: u64,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeseriesSeries {
    pub name: String,
    pub data: Vec<SecondValue>,
}

/// Sparse per-second accumulator that renders zero-filled over `[from, to)`.
#[derive(Debug, Clone)]
pub(crate) struct SecondSeries {
    first: u64,
    end: Option<u64>,
    values: BTreeMap<u64, u64>,
}

impl SecondSeries {
    /// An open end extends the series to the last second that received a value.
    pub fn new(range: &RelativeTimeRange) -> Self {
        Self {
            first: range.start.map_or(0, |s| s.as_secs()),
            end: range.end.map(ceil_secs),
            values: BTreeMap::new(),
        }
    }

    pub fn accepts(&self, second: u64) -> bool {
        second >= self.first && self.end.is_none_or(|end| second < end)
    }

    pub fn add(&mut self, second: u64, value: u64) {
        if self.accepts(second) {
            let slot = self.values.entry(second).or_insert(0);
            *slot = slot.saturating_add(value);
        }
    }

    pub fn max(&mut self, second: u64, value: u64) {
        if self.accepts(second) {
            let slot = self.values.entry(second).or_insert(0);
            *slot = (*slot).max(value);
        }
    }

    pub fn into_points(self) -> Vec<SecondValue> {
        let end = match self.end {
            Some(end) => end,
            None => self
                .values
                .keys()
                .next_back()
                .map_or(self.first, |last| last.saturating_add(1)),
        };
        (self.first..end)
            .map(|second| SecondValue {
                second,
                value: self.values.get(&second).copied().unwrap_or(0),
            })
            .collect()
    }
}

fn ceil_secs(d: Duration) -> u64 {
    if d.subsec_nanos() == 0 {
        d.as_secs()
    } else {
        d.as_secs().saturating_add(1)
    }
}

/// One zero-filled series per requested event type, one-second buckets.
pub struct TimeseriesBuilder {
    use_weight: bool,
    series: Vec<(EventType, SecondSeries)>,
}

impl TimeseriesBuilder {
    pub fn new(event_types: &[EventType], range: RelativeTimeRange, use_weight: bool) -> Self {
        Self {
            use_weight,
            series: event_types
                .iter()
                .map(|ty| (ty.clone(), SecondSeries::new(&range)))
                .collect(),
        }
    }
}

impl RecordBuilder<GenericRecord> for TimeseriesBuilder {
    type Output = Vec<TimeseriesSeries>;

    fn on_record(&mut self, record: GenericRecord) -> ProfResult<()> {
        let second = record.timestamp_from_start.as_secs();
        let value = record.value(self.use_weight);
        if let Some((_, series)) = self
            .series
            .iter_mut()
            .find(|(ty, _)| record.is_type(ty))
        {
            series.add(second, value);
        }
        Ok(())
    }

    fn build(self) -> Vec<TimeseriesSeries> {
        self.series
            .into_iter()
            .map(|(ty, series)| TimeseriesSeries {
                name: ty.code().to_string(),
                data: series.into_points(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ty: EventType, millis: u64, samples: u64, weight: u64) -> GenericRecord {
        GenericRecord {
            event_type: Some(ty),
            timestamp_from_start: Duration::from_millis(millis),
            samples,
            weight,
            ..GenericRecord::default()
        }
    }

    fn window() -> RelativeTimeRange {
        RelativeTimeRange::new(Duration::from_secs(2), Duration::from_secs(5))
    }

    #[test]
    fn empty_stream_is_zero_filled_across_the_window() {
        let series = TimeseriesBuilder::new(&[EventType::ExecutionSample], window(), false).build();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].name, "jdk.ExecutionSample");
        assert_eq!(
            series[0].data,
            [
                SecondValue { second: 2, value: 0 },
                SecondValue { second: 3, value: 0 },
                SecondValue { second: 4, value: 0 },
            ]
        );
    }

    #[test]
    fn buckets_sum_within_half_open_window() {
        let mut builder = TimeseriesBuilder::new(&[EventType::ExecutionSample], window(), false);
        for (millis, samples) in [(1_999, 100), (2_000, 1), (2_999, 2), (4_500, 3), (5_000, 100)] {
            builder
                .on_record(record(EventType::ExecutionSample, millis, samples, 0))
                .expect("record");
        }
        let values: Vec<u64> = builder.build()[0].data.iter().map(|p| p.value).collect();
        assert_eq!(values, [3, 0, 3]);
    }

    #[test]
    fn one_series_per_type_and_weight_switch() {
        let mut builder = TimeseriesBuilder::new(
            &[EventType::ObjectAllocationSample, EventType::ExecutionSample],
            RelativeTimeRange::unbounded(),
            true,
        );
        builder
            .on_record(record(EventType::ObjectAllocationSample, 1_200, 1, 512))
            .expect("alloc");
        builder
            .on_record(record(EventType::ExecutionSample, 0, 1, 7))
            .expect("cpu");
        builder
            .on_record(record(EventType::ThreadPark, 0, 1, 99))
            .expect("ignored");
        let series = builder.build();
        assert_eq!(
            series[0].data,
            [
                SecondValue { second: 0, value: 0 },
                SecondValue { second: 1, value: 512 }
            ]
        );
        assert_eq!(series[1].data, [SecondValue { second: 0, value: 7 }]);
    }
}
