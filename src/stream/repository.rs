//! Event store boundary and the pull loop feeding record builders.

use crate::{
    BuiltQuery, CancelToken, EventSummaryMapper, EventTypeSummary, FlamegraphQueryBuilder,
    FlamegraphRecord, FlamegraphRowMapper, FramesCache, GenericQueryBuilder, GenericRecord,
    GenericRecordMapper, ProfError, ProfResult, QueryBuilder, QueryConfigurer, RecordBuilder, Row,
    RowMapper, SqlFormatter, event_summary_query,
};

/// Forward-only cursor over result rows. Dropping it releases the underlying scan.
pub trait RowCursor: Iterator<Item = ProfResult<Row>> {}

impl<T: Iterator<Item = ProfResult<Row>>> RowCursor for T {}

/// External query executor. Errors from the engine come back as `ProfError::Storage`.
pub trait EventStore {
    fn execute(&self, query: &BuiltQuery) -> ProfResult<Box<dyn RowCursor + '_>>;
}

/// Pulls rows one at a time into `builder` and returns its output.
///
/// The first error (storage, mapping, builder or cancellation) stops the scan; the
/// cursor is dropped before the error is returned.
pub fn stream_records<R, M, B>(
    store: &dyn EventStore,
    query: &BuiltQuery,
    mapper: &M,
    mut builder: B,
    cancel: &CancelToken,
) -> ProfResult<B::Output>
where
    M: RowMapper<R> + ?Sized,
    B: RecordBuilder<R>,
{
    cancel.check()?;
    let mut cursor = store.execute(query)?;
    let mut rows = 0u64;
    loop {
        cancel.check()?;
        let Some(row) = cursor.next() else {
            break;
        };
        let record = mapper.map_row(row?)?;
        builder.on_record(record)?;
        rows = rows.saturating_add(1);
    }
    drop(cursor);
    tracing::debug!(rows, "stream finished");
    Ok(builder.build())
}

/// Streaming entry points for one profile.
pub struct EventStreamRepository<'a> {
    store: &'a dyn EventStore,
    formatter: &'a dyn SqlFormatter,
    profile_id: String,
    cancel: CancelToken,
}

impl<'a> EventStreamRepository<'a> {
    pub fn new(store: &'a dyn EventStore, formatter: &'a dyn SqlFormatter, profile_id: &str) -> Self {
        Self {
            store,
            formatter,
            profile_id: profile_id.to_string(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn generic_streaming<B>(&self, configurer: &QueryConfigurer, builder: B) -> ProfResult<B::Output>
    where
        B: RecordBuilder<GenericRecord>,
    {
        let query = GenericQueryBuilder::new(self.formatter, &self.profile_id, configurer)?.build()?;
        if configurer.include_frames {
            let frames = FramesCache::load(self.store, &self.profile_id)?;
            let mapper = GenericRecordMapper::new(configurer).with_frames(&frames);
            stream_records(self.store, &query, &mapper, builder, &self.cancel)
        } else {
            let mapper = GenericRecordMapper::new(configurer);
            stream_records(self.store, &query, &mapper, builder, &self.cancel)
        }
    }

    /// With several event types each record carries the type of its own row; the first
    /// requested type is the fallback.
    pub fn flamegraph_streaming<B>(
        &self,
        configurer: &QueryConfigurer,
        builder: B,
    ) -> ProfResult<B::Output>
    where
        B: RecordBuilder<FlamegraphRecord>,
    {
        let event_type = configurer.event_types.first().cloned().ok_or_else(|| {
            ProfError::InvalidArgument("event types must be specified in the configurer".to_string())
        })?;
        let query_builder = FlamegraphQueryBuilder::new(self.formatter, &self.profile_id, configurer);
        let threads = query_builder.strategy().splits_by_thread() || configurer.specified_thread.is_some();
        let query = query_builder.build()?;

        let frames = FramesCache::load(self.store, &self.profile_id)?;
        let mapper = FlamegraphRowMapper::new(event_type, &frames, threads);
        stream_records(self.store, &query, &mapper, builder, &self.cancel)
    }

    pub fn event_summaries(&self) -> ProfResult<Vec<EventTypeSummary>> {
        let query = event_summary_query(&self.profile_id)?;
        stream_records(self.store, &query, &EventSummaryMapper, Vec::new(), &self.cancel)
    }
}
