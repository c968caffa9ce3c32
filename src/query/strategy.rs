//! Query shape selection and the aggregated flame-graph query.

use serde::Serialize;

use crate::sql::{
    RELATIVE_START_COLUMN, SqlBuilder, and, c, eq, exists, gte, in_strings, l, lt, not_exists,
    or, p, raw,
};
use crate::{BuiltQuery, EventType, ProfError, ProfResult, QueryBuilder, QueryConfigurer, SqlFormatter};

/// Grouping applied on top of the per-stacktrace aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStrategy {
    Default,
    WeightEntitySplit,
    ThreadSplit,
    ThreadWeightEntitySplit,
}

impl QueryStrategy {
    /// Picks the query shape for a request. Pure; only the configurer is consulted.
    pub fn resolve(configurer: &QueryConfigurer) -> Self {
        let weight_split = is_native_leak(configurer)
            || (configurer.use_weight
                && configurer
                    .event_types
                    .iter()
                    .any(EventType::has_weight_entity));
        match (configurer.threads, weight_split) {
            (true, true) => Self::ThreadWeightEntitySplit,
            (true, false) => Self::ThreadSplit,
            (false, true) => Self::WeightEntitySplit,
            (false, false) => Self::Default,
        }
    }

    pub fn splits_by_thread(self) -> bool {
        matches!(self, Self::ThreadSplit | Self::ThreadWeightEntitySplit)
    }

    pub fn splits_by_weight_entity(self) -> bool {
        matches!(self, Self::WeightEntitySplit | Self::ThreadWeightEntitySplit)
    }
}

fn is_native_leak(configurer: &QueryConfigurer) -> bool {
    matches!(configurer.event_types.as_slice(), [EventType::NativeLeak])
}

const THREAD_COLUMNS: [&str; 4] = [
    "threads.os_id",
    "threads.java_id",
    "threads.name",
    "threads.is_virtual",
];

/// Selected only when several types share one query, so rows keep their own type.
const EVENT_TYPE_COLUMN: &str = "events.event_type";

const STACKTRACE_COLUMNS: [&str; 2] = ["stacktraces.stacktrace_hash", "stacktraces.frame_hashes"];

/// Stacktraces aggregated per query shape, with the request bound as named parameters.
pub struct FlamegraphQueryBuilder<'a> {
    formatter: &'a dyn SqlFormatter,
    strategy: QueryStrategy,
    profile_id: String,
    configurer: QueryConfigurer,
}

impl<'a> FlamegraphQueryBuilder<'a> {
    pub fn new(
        formatter: &'a dyn SqlFormatter,
        profile_id: &str,
        configurer: &QueryConfigurer,
    ) -> Self {
        Self {
            formatter,
            strategy: QueryStrategy::resolve(configurer),
            profile_id: profile_id.to_string(),
            configurer: configurer.clone(),
        }
    }

    pub fn with_strategy(mut self, strategy: QueryStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn strategy(&self) -> QueryStrategy {
        self.strategy
    }

    fn statement(&self) -> ProfResult<SqlBuilder> {
        let configurer = &self.configurer;
        let split_threads = self.strategy.splits_by_thread() || configurer.specified_thread.is_some();
        let split_weight = self.strategy.splits_by_weight_entity();
        let split_types = configurer.event_types.len() > 1;

        let mut builder = SqlBuilder::new();
        if split_threads {
            builder.add_columns(THREAD_COLUMNS)?;
        }
        if split_types {
            builder.add_column(EVENT_TYPE_COLUMN)?;
        }
        builder.add_columns(STACKTRACE_COLUMNS)?;
        if split_weight {
            builder.add_column("events.weight_entity")?;
        }
        builder
            .add_column("SUM(events.samples) AS total_samples")?
            .add_column("SUM(events.weight) AS total_weight")?;

        builder.from("events").merge(self.formatter.stacktraces_join());
        if split_threads {
            let mut threads = self.formatter.threads();
            threads.clear_columns();
            builder.merge(threads);
        }

        builder.filter(self.event_filter()?);
        builder
            .and(or([
                raw(":from_time IS NULL"),
                gte(RELATIVE_START_COLUMN, p("from_time")),
            ]))
            .and(or([
                raw(":to_time IS NULL"),
                lt(RELATIVE_START_COLUMN, p("to_time")),
            ]))
            .and(or([
                raw(":stacktrace_types IS NULL"),
                raw(
                    self.formatter
                        .list_contains(":stacktrace_types", "stacktraces.type_id"),
                ),
            ]))
            .and(or([
                raw(":included_tags IS NULL"),
                raw(
                    self.formatter
                        .list_overlaps("stacktraces.tag_ids", ":included_tags"),
                ),
            ]))
            .and(or([
                raw(":excluded_tags IS NULL"),
                raw("stacktraces.tag_ids IS NULL"),
                raw(format!(
                    "NOT {}",
                    self.formatter
                        .list_overlaps("stacktraces.tag_ids", ":excluded_tags")
                )),
            ]));
        if split_threads {
            builder
                .and(or([
                    raw(":java_thread_id IS NULL"),
                    eq("threads.java_id", p("java_thread_id")),
                ]))
                .and(or([
                    raw(":os_thread_id IS NULL"),
                    eq("threads.os_id", p("os_thread_id")),
                ]));
        }
        builder.and(or([raw(":search_pattern IS NULL"), exists(self.frame_search())]));
        if is_native_leak(configurer) {
            builder.and(not_exists(freed_allocation()));
        }

        if split_threads {
            builder.group_by(THREAD_COLUMNS);
        }
        if split_types {
            builder.group_by([EVENT_TYPE_COLUMN]);
        }
        builder.group_by(STACKTRACE_COLUMNS);
        if split_weight {
            builder.group_by(["events.weight_entity"]);
        }
        Ok(builder)
    }

    fn event_filter(&self) -> ProfResult<crate::sql::Condition> {
        let types = &self.configurer.event_types;
        match types.as_slice() {
            [] => Err(ProfError::InvalidArgument(
                "event types must be specified in the configurer".to_string(),
            )),
            // leaks are mallocs with no matching free; the type itself is never stored
            [EventType::NativeLeak] => Ok(and([
                eq("events.profile_id", p("profile_id")),
                eq("events.event_type", l(EventType::Malloc.code())),
            ])),
            [_] => Ok(and([
                eq("events.profile_id", p("profile_id")),
                eq("events.event_type", p("event_type")),
            ])),
            many => Ok(and([
                eq("events.profile_id", p("profile_id")),
                in_strings("events.event_type", many.iter().map(|t| t.code())),
            ])),
        }
    }

    fn frame_search(&self) -> SqlBuilder {
        let mut frames = SqlBuilder::select(["1"]);
        frames
            .from("frames")
            .filter(eq("frames.profile_id", c("events.profile_id")))
            .and(raw(
                self.formatter
                    .list_contains("stacktraces.frame_hashes", "frames.frame_hash"),
            ))
            .and(raw(
                "(frames.class_name || '.' || frames.method_name) LIKE :search_pattern",
            ));
        frames
    }
}

fn freed_allocation() -> SqlBuilder {
    let mut frees = SqlBuilder::select(["1"]);
    frees
        .from_as("events", "frees")
        .filter(eq("frees.profile_id", c("events.profile_id")))
        .and(eq("frees.event_type", l(EventType::Free.code())))
        .and(eq("frees.weight_entity", c("events.weight_entity")));
    frees
}

impl QueryBuilder for FlamegraphQueryBuilder<'_> {
    fn build(&self) -> ProfResult<BuiltQuery> {
        let sql = self.statement()?.build_for_profile(p("profile_id"))?;
        let query = BuiltQuery::with_params(sql, self.configurer.params(&self.profile_id));
        if let Some(missing) = query
            .referenced_params()
            .into_iter()
            .find(|name| query.params.get(name).is_none())
        {
            return Err(ProfError::QueryBuild(format!(
                "parameter :{missing} is referenced but not bound"
            )));
        }
        tracing::debug!(strategy = ?self.strategy, "built flamegraph query");
        Ok(query)
    }
}
