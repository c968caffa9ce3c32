//! Per-event query with optional enrichment joins.

use crate::sql::{SqlBuilder, and, c, eq, p};
use crate::{
    BuiltQuery, EventType, ParamValue, ProfError, ProfResult, QueryBuilder, QueryConfigurer,
    QueryParams, SqlFormatter,
};

pub const BASE_FIELDS: [&str; 7] = [
    "events.event_type",
    "events.start_timestamp",
    "events.start_timestamp_from_beginning",
    "events.duration",
    "events.samples",
    "events.weight",
    "events.weight_entity",
];

pub struct GenericQueryBuilder {
    profile_id: String,
    builder: SqlBuilder,
}

impl GenericQueryBuilder {
    pub fn new(
        formatter: &dyn SqlFormatter,
        profile_id: &str,
        configurer: &QueryConfigurer,
    ) -> ProfResult<Self> {
        Self::with_fields(
            formatter,
            profile_id,
            configurer,
            &configurer.event_types,
            &BASE_FIELDS,
        )
    }

    pub fn with_fields(
        formatter: &dyn SqlFormatter,
        profile_id: &str,
        configurer: &QueryConfigurer,
        event_types: &[EventType],
        base_fields: &[&str],
    ) -> ProfResult<Self> {
        if event_types.is_empty() {
            return Err(ProfError::InvalidArgument(
                "event types must be specified in the configurer".to_string(),
            ));
        }

        let mut builder = SqlBuilder::new();
        builder
            .add_columns(base_fields)?
            .from("events")
            .filter(formatter.profile_and_types(profile_id, event_types)?);

        let mut this = Self {
            profile_id: profile_id.to_string(),
            builder,
        };
        this.apply(formatter, configurer);
        Ok(this)
    }

    fn apply(&mut self, formatter: &dyn SqlFormatter, configurer: &QueryConfigurer) {
        if let Some(range) = &configurer.time_range {
            self.builder.merge(formatter.time_range(range));
        }

        let has_tags = !configurer.stacktrace_tags.is_empty();
        let has_types = !configurer.stacktrace_types.is_empty();
        let has_search = configurer.search_pattern.is_some();
        if configurer.include_frames {
            self.builder.merge(formatter.stacktraces());
        } else if has_tags || has_types || has_search {
            self.builder.merge(formatter.stacktraces_join());
        }
        if has_types {
            self.builder
                .merge(formatter.stacktrace_types(&configurer.stacktrace_types));
        }
        if has_tags {
            self.builder
                .merge(formatter.stacktrace_tags(&configurer.stacktrace_tags));
        }
        if let Some(pattern) = &configurer.search_pattern {
            self.builder.merge(formatter.search_pattern(pattern));
        }

        if configurer.needs_threads() {
            self.builder.merge(formatter.threads());
        }
        if let Some(thread) = &configurer.specified_thread {
            self.builder.merge(formatter.thread_info(thread));
        }
        if configurer.event_type_info {
            self.builder.merge(formatter.event_types());
        }
        if configurer.json_fields {
            self.builder.merge(formatter.event_fields());
        }
    }

    pub fn add_group_by(&mut self, column: &str) -> &mut Self {
        self.builder.group_by([column]);
        self
    }

    pub fn add_order_by(&mut self, column: &str) -> &mut Self {
        self.builder.order_by(column);
        self
    }

    pub fn merge(&mut self, other: SqlBuilder) -> &mut Self {
        self.builder.merge(other);
        self
    }

    pub fn sql(&self) -> ProfResult<String> {
        self.builder.build_for_profile(self.profile_id.as_str())
    }
}

impl QueryBuilder for GenericQueryBuilder {
    fn build(&self) -> ProfResult<BuiltQuery> {
        Ok(BuiltQuery::new(self.sql()?))
    }
}

/// Per-type totals of one profile, the input for pairing two profiles in a diff.
pub fn event_summary_query(profile_id: &str) -> ProfResult<BuiltQuery> {
    let mut builder = SqlBuilder::select([
        "events.event_type",
        "event_types.label",
        "SUM(events.samples) AS samples",
        "SUM(events.weight) AS weight",
    ]);
    builder
        .from("events")
        .join(
            "event_types",
            and([
                eq("events.profile_id", c("event_types.profile_id")),
                eq("events.event_type", c("event_types.name")),
            ]),
        )
        .filter(eq("events.profile_id", p("profile_id")))
        .group_by(["events.event_type", "event_types.label"]);

    let mut params = QueryParams::new();
    params.insert("profile_id", ParamValue::Text(profile_id.to_string()));
    Ok(BuiltQuery::with_params(builder.build()?, params))
}
