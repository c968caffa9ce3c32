//! What analytical slice a request wants.

use std::time::Duration;

use crate::{
    EventType, ParamValue, QueryParams, RelativeTimeRange, StacktraceTag, StacktraceType,
    ThreadInfo,
};

/// Immutable once handed to a query builder; assembled with the `with_*` methods.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryConfigurer {
    pub event_types: Vec<EventType>,
    pub time_range: Option<RelativeTimeRange>,
    pub specified_thread: Option<ThreadInfo>,
    pub stacktrace_types: Vec<StacktraceType>,
    pub stacktrace_tags: Vec<StacktraceTag>,
    pub threads: bool,
    pub json_fields: bool,
    pub event_type_info: bool,
    pub include_frames: bool,
    pub use_weight: bool,
    pub search_pattern: Option<String>,
}

impl QueryConfigurer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_event_type(mut self, event_type: EventType) -> Self {
        self.event_types.push(event_type);
        self
    }

    pub fn with_event_types(mut self, event_types: impl IntoIterator<Item = EventType>) -> Self {
        self.event_types.extend(event_types);
        self
    }

    pub fn with_time_range(mut self, range: RelativeTimeRange) -> Self {
        self.time_range = Some(range);
        self
    }

    pub fn with_specified_thread(mut self, thread: ThreadInfo) -> Self {
        self.specified_thread = Some(thread);
        self
    }

    pub fn with_stacktrace_types(
        mut self,
        types: impl IntoIterator<Item = StacktraceType>,
    ) -> Self {
        self.stacktrace_types.extend(types);
        self
    }

    pub fn with_stacktrace_tags(mut self, tags: impl IntoIterator<Item = StacktraceTag>) -> Self {
        self.stacktrace_tags.extend(tags);
        self
    }

    pub fn with_threads(mut self) -> Self {
        self.threads = true;
        self
    }

    pub fn with_json_fields(mut self) -> Self {
        self.json_fields = true;
        self
    }

    pub fn with_event_type_info(mut self) -> Self {
        self.event_type_info = true;
        self
    }

    pub fn with_include_frames(mut self) -> Self {
        self.include_frames = true;
        self
    }

    pub fn with_use_weight(mut self) -> Self {
        self.use_weight = true;
        self
    }

    pub fn with_search_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.search_pattern = Some(pattern.into());
        self
    }

    /// Thread columns are needed either on request or to filter by a specific thread.
    pub fn needs_threads(&self) -> bool {
        self.threads || self.specified_thread.is_some()
    }

    pub fn included_tag_ids(&self) -> Vec<i64> {
        self.stacktrace_tags
            .iter()
            .filter(|t| t.includes)
            .map(|t| t.id)
            .collect()
    }

    pub fn excluded_tag_ids(&self) -> Vec<i64> {
        self.stacktrace_tags
            .iter()
            .filter(|t| !t.includes)
            .map(|t| t.id)
            .collect()
    }

    /// Named parameters for statements that bind the request at execution time.
    pub fn params(&self, profile_id: &str) -> QueryParams {
        let mut params = QueryParams::new();
        params.insert("profile_id", ParamValue::Text(profile_id.to_string()));
        params.insert(
            "event_type",
            match self.event_types.first() {
                Some(ty) => ParamValue::Text(ty.code().to_string()),
                None => ParamValue::Null,
            },
        );

        let range = self.time_range.unwrap_or_default();
        params.insert("from_time", millis_param(range.start));
        params.insert("to_time", millis_param(range.end));
        // native threads have no java id and are matched by os id instead
        let (java_thread_id, os_thread_id) = match &self.specified_thread {
            Some(ThreadInfo {
                java_id: Some(id), ..
            }) => (ParamValue::Long(*id), ParamValue::Null),
            Some(thread) => (ParamValue::Null, ParamValue::Long(thread.os_id)),
            None => (ParamValue::Null, ParamValue::Null),
        };
        params.insert("java_thread_id", java_thread_id);
        params.insert("os_thread_id", os_thread_id);
        params.insert(
            "stacktrace_types",
            ParamValue::longs_or_null(self.stacktrace_types.iter().map(|t| t.id).collect()),
        );
        params.insert(
            "included_tags",
            ParamValue::longs_or_null(self.included_tag_ids()),
        );
        params.insert(
            "excluded_tags",
            ParamValue::longs_or_null(self.excluded_tag_ids()),
        );
        params.insert(
            "search_pattern",
            match &self.search_pattern {
                Some(pattern) => ParamValue::Text(format!("%{pattern}%")),
                None => ParamValue::Null,
            },
        );
        params
    }
}

fn millis_param(bound: Option<Duration>) -> ParamValue {
    match bound {
        Some(d) => ParamValue::Long(i64::try_from(d.as_millis()).unwrap_or(i64::MAX)),
        None => ParamValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_bind_every_named_slot() {
        let configurer = QueryConfigurer::new()
            .with_event_type(EventType::ExecutionSample)
            .with_time_range(RelativeTimeRange {
                start: Some(Duration::from_secs(2)),
                end: None,
            })
            .with_stacktrace_tags([
                StacktraceTag {
                    id: 1,
                    includes: true,
                },
                StacktraceTag {
                    id: 2,
                    includes: false,
                },
            ])
            .with_search_pattern("HashMap");
        let params = configurer.params("p-1");
        assert_eq!(params.get("profile_id"), Some(&ParamValue::Text("p-1".into())));
        assert_eq!(
            params.get("event_type"),
            Some(&ParamValue::Text("jdk.ExecutionSample".into()))
        );
        assert_eq!(params.get("from_time"), Some(&ParamValue::Long(2000)));
        assert_eq!(params.get("to_time"), Some(&ParamValue::Null));
        assert_eq!(params.get("java_thread_id"), Some(&ParamValue::Null));
        assert_eq!(params.get("os_thread_id"), Some(&ParamValue::Null));
        assert_eq!(params.get("stacktrace_types"), Some(&ParamValue::Null));
        assert_eq!(
            params.get("included_tags"),
            Some(&ParamValue::Longs(vec![1]))
        );
        assert_eq!(
            params.get("excluded_tags"),
            Some(&ParamValue::Longs(vec![2]))
        );
        assert_eq!(
            params.get("search_pattern"),
            Some(&ParamValue::Text("%HashMap%".into()))
        );
    }

    #[test]
    fn specified_thread_implies_thread_columns() {
        let configurer = QueryConfigurer::new().with_specified_thread(ThreadInfo {
            os_id: 10,
            java_id: Some(3),
            name: "worker".into(),
            is_virtual: false,
        });
        assert!(configurer.needs_threads());
        assert_eq!(
            configurer.params("p").get("java_thread_id"),
            Some(&ParamValue::Long(3))
        );
        assert_eq!(
            configurer.params("p").get("os_thread_id"),
            Some(&ParamValue::Null)
        );
    }

    #[test]
    fn native_thread_is_bound_by_os_id() {
        let params = QueryConfigurer::new()
            .with_specified_thread(ThreadInfo {
                os_id: 10,
                java_id: None,
                name: "GC Thread#0".into(),
                is_virtual: false,
            })
            .params("p");
        assert_eq!(params.get("java_thread_id"), Some(&ParamValue::Null));
        assert_eq!(params.get("os_thread_id"), Some(&ParamValue::Long(10)));
    }
}
