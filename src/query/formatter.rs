//! Reusable query fragments and the database-specific seams between them.

use crate::sql::{
    Condition, RELATIVE_START_COLUMN, SqlBuilder, and, c, eq, gte, in_longs, in_strings, l, lt,
    raw,
};
use crate::{EventType, ProfError, ProfResult, RelativeTimeRange, StacktraceTag, StacktraceType, ThreadInfo};

/// Fragments are `SqlBuilder`s meant to be merged into a base `SELECT ... FROM events`.
pub trait SqlFormatter {
    /// Projects a JSON column under `alias`.
    fn json_column(&self, column: &str, alias: &str) -> String;

    /// True when the list column `list` shares an element with the SQL list `values`.
    fn list_has_any(&self, list: &str, values: &str) -> String;

    /// True when the list column `list` contains the scalar `element`.
    fn list_contains(&self, list: &str, element: &str) -> String;

    /// True when two list expressions share an element; `other` is usually a bound parameter.
    fn list_overlaps(&self, list: &str, other: &str) -> String;

    fn profile_and_types(&self, profile_id: &str, types: &[EventType]) -> ProfResult<Condition> {
        match types {
            [] => Err(ProfError::InvalidArgument(
                "event types must be specified".to_string(),
            )),
            [single] => Ok(and([
                eq("events.profile_id", l(profile_id)),
                eq("events.event_type", l(single.code())),
            ])),
            many => Ok(and([
                eq("events.profile_id", l(profile_id)),
                in_strings("events.event_type", many.iter().map(|t| t.code())),
            ])),
        }
    }

    fn time_range(&self, range: &RelativeTimeRange) -> SqlBuilder {
        let mut builder = SqlBuilder::new();
        if let Some(start) = range.start {
            builder.and(gte(RELATIVE_START_COLUMN, millis(start)));
        }
        if let Some(end) = range.end {
            builder.and(lt(RELATIVE_START_COLUMN, millis(end)));
        }
        builder
    }

    fn event_fields(&self) -> SqlBuilder {
        SqlBuilder::select([self.json_column("events.fields", "event_fields")])
    }

    fn threads(&self) -> SqlBuilder {
        let mut builder = SqlBuilder::select([
            "threads.java_id",
            "threads.os_id",
            "threads.is_virtual",
            "threads.name",
        ]);
        builder.join(
            "threads",
            and([
                eq("events.profile_id", c("threads.profile_id")),
                eq("events.thread_hash", c("threads.thread_hash")),
            ]),
        );
        builder
    }

    /// Restricts to one thread; prefers the Java id and falls back to the OS id.
    fn thread_info(&self, thread: &ThreadInfo) -> SqlBuilder {
        let mut builder = SqlBuilder::new();
        match thread.java_id {
            Some(java_id) => builder.filter(eq("threads.java_id", l(java_id))),
            None => builder.filter(eq("threads.os_id", l(thread.os_id))),
        };
        builder
    }

    fn event_types(&self) -> SqlBuilder {
        let mut builder = SqlBuilder::select(["event_types.label"]);
        builder.join(
            "event_types",
            and([
                eq("events.profile_id", c("event_types.profile_id")),
                eq("events.event_type", c("event_types.name")),
            ]),
        );
        builder
    }

    fn stacktraces_join(&self) -> SqlBuilder {
        let mut builder = SqlBuilder::new();
        builder.join(
            "stacktraces",
            and([
                eq("events.profile_id", c("stacktraces.profile_id")),
                eq("events.stacktrace_hash", c("stacktraces.stacktrace_hash")),
            ]),
        );
        builder
    }

    fn stacktraces(&self) -> SqlBuilder {
        let mut builder = SqlBuilder::select([
            "stacktraces.stacktrace_hash",
            "stacktraces.frame_hashes",
        ]);
        builder.merge(self.stacktraces_join());
        builder
    }

    fn stacktrace_types(&self, types: &[StacktraceType]) -> SqlBuilder {
        let mut builder = SqlBuilder::new();
        builder.and(in_longs("stacktraces.type_id", types.iter().map(|t| t.id)));
        builder
    }

    fn stacktrace_tags(&self, tags: &[StacktraceTag]) -> SqlBuilder {
        let (included, excluded): (Vec<&StacktraceTag>, Vec<&StacktraceTag>) = tags.iter().partition(|t| t.includes);
        let mut builder = SqlBuilder::new();
        if !included.is_empty() {
            let ids = id_list(included.iter().map(|t| t.id));
            builder.and(raw(self.list_has_any("stacktraces.tag_ids", &ids)));
        }
        if !excluded.is_empty() {
            let ids = id_list(excluded.iter().map(|t| t.id));
            builder.and(raw(format!(
                "(stacktraces.tag_ids IS NULL OR NOT {})",
                self.list_has_any("stacktraces.tag_ids", &ids)
            )));
        }
        builder
    }

    /// Keeps events whose stacktrace holds a frame named like `%pattern%`.
    fn search_pattern(&self, pattern: &str) -> SqlBuilder {
        let mut frames = SqlBuilder::select(["1"]);
        frames
            .from("frames")
            .filter(eq("frames.profile_id", c("events.profile_id")))
            .and(raw(
                self.list_contains("stacktraces.frame_hashes", "frames.frame_hash"),
            ))
            .and(crate::sql::like(
                "(frames.class_name || '.' || frames.method_name)",
                format!("%{pattern}%"),
            ));
        let mut builder = SqlBuilder::new();
        builder.and(crate::sql::exists(frames));
        builder
    }
}

fn millis(d: std::time::Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

fn id_list(ids: impl Iterator<Item = i64>) -> String {
    ids.map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
}

/// DuckDB dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuckDbFormatter;

impl SqlFormatter for DuckDbFormatter {
    fn json_column(&self, column: &str, alias: &str) -> String {
        format!("CAST({column} AS JSON) AS {alias}")
    }

    fn list_has_any(&self, list: &str, values: &str) -> String {
        format!("list_has_any({list}, [{values}])")
    }

    fn list_contains(&self, list: &str, element: &str) -> String {
        format!("list_contains({list}, {element})")
    }

    fn list_overlaps(&self, list: &str, other: &str) -> String {
        format!("list_has_any({list}, {other})")
    }
}

/// SQLite dialect; lists are stored as JSON arrays.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteFormatter;

impl SqlFormatter for SqliteFormatter {
    fn json_column(&self, column: &str, alias: &str) -> String {
        format!("json({column}) AS {alias}")
    }

    fn list_has_any(&self, list: &str, values: &str) -> String {
        format!("EXISTS (SELECT 1 FROM json_each({list}) WHERE json_each.value IN ({values}))")
    }

    fn list_contains(&self, list: &str, element: &str) -> String {
        format!("EXISTS (SELECT 1 FROM json_each({list}) WHERE json_each.value = {element})")
    }

    fn list_overlaps(&self, list: &str, other: &str) -> String {
        format!(
            "EXISTS (SELECT 1 FROM json_each({list}) a JOIN json_each({other}) b ON a.value = b.value)"
        )
    }
}
