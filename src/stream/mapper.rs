//! Row to record mapping.

use std::time::Duration;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::{
    EventType, EventTypeSummary, FlamegraphRecord, FramesCache, GenericRecord, ProfError,
    ProfResult, QueryConfigurer, Row, SqlValue, ThreadInfo,
};

pub trait RowMapper<R> {
    fn map_row(&self, row: Row) -> ProfResult<R>;
}

/// Maps rows of the generic per-event query. Optional columns are read only when the
/// configurer asked for them.
pub struct GenericRecordMapper<'a> {
    threads: bool,
    json_fields: bool,
    type_label: bool,
    frames: Option<&'a FramesCache>,
}

impl<'a> GenericRecordMapper<'a> {
    pub fn new(configurer: &QueryConfigurer) -> Self {
        Self {
            threads: configurer.needs_threads(),
            json_fields: configurer.json_fields,
            type_label: configurer.event_type_info,
            frames: None,
        }
    }

    /// Resolves `frame_hashes` through `cache`; without it frames are left out.
    pub fn with_frames(mut self, cache: &'a FramesCache) -> Self {
        self.frames = Some(cache);
        self
    }
}

impl RowMapper<GenericRecord> for GenericRecordMapper<'_> {
    fn map_row(&self, row: Row) -> ProfResult<GenericRecord> {
        let event_type = EventType::from_code(row.require_text("event_type")?);

        let fields = if self.json_fields {
            match row.json("event_fields")? {
                None => None,
                Some(serde_json::Value::Object(map)) => Some(map),
                Some(other) => {
                    return Err(ProfError::DataMapping(format!(
                        "event_fields is not an object: {other}"
                    )));
                }
            }
        } else {
            None
        };

        let frames = match self.frames {
            Some(cache) => match row.i64_list("frame_hashes")? {
                Some(hashes) => Some(cache.resolve(&hashes)?),
                None => None,
            },
            None => None,
        };

        Ok(GenericRecord {
            event_type: Some(event_type),
            start_timestamp: timestamp(&row, "start_timestamp")?,
            timestamp_from_start: Duration::from_millis(
                row.u64_or_zero("start_timestamp_from_beginning")?,
            ),
            duration: Duration::from_nanos(row.u64_or_zero("duration")?),
            samples: row.u64_or_zero("samples")?,
            weight: row.u64_or_zero("weight")?,
            weight_entity: row.text("weight_entity")?.map(str::to_string),
            thread: if self.threads { thread(&row)? } else { None },
            frames,
            fields,
            type_label: if self.type_label {
                row.text("label")?.map(str::to_string)
            } else {
                None
            },
        })
    }
}

/// Maps aggregated stacktrace rows; frames are resolved through a per-request cache.
///
/// Rows carrying an `event_type` column keep their own type; otherwise the mapper's
/// type is stamped on every record.
pub struct FlamegraphRowMapper<'a> {
    event_type: EventType,
    frames: &'a FramesCache,
    threads: bool,
}

impl<'a> FlamegraphRowMapper<'a> {
    pub fn new(event_type: EventType, frames: &'a FramesCache, threads: bool) -> Self {
        Self {
            event_type,
            frames,
            threads,
        }
    }
}

impl RowMapper<FlamegraphRecord> for FlamegraphRowMapper<'_> {
    fn map_row(&self, row: Row) -> ProfResult<FlamegraphRecord> {
        let hashes = row.i64_list("frame_hashes")?.ok_or_else(|| {
            ProfError::DataMapping("stacktrace row without frame_hashes".to_string())
        })?;
        let event_type = match row.text("event_type")? {
            Some(code) => EventType::from_code(code),
            None => self.event_type.clone(),
        };
        Ok(FlamegraphRecord {
            event_type,
            thread: if self.threads { thread(&row)? } else { None },
            weight_entity: row.text("weight_entity")?.map(str::to_string),
            frames: self.frames.resolve(&hashes)?,
            samples: row.u64_or_zero("total_samples")?,
            weight: row.u64_or_zero("total_weight")?,
        })
    }
}

/// Maps rows of the per-type summary query.
pub struct EventSummaryMapper;

impl RowMapper<EventTypeSummary> for EventSummaryMapper {
    fn map_row(&self, row: Row) -> ProfResult<EventTypeSummary> {
        let name = row.require_text("event_type")?.to_string();
        Ok(EventTypeSummary {
            label: row.text("label")?.unwrap_or(&name).to_string(),
            samples: row.u64_or_zero("samples")?,
            weight: row.u64_or_zero("weight")?,
            name,
        })
    }
}

/// Absolute timestamp as epoch milliseconds or RFC 3339 text.
fn timestamp(row: &Row, column: &str) -> ProfResult<Option<OffsetDateTime>> {
    match row.get(column) {
        None => Ok(None),
        Some(SqlValue::Int(millis)) => {
            OffsetDateTime::from_unix_timestamp_nanos(i128::from(*millis) * 1_000_000)
                .map(Some)
                .map_err(|err| ProfError::DataMapping(format!("column {column}: {err}")))
        }
        Some(_) => {
            let text = row.require_text(column)?;
            OffsetDateTime::parse(text, &Rfc3339)
                .map(Some)
                .map_err(|err| ProfError::DataMapping(format!("column {column}: {err}")))
        }
    }
}

/// Thread columns, either flat or nested in a `thread` JSON struct.
fn thread(row: &Row) -> ProfResult<Option<ThreadInfo>> {
    if let Some(value) = row.json("thread")? {
        return serde_json::from_value(value)
            .map(Some)
            .map_err(|err| ProfError::DataMapping(format!("malformed thread struct: {err}")));
    }
    let Some(os_id) = row.i64("os_id")? else {
        return Ok(None);
    };
    Ok(Some(ThreadInfo {
        os_id,
        java_id: row.i64("java_id")?,
        name: row.text("name")?.unwrap_or_default().to_string(),
        is_virtual: row.bool("is_virtual")?.unwrap_or(false),
    }))
}
