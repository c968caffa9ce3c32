//! Longest JIT compilations.

use serde::Serialize;

use crate::{EventType, GenericRecord, ProfResult, RecordBuilder, TopK};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JitCompilation {
    #[serde(rename = "compileId")]
    pub compile_id: i64,
    pub method: String,
    pub compiler: String,
    #[serde(rename = "compileLevel")]
    pub compile_level: i64,
    pub succeeded: bool,
    #[serde(rename = "isOsr")]
    pub is_osr: bool,
    #[serde(rename = "codeSize")]
    pub code_size: u64,
    #[serde(rename = "inlinedBytes")]
    pub inlined_bytes: u64,
    pub duration: u64,
    #[serde(rename = "timestampFromStart")]
    pub timestamp_from_start: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JitCompilations {
    #[serde(rename = "totalCompilations")]
    pub total_compilations: u64,
    #[serde(rename = "failedCompilations")]
    pub failed_compilations: u64,
    #[serde(rename = "osrCompilations")]
    pub osr_compilations: u64,
    /// Sum of compilation durations, nanoseconds.
    #[serde(rename = "totalCompileTime")]
    pub total_compile_time: u64,
    #[serde(rename = "longestCompilations")]
    pub longest_compilations: Vec<JitCompilation>,
}

pub struct JitCompilationsBuilder {
    longest: TopK<JitCompilation>,
    total: u64,
    failed: u64,
    osr: u64,
    total_time: u64,
}

impl JitCompilationsBuilder {
    pub fn new(limit: usize) -> Self {
        Self {
            longest: TopK::new(limit),
            total: 0,
            failed: 0,
            osr: 0,
            total_time: 0,
        }
    }
}

impl RecordBuilder<GenericRecord> for JitCompilationsBuilder {
    type Output = JitCompilations;

    fn on_record(&mut self, record: GenericRecord) -> ProfResult<()> {
        if !record.is_type(&EventType::Compilation) {
            return Ok(());
        }
        let duration = u64::try_from(record.duration.as_nanos()).unwrap_or(u64::MAX);
        // older recordings carry the misspelled field
        let succeeded = record
            .field_bool("succeded")
            .or_else(|| record.field_bool("succeeded"))
            .unwrap_or(true);
        let is_osr = record.field_bool("isOsr").unwrap_or(false);

        self.total += 1;
        self.total_time = self.total_time.saturating_add(duration);
        if !succeeded {
            self.failed += 1;
        }
        if is_osr {
            self.osr += 1;
        }

        let compilation = JitCompilation {
            compile_id: record.field_i64("compileId").unwrap_or(-1),
            method: record.field_str("method").unwrap_or_default().to_string(),
            compiler: record.field_str("compiler").unwrap_or_default().to_string(),
            compile_level: record.field_i64("compileLevel").unwrap_or(0),
            succeeded,
            is_osr,
            code_size: record.field_u64("codeSize").unwrap_or(0),
            inlined_bytes: record.field_u64("inlinedBytes").unwrap_or(0),
            duration,
            timestamp_from_start: u64::try_from(record.timestamp_from_start.as_millis())
                .unwrap_or(u64::MAX),
        };
        self.longest.offer(duration, compilation);
        Ok(())
    }

    fn build(self) -> JitCompilations {
        JitCompilations {
            total_compilations: self.total,
            failed_compilations: self.failed,
            osr_compilations: self.osr,
            total_compile_time: self.total_time,
            longest_compilations: self.longest.into_sorted_vec(),
        }
    }
}
