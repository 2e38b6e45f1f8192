use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RunStatus {
    Success,
    Partial,
    Failed,
    /// Another run held the guard; nothing was processed.
    Skipped,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RunTrigger {
    Scheduled,
    Manual,
}

/// Audit entry for a reconciliation run. Written once, never updated.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct ProcessorLog {
    pub id: u64,
    pub batch_id: String,
    pub run_time: NaiveDateTime,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    #[sqlx(try_from = "String")]
    pub run_trigger: RunTrigger,
    #[sqlx(try_from = "String")]
    pub status: RunStatus,
    pub total_processed: u32,
    pub error_count: u32,
    pub errors: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct NewProcessorLog {
    pub batch_id: String,
    pub run_time: NaiveDateTime,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub run_trigger: RunTrigger,
    pub status: RunStatus,
    pub total_processed: u32,
    pub error_count: u32,
    pub errors: Vec<String>,
}
