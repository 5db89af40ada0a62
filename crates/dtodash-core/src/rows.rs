//! Display rows and summary statistics derived from a catalog snapshot.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};

use crate::catalog::CatalogRecord;

/// Whether analysis produced a description for the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtoResult {
    Success,
    Fail,
}

impl DtoResult {
    pub fn classify(record: &CatalogRecord) -> Self {
        if record.has_description() {
            Self::Success
        } else {
            Self::Fail
        }
    }

    /// Label shown in the inventory table.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "Ready",
            Self::Fail => "Pending",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRow {
    pub id: String,
    pub file_name: String,
    pub file_type: String,
    pub dto_result: DtoResult,
    pub ingested_at: Option<String>,
}

impl DisplayRow {
    pub fn from_record(record: &CatalogRecord) -> Self {
        Self {
            id: record.id.clone(),
            file_name: record.file_name.clone(),
            file_type: record.first_chunk_type().unwrap_or("unknown").to_string(),
            dto_result: DtoResult::classify(record),
            ingested_at: record.ingested_at.clone(),
        }
    }

    /// Milliseconds since the epoch; missing or unparseable timestamps count as 0.
    pub fn sort_key(&self) -> i64 {
        self.ingested_at
            .as_deref()
            .and_then(parse_ingested_at)
            .map(|t| t.timestamp_millis())
            .unwrap_or(0)
    }
}

/// Project records into rows, newest first.
///
/// The sort is stable, so records with equal (or missing) timestamps keep
/// their catalog order.
pub fn map_rows<'a>(records: impl IntoIterator<Item = &'a CatalogRecord>) -> Vec<DisplayRow> {
    let mut rows: Vec<DisplayRow> = records.into_iter().map(DisplayRow::from_record).collect();
    rows.sort_by_cached_key(|row| std::cmp::Reverse(row.sort_key()));
    rows
}

/// Parse a catalog timestamp.
///
/// Accepts RFC 3339, naive date-times (read as UTC) and bare dates.
pub fn parse_ingested_at(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(t.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

/// Render a catalog timestamp in local time, or echo it if it cannot be parsed.
pub fn format_ingested_at(raw: &str) -> String {
    match parse_ingested_at(raw) {
        Some(t) => t
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => raw.to_string(),
    }
}

/// Timestamp of the newest ingestion, if there is one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LatestIngested {
    At(String),
    NoDataYet,
}

impl LatestIngested {
    pub fn display(&self) -> String {
        match self {
            Self::At(raw) => format_ingested_at(raw),
            Self::NoDataYet => "Awaiting first run".to_string(),
        }
    }
}

/// Summary counts shown above the inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowStats {
    pub total: usize,
    pub success_count: usize,
    /// Whole percentage in `0..=100`.
    pub success_rate: u8,
    pub latest_ingested: LatestIngested,
}

impl RowStats {
    /// Compute stats over rows already sorted by [`map_rows`].
    pub fn from_rows(rows: &[DisplayRow]) -> Self {
        let total = rows.len();
        let success_count = rows
            .iter()
            .filter(|r| r.dto_result == DtoResult::Success)
            .count();
        let success_rate = if total == 0 {
            0
        } else {
            ((success_count as f64 / total as f64) * 100.0).round() as u8
        };
        let latest_ingested = rows
            .first()
            .and_then(|r| r.ingested_at.clone())
            .filter(|t| !t.trim().is_empty())
            .map(LatestIngested::At)
            .unwrap_or(LatestIngested::NoDataYet);

        Self {
            total,
            success_count,
            success_rate,
            latest_ingested,
        }
    }
}
