//! CSV export of listed records.

use serde::Serialize;

use crate::api::models::records::{Record, RecordStatus};

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    sid: &'a str,
    date_created: String,
    from_number: &'a str,
    to_number: &'a str,
    status: Option<RecordStatus>,
    recording_sid: &'a str,
}

impl<'a> From<&'a Record> for CsvRow<'a> {
    fn from(record: &'a Record) -> Self {
        Self {
            sid: &record.id,
            date_created: record.created_at.to_rfc3339(),
            from_number: record.from.as_deref().unwrap_or_default(),
            to_number: record.to.as_deref().unwrap_or_default(),
            status: record.status,
            recording_sid: record.recording_reference.as_deref().unwrap_or_default(),
        }
    }
}

/// Header row plus one row per record, in the order given.
pub fn records_to_csv(records: &[Record]) -> anyhow::Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    if records.is_empty() {
        // serialize() only emits headers alongside the first row
        writer.write_record(["sid", "date_created", "from_number", "to_number", "status", "recording_sid"])?;
    }
    for record in records {
        writer.serialize(CsvRow::from(record))?;
    }

    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("failed to flush csv: {}", e.error()))
}
