//! Per-batch CSV summary of an ACH file.

use crate::amount::Amount;
use crate::batch::Batch;
use crate::error::Result;
use crate::file::AchFile;
use crate::record::Record;
use serde::Serialize;
use std::io::Write;

/// One summary row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub batch_number: i64,
    pub service_class_code: i64,
    pub company_name: String,
    pub entry_class_code: String,
    pub entries: usize,
    pub addenda: i64,
    pub total_debit: Amount,
    pub total_credit: Amount,
    pub entry_hash: i64,
}

fn text(record: &Record, field: &str) -> String {
    record
        .get(field)
        .map(|value| value.to_string())
        .unwrap_or_default()
}

impl BatchSummary {
    /// Summarizes a batch. Header values are taken from the header as it
    /// would be written, totals from the entries.
    pub fn from_batch(batch: &Batch) -> Result<Self> {
        let header = batch.header()?;
        let entries = batch.entries().len();
        Ok(BatchSummary {
            batch_number: header.number("batch_number")?,
            service_class_code: header.number("service_class_code")?,
            company_name: text(&header, "company_name"),
            entry_class_code: text(&header, "entry_class_code"),
            entries,
            addenda: batch.entry_addenda_count() - entries as i64,
            total_debit: Amount::from_cents(batch.total_debit_amount()?),
            total_credit: Amount::from_cents(batch.total_credit_amount()?),
            entry_hash: batch.entry_hash()?,
        })
    }
}

/// Summarizes every batch in file order.
pub fn summarize(file: &AchFile) -> Result<Vec<BatchSummary>> {
    file.batches().iter().map(BatchSummary::from_batch).collect()
}

/// Writes the summary as CSV with a header row.
pub fn write_summary<W: Write>(file: &AchFile, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in summarize(file)? {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}
