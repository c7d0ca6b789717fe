//! ACH files: the root component owning batches.
//!
//! ```
//! use ach_engine::{AchFile, Attributes};
//!
//! let mut file = AchFile::new(Attributes::from([
//!     ("company_id", "11-11111"),
//!     ("company_name", "MY COMPANY"),
//!     ("immediate_dest", "123123123"),
//!     ("immediate_dest_name", "COMMERCE BANK"),
//!     ("immediate_origin", "123123123"),
//!     ("immediate_origin_name", "MYCOMPANY"),
//! ]))
//! .unwrap();
//!
//! file.batch(Attributes::new().with("entry_class_code", "WEB")).unwrap();
//! file.batch(Attributes::new().with("entry_class_code", "WEB")).unwrap();
//! assert_eq!(file.batch_at(1).unwrap().batch_number(), Some(2));
//! ```

use crate::association::AssociationSpec;
use crate::batch::{add_total, Batch, BATCH};
use crate::component::{Component, ComponentKind};
use crate::constants::{BLOCKING_FACTOR, LINE_SEPARATOR};
use crate::error::Result;
use crate::formatter::FieldRuleRegistry;
use crate::record::{Attributes, FieldMap, FieldValue, Record};
use crate::schema::{FILE_CONTROL, FILE_HEADER, NINES, TRANSMISSION_HEADER};
use log::debug;
use std::io::Write;
use std::ops::{Deref, DerefMut};

pub const BATCHES: &str = "batches";

pub static FILE: ComponentKind<Batch> = ComponentKind {
    name: "file",
    header: &FILE_HEADER,
    control: &FILE_CONTROL,
    associations: &[AssociationSpec {
        name: BATCHES,
        singular: "batch",
        member: &BATCH,
        linked_to: None,
        defaults: Some(batch_defaults),
    }],
    derive: derive_file_field,
};

/// Numbers batches 1, 2, 3... in creation order.
fn batch_defaults(file: &Component<Batch>) -> Result<FieldMap> {
    let next = file.members(BATCHES).len() as i64 + 1;
    Ok(FieldMap::from([("batch_number", FieldValue::Number(next))]))
}

/// Records in the file body: file header and control plus every batch's
/// header, control, entries and addenda.
fn record_count(file: &Component<Batch>) -> i64 {
    2 + file
        .members(BATCHES)
        .iter()
        .map(|batch| 2 + batch.entry_addenda_count())
        .sum::<i64>()
}

fn derive_file_field(file: &Component<Batch>, field: &str) -> Result<Option<FieldValue>> {
    let batches = file.members(BATCHES);
    let value = match field {
        "batch_count" => batches.len() as i64,
        "block_count" => {
            let blocking = BLOCKING_FACTOR as i64;
            (record_count(file) + blocking - 1) / blocking
        }
        "file_entry_addenda_count" => batches.iter().map(Batch::entry_addenda_count).sum(),
        "entry_hash" => sum(batches, Batch::entry_hash, "entry_hash")?,
        "total_debit_amount" => sum(batches, Batch::total_debit_amount, "total_debit_amount")?,
        "total_credit_amount" => {
            sum(batches, Batch::total_credit_amount, "total_credit_amount")?
        }
        _ => return Ok(None),
    };
    Ok(Some(FieldValue::Number(value)))
}

fn sum(batches: &[Batch], value: fn(&Batch) -> Result<i64>, field: &'static str) -> Result<i64> {
    batches
        .iter()
        .try_fold(0, |total, batch| add_total(total, value(batch)?, field))
}

/// A complete ACH file.
#[derive(Debug)]
pub struct AchFile {
    inner: Component<Batch>,
    transmission_header: Option<Record>,
}

impl AchFile {
    /// Creates a file. Attributes may name any field of the file records or
    /// of the batches, entries and addenda below it.
    pub fn new(attributes: Attributes) -> Result<Self> {
        Ok(AchFile {
            inner: Component::new(&FILE, attributes)?,
            transmission_header: None,
        })
    }

    /// Creates a file without attributes, e.g. to be filled by the parser.
    pub fn empty() -> Result<Self> {
        AchFile::new(Attributes::new())
    }

    /// Adds a batch inheriting the file's attributes, numbered after the
    /// existing batches.
    pub fn batch(&mut self, attributes: Attributes) -> Result<&mut Batch> {
        self.inner.create(BATCHES, attributes)
    }

    /// Adds a batch and fills it through `build` before it is appended.
    pub fn batch_with<F>(&mut self, attributes: Attributes, build: F) -> Result<&mut Batch>
    where
        F: FnOnce(&mut Batch) -> Result<()>,
    {
        self.inner.create_with(BATCHES, attributes, build)
    }

    pub fn batches(&self) -> &[Batch] {
        self.inner.members(BATCHES)
    }

    pub fn batch_at(&self, index: usize) -> Option<&Batch> {
        self.batches().get(index)
    }

    /// Adds a transmission header line in front of the file.
    pub fn set_transmission_header(&mut self, attributes: Attributes) -> Result<&mut Record> {
        let record = Record::new(&TRANSMISSION_HEADER, attributes)?;
        Ok(self.transmission_header.insert(record))
    }

    /// Parses and stores a transmission header line.
    pub fn build_transmission_header(&mut self, line: &str) -> Result<&mut Record> {
        let record = Record::from_line(&TRANSMISSION_HEADER, line)?;
        Ok(self.transmission_header.insert(record))
    }

    pub fn transmission_header(&self) -> Option<&Record> {
        self.transmission_header.as_ref()
    }

    /// Number of records excluding the transmission header and fillers.
    pub fn record_count(&self) -> i64 {
        record_count(&self.inner)
    }

    /// Renders every line with the standard rules.
    pub fn to_lines(&self) -> Result<Vec<String>> {
        self.to_lines_with(FieldRuleRegistry::standard())
    }

    /// Renders every line: optional transmission header, file header,
    /// batches, file control, then fillers up to a full block.
    pub fn to_lines_with(&self, rules: &FieldRuleRegistry) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        if let Some(header) = &self.transmission_header {
            lines.push(header.render_with(rules)?);
        }

        let body = self.inner.lines(rules)?;
        let fillers = (BLOCKING_FACTOR - body.len() % BLOCKING_FACTOR) % BLOCKING_FACTOR;
        lines.extend(body);

        if fillers > 0 {
            let filler = Record::from_values(&NINES, FieldMap::new()).render_with(rules)?;
            lines.extend(std::iter::repeat(filler).take(fillers));
        }

        debug!(
            "Rendered {} batches into {} lines ({} fillers)",
            self.batches().len(),
            lines.len(),
            fillers
        );
        Ok(lines)
    }

    /// The whole file as text, every line terminated by CRLF.
    pub fn to_ach_string(&self) -> Result<String> {
        let mut text = String::new();
        for line in self.to_lines()? {
            text.push_str(&line);
            text.push_str(LINE_SEPARATOR);
        }
        Ok(text)
    }

    /// Writes the file text. Nothing is written if rendering fails.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        let text = self.to_ach_string()?;
        writer.write_all(text.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

impl Deref for AchFile {
    type Target = Component<Batch>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for AchFile {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}
