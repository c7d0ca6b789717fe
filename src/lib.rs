//! # ACH Engine
//!
//! Builds and parses NACHA ACH files: fixed-width 94-character records
//! arranged as a file header, batches of entries with their addenda, and a
//! file control, padded to blocks of 10 records.
//!
//! ## Design Principles
//!
//! - **Declarative layouts**: every record type is a static schema; every
//!   field is formatted by a named rule shared across record types
//! - **Derived totals**: hashes, counts and amounts in control records are
//!   computed from the tree each time it is rendered
//! - **Symmetric parsing**: the reader replays parsed lines through the
//!   builder API, so parsed files render back unchanged
//!
//! ## Example
//!
//! ```
//! use ach_engine::{AchFile, Attributes};
//!
//! let mut file = AchFile::new(
//!     Attributes::new()
//!         .with("company_id", "11-11111")
//!         .with("company_name", "MY COMPANY")
//!         .with("immediate_dest", "123123123")
//!         .with("immediate_dest_name", "COMMERCE BANK")
//!         .with("immediate_origin", "123123123")
//!         .with("immediate_origin_name", "MYCOMPANY")
//!         .with("origin_dfi_id", "12312312")
//!         .with("company_entry_descr", "PAYROLL"),
//! )
//! .unwrap();
//!
//! let batch = file.batch(Attributes::new().with("entry_class_code", "PPD")).unwrap();
//! batch
//!     .entry(
//!         Attributes::new()
//!             .with("transaction_code", 22)
//!             .with("routing_number", "123123123")
//!             .with("bank_account", "987654")
//!             .with("amount", 1599)
//!             .with("customer_name", "JOHN SMITH")
//!             .with("trace_num", "123123120000001"),
//!     )
//!     .unwrap();
//!
//! let text = file.to_ach_string().unwrap();
//! let parsed = ach_engine::parse(text.lines()).unwrap();
//! assert_eq!(parsed.to_ach_string().unwrap(), text);
//! ```

pub mod amount;
pub mod association;
pub mod batch;
pub mod component;
pub mod constants;
pub mod error;
pub mod file;
pub mod formatter;
pub mod reader;
pub mod record;
pub mod report;
pub mod schema;

pub use amount::Amount;
pub use association::{Association, AssociationSpec};
pub use batch::{Batch, BATCH};
pub use component::{Component, ComponentKind, Member, OwnerId, Route};
pub use constants::{RecordType, BLOCKING_FACTOR, RECORD_SIZE, TRANSMISSION_HEADER_SIZE};
pub use error::{AchError, Result};
pub use file::{AchFile, FILE};
pub use formatter::{FieldRule, FieldRuleRegistry, Justification, Transform};
pub use reader::Reader;
pub use record::{Attributes, FieldMap, FieldValue, Record, RecordSchema};
pub use report::{write_summary, BatchSummary};

use std::io::BufRead;

/// Parses ACH lines into a file tree.
pub fn parse<I, S>(lines: I) -> Result<AchFile>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Reader::new(lines).to_ach()
}

/// Reads and parses ACH text from a buffered reader.
pub fn parse_reader<R: BufRead>(reader: R) -> Result<AchFile> {
    let lines = reader.lines().collect::<std::io::Result<Vec<_>>>()?;
    parse(lines)
}
