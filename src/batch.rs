//! Batches: a header/control pair around entries and their addenda.
//!
//! Control fields are derived from the current entries every time the
//! header or control is built, so they never go stale after a mutation.
//! Attributes set explicitly on the batch always win over derived values.

use crate::association::AssociationSpec;
use crate::component::{Component, ComponentKind, Member};
use crate::error::{AchError, Result};
use crate::formatter::FieldRuleRegistry;
use crate::record::{Attributes, FieldMap, FieldValue, Record};
use crate::schema::{ADDENDA, BATCH_CONTROL, BATCH_HEADER, ENTRY};
use std::ops::{Deref, DerefMut};

pub const ENTRIES: &str = "entries";
pub const ADDENDAS: &str = "addendas";

/// Service class code of a batch with both debits and credits.
pub const MIXED_SERVICE_CLASS: i64 = 200;
/// Service class code of a credit-only batch.
pub const CREDIT_SERVICE_CLASS: i64 = 220;
/// Service class code of a debit-only batch.
pub const DEBIT_SERVICE_CLASS: i64 = 225;

pub static BATCH: ComponentKind<Record> = ComponentKind {
    name: "batch",
    header: &BATCH_HEADER,
    control: &BATCH_CONTROL,
    associations: &[
        AssociationSpec {
            name: ENTRIES,
            singular: "entry",
            member: &ENTRY,
            linked_to: None,
            defaults: None,
        },
        AssociationSpec {
            name: ADDENDAS,
            singular: "addenda",
            member: &ADDENDA,
            linked_to: Some(ENTRIES),
            defaults: Some(addenda_defaults),
        },
    ],
    derive: derive_batch_field,
};

/// Numbers a new addenda within its entry and copies the entry's sequence
/// number (the last 7 characters of its trace number).
fn addenda_defaults(batch: &Component<Record>) -> Result<FieldMap> {
    let mut values = FieldMap::new();
    let entries = batch.members(ENTRIES);
    let Some(index) = entries.len().checked_sub(1) else {
        return Ok(values);
    };

    let attached = batch.association(ADDENDAS)?.attached_to(index).len();
    values.insert("addenda_sequence_num", FieldValue::from(attached as i64 + 1));

    if let Some(trace) = entries[index].get("trace_num") {
        let trace = trace.to_string();
        let trace = trace.trim();
        let tail: String = trace
            .chars()
            .skip(trace.chars().count().saturating_sub(7))
            .collect();
        values.insert("entry_details_sequence_num", FieldValue::from(tail));
    }
    Ok(values)
}

fn derive_batch_field(batch: &Component<Record>, field: &str) -> Result<Option<FieldValue>> {
    let entries = batch.members(ENTRIES);
    let value = match field {
        "service_class_code" => service_class_code(entries),
        "entry_addenda_count" => entries.len() as i64 + addenda_count(batch),
        "entry_hash" => entry_hash(entries)?,
        "total_debit_amount" => total_amount(entries, is_debit)?,
        "total_credit_amount" => total_amount(entries, is_credit)?,
        _ => return Ok(None),
    };
    Ok(Some(FieldValue::Number(value)))
}

fn addenda_count(batch: &Component<Record>) -> i64 {
    batch.association(ADDENDAS).map_or(0, |a| a.len() as i64)
}

/// Last digit of the transaction code, which tells debits from credits.
fn transaction_kind(entry: &Record) -> Option<i64> {
    entry
        .get("transaction_code")
        .and_then(FieldValue::as_number)
        .map(|code| code % 10)
}

/// Returns `true` for credit transaction codes (22, 23, 24, 32, ...).
pub fn is_credit(entry: &Record) -> bool {
    matches!(transaction_kind(entry), Some(2..=4))
}

/// Returns `true` for debit transaction codes (27, 28, 29, 37, ...).
pub fn is_debit(entry: &Record) -> bool {
    matches!(transaction_kind(entry), Some(7..=9))
}

/// Adds to a running total, failing instead of wrapping.
pub(crate) fn add_total(total: i64, value: i64, field: &'static str) -> Result<i64> {
    total
        .checked_add(value)
        .ok_or(AchError::Overflow { field })
}

/// Sum of `routing_number / 10` over all entries; zero for no entries.
pub fn entry_hash(entries: &[Record]) -> Result<i64> {
    entries.iter().try_fold(0, |hash, entry| {
        add_total(hash, entry.number("routing_number")? / 10, "entry_hash")
    })
}

fn total_amount(entries: &[Record], include: fn(&Record) -> bool) -> Result<i64> {
    entries
        .iter()
        .filter(|entry| include(entry))
        .try_fold(0, |total, entry| {
            add_total(total, entry.number("amount")?, "amount")
        })
}

fn service_class_code(entries: &[Record]) -> i64 {
    let debit = entries.iter().any(is_debit);
    let credit = entries.iter().any(is_credit);
    match (debit, credit) {
        (true, true) => MIXED_SERVICE_CLASS,
        (true, false) => DEBIT_SERVICE_CLASS,
        _ => CREDIT_SERVICE_CLASS,
    }
}

/// A batch of entries with their addenda.
#[derive(Debug)]
pub struct Batch(Component<Record>);

impl Batch {
    /// Creates a standalone batch.
    pub fn new(attributes: Attributes) -> Result<Self> {
        Ok(Batch(Component::new(&BATCH, attributes)?))
    }

    /// Adds an entry.
    pub fn entry(&mut self, attributes: Attributes) -> Result<&mut Record> {
        self.0.create(ENTRIES, attributes)
    }

    /// Adds an entry, running `configure` on it before it is appended.
    pub fn entry_with<F>(&mut self, attributes: Attributes, configure: F) -> Result<&mut Record>
    where
        F: FnOnce(&mut Record) -> Result<()>,
    {
        self.0.create_with(ENTRIES, attributes, configure)
    }

    /// Adds an addenda attached to the most recent entry.
    ///
    /// Fails with `NoLink` if the batch has no entry yet.
    pub fn addenda(&mut self, attributes: Attributes) -> Result<&mut Record> {
        self.0.create(ADDENDAS, attributes)
    }

    /// Parses an entry line and appends it.
    pub fn build_entry(&mut self, line: &str) -> Result<&mut Record> {
        self.0.build_member(ENTRIES, line)
    }

    /// Parses an addenda line and attaches it to the most recent entry.
    pub fn build_addenda(&mut self, line: &str) -> Result<&mut Record> {
        self.0.build_member(ADDENDAS, line)
    }

    pub fn entries(&self) -> &[Record] {
        self.0.members(ENTRIES)
    }

    /// Addenda attached to the entry at `index`.
    pub fn addendas_for(&self, index: usize) -> &[Record] {
        self.0
            .association(ADDENDAS)
            .map_or(&[][..], |a| a.attached_to(index))
    }

    pub fn has_debit(&self) -> bool {
        self.entries().iter().any(is_debit)
    }

    pub fn has_credit(&self) -> bool {
        self.entries().iter().any(is_credit)
    }

    pub fn entry_addenda_count(&self) -> i64 {
        self.entries().len() as i64 + addenda_count(&self.0)
    }

    pub fn entry_hash(&self) -> Result<i64> {
        entry_hash(self.entries())
    }

    pub fn total_debit_amount(&self) -> Result<i64> {
        total_amount(self.entries(), is_debit)
    }

    pub fn total_credit_amount(&self) -> Result<i64> {
        total_amount(self.entries(), is_credit)
    }

    /// Numeric header value as it will be written: the stored header's if
    /// one was parsed or set, otherwise the batch attribute.
    fn header_number(&self, field: &str) -> Option<i64> {
        self.0
            .stored_header()
            .and_then(|header| header.get(field))
            .or_else(|| self.0.get(field))
            .and_then(FieldValue::as_number)
    }

    /// Service class code of the header: stored or explicit if any,
    /// otherwise the one implied by the entries.
    pub fn service_class_code(&self) -> i64 {
        self.header_number("service_class_code")
            .unwrap_or_else(|| service_class_code(self.entries()))
    }

    pub fn batch_number(&self) -> Option<i64> {
        self.header_number("batch_number")
    }

    /// Header, entries each followed by their addenda, control.
    pub fn to_lines(&self) -> Result<Vec<String>> {
        self.0.lines(FieldRuleRegistry::standard())
    }
}

impl Deref for Batch {
    type Target = Component<Record>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Batch {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Member for Batch {
    type Schema = &'static ComponentKind<Record>;

    fn field_name(schema: Self::Schema, name: &str) -> Option<&'static str> {
        schema.field_name(name)
    }

    fn assemble(schema: Self::Schema, values: FieldMap) -> Result<Self> {
        Ok(Batch(Component::from_values(schema, values)?))
    }

    fn lines(&self, rules: &FieldRuleRegistry) -> Result<Vec<String>> {
        self.0.lines(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch() -> Batch {
        Batch::new(
            Attributes::new()
                .with("company_name", "MY COMPANY")
                .with("company_id", "11-11111")
                .with("entry_class_code", "PPD")
                .with("company_entry_descr", "PAYROLL")
                .with("effective_date", "240105")
                .with("origin_dfi_id", "12312312")
                .with("batch_number", 1),
        )
        .unwrap()
    }

    fn entry(code: i64, routing: &str, amount: i64) -> Attributes {
        Attributes::new()
            .with("transaction_code", code)
            .with("routing_number", routing)
            .with("bank_account", "1234567")
            .with("amount", amount)
            .with("customer_name", "JOHN SMITH")
            .with("trace_num", "123123120000001")
    }

    #[test]
    fn test_entry_hash() {
        let mut b = batch();
        b.entry(entry(22, "123123123", 100)).unwrap();
        b.entry(entry(27, "987654321", 200)).unwrap();
        assert_eq!(b.entry_hash().unwrap(), 12312312 + 98765432);
    }

    #[test]
    fn test_entry_hash_empty_is_zero() {
        assert_eq!(batch().entry_hash().unwrap(), 0);
    }

    #[test]
    fn test_entry_hash_requires_routing_number() {
        let mut b = batch();
        b.entry(Attributes::new().with("amount", 5)).unwrap();
        assert!(matches!(
            b.entry_hash(),
            Err(AchError::EmptyField {
                field: "routing_number",
                ..
            })
        ));
    }

    #[test]
    fn test_totals() {
        let mut b = batch();
        b.entry(entry(22, "123123123", 100)).unwrap();
        b.entry(entry(32, "123123123", 50)).unwrap();
        b.entry(entry(27, "123123123", 75)).unwrap();
        assert_eq!(b.total_credit_amount().unwrap(), 150);
        assert_eq!(b.total_debit_amount().unwrap(), 75);
    }

    #[test]
    fn test_total_overflow_is_an_error() {
        let mut b = batch();
        b.entry(entry(22, "123123123", i64::MAX)).unwrap();
        b.entry(entry(22, "123123123", i64::MAX)).unwrap();
        assert!(matches!(
            b.total_credit_amount(),
            Err(AchError::Overflow { .. })
        ));
        assert!(matches!(b.to_lines(), Err(AchError::Overflow { .. })));
    }

    #[test]
    fn test_stored_header_drives_accessors() {
        let mut b = batch();
        b.entry(entry(27, "123123123", 1)).unwrap();
        b.set_header(
            Attributes::new()
                .with("service_class_code", 200)
                .with("batch_number", 7),
        )
        .unwrap();

        assert_eq!(b.service_class_code(), 200);
        assert_eq!(b.batch_number(), Some(7));
        assert_eq!(b.get("batch_number"), Some(&FieldValue::Number(1)));
    }

    #[test]
    fn test_service_class_code_defaulting() {
        let mut debit_only = batch();
        debit_only.entry(entry(27, "123123123", 1)).unwrap();
        assert_eq!(debit_only.service_class_code(), 225);

        let mut credit_only = batch();
        credit_only.entry(entry(22, "123123123", 1)).unwrap();
        assert_eq!(credit_only.service_class_code(), 220);

        let mut mixed = batch();
        mixed.entry(entry(22, "123123123", 1)).unwrap();
        mixed.entry(entry(27, "123123123", 1)).unwrap();
        assert_eq!(mixed.service_class_code(), 200);

        let header = mixed.header().unwrap();
        assert_eq!(header.get("service_class_code"), Some(&FieldValue::Number(200)));
    }

    #[test]
    fn test_explicit_service_class_code_wins() {
        let mut b = batch();
        b.set("service_class_code", 220).unwrap();
        b.entry(entry(27, "123123123", 1)).unwrap();
        assert_eq!(b.service_class_code(), 220);
        assert_eq!(
            b.control().unwrap().get("service_class_code"),
            Some(&FieldValue::Number(220))
        );
    }

    #[test]
    fn test_addenda_needs_entry() {
        let mut b = batch();
        let err = b.addenda(Attributes::new()).unwrap_err();
        assert!(matches!(
            err,
            AchError::NoLink {
                link: "entry",
                child: "addenda"
            }
        ));
        assert_eq!(err.to_string(), "No entry was found to attach a new addenda");
    }

    #[test]
    fn test_addenda_attach_to_latest_entry() {
        let mut b = batch();
        b.entry(entry(22, "123123123", 100)).unwrap();
        b.addenda(Attributes::new().with("payment_related_info", "FOO"))
            .unwrap();
        b.entry(entry(22, "123123123", 200)).unwrap();
        b.addenda(Attributes::new().with("payment_related_info", "BAR"))
            .unwrap();
        b.addenda(Attributes::new().with("payment_related_info", "BAZ"))
            .unwrap();

        assert_eq!(b.addendas_for(0).len(), 1);
        assert_eq!(b.addendas_for(1).len(), 2);
        assert_eq!(
            b.addendas_for(1)[1].get("payment_related_info"),
            Some(&"BAZ".into())
        );
        assert_eq!(b.entry_addenda_count(), 5);
    }

    #[test]
    fn test_addenda_sequence_defaults() {
        let mut b = batch();
        b.entry(entry(22, "123123123", 100)).unwrap();
        b.addenda(Attributes::new()).unwrap();
        let second = b.addenda(Attributes::new()).unwrap();
        assert_eq!(second.get("addenda_sequence_num"), Some(&FieldValue::Number(2)));
        assert_eq!(
            second.get("entry_details_sequence_num"),
            Some(&"0000001".into())
        );
    }

    #[test]
    fn test_unknown_entry_attribute() {
        let mut b = batch();
        let result = b.entry(Attributes::new().with("company_note_data", "x"));
        assert!(matches!(
            result,
            Err(AchError::UnknownAttribute {
                component: "entry",
                ..
            })
        ));
        assert!(b.entries().is_empty());
    }

    #[test]
    fn test_configurator_runs_before_append() {
        let mut b = batch();
        let result = b.entry_with(entry(22, "123123123", 1), |e| {
            e.set("no_such_field", 1)
        });
        assert!(result.is_err());
        assert!(b.entries().is_empty());

        b.entry_with(entry(22, "123123123", 1), |e| e.set("addenda", 1))
            .unwrap();
        assert_eq!(b.entries()[0].get("addenda"), Some(&FieldValue::Number(1)));
    }

    #[test]
    fn test_lines_order_and_width() {
        let mut b = batch();
        b.entry(entry(22, "123123123", 100)).unwrap();
        b.addenda(Attributes::new().with("payment_related_info", "FIRST"))
            .unwrap();
        b.entry(entry(27, "987654321", 40)).unwrap();

        let lines = b.to_lines().unwrap();
        let tags: String = lines.iter().filter_map(|l| l.chars().next()).collect();
        assert_eq!(tags, "56768");
        assert!(lines.iter().all(|l| l.len() == crate::RECORD_SIZE));

        let control = &lines[4];
        assert_eq!(&control[1..4], "200");
        assert_eq!(&control[4..10], "000003");
        assert_eq!(&control[10..20], "0111077744");
        assert_eq!(&control[20..32], "000000000040");
        assert_eq!(&control[32..44], "000000000100");
    }

    #[test]
    fn test_render_fails_with_missing_fields() {
        let mut b = Batch::new(Attributes::new()).unwrap();
        b.entry(entry(22, "123123123", 1)).unwrap();
        assert!(matches!(
            b.to_lines(),
            Err(AchError::EmptyField {
                record: "batch header",
                ..
            })
        ));
    }
}
