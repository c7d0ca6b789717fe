//! Fixed-width field formatting.
//!
//! Every field name maps to a rule string in [`RULES`]. A rule is made of:
//!
//! - *justification*: `<-` (left) or `->` (right)
//! - *width*: number of characters the field occupies
//! - *padding*: a trailing `-` pads right-justified fields with spaces
//!   instead of zeros; left-justified fields always pad with spaces
//! - *transformation*: optional `|upcase` or `|downcase`
//!
//! ```
//! use ach_engine::FieldRuleRegistry;
//!
//! let rules = FieldRuleRegistry::standard();
//! assert_eq!(rules.format("customer_name", &"LINUS TORVALDS".into()).unwrap(), "LINUS TORVALDS        ");
//! assert_eq!(rules.format("amount", &52.into()).unwrap(), "0000000052");
//! ```
//!
//! Values longer than the width keep the characters nearest the
//! justification edge: leading characters for left-justified fields,
//! trailing characters for right-justified ones.

use crate::error::{AchError, Result};
use crate::record::FieldValue;
use std::collections::HashMap;
use std::sync::{OnceLock, PoisonError, RwLock};

/// Rule table used by the standard registry.
pub const RULES: &[(&str, &str)] = &[
    ("customer_name", "<-22"),
    ("customer_acct", "<-15"),
    ("amount", "->10"),
    ("bank_2", "<-2"),
    ("transaction_type", "<-2"),
    ("bank_15", "<-15"),
    ("addenda", "<-1"),
    ("trace_num", "<-15"),
    ("transaction_code", "<-2"),
    ("record_type", "<-1"),
    ("bank_account", "<-17"),
    ("routing_number", "->9"),
    ("priority_code", "->2"),
    ("immediate_dest", "->10-"),
    ("immediate_origin", "->10-"),
    ("date", "<-6"),
    ("time", "<-4"),
    ("file_id_modifier", "<-1|upcase"),
    ("record_size", "->3"),
    ("blocking_factor", "->2"),
    ("format_code", "<-1"),
    ("immediate_dest_name", "<-23"),
    ("immediate_origin_name", "<-23"),
    ("reference_code", "<-8"),
    ("service_class_code", "<-3"),
    // aka individual name
    ("company_name", "<-16"),
    ("company_note_data", "<-20"),
    ("company_id", "<-10"),
    ("entry_class_code", "<-3"),
    ("company_entry_descr", "<-10"),
    ("effective_date", "<-6"),
    ("settlement_date", "<-3"),
    ("origin_status_code", "<-1"),
    ("origin_dfi_id", "<-8"),
    ("batch_number", "->7"),
    ("entry_addenda_count", "->6"),
    ("entry_hash", "->10"),
    ("total_debit_amount", "->12"),
    ("total_credit_amount", "->12"),
    ("authen_code", "<-19"),
    ("bank_6", "<-6"),
    ("batch_count", "->6"),
    ("block_count", "->6"),
    ("file_entry_addenda_count", "->8"),
    ("bank_39", "<-39"),
    ("nines", "<-94"),
    // company descriptive date
    ("desc_date", "<-6-"),
    // transmission header
    ("request_type", "<-9-"),
    ("remote_id", "<-8-"),
    ("blank", "<-1-"),
    ("batch_id_parameter", "<-4-"),
    ("starting_single_quote", "<-1"),
    ("file_type", "<-6-"),
    ("application_id", "->8"),
    ("ending_single_quote", "<-1"),
    // addenda
    ("addenda_type_code", "->2"),
    ("payment_related_info", "<-80"),
    ("addenda_sequence_num", "->4"),
    ("entry_details_sequence_num", "->7"),
];

/// Side of the field the value is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Justification {
    Left,
    Right,
}

/// String transformation applied before padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Upcase,
    Downcase,
}

impl Transform {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "upcase" => Some(Transform::Upcase),
            "downcase" => Some(Transform::Downcase),
            _ => None,
        }
    }

    fn apply(self, text: &str) -> String {
        match self {
            Transform::Upcase => text.to_uppercase(),
            Transform::Downcase => text.to_lowercase(),
        }
    }
}

/// A compiled formatting rule.
///
/// # Invariants
///
/// - `width > 0`
/// - [`FieldRule::apply`] always returns exactly `width` characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub justification: Justification,
    pub width: usize,
    pub pad: char,
    pub transform: Option<Transform>,
}

impl FieldRule {
    /// Compiles a rule string such as `"<-22"`, `"->10-"` or `"<-1|upcase"`.
    pub fn parse(field: &str, rule: &str) -> Result<Self> {
        let invalid = |reason: &'static str| AchError::InvalidRule {
            field: field.to_string(),
            rule: rule.to_string(),
            reason,
        };

        let (justification, rest) = if let Some(rest) = rule.strip_prefix("<-") {
            (Justification::Left, rest)
        } else if let Some(rest) = rule.strip_prefix("->") {
            (Justification::Right, rest)
        } else {
            return Err(invalid("justification must be '<-' or '->'"));
        };

        let (body, transform) = match rest.split_once('|') {
            Some((body, name)) => {
                let transform =
                    Transform::from_name(name).ok_or_else(|| invalid("unknown transformation"))?;
                (body, Some(transform))
            }
            None => (rest, None),
        };

        let (digits, space_padded) = match body.strip_suffix('-') {
            Some(digits) => (digits, true),
            None => (body, false),
        };

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("width must be a number"));
        }
        let width: usize = digits.parse().map_err(|_| invalid("width out of range"))?;
        if width == 0 {
            return Err(invalid("width must be positive"));
        }

        let pad = match justification {
            Justification::Left => ' ',
            Justification::Right if space_padded => ' ',
            Justification::Right => '0',
        };

        Ok(FieldRule {
            justification,
            width,
            pad,
            transform,
        })
    }

    /// Formats text to exactly `width` characters.
    pub fn apply(&self, text: &str) -> String {
        let text = match self.transform {
            Some(transform) => transform.apply(text),
            None => text.to_string(),
        };

        let len = text.chars().count();
        if len >= self.width {
            return match self.justification {
                Justification::Left => text.chars().take(self.width).collect(),
                Justification::Right => text.chars().skip(len - self.width).collect(),
            };
        }

        let padding: String = std::iter::repeat(self.pad).take(self.width - len).collect();
        match self.justification {
            Justification::Left => text + &padding,
            Justification::Right => padding + &text,
        }
    }

    /// Removes the padding [`FieldRule::apply`] would add.
    ///
    /// Zero padding is significant for numeric fields and is kept.
    pub fn strip<'a>(&self, raw: &'a str) -> &'a str {
        match (self.justification, self.pad) {
            (Justification::Left, ' ') => raw.trim_end_matches(' '),
            (Justification::Right, ' ') => raw.trim_start_matches(' '),
            _ => raw,
        }
    }
}

/// Rule table plus a memoized cache of compiled rules.
///
/// Compilation is lazy and guarded by a lock, so a registry can be shared
/// between threads. Compiling a field twice yields the same rule.
pub struct FieldRuleRegistry {
    table: HashMap<&'static str, &'static str>,
    compiled: RwLock<HashMap<&'static str, FieldRule>>,
}

impl FieldRuleRegistry {
    /// Creates a registry over a rule table.
    pub fn new(table: &[(&'static str, &'static str)]) -> Self {
        FieldRuleRegistry {
            table: table.iter().copied().collect(),
            compiled: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide registry built from [`RULES`].
    pub fn standard() -> &'static FieldRuleRegistry {
        static STANDARD: OnceLock<FieldRuleRegistry> = OnceLock::new();
        STANDARD.get_or_init(|| FieldRuleRegistry::new(RULES))
    }

    /// Returns the compiled rule for a field, compiling it on first use.
    pub fn compile(&self, field: &str) -> Result<FieldRule> {
        {
            let compiled = self.compiled.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(rule) = compiled.get(field) {
                return Ok(*rule);
            }
        }

        let (&name, &source) = self
            .table
            .get_key_value(field)
            .ok_or_else(|| AchError::NoRule(field.to_string()))?;
        let rule = FieldRule::parse(name, source)?;

        let mut compiled = self.compiled.write().unwrap_or_else(PoisonError::into_inner);
        Ok(*compiled.entry(name).or_insert(rule))
    }

    /// Formats a value with the rule of the given field.
    pub fn format(&self, field: &str, value: &FieldValue) -> Result<String> {
        Ok(self.compile(field)?.apply(&value.to_string()))
    }

    /// Returns `true` if the field's rule has already been compiled.
    pub fn is_compiled(&self, field: &str) -> bool {
        self.compiled
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(field)
    }
}
