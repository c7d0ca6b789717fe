//! Fixed-width records.
//!
//! A [`RecordSchema`] declares the ordered fields of a record type and their
//! defaults. A [`Record`] holds values for one line of that type and renders
//! itself through the [`FieldRuleRegistry`].

use crate::error::{AchError, Result};
use crate::formatter::FieldRuleRegistry;
use std::collections::BTreeMap;
use std::fmt;

/// Value held by a record field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Number(i64),
}

impl FieldValue {
    /// Numeric interpretation of the value.
    ///
    /// Text is trimmed and parsed as a signed integer; `None` if it is not one.
    pub fn as_number(&self) -> Option<i64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&String> for FieldValue {
    fn from(value: &String) -> Self {
        FieldValue::Text(value.clone())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Number(i64::from(value))
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Number(i64::from(value))
    }
}

/// Resolved field values keyed by their schema field name.
pub type FieldMap = BTreeMap<&'static str, FieldValue>;

/// Caller-supplied attributes, validated against a schema when applied.
///
/// ```
/// use ach_engine::Attributes;
///
/// let attrs = Attributes::new()
///     .with("customer_name", "JOHN SMITH")
///     .with("amount", 1599);
/// assert_eq!(attrs.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(Vec<(String, FieldValue)>);

impl Attributes {
    pub fn new() -> Self {
        Attributes(Vec::new())
    }

    /// Adds an attribute, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Adds an attribute. Later values for the same name win.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.push((name.into(), value.into()));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Validates every name with `lookup`, failing on the first unknown one.
    pub(crate) fn resolve<F>(self, owner: &'static str, lookup: F) -> Result<FieldMap>
    where
        F: Fn(&str) -> Option<&'static str>,
    {
        self.0
            .into_iter()
            .map(|(name, value)| match lookup(&name) {
                Some(field) => Ok((field, value)),
                None => Err(AchError::UnknownAttribute {
                    name,
                    component: owner,
                }),
            })
            .collect()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Attributes(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<FieldValue>, const N: usize> From<[(K, V); N]> for Attributes {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// Default for a field that was not supplied explicitly.
#[derive(Debug, Clone, Copy)]
pub enum FieldDefault {
    Text(&'static str),
    Number(i64),
    /// Computed value such as the current date. Components evaluate it once
    /// when they are created; a bare record evaluates it on construction.
    Generated(fn() -> FieldValue),
}

impl FieldDefault {
    fn value(&self) -> FieldValue {
        match self {
            FieldDefault::Text(text) => FieldValue::from(*text),
            FieldDefault::Number(n) => FieldValue::Number(*n),
            FieldDefault::Generated(generate) => generate(),
        }
    }
}

/// Declaration of a record type: its name, ordered fields and defaults.
#[derive(Debug)]
pub struct RecordSchema {
    pub name: &'static str,
    pub fields: &'static [&'static str],
    pub defaults: &'static [(&'static str, FieldDefault)],
}

impl RecordSchema {
    /// Returns the schema's own spelling of `name` if it is one of its fields.
    pub fn field(&self, name: &str) -> Option<&'static str> {
        self.fields.iter().copied().find(|field| *field == name)
    }

    /// Total line width of the record under the given rules.
    pub fn width(&self, rules: &FieldRuleRegistry) -> Result<usize> {
        self.fields
            .iter()
            .map(|field| rules.compile(field).map(|rule| rule.width))
            .sum()
    }
}

/// One fixed-width line of a given record type.
///
/// Partially-filled records are valid; missing fields are only reported when
/// the record is rendered.
#[derive(Clone)]
pub struct Record {
    schema: &'static RecordSchema,
    values: FieldMap,
}

impl Record {
    /// Creates a record from attributes merged over the schema defaults.
    pub fn new(schema: &'static RecordSchema, attributes: Attributes) -> Result<Self> {
        let values = attributes.resolve(schema.name, |name| schema.field(name))?;
        Ok(Record::from_values(schema, values))
    }

    /// Creates a record from already-resolved values merged over defaults.
    pub(crate) fn from_values(schema: &'static RecordSchema, mut values: FieldMap) -> Self {
        for &(field, default) in schema.defaults {
            if schema.field(field).is_some() && !values.contains_key(field) {
                values.insert(field, default.value());
            }
        }
        Record { schema, values }
    }

    /// Parses a raw line using the standard rules.
    pub fn from_line(schema: &'static RecordSchema, line: &str) -> Result<Self> {
        Record::from_line_with(schema, line, FieldRuleRegistry::standard())
    }

    /// Parses a raw line, slicing it by the compiled width of each field.
    ///
    /// Space padding is stripped; short lines are read as if space-padded.
    pub fn from_line_with(
        schema: &'static RecordSchema,
        line: &str,
        rules: &FieldRuleRegistry,
    ) -> Result<Self> {
        let expected = schema.width(rules)?;
        let chars: Vec<char> = line.chars().collect();
        if chars.len() > expected {
            return Err(AchError::LineLength {
                record: schema.name,
                expected,
                found: chars.len(),
            });
        }

        let mut values = FieldMap::new();
        let mut offset = 0;
        for field in schema.fields {
            let rule = rules.compile(field)?;
            let end = (offset + rule.width).min(chars.len());
            let start = offset.min(end);
            let mut raw: String = chars[start..end].iter().collect();
            raw.extend(std::iter::repeat(' ').take(rule.width - (end - start)));
            values.insert(*field, FieldValue::from(rule.strip(&raw)));
            offset += rule.width;
        }

        Ok(Record { schema, values })
    }

    pub fn schema(&self) -> &'static RecordSchema {
        self.schema
    }

    /// Record type name, e.g. `"entry"`.
    pub fn name(&self) -> &'static str {
        self.schema.name
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    /// Sets a field value. Fails if the schema has no such field.
    pub fn set(&mut self, field: &str, value: impl Into<FieldValue>) -> Result<()> {
        let name = self
            .schema
            .field(field)
            .ok_or_else(|| AchError::UnknownAttribute {
                name: field.to_string(),
                component: self.schema.name,
            })?;
        self.values.insert(name, value.into());
        Ok(())
    }

    /// Numeric value of a field; fails if it is unset or not a number.
    pub fn number(&self, field: &'static str) -> Result<i64> {
        let value = self.values.get(field).ok_or(AchError::EmptyField {
            field,
            record: self.schema.name,
        })?;
        value.as_number().ok_or_else(|| AchError::InvalidNumber {
            field,
            value: value.to_string(),
        })
    }

    /// Renders the record with the standard rules.
    pub fn render(&self) -> Result<String> {
        self.render_with(FieldRuleRegistry::standard())
    }

    /// Renders every field in schema order and concatenates them.
    ///
    /// Fails on the first unset field; no partial output is returned.
    pub fn render_with(&self, rules: &FieldRuleRegistry) -> Result<String> {
        let mut line = String::new();
        for &field in self.schema.fields {
            let value = self.values.get(field).ok_or(AchError::EmptyField {
                field,
                record: self.schema.name,
            })?;
            line.push_str(&rules.format(field, value)?);
        }
        Ok(line)
    }

    /// Each field formatted to its width, `None` where unset.
    fn formatted_fields(&self) -> Vec<Option<String>> {
        let rules = FieldRuleRegistry::standard();
        self.schema
            .fields
            .iter()
            .map(|field| {
                self.values
                    .get(field)
                    .and_then(|value| rules.format(field, value).ok())
            })
            .collect()
    }
}

/// Two records are equal when they have the same type and every field
/// formats to the same text.
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.schema.name == other.schema.name && self.formatted_fields() == other.formatted_fields()
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("schema", &self.schema.name)
            .field("values", &self.values)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static TEST_RECORD: RecordSchema = RecordSchema {
        name: "test",
        fields: &["customer_name", "amount"],
        defaults: &[("customer_name", FieldDefault::Text("JOHN SMITH"))],
    };

    #[test]
    fn test_fields_are_ordered() {
        assert_eq!(TEST_RECORD.fields, &["customer_name", "amount"]);
    }

    #[test]
    fn test_default_value() {
        let record = Record::new(&TEST_RECORD, Attributes::new()).unwrap();
        assert_eq!(record.get("customer_name"), Some(&"JOHN SMITH".into()));
    }

    #[test]
    fn test_overwrite_default_value() {
        let record = Record::new(
            &TEST_RECORD,
            Attributes::from([("customer_name", "SMITH JOHN")]),
        )
        .unwrap();
        assert_eq!(record.get("customer_name"), Some(&"SMITH JOHN".into()));
    }

    #[test]
    fn test_render_formatted_string() {
        let record = Record::new(&TEST_RECORD, Attributes::new().with("amount", 1599)).unwrap();
        let expected = format!("{:<22}{:0>10}", "JOHN SMITH", "1599");
        assert_eq!(record.render().unwrap(), expected);
    }

    #[test]
    fn test_render_fails_on_empty_field() {
        let record = Record::new(&TEST_RECORD, Attributes::new()).unwrap();
        let err = record.render().unwrap_err();
        assert!(matches!(
            err,
            AchError::EmptyField {
                field: "amount",
                record: "test"
            }
        ));
    }

    #[test]
    fn test_unknown_attribute_rejected() {
        let result = Record::new(&TEST_RECORD, Attributes::new().with("foo", "bar"));
        assert!(matches!(result, Err(AchError::UnknownAttribute { name, .. }) if name == "foo"));

        let mut record = Record::new(&TEST_RECORD, Attributes::new()).unwrap();
        assert!(record.set("foo", "bar").is_err());
        assert!(record.set("amount", 10).is_ok());
    }

    #[test]
    fn test_from_line_strips_padding() {
        let line = format!("{:<22}{:0>10}", "JANE DOE", "250");
        let record = Record::from_line(&TEST_RECORD, &line).unwrap();
        assert_eq!(record.get("customer_name"), Some(&"JANE DOE".into()));
        assert_eq!(record.get("amount"), Some(&"0000000250".into()));
        assert_eq!(record.number("amount").unwrap(), 250);
        assert_eq!(record.render().unwrap(), line);
    }

    #[test]
    fn test_from_line_short_and_long_lines() {
        let record = Record::from_line(&TEST_RECORD, "JANE").unwrap();
        assert_eq!(record.get("customer_name"), Some(&"JANE".into()));
        assert!(record.number("amount").is_err());

        let too_long = "X".repeat(33);
        assert!(matches!(
            Record::from_line(&TEST_RECORD, &too_long),
            Err(AchError::LineLength {
                expected: 32,
                found: 33,
                ..
            })
        ));
    }

    #[test]
    fn test_number_errors() {
        let record = Record::new(&TEST_RECORD, Attributes::new().with("amount", "12a")).unwrap();
        assert!(matches!(
            record.number("amount"),
            Err(AchError::InvalidNumber { field: "amount", .. })
        ));
    }

    #[test]
    fn test_records_compare_by_formatted_fields() {
        let built = Record::new(&TEST_RECORD, Attributes::new().with("amount", 1599)).unwrap();
        let parsed = Record::from_line(&TEST_RECORD, &built.render().unwrap()).unwrap();
        assert_eq!(built, parsed);

        let other = Record::new(&TEST_RECORD, Attributes::new().with("amount", 1600)).unwrap();
        assert_ne!(built, other);
    }
}
