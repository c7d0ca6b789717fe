//! Error types for building, rendering and parsing ACH files.

use thiserror::Error;

/// Result type alias for ACH operations
pub type Result<T> = std::result::Result<T, AchError>;

/// Errors that can occur while building, rendering or parsing an ACH file.
#[derive(Error, Debug)]
pub enum AchError {
    /// Failed to open or read the input file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV report writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Attribute name matches no field reachable from the component
    #[error("Unknown attribute '{name}' for {component}")]
    UnknownAttribute {
        name: String,
        component: &'static str,
    },

    /// A record was rendered while a field was still unset
    #[error("Required field '{field}' of {record} record is empty")]
    EmptyField {
        field: &'static str,
        record: &'static str,
    },

    /// Linked child created before any record of the linking association
    #[error("No {link} was found to attach a new {child}")]
    NoLink {
        link: &'static str,
        child: &'static str,
    },

    /// Association already bound to an owner was bound again
    #[error("Association {association} has already been assigned to {owner}")]
    DoubleAssignment {
        association: &'static str,
        owner: String,
    },

    /// Component has no association with the given name
    #[error("Unknown association '{name}' for {component}")]
    UnknownAssociation {
        name: String,
        component: &'static str,
    },

    /// No formatting rule is defined for the field
    #[error("No formatting rule defined for field '{0}'")]
    NoRule(String),

    /// Formatting rule string does not follow the rule grammar
    #[error("Invalid formatting rule '{rule}' for field '{field}': {reason}")]
    InvalidRule {
        field: String,
        rule: String,
        reason: &'static str,
    },

    /// Field expected to hold a number holds something else
    #[error("Field '{field}' holds non-numeric value '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    /// A computed total does not fit in a signed 64-bit integer
    #[error("Total of '{field}' overflows")]
    Overflow { field: &'static str },

    /// Raw line is wider than the record it is parsed into
    #[error("{record} line is {found} characters wide, expected at most {expected}")]
    LineLength {
        record: &'static str,
        expected: usize,
        found: usize,
    },

    /// Line tag is not a known record type (strict parsing only)
    #[error("Line {line}: unrecognized record type '{tag}'")]
    UnknownRecordType { line: usize, tag: char },

    /// Lines do not form a valid file/batch structure
    #[error("Line {line}: {message}")]
    Structure { line: usize, message: String },

    /// Missing input file argument
    #[error("Missing input file argument. Usage: ach-engine <input.ach> [--summary] [--strict]")]
    MissingArgument,
}
