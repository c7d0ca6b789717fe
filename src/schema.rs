//! Record layouts of an ACH file.
//!
//! Field widths come from the rules in [`crate::formatter::RULES`]; every
//! layout here adds up to [`RECORD_SIZE`](crate::RECORD_SIZE) characters,
//! except the transmission header.

use crate::record::{FieldDefault, FieldValue, RecordSchema};
use chrono::Local;

fn today() -> FieldValue {
    FieldValue::Text(Local::now().format("%y%m%d").to_string())
}

fn current_time() -> FieldValue {
    FieldValue::Text(Local::now().format("%H%M").to_string())
}

fn nines() -> FieldValue {
    FieldValue::Text("9".repeat(crate::constants::RECORD_SIZE))
}

/// Starts every file.
pub static FILE_HEADER: RecordSchema = RecordSchema {
    name: "file header",
    fields: &[
        "record_type",
        "priority_code",
        "immediate_dest",
        "immediate_origin",
        "date",
        "time",
        "file_id_modifier",
        "record_size",
        "blocking_factor",
        "format_code",
        "immediate_dest_name",
        "immediate_origin_name",
        "reference_code",
    ],
    defaults: &[
        ("record_type", FieldDefault::Number(1)),
        ("priority_code", FieldDefault::Number(1)),
        ("date", FieldDefault::Generated(today)),
        ("time", FieldDefault::Generated(current_time)),
        ("file_id_modifier", FieldDefault::Text("A")),
        ("record_size", FieldDefault::Number(94)),
        ("blocking_factor", FieldDefault::Number(10)),
        ("format_code", FieldDefault::Number(1)),
        ("reference_code", FieldDefault::Text("")),
    ],
};

/// Ends every file with file-wide totals.
pub static FILE_CONTROL: RecordSchema = RecordSchema {
    name: "file control",
    fields: &[
        "record_type",
        "batch_count",
        "block_count",
        "file_entry_addenda_count",
        "entry_hash",
        "total_debit_amount",
        "total_credit_amount",
        "bank_39",
    ],
    defaults: &[
        ("record_type", FieldDefault::Number(9)),
        ("bank_39", FieldDefault::Text("")),
    ],
};

/// Starts every batch.
pub static BATCH_HEADER: RecordSchema = RecordSchema {
    name: "batch header",
    fields: &[
        "record_type",
        "service_class_code",
        "company_name",
        "company_note_data",
        "company_id",
        "entry_class_code",
        "company_entry_descr",
        "desc_date",
        "effective_date",
        "settlement_date",
        "origin_status_code",
        "origin_dfi_id",
        "batch_number",
    ],
    defaults: &[
        ("record_type", FieldDefault::Number(5)),
        ("service_class_code", FieldDefault::Number(200)),
        ("company_note_data", FieldDefault::Text("")),
        ("desc_date", FieldDefault::Text("")),
        ("effective_date", FieldDefault::Generated(today)),
        ("settlement_date", FieldDefault::Text("")),
        ("origin_status_code", FieldDefault::Text("")),
    ],
};

/// Ends every batch with batch totals.
pub static BATCH_CONTROL: RecordSchema = RecordSchema {
    name: "batch control",
    fields: &[
        "record_type",
        "service_class_code",
        "entry_addenda_count",
        "entry_hash",
        "total_debit_amount",
        "total_credit_amount",
        "company_id",
        "authen_code",
        "bank_6",
        "origin_dfi_id",
        "batch_number",
    ],
    defaults: &[
        ("record_type", FieldDefault::Number(8)),
        ("authen_code", FieldDefault::Text("")),
        ("bank_6", FieldDefault::Text("")),
    ],
};

/// A single payment instruction.
pub static ENTRY: RecordSchema = RecordSchema {
    name: "entry",
    fields: &[
        "record_type",
        "transaction_code",
        "routing_number",
        "bank_account",
        "amount",
        "customer_acct",
        "customer_name",
        "transaction_type",
        "addenda",
        "trace_num",
    ],
    defaults: &[
        ("record_type", FieldDefault::Number(6)),
        ("customer_acct", FieldDefault::Text("")),
        ("transaction_type", FieldDefault::Text("")),
        ("addenda", FieldDefault::Number(0)),
    ],
};

/// Free-form payment information attached to the preceding entry.
pub static ADDENDA: RecordSchema = RecordSchema {
    name: "addenda",
    fields: &[
        "record_type",
        "addenda_type_code",
        "payment_related_info",
        "addenda_sequence_num",
        "entry_details_sequence_num",
    ],
    defaults: &[
        ("record_type", FieldDefault::Number(7)),
        ("addenda_type_code", FieldDefault::Number(5)),
        ("payment_related_info", FieldDefault::Text("")),
    ],
};

/// Optional 38-character line some banks expect before the file header.
pub static TRANSMISSION_HEADER: RecordSchema = RecordSchema {
    name: "transmission header",
    fields: &[
        "request_type",
        "remote_id",
        "blank",
        "batch_id_parameter",
        "starting_single_quote",
        "file_type",
        "application_id",
        "ending_single_quote",
    ],
    defaults: &[
        ("request_type", FieldDefault::Text("$$ADD ID=")),
        ("blank", FieldDefault::Text("")),
        ("batch_id_parameter", FieldDefault::Text("BID=")),
        ("starting_single_quote", FieldDefault::Text("'")),
        ("file_type", FieldDefault::Text("NWFACH")),
        ("ending_single_quote", FieldDefault::Text("'")),
    ],
};

/// Block filler written after the file control.
pub static NINES: RecordSchema = RecordSchema {
    name: "filler",
    fields: &["nines"],
    defaults: &[("nines", FieldDefault::Generated(nines))],
};
