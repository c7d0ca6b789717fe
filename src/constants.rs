//! Wire-format constants and record type tags.

/// Width of every ACH record line.
pub const RECORD_SIZE: usize = 94;

/// Width of the optional transmission header line.
pub const TRANSMISSION_HEADER_SIZE: usize = 38;

/// Number of records per block; output is padded with filler records to a
/// multiple of this.
pub const BLOCKING_FACTOR: usize = 10;

/// Line separator used when writing ACH text.
pub const LINE_SEPARATOR: &str = "\r\n";

/// Prefix identifying a transmission header line.
pub const TRANSMISSION_HEADER_PREFIX: &str = "$$";

/// Record type selected by the tag in column 0 of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    FileHeader,
    BatchHeader,
    Entry,
    Addenda,
    BatchControl,
    FileControl,
}

impl RecordType {
    /// Maps a column-0 tag to a record type.
    pub fn from_tag(tag: char) -> Option<Self> {
        match tag {
            '1' => Some(RecordType::FileHeader),
            '5' => Some(RecordType::BatchHeader),
            '6' => Some(RecordType::Entry),
            '7' => Some(RecordType::Addenda),
            '8' => Some(RecordType::BatchControl),
            '9' => Some(RecordType::FileControl),
            _ => None,
        }
    }

    /// The tag written in column 0 for this record type.
    pub fn tag(self) -> char {
        match self {
            RecordType::FileHeader => '1',
            RecordType::BatchHeader => '5',
            RecordType::Entry => '6',
            RecordType::Addenda => '7',
            RecordType::BatchControl => '8',
            RecordType::FileControl => '9',
        }
    }
}
