//! Parsing ACH text back into an [`AchFile`].
//!
//! Lines are read in a single pass and sorted into per-level buffers. The
//! buffers are then replayed through the same builder calls used to create
//! a file by hand, so a parsed file renders back to the same lines.
//!
//! ```
//! use ach_engine::Reader;
//!
//! let err = Reader::new(["6221231231230000000000000000000100"]).to_ach().unwrap_err();
//! assert!(err.to_string().contains("outside of a batch"));
//! ```

use crate::constants::{RecordType, TRANSMISSION_HEADER_PREFIX};
use crate::error::{AchError, Result};
use crate::file::AchFile;
use crate::record::Attributes;
use log::{debug, warn};
use std::collections::BTreeMap;

/// Raw lines of one batch.
#[derive(Debug, Default)]
struct BatchLines {
    header: String,
    entries: Vec<String>,
    /// Addenda lines keyed by the index of the entry they follow.
    addendas: BTreeMap<usize, Vec<String>>,
    control: Option<String>,
}

/// Raw lines of a whole file, grouped by structural level.
#[derive(Debug, Default)]
struct AchData {
    transmission_header: Option<String>,
    header: Option<String>,
    batches: Vec<BatchLines>,
    control: Option<String>,
}

fn structure(line: usize, message: impl Into<String>) -> AchError {
    AchError::Structure {
        line,
        message: message.into(),
    }
}

/// Copy of a scan error, returned again by later reads of the same source.
fn repeat_error(err: &AchError) -> AchError {
    match err {
        AchError::Structure { line, message } => structure(*line, message.clone()),
        AchError::UnknownRecordType { line, tag } => AchError::UnknownRecordType {
            line: *line,
            tag: *tag,
        },
        AchError::NoLink { link, child } => AchError::NoLink {
            link: *link,
            child: *child,
        },
        other => structure(0, other.to_string()),
    }
}

/// Filler records pad the file to a full block and carry no data.
fn is_filler(line: &str) -> bool {
    line.chars().all(|c| c == '9')
}

/// Reads ACH lines into an [`AchFile`].
///
/// The source is consumed by the first call to [`Reader::to_ach`]; later
/// calls rebuild a fresh tree from the buffered lines, or return the same
/// error if the lines did not form a file.
pub struct Reader<I> {
    lines: Option<I>,
    strict: bool,
    scanned: Option<Result<AchData>>,
}

impl<I, S> Reader<I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    pub fn new<T>(lines: T) -> Self
    where
        T: IntoIterator<IntoIter = I>,
    {
        Reader {
            lines: Some(lines.into_iter()),
            strict: false,
            scanned: None,
        }
    }

    /// Rejects lines with an unknown record type instead of skipping them.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Builds the file tree.
    pub fn to_ach(&mut self) -> Result<AchFile> {
        if self.scanned.is_none() {
            let scanned = match self.lines.take() {
                Some(lines) => Self::scan(lines, self.strict),
                None => Err(structure(0, "no input lines")),
            };
            self.scanned = Some(scanned);
        }

        match &self.scanned {
            Some(Ok(data)) => Self::replay(data),
            Some(Err(err)) => Err(repeat_error(err)),
            None => Err(structure(0, "no data was read")),
        }
    }

    /// Sorts lines into per-level buffers, checking the file structure.
    fn scan(lines: I, strict: bool) -> Result<AchData> {
        let mut data = AchData::default();
        let mut open: Option<BatchLines> = None;
        let mut last_line = 0;

        for (idx, raw) in lines.enumerate() {
            let line_num = idx + 1;
            last_line = line_num;
            let line = raw.as_ref().trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() {
                continue;
            }

            if line.starts_with(TRANSMISSION_HEADER_PREFIX) {
                if data.header.is_some() || data.transmission_header.is_some() {
                    return Err(structure(
                        line_num,
                        "transmission header must be the first line",
                    ));
                }
                data.transmission_header = Some(line.to_string());
                continue;
            }

            let Some(tag) = line.chars().next() else {
                continue;
            };
            let Some(record_type) = RecordType::from_tag(tag) else {
                if strict {
                    return Err(AchError::UnknownRecordType {
                        line: line_num,
                        tag,
                    });
                }
                warn!("Line {}: skipping unrecognized record type '{}'", line_num, tag);
                continue;
            };

            match record_type {
                RecordType::FileHeader => {
                    if data.header.is_some() {
                        return Err(structure(line_num, "duplicate file header"));
                    }
                    data.header = Some(line.to_string());
                }
                RecordType::BatchHeader => {
                    if data.header.is_none() {
                        return Err(structure(line_num, "batch header before file header"));
                    }
                    if open.is_some() {
                        return Err(structure(line_num, "batch header inside an open batch"));
                    }
                    if data.control.is_some() {
                        return Err(structure(line_num, "batch header after file control"));
                    }
                    open = Some(BatchLines {
                        header: line.to_string(),
                        ..BatchLines::default()
                    });
                }
                RecordType::Entry => {
                    let batch = open
                        .as_mut()
                        .ok_or_else(|| structure(line_num, "entry outside of a batch"))?;
                    batch.entries.push(line.to_string());
                }
                RecordType::Addenda => {
                    let batch = open
                        .as_mut()
                        .ok_or_else(|| structure(line_num, "addenda outside of a batch"))?;
                    let entry = batch.entries.len().checked_sub(1).ok_or(AchError::NoLink {
                        link: "entry",
                        child: "addenda",
                    })?;
                    batch
                        .addendas
                        .entry(entry)
                        .or_default()
                        .push(line.to_string());
                }
                RecordType::BatchControl => {
                    let mut batch = open
                        .take()
                        .ok_or_else(|| structure(line_num, "batch control outside of a batch"))?;
                    batch.control = Some(line.to_string());
                    data.batches.push(batch);
                }
                RecordType::FileControl if data.control.is_some() && is_filler(line) => {
                    debug!("Line {}: skipping filler", line_num);
                }
                RecordType::FileControl => {
                    if open.is_some() {
                        return Err(structure(line_num, "file control inside an open batch"));
                    }
                    if data.control.is_some() {
                        return Err(structure(line_num, "duplicate file control"));
                    }
                    data.control = Some(line.to_string());
                }
            }
        }

        if open.is_some() {
            return Err(structure(last_line, "batch is missing its batch control"));
        }
        if data.header.is_none() {
            return Err(structure(last_line, "missing file header"));
        }
        if data.control.is_none() {
            return Err(structure(last_line, "missing file control"));
        }

        debug!(
            "Read {} batches from {} lines",
            data.batches.len(),
            last_line
        );
        Ok(data)
    }

    /// Rebuilds a file tree from buffered lines.
    fn replay(data: &AchData) -> Result<AchFile> {
        let mut file = AchFile::empty()?;
        if let Some(line) = &data.transmission_header {
            file.build_transmission_header(line)?;
        }
        if let Some(line) = &data.header {
            file.build_header(line)?;
        }

        for lines in &data.batches {
            let batch = file.batch(Attributes::new())?;
            batch.build_header(&lines.header)?;
            for (index, entry) in lines.entries.iter().enumerate() {
                batch.build_entry(entry)?;
                for addenda in lines.addendas.get(&index).into_iter().flatten() {
                    batch.build_addenda(addenda)?;
                }
            }
            if let Some(line) = &lines.control {
                batch.build_control(line)?;
            }
        }

        if let Some(line) = &data.control {
            file.build_control(line)?;
        }
        Ok(file)
    }
}
