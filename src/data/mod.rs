//! # Training data
//!
//! Delimited text sources are read into a [`TrainingTable`]: a dense array of
//! numeric rows that all share one width, the last column being the reserved
//! output slot. Multi-subject tables additionally carry a [`SegmentIndex`]
//! that maps every subject to its contiguous row range.
//!
//! Records are separated by `;` or, when a line has no `;`, by `,`. Blank
//! lines and lines starting with `#` are skipped.

pub mod subjects;
pub mod table;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{GramEvalError, Result, ResultExt};

pub use subjects::{ClinicalRecord, SubjectLayout};
pub use table::{NormalizationBounds, Segment, SegmentIndex, TrainingTable};

/// Parses one delimited line into numbers.
pub fn parse_record(line: &str) -> std::result::Result<Vec<f64>, String> {
    let fields: Vec<&str> = if line.contains(';') {
        line.split(';').collect()
    } else {
        line.split(',').collect()
    };
    fields
        .iter()
        .map(|f| {
            let f = f.trim();
            f.parse::<f64>()
                .map_err(|_| format!("field '{}' is not a number", f))
        })
        .collect()
}

/// Reads every record of a delimited file.
pub fn read_delimited(path: &Path) -> Result<Vec<Vec<f64>>> {
    Ok(read_numbered(path)?
        .into_iter()
        .map(|(_, record)| record)
        .collect())
}

/// Like [`read_delimited`], with each record paired with its 1-based line in
/// the file.
pub fn read_numbered(path: &Path) -> Result<Vec<(usize, Vec<f64>)>> {
    let content = fs::read_to_string(path).context(format!("Failed to read {:?}", path))?;
    parse_delimited(&content, path)
}

fn parse_delimited(content: &str, path: &Path) -> Result<Vec<(usize, Vec<f64>)>> {
    let mut records = Vec::new();
    for (number, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let record = parse_record(trimmed).map_err(|reason| GramEvalError::Data {
            path: path.to_path_buf(),
            line: number + 1,
            reason,
        })?;
        records.push((number + 1, record));
    }
    Ok(records)
}

/// A raw record waiting for the final table width.
#[derive(Debug, Clone)]
struct PendingRow {
    inputs: Vec<f64>,
    output: Option<f64>,
}

/// Accumulates records from one or more sources and produces a
/// [`TrainingTable`] whose width is the widest record plus the output slot.
#[derive(Debug, Default)]
pub struct TableBuilder {
    rows: Vec<PendingRow>,
    num_input_columns: usize,
    segments: Vec<Segment>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows read so far.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn num_input_columns(&self) -> usize {
        self.num_input_columns
    }

    /// Appends every record of `path`. When `output` is given it fills the
    /// trailing output slot of every appended row.
    ///
    /// A missing file is logged and skipped; it contributes no rows.
    pub fn read_source(&mut self, path: &Path, output: Option<f64>) -> Result<usize> {
        if !path.exists() {
            warn!(?path, "data file does not exist, skipping");
            return Ok(0);
        }
        debug!(?path, "reading data file");
        let records = read_delimited(path)?;
        let count = records.len();
        for inputs in records {
            self.push_record(inputs, output);
        }
        Ok(count)
    }

    /// Appends one already parsed record.
    pub fn push_record(&mut self, inputs: Vec<f64>, output: Option<f64>) {
        self.num_input_columns = self.num_input_columns.max(inputs.len());
        self.rows.push(PendingRow { inputs, output });
    }

    /// Records `subject` as owning every row appended since `start`.
    pub fn close_segment(&mut self, subject: impl Into<String>, start: usize) {
        let end = self.rows.len();
        self.segments.push(Segment {
            subject: subject.into(),
            rows: start..end,
        });
    }

    /// Pads every row to the final width and appends the output slot.
    pub fn finalize(self) -> TrainingTable {
        let width = self.num_input_columns + 1;
        let rows = self
            .rows
            .into_iter()
            .map(|pending| {
                let mut row = pending.inputs;
                row.resize(width - 1, 0.0);
                row.push(pending.output.unwrap_or(0.0));
                row
            })
            .collect();
        TrainingTable::new(rows, self.num_input_columns, SegmentIndex::new(self.segments))
    }
}

/// Reads a single-source table, as used by the temporal model.
pub fn load_table(path: &Path) -> Result<TrainingTable> {
    if !path.exists() {
        return Err(GramEvalError::Configuration(format!(
            "training data {:?} does not exist",
            PathBuf::from(path)
        )));
    }
    let mut builder = TableBuilder::new();
    builder.read_source(path, None)?;
    Ok(builder.finalize())
}
