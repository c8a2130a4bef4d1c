use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use super::{read_numbered, TableBuilder, TrainingTable};
use crate::error::{GramEvalError, Result};

/// One row of the clinical metadata file reduced to what fitness needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ClinicalRecord {
    pub subject: String,
    pub level: f64,
}

/// Where the per-subject source files live and how they are named.
///
/// For subject `123`, variant `RightFoot_` and exercise `walk` the file read
/// is `<data_base>/GA123/RightFoot_walk.csv`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SubjectLayout {
    pub data_base: PathBuf,
    pub dir_prefix: String,
    pub variants: Vec<String>,
    pub exercises: Vec<String>,
    /// Clinical column holding the numeric subject code.
    pub id_column: usize,
    /// Clinical column holding the outcome scale value.
    pub level_column: usize,
}

impl Default for SubjectLayout {
    fn default() -> Self {
        Self {
            data_base: PathBuf::from("."),
            dir_prefix: "GA".to_string(),
            variants: vec!["RightFoot_".to_string(), "LeftFoot_".to_string()],
            exercises: Vec::new(),
            id_column: 1,
            level_column: 8,
        }
    }
}

impl SubjectLayout {
    pub fn source_path(&self, subject: &str, variant: &str, exercise: &str) -> PathBuf {
        self.data_base
            .join(format!("{}{}", self.dir_prefix, subject))
            .join(format!("{}{}.csv", variant, exercise))
    }

    /// Reads the clinical metadata file.
    pub fn read_clinical(&self, path: &Path) -> Result<Vec<ClinicalRecord>> {
        read_numbered(path)?
            .into_iter()
            .map(|(line, row)| {
                let field = |column: usize| {
                    row.get(column).copied().ok_or_else(|| GramEvalError::Data {
                        path: path.to_path_buf(),
                        line,
                        reason: format!("record has no column {}", column),
                    })
                };
                Ok(ClinicalRecord {
                    subject: (field(self.id_column)? as i64).to_string(),
                    level: field(self.level_column)?,
                })
            })
            .collect()
    }

    /// Builds the multi-subject table: subjects in clinical order, then for
    /// each subject every variant and exercise in configured order. Each row's
    /// output slot carries the subject's level.
    pub fn build_table(&self, clinical: &[ClinicalRecord]) -> Result<TrainingTable> {
        let mut builder = TableBuilder::new();
        for record in clinical {
            info!(subject = %record.subject, level = record.level, "reading subject");
            let start = builder.len();
            for variant in &self.variants {
                for exercise in &self.exercises {
                    let path = self.source_path(&record.subject, variant, exercise);
                    builder.read_source(&path, Some(record.level))?;
                }
            }
            builder.close_segment(record.subject.clone(), start);
        }
        Ok(builder.finalize())
    }
}
