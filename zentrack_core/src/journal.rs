//! Assessment journal.
//!
//! Completed assessments are appended to a JSONL (JSON Lines) file under an
//! exclusive file lock so that several processes can share one journal.

use crate::{ClassificationResult, ModelKind, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One journaled assessment
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AssessmentRecord {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub result: ClassificationResult,
    pub model_kind: ModelKind,
}

impl AssessmentRecord {
    pub fn new(result: ClassificationResult, model_kind: ModelKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            recorded_at: result.timestamp,
            result,
            model_kind,
        }
    }
}

/// Destination for completed assessments
pub trait AssessmentSink {
    fn append(&mut self, record: &AssessmentRecord) -> Result<()>;
}

/// JSONL-backed journal with file locking
pub struct JsonlJournal {
    path: PathBuf,
}

impl JsonlJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl AssessmentSink for JsonlJournal {
    fn append(&mut self, record: &AssessmentRecord) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let line = serde_json::to_string(record)?;
        let written = write_line(&file, &line);

        file.unlock()?;
        written?;

        tracing::debug!("Appended assessment {} to journal", record.id);
        Ok(())
    }
}

fn write_line(file: &File, line: &str) -> std::io::Result<()> {
    let mut writer = std::io::BufWriter::new(file);
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()
}

/// Read every record from a journal file
///
/// A missing file is an empty journal. Lines that fail to parse are skipped.
pub fn read_records(path: &Path) -> Result<Vec<AssessmentRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut records = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = match line_result {
            Ok(line) => line,
            Err(e) => {
                file.unlock()?;
                return Err(e.into());
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<AssessmentRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!("Failed to parse assessment at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} assessments from journal", records.len());
    Ok(records)
}
