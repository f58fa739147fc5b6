//! Calibration datasets used for bootstrap training.
//!
//! The built-in table is a small synthetic set calibrated against the
//! Hamilton Anxiety Rating Scale (0-56): five exemplars per stress level.
//! It stands in for collected data and can be swapped for a CSV file.

use crate::{Error, Result, StressLevel, FEATURE_COUNT};
use csv::ReaderBuilder;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::path::Path;

/// One labelled training exemplar
#[derive(Clone, Debug, PartialEq)]
pub struct CalibrationRow {
    /// mean_hr, sdnn, rmssd, lf_hf_ratio, anxiety_score
    pub features: [f64; FEATURE_COUNT],
    pub label: StressLevel,
}

/// A labelled dataset the classifier can be fitted on
#[derive(Clone, Debug, PartialEq)]
pub struct CalibrationSet {
    pub name: String,
    pub rows: Vec<CalibrationRow>,
}

/// Built-in synthetic calibration table
static SYNTHETIC_CALIBRATION: Lazy<CalibrationSet> = Lazy::new(|| {
    use StressLevel::*;

    // mean_hr, sdnn, rmssd, lf_hf_ratio, anxiety_score
    let table: [([f64; FEATURE_COUNT], StressLevel); 15] = [
        // Low stress (anxiety 0-17)
        ([65.0, 85.0, 80.0, 1.1, 5.0], Low),
        ([68.0, 88.0, 82.0, 1.2, 10.0], Low),
        ([72.0, 80.0, 75.0, 1.3, 14.0], Low),
        ([66.0, 92.0, 85.0, 1.0, 8.0], Low),
        ([70.0, 84.0, 78.0, 1.2, 16.0], Low),
        // Moderate stress (anxiety 18-24)
        ([78.0, 55.0, 50.0, 2.8, 19.0], Moderate),
        ([82.0, 50.0, 45.0, 3.2, 22.0], Moderate),
        ([76.0, 58.0, 52.0, 2.5, 18.0], Moderate),
        ([80.0, 52.0, 48.0, 3.0, 23.0], Moderate),
        ([79.0, 54.0, 49.0, 2.9, 21.0], Moderate),
        // High stress (anxiety 25-56)
        ([92.0, 30.0, 25.0, 5.2, 28.0], High),
        ([95.0, 25.0, 20.0, 5.8, 35.0], High),
        ([88.0, 35.0, 30.0, 4.5, 26.0], High),
        ([98.0, 22.0, 18.0, 6.2, 42.0], High),
        ([91.0, 32.0, 27.0, 4.8, 31.0], High),
    ];

    CalibrationSet {
        name: "synthetic_ham_a".into(),
        rows: table
            .iter()
            .map(|(features, label)| CalibrationRow {
                features: *features,
                label: *label,
            })
            .collect(),
    }
});

/// CSV row format for external calibration files
#[derive(Debug, Deserialize)]
struct CsvRow {
    mean_hr: f64,
    sdnn: f64,
    rmssd: f64,
    lf_hf_ratio: f64,
    anxiety_score: f64,
    label: String,
}

impl CalibrationSet {
    /// The built-in synthetic table
    pub fn synthetic() -> &'static CalibrationSet {
        &SYNTHETIC_CALIBRATION
    }

    /// Load a calibration table from CSV
    ///
    /// Expected header: `mean_hr,sdnn,rmssd,lf_hf_ratio,anxiety_score,label`.
    /// Any malformed row fails the whole load.
    pub fn from_csv(path: &Path) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let mut rows = Vec::new();
        for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
            let row = result?;
            let label = StressLevel::parse(&row.label).ok_or_else(|| {
                Error::Calibration(format!(
                    "Unknown label '{}' on data row {}",
                    row.label,
                    line + 1
                ))
            })?;
            rows.push(CalibrationRow {
                features: [
                    row.mean_hr,
                    row.sdnn,
                    row.rmssd,
                    row.lf_hf_ratio,
                    row.anxiety_score,
                ],
                label,
            });
        }

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "custom".into());

        let set = CalibrationSet { name, rows };
        set.validate()?;
        tracing::info!(
            "Loaded calibration set '{}' ({} rows) from {:?}",
            set.name,
            set.len(),
            path
        );
        Ok(set)
    }

    /// Check that the set can be trained on
    pub fn validate(&self) -> Result<()> {
        for level in StressLevel::ALL {
            if !self.rows.iter().any(|r| r.label == level) {
                return Err(Error::Calibration(format!(
                    "Calibration set '{}' has no {} exemplars",
                    self.name, level
                )));
            }
        }

        if let Some(pos) = self
            .rows
            .iter()
            .position(|r| r.features.iter().any(|v| !v.is_finite()))
        {
            return Err(Error::Calibration(format!(
                "Non-finite feature on row {} of '{}'",
                pos + 1,
                self.name
            )));
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Feature matrix in row order
    pub fn features(&self) -> Vec<[f64; FEATURE_COUNT]> {
        self.rows.iter().map(|r| r.features).collect()
    }

    /// Class indices in row order
    pub fn labels(&self) -> Vec<usize> {
        self.rows.iter().map(|r| r.label.index()).collect()
    }
}
