//! Feature extraction from interval series and questionnaires.
//!
//! Everything here is pure and deterministic. The LF/HF value is a
//! variance-based proxy (`sdnn / (rmssd + 1)`), not a spectral estimate;
//! the calibration tables were tuned against this exact formula.

use crate::{Error, HrvFeatures, Result};

/// Minimum number of intervals required for extraction
pub const MIN_INTERVALS: usize = 10;

/// Highest valid ordinal answer
pub const MAX_ANSWER: u8 = 3;

/// Anxiety score below which the low-stress bucket applies
pub const MODERATE_SCORE_THRESHOLD: u32 = 18;

/// Anxiety score at or above which the high-stress bucket applies
pub const HIGH_SCORE_THRESHOLD: u32 = 25;

/// Extract time-domain HRV features from RR intervals in milliseconds
pub fn extract_hrv_features(rr_intervals: &[f64]) -> Result<HrvFeatures> {
    if rr_intervals.len() < MIN_INTERVALS {
        return Err(Error::InsufficientData {
            required: MIN_INTERVALS,
            actual: rr_intervals.len(),
        });
    }

    if let Some((index, &value)) = rr_intervals
        .iter()
        .enumerate()
        .find(|(_, v)| !v.is_finite() || **v <= 0.0)
    {
        return Err(Error::InvalidInterval { index, value });
    }

    let n = rr_intervals.len() as f64;
    let mean_rr = rr_intervals.iter().sum::<f64>() / n;
    let mean_hr = 60000.0 / mean_rr;

    // Population standard deviation (ddof = 0)
    let sdnn = (rr_intervals
        .iter()
        .map(|x| (x - mean_rr).powi(2))
        .sum::<f64>()
        / n)
        .sqrt();

    let diffs: Vec<f64> = rr_intervals.windows(2).map(|w| w[1] - w[0]).collect();
    let rmssd = (diffs.iter().map(|d| d * d).sum::<f64>() / diffs.len() as f64).sqrt();

    let lf_hf_ratio = sdnn / (rmssd + 1.0);

    Ok(HrvFeatures {
        mean_hr: round2(mean_hr),
        sdnn: round2(sdnn),
        rmssd: round2(rmssd),
        lf_hf_ratio: round2(lf_hf_ratio),
    })
}

/// Parse an interval recording: numbers separated by commas or whitespace
///
/// Tokens that are not numbers are reported as `InvalidInterval` with a NaN
/// value at their position.
pub fn parse_intervals(text: &str) -> Result<Vec<f64>> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .enumerate()
        .map(|(index, token)| {
            token.parse::<f64>().map_err(|_| Error::InvalidInterval {
                index,
                value: f64::NAN,
            })
        })
        .collect()
}

/// Sum questionnaire answers into an anxiety score
///
/// Each answer must be on the 0-3 scale.
pub fn anxiety_score(answers: &[u8]) -> Result<u32> {
    if let Some((index, &value)) = answers
        .iter()
        .enumerate()
        .find(|(_, a)| **a > MAX_ANSWER)
    {
        return Err(Error::InvalidAnswer { index, value });
    }

    Ok(answers.iter().map(|&a| u32::from(a)).sum())
}

/// Representative HRV features for an anxiety score when no intervals exist
pub fn default_features_for_score(anxiety_score: u32) -> HrvFeatures {
    if anxiety_score < MODERATE_SCORE_THRESHOLD {
        HrvFeatures {
            mean_hr: 68.0,
            sdnn: 85.0,
            rmssd: 80.0,
            lf_hf_ratio: 1.2,
        }
    } else if anxiety_score < HIGH_SCORE_THRESHOLD {
        HrvFeatures {
            mean_hr: 78.0,
            sdnn: 55.0,
            rmssd: 50.0,
            lf_hf_ratio: 2.8,
        }
    } else {
        HrvFeatures {
            mean_hr: 92.0,
            sdnn: 30.0,
            rmssd: 25.0,
            lf_hf_ratio: 5.2,
        }
    }
}

/// Round to two decimals, ties to even
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
