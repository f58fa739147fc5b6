//! Stress trends over a recent window of journaled assessments.

use crate::features::round2;
use crate::journal::{read_records, AssessmentRecord};
use crate::{Result, StressLevel};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Session counts per stress level
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StressDistribution {
    #[serde(rename = "Low")]
    pub low: usize,
    #[serde(rename = "Moderate")]
    pub moderate: usize,
    #[serde(rename = "High")]
    pub high: usize,
}

impl StressDistribution {
    fn record(&mut self, level: StressLevel) {
        match level {
            StressLevel::Low => self.low += 1,
            StressLevel::Moderate => self.moderate += 1,
            StressLevel::High => self.high += 1,
        }
    }

    pub fn get(&self, level: StressLevel) -> usize {
        match level {
            StressLevel::Low => self.low,
            StressLevel::Moderate => self.moderate,
            StressLevel::High => self.high,
        }
    }
}

/// One point of the stress timeline
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TimelineEntry {
    pub date: DateTime<Utc>,
    pub stress_level: StressLevel,
    pub anxiety_score: Option<u32>,
    pub confidence: f64,
}

/// Summary of assessments within a window
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StressAnalytics {
    pub total_sessions: usize,
    pub stress_distribution: StressDistribution,
    pub average_anxiety_score: f64,
    pub timeline: Vec<TimelineEntry>,
    pub period_days: i64,
}

/// Summarize the records that fall within the last `days` days before `now`
///
/// Records without an anxiety score count as zero toward the average.
/// A window reaching past the earliest representable time covers every record.
pub fn summarize(records: &[AssessmentRecord], days: i64, now: DateTime<Utc>) -> StressAnalytics {
    let cutoff = window_start(now, days);

    let mut recent: Vec<&AssessmentRecord> = records
        .iter()
        .filter(|r| r.recorded_at >= cutoff && r.recorded_at <= now)
        .collect();
    recent.sort_by_key(|r| r.recorded_at);

    let mut distribution = StressDistribution::default();
    let mut score_total: u64 = 0;
    let mut timeline = Vec::with_capacity(recent.len());

    for record in &recent {
        let result = &record.result;
        distribution.record(result.stress_level);
        score_total += u64::from(result.anxiety_score.unwrap_or(0));
        timeline.push(TimelineEntry {
            date: record.recorded_at,
            stress_level: result.stress_level,
            anxiety_score: result.anxiety_score,
            confidence: result.confidence,
        });
    }

    let average_anxiety_score = if recent.is_empty() {
        0.0
    } else {
        round2(score_total as f64 / recent.len() as f64)
    };

    StressAnalytics {
        total_sessions: recent.len(),
        stress_distribution: distribution,
        average_anxiety_score,
        timeline,
        period_days: days,
    }
}

fn window_start(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    Duration::try_days(days.max(0))
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Read a journal and summarize its last `days` days
pub fn load_recent_analytics(
    path: &Path,
    days: i64,
    now: DateTime<Utc>,
) -> Result<StressAnalytics> {
    let records = read_records(path)?;
    let analytics = summarize(&records, days, now);

    tracing::info!(
        "Summarized {} of {} assessments from last {} days",
        analytics.total_sessions,
        records.len(),
        days
    );

    Ok(analytics)
}
