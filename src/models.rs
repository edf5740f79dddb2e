//! Request and response types for the scenario backend API.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::scenario::SessionSummary;

/// Condensed safety report the scenario is generated from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub title: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    /// RFC 3339 timestamp of the original report
    pub reported_date: String,
}

impl ReportSummary {
    /// Build a summary from raw report content. The title is the first
    /// 50 characters of the content; the reported date is derived from a
    /// relative age in hours.
    pub fn from_report_content(
        content: &str,
        latitude: f64,
        longitude: f64,
        hours_ago: i64,
    ) -> Self {
        Self {
            title: content.chars().take(50).collect(),
            description: content.to_string(),
            latitude,
            longitude,
            reported_date: (Utc::now() - Duration::hours(hours_ago)).to_rfc3339(),
        }
    }
}

/// User-provided scenario parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioMeta {
    pub title: String,
    pub description: String,
    pub start_date: String,
}

/// One `{situation, choice}` pair of prior conversation context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub situation: String,
    pub choice: String,
}

/// Body of the scenario stream request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRequest {
    pub report: ReportSummary,
    pub scenario: ScenarioMeta,
    pub history: Vec<HistoryEntry>,
}

/// One step of a completed session as persisted by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedStep {
    pub situation: String,
    pub choice: String,
    pub survival_rate: Option<f64>,
    pub comment: String,
}

/// Body of the save request sent when a session completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveScenarioRequest {
    pub scenario: ScenarioMeta,
    pub report: ReportSummary,
    pub history: Vec<SavedStep>,
}

impl SaveScenarioRequest {
    /// Serialize a session summary into the save payload. Each step
    /// carries the feedback comment for its choice; the survival rate is
    /// the session's last-known value.
    pub fn from_summary(
        scenario: ScenarioMeta,
        report: ReportSummary,
        summary: &SessionSummary,
    ) -> Self {
        let rate = summary.survival_rate.as_ref().map(|r| r.rate);
        let history = summary
            .entries
            .iter()
            .map(|entry| SavedStep {
                situation: entry.situation.clone(),
                choice: entry.choice.clone(),
                survival_rate: rate,
                comment: entry.feedback.comment.clone(),
            })
            .collect();
        Self {
            scenario,
            report,
            history,
        }
    }
}
