//! Health Reporting Module
//!
//! Advisory health reports shared by the cache and the queue manager.

use chrono::{DateTime, Utc};
use serde::Serialize;

// == Health Report ==
/// Result of a health check. Issues are advisory and never raised as errors.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// True when no issue was found
    pub healthy: bool,
    /// Human-readable description of each threshold crossed
    pub issues: Vec<String>,
    /// When the check ran
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    /// Builds a report from the collected issues.
    pub fn from_issues(issues: Vec<String>) -> Self {
        Self {
            healthy: issues.is_empty(),
            issues,
            checked_at: Utc::now(),
        }
    }
}

/// Returns `part / whole`, or 0.0 when `whole` is zero.
pub(crate) fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
