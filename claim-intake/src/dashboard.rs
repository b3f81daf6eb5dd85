//! Case list projection for the dashboard table.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::wire::Case;

const NO_PLATE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportStatus {
    #[serde(rename = "Reportado")]
    Reported,
    #[serde(rename = "No reportado")]
    NotReported,
}

impl ReportStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ReportStatus::Reported => "Reportado",
            ReportStatus::NotReported => "No reportado",
        }
    }
}

impl From<bool> for ReportStatus {
    fn from(already_reported: bool) -> Self {
        if already_reported {
            ReportStatus::Reported
        } else {
            ReportStatus::NotReported
        }
    }
}

/// One dashboard row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseSummary {
    pub id: i64,
    pub insurer: String,
    pub incident_date: NaiveDate,
    /// First vehicle's plate, `N/A` when the case has none
    pub plate: String,
    pub status: ReportStatus,
}

impl From<&Case> for CaseSummary {
    fn from(case: &Case) -> Self {
        Self {
            id: case.id,
            insurer: case.insurer.clone(),
            incident_date: case.incident_date,
            plate: case
                .vehicles
                .first()
                .map(|v| v.plate.clone())
                .filter(|plate| !plate.is_empty())
                .unwrap_or_else(|| NO_PLATE.to_string()),
            status: case.already_reported.into(),
        }
    }
}

pub fn summarize(cases: &[Case]) -> Vec<CaseSummary> {
    cases.iter().map(CaseSummary::from).collect()
}
