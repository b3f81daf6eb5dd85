use claim_intake::{
    ClaimDraft, FieldPath, Landing, Notification, ReferenceData, Step, StepResult,
    SubmissionReport, SubmitOutcome, Viewer, Violations, WizardSession,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;

/// What the wizard page renders.
#[derive(Debug, Serialize)]
pub struct WizardView {
    pub session_id: String,
    pub step: Step,
    pub step_number: u8,
    pub step_label: &'static str,
    pub submitting: bool,
    pub draft: ClaimDraft,
    /// Active-step violations on touched fields only
    pub violations: Violations,
    pub references: ReferenceData,
    pub notifications: Vec<Notification>,
}

impl WizardView {
    pub fn new(session: &WizardSession, notifications: Vec<Notification>) -> Self {
        let wizard = &session.wizard;
        Self {
            session_id: session.id.clone(),
            step: wizard.step(),
            step_number: wizard.step().number(),
            step_label: wizard.step().label(),
            submitting: wizard.is_submitting(),
            draft: wizard.draft().clone(),
            violations: wizard.visible_violations(),
            references: wizard.references().clone(),
            notifications,
        }
    }

    /// View after a mutation; queued notifications are shown but stay queued
    /// until the next `GET`.
    pub fn pending(session: &WizardSession) -> Self {
        Self::new(session, session.wizard.notifications().to_vec())
    }
}

/// `PATCH /wizard/{id}/fields` body.
#[derive(Debug, Deserialize)]
pub struct FieldUpdateRequest {
    pub fields: Map<String, Value>,
}

impl FieldUpdateRequest {
    /// Resolve keys to field paths and flatten values to the raw strings the
    /// draft accepts. Booleans and numbers are accepted for convenience.
    pub fn into_inputs(self) -> Result<Vec<(FieldPath, String)>, ApiError> {
        self.fields
            .into_iter()
            .map(|(key, value)| {
                let field: FieldPath = key.parse()?;
                let raw = match value {
                    Value::String(s) => s,
                    Value::Bool(b) => b.to_string(),
                    Value::Number(n) => n.to_string(),
                    Value::Null => String::new(),
                    other => {
                        return Err(claim_intake::Error::InvalidFieldValue {
                            field,
                            value: other.to_string(),
                        }
                        .into());
                    }
                };
                Ok((field, raw))
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct StepResponse {
    pub result: StepResult,
    pub wizard: WizardView,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitStatus {
    Submitted {
        report: SubmissionReport,
    },
    Blocked {
        step: Step,
        violations: Violations,
    },
}

impl From<SubmitOutcome> for SubmitStatus {
    fn from(outcome: SubmitOutcome) -> Self {
        match outcome {
            SubmitOutcome::Submitted(report) => SubmitStatus::Submitted { report },
            SubmitOutcome::Blocked { step, violations } => SubmitStatus::Blocked { step, violations },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    #[serde(flatten)]
    pub outcome: SubmitStatus,
    pub wizard: WizardView,
}

#[derive(Debug, Serialize)]
pub struct ViewerResponse {
    #[serde(flatten)]
    pub viewer: Viewer,
    pub landing: Landing,
}
