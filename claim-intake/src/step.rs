use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{draft::FieldPath, validation::Violations};

/// Wizard pages, in order. `Success` is terminal and only reachable through a
/// successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    #[default]
    Client,
    Vehicle,
    Incident,
    Documents,
    Success,
}

impl Step {
    /// The four data-collecting steps.
    pub const FORM: [Step; 4] = [Step::Client, Step::Vehicle, Step::Incident, Step::Documents];

    /// 1-based position, as shown in the step indicator.
    pub fn number(&self) -> u8 {
        match self {
            Step::Client => 1,
            Step::Vehicle => 2,
            Step::Incident => 3,
            Step::Documents => 4,
            Step::Success => 5,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Step::Client => "Cliente",
            Step::Vehicle => "Vehículo",
            Step::Incident => "Siniestro",
            Step::Documents => "Documentos",
            Step::Success => "Completado",
        }
    }

    /// Target of a forward move. `None` for `Documents`, which leaves only by
    /// submitting, and for `Success`.
    pub fn next(&self) -> Option<Step> {
        match self {
            Step::Client => Some(Step::Vehicle),
            Step::Vehicle => Some(Step::Incident),
            Step::Incident => Some(Step::Documents),
            Step::Documents | Step::Success => None,
        }
    }

    pub fn previous(&self) -> Option<Step> {
        match self {
            Step::Vehicle => Some(Step::Client),
            Step::Incident => Some(Step::Vehicle),
            Step::Documents => Some(Step::Incident),
            Step::Client | Step::Success => None,
        }
    }

    /// Fields owned by this step's sub-record.
    pub fn fields(&self) -> &'static [FieldPath] {
        match self {
            Step::Client => &[
                FieldPath::IdentificationType,
                FieldPath::IdentificationNumber,
                FieldPath::ContractorName,
                FieldPath::InsuredName,
                FieldPath::PolicyNumber,
                FieldPath::Insurer,
                FieldPath::Residence,
            ],
            Step::Vehicle => &[
                FieldPath::Plate,
                FieldPath::VehicleBrand,
                FieldPath::VehicleBrandOther,
                FieldPath::ModelYear,
            ],
            Step::Incident => &[
                FieldPath::IncidentDate,
                FieldPath::IncidentDetails,
                FieldPath::VisibleDamage,
                FieldPath::AlreadyReported,
            ],
            Step::Documents => &[
                FieldPath::IdentityDocument,
                FieldPath::RegistrationDocument,
                FieldPath::LicenseDocument,
            ],
            Step::Success => &[],
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.number(), self.label())
    }
}

/// What happened to the wizard after a step operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    /// Moved forward one step
    Continue,
    /// Stayed on the current step; violations must be fixed first
    WaitForInput,
    /// Moved back one step
    GoBack,
    /// Submission completed, the wizard is on `Success`
    End,
}

/// Result of a step operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// Step the wizard is on after the operation
    pub step: Step,
    pub next_action: NextAction,
    /// Violations that blocked the move; empty unless `WaitForInput`
    pub violations: Violations,
}

impl StepResult {
    pub fn moved(step: Step, next_action: NextAction) -> Self {
        Self {
            step,
            next_action,
            violations: Violations::default(),
        }
    }

    pub fn blocked(step: Step, violations: Violations) -> Self {
        Self {
            step,
            next_action: NextAction::WaitForInput,
            violations,
        }
    }

    pub fn advanced(&self) -> bool {
        matches!(self.next_action, NextAction::Continue | NextAction::End)
    }
}
