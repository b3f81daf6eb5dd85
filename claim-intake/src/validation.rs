//! Field rules for each wizard step.
//!
//! Rules are evaluated per step only: validating the Vehicle step never
//! looks at the Client sub-record. Each field reports at most one violation,
//! the first rule it fails.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashSet},
    sync::LazyLock,
};

use crate::{
    draft::{BrandSelection, ClaimDraft, FieldPath},
    reference::ReferenceData,
    step::Step,
};

pub const ID_NUMBER_MIN: usize = 9;
pub const NAME_MIN: usize = 3;
pub const POLICY_NUMBER_MIN: usize = 3;
pub const RESIDENCE_MIN: usize = 3;
pub const PLATE_MIN: usize = 6;
pub const DETAILS_MIN: usize = 10;
pub const VISIBLE_DAMAGE_MIN: usize = 5;

static MODEL_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}$").expect("model year pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", content = "min", rename_all = "snake_case")]
pub enum Rule {
    Required,
    MinLength(usize),
    Numeric,
    Pattern,
    UnknownReference,
}

impl Rule {
    pub fn message(&self) -> String {
        match self {
            Rule::Required => "Requerido".to_string(),
            Rule::MinLength(min) => format!("Mínimo {min} caracteres"),
            Rule::Numeric => "Todos los valores deben ser numericos".to_string(),
            Rule::Pattern => "Año inválido".to_string(),
            Rule::UnknownReference => "Seleccione una opción válida".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    #[serde(flatten)]
    pub rule: Rule,
    pub message: String,
}

impl From<Rule> for Violation {
    fn from(rule: Rule) -> Self {
        Self {
            message: rule.message(),
            rule,
        }
    }
}

/// Violations keyed by field, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Violations(BTreeMap<FieldPath, Violation>);

impl Violations {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: FieldPath) -> Option<&Violation> {
        self.0.get(&field)
    }

    pub fn rule(&self, field: FieldPath) -> Option<Rule> {
        self.get(field).map(|v| v.rule)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldPath, &Violation)> {
        self.0.iter()
    }

    fn check(&mut self, field: FieldPath, outcome: Option<Rule>) {
        if let Some(rule) = outcome {
            self.0.insert(field, rule.into());
        }
    }

    /// Keep only violations on fields the user has touched.
    pub fn touched_only(mut self, touched: &HashSet<FieldPath>) -> Self {
        self.0.retain(|field, _| touched.contains(field));
        self
    }
}

/// Check the fields of `step` only.
pub fn validate_step(step: Step, draft: &ClaimDraft, references: &ReferenceData) -> Violations {
    let mut violations = Violations::default();
    match step {
        Step::Client => {
            let client = &draft.client;
            violations.check(
                FieldPath::IdentificationNumber,
                min_length(&client.identification_number, ID_NUMBER_MIN)
                    .or_else(|| numeric(&client.identification_number)),
            );
            violations.check(
                FieldPath::ContractorName,
                min_length(&client.contractor_name, NAME_MIN),
            );
            violations.check(
                FieldPath::InsuredName,
                min_length(&client.insured_name, NAME_MIN),
            );
            violations.check(
                FieldPath::PolicyNumber,
                optional_min_length(&client.policy_number, POLICY_NUMBER_MIN),
            );
            violations.check(
                FieldPath::Insurer,
                match client.insurer {
                    None => Some(Rule::Required),
                    Some(id) if references.insurer(id).is_none() => Some(Rule::UnknownReference),
                    Some(_) => None,
                },
            );
            violations.check(
                FieldPath::Residence,
                min_length(&client.residence, RESIDENCE_MIN),
            );
        }
        Step::Vehicle => {
            let vehicle = &draft.vehicle;
            violations.check(FieldPath::Plate, min_length(&vehicle.plate, PLATE_MIN));
            violations.check(
                FieldPath::VehicleBrand,
                match &vehicle.brand {
                    None => Some(Rule::Required),
                    Some(BrandSelection::Other(text)) if text.trim().is_empty() => {
                        Some(Rule::Required)
                    }
                    Some(selection) if !references.resolves(selection) => {
                        Some(Rule::UnknownReference)
                    }
                    Some(_) => None,
                },
            );
            violations.check(FieldPath::ModelYear, model_year(&vehicle.year));
        }
        Step::Incident => {
            let incident = &draft.incident;
            violations.check(
                FieldPath::IncidentDate,
                incident.date.is_none().then_some(Rule::Required),
            );
            violations.check(
                FieldPath::IncidentDetails,
                min_length(&incident.details, DETAILS_MIN),
            );
            violations.check(
                FieldPath::VisibleDamage,
                min_length(&incident.visible_damage, VISIBLE_DAMAGE_MIN),
            );
        }
        Step::Documents => {
            for field in Step::Documents.fields() {
                let present = match field {
                    FieldPath::IdentityDocument => draft.documents.identity.is_some(),
                    FieldPath::RegistrationDocument => draft.documents.registration.is_some(),
                    _ => draft.documents.license.is_some(),
                };
                violations.check(*field, (!present).then_some(Rule::Required));
            }
        }
        Step::Success => {}
    }
    violations
}

/// Validate every form step in order and return the first one that fails.
pub fn validate_all(draft: &ClaimDraft, references: &ReferenceData) -> Option<(Step, Violations)> {
    Step::FORM.into_iter().find_map(|step| {
        let violations = validate_step(step, draft, references);
        (!violations.is_empty()).then_some((step, violations))
    })
}

fn min_length(value: &str, min: usize) -> Option<Rule> {
    if value.is_empty() {
        Some(Rule::Required)
    } else if value.chars().count() < min {
        Some(Rule::MinLength(min))
    } else {
        None
    }
}

fn optional_min_length(value: &str, min: usize) -> Option<Rule> {
    if value.is_empty() {
        None
    } else {
        min_length(value, min)
    }
}

fn numeric(value: &str) -> Option<Rule> {
    (!value.chars().all(|c| c.is_ascii_digit())).then_some(Rule::Numeric)
}

fn model_year(value: &str) -> Option<Rule> {
    if value.is_empty() {
        Some(Rule::Required)
    } else if !MODEL_YEAR.is_match(value) {
        Some(Rule::Pattern)
    } else {
        None
    }
}
