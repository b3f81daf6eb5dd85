use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::{
    error::{Error, Result},
    step::Step,
};

/// Address of a single draft field, in the `section.field` form the form
/// controls use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FieldPath {
    #[serde(rename = "client.identificationType")]
    IdentificationType,
    #[serde(rename = "client.identificationNumber")]
    IdentificationNumber,
    #[serde(rename = "client.contractorName")]
    ContractorName,
    #[serde(rename = "client.insuredName")]
    InsuredName,
    #[serde(rename = "client.policyNumber")]
    PolicyNumber,
    #[serde(rename = "client.insurerId")]
    Insurer,
    #[serde(rename = "client.residence")]
    Residence,
    #[serde(rename = "vehicle.plate")]
    Plate,
    #[serde(rename = "vehicle.brandId")]
    VehicleBrand,
    #[serde(rename = "vehicle.brandOther")]
    VehicleBrandOther,
    #[serde(rename = "vehicle.year")]
    ModelYear,
    #[serde(rename = "incident.date")]
    IncidentDate,
    #[serde(rename = "incident.details")]
    IncidentDetails,
    #[serde(rename = "incident.visibleDamage")]
    VisibleDamage,
    #[serde(rename = "incident.alreadyReported")]
    AlreadyReported,
    #[serde(rename = "documents.idFile")]
    IdentityDocument,
    #[serde(rename = "documents.registrationFile")]
    RegistrationDocument,
    #[serde(rename = "documents.licenseFile")]
    LicenseDocument,
}

impl FieldPath {
    pub const ALL: [FieldPath; 18] = [
        FieldPath::IdentificationType,
        FieldPath::IdentificationNumber,
        FieldPath::ContractorName,
        FieldPath::InsuredName,
        FieldPath::PolicyNumber,
        FieldPath::Insurer,
        FieldPath::Residence,
        FieldPath::Plate,
        FieldPath::VehicleBrand,
        FieldPath::VehicleBrandOther,
        FieldPath::ModelYear,
        FieldPath::IncidentDate,
        FieldPath::IncidentDetails,
        FieldPath::VisibleDamage,
        FieldPath::AlreadyReported,
        FieldPath::IdentityDocument,
        FieldPath::RegistrationDocument,
        FieldPath::LicenseDocument,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldPath::IdentificationType => "client.identificationType",
            FieldPath::IdentificationNumber => "client.identificationNumber",
            FieldPath::ContractorName => "client.contractorName",
            FieldPath::InsuredName => "client.insuredName",
            FieldPath::PolicyNumber => "client.policyNumber",
            FieldPath::Insurer => "client.insurerId",
            FieldPath::Residence => "client.residence",
            FieldPath::Plate => "vehicle.plate",
            FieldPath::VehicleBrand => "vehicle.brandId",
            FieldPath::VehicleBrandOther => "vehicle.brandOther",
            FieldPath::ModelYear => "vehicle.year",
            FieldPath::IncidentDate => "incident.date",
            FieldPath::IncidentDetails => "incident.details",
            FieldPath::VisibleDamage => "incident.visibleDamage",
            FieldPath::AlreadyReported => "incident.alreadyReported",
            FieldPath::IdentityDocument => "documents.idFile",
            FieldPath::RegistrationDocument => "documents.registrationFile",
            FieldPath::LicenseDocument => "documents.licenseFile",
        }
    }

    /// The wizard step whose sub-record owns this field.
    pub fn step(&self) -> Step {
        match self {
            FieldPath::IdentificationType
            | FieldPath::IdentificationNumber
            | FieldPath::ContractorName
            | FieldPath::InsuredName
            | FieldPath::PolicyNumber
            | FieldPath::Insurer
            | FieldPath::Residence => Step::Client,
            FieldPath::Plate
            | FieldPath::VehicleBrand
            | FieldPath::VehicleBrandOther
            | FieldPath::ModelYear => Step::Vehicle,
            FieldPath::IncidentDate
            | FieldPath::IncidentDetails
            | FieldPath::VisibleDamage
            | FieldPath::AlreadyReported => Step::Incident,
            FieldPath::IdentityDocument
            | FieldPath::RegistrationDocument
            | FieldPath::LicenseDocument => Step::Documents,
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        FieldPath::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| Error::UnknownField(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IdentificationType {
    #[default]
    Cedula,
    #[serde(rename = "RUC")]
    Ruc,
    Pasaporte,
}

impl IdentificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentificationType::Cedula => "Cedula",
            IdentificationType::Ruc => "RUC",
            IdentificationType::Pasaporte => "Pasaporte",
        }
    }
}

impl FromStr for IdentificationType {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Cedula" | "Cédula" => Ok(IdentificationType::Cedula),
            "RUC" => Ok(IdentificationType::Ruc),
            "Pasaporte" => Ok(IdentificationType::Pasaporte),
            _ => Err(()),
        }
    }
}

/// Vehicle brand choice: an entry of the fetched brand list, or free text when
/// the user picked "Otros".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum BrandSelection {
    Known(i64),
    Other(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub identification_type: IdentificationType,
    pub identification_number: String,
    pub contractor_name: String,
    pub insured_name: String,
    pub policy_number: String,
    pub insurer: Option<i64>,
    pub residence: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub plate: String,
    pub brand: Option<BrandSelection>,
    pub year: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub date: Option<NaiveDate>,
    pub details: String,
    pub visible_damage: String,
    pub already_reported: bool,
}

/// A staged file. The payload stays in memory until the upload phase.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: Option<String>,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Identity,
    Registration,
    License,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 3] = [
        DocumentKind::Identity,
        DocumentKind::Registration,
        DocumentKind::License,
    ];

    /// Prefix prepended to the file name to build the blob name.
    pub fn tag(&self) -> &'static str {
        match self {
            DocumentKind::Identity => "id_",
            DocumentKind::Registration => "reg_",
            DocumentKind::License => "lic_",
        }
    }

    pub fn field(&self) -> FieldPath {
        match self {
            DocumentKind::Identity => FieldPath::IdentityDocument,
            DocumentKind::Registration => FieldPath::RegistrationDocument,
            DocumentKind::License => FieldPath::LicenseDocument,
        }
    }
}

impl FromStr for DocumentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "id" | "identity" => Ok(DocumentKind::Identity),
            "reg" | "registration" => Ok(DocumentKind::Registration),
            "lic" | "license" => Ok(DocumentKind::License),
            other => Err(Error::UnknownField(format!("documents.{other}"))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Documents {
    pub identity: Option<Attachment>,
    pub registration: Option<Attachment>,
    pub license: Option<Attachment>,
}

impl Documents {
    pub fn get(&self, kind: DocumentKind) -> Option<&Attachment> {
        match kind {
            DocumentKind::Identity => self.identity.as_ref(),
            DocumentKind::Registration => self.registration.as_ref(),
            DocumentKind::License => self.license.as_ref(),
        }
    }

    pub fn slot_mut(&mut self, kind: DocumentKind) -> &mut Option<Attachment> {
        match kind {
            DocumentKind::Identity => &mut self.identity,
            DocumentKind::Registration => &mut self.registration,
            DocumentKind::License => &mut self.license,
        }
    }
}

/// The in-progress claim: one sub-record per wizard step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimDraft {
    pub client: Client,
    pub vehicle: Vehicle,
    pub incident: Incident,
    pub documents: Documents,
}

impl ClaimDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a raw input value into the addressed field.
    ///
    /// Text fields take the value verbatim; validation happens later, per step.
    /// Only values that cannot be represented at all (an unparseable date, a
    /// non-numeric reference id) are rejected here.
    pub fn apply(&mut self, field: FieldPath, raw: &str) -> Result<()> {
        let invalid = || Error::InvalidFieldValue {
            field,
            value: raw.to_string(),
        };

        match field {
            FieldPath::IdentificationType => {
                self.client.identification_type = raw.parse().map_err(|_| invalid())?;
            }
            FieldPath::IdentificationNumber => self.client.identification_number = raw.to_string(),
            FieldPath::ContractorName => self.client.contractor_name = raw.to_string(),
            FieldPath::InsuredName => self.client.insured_name = raw.to_string(),
            FieldPath::PolicyNumber => self.client.policy_number = raw.to_string(),
            FieldPath::Insurer => {
                self.client.insurer = parse_reference(raw).map_err(|_| invalid())?;
            }
            FieldPath::Residence => self.client.residence = raw.to_string(),
            FieldPath::Plate => self.vehicle.plate = raw.to_string(),
            FieldPath::VehicleBrand if raw.trim().eq_ignore_ascii_case(OTHER_BRAND) => {
                if !matches!(self.vehicle.brand, Some(BrandSelection::Other(_))) {
                    self.vehicle.brand = Some(BrandSelection::Other(String::new()));
                }
            }
            FieldPath::VehicleBrand => {
                self.vehicle.brand = parse_reference(raw)
                    .map_err(|_| invalid())?
                    .map(BrandSelection::Known);
            }
            // an empty free-text box does not override a picked brand
            FieldPath::VehicleBrandOther
                if raw.is_empty() && matches!(self.vehicle.brand, Some(BrandSelection::Known(_))) => {}
            FieldPath::VehicleBrandOther => {
                self.vehicle.brand = Some(BrandSelection::Other(raw.to_string()));
            }
            FieldPath::ModelYear => self.vehicle.year = raw.to_string(),
            FieldPath::IncidentDate => {
                let raw = raw.trim();
                self.incident.date = if raw.is_empty() {
                    None
                } else {
                    Some(NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| invalid())?)
                };
            }
            FieldPath::IncidentDetails => self.incident.details = raw.to_string(),
            FieldPath::VisibleDamage => self.incident.visible_damage = raw.to_string(),
            FieldPath::AlreadyReported => {
                self.incident.already_reported = raw.trim().parse().map_err(|_| invalid())?;
            }
            // files only arrive through `attach`
            FieldPath::IdentityDocument
            | FieldPath::RegistrationDocument
            | FieldPath::LicenseDocument => return Err(invalid()),
        }
        Ok(())
    }

    /// Stage (or clear, with `None`) one of the three documents.
    pub fn attach(&mut self, kind: DocumentKind, attachment: Option<Attachment>) {
        *self.documents.slot_mut(kind) = attachment;
    }
}

/// Brand dropdown value that switches to free-text entry.
pub const OTHER_BRAND: &str = "other";

fn parse_reference(raw: &str) -> std::result::Result<Option<i64>, std::num::ParseIntError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse().map(Some)
}
