//! Backend JSON shapes for the case endpoints.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    draft::{BrandSelection, ClaimDraft, FieldPath},
    error::{Error, Result},
    reference::ReferenceData,
};

/// `POST /casos/` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCase {
    #[serde(rename = "fecha_incidente")]
    pub incident_date: NaiveDate,
    #[serde(rename = "detalles_incidente")]
    pub details: String,
    #[serde(rename = "danos_visibles")]
    pub visible_damage: String,
    #[serde(rename = "ya_reportado")]
    pub already_reported: bool,
    #[serde(rename = "numero_poliza")]
    pub policy_number: String,
    #[serde(rename = "aseguradora")]
    pub insurer: String,
    #[serde(rename = "contratantes")]
    pub contractors: Vec<NewContractor>,
    #[serde(rename = "asegurados")]
    pub insured: Vec<NewInsured>,
    #[serde(rename = "vehiculos")]
    pub vehicles: Vec<NewVehicle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewContractor {
    #[serde(rename = "tipo_identificacion")]
    pub identification_type: String,
    #[serde(rename = "numero_identificacion")]
    pub identification_number: String,
    #[serde(rename = "nombre_contratante")]
    pub name: String,
    #[serde(rename = "residencia")]
    pub residence: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInsured {
    #[serde(rename = "tipo_identificacion")]
    pub identification_type: String,
    #[serde(rename = "numero_identificacion")]
    pub identification_number: String,
    #[serde(rename = "nombre_asegurado")]
    pub name: String,
    #[serde(rename = "residencia")]
    pub residence: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVehicle {
    #[serde(rename = "placa")]
    pub plate: String,
    #[serde(rename = "marca")]
    pub brand: String,
    #[serde(rename = "modelo")]
    pub model: String,
    #[serde(rename = "anio")]
    pub year: String,
}

impl NewCase {
    /// Translate a draft into the create-case body. The schema takes lists
    /// but a draft always carries exactly one contractor, insured party and
    /// vehicle.
    pub fn from_draft(draft: &ClaimDraft, references: &ReferenceData) -> Result<Self> {
        let incident_date = draft.incident.date.ok_or(Error::MissingIncidentDate)?;
        let client = &draft.client;

        let insurer = client
            .insurer
            .and_then(|id| references.insurer(id))
            .ok_or_else(|| Error::UnknownReference {
                field: FieldPath::Insurer,
                value: client.insurer.map(|id| id.to_string()).unwrap_or_default(),
            })?;

        let (brand, model) = match &draft.vehicle.brand {
            Some(BrandSelection::Known(id)) => {
                let known = references.brand(*id).ok_or_else(|| Error::UnknownReference {
                    field: FieldPath::VehicleBrand,
                    value: id.to_string(),
                })?;
                (known.brand.clone(), known.model.clone())
            }
            Some(BrandSelection::Other(text)) => (text.clone(), text.clone()),
            None => {
                return Err(Error::UnknownReference {
                    field: FieldPath::VehicleBrand,
                    value: String::new(),
                });
            }
        };

        let identification_type = client.identification_type.as_str().to_string();

        Ok(Self {
            incident_date,
            details: draft.incident.details.clone(),
            visible_damage: draft.incident.visible_damage.clone(),
            already_reported: draft.incident.already_reported,
            policy_number: client.policy_number.clone(),
            insurer: insurer.name.clone(),
            contractors: vec![NewContractor {
                identification_type: identification_type.clone(),
                identification_number: client.identification_number.clone(),
                name: client.contractor_name.clone(),
                residence: client.residence.clone(),
            }],
            insured: vec![NewInsured {
                identification_type,
                identification_number: client.identification_number.clone(),
                name: client.insured_name.clone(),
                residence: client.residence.clone(),
            }],
            vehicles: vec![NewVehicle {
                plate: draft.vehicle.plate.clone(),
                brand,
                model,
                year: draft.vehicle.year.clone(),
            }],
        })
    }
}

/// Persisted case, as returned by `POST /casos/` and listed by `GET /casos/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: i64,
    #[serde(rename = "fecha_incidente")]
    pub incident_date: NaiveDate,
    #[serde(rename = "detalles_incidente", default)]
    pub details: String,
    #[serde(rename = "danos_visibles", default)]
    pub visible_damage: String,
    #[serde(rename = "ya_reportado", default)]
    pub already_reported: bool,
    #[serde(rename = "numero_poliza", default)]
    pub policy_number: String,
    #[serde(rename = "aseguradora", default)]
    pub insurer: String,
    #[serde(rename = "contratantes", default)]
    pub contractors: Vec<CaseParty>,
    #[serde(rename = "asegurados", default)]
    pub insured: Vec<CaseParty>,
    #[serde(rename = "vehiculos", default)]
    pub vehicles: Vec<CaseVehicle>,
    #[serde(rename = "documentos", default)]
    pub documents: Vec<CaseDocument>,
}

/// Contractor or insured row of a persisted case; the name lives under a
/// different key for each.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseParty {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(rename = "tipo_identificacion", default)]
    pub identification_type: String,
    #[serde(rename = "numero_identificacion", default)]
    pub identification_number: String,
    #[serde(rename = "nombre_contratante", default, skip_serializing_if = "Option::is_none")]
    pub contractor_name: Option<String>,
    #[serde(rename = "nombre_asegurado", default, skip_serializing_if = "Option::is_none")]
    pub insured_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseVehicle {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(rename = "placa")]
    pub plate: String,
    #[serde(rename = "marca", default)]
    pub brand: String,
    #[serde(rename = "modelo", default)]
    pub model: String,
    #[serde(rename = "anio", default)]
    pub year: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseDocument {
    pub id: i64,
    #[serde(rename = "tipo_documento")]
    pub document_type: String,
    #[serde(rename = "ruta_archivo")]
    pub path: String,
    #[serde(rename = "id_caso")]
    pub case_id: i64,
}

/// `POST /blob/upload` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobReceipt {
    pub blob_name: String,
    #[serde(default)]
    pub data: String,
}
