//! Shared fixtures for unit tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::{
    backend::ClaimsBackend,
    draft::{Attachment, BrandSelection, ClaimDraft, DocumentKind},
    error::{Error, Result},
    reference::{Insurer, ReferenceData, VehicleBrand},
    wire::{BlobReceipt, Case, CaseParty, CaseVehicle, NewCase},
};

/// In-memory backend that records every call in order.
#[derive(Default)]
pub struct RecordingBackend {
    case_id: i64,
    calls: Mutex<Vec<String>>,
    created: Mutex<Vec<NewCase>>,
    fail_create: bool,
    fail_upload: Option<String>,
    fail_references: bool,
    hold_create: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl RecordingBackend {
    pub fn new(case_id: i64) -> Self {
        Self {
            case_id,
            ..Self::default()
        }
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn failing_upload(mut self, blob_name: &str) -> Self {
        self.fail_upload = Some(blob_name.to_string());
        self
    }

    pub fn failing_references(mut self) -> Self {
        self.fail_references = true;
        self
    }

    /// Park `create_case` until `release` is notified; `entered` fires once
    /// the call is in flight.
    pub fn holding_create(mut self, entered: Arc<Notify>, release: Arc<Notify>) -> Self {
        self.hold_create = Some((entered, release));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<NewCase> {
        self.created.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

fn unavailable() -> Error {
    Error::Backend {
        status: 500,
        body: "unavailable".to_string(),
    }
}

#[async_trait]
impl ClaimsBackend for RecordingBackend {
    async fn list_insurers(&self) -> Result<Vec<Insurer>> {
        self.record("list_insurers");
        if self.fail_references {
            return Err(unavailable());
        }
        Ok(references().insurers)
    }

    async fn list_vehicle_brands(&self) -> Result<Vec<VehicleBrand>> {
        self.record("list_vehicle_brands");
        Ok(references().brands)
    }

    async fn create_case(&self, case: &NewCase) -> Result<Case> {
        self.record("create_case");
        self.created.lock().unwrap().push(case.clone());
        if let Some((entered, release)) = &self.hold_create {
            entered.notify_one();
            release.notified().await;
        }
        if self.fail_create {
            return Err(unavailable());
        }
        Ok(Case {
            id: self.case_id,
            incident_date: case.incident_date,
            details: case.details.clone(),
            visible_damage: case.visible_damage.clone(),
            already_reported: case.already_reported,
            policy_number: case.policy_number.clone(),
            insurer: case.insurer.clone(),
            contractors: case
                .contractors
                .iter()
                .map(|c| CaseParty {
                    id: Some(1),
                    identification_type: c.identification_type.clone(),
                    identification_number: c.identification_number.clone(),
                    contractor_name: Some(c.name.clone()),
                    insured_name: None,
                })
                .collect(),
            insured: vec![],
            vehicles: case
                .vehicles
                .iter()
                .map(|v| CaseVehicle {
                    id: Some(1),
                    plate: v.plate.clone(),
                    brand: v.brand.clone(),
                    model: v.model.clone(),
                    year: v.year.clone(),
                })
                .collect(),
            documents: vec![],
        })
    }

    async fn upload_blob(&self, blob_name: &str, _file: &Attachment) -> Result<BlobReceipt> {
        self.record(format!("upload:{blob_name}"));
        if self.fail_upload.as_deref() == Some(blob_name) {
            return Err(unavailable());
        }
        Ok(BlobReceipt {
            blob_name: blob_name.to_string(),
            data: "ok".to_string(),
        })
    }

    async fn list_cases(&self) -> Result<Vec<Case>> {
        self.record("list_cases");
        Ok(vec![])
    }

    async fn get_case(&self, id: i64) -> Result<Case> {
        self.record(format!("get_case:{id}"));
        Err(Error::Backend {
            status: 404,
            body: "not found".to_string(),
        })
    }
}

pub fn references() -> ReferenceData {
    ReferenceData::new(
        vec![Insurer {
            id: 1,
            name: "Seguros Sucre".to_string(),
            identification_type: "RUC".to_string(),
            identification_number: "0990000000001".to_string(),
        }],
        vec![VehicleBrand {
            id: 10,
            brand: "Chevrolet".to_string(),
            model: "Aveo".to_string(),
            year: "2019".to_string(),
            plate: "GBA1234".to_string(),
        }],
    )
}

/// A draft that passes every step.
pub fn complete_draft() -> ClaimDraft {
    let mut draft = ClaimDraft::new();
    draft.client.identification_number = "0912345678".to_string();
    draft.client.contractor_name = "Juan Pérez".to_string();
    draft.client.insured_name = "María Gómez".to_string();
    draft.client.policy_number = "POL123456".to_string();
    draft.client.insurer = Some(1);
    draft.client.residence = "Guayaquil".to_string();
    draft.vehicle.plate = "GBA1234".to_string();
    draft.vehicle.brand = Some(BrandSelection::Known(10));
    draft.vehicle.year = "2019".to_string();
    draft.incident.date = NaiveDate::from_ymd_opt(2024, 5, 17);
    draft.incident.details = "Choque lateral en la avenida".to_string();
    draft.incident.visible_damage = "Puerta hundida".to_string();
    for (kind, name) in [
        (DocumentKind::Identity, "cedula.pdf"),
        (DocumentKind::Registration, "matricula.jpg"),
        (DocumentKind::License, "licencia.png"),
    ] {
        draft.attach(kind, Some(Attachment::new(name, vec![0xde, 0xad])));
    }
    draft
}
