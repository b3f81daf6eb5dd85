use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{backend::ClaimsBackend, draft::BrandSelection, error::Result};

/// Row of `GET /contratantes/`, offered in the insurer selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insurer {
    pub id: i64,
    #[serde(rename = "nombre_contratante")]
    pub name: String,
    #[serde(rename = "tipo_identificacion", default)]
    pub identification_type: String,
    #[serde(rename = "numero_identificacion", default)]
    pub identification_number: String,
}

/// Row of `GET /vehiculos/`, offered in the brand selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleBrand {
    pub id: i64,
    #[serde(rename = "marca")]
    pub brand: String,
    #[serde(rename = "modelo", default)]
    pub model: String,
    #[serde(rename = "anio", default)]
    pub year: String,
    #[serde(rename = "placa", default)]
    pub plate: String,
}

/// Read-only lookup tables fetched once when a wizard mounts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceData {
    pub insurers: Vec<Insurer>,
    pub brands: Vec<VehicleBrand>,
}

impl ReferenceData {
    pub fn new(insurers: Vec<Insurer>, brands: Vec<VehicleBrand>) -> Self {
        Self { insurers, brands }
    }

    /// Fetch both lists concurrently. Either failure fails the whole load.
    pub async fn load(backend: &dyn ClaimsBackend) -> Result<Self> {
        let (insurers, brands) =
            tokio::join!(backend.list_insurers(), backend.list_vehicle_brands());

        let insurers = insurers.inspect_err(|e| warn!(error = %e, "Failed to load insurers"))?;
        let brands = brands.inspect_err(|e| warn!(error = %e, "Failed to load vehicle brands"))?;

        info!(
            insurers = insurers.len(),
            brands = brands.len(),
            "Reference data loaded"
        );
        Ok(Self { insurers, brands })
    }

    pub fn insurer(&self, id: i64) -> Option<&Insurer> {
        self.insurers.iter().find(|insurer| insurer.id == id)
    }

    pub fn brand(&self, id: i64) -> Option<&VehicleBrand> {
        self.brands.iter().find(|brand| brand.id == id)
    }

    /// Whether a brand selection can be resolved: known ids must exist, free
    /// text is accepted as is.
    pub fn resolves(&self, selection: &BrandSelection) -> bool {
        match selection {
            BrandSelection::Known(id) => self.brand(*id).is_some(),
            BrandSelection::Other(_) => true,
        }
    }
}
