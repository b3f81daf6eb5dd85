use async_trait::async_trait;
use reqwest::{
    Client, RequestBuilder, Response, Url,
    multipart::{Form, Part},
};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::{
    config::BackendConfig,
    draft::Attachment,
    error::{Error, Result},
    reference::{Insurer, VehicleBrand},
    wire::{BlobReceipt, Case, NewCase},
};

/// The claims REST backend, as the wizard and dashboard see it.
#[async_trait]
pub trait ClaimsBackend: Send + Sync {
    /// `GET /contratantes/`
    async fn list_insurers(&self) -> Result<Vec<Insurer>>;

    /// `GET /vehiculos/`
    async fn list_vehicle_brands(&self) -> Result<Vec<VehicleBrand>>;

    /// `POST /casos/`
    async fn create_case(&self, case: &NewCase) -> Result<Case>;

    /// `POST /blob/upload?blob_name=...`, file sent as the multipart field `file`
    async fn upload_blob(&self, blob_name: &str, file: &Attachment) -> Result<BlobReceipt>;

    /// `GET /casos/`
    async fn list_cases(&self) -> Result<Vec<Case>>;

    /// `GET /casos/{id}`
    async fn get_case(&self, id: i64) -> Result<Case>;
}

/// [`ClaimsBackend`] over HTTP.
#[derive(Clone)]
pub struct HttpClaimsBackend {
    client: Client,
    config: BackendConfig,
}

impl HttpClaimsBackend {
    pub fn new(config: BackendConfig) -> Result<Self> {
        Url::parse(&config.base_url).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.base_url)))?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.config.endpoint(path);
        debug!(url = %url, "GET");
        let response = self.authorize(self.client.get(&url)).send().await?;
        read_json(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        error!(url = %url, status = status.as_u16(), body = %body, "Backend request failed");
        return Err(Error::Backend {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json().await?)
}

#[async_trait]
impl ClaimsBackend for HttpClaimsBackend {
    async fn list_insurers(&self) -> Result<Vec<Insurer>> {
        self.get_json("contratantes/").await
    }

    async fn list_vehicle_brands(&self) -> Result<Vec<VehicleBrand>> {
        self.get_json("vehiculos/").await
    }

    async fn create_case(&self, case: &NewCase) -> Result<Case> {
        let url = self.config.endpoint("casos/");
        debug!(url = %url, "POST case");
        let response = self
            .authorize(self.client.post(&url).json(case))
            .send()
            .await?;
        read_json(response).await
    }

    async fn upload_blob(&self, blob_name: &str, file: &Attachment) -> Result<BlobReceipt> {
        let url = self.config.endpoint("blob/upload");
        debug!(url = %url, blob_name = %blob_name, size = file.len(), "POST blob");

        let mut part = Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
        if let Some(content_type) = &file.content_type {
            part = part.mime_str(content_type)?;
        }
        let form = Form::new().part("file", part);

        let response = self
            .authorize(
                self.client
                    .post(&url)
                    .query(&[("blob_name", blob_name)])
                    .multipart(form),
            )
            .send()
            .await?;
        read_json(response).await
    }

    async fn list_cases(&self) -> Result<Vec<Case>> {
        self.get_json("casos/").await
    }

    async fn get_case(&self, id: i64) -> Result<Case> {
        self.get_json(&format!("casos/{id}")).await
    }
}
