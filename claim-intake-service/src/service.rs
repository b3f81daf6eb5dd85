use axum::{
    Router,
    body::Body,
    extract::{DefaultBodyLimit, FromRequestParts, Multipart, Path, State},
    http::{HeaderValue, Request, StatusCode, request::Parts},
    middleware::{Next, from_fn},
    response::{Json, Response},
    routing::{get, patch, post, put},
};
use claim_intake::{
    Attachment, Case, CaseSummary, ClaimsBackend, DocumentKind, HttpClaimsBackend,
    InMemorySessionStorage, Viewer, WizardRunner,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, info};
use uuid::Uuid;

use crate::{
    config::ServiceConfig,
    error::ApiError,
    models::{FieldUpdateRequest, StepResponse, SubmitResponse, ViewerResponse, WizardView},
};

pub const CORRELATION_HEADER: &str = "x-correlation-id";
pub const ACCOUNT_HEADER: &str = "x-account-id";
pub const USER_TYPE_HEADER: &str = "x-user-type";
const UPLOAD_FIELD: &str = "file";
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Clone)]
pub struct AppState {
    pub runner: WizardRunner,
}

impl AppState {
    /// Sessions live in memory for the life of the process.
    pub fn new(backend: Arc<dyn ClaimsBackend>) -> Self {
        Self {
            runner: WizardRunner::new(backend, Arc::new(InMemorySessionStorage::new())),
        }
    }
}

pub fn create_app(config: &ServiceConfig) -> claim_intake::Result<Router> {
    let backend = HttpClaimsBackend::new(config.backend.clone())?;
    Ok(build_router(AppState::new(Arc::new(backend))))
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/me", get(whoami))
        .route("/wizard", post(start_wizard))
        .route("/wizard/{id}", get(get_wizard).delete(discard_wizard))
        .route("/wizard/{id}/fields", patch(update_fields))
        .route(
            "/wizard/{id}/documents/{kind}",
            put(upload_document).delete(remove_document),
        )
        .route("/wizard/{id}/advance", post(advance))
        .route("/wizard/{id}/retreat", post(retreat))
        .route("/wizard/{id}/reset", post(reset))
        .route("/wizard/{id}/submit", post(submit))
        .route("/cases", get(list_cases))
        .route("/cases/{id}", get(get_case))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(from_fn(correlation_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Middleware to add a correlation ID to every request and its response
async fn correlation_id_middleware(mut request: Request<Body>, next: Next) -> Response {
    // keep the caller's id when it sent one
    let correlation_id = request
        .headers()
        .get(CORRELATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let header_value = HeaderValue::from_str(&correlation_id).ok();
    if let Some(value) = &header_value {
        request.headers_mut().insert(CORRELATION_HEADER, value.clone());
    }

    let span = tracing::info_span!(
        "http_request",
        correlation_id = %correlation_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    let mut response = next.run(request).instrument(span).await;
    if let Some(value) = header_value {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    response
}

/// The signed-in caller, taken from the headers the identity shell sets.
pub struct CurrentViewer(pub Viewer);

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl<S> FromRequestParts<S> for CurrentViewer
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let account_id = header(parts, ACCOUNT_HEADER).ok_or(ApiError::Unauthenticated)?;
        Ok(CurrentViewer(Viewer::new(
            account_id,
            header(parts, USER_TYPE_HEADER),
        )))
    }
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn whoami(CurrentViewer(viewer): CurrentViewer) -> Json<ViewerResponse> {
    let landing = viewer.landing();
    Json(ViewerResponse { viewer, landing })
}

async fn start_wizard(
    State(state): State<AppState>,
    CurrentViewer(viewer): CurrentViewer,
) -> Result<(StatusCode, Json<WizardView>), ApiError> {
    let mut session = state.runner.start(&viewer).await?;
    // reference-load failures surface right away
    let notifications = session.wizard.take_notifications();
    info!(session_id = %session.id, "Wizard created");
    Ok((StatusCode::CREATED, Json(WizardView::new(&session, notifications))))
}

async fn get_wizard(
    State(state): State<AppState>,
    CurrentViewer(viewer): CurrentViewer,
    Path(session_id): Path<String>,
) -> ApiResult<WizardView> {
    let (session, notifications) = state.runner.view(&session_id, &viewer).await?;
    Ok(Json(WizardView::new(&session, notifications)))
}

async fn discard_wizard(
    State(state): State<AppState>,
    CurrentViewer(viewer): CurrentViewer,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.runner.discard(&session_id, &viewer).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn update_fields(
    State(state): State<AppState>,
    CurrentViewer(viewer): CurrentViewer,
    Path(session_id): Path<String>,
    Json(request): Json<FieldUpdateRequest>,
) -> ApiResult<WizardView> {
    let inputs = request.into_inputs()?;
    let session = state
        .runner
        .update_fields(&session_id, &viewer, &inputs)
        .await?;
    Ok(Json(WizardView::pending(&session)))
}

async fn read_upload(mut multipart: Multipart) -> Result<Attachment, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("documento").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        let attachment = Attachment::new(file_name, bytes.to_vec());
        return Ok(match content_type {
            Some(content_type) => attachment.with_content_type(content_type),
            None => attachment,
        });
    }
    Err(ApiError::BadRequest(format!(
        "multipart field `{UPLOAD_FIELD}` is required"
    )))
}

async fn upload_document(
    State(state): State<AppState>,
    CurrentViewer(viewer): CurrentViewer,
    Path((session_id, kind)): Path<(String, String)>,
    multipart: Multipart,
) -> ApiResult<WizardView> {
    let kind: DocumentKind = kind.parse()?;
    let file = read_upload(multipart).await?;
    info!(session_id = %session_id, kind = ?kind, size = file.len(), "Document received");
    let session = state
        .runner
        .attach(&session_id, &viewer, kind, Some(file))
        .await?;
    Ok(Json(WizardView::pending(&session)))
}

async fn remove_document(
    State(state): State<AppState>,
    CurrentViewer(viewer): CurrentViewer,
    Path((session_id, kind)): Path<(String, String)>,
) -> ApiResult<WizardView> {
    let kind: DocumentKind = kind.parse()?;
    let session = state.runner.attach(&session_id, &viewer, kind, None).await?;
    Ok(Json(WizardView::pending(&session)))
}

async fn advance(
    State(state): State<AppState>,
    CurrentViewer(viewer): CurrentViewer,
    Path(session_id): Path<String>,
) -> ApiResult<StepResponse> {
    let (session, result) = state.runner.advance(&session_id, &viewer).await?;
    Ok(Json(StepResponse {
        result,
        wizard: WizardView::pending(&session),
    }))
}

async fn retreat(
    State(state): State<AppState>,
    CurrentViewer(viewer): CurrentViewer,
    Path(session_id): Path<String>,
) -> ApiResult<StepResponse> {
    let (session, result) = state.runner.retreat(&session_id, &viewer).await?;
    Ok(Json(StepResponse {
        result,
        wizard: WizardView::pending(&session),
    }))
}

async fn reset(
    State(state): State<AppState>,
    CurrentViewer(viewer): CurrentViewer,
    Path(session_id): Path<String>,
) -> ApiResult<WizardView> {
    let session = state.runner.reset(&session_id, &viewer).await?;
    Ok(Json(WizardView::pending(&session)))
}

async fn submit(
    State(state): State<AppState>,
    CurrentViewer(viewer): CurrentViewer,
    Path(session_id): Path<String>,
) -> ApiResult<SubmitResponse> {
    let (session, outcome) = state.runner.submit(&session_id, &viewer).await?;
    Ok(Json(SubmitResponse {
        outcome: outcome.into(),
        wizard: WizardView::pending(&session),
    }))
}

async fn list_cases(
    State(state): State<AppState>,
    CurrentViewer(viewer): CurrentViewer,
) -> ApiResult<Vec<CaseSummary>> {
    Ok(Json(state.runner.list_cases(&viewer).await?))
}

async fn get_case(
    State(state): State<AppState>,
    CurrentViewer(viewer): CurrentViewer,
    Path(case_id): Path<i64>,
) -> ApiResult<Case> {
    Ok(Json(state.runner.get_case(&viewer, case_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{body::to_bytes, http::header::CONTENT_TYPE};
    use chrono::NaiveDate;
    use claim_intake::{
        Insurer, NewCase, VehicleBrand,
        wire::{BlobReceipt, CaseVehicle},
    };
    use std::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Default)]
    struct StubBackend {
        created: Mutex<Vec<NewCase>>,
        uploads: Mutex<Vec<String>>,
    }

    fn stored_case(id: i64, vehicles: Vec<CaseVehicle>) -> Case {
        Case {
            id,
            incident_date: NaiveDate::from_ymd_opt(2024, 5, 17).unwrap(),
            details: "Choque lateral en la avenida".to_string(),
            visible_damage: "Puerta hundida".to_string(),
            already_reported: false,
            policy_number: String::new(),
            insurer: "Seguros Sucre".to_string(),
            contractors: vec![],
            insured: vec![],
            vehicles,
            documents: vec![],
        }
    }

    #[async_trait]
    impl ClaimsBackend for StubBackend {
        async fn list_insurers(&self) -> claim_intake::Result<Vec<Insurer>> {
            Ok(vec![Insurer {
                id: 1,
                name: "Seguros Sucre".to_string(),
                identification_type: "RUC".to_string(),
                identification_number: "0990000000001".to_string(),
            }])
        }

        async fn list_vehicle_brands(&self) -> claim_intake::Result<Vec<VehicleBrand>> {
            Ok(vec![VehicleBrand {
                id: 10,
                brand: "Chevrolet".to_string(),
                model: "Aveo".to_string(),
                year: "2019".to_string(),
                plate: "GBA1234".to_string(),
            }])
        }

        async fn create_case(&self, case: &NewCase) -> claim_intake::Result<Case> {
            self.created.lock().unwrap().push(case.clone());
            Ok(stored_case(31, vec![]))
        }

        async fn upload_blob(
            &self,
            blob_name: &str,
            _file: &Attachment,
        ) -> claim_intake::Result<BlobReceipt> {
            self.uploads.lock().unwrap().push(blob_name.to_string());
            Ok(BlobReceipt {
                blob_name: blob_name.to_string(),
                data: "ok".to_string(),
            })
        }

        async fn list_cases(&self) -> claim_intake::Result<Vec<Case>> {
            Ok(vec![stored_case(31, vec![])])
        }

        async fn get_case(&self, id: i64) -> claim_intake::Result<Case> {
            Ok(stored_case(id, vec![]))
        }
    }

    fn app() -> (Router, Arc<StubBackend>) {
        let backend = Arc::new(StubBackend::default());
        (build_router(AppState::new(backend.clone())), backend)
    }

    async fn read(response: Response) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(ACCOUNT_HEADER, "acc-1");
        let body = match body {
            Some(json) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        read(response).await
    }

    async fn upload(app: &Router, session_id: &str, kind: &str, file_name: &str) -> StatusCode {
        let boundary = "claim-boundary";
        let mut body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(b"%PDF-1.4");
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method("PUT")
            .uri(format!("/wizard/{session_id}/documents/{kind}"))
            .header(ACCOUNT_HEADER, "acc-1")
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
            .body(Body::from(body))
            .unwrap();
        app.clone().oneshot(request).await.unwrap().status()
    }

    async fn new_session(app: &Router) -> String {
        let (status, body) = call(app, "POST", "/wizard", None).await;
        assert_eq!(status, StatusCode::CREATED);
        body["session_id"].as_str().unwrap().to_string()
    }

    fn complete_fields() -> Value {
        json!({
            "fields": {
                "client.identificationNumber": "0912345678",
                "client.contractorName": "Juan Pérez",
                "client.insuredName": "María Gómez",
                "client.policyNumber": "POL123",
                "client.insurerId": 1,
                "client.residence": "Guayaquil",
                "vehicle.plate": "GBA1234",
                "vehicle.brandId": "10",
                "vehicle.year": "2019",
                "incident.date": "2024-05-17",
                "incident.details": "Choque lateral en la avenida",
                "incident.visibleDamage": "Puerta hundida"
            }
        })
    }

    #[tokio::test]
    async fn health_reports_healthy_with_a_correlation_id() {
        let (app, _) = app();
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert!(response.headers().contains_key(CORRELATION_HEADER));
        let (status, body) = read(response).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn wizard_routes_require_an_account() {
        let (app, _) = app();
        let request = Request::builder()
            .method("POST")
            .uri("/wizard")
            .body(Body::empty())
            .unwrap();
        let (status, body) = read(app.oneshot(request).await.unwrap()).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn new_wizard_starts_on_client_with_references() {
        let (app, _) = app();
        let (status, body) = call(&app, "POST", "/wizard", None).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["step"], "client");
        assert_eq!(body["step_label"], "Cliente");
        assert_eq!(body["references"]["insurers"][0]["nombre_contratante"], "Seguros Sucre");
        assert_eq!(body["violations"], json!({}));
    }

    #[tokio::test]
    async fn blocked_advance_reports_touched_violations() {
        let (app, _) = app();
        let id = new_session(&app).await;

        let (status, body) = call(&app, "POST", &format!("/wizard/{id}/advance"), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["next_action"], "wait_for_input");
        assert_eq!(
            body["result"]["violations"]["client.identificationNumber"]["message"],
            "Requerido"
        );
        assert_eq!(body["wizard"]["step"], "client");
        assert!(body["wizard"]["violations"]["client.residence"].is_object());
    }

    #[tokio::test]
    async fn full_claim_is_submitted_once() {
        let (app, backend) = app();
        let id = new_session(&app).await;

        let (status, _) = call(&app, "PATCH", &format!("/wizard/{id}/fields"), Some(complete_fields())).await;
        assert_eq!(status, StatusCode::OK);
        for (kind, name) in [("id", "cedula.pdf"), ("reg", "matricula.pdf"), ("lic", "licencia.pdf")] {
            assert_eq!(upload(&app, &id, kind, name).await, StatusCode::OK);
        }
        for expected in ["vehicle", "incident", "documents"] {
            let (_, body) = call(&app, "POST", &format!("/wizard/{id}/advance"), None).await;
            assert_eq!(body["result"]["step"], expected);
        }

        let (status, body) = call(&app, "POST", &format!("/wizard/{id}/submit"), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "submitted");
        assert_eq!(body["report"]["case"]["id"], 31);
        assert_eq!(body["wizard"]["step"], "success");
        assert!(body["wizard"]["draft"]["documents"]["identity"].is_null());
        assert_eq!(backend.created.lock().unwrap().len(), 1);
        assert_eq!(
            *backend.uploads.lock().unwrap(),
            ["31_id_cedula.pdf", "31_reg_matricula.pdf", "31_lic_licencia.pdf"]
        );

        let (_, view) = call(&app, "GET", &format!("/wizard/{id}"), None).await;
        assert_eq!(
            view["notifications"][0]["message"],
            "El caso de seguro ha sido creado correctamente"
        );
        let (_, view) = call(&app, "GET", &format!("/wizard/{id}"), None).await;
        assert_eq!(view["notifications"], json!([]));

        let (status, body) = call(&app, "POST", &format!("/wizard/{id}/submit"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "Acción no permitida en este paso");
        assert_eq!(backend.created.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn discarded_wizard_is_no_longer_served() {
        let (app, _) = app();
        let id = new_session(&app).await;
        assert_eq!(upload(&app, &id, "id", "cedula.pdf").await, StatusCode::OK);

        let (status, _) = call(&app, "DELETE", &format!("/wizard/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = call(&app, "GET", &format!("/wizard/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "La sesión no existe");
        let (status, _) = call(&app, "DELETE", &format!("/wizard/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn submit_without_documents_is_blocked() {
        let (app, backend) = app();
        let id = new_session(&app).await;
        call(&app, "PATCH", &format!("/wizard/{id}/fields"), Some(complete_fields())).await;
        for _ in 0..3 {
            call(&app, "POST", &format!("/wizard/{id}/advance"), None).await;
        }

        let (status, body) = call(&app, "POST", &format!("/wizard/{id}/submit"), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "blocked");
        assert_eq!(body["step"], "documents");
        assert_eq!(body["violations"]["documents.idFile"]["rule"], "required");
        assert!(backend.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_input_maps_to_client_errors() {
        let (app, _) = app();
        let id = new_session(&app).await;

        let (status, _) = call(
            &app,
            "PATCH",
            &format!("/wizard/{id}/fields"),
            Some(json!({ "fields": { "client.nickname": "x" } })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, "POST", &format!("/wizard/{id}/retreat"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        assert_eq!(upload(&app, &id, "passport", "p.pdf").await, StatusCode::BAD_REQUEST);

        let (status, body) = call(&app, "GET", "/wizard/not-a-session", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "La sesión no existe");
    }

    #[tokio::test]
    async fn only_members_list_cases() {
        let (app, _) = app();

        let (status, body) = call(&app, "GET", "/cases", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["plate"], "N/A");
        assert_eq!(body[0]["status"], "No reportado");

        let request = Request::builder()
            .uri("/cases")
            .header(ACCOUNT_HEADER, "acc-2")
            .header(USER_TYPE_HEADER, "guest")
            .body(Body::empty())
            .unwrap();
        let (status, _) = read(app.clone().oneshot(request).await.unwrap()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = call(&app, "GET", "/cases/8", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], 8);
    }

    #[tokio::test]
    async fn whoami_reports_landing() {
        let (app, _) = app();
        let (_, body) = call(&app, "GET", "/me", None).await;
        assert_eq!(body["account_id"], "acc-1");
        assert_eq!(body["user_type"], "member");
        assert_eq!(body["landing"], "dashboard");
    }
}
