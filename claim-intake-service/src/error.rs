use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use claim_intake::Error;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Intake(#[from] Error),

    #[error("missing x-account-id header")]
    Unauthenticated,

    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Intake(e) => match e {
                Error::SessionNotFound(_) => StatusCode::NOT_FOUND,
                Error::Backend { status: 404, .. } => StatusCode::NOT_FOUND,
                Error::Forbidden(_) => StatusCode::FORBIDDEN,
                Error::SubmissionInProgress | Error::InvalidTransition { .. } => StatusCode::CONFLICT,
                Error::UnknownField(_) | Error::InvalidFieldValue { .. } => StatusCode::BAD_REQUEST,
                Error::MissingIncidentDate | Error::UnknownReference { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                Error::Http(_) | Error::Backend { .. } => StatusCode::BAD_GATEWAY,
                Error::InvalidUrl(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn user_message(&self) -> &'static str {
        match self {
            ApiError::Intake(e) => e.user_message(),
            ApiError::Unauthenticated => "Inicie sesión para continuar",
            ApiError::BadRequest(_) => "Solicitud inválida",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": self.to_string(),
            "message": self.user_message(),
        }));
        (status, body).into_response()
    }
}
