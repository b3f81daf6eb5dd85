use thiserror::Error;

use crate::{draft::FieldPath, step::Step};

pub type Result<T> = std::result::Result<T, Error>;

/// Operational failures. Field validation never lands here: a failed rule is a
/// [`crate::Violations`] entry, not an error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Backend { status: u16, body: String },

    #[error("invalid backend URL: {0}")]
    InvalidUrl(String),

    #[error("incident date is required before submitting")]
    MissingIncidentDate,

    #[error("{field} references an unknown entry: {value}")]
    UnknownReference { field: FieldPath, value: String },

    #[error("cannot {action} from step {from}")]
    InvalidTransition { from: Step, action: &'static str },

    #[error("a submission is already in progress")]
    SubmissionInProgress,

    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("invalid value for {field}: {value}")]
    InvalidFieldValue { field: FieldPath, value: String },

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("account {0} may not view cases")]
    Forbidden(String),
}

impl Error {
    /// Spanish notification text shown to the user for this failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::MissingIncidentDate => "La fecha del incidente es requerida.",
            Error::Http(_) | Error::Backend { .. } | Error::UnknownReference { .. } => {
                "Hubo un problema al crear el caso"
            }
            Error::SubmissionInProgress => "La solicitud ya se está enviando",
            Error::InvalidTransition { .. } => "Acción no permitida en este paso",
            Error::UnknownField(_) | Error::InvalidFieldValue { .. } => "Valor inválido",
            Error::SessionNotFound(_) => "La sesión no existe",
            Error::Forbidden(_) => "No tiene acceso a los casos",
            Error::InvalidUrl(_) => "Error interno",
        }
    }
}
