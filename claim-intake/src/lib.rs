pub mod access;
pub mod backend;
pub mod config;
pub mod dashboard;
pub mod draft;
pub mod error;
pub mod reference;
pub mod runner;
pub mod step;
pub mod storage;
pub mod submission;
pub mod validation;
pub mod wire;
pub mod wizard;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use access::{Landing, UserType, Viewer};
pub use backend::{ClaimsBackend, HttpClaimsBackend};
pub use config::BackendConfig;
pub use dashboard::{CaseSummary, ReportStatus};
pub use draft::{Attachment, BrandSelection, ClaimDraft, DocumentKind, FieldPath, IdentificationType};
pub use error::{Error, Result};
pub use reference::{Insurer, ReferenceData, VehicleBrand};
pub use runner::WizardRunner;
pub use step::{NextAction, Step, StepResult};
pub use storage::{InMemorySessionStorage, SessionStorage, WizardSession};
pub use submission::{SubmissionPipeline, SubmissionReport};
pub use validation::{Rule, Violation, Violations, validate_all, validate_step};
pub use wire::{Case, NewCase};
pub use wizard::{Notification, NotificationLevel, SubmitOutcome, Wizard};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingBackend, references};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_wizard_refuses_to_skip_ahead() {
        let backend = Arc::new(RecordingBackend::new(1));
        let pipeline = SubmissionPipeline::new(backend.clone());
        let mut wizard = Wizard::new(references());

        wizard.apply(FieldPath::ModelYear, "abcd").unwrap();
        wizard.apply(FieldPath::IdentificationNumber, "12").unwrap();
        let result = wizard.advance().unwrap();

        assert_eq!(result.next_action, NextAction::WaitForInput);
        assert_eq!(
            result.violations.rule(FieldPath::IdentificationNumber),
            Some(Rule::MinLength(9))
        );
        // vehicle fields are not judged on the client step
        assert!(result.violations.get(FieldPath::ModelYear).is_none());
        assert!(matches!(
            wizard.submit(&pipeline).await,
            Err(Error::InvalidTransition { from: Step::Client, .. })
        ));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_session_storage() {
        let storage = InMemorySessionStorage::new();
        let session = WizardSession::new("acc-1", Wizard::new(ReferenceData::default()));

        storage.save(session.clone()).await.unwrap();
        let retrieved = storage.get(&session.id).await.unwrap();
        assert!(retrieved.is_some());
    }
}
