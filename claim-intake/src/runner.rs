//! WizardRunner – loads a session, applies exactly **one** wizard operation, and persists the
//! updated session back to storage.
//!
//! Web handlers call one runner method per request; the session is saved for the next
//! roundtrip. Failed operations leave the stored session untouched, except `submit`, which
//! always stores the outcome so the queued notification reaches the user.
//!
//! Sessions belong to the account that opened them. A session requested by another account is
//! reported as not found.

use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    access::Viewer,
    backend::ClaimsBackend,
    dashboard::{CaseSummary, summarize},
    draft::{Attachment, DocumentKind, FieldPath},
    error::{Error, Result},
    step::StepResult,
    storage::{SessionStorage, WizardSession},
    submission::SubmissionPipeline,
    wire::Case,
    wizard::{Notification, SubmitOutcome, Wizard},
};

/// High-level helper that orchestrates the _load → apply → save_ pattern.
#[derive(Clone)]
pub struct WizardRunner {
    storage: Arc<dyn SessionStorage>,
    pipeline: SubmissionPipeline,
}

impl WizardRunner {
    pub fn new(backend: Arc<dyn ClaimsBackend>, storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            storage,
            pipeline: SubmissionPipeline::new(backend),
        }
    }

    fn backend(&self) -> &dyn ClaimsBackend {
        self.pipeline.backend().as_ref()
    }

    /// Mount a fresh wizard (reference data included) and store it as a new session.
    pub async fn start(&self, viewer: &Viewer) -> Result<WizardSession> {
        let wizard = Wizard::mount(self.backend()).await;
        let session = WizardSession::new(viewer.account_id.clone(), wizard);
        info!(session_id = %session.id, account_id = %viewer.account_id, "Wizard session started");
        self.storage.save(session.clone()).await?;
        Ok(session)
    }

    async fn load(&self, session_id: &str, viewer: &Viewer) -> Result<WizardSession> {
        self.storage
            .get(session_id)
            .await?
            .filter(|session| session.account_id == viewer.account_id)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))
    }

    /// Run `operation` against the stored wizard and save the result if it succeeded.
    async fn update<T>(
        &self,
        session_id: &str,
        viewer: &Viewer,
        operation: impl FnOnce(&mut Wizard) -> Result<T>,
    ) -> Result<(WizardSession, T)> {
        let mut session = self.load(session_id, viewer).await?;
        let output = operation(&mut session.wizard)?;
        self.storage.save(session.clone()).await?;
        Ok((session, output))
    }

    /// Current session state plus the notifications queued since the last view.
    pub async fn view(
        &self,
        session_id: &str,
        viewer: &Viewer,
    ) -> Result<(WizardSession, Vec<Notification>)> {
        self.update(session_id, viewer, |wizard| Ok(wizard.take_notifications()))
            .await
    }

    /// Apply several field inputs in order. Either all are stored or none.
    pub async fn update_fields(
        &self,
        session_id: &str,
        viewer: &Viewer,
        fields: &[(FieldPath, String)],
    ) -> Result<WizardSession> {
        let (session, ()) = self
            .update(session_id, viewer, |wizard| {
                fields
                    .iter()
                    .try_for_each(|(field, raw)| wizard.apply(*field, raw))
            })
            .await?;
        debug!(session_id = %session_id, fields = fields.len(), "Fields updated");
        Ok(session)
    }

    pub async fn attach(
        &self,
        session_id: &str,
        viewer: &Viewer,
        kind: DocumentKind,
        file: Option<Attachment>,
    ) -> Result<WizardSession> {
        let (session, ()) = self
            .update(session_id, viewer, |wizard| wizard.attach(kind, file))
            .await?;
        Ok(session)
    }

    pub async fn advance(&self, session_id: &str, viewer: &Viewer) -> Result<(WizardSession, StepResult)> {
        self.update(session_id, viewer, Wizard::advance).await
    }

    pub async fn retreat(&self, session_id: &str, viewer: &Viewer) -> Result<(WizardSession, StepResult)> {
        self.update(session_id, viewer, Wizard::retreat).await
    }

    pub async fn reset(&self, session_id: &str, viewer: &Viewer) -> Result<WizardSession> {
        let (session, ()) = self.update(session_id, viewer, Wizard::reset).await?;
        info!(session_id = %session_id, "Wizard reset for a new case");
        Ok(session)
    }

    /// Submit the session's draft. The submit lock is held until the outcome is stored, so a
    /// concurrent request for the same session cannot start a second submission.
    pub async fn submit(&self, session_id: &str, viewer: &Viewer) -> Result<(WizardSession, SubmitOutcome)> {
        let mut session = self.load(session_id, viewer).await?;
        let guard = session.wizard.begin_submit()?;

        let outcome = session.wizard.submit_locked(&guard, &self.pipeline).await;
        self.storage.save(session.clone()).await?;
        drop(guard);

        outcome.map(|outcome| (session, outcome))
    }

    /// Drop the session and whatever it has staged. Refused while a submission is outstanding.
    pub async fn discard(&self, session_id: &str, viewer: &Viewer) -> Result<()> {
        let session = self.load(session_id, viewer).await?;
        if session.wizard.is_submitting() {
            return Err(Error::SubmissionInProgress);
        }
        self.storage.delete(session_id).await?;
        info!(session_id = %session_id, "Wizard session discarded");
        Ok(())
    }

    /// Dashboard rows for the case list. Members only.
    pub async fn list_cases(&self, viewer: &Viewer) -> Result<Vec<CaseSummary>> {
        ensure_can_view_cases(viewer)?;
        let cases = self.backend().list_cases().await?;
        Ok(summarize(&cases))
    }

    pub async fn get_case(&self, viewer: &Viewer, case_id: i64) -> Result<Case> {
        ensure_can_view_cases(viewer)?;
        self.backend().get_case(case_id).await
    }
}

fn ensure_can_view_cases(viewer: &Viewer) -> Result<()> {
    if viewer.can_view_cases() {
        Ok(())
    } else {
        Err(Error::Forbidden(viewer.account_id.clone()))
    }
}
