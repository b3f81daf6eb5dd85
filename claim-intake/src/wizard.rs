use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use tracing::{debug, info, warn};

use crate::{
    backend::ClaimsBackend,
    draft::{Attachment, ClaimDraft, DocumentKind, FieldPath},
    error::{Error, Result},
    reference::ReferenceData,
    step::{NextAction, Step, StepResult},
    submission::{SubmissionPipeline, SubmissionReport},
    validation::{Violations, validate_all, validate_step},
};

const REFERENCE_LOAD_FAILED: &str = "No se pudieron cargar los datos iniciales";
const CASE_CREATED: &str = "El caso de seguro ha sido creado correctamente";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Success,
    Error,
}

/// Transient user-facing message (a toast).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

/// The "submitting" flag. Clones share the flag, so every copy of a wizard
/// contends on the same lock.
#[derive(Debug, Clone, Default)]
pub struct SubmitLock(Arc<AtomicBool>);

impl SubmitLock {
    pub fn try_acquire(&self) -> Option<SubmitGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SubmitGuard(self.0.clone()))
    }

    pub fn is_held(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Held for the duration of a submission; releases the lock on drop.
#[derive(Debug)]
pub struct SubmitGuard(Arc<AtomicBool>);

impl Drop for SubmitGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Case created; the wizard is on `Success`
    Submitted(SubmissionReport),
    /// Some step failed validation; nothing was sent
    Blocked { step: Step, violations: Violations },
}

/// One claim being filled in: the draft, the active step, and which fields
/// have been touched.
#[derive(Debug, Clone)]
pub struct Wizard {
    draft: ClaimDraft,
    references: ReferenceData,
    step: Step,
    touched: HashSet<FieldPath>,
    notifications: Vec<Notification>,
    submit_lock: SubmitLock,
}

impl Wizard {
    pub fn new(references: ReferenceData) -> Self {
        Self {
            draft: ClaimDraft::new(),
            references,
            step: Step::Client,
            touched: HashSet::new(),
            notifications: Vec::new(),
            submit_lock: SubmitLock::default(),
        }
    }

    /// Load the reference lists and start on the Client step. A failed load
    /// leaves both lists empty and queues one notification.
    pub async fn mount(backend: &dyn ClaimsBackend) -> Self {
        match ReferenceData::load(backend).await {
            Ok(references) => Self::new(references),
            Err(e) => {
                warn!(error = %e, "Continuing with empty reference lists");
                let mut wizard = Self::new(ReferenceData::default());
                wizard.notify(NotificationLevel::Error, REFERENCE_LOAD_FAILED);
                wizard
            }
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn draft(&self) -> &ClaimDraft {
        &self.draft
    }

    pub fn references(&self) -> &ReferenceData {
        &self.references
    }

    pub fn is_touched(&self, field: FieldPath) -> bool {
        self.touched.contains(&field)
    }

    pub fn is_submitting(&self) -> bool {
        self.submit_lock.is_held()
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Drain queued notifications.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    fn notify(&mut self, level: NotificationLevel, message: impl Into<String>) {
        self.notifications.push(Notification {
            level,
            message: message.into(),
        });
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.is_submitting() {
            return Err(Error::SubmissionInProgress);
        }
        Ok(())
    }

    fn ensure_editable(&self, action: &'static str) -> Result<()> {
        self.ensure_idle()?;
        if self.step == Step::Success {
            return Err(Error::InvalidTransition {
                from: self.step,
                action,
            });
        }
        Ok(())
    }

    /// Write one user input into the draft.
    pub fn apply(&mut self, field: FieldPath, raw: &str) -> Result<()> {
        self.ensure_editable("edit")?;
        self.draft.apply(field, raw)
    }

    /// Stage or clear one of the three documents.
    pub fn attach(&mut self, kind: DocumentKind, file: Option<Attachment>) -> Result<()> {
        self.ensure_editable("attach")?;
        debug!(
            kind = ?kind,
            file_name = file.as_ref().map(|f| f.file_name.as_str()).unwrap_or_default(),
            "Document staged"
        );
        self.draft.attach(kind, file);
        Ok(())
    }

    fn touch(&mut self, step: Step) {
        self.touched.extend(step.fields().iter().copied());
    }

    /// Current violations of the active step, limited to touched fields.
    pub fn visible_violations(&self) -> Violations {
        validate_step(self.step, &self.draft, &self.references).touched_only(&self.touched)
    }

    /// Touch every field of the active step, validate the step, and move on
    /// only if it is clean.
    pub fn advance(&mut self) -> Result<StepResult> {
        self.ensure_idle()?;
        let next = self.step.next().ok_or(Error::InvalidTransition {
            from: self.step,
            action: "advance",
        })?;

        self.touch(self.step);
        let violations = validate_step(self.step, &self.draft, &self.references);
        if !violations.is_empty() {
            debug!(step = %self.step, violations = violations.len(), "Step blocked");
            return Ok(StepResult::blocked(self.step, violations));
        }

        info!(from = %self.step, to = %next, "Step advanced");
        self.step = next;
        Ok(StepResult::moved(next, NextAction::Continue))
    }

    /// Go back one step without validating.
    pub fn retreat(&mut self) -> Result<StepResult> {
        self.ensure_idle()?;
        let previous = self.step.previous().ok_or(Error::InvalidTransition {
            from: self.step,
            action: "retreat",
        })?;

        debug!(from = %self.step, to = %previous, "Step retreated");
        self.step = previous;
        Ok(StepResult::moved(previous, NextAction::GoBack))
    }

    /// Discard the draft and start a new claim on the Client step.
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_idle()?;
        self.draft = ClaimDraft::new();
        self.step = Step::Client;
        self.touched.clear();
        Ok(())
    }

    /// Take the submit lock, or fail if a submission is already outstanding.
    pub fn begin_submit(&self) -> Result<SubmitGuard> {
        self.submit_lock
            .try_acquire()
            .ok_or(Error::SubmissionInProgress)
    }

    /// Submit from the Documents step.
    pub async fn submit(&mut self, pipeline: &SubmissionPipeline) -> Result<SubmitOutcome> {
        let guard = self.begin_submit()?;
        self.submit_locked(&guard, pipeline).await
    }

    /// Submit while the caller holds the lock, so it can keep the lock past
    /// the submission itself (for instance until the result is stored).
    pub async fn submit_locked(
        &mut self,
        _guard: &SubmitGuard,
        pipeline: &SubmissionPipeline,
    ) -> Result<SubmitOutcome> {
        if self.step != Step::Documents {
            return Err(Error::InvalidTransition {
                from: self.step,
                action: "submit",
            });
        }

        self.touch(Step::Documents);
        if let Some((step, violations)) = validate_all(&self.draft, &self.references) {
            debug!(step = %step, violations = violations.len(), "Submission blocked");
            self.touch(step);
            return Ok(SubmitOutcome::Blocked { step, violations });
        }

        match pipeline.run(&self.draft, &self.references).await {
            Ok(report) => {
                info!(
                    case_id = report.case_id(),
                    failed_uploads = report.failed_uploads.len(),
                    "Claim submitted"
                );
                // the claim now lives in the backend; drop the staged bytes
                self.draft = ClaimDraft::new();
                self.touched.clear();
                self.step = Step::Success;
                self.notify(NotificationLevel::Success, CASE_CREATED);
                Ok(SubmitOutcome::Submitted(report))
            }
            Err(e) => {
                self.notify(NotificationLevel::Error, e.user_message());
                Err(e)
            }
        }
    }
}
