//! Create-then-upload write of a finished draft.
//!
//! The two phases are not atomic: once the case exists, a failed upload is
//! logged and listed in the report but the case is not rolled back.

use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::{
    backend::ClaimsBackend,
    draft::{Attachment, ClaimDraft, DocumentKind},
    error::{Error, Result},
    reference::ReferenceData,
    wire::{BlobReceipt, Case, NewCase},
};

/// A staged file waiting for its case id.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUpload<'a> {
    pub kind: DocumentKind,
    /// Tag-prefixed name, e.g. `reg_matricula.pdf`
    pub blob_name: String,
    pub file: &'a Attachment,
}

impl PendingUpload<'_> {
    /// Final blob name once the case exists: `{caseId}_{tag}{filename}`.
    pub fn blob_name_for(&self, case_id: i64) -> String {
        format!("{case_id}_{}", self.blob_name)
    }
}

/// Upload descriptors in identity, registration, license order; missing
/// documents are skipped.
pub fn pending_uploads(draft: &ClaimDraft) -> Vec<PendingUpload<'_>> {
    DocumentKind::ALL
        .into_iter()
        .filter_map(|kind| {
            draft.documents.get(kind).map(|file| PendingUpload {
                kind,
                blob_name: format!("{}{}", kind.tag(), file.file_name),
                file,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionReport {
    pub case: Case,
    pub uploaded: Vec<BlobReceipt>,
    /// Blob names whose upload failed after the case was created
    pub failed_uploads: Vec<String>,
}

impl SubmissionReport {
    pub fn case_id(&self) -> i64 {
        self.case.id
    }
}

#[derive(Clone)]
pub struct SubmissionPipeline {
    backend: Arc<dyn ClaimsBackend>,
}

impl SubmissionPipeline {
    pub fn new(backend: Arc<dyn ClaimsBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn ClaimsBackend> {
        &self.backend
    }

    /// Create the case, then upload each staged document under the returned
    /// case id. Nothing is uploaded unless the create call succeeds; upload
    /// failures do not fail the submission.
    pub async fn run(&self, draft: &ClaimDraft, references: &ReferenceData) -> Result<SubmissionReport> {
        if draft.incident.date.is_none() {
            return Err(Error::MissingIncidentDate);
        }

        let uploads = pending_uploads(draft);
        let new_case = NewCase::from_draft(draft, references)?;

        let case = self
            .backend
            .create_case(&new_case)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to create case"))?;

        info!(case_id = case.id, files = uploads.len(), "Case created, uploading documents");

        let mut uploaded = Vec::with_capacity(uploads.len());
        let mut failed_uploads = Vec::new();
        for upload in &uploads {
            let blob_name = upload.blob_name_for(case.id);
            match self.backend.upload_blob(&blob_name, upload.file).await {
                Ok(receipt) => uploaded.push(receipt),
                Err(e) => {
                    warn!(case_id = case.id, blob_name = %blob_name, error = %e, "Document upload failed");
                    failed_uploads.push(blob_name);
                }
            }
        }

        Ok(SubmissionReport {
            case,
            uploaded,
            failed_uploads,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingBackend, complete_draft, references};

    #[test]
    fn descriptors_are_tagged_and_ordered() {
        let draft = complete_draft();
        let uploads = pending_uploads(&draft);

        let names: Vec<_> = uploads.iter().map(|u| u.blob_name.as_str()).collect();
        assert_eq!(names, ["id_cedula.pdf", "reg_matricula.jpg", "lic_licencia.png"]);
        assert_eq!(uploads[1].blob_name_for(7), "7_reg_matricula.jpg");
    }

    #[tokio::test]
    async fn creates_once_then_uploads_every_document_under_the_case_id() {
        let backend = Arc::new(RecordingBackend::new(42));
        let pipeline = SubmissionPipeline::new(backend.clone());

        let report = pipeline.run(&complete_draft(), &references()).await.unwrap();

        assert_eq!(report.case_id(), 42);
        assert_eq!(backend.created().len(), 1);
        assert_eq!(
            backend.calls(),
            [
                "create_case",
                "upload:42_id_cedula.pdf",
                "upload:42_reg_matricula.jpg",
                "upload:42_lic_licencia.png",
            ]
        );
        assert_eq!(report.uploaded.len(), 3);
        assert!(report.failed_uploads.is_empty());
    }

    #[tokio::test]
    async fn failed_create_uploads_nothing() {
        let backend = Arc::new(RecordingBackend::new(42).failing_create());
        let pipeline = SubmissionPipeline::new(backend.clone());

        let err = pipeline.run(&complete_draft(), &references()).await.unwrap_err();

        assert!(matches!(err, Error::Backend { status: 500, .. }));
        assert_eq!(backend.calls(), ["create_case"]);
    }

    #[tokio::test]
    async fn missing_date_sends_nothing() {
        let backend = Arc::new(RecordingBackend::new(42));
        let pipeline = SubmissionPipeline::new(backend.clone());
        let mut draft = complete_draft();
        draft.incident.date = None;

        let err = pipeline.run(&draft, &references()).await.unwrap_err();

        assert!(matches!(err, Error::MissingIncidentDate));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn upload_failure_is_reported_but_not_fatal() {
        let backend = Arc::new(RecordingBackend::new(5).failing_upload("5_reg_matricula.jpg"));
        let pipeline = SubmissionPipeline::new(backend.clone());

        let report = pipeline.run(&complete_draft(), &references()).await.unwrap();

        assert_eq!(report.uploaded.len(), 2);
        assert_eq!(report.failed_uploads, ["5_reg_matricula.jpg"]);
        // the later license upload still went out
        assert_eq!(backend.calls().len(), 4);
    }
}
