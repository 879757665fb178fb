use crate::error::{UploadError, UploadResult};
use bytes::Bytes;
use derivative::Derivative;
use std::fmt;
use uuid::Uuid;

/// Client-side key for a staged file. Never sent to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CandidateId(Uuid);

impl CandidateId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CandidateId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A file staged for upload.
///
/// The size is derived from the payload at construction and the fields are
/// read-only afterwards, so what gets validated is what gets sent.
///
/// The payload is handed to exactly one request; a retry stages the file again.
///
/// ```compile_fail
/// use gestion_uploader::upload::UploadCandidate;
///
/// let candidate = UploadCandidate::new("a.pdf", "application/pdf", vec![0u8; 4]);
/// let resend = candidate.clone();
/// ```
#[derive(Derivative)]
#[derivative(Debug)]
pub struct UploadCandidate {
    identity: CandidateId,
    display_name: String,
    mime_type: String,
    size_bytes: u64,
    #[derivative(Debug = "ignore")]
    payload: Bytes,
}

impl UploadCandidate {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Self {
        let payload = payload.into();
        Self {
            identity: CandidateId::new(),
            display_name: file_name.into(),
            mime_type: mime_type.into(),
            size_bytes: payload.len() as u64,
            payload,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn identity(&self) -> CandidateId {
        self.identity
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Hands the payload over to a request, consuming the candidate.
    pub(crate) fn into_parts(self) -> (CandidateId, String, String, Bytes) {
        (self.identity, self.display_name, self.mime_type, self.payload)
    }
}

/// Who is uploading and which record the files belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadContext {
    owner_record_id: u64,
    actor_id: u64,
    workflow_id: u64,
    unit_id: Option<u64>,
}

impl UploadContext {
    pub fn new(owner_record_id: u64, actor_id: u64) -> UploadResult<Self> {
        if owner_record_id == 0 {
            return Err(UploadError::InvalidContext(
                "owner record id is required".to_string(),
            ));
        }
        if actor_id == 0 {
            return Err(UploadError::InvalidContext("actor id is required".to_string()));
        }

        Ok(Self {
            owner_record_id,
            actor_id,
            workflow_id: 0,
            unit_id: None,
        })
    }

    pub fn with_workflow(mut self, workflow_id: u64) -> Self {
        self.workflow_id = workflow_id;
        self
    }

    pub fn with_unit(mut self, unit_id: u64) -> Self {
        self.unit_id = Some(unit_id);
        self
    }

    pub fn owner_record_id(&self) -> u64 {
        self.owner_record_id
    }

    pub fn actor_id(&self) -> u64 {
        self.actor_id
    }

    pub fn workflow_id(&self) -> u64 {
        self.workflow_id
    }

    pub fn unit_id(&self) -> Option<u64> {
        self.unit_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Succeeded,
    Failed,
}

/// Terminal result of one candidate's upload attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub identity: CandidateId,
    pub display_name: String,
    pub status: OutcomeStatus,
    pub server_reference: Option<String>,
    pub failure_reason: Option<String>,
}

impl UploadOutcome {
    pub fn succeeded(
        identity: CandidateId,
        display_name: impl Into<String>,
        server_reference: impl Into<String>,
    ) -> Self {
        Self {
            identity,
            display_name: display_name.into(),
            status: OutcomeStatus::Succeeded,
            server_reference: Some(server_reference.into()),
            failure_reason: None,
        }
    }

    pub fn failed(
        identity: CandidateId,
        display_name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            identity,
            display_name: display_name.into(),
            status: OutcomeStatus::Failed,
            server_reference: None,
            failure_reason: Some(reason.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Succeeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_size_tracks_payload() {
        let candidate = UploadCandidate::new("acta.pdf", "application/pdf", vec![0u8; 2048]);
        assert_eq!(candidate.size_bytes(), 2048);
        assert_eq!(candidate.display_name(), "acta.pdf");

        let renamed = candidate.with_display_name("Acta de inicio.pdf");
        assert_eq!(renamed.display_name(), "Acta de inicio.pdf");
        assert_eq!(renamed.size_bytes(), 2048);
    }

    #[test]
    fn candidates_get_distinct_identities() {
        let a = UploadCandidate::new("a.pdf", "application/pdf", Vec::new());
        let b = UploadCandidate::new("a.pdf", "application/pdf", Vec::new());
        assert_ne!(a.identity(), b.identity());
    }

    #[test]
    fn debug_output_skips_payload() {
        let candidate = UploadCandidate::new("a.pdf", "application/pdf", vec![7u8; 16]);
        let debug = format!("{:?}", candidate);
        assert!(debug.contains("a.pdf"));
        assert!(!debug.contains("payload"));
    }

    #[test]
    fn context_requires_owner_and_actor() {
        assert!(matches!(
            UploadContext::new(0, 5),
            Err(UploadError::InvalidContext(_))
        ));
        assert!(matches!(
            UploadContext::new(42, 0),
            Err(UploadError::InvalidContext(_))
        ));

        let context = UploadContext::new(42, 5).unwrap().with_unit(3);
        assert_eq!(context.workflow_id(), 0);
        assert_eq!(context.unit_id(), Some(3));
    }

    #[test]
    fn outcome_fields_follow_status() {
        let id = CandidateId::new();
        let ok = UploadOutcome::succeeded(id, "a.pdf", "101");
        assert!(ok.is_success());
        assert_eq!(ok.server_reference.as_deref(), Some("101"));
        assert!(ok.failure_reason.is_none());

        let failed = UploadOutcome::failed(id, "a.pdf", "network down");
        assert!(!failed.is_success());
        assert!(failed.server_reference.is_none());
        assert_eq!(failed.failure_reason.as_deref(), Some("network down"));
    }
}
