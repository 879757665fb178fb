mod orchestrator;
mod progress;
mod request;
mod response;
mod staging;
mod transport;
mod types;
mod validator;

pub use orchestrator::{UploadOrchestrator, CANCELLED_REASON, UNKNOWN_FAILURE_REASON};
pub use progress::{
    BatchProgress, BatchState, BatchSummary, ProgressEvent, ProgressKind, ProgressObserver,
};
pub use request::{RequestSettings, UploadRequest, DEFAULT_ACTION, DEFAULT_STORAGE_ROOT};
pub use response::{extract_error_message, extract_reference, into_reference, is_error_body};
pub use staging::{collect_folder, stage_file, stage_paths, StagedBatch, StagedFile};
pub use transport::{ProgressFn, ReqwestTransport, UploadTransport};
pub use types::{CandidateId, OutcomeStatus, UploadCandidate, UploadContext, UploadOutcome};
pub use validator::{
    validate, ValidationResult, ValidationRules, DEFAULT_MAX_FILE_COUNT, DEFAULT_MAX_SIZE_BYTES,
    PDF_MIME_TYPE,
};
