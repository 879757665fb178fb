use crate::upload::progress::{ProgressEvent, ProgressKind, ProgressObserver};
use crate::upload::request::{RequestSettings, UploadRequest};
use crate::upload::response::into_reference;
use crate::upload::transport::{ProgressFn, UploadTransport};
use crate::upload::types::{CandidateId, UploadCandidate, UploadContext, UploadOutcome};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const CANCELLED_REASON: &str = "upload cancelled; server state unknown";
pub const UNKNOWN_FAILURE_REASON: &str = "unknown upload error";

/// Uploads a validated batch, one request per candidate, all in flight at once.
pub struct UploadOrchestrator<T> {
    transport: T,
    settings: RequestSettings,
    observer: Arc<dyn ProgressObserver>,
}

impl<T: UploadTransport> UploadOrchestrator<T> {
    pub fn new(transport: T, settings: RequestSettings) -> Self {
        Self {
            transport,
            settings,
            observer: Arc::new(()),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns one outcome per candidate, in input order. Never fails as a
    /// whole: transport problems end up in `Failed` outcomes.
    pub async fn upload(
        &self,
        candidates: Vec<UploadCandidate>,
        context: &UploadContext,
    ) -> Vec<UploadOutcome> {
        self.upload_cancellable(candidates, context, CancellationToken::new())
            .await
    }

    /// Like [`upload`](Self::upload), but stops waiting once `cancel` fires.
    ///
    /// Outcomes that settled before cancellation are kept. The rest are
    /// reported as failed; their requests may already have reached the
    /// server, so callers should re-read the owner record to reconcile.
    pub async fn upload_cancellable(
        &self,
        candidates: Vec<UploadCandidate>,
        context: &UploadContext,
        cancel: CancellationToken,
    ) -> Vec<UploadOutcome> {
        info!(
            files = candidates.len(),
            gestion_id = context.owner_record_id(),
            "Starting upload batch"
        );

        let labels: Vec<(CandidateId, String)> = candidates
            .iter()
            .map(|c| (c.identity(), c.display_name().to_string()))
            .collect();
        let mut slots: Vec<Option<UploadOutcome>> = vec![None; candidates.len()];

        let mut in_flight: FuturesUnordered<_> = candidates
            .into_iter()
            .enumerate()
            .map(|(index, candidate)| {
                let request = UploadRequest::build(candidate, context, &self.settings);
                async move { (index, self.upload_one(request).await) }
            })
            .collect();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(pending = in_flight.len(), "Upload batch cancelled");
                    break;
                }
                next = in_flight.next() => match next {
                    Some((index, outcome)) => slots[index] = Some(outcome),
                    None => break,
                },
            }
        }

        let outcomes: Vec<UploadOutcome> = slots
            .into_iter()
            .zip(labels)
            .map(|(slot, (identity, name))| {
                slot.unwrap_or_else(|| UploadOutcome::failed(identity, name, CANCELLED_REASON))
            })
            .collect();

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        info!(
            succeeded,
            failed = outcomes.len() - succeeded,
            "Upload batch finished"
        );

        outcomes
    }

    async fn upload_one(&self, request: UploadRequest) -> UploadOutcome {
        let identity = request.identity;
        let name = request.file_name.clone();

        let observer = self.observer.clone();
        let progress: ProgressFn = Arc::new(move |percent| {
            observer.on_event(ProgressEvent {
                identity,
                kind: ProgressKind::Progress(percent),
            })
        });

        debug!(file = %name, %identity, "Dispatching upload");

        let outcome = match self.transport.send(request, progress).await {
            Ok(body) => match into_reference(&body) {
                Ok(reference) => UploadOutcome::succeeded(identity, &name, reference),
                Err(e) => UploadOutcome::failed(identity, &name, reason(e.to_string())),
            },
            Err(e) => UploadOutcome::failed(identity, &name, reason(e.to_string())),
        };

        if let Some(reason) = &outcome.failure_reason {
            warn!(file = %name, %identity, reason = %reason, "Upload failed");
        }

        self.observer.on_event(ProgressEvent {
            identity,
            kind: ProgressKind::Settled(outcome.status),
        });

        outcome
    }
}

fn reason(message: String) -> String {
    if message.trim().is_empty() {
        UNKNOWN_FAILURE_REASON.to_string()
    } else {
        message
    }
}
