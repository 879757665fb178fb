use crate::upload::types::{CandidateId, OutcomeStatus, UploadOutcome};
use std::collections::HashMap;
use std::fmt;
use std::sync::mpsc::Sender;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressKind {
    /// Cumulative percentage of the payload handed to the network.
    Progress(u8),
    Settled(OutcomeStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub identity: CandidateId,
    pub kind: ProgressKind,
}

/// Advisory notifications while a batch is in flight.
pub trait ProgressObserver: Send + Sync {
    fn on_event(&self, event: ProgressEvent);
}

impl ProgressObserver for () {
    fn on_event(&self, _event: ProgressEvent) {}
}

impl ProgressObserver for Sender<ProgressEvent> {
    fn on_event(&self, event: ProgressEvent) {
        // A dropped receiver only means nobody is watching.
        self.send(event).unwrap_or_default();
    }
}

/// Running view of a batch built from progress events.
#[derive(Debug, Clone, Default)]
pub struct BatchProgress {
    total: usize,
    percents: HashMap<CandidateId, u8>,
    settled: HashMap<CandidateId, OutcomeStatus>,
}

impl BatchProgress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn apply(&mut self, event: ProgressEvent) {
        match event.kind {
            ProgressKind::Progress(percent) => {
                let entry = self.percents.entry(event.identity).or_insert(0);
                *entry = (*entry).max(percent.min(100));
            }
            ProgressKind::Settled(status) => {
                self.percents.insert(event.identity, 100);
                self.settled.insert(event.identity, status);
            }
        }
    }

    pub fn file_percent(&self, identity: &CandidateId) -> u8 {
        self.percents.get(identity).copied().unwrap_or(0)
    }

    pub fn completed(&self) -> usize {
        self.settled.len()
    }

    pub fn succeeded(&self) -> usize {
        self.count(OutcomeStatus::Succeeded)
    }

    pub fn failed(&self) -> usize {
        self.count(OutcomeStatus::Failed)
    }

    fn count(&self, status: OutcomeStatus) -> usize {
        self.settled.values().filter(|s| **s == status).count()
    }

    pub fn is_finished(&self) -> bool {
        self.completed() >= self.total
    }

    /// Overall progress in `[0, 1]`, averaging per-file percentages.
    pub fn percentage(&self) -> f32 {
        if self.total == 0 {
            return 1.0;
        }
        let sum: u32 = self.percents.values().map(|p| *p as u32).sum();
        (sum as f32 / (self.total as f32 * 100.0)).min(1.0)
    }

    pub fn status_text(&self) -> String {
        if self.is_finished() {
            format!(
                "Final Status: {}/{} files | Success: {} | Failed: {}",
                self.completed(),
                self.total,
                self.succeeded(),
                self.failed()
            )
        } else {
            format!(
                "Progress: {}/{} files | Success: {} | Failed: {}",
                self.completed(),
                self.total,
                self.succeeded(),
                self.failed()
            )
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Empty,
    Succeeded,
    PartialFailure,
    Failed,
}

/// Caller-side classification of a finished batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    failed: Vec<CandidateId>,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[UploadOutcome]) -> Self {
        let failed: Vec<_> = outcomes
            .iter()
            .filter(|outcome| !outcome.is_success())
            .map(|outcome| outcome.identity)
            .collect();

        Self {
            total: outcomes.len(),
            succeeded: outcomes.len() - failed.len(),
            failed,
        }
    }

    pub fn state(&self) -> BatchState {
        match (self.succeeded, self.failed.len()) {
            (0, 0) => BatchState::Empty,
            (_, 0) => BatchState::Succeeded,
            (0, _) => BatchState::Failed,
            _ => BatchState::PartialFailure,
        }
    }

    /// Candidates the caller may rebuild and resubmit.
    pub fn failed_identities(&self) -> &[CandidateId] {
        &self.failed
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} files uploaded", self.succeeded, self.total)?;
        if !self.failed.is_empty() {
            write!(f, "; {} failed", self.failed.len())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    fn event(identity: CandidateId, kind: ProgressKind) -> ProgressEvent {
        ProgressEvent { identity, kind }
    }

    #[test]
    fn batch_progress_tracks_files_and_totals() {
        let (a, b) = (CandidateId::new(), CandidateId::new());
        let mut progress = BatchProgress::new(2);

        progress.apply(event(a, ProgressKind::Progress(50)));
        progress.apply(event(a, ProgressKind::Progress(30)));
        assert_eq!(progress.file_percent(&a), 50);
        assert_eq!(progress.percentage(), 0.25);
        assert!(progress.status_text().starts_with("Progress: 0/2"));

        progress.apply(event(a, ProgressKind::Settled(OutcomeStatus::Succeeded)));
        progress.apply(event(b, ProgressKind::Settled(OutcomeStatus::Failed)));

        assert!(progress.is_finished());
        assert_eq!(progress.succeeded(), 1);
        assert_eq!(progress.failed(), 1);
        assert_eq!(progress.percentage(), 1.0);
        assert_eq!(
            progress.status_text(),
            "Final Status: 2/2 files | Success: 1 | Failed: 1"
        );
    }

    #[test]
    fn channel_observer_forwards_and_tolerates_closed_receiver() {
        let (sender, receiver) = channel();
        let id = CandidateId::new();
        sender.on_event(event(id, ProgressKind::Progress(10)));
        assert_eq!(receiver.recv().unwrap().kind, ProgressKind::Progress(10));

        drop(receiver);
        sender.on_event(event(id, ProgressKind::Progress(20)));
    }

    #[test]
    fn summary_classifies_batches() {
        let ok = |n: &str| UploadOutcome::succeeded(CandidateId::new(), n, "1");
        let bad = |n: &str| UploadOutcome::failed(CandidateId::new(), n, "boom");

        assert_eq!(BatchSummary::from_outcomes(&[]).state(), BatchState::Empty);
        assert_eq!(
            BatchSummary::from_outcomes(&[ok("a"), ok("b")]).state(),
            BatchState::Succeeded
        );
        assert_eq!(
            BatchSummary::from_outcomes(&[bad("a")]).state(),
            BatchState::Failed
        );

        let mut outcomes: Vec<_> = (0..6).map(|i| ok(&i.to_string())).collect();
        outcomes.push(bad("x"));
        outcomes.push(bad("y"));
        let summary = BatchSummary::from_outcomes(&outcomes);
        assert_eq!(summary.state(), BatchState::PartialFailure);
        assert_eq!(summary.failed_identities().len(), 2);
        assert_eq!(summary.to_string(), "6 of 8 files uploaded; 2 failed");
    }
}
