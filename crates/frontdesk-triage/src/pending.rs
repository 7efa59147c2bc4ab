//! In-flight triage requests.
//!
//! Each invocation gets its own worker thread and handle. Dropping a handle
//! abandons the result; the worker finishes on its own.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

use crate::suggestion::{suggest_or_none, TriageProvider, TriageRequest, TriageSuggestion};

/// Result of polling a pending request.
#[derive(Debug, Clone, PartialEq)]
pub enum TriagePoll {
    Pending,
    Ready(Option<TriageSuggestion>),
}

/// Handle to a single triage request.
pub struct PendingTriage {
    rx: Receiver<Option<TriageSuggestion>>,
    result: Option<Option<TriageSuggestion>>,
}

/// Start a triage request on a worker thread.
pub fn spawn_triage(provider: Arc<dyn TriageProvider>, request: TriageRequest) -> PendingTriage {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let suggestion = suggest_or_none(provider.as_ref(), &request);
        // Receiver may be gone if the caller lost interest
        let _ = tx.send(suggestion);
    });

    PendingTriage { rx, result: None }
}

impl PendingTriage {
    /// Poll without blocking.
    pub fn try_result(&mut self) -> TriagePoll {
        if let Some(result) = &self.result {
            return TriagePoll::Ready(result.clone());
        }

        match self.rx.try_recv() {
            Ok(suggestion) => {
                self.result = Some(suggestion.clone());
                TriagePoll::Ready(suggestion)
            }
            Err(TryRecvError::Empty) => TriagePoll::Pending,
            Err(TryRecvError::Disconnected) => {
                tracing::warn!("Triage worker exited without a result");
                self.result = Some(None);
                TriagePoll::Ready(None)
            }
        }
    }

    /// Block until the request completes.
    pub fn wait(self) -> Option<TriageSuggestion> {
        if let Some(result) = self.result {
            return result;
        }
        self.rx.recv().unwrap_or(None)
    }
}
