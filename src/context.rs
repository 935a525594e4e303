use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::PrerequisiteError;
use crate::progress::{NoProgress, ProgressReporter};
use crate::verifier::VerifierClient;

/// Everything a run shares across fixture sets.
///
/// Passed explicitly into the orchestrator so independent runs never share
/// ambient state.
#[derive(Clone)]
pub struct RunContext {
    pub verifier: Arc<dyn VerifierClient>,
    pub injection: InjectionGate,
    pub progress: Arc<dyn ProgressReporter>,
    /// Maximum number of verification calls in flight per fixture set.
    pub bound: NonZeroUsize,
}

impl RunContext {
    /// A context with injection already complete and progress reporting off.
    pub fn new(verifier: Arc<dyn VerifierClient>, bound: NonZeroUsize) -> Self {
        Self {
            verifier,
            injection: InjectionGate::ready(),
            progress: Arc::new(NoProgress),
            bound,
        }
    }

    pub fn with_injection(mut self, injection: InjectionGate) -> Self {
        self.injection = injection;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }
}

/// Opens once upstream message injection has completed.
///
/// Dispatch for a fixture set never starts before the gate is open.
#[derive(Clone, Debug)]
pub struct InjectionGate {
    rx: watch::Receiver<bool>,
}

/// Completes the injection paired with an [`InjectionGate`].
#[derive(Debug)]
pub struct InjectionSignal {
    tx: watch::Sender<bool>,
}

impl InjectionGate {
    pub fn ready() -> Self {
        let (_, rx) = watch::channel(true);
        Self { rx }
    }

    pub fn pending() -> (InjectionSignal, Self) {
        let (tx, rx) = watch::channel(false);
        (InjectionSignal { tx }, Self { rx })
    }

    pub fn is_open(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until injection completes. Fails if the signal was dropped first.
    pub async fn wait(&self, set: &str) -> Result<(), PrerequisiteError> {
        if self.is_open() {
            return Ok(());
        }
        let mut rx = self.rx.clone();
        rx.wait_for(|done| *done)
            .await
            .map(|_| ())
            .map_err(|_| PrerequisiteError {
                set: set.to_string(),
            })
    }
}

impl InjectionSignal {
    pub fn complete(self) {
        self.tx.send_replace(true);
    }
}
