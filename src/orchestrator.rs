use std::time::Instant;

use crate::asserter::assert_post_state;
use crate::context::RunContext;
use crate::error::RunError;
use crate::fixture::{FixtureSet, FixtureSource};
use crate::scheduler::Scheduler;

/// Lifecycle of one fixture set. `Passed` and `Failed` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Loading,
    Verifying,
    Passed,
    Failed,
}

impl RunState {
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Idle, Loading)
                | (Loading, Verifying)
                | (Loading, Failed)
                | (Verifying, Verifying)
                | (Verifying, Passed)
                | (Verifying, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Passed | RunState::Failed)
    }
}

/// Result of running one fixture set.
#[derive(Debug)]
pub struct RunOutcome {
    pub set: String,
    pub state: RunState,
    pub total: usize,
    /// Fixtures whose post-state matched.
    pub verified: usize,
    pub error: Option<RunError>,
}

impl RunOutcome {
    pub fn passed(&self) -> bool {
        self.state == RunState::Passed
    }
}

/// Aggregate of every fixture set in a run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<RunOutcome>,
}

impl RunSummary {
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(RunOutcome::passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &RunOutcome> {
        self.outcomes.iter().filter(|o| !o.passed())
    }

    pub fn log(&self) {
        let failed = self.failures().count();
        for outcome in self.failures() {
            if let Some(e) = &outcome.error {
                tracing::error!("FAILED {}: {}", outcome.set, e);
            }
        }
        tracing::info!(
            "{} fixture sets: {} passed, {} failed",
            self.outcomes.len(),
            self.outcomes.len() - failed,
            failed
        );
    }
}

struct SetRun {
    set: String,
    state: RunState,
    started: Instant,
}

impl SetRun {
    fn start(set: &str) -> Self {
        let mut run = Self {
            set: set.to_string(),
            state: RunState::Idle,
            started: Instant::now(),
        };
        run.advance(RunState::Loading);
        run
    }

    fn advance(&mut self, next: RunState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {:?} -> {:?} for {}",
            self.state,
            next,
            self.set
        );
        tracing::debug!("{}: {:?} -> {:?}", self.set, self.state, next);
        self.state = next;
    }

    fn fail(mut self, total: usize, verified: usize, error: RunError) -> RunOutcome {
        self.advance(RunState::Failed);
        tracing::error!("{} failed after {:?}: {}", self.set, self.started.elapsed(), error);
        RunOutcome {
            set: self.set,
            state: self.state,
            total,
            verified,
            error: Some(error),
        }
    }

    fn pass(mut self, total: usize) -> RunOutcome {
        self.advance(RunState::Passed);
        tracing::info!(
            "Passed {}: {} proofs in {:?}",
            self.set,
            total,
            self.started.elapsed()
        );
        RunOutcome {
            set: self.set,
            state: self.state,
            total,
            verified: total,
            error: None,
        }
    }
}

/// Drives fixture sets through load, verification and assertion.
pub struct Orchestrator {
    ctx: RunContext,
}

impl Orchestrator {
    pub fn new(ctx: RunContext) -> Self {
        Self { ctx }
    }

    /// Run every source in order. A failed set never stops the others.
    pub async fn run_all(&self, sources: &[FixtureSource]) -> RunSummary {
        let mut summary = RunSummary::default();
        for source in sources {
            summary.outcomes.push(self.run_source(source).await);
        }
        summary
    }

    /// Load one fixture-set file and verify it.
    pub async fn run_source(&self, source: &FixtureSource) -> RunOutcome {
        let run = SetRun::start(&source.name);
        match FixtureSet::load(source) {
            Ok(set) => self.verify(run, &set).await,
            Err(e) => run.fail(0, 0, e.into()),
        }
    }

    /// Verify an already-decoded fixture set.
    pub async fn run_set(&self, set: &FixtureSet) -> RunOutcome {
        let run = SetRun::start(set.name());
        self.verify(run, set).await
    }

    async fn verify(&self, mut run: SetRun, set: &FixtureSet) -> RunOutcome {
        let total = set.len();
        if let Err(e) = self.ctx.injection.wait(set.name()).await {
            return run.fail(total, 0, e.into());
        }

        run.advance(RunState::Verifying);
        if set.is_empty() {
            return run.pass(0);
        }

        tracing::info!(
            "Testing {}: {} proofs (parallel={})",
            set.name(),
            total,
            self.ctx.bound
        );

        let scheduler = Scheduler::new(
            self.ctx.verifier.as_ref(),
            self.ctx.progress.as_ref(),
            self.ctx.bound,
        );
        let mut verified = 0;
        let report = scheduler
            .run(set, |fixture, actual| {
                assert_post_state(set.name(), fixture, actual)?;
                verified += 1;
                Ok(())
            })
            .await;

        match report.into_result() {
            Ok(stats) => {
                debug_assert_eq!(stats.settled, total);
                run.pass(total)
            }
            Err(e) => run.fail(total, verified, e),
        }
    }
}
