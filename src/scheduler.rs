//! Bounded-concurrency dispatch of verification calls.
//!
//! The window of in-flight calls is a `FuturesUnordered` owned by a single
//! control flow. Whenever any call settles, its slot is refilled with the next
//! undispatched fixture, so throughput never waits on the slowest call of a
//! batch.
//!
//! After the first failure nothing new is dispatched, but every call already
//! in the window is still awaited before the error is returned. Late results
//! are discarded; no call is cancelled or left running past the set's run.

use std::num::NonZeroUsize;

use futures::stream::{FuturesUnordered, StreamExt};

use crate::error::{RunError, VerificationCallError};
use crate::fixture::{Fixture, FixtureSet};
use crate::progress::ProgressReporter;
use crate::verifier::VerifierClient;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Fixtures handed to the verifier.
    pub dispatched: usize,
    /// Calls that settled, successfully or not.
    pub settled: usize,
    /// Largest window size observed.
    pub peak_window: usize,
}

#[derive(Debug)]
pub struct SchedulerReport {
    pub stats: SchedulerStats,
    /// First failure in completion order, if any.
    pub first_error: Option<RunError>,
}

impl SchedulerReport {
    pub fn into_result(self) -> Result<SchedulerStats, RunError> {
        match self.first_error {
            Some(e) => Err(e),
            None => Ok(self.stats),
        }
    }
}

pub struct Scheduler<'a> {
    verifier: &'a dyn VerifierClient,
    progress: &'a dyn ProgressReporter,
    bound: NonZeroUsize,
}

impl<'a> Scheduler<'a> {
    pub fn new(
        verifier: &'a dyn VerifierClient,
        progress: &'a dyn ProgressReporter,
        bound: NonZeroUsize,
    ) -> Self {
        Self {
            verifier,
            progress,
            bound,
        }
    }

    /// Verify every fixture of `set`, keeping at most `bound` calls in flight.
    ///
    /// `on_result` receives each post-state together with the fixture it was
    /// dispatched for, in completion order. An error from it fails the set the
    /// same way a failed call does.
    pub async fn run<F>(&self, set: &FixtureSet, mut on_result: F) -> SchedulerReport
    where
        F: FnMut(&Fixture, Vec<u8>) -> Result<(), RunError>,
    {
        let total = set.len();
        let bound = self.bound.get();
        let verifier = self.verifier;

        let mut pending = set.fixtures().iter();
        let mut window = FuturesUnordered::new();
        let mut stats = SchedulerStats::default();
        let mut first_error: Option<RunError> = None;

        loop {
            while first_error.is_none() && window.len() < bound {
                let Some(fixture) = pending.next() else {
                    break;
                };
                window.push(async move {
                    let result = verifier.verify(&fixture.pre_state, &fixture.proof).await;
                    (fixture, result)
                });
                stats.dispatched += 1;
                stats.peak_window = stats.peak_window.max(window.len());
                tracing::debug!(
                    "Dispatched proof {} of {} (window={})",
                    fixture.index,
                    set.name(),
                    window.len()
                );
            }

            let Some((fixture, result)) = window.next().await else {
                break;
            };
            stats.settled += 1;
            self.progress.update(set.name(), stats.settled, total);

            if first_error.is_some() {
                tracing::debug!(
                    "Discarding result of proof {} of {} after an earlier failure",
                    fixture.index,
                    set.name()
                );
                continue;
            }

            let outcome = result
                .map_err(|source| {
                    RunError::from(VerificationCallError {
                        set: set.name().to_string(),
                        index: fixture.index,
                        source,
                    })
                })
                .and_then(|post_state| on_result(fixture, post_state));

            if let Err(e) = outcome {
                tracing::error!("{}", e);
                if !window.is_empty() {
                    tracing::info!(
                        "Stopped dispatch for {}; waiting for {} in-flight proofs",
                        set.name(),
                        window.len()
                    );
                }
                first_error = Some(e);
            }
        }

        self.progress.finish(set.name());
        SchedulerReport { stats, first_error }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::*;
    use crate::error::AssertionMismatchError;
    use crate::progress::testing::RecordingProgress;
    use crate::progress::NoProgress;
    use crate::verifier::testing::EchoVerifier;

    fn make_set(n: usize) -> FixtureSet {
        let fixtures = (0..n)
            .map(|i| Fixture {
                index: i,
                pre_state: vec![i as u8],
                proof: vec![0x00],
                expected_post_state: vec![i as u8],
            })
            .collect();
        FixtureSet::new("sched.json", fixtures)
    }

    fn bound(w: usize) -> NonZeroUsize {
        NonZeroUsize::new(w).unwrap()
    }

    #[tokio::test]
    async fn test_every_fixture_observed_once() {
        let verifier = EchoVerifier::new()
            .with_delay(2, Duration::from_millis(20))
            .with_delay(5, Duration::from_millis(5));
        let scheduler = Scheduler::new(&verifier, &NoProgress, bound(3));
        let set = make_set(10);

        let mut seen = Vec::new();
        let report = scheduler
            .run(&set, |fixture, post| {
                assert_eq!(post, fixture.pre_state);
                seen.push(fixture.index);
                Ok(())
            })
            .await;

        let stats = report.into_result().unwrap();
        assert_eq!(stats.dispatched, 10);
        assert_eq!(stats.settled, 10);
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        assert_eq!(verifier.call_count(), 10);
    }

    #[tokio::test]
    async fn test_window_never_exceeds_bound() {
        for w in [1, 2, 3, 7, 64] {
            let mut verifier = EchoVerifier::new();
            for id in (0..20).step_by(3) {
                verifier = verifier.with_delay(id, Duration::from_millis(2 + u64::from(id % 5)));
            }
            let scheduler = Scheduler::new(&verifier, &NoProgress, bound(w));
            let set = make_set(20);

            let stats = scheduler.run(&set, |_, _| Ok(())).await.into_result().unwrap();

            assert_eq!(stats.peak_window, w.min(20), "bound {}", w);
            assert!(
                verifier.peak_in_flight.load(Ordering::SeqCst) <= w,
                "bound {} exceeded",
                w
            );
        }
    }

    #[tokio::test]
    async fn test_first_completed_slot_is_backfilled() {
        // Proof 0 is slow; with two slots the fast proofs should all flow
        // through the second slot while 0 is still pending.
        let verifier = EchoVerifier::new().with_delay(0, Duration::from_millis(200));
        let scheduler = Scheduler::new(&verifier, &NoProgress, bound(2));
        let set = make_set(5);

        let mut completion = Vec::new();
        scheduler
            .run(&set, |fixture, _| {
                completion.push(fixture.index);
                Ok(())
            })
            .await
            .into_result()
            .unwrap();

        assert_eq!(completion, vec![1, 2, 3, 4, 0]);
        assert_eq!(verifier.call_order(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_dispatch_order_is_index_ascending() {
        let verifier = EchoVerifier::new()
            .with_delay(1, Duration::from_millis(30))
            .with_delay(4, Duration::from_millis(10))
            .with_delay(6, Duration::from_millis(1));
        let scheduler = Scheduler::new(&verifier, &NoProgress, bound(3));
        let set = make_set(12);

        scheduler.run(&set, |_, _| Ok(())).await.into_result().unwrap();

        assert_eq!(verifier.call_order(), (0..12).collect::<Vec<u8>>());
    }

    #[tokio::test]
    async fn test_empty_set_makes_no_calls() {
        let verifier = EchoVerifier::new();
        let progress = RecordingProgress::default();
        let scheduler = Scheduler::new(&verifier, &progress, bound(4));

        let stats = scheduler
            .run(&make_set(0), |_, _| Ok(()))
            .await
            .into_result()
            .unwrap();

        assert_eq!(stats, SchedulerStats::default());
        assert_eq!(verifier.call_count(), 0);
        assert!(progress.updates.lock().unwrap().is_empty());
        assert_eq!(*progress.finished.lock().unwrap(), vec!["sched.json".to_string()]);
    }

    #[tokio::test]
    async fn test_call_failure_stops_dispatch_and_drains_window() {
        let verifier = EchoVerifier::new()
            .with_delay(0, Duration::from_millis(50))
            .failing_on(1);
        let scheduler = Scheduler::new(&verifier, &NoProgress, bound(2));
        let set = make_set(6);

        let report = scheduler.run(&set, |_, _| Ok(())).await;

        assert_eq!(report.stats.dispatched, 2);
        assert_eq!(report.stats.settled, 2);
        // The slow sibling was awaited, not abandoned.
        assert_eq!(verifier.completed.load(Ordering::SeqCst), 2);
        assert_eq!(verifier.call_order(), vec![0, 1]);
        match report.first_error {
            Some(RunError::VerificationCall(e)) => {
                assert_eq!(e.index, 1);
                assert_eq!(e.set, "sched.json");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_first_error_in_completion_order_wins() {
        let verifier = EchoVerifier::new()
            .with_delay(0, Duration::from_millis(50))
            .failing_on(0)
            .failing_on(1);
        let scheduler = Scheduler::new(&verifier, &NoProgress, bound(2));

        let report = scheduler.run(&make_set(4), |_, _| Ok(())).await;

        assert_eq!(report.first_error.and_then(|e| e.index()), Some(1));
        assert_eq!(report.stats.settled, 2);
    }

    #[tokio::test]
    async fn test_result_handler_error_fails_set() {
        let verifier = EchoVerifier::new();
        let scheduler = Scheduler::new(&verifier, &NoProgress, bound(1));
        let set = make_set(5);

        let report = scheduler
            .run(&set, |fixture, post| {
                if fixture.index == 2 {
                    return Err(AssertionMismatchError {
                        set: "sched.json".to_string(),
                        index: fixture.index,
                        expected: vec![0xff],
                        actual: post,
                    }
                    .into());
                }
                Ok(())
            })
            .await;

        assert_eq!(report.stats.dispatched, 3);
        assert!(matches!(
            report.first_error,
            Some(RunError::AssertionMismatch(ref e)) if e.index == 2 && e.actual == vec![2]
        ));
        assert_eq!(verifier.call_count(), 3);
    }

    #[tokio::test]
    async fn test_progress_reports_each_settled_call() {
        let verifier = EchoVerifier::new();
        let progress = RecordingProgress::default();
        let scheduler = Scheduler::new(&verifier, &progress, bound(2));

        scheduler
            .run(&make_set(3), |_, _| Ok(()))
            .await
            .into_result()
            .unwrap();

        let updates = progress.updates.lock().unwrap().clone();
        let processed: Vec<usize> = updates.iter().map(|(_, done, _)| *done).collect();
        assert_eq!(processed, vec![1, 2, 3]);
        assert!(updates.iter().all(|(set, _, total)| set == "sched.json" && *total == 3));
        assert_eq!(progress.finished.lock().unwrap().len(), 1);
    }
}
