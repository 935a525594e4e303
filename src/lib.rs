//! Concurrent fixture-verification harness for a one-step prover.
//!
//! Fixture sets (JSON files of pre-state, proof and expected post-state) are
//! fanned out to a [`verifier::VerifierClient`] with a bounded number of calls
//! in flight, and every returned post-state is checked against its fixture.

pub mod asserter;
pub mod config;
pub mod context;
pub mod error;
pub mod fixture;
pub mod orchestrator;
pub mod progress;
pub mod scheduler;
pub mod types;
pub mod verifier;
