use thiserror::Error;

use crate::verifier::VerifierError;

/// Malformed or incomplete fixture-set source. Raised before any dispatch.
#[derive(Debug, Error)]
#[error("failed to parse fixture set {set}{}: {reason}", index_suffix(.index))]
pub struct FixtureParseError {
    pub set: String,
    pub index: Option<usize>,
    pub reason: String,
}

fn index_suffix(index: &Option<usize>) -> String {
    match index {
        Some(index) => format!(" at proof {index}"),
        None => String::new(),
    }
}

impl FixtureParseError {
    pub fn whole(set: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            set: set.into(),
            index: None,
            reason: reason.into(),
        }
    }

    pub fn at(set: impl Into<String>, index: usize, reason: impl Into<String>) -> Self {
        Self {
            set: set.into(),
            index: Some(index),
            reason: reason.into(),
        }
    }
}

/// The verifier did not produce a post-state for a dispatched fixture.
#[derive(Debug, Error)]
#[error("error executing proof {index} of {set}: {source}")]
pub struct VerificationCallError {
    pub set: String,
    pub index: usize,
    #[source]
    pub source: VerifierError,
}

/// The verifier produced a post-state different from the expected one.
#[derive(Debug, Error)]
#[error(
    "after state doesn't match after proof {index} of {set}: expected 0x{}, actual 0x{}",
    hex::encode(.expected),
    hex::encode(.actual)
)]
pub struct AssertionMismatchError {
    pub set: String,
    pub index: usize,
    pub expected: Vec<u8>,
    pub actual: Vec<u8>,
}

/// The upstream message injection was abandoned before it completed.
#[derive(Debug, Error)]
#[error("message injection for {set} was abandoned before completing")]
pub struct PrerequisiteError {
    pub set: String,
}

/// Any error that fails a fixture set.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    FixtureParse(#[from] FixtureParseError),
    #[error(transparent)]
    VerificationCall(#[from] VerificationCallError),
    #[error(transparent)]
    AssertionMismatch(#[from] AssertionMismatchError),
    #[error(transparent)]
    Prerequisite(#[from] PrerequisiteError),
}

impl RunError {
    /// Index of the failing fixture, when a single fixture is at fault.
    pub fn index(&self) -> Option<usize> {
        match self {
            RunError::FixtureParse(e) => e.index,
            RunError::VerificationCall(e) => Some(e.index),
            RunError::AssertionMismatch(e) => Some(e.index),
            RunError::Prerequisite(_) => None,
        }
    }
}
