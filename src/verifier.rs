//! Client boundary to the external one-step prover.
//!
//! The harness only ever needs one operation from the prover: execute a single
//! step from a pre-state with a proof and return the post-state. Everything
//! behind that call (deployment, VM semantics, hashing) belongs to the prover.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use crate::types::{decode_hex, ErrorResponse, ProveOneStepRequest, ProveOneStepResponse};

#[derive(Debug, Error)]
pub enum VerifierError {
    #[error("prover request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("prover returned {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("prover returned an undecodable post-state: {0}")]
    Decode(#[from] hex::FromHexError),
    #[error("prover rejected the proof: {0}")]
    Rejected(String),
}

/// Computes a post-state from a pre-state and a proof.
///
/// Implementations may suspend. Callers must not assume ordering, caching or
/// idempotence between calls.
#[async_trait]
pub trait VerifierClient: Send + Sync {
    async fn verify(&self, pre_state: &[u8], proof: &[u8]) -> Result<Vec<u8>, VerifierError>;
}

/// Talks to a prover service over HTTP (`POST /prove-one-step`).
#[derive(Clone, Debug)]
pub struct HttpVerifier {
    client: reqwest::Client,
    base_url: String,
}

impl HttpVerifier {
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, VerifierError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let base_url: String = base_url.into();
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl VerifierClient for HttpVerifier {
    async fn verify(&self, pre_state: &[u8], proof: &[u8]) -> Result<Vec<u8>, VerifierError> {
        let url = format!("{}/prove-one-step", self.base_url);
        let payload = ProveOneStepRequest {
            before: hex::encode(pre_state),
            proof: hex::encode(proof),
        };

        let resp = self.client.post(&url).json(&payload).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(VerifierError::Status { status, message });
        }

        let body: ProveOneStepResponse = resp.json().await?;
        Ok(decode_hex(&body.after)?)
    }
}
