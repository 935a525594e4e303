use serde::{Deserialize, Serialize};

/// One record of a fixture-set file, with every field hex-encoded.
#[derive(Debug, Deserialize)]
pub struct FixtureRecord {
    #[serde(alias = "preState")]
    pub before: String,
    pub proof: String,
    #[serde(alias = "expectedPostState")]
    pub after: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProveOneStepRequest {
    pub before: String,
    pub proof: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProveOneStepResponse {
    pub after: String,
}

/// Error body returned by the prover service on non-2xx replies.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Decode a hex string, tolerating a leading `0x`.
pub fn decode_hex(value: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    hex::decode(digits)
}
