use std::path::{Path, PathBuf};

use crate::error::FixtureParseError;
use crate::types::{decode_hex, FixtureRecord};

/// A single one-step-proof test case.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fixture {
    pub index: usize,
    pub pre_state: Vec<u8>,
    pub proof: Vec<u8>,
    pub expected_post_state: Vec<u8>,
}

/// Ordered fixtures loaded from one source. Dispatch follows this order.
#[derive(Clone, Debug)]
pub struct FixtureSet {
    name: String,
    fixtures: Vec<Fixture>,
}

/// A named fixture-set file found on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixtureSource {
    pub name: String,
    pub path: PathBuf,
}

impl FixtureSet {
    pub fn new(name: impl Into<String>, fixtures: Vec<Fixture>) -> Self {
        Self {
            name: name.into(),
            fixtures,
        }
    }

    /// Decode a fixture set from JSON text.
    ///
    /// The text must be an array of objects with hex-encoded `before`, `proof`
    /// and `after` fields. An empty array is a valid, empty set.
    pub fn from_json(name: &str, text: &str) -> Result<Self, FixtureParseError> {
        let json: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| FixtureParseError::whole(name, format!("invalid JSON: {}", e)))?;
        let records = match json {
            serde_json::Value::Array(records) => records,
            other => {
                return Err(FixtureParseError::whole(
                    name,
                    format!("expected an array of proofs, found {}", json_kind(&other)),
                ))
            }
        };

        let mut fixtures = Vec::with_capacity(records.len());
        for (index, value) in records.into_iter().enumerate() {
            let record: FixtureRecord = serde_json::from_value(value)
                .map_err(|e| FixtureParseError::at(name, index, e.to_string()))?;
            fixtures.push(decode_record(name, index, &record)?);
        }

        Ok(Self::new(name, fixtures))
    }

    /// Read and decode a fixture-set file. The set is named after the file.
    pub fn load(source: &FixtureSource) -> Result<Self, FixtureParseError> {
        let contents = std::fs::read_to_string(&source.path).map_err(|e| {
            FixtureParseError::whole(
                &source.name,
                format!("failed to read {}: {}", source.path.display(), e),
            )
        })?;
        Self::from_json(&source.name, &contents)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fixtures(&self) -> &[Fixture] {
        &self.fixtures
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }
}

impl FixtureSource {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { name, path }
    }
}

fn decode_record(
    set: &str,
    index: usize,
    record: &FixtureRecord,
) -> Result<Fixture, FixtureParseError> {
    let field = |label: &str, value: &str| {
        decode_hex(value)
            .map_err(|e| FixtureParseError::at(set, index, format!("invalid hex in `{}`: {}", label, e)))
    };
    Ok(Fixture {
        index,
        pre_state: field("before", &record.before)?,
        proof: field("proof", &record.proof)?,
        expected_post_state: field("after", &record.after)?,
    })
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// List the `*.json` fixture sets in a directory, sorted by file name.
pub fn discover_sources(dir: &Path) -> Result<Vec<FixtureSource>, String> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| format!("Failed to read fixtures directory {}: {}", dir.display(), e))?;

    let mut sources = Vec::new();
    for entry in entries {
        let entry = entry
            .map_err(|e| format!("Failed to list fixtures directory {}: {}", dir.display(), e))?;
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            tracing::debug!("Skipping non-fixture entry {}", path.display());
            continue;
        }
        sources.push(FixtureSource::from_path(path));
    }
    sources.sort_by(|a, b| a.name.cmp(&b.name));

    tracing::info!(
        "Discovered {} fixture sets in {}",
        sources.len(),
        dir.display()
    );
    Ok(sources)
}
