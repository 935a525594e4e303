use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PARALLEL: usize = 128;

/// Harness configuration, read from the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HarnessConfig {
    pub fixtures_dir: PathBuf,
    pub prover_url: String,
    pub parallel: NonZeroUsize,
    pub prover_timeout: Option<Duration>,
    pub progress: bool,
}

impl HarnessConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let fixtures_dir =
            PathBuf::from(lookup("FIXTURES_DIR").unwrap_or_else(|| "./test/proofs".to_string()));

        let prover_url =
            lookup("PROVER_URL").unwrap_or_else(|| "http://localhost:4003".to_string());

        let parallel = match lookup("PARALLEL") {
            Some(v) => v
                .trim()
                .parse::<NonZeroUsize>()
                .map_err(|_| format!("PARALLEL must be a positive integer, got {:?}", v))?,
            None => NonZeroUsize::new(DEFAULT_PARALLEL).unwrap_or(NonZeroUsize::MIN),
        };

        let prover_timeout = match lookup("PROVER_TIMEOUT_SECS") {
            Some(v) => {
                let secs: u64 = v.trim().parse().map_err(|_| {
                    format!("PROVER_TIMEOUT_SECS must be a number of seconds, got {:?}", v)
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        let progress = match lookup("PROGRESS") {
            Some(v) => !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "off" | "no"),
            None => true,
        };

        Ok(Self {
            fixtures_dir,
            prover_url,
            parallel,
            prover_timeout,
            progress,
        })
    }
}
