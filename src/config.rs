//! Engine configuration.
//!
//! Defaults come from [`DeltaSumConfig::default`]; [`DeltaSumConfig::from_env`]
//! overrides them from `TOTAL_DELTA_*` environment variables.

/// Environment variable toggling parallel execution (`1`/`0`, `true`/`false`).
pub const ENV_PARALLEL: &str = "TOTAL_DELTA_PARALLEL";
/// Environment variable for the minimum pair count worth splitting.
pub const ENV_MIN_WORK: &str = "TOTAL_DELTA_MIN_WORK";
/// Environment variable for a dedicated worker-pool size.
pub const ENV_THREADS: &str = "TOTAL_DELTA_THREADS";
/// Environment variable toggling staged writeback for strided outputs.
pub const ENV_STAGE_OUTPUT: &str = "TOTAL_DELTA_STAGE_OUTPUT";

/// Default minimum work (pair evaluations) before a block is split.
/// Same value as `delta_kernel::MIN_PARALLEL_WORK`, available without the `parallel` feature.
pub const DEFAULT_MIN_PARALLEL_WORK: usize = 1 << 15;

/// Errors raised while reading configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// Settings for [`DeltaSumEngine`](crate::DeltaSumEngine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaSumConfig {
    /// Split the cell grid across rayon workers when the problem is large
    /// enough. Ignored without the `parallel` feature.
    pub parallel: bool,
    /// Problems with at most this many pair evaluations run sequentially.
    pub min_parallel_work: usize,
    /// Run inside a dedicated pool of this many threads instead of the
    /// global rayon pool.
    pub threads: Option<usize>,
    /// Compute into a row-major scratch buffer and copy it back when the
    /// output view is not row-major contiguous.
    pub stage_strided_output: bool,
}

impl Default for DeltaSumConfig {
    fn default() -> Self {
        Self {
            parallel: cfg!(feature = "parallel"),
            min_parallel_work: DEFAULT_MIN_PARALLEL_WORK,
            threads: None,
            stage_strided_output: false,
        }
    }
}

impl DeltaSumConfig {
    /// Defaults overridden by `TOTAL_DELTA_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(value) = lookup(ENV_PARALLEL) {
            config.parallel = parse_flag(ENV_PARALLEL, &value)?;
        }
        if let Some(value) = lookup(ENV_MIN_WORK) {
            config.min_parallel_work = parse_count(ENV_MIN_WORK, &value)?;
        }
        if let Some(value) = lookup(ENV_THREADS) {
            let threads = parse_count(ENV_THREADS, &value)?;
            if threads == 0 {
                return Err(ConfigError::InvalidValue {
                    key: ENV_THREADS,
                    value,
                });
            }
            config.threads = Some(threads);
        }
        if let Some(value) = lookup(ENV_STAGE_OUTPUT) {
            config.stage_strided_output = parse_flag(ENV_STAGE_OUTPUT, &value)?;
        }
        Ok(config)
    }

    /// Reject settings that cannot be honoured. A pool needs at least one thread.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threads == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: ENV_THREADS,
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_min_parallel_work(mut self, min_parallel_work: usize) -> Self {
        self.min_parallel_work = min_parallel_work;
        self
    }

    /// Use a dedicated pool; `0` is rejected by [`validate`](Self::validate).
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn with_stage_strided_output(mut self, stage: bool) -> Self {
        self.stage_strided_output = stage;
        self
    }
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}

fn parse_count(key: &'static str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|_| ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        })
}
