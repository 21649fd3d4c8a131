//! Layered engine configuration.
//!
//! Sources, lowest priority first:
//!
//! 1. built-in defaults ([`EngineConfig::default`])
//! 2. a TOML file: `--config <FILE>`, or `config.toml` in the platform
//!    config directory
//! 3. `RUSTDEDUP_*` environment variables (e.g. `RUSTDEDUP_MAX_THREADS=8`)
//! 4. command-line flags
//!
//! The merged result is validated once and never changes during a run.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Deserializer, Serialize};

use crate::actions::Strategy;
use crate::cli::{parse_size, Cli, OutputFormat};
use crate::duplicates::{default_exclude_patterns, DEFAULT_MAX_THREADS};
use crate::index::bloom::DEFAULT_FP_RATE;
use crate::index::DEFAULT_SYNC_INTERVAL;
use crate::scanner::{ExcludeError, ExclusionMatcher, HashAlgorithm, DEFAULT_BUFFER_SIZE};

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "RUSTDEDUP_";

/// Default index file name, relative to the working directory.
pub const DEFAULT_INDEX_FILE: &str = ".rustdedup-index.db";

/// Errors raised while building the configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A source could not be read or parsed.
    #[error("Invalid configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    /// A value is out of range.
    #[error("Invalid value for '{field}': {message}")]
    Invalid {
        /// Offending key
        field: &'static str,
        /// Why it was rejected
        message: String,
    },

    /// An exclusion pattern does not compile.
    #[error(transparent)]
    Exclude(#[from] ExcludeError),
}

/// Settings for one deduplication run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Persistent index location
    pub hash_file: PathBuf,
    /// Hashing read buffer in bytes (accepts "64KiB" style strings)
    #[serde(deserialize_with = "deserialize_size")]
    pub buffer_size: usize,
    /// Digest algorithm
    pub hash_algorithm: HashAlgorithm,
    /// Action applied to duplicates
    pub strategy: Strategy,
    /// Hashing threads
    pub max_threads: usize,
    /// Index mutations between syncs
    pub sync_interval: usize,
    /// Show a progress bar
    pub progress: bool,
    /// Simulate only
    pub dry_run: bool,
    /// Additional exclusion patterns
    pub exclude: Vec<String>,
    /// Use the Bloom prefilter
    pub bloom_filter: bool,
    /// Prefilter false positive target
    pub bloom_fp_rate: f64,
    /// Follow symbolic links
    pub follow_symlinks: bool,
    /// Skip dot-files and dot-directories
    pub skip_hidden: bool,
    /// Report format
    pub output: OutputFormat,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hash_file: PathBuf::from(DEFAULT_INDEX_FILE),
            buffer_size: DEFAULT_BUFFER_SIZE,
            hash_algorithm: HashAlgorithm::preferred(),
            strategy: Strategy::default(),
            max_threads: DEFAULT_MAX_THREADS,
            sync_interval: DEFAULT_SYNC_INTERVAL,
            progress: false,
            dry_run: false,
            exclude: Vec::new(),
            bloom_filter: false,
            bloom_fp_rate: DEFAULT_FP_RATE,
            follow_symlinks: false,
            skip_hidden: false,
            output: OutputFormat::default(),
        }
    }
}

/// Values given on the command line. Unset options are omitted so they do
/// not shadow lower layers.
#[derive(Debug, Default, Serialize)]
pub struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    hash_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    buffer_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hash_algorithm: Option<HashAlgorithm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    strategy: Option<Strategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_threads: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sync_interval: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    progress: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dry_run: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    exclude: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bloom_filter: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    follow_symlinks: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    skip_hidden: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<OutputFormat>,
}

impl From<&Cli> for CliOverrides {
    fn from(cli: &Cli) -> Self {
        Self {
            hash_file: cli.hash_file.clone(),
            buffer_size: cli.buffer_size,
            hash_algorithm: cli.hash_algorithm,
            strategy: cli.strategy,
            max_threads: cli.max_threads,
            sync_interval: cli.sync_interval,
            progress: cli.progress.then_some(true),
            dry_run: cli.dry_run.then_some(true),
            exclude: cli.exclude_patterns.clone(),
            bloom_filter: cli.bloom_filter.then_some(true),
            follow_symlinks: cli.follow_symlinks.then_some(true),
            skip_hidden: cli.skip_hidden.then_some(true),
            output: cli.output,
        }
    }
}

impl EngineConfig {
    /// Load and validate the configuration for `cli`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a source is malformed or a value is
    /// invalid.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) if !path.is_file() => return Err(ConfigError::FileNotFound(path.clone())),
            Some(path) => Some(path.clone()),
            None => default_config_path().filter(|p| p.is_file()),
        };
        Self::load_from(
            file.as_deref(),
            Env::prefixed(ENV_PREFIX),
            CliOverrides::from(cli),
        )
    }

    /// Merge the layers from explicit sources and validate the result.
    ///
    /// Command-line exclusion patterns are appended to configured ones;
    /// every other key is replaced by the higher layer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a source is malformed or a value is
    /// invalid.
    pub fn load_from(
        file: Option<&Path>,
        env: Env,
        overrides: CliOverrides,
    ) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = file {
            log::debug!("Reading configuration from {}", path.display());
            figment = figment.merge(Toml::file(path));
        }
        let config: Self = figment
            .merge(env)
            .admerge(Serialized::defaults(overrides))
            .extract()
            .map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.hash_algorithm.is_available() {
            return Err(ConfigError::Invalid {
                field: "hash_algorithm",
                message: format!("'{}' support is not compiled in", self.hash_algorithm),
            });
        }
        let positive = [
            ("buffer_size", self.buffer_size),
            ("max_threads", self.max_threads),
            ("sync_interval", self.sync_interval),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    message: "must be greater than zero".to_string(),
                });
            }
        }
        if !(self.bloom_fp_rate > 0.0 && self.bloom_fp_rate < 1.0) {
            return Err(ConfigError::Invalid {
                field: "bloom_fp_rate",
                message: format!("{} is not in (0, 1)", self.bloom_fp_rate),
            });
        }
        if self.hash_file.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                field: "hash_file",
                message: "must not be empty".to_string(),
            });
        }
        ExclusionMatcher::new(Path::new("."), self.exclude_patterns().as_slice())?;
        Ok(())
    }

    /// Built-in exclusions followed by the configured ones.
    #[must_use]
    pub fn exclude_patterns(&self) -> Vec<String> {
        let mut patterns = default_exclude_patterns();
        for pattern in &self.exclude {
            if !patterns.contains(pattern) {
                patterns.push(pattern.clone());
            }
        }
        patterns
    }
}

/// `config.toml` in the platform configuration directory.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "rustdedup", "rustdedup")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn deserialize_size<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Size {
        Bytes(u64),
        Text(String),
    }

    let bytes = match Size::deserialize(deserializer)? {
        Size::Bytes(n) => n,
        Size::Text(s) => parse_size(&s).map_err(serde::de::Error::custom)?,
    };
    usize::try_from(bytes).map_err(serde::de::Error::custom)
}
