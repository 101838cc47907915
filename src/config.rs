//! Configuration loading for emulog.
//!
//! Loads `emulog.toml` with per-section defaults. All sections use
//! `#[serde(default)]` so a minimal or empty config file is valid.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// Top-level emulog configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmulogConfig {
    /// Attachment intake and pipe sizing.
    #[serde(default)]
    pub intake: IntakeConfig,

    /// Fact extraction limits and piracy triggers.
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// Output pagination.
    #[serde(default)]
    pub pager: PagerConfig,

    /// File-integrity lookup settings.
    #[serde(default)]
    pub integrity: IntegrityConfig,
}

/// Attachment intake settings.
#[derive(Debug, Clone, Deserialize)]
pub struct IntakeConfig {
    /// Maximum simultaneous pipeline runs. Defaults to half the detected cores.
    #[serde(default)]
    pub max_concurrent_runs: Option<usize>,

    /// Number of in-flight chunks between decompressor and extractor.
    #[serde(default = "default_pipe_capacity")]
    pub pipe_capacity: usize,

    /// Size in bytes of each chunk pushed through the pipe.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Attachment name suffixes that are never analyzed (case-insensitive).
    #[serde(default = "default_ignored_suffixes")]
    pub ignored_suffixes: Vec<String>,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            max_concurrent_runs: None,
            pipe_capacity: default_pipe_capacity(),
            chunk_size: default_chunk_size(),
            ignored_suffixes: default_ignored_suffixes(),
        }
    }
}

/// Fact extraction settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorConfig {
    /// Decompressed bytes scanned before the log is reported as truncated.
    #[serde(default = "default_max_log_bytes")]
    pub max_log_bytes: u64,

    /// Lines captured on each side of a piracy trigger.
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,

    /// Literal phrases that end extraction with a piracy outcome.
    #[serde(default = "default_piracy_triggers")]
    pub piracy_triggers: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_log_bytes: default_max_log_bytes(),
            context_lines: default_context_lines(),
            piracy_triggers: default_piracy_triggers(),
        }
    }
}

/// Output pagination settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PagerConfig {
    /// Lines per display field before a new field is started.
    #[serde(default = "default_max_lines_per_field")]
    pub max_lines_per_field: usize,
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            max_lines_per_field: default_max_lines_per_field(),
        }
    }
}

/// File-integrity lookup settings.
#[derive(Debug, Clone, Deserialize)]
pub struct IntegrityConfig {
    /// Cache directory handed to the lookup service. Defaults under the data dir.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Seconds to wait for manifests before giving up on the check.
    #[serde(default = "default_lookup_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            timeout_secs: default_lookup_timeout_secs(),
        }
    }
}

/// Resolved filesystem paths for emulog state.
#[derive(Debug, Clone)]
pub struct EmulogPaths {
    /// Root directory (`~/.emulog/`).
    pub root: PathBuf,

    /// Default config file location.
    pub config_toml: PathBuf,

    /// Directory for rotated log files.
    pub logs_dir: PathBuf,

    /// Default cache directory for integrity manifests.
    pub ird_cache_dir: PathBuf,
}

impl EmulogConfig {
    /// Validate that configuration values are within sane bounds.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first out-of-range value.
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(runs) = self.intake.max_concurrent_runs {
            anyhow::ensure!(runs >= 1, "intake.max_concurrent_runs must be >= 1");
        }
        anyhow::ensure!(
            self.intake.pipe_capacity >= 1,
            "intake.pipe_capacity must be >= 1"
        );
        anyhow::ensure!(
            (512..=16 * 1024 * 1024).contains(&self.intake.chunk_size),
            "intake.chunk_size must be between 512 bytes and 16 MiB"
        );
        anyhow::ensure!(
            self.extractor.max_log_bytes >= 1024,
            "extractor.max_log_bytes must be >= 1024"
        );
        anyhow::ensure!(
            self.extractor.context_lines <= 50,
            "extractor.context_lines must be <= 50"
        );
        anyhow::ensure!(
            self.extractor
                .piracy_triggers
                .iter()
                .all(|t| !t.trim().is_empty()),
            "extractor.piracy_triggers must not contain empty phrases"
        );
        anyhow::ensure!(
            self.pager.max_lines_per_field >= 1,
            "pager.max_lines_per_field must be >= 1"
        );
        anyhow::ensure!(
            (1..=300).contains(&self.integrity.timeout_secs),
            "integrity.timeout_secs must be between 1 and 300"
        );
        Ok(())
    }

    /// Integrity cache directory, falling back to the default under `paths`.
    pub fn ird_cache_dir(&self, paths: &EmulogPaths) -> PathBuf {
        self.integrity
            .cache_dir
            .clone()
            .unwrap_or_else(|| paths.ird_cache_dir.clone())
    }
}

/// Load emulog configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed, or fails validation.
pub fn load_config(path: &Path) -> anyhow::Result<EmulogConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read emulog config at {}", path.display()))?;
    let config: EmulogConfig = toml::from_str(&contents)
        .with_context(|| format!("failed to parse emulog config at {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from `path`, or defaults when the file does not exist.
///
/// # Errors
///
/// Returns an error if an existing file cannot be read, parsed, or validated.
pub fn load_config_or_default(path: &Path) -> anyhow::Result<EmulogConfig> {
    if !path.exists() {
        return Ok(EmulogConfig::default());
    }
    load_config(path)
}

/// Resolve emulog's filesystem paths under `~/.emulog/`.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn emulog_paths() -> anyhow::Result<EmulogPaths> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    let root = home.home_dir().join(".emulog");

    Ok(EmulogPaths {
        config_toml: root.join("emulog.toml"),
        logs_dir: root.join("logs"),
        ird_cache_dir: root.join("cache").join("ird"),
        root,
    })
}

// Default value functions for serde.

fn default_pipe_capacity() -> usize {
    16
}

fn default_chunk_size() -> usize {
    64 * 1024
}

fn default_ignored_suffixes() -> Vec<String> {
    vec!["tty.log".to_owned()]
}

fn default_max_log_bytes() -> u64 {
    48 * 1024 * 1024
}

fn default_context_lines() -> usize {
    2
}

fn default_piracy_triggers() -> Vec<String> {
    vec![
        "Loaded cracked executable".to_owned(),
        "BLES00000-[PATCHED]".to_owned(),
    ]
}

fn default_max_lines_per_field() -> usize {
    10
}

fn default_lookup_timeout_secs() -> u64 {
    15
}
