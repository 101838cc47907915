//! Disc-dump integrity check against per-title manifests.
//!
//! Files the emulator failed to open are compared with the file list of the
//! title's IRD manifest. The manifests come from an external service behind
//! [`IntegrityLookup`]; any failure of that service degrades to
//! [`IntegrityVerdict::Unavailable`] and never to an error.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cancel::CancelSignal;
use crate::extractor::{FactSet, Field};

/// File list of one disc manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Paths relative to the disc root, with either slash style.
    pub filenames: Vec<String>,
}

impl Manifest {
    /// Manifest listing `filenames`.
    pub fn new(filenames: Vec<String>) -> Self {
        Self { filenames }
    }
}

/// Errors from an [`IntegrityLookup`].
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// The service is not reachable or not configured.
    #[error("integrity lookup unavailable: {0}")]
    Unavailable(String),
    /// The service did not answer in time.
    #[error("integrity lookup timed out after {0:?}")]
    Timeout(Duration),
    /// Any other failure reported by the service.
    #[error("integrity lookup failed: {0}")]
    Other(String),
}

/// Source of disc manifests, keyed by product code.
#[async_trait]
pub trait IntegrityLookup: Send + Sync {
    /// Fetch every manifest known for `product_code`, caching under `cache_dir`.
    ///
    /// # Errors
    ///
    /// Returns a [`LookupError`] when manifests cannot be obtained.
    async fn fetch_manifests(
        &self,
        product_code: &str,
        cache_dir: &Path,
        cancel: CancelSignal,
    ) -> Result<Vec<Manifest>, LookupError>;
}

/// Lookup used when no manifest service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIntegrityLookup;

#[async_trait]
impl IntegrityLookup for NoIntegrityLookup {
    async fn fetch_manifests(
        &self,
        _product_code: &str,
        _cache_dir: &Path,
        _cancel: CancelSignal,
    ) -> Result<Vec<Manifest>, LookupError> {
        Err(LookupError::Unavailable(
            "no integrity lookup configured".to_owned(),
        ))
    }
}

/// Result of the integrity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum IntegrityVerdict {
    /// Not a disc game, or nothing failed to open.
    NotApplicable,
    /// The lookup failed, timed out or returned no files.
    Unavailable,
    /// Missing paths were compared with the manifest.
    Checked {
        /// Whether any missing path is part of the dump.
        broken: bool,
    },
}

/// Product code to look up, if the check applies to these facts.
///
/// Only disc serials (`B*`, `M*`) with at least one file or directory that
/// failed to open qualify.
pub fn lookup_target(facts: &FactSet) -> Option<&str> {
    let serial = facts.get(Field::Serial)?;
    if !(serial.starts_with('B') || serial.starts_with('M')) {
        return None;
    }
    let has_missing = facts.has(Field::BrokenDirectory) || facts.has(Field::BrokenFilename);
    has_missing.then_some(serial)
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/")
        .trim_matches('/')
        .to_lowercase()
}

/// Compare missing paths with manifest contents, case-insensitively.
///
/// A missing file is broken if the manifest lists it; a missing directory is
/// broken if any manifest file lives under it.
pub fn compare(facts: &FactSet, manifests: &[Manifest]) -> IntegrityVerdict {
    let known_files: HashSet<String> = manifests
        .iter()
        .flat_map(|m| m.filenames.iter())
        .map(|f| normalize(f))
        .filter(|f| !f.is_empty())
        .collect();
    if known_files.is_empty() {
        return IntegrityVerdict::Unavailable;
    }

    let broken_file = facts
        .values(Field::BrokenFilename)
        .into_iter()
        .any(|f| known_files.contains(&normalize(f)));
    if broken_file {
        return IntegrityVerdict::Checked { broken: true };
    }

    let mut known_dirs = HashSet::new();
    for file in &known_files {
        let mut rest = file.as_str();
        while let Some((parent, _)) = rest.rsplit_once('/') {
            known_dirs.insert(parent.to_owned());
            rest = parent;
        }
    }
    let broken_dir = facts
        .values(Field::BrokenDirectory)
        .into_iter()
        .any(|d| known_dirs.contains(&normalize(d)));
    IntegrityVerdict::Checked { broken: broken_dir }
}

/// Run the lookup for these facts and compare the result.
pub async fn check(
    lookup: &dyn IntegrityLookup,
    facts: &FactSet,
    cache_dir: &Path,
    timeout: Duration,
    cancel: &CancelSignal,
) -> IntegrityVerdict {
    let Some(product_code) = lookup_target(facts) else {
        return IntegrityVerdict::NotApplicable;
    };

    let fetched = tokio::time::timeout(
        timeout,
        lookup.fetch_manifests(product_code, cache_dir, cancel.clone()),
    )
    .await
    .unwrap_or_else(|_| Err(LookupError::Timeout(timeout)));

    match fetched {
        Ok(manifests) => {
            let verdict = compare(facts, &manifests);
            debug!(product_code, manifests = manifests.len(), ?verdict, "integrity check finished");
            verdict
        }
        Err(e) => {
            warn!(product_code, error = %e, "failed to get IRD files");
            IntegrityVerdict::Unavailable
        }
    }
}
