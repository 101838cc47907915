//! Diagnostic rules over extracted facts.
//!
//! Rules run in a fixed order and each contributes zero or more [`Note`]s.
//! Everything except the integrity lookup is pure: [`RuleEngine::evaluate`]
//! takes the lookup's verdict as input so it can be tested without I/O.
//! [`RuleEngine::evaluate_with_lookup`] performs the lookup first.

pub mod build_age;
pub mod game;
pub mod hardware;
pub mod integrity;
pub mod version;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cancel::CancelSignal;
use crate::config::IntegrityConfig;
use crate::extractor::{FactSet, ParseOutcome};

pub use integrity::{IntegrityLookup, IntegrityVerdict, LookupError, Manifest, NoIntegrityLookup};
pub use version::DottedVersion;

/// Note severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Context only, nothing to fix.
    Informational,
    /// Likely to cause problems.
    Advisory,
    /// Should be fixed.
    Warning,
    /// Prevents the game from working.
    Critical,
    /// Disc content installed in a way only pirated copies are.
    Piracy,
}

impl Severity {
    /// Prefix shown in front of the note text.
    pub fn glyph(self) -> &'static str {
        match self {
            Self::Informational => "ℹ",
            Self::Advisory => "⚠",
            Self::Warning => "❗",
            Self::Critical => "❌",
            Self::Piracy => "🔨",
        }
    }
}

/// One diagnostic finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// How serious the finding is.
    pub severity: Severity,
    /// Human-readable text, without the glyph.
    pub text: String,
}

impl Note {
    /// Create a note.
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
        }
    }

    /// Text with the severity glyph in front.
    pub fn render(&self) -> String {
        format!("{} {}", self.severity.glyph(), self.text)
    }
}

/// Notes in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Notes {
    items: Vec<Note>,
}

impl Notes {
    /// Empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a note unless an identical one is already present.
    pub fn push(&mut self, note: Note) {
        if !self.items.contains(&note) {
            self.items.push(note);
        }
    }

    /// Stable sort by ascending severity; ties keep discovery order.
    pub fn sort(&mut self) {
        self.items.sort_by_key(|n| n.severity);
    }

    /// Whether a piracy note calls for moderator attention.
    pub fn requires_moderation(&self) -> bool {
        self.items.iter().any(|n| n.severity == Severity::Piracy)
    }

    /// Rendered lines in current order.
    pub fn render_lines(&self) -> Vec<String> {
        self.items.iter().map(Note::render).collect()
    }

    /// Notes in current order.
    pub fn iter(&self) -> impl Iterator<Item = &Note> {
        self.items.iter()
    }

    /// Number of notes.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there are no notes.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Extend<Note> for Notes {
    fn extend<I: IntoIterator<Item = Note>>(&mut self, iter: I) {
        for note in iter {
            self.push(note);
        }
    }
}

impl IntoIterator for Notes {
    type Item = Note;
    type IntoIter = std::vec::IntoIter<Note>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Runs the rule sequence, with access to the integrity lookup.
pub struct RuleEngine {
    lookup: Arc<dyn IntegrityLookup>,
    cache_dir: PathBuf,
    timeout: Duration,
}

impl RuleEngine {
    /// Engine using `lookup` for the broken-dump check.
    pub fn new(lookup: Arc<dyn IntegrityLookup>, cache_dir: PathBuf, timeout: Duration) -> Self {
        Self {
            lookup,
            cache_dir,
            timeout,
        }
    }

    /// Engine configured from the `[integrity]` section.
    pub fn from_config(
        lookup: Arc<dyn IntegrityLookup>,
        config: &IntegrityConfig,
        cache_dir: PathBuf,
    ) -> Self {
        Self::new(lookup, cache_dir, Duration::from_secs(config.timeout_secs))
    }

    /// Run the integrity lookup, then every rule.
    pub async fn evaluate_with_lookup(
        &self,
        facts: &FactSet,
        outcome: &ParseOutcome,
        cancel: &CancelSignal,
        now: DateTime<Utc>,
    ) -> Notes {
        let verdict = integrity::check(
            self.lookup.as_ref(),
            facts,
            &self.cache_dir,
            self.timeout,
            cancel,
        )
        .await;
        Self::evaluate(facts, outcome, &verdict, now)
    }

    /// Evaluate every rule in order and return the notes sorted by severity.
    pub fn evaluate(
        facts: &FactSet,
        outcome: &ParseOutcome,
        verdict: &IntegrityVerdict,
        now: DateTime<Utc>,
    ) -> Notes {
        let mut notes = Notes::new();

        if let Some(note) = game::check_fatal_error(facts) {
            notes.push(note);
        }
        notes.extend(game::check_decrypt_and_boot(facts));
        if let Some(note) = game::check_broken_dump(facts, verdict) {
            notes.push(note);
        }
        if let Some(note) = game::check_firmware(facts) {
            notes.push(note);
        }
        notes.extend(game::check_boot_path(facts));
        notes.extend(game::check_empty_log(facts));

        notes.extend(hardware::check_cpu(facts));
        let gpu = hardware::check_gpu(facts);
        notes.extend(gpu.notes);

        if let Some(note) = game::check_shader_errors(facts, gpu.supported) {
            notes.push(note);
        }
        if let Some(note) = game::check_patches(facts) {
            notes.push(note);
        }
        if let Some(note) = game::check_vertex_cache(facts) {
            notes.push(note);
        }
        notes.extend(game::check_disc_category(facts));
        notes.extend(game::check_runtime_errors(facts));
        notes.extend(build_age::check_build_age(facts, now));

        if *outcome == ParseOutcome::Truncated {
            notes.push(Note::new(
                Severity::Informational,
                "The log was too large, so only the last processed run is shown",
            ));
        }

        notes.sort();
        notes
    }
}
