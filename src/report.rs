//! Display-ready reports for the messaging layer.
//!
//! [`compose`] turns one finished analysis into a [`Report`]: a summary
//! description plus titled fields that respect the platform ceilings in
//! [`crate::pager`]. The messaging layer sends the fields in
//! [`MessageUnit`]s via [`into_units`].

use serde::Serialize;

use crate::extractor::{FactSet, Field, ParseOutcome};
use crate::pager::{
    break_in_field_content, fold_into_units, truncate_chars, MessageUnit, PagerError, Segment,
    MAX_DESCRIPTION_LENGTH, MAX_FIELD_LENGTH,
};
use crate::rules::{Notes, Severity};

/// Shown instead of any analysis when the log could not be read.
pub const FAILURE_MESSAGE: &str = "Log analysis failed, most likely cause is a truncated/invalid log.\nPlease run the game again and re-upload a new copy.";

/// Shown when a piracy trigger was found in the log.
pub const PIRACY_MESSAGE: &str =
    "Please remove the log and issue warning to the original author of the log";

/// License files the emulator looks for that no game actually ships.
pub const KNOWN_BOGUS_LICENSES: &[&str] = &[
    "UP0001-BLUS30188_00-0000000000000000.rap",
    "EP0001-BLES00229_00-0000000000000000.rap",
];

const MISSING_LICENSES_LIMIT: usize = 5;
const CODE_FENCE: &str = "```";

/// Everything known about one analyzed attachment.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Attachment file name.
    pub source_name: String,
    /// Facts of the last run in the log.
    pub facts: FactSet,
    /// How extraction ended.
    pub outcome: ParseOutcome,
    /// Sorted diagnostic notes.
    pub notes: Notes,
}

/// Overall verdict, used by the messaging layer to pick a color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// The log could not be analyzed.
    Failed,
    /// Pirated content was detected.
    Piracy,
    /// At least one critical note.
    Critical,
    /// At least one warning or advisory note.
    Warning,
    /// Nothing worse than informational notes.
    Clean,
}

/// Data for a moderator report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Moderation {
    /// What triggered the report.
    pub trigger: String,
    /// Supporting log lines or facts.
    pub context: Vec<String>,
}

/// A composed analysis result.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Message title.
    pub title: String,
    /// Message description, at most [`MAX_DESCRIPTION_LENGTH`] characters.
    pub description: String,
    /// Overall verdict.
    pub status: ReportStatus,
    /// Titled sections in display order.
    pub fields: Vec<Segment>,
    /// Set when the log needs moderator attention.
    pub moderation: Option<Moderation>,
}

/// The single-message report for a log that could not be read.
pub fn failure_report(source_name: &str) -> Report {
    Report {
        title: source_name.to_owned(),
        description: FAILURE_MESSAGE.to_owned(),
        status: ReportStatus::Failed,
        fields: Vec::new(),
        moderation: None,
    }
}

/// Compose the report for a finished analysis.
///
/// # Errors
///
/// Returns [`PagerError::InvalidLineLimit`] when `max_lines_per_field` is zero.
pub fn compose(analysis: &Analysis, max_lines_per_field: usize) -> Result<Report, PagerError> {
    match &analysis.outcome {
        ParseOutcome::Failure { .. } => Ok(failure_report(&analysis.source_name)),
        ParseOutcome::PiracyDetected { trigger, context } => Ok(Report {
            title: report_title(analysis),
            description: PIRACY_MESSAGE.to_owned(),
            status: ReportStatus::Piracy,
            fields: Vec::new(),
            moderation: Some(Moderation {
                trigger: trigger.clone(),
                context: context.clone(),
            }),
        }),
        ParseOutcome::Success | ParseOutcome::Truncated => {
            let mut fields = Vec::new();
            if let Some(fatal) = fatal_error_field(&analysis.facts) {
                fields.push(fatal);
            }
            if let Some(licenses) = missing_licenses_field(&analysis.facts) {
                fields.push(licenses);
            }
            fields.extend(notes_fields(&analysis.notes, max_lines_per_field)?);

            Ok(Report {
                title: report_title(analysis),
                description: truncate_chars(&summary(&analysis.facts), MAX_DESCRIPTION_LENGTH),
                status: status_for(&analysis.notes),
                fields,
                moderation: piracy_moderation(analysis),
            })
        }
    }
}

/// Fold the report's fields into message units.
pub fn into_units(report: &Report) -> Vec<MessageUnit> {
    fold_into_units(report.fields.iter().cloned())
}

fn report_title(analysis: &Analysis) -> String {
    let facts = &analysis.facts;
    match (facts.get(Field::GameTitle), facts.get(Field::Serial)) {
        (Some(title), Some(serial)) => format!("{title} [{serial}]"),
        (Some(title), None) => title.to_owned(),
        (None, Some(serial)) => serial.to_owned(),
        (None, None) => analysis.source_name.clone(),
    }
}

fn summary(facts: &FactSet) -> String {
    let mut lines = Vec::new();

    if let Some(version) = facts.get(Field::BuildVersion) {
        let mut build = format!("RPCS3 v{version}");
        if let Some(number) = facts.get(Field::BuildNumber) {
            build.push('-');
            build.push_str(number);
        }
        if let Some(branch) = facts.get(Field::BuildBranch) {
            build.push_str(&format!(" ({branch})"));
        }
        lines.push(format!("**Build:** {build}"));
    }
    if let Some(cpu) = facts.get(Field::CpuModel) {
        match facts.get(Field::ThreadCount) {
            Some(threads) => lines.push(format!("**CPU:** {cpu} ({threads} threads)")),
            None => lines.push(format!("**CPU:** {cpu}")),
        }
    }
    if let Some(gpu) = facts.get(Field::GpuInfo) {
        match facts.get(Field::DriverVersionInfo) {
            Some(driver) => lines.push(format!("**GPU:** {gpu} (driver {driver})")),
            None => lines.push(format!("**GPU:** {gpu}")),
        }
    }
    if let Some(os) = facts.get(Field::OsPath) {
        lines.push(format!("**OS:** {os}"));
    }
    if let Some(renderer) = facts.get(Field::Renderer) {
        lines.push(format!("**Renderer:** {renderer}"));
    }
    if let Some(firmware) = facts.get(Field::FwVersionInstalled) {
        lines.push(format!("**Firmware:** {firmware}"));
    }

    if lines.is_empty() {
        "No system information found in the log".to_owned()
    } else {
        lines.join("\n")
    }
}

fn fatal_error_field(facts: &FactSet) -> Option<Segment> {
    let errors = facts.values(Field::FatalError);
    if errors.is_empty() {
        return None;
    }
    let budget = MAX_FIELD_LENGTH.saturating_sub(CODE_FENCE.len().saturating_mul(2));
    let body = truncate_chars(&errors.join("\n"), budget);
    Some(Segment::new(
        "Fatal Error",
        format!("{CODE_FENCE}{body}{CODE_FENCE}"),
    ))
}

fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

fn missing_licenses_field(facts: &FactSet) -> Option<Segment> {
    let mut names: Vec<&str> = Vec::new();
    for path in facts.values(Field::RapFile) {
        let name = file_name(path);
        if !name.is_empty() && !names.contains(&name) && !KNOWN_BOGUS_LICENSES.contains(&name) {
            names.push(name);
        }
    }
    if names.is_empty() {
        return None;
    }

    let quoted: Vec<String> = names.iter().map(|n| format!("`{n}`")).collect();
    let body = if quoted.len() > MISSING_LICENSES_LIMIT {
        let shown = MISSING_LICENSES_LIMIT.saturating_sub(1);
        let other = quoted.len().saturating_sub(shown);
        let suffix = if other == 1 { "" } else { "s" };
        let mut body = quoted.get(..shown).unwrap_or_default().join("\n");
        body.push_str(&format!("\nand {other} other license{suffix}"));
        body
    } else {
        quoted.join("\n")
    };
    Some(Segment::new("Missing Licenses", body))
}

fn notes_fields(notes: &Notes, max_lines_per_field: usize) -> Result<Vec<Segment>, PagerError> {
    let segments = break_in_field_content(notes.render_lines(), max_lines_per_field)?;
    let total = segments.len();
    Ok(segments
        .into_iter()
        .enumerate()
        .map(|(i, segment)| {
            let title = if total == 1 {
                "Notes".to_owned()
            } else {
                format!("Notes ({}/{total})", i.saturating_add(1))
            };
            Segment::new(title, segment.body)
        })
        .collect())
}

fn status_for(notes: &Notes) -> ReportStatus {
    match notes.iter().map(|n| n.severity).max() {
        Some(Severity::Piracy) => ReportStatus::Piracy,
        Some(Severity::Critical) => ReportStatus::Critical,
        Some(Severity::Warning | Severity::Advisory) => ReportStatus::Warning,
        Some(Severity::Informational) | None => ReportStatus::Clean,
    }
}

fn piracy_moderation(analysis: &Analysis) -> Option<Moderation> {
    if !analysis.notes.requires_moderation() {
        return None;
    }
    let trigger = analysis
        .notes
        .iter()
        .find(|n| n.severity == Severity::Piracy)
        .map(|n| n.text.clone())
        .unwrap_or_default();
    let context = [Field::Serial, Field::GameCategory, Field::LdrGameSerial]
        .into_iter()
        .filter_map(|f| analysis.facts.get(f).map(|v| format!("{f}: {v}")))
        .collect();
    Some(Moderation { trigger, context })
}
