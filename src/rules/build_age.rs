//! Build-age classification for mainline emulator builds.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};

use crate::extractor::{FactSet, Field};

use super::{Note, Severity};

/// Branches whose builds are expected to be kept current (lowercase).
pub const TRACKED_BRANCHES: &[&str] = &["head", "master", "spu_perf"];

/// Age thresholds in days, mildest first, with the severity each one starts.
pub const AGE_BUCKETS: &[(i64, Severity)] = &[
    (3, Severity::Informational),
    (14, Severity::Advisory),
    (30, Severity::Warning),
    (90, Severity::Critical),
    (180, Severity::Critical),
];

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Parse a build timestamp: RFC 3339, a naive date-time (read as UTC) or a
/// plain date (midnight UTC).
pub fn parse_build_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    let raw = raw.split('.').next().unwrap_or(raw);
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
}

/// Severity for a build of the given age, `None` while it is still fresh.
pub fn classify_age(age: TimeDelta) -> Option<Severity> {
    let days = age.num_days();
    AGE_BUCKETS
        .iter()
        .rev()
        .find(|(threshold, _)| days >= *threshold)
        .map(|(_, severity)| *severity)
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

/// Human description such as `5 days`, `3 weeks`, `4 months` or `1 year and 2 months`.
pub fn describe_delta(delta: TimeDelta) -> String {
    let days = delta.num_days();
    if days < 1 {
        return plural(delta.num_hours().max(0), "hour");
    }
    if days < 14 {
        return plural(days, "day");
    }
    if days < 60 {
        return plural(days / 7, "week");
    }
    if days < 365 {
        return plural(days / 30, "month");
    }
    let years = days / 365;
    let months = (days % 365) / 30;
    if months == 0 {
        plural(years, "year")
    } else {
        format!("{} and {}", plural(years, "year"), plural(months, "month"))
    }
}

/// Outdated-build notes for tracked branches with a known build date.
///
/// Missing or unparsable dates and future dates produce no age note. The
/// `spu_perf` branch always gets a note recommending master.
pub fn check_build_age(facts: &FactSet, now: DateTime<Utc>) -> Vec<Note> {
    let mut notes = Vec::new();
    let Some(branch) = facts.get(Field::BuildBranch).map(str::to_ascii_lowercase) else {
        return notes;
    };
    if !TRACKED_BRANCHES.contains(&branch.as_str()) {
        return notes;
    }

    if let Some(built) = facts.get(Field::BuildDate).and_then(parse_build_date) {
        let age = now.signed_duration_since(built);
        if let Some(severity) = classify_age(age) {
            notes.push(Note::new(
                severity,
                format!(
                    "This RPCS3 build is {} old, please consider updating it",
                    describe_delta(age)
                ),
            ));
        }
    }

    if branch == "spu_perf" {
        notes.push(Note::new(
            Severity::Informational,
            format!("`{branch}` build is obsolete, current master build offers at least the same level of performance and includes many additional improvements"),
        ));
    }
    notes
}
