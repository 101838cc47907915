//! Tests for `src/rules/build_age.rs`.

use chrono::{DateTime, TimeZone, Utc};
use emulog::extractor::Field;
use emulog::rules::build_age::check_build_age;
use emulog::rules::Severity;

use super::facts;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 5, 1, 0, 0, 0).single().expect("valid date")
}

#[test]
fn month_old_master_build_is_a_warning() {
    let notes = check_build_age(
        &facts(&[
            (Field::BuildBranch, "HEAD"),
            (Field::BuildDate, "2020-04-01"),
        ]),
        now(),
    );
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].severity, Severity::Warning);
    assert_eq!(
        notes[0].text,
        "This RPCS3 build is 4 weeks old, please consider updating it"
    );
}

#[test]
fn fresh_and_future_builds_are_quiet() {
    for date in ["2020-04-30 18:00:00", "2020-06-01"] {
        let notes = check_build_age(
            &facts(&[(Field::BuildBranch, "master"), (Field::BuildDate, date)]),
            now(),
        );
        assert!(notes.is_empty(), "{date} produced {notes:?}");
    }
}

#[test]
fn untracked_branches_and_missing_dates_are_ignored() {
    let fork = facts(&[
        (Field::BuildBranch, "my-fork"),
        (Field::BuildDate, "2018-01-01"),
    ]);
    assert!(check_build_age(&fork, now()).is_empty());

    let undated = facts(&[(Field::BuildBranch, "HEAD")]);
    assert!(check_build_age(&undated, now()).is_empty());
}

#[test]
fn spu_perf_is_always_obsolete() {
    let notes = check_build_age(&facts(&[(Field::BuildBranch, "spu_perf")]), now());
    assert_eq!(notes.len(), 1);
    assert!(notes[0].text.contains("obsolete"));
}

#[test]
fn ancient_build_is_critical() {
    let notes = check_build_age(
        &facts(&[
            (Field::BuildBranch, "HEAD"),
            (Field::BuildDate, "2019-01-15T10:00:00Z"),
        ]),
        now(),
    );
    assert_eq!(notes[0].severity, Severity::Critical);
    assert!(notes[0].text.contains("1 year and 3 months"));
}
