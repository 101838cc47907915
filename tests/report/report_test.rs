//! Tests for `src/report.rs`: composition, licenses, paging and moderation.

use emulog::extractor::{FactSet, Field, ParseOutcome};
use emulog::pager::MAX_DESCRIPTION_LENGTH;
use emulog::report::{
    compose, failure_report, into_units, Analysis, ReportStatus, FAILURE_MESSAGE, PIRACY_MESSAGE,
};
use emulog::rules::{Note, Notes, Severity};

fn analysis(facts: FactSet, outcome: ParseOutcome, notes: Notes) -> Analysis {
    Analysis {
        source_name: "RPCS3.log.gz".to_owned(),
        facts,
        outcome,
        notes,
    }
}

fn game_facts() -> FactSet {
    let mut facts = FactSet::new();
    facts.record(Field::BuildVersion, "0.0.9");
    facts.record(Field::BuildNumber, "10215");
    facts.record(Field::BuildBranch, "HEAD");
    facts.record(Field::Serial, "BLUS30443");
    facts.record(Field::GameTitle, "Demon's Souls");
    facts.record(Field::CpuModel, "AMD Ryzen 7 1700");
    facts.record(Field::ThreadCount, "16");
    facts
}

#[test]
fn failure_report_has_no_fields() {
    let report = failure_report("broken.log");
    assert_eq!(report.title, "broken.log");
    assert_eq!(report.description, FAILURE_MESSAGE);
    assert_eq!(report.status, ReportStatus::Failed);
    assert!(report.fields.is_empty());

    let composed = compose(
        &analysis(
            game_facts(),
            ParseOutcome::Failure {
                reason: "stream error".to_owned(),
            },
            Notes::new(),
        ),
        10,
    )
    .expect("valid limit");
    assert_eq!(composed.status, ReportStatus::Failed);
}

#[test]
fn piracy_outcome_goes_to_moderation() {
    let report = compose(
        &analysis(
            game_facts(),
            ParseOutcome::PiracyDetected {
                trigger: "Loaded cracked executable".to_owned(),
                context: vec!["a".to_owned(), "b".to_owned()],
            },
            Notes::new(),
        ),
        10,
    )
    .expect("valid limit");

    assert_eq!(report.status, ReportStatus::Piracy);
    assert_eq!(report.description, PIRACY_MESSAGE);
    assert!(report.fields.is_empty());
    let moderation = report.moderation.expect("moderation data");
    assert_eq!(moderation.trigger, "Loaded cracked executable");
    assert_eq!(moderation.context, vec!["a", "b"]);
}

#[test]
fn piracy_note_requests_moderation_with_facts() {
    let mut facts = game_facts();
    facts.record(Field::GameCategory, "HG");
    let mut notes = Notes::new();
    notes.push(Note::new(Severity::Piracy, "Disc game installed as a PKG"));

    let report =
        compose(&analysis(facts, ParseOutcome::Success, notes), 10).expect("valid limit");
    assert_eq!(report.status, ReportStatus::Piracy);
    let moderation = report.moderation.expect("moderation data");
    assert_eq!(moderation.trigger, "Disc game installed as a PKG");
    assert_eq!(
        moderation.context,
        vec!["serial: BLUS30443", "game_category: HG"]
    );
}

#[test]
fn summary_and_title_describe_the_run() {
    let mut notes = Notes::new();
    notes.push(Note::new(Severity::Advisory, "Something to look at"));
    let report =
        compose(&analysis(game_facts(), ParseOutcome::Success, notes), 10).expect("valid limit");

    assert_eq!(report.title, "Demon's Souls [BLUS30443]");
    assert!(report.description.contains("RPCS3 v0.0.9-10215 (HEAD)"));
    assert!(report.description.contains("AMD Ryzen 7 1700 (16 threads)"));
    assert!(report.description.chars().count() <= MAX_DESCRIPTION_LENGTH);
    assert_eq!(report.status, ReportStatus::Warning);
    assert!(report.moderation.is_none());
    assert_eq!(report.fields.len(), 1);
    assert_eq!(report.fields[0].title, "Notes");
    assert_eq!(report.fields[0].body, "⚠ Something to look at");
}

#[test]
fn fatal_error_is_a_code_block() {
    let mut facts = FactSet::new();
    facts.record(Field::FatalError, "Verification failed (in file psf.cpp:123)");
    let report =
        compose(&analysis(facts, ParseOutcome::Success, Notes::new()), 10).expect("valid limit");

    assert_eq!(report.title, "RPCS3.log.gz");
    assert_eq!(report.fields[0].title, "Fatal Error");
    assert_eq!(
        report.fields[0].body,
        "```Verification failed (in file psf.cpp:123)```"
    );
    assert_eq!(report.status, ReportStatus::Clean);
}

#[test]
fn missing_licenses_are_capped_and_skip_bogus_names() {
    let mut facts = FactSet::new();
    facts.record(
        Field::RapFile,
        "/dev_hdd0/home/00000001/exdata/UP0001-BLUS30188_00-0000000000000000.rap",
    );
    for i in 0..7 {
        facts.record(
            Field::RapFile,
            &format!("/dev_hdd0/home/00000001/exdata/EP0000-NPEB0000{i}_00-LICENSE.rap"),
        );
    }
    let report =
        compose(&analysis(facts, ParseOutcome::Success, Notes::new()), 10).expect("valid limit");

    let licenses = &report.fields[0];
    assert_eq!(licenses.title, "Missing Licenses");
    let lines: Vec<&str> = licenses.body.lines().collect();
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0], "`EP0000-NPEB00000_00-LICENSE.rap`");
    assert_eq!(lines[4], "and 3 other licenses");
    assert!(!licenses.body.contains("BLUS30188"));
}

#[test]
fn only_bogus_licenses_add_no_field() {
    let mut facts = FactSet::new();
    facts.record(
        Field::RapFile,
        "/dev_hdd0/home/00000001/exdata/EP0001-BLES00229_00-0000000000000000.rap",
    );
    let report =
        compose(&analysis(facts, ParseOutcome::Success, Notes::new()), 10).expect("valid limit");
    assert!(report.fields.is_empty());
}

#[test]
fn many_notes_are_paged() {
    let mut notes = Notes::new();
    for i in 0..12 {
        notes.push(Note::new(Severity::Informational, format!("note {i}")));
    }
    let report =
        compose(&analysis(game_facts(), ParseOutcome::Truncated, notes), 10).expect("valid limit");

    let titles: Vec<&str> = report.fields.iter().map(|f| f.title.as_str()).collect();
    assert_eq!(titles, vec!["Notes (1/2)", "Notes (2/2)"]);
    assert_eq!(into_units(&report).len(), 1);
}

#[test]
fn zero_line_limit_is_an_error() {
    let mut notes = Notes::new();
    notes.push(Note::new(Severity::Informational, "x"));
    assert!(compose(&analysis(FactSet::new(), ParseOutcome::Success, notes), 0).is_err());
}
