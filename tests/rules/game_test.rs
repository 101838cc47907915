//! Tests for `src/rules/game.rs` and the rule ordering in `src/rules/mod.rs`.

use chrono::{TimeZone, Utc};
use emulog::extractor::{Field, ParseOutcome};
use emulog::rules::game::{
    check_boot_path, check_broken_dump, check_disc_category, check_fatal_error, check_firmware,
    check_runtime_errors, check_vertex_cache,
};
use emulog::rules::{IntegrityVerdict, RuleEngine, Severity};

use super::facts;

#[test]
fn old_firmware_gets_one_advisory() {
    let set = facts(&[(Field::FwVersionInstalled, "0.0.1")]);
    let note = check_firmware(&set).expect("old firmware should be flagged");
    assert_eq!(note.severity, Severity::Advisory);
    assert!(note.text.contains("4.80"), "got {}", note.text);

    let now = Utc.with_ymd_and_hms(2020, 5, 1, 0, 0, 0).single().expect("valid date");
    let notes = RuleEngine::evaluate(
        &set,
        &ParseOutcome::Success,
        &IntegrityVerdict::NotApplicable,
        now,
    );
    let firmware_notes = notes
        .iter()
        .filter(|n| n.severity == Severity::Advisory && n.text.contains("4.80"))
        .count();
    assert_eq!(firmware_notes, 1);
}

#[test]
fn current_and_custom_firmware() {
    assert!(check_firmware(&facts(&[(Field::FwVersionInstalled, "4.86")])).is_none());
    assert!(check_firmware(&facts(&[(Field::FwVersionInstalled, "4.80")])).is_none());

    let custom = check_firmware(&facts(&[(Field::FwVersionInstalled, "4.82 CFW")]))
        .expect("unparsable firmware should be flagged");
    assert!(custom.text.contains("Custom firmware"));
}

#[test]
fn fatal_error_classification() {
    let save = check_fatal_error(&facts(&[(
        Field::FatalError,
        "Verification failed (in file psf.cpp:123)",
    )]))
    .expect("save corruption");
    assert_eq!(save.severity, Severity::Advisory);

    let gl = check_fatal_error(&facts(&[(Field::FatalError, "Could not bind OpenGL context")]))
        .expect("missing OpenGL");
    assert_eq!(gl.severity, Severity::Critical);

    assert!(check_fatal_error(&facts(&[(Field::FatalError, "something else")])).is_none());
}

#[test]
fn broken_dump_follows_verdict() {
    let empty = facts(&[]);
    let broken = check_broken_dump(&empty, &IntegrityVerdict::Checked { broken: true })
        .expect("broken dump");
    assert_eq!(broken.severity, Severity::Critical);

    let clean = check_broken_dump(&empty, &IntegrityVerdict::Checked { broken: false })
        .expect("clean check");
    assert_eq!(clean.severity, Severity::Informational);

    assert!(check_broken_dump(&empty, &IntegrityVerdict::Unavailable).is_none());

    let edat = facts(&[(Field::EdatBlockOffset, "0x1000")]);
    assert_eq!(
        check_broken_dump(&edat, &IntegrityVerdict::Unavailable)
            .expect("edat block error")
            .severity,
        Severity::Critical
    );
}

#[test]
fn loose_executable_boots() {
    let host_root = facts(&[
        (Field::HostRootInBoot, "true"),
        (Field::ElfBootPath, "/host_root/D:/Games/BLUS30443/PS3_GAME/USRDIR/EBOOT.BIN"),
    ]);
    let notes = check_boot_path(&host_root);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].severity, Severity::Critical);

    let direct = facts(&[
        (Field::Serial, "BLUS30443"),
        (Field::ElfBootPath, "/dev_hdd0/game/BLUS30443/USRDIR/game.self"),
    ]);
    let notes = check_boot_path(&direct);
    assert_eq!(notes.len(), 1);
    assert!(notes[0].text.contains("`game.self`"));
}

#[test]
fn disc_game_installed_as_package_is_piracy() {
    let hg = facts(&[(Field::Serial, "BLES00932"), (Field::GameCategory, "HG")]);
    let notes = check_disc_category(&hg);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].severity, Severity::Piracy);

    let dg = facts(&[(Field::Serial, "NPEB00258"), (Field::GameCategory, "DG")]);
    assert!(check_disc_category(&dg)
        .iter()
        .any(|n| n.severity == Severity::Piracy));

    let legit = facts(&[(Field::Serial, "NPEB00258"), (Field::GameCategory, "HG")]);
    assert!(check_disc_category(&legit).is_empty());

    let no_serial = facts(&[(Field::GameCategory, "HG")]);
    let notes = check_disc_category(&no_serial);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].severity, Severity::Piracy);
}

#[test]
fn disc_inside_game_directory() {
    let set = facts(&[
        (Field::Serial, "BLUS30443"),
        (Field::GameCategory, "DG"),
        (Field::LdrDisc, "/dev_hdd0/game/BLUS30443"),
    ]);
    let notes = check_disc_category(&set);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].severity, Severity::Critical);
    assert!(notes[0].text.contains("/dev_hdd0/game/BLUS30443"));
}

#[test]
fn vertex_cache_only_for_known_titles() {
    let needs = facts(&[
        (Field::Serial, "NPUB30162"),
        (Field::DisableVertexCache, "false"),
    ]);
    assert!(check_vertex_cache(&needs).is_some());

    let already = facts(&[
        (Field::Serial, "NPUB30162"),
        (Field::DisableVertexCache, "true"),
    ]);
    assert!(check_vertex_cache(&already).is_none());

    let other = facts(&[
        (Field::Serial, "BLUS30443"),
        (Field::DisableVertexCache, "false"),
    ]);
    assert!(check_vertex_cache(&other).is_none());
}

#[test]
fn runtime_errors() {
    let set = facts(&[
        (Field::NativeUiInput, "true"),
        (Field::XaudioInitError, "true"),
        (Field::FwMissingMsg, "true"),
        (Field::FwMissingSomething, "true"),
    ]);
    let notes = check_runtime_errors(&set);
    assert_eq!(notes.len(), 3);
}

#[test]
fn piracy_sorts_after_critical_and_needs_moderation() {
    let set = facts(&[
        (Field::Serial, "BLES00932"),
        (Field::GameCategory, "HG"),
        (Field::FatalError, "Could not bind OpenGL context"),
        (Field::PpuDecoder, "Recompiler (LLVM)"),
        (Field::Renderer, "Vulkan"),
    ]);
    let now = Utc.with_ymd_and_hms(2020, 5, 1, 0, 0, 0).single().expect("valid date");
    let notes = RuleEngine::evaluate(
        &set,
        &ParseOutcome::Success,
        &IntegrityVerdict::NotApplicable,
        now,
    );

    let severities: Vec<Severity> = notes.iter().map(|n| n.severity).collect();
    let mut sorted = severities.clone();
    sorted.sort();
    assert_eq!(severities, sorted);
    assert_eq!(severities.last(), Some(&Severity::Piracy));
    assert!(severities.contains(&Severity::Critical));
    assert!(notes.requires_moderation());
}

#[test]
fn truncated_outcome_adds_informational_note() {
    let set = facts(&[
        (Field::PpuDecoder, "Recompiler (LLVM)"),
        (Field::Renderer, "Vulkan"),
    ]);
    let now = Utc.with_ymd_and_hms(2020, 5, 1, 0, 0, 0).single().expect("valid date");
    let notes = RuleEngine::evaluate(
        &set,
        &ParseOutcome::Truncated,
        &IntegrityVerdict::NotApplicable,
        now,
    );
    assert!(notes
        .iter()
        .any(|n| n.severity == Severity::Informational && n.text.contains("too large")));
    assert!(!notes.requires_moderation());
}

#[test]
fn empty_log_asks_for_a_new_one() {
    let now = Utc.with_ymd_and_hms(2020, 5, 1, 0, 0, 0).single().expect("valid date");
    let notes = RuleEngine::evaluate(
        &facts(&[]),
        &ParseOutcome::Success,
        &IntegrityVerdict::NotApplicable,
        now,
    );
    let texts: Vec<&str> = notes.iter().map(|n| n.text.as_str()).collect();
    assert_eq!(
        texts,
        vec!["The log is empty", "Please boot the game and upload a new log"]
    );
}
