//! Tests for `src/intake.rs`: the full attachment pipeline.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;

use emulog::cancel::{cancel_pair, CancelSignal};
use emulog::config::EmulogConfig;
use emulog::intake::{Intake, IntakeResponse, SkipReason};
use emulog::limiter::IntakeLimiter;
use emulog::report::{Report, ReportStatus, FAILURE_MESSAGE, PIRACY_MESSAGE};
use emulog::rules::{IntegrityLookup, LookupError, Manifest, NoIntegrityLookup, RuleEngine};
use emulog::sources::{Attachment, SourceRegistry};

const GAME_LOG: &str = "RPCS3 v0.0.9-10215-c7c7e45b Alpha | HEAD\n\
AMD Ryzen 7 1700 Eight-Core Processor | 16 Threads | 15.9 GiB RAM\n\
·! 0:00:00.000341 SYS: Path: D:\\Games\\RPCS3\\\n\
·! 0:00:00.000400 SYS: Firmware version: 4.86\n\
·! 0:00:01.000000 SYS: Serial: BLUS30443\n\
·! 0:00:01.000000 SYS: Title: Demon's Souls\n\
·! 0:00:01.000000 SYS: Category: DG\n\
PPU Decoder: Recompiler (LLVM)\n\
Renderer: Vulkan\n\
·E 0:00:05.000000 {rsx::thread} RSX: Shader compilation failed\n";

struct PanickingLookup;

#[async_trait]
impl IntegrityLookup for PanickingLookup {
    async fn fetch_manifests(
        &self,
        _product_code: &str,
        _cache_dir: &Path,
        _cancel: CancelSignal,
    ) -> Result<Vec<Manifest>, LookupError> {
        panic!("manifest service crashed");
    }
}

fn intake_with(lookup: Arc<dyn IntegrityLookup>, capacity: usize) -> Intake {
    let engine = RuleEngine::new(lookup, "/tmp/emulog-ird".into(), Duration::from_secs(1));
    Intake::new(
        EmulogConfig::default(),
        IntakeLimiter::new(capacity),
        SourceRegistry::with_defaults(),
        engine,
    )
}

fn intake(capacity: usize) -> Intake {
    intake_with(Arc::new(NoIntegrityLookup), capacity)
}

fn gzip(text: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(text.as_bytes())
        .expect("should compress");
    encoder.finish().expect("should finish gzip")
}

fn analyzed(response: IntakeResponse) -> Report {
    match response {
        IntakeResponse::Analyzed(report) => *report,
        other => panic!("expected an analysis, got {other:?}"),
    }
}

#[tokio::test]
async fn gzip_log_is_analyzed_end_to_end() {
    let intake = intake(2);
    let report = analyzed(
        intake
            .process(Attachment::from_bytes("RPCS3.log.gz", gzip(GAME_LOG)))
            .await,
    );

    assert_eq!(report.title, "Demon's Souls [BLUS30443]");
    assert_eq!(report.status, ReportStatus::Critical);
    assert!(report.description.contains("RPCS3 v0.0.9-10215 (HEAD)"));
    assert!(report.description.contains("**OS:** Windows"));
    let notes = report
        .fields
        .iter()
        .find(|f| f.title == "Notes")
        .expect("notes field");
    assert!(notes.body.contains("shader cache corruption"));
    assert_eq!(intake.limiter().available(), 2);
}

#[tokio::test]
async fn plain_log_with_trigger_goes_to_moderation() {
    let log = format!("{GAME_LOG}·! 0:00:06.000000 SYS: Loaded cracked executable\n");
    let report = analyzed(
        intake(1)
            .process(Attachment::from_bytes("RPCS3.log", log.into_bytes()))
            .await,
    );

    assert_eq!(report.status, ReportStatus::Piracy);
    assert_eq!(report.description, PIRACY_MESSAGE);
    let moderation = report.moderation.expect("moderation data");
    assert_eq!(moderation.trigger, "Loaded cracked executable");
    assert_eq!(moderation.context.len(), 3);
}

#[tokio::test]
async fn tty_logs_are_ignored() {
    let response = intake(1)
        .process(Attachment::from_bytes("RPCS3_TTY.LOG", GAME_LOG.as_bytes().to_vec()))
        .await;
    assert!(matches!(
        response,
        IntakeResponse::Skipped(SkipReason::IgnoredName { ref suffix }) if suffix == "tty.log"
    ));
}

#[tokio::test]
async fn unknown_attachments_are_skipped() {
    let png = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
    let response = intake(1)
        .process(Attachment::from_bytes("screenshot.png", png))
        .await;
    assert!(matches!(
        response,
        IntakeResponse::Skipped(SkipReason::NotALog)
    ));
}

#[tokio::test]
async fn full_limiter_rejects_without_analysis() {
    let intake = intake(1);
    let held = intake
        .limiter()
        .try_acquire()
        .expect("slot should be free");

    let response = intake
        .process(Attachment::from_bytes("RPCS3.log", GAME_LOG.as_bytes().to_vec()))
        .await;
    assert!(matches!(response, IntakeResponse::Rejected));

    drop(held);
    let response = intake
        .process(Attachment::from_bytes("RPCS3.log", GAME_LOG.as_bytes().to_vec()))
        .await;
    assert!(matches!(response, IntakeResponse::Analyzed(_)));
}

#[tokio::test]
async fn corrupt_archive_gives_failure_report() {
    let mut bytes = vec![0x1f, 0x8b, 0x08, 0x00];
    bytes.extend_from_slice(&[0xff; 64]);
    let intake = intake(1);
    let report = analyzed(
        intake
            .process(Attachment::from_bytes("RPCS3.log.gz", bytes))
            .await,
    );

    assert_eq!(report.status, ReportStatus::Failed);
    assert_eq!(report.description, FAILURE_MESSAGE);
    assert_eq!(intake.limiter().available(), 1);
}

#[tokio::test]
async fn panicking_rule_stage_fails_only_this_run() {
    let log = format!(
        "{GAME_LOG}·E 0:00:07.000000 SYS: Failed to open file '/dev_bdvd/PS3_GAME/USRDIR/data.pak'\n"
    );
    let intake = intake_with(Arc::new(PanickingLookup), 1);

    let report = analyzed(
        intake
            .process(Attachment::from_bytes("RPCS3.log", log.into_bytes()))
            .await,
    );
    assert_eq!(report.status, ReportStatus::Failed);
    assert_eq!(intake.limiter().available(), 1);

    let report = analyzed(
        intake
            .process(Attachment::from_bytes("RPCS3.log", GAME_LOG.as_bytes().to_vec()))
            .await,
    );
    assert_eq!(report.status, ReportStatus::Critical);
}

#[tokio::test]
async fn cancelled_run_gives_failure_report() {
    let (handle, signal) = cancel_pair();
    handle.cancel();

    let intake = intake(1);
    let report = analyzed(
        intake
            .process_with_cancel(
                Attachment::from_bytes("RPCS3.log.gz", gzip(GAME_LOG)),
                signal,
            )
            .await,
    );
    assert_eq!(report.status, ReportStatus::Failed);
    assert_eq!(intake.limiter().available(), 1);
}
