//! Tests for handler selection order in `src/sources/mod.rs`.

use std::io::Write;

use emulog::sources::{Attachment, SourceRegistry};
use flate2::write::GzEncoder;
use flate2::Compression;

fn selected(name: &str, data: &[u8]) -> Option<&'static str> {
    SourceRegistry::with_defaults()
        .select(&Attachment::from_bytes(name, data.to_vec()))
        .map(|h| h.name())
}

#[test]
fn default_order_is_explicit() {
    assert_eq!(
        SourceRegistry::with_defaults().handler_names(),
        vec!["gzip", "plain", "zip", "7z"]
    );
}

#[test]
fn gzip_named_log_is_still_decompressed() {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(b"RPCS3 v0.0.9\n").expect("should write");
    let data = encoder.finish().expect("should finish");
    assert_eq!(selected("RPCS3.log", &data), Some("gzip"));
}

#[test]
fn renamed_zip_falls_through_plain_text() {
    assert_eq!(selected("RPCS3.log", b"PK\x03\x04rest-of-archive"), Some("zip"));
}

#[test]
fn renamed_seven_zip_falls_through_plain_text() {
    assert_eq!(
        selected("RPCS3.txt", &[b'7', b'z', 0xbc, 0xaf, 0x27, 0x1c, 0, 4]),
        Some("7z")
    );
}

#[test]
fn suffixes_match_case_insensitively() {
    assert_eq!(selected("RPCS3.LOG", b"RPCS3 v0.0.9"), Some("plain"));
    assert_eq!(selected("notes.TXT", b"hello"), Some("plain"));
    assert_eq!(selected("RPCS3.ZIP", b""), Some("zip"));
    assert_eq!(selected("RPCS3.7Z", b""), Some("7z"));
}

#[test]
fn unrecognized_attachments_are_not_logs() {
    assert_eq!(selected("screenshot.png", b"\x89PNG\r\n\x1a\n"), None);
    assert_eq!(selected("RPCS3.rar", b"Rar!\x1a\x07\x00"), None);
}

#[test]
fn signature_probe_reads_files_on_disk() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("upload.bin");
    std::fs::write(&path, b"PK\x03\x04....").expect("should write fixture");
    let attachment = Attachment::from_path(&path).expect("should stat fixture");
    assert_eq!(attachment.signature(), b"PK\x03\x04....");
    assert_eq!(
        SourceRegistry::with_defaults()
            .select(&attachment)
            .map(|h| h.name()),
        Some("zip")
    );
}
