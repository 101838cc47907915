//! emulog: triage for user-submitted emulator logs.
//!
//! Accepts plain or compressed log attachments, streams the decompressed text
//! through a bounded single-pass fact extractor, and runs a rule engine that
//! turns the extracted facts into severity-ranked notes shaped for a chat
//! platform's display limits.
//!
//! See `DESIGN.md` for the component breakdown.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Cooperative cancellation shared by the stages of one run.
pub mod cancel;
/// Configuration loading and validation.
pub mod config;
/// Streaming fact extraction from decompressed log text.
pub mod extractor;
/// Per-attachment orchestration wrapped by the intake limiter.
pub mod intake;
/// Global non-queueing concurrency gate.
pub mod limiter;
/// Structured logging setup.
pub mod logging;
/// Splitting long line sequences into display-sized segments.
pub mod pager;
/// Display-ready reports for the messaging layer.
pub mod report;
/// Diagnostic rules over extracted facts.
pub mod rules;
/// Container format detection and decompression.
pub mod sources;
