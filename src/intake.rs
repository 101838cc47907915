//! Per-attachment pipeline.
//!
//! [`Intake::process`] takes an intake slot, picks a source handler, streams
//! the decompressed log through the extractor while the handler is still
//! decompressing, runs the rules and composes the report. Every path returns
//! a definite [`IntakeResponse`] and releases the slot.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, error, warn};

use crate::cancel::CancelSignal;
use crate::config::EmulogConfig;
use crate::extractor::{read_pipe, Extraction, ExtractorOptions, ParseOutcome};
use crate::limiter::IntakeLimiter;
use crate::report::{self, failure_report, Analysis, Report};
use crate::rules::RuleEngine;
use crate::sources::{pipe, spawn_producer, Attachment, SourceHandler, SourceRegistry};

/// Sent instead of any analysis when every intake slot is busy.
pub const REJECTION_MESSAGE: &str = "Log processing is rate limited, try again a bit later";

/// Why an attachment was not analyzed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The name ends with an ignored suffix such as `tty.log`.
    IgnoredName {
        /// The matching suffix.
        suffix: String,
    },
    /// No handler recognized the attachment.
    NotALog,
}

/// Result of offering one attachment to the pipeline.
#[derive(Debug, Clone)]
pub enum IntakeResponse {
    /// Every slot was busy; reply with [`REJECTION_MESSAGE`].
    Rejected,
    /// Not something to analyze.
    Skipped(SkipReason),
    /// The attachment was analyzed. Failures produce a failure report.
    Analyzed(Box<Report>),
}

/// The intake pipeline and its shared collaborators.
pub struct Intake {
    limiter: IntakeLimiter,
    registry: Arc<SourceRegistry>,
    engine: Arc<RuleEngine>,
    extractor: ExtractorOptions,
    config: EmulogConfig,
}

impl Intake {
    /// Pipeline over explicit collaborators.
    pub fn new(
        config: EmulogConfig,
        limiter: IntakeLimiter,
        registry: SourceRegistry,
        engine: RuleEngine,
    ) -> Self {
        Self {
            limiter,
            registry: Arc::new(registry),
            engine: Arc::new(engine),
            extractor: ExtractorOptions::from(&config.extractor),
            config,
        }
    }

    /// The gate this pipeline acquires slots from.
    pub fn limiter(&self) -> &IntakeLimiter {
        &self.limiter
    }

    /// Process one attachment without external cancellation.
    pub async fn process(&self, attachment: Attachment) -> IntakeResponse {
        self.process_with_cancel(attachment, CancelSignal::never())
            .await
    }

    /// Process one attachment; `cancel` reaches the decompressor, the
    /// extractor and the integrity lookup.
    pub async fn process_with_cancel(
        &self,
        attachment: Attachment,
        cancel: CancelSignal,
    ) -> IntakeResponse {
        let Ok(_slot) = self.limiter.try_acquire() else {
            warn!(attachment = %attachment.name, "log processing rate limited");
            return IntakeResponse::Rejected;
        };

        if let Some(suffix) = self
            .config
            .intake
            .ignored_suffixes
            .iter()
            .find(|s| attachment.has_suffix(s))
        {
            debug!(attachment = %attachment.name, suffix = %suffix, "ignored attachment");
            return IntakeResponse::Skipped(SkipReason::IgnoredName {
                suffix: suffix.clone(),
            });
        }

        let Some(handler) = self.registry.select(&attachment) else {
            debug!(attachment = %attachment.name, "no handler recognized attachment");
            return IntakeResponse::Skipped(SkipReason::NotALog);
        };

        let started = Instant::now();
        debug!(
            attachment = %attachment.name,
            size = attachment.size,
            format = handler.name(),
            ">>> parsing log"
        );
        let report = self.analyze(handler, attachment, cancel).await;
        debug!(
            elapsed_ms = started.elapsed().as_millis(),
            status = ?report.status,
            "<<< finished parsing"
        );
        IntakeResponse::Analyzed(Box::new(report))
    }

    async fn analyze(
        &self,
        handler: Arc<dyn SourceHandler>,
        attachment: Attachment,
        cancel: CancelSignal,
    ) -> Report {
        let source_name = attachment.name.clone();
        let (writer, mut reader) = pipe(
            self.config.intake.pipe_capacity,
            self.config.intake.chunk_size,
        );
        let producer = spawn_producer(handler, attachment, writer, cancel.clone());

        let mut extractor_cancel = cancel.clone();
        let extraction = read_pipe(&mut reader, &self.extractor, &mut extractor_cancel).await;
        drop(reader);

        if let Err(e) = producer.await {
            error!(attachment = %source_name, error = %e, "decompression task failed");
        }

        if let ParseOutcome::Failure { reason } = &extraction.outcome {
            error!(attachment = %source_name, reason = %reason, "log parsing failed");
            return failure_report(&source_name);
        }

        self.compose(source_name, extraction, cancel).await
    }

    /// Rules and composition run on their own task so a panic in either
    /// becomes a failure report for this run only.
    async fn compose(
        &self,
        source_name: String,
        extraction: Extraction,
        cancel: CancelSignal,
    ) -> Report {
        let engine = Arc::clone(&self.engine);
        let max_lines = self.config.pager.max_lines_per_field;
        let name = source_name.clone();

        let composed = tokio::spawn(async move {
            let Extraction { facts, outcome, .. } = extraction;
            let notes = engine
                .evaluate_with_lookup(&facts, &outcome, &cancel, Utc::now())
                .await;
            let analysis = Analysis {
                source_name: name,
                facts,
                outcome,
                notes,
            };
            report::compose(&analysis, max_lines)
        })
        .await;

        match composed {
            Ok(Ok(report)) => report,
            Ok(Err(e)) => {
                error!(attachment = %source_name, error = %e, "report composition failed");
                failure_report(&source_name)
            }
            Err(e) => {
                error!(attachment = %source_name, error = %e, "report composition panicked");
                failure_report(&source_name)
            }
        }
    }
}
