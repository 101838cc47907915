//! Streaming fact extraction.
//!
//! [`read_pipe`] consumes decompressed log bytes from a [`PipeReader`] one
//! chunk at a time, splits them into lines and scans every line against the
//! [`catalog`]. Only the last emulator run survives: a run-boundary line
//! starts a fresh fact set. Scanning stops at the configured byte ceiling
//! (`Truncated`, reporting the last run that finished before the ceiling),
//! at the first piracy trigger (`PiracyDetected`), or on a stream error or
//! cancellation (`Failure`, unless a trigger was already seen).

pub mod catalog;
pub mod facts;

use std::collections::VecDeque;

use serde::Serialize;
use tracing::debug;

use crate::cancel::CancelSignal;
use crate::config::ExtractorConfig;
use crate::sources::PipeReader;

pub use catalog::{is_run_boundary, scan_line, RUN_BOUNDARY};
pub use facts::{FactKind, FactSet, Field};

/// A line longer than this without a newline is scanned as-is and dropped.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Extraction limits and trigger phrases.
#[derive(Debug, Clone)]
pub struct ExtractorOptions {
    /// Decompressed bytes scanned before giving up with `Truncated`.
    pub max_log_bytes: u64,
    /// Lines captured on each side of a piracy trigger.
    pub context_lines: usize,
    /// Case-sensitive literal phrases that end extraction immediately.
    pub piracy_triggers: Vec<String>,
}

impl From<&ExtractorConfig> for ExtractorOptions {
    fn from(config: &ExtractorConfig) -> Self {
        Self {
            max_log_bytes: config.max_log_bytes,
            context_lines: config.context_lines,
            piracy_triggers: config.piracy_triggers.clone(),
        }
    }
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self::from(&ExtractorConfig::default())
    }
}

/// How extraction ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ParseOutcome {
    /// The whole stream was scanned.
    Success,
    /// The byte ceiling was reached; facts cover the last run that finished
    /// before it, or the cut run when it is the only one.
    Truncated,
    /// A trigger phrase matched.
    PiracyDetected {
        /// The trigger phrase that matched.
        trigger: String,
        /// Lines surrounding the matching line, in log order.
        context: Vec<String>,
    },
    /// The stream could not be read to the end.
    Failure {
        /// Short description for operator logs.
        reason: String,
    },
}

impl ParseOutcome {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Truncated => "truncated",
            Self::PiracyDetected { .. } => "piracy_detected",
            Self::Failure { .. } => "failure",
        }
    }

    /// Whether the run failed and its facts must not be used.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }
}

/// Result of one extraction run.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Facts of the last run. Empty on failure.
    pub facts: FactSet,
    /// How extraction ended.
    pub outcome: ParseOutcome,
    /// Decompressed bytes consumed, capped at the ceiling.
    pub bytes_scanned: u64,
}

/// Consume the pipe and extract facts from the last run in it.
///
/// Never returns an error: stream failures and cancellation become
/// [`ParseOutcome::Failure`].
pub async fn read_pipe(
    reader: &mut PipeReader,
    options: &ExtractorOptions,
    cancel: &mut CancelSignal,
) -> Extraction {
    let mut scanner = LineScanner::new(options);
    let mut bytes_scanned: u64 = 0;
    let mut truncated = false;

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return scanner.interrupted("cancelled".to_owned(), bytes_scanned);
            }
            next = reader.next_chunk() => next,
        };
        let chunk = match next {
            None => break,
            Some(Ok(chunk)) => chunk,
            Some(Err(e)) => return scanner.interrupted(e.to_string(), bytes_scanned),
        };

        let remaining = options.max_log_bytes.saturating_sub(bytes_scanned);
        let take = usize::try_from(remaining)
            .unwrap_or(usize::MAX)
            .min(chunk.len());
        bytes_scanned = bytes_scanned.saturating_add(u64::try_from(take).unwrap_or(u64::MAX));

        if scanner.feed_bytes(chunk.get(..take).unwrap_or_default()) == Step::Done {
            return scanner.finish(false, bytes_scanned);
        }
        if take < chunk.len() {
            truncated = true;
            break;
        }
    }

    if !truncated {
        scanner.flush();
    }
    scanner.finish(truncated, bytes_scanned)
}

fn failure(reason: String, bytes_scanned: u64) -> Extraction {
    debug!(reason = %reason, bytes_scanned, "extraction failed");
    Extraction {
        facts: FactSet::new(),
        outcome: ParseOutcome::Failure { reason },
        bytes_scanned,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Done,
}

struct PiracyCapture {
    trigger: String,
    context: Vec<String>,
    remaining: usize,
}

/// Line-level state machine behind [`read_pipe`].
struct LineScanner<'a> {
    options: &'a ExtractorOptions,
    facts: FactSet,
    completed: Option<FactSet>,
    pending: Vec<u8>,
    recent: VecDeque<String>,
    capture: Option<PiracyCapture>,
}

impl<'a> LineScanner<'a> {
    fn new(options: &'a ExtractorOptions) -> Self {
        Self {
            options,
            facts: FactSet::new(),
            completed: None,
            pending: Vec::new(),
            recent: VecDeque::with_capacity(options.context_lines),
            capture: None,
        }
    }

    /// Append bytes and scan every complete line.
    fn feed_bytes(&mut self, bytes: &[u8]) -> Step {
        self.pending.extend_from_slice(bytes);
        let mut start = 0usize;
        let mut step = Step::Continue;
        while let Some(offset) = self
            .pending
            .get(start..)
            .and_then(|rest| rest.iter().position(|b| *b == b'\n'))
        {
            let end = start.saturating_add(offset);
            let line = decode_line(self.pending.get(start..end).unwrap_or_default());
            start = end.saturating_add(1);
            step = self.feed_line(&line);
            if step == Step::Done {
                break;
            }
        }
        self.pending.drain(..start.min(self.pending.len()));

        if step == Step::Continue && self.pending.len() > MAX_LINE_BYTES {
            let line = decode_line(&self.pending);
            self.pending.clear();
            step = self.feed_line(&line);
        }
        step
    }

    /// Scan the trailing line that had no newline.
    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let line = decode_line(&self.pending);
        self.pending.clear();
        self.feed_line(&line);
    }

    fn feed_line(&mut self, line: &str) -> Step {
        if let Some(capture) = self.capture.as_mut() {
            capture.context.push(line.to_owned());
            capture.remaining = capture.remaining.saturating_sub(1);
            return if capture.remaining == 0 {
                Step::Done
            } else {
                Step::Continue
            };
        }

        if let Some(trigger) = self
            .options
            .piracy_triggers
            .iter()
            .find(|t| line.contains(t.as_str()))
        {
            let mut context: Vec<String> = self.recent.drain(..).collect();
            context.push(line.to_owned());
            let remaining = self.options.context_lines;
            self.capture = Some(PiracyCapture {
                trigger: trigger.clone(),
                context,
                remaining,
            });
            return if remaining == 0 {
                Step::Done
            } else {
                Step::Continue
            };
        }

        if is_run_boundary(line) {
            let finished = std::mem::take(&mut self.facts);
            if !finished.is_empty() {
                self.completed = Some(finished);
            }
        }
        scan_line(line, &mut self.facts);

        if self.options.context_lines > 0 {
            if self.recent.len() >= self.options.context_lines {
                self.recent.pop_front();
            }
            self.recent.push_back(line.to_owned());
        }
        Step::Continue
    }

    /// The stream stopped early. A trigger already seen still wins.
    fn interrupted(self, reason: String, bytes_scanned: u64) -> Extraction {
        if self.capture.is_some() {
            return self.finish(false, bytes_scanned);
        }
        failure(reason, bytes_scanned)
    }

    fn finish(self, truncated: bool, bytes_scanned: u64) -> Extraction {
        let (outcome, facts) = match self.capture {
            Some(capture) => (
                ParseOutcome::PiracyDetected {
                    trigger: capture.trigger,
                    context: capture.context,
                },
                self.facts,
            ),
            // The ceiling cut the current run; prefer the last finished one.
            None if truncated => (
                ParseOutcome::Truncated,
                self.completed.unwrap_or(self.facts),
            ),
            None => (ParseOutcome::Success, self.facts),
        };
        debug!(
            outcome = outcome.label(),
            bytes_scanned,
            facts = facts.len(),
            "extraction finished"
        );
        Extraction {
            facts,
            outcome,
            bytes_scanned,
        }
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
