//! Uncompressed text logs.

use super::{has_compressed_signature, Attachment, PipeWriter, SourceError, SourceHandler};
use crate::cancel::CancelSignal;

const SUFFIXES: [&str; 2] = [".log", ".txt"];

/// Passes `.log`/`.txt` attachments through unchanged.
///
/// Refuses files whose first bytes carry a compressed signature, so a
/// renamed archive falls through to the archive handlers.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextHandler;

impl SourceHandler for PlainTextHandler {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn can_handle(&self, attachment: &Attachment) -> bool {
        SUFFIXES.iter().any(|s| attachment.has_suffix(s))
            && !has_compressed_signature(&attachment.signature())
    }

    fn stream_into(
        &self,
        attachment: &Attachment,
        writer: &PipeWriter,
        cancel: &CancelSignal,
    ) -> Result<u64, SourceError> {
        let mut reader = attachment.open()?;
        writer.copy_from(&mut reader, cancel, self.name())
    }
}
