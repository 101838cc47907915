//! Gzip-compressed logs (`RPCS3.log.gz`).

use flate2::read::MultiGzDecoder;

use super::{Attachment, PipeWriter, SourceError, SourceHandler, GZIP_SIGNATURE};
use crate::cancel::CancelSignal;

/// Streams gzip members through `flate2`.
///
/// Concatenated members are decoded in sequence, which is what the emulator
/// produces when it appends to an existing archive.
#[derive(Debug, Default, Clone, Copy)]
pub struct GzipHandler;

impl SourceHandler for GzipHandler {
    fn name(&self) -> &'static str {
        "gzip"
    }

    fn can_handle(&self, attachment: &Attachment) -> bool {
        attachment.has_suffix(".gz") || attachment.signature().starts_with(GZIP_SIGNATURE)
    }

    fn stream_into(
        &self,
        attachment: &Attachment,
        writer: &PipeWriter,
        cancel: &CancelSignal,
    ) -> Result<u64, SourceError> {
        let mut decoder = MultiGzDecoder::new(attachment.open()?);
        writer.copy_from(&mut decoder, cancel, self.name())
    }
}
