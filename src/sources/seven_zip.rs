//! 7z archives holding a log file.

use sevenz_rust::{Password, SevenZReader};

use super::{
    is_log_entry, Attachment, PipeWriter, SourceError, SourceHandler, SEVEN_ZIP_SIGNATURE,
};
use crate::cancel::CancelSignal;

const FORMAT: &str = "7z";

/// Streams the first `.log` entry of a 7z archive.
#[derive(Debug, Default, Clone, Copy)]
pub struct SevenZipHandler;

impl SourceHandler for SevenZipHandler {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn can_handle(&self, attachment: &Attachment) -> bool {
        attachment.has_suffix(".7z") || attachment.signature().starts_with(SEVEN_ZIP_SIGNATURE)
    }

    fn stream_into(
        &self,
        attachment: &Attachment,
        writer: &PipeWriter,
        cancel: &CancelSignal,
    ) -> Result<u64, SourceError> {
        let mut archive = SevenZReader::new(attachment.open()?, attachment.size, Password::empty())
            .map_err(|e| SourceError::Archive {
                format: FORMAT,
                message: format!("{e:?}"),
            })?;

        // The entry callback can only return the decoder's own error type, so
        // the copy result is carried out through this slot.
        let mut copied: Option<Result<u64, SourceError>> = None;
        archive
            .for_each_entries(|entry, reader| {
                if entry.is_directory() || !is_log_entry(entry.name()) {
                    // Solid blocks decode sequentially; skipped entries are drained.
                    std::io::copy(reader, &mut std::io::sink())?;
                    return Ok(true);
                }
                copied = Some(writer.copy_from(reader, cancel, FORMAT));
                Ok(false)
            })
            .map_err(|e| SourceError::Archive {
                format: FORMAT,
                message: format!("{e:?}"),
            })?;

        copied.unwrap_or_else(|| Err(SourceError::NoLogEntry { format: FORMAT }))
    }
}
