//! Zip archives holding a log file.

use zip::ZipArchive;

use super::{is_log_entry, Attachment, PipeWriter, SourceError, SourceHandler, ZIP_SIGNATURE};
use crate::cancel::CancelSignal;

const FORMAT: &str = "zip";

/// Streams the first `.log` entry of a zip archive.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipHandler;

impl SourceHandler for ZipHandler {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn can_handle(&self, attachment: &Attachment) -> bool {
        attachment.has_suffix(".zip") || attachment.signature().starts_with(ZIP_SIGNATURE)
    }

    fn stream_into(
        &self,
        attachment: &Attachment,
        writer: &PipeWriter,
        cancel: &CancelSignal,
    ) -> Result<u64, SourceError> {
        let mut archive = ZipArchive::new(attachment.open()?).map_err(archive_error)?;

        let mut log_index = None;
        for index in 0..archive.len() {
            let entry = archive.by_index(index).map_err(archive_error)?;
            if entry.is_file() && is_log_entry(entry.name()) {
                log_index = Some(index);
                break;
            }
        }
        let index = log_index.ok_or(SourceError::NoLogEntry { format: FORMAT })?;

        let mut entry = archive.by_index(index).map_err(archive_error)?;
        writer.copy_from(&mut entry, cancel, FORMAT)
    }
}

fn archive_error(error: zip::result::ZipError) -> SourceError {
    SourceError::Archive {
        format: FORMAT,
        message: error.to_string(),
    }
}
