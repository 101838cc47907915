//! Container format detection and decompression.
//!
//! Each [`SourceHandler`] recognizes one container format by filename suffix
//! or byte signature and streams the decompressed log into a [`PipeWriter`].
//! [`SourceRegistry`] tries handlers in a fixed order and uses the first
//! match. The order is part of the contract: gzip must be tried before plain
//! text so a gzip file named `*.log` is still decompressed.

pub mod gzip;
pub mod pipe;
pub mod plain;
pub mod seven_zip;
pub mod zip_archive;

use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::cancel::CancelSignal;

pub use gzip::GzipHandler;
pub use pipe::{pipe, PipeReader, PipeWriter};
pub use plain::PlainTextHandler;
pub use seven_zip::SevenZipHandler;
pub use zip_archive::ZipHandler;

/// Number of leading bytes read for signature checks.
pub const SIGNATURE_PROBE_LEN: usize = 8;

/// Gzip member header.
pub const GZIP_SIGNATURE: &[u8] = &[0x1f, 0x8b];
/// Zip local file header.
pub const ZIP_SIGNATURE: &[u8] = b"PK\x03\x04";
/// 7z archive header.
pub const SEVEN_ZIP_SIGNATURE: &[u8] = &[b'7', b'z', 0xbc, 0xaf, 0x27, 0x1c];

/// Errors raised while opening or decompressing an attachment.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The attachment bytes could not be opened.
    #[error("failed to open attachment: {0}")]
    Open(#[source] std::io::Error),
    /// The decompressor failed mid-stream.
    #[error("{format} stream is corrupt or unreadable: {source}")]
    Decode {
        /// Container format being decoded.
        format: &'static str,
        /// Underlying read error.
        #[source]
        source: std::io::Error,
    },
    /// The archive directory could not be read.
    #[error("{format} archive is invalid: {message}")]
    Archive {
        /// Container format being decoded.
        format: &'static str,
        /// Decoder-provided description.
        message: String,
    },
    /// The archive holds no log-like entry.
    #[error("{format} archive contains no .log entry")]
    NoLogEntry {
        /// Container format being decoded.
        format: &'static str,
    },
    /// The run was cancelled.
    #[error("stream cancelled")]
    Cancelled,
    /// The reader stopped consuming.
    #[error("pipe reader closed")]
    PipeClosed,
    /// The producer stopped without finishing or reporting an error.
    #[error("producer stopped unexpectedly")]
    Interrupted,
}

/// Byte source that can be read and seeked, boxed for handler use.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// Where an attachment's raw bytes live.
#[derive(Debug, Clone)]
pub enum AttachmentSource {
    /// Fully buffered bytes, e.g. a downloaded chat attachment.
    Bytes(Arc<[u8]>),
    /// A file on local disk.
    File(PathBuf),
}

/// A user-submitted file awaiting classification.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Original file name as submitted.
    pub name: String,
    /// Size in bytes as reported by the source.
    pub size: u64,
    /// Accessor for the raw bytes.
    pub source: AttachmentSource,
}

impl Attachment {
    /// Wrap in-memory bytes.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let size = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        Self {
            name: name.into(),
            size,
            source: AttachmentSource::Bytes(bytes.into()),
        }
    }

    /// Describe a file on disk. The name is the path's final component.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Open`] if the file metadata cannot be read.
    pub fn from_path(path: &Path) -> Result<Self, SourceError> {
        let metadata = std::fs::metadata(path).map_err(SourceError::Open)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            name,
            size: metadata.len(),
            source: AttachmentSource::File(path.to_path_buf()),
        })
    }

    /// Open a fresh reader over the raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Open`] if the backing file cannot be opened.
    pub fn open(&self) -> Result<Box<dyn ReadSeek>, SourceError> {
        match &self.source {
            AttachmentSource::Bytes(bytes) => Ok(Box::new(Cursor::new(Arc::clone(bytes)))),
            AttachmentSource::File(path) => {
                let file = File::open(path).map_err(SourceError::Open)?;
                Ok(Box::new(file))
            }
        }
    }

    /// Read up to [`SIGNATURE_PROBE_LEN`] leading bytes. Empty on any error.
    pub fn signature(&self) -> Vec<u8> {
        match &self.source {
            AttachmentSource::Bytes(bytes) => bytes
                .iter()
                .take(SIGNATURE_PROBE_LEN)
                .copied()
                .collect(),
            AttachmentSource::File(path) => {
                let mut probe = Vec::with_capacity(SIGNATURE_PROBE_LEN);
                let limit = u64::try_from(SIGNATURE_PROBE_LEN).unwrap_or(u64::MAX);
                match File::open(path) {
                    Ok(file) => {
                        if file.take(limit).read_to_end(&mut probe).is_err() {
                            probe.clear();
                        }
                    }
                    Err(e) => debug!(path = %path.display(), error = %e, "signature probe failed"),
                }
                probe
            }
        }
    }

    /// Case-insensitive filename suffix check.
    pub fn has_suffix(&self, suffix: &str) -> bool {
        self.name
            .to_ascii_lowercase()
            .ends_with(&suffix.to_ascii_lowercase())
    }
}

/// Whether the probe starts with any known compressed-container signature.
pub fn has_compressed_signature(probe: &[u8]) -> bool {
    [GZIP_SIGNATURE, ZIP_SIGNATURE, SEVEN_ZIP_SIGNATURE]
        .iter()
        .any(|sig| probe.starts_with(sig))
}

/// Whether an archive entry name looks like an emulator log.
pub fn is_log_entry(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".log") && !lower.ends_with("tty.log")
}

/// One container format.
pub trait SourceHandler: Send + Sync {
    /// Short format name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Whether this handler recognizes the attachment.
    ///
    /// Must be cheap and side-effect-free: only the name and a
    /// [`SIGNATURE_PROBE_LEN`]-byte prefix may be inspected.
    fn can_handle(&self, attachment: &Attachment) -> bool;

    /// Stream decompressed content into `writer`.
    ///
    /// Runs on a blocking thread. Returns the number of bytes produced.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] if the container cannot be read.
    fn stream_into(
        &self,
        attachment: &Attachment,
        writer: &PipeWriter,
        cancel: &CancelSignal,
    ) -> Result<u64, SourceError>;
}

/// Ordered list of handlers; the first match wins.
pub struct SourceRegistry {
    handlers: Vec<Arc<dyn SourceHandler>>,
}

impl SourceRegistry {
    /// Registry with an explicit handler order.
    pub fn new(handlers: Vec<Arc<dyn SourceHandler>>) -> Self {
        Self { handlers }
    }

    /// The default order: gzip, plain text, zip, 7z.
    pub fn with_defaults() -> Self {
        Self::new(vec![
            Arc::new(GzipHandler),
            Arc::new(PlainTextHandler),
            Arc::new(ZipHandler),
            Arc::new(SevenZipHandler),
        ])
    }

    /// Handler names in evaluation order.
    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Pick the first handler that recognizes the attachment.
    pub fn select(&self, attachment: &Attachment) -> Option<Arc<dyn SourceHandler>> {
        self.handlers
            .iter()
            .find(|h| h.can_handle(attachment))
            .map(Arc::clone)
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Run `handler` on a blocking thread, feeding `writer`.
///
/// On success the pipe is finished; on failure the error is delivered to the
/// reader so it surfaces as a stream error rather than a short read. The
/// task yields the number of bytes produced, or `None` if the stream did not
/// complete.
pub fn spawn_producer(
    handler: Arc<dyn SourceHandler>,
    attachment: Attachment,
    writer: PipeWriter,
    cancel: CancelSignal,
) -> JoinHandle<Option<u64>> {
    tokio::task::spawn_blocking(move || {
        match handler.stream_into(&attachment, &writer, &cancel) {
            Ok(bytes) => {
                debug!(format = handler.name(), bytes, "decompression finished");
                writer.finish();
                Some(bytes)
            }
            Err(SourceError::PipeClosed) => {
                debug!(format = handler.name(), "reader stopped before decompression finished");
                None
            }
            Err(error) => {
                debug!(format = handler.name(), error = %error, "decompression failed");
                writer.fail(error);
                None
            }
        }
    })
}
