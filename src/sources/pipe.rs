//! Bounded single-producer/single-consumer byte pipe.
//!
//! The decompressor writes from a blocking thread while the extractor reads
//! on the async runtime. Capacity is counted in chunks, so peak memory stays
//! near `capacity * chunk_size` no matter how large the input is.

use std::io::{ErrorKind, Read};

use tokio::sync::mpsc;

use super::SourceError;
use crate::cancel::CancelSignal;

enum Frame {
    Data(Vec<u8>),
    End,
    Failed(SourceError),
}

/// Producer half of the pipe. Must be driven from a blocking context.
pub struct PipeWriter {
    tx: mpsc::Sender<Frame>,
    chunk_size: usize,
}

/// Consumer half of the pipe.
pub struct PipeReader {
    rx: mpsc::Receiver<Frame>,
    done: bool,
}

/// Create a pipe holding at most `capacity` chunks of `chunk_size` bytes.
pub fn pipe(capacity: usize, chunk_size: usize) -> (PipeWriter, PipeReader) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        PipeWriter {
            tx,
            chunk_size: chunk_size.max(1),
        },
        PipeReader { rx, done: false },
    )
}

impl PipeWriter {
    /// Push one chunk, waiting while the pipe is full.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::PipeClosed`] once the reader has gone away.
    pub fn send(&self, data: Vec<u8>) -> Result<(), SourceError> {
        if data.is_empty() {
            return Ok(());
        }
        self.tx
            .blocking_send(Frame::Data(data))
            .map_err(|_| SourceError::PipeClosed)
    }

    /// Copy `reader` into the pipe chunk by chunk until EOF.
    ///
    /// Read errors are attributed to `format`. Cancellation is checked
    /// between chunks. Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns a decode error, [`SourceError::Cancelled`], or
    /// [`SourceError::PipeClosed`].
    pub fn copy_from(
        &self,
        reader: &mut dyn Read,
        cancel: &CancelSignal,
        format: &'static str,
    ) -> Result<u64, SourceError> {
        let mut total: u64 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(SourceError::Cancelled);
            }
            let mut buf = vec![0u8; self.chunk_size];
            let read = match reader.read(&mut buf) {
                Ok(0) => return Ok(total),
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(source) => return Err(SourceError::Decode { format, source }),
            };
            buf.truncate(read);
            self.send(buf)?;
            total = total.saturating_add(u64::try_from(read).unwrap_or(u64::MAX));
        }
    }

    /// Mark the stream as complete.
    pub fn finish(self) {
        let _ = self.tx.blocking_send(Frame::End);
    }

    /// Deliver a stream-level error to the reader.
    pub fn fail(self, error: SourceError) {
        let _ = self.tx.blocking_send(Frame::Failed(error));
    }
}

impl PipeReader {
    /// Receive the next chunk.
    ///
    /// Returns `None` after the producer finished cleanly. A producer that
    /// vanished without finishing yields [`SourceError::Interrupted`] once.
    pub async fn next_chunk(&mut self) -> Option<Result<Vec<u8>, SourceError>> {
        if self.done {
            return None;
        }
        match self.rx.recv().await {
            Some(Frame::Data(data)) => Some(Ok(data)),
            Some(Frame::End) => {
                self.done = true;
                None
            }
            Some(Frame::Failed(error)) => {
                self.done = true;
                Some(Err(error))
            }
            None => {
                self.done = true;
                Some(Err(SourceError::Interrupted))
            }
        }
    }

    /// Drain the pipe into one buffer. Intended for tests and small inputs.
    ///
    /// # Errors
    ///
    /// Returns the first stream-level error.
    pub async fn read_to_end(&mut self) -> Result<Vec<u8>, SourceError> {
        let mut out = Vec::new();
        while let Some(chunk) = self.next_chunk().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }
}
