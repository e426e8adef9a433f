// Upload coordinator: allocate a staging slot and stream a file's bytes
// into it. No resumption: one attempt per token.

use crate::api::MediaApi;
use crate::error::WorkflowError;
use crate::model::{upload_status, SessionToken, TransferState, UploadToken};
use std::io::{self, ErrorKind, Read};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub struct UploadCoordinator<'a, A: MediaApi> {
    api: &'a A,
}

impl<'a, A: MediaApi> UploadCoordinator<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Request a new, empty staging slot.
    pub fn allocate(&self, session: &SessionToken) -> Result<UploadToken, WorkflowError> {
        let record = self.api.add_upload_token(session)?;
        tracing::info!(token_id = %record.id, "upload token allocated");
        Ok(UploadToken::allocated(record.id))
    }

    /// Stream `source` into the slot behind `token`.
    ///
    /// The token must still be in the `Allocated` state. On return it is
    /// either `Complete` (and a copy is handed back) or `Failed`, in which
    /// case it cannot be used again. The source is moved into the request
    /// body and dropped by the transport once the request is over, whatever
    /// the outcome.
    pub fn transfer<R>(
        &self,
        session: &SessionToken,
        token: &mut UploadToken,
        file_name: &str,
        source: R,
    ) -> Result<UploadToken, WorkflowError>
    where
        R: Read + Send + 'static,
    {
        if token.state != TransferState::Allocated {
            return Err(WorkflowError::Precondition(format!(
                "upload token {} is {:?}, expected Allocated",
                token.id, token.state
            )));
        }
        token.state = TransferState::Transferring;

        match self.send(session, &token.id, file_name, source) {
            Ok(bytes) => {
                token.state = TransferState::Complete;
                tracing::info!(token_id = %token.id, bytes, "upload complete");
                Ok(token.clone())
            }
            Err(err) => {
                token.state = TransferState::Failed;
                tracing::warn!(token_id = %token.id, error = %err, "upload failed");
                Err(err)
            }
        }
    }

    fn send<R>(
        &self,
        session: &SessionToken,
        token_id: &str,
        file_name: &str,
        source: R,
    ) -> Result<u64, WorkflowError>
    where
        R: Read + Send + 'static,
    {
        let (reader, progress) = CountingReader::new(source);
        let result = self
            .api
            .upload_to_token(session, token_id, file_name, Box::new(reader));

        let sent = progress.bytes();
        // a failing source outranks whatever the service made of the cut body
        if let Some(err) = progress.error() {
            return Err(WorkflowError::Transfer(format!(
                "source could not be read after {} bytes: {}",
                sent, err
            )));
        }
        let record = result
            .map_err(|e| WorkflowError::Transfer(format!("slot rejected the upload: {}", e)))?;

        match record.status {
            Some(upload_status::FULL_UPLOAD) => {}
            Some(code) => {
                return Err(WorkflowError::Transfer(format!(
                    "slot {} reports status {} ({})",
                    token_id,
                    code,
                    upload_status::describe(code)
                )))
            }
            None => {
                return Err(WorkflowError::Transfer(format!(
                    "slot {} did not report a status",
                    token_id
                )))
            }
        }
        if let Some(received) = record.uploaded_file_size {
            if received != sent as f64 {
                return Err(WorkflowError::Transfer(format!(
                    "slot {} received {} of {} bytes",
                    token_id, received, sent
                )));
            }
        }
        Ok(sent)
    }
}

/// What the transport managed to pull out of a source. Shared between the
/// reader handed to the request body and the coordinator.
#[derive(Debug, Default)]
struct ReadProgress {
    bytes: AtomicU64,
    error: Mutex<Option<String>>,
}

impl ReadProgress {
    fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Acquire)
    }

    fn error(&self) -> Option<String> {
        match self.error.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record_error(&self, err: &io::Error) {
        let mut guard = match self.error.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.get_or_insert_with(|| err.to_string());
    }
}

/// Wraps a source, counting the bytes read through it and keeping the first
/// read error. Interrupted reads are retried.
struct CountingReader<R> {
    inner: R,
    progress: Arc<ReadProgress>,
}

impl<R: Read> CountingReader<R> {
    fn new(inner: R) -> (Self, Arc<ReadProgress>) {
        let progress = Arc::new(ReadProgress::default());
        (
            CountingReader {
                inner,
                progress: progress.clone(),
            },
            progress,
        )
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.inner.read(buf) {
                Ok(n) => {
                    self.progress.bytes.fetch_add(n as u64, Ordering::AcqRel);
                    return Ok(n);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.progress.record_error(&e);
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct Interrupting {
        interrupted: bool,
        inner: Cursor<Vec<u8>>,
    }

    impl Read for Interrupting {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(io::Error::new(ErrorKind::Interrupted, "signal"));
            }
            self.inner.read(buf)
        }
    }

    struct FailsAfter(usize);

    impl Read for FailsAfter {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.0 == 0 {
                return Err(io::Error::new(ErrorKind::Other, "device gone"));
            }
            let n = self.0.min(buf.len());
            buf[..n].fill(0);
            self.0 -= n;
            Ok(n)
        }
    }

    #[test]
    fn counting_reader_counts_streamed_bytes() {
        let (mut reader, progress) = CountingReader::new(Cursor::new(vec![7u8; 200_017]));
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out.len(), 200_017);
        assert_eq!(progress.bytes(), 200_017);
        assert!(progress.error().is_none());

        let (mut reader, progress) = CountingReader::new(io::empty());
        reader.read_to_end(&mut Vec::new()).unwrap();
        assert_eq!(progress.bytes(), 0);
    }

    #[test]
    fn counting_reader_keeps_the_read_error() {
        let (mut reader, progress) = CountingReader::new(FailsAfter(10));
        let err = reader.read_to_end(&mut Vec::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(progress.bytes(), 10);
        assert_eq!(progress.error().as_deref(), Some("device gone"));
    }

    #[test]
    fn counting_reader_retries_interrupted_reads() {
        let (mut reader, progress) = CountingReader::new(Interrupting {
            interrupted: false,
            inner: Cursor::new(b"abc".to_vec()),
        });
        let mut buf = [0u8; 8];
        assert_eq!(reader.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"abc");
        assert_eq!(progress.bytes(), 3);
        assert!(progress.error().is_none());
    }
}
