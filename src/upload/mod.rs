//! Module receiving uploaded files: stages them, splits them into line-aligned chunks and publishes the chunks to
//! the bus through a pool of worker threads.

use std::io::Read;
use std::sync::Arc;
use std::thread::{Scope, ScopedJoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, bounded};
use tracing::{debug, info, warn};

use crate::Error;
use crate::domain::{FileId, UploadFileMetadata};
use crate::error::store_error;
use crate::message::{ROWS_TOPIC, RowsPayload};
use crate::ports::{MessageProducer, StagedFile, Staging, Store};

mod chunks;

pub use chunks::{LineAlignedChunks, split_chunks};

/// Unit of work handed from the splitter to a publishing worker.
struct Chunk {
    data: Vec<u8>,
    header: Arc<str>,
}

/// Outcome of an accepted upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSummary {
    pub file_id: FileId,
    /// Chunks handed to the workers
    pub chunks: usize,
    /// Chunks the bus accepted. Rejected chunks are logged and dropped.
    pub published: usize,
}

pub struct UploadSplitter {
    store: Arc<dyn Store>,
    staging: Arc<dyn Staging>,
    producer: Arc<dyn MessageProducer>,
    buffer_size: usize,
    workers: usize,
}

impl UploadSplitter {
    pub fn new(
        store: Arc<dyn Store>,
        staging: Arc<dyn Staging>,
        producer: Arc<dyn MessageProducer>,
        buffer_size: usize,
        workers: usize,
    ) -> Self {
        Self {
            store,
            staging,
            producer,
            buffer_size: buffer_size.max(1),
            workers: workers.max(1),
        }
    }

    /// Accepts an uploaded file.
    ///
    /// Fails only for structural problems: the metadata cannot be recorded, the stream cannot be staged, the file
    /// has no header line, or the staged file cannot be read. Once a chunk is handed to a worker, its fate is
    /// decided asynchronously and reported through the persisted bank slip status.
    pub fn execute(&self, file_stream: &mut dyn Read, file_name: &str) -> Result<UploadSummary, Error> {
        let start = Instant::now();

        let mut metadata = UploadFileMetadata::new(file_name);
        self.store.insert_file_metadata(&mut metadata)?;
        let file_id = metadata
            .id()
            .cloned()
            .ok_or_else(|| store_error("file metadata inserted without an id"))?;

        let staged = StagedGuard(Some(self.staging.save(file_stream)?));
        let result = self.split_and_publish(staged.file(), &file_id);

        info!(
            %file_id,
            file_name,
            elapsed_ms = start.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "upload finished"
        );
        result
    }

    fn split_and_publish(
        &self,
        staged: &dyn StagedFile,
        file_id: &FileId,
    ) -> Result<UploadSummary, Error> {
        let reader = staged.open()?;

        std::thread::scope(|s| {
            let (chunk_tx, chunk_rx) = bounded::<Chunk>(self.workers);
            let handles = self.spawn_publish_workers(s, chunk_rx, file_id);

            let dispatched = dispatch_chunks(reader, self.buffer_size, &chunk_tx);

            // Signal EOF: workers drain the channel and exit
            drop(chunk_tx);

            let published = handles
                .into_iter()
                .map(|handle| handle.join().expect("publish worker does not panic"))
                .sum();

            Ok(UploadSummary {
                file_id: file_id.clone(),
                chunks: dispatched?,
                published,
            })
        })
    }

    fn spawn_publish_workers<'s, 'e>(
        &'e self,
        s: &'s Scope<'s, 'e>,
        chunk_rx: Receiver<Chunk>,
        file_id: &'e FileId,
    ) -> Vec<ScopedJoinHandle<'s, usize>> {
        (0..self.workers)
            .map(|worker| {
                let rx = chunk_rx.clone();
                s.spawn(move || self.publish_chunks(worker, rx, file_id))
            })
            .collect()
    }

    fn publish_chunks(&self, worker: usize, chunk_rx: Receiver<Chunk>, file_id: &FileId) -> usize {
        let mut published = 0;
        for chunk in chunk_rx {
            let payload = RowsPayload::new(
                String::from_utf8_lossy(&chunk.data),
                &*chunk.header,
                file_id.clone(),
            );
            match self.producer.publish(ROWS_TOPIC, &payload) {
                Ok(()) => published += 1,
                // no retry here; retrying is the bus client's concern
                Err(e) => warn!(worker, %file_id, bytes = chunk.data.len(), "dropping chunk: {e}"),
            }
        }
        debug!(worker, published, "publish worker finished");
        published
    }
}

/// Reads the staged file and pushes its chunks to the workers, blocking while all channel slots are taken.
fn dispatch_chunks(
    reader: impl Read,
    buffer_size: usize,
    chunk_tx: &Sender<Chunk>,
) -> Result<usize, Error> {
    let (header, chunks) = split_chunks(reader, buffer_size)?;
    let header: Arc<str> = Arc::from(header);

    let mut dispatched = 0;
    for data in chunks {
        let chunk = Chunk {
            data: data?,
            header: Arc::clone(&header),
        };
        // Send fails only if every worker is gone (panicked); the join surfaces that panic.
        if chunk_tx.send(chunk).is_err() {
            break;
        }
        dispatched += 1;
    }
    Ok(dispatched)
}

/// Deletes the staged file when the upload ends, whatever the outcome.
struct StagedGuard(Option<Box<dyn StagedFile>>);

impl StagedGuard {
    fn file(&self) -> &dyn StagedFile {
        self.0.as_deref().expect("staged file present until drop")
    }
}

impl Drop for StagedGuard {
    fn drop(&mut self) {
        if let Some(staged) = self.0.take() {
            if let Err(e) = staged.delete() {
                warn!("failed to delete staged upload: {e}");
            }
        }
    }
}
