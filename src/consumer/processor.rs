//! Processing of one chunk message: parse, deduplicate, reconcile, persist, acknowledge.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::input::{log_row_error, parse_chunk};
use crate::ports::{Message, Store};
use crate::reconcile::Reconciler;

/// What happened to a message. Only committed messages are acknowledged; every other outcome leaves the message to
/// be redelivered by the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The payload is not a `{data, header, fileId}` envelope
    Undecodable,
    /// No line of the chunk could be parsed
    NoRows { lines: usize },
    InsertFailed { lines: usize },
    /// Every debt already existed: nothing left to do
    AllDuplicates { lines: usize },
    UpdateFailed { lines: usize },
    Reconciled {
        lines: usize,
        succeeded: usize,
        failed: usize,
    },
}

impl ProcessOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(
            self,
            ProcessOutcome::AllDuplicates { .. } | ProcessOutcome::Reconciled { .. }
        )
    }
}

/// Turns one bus message into persisted bank slips.
///
/// The batch built for a message lives only for the duration of `process`, so processors running on several threads
/// never share one.
pub struct RowBatchProcessor {
    store: Arc<dyn Store>,
    reconciler: Reconciler,
}

impl RowBatchProcessor {
    pub fn new(store: Arc<dyn Store>, reconciler: Reconciler) -> Self {
        Self { store, reconciler }
    }

    pub fn process(&self, message: &dyn Message) -> ProcessOutcome {
        let payload = match message.data() {
            Ok(payload) => payload,
            Err(e) => {
                warn!("cannot read message payload: {e}");
                return ProcessOutcome::Undecodable;
            }
        };
        let file_id = &payload.file_id;
        let lines = payload
            .data
            .split('\n')
            .filter(|line| !line.trim().is_empty())
            .count();

        let mut batch = parse_chunk(file_id, &payload.data, &payload.header, log_row_error(file_id));
        if batch.is_empty() {
            info!(%file_id, lines, "no valid rows in chunk");
            return ProcessOutcome::NoRows { lines };
        }

        let inserted = match self.store.insert_batch(&batch) {
            Ok(inserted) => inserted,
            Err(e) => {
                warn!(%file_id, lines, "inserting bank slips failed, leaving chunk for redelivery: {e}");
                return ProcessOutcome::InsertFailed { lines };
            }
        };
        let duplicates = batch.retain_inserted(&inserted);
        if duplicates > 0 {
            debug!(%file_id, duplicates, "skipping debts already known");
        }

        if batch.is_empty() {
            message.commit();
            info!(%file_id, lines, "every debt in chunk already processed");
            return ProcessOutcome::AllDuplicates { lines };
        }

        let failed = self.reconciler.reconcile(&mut batch);

        if let Err(e) = self.store.update_batch(&[&batch, &failed]) {
            warn!(%file_id, lines, "persisting bank slip status failed: {e}");
            return ProcessOutcome::UpdateFailed { lines };
        }

        message.commit();
        info!(
            %file_id,
            lines,
            committed = batch.len() + failed.len(),
            succeeded = batch.len(),
            failed = failed.len(),
            "chunk processed"
        );
        ProcessOutcome::Reconciled {
            lines,
            succeeded: batch.len(),
            failed: failed.len(),
        }
    }
}
