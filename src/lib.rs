pub mod config;
pub mod consumer;
pub mod domain;
mod error;
pub mod infra;
pub mod input;
pub mod message;
mod output;
pub mod ports;
pub mod reconcile;
mod telemetry;
pub mod upload;

use std::io::Read;
use std::sync::Arc;

use tracing::info;

pub use config::{Config, LogFormat};
pub use consumer::{CancellationToken, ConsumerPool, PoolState, PoolSummary, RowBatchProcessor};
pub use error::{Error, ProviderError, RowError};
pub use output::BankSlipRecord;
pub use reconcile::Reconciler;
pub use telemetry::setup_logging;
pub use upload::{UploadSplitter, UploadSummary};

use infra::{InMemoryBus, InMemoryStore, LocalStaging, LoggingBillingService, LoggingEmailService};

/// Runs one uploaded bank slip file through the whole pipeline on in-process collaborators and returns the persisted
/// bank slips.
///
/// The upload is staged, split into line-aligned chunks and published to an in-memory bus. A consumer pool parses
/// each chunk, skips debts it has already seen, generates billing, sends the waiting-payment emails and persists the
/// resulting status. `process` returns once the bus has no message queued or in flight.
///
/// # Error handling
///
/// Only structural failures of the upload are returned, e.g. [`Error::HeaderNotFound`]. Malformed rows are logged and
/// dropped, provider failures end up in the status of the affected slips.
///
/// # Example
///
/// ```no_run
/// use std::fs::File;
/// use bank_slip_processor::{Config, process};
///
/// let reader = File::open("debts.csv").unwrap();
///
/// let mut wtr = csv::Writer::from_writer(std::io::stdout());
/// for record in process(reader, "debts.csv", &Config::default()).unwrap() {
///     wtr.serialize(&record).unwrap();
/// }
/// wtr.flush().unwrap();
/// ```
pub fn process(
    mut reader: impl Read,
    file_name: &str,
    config: &Config,
) -> Result<Vec<BankSlipRecord>, Error> {
    let bus = InMemoryBus::new(config.max_deliveries);
    let store = Arc::new(InMemoryStore::new());

    let reconciler = Reconciler::new(Arc::new(LoggingBillingService), Arc::new(LoggingEmailService));
    let pool = ConsumerPool::new(
        Arc::new(bus.clone()),
        RowBatchProcessor::new(store.clone(), reconciler),
        config.processors,
        config.inbox_capacity,
        config.poll_interval,
    );
    let splitter = UploadSplitter::new(
        store.clone(),
        Arc::new(LocalStaging::new()),
        Arc::new(bus.clone()),
        config.buffer_size,
        config.upload_workers,
    );
    let cancel = CancellationToken::new();

    let (upload, pool_summary) = std::thread::scope(|s| {
        let consuming = s.spawn(|| pool.execute(&cancel));

        let upload = splitter.execute(&mut reader, file_name);

        // a pool that stopped on its own will never drain the bus
        while !bus.wait_idle(config.poll_interval) && !consuming.is_finished() {}
        cancel.cancel();

        let pool_summary = consuming.join().expect("consumer pool does not panic");
        (upload, pool_summary)
    });
    let upload = upload?;
    let pool_summary = pool_summary?;

    let stats = bus.stats();
    info!(
        file_id = %upload.file_id,
        chunks = upload.chunks,
        messages = pool_summary.received,
        committed = stats.committed,
        dead_lettered = stats.dead_lettered,
        "file processed"
    );

    Ok(output::to_bank_slip_records(store.bank_slips()).collect())
}
