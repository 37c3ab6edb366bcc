//! Capabilities the pipeline consumes from its surroundings.
//!
//! Every service receives its collaborators through these traits at construction time. The crate ships in-process
//! implementations in [`crate::infra`]; production deployments plug in a real bus, database and providers.

use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::time::Duration;

use crate::Error;
use crate::domain::{BankSlipBatch, DebtId, UploadFileMetadata};
use crate::error::ProviderError;
use crate::message::RowsPayload;

/// Durable local storage for an uploaded stream.
pub trait Staging: Send + Sync {
    fn save(&self, stream: &mut dyn Read) -> Result<Box<dyn StagedFile>, Error>;
}

/// A stream persisted by [`Staging`]. Deleted exactly once, by `delete`.
pub trait StagedFile: Send {
    fn open(&self) -> Result<Box<dyn Read + Send>, Error>;
    fn delete(self: Box<Self>) -> Result<(), Error>;
}

pub trait MessageProducer: Send + Sync {
    fn publish(&self, topic: &str, payload: &RowsPayload) -> Result<(), Error>;
}

pub trait MessageConsumer: Send + Sync {
    fn subscribe_in_topic(&self, topic: &str) -> Result<(), Error>;

    /// Waits up to `timeout` for the next message. `Ok(None)` means nothing arrived in time.
    fn consume(&self, topic: &str, timeout: Duration) -> Result<Option<Box<dyn Message>>, Error>;
}

/// A delivered message. Unless committed it is redelivered later.
pub trait Message: Send + fmt::Debug {
    fn data(&self) -> Result<RowsPayload, Error>;

    /// Acknowledges the message. Calling it more than once is a no-op.
    fn commit(&self);
}

pub trait Store: Send + Sync {
    /// Inserts the metadata and assigns its id.
    fn insert_file_metadata(&self, metadata: &mut UploadFileMetadata) -> Result<(), Error>;

    /// Inserts every slip unless its debt id already exists, in one atomic statement. Reports per debt id whether
    /// the row was new.
    fn insert_batch(&self, batch: &BankSlipBatch) -> Result<HashMap<DebtId, bool>, Error>;

    /// Persists status and error message of every slip in every batch.
    fn update_batch(&self, batches: &[&BankSlipBatch]) -> Result<(), Error>;
}

pub trait BillingService: Send + Sync {
    /// Generates the billing of every slip. Only failed debts appear in the result.
    fn generate_billing(&self, batch: &BankSlipBatch) -> HashMap<DebtId, ProviderError>;
}

pub trait EmailService: Send + Sync {
    /// Notifies every debtor of the pending payment. Only failed debts appear in the result.
    fn send_waiting_payment_email(&self, batch: &BankSlipBatch) -> HashMap<DebtId, ProviderError>;
}
