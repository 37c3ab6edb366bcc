//! In-process implementations of the collaborators in [`crate::ports`].
//!
//! They make the pipeline runnable on a single machine and back the test suite. The bus and the store keep the
//! delivery and conflict semantics the pipeline relies on: at-least-once redelivery of uncommitted messages and
//! insert-or-ignore keyed by debt id.

mod local_staging;
mod memory_bus;
mod memory_store;
mod providers;

pub use local_staging::LocalStaging;
pub use memory_bus::{BusStats, InMemoryBus};
pub use memory_store::InMemoryStore;
pub use providers::{LoggingBillingService, LoggingEmailService, WAITING_PAYMENT_TEMPLATE};
