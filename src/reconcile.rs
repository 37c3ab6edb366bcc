//! Module generating the billing of a batch and notifying its debtors

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{BankSlip, BankSlipBatch, DebtId};
use crate::error::ProviderError;
use crate::ports::{BillingService, EmailService};

/// Calls billing generation and then email dispatch, each once per batch, and resolves every slip into a terminal
/// status.
pub struct Reconciler {
    billing: Arc<dyn BillingService>,
    email: Arc<dyn EmailService>,
}

impl Reconciler {
    pub fn new(billing: Arc<dyn BillingService>, email: Arc<dyn EmailService>) -> Self {
        Self { billing, email }
    }

    /// Reconciles `batch` in place and returns the slips that failed.
    ///
    /// Afterwards `batch` holds only successes. Slips whose billing failed are never emailed.
    pub fn reconcile(&self, batch: &mut BankSlipBatch) -> BankSlipBatch {
        let mut failed = BankSlipBatch::new();

        let billing_errors = self.billing.generate_billing(batch);
        move_failures(batch, &mut failed, billing_errors, BankSlip::billing_failed);

        if !batch.is_empty() {
            let email_errors = self.email.send_waiting_payment_email(batch);
            move_failures(batch, &mut failed, email_errors, BankSlip::email_failed);
        }

        for slip in batch.iter_mut() {
            if let Err(msg) = slip.succeed() {
                warn!(debt_id = %slip.debt_id(), "{msg}");
            }
        }

        debug!(
            succeeded = batch.len(),
            failed = failed.len(),
            "batch reconciled"
        );
        failed
    }
}

fn move_failures(
    batch: &mut BankSlipBatch,
    failed: &mut BankSlipBatch,
    errors: HashMap<DebtId, ProviderError>,
    mark: fn(&mut BankSlip, &str) -> Result<(), String>,
) {
    for (debt_id, error) in errors {
        // providers may report ids that are not part of the batch
        let Some(mut slip) = batch.remove(&debt_id) else {
            warn!(%debt_id, "provider reported a debt outside of the batch: {error}");
            continue;
        };
        if let Err(msg) = mark(&mut slip, error.message()) {
            warn!(%debt_id, "{msg}");
        }
        failed.insert(slip);
    }
}
