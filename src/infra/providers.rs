//! Billing and email providers which only log the requests they would send

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::domain::{BankSlipBatch, DebtId, Money};
use crate::error::ProviderError;
use crate::ports::{BillingService, EmailService};

pub const WAITING_PAYMENT_TEMPLATE: &str = "billing_waiting_payment";

#[derive(Serialize)]
struct BillingRequest<'a> {
    amount: Money,
    due_date: NaiveDate,
    customer: &'a str,
}

#[derive(Serialize)]
struct WaitingPaymentEmail<'a> {
    to: &'a str,
    subject: &'static str,
    body: &'static str,
    due_date: NaiveDate,
    customer: &'a str,
    template: &'static str,
}

/// Accepts every billing request.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingBillingService;

impl BillingService for LoggingBillingService {
    fn generate_billing(&self, batch: &BankSlipBatch) -> HashMap<DebtId, ProviderError> {
        let requests: HashMap<&DebtId, BillingRequest<'_>> = batch
            .iter()
            .map(|slip| {
                let request = BillingRequest {
                    amount: slip.debt_amount(),
                    due_date: slip.debt_due_date(),
                    customer: slip.user_email(),
                };
                (slip.debt_id(), request)
            })
            .collect();

        debug!(
            count = requests.len(),
            requests = %serde_json::to_string(&requests).unwrap_or_default(),
            "billing requested"
        );
        HashMap::new()
    }
}

/// Accepts every email.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingEmailService;

impl EmailService for LoggingEmailService {
    fn send_waiting_payment_email(&self, batch: &BankSlipBatch) -> HashMap<DebtId, ProviderError> {
        let emails: HashMap<&DebtId, WaitingPaymentEmail<'_>> = batch
            .iter()
            .map(|slip| {
                let email = WaitingPaymentEmail {
                    to: slip.user_email(),
                    subject: "Billing Waiting Payment",
                    body: "Your billing is waiting for payment",
                    due_date: slip.debt_due_date(),
                    customer: slip.user_name(),
                    template: WAITING_PAYMENT_TEMPLATE,
                };
                (slip.debt_id(), email)
            })
            .collect();

        debug!(
            count = emails.len(),
            emails = %serde_json::to_string(&emails).unwrap_or_default(),
            "waiting payment emails sent"
        );
        HashMap::new()
    }
}
