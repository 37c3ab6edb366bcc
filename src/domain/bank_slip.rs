//! Module defining a single debt record and its status transitions

use std::fmt;

use chrono::NaiveDate;

use crate::domain::{DebtId, FileId, Money};

/// Status of a bank slip. The error variants carry the provider's message, so a message exists if and only if
/// the status is an error status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BankSlipStatus {
    Pending,
    Success,
    GenerateBillingError(String),
    SendingEmailError(String),
}

impl BankSlipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BankSlipStatus::Pending => "PENDING",
            BankSlipStatus::Success => "SUCCESS",
            BankSlipStatus::GenerateBillingError(_) => "GENERATE_BILLING_ERROR",
            BankSlipStatus::SendingEmailError(_) => "SENDING_EMAIL_ERROR",
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            BankSlipStatus::GenerateBillingError(msg) | BankSlipStatus::SendingEmailError(msg) => {
                Some(msg)
            }
            BankSlipStatus::Pending | BankSlipStatus::Success => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, BankSlipStatus::Pending)
    }
}

impl fmt::Display for BankSlipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One debt parsed from an uploaded line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankSlip {
    debt_id: DebtId,
    debt_amount: Money,
    debt_due_date: NaiveDate,
    government_id: i64,
    user_name: String,
    user_email: String,
    file_id: FileId,
    status: BankSlipStatus,
}

impl BankSlip {
    /// Creates a slip in `Pending` status.
    pub fn new(
        debt_id: DebtId,
        debt_amount: Money,
        debt_due_date: NaiveDate,
        government_id: i64,
        user_name: impl Into<String>,
        user_email: impl Into<String>,
        file_id: FileId,
    ) -> Self {
        Self {
            debt_id,
            debt_amount,
            debt_due_date,
            government_id,
            user_name: user_name.into(),
            user_email: user_email.into(),
            file_id,
            status: BankSlipStatus::Pending,
        }
    }

    pub(crate) fn billing_failed(&mut self, message: &str) -> Result<(), String> {
        let message = non_empty_or(message, "billing generation failed");
        self.resolve(BankSlipStatus::GenerateBillingError(message))
    }

    pub(crate) fn email_failed(&mut self, message: &str) -> Result<(), String> {
        let message = non_empty_or(message, "sending email failed");
        self.resolve(BankSlipStatus::SendingEmailError(message))
    }

    pub(crate) fn succeed(&mut self) -> Result<(), String> {
        self.resolve(BankSlipStatus::Success)
    }

    fn resolve(&mut self, status: BankSlipStatus) -> Result<(), String> {
        if self.status.is_terminal() {
            return Err(format!(
                "debt {} already resolved as {}",
                self.debt_id, self.status
            ));
        }
        self.status = status;
        Ok(())
    }

    pub fn debt_id(&self) -> &DebtId {
        &self.debt_id
    }

    pub fn debt_amount(&self) -> Money {
        self.debt_amount
    }

    pub fn debt_due_date(&self) -> NaiveDate {
        self.debt_due_date
    }

    pub fn government_id(&self) -> i64 {
        self.government_id
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn user_email(&self) -> &str {
        &self.user_email
    }

    pub fn file_id(&self) -> &FileId {
        &self.file_id
    }

    pub fn status(&self) -> &BankSlipStatus {
        &self.status
    }

    pub fn error_message(&self) -> Option<&str> {
        self.status.error_message()
    }
}

fn non_empty_or(message: &str, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message.to_string()
    }
}
