use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{BankSlip, Money};

#[cfg(test)]
mod tests;

pub(crate) fn to_bank_slip_records(
    slips: impl IntoIterator<Item = BankSlip>,
) -> impl Iterator<Item = BankSlipRecord> {
    slips.into_iter().map(BankSlipRecord::from)
}

/// Public DTO describing the persisted state of one bank slip.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BankSlipRecord {
    pub debt_id: String,
    pub file_id: String,
    pub user_name: String,
    pub user_email: String,
    pub government_id: i64,
    pub debt_amount: Money,
    pub debt_due_date: NaiveDate,
    pub status: String,
    pub error_message: Option<String>,
}

impl From<BankSlip> for BankSlipRecord {
    fn from(slip: BankSlip) -> Self {
        Self {
            debt_id: slip.debt_id().to_string(),
            file_id: slip.file_id().to_string(),
            user_name: slip.user_name().to_string(),
            user_email: slip.user_email().to_string(),
            government_id: slip.government_id(),
            debt_amount: slip.debt_amount(),
            debt_due_date: slip.debt_due_date(),
            status: slip.status().as_str().to_string(),
            error_message: slip.error_message().map(str::to_string),
        }
    }
}
