//! Module defining the per-chunk collection of bank slips

use std::collections::HashMap;

use crate::domain::{BankSlip, DebtId};

/// Bank slips of one chunk keyed by debt id. The unit of bulk insert and update.
///
/// A batch is owned by exactly one processor at a time and moved, never shared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BankSlipBatch {
    slips: HashMap<DebtId, BankSlip>,
}

impl BankSlipBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a slip, replacing an earlier one with the same debt id (last write wins).
    pub fn insert(&mut self, slip: BankSlip) -> Option<BankSlip> {
        self.slips.insert(slip.debt_id().clone(), slip)
    }

    pub fn remove(&mut self, debt_id: &DebtId) -> Option<BankSlip> {
        self.slips.remove(debt_id)
    }

    pub fn get(&self, debt_id: &DebtId) -> Option<&BankSlip> {
        self.slips.get(debt_id)
    }

    pub fn contains(&self, debt_id: &DebtId) -> bool {
        self.slips.contains_key(debt_id)
    }

    pub fn len(&self) -> usize {
        self.slips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slips.is_empty()
    }

    pub fn debt_ids(&self) -> impl Iterator<Item = &DebtId> {
        self.slips.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BankSlip> {
        self.slips.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut BankSlip> {
        self.slips.values_mut()
    }

    /// Keeps only the slips the store reported as newly inserted. Ids missing from `inserted` count as
    /// duplicates. Returns the number of dropped slips.
    pub fn retain_inserted(&mut self, inserted: &HashMap<DebtId, bool>) -> usize {
        let before = self.slips.len();
        self.slips
            .retain(|debt_id, _| inserted.get(debt_id).copied().unwrap_or(false));
        before - self.slips.len()
    }
}

impl FromIterator<BankSlip> for BankSlipBatch {
    fn from_iter<T: IntoIterator<Item = BankSlip>>(iter: T) -> Self {
        let mut batch = Self::new();
        for slip in iter {
            batch.insert(slip);
        }
        batch
    }
}

impl IntoIterator for BankSlipBatch {
    type Item = BankSlip;
    type IntoIter = std::collections::hash_map::IntoValues<DebtId, BankSlip>;

    fn into_iter(self) -> Self::IntoIter {
        self.slips.into_values()
    }
}
