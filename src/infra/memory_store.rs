//! In-memory store with insert-or-ignore semantics keyed by debt id

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use uuid::Uuid;

use crate::Error;
use crate::domain::{BankSlip, BankSlipBatch, DebtId, FileId, UploadFileMetadata};
use crate::ports::Store;

/// Every call runs under one lock, so each bulk statement is atomic with respect to concurrent processors.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

#[derive(Debug, Default)]
struct StoreState {
    files: Vec<UploadFileMetadata>,
    slips: BTreeMap<DebtId, BankSlip>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All persisted slips ordered by debt id.
    pub fn bank_slips(&self) -> Vec<BankSlip> {
        self.lock().slips.values().cloned().collect()
    }

    pub fn bank_slip(&self, debt_id: &DebtId) -> Option<BankSlip> {
        self.lock().slips.get(debt_id).cloned()
    }

    pub fn files(&self) -> Vec<UploadFileMetadata> {
        self.lock().files.clone()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Store for InMemoryStore {
    fn insert_file_metadata(&self, metadata: &mut UploadFileMetadata) -> Result<(), Error> {
        metadata.assign(FileId::new(Uuid::new_v4().to_string()), Utc::now());
        self.lock().files.push(metadata.clone());
        Ok(())
    }

    fn insert_batch(&self, batch: &BankSlipBatch) -> Result<HashMap<DebtId, bool>, Error> {
        let mut state = self.lock();
        let inserted = batch
            .iter()
            .map(|slip| {
                let debt_id = slip.debt_id().clone();
                let is_new = !state.slips.contains_key(&debt_id);
                if is_new {
                    state.slips.insert(debt_id.clone(), slip.clone());
                }
                (debt_id, is_new)
            })
            .collect();
        Ok(inserted)
    }

    fn update_batch(&self, batches: &[&BankSlipBatch]) -> Result<(), Error> {
        let mut state = self.lock();
        for slip in batches.iter().flat_map(|batch| batch.iter()) {
            // updates never create rows
            if let Some(stored) = state.slips.get_mut(slip.debt_id()) {
                *stored = slip.clone();
            }
        }
        Ok(())
    }
}
