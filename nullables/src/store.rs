//! Nullable store: thread-safe in-memory persistence for testing.

use phaseguard_store::{
    ControlStore, HeightStore, HeightWrite, PhasedRow, PhasedStore, StoreError, VoteRecord,
    VoteStore,
};
use phaseguard_types::{AccountId, Height, TransactionId};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Clone, Debug, Default)]
struct Tables {
    controls: BTreeMap<AccountId, Vec<u8>>,
    votes: HashMap<TransactionId, Vec<VoteRecord>>,
    phased: BTreeMap<TransactionId, Vec<u8>>,
    last_height: Option<Height>,
}

/// An in-memory height store.
///
/// A commit is applied to a copy of the tables and swapped in only when
/// every table was written, so an injected failure leaves nothing behind.
#[derive(Debug, Default)]
pub struct NullStore {
    tables: Mutex<Tables>,
    fail_writes: AtomicBool,
    fail_vote_writes: AtomicBool,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent commit fail with a backend error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make commits that carry votes fail once their control rows are
    /// already written.
    pub fn set_fail_vote_writes(&self, fail: bool) {
        self.fail_vote_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of stored controls.
    pub fn len(&self) -> usize {
        self.tables.lock().unwrap().controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of stored votes across all transactions.
    pub fn vote_count(&self) -> usize {
        self.tables.lock().unwrap().votes.values().map(Vec::len).sum()
    }

    /// Number of stored phased transactions.
    pub fn phased_count(&self) -> usize {
        self.tables.lock().unwrap().phased.len()
    }
}

impl ControlStore for NullStore {
    fn iter_controls(&self) -> Result<Vec<(AccountId, Vec<u8>)>, StoreError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .controls
            .iter()
            .map(|(account, data)| (*account, data.clone()))
            .collect())
    }
}

impl VoteStore for NullStore {
    fn get_votes(&self, transaction: &TransactionId) -> Result<Vec<VoteRecord>, StoreError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .votes
            .get(transaction)
            .cloned()
            .unwrap_or_default())
    }
}

impl PhasedStore for NullStore {
    fn iter_phased(&self) -> Result<Vec<PhasedRow>, StoreError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .phased
            .iter()
            .map(|(transaction, data)| PhasedRow {
                transaction: *transaction,
                data: data.clone(),
            })
            .collect())
    }
}

impl HeightStore for NullStore {
    fn last_height(&self) -> Result<Option<Height>, StoreError> {
        Ok(self.tables.lock().unwrap().last_height)
    }

    fn commit_height(&self, write: &HeightWrite) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("height commit rejected".into()));
        }
        let mut tables = self.tables.lock().unwrap();
        let mut next = tables.clone();

        for row in &write.controls {
            match &row.data {
                Some(data) => {
                    next.controls.insert(row.account, data.clone());
                }
                None => {
                    next.controls.remove(&row.account);
                }
            }
        }
        if !write.votes.is_empty() && self.fail_vote_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("vote append rejected".into()));
        }
        for record in &write.votes {
            next.votes
                .entry(record.transaction)
                .or_default()
                .push(record.clone());
        }
        for row in &write.phased {
            next.phased.insert(row.transaction, row.data.clone());
        }
        next.last_height = Some(write.height);

        *tables = next;
        Ok(())
    }
}
