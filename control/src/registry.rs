//! Per-account store of active phasing-only controls.
//!
//! The registry is the single writer of the `account → params` map. All
//! updates of a height go through a [`ControlBatch`] and become visible
//! together on [`ControlBatch::commit`]; dropping a batch discards it.
//! Readers work on immutable [`ControlSnapshot`]s and never block the
//! writer for longer than an `Arc` swap.

use crate::error::ControlError;
use phaseguard_phasing::PhasingParams;
use phaseguard_store::{ControlRow, ControlStore, StoreError};
use phaseguard_types::{AccountId, Height};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

/// An immutable view of the committed controls at some height.
#[derive(Clone, Debug, Default)]
pub struct ControlSnapshot {
    controls: Arc<BTreeMap<AccountId, PhasingParams>>,
    height: Option<Height>,
}

impl ControlSnapshot {
    pub fn get(&self, account: AccountId) -> Option<&PhasingParams> {
        self.controls.get(&account)
    }

    /// Height of the last committed batch, `None` before the first commit.
    pub fn height(&self) -> Option<Height> {
        self.height
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    /// Controlled accounts and their params, in ascending account order.
    pub fn iter(&self) -> impl Iterator<Item = (AccountId, &PhasingParams)> {
        self.controls.iter().map(|(account, params)| (*account, params))
    }
}

/// A committed change to one account's control. `params` is `None` when
/// the control was cleared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControlChange {
    pub account: AccountId,
    pub params: Option<PhasingParams>,
}

impl ControlChange {
    /// Encode as a persisted row.
    pub fn to_row(&self) -> Result<ControlRow, StoreError> {
        let data = self
            .params
            .as_ref()
            .map(bincode::serialize)
            .transpose()
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(ControlRow {
            account: self.account,
            data,
        })
    }
}

/// Read-only handle for concurrent queries against the committed state.
#[derive(Clone, Debug)]
pub struct ControlReader {
    shared: Arc<RwLock<ControlSnapshot>>,
}

impl ControlReader {
    pub fn snapshot(&self) -> ControlSnapshot {
        self.shared
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get(&self, account: AccountId) -> Option<PhasingParams> {
        self.snapshot().get(account).cloned()
    }
}

/// Owner of the per-account control map.
#[derive(Debug, Default)]
pub struct ControlRegistry {
    shared: Arc<RwLock<ControlSnapshot>>,
}

impl ControlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore the registry from a control store.
    pub fn load<S: ControlStore>(store: &S) -> Result<Self, StoreError> {
        Self::from_rows(store.iter_controls()?)
    }

    /// Restore the registry from persisted `(account, bytes)` rows.
    pub fn from_rows<I>(rows: I) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = (AccountId, Vec<u8>)>,
    {
        let mut controls = BTreeMap::new();
        for (account, data) in rows {
            let params: PhasingParams = bincode::deserialize(&data)
                .map_err(|e| StoreError::Corruption(format!("control of {account}: {e}")))?;
            if params.is_none() {
                return Err(StoreError::Corruption(format!(
                    "control of {account} is stored as NONE"
                )));
            }
            controls.insert(account, params);
        }
        tracing::info!(controls = controls.len(), "loaded phasing-only controls");
        Ok(Self {
            shared: Arc::new(RwLock::new(ControlSnapshot {
                controls: Arc::new(controls),
                height: None,
            })),
        })
    }

    /// Export the committed controls in the persisted layout.
    pub fn rows(&self) -> Result<Vec<ControlRow>, StoreError> {
        self.snapshot()
            .iter()
            .map(|(account, params)| {
                ControlChange {
                    account,
                    params: Some(params.clone()),
                }
                .to_row()
            })
            .collect()
    }

    /// Handle for concurrent readers. Sees every later commit.
    pub fn reader(&self) -> ControlReader {
        ControlReader {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn snapshot(&self) -> ControlSnapshot {
        self.reader().snapshot()
    }

    /// The active control of `account`, if any.
    pub fn get(&self, account: AccountId) -> Option<PhasingParams> {
        self.snapshot().get(account).cloned()
    }

    /// Accounts with an active control, in ascending order.
    pub fn controlled_accounts(&self) -> Vec<AccountId> {
        self.snapshot().iter().map(|(account, _)| account).collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Start collecting the control updates of `height`.
    ///
    /// Takes `&mut self`: there is at most one open batch.
    pub fn begin_batch(&mut self, height: Height) -> ControlBatch<'_> {
        let base = self.snapshot();
        ControlBatch {
            registry: self,
            base,
            height,
            staged: BTreeMap::new(),
        }
    }

    /// Apply a single update as its own batch.
    pub fn apply(
        &mut self,
        height: Height,
        account: AccountId,
        params: PhasingParams,
    ) -> Result<Vec<ControlChange>, ControlError> {
        let mut batch = self.begin_batch(height);
        batch.apply(account, params)?;
        Ok(batch.commit())
    }

    fn publish(&mut self, snapshot: ControlSnapshot) {
        *self
            .shared
            .write()
            .unwrap_or_else(PoisonError::into_inner) = snapshot;
    }
}

/// The control updates of one height, not yet visible to readers.
#[derive(Debug)]
pub struct ControlBatch<'a> {
    registry: &'a mut ControlRegistry,
    base: ControlSnapshot,
    height: Height,
    staged: BTreeMap<AccountId, PhasingParams>,
}

impl ControlBatch<'_> {
    /// Stage a replace (or, for NONE params, a clear) of `account`'s control.
    ///
    /// A second update from the same account in one batch fails with
    /// [`ControlError::DuplicateControlUpdate`] and leaves the batch as it was.
    pub fn apply(&mut self, account: AccountId, params: PhasingParams) -> Result<(), ControlError> {
        match self.staged.entry(account) {
            Entry::Occupied(_) => {
                tracing::debug!(%account, height = %self.height, "duplicate control update");
                Err(ControlError::DuplicateControlUpdate {
                    account,
                    height: self.height,
                })
            }
            Entry::Vacant(slot) => {
                tracing::debug!(
                    %account,
                    height = %self.height,
                    model = %params.voting_model_kind(),
                    "staged control update"
                );
                slot.insert(params);
                Ok(())
            }
        }
    }

    /// The update staged for `account` in this batch.
    pub fn staged(&self, account: AccountId) -> Option<&PhasingParams> {
        self.staged.get(&account)
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// The effective changes this batch would commit.
    ///
    /// Clearing an account that has no control is not a change.
    pub fn changes(&self) -> Vec<ControlChange> {
        self.staged
            .iter()
            .filter_map(|(account, params)| {
                if !params.is_none() {
                    Some(ControlChange {
                        account: *account,
                        params: Some(params.clone()),
                    })
                } else if self.base.get(*account).is_some() {
                    Some(ControlChange {
                        account: *account,
                        params: None,
                    })
                } else {
                    None
                }
            })
            .collect()
    }

    /// Publish every staged update at once and return the effective changes.
    pub fn commit(self) -> Vec<ControlChange> {
        let changes = self.changes();
        let mut controls = (*self.base.controls).clone();
        for change in &changes {
            match &change.params {
                Some(params) => {
                    controls.insert(change.account, params.clone());
                }
                None => {
                    controls.remove(&change.account);
                }
            }
        }
        tracing::info!(
            height = %self.height,
            changes = changes.len(),
            controls = controls.len(),
            "committed control batch"
        );
        self.registry.publish(ControlSnapshot {
            controls: Arc::new(controls),
            height: Some(self.height),
        });
        changes
    }
}
