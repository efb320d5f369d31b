//! Nullable chain state: programmable balances for testing.

use phaseguard_store::{StateAccessError, StateAccessor};
use phaseguard_types::{AccountId, Height, HoldingId};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

/// An in-memory [`StateAccessor`].
///
/// Balances are recorded as "from this height on" entries, so a test can
/// script a balance drop at a later height. Reading a height marked
/// unavailable fails with [`StateAccessError::Unavailable`].
pub struct NullState {
    accounts: Mutex<HashSet<AccountId>>,
    balances: Mutex<HashMap<AccountId, BTreeMap<Height, u64>>>,
    holdings: Mutex<HashMap<(HoldingId, AccountId), BTreeMap<Height, u64>>>,
    unavailable: Mutex<HashSet<Height>>,
}

impl NullState {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashSet::new()),
            balances: Mutex::new(HashMap::new()),
            holdings: Mutex::new(HashMap::new()),
            unavailable: Mutex::new(HashSet::new()),
        }
    }

    /// Register an account with no balance.
    pub fn add_account(&self, account: AccountId) {
        self.accounts.lock().unwrap().insert(account);
    }

    /// Set the native balance of `account` from height `from` onwards.
    pub fn set_balance(&self, account: AccountId, from: Height, amount: u64) {
        self.add_account(account);
        self.balances
            .lock()
            .unwrap()
            .entry(account)
            .or_default()
            .insert(from, amount);
    }

    /// Set the `holding` balance of `account` from height `from` onwards.
    pub fn set_holding_balance(
        &self,
        holding: HoldingId,
        account: AccountId,
        from: Height,
        amount: u64,
    ) {
        self.add_account(account);
        self.holdings
            .lock()
            .unwrap()
            .entry((holding, account))
            .or_default()
            .insert(from, amount);
    }

    /// Make every read at `height` fail until [`NullState::restore`] is called.
    pub fn make_unavailable(&self, height: Height) {
        self.unavailable.lock().unwrap().insert(height);
    }

    pub fn restore(&self, height: Height) {
        self.unavailable.lock().unwrap().remove(&height);
    }

    fn check_available(&self, height: Height) -> Result<(), StateAccessError> {
        if self.unavailable.lock().unwrap().contains(&height) {
            return Err(StateAccessError::Unavailable { height });
        }
        Ok(())
    }
}

impl Default for NullState {
    fn default() -> Self {
        Self::new()
    }
}

fn value_at(history: Option<&BTreeMap<Height, u64>>, height: Height) -> u64 {
    history
        .and_then(|h| h.range(..=height).next_back())
        .map(|(_, amount)| *amount)
        .unwrap_or(0)
}

impl StateAccessor for NullState {
    fn balance(&self, account: AccountId, height: Height) -> Result<u64, StateAccessError> {
        self.check_available(height)?;
        Ok(value_at(self.balances.lock().unwrap().get(&account), height))
    }

    fn holding_balance(
        &self,
        holding: HoldingId,
        account: AccountId,
        height: Height,
    ) -> Result<u64, StateAccessError> {
        self.check_available(height)?;
        Ok(value_at(
            self.holdings.lock().unwrap().get(&(holding, account)),
            height,
        ))
    }

    fn account_exists(&self, account: AccountId) -> bool {
        self.accounts.lock().unwrap().contains(&account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_history_is_read_as_of_height() {
        let state = NullState::new();
        let a = AccountId::new(1);
        state.set_balance(a, Height::new(10), 500);
        state.set_balance(a, Height::new(20), 50);
        assert_eq!(state.balance(a, Height::new(5)).unwrap(), 0);
        assert_eq!(state.balance(a, Height::new(10)).unwrap(), 500);
        assert_eq!(state.balance(a, Height::new(19)).unwrap(), 500);
        assert_eq!(state.balance(a, Height::new(25)).unwrap(), 50);
    }

    #[test]
    fn unknown_account_does_not_exist() {
        let state = NullState::new();
        assert!(!state.account_exists(AccountId::new(3)));
        state.add_account(AccountId::new(3));
        assert!(state.account_exists(AccountId::new(3)));
    }

    #[test]
    fn unavailable_height_fails_reads() {
        let state = NullState::new();
        let a = AccountId::new(1);
        let h = Height::new(7);
        state.set_holding_balance(HoldingId::new(2), a, Height::GENESIS, 10);
        state.make_unavailable(h);
        assert_eq!(
            state.balance(a, h),
            Err(StateAccessError::Unavailable { height: h })
        );
        assert!(state.holding_balance(HoldingId::new(2), a, h).is_err());
        state.restore(h);
        assert_eq!(state.holding_balance(HoldingId::new(2), a, h).unwrap(), 10);
    }
}
