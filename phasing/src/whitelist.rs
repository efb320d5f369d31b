//! Bounded, ordered set of whitelisted voters.

use crate::error::ValidationError;
use phaseguard_types::AccountId;

/// Maximum number of accounts a whitelist may hold.
pub const MAX_WHITELIST_SIZE: usize = 10;

/// A sorted set of at most [`MAX_WHITELIST_SIZE`] distinct, non-zero accounts.
///
/// The bound is checked once, at construction; there is no way to grow a
/// whitelist afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Whitelist {
    accounts: Vec<AccountId>,
}

impl Whitelist {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a whitelist from raw entries.
    ///
    /// The size bound is checked before anything else, then zero ids, then
    /// duplicates. Entry order does not matter.
    pub fn try_from_ids<I>(ids: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = AccountId>,
    {
        let mut accounts: Vec<AccountId> = ids.into_iter().collect();
        if accounts.len() > MAX_WHITELIST_SIZE {
            return Err(ValidationError::WhitelistTooLarge {
                len: accounts.len(),
                max: MAX_WHITELIST_SIZE,
            });
        }
        if accounts.iter().any(AccountId::is_zero) {
            return Err(ValidationError::InvalidWhitelistEntry);
        }
        accounts.sort_unstable();
        if let Some(pair) = accounts.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(ValidationError::DuplicateWhitelistEntry(pair[0]));
        }
        Ok(Self { accounts })
    }

    pub fn contains(&self, account: AccountId) -> bool {
        self.accounts.binary_search(&account).is_ok()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Accounts in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = AccountId> + '_ {
        self.accounts.iter().copied()
    }

    /// Whether every account in `other` is also in `self`.
    pub fn is_superset_of(&self, other: &Whitelist) -> bool {
        other.iter().all(|account| self.contains(account))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[u64]) -> Vec<AccountId> {
        raw.iter().copied().map(AccountId::new).collect()
    }

    #[test]
    fn entries_are_kept_sorted() {
        let wl = Whitelist::try_from_ids(ids(&[30, 10, 20])).unwrap();
        assert_eq!(wl.iter().collect::<Vec<_>>(), ids(&[10, 20, 30]));
        assert!(wl.contains(AccountId::new(20)));
        assert!(!wl.contains(AccountId::new(25)));
    }

    #[test]
    fn oversized_whitelist_is_rejected_before_duplicates() {
        let raw: Vec<u64> = std::iter::repeat(7).take(MAX_WHITELIST_SIZE + 1).collect();
        let err = Whitelist::try_from_ids(ids(&raw)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::WhitelistTooLarge {
                len: MAX_WHITELIST_SIZE + 1,
                max: MAX_WHITELIST_SIZE
            }
        );
    }

    #[test]
    fn full_whitelist_is_accepted() {
        let raw: Vec<u64> = (1..=MAX_WHITELIST_SIZE as u64).collect();
        let wl = Whitelist::try_from_ids(ids(&raw)).unwrap();
        assert_eq!(wl.len(), MAX_WHITELIST_SIZE);
    }

    #[test]
    fn duplicate_entry_is_reported() {
        let err = Whitelist::try_from_ids(ids(&[5, 9, 5])).unwrap_err();
        assert_eq!(err, ValidationError::DuplicateWhitelistEntry(AccountId::new(5)));
    }

    #[test]
    fn zero_account_is_rejected() {
        let err = Whitelist::try_from_ids(ids(&[0, 1])).unwrap_err();
        assert_eq!(err, ValidationError::InvalidWhitelistEntry);
    }

    #[test]
    fn superset_check() {
        let big = Whitelist::try_from_ids(ids(&[1, 2, 3])).unwrap();
        let small = Whitelist::try_from_ids(ids(&[1, 3])).unwrap();
        assert!(big.is_superset_of(&small));
        assert!(!small.is_superset_of(&big));
        assert!(small.is_superset_of(&Whitelist::empty()));
    }
}
