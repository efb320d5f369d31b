//! Phasing votes and the per-transaction tally.

use phaseguard_types::{AccountId, Height, TransactionId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A vote to approve a phased transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vote {
    pub transaction: TransactionId,
    pub voter: AccountId,
    pub height_cast: Height,
}

/// The votes on one phased transaction, one entry per voter.
///
/// A later vote from the same voter replaces the earlier one; voting twice
/// never adds weight.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteTally {
    transaction: TransactionId,
    latest: BTreeMap<AccountId, Height>,
}

impl VoteTally {
    pub fn new(transaction: TransactionId) -> Self {
        Self {
            transaction,
            latest: BTreeMap::new(),
        }
    }

    /// Rebuild a tally from stored votes, in any order.
    pub fn from_votes<'a, I>(transaction: TransactionId, votes: I) -> Self
    where
        I: IntoIterator<Item = &'a Vote>,
    {
        let mut tally = Self::new(transaction);
        for vote in votes {
            tally.record(vote);
        }
        tally
    }

    pub fn transaction(&self) -> TransactionId {
        self.transaction
    }

    /// Record a vote. Returns `true` if this is the voter's first vote.
    ///
    /// Votes addressed to another transaction are ignored.
    pub fn record(&mut self, vote: &Vote) -> bool {
        if vote.transaction != self.transaction {
            return false;
        }
        match self.latest.get_mut(&vote.voter) {
            Some(height) => {
                *height = (*height).max(vote.height_cast);
                false
            }
            None => {
                self.latest.insert(vote.voter, vote.height_cast);
                true
            }
        }
    }

    /// Voters whose latest vote was cast at or before `height`, in account order.
    pub fn voters_as_of(&self, height: Height) -> impl Iterator<Item = AccountId> + '_ {
        self.latest
            .iter()
            .filter(move |(_, cast)| **cast <= height)
            .map(|(voter, _)| *voter)
    }

    /// Height of the voter's latest vote.
    pub fn latest_vote(&self, voter: AccountId) -> Option<Height> {
        self.latest.get(&voter).copied()
    }

    /// Number of distinct voters.
    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }
}
