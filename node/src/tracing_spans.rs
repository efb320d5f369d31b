//! Pre-built [`tracing::Span`] constructors for node operations.
//!
//! Consistent span names and field sets make it easy to filter and correlate
//! the log lines of one height.

use phaseguard_types::{Height, TransactionId};
use tracing::{debug_span, info_span, Span};

/// Span covering the processing of a whole height.
pub fn height_process_span(height: Height, transactions: usize, votes: usize) -> Span {
    info_span!("height_process", %height, transactions, votes)
}

/// Span covering the admission of one transaction.
pub fn transaction_admit_span(id: TransactionId) -> Span {
    debug_span!("transaction_admit", tx = %id)
}

/// Span covering the re-evaluation of pending phased transactions.
pub fn evaluation_span(height: Height, pending: usize) -> Span {
    info_span!("phasing_evaluation", %height, pending)
}
