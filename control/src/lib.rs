//! Phasing-only account control.
//!
//! An account that installs a control (via a `SetPhasingOnly` transaction)
//! can no longer issue unphased transactions: everything it sends must be
//! phased at least as restrictively as the control demands, including later
//! attempts to loosen or clear the control itself.
//!
//! - [`ControlRegistry`] owns the `account → params` map and applies a
//!   height's updates as one batch.
//! - [`TransactionGate`] checks submitted transactions against the
//!   committed controls.

pub mod error;
pub mod gate;
pub mod registry;
pub mod transaction;

pub use error::{ControlError, ControlViolation};
pub use gate::{check_restrictiveness, TransactionGate};
pub use registry::{ControlBatch, ControlChange, ControlReader, ControlRegistry, ControlSnapshot};
pub use transaction::{Attachment, PhasingClause, Transaction};
