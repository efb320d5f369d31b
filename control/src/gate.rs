//! Admission check for transactions sent by controlled accounts.

use crate::error::ControlViolation;
use crate::registry::ControlSnapshot;
use crate::transaction::Transaction;
use phaseguard_phasing::PhasingParams;
use phaseguard_types::AccountId;

/// Check that `phasing` is at least as restrictive as `control`.
///
/// `None` (and NONE params) mean the transaction is not phased.
pub fn check_restrictiveness(
    control: &PhasingParams,
    phasing: Option<&PhasingParams>,
    account: AccountId,
) -> Result<(), ControlViolation> {
    let phasing = match phasing {
        Some(p) if !p.is_none() => p,
        _ => return Err(ControlViolation::NotPhased { account }),
    };

    if phasing.voting_model_kind() != control.voting_model_kind() {
        return Err(ControlViolation::VotingModelMismatch {
            expected: control.voting_model_kind(),
            found: phasing.voting_model_kind(),
        });
    }
    if phasing.quorum() < control.quorum() {
        return Err(ControlViolation::QuorumTooLow {
            required: control.quorum(),
            found: phasing.quorum(),
        });
    }
    // Equal voting models imply equal min-balance models whenever both are set.
    if phasing.min_balance() < control.min_balance() {
        return Err(ControlViolation::MinBalanceTooLow {
            required: control.min_balance(),
            found: phasing.min_balance(),
        });
    }
    if let (Some(expected), Some(found)) = (control.holding(), phasing.holding()) {
        if expected != found {
            return Err(ControlViolation::HoldingMismatch { expected, found });
        }
    }
    if let Some(missing) = control
        .whitelist()
        .iter()
        .find(|account| !phasing.whitelist().contains(*account))
    {
        return Err(ControlViolation::WhitelistNotSuperset { missing });
    }
    Ok(())
}

/// Checks transactions against one committed view of the registry.
///
/// The view is fixed for the gate's lifetime, so every transaction of a
/// height is judged against the controls as they stood before that height.
#[derive(Clone, Debug)]
pub struct TransactionGate {
    controls: ControlSnapshot,
}

impl TransactionGate {
    pub fn new(controls: ControlSnapshot) -> Self {
        Self { controls }
    }

    /// Admit or refuse `tx`.
    ///
    /// Uncontrolled senders always pass. A controlled sender's transaction
    /// must be phased at least as restrictively as its control, and that
    /// includes `SetPhasingOnly` updates that replace or clear the control.
    pub fn check(&self, tx: &Transaction) -> Result<(), ControlViolation> {
        let Some(control) = self.controls.get(tx.sender) else {
            return Ok(());
        };
        check_restrictiveness(control, tx.phasing_params(), tx.sender).inspect_err(|violation| {
            tracing::debug!(
                tx = %tx.id,
                sender = %tx.sender,
                code = violation.code(),
                %violation,
                "transaction refused by phasing-only control"
            );
        })
    }

    pub fn controls(&self) -> &ControlSnapshot {
        &self.controls
    }
}
