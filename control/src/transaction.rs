//! The slice of a transaction the control layer looks at.

use phaseguard_phasing::PhasingParams;
use phaseguard_types::{AccountId, Height, TransactionId};
use serde::{Deserialize, Serialize};

/// What a transaction does, as far as account control is concerned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Attachment {
    /// Install, replace, or (with NONE params) clear the sender's control.
    SetPhasingOnly(PhasingParams),
    /// Any other transaction type. Its effects are applied elsewhere.
    Other,
}

/// Optional phasing clause attached to any transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhasingClause {
    pub params: PhasingParams,
    pub finality_height: Height,
}

/// A submitted transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub sender: AccountId,
    pub attachment: Attachment,
    pub phasing: Option<PhasingClause>,
}

impl Transaction {
    /// The params of the phasing clause, if the transaction is phased.
    pub fn phasing_params(&self) -> Option<&PhasingParams> {
        self.phasing.as_ref().map(|clause| &clause.params)
    }

    pub fn is_control_update(&self) -> bool {
        matches!(self.attachment, Attachment::SetPhasingOnly(_))
    }
}
