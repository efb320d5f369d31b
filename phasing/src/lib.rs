//! Phasing for phaseguard.
//!
//! A phased transaction is held back until a vote among eligible accounts
//! reaches quorum, or expires at its finality height. This crate owns:
//! - **Parameters**: [`PhasingParams`], built only by the [`validator`]
//! - **Voting models**: ACCOUNT, BALANCE, ASSET and CURRENCY weighting
//! - **Whitelists**: bounded sets of eligible voters
//! - **Evaluation**: the PENDING → APPROVED | EXPIRED state machine,
//!   re-run at every height

pub mod error;
pub mod evaluator;
pub mod model;
pub mod params;
pub mod validator;
pub mod vote;
pub mod weight;
pub mod whitelist;

pub use error::ValidationError;
pub use evaluator::{Evaluation, PendingPhasedTransaction, PhasingState, QuorumEvaluator};
pub use model::{MinBalanceModelKind, VotingModel, VotingModelKind};
pub use params::PhasingParams;
pub use validator::{validate, validate_finality, ControlFields, RawPhasingFields, MAX_QUORUM};
pub use vote::{Vote, VoteTally};
pub use weight::voter_weight;
pub use whitelist::{Whitelist, MAX_WHITELIST_SIZE};
