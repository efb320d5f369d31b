//! phaseguard node: drives the control layer one height at a time.
//!
//! For each block the node:
//! - Gates every transaction against the committed phasing-only controls
//! - Stages `SetPhasingOnly` updates and commits them as one batch
//! - Admits phased transactions and records votes on them
//! - Re-evaluates every pending phased transaction, applying the control
//!   of an approved phased `SetPhasingOnly`
//! - Persists control, vote and phased transaction rows in one write

pub mod config;
pub mod error;
pub mod height_processor;
pub mod logging;
pub mod metrics;
pub mod tracing_spans;

pub use config::NodeConfig;
pub use error::{NodeError, TransactionRejection, VoteRejected};
pub use height_processor::{Block, HeightProcessor, HeightReport, TransactionOutcome, Transition};
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
