//! # Transaction Status
//!
//! The lifecycle state machine for secured-account transactions:
//!
//! ```text
//! PENDING ──approve──→ COMPLETED | FAILED
//! PENDING ──cancel───→ CANCELLED
//! ```
//!
//! No other transitions are legal. `Undefined` and `Rejected` are reserved
//! and never produced by the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a transaction record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TxStatus {
    /// Reserved. Never produced by the engine.
    #[default]
    Undefined,
    /// Awaiting approval or cancellation.
    Pending,
    /// Cancelled before execution.
    Cancelled,
    /// Target invocation succeeded and any attached payment was released.
    Completed,
    /// Target invocation failed; the failure reason is kept as the result.
    Failed,
    /// Reserved. Never produced by the engine.
    Rejected,
}

impl TxStatus {
    /// Returns true if a record in this status may still transition.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns true if this is a legal transition from `self`.
    ///
    /// Only `Pending` records move; everything else is terminal.
    #[must_use]
    pub fn can_transition_to(&self, next: TxStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Completed)
                | (Self::Pending, Self::Failed)
                | (Self::Pending, Self::Cancelled)
        )
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Undefined => "UNDEFINED",
            Self::Pending => "PENDING",
            Self::Cancelled => "CANCELLED",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Rejected => "REJECTED",
        };
        f.write_str(name)
    }
}
