//! # Lifecycle Notifications
//!
//! Every successful state-mutating entry point emits one `TxNotification`
//! for off-chain observers, and best-effort forwards the same tuple to the
//! registered event forwarder.

use blox_types::{Address, Hash, Selector, TxStatus};
use serde::{Deserialize, Serialize};

/// Public notification of a lifecycle transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxNotification {
    /// The affected transaction.
    pub tx_id: u64,
    /// Handler of the operation.
    pub handler: Selector,
    /// Status after the call committed.
    pub status: TxStatus,
    /// Principal the operation runs on behalf of.
    pub requester: Address,
    /// Invoked target.
    pub target: Address,
    /// Operation category.
    pub operation_type: Hash,
}
