//! # Outbound Ports
//!
//! Collaborators the engine drives: the invoked target (fully untrusted),
//! the payment ledger, and the optional event forwarder.

use crate::domain::execution::EngineRuntime;
use crate::events::TxNotification;
use blox_types::{Address, Selector};

/// The invocation payload handed to a target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetCall {
    /// The account being invoked.
    pub target: Address,
    /// Handler selector. `Selector::ZERO` for a bare value transfer.
    pub selector: Selector,
    /// Native value forwarded with the call.
    pub value: u128,
    /// Resource budget forwarded with the call.
    pub budget: u64,
    /// Raw call payload. Empty for bare value transfers.
    pub data: Vec<u8>,
}

/// An arbitrary external callable. Fully untrusted: it may fail, return
/// garbage, or re-enter the engine through the runtime handle it is given.
pub trait TargetInvoker {
    /// Invokes the target. `Ok` carries the result bytes, `Err` the failure
    /// reason. Either way the engine completes its own bookkeeping; a
    /// failure here is recorded, not propagated.
    ///
    /// `engine` is the in-progress runtime: a reentrant call into the
    /// lifecycle for the record currently executing fails its status check,
    /// because that record has already left PENDING.
    fn invoke(&mut self, call: TargetCall, engine: &mut EngineRuntime<'_>)
        -> Result<Vec<u8>, String>;
}

/// Balance bookkeeping for attached payments. Holds native balances and
/// per-token balances for every account the engine touches.
pub trait PaymentLedger {
    /// Native balance of `account`.
    fn native_balance(&self, account: Address) -> u128;

    /// Balance of `account` in `token`.
    fn token_balance(&self, token: Address, account: Address) -> u128;

    /// Moves native value. `Err` carries the ledger's refusal reason.
    fn transfer_native(&mut self, from: Address, to: Address, amount: u128)
        -> Result<(), String>;

    /// Moves token value. `Err` carries the ledger's refusal reason.
    fn transfer_token(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), String>;
}

/// Optional observer for lifecycle notifications. Best-effort: forwarding
/// failures are swallowed and never affect the engine's own outcome.
pub trait EventForwarder {
    /// Delivers one notification.
    fn forward(&mut self, notification: &TxNotification) -> Result<(), String>;
}
