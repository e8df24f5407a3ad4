//! # Inbound Ports
//!
//! The API surface the engine exposes to wrapper contracts and host
//! tooling. `EngineService` is the production implementation.

use crate::domain::entities::{
    CallContext, MetaTransaction, PaymentDetails, TxParams, TxRecord,
};
use crate::domain::errors::EngineError;
use crate::ports::outbound::TargetInvoker;

/// Entry points of a secured account.
///
/// Every method either commits state and returns the affected record, or
/// aborts with a typed error and changes nothing.
pub trait SecuredAccountApi {
    /// Requests an operation on the time-delay path.
    fn request_transaction(
        &mut self,
        ctx: CallContext,
        params: TxParams,
        payment: PaymentDetails,
    ) -> Result<TxRecord, EngineError>;

    /// Approves a pending operation once its release time has passed.
    fn approve_transaction(
        &mut self,
        ctx: CallContext,
        tx_id: u64,
        target: &mut dyn TargetInvoker,
    ) -> Result<TxRecord, EngineError>;

    /// Cancels a pending operation. No time guard.
    fn cancel_transaction(&mut self, ctx: CallContext, tx_id: u64)
        -> Result<TxRecord, EngineError>;

    /// Approves a pending operation via a signed delegation.
    fn approve_with_meta_tx(
        &mut self,
        ctx: CallContext,
        meta: MetaTransaction,
        target: &mut dyn TargetInvoker,
    ) -> Result<TxRecord, EngineError>;

    /// Cancels a pending operation via a signed delegation.
    fn cancel_with_meta_tx(
        &mut self,
        ctx: CallContext,
        meta: MetaTransaction,
    ) -> Result<TxRecord, EngineError>;

    /// Requests and approves in one call via a signed delegation.
    fn request_and_approve(
        &mut self,
        ctx: CallContext,
        meta: MetaTransaction,
        target: &mut dyn TargetInvoker,
    ) -> Result<TxRecord, EngineError>;

    /// Attaches or replaces the payment on a pending operation.
    fn update_payment(
        &mut self,
        ctx: CallContext,
        tx_id: u64,
        payment: PaymentDetails,
    ) -> Result<TxRecord, EngineError>;
}
