//! # Engine Service
//!
//! [`EngineService`] is the production implementation of
//! [`SecuredAccountApi`]. It owns the engine state and the payment ledger,
//! and stages every lifecycle entry point on a clone of the state: the clone
//! replaces the live state only when the call returns `Ok`, and payments
//! queued during the call reach the ledger only then, so a failure anywhere
//! in the call — permission check, signature verification, attached payment
//! — leaves the engine and the balances exactly as they were.
//!
//! Administrative operations (schemas, roles, wallets) pass through
//! directly: each one validates fully before its single mutation point, so
//! they are atomic without staging.
//!
//! Notifications are emitted after commit and are best-effort: a refusing
//! forwarder is logged and ignored.

use crate::config::EngineConfig;
use crate::domain::entities::{
    CallContext, EngineState, FunctionPermission, FunctionSchema, MetaTransaction, MetaTxParams,
    PaymentDetails, TxParams, TxRecord,
};
use crate::domain::errors::EngineError;
use crate::domain::execution::EngineRuntime;
use crate::events::TxNotification;
use crate::ports::inbound::SecuredAccountApi;
use crate::ports::outbound::{EventForwarder, PaymentLedger, TargetInvoker};
use blox_types::{Address, Hash, Selector};
use tracing::{info, warn};

/// A secured account: engine state plus the host-supplied ledger and an
/// optional notification sink.
pub struct EngineService<L: PaymentLedger, F: EventForwarder> {
    state: EngineState,
    ledger: L,
    forwarder: Option<F>,
}

impl<L: PaymentLedger, F: EventForwarder> EngineService<L, F> {
    /// Creates an uninitialized service over a ledger.
    pub fn new(ledger: L) -> Self {
        Self {
            state: EngineState::default(),
            ledger,
            forwarder: None,
        }
    }

    /// One-time setup from a bootstrap configuration.
    pub fn initialize(&mut self, config: &EngineConfig) -> Result<(), EngineError> {
        let mut staged = self.state.clone();
        staged.initialize(config)?;
        self.state = staged;
        info!(
            chain_id = config.chain_id,
            timelock = config.timelock,
            schemas = config.schemas.len(),
            roles = config.roles.len(),
            "engine initialized"
        );
        Ok(())
    }

    /// Registers the notification sink and records its address.
    pub fn set_event_forwarder(&mut self, address: Address, sink: F) -> Result<(), EngineError> {
        if address.is_zero() {
            return Err(EngineError::InvalidAddress {
                context: "forwarder",
            });
        }
        self.state.forwarder = address;
        self.forwarder = Some(sink);
        Ok(())
    }

    /// Read access to the committed engine state.
    #[must_use]
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Read access to the ledger.
    #[must_use]
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Mutable access to the ledger, for host-side funding.
    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    /// The registered notification sink, if any.
    #[must_use]
    pub fn forwarder_sink(&self) -> Option<&F> {
        self.forwarder.as_ref()
    }

    // =========================================================================
    // REGISTRY & ROLE ADMINISTRATION
    // =========================================================================

    /// Registers a function schema.
    pub fn create_function_schema(&mut self, schema: FunctionSchema) -> Result<(), EngineError> {
        self.require_initialized()?;
        self.state.create_function_schema(schema)
    }

    /// Removes an unprotected, ungranted function schema.
    pub fn remove_function_schema(&mut self, handler: Selector) -> Result<(), EngineError> {
        self.require_initialized()?;
        self.state.remove_function_schema(handler)
    }

    /// Creates a role, returning its derived id.
    pub fn create_role(
        &mut self,
        name: &str,
        max_members: usize,
        protected: bool,
    ) -> Result<Hash, EngineError> {
        self.require_initialized()?;
        self.state.create_role(name, max_members, protected)
    }

    /// Removes an unprotected role.
    pub fn remove_role(&mut self, role_id: Hash) -> Result<(), EngineError> {
        self.require_initialized()?;
        self.state.remove_role(role_id)
    }

    /// Adds a wallet to a role.
    pub fn assign_wallet(&mut self, role_id: Hash, wallet: Address) -> Result<(), EngineError> {
        self.require_initialized()?;
        self.state.assign_wallet(role_id, wallet)
    }

    /// Replaces one wallet with another in a role.
    pub fn update_assigned_wallet(
        &mut self,
        role_id: Hash,
        old: Address,
        new: Address,
    ) -> Result<(), EngineError> {
        self.require_initialized()?;
        self.state.update_assigned_wallet(role_id, old, new)
    }

    /// Removes a wallet from a role. The last member cannot be removed.
    pub fn revoke_wallet(&mut self, role_id: Hash, wallet: Address) -> Result<(), EngineError> {
        self.require_initialized()?;
        self.state.revoke_wallet(role_id, wallet)
    }

    /// Grants actions on a handler to a role.
    pub fn add_function_to_role(
        &mut self,
        role_id: Hash,
        permission: FunctionPermission,
    ) -> Result<(), EngineError> {
        self.require_initialized()?;
        self.state.add_function_to_role(role_id, permission)
    }

    /// Revokes a role's grant on a handler.
    pub fn remove_function_from_role(
        &mut self,
        role_id: Hash,
        handler: Selector,
    ) -> Result<(), EngineError> {
        self.require_initialized()?;
        self.state.remove_function_from_role(role_id, handler)
    }

    // =========================================================================
    // OFF-CHAIN SIGNER TOOLING
    // =========================================================================

    /// Builds an unsigned meta-transaction over an existing record.
    pub fn meta_tx_for_existing(
        &self,
        tx_id: u64,
        meta_params: MetaTxParams,
    ) -> Result<MetaTransaction, EngineError> {
        self.require_initialized()?;
        self.state.build_meta_tx_for_existing(tx_id, meta_params)
    }

    /// Builds an unsigned meta-transaction for a record that does not exist
    /// yet, bound to the next transaction id.
    pub fn meta_tx_for_new(
        &self,
        tx_params: TxParams,
        meta_params: MetaTxParams,
    ) -> Result<MetaTransaction, EngineError> {
        self.require_initialized()?;
        self.state.build_meta_tx_for_new(tx_params, meta_params)
    }

    // =========================================================================
    // STAGING & NOTIFICATION
    // =========================================================================

    fn require_initialized(&self) -> Result<(), EngineError> {
        if self.state.initialized {
            Ok(())
        } else {
            Err(EngineError::NotInitialized)
        }
    }

    /// Runs one lifecycle entry point on a staged clone of the state and
    /// commits the clone only on success.
    ///
    /// Payments queued during the call are applied to the ledger at the same
    /// commit point, so an aborted call — including one a nested entry ran
    /// inside of — leaves state and balances both untouched.
    fn staged(
        &mut self,
        ctx: CallContext,
        f: impl FnOnce(&mut EngineRuntime<'_>) -> Result<TxRecord, EngineError>,
    ) -> Result<TxRecord, EngineError> {
        let mut staged = self.state.clone();
        let mut runtime = EngineRuntime::new(&mut staged, &mut self.ledger, ctx);
        let record = f(&mut runtime)?;
        runtime.commit_payments()?;
        self.state = staged;
        self.notify(&record);
        Ok(record)
    }

    fn notify(&mut self, record: &TxRecord) {
        let notification = TxNotification {
            tx_id: record.id,
            handler: record.params.handler,
            status: record.status,
            requester: record.params.requester,
            target: record.params.target,
            operation_type: record.params.operation_type,
        };
        info!(
            tx_id = notification.tx_id,
            status = %notification.status,
            "transaction lifecycle event"
        );
        if let Some(forwarder) = self.forwarder.as_mut() {
            if let Err(reason) = forwarder.forward(&notification) {
                warn!(tx_id = notification.tx_id, %reason, "event forwarder refused notification");
            }
        }
    }
}

impl<L: PaymentLedger, F: EventForwarder> SecuredAccountApi for EngineService<L, F> {
    fn request_transaction(
        &mut self,
        ctx: CallContext,
        params: TxParams,
        payment: PaymentDetails,
    ) -> Result<TxRecord, EngineError> {
        self.staged(ctx, |rt| rt.request_transaction(params, payment))
    }

    fn approve_transaction(
        &mut self,
        ctx: CallContext,
        tx_id: u64,
        target: &mut dyn TargetInvoker,
    ) -> Result<TxRecord, EngineError> {
        self.staged(ctx, |rt| rt.delayed_approval(tx_id, target))
    }

    fn cancel_transaction(
        &mut self,
        ctx: CallContext,
        tx_id: u64,
    ) -> Result<TxRecord, EngineError> {
        self.staged(ctx, |rt| rt.cancellation(tx_id))
    }

    fn approve_with_meta_tx(
        &mut self,
        ctx: CallContext,
        meta: MetaTransaction,
        target: &mut dyn TargetInvoker,
    ) -> Result<TxRecord, EngineError> {
        self.staged(ctx, |rt| rt.approval_with_meta_tx(&meta, target))
    }

    fn cancel_with_meta_tx(
        &mut self,
        ctx: CallContext,
        meta: MetaTransaction,
    ) -> Result<TxRecord, EngineError> {
        self.staged(ctx, |rt| rt.cancellation_with_meta_tx(&meta))
    }

    fn request_and_approve(
        &mut self,
        ctx: CallContext,
        meta: MetaTransaction,
        target: &mut dyn TargetInvoker,
    ) -> Result<TxRecord, EngineError> {
        self.staged(ctx, |rt| rt.request_and_approve(&meta, target))
    }

    fn update_payment(
        &mut self,
        ctx: CallContext,
        tx_id: u64,
        payment: PaymentDetails,
    ) -> Result<TxRecord, EngineError> {
        self.staged(ctx, |rt| rt.update_payment(tx_id, payment))
    }
}
