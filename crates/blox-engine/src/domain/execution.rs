//! # Execution & Payment Engine
//!
//! [`EngineRuntime`] is the orchestration layer both the timelock path and
//! the meta-transaction path run through. It borrows the (staged) engine
//! state and the payment ledger for the duration of one external entry call;
//! the untrusted target receives the same runtime, so reentrant calls hit
//! the lifecycle state machine, not a separate lock.
//!
//! Target invocation failure is data: it is recorded as `FAILED` and never
//! propagated. Attached-payment failure after a successful invocation is an
//! engine error and aborts the whole call — the service layer then discards
//! the staged state, unwinding the just-set `COMPLETED` status with it.
//!
//! Payments are staged the same way the state is: transfers are checked
//! against journal-adjusted balances and queued during the call, then
//! applied to the real ledger only at the commit point. A nested approval's
//! payment therefore rolls back together with its status write when the
//! outer call aborts.

use crate::domain::entities::{
    CallContext, EngineState, MetaTransaction, PaymentDetails, TxParams, TxRecord,
};
use crate::domain::errors::EngineError;
use crate::domain::signing::MetaTxKind;
use crate::ports::outbound::{PaymentLedger, TargetCall, TargetInvoker};
use blox_types::{Address, TxAction, TxStatus};
use std::collections::BTreeMap;
use tracing::debug;

/// The in-progress state of one external entry call.
pub struct EngineRuntime<'a> {
    state: &'a mut EngineState,
    ledger: LedgerStage<'a>,
    ctx: CallContext,
}

impl<'a> EngineRuntime<'a> {
    /// Creates a runtime over staged state for one entry call.
    pub fn new(
        state: &'a mut EngineState,
        ledger: &'a mut dyn PaymentLedger,
        ctx: CallContext,
    ) -> Self {
        Self {
            state,
            ledger: LedgerStage::new(ledger),
            ctx,
        }
    }

    /// Applies every payment queued during the call to the real ledger.
    ///
    /// Called by the service at the commit point, after the entry call
    /// succeeded and before the staged state is swapped in. An aborted call
    /// never reaches this, so its queued payments are discarded with the
    /// staged state.
    pub fn commit_payments(self) -> Result<(), EngineError> {
        self.ledger
            .commit()
            .map_err(|reason| EngineError::PaymentTransferFailed { reason })
    }

    /// Read access to the engine state as seen mid-call.
    #[must_use]
    pub fn state(&self) -> &EngineState {
        self.state
    }

    /// The context of the current entry call.
    #[must_use]
    pub fn ctx(&self) -> CallContext {
        self.ctx
    }

    fn require_initialized(&self) -> Result<(), EngineError> {
        if self.state.initialized {
            Ok(())
        } else {
            Err(EngineError::NotInitialized)
        }
    }

    // =========================================================================
    // TIME-DELAY PATH
    // =========================================================================

    /// Requests an operation that executes only after the timelock.
    ///
    /// The caller must hold the time-delay-request action — or the
    /// execute-meta request-and-approve action, which subsumes it — for the
    /// handler.
    pub fn request_transaction(
        &mut self,
        params: TxParams,
        payment: PaymentDetails,
    ) -> Result<TxRecord, EngineError> {
        self.require_initialized()?;
        let caller = self.ctx.caller;
        if !self
            .state
            .has_action_permission(caller, params.handler, TxAction::TimeDelayRequest)
            && !self.state.has_action_permission(
                caller,
                params.handler,
                TxAction::ExecuteMetaRequestAndApprove,
            )
        {
            return Err(EngineError::NoPermission {
                principal: caller,
                action: TxAction::TimeDelayRequest,
                handler: params.handler,
            });
        }

        let id = self.state.create_transaction(params, payment, self.ctx.now)?;
        debug!(tx_id = id, "transaction requested");
        Ok(self.state.transaction(id)?.clone())
    }

    /// Approves a pending record once `now` has reached its release time.
    pub fn delayed_approval(
        &mut self,
        tx_id: u64,
        target: &mut dyn TargetInvoker,
    ) -> Result<TxRecord, EngineError> {
        self.require_initialized()?;
        let record = self.state.pending_transaction(tx_id)?;
        let handler = record.params.handler;
        let release_time = record.release_time;

        self.state
            .require_action_permission(self.ctx.caller, handler, TxAction::TimeDelayApprove)?;
        if self.ctx.now < release_time {
            return Err(EngineError::BeforeReleaseTime {
                release_time,
                now: self.ctx.now,
            });
        }

        self.execute_transaction(tx_id, target)?;
        Ok(self.state.transaction(tx_id)?.clone())
    }

    /// Cancels a pending record. No time guard: a PENDING record lives until
    /// explicitly cancelled or approved.
    pub fn cancellation(&mut self, tx_id: u64) -> Result<TxRecord, EngineError> {
        self.require_initialized()?;
        let record = self.state.pending_transaction(tx_id)?;
        let handler = record.params.handler;

        self.state
            .require_action_permission(self.ctx.caller, handler, TxAction::TimeDelayCancel)?;
        self.state
            .transition_transaction(tx_id, TxStatus::Cancelled, Vec::new())?;
        Ok(self.state.transaction(tx_id)?.clone())
    }

    // =========================================================================
    // META-TRANSACTION PATH
    // =========================================================================

    /// Approves a pending record via a signed delegation, bypassing the
    /// timelock. The relayer (caller) needs the execute half of the pair,
    /// the signer the sign half.
    pub fn approval_with_meta_tx(
        &mut self,
        meta: &MetaTransaction,
        target: &mut dyn TargetInvoker,
    ) -> Result<TxRecord, EngineError> {
        self.require_initialized()?;
        self.state.require_action_permission(
            self.ctx.caller,
            meta.params.handler,
            TxAction::ExecuteMetaApprove,
        )?;
        let signer = self.state.verify_meta_tx(
            meta,
            MetaTxKind::Existing,
            TxAction::SignMetaApprove,
            self.ctx.now,
        )?;

        // Nonce burns now, whatever the invocation does.
        self.state.consume_nonce(signer);
        self.execute_transaction(meta.record.id, target)?;
        Ok(self.state.transaction(meta.record.id)?.clone())
    }

    /// Cancels a pending record via a signed delegation.
    pub fn cancellation_with_meta_tx(
        &mut self,
        meta: &MetaTransaction,
    ) -> Result<TxRecord, EngineError> {
        self.require_initialized()?;
        self.state.require_action_permission(
            self.ctx.caller,
            meta.params.handler,
            TxAction::ExecuteMetaCancel,
        )?;
        let signer = self.state.verify_meta_tx(
            meta,
            MetaTxKind::Existing,
            TxAction::SignMetaCancel,
            self.ctx.now,
        )?;

        self.state.consume_nonce(signer);
        self.state
            .transition_transaction(meta.record.id, TxStatus::Cancelled, Vec::new())?;
        Ok(self.state.transaction(meta.record.id)?.clone())
    }

    /// Composes request + approval atomically from one signed delegation.
    /// The signed record must not exist yet (id = counter + 1).
    pub fn request_and_approve(
        &mut self,
        meta: &MetaTransaction,
        target: &mut dyn TargetInvoker,
    ) -> Result<TxRecord, EngineError> {
        self.require_initialized()?;
        self.state.require_action_permission(
            self.ctx.caller,
            meta.params.handler,
            TxAction::ExecuteMetaRequestAndApprove,
        )?;
        let signer = self.state.verify_meta_tx(
            meta,
            MetaTxKind::New,
            TxAction::SignMetaRequestAndApprove,
            self.ctx.now,
        )?;

        self.state.consume_nonce(signer);
        let id = self.state.create_transaction(
            meta.record.params.clone(),
            meta.record.payment.clone(),
            self.ctx.now,
        )?;
        self.execute_transaction(id, target)?;
        Ok(self.state.transaction(id)?.clone())
    }

    // =========================================================================
    // PAYMENT
    // =========================================================================

    /// Attaches or replaces the payment on a pending record.
    pub fn update_payment(
        &mut self,
        tx_id: u64,
        payment: PaymentDetails,
    ) -> Result<TxRecord, EngineError> {
        self.require_initialized()?;
        let record = self.state.pending_transaction(tx_id)?;
        let handler = record.params.handler;

        self.state
            .require_action_permission(self.ctx.caller, handler, TxAction::UpdatePayment)?;
        self.state.set_transaction_payment(tx_id, payment)?;
        Ok(self.state.transaction(tx_id)?.clone())
    }

    // =========================================================================
    // EXECUTION
    // =========================================================================

    /// Invokes the record's target and classifies the outcome.
    ///
    /// The status leaves PENDING *before* the external call, so any
    /// reentrant approve/cancel for the same record fails the lifecycle
    /// status check. A failing target is recorded as FAILED with the reason
    /// as result bytes; an attached payment runs only on COMPLETED and its
    /// failure aborts the whole call.
    fn execute_transaction(
        &mut self,
        tx_id: u64,
        target: &mut dyn TargetInvoker,
    ) -> Result<(), EngineError> {
        let record = self.state.pending_transaction(tx_id)?;
        let call = TargetCall {
            target: record.params.target,
            selector: record.params.handler,
            value: record.params.value,
            // Zero budget means "all remaining".
            budget: if record.params.budget == 0 {
                u64::MAX
            } else {
                record.params.budget
            },
            data: if record.params.handler.is_zero() {
                Vec::new()
            } else {
                record.params.params.clone()
            },
        };
        let payment = record.payment.clone();

        // Provisionally COMPLETED; downgraded to FAILED below if the target
        // fails. Either way the record is out of PENDING before the call.
        self.state
            .transition_transaction(tx_id, TxStatus::Completed, Vec::new())?;

        let outcome = target.invoke(call, self);

        let completed = match outcome {
            Ok(result) => {
                self.set_result(tx_id, TxStatus::Completed, result);
                true
            }
            Err(reason) => {
                debug!(tx_id, reason = %reason, "target invocation failed");
                self.set_result(tx_id, TxStatus::Failed, reason.into_bytes());
                false
            }
        };

        if completed && payment.is_attached() {
            self.execute_attached_payment(&payment)?;
        }
        Ok(())
    }

    fn set_result(&mut self, tx_id: u64, status: TxStatus, result: Vec<u8>) {
        if let Some(record) = self.state.txs.get_mut(&tx_id) {
            record.status = status;
            record.result = result;
        }
    }

    /// Queues an attached payment from the secured account.
    ///
    /// Each leg is checked against the journal-adjusted balance — earlier
    /// queued payments in the same call count as spent — and a shortfall
    /// aborts. Nothing moves on the real ledger until the call commits.
    fn execute_attached_payment(&mut self, payment: &PaymentDetails) -> Result<(), EngineError> {
        let source = self.state.self_address;

        if payment.native_amount > 0 {
            self.ledger
                .queue_native(source, payment.recipient, payment.native_amount)?;
        }
        if !payment.token.is_zero() && payment.token_amount > 0 {
            self.ledger.queue_token(
                payment.token,
                source,
                payment.recipient,
                payment.token_amount,
            )?;
        }
        Ok(())
    }
}

// =============================================================================
// LEDGER STAGE (payment journal)
// =============================================================================

enum QueuedTransfer {
    Native {
        from: Address,
        to: Address,
        amount: u128,
    },
    Token {
        token: Address,
        from: Address,
        to: Address,
        amount: u128,
    },
}

/// Journal over the host ledger for the duration of one entry call.
///
/// Balance reads fold in every queued transfer, transfers are queued rather
/// than applied, and [`LedgerStage::commit`] replays the queue against the
/// real ledger. Dropping the stage discards the queue.
struct LedgerStage<'a> {
    inner: &'a mut dyn PaymentLedger,
    native_in: BTreeMap<Address, u128>,
    native_out: BTreeMap<Address, u128>,
    token_in: BTreeMap<(Address, Address), u128>,
    token_out: BTreeMap<(Address, Address), u128>,
    queued: Vec<QueuedTransfer>,
}

impl<'a> LedgerStage<'a> {
    fn new(inner: &'a mut dyn PaymentLedger) -> Self {
        Self {
            inner,
            native_in: BTreeMap::new(),
            native_out: BTreeMap::new(),
            token_in: BTreeMap::new(),
            token_out: BTreeMap::new(),
            queued: Vec::new(),
        }
    }

    fn effective_native(&self, account: Address) -> u128 {
        let credited = self.native_in.get(&account).copied().unwrap_or(0);
        let debited = self.native_out.get(&account).copied().unwrap_or(0);
        self.inner
            .native_balance(account)
            .saturating_add(credited)
            .saturating_sub(debited)
    }

    fn effective_token(&self, token: Address, account: Address) -> u128 {
        let credited = self.token_in.get(&(token, account)).copied().unwrap_or(0);
        let debited = self.token_out.get(&(token, account)).copied().unwrap_or(0);
        self.inner
            .token_balance(token, account)
            .saturating_add(credited)
            .saturating_sub(debited)
    }

    fn queue_native(
        &mut self,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), EngineError> {
        let available = self.effective_native(from);
        if available < amount {
            return Err(EngineError::InsufficientBalance {
                required: amount,
                available,
            });
        }
        *self.native_out.entry(from).or_insert(0) += amount;
        *self.native_in.entry(to).or_insert(0) += amount;
        self.queued.push(QueuedTransfer::Native { from, to, amount });
        Ok(())
    }

    fn queue_token(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), EngineError> {
        let available = self.effective_token(token, from);
        if available < amount {
            return Err(EngineError::InsufficientBalance {
                required: amount,
                available,
            });
        }
        *self.token_out.entry((token, from)).or_insert(0) += amount;
        *self.token_in.entry((token, to)).or_insert(0) += amount;
        self.queued.push(QueuedTransfer::Token {
            token,
            from,
            to,
            amount,
        });
        Ok(())
    }

    fn commit(self) -> Result<(), String> {
        for transfer in self.queued {
            match transfer {
                QueuedTransfer::Native { from, to, amount } => {
                    self.inner.transfer_native(from, to, amount)?;
                }
                QueuedTransfer::Token {
                    token,
                    from,
                    to,
                    amount,
                } => {
                    self.inner.transfer_token(token, from, to, amount)?;
                }
            }
        }
        Ok(())
    }
}
