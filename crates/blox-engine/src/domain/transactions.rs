//! # Transaction Store
//!
//! The map of in-flight and historical operations plus the pending-id index.
//! Records are created by requests, mutated only through
//! [`EngineState::transition_transaction`], and never deleted.
//!
//! Two invariants live here: tx ids are strictly increasing from 1 and never
//! reused, and the pending set always equals the set of records whose status
//! is PENDING.

use crate::domain::entities::{EngineState, PaymentDetails, TxParams, TxRecord};
use crate::domain::errors::EngineError;
use blox_types::TxStatus;

impl EngineState {
    /// The id the next created transaction will receive.
    #[must_use]
    pub fn next_tx_id(&self) -> u64 {
        self.tx_counter + 1
    }

    /// Creates a PENDING record from validated parameters.
    ///
    /// The target must be non-zero and a non-zero handler must be registered
    /// in the schema registry. Release time is fixed forever as
    /// `now + timelock`, saturating at the end of time rather than wrapping.
    pub fn create_transaction(
        &mut self,
        params: TxParams,
        payment: PaymentDetails,
        now: u64,
    ) -> Result<u64, EngineError> {
        if params.target.is_zero() {
            return Err(EngineError::InvalidAddress { context: "target" });
        }
        if !params.handler.is_zero() {
            self.schema(params.handler)?;
        }

        let id = self.next_tx_id();
        self.tx_counter = id;
        self.txs.insert(
            id,
            TxRecord {
                id,
                release_time: now.saturating_add(self.timelock),
                status: TxStatus::Pending,
                params,
                result: Vec::new(),
                payment,
            },
        );
        self.pending.insert(id);
        Ok(id)
    }

    /// Looks up a record, failing with `TransactionNotFound`.
    pub fn transaction(&self, id: u64) -> Result<&TxRecord, EngineError> {
        self.txs.get(&id).ok_or(EngineError::TransactionNotFound(id))
    }

    /// Looks up a record and requires it to be PENDING.
    pub fn pending_transaction(&self, id: u64) -> Result<&TxRecord, EngineError> {
        let record = self.transaction(id)?;
        if !record.status.is_pending() {
            return Err(EngineError::TransactionNotPending {
                id,
                status: record.status,
            });
        }
        Ok(record)
    }

    /// Moves a record out of PENDING and keeps the pending index consistent.
    ///
    /// The single mutation point for statuses: every transition is validated
    /// against the lifecycle state machine, so a reentrant or repeated
    /// transition on a non-PENDING record fails here.
    pub fn transition_transaction(
        &mut self,
        id: u64,
        next: TxStatus,
        result: Vec<u8>,
    ) -> Result<(), EngineError> {
        let record = self
            .txs
            .get_mut(&id)
            .ok_or(EngineError::TransactionNotFound(id))?;
        if !record.status.can_transition_to(next) {
            return Err(EngineError::TransactionNotPending {
                id,
                status: record.status,
            });
        }
        record.status = next;
        record.result = result;
        self.pending.remove(&id);
        Ok(())
    }

    /// Attaches or replaces the payment on a PENDING record.
    pub fn set_transaction_payment(
        &mut self,
        id: u64,
        payment: PaymentDetails,
    ) -> Result<(), EngineError> {
        if !payment.is_attached() {
            return Err(EngineError::InvalidAddress {
                context: "payment recipient",
            });
        }
        self.pending_transaction(id)?;
        // Lookup above guarantees presence.
        if let Some(record) = self.txs.get_mut(&id) {
            record.payment = payment;
        }
        Ok(())
    }
}
