//! # Payment Release & Reentrancy Flows
//!
//! Attached payments settle only with the operation, the whole call reverts
//! on any payment failure, and reentrant targets bounce off the lifecycle
//! state machine.

#[cfg(test)]
mod tests {
    use crate::support::*;
    use blox_engine::prelude::*;

    const RECIPIENT: Address = Address::new([0x33; 20]);
    const TOKEN: Address = Address::new([0x77; 20]);

    fn native_payment(amount: u128) -> PaymentDetails {
        PaymentDetails {
            recipient: RECIPIENT,
            native_amount: amount,
            token: Address::ZERO,
            token_amount: 0,
        }
    }

    fn mixed_payment(native: u128, token: u128) -> PaymentDetails {
        PaymentDetails {
            recipient: RECIPIENT,
            native_amount: native,
            token: TOKEN,
            token_amount: token,
        }
    }

    #[test]
    fn test_mixed_payment_settles_with_the_operation() {
        let mut service = new_service();
        service.ledger_mut().credit_native(SELF_ADDRESS, 10);
        service
            .ledger_mut()
            .credit_token(TOKEN, SELF_ADDRESS, 20);
        service
            .request_transaction(ctx(OPERATOR, 0), tx_params(OPERATOR), mixed_payment(4, 15))
            .unwrap();

        let record = service
            .approve_transaction(ctx(OPERATOR, 3_600), 1, &mut EchoTarget::new())
            .unwrap();
        assert_eq!(record.status, TxStatus::Completed);
        assert_eq!(service.ledger().native_balance(RECIPIENT), 4);
        assert_eq!(service.ledger().token_balance(TOKEN, RECIPIENT), 15);
        assert_eq!(service.ledger().native_balance(SELF_ADDRESS), 6);
        assert_eq!(service.ledger().token_balance(TOKEN, SELF_ADDRESS), 5);
    }

    #[test]
    fn test_no_payment_on_failed_operation() {
        let mut service = new_service();
        service.ledger_mut().credit_native(SELF_ADDRESS, 10);
        service
            .request_transaction(ctx(OPERATOR, 0), tx_params(OPERATOR), native_payment(4))
            .unwrap();

        let record = service
            .approve_transaction(ctx(OPERATOR, 3_600), 1, &mut FailingTarget::new("reverted"))
            .unwrap();
        assert_eq!(record.status, TxStatus::Failed);
        // The operation failing keeps every balance where it was.
        assert_eq!(service.ledger().native_balance(SELF_ADDRESS), 10);
        assert_eq!(service.ledger().native_balance(RECIPIENT), 0);
    }

    #[test]
    fn test_token_shortfall_reverts_native_leg_too() {
        let mut service = new_service();
        service.ledger_mut().credit_native(SELF_ADDRESS, 10);
        service.ledger_mut().credit_token(TOKEN, SELF_ADDRESS, 2);
        service
            .request_transaction(ctx(OPERATOR, 0), tx_params(OPERATOR), mixed_payment(4, 15))
            .unwrap();

        let err = service
            .approve_transaction(ctx(OPERATOR, 3_600), 1, &mut EchoTarget::new())
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::InsufficientBalance {
                required: 15,
                available: 2
            }
        );
        // Whole-call revert: still pending, nothing moved on either leg.
        assert_eq!(
            service.state().transaction(1).unwrap().status,
            TxStatus::Pending
        );
        assert_eq!(service.state().pending_ids(), vec![1]);
        assert_eq!(service.ledger().native_balance(SELF_ADDRESS), 10);
        assert_eq!(service.ledger().native_balance(RECIPIENT), 0);
    }

    #[test]
    fn test_update_payment_replaces_before_release() {
        let mut service = new_service();
        service.ledger_mut().credit_native(SELF_ADDRESS, 10);
        service
            .request_transaction(ctx(OPERATOR, 0), tx_params(OPERATOR), native_payment(2))
            .unwrap();
        service
            .update_payment(ctx(OPERATOR, 100), 1, native_payment(7))
            .unwrap();

        service
            .approve_transaction(ctx(OPERATOR, 3_600), 1, &mut EchoTarget::new())
            .unwrap();
        assert_eq!(service.ledger().native_balance(RECIPIENT), 7);
    }

    #[test]
    fn test_reentrant_cancel_bounces_off_lifecycle() {
        let mut service = new_service();
        service
            .request_transaction(
                ctx(OPERATOR, 0),
                tx_params(OPERATOR),
                PaymentDetails::default(),
            )
            .unwrap();

        let mut target = ReenteringCancelTarget::new(1);
        let record = service
            .approve_transaction(ctx(OPERATOR, 3_600), 1, &mut target)
            .unwrap();

        // The record had already left PENDING when the target ran.
        assert_eq!(
            target.observed,
            Some(Err(EngineError::TransactionNotPending {
                id: 1,
                status: TxStatus::Completed
            }))
        );
        assert_eq!(record.status, TxStatus::Completed);
    }

    #[test]
    fn test_reentrant_approve_bounces_off_lifecycle() {
        let mut service = new_service();
        service
            .request_transaction(
                ctx(OPERATOR, 0),
                tx_params(OPERATOR),
                PaymentDetails::default(),
            )
            .unwrap();

        let mut target = ReenteringApproveTarget::new(1);
        let record = service
            .approve_transaction(ctx(OPERATOR, 3_600), 1, &mut target)
            .unwrap();

        // Same as the cancel case: the record had already left PENDING.
        assert_eq!(
            target.observed,
            Some(Err(EngineError::TransactionNotPending {
                id: 1,
                status: TxStatus::Completed
            }))
        );
        assert_eq!(record.status, TxStatus::Completed);
    }

    #[test]
    fn test_nested_approval_of_other_record_allowed() {
        let mut service = new_service();
        for _ in 0..2 {
            service
                .request_transaction(
                    ctx(OPERATOR, 0),
                    tx_params(OPERATOR),
                    PaymentDetails::default(),
                )
                .unwrap();
        }

        // Approving record 1 triggers a nested approval of record 2.
        let mut target = NestedApprovalTarget::new(2);
        service
            .approve_transaction(ctx(OPERATOR, 3_600), 1, &mut target)
            .unwrap();

        assert_eq!(target.observed, Some(Ok(TxStatus::Completed)));
        assert_eq!(
            service.state().transaction(2).unwrap().status,
            TxStatus::Completed
        );
        assert!(service.state().pending_ids().is_empty());
    }

    #[test]
    fn test_nested_payment_rolls_back_with_outer_abort() {
        let mut service = new_service();
        service.ledger_mut().credit_native(SELF_ADDRESS, 5);

        let other_recipient = Address::new([0x34; 20]);
        service
            .request_transaction(ctx(OPERATOR, 0), tx_params(OPERATOR), native_payment(5))
            .unwrap();
        service
            .request_transaction(
                ctx(OPERATOR, 0),
                tx_params(OPERATOR),
                PaymentDetails {
                    recipient: other_recipient,
                    native_amount: 5,
                    token: Address::ZERO,
                    token_amount: 0,
                },
            )
            .unwrap();

        // Approving record 1 triggers a nested approval of record 2, whose
        // payment spends the whole balance before record 1's own payment is
        // checked.
        let mut target = NestedApprovalTarget::new(2);
        let err = service
            .approve_transaction(ctx(OPERATOR, 3_600), 1, &mut target)
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::InsufficientBalance {
                required: 5,
                available: 0
            }
        );

        // The nested approval rolled back with the rest of the call: both
        // records are still pending and no payment reached the ledger.
        assert_eq!(service.state().pending_ids(), vec![1, 2]);
        assert_eq!(
            service.state().transaction(2).unwrap().status,
            TxStatus::Pending
        );
        assert_eq!(service.ledger().native_balance(SELF_ADDRESS), 5);
        assert_eq!(service.ledger().native_balance(RECIPIENT), 0);
        assert_eq!(service.ledger().native_balance(other_recipient), 0);
    }

    #[test]
    fn test_forwarder_failure_never_affects_outcome() {
        init_tracing();
        let mut service: EngineService<InMemoryLedger, DroppingForwarder> =
            EngineService::new(InMemoryLedger::new());
        service.initialize(&standard_config()).unwrap();
        service
            .set_event_forwarder(Address::new([0x44; 20]), DroppingForwarder::default())
            .unwrap();

        let record = service
            .request_transaction(
                ctx(OPERATOR, 0),
                tx_params(OPERATOR),
                PaymentDetails::default(),
            )
            .unwrap();
        assert_eq!(record.status, TxStatus::Pending);
        assert_eq!(service.forwarder_sink().unwrap().refused, 1);
    }
}
