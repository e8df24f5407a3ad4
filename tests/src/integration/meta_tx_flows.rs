//! # Meta-Transaction Path Flows
//!
//! A signer authorizes off-line, a relayer presents the signature, and the
//! engine enforces domain binding, deadlines, and strict nonces.

#[cfg(test)]
mod tests {
    use crate::support::*;
    use blox_engine::prelude::*;

    /// Half of the secp256k1 curve order; any s at or above it is malleable.
    const HALF_ORDER: [u8; 32] = [
        0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
        0xFF, 0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D, 0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B,
        0x20, 0xA0,
    ];

    fn service_with_signer() -> (
        EngineService<InMemoryLedger, RecordingForwarder>,
        k256::ecdsa::SigningKey,
        Address,
    ) {
        let mut service = new_service();
        let (key, signer) = generate_signer();
        service.assign_wallet(role_id("signers"), signer).unwrap();
        (service, key, signer)
    }

    #[test]
    fn test_meta_approval_bypasses_timelock_and_burns_nonce() {
        let (mut service, key, signer) = service_with_signer();
        service
            .request_transaction(
                ctx(OPERATOR, 0),
                tx_params(OPERATOR),
                PaymentDetails::default(),
            )
            .unwrap();

        let mut meta = service
            .meta_tx_for_existing(1, meta_params(signer, TxAction::SignMetaApprove, 10_000))
            .unwrap();
        sign_meta(&mut meta, &key);

        assert_eq!(service.state().nonce_of(signer), 0);
        // Well before the 3600s release time.
        let record = service
            .approve_with_meta_tx(ctx(RELAYER, 100), meta.clone(), &mut EchoTarget::new())
            .unwrap();
        assert_eq!(record.status, TxStatus::Completed);
        assert_eq!(service.state().nonce_of(signer), 1);

        // Replaying the same delegation fails on the nonce before anything else
        // can go wrong.
        let err = service
            .approve_with_meta_tx(ctx(RELAYER, 101), meta, &mut EchoTarget::new())
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::TransactionNotPending { .. } | EngineError::NonceMismatch { .. }
        ));
    }

    #[test]
    fn test_request_and_approve_composes_atomically() {
        let (mut service, key, signer) = service_with_signer();

        let mut meta = service
            .meta_tx_for_new(
                tx_params(OPERATOR),
                meta_params(signer, TxAction::SignMetaRequestAndApprove, 10_000),
            )
            .unwrap();
        assert_eq!(meta.record.id, 1);
        sign_meta(&mut meta, &key);

        let record = service
            .request_and_approve(ctx(RELAYER, 50), meta.clone(), &mut EchoTarget::new())
            .unwrap();
        assert_eq!(record.id, 1);
        assert_eq!(record.status, TxStatus::Completed);
        assert_eq!(service.state().nonce_of(signer), 1);
        assert!(service.state().pending_ids().is_empty());

        // The signature was bound to id 1; it cannot create id 2.
        let err = service
            .request_and_approve(ctx(RELAYER, 51), meta, &mut EchoTarget::new())
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::TransactionNotFound(_) | EngineError::NonceMismatch { .. }
        ));
    }

    #[test]
    fn test_meta_cancellation() {
        let (mut service, key, signer) = service_with_signer();
        service
            .request_transaction(
                ctx(OPERATOR, 0),
                tx_params(OPERATOR),
                PaymentDetails::default(),
            )
            .unwrap();

        let mut meta = service
            .meta_tx_for_existing(1, meta_params(signer, TxAction::SignMetaCancel, 10_000))
            .unwrap();
        sign_meta(&mut meta, &key);

        let record = service
            .cancel_with_meta_tx(ctx(RELAYER, 10), meta)
            .unwrap();
        assert_eq!(record.status, TxStatus::Cancelled);
        assert_eq!(service.state().nonce_of(signer), 1);
    }

    #[test]
    fn test_failed_target_still_burns_nonce() {
        let (mut service, key, signer) = service_with_signer();
        service
            .request_transaction(
                ctx(OPERATOR, 0),
                tx_params(OPERATOR),
                PaymentDetails::default(),
            )
            .unwrap();

        let mut meta = service
            .meta_tx_for_existing(1, meta_params(signer, TxAction::SignMetaApprove, 10_000))
            .unwrap();
        sign_meta(&mut meta, &key);

        let record = service
            .approve_with_meta_tx(
                ctx(RELAYER, 10),
                meta,
                &mut FailingTarget::new("downstream refused"),
            )
            .unwrap();
        assert_eq!(record.status, TxStatus::Failed);
        // The delegated work failing is an outcome, not a refund.
        assert_eq!(service.state().nonce_of(signer), 1);
    }

    #[test]
    fn test_expired_deadline_rejected() {
        let (mut service, key, signer) = service_with_signer();
        service
            .request_transaction(
                ctx(OPERATOR, 0),
                tx_params(OPERATOR),
                PaymentDetails::default(),
            )
            .unwrap();

        let mut meta = service
            .meta_tx_for_existing(1, meta_params(signer, TxAction::SignMetaApprove, 500))
            .unwrap();
        sign_meta(&mut meta, &key);

        assert_eq!(
            service
                .approve_with_meta_tx(ctx(RELAYER, 501), meta, &mut EchoTarget::new())
                .unwrap_err(),
            EngineError::DeadlineExpired {
                deadline: 500,
                now: 501
            }
        );
        assert_eq!(service.state().nonce_of(signer), 0);
    }

    #[test]
    fn test_action_must_match_entry_point() {
        let (mut service, key, signer) = service_with_signer();
        service
            .request_transaction(
                ctx(OPERATOR, 0),
                tx_params(OPERATOR),
                PaymentDetails::default(),
            )
            .unwrap();

        // Signed as a cancel, presented as an approval.
        let mut meta = service
            .meta_tx_for_existing(1, meta_params(signer, TxAction::SignMetaCancel, 10_000))
            .unwrap();
        sign_meta(&mut meta, &key);

        assert!(matches!(
            service
                .approve_with_meta_tx(ctx(RELAYER, 10), meta, &mut EchoTarget::new())
                .unwrap_err(),
            EngineError::DomainMismatch { .. }
        ));
    }

    #[test]
    fn test_tampered_payload_invalidates_signature() {
        let (mut service, key, signer) = service_with_signer();
        service
            .request_transaction(
                ctx(OPERATOR, 0),
                tx_params(OPERATOR),
                PaymentDetails::default(),
            )
            .unwrap();

        let mut meta = service
            .meta_tx_for_existing(1, meta_params(signer, TxAction::SignMetaApprove, 10_000))
            .unwrap();
        sign_meta(&mut meta, &key);
        // Inflate the signed-over value after signing.
        meta.record.params.value = 1_000_000;

        assert_eq!(
            service
                .approve_with_meta_tx(ctx(RELAYER, 10), meta, &mut EchoTarget::new())
                .unwrap_err(),
            EngineError::InvalidSignatureValue
        );
        assert_eq!(service.state().nonce_of(signer), 0);
    }

    #[test]
    fn test_unauthorized_signer_rejected() {
        let mut service = new_service();
        // Key holder never joined the signers role.
        let (key, signer) = generate_signer();
        service
            .request_transaction(
                ctx(OPERATOR, 0),
                tx_params(OPERATOR),
                PaymentDetails::default(),
            )
            .unwrap();

        let mut meta = service
            .meta_tx_for_existing(1, meta_params(signer, TxAction::SignMetaApprove, 10_000))
            .unwrap();
        sign_meta(&mut meta, &key);

        assert!(matches!(
            service
                .approve_with_meta_tx(ctx(RELAYER, 10), meta, &mut EchoTarget::new())
                .unwrap_err(),
            EngineError::SignerNotAuthorized { .. }
        ));
    }

    #[test]
    fn test_relayer_needs_execute_grant() {
        let (mut service, key, signer) = service_with_signer();
        service
            .request_transaction(
                ctx(OPERATOR, 0),
                tx_params(OPERATOR),
                PaymentDetails::default(),
            )
            .unwrap();

        let mut meta = service
            .meta_tx_for_existing(1, meta_params(signer, TxAction::SignMetaApprove, 10_000))
            .unwrap();
        sign_meta(&mut meta, &key);

        // OPERATOR holds the time-delay grants, not the execute-meta ones.
        assert!(matches!(
            service
                .approve_with_meta_tx(ctx(OPERATOR, 10), meta, &mut EchoTarget::new())
                .unwrap_err(),
            EngineError::NoPermission { .. }
        ));
    }

    #[test]
    fn test_high_s_signature_rejected() {
        let (mut service, key, signer) = service_with_signer();
        service
            .request_transaction(
                ctx(OPERATOR, 0),
                tx_params(OPERATOR),
                PaymentDetails::default(),
            )
            .unwrap();

        let mut meta = service
            .meta_tx_for_existing(1, meta_params(signer, TxAction::SignMetaApprove, 10_000))
            .unwrap();
        sign_meta(&mut meta, &key);
        meta.signature.s = HALF_ORDER;

        assert_eq!(
            service
                .approve_with_meta_tx(ctx(RELAYER, 10), meta, &mut EchoTarget::new())
                .unwrap_err(),
            EngineError::InvalidSignatureValue
        );
    }

    #[test]
    fn test_zero_resource_price_rejected() {
        let (mut service, key, signer) = service_with_signer();
        service
            .request_transaction(
                ctx(OPERATOR, 0),
                tx_params(OPERATOR),
                PaymentDetails::default(),
            )
            .unwrap();

        let mut params = meta_params(signer, TxAction::SignMetaApprove, 10_000);
        params.max_resource_price = 0;
        let mut meta = service.meta_tx_for_existing(1, params).unwrap();
        sign_meta(&mut meta, &key);

        assert_eq!(
            service
                .approve_with_meta_tx(ctx(RELAYER, 10), meta, &mut EchoTarget::new())
                .unwrap_err(),
            EngineError::InvalidResourcePrice
        );
    }
}
