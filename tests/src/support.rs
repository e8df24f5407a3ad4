//! Shared fixtures for the integration suite: a standard engine
//! configuration, off-line signing helpers, and misbehaving targets.

use blox_engine::prelude::*;
use blox_types::keccak256;
use k256::ecdsa::SigningKey;
use std::sync::Once;

/// Wallet holding the time-delay grants.
pub const OPERATOR: Address = Address::new([0x11; 20]);

/// Wallet holding the execute-meta grants.
pub const RELAYER: Address = Address::new([0x12; 20]);

/// The engine instance's own address.
pub const SELF_ADDRESS: Address = Address::new([0xEE; 20]);

/// The contract the secured operations run against.
pub const TARGET: Address = Address::new([0x22; 20]);

static TRACING: Once = Once::new();

/// Installs a test subscriber once per process.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "warn".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

/// The handler selector every fixture operates on.
pub fn handler() -> Selector {
    Selector::from_name("transfer_funds")
}

/// Role id derived the same way the engine derives it.
pub fn role_id(name: &str) -> Hash {
    keccak256(name.as_bytes())
}

/// Standard configuration: one schema supporting every action, an operator
/// role on the time-delay path, a signer role (members added per test, since
/// keys are generated at runtime) and a relayer role on the meta path.
pub fn standard_config() -> EngineConfig {
    let all_actions = vec![
        TxAction::TimeDelayRequest,
        TxAction::TimeDelayApprove,
        TxAction::TimeDelayCancel,
        TxAction::SignMetaRequestAndApprove,
        TxAction::SignMetaApprove,
        TxAction::SignMetaCancel,
        TxAction::ExecuteMetaRequestAndApprove,
        TxAction::ExecuteMetaApprove,
        TxAction::ExecuteMetaCancel,
        TxAction::UpdatePayment,
    ];
    EngineConfig {
        chain_id: 1,
        self_address: SELF_ADDRESS,
        timelock: 3600,
        forwarder: None,
        schemas: vec![SchemaConfig {
            name: "transfer_funds".into(),
            operation_name: "transfer".into(),
            supported_actions: all_actions,
            protected: false,
        }],
        roles: vec![
            RoleConfig {
                name: "operators".into(),
                max_members: 3,
                protected: true,
                members: vec![OPERATOR],
                grants: vec![RoleGrantConfig {
                    function: "transfer_funds".into(),
                    actions: vec![
                        TxAction::TimeDelayRequest,
                        TxAction::TimeDelayApprove,
                        TxAction::TimeDelayCancel,
                        TxAction::UpdatePayment,
                    ],
                }],
            },
            RoleConfig {
                name: "signers".into(),
                max_members: 3,
                protected: false,
                members: vec![],
                grants: vec![RoleGrantConfig {
                    function: "transfer_funds".into(),
                    actions: vec![
                        TxAction::SignMetaRequestAndApprove,
                        TxAction::SignMetaApprove,
                        TxAction::SignMetaCancel,
                    ],
                }],
            },
            RoleConfig {
                name: "relayers".into(),
                max_members: 3,
                protected: false,
                members: vec![RELAYER],
                grants: vec![RoleGrantConfig {
                    function: "transfer_funds".into(),
                    actions: vec![
                        TxAction::ExecuteMetaRequestAndApprove,
                        TxAction::ExecuteMetaApprove,
                        TxAction::ExecuteMetaCancel,
                    ],
                }],
            },
        ],
    }
}

/// An initialized service over an in-memory ledger.
pub fn new_service() -> EngineService<InMemoryLedger, RecordingForwarder> {
    init_tracing();
    let mut service = EngineService::new(InMemoryLedger::new());
    service
        .initialize(&standard_config())
        .expect("fixture config must initialize");
    service
}

/// Standard transaction parameters against the fixture handler.
pub fn tx_params(requester: Address) -> TxParams {
    TxParams {
        requester,
        target: TARGET,
        value: 0,
        budget: 0,
        operation_type: keccak256(b"transfer"),
        handler: handler(),
        params: vec![0xDE, 0xAD, 0xBE, 0xEF],
    }
}

/// A call context.
pub fn ctx(caller: Address, now: u64) -> CallContext {
    CallContext { caller, now }
}

// =============================================================================
// OFF-LINE SIGNING
// =============================================================================

/// Generates a keypair and the address it controls.
pub fn generate_signer() -> (SigningKey, Address) {
    let key = SigningKey::random(&mut rand::thread_rng());
    let address = address_from_signing_key(&key);
    (key, address)
}

/// Account address of a signing key: last 20 bytes of the Keccak-256 hash of
/// the uncompressed public key without its 0x04 prefix.
pub fn address_from_signing_key(key: &SigningKey) -> Address {
    let encoded = key.verifying_key().to_encoded_point(false);
    let digest = keccak256(&encoded.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&digest.as_bytes()[12..]);
    Address::new(address)
}

/// Signs a digest, normalizing to the canonical low-s form.
pub fn sign_digest(digest: &Hash, key: &SigningKey) -> EcdsaSignature {
    let (sig, recid) = key
        .sign_prehash_recoverable(digest.as_bytes())
        .expect("signing failed");
    let flipped = sig.normalize_s().is_some();
    let normalized = sig.normalize_s().unwrap_or(sig);
    let bytes = normalized.to_bytes();
    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&bytes[..32]);
    s.copy_from_slice(&bytes[32..]);
    let parity = (recid.to_byte() ^ u8::from(flipped)) & 1;
    EcdsaSignature {
        r,
        s,
        v: 27 + parity,
    }
}

/// Fills in the signature of an unsigned meta-transaction.
pub fn sign_meta(meta: &mut MetaTransaction, key: &SigningKey) {
    meta.signature = sign_digest(&meta.digest, key);
}

/// Meta-transaction constraints for the fixture handler. The builders fill
/// in chain id, handler binding, and nonce.
pub fn meta_params(signer: Address, action: TxAction, deadline: u64) -> MetaTxParams {
    MetaTxParams {
        chain_id: 0,
        nonce: 0,
        handler_contract: Address::ZERO,
        handler: Selector::ZERO,
        action,
        deadline,
        max_resource_price: 1,
        signer,
    }
}

// =============================================================================
// MISBEHAVING TARGETS
// =============================================================================

/// A target that tries to cancel a record mid-invocation and records what
/// the engine told it.
pub struct ReenteringCancelTarget {
    /// Record to attack.
    pub tx_id: u64,
    /// Outcome of the reentrant cancellation attempt.
    pub observed: Option<Result<(), EngineError>>,
}

impl ReenteringCancelTarget {
    /// Targets `tx_id` for a reentrant cancel.
    pub fn new(tx_id: u64) -> Self {
        Self {
            tx_id,
            observed: None,
        }
    }
}

impl TargetInvoker for ReenteringCancelTarget {
    fn invoke(
        &mut self,
        _call: TargetCall,
        engine: &mut EngineRuntime<'_>,
    ) -> Result<Vec<u8>, String> {
        self.observed = Some(engine.cancellation(self.tx_id).map(|_| ()));
        Ok(Vec::new())
    }
}

/// A target that tries to approve a record mid-invocation and records what
/// the engine told it. Pointed at its own record, it exercises the
/// leave-PENDING-before-invoke guard.
pub struct ReenteringApproveTarget {
    /// Record to attack.
    pub tx_id: u64,
    /// Outcome of the reentrant approval attempt.
    pub observed: Option<Result<TxStatus, EngineError>>,
}

impl ReenteringApproveTarget {
    /// Targets `tx_id` for a reentrant approve.
    pub fn new(tx_id: u64) -> Self {
        Self {
            tx_id,
            observed: None,
        }
    }
}

impl TargetInvoker for ReenteringApproveTarget {
    fn invoke(
        &mut self,
        _call: TargetCall,
        engine: &mut EngineRuntime<'_>,
    ) -> Result<Vec<u8>, String> {
        let mut inner = EchoTarget::new();
        self.observed = Some(
            engine
                .delayed_approval(self.tx_id, &mut inner)
                .map(|record| record.status),
        );
        Ok(Vec::new())
    }
}

/// A target that approves a *different* pending record mid-invocation.
pub struct NestedApprovalTarget {
    /// The other record to approve.
    pub tx_id: u64,
    /// Outcome of the nested approval.
    pub observed: Option<Result<TxStatus, EngineError>>,
}

impl NestedApprovalTarget {
    /// Approves `tx_id` from inside the outer invocation.
    pub fn new(tx_id: u64) -> Self {
        Self {
            tx_id,
            observed: None,
        }
    }
}

impl TargetInvoker for NestedApprovalTarget {
    fn invoke(
        &mut self,
        _call: TargetCall,
        engine: &mut EngineRuntime<'_>,
    ) -> Result<Vec<u8>, String> {
        let mut inner = EchoTarget::new();
        self.observed = Some(
            engine
                .delayed_approval(self.tx_id, &mut inner)
                .map(|record| record.status),
        );
        Ok(Vec::new())
    }
}
