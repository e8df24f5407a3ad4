//! # Core Domain Entities
//!
//! The engine's data model: transaction records and their parameters,
//! meta-transactions, payment details, permission grants, function schemas,
//! roles, and the root [`EngineState`] aggregate.
//!
//! Exactly one `EngineState` instance exists per secured account and it is
//! only ever mutated within a single external entry call.

use crate::domain::signing::EcdsaSignature;
use blox_types::{ActionSet, Address, Hash, Selector, TxStatus};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// CALL CONTEXT
// =============================================================================

/// Ambient facts about the current external entry call.
///
/// The host supplies `now` the way a ledger supplies a block timestamp; the
/// engine never reads a wall clock, so every time guard is deterministic.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CallContext {
    /// The authenticated caller of this entry point.
    pub caller: Address,
    /// Current time as a Unix timestamp in seconds.
    pub now: u64,
}

impl CallContext {
    /// Creates a new call context.
    #[must_use]
    pub const fn new(caller: Address, now: u64) -> Self {
        Self { caller, now }
    }
}

// =============================================================================
// TRANSACTIONS
// =============================================================================

/// Immutable parameters of a requested operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxParams {
    /// Principal on whose behalf the operation runs.
    pub requester: Address,
    /// Target to invoke. Must be non-zero.
    pub target: Address,
    /// Native value forwarded to the target.
    pub value: u128,
    /// Resource budget forwarded to the target. Zero means "all remaining".
    pub budget: u64,
    /// Coarse category this operation belongs to.
    pub operation_type: Hash,
    /// Handler identifier. `Selector::ZERO` means bare value transfer.
    pub handler: Selector,
    /// Raw parameter bytes passed through to the handler.
    pub params: Vec<u8>,
}

/// Optional payment released only after a successful target invocation.
///
/// A zero recipient means no payment is attached.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    /// Payment recipient. Zero address ⇒ no payment.
    pub recipient: Address,
    /// Native amount to release.
    pub native_amount: u128,
    /// Token contract for the token leg. Zero address ⇒ no token leg.
    pub token: Address,
    /// Token amount to release.
    pub token_amount: u128,
}

impl PaymentDetails {
    /// Returns true if a payment is attached.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        !self.recipient.is_zero()
    }
}

/// A transaction record. Created by a request, mutated only by approval or
/// cancellation, kept forever as history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    /// Unique id, assigned as counter + 1 at creation. Never reused.
    pub id: u64,
    /// Earliest time a delayed approval may execute. Fixed at creation.
    pub release_time: u64,
    /// Lifecycle status.
    pub status: TxStatus,
    /// Operation parameters.
    pub params: TxParams,
    /// Result bytes on COMPLETED, failure reason bytes on FAILED.
    pub result: Vec<u8>,
    /// Attached payment, if any.
    pub payment: PaymentDetails,
}

// =============================================================================
// META-TRANSACTIONS
// =============================================================================

/// Constraints under which a meta-transaction signature is valid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaTxParams {
    /// Network the signature is bound to.
    pub chain_id: u64,
    /// Signer nonce; must equal the signer's stored nonce exactly.
    pub nonce: u64,
    /// Engine instance the signature is bound to.
    pub handler_contract: Address,
    /// Handler the signed action applies to.
    pub handler: Selector,
    /// The action being authorized, as a raw bit index into the action table.
    pub action: blox_types::TxAction,
    /// Signature expiry as a Unix timestamp in seconds.
    pub deadline: u64,
    /// Upper bound on the resource price the signer accepts. Zero rejected.
    pub max_resource_price: u128,
    /// The declared signer; recovery must yield exactly this address.
    pub signer: Address,
}

/// An off-line-signed authorization for an operation, presented by a relayer.
///
/// Constructed off-line and transient — never stored by the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaTransaction {
    /// Snapshot of the transaction record being authorized. For
    /// request-and-approve, a record that does not exist yet (id = counter+1).
    pub record: TxRecord,
    /// Signature constraints.
    pub params: MetaTxParams,
    /// Structured message digest the signature covers.
    pub digest: Hash,
    /// ECDSA signature over the digest.
    pub signature: EcdsaSignature,
    /// Raw invocation bytes carried alongside the authorization.
    pub data: Vec<u8>,
}

// =============================================================================
// PERMISSIONS & SCHEMAS
// =============================================================================

/// A permission grant for one handler within a role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionPermission {
    /// Handler the grant applies to.
    pub handler: Selector,
    /// Actions granted. Must be a subset of the schema's supported actions.
    pub grants: ActionSet,
}

/// Registry entry declaring a handler's shape and supported actions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSchema {
    /// Human-readable schema name.
    pub name: String,
    /// Handler identifier (unique key).
    pub handler: Selector,
    /// Operation type this handler belongs to.
    pub operation_type: Hash,
    /// Operation name (e.g. "withdraw", "ownership transfer").
    pub operation_name: String,
    /// Actions this handler supports.
    pub supported_actions: ActionSet,
    /// Protected schemas cannot be removed.
    pub protected: bool,
}

/// A named set of principals sharing permission grants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role name.
    pub name: String,
    /// Role id, derived once as keccak256(name) at creation.
    pub id: Hash,
    /// Principals holding this role.
    pub members: BTreeSet<Address>,
    /// Per-handler permission grants.
    pub permissions: BTreeMap<Selector, ActionSet>,
    /// Maximum membership.
    pub max_members: usize,
    /// Protected roles cannot be removed.
    pub protected: bool,
}

// =============================================================================
// ENGINE STATE (root aggregate)
// =============================================================================

/// Root aggregate for one secured account.
///
/// Cloneable so the service layer can stage a whole entry call and commit
/// only on success.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineState {
    /// Set once by `initialize`.
    pub initialized: bool,
    /// Network id bound into the signature domain.
    pub chain_id: u64,
    /// This engine instance's own address, bound into the signature domain.
    pub self_address: Address,
    /// Monotonic transaction counter. Next id is `tx_counter + 1`.
    pub tx_counter: u64,
    /// Mandatory delay between request and delayed approval, in seconds.
    pub timelock: u64,
    /// All transaction records, in-flight and historical.
    pub txs: BTreeMap<u64, TxRecord>,
    /// Index of PENDING transaction ids.
    pub pending: BTreeSet<u64>,
    /// Roles keyed by role id.
    pub roles: BTreeMap<Hash, Role>,
    /// Function schemas keyed by handler.
    pub schemas: BTreeMap<Selector, FunctionSchema>,
    /// Known operation types with schema reference counts.
    pub operation_types: BTreeMap<Hash, usize>,
    /// Per-signer meta-transaction nonces.
    pub nonces: BTreeMap<Address, u64>,
    /// Optional event forwarder. Zero address ⇒ none registered.
    pub forwarder: Address,
}

impl EngineState {
    /// Per-signer nonce; zero for signers never seen.
    #[must_use]
    pub fn nonce_of(&self, signer: Address) -> u64 {
        self.nonces.get(&signer).copied().unwrap_or(0)
    }

    /// Ids of transactions currently awaiting approval or cancellation.
    #[must_use]
    pub fn pending_ids(&self) -> Vec<u64> {
        self.pending.iter().copied().collect()
    }

    /// The known operation types (those referenced by at least one schema).
    #[must_use]
    pub fn known_operation_types(&self) -> Vec<Hash> {
        self.operation_types.keys().copied().collect()
    }
}
