//! # Error Taxonomy
//!
//! Every failure an external entry call can abort with. All of these are
//! abort-and-discard: the staged state is dropped and `EngineState` is left
//! exactly as it was before the call. Target invocation failure is the one
//! deliberate exception — it is recorded as `TxStatus::Failed`, not raised.

use blox_types::{Address, Hash, Selector, TxAction, TxStatus};
use thiserror::Error;

/// Errors raised by engine entry points.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    // ----- setup -----
    /// `initialize` called twice.
    #[error("engine already initialized")]
    AlreadyInitialized,

    /// Entry call before `initialize`.
    #[error("engine not initialized")]
    NotInitialized,

    /// Timelock outside the allowed bounds.
    #[error("invalid timelock period: {period}s not in [{min}s, {max}s]")]
    InvalidTimelockPeriod {
        /// Requested period.
        period: u64,
        /// Minimum allowed.
        min: u64,
        /// Maximum allowed.
        max: u64,
    },

    /// A required address was zero.
    #[error("invalid address: {context}")]
    InvalidAddress {
        /// Which address failed validation.
        context: &'static str,
    },

    // ----- authorization -----
    /// Caller lacks the required action for the handler.
    #[error("no permission: {principal} lacks {action} for handler {handler}")]
    NoPermission {
        /// The principal that was checked.
        principal: Address,
        /// The action required.
        action: TxAction,
        /// The handler the action applies to.
        handler: Selector,
    },

    /// Recovered signer lacks the signed-for action.
    #[error("signer {signer} not authorized for {action} on handler {handler}")]
    SignerNotAuthorized {
        /// The recovered signer.
        signer: Address,
        /// The action the signature claims.
        action: TxAction,
        /// The handler the action applies to.
        handler: Selector,
    },

    /// Grant holds both a sign-meta bit and its paired execute-meta bit.
    #[error("conflicting meta-tx permissions: {sign} and {execute} in one grant")]
    ConflictingMetaTxPermissions {
        /// The sign half of the pair.
        sign: TxAction,
        /// The execute half of the pair.
        execute: TxAction,
    },

    /// Grant requests an action the schema does not support.
    #[error("action not supported by handler {handler}")]
    ActionNotSupported {
        /// The handler whose schema was consulted.
        handler: Selector,
    },

    // ----- registry -----
    /// Role name already registered.
    #[error("role already exists: {0:?}")]
    RoleAlreadyExists(Hash),

    /// Role id unknown.
    #[error("role not found: {0:?}")]
    RoleNotFound(Hash),

    /// Attempted to remove a protected role or schema.
    #[error("cannot remove protected {kind}")]
    CannotRemoveProtected {
        /// "role" or "schema".
        kind: &'static str,
    },

    /// Role is at its membership limit.
    #[error("wallet limit exceeded: role holds {current} of {max} members")]
    WalletLimitExceeded {
        /// Current membership.
        current: usize,
        /// Maximum membership.
        max: usize,
    },

    /// Wallet already assigned to the role.
    #[error("wallet {0} already assigned to role")]
    WalletAlreadyAssigned(Address),

    /// Wallet is not a member of the role.
    #[error("wallet {0} not assigned to role")]
    WalletNotAssigned(Address),

    /// Revoking would leave the role empty.
    #[error("cannot revoke the last wallet of a role")]
    LastWalletProtected,

    /// Handler already has a schema.
    #[error("function already exists: {0}")]
    FunctionAlreadyExists(Selector),

    /// Handler has no schema.
    #[error("function not found: {0}")]
    FunctionNotFound(Selector),

    /// Role already holds a grant for the handler.
    #[error("function permission already exists for handler {0}")]
    FunctionPermissionExists(Selector),

    /// Schema removal blocked while a role still grants on the handler.
    #[error("function {handler} still granted by role {role:?}")]
    FunctionInUse {
        /// The handler whose schema was to be removed.
        handler: Selector,
        /// A role still granting on it.
        role: Hash,
    },

    // ----- lifecycle -----
    /// Unknown transaction id.
    #[error("transaction not found: {0}")]
    TransactionNotFound(u64),

    /// A request exists while an earlier one is still pending. Raised by
    /// hosts enforcing a single-pending-request policy, never by the engine
    /// itself.
    #[error("request already pending: {0}")]
    RequestAlreadyPending(u64),

    /// Record is not in PENDING status.
    #[error("transaction {id} not pending: status {status}")]
    TransactionNotPending {
        /// The record id.
        id: u64,
        /// The status actually observed.
        status: TxStatus,
    },

    /// Approval attempted before the release time.
    #[error("before release time: release {release_time}, now {now}")]
    BeforeReleaseTime {
        /// The record's release time.
        release_time: u64,
        /// The time the call was made.
        now: u64,
    },

    // ----- signature -----
    /// Signature components malformed (zero/overflowing scalar, bad v).
    #[error("invalid signature format")]
    InvalidSignatureFormat,

    /// Signature rejected during canonicalization or recovery.
    #[error("invalid signature value")]
    InvalidSignatureValue,

    /// Recovered signer differs from the declared signer.
    #[error("recovered signer {recovered} does not match declared {declared}")]
    InvalidRecoveredSigner {
        /// The address recovered from the signature.
        recovered: Address,
        /// The signer declared in the meta-transaction.
        declared: Address,
    },

    /// Meta-tx nonce does not equal the signer's stored nonce.
    #[error("nonce mismatch: expected {expected}, got {actual}")]
    NonceMismatch {
        /// The signer's stored nonce.
        expected: u64,
        /// The nonce presented.
        actual: u64,
    },

    /// Meta-tx deadline has elapsed.
    #[error("deadline expired: deadline {deadline}, now {now}")]
    DeadlineExpired {
        /// The signed deadline.
        deadline: u64,
        /// The time the call was made.
        now: u64,
    },

    /// Meta-tx bound to a different chain or engine instance.
    #[error("domain mismatch: {context}")]
    DomainMismatch {
        /// Which binding failed.
        context: &'static str,
    },

    /// Max resource price failed the sanity check.
    #[error("invalid max resource price")]
    InvalidResourcePrice,

    // ----- payment -----
    /// Balance short of the configured payment amount.
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        /// Amount the payment requires.
        required: u128,
        /// Amount actually available.
        available: u128,
    },

    /// A payment transfer was refused by the ledger.
    #[error("payment transfer failed: {reason}")]
    PaymentTransferFailed {
        /// Ledger-supplied reason.
        reason: String,
    },
}
