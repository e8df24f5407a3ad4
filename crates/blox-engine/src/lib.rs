//! # blox-engine — Delegated Authorization & Timelocked Execution
//!
//! A reusable engine for "secured accounts": authorized principals can
//! request operations that execute only after a mandatory delay, execute the
//! same class of operation immediately via an off-line-signed delegation
//! (meta-transaction) presented by a relayer, and attach a payment that is
//! released only when the underlying operation succeeds.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | pending set == records with PENDING status | `domain/transactions.rs` |
//! | tx ids strictly increasing from 1, never reused | `domain/transactions.rs` |
//! | grant bitmap ⊆ schema supported bitmap | `domain/roles.rs::add_function_to_role` |
//! | operation type known iff ≥ 1 schema references it | `domain/schemas.rs` |
//! | a role never drops below one member via revoke | `domain/roles.rs::revoke_wallet` |
//! | protected role/schema undeletable | `domain/roles.rs`, `domain/schemas.rs` |
//! | no grant holds a sign-meta bit with its paired execute-meta bit | `domain/roles.rs` |
//! | per-signer nonce advances exactly once per consumed meta-tx | `domain/signing.rs` |
//!
//! ## Atomicity
//!
//! Every external entry point either commits in full or discards every state
//! change. [`service::EngineService`] stages each call on a clone of
//! [`domain::entities::EngineState`] and swaps it in only on success, which
//! reproduces whole-call revert semantics. Attached payments are journaled
//! inside the runtime and applied to the ledger at the same commit point, so
//! balances revert together with the state. The one deliberate exception is
//! target invocation failure, which is recorded as `FAILED` rather than
//! aborting — the delegated work failing is data, not an engine error.

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod config;
pub mod domain;
pub mod events;
pub mod ports;
pub mod service;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Value objects
    pub use blox_types::{ActionSet, Address, Hash, Selector, TxAction, TxStatus};

    // Domain entities
    pub use crate::domain::entities::{
        CallContext, EngineState, FunctionPermission, FunctionSchema, MetaTransaction,
        MetaTxParams, PaymentDetails, Role, TxParams, TxRecord,
    };

    // Errors
    pub use crate::domain::errors::EngineError;

    // Signing
    pub use crate::domain::signing::EcdsaSignature;

    // Runtime & execution
    pub use crate::domain::execution::EngineRuntime;

    // Ports
    pub use crate::ports::inbound::SecuredAccountApi;
    pub use crate::ports::outbound::{EventForwarder, PaymentLedger, TargetCall, TargetInvoker};

    // Adapters
    pub use crate::adapters::{
        DroppingForwarder, EchoTarget, FailingTarget, InMemoryLedger, RecordingForwarder,
    };

    // Events
    pub use crate::events::TxNotification;

    // Config & service
    pub use crate::config::{EngineConfig, RoleConfig, RoleGrantConfig, SchemaConfig};
    pub use crate::service::EngineService;
}

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name bound into every signature domain separator.
pub const ENGINE_NAME: &str = "EngineBlox";

/// Engine protocol version bound into every signature domain separator.
pub const ENGINE_VERSION: &str = "1";
