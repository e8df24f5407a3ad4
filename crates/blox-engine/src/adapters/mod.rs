//! # Adapters
//!
//! In-memory implementations of the outbound ports: a balance ledger, simple
//! targets, and event forwarders. Production hosts supply their own; these
//! back the bundled tests and local tooling.

mod forwarders;
mod memory_ledger;
mod targets;

pub use forwarders::{DroppingForwarder, RecordingForwarder};
pub use memory_ledger::InMemoryLedger;
pub use targets::{EchoTarget, FailingTarget};
