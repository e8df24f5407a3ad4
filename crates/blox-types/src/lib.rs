//! # blox-types
//!
//! Shared value objects for the EngineBlox engine.
//!
//! ## Clusters
//!
//! - **Identifiers**: `Address`, `Hash`, `Selector`
//! - **Lifecycle**: `TxStatus`
//! - **Permissions**: `TxAction`, `ActionSet`
//! - **Hashing**: `keccak256`

pub mod actions;
pub mod hashing;
pub mod status;
pub mod value_objects;

pub use actions::{ActionSet, TxAction};
pub use hashing::keccak256;
pub use status::TxStatus;
pub use value_objects::{Address, Hash, Selector};
