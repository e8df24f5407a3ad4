//! # EngineBlox Test Suite
//!
//! Unified test crate for cross-crate flows.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── support.rs        # Shared fixtures: configs, signing keys, targets
//! └── integration/      # End-to-end flows through EngineService
//!     ├── timelock_flows.rs
//!     ├── meta_tx_flows.rs
//!     ├── rbac_admin.rs
//!     └── payments_and_reentrancy.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p blox-tests
//!
//! # By category
//! cargo test -p blox-tests integration::timelock_flows
//! cargo test -p blox-tests integration::meta_tx_flows
//! ```

#![allow(unused_imports)]
#![allow(dead_code)]

pub mod integration;
pub mod support;
