//! # Domain Layer
//!
//! Pure engine logic: entities, the error taxonomy, both registries, the
//! transaction store, signature verification, and execution. Nothing in this
//! layer performs I/O; collaborators enter through the `ports` traits.

pub mod entities;
pub mod errors;
pub mod execution;
pub mod roles;
pub mod schemas;
pub mod signing;
pub mod transactions;
