//! # Ports
//!
//! Trait seams between the engine and the outside world.

pub mod inbound;
pub mod outbound;
