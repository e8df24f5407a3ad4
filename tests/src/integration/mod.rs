//! End-to-end flows through [`blox_engine::service::EngineService`].

pub mod meta_tx_flows;
pub mod payments_and_reentrancy;
