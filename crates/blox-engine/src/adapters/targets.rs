//! Simple target implementations.

use crate::domain::execution::EngineRuntime;
use crate::ports::outbound::{TargetCall, TargetInvoker};

/// A target that always succeeds, echoing the call payload back as its
/// result and recording every call it received.
#[derive(Debug, Default)]
pub struct EchoTarget {
    /// Calls received, in order.
    pub calls: Vec<TargetCall>,
}

impl EchoTarget {
    /// Creates a new echo target.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TargetInvoker for EchoTarget {
    fn invoke(
        &mut self,
        call: TargetCall,
        _engine: &mut EngineRuntime<'_>,
    ) -> Result<Vec<u8>, String> {
        let result = call.data.clone();
        self.calls.push(call);
        Ok(result)
    }
}

/// A target that always fails with a fixed reason.
#[derive(Debug)]
pub struct FailingTarget {
    /// The failure reason reported for every invocation.
    pub reason: String,
}

impl FailingTarget {
    /// Creates a target failing with `reason`.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl TargetInvoker for FailingTarget {
    fn invoke(
        &mut self,
        _call: TargetCall,
        _engine: &mut EngineRuntime<'_>,
    ) -> Result<Vec<u8>, String> {
        Err(self.reason.clone())
    }
}
