//! # Function Schema Registry
//!
//! Declares which handlers exist, which actions each supports, and which
//! operation type each belongs to. Operation types are reference-counted:
//! a type stays in the known set exactly while at least one schema
//! references it.

use crate::domain::entities::{EngineState, FunctionSchema};
use crate::domain::errors::EngineError;
use blox_types::{Hash, Selector};

impl EngineState {
    /// Registers a new function schema.
    ///
    /// The handler must be unique and the supported bitmap must not set bits
    /// outside the ten defined actions.
    pub fn create_function_schema(&mut self, schema: FunctionSchema) -> Result<(), EngineError> {
        if self.schemas.contains_key(&schema.handler) {
            return Err(EngineError::FunctionAlreadyExists(schema.handler));
        }
        if schema.supported_actions.has_undefined_bits() {
            return Err(EngineError::ActionNotSupported {
                handler: schema.handler,
            });
        }
        *self.operation_types.entry(schema.operation_type).or_insert(0) += 1;
        self.schemas.insert(schema.handler, schema);
        Ok(())
    }

    /// Removes a function schema.
    ///
    /// Blocked for protected schemas, and while any role still grants on the
    /// handler — that keeps "grant ⊆ supported" enforced in one place.
    /// Removing the last schema referencing an operation type drops the type
    /// from the known set.
    pub fn remove_function_schema(&mut self, handler: Selector) -> Result<(), EngineError> {
        let schema = self
            .schemas
            .get(&handler)
            .ok_or(EngineError::FunctionNotFound(handler))?;
        if schema.protected {
            return Err(EngineError::CannotRemoveProtected { kind: "schema" });
        }
        if let Some(role) = self
            .roles
            .values()
            .find(|role| role.permissions.contains_key(&handler))
        {
            return Err(EngineError::FunctionInUse {
                handler,
                role: role.id,
            });
        }

        let operation_type = schema.operation_type;
        self.schemas.remove(&handler);
        self.release_operation_type(operation_type);
        Ok(())
    }

    /// Looks up a schema, failing with `FunctionNotFound`.
    pub fn schema(&self, handler: Selector) -> Result<&FunctionSchema, EngineError> {
        self.schemas
            .get(&handler)
            .ok_or(EngineError::FunctionNotFound(handler))
    }

    /// Returns true if the operation type is referenced by any schema.
    #[must_use]
    pub fn operation_type_known(&self, operation_type: Hash) -> bool {
        self.operation_types.contains_key(&operation_type)
    }

    fn release_operation_type(&mut self, operation_type: Hash) {
        if let Some(count) = self.operation_types.get_mut(&operation_type) {
            *count -= 1;
            if *count == 0 {
                self.operation_types.remove(&operation_type);
            }
        }
    }
}
