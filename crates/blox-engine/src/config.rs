//! # Bootstrap Configuration
//!
//! Declarative setup for a secured account: timelock, the initial function
//! schemas, and the initial roles with members and grants. Deserializable
//! with serde so hosts can keep it as a JSON document.
//!
//! Handlers and operation types are derived from names here, once, at
//! registration — lookups never re-derive them.

use crate::domain::entities::{EngineState, FunctionPermission, FunctionSchema};
use crate::domain::errors::EngineError;
use blox_types::{keccak256, ActionSet, Address, Selector, TxAction};
use serde::{Deserialize, Serialize};

/// Minimum timelock period in seconds.
pub const MIN_TIMELOCK: u64 = 60;

/// Maximum timelock period in seconds (one year).
pub const MAX_TIMELOCK: u64 = 365 * 24 * 3600;

/// One function schema to register at setup.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Schema name; the handler selector is derived from it.
    pub name: String,
    /// Operation category name; the operation type is derived from it.
    pub operation_name: String,
    /// Actions the handler supports.
    pub supported_actions: Vec<TxAction>,
    /// Protected schemas cannot be removed.
    #[serde(default)]
    pub protected: bool,
}

/// One grant inside a role definition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoleGrantConfig {
    /// Name of the schema the grant applies to.
    pub function: String,
    /// Actions granted.
    pub actions: Vec<TxAction>,
}

/// One role to create at setup.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Role name; the role id is derived from it.
    pub name: String,
    /// Maximum membership.
    pub max_members: usize,
    /// Protected roles cannot be removed.
    #[serde(default)]
    pub protected: bool,
    /// Initial members.
    pub members: Vec<Address>,
    /// Initial grants.
    pub grants: Vec<RoleGrantConfig>,
}

/// Full bootstrap configuration for one engine instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Network id bound into the signature domain.
    pub chain_id: u64,
    /// This engine instance's own address.
    pub self_address: Address,
    /// Timelock period in seconds.
    pub timelock: u64,
    /// Optional event forwarder.
    #[serde(default)]
    pub forwarder: Option<Address>,
    /// Schemas to register, applied before roles so grants validate.
    pub schemas: Vec<SchemaConfig>,
    /// Roles to create.
    pub roles: Vec<RoleConfig>,
}

impl EngineConfig {
    /// Parses a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl EngineState {
    /// One-time setup from a bootstrap configuration.
    ///
    /// Validates the timelock bounds and the instance address, registers
    /// every schema, then creates every role with its members and grants.
    pub fn initialize(&mut self, config: &EngineConfig) -> Result<(), EngineError> {
        if self.initialized {
            return Err(EngineError::AlreadyInitialized);
        }
        if config.self_address.is_zero() {
            return Err(EngineError::InvalidAddress {
                context: "self address",
            });
        }
        if !(MIN_TIMELOCK..=MAX_TIMELOCK).contains(&config.timelock) {
            return Err(EngineError::InvalidTimelockPeriod {
                period: config.timelock,
                min: MIN_TIMELOCK,
                max: MAX_TIMELOCK,
            });
        }

        self.chain_id = config.chain_id;
        self.self_address = config.self_address;
        self.timelock = config.timelock;
        self.forwarder = config.forwarder.unwrap_or(Address::ZERO);

        for schema in &config.schemas {
            self.create_function_schema(FunctionSchema {
                name: schema.name.clone(),
                handler: Selector::from_name(&schema.name),
                operation_type: keccak256(schema.operation_name.as_bytes()),
                operation_name: schema.operation_name.clone(),
                supported_actions: ActionSet::of(&schema.supported_actions),
                protected: schema.protected,
            })?;
        }

        for role in &config.roles {
            let role_id = self.create_role(&role.name, role.max_members, role.protected)?;
            for member in &role.members {
                self.assign_wallet(role_id, *member)?;
            }
            for grant in &role.grants {
                self.add_function_to_role(
                    role_id,
                    FunctionPermission {
                        handler: Selector::from_name(&grant.function),
                        grants: ActionSet::of(&grant.actions),
                    },
                )?;
            }
        }

        self.initialized = true;
        Ok(())
    }
}
