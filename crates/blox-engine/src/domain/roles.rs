//! # Permission Registry
//!
//! Role-based access control with per-(role, handler) action bitmaps.
//!
//! `has_action_permission` is a logical OR across every role a principal
//! belongs to: one role granting the action for the handler is enough.
//! Each invariant (membership limits, last-wallet protection, grant ⊆
//! schema, sign/execute separation) is enforced in exactly one mutation
//! entry point here.

use crate::domain::entities::{EngineState, FunctionPermission, Role};
use crate::domain::errors::EngineError;
use blox_types::{keccak256, Address, Hash, Selector, TxAction};
use std::collections::{BTreeMap, BTreeSet};

impl EngineState {
    // =========================================================================
    // ROLE LIFECYCLE
    // =========================================================================

    /// Creates a role. The role id is derived once as keccak256(name).
    pub fn create_role(
        &mut self,
        name: &str,
        max_members: usize,
        protected: bool,
    ) -> Result<Hash, EngineError> {
        let id = keccak256(name.as_bytes());
        if self.roles.contains_key(&id) {
            return Err(EngineError::RoleAlreadyExists(id));
        }
        self.roles.insert(
            id,
            Role {
                name: name.to_string(),
                id,
                members: BTreeSet::new(),
                permissions: BTreeMap::new(),
                max_members,
                protected,
            },
        );
        Ok(id)
    }

    /// Removes a role. Protected roles cannot be removed.
    pub fn remove_role(&mut self, role_id: Hash) -> Result<(), EngineError> {
        let role = self
            .roles
            .get(&role_id)
            .ok_or(EngineError::RoleNotFound(role_id))?;
        if role.protected {
            return Err(EngineError::CannotRemoveProtected { kind: "role" });
        }
        self.roles.remove(&role_id);
        Ok(())
    }

    // =========================================================================
    // MEMBERSHIP
    // =========================================================================

    /// Adds a wallet to a role, enforcing the membership limit.
    pub fn assign_wallet(&mut self, role_id: Hash, wallet: Address) -> Result<(), EngineError> {
        if wallet.is_zero() {
            return Err(EngineError::InvalidAddress { context: "wallet" });
        }
        let role = self
            .roles
            .get_mut(&role_id)
            .ok_or(EngineError::RoleNotFound(role_id))?;
        if role.members.contains(&wallet) {
            return Err(EngineError::WalletAlreadyAssigned(wallet));
        }
        if role.members.len() >= role.max_members {
            return Err(EngineError::WalletLimitExceeded {
                current: role.members.len(),
                max: role.max_members,
            });
        }
        role.members.insert(wallet);
        Ok(())
    }

    /// Replaces one wallet with another in a single step, so membership never
    /// transits through an over- or under-populated state.
    pub fn update_assigned_wallet(
        &mut self,
        role_id: Hash,
        old: Address,
        new: Address,
    ) -> Result<(), EngineError> {
        if new.is_zero() {
            return Err(EngineError::InvalidAddress { context: "wallet" });
        }
        let role = self
            .roles
            .get_mut(&role_id)
            .ok_or(EngineError::RoleNotFound(role_id))?;
        if !role.members.contains(&old) {
            return Err(EngineError::WalletNotAssigned(old));
        }
        if role.members.contains(&new) {
            return Err(EngineError::WalletAlreadyAssigned(new));
        }
        role.members.remove(&old);
        role.members.insert(new);
        Ok(())
    }

    /// Removes a wallet from a role. A role never drops below one member.
    pub fn revoke_wallet(&mut self, role_id: Hash, wallet: Address) -> Result<(), EngineError> {
        let role = self
            .roles
            .get_mut(&role_id)
            .ok_or(EngineError::RoleNotFound(role_id))?;
        if !role.members.contains(&wallet) {
            return Err(EngineError::WalletNotAssigned(wallet));
        }
        if role.members.len() == 1 {
            return Err(EngineError::LastWalletProtected);
        }
        role.members.remove(&wallet);
        Ok(())
    }

    // =========================================================================
    // GRANTS
    // =========================================================================

    /// Adds a permission grant to a role.
    ///
    /// The handler must be registered, every granted bit must be supported by
    /// the schema, and the grant must not pair a sign-meta action with its
    /// execute-meta counterpart.
    pub fn add_function_to_role(
        &mut self,
        role_id: Hash,
        permission: FunctionPermission,
    ) -> Result<(), EngineError> {
        let schema = self
            .schemas
            .get(&permission.handler)
            .ok_or(EngineError::FunctionNotFound(permission.handler))?;
        if !permission.grants.is_subset_of(schema.supported_actions) {
            return Err(EngineError::ActionNotSupported {
                handler: permission.handler,
            });
        }
        if let Some((sign, execute)) = permission.grants.meta_conflict() {
            return Err(EngineError::ConflictingMetaTxPermissions { sign, execute });
        }

        let role = self
            .roles
            .get_mut(&role_id)
            .ok_or(EngineError::RoleNotFound(role_id))?;
        if role.permissions.contains_key(&permission.handler) {
            return Err(EngineError::FunctionPermissionExists(permission.handler));
        }
        role.permissions.insert(permission.handler, permission.grants);
        Ok(())
    }

    /// Removes a grant from a role. Blocked while the underlying schema is
    /// protected.
    pub fn remove_function_from_role(
        &mut self,
        role_id: Hash,
        handler: Selector,
    ) -> Result<(), EngineError> {
        if let Some(schema) = self.schemas.get(&handler) {
            if schema.protected {
                return Err(EngineError::CannotRemoveProtected { kind: "schema" });
            }
        }
        let role = self
            .roles
            .get_mut(&role_id)
            .ok_or(EngineError::RoleNotFound(role_id))?;
        if role.permissions.remove(&handler).is_none() {
            return Err(EngineError::FunctionNotFound(handler));
        }
        Ok(())
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Returns true if any role the principal belongs to grants `action` for
    /// `handler`.
    #[must_use]
    pub fn has_action_permission(
        &self,
        principal: Address,
        handler: Selector,
        action: TxAction,
    ) -> bool {
        self.roles.values().any(|role| {
            role.members.contains(&principal)
                && role
                    .permissions
                    .get(&handler)
                    .is_some_and(|grants| grants.contains(action))
        })
    }

    /// Permission check that surfaces a typed error on failure.
    pub fn require_action_permission(
        &self,
        principal: Address,
        handler: Selector,
        action: TxAction,
    ) -> Result<(), EngineError> {
        if self.has_action_permission(principal, handler, action) {
            Ok(())
        } else {
            Err(EngineError::NoPermission {
                principal,
                action,
                handler,
            })
        }
    }

    /// Looks up a role, failing with `RoleNotFound`.
    pub fn role(&self, role_id: Hash) -> Result<&Role, EngineError> {
        self.roles
            .get(&role_id)
            .ok_or(EngineError::RoleNotFound(role_id))
    }
}
