//! In-memory balance ledger for tests and local tooling.

use crate::ports::outbound::PaymentLedger;
use blox_types::Address;
use std::collections::BTreeMap;

/// Keeps native and per-token balances in maps. Transfers are atomic:
/// a shortfall refuses the transfer without touching either side.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLedger {
    native: BTreeMap<Address, u128>,
    tokens: BTreeMap<(Address, Address), u128>,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits native balance to an account.
    pub fn credit_native(&mut self, account: Address, amount: u128) {
        *self.native.entry(account).or_insert(0) += amount;
    }

    /// Credits token balance to an account.
    pub fn credit_token(&mut self, token: Address, account: Address, amount: u128) {
        *self.tokens.entry((token, account)).or_insert(0) += amount;
    }
}

impl PaymentLedger for InMemoryLedger {
    fn native_balance(&self, account: Address) -> u128 {
        self.native.get(&account).copied().unwrap_or(0)
    }

    fn token_balance(&self, token: Address, account: Address) -> u128 {
        self.tokens.get(&(token, account)).copied().unwrap_or(0)
    }

    fn transfer_native(
        &mut self,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), String> {
        let available = self.native_balance(from);
        if available < amount {
            return Err(format!("native balance {available} short of {amount}"));
        }
        self.native.insert(from, available - amount);
        *self.native.entry(to).or_insert(0) += amount;
        Ok(())
    }

    fn transfer_token(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), String> {
        let available = self.token_balance(token, from);
        if available < amount {
            return Err(format!("token balance {available} short of {amount}"));
        }
        self.tokens.insert((token, from), available - amount);
        *self.tokens.entry((token, to)).or_insert(0) += amount;
        Ok(())
    }
}
