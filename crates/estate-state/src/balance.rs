//! # Balance Ledger
//!
//! Address → balance map adjusted only as a side effect of escrow
//! operations: a deposit credits the buyer, a release or refund debits the
//! buyer. Nothing prevents a balance from going negative.

use std::sync::Arc;

use dashmap::DashMap;
use estate_core::Address;

#[derive(Debug, Clone, Default)]
pub struct BalanceLedger {
    balances: Arc<DashMap<Address, f64>>,
}

impl BalanceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to the address's balance, returning the new balance.
    pub fn credit(&self, address: &Address, amount: f64) -> f64 {
        let mut entry = self.balances.entry(address.clone()).or_insert(0.0);
        *entry += amount;
        *entry
    }

    /// Subtract `amount` from the address's balance, returning the new balance.
    pub fn debit(&self, address: &Address, amount: f64) -> f64 {
        let mut entry = self.balances.entry(address.clone()).or_insert(0.0);
        *entry -= amount;
        *entry
    }

    /// Current balance; zero for addresses never touched.
    pub fn balance(&self, address: &Address) -> f64 {
        self.balances.get(address).map(|b| *b).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    #[test]
    fn unknown_address_has_zero_balance() {
        let ledger = BalanceLedger::new();
        assert_eq!(ledger.balance(&addr("0xnobody")), 0.0);
    }

    #[test]
    fn credit_then_debit_returns_to_zero() {
        let ledger = BalanceLedger::new();
        let buyer = addr("0xbuyer");
        assert_eq!(ledger.credit(&buyer, 250_000.0), 250_000.0);
        assert_eq!(ledger.debit(&buyer, 250_000.0), 0.0);
        assert_eq!(ledger.balance(&buyer), 0.0);
    }

    #[test]
    fn balance_may_go_negative() {
        let ledger = BalanceLedger::new();
        let buyer = addr("0xbuyer");
        assert_eq!(ledger.debit(&buyer, 10.0), -10.0);
    }

    #[test]
    fn addresses_are_independent() {
        let ledger = BalanceLedger::new();
        ledger.credit(&addr("0xa"), 5.0);
        assert_eq!(ledger.balance(&addr("0xb")), 0.0);
    }
}
