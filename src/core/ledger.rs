//! In-memory ledger
//!
//! Thread-safe balance bookkeeping backing both engines. The engine's
//! treasury is modeled explicitly: `pull` moves value from an account into
//! the treasury, `push` moves value out of it. Either direction fails on
//! insufficient balance, which is exactly how an external asset ledger can
//! fail a transfer.

use crate::core::traits::Ledger;
use crate::types::{AccountId, AssetId, LedgerError};
use dashmap::DashMap;
use rust_decimal::Decimal;

/// Thread-safe in-memory ledger with an explicit treasury
///
/// Balances are keyed by `(account, asset)`. DashMap provides fine-grained
/// locking, so transfers touching different accounts proceed in parallel.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    /// External account balances
    balances: DashMap<(AccountId, AssetId), Decimal>,

    /// Value currently held by the engine (deposits awaiting payout)
    treasury: DashMap<AssetId, Decimal>,
}

impl InMemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit an external account (seeding; not an engine operation).
    pub fn fund(
        &self,
        account: AccountId,
        asset: &str,
        amount: Decimal,
    ) -> Result<(), LedgerError> {
        let mut balance = self
            .balances
            .entry((account, asset.to_string()))
            .or_insert(Decimal::ZERO);
        *balance = balance
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow {
                account,
                asset: asset.to_string(),
            })?;
        Ok(())
    }

    /// Current balance of an external account.
    pub fn balance_of(&self, account: AccountId, asset: &str) -> Decimal {
        self.balances
            .get(&(account, asset.to_string()))
            .map(|balance| *balance)
            .unwrap_or(Decimal::ZERO)
    }

    /// Value currently held by the engine for an asset.
    pub fn treasury_balance(&self, asset: &str) -> Decimal {
        self.treasury
            .get(asset)
            .map(|balance| *balance)
            .unwrap_or(Decimal::ZERO)
    }
}

impl Ledger for InMemoryLedger {
    fn pull(&self, from: AccountId, asset: &str, amount: Decimal) -> Result<(), LedgerError> {
        {
            let mut balance = self
                .balances
                .entry((from, asset.to_string()))
                .or_insert(Decimal::ZERO);
            if *balance < amount {
                return Err(LedgerError::InsufficientBalance {
                    account: from,
                    asset: asset.to_string(),
                    held: *balance,
                    requested: amount,
                });
            }
            *balance -= amount;
        }

        let mut held = self
            .treasury
            .entry(asset.to_string())
            .or_insert(Decimal::ZERO);
        *held += amount;
        Ok(())
    }

    fn push(&self, to: AccountId, asset: &str, amount: Decimal) -> Result<(), LedgerError> {
        {
            let mut held = self
                .treasury
                .entry(asset.to_string())
                .or_insert(Decimal::ZERO);
            if *held < amount {
                return Err(LedgerError::InsufficientBalance {
                    account: to,
                    asset: asset.to_string(),
                    held: *held,
                    requested: amount,
                });
            }
            *held -= amount;
        }

        let mut balance = self
            .balances
            .entry((to, asset.to_string()))
            .or_insert(Decimal::ZERO);
        *balance = balance
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow {
                account: to,
                asset: asset.to_string(),
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fund_credits_balance() {
        let ledger = InMemoryLedger::new();
        ledger.fund(1, "USDC", Decimal::new(1000, 0)).unwrap();
        ledger.fund(1, "USDC", Decimal::new(500, 0)).unwrap();

        assert_eq!(ledger.balance_of(1, "USDC"), Decimal::new(1500, 0));
        assert_eq!(ledger.balance_of(1, "DAI"), Decimal::ZERO);
    }

    #[test]
    fn test_pull_moves_balance_into_treasury() {
        let ledger = InMemoryLedger::new();
        ledger.fund(1, "USDC", Decimal::new(1000, 0)).unwrap();

        ledger.pull(1, "USDC", Decimal::new(400, 0)).unwrap();

        assert_eq!(ledger.balance_of(1, "USDC"), Decimal::new(600, 0));
        assert_eq!(ledger.treasury_balance("USDC"), Decimal::new(400, 0));
    }

    #[test]
    fn test_pull_fails_on_insufficient_balance() {
        let ledger = InMemoryLedger::new();
        ledger.fund(1, "USDC", Decimal::new(100, 0)).unwrap();

        let result = ledger.pull(1, "USDC", Decimal::new(200, 0));
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientBalance { account: 1, .. })
        ));

        // Nothing moved.
        assert_eq!(ledger.balance_of(1, "USDC"), Decimal::new(100, 0));
        assert_eq!(ledger.treasury_balance("USDC"), Decimal::ZERO);
    }

    #[test]
    fn test_push_moves_treasury_to_balance() {
        let ledger = InMemoryLedger::new();
        ledger.fund(1, "USDC", Decimal::new(1000, 0)).unwrap();
        ledger.pull(1, "USDC", Decimal::new(1000, 0)).unwrap();

        ledger.push(2, "USDC", Decimal::new(300, 0)).unwrap();

        assert_eq!(ledger.balance_of(2, "USDC"), Decimal::new(300, 0));
        assert_eq!(ledger.treasury_balance("USDC"), Decimal::new(700, 0));
    }

    #[test]
    fn test_push_fails_on_insufficient_treasury() {
        let ledger = InMemoryLedger::new();

        let result = ledger.push(2, "USDC", Decimal::new(1, 0));
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientBalance { .. })
        ));
        assert_eq!(ledger.balance_of(2, "USDC"), Decimal::ZERO);
    }

    #[test]
    fn test_concurrent_pulls_from_different_accounts() {
        use std::sync::Arc;
        use std::thread;

        let ledger = Arc::new(InMemoryLedger::new());
        for account in 1u64..=8 {
            ledger.fund(account, "USDC", Decimal::new(100, 0)).unwrap();
        }

        let mut handles = vec![];
        for account in 1u64..=8 {
            let ledger = Arc::clone(&ledger);
            handles.push(thread::spawn(move || {
                ledger.pull(account, "USDC", Decimal::new(100, 0)).unwrap();
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(ledger.treasury_balance("USDC"), Decimal::new(800, 0));
    }
}
