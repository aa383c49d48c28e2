//! Protocol fee accrual and the flat fee oracle
//!
//! Fee revenue is recorded per asset at stream creation time and only ever
//! grows (there is no fee collection surface here; revenue is an aggregate
//! the engine owner queries).

use crate::core::traits::FeeOracle;
use crate::types::{AssetId, StreamError, StreamId};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Per-asset protocol fee revenue
#[derive(Debug, Default)]
pub struct FeeAccrual {
    revenue: HashMap<AssetId, Decimal>,
}

impl FeeAccrual {
    /// Create an empty accrual table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record fee revenue earned from creating stream `id`.
    pub fn record(&mut self, id: StreamId, asset: &str, amount: Decimal) -> Result<(), StreamError> {
        let revenue = self
            .revenue
            .entry(asset.to_string())
            .or_insert(Decimal::ZERO);
        *revenue = revenue
            .checked_add(amount)
            .ok_or_else(|| StreamError::arithmetic_overflow("fee accrual", id))?;
        Ok(())
    }

    /// Undo a recorded fee. Only used to roll back a creation whose funding
    /// transfer failed.
    pub fn deduct(&mut self, asset: &str, amount: Decimal) {
        if let Some(revenue) = self.revenue.get_mut(asset) {
            *revenue -= amount;
        }
    }

    /// Accrued revenue for one asset.
    pub fn revenue_of(&self, asset: &str) -> Decimal {
        self.revenue.get(asset).copied().unwrap_or(Decimal::ZERO)
    }

    /// All accrued revenue, sorted by asset for deterministic output.
    pub fn all(&self) -> Vec<(AssetId, Decimal)> {
        let mut revenue: Vec<(AssetId, Decimal)> = self
            .revenue
            .iter()
            .map(|(asset, amount)| (asset.clone(), *amount))
            .collect();
        revenue.sort_by(|a, b| a.0.cmp(&b.0));
        revenue
    }
}

/// Fee oracle answering a fixed fraction for every asset
#[derive(Debug, Clone, Copy)]
pub struct FlatFeeOracle {
    rate: Decimal,
}

impl FlatFeeOracle {
    /// Oracle charging `rate` for every asset.
    pub fn new(rate: Decimal) -> Self {
        Self { rate }
    }

    /// Oracle charging no fees.
    pub fn free() -> Self {
        Self {
            rate: Decimal::ZERO,
        }
    }
}

impl FeeOracle for FlatFeeOracle {
    fn fee_rate_for(&self, _asset: &str) -> Decimal {
        self.rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accumulates_per_asset() {
        let mut fees = FeeAccrual::new();
        fees.record(1, "USDC", Decimal::new(10, 0)).unwrap();
        fees.record(2, "USDC", Decimal::new(5, 0)).unwrap();
        fees.record(3, "DAI", Decimal::new(7, 0)).unwrap();

        assert_eq!(fees.revenue_of("USDC"), Decimal::new(15, 0));
        assert_eq!(fees.revenue_of("DAI"), Decimal::new(7, 0));
        assert_eq!(fees.revenue_of("WETH"), Decimal::ZERO);
    }

    #[test]
    fn test_deduct_reverses_a_recording() {
        let mut fees = FeeAccrual::new();
        fees.record(1, "USDC", Decimal::new(10, 0)).unwrap();
        fees.deduct("USDC", Decimal::new(10, 0));

        assert_eq!(fees.revenue_of("USDC"), Decimal::ZERO);
    }

    #[test]
    fn test_all_is_sorted_by_asset() {
        let mut fees = FeeAccrual::new();
        fees.record(1, "WETH", Decimal::ONE).unwrap();
        fees.record(2, "DAI", Decimal::TWO).unwrap();

        let all = fees.all();
        assert_eq!(
            all,
            vec![
                ("DAI".to_string(), Decimal::TWO),
                ("WETH".to_string(), Decimal::ONE),
            ]
        );
    }

    #[test]
    fn test_flat_oracle_answers_same_rate_for_every_asset() {
        let oracle = FlatFeeOracle::new(Decimal::new(1, 2)); // 0.01
        assert_eq!(oracle.fee_rate_for("USDC"), Decimal::new(1, 2));
        assert_eq!(oracle.fee_rate_for("DAI"), Decimal::new(1, 2));

        assert_eq!(FlatFeeOracle::free().fee_rate_for("USDC"), Decimal::ZERO);
    }
}
