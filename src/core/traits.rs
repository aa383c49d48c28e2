//! Collaborator capabilities consumed by the engine
//!
//! The engine never moves value, resolves claim ownership, or decides fee
//! rates itself; those concerns are injected behind the traits below. All
//! traits take `&self` and require `Send + Sync` so the same implementations
//! can back both the single-writer engine and the concurrent engine.

use crate::types::{AccountId, LedgerError, StreamError, StreamId};
use rust_decimal::Decimal;

/// Moves value between external accounts and the engine's treasury
///
/// Both operations may fail (insufficient balance, overflow); a failure
/// aborts the whole engine operation that requested it.
pub trait Ledger: Send + Sync {
    /// Debit `amount` of `asset` from `from` into the engine's treasury.
    fn pull(&self, from: AccountId, asset: &str, amount: Decimal) -> Result<(), LedgerError>;

    /// Credit `amount` of `asset` from the engine's treasury to `to`.
    fn push(&self, to: AccountId, asset: &str, amount: Decimal) -> Result<(), LedgerError>;
}

/// Tracks ownership of the transferable claim on each stream's payouts
///
/// The recipient role is "whoever holds the claim": the engine resolves it
/// through this trait on every operation and never stores it.
pub trait ClaimRegistry: Send + Sync {
    /// Record a freshly created claim for `id`, owned by `owner`.
    fn mint(&self, id: StreamId, owner: AccountId);

    /// Destroy the claim for `id`.
    ///
    /// # Errors
    ///
    /// Fails if no claim exists for `id`.
    fn burn(&self, id: StreamId) -> Result<(), StreamError>;

    /// Current owner of the claim for `id`.
    ///
    /// # Errors
    ///
    /// Fails if no claim exists for `id` (never minted, or burned).
    fn owner_of(&self, id: StreamId) -> Result<AccountId, StreamError>;

    /// Whether `caller` owns the claim for `id` or has been approved for it,
    /// either per-claim or as an operator for the owner.
    ///
    /// # Errors
    ///
    /// Fails if no claim exists for `id`.
    fn is_approved_or_owner(&self, caller: AccountId, id: StreamId) -> Result<bool, StreamError>;
}

/// Supplies the protocol fee fraction charged per asset at creation time.
pub trait FeeOracle: Send + Sync {
    /// Fee fraction in `[0, 1]` for `asset`.
    ///
    /// Out-of-range answers are rejected by the engine at creation.
    fn fee_rate_for(&self, asset: &str) -> Decimal;
}
