//! In-memory claim registry
//!
//! Tracks the transferable claim that represents the right to receive a
//! stream's payouts: ownership, per-claim approvals, and account-wide
//! operator approvals. Claims can be transferred to a new owner; the engine
//! resolves the recipient through the registry on every operation, so a
//! transfer takes effect immediately.

use crate::core::traits::ClaimRegistry;
use crate::types::{AccountId, StreamError, StreamId, NULL_ACCOUNT};
use dashmap::{DashMap, DashSet};

/// Thread-safe in-memory claim registry
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    /// Claim owner per stream
    owners: DashMap<StreamId, AccountId>,

    /// Per-claim approved account, if any
    claim_approvals: DashMap<StreamId, AccountId>,

    /// (owner, operator) pairs where the operator may act on all of the
    /// owner's claims
    operator_approvals: DashSet<(AccountId, AccountId)>,
}

impl InMemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Approve `approved` for the single claim `id`. Caller must own it.
    pub fn approve(
        &self,
        caller: AccountId,
        id: StreamId,
        approved: AccountId,
    ) -> Result<(), StreamError> {
        let owner = self.owner_of(id)?;
        if owner != caller {
            return Err(StreamError::unauthorized(caller, id, "approve"));
        }
        self.claim_approvals.insert(id, approved);
        Ok(())
    }

    /// Grant or revoke `operator` over all of `owner`'s claims.
    pub fn set_operator(&self, owner: AccountId, operator: AccountId, approved: bool) {
        if approved {
            self.operator_approvals.insert((owner, operator));
        } else {
            self.operator_approvals.remove(&(owner, operator));
        }
    }

    /// Transfer the claim `id` to `to`. Caller must be approved or owner.
    ///
    /// Clears the per-claim approval, matching transfer semantics of
    /// claim-token registries.
    pub fn transfer(
        &self,
        caller: AccountId,
        id: StreamId,
        to: AccountId,
    ) -> Result<(), StreamError> {
        if to == NULL_ACCOUNT {
            return Err(StreamError::null_account("claim transfer destination"));
        }
        if !self.is_approved_or_owner(caller, id)? {
            return Err(StreamError::unauthorized(caller, id, "transfer"));
        }
        self.owners.insert(id, to);
        self.claim_approvals.remove(&id);
        Ok(())
    }

    /// Whether a claim currently exists for `id`.
    pub fn exists(&self, id: StreamId) -> bool {
        self.owners.contains_key(&id)
    }
}

impl ClaimRegistry for InMemoryRegistry {
    fn mint(&self, id: StreamId, owner: AccountId) {
        self.owners.insert(id, owner);
    }

    fn burn(&self, id: StreamId) -> Result<(), StreamError> {
        if self.owners.remove(&id).is_none() {
            return Err(StreamError::registry(id, "claim does not exist"));
        }
        self.claim_approvals.remove(&id);
        Ok(())
    }

    fn owner_of(&self, id: StreamId) -> Result<AccountId, StreamError> {
        self.owners
            .get(&id)
            .map(|owner| *owner)
            .ok_or_else(|| StreamError::registry(id, "claim does not exist"))
    }

    fn is_approved_or_owner(&self, caller: AccountId, id: StreamId) -> Result<bool, StreamError> {
        let owner = self.owner_of(id)?;
        if caller == owner {
            return Ok(true);
        }
        if self
            .claim_approvals
            .get(&id)
            .is_some_and(|approved| *approved == caller)
        {
            return Ok(true);
        }
        Ok(self.operator_approvals.contains(&(owner, caller)))
    }
}
