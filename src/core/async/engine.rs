//! Concurrent stream orchestration for async batch processing
//!
//! This module provides the `AsyncLockupEngine` struct, the thread-safe
//! counterpart of the single-writer engine. It can be cloned and shared
//! across tokio tasks; operations on different streams run in parallel while
//! every mutation of a single stream happens under that stream's entry lock.
//!
//! # Transactional Discipline
//!
//! Each operation validates, applies its accounting effect, and performs the
//! ledger interaction entirely inside the stream's entry lock, in that order.
//! A ledger failure rolls the effect back before the lock is released, so no
//! other task ever observes a half-applied mutation.
//!
//! The all-or-nothing batch operations (`withdraw_multiple`,
//! `cancel_multiple`) are not offered here: their dry-run pass cannot be made
//! race-free without locking all target streams at once. Batches belong on
//! the single-writer engine.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::core::accounting;
use crate::core::curve;
use crate::core::engine::{authorize_withdraw, max_fee_rate};
use crate::core::fees::FlatFeeOracle;
use crate::core::ledger::InMemoryLedger;
use crate::core::registry::InMemoryRegistry;
use crate::core::status;
use crate::core::traits::{ClaimRegistry, FeeOracle, Ledger};
use crate::types::{
    AccountId, Amounts, AssetId, CreateParams, OperationRecord, OperationType, Stream,
    StreamError, StreamEvent, StreamId, StreamStatus, Timestamp, NULL_ACCOUNT,
};
use dashmap::DashMap;
use rust_decimal::Decimal;

use super::AsyncStreamStore;

/// Concurrent stream orchestration engine
///
/// Clones share all state. Stream ids are reserved atomically; a creation
/// that fails after reserving its id leaves a gap, but ids stay unique and
/// monotone.
pub struct AsyncLockupEngine<L: Ledger, R: ClaimRegistry, F: FeeOracle> {
    /// Thread-safe stream records
    streams: Arc<AsyncStreamStore>,

    /// Next id to reserve
    next_stream_id: Arc<AtomicU64>,

    /// Per-asset protocol fee revenue
    fees: Arc<DashMap<AssetId, Decimal>>,

    /// Events recorded by mutating operations
    events: Arc<Mutex<Vec<StreamEvent>>>,

    ledger: Arc<L>,
    registry: Arc<R>,
    fee_oracle: Arc<F>,
}

impl<L: Ledger, R: ClaimRegistry, F: FeeOracle> Clone for AsyncLockupEngine<L, R, F> {
    fn clone(&self) -> Self {
        Self {
            streams: Arc::clone(&self.streams),
            next_stream_id: Arc::clone(&self.next_stream_id),
            fees: Arc::clone(&self.fees),
            events: Arc::clone(&self.events),
            ledger: Arc::clone(&self.ledger),
            registry: Arc::clone(&self.registry),
            fee_oracle: Arc::clone(&self.fee_oracle),
        }
    }
}

impl<L: Ledger, R: ClaimRegistry, F: FeeOracle> AsyncLockupEngine<L, R, F> {
    /// Create a concurrent engine around the given collaborators.
    pub fn new(ledger: L, registry: R, fee_oracle: F) -> Self {
        Self {
            streams: Arc::new(AsyncStreamStore::new()),
            next_stream_id: Arc::new(AtomicU64::new(1)),
            fees: Arc::new(DashMap::new()),
            events: Arc::new(Mutex::new(Vec::new())),
            ledger: Arc::new(ledger),
            registry: Arc::new(registry),
            fee_oracle: Arc::new(fee_oracle),
        }
    }

    /// The injected ledger.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// The injected claim registry.
    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Create a stream. Same contract as the single-writer engine.
    pub fn create(&self, params: CreateParams) -> Result<StreamId, StreamError> {
        let CreateParams {
            sender,
            recipient,
            asset,
            total_amount,
            start_time,
            cancelable,
            segments,
            broker,
        } = params;

        // Checks.
        if sender == NULL_ACCOUNT {
            return Err(StreamError::null_account("sender"));
        }
        if recipient == NULL_ACCOUNT {
            return Err(StreamError::null_account("recipient"));
        }
        if total_amount <= Decimal::ZERO {
            return Err(StreamError::DepositAmountZero);
        }

        let max_rate = max_fee_rate();
        let protocol_rate = self.fee_oracle.fee_rate_for(&asset);
        if protocol_rate.is_sign_negative() || protocol_rate > max_rate {
            return Err(StreamError::FeeRateOutOfRange {
                rate: protocol_rate,
                max: max_rate,
            });
        }
        let next_id = self.next_stream_id.load(Ordering::SeqCst);
        let protocol_fee = total_amount
            .checked_mul(protocol_rate)
            .ok_or_else(|| StreamError::arithmetic_overflow("protocol fee", next_id))?;

        let (broker_account, broker_fee) = match &broker {
            Some(broker) => {
                if broker.account == NULL_ACCOUNT {
                    return Err(StreamError::null_account("broker"));
                }
                if broker.fee_rate.is_sign_negative() || broker.fee_rate > max_rate {
                    return Err(StreamError::FeeRateOutOfRange {
                        rate: broker.fee_rate,
                        max: max_rate,
                    });
                }
                let fee = total_amount
                    .checked_mul(broker.fee_rate)
                    .ok_or_else(|| StreamError::arithmetic_overflow("broker fee", next_id))?;
                (broker.account, fee)
            }
            None => (NULL_ACCOUNT, Decimal::ZERO),
        };

        let deposit = total_amount - protocol_fee - broker_fee;
        if deposit <= Decimal::ZERO {
            return Err(StreamError::DepositAmountZero);
        }

        let segment_sum = curve::validate_segments(start_time, &segments)?;
        if segment_sum != deposit {
            return Err(StreamError::SegmentAmountsSumMismatch {
                expected: deposit,
                actual: segment_sum,
            });
        }

        // All validation passed: reserve the id and commit the effects.
        let id = self.next_stream_id.fetch_add(1, Ordering::SeqCst);
        if protocol_fee > Decimal::ZERO {
            self.record_fee(id, &asset, protocol_fee)?;
        }
        self.streams.insert(Stream {
            id,
            sender,
            asset: asset.clone(),
            amounts: Amounts::new(deposit),
            start_time,
            segments: segments.clone(),
            is_cancelable: cancelable,
            was_canceled: false,
        });
        self.registry.mint(id, recipient);

        // Interactions, with full rollback of the effects on failure.
        let funding = deposit + protocol_fee;
        if let Err(e) = self.ledger.pull(sender, &asset, funding) {
            self.rollback_create(id, &asset, protocol_fee);
            return Err(e.into());
        }
        if broker_fee > Decimal::ZERO {
            if let Err(e) = self.ledger.pull(sender, &asset, broker_fee) {
                let _ = self.ledger.push(sender, &asset, funding);
                self.rollback_create(id, &asset, protocol_fee);
                return Err(e.into());
            }
            if let Err(e) = self.ledger.push(broker_account, &asset, broker_fee) {
                let _ = self.ledger.push(sender, &asset, broker_fee);
                let _ = self.ledger.push(sender, &asset, funding);
                self.rollback_create(id, &asset, protocol_fee);
                return Err(e.into());
            }
        }

        self.record_event(StreamEvent::Created {
            id,
            sender,
            recipient,
            asset,
            deposited: deposit,
            protocol_fee,
            broker_fee,
            start_time,
            cancelable,
            segments,
        });
        Ok(id)
    }

    /// Withdraw `amount` from a stream to the `to` account
    ///
    /// Validation, effect, payout, and (on payout failure) rollback all run
    /// under the stream's entry lock.
    pub fn withdraw(
        &self,
        id: StreamId,
        caller: AccountId,
        to: AccountId,
        amount: Decimal,
        now: Timestamp,
    ) -> Result<(), StreamError> {
        if to == NULL_ACCOUNT {
            return Err(StreamError::null_account("withdrawal destination"));
        }

        let ledger = Arc::clone(&self.ledger);
        let registry = Arc::clone(&self.registry);
        self.streams.update(id, |stream| {
            status::check_withdraw(stream, now)?;
            authorize_withdraw(registry.as_ref(), stream, caller, to)?;
            if amount <= Decimal::ZERO {
                return Err(StreamError::WithdrawAmountZero { id });
            }
            let withdrawable = accounting::withdrawable_amount(stream, now);
            if amount > withdrawable {
                return Err(StreamError::overdraw(id, amount, withdrawable));
            }

            // Effect before interaction; rolled back before the lock drops
            // if the payout fails.
            stream.amounts.withdrawn = stream
                .amounts
                .withdrawn
                .checked_add(amount)
                .ok_or_else(|| StreamError::arithmetic_overflow("withdraw", id))?;

            if let Err(e) = ledger.push(to, &stream.asset, amount) {
                stream.amounts.withdrawn -= amount;
                return Err(e.into());
            }
            Ok(())
        })?;

        self.record_event(StreamEvent::Withdrawn { id, to, amount });
        Ok(())
    }

    /// Withdraw the entire withdrawable balance of a stream
    ///
    /// The amount is computed under the same entry lock that applies it, so
    /// no concurrent withdrawal can slip in between.
    pub fn withdraw_max(
        &self,
        id: StreamId,
        caller: AccountId,
        to: AccountId,
        now: Timestamp,
    ) -> Result<Decimal, StreamError> {
        if to == NULL_ACCOUNT {
            return Err(StreamError::null_account("withdrawal destination"));
        }

        let ledger = Arc::clone(&self.ledger);
        let registry = Arc::clone(&self.registry);
        let amount = self.streams.update(id, |stream| {
            status::check_withdraw(stream, now)?;
            authorize_withdraw(registry.as_ref(), stream, caller, to)?;
            let amount = accounting::withdrawable_amount(stream, now);
            if amount <= Decimal::ZERO {
                return Err(StreamError::WithdrawAmountZero { id });
            }

            stream.amounts.withdrawn = stream
                .amounts
                .withdrawn
                .checked_add(amount)
                .ok_or_else(|| StreamError::arithmetic_overflow("withdraw", id))?;

            if let Err(e) = ledger.push(to, &stream.asset, amount) {
                stream.amounts.withdrawn -= amount;
                return Err(e.into());
            }
            Ok(amount)
        })?;

        self.record_event(StreamEvent::Withdrawn { id, to, amount });
        Ok(amount)
    }

    /// Cancel a stream. Same contract as the single-writer engine.
    pub fn cancel(
        &self,
        id: StreamId,
        caller: AccountId,
        now: Timestamp,
    ) -> Result<(), StreamError> {
        let ledger = Arc::clone(&self.ledger);
        let registry = Arc::clone(&self.registry);
        let (sender, refunded) = self.streams.update(id, |stream| {
            status::check_cancel(stream, now)?;
            let recipient = registry.owner_of(id)?;
            if caller != stream.sender && caller != recipient {
                return Err(StreamError::unauthorized(caller, id, "cancel"));
            }

            let refundable = accounting::refundable_amount(stream, now);

            // Freeze the curve and flip the flags before the refund.
            stream.amounts.refunded = refundable;
            stream.was_canceled = true;
            stream.is_cancelable = false;

            if refundable > Decimal::ZERO {
                if let Err(e) = ledger.push(stream.sender, &stream.asset, refundable) {
                    stream.amounts.refunded = Decimal::ZERO;
                    stream.was_canceled = false;
                    stream.is_cancelable = true;
                    return Err(e.into());
                }
            }
            Ok((stream.sender, refundable))
        })?;

        self.record_event(StreamEvent::Canceled {
            id,
            sender,
            refunded,
        });
        Ok(())
    }

    /// Irrevocably make a stream non-cancelable. Sender only.
    pub fn renounce(
        &self,
        id: StreamId,
        caller: AccountId,
        now: Timestamp,
    ) -> Result<(), StreamError> {
        self.streams.update(id, |stream| {
            if caller != stream.sender {
                return Err(StreamError::unauthorized(caller, id, "renounce"));
            }
            status::check_renounce(stream, now)?;
            stream.is_cancelable = false;
            Ok(())
        })?;

        self.record_event(StreamEvent::Renounced { id });
        Ok(())
    }

    /// Destroy the claim of a depleted stream.
    pub fn burn(&self, id: StreamId, caller: AccountId, now: Timestamp) -> Result<(), StreamError> {
        let stream = self
            .streams
            .get(id)
            .ok_or_else(|| StreamError::stream_not_found(id))?;

        status::check_burn(&stream, now)?;
        if !self.registry.is_approved_or_owner(caller, id)? {
            return Err(StreamError::unauthorized(caller, id, "burn"));
        }

        self.registry.burn(id)?;
        self.record_event(StreamEvent::Burned { id });
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Whether a stream was ever created with this id.
    pub fn is_stream(&self, id: StreamId) -> bool {
        self.streams.contains(id)
    }

    /// Snapshot of a stream.
    pub fn get_stream(&self, id: StreamId) -> Result<Stream, StreamError> {
        self.streams
            .get(id)
            .ok_or_else(|| StreamError::stream_not_found(id))
    }

    /// The stream's status at `now`.
    pub fn status_of(&self, id: StreamId, now: Timestamp) -> Result<StreamStatus, StreamError> {
        Ok(status::status_of(&self.get_stream(id)?, now))
    }

    /// Amount the recipient can withdraw at `now`.
    pub fn withdrawable_amount_of(
        &self,
        id: StreamId,
        now: Timestamp,
    ) -> Result<Decimal, StreamError> {
        Ok(accounting::withdrawable_amount(&self.get_stream(id)?, now))
    }

    /// Current owner of the stream's claim.
    pub fn get_recipient(&self, id: StreamId) -> Result<AccountId, StreamError> {
        self.get_stream(id)?;
        self.registry.owner_of(id)
    }

    /// Accrued protocol revenue for an asset.
    pub fn protocol_revenue(&self, asset: &str) -> Decimal {
        self.fees
            .get(asset)
            .map(|revenue| *revenue)
            .unwrap_or(Decimal::ZERO)
    }

    /// Snapshots of all streams, sorted by id.
    pub fn all_streams(&self) -> Vec<Stream> {
        self.streams.all()
    }

    /// Drain the events recorded since the last drain.
    pub fn take_events(&self) -> Vec<StreamEvent> {
        self.events
            .lock()
            .map(|mut events| std::mem::take(&mut *events))
            .unwrap_or_default()
    }

    // ---------------------------------------------------------------------
    // Internal helpers
    // ---------------------------------------------------------------------

    fn record_event(&self, event: StreamEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    fn record_fee(&self, id: StreamId, asset: &str, amount: Decimal) -> Result<(), StreamError> {
        let mut revenue = self
            .fees
            .entry(asset.to_string())
            .or_insert(Decimal::ZERO);
        *revenue = revenue
            .checked_add(amount)
            .ok_or_else(|| StreamError::arithmetic_overflow("fee accrual", id))?;
        Ok(())
    }

    /// Undo the effects of a creation whose funding transfer failed. The
    /// reserved id is not reclaimed.
    fn rollback_create(&self, id: StreamId, asset: &str, protocol_fee: Decimal) {
        self.streams.remove(id);
        let _ = self.registry.burn(id);
        if protocol_fee > Decimal::ZERO {
            if let Some(mut revenue) = self.fees.get_mut(asset) {
                *revenue -= protocol_fee;
            }
        }
    }
}

/// Concurrent engine wired to the in-memory collaborators
pub type InMemoryAsyncLockupEngine =
    AsyncLockupEngine<InMemoryLedger, InMemoryRegistry, FlatFeeOracle>;

impl InMemoryAsyncLockupEngine {
    /// Build a concurrent engine backed by the in-memory ledger and registry,
    /// with a flat protocol fee.
    pub fn in_memory(fee_rate: Decimal) -> Self {
        AsyncLockupEngine::new(
            InMemoryLedger::new(),
            InMemoryRegistry::new(),
            FlatFeeOracle::new(fee_rate),
        )
    }

    /// Apply a single operation-log record. Same routing as the single-writer
    /// engine.
    pub fn process_operation(&self, record: OperationRecord) -> Result<(), StreamError> {
        match record.op {
            OperationType::Fund => {
                let asset = required(record.asset, "asset")?;
                let amount = required(record.amount, "amount")?;
                self.ledger().fund(record.account, &asset, amount)?;
                Ok(())
            }
            OperationType::Create => {
                let params = CreateParams {
                    sender: record.account,
                    recipient: required(record.to, "to")?,
                    asset: required(record.asset, "asset")?,
                    total_amount: required(record.amount, "amount")?,
                    start_time: required(record.start_time, "start")?,
                    cancelable: record.cancelable.unwrap_or(true),
                    segments: required(record.segments, "segments")?,
                    broker: None,
                };
                self.create(params).map(|_| ())
            }
            OperationType::Withdraw => {
                let id = required(record.stream, "stream")?;
                let to = required(record.to, "to")?;
                let amount = required(record.amount, "amount")?;
                self.withdraw(id, record.account, to, amount, record.time)
            }
            OperationType::WithdrawMax => {
                let id = required(record.stream, "stream")?;
                let to = required(record.to, "to")?;
                self.withdraw_max(id, record.account, to, record.time)
                    .map(|_| ())
            }
            OperationType::Cancel => {
                let id = required(record.stream, "stream")?;
                self.cancel(id, record.account, record.time)
            }
            OperationType::Renounce => {
                let id = required(record.stream, "stream")?;
                self.renounce(id, record.account, record.time)
            }
            OperationType::Burn => {
                let id = required(record.stream, "stream")?;
                self.burn(id, record.account, record.time)
            }
        }
    }
}

/// Reject an operation record missing a field its operation requires.
fn required<T>(value: Option<T>, field: &str) -> Result<T, StreamError> {
    value.ok_or_else(|| StreamError::ParseError {
        line: None,
        message: format!("missing required field '{}'", field),
    })
}
