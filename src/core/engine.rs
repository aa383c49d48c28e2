//! Stream orchestration engine
//!
//! This module provides the LockupEngine that exposes the mutating operations
//! (create, withdraw, cancel, renounce, burn and their batch forms) and the
//! pure queries, composing the status machine, the amount accounting, and the
//! curve calculator with the injected collaborators (ledger, claim registry,
//! fee oracle).
//!
//! # Transactional Discipline
//!
//! The engine takes `&mut self` for every mutating operation, so each call is
//! a serialized, all-or-nothing transaction: no concurrent caller can observe
//! a half-applied mutation, and a nested re-entry into the same stream is
//! impossible by construction.
//!
//! Within a call the ordering is checks, then effects, then interactions:
//! every validation runs first, accounting is committed next, and only then
//! is the ledger asked to move value. A ledger failure rolls the accounting
//! back and surfaces the error; no partial credit survives.

use crate::core::accounting;
use crate::core::curve;
use crate::core::fees::{FeeAccrual, FlatFeeOracle};
use crate::core::ledger::InMemoryLedger;
use crate::core::registry::InMemoryRegistry;
use crate::core::status;
use crate::core::traits::{ClaimRegistry, FeeOracle, Ledger};
use crate::types::{
    AccountId, Amounts, CreateParams, OperationRecord, OperationType, Segment, SegmentDuration,
    Stream, StreamError, StreamEvent, StreamId, StreamStatus, Timestamp, NULL_ACCOUNT,
};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

/// Largest fee fraction the engine accepts, for the protocol and for brokers.
pub fn max_fee_rate() -> Decimal {
    // 10%
    Decimal::new(1, 1)
}

/// Stream orchestration engine
///
/// Owns the stream records and the per-asset fee revenue; value movement,
/// claim ownership, and fee rates are delegated to the injected
/// collaborators.
pub struct LockupEngine<L: Ledger, R: ClaimRegistry, F: FeeOracle> {
    /// All stream records ever created; never deleted
    streams: HashMap<StreamId, Stream>,

    /// Next id to assign; ids are sequential from 1 and never reused
    next_stream_id: StreamId,

    /// Per-asset protocol fee revenue
    fees: FeeAccrual,

    /// Events emitted by mutating operations, drained by the caller
    events: Vec<StreamEvent>,

    ledger: L,
    registry: R,
    fee_oracle: F,
}

impl<L: Ledger, R: ClaimRegistry, F: FeeOracle> LockupEngine<L, R, F> {
    /// Create an engine with no streams.
    pub fn new(ledger: L, registry: R, fee_oracle: F) -> Self {
        LockupEngine {
            streams: HashMap::new(),
            next_stream_id: 1,
            fees: FeeAccrual::new(),
            events: Vec::new(),
            ledger,
            registry,
            fee_oracle,
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

    // ---------------------------------------------------------------------
    // Mutating operations
    // ---------------------------------------------------------------------

    /// Create a stream
    ///
    /// Validates the schedule, carves the protocol and broker fees out of the
    /// total amount, records the stream and its claim, then pulls the funding
    /// from the sender. The segment amounts must sum exactly to the net
    /// deposit (total minus fees).
    ///
    /// # Returns
    ///
    /// The id assigned to the new stream.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the sender, recipient, or broker account is null
    /// - the total amount or the net deposit is not positive
    /// - a fee rate is negative or above [`max_fee_rate`]
    /// - the schedule fails validation (ordering, bounds, exponents)
    /// - the segment amounts do not sum to the net deposit
    /// - a funding transfer fails (the creation is rolled back completely)
    pub fn create(&mut self, params: CreateParams) -> Result<StreamId, StreamError> {
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
        let id = self.next_stream_id;
        let protocol_fee = total_amount
            .checked_mul(protocol_rate)
            .ok_or_else(|| StreamError::arithmetic_overflow("protocol fee", id))?;

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
                    .ok_or_else(|| StreamError::arithmetic_overflow("broker fee", id))?;
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

        // Effects: the stream record, its claim, and the fee revenue are
        // committed before any ledger interaction.
        if protocol_fee > Decimal::ZERO {
            self.fees.record(id, &asset, protocol_fee)?;
        }
        self.streams.insert(
            id,
            Stream {
                id,
                sender,
                asset: asset.clone(),
                amounts: Amounts::new(deposit),
                start_time,
                segments: segments.clone(),
                is_cancelable: cancelable,
                was_canceled: false,
            },
        );
        self.registry.mint(id, recipient);
        self.next_stream_id += 1;

        // Interactions: pull the deposit plus the protocol fee, then route
        // the broker fee separately. Any failure undoes the creation and
        // returns what was already pulled.
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

        self.events.push(StreamEvent::Created {
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

    /// Create a stream from duration-specified segments
    ///
    /// Resolves the durations into absolute milestones (overflow-checked)
    /// and delegates to [`create`](Self::create). Any `segments` already in
    /// `params` are replaced.
    pub fn create_with_durations(
        &mut self,
        mut params: CreateParams,
        durations: &[SegmentDuration],
    ) -> Result<StreamId, StreamError> {
        params.segments = curve::segments_from_durations(params.start_time, durations)?;
        self.create(params)
    }

    /// Withdraw `amount` from a stream to the `to` account
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the stream does not exist or `to` is the null account
    /// - the stream is pending or depleted
    /// - the caller is neither the sender nor approved for the claim
    /// - the caller is the sender and `to` is not the recipient
    /// - the amount is zero or exceeds the withdrawable amount
    /// - the payout transfer fails (the withdrawal is rolled back)
    pub fn withdraw(
        &mut self,
        id: StreamId,
        caller: AccountId,
        to: AccountId,
        amount: Decimal,
        now: Timestamp,
    ) -> Result<(), StreamError> {
        let stream = self
            .streams
            .get(&id)
            .ok_or_else(|| StreamError::stream_not_found(id))?;

        // Checks.
        if to == NULL_ACCOUNT {
            return Err(StreamError::null_account("withdrawal destination"));
        }
        status::check_withdraw(stream, now)?;
        authorize_withdraw(&self.registry, stream, caller, to)?;
        if amount <= Decimal::ZERO {
            return Err(StreamError::WithdrawAmountZero { id });
        }
        let withdrawable = accounting::withdrawable_amount(stream, now);
        if amount > withdrawable {
            return Err(StreamError::overdraw(id, amount, withdrawable));
        }

        let asset = stream.asset.clone();
        let withdrawn = stream
            .amounts
            .withdrawn
            .checked_add(amount)
            .ok_or_else(|| StreamError::arithmetic_overflow("withdraw", id))?;

        // Effect before interaction.
        let Some(stream) = self.streams.get_mut(&id) else {
            return Err(StreamError::stream_not_found(id));
        };
        stream.amounts.withdrawn = withdrawn;

        if let Err(e) = self.ledger.push(to, &asset, amount) {
            // Accounting must not record an unpaid withdrawal.
            if let Some(stream) = self.streams.get_mut(&id) {
                stream.amounts.withdrawn -= amount;
            }
            return Err(e.into());
        }

        self.events.push(StreamEvent::Withdrawn { id, to, amount });
        Ok(())
    }

    /// Withdraw the entire withdrawable balance of a stream
    ///
    /// Convenience wrapper around [`withdraw`](Self::withdraw) with the
    /// current withdrawable amount; a stream with nothing withdrawable is
    /// rejected like any other zero withdrawal.
    ///
    /// # Returns
    ///
    /// The amount that was withdrawn.
    pub fn withdraw_max(
        &mut self,
        id: StreamId,
        caller: AccountId,
        to: AccountId,
        now: Timestamp,
    ) -> Result<Decimal, StreamError> {
        let stream = self
            .streams
            .get(&id)
            .ok_or_else(|| StreamError::stream_not_found(id))?;
        let amount = accounting::withdrawable_amount(stream, now);

        self.withdraw(id, caller, to, amount, now)?;
        Ok(amount)
    }

    /// Withdraw from several streams to one destination, all or nothing
    ///
    /// Every element is validated against a dry-run view (accounting for the
    /// amounts earlier elements will take) before any effect or transfer is
    /// applied, so a validation, authorization, state, or overdraw failure on
    /// any element leaves every stream untouched.
    ///
    /// # Errors
    ///
    /// Returns the first element's error; on [`StreamError::BatchLengthMismatch`]
    /// nothing is validated at all.
    pub fn withdraw_multiple(
        &mut self,
        ids: &[StreamId],
        caller: AccountId,
        to: AccountId,
        amounts: &[Decimal],
        now: Timestamp,
    ) -> Result<(), StreamError> {
        if ids.len() != amounts.len() {
            return Err(StreamError::BatchLengthMismatch {
                ids: ids.len(),
                amounts: amounts.len(),
            });
        }
        if to == NULL_ACCOUNT {
            return Err(StreamError::null_account("withdrawal destination"));
        }

        // Dry-run pass: no mutation, cumulative amounts per stream tracked so
        // repeated ids cannot overdraw together.
        let mut pending: HashMap<StreamId, Decimal> = HashMap::new();
        for (&id, &amount) in ids.iter().zip(amounts) {
            let stream = self
                .streams
                .get(&id)
                .ok_or_else(|| StreamError::stream_not_found(id))?;
            status::check_withdraw(stream, now)?;
            authorize_withdraw(&self.registry, stream, caller, to)?;
            if amount <= Decimal::ZERO {
                return Err(StreamError::WithdrawAmountZero { id });
            }
            let already = pending.get(&id).copied().unwrap_or(Decimal::ZERO);
            let withdrawable = accounting::withdrawable_amount(stream, now) - already;
            if amount > withdrawable {
                return Err(StreamError::overdraw(id, amount, withdrawable));
            }
            *pending.entry(id).or_insert(Decimal::ZERO) += amount;
        }

        // Commit pass: only a transfer failure can interrupt it.
        for (&id, &amount) in ids.iter().zip(amounts) {
            self.withdraw(id, caller, to, amount, now)?;
        }
        Ok(())
    }

    /// Cancel a stream
    ///
    /// Freezes the unlocked amount at `now`, flips the one-way canceled flag,
    /// and refunds the unstreamed remainder to the sender. Amounts already
    /// withdrawn are unaffected; whatever had unlocked stays withdrawable by
    /// the recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the stream does not exist
    /// - the stream is cold (settled, canceled, or depleted) or not cancelable
    /// - the caller is neither the sender nor the recipient
    /// - the refund transfer fails (the cancellation is rolled back)
    pub fn cancel(
        &mut self,
        id: StreamId,
        caller: AccountId,
        now: Timestamp,
    ) -> Result<(), StreamError> {
        let stream = self
            .streams
            .get(&id)
            .ok_or_else(|| StreamError::stream_not_found(id))?;

        status::check_cancel(stream, now)?;
        let recipient = self.registry.owner_of(id)?;
        if caller != stream.sender && caller != recipient {
            return Err(StreamError::unauthorized(caller, id, "cancel"));
        }

        let refundable = accounting::refundable_amount(stream, now);
        let sender = stream.sender;
        let asset = stream.asset.clone();

        // Effects: freeze the curve and flip the flags before the refund.
        let Some(stream) = self.streams.get_mut(&id) else {
            return Err(StreamError::stream_not_found(id));
        };
        stream.amounts.refunded = refundable;
        stream.was_canceled = true;
        stream.is_cancelable = false;

        if refundable > Decimal::ZERO {
            if let Err(e) = self.ledger.push(sender, &asset, refundable) {
                if let Some(stream) = self.streams.get_mut(&id) {
                    stream.amounts.refunded = Decimal::ZERO;
                    stream.was_canceled = false;
                    stream.is_cancelable = true;
                }
                return Err(e.into());
            }
        }

        self.events.push(StreamEvent::Canceled {
            id,
            sender,
            refunded: refundable,
        });
        Ok(())
    }

    /// Cancel several streams, all or nothing
    ///
    /// Every element is validated against a dry-run view before any stream is
    /// touched; a repeated id is reported as cold, exactly as the second
    /// cancellation would be.
    pub fn cancel_multiple(
        &mut self,
        ids: &[StreamId],
        caller: AccountId,
        now: Timestamp,
    ) -> Result<(), StreamError> {
        // Dry-run pass.
        let mut canceled_in_batch: HashSet<StreamId> = HashSet::new();
        for &id in ids {
            if canceled_in_batch.contains(&id) {
                return Err(StreamError::stream_cold(id, StreamStatus::Canceled));
            }
            let stream = self
                .streams
                .get(&id)
                .ok_or_else(|| StreamError::stream_not_found(id))?;
            status::check_cancel(stream, now)?;
            let recipient = self.registry.owner_of(id)?;
            if caller != stream.sender && caller != recipient {
                return Err(StreamError::unauthorized(caller, id, "cancel"));
            }
            canceled_in_batch.insert(id);
        }

        // Commit pass.
        for &id in ids {
            self.cancel(id, caller, now)?;
        }
        Ok(())
    }

    /// Irrevocably make a stream non-cancelable
    ///
    /// Sender only; no funds move. The same cold gate as cancel applies, and
    /// renouncing an already non-cancelable stream is an error.
    pub fn renounce(
        &mut self,
        id: StreamId,
        caller: AccountId,
        now: Timestamp,
    ) -> Result<(), StreamError> {
        let stream = self
            .streams
            .get(&id)
            .ok_or_else(|| StreamError::stream_not_found(id))?;

        if caller != stream.sender {
            return Err(StreamError::unauthorized(caller, id, "renounce"));
        }
        status::check_renounce(stream, now)?;

        let Some(stream) = self.streams.get_mut(&id) else {
            return Err(StreamError::stream_not_found(id));
        };
        stream.is_cancelable = false;

        self.events.push(StreamEvent::Renounced { id });
        Ok(())
    }

    /// Destroy the claim of a depleted stream
    ///
    /// The stream record itself survives and stays queryable; only the claim
    /// disappears from the registry. The caller must own or be approved for
    /// the claim.
    pub fn burn(
        &mut self,
        id: StreamId,
        caller: AccountId,
        now: Timestamp,
    ) -> Result<(), StreamError> {
        let stream = self
            .streams
            .get(&id)
            .ok_or_else(|| StreamError::stream_not_found(id))?;

        status::check_burn(stream, now)?;
        if !self.registry.is_approved_or_owner(caller, id)? {
            return Err(StreamError::unauthorized(caller, id, "burn"));
        }

        self.registry.burn(id)?;
        self.events.push(StreamEvent::Burned { id });
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Whether a stream was ever created with this id.
    pub fn is_stream(&self, id: StreamId) -> bool {
        self.streams.contains_key(&id)
    }

    /// The stream record.
    pub fn get_stream(&self, id: StreamId) -> Result<&Stream, StreamError> {
        self.streams
            .get(&id)
            .ok_or_else(|| StreamError::stream_not_found(id))
    }

    /// The stream's status at `now`.
    pub fn status_of(&self, id: StreamId, now: Timestamp) -> Result<StreamStatus, StreamError> {
        Ok(status::status_of(self.get_stream(id)?, now))
    }

    /// Whether the stream was canceled.
    pub fn was_canceled(&self, id: StreamId) -> Result<bool, StreamError> {
        Ok(self.get_stream(id)?.was_canceled)
    }

    /// Whether the stream has paid out everything it ever will.
    pub fn is_depleted(&self, id: StreamId) -> Result<bool, StreamError> {
        Ok(status::is_depleted(self.get_stream(id)?))
    }

    /// Total amount the schedule has made available at `now`.
    pub fn streamed_amount_of(&self, id: StreamId, now: Timestamp) -> Result<Decimal, StreamError> {
        Ok(accounting::streamed_amount(self.get_stream(id)?, now))
    }

    /// Amount the recipient can withdraw at `now`.
    pub fn withdrawable_amount_of(
        &self,
        id: StreamId,
        now: Timestamp,
    ) -> Result<Decimal, StreamError> {
        Ok(accounting::withdrawable_amount(self.get_stream(id)?, now))
    }

    /// Amount the sender would get back by canceling at `now`.
    pub fn refundable_amount_of(
        &self,
        id: StreamId,
        now: Timestamp,
    ) -> Result<Decimal, StreamError> {
        Ok(accounting::refundable_amount(self.get_stream(id)?, now))
    }

    /// Current owner of the stream's claim.
    pub fn get_recipient(&self, id: StreamId) -> Result<AccountId, StreamError> {
        self.get_stream(id)?;
        self.registry.owner_of(id)
    }

    /// The stream's sender.
    pub fn get_sender(&self, id: StreamId) -> Result<AccountId, StreamError> {
        Ok(self.get_stream(id)?.sender)
    }

    /// The stream's resolved schedule.
    pub fn get_segments(&self, id: StreamId) -> Result<&[Segment], StreamError> {
        Ok(&self.get_stream(id)?.segments)
    }

    /// Accrued protocol revenue for an asset.
    pub fn protocol_revenue(&self, asset: &str) -> Decimal {
        self.fees.revenue_of(asset)
    }

    /// All streams, sorted by id for deterministic output.
    pub fn all_streams(&self) -> Vec<&Stream> {
        let mut streams: Vec<&Stream> = self.streams.values().collect();
        streams.sort_by_key(|stream| stream.id);
        streams
    }

    /// Drain the events recorded since the last drain.
    pub fn take_events(&mut self) -> Vec<StreamEvent> {
        std::mem::take(&mut self.events)
    }

    // ---------------------------------------------------------------------
    // Internal helpers
    // ---------------------------------------------------------------------

    /// Undo the effects of a creation whose funding transfer failed.
    fn rollback_create(&mut self, id: StreamId, asset: &str, protocol_fee: Decimal) {
        self.streams.remove(&id);
        let _ = self.registry.burn(id);
        if protocol_fee > Decimal::ZERO {
            self.fees.deduct(asset, protocol_fee);
        }
        self.next_stream_id -= 1;
    }
}

/// Withdrawal authorization shared by the single, batch, and concurrent paths
///
/// Owners and approved accounts may send anywhere; the sender may only pay
/// the recipient; everyone else is rejected.
pub(crate) fn authorize_withdraw<R: ClaimRegistry>(
    registry: &R,
    stream: &Stream,
    caller: AccountId,
    to: AccountId,
) -> Result<(), StreamError> {
    if registry.is_approved_or_owner(caller, stream.id)? {
        return Ok(());
    }
    if caller == stream.sender {
        let recipient = registry.owner_of(stream.id)?;
        if to != recipient {
            return Err(StreamError::WithdrawalDestinationNotRecipient {
                id: stream.id,
                to,
                recipient,
            });
        }
        return Ok(());
    }
    Err(StreamError::unauthorized(caller, stream.id, "withdraw"))
}

/// Engine wired to the in-memory collaborators
pub type InMemoryLockupEngine = LockupEngine<InMemoryLedger, InMemoryRegistry, FlatFeeOracle>;

impl InMemoryLockupEngine {
    /// Build an engine backed by the in-memory ledger and registry, with a
    /// flat protocol fee.
    pub fn in_memory(fee_rate: Decimal) -> Self {
        LockupEngine::new(
            InMemoryLedger::new(),
            InMemoryRegistry::new(),
            FlatFeeOracle::new(fee_rate),
        )
    }

    /// Apply a single operation-log record
    ///
    /// Routes the record to the matching engine operation. `fund` credits the
    /// in-memory ledger directly and never touches a stream.
    pub fn process_operation(&mut self, record: OperationRecord) -> Result<(), StreamError> {
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
