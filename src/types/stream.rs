//! Stream-related types for the Rust Streaming Engine
//!
//! This module defines the Stream entity, its amount bookkeeping, the segment
//! types that describe a dynamic unlock schedule, and the derived lifecycle
//! status.

use rust_decimal::Decimal;

/// Stream identifier
///
/// Assigned sequentially by the engine, starting at 1. Never reused.
pub type StreamId = u64;

/// Account identifier for senders, recipients, brokers, and funders
///
/// Account 0 is reserved as the null account and is rejected wherever an
/// account is required.
pub type AccountId = u64;

/// The reserved null account
pub const NULL_ACCOUNT: AccountId = 0;

/// Asset identifier (e.g. a token symbol)
pub type AssetId = String;

/// Timestamp in seconds
pub type Timestamp = u64;

/// Derived lifecycle status of a stream
///
/// Status is always recomputed from the stream record and the query instant;
/// it is never stored. Precedence when several conditions hold:
/// Depleted first, then Canceled, then the time-based states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    /// The query instant is before the start time; nothing has unlocked yet
    Pending,

    /// Assets are unlocking; the schedule has started and is not exhausted
    Streaming,

    /// The schedule has run out; the entire deposit is unlockable
    Settled,

    /// The stream was canceled; the unlocked amount is frozen at the
    /// cancellation instant
    Canceled,

    /// Everything that will ever be withdrawable has been withdrawn
    Depleted,
}

impl StreamStatus {
    /// A cold stream admits no further cancellation or renouncement.
    pub fn is_cold(&self) -> bool {
        matches!(
            self,
            StreamStatus::Settled | StreamStatus::Canceled | StreamStatus::Depleted
        )
    }
}

impl std::fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StreamStatus::Pending => "pending",
            StreamStatus::Streaming => "streaming",
            StreamStatus::Settled => "settled",
            StreamStatus::Canceled => "canceled",
            StreamStatus::Depleted => "depleted",
        };
        write!(f, "{}", name)
    }
}

/// A piece of a dynamic unlock schedule
///
/// Each segment unlocks `amount` over the range ending at `milestone`,
/// shaped by `exponent`: 1 is linear, larger values back-load the unlock
/// toward the milestone, values below 1 front-load it.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Amount unlocked by this segment
    pub amount: Decimal,

    /// Curve exponent applied to the elapsed fraction within the segment
    pub exponent: Decimal,

    /// Absolute end time of the segment; the last segment's milestone is the
    /// stream's end time
    pub milestone: Timestamp,
}

/// A segment specified by a relative duration instead of an absolute milestone
///
/// Resolved into [`Segment`]s by accumulating durations onto the start time.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentDuration {
    /// Amount unlocked by this segment
    pub amount: Decimal,

    /// Curve exponent applied to the elapsed fraction within the segment
    pub exponent: Decimal,

    /// Length of the segment in seconds
    pub duration: u64,
}

/// Amount bookkeeping for a stream
///
/// `deposited` is fixed at creation. `withdrawn` only ever grows. `refunded`
/// is zero until cancellation, at which point it is set once and never
/// changes again.
#[derive(Debug, Clone, PartialEq)]
pub struct Amounts {
    /// Net deposit available for streaming, fixed at creation
    pub deposited: Decimal,

    /// Cumulative amount already paid out to the recipient
    pub withdrawn: Decimal,

    /// Amount returned to the sender upon cancellation
    pub refunded: Decimal,
}

impl Amounts {
    /// Bookkeeping for a freshly created stream: the full deposit, nothing
    /// withdrawn, nothing refunded.
    pub fn new(deposited: Decimal) -> Self {
        Amounts {
            deposited,
            withdrawn: Decimal::ZERO,
            refunded: Decimal::ZERO,
        }
    }
}

/// A single vesting stream
///
/// The recipient is deliberately absent: it is whoever owns the stream's
/// claim in the registry, resolved on every operation. Stream records are
/// never deleted; a depleted or canceled stream remains queryable forever.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    /// Unique, monotonically assigned identifier
    pub id: StreamId,

    /// The payer; fixed at creation
    pub sender: AccountId,

    /// The streamed asset; fixed at creation
    pub asset: AssetId,

    /// Amount bookkeeping (deposited / withdrawn / refunded)
    pub amounts: Amounts,

    /// Unlocking begins at this instant
    pub start_time: Timestamp,

    /// Ordered schedule; milestones are strictly increasing and the first is
    /// strictly after `start_time`
    pub segments: Vec<Segment>,

    /// Whether the sender may still cancel; fixed at creation, cleared by
    /// cancel and renounce
    pub is_cancelable: bool,

    /// One-way flag: set by cancel, never reset
    pub was_canceled: bool,
}

impl Stream {
    /// The stream's end time: the last segment's milestone.
    pub fn end_time(&self) -> Timestamp {
        // Creation guarantees at least one segment.
        self.segments
            .last()
            .map(|s| s.milestone)
            .unwrap_or(self.start_time)
    }

    /// The largest amount this stream will ever pay out to its recipient.
    ///
    /// For a live stream that is the full deposit; after cancellation it is
    /// frozen at whatever had unlocked when the stream was canceled.
    pub fn withdrawable_cap(&self) -> Decimal {
        if self.was_canceled {
            self.amounts.deposited - self.amounts.refunded
        } else {
            self.amounts.deposited
        }
    }
}

/// Broker taking a creation-time cut of the deposit
#[derive(Debug, Clone, PartialEq)]
pub struct Broker {
    /// Account receiving the broker fee
    pub account: AccountId,

    /// Fraction of the total amount taken as the broker fee
    pub fee_rate: Decimal,
}

/// Parameters for creating a stream
///
/// `total_amount` is what the funder pays in full; the protocol fee and the
/// optional broker fee are carved out of it and the remainder is the net
/// deposit, which the segment amounts must sum to exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateParams {
    /// The payer, who funds the stream
    pub sender: AccountId,

    /// Initial owner of the stream's claim
    pub recipient: AccountId,

    /// The streamed asset
    pub asset: AssetId,

    /// Gross amount charged to the sender (net deposit + fees)
    pub total_amount: Decimal,

    /// Unlocking begins at this instant
    pub start_time: Timestamp,

    /// Whether the sender may cancel the stream later
    pub cancelable: bool,

    /// The unlock schedule, ordered by milestone
    pub segments: Vec<Segment>,

    /// Optional broker taking a cut of the total amount
    pub broker: Option<Broker>,
}
