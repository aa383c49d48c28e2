//! Amount accounting shared by every streaming model
//!
//! Pure functions over a stream record and a query instant; no external
//! calls. The guarantees these functions maintain:
//!
//! - `withdrawable_amount` is never negative;
//! - `withdrawn + withdrawable + refundable` never exceeds the deposit;
//! - once canceled, the streamed amount is frozen at the cancellation
//!   instant (`deposited - refunded`) and no longer follows the clock.

use crate::core::{curve, status};
use crate::types::{Stream, Timestamp};
use rust_decimal::Decimal;

/// Total amount the schedule has made available to the recipient at `now`
///
/// Terminal states are handled first: a depleted stream has streamed exactly
/// what was withdrawn, and a canceled stream is frozen at the unlocked amount
/// captured when it was canceled.
pub fn streamed_amount(stream: &Stream, now: Timestamp) -> Decimal {
    if status::is_depleted(stream) {
        return stream.amounts.withdrawn;
    }
    if stream.was_canceled {
        return stream.amounts.deposited - stream.amounts.refunded;
    }

    curve::unlocked_amount(&stream.segments, stream.start_time, now)
}

/// Amount the recipient can withdraw right now.
pub fn withdrawable_amount(stream: &Stream, now: Timestamp) -> Decimal {
    streamed_amount(stream, now).saturating_sub(stream.amounts.withdrawn)
}

/// Amount the sender would get back by canceling at `now`
///
/// Zero for non-cancelable, canceled, or depleted streams; canceled streams
/// already had their refund paid.
pub fn refundable_amount(stream: &Stream, now: Timestamp) -> Decimal {
    // `is_cancelable` is cleared by cancel, so this also excludes canceled
    // streams.
    if stream.is_cancelable && !status::is_depleted(stream) {
        return stream
            .amounts
            .deposited
            .saturating_sub(streamed_amount(stream, now));
    }

    Decimal::ZERO
}
