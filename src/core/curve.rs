//! Dynamic unlock-schedule evaluation
//!
//! This module implements the segmented curve calculator: creation-time
//! schedule validation and the piecewise-exponential interpolation that
//! computes the cumulative unlocked amount at a query instant.
//!
//! # Numeric Policy
//!
//! All curve math runs on `Decimal`. Within a segment the elapsed fraction is
//! always in `[0, 1)` and exponents are validated into `[0, MAX]` at creation,
//! so the power term stays in `[0, 1]` and cannot overflow. Integer exponents
//! are raised with exact repeated multiplication (`checked_powu`); fractional
//! exponents go through `checked_powd`. Division by a zero-length segment can
//! never occur: validation rejects any milestone that is not strictly after
//! its predecessor.

use crate::types::{Segment, SegmentDuration, StreamError, Timestamp};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps};

/// Upper bound on the number of segments in one schedule
///
/// Caps the per-query evaluation loop; schedules beyond this are rejected at
/// creation.
pub const MAX_SEGMENT_COUNT: usize = 300;

/// Upper bound on a segment's curve exponent.
pub fn max_segment_exponent() -> Decimal {
    Decimal::TEN
}

/// Validate a schedule and return the sum of its segment amounts
///
/// Performed once at creation, never on queries. Checks, in order:
///
/// 1. the schedule is non-empty and within [`MAX_SEGMENT_COUNT`];
/// 2. the start time is strictly before the first milestone;
/// 3. every amount is non-negative and every exponent is within
///    `[0, max_segment_exponent()]`;
/// 4. milestones are strictly increasing;
/// 5. the amount sum does not overflow.
///
/// # Errors
///
/// Returns the specific validation error for the first violated rule,
/// identifying the offending segment index where one exists. A milestone
/// collision caused by a zero-length duration reports both milestones as
/// equal.
pub fn validate_segments(
    start_time: Timestamp,
    segments: &[Segment],
) -> Result<Decimal, StreamError> {
    if segments.is_empty() {
        return Err(StreamError::SegmentCountZero);
    }
    if segments.len() > MAX_SEGMENT_COUNT {
        return Err(StreamError::SegmentCountTooHigh {
            count: segments.len(),
            max: MAX_SEGMENT_COUNT,
        });
    }

    let first_milestone = segments[0].milestone;
    if start_time >= first_milestone {
        return Err(StreamError::StartTimeNotBeforeFirstMilestone {
            start_time,
            first_milestone,
        });
    }

    let max_exponent = max_segment_exponent();
    let mut previous_milestone = first_milestone;
    let mut sum = Decimal::ZERO;

    for (index, segment) in segments.iter().enumerate() {
        if segment.amount.is_sign_negative() {
            return Err(StreamError::SegmentAmountNegative {
                index,
                amount: segment.amount,
            });
        }
        if segment.exponent.is_sign_negative() {
            return Err(StreamError::SegmentExponentNegative {
                index,
                exponent: segment.exponent,
            });
        }
        if segment.exponent > max_exponent {
            return Err(StreamError::SegmentExponentTooHigh {
                index,
                exponent: segment.exponent,
                max: max_exponent,
            });
        }

        // The first segment's ordering against start_time is already checked.
        if index > 0 && segment.milestone <= previous_milestone {
            return Err(StreamError::SegmentMilestonesNotOrdered {
                index,
                previous: previous_milestone,
                current: segment.milestone,
            });
        }
        previous_milestone = segment.milestone;

        sum = sum
            .checked_add(segment.amount)
            .ok_or(StreamError::SegmentAmountsSumOverflow)?;
    }

    Ok(sum)
}

/// Resolve duration-specified segments into absolute milestones
///
/// Milestones are the cumulative sum of durations on top of the start time,
/// checked against the timestamp range. A zero duration is not rejected here:
/// it produces a milestone equal to its predecessor, which
/// [`validate_segments`] then reports as a collision of two equal milestones.
///
/// # Errors
///
/// Returns [`StreamError::MilestoneOverflow`] with the offending index if the
/// cumulative sum leaves the timestamp range.
pub fn segments_from_durations(
    start_time: Timestamp,
    durations: &[SegmentDuration],
) -> Result<Vec<Segment>, StreamError> {
    let mut segments = Vec::with_capacity(durations.len());
    let mut milestone = start_time;

    for (index, duration) in durations.iter().enumerate() {
        milestone = milestone
            .checked_add(duration.duration)
            .ok_or(StreamError::MilestoneOverflow { index })?;
        segments.push(Segment {
            amount: duration.amount,
            exponent: duration.exponent,
            milestone,
        });
    }

    Ok(segments)
}

/// Cumulative unlocked amount of a validated schedule at `now`
///
/// Monotonically non-decreasing in `now`; zero at or before the start time;
/// the full segment sum at or after the last milestone. In between, the
/// segment containing `now` contributes
/// `fraction^exponent * segment.amount` on top of all prior segments, where
/// `fraction` is the elapsed share of the segment's time range.
pub fn unlocked_amount(segments: &[Segment], start_time: Timestamp, now: Timestamp) -> Decimal {
    if now <= start_time {
        return Decimal::ZERO;
    }

    let total: Decimal = segments.iter().map(|s| s.amount).sum();
    match segments.last() {
        Some(last) if now < last.milestone => {}
        _ => return total,
    }

    let mut cumulative = Decimal::ZERO;
    let mut previous_milestone = start_time;

    for segment in segments {
        if now < segment.milestone {
            let elapsed = Decimal::from(now - previous_milestone);
            // Never zero: validation guarantees strictly increasing milestones.
            let span = Decimal::from(segment.milestone - previous_milestone);
            let fraction = elapsed / span;
            let rise = apply_exponent(fraction, segment.exponent) * segment.amount;
            let unlocked = cumulative + rise;

            // The unlocked amount never exceeds the schedule total, even if
            // the power evaluation misbehaves.
            return if unlocked > total { total } else { unlocked };
        }
        cumulative += segment.amount;
        previous_milestone = segment.milestone;
    }

    total
}

/// Raise an elapsed fraction to a segment exponent
///
/// Exponent 1 passes through untouched and integer exponents use exact
/// repeated multiplication, so linear and polynomial segments carry no
/// transcendental rounding. A failed power contributes nothing; the unlocked
/// amount never exceeds the schedule.
fn apply_exponent(fraction: Decimal, exponent: Decimal) -> Decimal {
    if exponent == Decimal::ONE {
        return fraction;
    }
    if exponent.is_integer() {
        if let Some(exp) = exponent.to_u64() {
            return fraction.checked_powu(exp).unwrap_or(Decimal::ZERO);
        }
    }
    fraction.checked_powd(exponent).unwrap_or(Decimal::ZERO)
}
