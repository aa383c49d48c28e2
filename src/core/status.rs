//! Stream lifecycle status derivation and operation gating
//!
//! Status is never stored. It is recomputed on every query from the stream
//! record and the supplied instant, which makes state desynchronization
//! impossible by construction. Precedence when several conditions hold:
//! Depleted is checked first (fully paid out beats everything), then
//! Canceled, then the time-based states.

use crate::core::curve;
use crate::types::{Stream, StreamError, StreamStatus, Timestamp};

/// Whether the stream has paid out everything it ever will
///
/// Time-independent: depletion is a comparison between the withdrawn amount
/// and the stream's withdrawable cap (the deposit, or the frozen unlocked
/// amount for canceled streams).
pub fn is_depleted(stream: &Stream) -> bool {
    stream.amounts.withdrawn == stream.withdrawable_cap()
}

/// Derive the stream's status at `now`.
pub fn status_of(stream: &Stream, now: Timestamp) -> StreamStatus {
    if is_depleted(stream) {
        return StreamStatus::Depleted;
    }
    if stream.was_canceled {
        return StreamStatus::Canceled;
    }
    if now < stream.start_time {
        return StreamStatus::Pending;
    }

    let streamed = curve::unlocked_amount(&stream.segments, stream.start_time, now);
    if streamed < stream.amounts.deposited {
        StreamStatus::Streaming
    } else {
        StreamStatus::Settled
    }
}

/// Gate for withdraw: illegal on pending and depleted streams.
pub fn check_withdraw(stream: &Stream, now: Timestamp) -> Result<(), StreamError> {
    match status_of(stream, now) {
        StreamStatus::Pending => Err(StreamError::StreamPending { id: stream.id }),
        StreamStatus::Depleted => Err(StreamError::StreamDepleted { id: stream.id }),
        _ => Ok(()),
    }
}

/// Gate for cancel: illegal on cold streams and non-cancelable streams.
pub fn check_cancel(stream: &Stream, now: Timestamp) -> Result<(), StreamError> {
    let status = status_of(stream, now);
    if status.is_cold() {
        return Err(StreamError::stream_cold(stream.id, status));
    }
    if !stream.is_cancelable {
        return Err(StreamError::StreamNotCancelable { id: stream.id });
    }
    Ok(())
}

/// Gate for renounce: same cold gate as cancel; renouncing twice is an error.
pub fn check_renounce(stream: &Stream, now: Timestamp) -> Result<(), StreamError> {
    let status = status_of(stream, now);
    if status.is_cold() {
        return Err(StreamError::stream_cold(stream.id, status));
    }
    if !stream.is_cancelable {
        return Err(StreamError::StreamAlreadyNonCancelable { id: stream.id });
    }
    Ok(())
}

/// Gate for burn: legal only once the stream is depleted.
pub fn check_burn(stream: &Stream, now: Timestamp) -> Result<(), StreamError> {
    let status = status_of(stream, now);
    if status != StreamStatus::Depleted {
        return Err(StreamError::StreamNotDepleted {
            id: stream.id,
            status,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Amounts, Segment};
    use rstest::rstest;
    use rust_decimal::Decimal;

    /// Stream of 1000 units over a single linear segment from t=0 to t=100.
    fn sample_stream() -> Stream {
        Stream {
            id: 1,
            sender: 10,
            asset: "USDC".to_string(),
            amounts: Amounts::new(Decimal::new(1000, 0)),
            start_time: 0,
            segments: vec![Segment {
                amount: Decimal::new(1000, 0),
                exponent: Decimal::ONE,
                milestone: 100,
            }],
            is_cancelable: true,
            was_canceled: false,
        }
    }

    fn pending_stream() -> Stream {
        let mut stream = sample_stream();
        stream.start_time = 50;
        stream.segments[0].milestone = 150;
        stream
    }

    #[test]
    fn test_status_pending_before_start() {
        let stream = pending_stream();
        assert_eq!(status_of(&stream, 10), StreamStatus::Pending);
    }

    #[test]
    fn test_status_streaming_midway() {
        let stream = sample_stream();
        assert_eq!(status_of(&stream, 50), StreamStatus::Streaming);
    }

    #[test]
    fn test_status_settled_at_end() {
        let stream = sample_stream();
        assert_eq!(status_of(&stream, 100), StreamStatus::Settled);
        assert_eq!(status_of(&stream, 100_000), StreamStatus::Settled);
    }

    #[test]
    fn test_status_canceled_overrides_time() {
        let mut stream = sample_stream();
        stream.was_canceled = true;
        stream.is_cancelable = false;
        stream.amounts.refunded = Decimal::new(700, 0);

        assert_eq!(status_of(&stream, 10), StreamStatus::Canceled);
        assert_eq!(status_of(&stream, 100_000), StreamStatus::Canceled);
    }

    #[test]
    fn test_status_depleted_overrides_cancellation() {
        let mut stream = sample_stream();
        stream.was_canceled = true;
        stream.is_cancelable = false;
        stream.amounts.refunded = Decimal::new(700, 0);
        stream.amounts.withdrawn = Decimal::new(300, 0);

        assert_eq!(status_of(&stream, 35), StreamStatus::Depleted);
    }

    #[test]
    fn test_status_depleted_when_fully_withdrawn() {
        let mut stream = sample_stream();
        stream.amounts.withdrawn = Decimal::new(1000, 0);

        // Fully paid out takes priority over any time-based state.
        assert_eq!(status_of(&stream, 100_000), StreamStatus::Depleted);
    }

    #[test]
    fn test_depletion_is_one_way_across_time() {
        let mut stream = sample_stream();
        stream.amounts.withdrawn = Decimal::new(1000, 0);

        for now in [0, 50, 100, 1_000_000] {
            assert_eq!(status_of(&stream, now), StreamStatus::Depleted);
        }
    }

    #[test]
    fn test_check_withdraw_rejects_pending() {
        let stream = pending_stream();
        assert_eq!(
            check_withdraw(&stream, 10),
            Err(StreamError::StreamPending { id: 1 })
        );
    }

    #[test]
    fn test_check_withdraw_rejects_depleted() {
        let mut stream = sample_stream();
        stream.amounts.withdrawn = Decimal::new(1000, 0);
        assert_eq!(
            check_withdraw(&stream, 200),
            Err(StreamError::StreamDepleted { id: 1 })
        );
    }

    #[rstest]
    #[case::streaming(50)]
    #[case::settled(200)]
    fn test_check_withdraw_allows_streaming_and_settled(#[case] now: Timestamp) {
        let stream = sample_stream();
        assert!(check_withdraw(&stream, now).is_ok());
    }

    #[test]
    fn test_check_cancel_allows_warm_stream() {
        let stream = sample_stream();
        assert!(check_cancel(&stream, 50).is_ok());
        assert!(check_cancel(&stream, 0).is_ok());
    }

    #[rstest]
    #[case::settled(200, StreamStatus::Settled)]
    fn test_check_cancel_rejects_cold_stream(
        #[case] now: Timestamp,
        #[case] expected_status: StreamStatus,
    ) {
        let stream = sample_stream();
        assert_eq!(
            check_cancel(&stream, now),
            Err(StreamError::StreamCold {
                id: 1,
                status: expected_status
            })
        );
    }

    #[test]
    fn test_check_cancel_rejects_canceled_stream() {
        let mut stream = sample_stream();
        stream.was_canceled = true;
        stream.is_cancelable = false;
        stream.amounts.refunded = Decimal::new(700, 0);

        assert_eq!(
            check_cancel(&stream, 40),
            Err(StreamError::StreamCold {
                id: 1,
                status: StreamStatus::Canceled
            })
        );
    }

    #[test]
    fn test_check_cancel_rejects_non_cancelable_stream() {
        let mut stream = sample_stream();
        stream.is_cancelable = false;

        assert_eq!(
            check_cancel(&stream, 50),
            Err(StreamError::StreamNotCancelable { id: 1 })
        );
    }

    #[test]
    fn test_check_renounce_rejects_repeat() {
        let mut stream = sample_stream();
        stream.is_cancelable = false;

        assert_eq!(
            check_renounce(&stream, 50),
            Err(StreamError::StreamAlreadyNonCancelable { id: 1 })
        );
    }

    #[test]
    fn test_check_burn_requires_depleted() {
        let stream = sample_stream();
        assert_eq!(
            check_burn(&stream, 50),
            Err(StreamError::StreamNotDepleted {
                id: 1,
                status: StreamStatus::Streaming
            })
        );

        let mut depleted = sample_stream();
        depleted.amounts.withdrawn = Decimal::new(1000, 0);
        assert!(check_burn(&depleted, 50).is_ok());
    }
}
