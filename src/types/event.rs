//! Structured events emitted by the engine
//!
//! Every mutating operation appends one event. Callers drain events after a
//! call; the engine never logs directly.

use crate::types::stream::{AccountId, AssetId, Segment, StreamId, Timestamp};
use rust_decimal::Decimal;

/// Record of a mutating engine operation
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A stream was created; carries the fully resolved schedule
    Created {
        id: StreamId,
        sender: AccountId,
        recipient: AccountId,
        asset: AssetId,
        deposited: Decimal,
        protocol_fee: Decimal,
        broker_fee: Decimal,
        start_time: Timestamp,
        cancelable: bool,
        segments: Vec<Segment>,
    },

    /// Funds were paid out of a stream
    Withdrawn {
        id: StreamId,
        to: AccountId,
        amount: Decimal,
    },

    /// A stream was canceled and the unstreamed remainder refunded
    Canceled {
        id: StreamId,
        sender: AccountId,
        refunded: Decimal,
    },

    /// A stream was irrevocably made non-cancelable
    Renounced { id: StreamId },

    /// A depleted stream's claim was destroyed
    Burned { id: StreamId },
}
