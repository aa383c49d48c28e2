//! CSV format handling for operation records and stream-state output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRecord structure for deserialization
//! - Conversion from CSV records to domain types (including the segment
//!   schedule encoding)
//! - Stream-state output serialization
//!
//! All functions are pure (no I/O) for easy testing.
//!
//! # Operation Log Format
//!
//! Columns: `op,time,stream,account,to,asset,amount,start,cancelable,segments`.
//! Each operation uses a subset; unused fields stay empty. Segments are
//! encoded `amount:exponent:milestone` joined with `|`, e.g.
//! `400:1:40|600:2:100`.

use crate::core::status;
use crate::types::{
    AccountId, AssetId, OperationRecord, OperationType, Segment, Stream, StreamId, StreamStatus,
    Timestamp,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// CSV record structure for deserialization
///
/// Matches the operation-log format. Everything beyond `op`, `time`, and
/// `account` is optional because each operation uses a different subset;
/// amounts and flags arrive as strings so malformed values can be reported
/// per record instead of failing the row outright.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvRecord {
    pub op: String,
    pub time: Timestamp,
    #[serde(default)]
    pub stream: Option<StreamId>,
    pub account: AccountId,
    #[serde(default)]
    pub to: Option<AccountId>,
    #[serde(default)]
    pub asset: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub start: Option<Timestamp>,
    #[serde(default)]
    pub cancelable: Option<String>,
    #[serde(default)]
    pub segments: Option<String>,
}

/// Convert a CsvRecord to an OperationRecord
///
/// This function:
/// - parses the operation name into an OperationType
/// - parses the amount into a Decimal (rejecting negatives)
/// - parses the cancelable flag and the segment schedule
/// - validates that the fields the operation requires are present
///
/// # Returns
///
/// Result containing either:
/// - Ok(OperationRecord) - Successfully converted record
/// - Err(String) - Error message describing the conversion failure
pub fn convert_operation_record(csv_record: CsvRecord) -> Result<OperationRecord, String> {
    let op = match csv_record.op.to_lowercase().as_str() {
        "fund" => OperationType::Fund,
        "create" => OperationType::Create,
        "withdraw" => OperationType::Withdraw,
        "withdraw_max" => OperationType::WithdrawMax,
        "cancel" => OperationType::Cancel,
        "renounce" => OperationType::Renounce,
        "burn" => OperationType::Burn,
        _ => return Err(format!("Invalid operation type: '{}'", csv_record.op)),
    };

    // Parse amount if present
    let amount = match &csv_record.amount {
        Some(amount_str) if !amount_str.trim().is_empty() => {
            let amount = Decimal::from_str(amount_str.trim())
                .map_err(|_| format!("Invalid amount '{}'", amount_str))?;
            if amount.is_sign_negative() {
                return Err(format!("Negative amount '{}'", amount_str));
            }
            Some(amount)
        }
        _ => None,
    };

    // Parse cancelable flag if present
    let cancelable = match &csv_record.cancelable {
        Some(flag) if !flag.trim().is_empty() => match flag.trim().to_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => return Err(format!("Invalid cancelable flag '{}'", flag)),
        },
        _ => None,
    };

    // Parse segment schedule if present
    let segments = match &csv_record.segments {
        Some(encoded) if !encoded.trim().is_empty() => Some(parse_segments(encoded.trim())?),
        _ => None,
    };

    // Validate field presence based on operation type
    let missing = |field: &str| {
        format!(
            "{} operation at time {} requires a {} field",
            csv_record.op, csv_record.time, field
        )
    };
    match op {
        OperationType::Fund => {
            if csv_record.asset.is_none() {
                return Err(missing("asset"));
            }
            if amount.is_none() {
                return Err(missing("amount"));
            }
        }
        OperationType::Create => {
            if csv_record.to.is_none() {
                return Err(missing("to"));
            }
            if csv_record.asset.is_none() {
                return Err(missing("asset"));
            }
            if amount.is_none() {
                return Err(missing("amount"));
            }
            if csv_record.start.is_none() {
                return Err(missing("start"));
            }
            if segments.is_none() {
                return Err(missing("segments"));
            }
        }
        OperationType::Withdraw => {
            if csv_record.stream.is_none() {
                return Err(missing("stream"));
            }
            if csv_record.to.is_none() {
                return Err(missing("to"));
            }
            if amount.is_none() {
                return Err(missing("amount"));
            }
        }
        OperationType::WithdrawMax => {
            if csv_record.stream.is_none() {
                return Err(missing("stream"));
            }
            if csv_record.to.is_none() {
                return Err(missing("to"));
            }
        }
        OperationType::Cancel | OperationType::Renounce | OperationType::Burn => {
            if csv_record.stream.is_none() {
                return Err(missing("stream"));
            }
        }
    }

    Ok(OperationRecord {
        op,
        time: csv_record.time,
        stream: csv_record.stream,
        account: csv_record.account,
        to: csv_record.to,
        asset: csv_record.asset,
        amount,
        start_time: csv_record.start,
        cancelable,
        segments,
    })
}

/// Parse a `amount:exponent:milestone|...` schedule encoding.
pub fn parse_segments(encoded: &str) -> Result<Vec<Segment>, String> {
    encoded
        .split('|')
        .map(|part| {
            let fields: Vec<&str> = part.split(':').collect();
            if fields.len() != 3 {
                return Err(format!(
                    "Invalid segment '{}': expected amount:exponent:milestone",
                    part
                ));
            }
            let amount = Decimal::from_str(fields[0].trim())
                .map_err(|_| format!("Invalid segment amount '{}'", fields[0]))?;
            let exponent = Decimal::from_str(fields[1].trim())
                .map_err(|_| format!("Invalid segment exponent '{}'", fields[1]))?;
            let milestone = fields[2]
                .trim()
                .parse::<Timestamp>()
                .map_err(|_| format!("Invalid segment milestone '{}'", fields[2]))?;
            Ok(Segment {
                amount,
                exponent,
                milestone,
            })
        })
        .collect()
}

/// One output row: a stream's final state
#[derive(Debug, Clone, PartialEq)]
pub struct StreamStateRow {
    pub stream: StreamId,
    pub sender: AccountId,
    /// The claim owner, or the null account if the claim was burned
    pub recipient: AccountId,
    pub asset: AssetId,
    pub deposited: Decimal,
    pub withdrawn: Decimal,
    pub refunded: Decimal,
    pub status: StreamStatus,
}

/// Build an output row for a stream, deriving its status at `now`.
pub fn stream_state_row(stream: &Stream, recipient: AccountId, now: Timestamp) -> StreamStateRow {
    StreamStateRow {
        stream: stream.id,
        sender: stream.sender,
        recipient,
        asset: stream.asset.clone(),
        deposited: stream.amounts.deposited,
        withdrawn: stream.amounts.withdrawn,
        refunded: stream.amounts.refunded,
        status: status::status_of(stream, now),
    }
}

/// Write stream states to CSV format
///
/// Columns: stream, sender, recipient, asset, deposited, withdrawn,
/// refunded, status. Rows are sorted by stream id for deterministic output.
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(String)` if a write error occurred
pub fn write_streams_csv(rows: &[StreamStateRow], output: &mut dyn Write) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record([
            "stream",
            "sender",
            "recipient",
            "asset",
            "deposited",
            "withdrawn",
            "refunded",
            "status",
        ])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted_rows = rows.to_vec();
    sorted_rows.sort_by_key(|row| row.stream);

    for row in sorted_rows {
        writer
            .write_record(&[
                row.stream.to_string(),
                row.sender.to_string(),
                row.recipient.to_string(),
                row.asset.clone(),
                format!("{:.4}", row.deposited),
                format!("{:.4}", row.withdrawn),
                format!("{:.4}", row.refunded),
                row.status.to_string(),
            ])
            .map_err(|e| format!("Failed to write stream record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn record(op: &str) -> CsvRecord {
        CsvRecord {
            op: op.to_string(),
            time: 50,
            stream: Some(1),
            account: 10,
            to: Some(20),
            asset: Some("USDC".to_string()),
            amount: Some("1000".to_string()),
            start: Some(0),
            cancelable: Some("true".to_string()),
            segments: Some("1000:1:100".to_string()),
        }
    }

    #[rstest]
    #[case("fund", OperationType::Fund)]
    #[case("create", OperationType::Create)]
    #[case("withdraw", OperationType::Withdraw)]
    #[case("withdraw_max", OperationType::WithdrawMax)]
    #[case("cancel", OperationType::Cancel)]
    #[case("renounce", OperationType::Renounce)]
    #[case("burn", OperationType::Burn)]
    #[case("CREATE", OperationType::Create)] // case insensitive
    fn test_convert_valid_operations(#[case] op: &str, #[case] expected: OperationType) {
        let result = convert_operation_record(record(op));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().op, expected);
    }

    #[test]
    fn test_convert_rejects_unknown_operation() {
        let result = convert_operation_record(record("dispute"));
        assert!(result.unwrap_err().contains("Invalid operation type"));
    }

    #[rstest]
    #[case::not_a_number("abc")]
    #[case::negative("-5")]
    fn test_convert_rejects_bad_amount(#[case] amount: &str) {
        let mut csv_record = record("withdraw");
        csv_record.amount = Some(amount.to_string());

        assert!(convert_operation_record(csv_record).is_err());
    }

    #[test]
    fn test_convert_rejects_bad_cancelable_flag() {
        let mut csv_record = record("create");
        csv_record.cancelable = Some("maybe".to_string());

        assert!(convert_operation_record(csv_record).is_err());
    }

    #[rstest]
    #[case::create_needs_segments("create", "segments")]
    #[case::withdraw_needs_stream("withdraw", "stream")]
    #[case::cancel_needs_stream("cancel", "stream")]
    fn test_convert_rejects_missing_required_field(#[case] op: &str, #[case] field: &str) {
        let mut csv_record = record(op);
        match field {
            "segments" => csv_record.segments = None,
            "stream" => csv_record.stream = None,
            _ => panic!("Unknown field: {}", field),
        }

        let error = convert_operation_record(csv_record).unwrap_err();
        assert!(error.contains(field), "error was: {}", error);
    }

    #[test]
    fn test_parse_segments_single() {
        let segments = parse_segments("1000:1:100").unwrap();
        assert_eq!(
            segments,
            vec![Segment {
                amount: Decimal::new(1000, 0),
                exponent: Decimal::ONE,
                milestone: 100,
            }]
        );
    }

    #[test]
    fn test_parse_segments_multiple_with_fractional_exponent() {
        let segments = parse_segments("400:0.5:40|600:2:100").unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].exponent, Decimal::new(5, 1));
        assert_eq!(segments[1].milestone, 100);
    }

    #[rstest]
    #[case::too_few_fields("400:1")]
    #[case::bad_amount("x:1:40")]
    #[case::bad_exponent("400:x:40")]
    #[case::bad_milestone("400:1:x")]
    fn test_parse_segments_rejects_malformed(#[case] encoded: &str) {
        assert!(parse_segments(encoded).is_err());
    }

    #[test]
    fn test_write_streams_csv_sorted_output() {
        let rows = vec![
            StreamStateRow {
                stream: 2,
                sender: 10,
                recipient: 20,
                asset: "USDC".to_string(),
                deposited: Decimal::new(500, 0),
                withdrawn: Decimal::ZERO,
                refunded: Decimal::ZERO,
                status: StreamStatus::Pending,
            },
            StreamStateRow {
                stream: 1,
                sender: 10,
                recipient: 20,
                asset: "USDC".to_string(),
                deposited: Decimal::new(1000, 0),
                withdrawn: Decimal::new(300, 0),
                refunded: Decimal::new(700, 0),
                status: StreamStatus::Depleted,
            },
        ];

        let mut output = Vec::new();
        write_streams_csv(&rows, &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "stream,sender,recipient,asset,deposited,withdrawn,refunded,status"
        );
        assert_eq!(lines[1], "1,10,20,USDC,1000.0000,300.0000,700.0000,depleted");
        assert_eq!(lines[2], "2,10,20,USDC,500.0000,0.0000,0.0000,pending");
    }
}
