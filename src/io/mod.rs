//! I/O module
//!
//! Handles operation-log CSV parsing and stream-state output.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (record conversion, segment
//!   encoding, output serialization)
//! - `sync_reader` - Synchronous CSV reader with iterator interface
//! - `async_reader` - Asynchronous CSV reader with batch reading interface

pub mod async_reader;
pub mod csv_format;
pub mod sync_reader;

pub use async_reader::AsyncReader;
pub use csv_format::{
    convert_operation_record, parse_segments, stream_state_row, write_streams_csv, CsvRecord,
    StreamStateRow,
};
pub use sync_reader::SyncReader;
