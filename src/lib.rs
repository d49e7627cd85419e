//! MPS7 transaction log decoder and reporter library.
//!
//! This crate provides the core types and logic used by the `txnlog`
//! report binary:
//!
//! - `record`: on-disk schema (header, tagged records, the decoded log)
//! - `decode`: streaming decoder with byte-exact big-endian field reads,
//!   offset tracking, and a typed error taxonomy
//! - `stats`: pure aggregation of a record sequence into report totals
//!
//! The binary in this repository (`src/main.rs`) uses these modules to
//! decode a capture file and answer the standard report questions.
pub mod decode;
pub mod record;
pub mod stats;

pub use decode::{DecodeError, Decoder, load};
pub use record::{BaseRecord, Header, Record, RecordType, TxnLog};
pub use stats::Summary;
