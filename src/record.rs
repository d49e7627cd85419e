//! On-disk schema for the MPS7 transaction log.
//!
//! A log is a 9-byte header followed by `record_count` records laid out
//! back to back. Every multi-byte field is big-endian. Each record starts
//! with a 13-byte base (tag, timestamp, user id); Debit and Credit records
//! carry a trailing 8-byte IEEE-754 amount, every other tag does not.
use serde::Serialize;
use std::fmt;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// File magic, the first four bytes of every log.
pub const MAGIC: [u8; 4] = *b"MPS7";
/// Header width in bytes: magic + version + record count.
pub const HEADER_LEN: usize = 9;
/// Width of the base common to every record: tag + timestamp + user id.
pub const BASE_LEN: usize = 13;
/// Width of the amount that follows a Debit or Credit base.
pub const AMOUNT_LEN: usize = 8;

/// Validated file header. The magic is checked during decode and not kept,
/// so a constructed `Header` is valid by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Header {
    /// Format version byte; readable but does not alter decoding.
    pub version: u8,
    /// Number of records the file declares to contain.
    pub record_count: u32,
}

/// Record tags defined by the format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    Debit = 0x00,
    Credit = 0x01,
    StartAutopay = 0x02,
    EndAutopay = 0x03,
}

impl RecordType {
    /// Map a raw tag byte to a known record type, `None` for anything else.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x00 => Some(Self::Debit),
            0x01 => Some(Self::Credit),
            0x02 => Some(Self::StartAutopay),
            0x03 => Some(Self::EndAutopay),
            _ => None,
        }
    }

    /// Whether records with this tag carry a trailing amount.
    pub fn has_amount(self) -> bool {
        matches!(self, Self::Debit | Self::Credit)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Debit => "Debit",
            Self::Credit => "Credit",
            Self::StartAutopay => "Start AutoPay",
            Self::EndAutopay => "End AutoPay",
        };
        f.write_str(name)
    }
}

/// The 13-byte prefix shared by every record variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BaseRecord {
    /// Seconds since the Unix epoch.
    pub timestamp: u32,
    pub user_id: u64,
}

/// One decoded record. Only the Debit and Credit variants have an amount
/// field, so a non-monetary record cannot represent one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Record {
    Debit { base: BaseRecord, amount: f64 },
    Credit { base: BaseRecord, amount: f64 },
    StartAutopay { base: BaseRecord },
    EndAutopay { base: BaseRecord },
    /// Tag outside the known set; decoded as a bare base, no payload bytes.
    Unknown { tag: u8, base: BaseRecord },
}

impl Record {
    pub fn base(&self) -> &BaseRecord {
        match self {
            Self::Debit { base, .. }
            | Self::Credit { base, .. }
            | Self::StartAutopay { base }
            | Self::EndAutopay { base }
            | Self::Unknown { base, .. } => base,
        }
    }

    /// The known record type, `None` for unknown tags.
    pub fn record_type(&self) -> Option<RecordType> {
        match self {
            Self::Debit { .. } => Some(RecordType::Debit),
            Self::Credit { .. } => Some(RecordType::Credit),
            Self::StartAutopay { .. } => Some(RecordType::StartAutopay),
            Self::EndAutopay { .. } => Some(RecordType::EndAutopay),
            Self::Unknown { .. } => None,
        }
    }

    /// The trailing amount, present only on Debit and Credit.
    pub fn amount(&self) -> Option<f64> {
        match self {
            Self::Debit { amount, .. } | Self::Credit { amount, .. } => Some(*amount),
            _ => None,
        }
    }

    /// Bytes this record occupies on disk: the base, plus the amount for
    /// Debit and Credit.
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Debit { .. } | Self::Credit { .. } => BASE_LEN + AMOUNT_LEN,
            _ => BASE_LEN,
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = self.base();
        let when = OffsetDateTime::from_unix_timestamp(i64::from(base.timestamp))
            .unwrap_or(OffsetDateTime::UNIX_EPOCH);
        match when.format(&Rfc3339) {
            Ok(s) => write!(f, "{s}")?,
            Err(_) => write!(f, "{}", base.timestamp)?,
        }
        match self.record_type() {
            Some(kind) => write!(f, "\t{kind}")?,
            None => f.write_str("\tUnknown record type")?,
        }
        write!(f, "\t{}", base.user_id)?;
        if let Some(amount) = self.amount() {
            write!(f, "\t{amount:.2}")?;
        }
        Ok(())
    }
}

/// A fully decoded log: validated header plus exactly `record_count`
/// records in file order. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TxnLog {
    pub header: Header,
    pub records: Vec<Record>,
}

impl TxnLog {
    /// Decode a complete log from a sequential byte stream. All-or-nothing:
    /// any failure discards everything decoded so far.
    pub fn load<R: std::io::Read>(reader: R) -> Result<Self, crate::decode::DecodeError> {
        crate::decode::load(reader)
    }

    /// Sum of all Debit amounts.
    pub fn total_debits(&self) -> f64 {
        self.records
            .iter()
            .filter_map(|r| match r {
                Record::Debit { amount, .. } => Some(*amount),
                _ => None,
            })
            .sum()
    }

    /// Sum of all Credit amounts.
    pub fn total_credits(&self) -> f64 {
        self.records
            .iter()
            .filter_map(|r| match r {
                Record::Credit { amount, .. } => Some(*amount),
                _ => None,
            })
            .sum()
    }

    pub fn autopay_starts(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r, Record::StartAutopay { .. }))
            .count()
    }

    pub fn autopay_ends(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r, Record::EndAutopay { .. }))
            .count()
    }

    /// Credits minus debits for one user; 0.0 when the user never appears.
    pub fn balance(&self, user_id: u64) -> f64 {
        self.summary(user_id).balance
    }

    /// All report statistics in a single pass over the records.
    pub fn summary(&self, target_user: u64) -> crate::stats::Summary {
        crate::stats::Summary::collect(&self.records, target_user)
    }
}
