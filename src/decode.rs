//! Streaming decoder for the MPS7 binary layout.
//!
//! [`Decoder`] wraps any sequential [`Read`] stream, tracks the byte offset
//! it has consumed, and decodes the header and records field by field.
//! Every read is fallible and propagates; a field is never left at a
//! default value after a short read. [`load`] drives a whole file:
//! header first, then exactly `record_count` records, all-or-nothing.
use crate::record::{AMOUNT_LEN, BASE_LEN, BaseRecord, HEADER_LEN, Header, MAGIC, Record, RecordType, TxnLog};
use std::io::{self, ErrorKind, Read};
use thiserror::Error;
use tracing::{debug, warn};

/// Failure modes of a log load.
///
/// `Io` means the stream could not supply bytes (including a short read of
/// the 9-byte header); `BadMagic` means the preamble is not an MPS7 log at
/// all; `Truncated` means the header was valid but the stream ended inside
/// a record. Records decoded before a failure are discarded by the caller.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("i/o error at byte {offset}: {source}")]
    Io {
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("bad magic {got:?}, expected \"MPS7\"")]
    BadMagic { got: [u8; 4] },

    #[error("log truncated at byte {offset}: {decoded} of {declared} records decoded")]
    Truncated {
        offset: u64,
        decoded: u32,
        declared: u32,
    },
}

/// Stateful decoder over a sequential byte stream.
///
/// Owns the stream cursor for the duration of a load; no state survives
/// across separate logs. The offset and record counters exist so failures
/// can say where the stream went bad and how far the load got.
pub struct Decoder<R> {
    reader: R,
    offset: u64,
    decoded: u32,
    declared: u32,
}

impl<R: Read> Decoder<R> {
    pub fn new(reader: R) -> Self {
        Decoder {
            reader,
            offset: 0,
            decoded: 0,
            declared: 0,
        }
    }

    /// Bytes consumed from the stream so far.
    pub fn position(&self) -> u64 {
        self.offset
    }

    fn fill(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.reader.read_exact(buf)?;
        self.offset += buf.len() as u64;
        Ok(())
    }

    /// A short read inside a record means the log lied about its length;
    /// anything else is a plain stream fault.
    fn record_error(&self, source: io::Error) -> DecodeError {
        if source.kind() == ErrorKind::UnexpectedEof {
            DecodeError::Truncated {
                offset: self.offset,
                decoded: self.decoded,
                declared: self.declared,
            }
        } else {
            DecodeError::Io {
                offset: self.offset,
                source,
            }
        }
    }

    /// Decode and validate the 9-byte header.
    ///
    /// Consumes exactly `HEADER_LEN` bytes on success. A short read here is
    /// an `Io` failure, not a format failure; a wrong magic stops decoding
    /// before any record is read.
    pub fn decode_header(&mut self) -> Result<Header, DecodeError> {
        let mut buf = [0u8; HEADER_LEN];
        let start = self.offset;
        self.fill(&mut buf).map_err(|source| DecodeError::Io {
            offset: start,
            source,
        })?;

        let mut got = [0u8; 4];
        got.copy_from_slice(&buf[..4]);
        if got != MAGIC {
            return Err(DecodeError::BadMagic { got });
        }

        let header = Header {
            version: buf[4],
            record_count: be_u32(&buf[5..9]),
        };
        self.declared = header.record_count;
        debug!(version = header.version, records = header.record_count, "decoded header");
        Ok(header)
    }

    /// Decode one record: the 13-byte base, then the 8-byte amount when the
    /// tag calls for one.
    ///
    /// Unknown tags consume the base and nothing else; the format gives
    /// them no payload bytes. A future payload-bearing tag would
    /// desynchronize the stream, so such records are logged with their
    /// offset.
    pub fn decode_record(&mut self) -> Result<Record, DecodeError> {
        let mut base_buf = [0u8; BASE_LEN];
        self.fill(&mut base_buf).map_err(|e| self.record_error(e))?;

        let tag = base_buf[0];
        let base = BaseRecord {
            timestamp: be_u32(&base_buf[1..5]),
            user_id: be_u64(&base_buf[5..13]),
        };

        let record = match RecordType::from_tag(tag) {
            Some(RecordType::Debit) => Record::Debit {
                base,
                amount: self.read_amount()?,
            },
            Some(RecordType::Credit) => Record::Credit {
                base,
                amount: self.read_amount()?,
            },
            Some(RecordType::StartAutopay) => Record::StartAutopay { base },
            Some(RecordType::EndAutopay) => Record::EndAutopay { base },
            None => {
                warn!(tag, offset = self.offset - BASE_LEN as u64, "unknown record tag, decoding base only");
                Record::Unknown { tag, base }
            }
        };
        self.decoded += 1;
        Ok(record)
    }

    fn read_amount(&mut self) -> Result<f64, DecodeError> {
        let mut buf = [0u8; AMOUNT_LEN];
        self.fill(&mut buf).map_err(|e| self.record_error(e))?;
        Ok(be_f64(&buf))
    }
}

/// Decode a complete log: header, then exactly `record_count` records in
/// file order. The first failure aborts the load and nothing decoded so
/// far survives.
pub fn load<R: Read>(reader: R) -> Result<TxnLog, DecodeError> {
    let mut decoder = Decoder::new(reader);
    let header = decoder.decode_header()?;
    let mut records = Vec::with_capacity(header.record_count as usize);
    for _ in 0..header.record_count {
        records.push(decoder.decode_record()?);
    }
    Ok(TxnLog { header, records })
}

fn be_u32(b: &[u8]) -> u32 {
    let mut tmp = [0u8; 4];
    tmp.copy_from_slice(b);
    u32::from_be_bytes(tmp)
}

fn be_u64(b: &[u8]) -> u64 {
    let mut tmp = [0u8; 8];
    tmp.copy_from_slice(b);
    u64::from_be_bytes(tmp)
}

fn be_f64(b: &[u8]) -> f64 {
    let mut tmp = [0u8; 8];
    tmp.copy_from_slice(b);
    f64::from_be_bytes(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn header_bytes(magic: &[u8; 4], version: u8, count: u32) -> Vec<u8> {
        let mut v = Vec::new();
        v.extend_from_slice(magic);
        v.push(version);
        v.extend_from_slice(&count.to_be_bytes());
        v
    }

    fn record_bytes(tag: u8, timestamp: u32, user_id: u64, amount: Option<f64>) -> Vec<u8> {
        let mut v = vec![tag];
        v.extend_from_slice(&timestamp.to_be_bytes());
        v.extend_from_slice(&user_id.to_be_bytes());
        if let Some(a) = amount {
            v.extend_from_slice(&a.to_be_bytes());
        }
        v
    }

    #[test]
    fn header_decodes_big_endian_count() {
        let bytes = header_bytes(b"MPS7", 1, 0x0102_0304);
        let mut d = Decoder::new(Cursor::new(bytes));
        let h = d.decode_header().unwrap();
        assert_eq!(h.version, 1);
        assert_eq!(h.record_count, 0x0102_0304);
        assert_eq!(d.position(), 9);
    }

    #[test]
    fn bad_magic_reports_observed_bytes() {
        let bytes = header_bytes(b"XXXX", 1, 1);
        let mut d = Decoder::new(Cursor::new(bytes));
        match d.decode_header() {
            Err(DecodeError::BadMagic { got }) => assert_eq!(&got, b"XXXX"),
            other => panic!("expected BadMagic, got {other:?}"),
        }
    }

    #[test]
    fn short_header_is_io_not_format() {
        let mut d = Decoder::new(Cursor::new(vec![b'M', b'P', b'S']));
        match d.decode_header() {
            Err(DecodeError::Io { offset: 0, .. }) => {}
            other => panic!("expected Io, got {other:?}"),
        }
    }

    #[test]
    fn record_widths_match_tags() {
        let mut bytes = record_bytes(0x00, 10, 5, Some(20.0));
        bytes.extend(record_bytes(0x02, 11, 5, None));
        bytes.extend(record_bytes(0x01, 12, 5, Some(7.5)));
        let mut d = Decoder::new(Cursor::new(bytes));

        let r = d.decode_record().unwrap();
        assert!(matches!(r, Record::Debit { .. }));
        assert_eq!(d.position(), 21);

        let r = d.decode_record().unwrap();
        assert!(matches!(r, Record::StartAutopay { .. }));
        assert_eq!(d.position(), 34);

        let r = d.decode_record().unwrap();
        assert_eq!(r.amount(), Some(7.5));
        assert_eq!(d.position(), 55);
    }

    #[test]
    fn unknown_tag_consumes_base_only() {
        let mut bytes = record_bytes(0xFF, 0, 1, None);
        bytes.extend(record_bytes(0x02, 0, 9, None));
        let mut d = Decoder::new(Cursor::new(bytes));

        let r = d.decode_record().unwrap();
        assert!(matches!(r, Record::Unknown { tag: 0xFF, .. }));
        assert_eq!(d.position(), 13);

        // The next record starts exactly 13 bytes after the unknown one.
        let r = d.decode_record().unwrap();
        match r {
            Record::StartAutopay { base } => assert_eq!(base.user_id, 9),
            other => panic!("expected StartAutopay, got {other:?}"),
        }
        assert_eq!(d.position(), 26);
    }

    #[test]
    fn truncated_base_fails() {
        let bytes = record_bytes(0x02, 0, 1, None);
        let mut d = Decoder::new(Cursor::new(bytes[..7].to_vec()));
        match d.decode_record() {
            Err(DecodeError::Truncated { .. }) => {}
            other => panic!("expected Truncated, got {other:?}"),
        }
    }

    #[test]
    fn truncated_amount_fails() {
        let full = record_bytes(0x01, 0, 1, Some(3.0));
        // Cut the record 4 bytes into its amount.
        let mut d = Decoder::new(Cursor::new(full[..17].to_vec()));
        match d.decode_record() {
            Err(DecodeError::Truncated { offset: 13, .. }) => {}
            other => panic!("expected Truncated at byte 13, got {other:?}"),
        }
    }

    #[test]
    fn load_returns_records_in_file_order() {
        let mut bytes = header_bytes(b"MPS7", 1, 3);
        bytes.extend(record_bytes(0x01, 1, 100, Some(1.5)));
        bytes.extend(record_bytes(0x00, 2, 200, Some(2.5)));
        bytes.extend(record_bytes(0x03, 3, 300, None));
        let log = load(Cursor::new(bytes)).unwrap();

        assert_eq!(log.header.record_count, 3);
        assert_eq!(log.records.len(), 3);
        assert_eq!(log.records[0].base().user_id, 100);
        assert_eq!(log.records[1].base().user_id, 200);
        assert_eq!(log.records[2].base().user_id, 300);
    }

    #[test]
    fn load_with_fewer_records_than_declared_is_truncated() {
        let mut bytes = header_bytes(b"MPS7", 1, 2);
        bytes.extend(record_bytes(0x01, 0, 42, Some(100.0)));
        match load(Cursor::new(bytes)) {
            Err(DecodeError::Truncated { offset, decoded, declared }) => {
                assert_eq!(offset, 30);
                assert_eq!(decoded, 1);
                assert_eq!(declared, 2);
            }
            other => panic!("expected Truncated, got {other:?}"),
        }
    }

    #[test]
    fn load_stops_at_bad_magic() {
        let mut bytes = header_bytes(b"XXXX", 1, 1);
        bytes.extend(record_bytes(0x01, 0, 42, Some(100.0)));
        assert!(matches!(load(Cursor::new(bytes)), Err(DecodeError::BadMagic { .. })));
    }
}
