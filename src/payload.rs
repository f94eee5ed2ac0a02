// SPDX-License-Identifier: BSD-3-Clause

//! The payload record exchanged by both FIND and CALL units: one machine integer plus an opaque
//! byte buffer of declared length.

use std::io::{Read, Write};

use crate::error::RpcError;
use crate::framing;

/// An atomic `(data1, data2_len, data2)` record.
///
/// `data2_len` and `data2` are kept as separate fields, mirroring the source's C struct, rather
/// than collapsed into a single `Option<Vec<u8>>`: the whole point of the consistency invariant
/// below is that the two can be driven out of sync by a caller or a handler, and the boundary
/// checks in `server`/`client` need to be able to observe that. [`PayloadRecord::new`] is the
/// convenient path that can't produce an inconsistent value; constructing the struct literal
/// directly can.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadRecord {
    pub data1: i32,
    pub data2_len: u32,
    pub data2: Option<Vec<u8>>,
}

impl PayloadRecord {
    /// Builds a record from `data1` and an optional buffer, deriving `data2_len` so the result is
    /// always consistent.
    pub fn new(data1: i32, data2: Option<Vec<u8>>) -> Self {
        let data2_len = data2.as_ref().map_or(0, |b| b.len() as u32);
        Self {
            data1,
            data2_len,
            data2,
        }
    }

    /// The consistency invariant: `data2_len == 0` if and only if `data2` is absent.
    pub fn is_consistent(&self) -> bool {
        (self.data2_len == 0) == self.data2.is_none()
    }

    pub fn encode(&self, stream: &mut impl Write) -> Result<(), RpcError> {
        if !self.is_consistent() {
            return Err(RpcError::InconsistentData);
        }

        framing::write_int(stream, self.data1)?;
        framing::write_size(stream, self.data2_len as usize)?;
        if let Some(bytes) = &self.data2 {
            framing::write_bytes(stream, bytes)?;
        }

        Ok(())
    }

    pub fn decode(stream: &mut impl Read) -> Result<Self, RpcError> {
        let data1 = framing::read_int(stream)?;
        let len = framing::read_size(stream)?;
        let data2 = if len > 0 {
            Some(framing::read_bytes(stream, len)?)
        } else {
            None
        };

        Ok(Self::new(data1, data2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_a_consistent_record() {
        let record = PayloadRecord::new(42, Some(vec![1, 2, 3]));
        let mut buf = Vec::new();
        record.encode(&mut buf).unwrap();

        let decoded = PayloadRecord::decode(&mut Cursor::new(buf)).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn round_trips_an_absent_buffer() {
        let record = PayloadRecord::new(-7, None);
        let mut buf = Vec::new();
        record.encode(&mut buf).unwrap();

        let decoded = PayloadRecord::decode(&mut Cursor::new(buf)).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn new_always_derives_a_consistent_record() {
        assert!(PayloadRecord::new(0, None).is_consistent());
        assert!(PayloadRecord::new(0, Some(vec![0])).is_consistent());
    }

    #[test]
    fn detects_present_buffer_with_zero_length() {
        let record = PayloadRecord {
            data1: 0,
            data2_len: 0,
            data2: Some(vec![0x00]),
        };
        assert!(!record.is_consistent());
    }

    #[test]
    fn detects_absent_buffer_with_nonzero_length() {
        let record = PayloadRecord {
            data1: 0,
            data2_len: 1,
            data2: None,
        };
        assert!(!record.is_consistent());
    }

    #[test]
    fn encode_rejects_inconsistent_record() {
        let record = PayloadRecord {
            data1: 0,
            data2_len: 1,
            data2: None,
        };
        let mut buf = Vec::new();
        let err = record.encode(&mut buf).unwrap_err();
        assert!(matches!(err, RpcError::InconsistentData));
        assert!(buf.is_empty());
    }
}
