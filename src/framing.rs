// SPDX-License-Identifier: BSD-3-Clause

//! Wire primitives shared by the FIND/CALL protocol: a one-byte flag, a 4-byte unsigned size, an
//! 8-byte signed integer, and raw byte buffers of an out-of-band length. All multi-byte fields
//! are big-endian on the wire.
//!
//! Every primitive here is written with `write_all` (send-all-or-fail) and read with
//! `read_exact` (loop until the declared length is read, or fail). `read_exact` already turns a
//! short read into `io::ErrorKind::UnexpectedEof`, which `RpcError::from` maps to
//! `ConnectionLost`; any other I/O error maps to `NetworkFailure`.

use std::io::{Read, Write};

use crate::error::RpcError;

/// Maximum length of a procedure name, matching the source implementation's `MAX_NAME_LEN`.
pub const MAX_NAME_LEN: usize = 1000;

pub const FLAG_FIND: u8 = b'f';
pub const FLAG_CALL: u8 = b'c';
pub const FLAG_FOUND: u8 = b'y';
pub const FLAG_NOT_FOUND: u8 = b'n';
pub const FLAG_CONSISTENT: u8 = b'g';
pub const FLAG_INCONSISTENT: u8 = b'b';

/// Reads the one-byte flag that begins a request unit. Unlike [`read_flag`], a peer that closes
/// the connection before sending any bytes is reported as `Ok(None)` rather than an error: that's
/// the server's ordinary "client hung up between units" exit path, not a failure.
pub fn try_read_flag(stream: &mut impl Read) -> Result<Option<u8>, RpcError> {
    let mut buf = [0u8; 1];
    loop {
        match stream.read(&mut buf) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(buf[0])),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(RpcError::NetworkFailure(e)),
        }
    }
}

/// Reads a one-byte flag where an orderly close before any bytes arrive is itself a failure
/// (used for responses, where the sender is mid-unit and must not go silent).
pub fn read_flag(stream: &mut impl Read) -> Result<u8, RpcError> {
    let mut buf = [0u8; 1];
    read_exact(stream, &mut buf)?;
    Ok(buf[0])
}

pub fn write_flag(stream: &mut impl Write, flag: u8) -> Result<(), RpcError> {
    stream.write_all(&[flag]).map_err(RpcError::from)
}

/// Reads a 4-byte unsigned size field and checks it fits in this host's `usize`.
pub fn read_size(stream: &mut impl Read) -> Result<usize, RpcError> {
    let mut buf = [0u8; 4];
    read_exact(stream, &mut buf)?;
    let wire = u32::from_be_bytes(buf);
    usize::try_from(wire).map_err(|_| RpcError::Overlength)
}

/// Writes a size as a 4-byte unsigned field, rejecting lengths that don't fit in `u32`.
pub fn write_size(stream: &mut impl Write, size: usize) -> Result<(), RpcError> {
    let wire = u32::try_from(size).map_err(|_| RpcError::Overlength)?;
    stream.write_all(&wire.to_be_bytes()).map_err(RpcError::from)
}

/// Reads an 8-byte signed integer field and narrows it to this host's `i32`.
pub fn read_int(stream: &mut impl Read) -> Result<i32, RpcError> {
    let mut buf = [0u8; 8];
    read_exact(stream, &mut buf)?;
    let wire = i64::from_be_bytes(buf);
    i32::try_from(wire).map_err(|_| RpcError::Overlength)
}

/// Widens a host `i32` to the 8-byte wire representation. Always succeeds: every `i32` fits in
/// the `(-2^63, 2^63)` range the wire format permits.
pub fn write_int(stream: &mut impl Write, value: i32) -> Result<(), RpcError> {
    let wire = i64::from(value);
    stream.write_all(&wire.to_be_bytes()).map_err(RpcError::from)
}

/// Reads an unsigned 32-bit procedure id carried in the same 8-byte int field as [`read_int`].
/// Ids are nonnegative by construction, so the valid range is `0..=u32::MAX`.
pub fn read_id(stream: &mut impl Read) -> Result<u32, RpcError> {
    let mut buf = [0u8; 8];
    read_exact(stream, &mut buf)?;
    let wire = i64::from_be_bytes(buf);
    u32::try_from(wire).map_err(|_| RpcError::Overlength)
}

pub fn write_id(stream: &mut impl Write, id: u32) -> Result<(), RpcError> {
    let wire = i64::from(id);
    stream.write_all(&wire.to_be_bytes()).map_err(RpcError::from)
}

/// Reads exactly `len` raw bytes.
pub fn read_bytes(stream: &mut impl Read, len: usize) -> Result<Vec<u8>, RpcError> {
    let mut buf = vec![0u8; len];
    read_exact(stream, &mut buf)?;
    Ok(buf)
}

pub fn write_bytes(stream: &mut impl Write, data: &[u8]) -> Result<(), RpcError> {
    stream.write_all(data).map_err(RpcError::from)
}

fn read_exact(stream: &mut impl Read, buf: &mut [u8]) -> Result<(), RpcError> {
    stream.read_exact(buf).map_err(RpcError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn size_round_trips() {
        let mut buf = Vec::new();
        write_size(&mut buf, 123_456).unwrap();
        assert_eq!(read_size(&mut Cursor::new(buf)).unwrap(), 123_456);
    }

    #[test]
    fn size_rejects_overlong_encode() {
        let mut buf = Vec::new();
        let err = write_size(&mut buf, u32::MAX as usize + 1).unwrap_err();
        assert!(matches!(err, RpcError::Overlength));
    }

    #[test]
    fn int_round_trips_full_i32_range() {
        for value in [i32::MIN, -1, 0, 1, i32::MAX] {
            let mut buf = Vec::new();
            write_int(&mut buf, value).unwrap();
            assert_eq!(read_int(&mut Cursor::new(buf)).unwrap(), value);
        }
    }

    #[test]
    fn int_rejects_value_outside_i32_range() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(i64::from(i32::MAX) + 1).to_be_bytes());
        let err = read_int(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, RpcError::Overlength));
    }

    #[test]
    fn id_round_trips() {
        let mut buf = Vec::new();
        write_id(&mut buf, u32::MAX).unwrap();
        assert_eq!(read_id(&mut Cursor::new(buf)).unwrap(), u32::MAX);
    }

    #[test]
    fn try_read_flag_reports_orderly_close() {
        let mut empty = Cursor::new(Vec::<u8>::new());
        assert_eq!(try_read_flag(&mut empty).unwrap(), None);
    }

    #[test]
    fn read_flag_mid_unit_close_is_connection_lost() {
        let mut empty = Cursor::new(Vec::<u8>::new());
        let err = read_flag(&mut empty).unwrap_err();
        assert!(matches!(err, RpcError::ConnectionLost));
    }
}
