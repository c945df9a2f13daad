//! Low-level wire decoding primitives.
//!
//! All multi-byte integers are little-endian. The cursor convention is a
//! `&mut &[u8]` that advances past consumed bytes; every read fails with
//! `CodecError::Short` when the buffer runs out, and cap violations are
//! `CodecError::Malformed`.

use std::fmt;

use crate::common::error::CodecError;

/// Length in bytes of an opaque context handle.
pub const HANDLE_LEN: usize = 20;

/// Opaque context handle. Never inspected beyond equality and hashing.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(pub [u8; HANDLE_LEN]);

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self)
    }
}

pub fn get_u8(src: &mut &[u8]) -> Result<u8, CodecError> {
    if src.is_empty() {
        return Err(CodecError::Short);
    }
    let v = src[0];
    *src = &src[1..];
    Ok(v)
}

pub fn get_u16_le(src: &mut &[u8]) -> Result<u16, CodecError> {
    if src.len() < 2 {
        return Err(CodecError::Short);
    }
    let v = u16::from_le_bytes(src[0..2].try_into().unwrap());
    *src = &src[2..];
    Ok(v)
}

pub fn get_u32_le(src: &mut &[u8]) -> Result<u32, CodecError> {
    if src.len() < 4 {
        return Err(CodecError::Short);
    }
    let v = u32::from_le_bytes(src[0..4].try_into().unwrap());
    *src = &src[4..];
    Ok(v)
}

pub fn get_u64_le(src: &mut &[u8]) -> Result<u64, CodecError> {
    if src.len() < 8 {
        return Err(CodecError::Short);
    }
    let v = u64::from_le_bytes(src[0..8].try_into().unwrap());
    *src = &src[8..];
    Ok(v)
}

pub fn get_i64_le(src: &mut &[u8]) -> Result<i64, CodecError> {
    Ok(get_u64_le(src)? as i64)
}

/// Read `n` raw bytes.
pub fn get_fixed(src: &mut &[u8], n: usize) -> Result<Vec<u8>, CodecError> {
    if src.len() < n {
        return Err(CodecError::Short);
    }
    let v = src[..n].to_vec();
    *src = &src[n..];
    Ok(v)
}

/// Read a fixed 16-byte block (hashes, verifiers).
pub fn get_fixed_16(src: &mut &[u8]) -> Result<[u8; 16], CodecError> {
    if src.len() < 16 {
        return Err(CodecError::Short);
    }
    let mut out = [0u8; 16];
    out.copy_from_slice(&src[..16]);
    *src = &src[16..];
    Ok(out)
}

/// Read a counted character string: u32 byte count, then that many bytes.
///
/// `char_width` 2 decodes UTF-16LE, 1 decodes single-byte text. Trailing
/// NUL characters are stripped. A count above `max_bytes` is a hard error:
/// the cursor can no longer be trusted.
pub fn get_counted_string(
    src: &mut &[u8],
    char_width: usize,
    max_bytes: usize,
) -> Result<String, CodecError> {
    let len = get_u32_le(src)? as usize;
    if len > max_bytes {
        return Err(CodecError::Malformed("string too large"));
    }
    if char_width == 2 && len % 2 != 0 {
        return Err(CodecError::Malformed("odd utf16 byte count"));
    }
    if src.len() < len {
        return Err(CodecError::Short);
    }
    let raw = &src[..len];
    *src = &src[len..];

    let mut s = if char_width == 2 {
        let units: Vec<u16> = raw
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        raw.iter().map(|&b| b as char).collect()
    };
    while s.ends_with('\0') {
        s.pop();
    }
    Ok(s)
}

/// Transport-level optional indirection: a u32 referent marker, where 0
/// skips the inner decoder and anything else invokes it.
pub fn get_pointer<T, F>(src: &mut &[u8], f: F) -> Result<Option<T>, CodecError>
where
    F: FnOnce(&mut &[u8]) -> Result<T, CodecError>,
{
    let referent = get_u32_le(src)?;
    if referent == 0 {
        return Ok(None);
    }
    f(src).map(Some)
}

/// Read a counted array: u32 element count, then that many elements.
pub fn get_array<T, F>(src: &mut &[u8], max_items: usize, mut f: F) -> Result<Vec<T>, CodecError>
where
    F: FnMut(&mut &[u8]) -> Result<T, CodecError>,
{
    let count = get_u32_le(src)? as usize;
    if count > max_items {
        return Err(CodecError::Malformed("array too large"));
    }
    let mut v = Vec::with_capacity(count);
    for _ in 0..count {
        v.push(f(src)?);
    }
    Ok(v)
}

/// Read an absolute wire timestamp (100ns ticks since 1601).
pub fn get_nt_time(src: &mut &[u8]) -> Result<u64, CodecError> {
    get_u64_le(src)
}

/// Read an opaque 20-byte context handle.
pub fn get_handle(src: &mut &[u8]) -> Result<Handle, CodecError> {
    if src.len() < HANDLE_LEN {
        return Err(CodecError::Short);
    }
    let mut h = [0u8; HANDLE_LEN];
    h.copy_from_slice(&src[..HANDLE_LEN]);
    *src = &src[HANDLE_LEN..];
    Ok(Handle(h))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{BufMut, BytesMut};

    #[test]
    fn test_get_u32_le_advances() {
        let buf = [0x78, 0x56, 0x34, 0x12, 0xff];
        let mut p = &buf[..];
        assert_eq!(get_u32_le(&mut p).unwrap(), 0x12345678);
        assert_eq!(p, &[0xff]);
    }

    #[test]
    fn test_short_reads() {
        let mut p: &[u8] = &[0x01, 0x02, 0x03];
        assert_eq!(get_u32_le(&mut p), Err(CodecError::Short));
        assert_eq!(get_handle(&mut p), Err(CodecError::Short));
    }

    #[test]
    fn test_counted_string_utf16() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(10);
        for u in "alice".encode_utf16() {
            buf.put_u16_le(u);
        }
        let mut p = &buf[..];
        assert_eq!(get_counted_string(&mut p, 2, 1024).unwrap(), "alice");
        assert!(p.is_empty());
    }

    #[test]
    fn test_counted_string_strips_nul() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(4);
        buf.put_u16_le(b'a' as u16);
        buf.put_u16_le(0);
        let mut p = &buf[..];
        assert_eq!(get_counted_string(&mut p, 2, 1024).unwrap(), "a");
    }

    #[test]
    fn test_counted_string_cap_is_malformed() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(100);
        let mut p = &buf[..];
        assert_eq!(
            get_counted_string(&mut p, 1, 10),
            Err(CodecError::Malformed("string too large"))
        );
    }

    #[test]
    fn test_pointer_null_skips_inner() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(0);
        let mut p = &buf[..];
        let r = get_pointer(&mut p, get_u32_le).unwrap();
        assert_eq!(r, None);
        assert!(p.is_empty());
    }

    #[test]
    fn test_pointer_nonnull_invokes_inner() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(0x0002_0000);
        buf.put_u32_le(42);
        let mut p = &buf[..];
        assert_eq!(get_pointer(&mut p, get_u32_le).unwrap(), Some(42));
    }

    #[test]
    fn test_array_cap_is_malformed() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(5000);
        let mut p = &buf[..];
        assert_eq!(
            get_array(&mut p, 4096, get_u32_le),
            Err(CodecError::Malformed("array too large"))
        );
    }

    #[test]
    fn test_handle_roundtrip_display() {
        let raw = [0xabu8; HANDLE_LEN];
        let mut p = &raw[..];
        let h = get_handle(&mut p).unwrap();
        assert_eq!(h.to_string(), "ab".repeat(HANDLE_LEN));
    }
}
