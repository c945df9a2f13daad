//! Security identifier decoding.
//!
//! Wire layout: u32 sub-authority conformance count, u8 revision, u8
//! sub-authority count, 6-byte big-endian authority, then the
//! sub-authorities as u32s.

use std::fmt;

use crate::common::error::CodecError;
use crate::protocol::codec::{get_u32_le, get_u8};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sid {
    pub revision: u8,
    pub authority: [u8; 6],
    pub sub_authorities: Vec<u32>,
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut auth = 0u64;
        for b in &self.authority {
            auth = (auth << 8) | (*b as u64);
        }
        write!(f, "S-{}-{}", self.revision, auth)?;
        for s in &self.sub_authorities {
            write!(f, "-{}", s)?;
        }
        Ok(())
    }
}

/// Decode a security identifier, capping the sub-authority count.
pub fn get_sid(src: &mut &[u8], max_subauths: usize) -> Result<Sid, CodecError> {
    let conformance = get_u32_le(src)? as usize;
    let revision = get_u8(src)?;
    let count = get_u8(src)? as usize;
    if count != conformance {
        return Err(CodecError::Malformed("sid count mismatch"));
    }
    if count > max_subauths {
        return Err(CodecError::Malformed("sid too large"));
    }
    if src.len() < 6 {
        return Err(CodecError::Short);
    }
    let mut authority = [0u8; 6];
    authority.copy_from_slice(&src[..6]);
    *src = &src[6..];

    let mut sub_authorities = Vec::with_capacity(count);
    for _ in 0..count {
        sub_authorities.push(get_u32_le(src)?);
    }

    Ok(Sid {
        revision,
        authority,
        sub_authorities,
    })
}
