//! LEB128 variable-length integers and a cursor over wire bytes.
//!
//! Unsigned numbers use ULEB128, signed numbers SLEB128. Overlong encodings
//! (extra continuation groups that add no bits) are accepted when reading.

use crate::wire::DecodeError;
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{ToPrimitive, Zero};
use smallvec::SmallVec;

pub type BufferType = SmallVec<[u8; 16]>;

pub fn write_uleb(buf: &mut BufferType, mut n: u64) {
    loop {
        let byte = (n & 0x7F) as u8;
        n >>= 7;
        if n == 0 {
            buf.push(byte);
            break;
        } else {
            buf.push(byte | 0x80);
        }
    }
}

pub fn write_sleb(buf: &mut BufferType, mut n: i64) {
    loop {
        let byte = (n & 0x7F) as u8;
        n >>= 7;
        let done = (n == 0 && byte & 0x40 == 0) || (n == -1 && byte & 0x40 != 0);
        if done {
            buf.push(byte);
            break;
        } else {
            buf.push(byte | 0x80);
        }
    }
}

pub fn write_uleb_big(buf: &mut BufferType, n: &BigUint) {
    let groups = n.to_radix_le(128);
    let last = groups.len().saturating_sub(1);
    for (i, group) in groups.into_iter().enumerate() {
        buf.push(if i < last { group | 0x80 } else { group });
    }
}

pub fn write_sleb_big(buf: &mut BufferType, n: &BigInt) {
    let mut n = n.clone();
    let mask = BigInt::from(0x7F);
    let minus_one = BigInt::from(-1);
    loop {
        // `&` on negative BigInts works on the two's complement form.
        let byte = (&n & &mask).to_u8().unwrap_or(0);
        n >>= 7;
        let done = (n.is_zero() && byte & 0x40 == 0) || (n == minus_one && byte & 0x40 != 0);
        if done {
            buf.push(byte);
            break;
        } else {
            buf.push(byte | 0x80);
        }
    }
}

pub fn write_bytes(buf: &mut BufferType, bytes: &[u8]) {
    write_uleb(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Forward-only cursor over an input buffer.
///
/// Every read reports [`DecodeError::Truncated`] instead of panicking when
/// the buffer ends early.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    pub fn read_byte(&mut self) -> Result<u8, DecodeError> {
        let byte = *self
            .bytes
            .get(self.offset)
            .ok_or(DecodeError::Truncated { needed: 1 })?;
        self.offset += 1;
        Ok(byte)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < len {
            return Err(DecodeError::Truncated {
                needed: len - self.remaining(),
            });
        }
        let bytes = &self.bytes[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    /// Read a ULEB128 number that must fit in 64 bits.
    pub fn read_uleb(&mut self) -> Result<u64, DecodeError> {
        let start = self.offset;
        let mut result = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = self.read_byte()?;
            let group = (byte & 0x7F) as u64;
            if shift < 64 {
                if shift > 0 && group >> (64 - shift) != 0 {
                    return Err(DecodeError::InvalidVarint { offset: start });
                }
                result |= group << shift;
            } else if group != 0 {
                return Err(DecodeError::InvalidVarint { offset: start });
            }
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
    }

    /// Read a ULEB128 length or count.
    pub fn read_len(&mut self) -> Result<usize, DecodeError> {
        let start = self.offset;
        let n = self.read_uleb()?;
        usize::try_from(n).map_err(|_| DecodeError::InvalidVarint { offset: start })
    }

    /// Read an SLEB128 number that must fit in 64 bits.
    pub fn read_sleb(&mut self) -> Result<i64, DecodeError> {
        let start = self.offset;
        self.read_sleb_big()?
            .to_i64()
            .ok_or(DecodeError::InvalidVarint { offset: start })
    }

    /// Read the 7-bit groups of one LEB128 number, least significant first.
    fn read_groups(&mut self) -> Result<Vec<u8>, DecodeError> {
        let mut groups = Vec::new();
        loop {
            let byte = self.read_byte()?;
            groups.push(byte & 0x7F);
            if byte & 0x80 == 0 {
                return Ok(groups);
            }
        }
    }

    pub fn read_uleb_big(&mut self) -> Result<BigUint, DecodeError> {
        let start = self.offset;
        let groups = self.read_groups()?;
        BigUint::from_radix_le(&groups, 128).ok_or(DecodeError::InvalidVarint { offset: start })
    }

    pub fn read_sleb_big(&mut self) -> Result<BigInt, DecodeError> {
        let start = self.offset;
        let groups = self.read_groups()?;
        let magnitude = BigUint::from_radix_le(&groups, 128)
            .ok_or(DecodeError::InvalidVarint { offset: start })?;
        let value = BigInt::from_biguint(Sign::Plus, magnitude);
        match groups.last() {
            Some(last) if last & 0x40 != 0 => Ok(value - (BigInt::from(1) << (7 * groups.len()))),
            _ => Ok(value),
        }
    }
}
