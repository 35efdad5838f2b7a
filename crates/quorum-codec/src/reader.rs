//! Bounds-checked cursor over SCALE input

use parity_scale_codec::{Compact, Decode};
use quorum_errors::{Error, Result};

/// Cursor that reports exactly how many bytes were missing when input ends
/// early
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Bytes consumed since `start`
    pub fn consumed_since(&self, start: usize) -> &'a [u8] {
        &self.data[start..self.offset]
    }

    pub fn read_bytes(&mut self, len: usize, context: &str) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(Error::truncated(context, len, self.remaining()));
        }
        let bytes = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    pub fn read_u8(&mut self, context: &str) -> Result<u8> {
        Ok(self.read_bytes(1, context)?[0])
    }

    pub fn read_array<const N: usize>(&mut self, context: &str) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N, context)?);
        Ok(out)
    }

    /// Little-endian unsigned integer of `width` bytes
    pub fn read_uint(&mut self, width: usize, context: &str) -> Result<u128> {
        let bytes = self.read_bytes(width, context)?;
        let mut buf = [0u8; 16];
        buf[..width].copy_from_slice(bytes);
        Ok(u128::from_le_bytes(buf))
    }

    /// SCALE compact integer
    pub fn read_compact(&mut self, context: &str) -> Result<u128> {
        let first = *self
            .data
            .get(self.offset)
            .ok_or_else(|| Error::truncated(context, 1, 0))?;
        let len = match first & 0b11 {
            0b00 => 1,
            0b01 => 2,
            0b10 => 4,
            _ => ((first >> 2) as usize) + 5,
        };
        let mut bytes = self.read_bytes(len, context)?;
        let value = Compact::<u128>::decode(&mut bytes)
            .map_err(|e| Error::InvalidEncoding(format!("{context}: compact integer: {e}")))?;
        Ok(value.0)
    }

    /// Compact length prefix
    pub fn read_len(&mut self, context: &str) -> Result<usize> {
        let len = self.read_compact(context)?;
        usize::try_from(len)
            .map_err(|_| Error::InvalidEncoding(format!("{context}: length {len} overflows")))
    }

    /// Compact-length-prefixed byte string
    pub fn read_prefixed_bytes(&mut self, context: &str) -> Result<&'a [u8]> {
        let len = self.read_len(context)?;
        self.read_bytes(len, context)
    }

    /// Fail if any input is left unread
    pub fn finish(&self, context: &str) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::TrailingInput {
                context: context.to_string(),
                remaining: self.remaining(),
            })
        }
    }
}
