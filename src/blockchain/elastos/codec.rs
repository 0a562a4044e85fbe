//! Little-endian byte writer for the Elastos wire format.

use crate::core::errors::{Result, WalletError};

/// Maximum length accepted for one variable-length field on input.
pub const MAX_VAR_BYTES: usize = 8 * 1024 * 1024;

#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn u16(&mut self, v: u16) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn u64(&mut self, v: u64) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn i64(&mut self, v: i64) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn bytes(&mut self, v: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(v);
        self
    }

    /// Bitcoin-style compact size.
    pub fn varint(&mut self, v: u64) -> &mut Self {
        match v {
            0..=0xFC => self.u8(v as u8),
            0xFD..=0xFFFF => self.u8(0xFD).u16(v as u16),
            0x1_0000..=0xFFFF_FFFF => self.u8(0xFE).u32(v as u32),
            _ => self.u8(0xFF).u64(v),
        }
    }

    pub fn var_bytes(&mut self, v: &[u8]) -> &mut Self {
        self.varint(v.len() as u64).bytes(v)
    }

    pub fn var_str(&mut self, v: &str) -> &mut Self {
        self.var_bytes(v.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over a byte slice, used to read back raw transactions.
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| WalletError::SerializationError("unexpected end of data".into()))?;
        let out = &self.data[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16> {
        let mut b = [0u8; 2];
        b.copy_from_slice(self.take(2)?);
        Ok(u16::from_le_bytes(b))
    }

    pub fn u32(&mut self) -> Result<u32> {
        let mut b = [0u8; 4];
        b.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(b))
    }

    pub fn u64(&mut self) -> Result<u64> {
        let mut b = [0u8; 8];
        b.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(b))
    }

    pub fn varint(&mut self) -> Result<u64> {
        match self.u8()? {
            0xFD => Ok(self.u16()? as u64),
            0xFE => Ok(self.u32()? as u64),
            0xFF => self.u64(),
            v => Ok(v as u64),
        }
    }

    pub fn var_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.varint()? as usize;
        if len > MAX_VAR_BYTES {
            return Err(WalletError::SerializationError(format!("field too long: {}", len)));
        }
        self.take(len)
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_boundaries() {
        let mut w = ByteWriter::new();
        w.varint(0xFC).varint(0xFD).varint(0x1_0000).varint(0x1_0000_0000);
        assert_eq!(
            hex::encode(w.as_slice()),
            "fcfdfd00fe00000100ff0000000001000000"
        );

        let bytes = w.into_bytes();
        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.varint().unwrap(), 0xFC);
        assert_eq!(r.varint().unwrap(), 0xFD);
        assert_eq!(r.varint().unwrap(), 0x1_0000);
        assert_eq!(r.varint().unwrap(), 0x1_0000_0000);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_little_endian_integers() {
        let mut w = ByteWriter::new();
        w.u16(0x0102).u32(0x03040506).i64(-1);
        assert_eq!(hex::encode(w.as_slice()), "020106050403ffffffffffffffff");
    }

    #[test]
    fn test_reader_rejects_truncated_input() {
        let mut r = ByteReader::new(&[0x05, 0x01]);
        assert!(r.var_bytes().is_err());
    }
}
