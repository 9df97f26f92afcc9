use crate::{ObfuscatorError, Result};

/// Little-endian reader over an in-memory map file.
///
/// Absolute reads (`*_at`) leave the position alone; sequential reads
/// advance it by the size of the value read.
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn seek(&mut self, offset: usize) -> Result<()> {
        if offset > self.data.len() {
            return Err(ObfuscatorError::Truncated {
                offset,
                needed: 0,
                size: self.data.len(),
            });
        }
        self.pos = offset;
        Ok(())
    }

    pub fn bytes_at(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        let end = offset.checked_add(len).filter(|&end| end <= self.data.len());
        match end {
            Some(end) => Ok(&self.data[offset..end]),
            None => Err(ObfuscatorError::Truncated {
                offset,
                needed: len,
                size: self.data.len(),
            }),
        }
    }

    fn array_at<const N: usize>(&self, offset: usize) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes_at(offset, N)?);
        Ok(out)
    }

    pub fn read_u8_at(&self, offset: usize) -> Result<u8> {
        Ok(self.array_at::<1>(offset)?[0])
    }

    pub fn read_u16_at(&self, offset: usize) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array_at(offset)?))
    }

    pub fn read_i16_at(&self, offset: usize) -> Result<i16> {
        Ok(i16::from_le_bytes(self.array_at(offset)?))
    }

    pub fn read_u32_at(&self, offset: usize) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array_at(offset)?))
    }

    pub fn read_i32_at(&self, offset: usize) -> Result<i32> {
        Ok(i32::from_le_bytes(self.array_at(offset)?))
    }

    pub fn read_f32_at(&self, offset: usize) -> Result<f32> {
        Ok(f32::from_le_bytes(self.array_at(offset)?))
    }

    pub fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N]> {
        let out = self.array_at::<N>(self.pos)?;
        self.pos += N;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_bytes()?))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.read_bytes()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_bytes()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_bytes()?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.read_bytes()?))
    }
}
