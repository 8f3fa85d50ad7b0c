//! Checked big-endian accessors over raw byte slices. Every reader returns
//! `Truncated` instead of panicking so adversarial buffers can be parsed
//! directly.

use crate::error::VaaError;

pub trait ByteUtils {
    fn get_u8(&self, index: usize) -> Result<u8, VaaError>;
    fn get_u16(&self, index: usize) -> Result<u16, VaaError>;
    fn get_u32(&self, index: usize) -> Result<u32, VaaError>;
    fn get_u64(&self, index: usize) -> Result<u64, VaaError>;
    fn get_u128_be(&self, index: usize) -> Result<u128, VaaError>;
    fn get_bytes(&self, index: usize, len: usize) -> Result<&[u8], VaaError>;
    fn get_const_bytes<const N: usize>(&self, index: usize) -> Result<[u8; N], VaaError>;
}

impl ByteUtils for &[u8] {
    fn get_u8(&self, index: usize) -> Result<u8, VaaError> {
        self.get(index).copied().ok_or(VaaError::Truncated)
    }

    fn get_u16(&self, index: usize) -> Result<u16, VaaError> {
        self.get_const_bytes(index).map(u16::from_be_bytes)
    }

    fn get_u32(&self, index: usize) -> Result<u32, VaaError> {
        self.get_const_bytes(index).map(u32::from_be_bytes)
    }

    fn get_u64(&self, index: usize) -> Result<u64, VaaError> {
        self.get_const_bytes(index).map(u64::from_be_bytes)
    }

    fn get_u128_be(&self, index: usize) -> Result<u128, VaaError> {
        self.get_const_bytes(index).map(u128::from_be_bytes)
    }

    fn get_bytes(&self, index: usize, len: usize) -> Result<&[u8], VaaError> {
        let end = index.checked_add(len).ok_or(VaaError::Truncated)?;
        self.get(index..end).ok_or(VaaError::Truncated)
    }

    fn get_const_bytes<const N: usize>(&self, index: usize) -> Result<[u8; N], VaaError> {
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(self.get_bytes(index, N)?);
        Ok(bytes)
    }
}

/// Turn a string into a fixed length array, right-padded with \0s and
/// truncated if longer. Used for module identifiers in governance packets.
pub fn string_to_array<const N: usize>(s: &str) -> [u8; N] {
    let bytes = s.as_bytes();
    let len = usize::min(N, bytes.len());
    let mut result = [0u8; N];
    result[..len].copy_from_slice(&bytes[..len]);
    result
}

pub fn get_string_from_32(v: &[u8]) -> String {
    let s = String::from_utf8_lossy(v);
    s.chars().filter(|c| c != &'\0').collect()
}
