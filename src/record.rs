//! Fixed-layout wire records for the PIT field store.
//!
//! A data segment is a flat sequence of 20-byte records. The `next`
//! field is a byte offset into the same segment, forming a singly
//! linked revision chain per period. The index segment is a `u32`
//! first-period header followed by one `u32` head offset per period.

use crate::{Error, Result};

pub const RECORD_SIZE: usize = 20;
pub const INDEX_SLOT_SIZE: usize = 4;
pub const INDEX_HEADER_SIZE: usize = 4;

/// Chain-tail sentinel for `PitRecord::next`.
pub const NULL_NEXT: u32 = u32::MAX;
/// Absent-period sentinel for index slots.
pub const NULL_OFFSET: u32 = u32::MAX;

/// One revision on disk: `value` for `period` became known at the
/// trading day `ordinal`; the next revision of the same period lives
/// at byte offset `next` (or `NULL_NEXT` at the chain tail).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitRecord {
    pub ordinal: u32,
    pub period: u32,
    pub value: f64,
    pub next: u32,
}

impl PitRecord {
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        buf[0..4].copy_from_slice(&self.ordinal.to_le_bytes());
        buf[4..8].copy_from_slice(&self.period.to_le_bytes());
        buf[8..16].copy_from_slice(&self.value.to_le_bytes());
        buf[16..20].copy_from_slice(&self.next.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < RECORD_SIZE {
            return Err(Error::Corrupt("record truncated"));
        }
        let ordinal = u32::from_le_bytes(buf[0..4].try_into().expect("slice length"));
        let period = u32::from_le_bytes(buf[4..8].try_into().expect("slice length"));
        let value = f64::from_le_bytes(buf[8..16].try_into().expect("slice length"));
        let next = u32::from_le_bytes(buf[16..20].try_into().expect("slice length"));
        Ok(Self {
            ordinal,
            period,
            value,
            next,
        })
    }

    pub fn has_next(&self) -> bool {
        self.next != NULL_NEXT
    }
}

pub fn read_index_slot(buf: &[u8]) -> Result<u32> {
    if buf.len() < INDEX_SLOT_SIZE {
        return Err(Error::Corrupt("index slot truncated"));
    }
    Ok(u32::from_le_bytes(
        buf[0..INDEX_SLOT_SIZE].try_into().expect("slice length"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_byte_round_trip() {
        let record = PitRecord {
            ordinal: 4879,
            period: 202004,
            value: 3.25,
            next: NULL_NEXT,
        };
        let bytes = record.to_bytes();
        assert_eq!(bytes.len(), RECORD_SIZE);
        let decoded = PitRecord::from_bytes(&bytes).expect("decode");
        assert_eq!(decoded, record);
        assert!(!decoded.has_next());
    }

    #[test]
    fn truncated_record_is_corrupt() {
        let record = PitRecord {
            ordinal: 1,
            period: 2020,
            value: 1.0,
            next: 20,
        };
        let bytes = record.to_bytes();
        assert!(PitRecord::from_bytes(&bytes[..RECORD_SIZE - 1]).is_err());
    }
}
