//! Field store encoding and publication.
//!
//! One store is a `.data`/`.index` pair for a (symbol, field,
//! interval). The data segment lays each period's chain out head to
//! tail with `next` as byte offsets, making the pair self-describing:
//! a reader needs the index only to find a head, never mid-walk.
//!
//! The index stores `first_period` plus one dense `u32` slot per
//! period through the maximum present, so a period's slot is
//! `period - first_period` with no search.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::chain::{ChainNode, ChainSet};
use crate::record::{
    read_index_slot, PitRecord, INDEX_HEADER_SIZE, INDEX_SLOT_SIZE, NULL_NEXT, NULL_OFFSET,
    RECORD_SIZE,
};
use crate::{Error, Result};

pub struct FieldStore;

impl FieldStore {
    /// Serialize a chain set into `(data, index)` segment bytes.
    ///
    /// Empty chain sets are rejected; the dump skips empty fields
    /// before it ever gets here.
    pub fn encode(chains: &ChainSet) -> Result<(Vec<u8>, Vec<u8>)> {
        let first_period = chains
            .first_period()
            .ok_or_else(|| Error::EmptySource("no periods to encode".to_string()))?;
        let last_period = chains.last_period().expect("non-empty chain set");

        let data_len = chains
            .len()
            .checked_mul(RECORD_SIZE)
            .filter(|len| *len < NULL_OFFSET as usize)
            .ok_or(Error::Unsupported("data segment exceeds offset range"))?;

        let mut data = Vec::with_capacity(data_len);
        let mut heads: BTreeMap<u32, u32> = BTreeMap::new();
        for period in chains.periods() {
            let mut remaining = chains.walk(period).count();
            heads.insert(period, data.len() as u32);
            for node in chains.walk(period) {
                remaining -= 1;
                let next = if remaining > 0 {
                    (data.len() + RECORD_SIZE) as u32
                } else {
                    NULL_NEXT
                };
                let record = PitRecord {
                    ordinal: node.ordinal,
                    period: node.period,
                    value: node.value,
                    next,
                };
                data.extend_from_slice(&record.to_bytes());
            }
        }

        let slots = (last_period - first_period) as usize + 1;
        let mut index = Vec::with_capacity(INDEX_HEADER_SIZE + slots * INDEX_SLOT_SIZE);
        index.extend_from_slice(&first_period.to_le_bytes());
        for period in first_period..=last_period {
            let offset = heads.get(&period).copied().unwrap_or(NULL_OFFSET);
            index.extend_from_slice(&offset.to_le_bytes());
        }

        Ok((data, index))
    }

    /// Rebuild the chain set from segment bytes, validating structure
    /// the same way the resolver does. Used for verification and
    /// round-trip tests.
    pub fn decode(data: &[u8], index: &[u8]) -> Result<ChainSet> {
        if data.len() % RECORD_SIZE != 0 {
            return Err(Error::Corrupt("data segment not record aligned"));
        }
        if index.len() < INDEX_HEADER_SIZE
            || (index.len() - INDEX_HEADER_SIZE) % INDEX_SLOT_SIZE != 0
        {
            return Err(Error::Corrupt("index segment truncated"));
        }

        let first_period = u32::from_le_bytes(
            index[0..INDEX_HEADER_SIZE].try_into().expect("slice length"),
        );
        let slot_count = (index.len() - INDEX_HEADER_SIZE) / INDEX_SLOT_SIZE;

        let mut nodes = Vec::with_capacity(data.len() / RECORD_SIZE);
        let mut heads = BTreeMap::new();
        for slot in 0..slot_count {
            let at = INDEX_HEADER_SIZE + slot * INDEX_SLOT_SIZE;
            let head_offset = read_index_slot(&index[at..])?;
            if head_offset == NULL_OFFSET {
                continue;
            }
            let period = first_period + slot as u32;
            heads.insert(period, nodes.len());

            let mut offset = head_offset as usize;
            let mut prev_ordinal: Option<u32> = None;
            loop {
                let record = read_record(data, offset)?;
                if record.period != period {
                    return Err(Error::Corrupt("record period does not match index slot"));
                }
                if let Some(prev) = prev_ordinal {
                    if record.ordinal < prev {
                        return Err(Error::Corrupt("chain ordinal decreased"));
                    }
                }
                let next_offset = if record.next == NULL_NEXT {
                    None
                } else {
                    if record.next as usize <= offset {
                        return Err(Error::Corrupt("chain next does not advance"));
                    }
                    Some(record.next as usize)
                };
                nodes.push(ChainNode {
                    ordinal: record.ordinal,
                    period: record.period,
                    value: record.value,
                    next: next_offset.map(|_| nodes.len() + 1),
                });
                prev_ordinal = Some(record.ordinal);
                match next_offset {
                    Some(next) => offset = next,
                    None => break,
                }
            }
        }

        Ok(ChainSet::from_parts(nodes, heads))
    }
}

fn read_record(data: &[u8], offset: usize) -> Result<PitRecord> {
    if offset % RECORD_SIZE != 0 {
        return Err(Error::Corrupt("record offset misaligned"));
    }
    if offset + RECORD_SIZE > data.len() {
        return Err(Error::Corrupt("record offset out of bounds"));
    }
    PitRecord::from_bytes(&data[offset..offset + RECORD_SIZE])
}

/// Write a store pair, publishing only on success.
///
/// Both segments go to `.tmp` siblings first and are renamed into
/// place data-first, so any reader that can see an index can also see
/// the data it points into. An aborted dump leaves at most `.tmp`
/// litter, never a partial store.
pub fn write_field_store(data_path: &Path, index_path: &Path, chains: &ChainSet) -> Result<()> {
    let (data, index) = FieldStore::encode(chains)?;

    let data_tmp = data_path.with_extension("data.tmp");
    let index_tmp = index_path.with_extension("index.tmp");
    write_segment(&data_tmp, &data)?;
    write_segment(&index_tmp, &index)?;

    std::fs::rename(&data_tmp, data_path)?;
    std::fs::rename(&index_tmp, index_path)?;
    Ok(())
}

fn write_segment(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}
