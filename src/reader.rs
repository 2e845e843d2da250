//! Point-in-time read path.
//!
//! `PitReader` maps one field store pair and answers "what value was
//! known for period P as of trading day D": find the period's chain
//! head through the index, then walk forward while the publish
//! ordinal stays at or below D. The last node visited wins; a chain
//! that starts after D resolves to unknown (`None`), never zero.
//!
//! Structural damage (a slot outside the data segment, a `next` that
//! does not advance, an ordinal running backwards) is a hard
//! `Corrupt` error. The walk never returns a value from a chain it
//! could not validate step by step.

use std::path::Path;

use crate::layout::{Interval, PitLayout};
use crate::mmap::MmapFile;
use crate::record::{
    read_index_slot, PitRecord, INDEX_HEADER_SIZE, INDEX_SLOT_SIZE, NULL_NEXT, NULL_OFFSET,
    RECORD_SIZE,
};
use crate::{Error, Result};

pub struct PitReader {
    data: MmapFile,
    index: MmapFile,
    first_period: u32,
    slot_count: usize,
}

impl PitReader {
    /// Map a store pair from explicit paths.
    pub fn open(data_path: &Path, index_path: &Path) -> Result<Self> {
        let data = MmapFile::open(data_path)?;
        let index = MmapFile::open(index_path)?;

        if data.len() % RECORD_SIZE != 0 {
            return Err(Error::Corrupt("data segment not record aligned"));
        }
        if index.len() < INDEX_HEADER_SIZE + INDEX_SLOT_SIZE
            || (index.len() - INDEX_HEADER_SIZE) % INDEX_SLOT_SIZE != 0
        {
            return Err(Error::Corrupt("index segment truncated"));
        }

        let first_period = u32::from_le_bytes(
            index.as_slice()[0..INDEX_HEADER_SIZE]
                .try_into()
                .expect("slice length"),
        );
        let slot_count = (index.len() - INDEX_HEADER_SIZE) / INDEX_SLOT_SIZE;

        Ok(Self {
            data,
            index,
            first_period,
            slot_count,
        })
    }

    /// Map the store for (symbol, field, interval) under a layout.
    pub fn open_in(
        layout: &PitLayout,
        symbol: &str,
        field: &str,
        interval: Interval,
    ) -> Result<Self> {
        let data_path = layout.data_path(symbol, field, interval)?;
        let index_path = layout.index_path(symbol, field, interval)?;
        Self::open(&data_path, &index_path)
    }

    pub fn first_period(&self) -> u32 {
        self.first_period
    }

    pub fn last_period(&self) -> u32 {
        self.first_period + (self.slot_count as u32 - 1)
    }

    /// Periods that actually have a revision chain, ascending.
    pub fn periods(&self) -> Result<Vec<u32>> {
        let mut periods = Vec::new();
        for slot in 0..self.slot_count {
            if self.slot_offset(slot)? != NULL_OFFSET {
                periods.push(self.first_period + slot as u32);
            }
        }
        Ok(periods)
    }

    /// Resolve `period` as of `as_of_ordinal`.
    ///
    /// Returns `Ok(None)` when the period is outside the indexed
    /// range, has no chain, or its first revision was published after
    /// the as-of date.
    pub fn lookup(&self, period: u32, as_of_ordinal: u32) -> Result<Option<f64>> {
        let Some(head) = self.chain_head(period)? else {
            return Ok(None);
        };
        Ok(self.walk_until(head, as_of_ordinal)?.map(|hit| hit.value))
    }

    /// Resolve one period for a run of as-of ordinals.
    ///
    /// When the ordinals arrive in ascending order, the walk resumes
    /// from the node the previous query stopped at instead of
    /// re-seeking the head. Results are identical either way.
    pub fn lookup_range(&self, period: u32, as_of_ordinals: &[u32]) -> Result<Vec<Option<f64>>> {
        let mut results = Vec::with_capacity(as_of_ordinals.len());
        let Some(head) = self.chain_head(period)? else {
            results.resize(as_of_ordinals.len(), None);
            return Ok(results);
        };

        let mut resume: Option<ChainHit> = None;
        for &as_of in as_of_ordinals {
            let start = match &resume {
                Some(prev) if prev.ordinal <= as_of => prev.offset,
                _ => head,
            };
            let hit = self.walk_until(start, as_of)?;
            results.push(hit.as_ref().map(|h| h.value));
            if hit.is_some() {
                resume = hit;
            }
        }
        Ok(results)
    }

    fn chain_head(&self, period: u32) -> Result<Option<usize>> {
        if period < self.first_period {
            return Ok(None);
        }
        let slot = (period - self.first_period) as usize;
        if slot >= self.slot_count {
            return Ok(None);
        }
        let offset = self.slot_offset(slot)?;
        if offset == NULL_OFFSET {
            return Ok(None);
        }
        Ok(Some(offset as usize))
    }

    fn slot_offset(&self, slot: usize) -> Result<u32> {
        let at = INDEX_HEADER_SIZE + slot * INDEX_SLOT_SIZE;
        read_index_slot(&self.index.as_slice()[at..])
    }

    fn read_record(&self, offset: usize) -> Result<PitRecord> {
        if offset % RECORD_SIZE != 0 {
            return Err(Error::Corrupt("record offset misaligned"));
        }
        if offset + RECORD_SIZE > self.data.len() {
            return Err(Error::Corrupt("record offset out of bounds"));
        }
        PitRecord::from_bytes(&self.data.as_slice()[offset..offset + RECORD_SIZE])
    }

    /// Walk from `start` while `ordinal <= as_of_ordinal`, validating
    /// every link. Returns the last qualifying position, or `None`
    /// when even the start node is published after the as-of date.
    fn walk_until(&self, start: usize, as_of_ordinal: u32) -> Result<Option<ChainHit>> {
        let mut offset = start;
        let mut last_ordinal: Option<u32> = None;
        let mut hit: Option<ChainHit> = None;

        loop {
            let record = self.read_record(offset)?;
            if let Some(prev) = last_ordinal {
                if record.ordinal < prev {
                    return Err(Error::Corrupt("chain ordinal decreased"));
                }
            }
            if record.ordinal > as_of_ordinal {
                break;
            }
            last_ordinal = Some(record.ordinal);
            hit = Some(ChainHit {
                offset,
                value: record.value,
                ordinal: record.ordinal,
            });
            if record.next == NULL_NEXT {
                break;
            }
            let next = record.next as usize;
            if next <= offset {
                return Err(Error::Corrupt("chain next does not advance"));
            }
            offset = next;
        }

        Ok(hit)
    }
}

/// Where a chain walk stopped, so an ascending range query can resume
/// instead of re-walking from the head.
#[derive(Debug, Clone)]
struct ChainHit {
    offset: usize,
    value: f64,
    ordinal: u32,
}
