//! Revision-chain construction.
//!
//! For one field, every period's revisions are ordered by publish
//! ordinal and linked oldest-first. Chains live in an arena: nodes sit
//! in one `Vec` and `next` is an arena index, mirroring the on-disk
//! offset links without any pointer graph. No revision is discarded
//! here; deciding which one is "current" is the resolver's job.

use std::collections::BTreeMap;

use log::warn;

use crate::calendar::Calendar;
use crate::source::RevisionRow;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainNode {
    pub ordinal: u32,
    pub period: u32,
    pub value: f64,
    pub next: Option<usize>,
}

/// All revision chains of one (symbol, field), keyed by period.
#[derive(Debug, Default)]
pub struct ChainSet {
    nodes: Vec<ChainNode>,
    heads: BTreeMap<u32, usize>,
    dropped_rows: usize,
}

impl ChainSet {
    /// Build chains from a field's rows.
    ///
    /// Rows whose publish date is not in the calendar are dropped with
    /// a diagnostic and counted in `dropped_rows`; everything else is
    /// grouped by period, stably sorted by ordinal (ties keep input
    /// order) and linked head to tail.
    pub fn build(rows: &[RevisionRow], calendar: &Calendar) -> Self {
        let mut dropped_rows = 0usize;
        let mut by_period: BTreeMap<u32, Vec<(u32, f64)>> = BTreeMap::new();

        for row in rows {
            let Some(ordinal) = calendar.ordinal(&row.date) else {
                warn!(
                    "{} {}: dropping revision for period {}: date {} not in calendar",
                    row.symbol, row.field, row.period, row.date
                );
                dropped_rows += 1;
                continue;
            };
            by_period
                .entry(row.period)
                .or_default()
                .push((ordinal, row.value));
        }

        let mut nodes = Vec::new();
        let mut heads = BTreeMap::new();
        for (period, mut revisions) in by_period {
            // Stable sort: same-ordinal revisions keep input order.
            revisions.sort_by_key(|(ordinal, _)| *ordinal);

            let head = nodes.len();
            heads.insert(period, head);
            let last = head + revisions.len() - 1;
            for (idx, (ordinal, value)) in revisions.into_iter().enumerate() {
                let slot = head + idx;
                nodes.push(ChainNode {
                    ordinal,
                    period,
                    value,
                    next: if slot < last { Some(slot + 1) } else { None },
                });
            }
        }

        Self {
            nodes,
            heads,
            dropped_rows,
        }
    }

    /// Rebuild a chain set from decoded parts. Offsets in `heads` and
    /// `next` must already be arena indices.
    pub fn from_parts(nodes: Vec<ChainNode>, heads: BTreeMap<u32, usize>) -> Self {
        Self {
            nodes,
            heads,
            dropped_rows: 0,
        }
    }

    pub fn periods(&self) -> impl Iterator<Item = u32> + '_ {
        self.heads.keys().copied()
    }

    pub fn first_period(&self) -> Option<u32> {
        self.heads.keys().next().copied()
    }

    pub fn last_period(&self) -> Option<u32> {
        self.heads.keys().next_back().copied()
    }

    pub fn head(&self, period: u32) -> Option<usize> {
        self.heads.get(&period).copied()
    }

    pub fn node(&self, idx: usize) -> Option<&ChainNode> {
        self.nodes.get(idx)
    }

    /// Walk one period's chain head to tail.
    pub fn walk(&self, period: u32) -> ChainWalk<'_> {
        ChainWalk {
            nodes: &self.nodes,
            cursor: self.head(period),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn dropped_rows(&self) -> usize {
        self.dropped_rows
    }
}

pub struct ChainWalk<'a> {
    nodes: &'a [ChainNode],
    cursor: Option<usize>,
}

impl<'a> Iterator for ChainWalk<'a> {
    type Item = &'a ChainNode;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.cursor?;
        let node = &self.nodes[idx];
        self.cursor = node.next;
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calendar() -> Calendar {
        Calendar::from_dates(vec![
            "2021-01-01".to_string(),
            "2021-01-04".to_string(),
            "2021-01-05".to_string(),
        ])
        .expect("calendar")
    }

    fn row(date: &str, period: u32, value: f64) -> RevisionRow {
        RevisionRow {
            date: date.to_string(),
            period,
            value,
            field: "roe".to_string(),
            symbol: "sh600519".to_string(),
        }
    }

    #[test]
    fn chains_sorted_by_ordinal_per_period() {
        let rows = vec![
            row("2021-01-05", 202004, 3.3),
            row("2021-01-01", 202004, 3.0),
            row("2021-01-04", 202004, 3.1),
            row("2021-01-01", 202007, 7.0),
        ];
        let chains = ChainSet::build(&rows, &calendar());
        assert_eq!(chains.len(), 4);
        assert_eq!(chains.dropped_rows(), 0);

        let walked: Vec<(u32, f64)> = chains
            .walk(202004)
            .map(|node| (node.ordinal, node.value))
            .collect();
        assert_eq!(walked, [(0, 3.0), (1, 3.1), (2, 3.3)]);

        let walked: Vec<f64> = chains.walk(202007).map(|node| node.value).collect();
        assert_eq!(walked, [7.0]);
        assert!(chains.walk(202001).next().is_none());
    }

    #[test]
    fn ordinals_never_decrease_along_a_chain() {
        let rows = vec![
            row("2021-01-04", 202004, 2.0),
            row("2021-01-01", 202004, 1.0),
            row("2021-01-04", 202004, 2.5),
            row("2021-01-05", 202004, 3.0),
        ];
        let chains = ChainSet::build(&rows, &calendar());
        let ordinals: Vec<u32> = chains.walk(202004).map(|node| node.ordinal).collect();
        let mut sorted = ordinals.clone();
        sorted.sort();
        assert_eq!(ordinals, sorted);
    }

    #[test]
    fn same_ordinal_keeps_input_order() {
        let rows = vec![
            row("2021-01-04", 202004, 1.0),
            row("2021-01-04", 202004, 2.0),
            row("2021-01-01", 202004, 0.5),
            row("2021-01-04", 202004, 3.0),
        ];
        let chains = ChainSet::build(&rows, &calendar());
        let values: Vec<f64> = chains.walk(202004).map(|node| node.value).collect();
        assert_eq!(values, [0.5, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn unknown_dates_are_dropped_not_fatal() {
        let rows = vec![
            row("2021-01-02", 202004, 9.0),
            row("2021-01-01", 202004, 3.0),
        ];
        let chains = ChainSet::build(&rows, &calendar());
        assert_eq!(chains.dropped_rows(), 1);
        let values: Vec<f64> = chains.walk(202004).map(|node| node.value).collect();
        assert_eq!(values, [3.0]);
    }

    #[test]
    fn periods_iterate_ascending() {
        let rows = vec![
            row("2021-01-01", 202007, 7.0),
            row("2021-01-01", 202001, 1.0),
            row("2021-01-01", 202004, 4.0),
        ];
        let chains = ChainSet::build(&rows, &calendar());
        let periods: Vec<u32> = chains.periods().collect();
        assert_eq!(periods, [202001, 202004, 202007]);
        assert_eq!(chains.first_period(), Some(202001));
        assert_eq!(chains.last_period(), Some(202007));
    }
}
