//! Raw revision-log input: per-symbol CSV files and the field grouper.
//!
//! One CSV file per symbol, one row per observed (field, period,
//! publish-date) revision. Rows are unordered and may repeat; the
//! grouper partitions them by field without deduplicating, leaving
//! ordering entirely to the chain builder.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use log::warn;

/// One raw revision before calendar resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct RevisionRow {
    pub date: String,
    pub period: u32,
    pub value: f64,
    pub field: String,
    pub symbol: String,
}

#[derive(Debug, Clone)]
struct ColumnIndices {
    date: usize,
    period: usize,
    value: usize,
    field: usize,
    symbol: usize,
}

impl ColumnIndices {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let lookup = |name: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| anyhow!("missing csv column: {name}"))
        };

        Ok(Self {
            date: lookup("date")?,
            period: lookup("period")?,
            value: lookup("value")?,
            field: lookup("field")?,
            symbol: lookup("symbol")?,
        })
    }
}

/// Read the full revision log for one symbol, preserving row order.
pub fn read_rows(path: &Path) -> Result<Vec<RevisionRow>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut csv = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(file);
    let headers = csv.headers()?.clone();
    let indices = ColumnIndices::from_headers(&headers)?;

    let mut rows = Vec::new();
    for (line, record) in csv.records().enumerate() {
        let record = record?;
        let get = |idx: usize, name: &str| -> Result<&str> {
            record
                .get(idx)
                .ok_or_else(|| anyhow!("row {}: missing {name}", line + 2))
        };

        let date = get(indices.date, "date")?.to_string();
        let period: u32 = get(indices.period, "period")?
            .parse()
            .with_context(|| format!("row {}: bad period", line + 2))?;
        let value: f64 = get(indices.value, "value")?
            .parse()
            .with_context(|| format!("row {}: bad value", line + 2))?;
        let field = get(indices.field, "field")?.to_string();
        let symbol = get(indices.symbol, "symbol")?.to_string();

        rows.push(RevisionRow {
            date,
            period,
            value,
            field,
            symbol,
        });
    }

    Ok(rows)
}

/// Include/exclude policy over field names. An explicit include set
/// wins; otherwise the exclude set drops names; otherwise everything
/// is kept.
#[derive(Debug, Clone, Default)]
pub struct FieldFilter {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl FieldFilter {
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self { include, exclude }
    }

    /// Parse comma-separated field lists, trimming whitespace and
    /// dropping empty entries.
    pub fn from_comma_lists(include: &str, exclude: &str) -> Self {
        let split = |s: &str| -> Vec<String> {
            s.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        };
        Self::new(split(include), split(exclude))
    }

    pub fn keeps(&self, field: &str) -> bool {
        if !self.include.is_empty() {
            return self.include.iter().any(|f| f == field);
        }
        if !self.exclude.is_empty() {
            return !self.exclude.iter().any(|f| f == field);
        }
        true
    }
}

/// Partition a symbol's rows by field, applying the filter. Row order
/// within each field matches input order; field iteration order is
/// name order, which keeps dump output deterministic.
pub fn group_by_field(
    symbol: &str,
    rows: Vec<RevisionRow>,
    filter: &FieldFilter,
) -> BTreeMap<String, Vec<RevisionRow>> {
    if rows.is_empty() {
        warn!("{symbol}: revision log is empty");
        return BTreeMap::new();
    }

    let mut by_field: BTreeMap<String, Vec<RevisionRow>> = BTreeMap::new();
    for row in rows {
        if !filter.keeps(&row.field) {
            continue;
        }
        by_field.entry(row.field.clone()).or_default().push(row);
    }

    if by_field.is_empty() {
        warn!("{symbol}: no fields left after filtering");
    }

    by_field
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn row(field: &str, period: u32, value: f64) -> RevisionRow {
        RevisionRow {
            date: "2021-01-01".to_string(),
            period,
            value,
            field: field.to_string(),
            symbol: "sh600519".to_string(),
        }
    }

    #[test]
    fn read_rows_from_csv() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sh600519.csv");
        let mut file = File::create(&path).expect("create");
        write!(
            file,
            "date,period,value,field,symbol\n\
             2021-01-01,202001,1,open,sh600519\n\
             2021-01-01, 202004 ,3.5,open,sh600519\n"
        )
        .expect("write");
        drop(file);

        let rows = read_rows(&path).expect("read");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], row("open", 202001, 1.0));
        assert_eq!(rows[1].period, 202004);
        assert_eq!(rows[1].value, 3.5);
    }

    #[test]
    fn missing_column_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "date,period,value,field\n2021-01-01,1,1,open\n")
            .expect("write");
        assert!(read_rows(&path).is_err());
    }

    #[test]
    fn include_wins_over_exclude() {
        let filter = FieldFilter::from_comma_lists("open, close", "open");
        assert!(filter.keeps("open"));
        assert!(filter.keeps("close"));
        assert!(!filter.keeps("roe"));
    }

    #[test]
    fn exclude_applies_without_include() {
        let filter = FieldFilter::from_comma_lists("", "roe, ");
        assert!(filter.keeps("open"));
        assert!(!filter.keeps("roe"));
    }

    #[test]
    fn empty_filter_keeps_all() {
        let filter = FieldFilter::default();
        assert!(filter.keeps("anything"));
    }

    #[test]
    fn grouping_preserves_input_order_and_duplicates() {
        let rows = vec![
            row("open", 202001, 1.0),
            row("close", 202001, 9.0),
            row("open", 202001, 1.0),
            row("open", 202002, 2.0),
        ];
        let grouped = group_by_field("sh600519", rows, &FieldFilter::default());
        assert_eq!(grouped.len(), 2);
        let open = &grouped["open"];
        assert_eq!(open.len(), 3);
        assert_eq!(open[0].value, 1.0);
        assert_eq!(open[1].value, 1.0);
        assert_eq!(open[2].period, 202002);
        // BTreeMap iterates field names in order.
        let fields: Vec<&str> = grouped.keys().map(String::as_str).collect();
        assert_eq!(fields, ["close", "open"]);
    }
}
