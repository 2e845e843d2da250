//! Bulk PIT dump: per-symbol CSV revision logs in, field store pairs out.
//!
//! Symbols are independent, so the dump fans out over a bounded pool
//! of worker threads pulling file paths from one shared queue. Workers
//! share only the read-only calendar; every store pair is owned by
//! exactly one task and published whole, so no locking is needed
//! beyond the queue itself.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context, Result};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::calendar::Calendar;
use crate::chain::ChainSet;
use crate::layout::{Interval, PitLayout};
use crate::source::{group_by_field, read_rows, FieldFilter};
use crate::store::write_field_store;

pub const DEFAULT_MAX_WORKERS: usize = 16;
pub const DEFAULT_FILE_SUFFIX: &str = ".csv";

#[derive(Debug, Clone)]
pub struct DumpConfig {
    /// A directory of per-symbol CSV files, or a single file.
    pub csv_path: PathBuf,
    /// PIT data directory; must already hold `calendars/day.txt`.
    pub out_dir: PathBuf,
    pub filter: FieldFilter,
    pub max_workers: usize,
    pub file_suffix: String,
    /// Cap on the number of input files, for debugging.
    pub limit: Option<usize>,
    pub interval: Interval,
}

impl DumpConfig {
    pub fn new(csv_path: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            csv_path: csv_path.into(),
            out_dir: out_dir.into(),
            filter: FieldFilter::default(),
            max_workers: DEFAULT_MAX_WORKERS,
            file_suffix: DEFAULT_FILE_SUFFIX.to_string(),
            limit: None,
            interval: Interval::Quarterly,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DumpStats {
    pub symbols: usize,
    pub fields: usize,
    pub rows: usize,
    pub dropped_rows: usize,
    pub skipped_fields: usize,
    pub failed_symbols: usize,
}

impl DumpStats {
    fn merge(&mut self, other: &DumpStats) {
        self.symbols += other.symbols;
        self.fields += other.fields;
        self.rows += other.rows;
        self.dropped_rows += other.dropped_rows;
        self.skipped_fields += other.skipped_fields;
        self.failed_symbols += other.failed_symbols;
    }
}

/// Per-symbol ledger written next to the symbol's stores.
#[derive(Debug, Serialize, Deserialize)]
pub struct SymbolMeta {
    pub symbol: String,
    pub interval: String,
    pub fields: Vec<String>,
    pub rows: usize,
    pub dropped_rows: usize,
    pub dumped_at_ns: u64,
}

/// Run a full dump.
///
/// The calendar is loaded up front; a missing calendar aborts before
/// any store is attempted. A symbol that fails mid-way is logged and
/// counted, not fatal to the run.
pub fn dump(config: &DumpConfig) -> Result<DumpStats> {
    let layout = PitLayout::new(&config.out_dir);
    let calendar = Arc::new(
        Calendar::load(&layout.calendar_path()).context("load trading calendar")?,
    );

    let files = discover_files(&config.csv_path, &config.file_suffix, config.limit)?;
    if files.is_empty() {
        warn!("no input files under {}", config.csv_path.display());
        return Ok(DumpStats::default());
    }
    info!("dumping {} symbol file(s)", files.len());

    let (tx, rx) = mpsc::channel::<PathBuf>();
    for file in files {
        tx.send(file).expect("queue send");
    }
    drop(tx);

    let rx = Arc::new(Mutex::new(rx));
    let workers = config.max_workers.max(1);
    let mut handles = Vec::with_capacity(workers);
    for worker_id in 0..workers {
        let rx = Arc::clone(&rx);
        let calendar = Arc::clone(&calendar);
        let layout = layout.clone();
        let config = config.clone();
        let handle = thread::Builder::new()
            .name(format!("pit-dump-{worker_id}"))
            .spawn(move || worker_loop(&rx, &layout, &calendar, &config))
            .map_err(|e| anyhow!("failed to spawn worker thread: {e}"))?;
        handles.push(handle);
    }

    let mut stats = DumpStats::default();
    for handle in handles {
        let worker_stats = handle.join().map_err(|_| anyhow!("worker panicked"))?;
        stats.merge(&worker_stats);
    }

    info!(
        "dump finished: {} symbols, {} fields, {} rows ({} dropped, {} fields skipped, {} symbols failed)",
        stats.symbols, stats.fields, stats.rows, stats.dropped_rows, stats.skipped_fields,
        stats.failed_symbols
    );
    Ok(stats)
}

fn worker_loop(
    rx: &Mutex<Receiver<PathBuf>>,
    layout: &PitLayout,
    calendar: &Calendar,
    config: &DumpConfig,
) -> DumpStats {
    let mut stats = DumpStats::default();
    loop {
        let file = match rx.lock().expect("queue lock").recv() {
            Ok(file) => file,
            Err(_) => break,
        };
        match dump_symbol(&file, layout, calendar, config) {
            Ok(symbol_stats) => stats.merge(&symbol_stats),
            Err(err) => {
                error!("{}: dump failed: {err:#}", file.display());
                stats.failed_symbols += 1;
            }
        }
    }
    stats
}

/// Dump one symbol's revision log into its field stores.
pub fn dump_symbol(
    file: &Path,
    layout: &PitLayout,
    calendar: &Calendar,
    config: &DumpConfig,
) -> Result<DumpStats> {
    let symbol = symbol_from_file(file, &config.file_suffix);
    let rows = read_rows(file)?;
    let row_count = rows.len();
    let by_field = group_by_field(&symbol, rows, &config.filter);
    if by_field.is_empty() {
        return Ok(DumpStats::default());
    }

    let symbol_dir = layout.symbol_dir(&symbol)?;
    std::fs::create_dir_all(&symbol_dir)
        .with_context(|| format!("create {}", symbol_dir.display()))?;

    let mut stats = DumpStats {
        symbols: 1,
        rows: row_count,
        ..DumpStats::default()
    };
    let mut dumped_fields = Vec::new();
    for (field, field_rows) in &by_field {
        let chains = ChainSet::build(field_rows, calendar);
        stats.dropped_rows += chains.dropped_rows();
        if chains.is_empty() {
            warn!("{symbol}: field {field} is empty, skipping");
            stats.skipped_fields += 1;
            continue;
        }
        let data_path = layout.data_path(&symbol, field, config.interval)?;
        let index_path = layout.index_path(&symbol, field, config.interval)?;
        write_field_store(&data_path, &index_path, &chains)
            .with_context(|| format!("write store for {symbol}/{field}"))?;
        dumped_fields.push(field.clone());
        stats.fields += 1;
    }

    let meta = SymbolMeta {
        symbol: symbol.clone(),
        interval: config.interval.to_string(),
        fields: dumped_fields,
        rows: row_count,
        dropped_rows: stats.dropped_rows,
        dumped_at_ns: now_ns(),
    };
    write_meta(&layout.meta_path(&symbol)?, &meta)?;

    Ok(stats)
}

/// Input files sorted by name; a directory is globbed by suffix, a
/// single file is taken as-is.
fn discover_files(csv_path: &Path, suffix: &str, limit: Option<usize>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if csv_path.is_dir() {
        for entry in std::fs::read_dir(csv_path)
            .with_context(|| format!("read {}", csv_path.display()))?
        {
            let path = entry?.path();
            if path.is_file()
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.ends_with(suffix))
            {
                files.push(path);
            }
        }
        files.sort();
    } else {
        files.push(csv_path.to_path_buf());
    }
    if let Some(limit) = limit {
        files.truncate(limit);
    }
    Ok(files)
}

fn symbol_from_file(file: &Path, suffix: &str) -> String {
    let name = file
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    name.strip_suffix(suffix)
        .unwrap_or(&name)
        .trim()
        .to_lowercase()
}

fn write_meta(meta_path: &Path, meta: &SymbolMeta) -> Result<()> {
    let tmp = meta_path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(meta)?;
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp)?;
    file.write_all(&data)?;
    file.sync_all()?;
    std::fs::rename(tmp, meta_path)?;
    Ok(())
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_name_from_file_stem() {
        assert_eq!(
            symbol_from_file(Path::new("/src/SH600519.csv"), ".csv"),
            "sh600519"
        );
        assert_eq!(
            symbol_from_file(Path::new("data.txt"), ".csv"),
            "data.txt"
        );
    }

    #[test]
    fn discover_sorts_and_limits() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["b.csv", "a.csv", "c.csv", "skip.txt"] {
            std::fs::write(dir.path().join(name), "x").expect("write");
        }
        let files = discover_files(dir.path(), ".csv", None).expect("discover");
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, ["a.csv", "b.csv", "c.csv"]);

        let files = discover_files(dir.path(), ".csv", Some(2)).expect("discover");
        assert_eq!(files.len(), 2);
    }
}
