use std::path::PathBuf;

use clap::Parser;

use pitstore::dump::{dump, DumpConfig, DEFAULT_MAX_WORKERS};
use pitstore::layout::Interval;
use pitstore::source::FieldFilter;

#[derive(Parser)]
#[command(name = "pit-dump")]
#[command(about = "Dump point-in-time financial revision logs into binary field stores")]
struct Cli {
    /// Per-symbol CSV directory, or a single CSV file
    #[arg(long)]
    csv_path: PathBuf,

    /// PIT data directory (must contain calendars/day.txt)
    #[arg(long)]
    qlib_dir: PathBuf,

    /// Comma-separated field names to dump; overrides --exclude-fields
    #[arg(long, default_value = "")]
    include_fields: String,

    /// Comma-separated field names to skip
    #[arg(long, default_value = "")]
    exclude_fields: String,

    /// Worker threads
    #[arg(long, default_value_t = DEFAULT_MAX_WORKERS)]
    max_workers: usize,

    /// Input file suffix
    #[arg(long, default_value = ".csv")]
    file_suffix: String,

    /// Only dump the first N input files (debugging)
    #[arg(long)]
    limit_nums: Option<usize>,

    /// Reporting interval: q (quarterly), m (monthly) or a (annual)
    #[arg(long, default_value = "q")]
    interval: Interval,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = DumpConfig::new(cli.csv_path, cli.qlib_dir);
    config.filter = FieldFilter::from_comma_lists(&cli.include_fields, &cli.exclude_fields);
    config.max_workers = cli.max_workers;
    config.file_suffix = cli.file_suffix;
    config.limit = cli.limit_nums;
    config.interval = cli.interval;

    let stats = dump(&config)?;
    println!(
        "dumped symbols={} fields={} rows={} dropped_rows={} skipped_fields={} failed_symbols={}",
        stats.symbols,
        stats.fields,
        stats.rows,
        stats.dropped_rows,
        stats.skipped_fields,
        stats.failed_symbols
    );

    Ok(())
}
