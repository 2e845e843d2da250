use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DATA_FILE_SUFFIX: &str = "data";
pub const INDEX_FILE_SUFFIX: &str = "index";
pub const CALENDAR_FILE: &str = "day.txt";
pub const META_FILE: &str = "meta.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    EmptyComponent { field: &'static str },
    InvalidComponent { field: &'static str, value: String },
    InvalidInterval { value: String },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::EmptyComponent { field } => {
                write!(f, "empty path component: {field}")
            }
            LayoutError::InvalidComponent { field, value } => {
                write!(f, "invalid path component for {field}: {value}")
            }
            LayoutError::InvalidInterval { value } => {
                write!(f, "invalid interval (expected q, m or a): {value}")
            }
        }
    }
}

impl std::error::Error for LayoutError {}

type Result<T> = std::result::Result<T, LayoutError>;

/// Reporting interval of a dumped field. The suffix becomes part of
/// the store file stem, so `roe` dumped quarterly and yearly coexist
/// as `roe_q.*` and `roe_a.*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Quarterly,
    Monthly,
    Annual,
}

impl Interval {
    pub fn suffix(&self) -> &'static str {
        match self {
            Interval::Quarterly => "q",
            Interval::Monthly => "m",
            Interval::Annual => "a",
        }
    }
}

impl FromStr for Interval {
    type Err = LayoutError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "q" => Ok(Interval::Quarterly),
            "m" => Ok(Interval::Monthly),
            "a" => Ok(Interval::Annual),
            _ => Err(LayoutError::InvalidInterval {
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Path layout of a PIT data directory:
///
/// ```text
/// <root>/calendars/day.txt
/// <root>/financial/<symbol>/<field>_<interval>.data
/// <root>/financial/<symbol>/<field>_<interval>.index
/// <root>/financial/<symbol>/meta.json
/// ```
#[derive(Debug, Clone)]
pub struct PitLayout {
    root: PathBuf,
}

impl PitLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn calendar_path(&self) -> PathBuf {
        self.root.join("calendars").join(CALENDAR_FILE)
    }

    pub fn symbol_dir(&self, symbol: &str) -> Result<PathBuf> {
        validate_component("symbol", symbol)?;
        Ok(self.root.join("financial").join(symbol))
    }

    pub fn meta_path(&self, symbol: &str) -> Result<PathBuf> {
        Ok(self.symbol_dir(symbol)?.join(META_FILE))
    }

    pub fn data_path(&self, symbol: &str, field: &str, interval: Interval) -> Result<PathBuf> {
        Ok(self
            .symbol_dir(symbol)?
            .join(store_file_name(field, interval, DATA_FILE_SUFFIX)?))
    }

    pub fn index_path(&self, symbol: &str, field: &str, interval: Interval) -> Result<PathBuf> {
        Ok(self
            .symbol_dir(symbol)?
            .join(store_file_name(field, interval, INDEX_FILE_SUFFIX)?))
    }
}

fn store_file_name(field: &str, interval: Interval, suffix: &str) -> Result<String> {
    validate_component("field", field)?;
    Ok(format!("{}_{}.{}", field, interval.suffix(), suffix))
}

fn validate_component(field: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(LayoutError::EmptyComponent { field });
    }
    if value == "." || value == ".." || value.contains('/') || value.contains('\\') {
        return Err(LayoutError::InvalidComponent {
            field,
            value: value.to_string(),
        });
    }
    if value.contains('\0') {
        return Err(LayoutError::InvalidComponent {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}
