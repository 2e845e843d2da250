use std::fmt;
use std::path::PathBuf;

use crate::layout::LayoutError;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Corrupt(&'static str),
    Unsupported(&'static str),
    MissingCalendar(PathBuf),
    UnknownDate(String),
    EmptySource(String),
    Layout(LayoutError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "io error: {err}"),
            Error::Corrupt(msg) => write!(f, "corrupt store: {msg}"),
            Error::Unsupported(msg) => write!(f, "unsupported: {msg}"),
            Error::MissingCalendar(path) => {
                write!(f, "calendar file not found: {}", path.display())
            }
            Error::UnknownDate(date) => write!(f, "date not in calendar: {date}"),
            Error::EmptySource(what) => write!(f, "empty source: {what}"),
            Error::Layout(err) => write!(f, "layout error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Layout(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Io(value)
    }
}

impl From<LayoutError> for Error {
    fn from(value: LayoutError) -> Self {
        Error::Layout(value)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
