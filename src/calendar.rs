//! Trading-day calendar index.
//!
//! The calendar file is an ordered list of trading dates, one
//! `YYYY-MM-DD` per line. Its line number is the date's ordinal, the
//! sort key used everywhere in place of the raw date. The mapping is
//! bijective and read-only; dumps share one instance behind an `Arc`.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::{Error, Result};

#[derive(Debug)]
pub struct Calendar {
    dates: Vec<String>,
    ordinals: HashMap<String, u32>,
}

impl Calendar {
    /// Load the calendar from a trading-day list.
    ///
    /// Fails with `MissingCalendar` when the file does not exist or
    /// holds no dates; a dump cannot resolve any ordinal without it.
    pub fn load(path: &Path) -> Result<Self> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::MissingCalendar(path.to_path_buf()))
            }
            Err(err) => return Err(err.into()),
        };

        let reader = BufReader::new(file);
        let mut dates = Vec::new();
        let mut ordinals = HashMap::new();
        for line in reader.lines() {
            let line = line?;
            let date = line.trim();
            if date.is_empty() {
                continue;
            }
            // First occurrence wins; a duplicated line would otherwise
            // break the bijection.
            if ordinals.contains_key(date) {
                return Err(Error::Corrupt("duplicate date in calendar"));
            }
            ordinals.insert(date.to_string(), dates.len() as u32);
            dates.push(date.to_string());
        }

        if dates.is_empty() {
            return Err(Error::MissingCalendar(path.to_path_buf()));
        }

        Ok(Self { dates, ordinals })
    }

    /// Build a calendar from an in-memory date list. Used by tests and
    /// callers that already hold the trading-day sequence.
    pub fn from_dates(dates: Vec<String>) -> Result<Self> {
        let mut ordinals = HashMap::with_capacity(dates.len());
        for (idx, date) in dates.iter().enumerate() {
            if ordinals.insert(date.clone(), idx as u32).is_some() {
                return Err(Error::Corrupt("duplicate date in calendar"));
            }
        }
        Ok(Self { dates, ordinals })
    }

    /// Position of `date` in the trading calendar.
    pub fn ordinal(&self, date: &str) -> Option<u32> {
        self.ordinals.get(date).copied()
    }

    /// Like `ordinal` but surfaces the miss as a typed error.
    pub fn require_ordinal(&self, date: &str) -> Result<u32> {
        self.ordinal(date)
            .ok_or_else(|| Error::UnknownDate(date.to_string()))
    }

    /// Inverse of `ordinal`.
    pub fn date(&self, ordinal: u32) -> Option<&str> {
        self.dates.get(ordinal as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn sample() -> Calendar {
        Calendar::from_dates(vec![
            "2020-12-31".to_string(),
            "2021-01-01".to_string(),
            "2021-01-04".to_string(),
        ])
        .expect("calendar")
    }

    #[test]
    fn ordinal_is_bijective() {
        let cal = sample();
        assert_eq!(cal.len(), 3);
        for ordinal in 0..cal.len() as u32 {
            let date = cal.date(ordinal).expect("date");
            assert_eq!(cal.ordinal(date), Some(ordinal));
        }
        assert_eq!(cal.ordinal("2021-01-02"), None);
        assert!(cal.date(3).is_none());
    }

    #[test]
    fn unknown_date_is_typed() {
        let cal = sample();
        let err = cal.require_ordinal("1999-01-01").unwrap_err();
        assert!(matches!(err, Error::UnknownDate(_)));
    }

    #[test]
    fn load_skips_blank_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("day.txt");
        let mut file = File::create(&path).expect("create");
        write!(file, "2021-01-01\n\n2021-01-04\n").expect("write");
        drop(file);

        let cal = Calendar::load(&path).expect("load");
        assert_eq!(cal.len(), 2);
        assert_eq!(cal.ordinal("2021-01-04"), Some(1));
    }

    #[test]
    fn missing_calendar_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = Calendar::load(&dir.path().join("day.txt")).unwrap_err();
        assert!(matches!(err, Error::MissingCalendar(_)));
    }

    #[test]
    fn duplicate_date_is_corrupt() {
        let err = Calendar::from_dates(vec![
            "2021-01-01".to_string(),
            "2021-01-01".to_string(),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::Corrupt(_)));
    }
}
