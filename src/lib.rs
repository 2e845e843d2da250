//! Point-in-time (PIT) financial revision store.
//!
//! For a (symbol, field, fiscal period), values are published on
//! different calendar dates as revisions supersede earlier ones. The
//! store keeps every revision in a per-period linked chain inside a
//! flat `.data` segment, with a dense `.index` segment mapping periods
//! to chain heads, so "what value was known for period P as of date D"
//! is one index probe plus one forward walk.

pub mod calendar;
pub mod chain;
pub mod dump;
pub mod error;
pub mod layout;
pub mod mmap;
pub mod reader;
pub mod record;
pub mod source;
pub mod store;

pub use calendar::Calendar;
pub use chain::{ChainNode, ChainSet};
pub use error::{Error, Result};
pub use layout::{Interval, PitLayout};
pub use reader::PitReader;
pub use record::{PitRecord, NULL_NEXT, NULL_OFFSET, RECORD_SIZE};
pub use store::{write_field_store, FieldStore};
