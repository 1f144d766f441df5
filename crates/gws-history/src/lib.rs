//! Object history log for groupware storage.
//!
//! Every add, modify, and delete the data layer observes is appended to a
//! [`HistoryStorage`] as a [`HistoryEntry`]. Entries are never changed or
//! removed. Dependent components catch up incrementally by asking which
//! uids changed relative to a point in time instead of re-reading a folder.
//!
//! # Components
//!
//! - [`HistoryStorage`] -- append-only log with timestamp queries
//! - [`InMemoryHistory`] -- in-memory log with a global sequence
//! - [`HistoryCorrelator`] -- scopes one folder's uids in a shared log and
//!   turns synchronization outcomes into entries

pub mod correlator;
pub mod entry;
pub mod error;
pub mod memory;
pub mod traits;

pub use correlator::{Clock, HistoryCorrelator};
pub use entry::{HistoryEntry, HistoryFilter, TimestampOp};
pub use error::{HistoryError, HistoryResult};
pub use memory::InMemoryHistory;
pub use traits::HistoryStorage;
