use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use gws_types::HistoryAction;

use crate::entry::{HistoryEntry, HistoryFilter, TimestampOp};
use crate::error::HistoryResult;

/// Append-only store of object history entries.
pub trait HistoryStorage: Send + Sync {
    /// Append an entry and return its sequence number.
    fn log(&self, uid: &str, action: HistoryAction, timestamp: DateTime<Utc>) -> HistoryResult<u64>;

    /// Uids with an entry satisfying `timestamp <op> time` and every filter,
    /// mapped to the sequence of the newest such entry.
    fn get_by_timestamp(
        &self,
        op: TimestampOp,
        time: DateTime<Utc>,
        filters: &[HistoryFilter],
    ) -> HistoryResult<BTreeMap<String, u64>>;

    /// The newest entry for `uid`.
    fn latest(&self, uid: &str) -> HistoryResult<Option<HistoryEntry>>;

    /// All entries for `uid`, oldest first.
    fn entries(&self, uid: &str) -> HistoryResult<Vec<HistoryEntry>>;
}
