use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use gws_types::HistoryAction;

use crate::entry::{HistoryEntry, HistoryFilter, TimestampOp};
use crate::error::{HistoryError, HistoryResult};
use crate::traits::HistoryStorage;

#[derive(Default)]
struct HistoryState {
    entries: Vec<HistoryEntry>,
    by_uid: BTreeMap<String, Vec<usize>>,
}

/// In-memory history log for tests, local use, and embedding.
///
/// Sequence numbers start at 1 and are shared by all uids.
#[derive(Default)]
pub struct InMemoryHistory {
    inner: RwLock<HistoryState>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.inner.read().expect("lock poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HistoryStorage for InMemoryHistory {
    fn log(&self, uid: &str, action: HistoryAction, timestamp: DateTime<Utc>) -> HistoryResult<u64> {
        if uid.is_empty() {
            return Err(HistoryError::EmptyUid);
        }
        let mut state = self.inner.write().expect("lock poisoned");
        let sequence = state.entries.len() as u64 + 1;
        let index = state.entries.len();
        state.entries.push(HistoryEntry {
            uid: uid.to_string(),
            action,
            timestamp,
            sequence,
        });
        state.by_uid.entry(uid.to_string()).or_default().push(index);
        Ok(sequence)
    }

    fn get_by_timestamp(
        &self,
        op: TimestampOp,
        time: DateTime<Utc>,
        filters: &[HistoryFilter],
    ) -> HistoryResult<BTreeMap<String, u64>> {
        let state = self.inner.read().expect("lock poisoned");
        let mut out = BTreeMap::new();
        for entry in &state.entries {
            if op.matches(entry.timestamp, time) && filters.iter().all(|f| f.matches(entry)) {
                // Entries are in sequence order, so later ones overwrite.
                out.insert(entry.uid.clone(), entry.sequence);
            }
        }
        Ok(out)
    }

    fn latest(&self, uid: &str) -> HistoryResult<Option<HistoryEntry>> {
        let state = self.inner.read().expect("lock poisoned");
        Ok(state
            .by_uid
            .get(uid)
            .and_then(|indices| indices.last())
            .map(|&i| state.entries[i].clone()))
    }

    fn entries(&self, uid: &str) -> HistoryResult<Vec<HistoryEntry>> {
        let state = self.inner.read().expect("lock poisoned");
        Ok(state
            .by_uid
            .get(uid)
            .map(|indices| indices.iter().map(|&i| state.entries[i].clone()).collect())
            .unwrap_or_default())
    }
}

impl std::fmt::Debug for InMemoryHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.read().expect("lock poisoned");
        f.debug_struct("InMemoryHistory")
            .field("entries", &state.entries.len())
            .field("uids", &state.by_uid.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    // -----------------------------------------------------------------------
    // Logging
    // -----------------------------------------------------------------------

    #[test]
    fn sequence_is_global_and_increasing() {
        let history = InMemoryHistory::new();
        assert_eq!(history.log("a", HistoryAction::Add, at(1)).unwrap(), 1);
        assert_eq!(history.log("b", HistoryAction::Add, at(1)).unwrap(), 2);
        assert_eq!(history.log("a", HistoryAction::Modify, at(2)).unwrap(), 3);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn empty_uid_is_rejected() {
        let history = InMemoryHistory::new();
        assert_eq!(
            history.log("", HistoryAction::Add, at(1)),
            Err(HistoryError::EmptyUid)
        );
        assert!(history.is_empty());
    }

    #[test]
    fn latest_and_entries() {
        let history = InMemoryHistory::new();
        history.log("a", HistoryAction::Add, at(1)).unwrap();
        history.log("a", HistoryAction::Delete, at(5)).unwrap();

        let latest = history.latest("a").unwrap().unwrap();
        assert_eq!(latest.action, HistoryAction::Delete);
        assert_eq!(latest.sequence, 2);
        assert_eq!(history.entries("a").unwrap().len(), 2);
        assert!(history.latest("missing").unwrap().is_none());
        assert!(history.entries("missing").unwrap().is_empty());
    }

    // -----------------------------------------------------------------------
    // Timestamp queries
    // -----------------------------------------------------------------------

    #[test]
    fn get_by_timestamp_applies_op_and_filters() {
        let history = InMemoryHistory::new();
        history.log("f:a", HistoryAction::Add, at(10)).unwrap();
        history.log("f:b", HistoryAction::Add, at(20)).unwrap();
        history.log("g:c", HistoryAction::Add, at(20)).unwrap();
        history.log("f:a", HistoryAction::Modify, at(30)).unwrap();

        let since = history.get_by_timestamp(TimestampOp::Gt, at(15), &[]).unwrap();
        assert_eq!(since.len(), 3);
        assert_eq!(since["f:a"], 4);

        let adds = history
            .get_by_timestamp(
                TimestampOp::Ge,
                at(0),
                &[
                    HistoryFilter::Action(HistoryAction::Add),
                    HistoryFilter::UidPrefix("f:".into()),
                ],
            )
            .unwrap();
        assert_eq!(adds.keys().collect::<Vec<_>>(), vec!["f:a", "f:b"]);
        assert_eq!(adds["f:a"], 1);

        let none = history.get_by_timestamp(TimestampOp::Lt, at(10), &[]).unwrap();
        assert!(none.is_empty());
    }
}
