use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use gws_types::HistoryAction;
use tracing::debug;

use crate::entry::{HistoryFilter, TimestampOp};
use crate::error::HistoryResult;
use crate::traits::HistoryStorage;

/// Source of "now" for new entries.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Records one folder's object changes in a shared history log.
///
/// Uids are logged as `<prefix>:<uid>` so several folders can share one
/// storage. Query results have the prefix stripped again.
#[derive(Clone)]
pub struct HistoryCorrelator {
    storage: Arc<dyn HistoryStorage>,
    prefix: String,
    clock: Clock,
}

impl HistoryCorrelator {
    pub fn new(storage: Arc<dyn HistoryStorage>, prefix: impl Into<String>) -> Self {
        Self {
            storage,
            prefix: prefix.into(),
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the wall clock, e.g. with a fixed time in tests.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn storage(&self) -> &Arc<dyn HistoryStorage> {
        &self.storage
    }

    /// The uid as stored in the log.
    pub fn scoped(&self, uid: &str) -> String {
        format!("{}:{}", self.prefix, uid)
    }

    pub fn record_added<S: AsRef<str>>(&self, uids: &[S]) -> HistoryResult<usize> {
        self.record(uids, HistoryAction::Add)
    }

    pub fn record_deleted<S: AsRef<str>>(&self, uids: &[S]) -> HistoryResult<usize> {
        self.record(uids, HistoryAction::Delete)
    }

    pub fn record_modified(&self, uid: &str) -> HistoryResult<u64> {
        self.storage
            .log(&self.scoped(uid), HistoryAction::Modify, (self.clock)())
    }

    /// Reconcile the log with the complete uid set of a first
    /// synchronization.
    ///
    /// Logs `Add` for present uids the log never saw or last saw deleted,
    /// and `Delete` for uids the log considers live but the folder lacks.
    /// Uids whose logged state already matches the folder write nothing, so
    /// a restart over an unchanged folder is silent.
    pub fn record_initial<S: AsRef<str>>(&self, uids: &[S]) -> HistoryResult<usize> {
        let present: BTreeSet<&str> = uids.iter().map(|uid| uid.as_ref()).collect();
        let mut appeared = Vec::new();
        for uid in &present {
            let latest = self.storage.latest(&self.scoped(uid))?;
            if latest.map_or(true, |entry| entry.action == HistoryAction::Delete) {
                appeared.push(*uid);
            }
        }
        let vanished: Vec<String> = self
            .live_uids()?
            .into_iter()
            .filter(|uid| !present.contains(uid.as_str()))
            .collect();

        let added = self.record(&appeared[..], HistoryAction::Add)?;
        let deleted = self.record(&vanished[..], HistoryAction::Delete)?;
        Ok(added + deleted)
    }

    /// Uids of this folder whose newest entry is not a delete.
    pub fn live_uids(&self) -> HistoryResult<BTreeSet<String>> {
        let known = self.get_by_timestamp(TimestampOp::Ge, DateTime::<Utc>::MIN_UTC, &[])?;
        let mut live = BTreeSet::new();
        for uid in known.into_keys() {
            let latest = self.storage.latest(&self.scoped(&uid))?;
            if latest.is_some_and(|entry| entry.action != HistoryAction::Delete) {
                live.insert(uid);
            }
        }
        Ok(live)
    }

    /// Uids of this folder whose entries satisfy `timestamp <op> time`
    /// and all `filters`, mapped to the newest matching sequence.
    pub fn get_by_timestamp(
        &self,
        op: TimestampOp,
        time: DateTime<Utc>,
        filters: &[HistoryFilter],
    ) -> HistoryResult<BTreeMap<String, u64>> {
        let scope = format!("{}:", self.prefix);
        let mut all = Vec::with_capacity(filters.len() + 1);
        all.push(HistoryFilter::UidPrefix(scope.clone()));
        all.extend(filters.iter().cloned());

        let found = self.storage.get_by_timestamp(op, time, &all)?;
        Ok(found
            .into_iter()
            .filter_map(|(uid, seq)| uid.strip_prefix(scope.as_str()).map(|u| (u.to_string(), seq)))
            .collect())
    }

    /// Uids changed after `time`, optionally limited to one action.
    pub fn changes_since(
        &self,
        time: DateTime<Utc>,
        action: Option<HistoryAction>,
    ) -> HistoryResult<BTreeMap<String, u64>> {
        let filters: Vec<HistoryFilter> = action.into_iter().map(HistoryFilter::Action).collect();
        self.get_by_timestamp(TimestampOp::Gt, time, &filters)
    }

    fn record<S: AsRef<str>>(&self, uids: &[S], action: HistoryAction) -> HistoryResult<usize> {
        if uids.is_empty() {
            return Ok(0);
        }
        let now = (self.clock)();
        for uid in uids {
            self.storage.log(&self.scoped(uid.as_ref()), action, now)?;
        }
        debug!(prefix = %self.prefix, %action, count = uids.len(), "recorded history");
        Ok(uids.len())
    }
}

impl std::fmt::Debug for HistoryCorrelator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryCorrelator")
            .field("prefix", &self.prefix)
            .finish()
    }
}
