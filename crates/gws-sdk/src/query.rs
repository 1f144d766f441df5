use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use gws_history::{HistoryCorrelator, HistoryFilter, HistoryStorage, TimestampOp};
use gws_types::HistoryAction;
use serde::{Deserialize, Serialize};

use crate::error::SdkResult;

/// Views available from [`DataQuery::get_query`](crate::DataQuery::get_query).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    History,
}

/// Incremental change view of one folder, backed by the history log.
///
/// Uids are reported without the folder scope prefix.
#[derive(Clone, Debug)]
pub struct HistoryQuery {
    correlator: HistoryCorrelator,
}

impl HistoryQuery {
    pub(crate) fn new(correlator: HistoryCorrelator) -> Self {
        Self { correlator }
    }

    /// Uids with a history entry satisfying `timestamp <op> time` and every
    /// filter, mapped to the newest matching sequence.
    pub fn get_by_timestamp(
        &self,
        op: TimestampOp,
        time: DateTime<Utc>,
        filters: &[HistoryFilter],
    ) -> SdkResult<BTreeMap<String, u64>> {
        Ok(self.correlator.get_by_timestamp(op, time, filters)?)
    }

    /// Uids changed after `time`.
    pub fn changed_since(&self, time: DateTime<Utc>) -> SdkResult<BTreeMap<String, u64>> {
        Ok(self.correlator.changes_since(time, None)?)
    }

    pub fn added_since(&self, time: DateTime<Utc>) -> SdkResult<BTreeMap<String, u64>> {
        Ok(self.correlator.changes_since(time, Some(HistoryAction::Add))?)
    }

    pub fn modified_since(&self, time: DateTime<Utc>) -> SdkResult<BTreeMap<String, u64>> {
        Ok(self.correlator.changes_since(time, Some(HistoryAction::Modify))?)
    }

    pub fn deleted_since(&self, time: DateTime<Utc>) -> SdkResult<BTreeMap<String, u64>> {
        Ok(self.correlator.changes_since(time, Some(HistoryAction::Delete))?)
    }

    /// The newest history action for `uid`.
    pub fn latest_action(&self, uid: &str) -> SdkResult<Option<HistoryAction>> {
        let entry = self.correlator.storage().latest(&self.correlator.scoped(uid))?;
        Ok(entry.map(|e| e.action))
    }
}
