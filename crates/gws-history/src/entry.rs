use chrono::{DateTime, Utc};
use gws_types::HistoryAction;
use serde::{Deserialize, Serialize};

/// One recorded change of one object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub uid: String,
    pub action: HistoryAction,
    pub timestamp: DateTime<Utc>,
    /// Position in the log. Strictly increasing across all uids.
    pub sequence: u64,
}

/// Comparison applied as `entry.timestamp <op> time`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampOp {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
}

impl TimestampOp {
    pub fn matches(&self, timestamp: DateTime<Utc>, time: DateTime<Utc>) -> bool {
        match self {
            Self::Lt => timestamp < time,
            Self::Le => timestamp <= time,
            Self::Eq => timestamp == time,
            Self::Ge => timestamp >= time,
            Self::Gt => timestamp > time,
        }
    }
}

/// Additional predicate on history entries. All filters must hold.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryFilter {
    Action(HistoryAction),
    UidPrefix(String),
}

impl HistoryFilter {
    pub fn matches(&self, entry: &HistoryEntry) -> bool {
        match self {
            Self::Action(action) => entry.action == *action,
            Self::UidPrefix(prefix) => entry.uid.starts_with(prefix.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn timestamp_ops() {
        let (early, late) = (at(100), at(200));
        assert!(TimestampOp::Lt.matches(early, late));
        assert!(!TimestampOp::Lt.matches(late, late));
        assert!(TimestampOp::Le.matches(late, late));
        assert!(TimestampOp::Eq.matches(late, late));
        assert!(TimestampOp::Ge.matches(late, early));
        assert!(TimestampOp::Gt.matches(late, early));
        assert!(!TimestampOp::Gt.matches(early, early));
    }

    #[test]
    fn filters() {
        let entry = HistoryEntry {
            uid: "abc:uid-1".into(),
            action: HistoryAction::Add,
            timestamp: at(1),
            sequence: 1,
        };
        assert!(HistoryFilter::Action(HistoryAction::Add).matches(&entry));
        assert!(!HistoryFilter::Action(HistoryAction::Delete).matches(&entry));
        assert!(HistoryFilter::UidPrefix("abc:".into()).matches(&entry));
        assert!(!HistoryFilter::UidPrefix("xyz:".into()).matches(&entry));
    }

    #[test]
    fn serde_names() {
        assert_eq!(serde_json::to_string(&TimestampOp::Ge).unwrap(), "\"ge\"");
        let entry = HistoryEntry {
            uid: "f:a".into(),
            action: HistoryAction::Delete,
            timestamp: at(42),
            sequence: 7,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["action"], "delete");
        let back: HistoryEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }
}
