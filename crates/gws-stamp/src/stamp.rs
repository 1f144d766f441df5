use std::cmp::Ordering;

use gws_types::BackendId;
use serde::{Deserialize, Serialize};

use crate::error::{StampError, StampResult};

/// Membership snapshot keyed by uidvalidity and uidnext.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UidStamp {
    uidvalidity: u64,
    uidnext: u64,
    ids: Vec<BackendId>,
}

impl UidStamp {
    /// Create a stamp. `ids` are sorted and de-duplicated.
    pub fn new(uidvalidity: u64, uidnext: u64, ids: impl IntoIterator<Item = BackendId>) -> Self {
        Self {
            uidvalidity,
            uidnext,
            ids: normalize(ids),
        }
    }
}

/// Membership snapshot that also tracks the folder's highest modification
/// sequence, so flag and content changes that keep the id set intact are
/// still detected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModSeqStamp {
    uidvalidity: u64,
    uidnext: u64,
    highest_modseq: u64,
    ids: Vec<BackendId>,
}

impl ModSeqStamp {
    pub fn new(
        uidvalidity: u64,
        uidnext: u64,
        highest_modseq: u64,
        ids: impl IntoIterator<Item = BackendId>,
    ) -> Self {
        Self {
            uidvalidity,
            uidnext,
            highest_modseq,
            ids: normalize(ids),
        }
    }

    pub fn highest_modseq(&self) -> u64 {
        self.highest_modseq
    }
}

/// A point-in-time fingerprint of a folder.
///
/// Stamps are immutable. A fresh one is taken on every poll and compared
/// with the one stored after the previous poll:
///
/// 1. [`is_reset`](Self::is_reset) first. A different generation means the
///    whole previous id space is void and the folder must be reloaded.
/// 2. Otherwise [`get_changes`](Self::get_changes) yields the ids that were
///    deleted and added, or `None` when nothing changed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeStamp {
    Uids(UidStamp),
    ModSeq(ModSeqStamp),
}

/// Id-level difference between two stamps of the same generation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StampChanges {
    /// Ids present in the old stamp but not the new one, ascending.
    pub deleted: Vec<BackendId>,
    /// Ids present in the new stamp but not the old one, ascending.
    pub added: Vec<BackendId>,
}

impl StampChanges {
    /// True when the folder changed without any id entering or leaving it.
    pub fn is_empty(&self) -> bool {
        self.deleted.is_empty() && self.added.is_empty()
    }
}

impl ChangeStamp {
    pub fn uids(uidvalidity: u64, uidnext: u64, ids: impl IntoIterator<Item = BackendId>) -> Self {
        Self::Uids(UidStamp::new(uidvalidity, uidnext, ids))
    }

    pub fn modseq(
        uidvalidity: u64,
        uidnext: u64,
        highest_modseq: u64,
        ids: impl IntoIterator<Item = BackendId>,
    ) -> Self {
        Self::ModSeq(ModSeqStamp::new(uidvalidity, uidnext, highest_modseq, ids))
    }

    /// Short name of the stamp kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Uids(_) => "uids",
            Self::ModSeq(_) => "modseq",
        }
    }

    /// The id-space generation (uidvalidity).
    pub fn generation(&self) -> u64 {
        match self {
            Self::Uids(s) => s.uidvalidity,
            Self::ModSeq(s) => s.uidvalidity,
        }
    }

    /// The next id the folder will assign (uidnext).
    pub fn next_id(&self) -> u64 {
        match self {
            Self::Uids(s) => s.uidnext,
            Self::ModSeq(s) => s.uidnext,
        }
    }

    /// The backend ids present in the folder, ascending.
    pub fn ids(&self) -> &[BackendId] {
        match self {
            Self::Uids(s) => &s.ids,
            Self::ModSeq(s) => &s.ids,
        }
    }

    pub fn highest_modseq(&self) -> Option<u64> {
        match self {
            Self::Uids(_) => None,
            Self::ModSeq(s) => Some(s.highest_modseq),
        }
    }

    /// Whether `other` belongs to a different id space than `self`.
    ///
    /// Only the generation is compared; ids and counters are irrelevant.
    pub fn is_reset(&self, other: &ChangeStamp) -> bool {
        self.generation() != other.generation()
    }

    /// Compute what changed from `self` (older) to `other` (newer).
    ///
    /// Returns `Ok(None)` when nothing changed. Equal counters and equal id
    /// counts are taken as "unchanged" without comparing the sets. The
    /// result is only meaningful when [`is_reset`](Self::is_reset) is false.
    pub fn get_changes(&self, other: &ChangeStamp) -> StampResult<Option<StampChanges>> {
        match (self, other) {
            (Self::Uids(old), Self::Uids(new)) => {
                if old.uidnext == new.uidnext && old.ids.len() == new.ids.len() {
                    return Ok(None);
                }
                Ok(Some(diff(&old.ids, &new.ids)))
            }
            (Self::ModSeq(old), Self::ModSeq(new)) => {
                if old.uidnext == new.uidnext
                    && old.ids.len() == new.ids.len()
                    && old.highest_modseq == new.highest_modseq
                {
                    return Ok(None);
                }
                Ok(Some(diff(&old.ids, &new.ids)))
            }
            _ => Err(StampError::KindMismatch {
                this: self.kind(),
                other: other.kind(),
            }),
        }
    }
}

fn normalize(ids: impl IntoIterator<Item = BackendId>) -> Vec<BackendId> {
    let mut ids: Vec<BackendId> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn diff(old: &[BackendId], new: &[BackendId]) -> StampChanges {
    let mut changes = StampChanges::default();
    let (mut i, mut j) = (0, 0);
    while i < old.len() && j < new.len() {
        match old[i].cmp(&new[j]) {
            Ordering::Less => {
                changes.deleted.push(old[i]);
                i += 1;
            }
            Ordering::Greater => {
                changes.added.push(new[j]);
                j += 1;
            }
            Ordering::Equal => {
                i += 1;
                j += 1;
            }
        }
    }
    changes.deleted.extend_from_slice(&old[i..]);
    changes.added.extend_from_slice(&new[j..]);
    changes
}
