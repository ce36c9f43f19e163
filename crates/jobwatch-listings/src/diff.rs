//! Compare the current extraction against the previous snapshot.

use std::collections::HashSet;

use crate::{Posting, PostingId, Snapshot};

/// Result of comparing a run against the last snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingDiff {
    /// Every current posting, in extraction order.
    pub current: Vec<Posting>,
    /// Current postings whose identity the snapshot does not know, in
    /// extraction order.
    pub new: Vec<Posting>,
    /// Snapshot postings that are no longer listed, ordered by title.
    ///
    /// Not part of the default report; they simply drop out of the next
    /// snapshot.
    pub removed: Vec<Posting>,
}

impl ListingDiff {
    pub fn has_new(&self) -> bool {
        !self.new.is_empty()
    }

    /// The snapshot to persist once this diff has been reported.
    pub fn next_snapshot(&self) -> Snapshot {
        Snapshot::from_postings(&self.current)
    }
}

/// Compute the delta between `previous` and `current`.
///
/// Pure: no I/O, no reordering of `current`.
pub fn diff(previous: &Snapshot, current: Vec<Posting>) -> ListingDiff {
    let new = current
        .iter()
        .filter(|p| !previous.contains(&p.id))
        .cloned()
        .collect();

    let current_ids: HashSet<&PostingId> = current.iter().map(|p| &p.id).collect();
    let mut removed: Vec<Posting> = previous
        .postings()
        .into_iter()
        .filter(|p| !current_ids.contains(&p.id))
        .collect();
    removed.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));

    ListingDiff {
        current,
        new,
        removed,
    }
}
