use std::collections::HashSet;

use chrono::{DateTime, Utc};
use keep_types::models::{Note, NoteId};

/// One reminder occurrence: a note together with the exact reminder time.
/// Editing the time yields a new key, and so a new delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub note_id: NoteId,
    pub reminder_at: DateTime<Utc>,
}

impl DedupKey {
    pub fn for_note(note: &Note) -> Option<Self> {
        note.reminder_at.map(|reminder_at| Self {
            note_id: note.id,
            reminder_at,
        })
    }
}

/// Occurrences already handed to a sink. Owned by a single engine and
/// never persisted.
#[derive(Debug, Default)]
pub struct DedupSet {
    delivered: HashSet<DedupKey>,
}

impl DedupSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &DedupKey) -> bool {
        self.delivered.contains(key)
    }

    pub fn record(&mut self, key: DedupKey) {
        self.delivered.insert(key);
    }

    /// Drops every key not in `live`. Returns how many were evicted.
    pub fn retain_live(&mut self, live: &HashSet<DedupKey>) -> usize {
        let before = self.delivered.len();
        self.delivered.retain(|key| live.contains(key));
        before - self.delivered.len()
    }

    pub fn len(&self) -> usize {
        self.delivered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delivered.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn retain_live_evicts_stale_keys() {
        let t = Utc::now();
        let a = DedupKey { note_id: 1, reminder_at: t };
        let b = DedupKey { note_id: 2, reminder_at: t };
        let a_moved = DedupKey { note_id: 1, reminder_at: t + Duration::minutes(1) };

        let mut set = DedupSet::new();
        set.record(a);
        set.record(b);

        let live = HashSet::from([a_moved, b]);
        assert_eq!(set.retain_live(&live), 1);
        assert!(!set.contains(&a));
        assert!(set.contains(&b));
        assert_eq!(set.len(), 1);
    }
}
