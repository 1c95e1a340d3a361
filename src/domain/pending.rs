use crate::domain::models::ConfigPayload;
use uuid::Uuid;

/// One configuration awaiting (or having survived) delivery. Delivered
/// entries stay queued so a resolver restart can be replayed from here.
#[derive(Debug, Clone)]
pub struct PendingEntry {
    pub id: Uuid,
    pub payload: ConfigPayload,
    pub delivered: bool,
}

/// Insertion-ordered log of configurations to deliver. One queue per
/// manager, shared across all interfaces; entries for the same interface
/// supersede each other once the newer one is confirmed.
#[derive(Debug, Default)]
pub struct PendingQueue {
    entries: Vec<PendingEntry>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a payload and hand back the id its confirmation will carry.
    pub fn push(&mut self, payload: ConfigPayload) -> Uuid {
        let id = Uuid::new_v4();
        self.entries.push(PendingEntry {
            id,
            payload,
            delivered: false,
        });
        id
    }

    /// Everything currently queued, in insertion order. Cloned so the
    /// caller can release the lock while it works through the list.
    pub fn snapshot(&self) -> Vec<(Uuid, ConfigPayload)> {
        self.entries
            .iter()
            .map(|entry| (entry.id, entry.payload.clone()))
            .collect()
    }

    /// Record that the resolver accepted an entry. Older entries for the
    /// same interface are superseded and dropped. Unknown ids are ignored,
    /// the entry may have been cleared while the delivery was in flight.
    pub fn confirm(&mut self, id: Uuid) {
        let Some(position) = self.entries.iter().position(|entry| entry.id == id) else {
            return;
        };
        self.entries[position].delivered = true;
        let key = self.entries[position].payload.interface_key();
        let mut index = 0;
        self.entries.retain(|entry| {
            let stale = index < position && entry.payload.interface_key() == key;
            index += 1;
            !stale
        });
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[PendingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
