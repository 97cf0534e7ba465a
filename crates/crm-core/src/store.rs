use tracing::{debug, info};

use crate::error::StoreError;

/// A record the store can address by id.
pub trait Entity: Clone {
    fn id(&self) -> &str;
}

/// Owns an ordered collection of records. Readers get borrowed snapshots;
/// writers go through creation or whole-record replacement.
#[derive(Debug, Clone)]
pub struct EntityStore<T> {
    records: Vec<T>,
    next_id: u64,
}

impl<T: Entity> Default for EntityStore<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            next_id: 1,
        }
    }
}

impl<T: Entity> EntityStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    #[tracing::instrument(skip(records), fields(count = records.len()))]
    pub fn seeded(records: Vec<T>) -> Result<Self, StoreError> {
        let mut store = Self::new();
        for record in records {
            if store.contains(record.id()) {
                return Err(StoreError::DuplicateId {
                    id: record.id().to_string(),
                });
            }
            store.records.push(record);
        }

        store.next_id = store
            .records
            .iter()
            .filter_map(|r| r.id().parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            + 1;

        info!(
            count = store.records.len(),
            next_id = store.next_id,
            "seeded entity store"
        );
        Ok(store)
    }

    pub fn snapshot(&self) -> &[T] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.records.iter().find(|r| r.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Hands out the next unused id. Ids are never reused, even for
    /// back-to-back creations.
    pub fn allocate_id(&mut self) -> String {
        loop {
            let candidate = self.next_id.to_string();
            self.next_id += 1;
            if !self.contains(&candidate) {
                return candidate;
            }
        }
    }

    #[tracing::instrument(skip(self, record), fields(id = record.id()))]
    pub fn prepend(&mut self, record: T) -> Result<&T, StoreError> {
        if self.contains(record.id()) {
            return Err(StoreError::DuplicateId {
                id: record.id().to_string(),
            });
        }
        self.records.insert(0, record);
        debug!(count = self.records.len(), "record prepended");
        Ok(&self.records[0])
    }

    /// Swaps in a new version of an existing record, keeping its position.
    /// Returns the previous version.
    #[tracing::instrument(skip(self, record), fields(id = record.id()))]
    pub fn replace(&mut self, record: T) -> Result<T, StoreError> {
        let idx = self
            .records
            .iter()
            .position(|r| r.id() == record.id())
            .ok_or_else(|| StoreError::NotFound {
                id: record.id().to_string(),
            })?;
        let previous = std::mem::replace(&mut self.records[idx], record);
        debug!(index = idx, "record replaced");
        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::{Entity, EntityStore};
    use crate::error::StoreError;

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        id: String,
        body: String,
    }

    impl Entity for Note {
        fn id(&self) -> &str {
            &self.id
        }
    }

    fn note(id: &str, body: &str) -> Note {
        Note {
            id: id.to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn seeded_store_rejects_duplicate_ids() {
        let err = EntityStore::seeded(vec![note("1", "a"), note("1", "b")])
            .expect_err("duplicate ids must fail");
        assert_eq!(err, StoreError::DuplicateId { id: "1".to_string() });
    }

    #[test]
    fn allocated_ids_continue_past_numeric_seeds() {
        let mut store =
            EntityStore::seeded(vec![note("4", "a"), note("x", "b"), note("9", "c")])
                .expect("seed");
        assert_eq!(store.allocate_id(), "10");
        assert_eq!(store.allocate_id(), "11");
    }

    #[test]
    fn allocation_skips_ids_already_taken() {
        let mut store = EntityStore::seeded(vec![note("1", "a")]).expect("seed");
        store.prepend(note("2", "manual")).expect("prepend");
        assert_eq!(store.allocate_id(), "3");
    }

    #[test]
    fn replace_keeps_position_and_returns_previous() {
        let mut store = EntityStore::seeded(vec![note("1", "a"), note("2", "b")]).expect("seed");
        let previous = store.replace(note("2", "updated")).expect("replace");
        assert_eq!(previous.body, "b");
        assert_eq!(store.snapshot()[1].body, "updated");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn replace_unknown_id_is_not_found() {
        let mut store: EntityStore<Note> = EntityStore::new();
        let err = store.replace(note("7", "x")).expect_err("missing");
        assert!(err.is_not_found());
        assert!(store.is_empty());
    }
}
