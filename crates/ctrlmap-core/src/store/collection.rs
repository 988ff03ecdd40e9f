// ── Generic keyed record collection ──
//
// Copy-on-write storage for one record kind with a unique-key index.
// Records sit behind `Arc` so cloning a collection into a draft state
// copies pointers, not records.

use std::collections::HashMap;
use std::sync::Arc;

use crate::model::Record;

/// Storage for a single record kind.
///
/// Every record has an id; a record may additionally hold one unique
/// key string (a name, or a scope-qualified name for groups). Both
/// sides of the key index are kept so a rename never leaves a stale
/// mapping behind.
#[derive(Debug)]
pub(crate) struct Collection<T: Record> {
    /// Primary storage: id -> record.
    by_id: HashMap<T::Id, Arc<T>>,

    /// Unique key -> id.
    key_to_id: HashMap<String, T::Id>,

    /// Reverse of `key_to_id` for efficient removal.
    id_to_key: HashMap<T::Id, String>,
}

impl<T: Record> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            by_id: self.by_id.clone(),
            key_to_id: self.key_to_id.clone(),
            id_to_key: self.id_to_key.clone(),
        }
    }
}

impl<T: Record> Default for Collection<T> {
    fn default() -> Self {
        Self {
            by_id: HashMap::new(),
            key_to_id: HashMap::new(),
            id_to_key: HashMap::new(),
        }
    }
}

impl<T: Record> Collection<T> {
    /// Insert or replace a record. Returns `true` if the id was new.
    pub(crate) fn upsert(&mut self, key: Option<String>, record: T) -> bool {
        let id = record.id();

        // Drop the stale key mapping if the record was re-keyed.
        if let Some(old_key) = self.id_to_key.remove(&id) {
            if self.key_to_id.get(&old_key) == Some(&id) {
                self.key_to_id.remove(&old_key);
            }
        }
        if let Some(key) = key {
            self.key_to_id.insert(key.clone(), id);
            self.id_to_key.insert(id, key);
        }

        self.by_id.insert(id, Arc::new(record)).is_none()
    }

    /// Remove a record by id. Returns the removed record if it existed.
    pub(crate) fn remove(&mut self, id: &T::Id) -> Option<Arc<T>> {
        let removed = self.by_id.remove(id);
        if removed.is_some() {
            if let Some(key) = self.id_to_key.remove(id) {
                self.key_to_id.remove(&key);
            }
        }
        removed
    }

    pub(crate) fn get(&self, id: &T::Id) -> Option<&Arc<T>> {
        self.by_id.get(id)
    }

    pub(crate) fn contains(&self, id: &T::Id) -> bool {
        self.by_id.contains_key(id)
    }

    /// Look up a record by its unique key.
    pub(crate) fn get_by_key(&self, key: &str) -> Option<&Arc<T>> {
        let id = self.key_to_id.get(key)?;
        self.by_id.get(id)
    }

    /// Id currently holding `key`, if any.
    pub(crate) fn id_for_key(&self, key: &str) -> Option<T::Id> {
        self.key_to_id.get(key).copied()
    }

    /// The unique key held by `id`, if any.
    pub(crate) fn key_of(&self, id: &T::Id) -> Option<String> {
        self.id_to_key.get(id).cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_id.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &Arc<T>> {
        self.by_id.values()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{DeploymentTarget, Status};
    use crate::model::{Controller, ControllerId};
    use chrono::Utc;

    fn controller(name: &str) -> Controller {
        let now = Utc::now();
        Controller {
            id: ControllerId::generate(),
            name: name.into(),
            status: Status::Active,
            role: None,
            tenant: None,
            description: String::new(),
            platform: None,
            external_integration: None,
            location: None,
            deployed_to: DeploymentTarget::Unassigned,
            created: now,
            last_updated: now,
        }
    }

    #[test]
    fn upsert_returns_true_for_new_id() {
        let mut col: Collection<Controller> = Collection::default();
        assert!(col.upsert(Some("a".into()), controller("a")));
    }

    #[test]
    fn upsert_returns_false_for_existing_id() {
        let mut col: Collection<Controller> = Collection::default();
        let c = controller("a");
        col.upsert(Some("a".into()), c.clone());
        assert!(!col.upsert(Some("a".into()), c));
        assert_eq!(col.len(), 1);
    }

    #[test]
    fn get_by_id_and_key() {
        let mut col: Collection<Controller> = Collection::default();
        let c = controller("Panorama1");
        let id = c.id;
        col.upsert(Some("Panorama1".into()), c);

        assert_eq!(col.get(&id).unwrap().name, "Panorama1");
        assert_eq!(col.get_by_key("Panorama1").unwrap().id, id);
        assert_eq!(col.id_for_key("Panorama1"), Some(id));
    }

    #[test]
    fn rekey_cleans_old_mapping() {
        let mut col: Collection<Controller> = Collection::default();
        let mut c = controller("old");
        col.upsert(Some("old".into()), c.clone());

        c.name = "new".into();
        col.upsert(Some("new".into()), c);
        assert!(col.get_by_key("old").is_none());
        assert!(col.get_by_key("new").is_some());
    }

    #[test]
    fn remove_cleans_up_indexes() {
        let mut col: Collection<Controller> = Collection::default();
        let c = controller("a");
        let id = c.id;
        col.upsert(Some("a".into()), c);

        assert!(col.remove(&id).is_some());
        assert!(col.get_by_key("a").is_none());
        assert!(!col.contains(&id));
        assert!(col.is_empty());
    }

    #[test]
    fn clone_is_independent() {
        let mut col: Collection<Controller> = Collection::default();
        col.upsert(Some("a".into()), controller("a"));
        let mut draft = col.clone();
        draft.upsert(Some("b".into()), controller("b"));
        assert_eq!(col.len(), 1);
        assert_eq!(draft.len(), 2);
    }
}
