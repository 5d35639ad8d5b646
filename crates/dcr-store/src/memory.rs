use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use dcr_types::{
    EventDefinition, EventKey, EventNode, EventState, RelationKind, RelationTarget, Relations,
    TransitionError,
};

use crate::error::{StoreError, StoreResult};
use crate::traits::EventStore;

/// In-memory event store.
///
/// Node rows and relation rows are kept in separate maps behind one
/// `RwLock`; every trait method takes the guard once, so a check-and-set on
/// the lock column cannot interleave with another writer.
pub struct InMemoryEventStore {
    inner: RwLock<StoreState>,
}

#[derive(Default)]
struct StoreState {
    /// Node rows. The `relations` field of a stored row is always empty.
    nodes: HashMap<EventKey, EventNode>,
    relations: BTreeMap<RelationRow, RelationTarget>,
}

/// Relation row key: `(owner, kind, foreign event)`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct RelationRow {
    owner: EventKey,
    kind: RelationKind,
    foreign: EventKey,
}

impl RelationRow {
    fn lowest(owner: &EventKey) -> Self {
        Self {
            owner: owner.clone(),
            kind: RelationKind::Condition,
            foreign: EventKey::new("", ""),
        }
    }
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreState::default()),
        }
    }

    /// Number of hosted nodes.
    pub fn len(&self) -> usize {
        self.inner.read().map(|s| s.nodes.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, StoreState>> {
        self.inner.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, StoreState>> {
        self.inner.write().map_err(|_| StoreError::Poisoned)
    }

    /// Run `f` against the node row for `key` under the write guard.
    fn with_node<T>(
        &self,
        key: &EventKey,
        f: impl FnOnce(&mut EventNode) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut state = self.write()?;
        let node = state
            .nodes
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;
        f(node)
    }
}

impl StoreState {
    fn relation_rows<'a>(
        &'a self,
        owner: &'a EventKey,
    ) -> impl Iterator<Item = (&'a RelationRow, &'a RelationTarget)> + 'a {
        self.relations
            .range(RelationRow::lowest(owner)..)
            .take_while(move |(row, _)| &row.owner == owner)
    }

    fn materialize(&self, key: &EventKey) -> StoreResult<EventNode> {
        let Some(row) = self.nodes.get(key) else {
            if self.relation_rows(key).next().is_some() {
                return Err(StoreError::Consistency(format!(
                    "relation rows exist for missing event {key}"
                )));
            }
            return Err(StoreError::NotFound(key.clone()));
        };

        let mut node = row.clone();
        let mut relations = Relations::default();
        for (row, target) in self.relation_rows(key) {
            relations.insert(row.kind, target.clone());
        }
        node.relations = relations;
        Ok(node)
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStore for InMemoryEventStore {
    fn create(&self, definition: EventDefinition) -> StoreResult<EventNode> {
        definition.validate()?;
        let key = definition.key();

        let mut state = self.write()?;
        if state.nodes.contains_key(&key) {
            return Err(StoreError::AlreadyExists(key));
        }
        if state.relation_rows(&key).next().is_some() {
            return Err(StoreError::Consistency(format!(
                "orphaned relation rows found while creating {key}"
            )));
        }

        let mut node = EventNode::from_definition(definition);
        let relations = std::mem::take(&mut node.relations);
        for kind in [
            RelationKind::Condition,
            RelationKind::Response,
            RelationKind::Inclusion,
            RelationKind::Exclusion,
            RelationKind::Milestone,
        ] {
            for target in relations.get(kind) {
                let row = RelationRow {
                    owner: key.clone(),
                    kind,
                    foreign: target.key(),
                };
                state.relations.insert(row, target.clone());
            }
        }
        state.nodes.insert(key.clone(), node);
        tracing::debug!(event = %key, relations = relations.len(), "event created");

        state.materialize(&key)
    }

    fn get(&self, key: &EventKey) -> StoreResult<EventNode> {
        self.read()?.materialize(key)
    }

    fn exists(&self, key: &EventKey) -> StoreResult<bool> {
        Ok(self.read()?.nodes.contains_key(key))
    }

    fn delete(&self, key: &EventKey) -> StoreResult<EventNode> {
        let mut state = self.write()?;
        let node = state.materialize(key)?;
        if let Some(owner) = &node.lock_owner {
            return Err(StoreError::Locked {
                key: key.clone(),
                owner: owner.clone(),
            });
        }

        let rows: Vec<RelationRow> = state.relation_rows(key).map(|(row, _)| row.clone()).collect();
        for row in rows {
            state.relations.remove(&row);
        }
        state.nodes.remove(key);
        tracing::debug!(event = %key, "event deleted");
        Ok(node)
    }

    fn set_lock(&self, key: &EventKey, owner: &str) -> StoreResult<()> {
        self.with_node(key, |node| {
            node.set_lock(owner).map_err(|e| match e {
                TransitionError::LockHeld { owner } => StoreError::Locked {
                    key: key.clone(),
                    owner,
                },
                other => StoreError::Consistency(other.to_string()),
            })
        })
    }

    fn release_lock(&self, key: &EventKey, owner: &str) -> StoreResult<()> {
        self.with_node(key, |node| match &node.lock_owner {
            Some(current) if current != owner => Err(StoreError::Locked {
                key: key.clone(),
                owner: current.clone(),
            }),
            _ => {
                node.clear_lock();
                Ok(())
            }
        })
    }

    fn execute(&self, key: &EventKey) -> StoreResult<EventState> {
        self.with_node(key, |node| {
            node.execute().map_err(|e| StoreError::NotExecutable {
                key: key.clone(),
                reason: e.to_string(),
            })?;
            Ok(node.state())
        })
    }

    fn reset(&self, key: &EventKey) -> StoreResult<EventNode> {
        {
            let mut state = self.write()?;
            let node = state
                .nodes
                .get_mut(key)
                .ok_or_else(|| StoreError::NotFound(key.clone()))?;
            node.reset();
        }
        self.get(key)
    }

    fn set_included(&self, key: &EventKey, included: bool) -> StoreResult<EventState> {
        self.with_node(key, |node| {
            node.set_included(included);
            Ok(node.state())
        })
    }

    fn set_pending(&self, key: &EventKey, pending: bool) -> StoreResult<EventState> {
        self.with_node(key, |node| {
            node.set_pending(pending);
            Ok(node.state())
        })
    }
}

impl std::fmt::Debug for InMemoryEventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryEventStore")
            .field("event_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use dcr_types::TypeError;

    fn definition(event: &str) -> EventDefinition {
        let mut relations = Relations::default();
        relations.insert(
            RelationKind::Response,
            RelationTarget::new("w1", "e2", "http://e2.local"),
        );
        relations.insert(
            RelationKind::Condition,
            RelationTarget::new("w1", "e0", "http://e0.local"),
        );
        EventDefinition {
            workflow_id: "w1".into(),
            event_id: event.into(),
            name: format!("Event {event}"),
            own_uri: format!("http://{event}.local"),
            roles: ["clerk".to_string()].into_iter().collect(),
            executed: false,
            included: true,
            pending: false,
            relations,
        }
    }

    fn key(event: &str) -> EventKey {
        EventKey::new("w1", event)
    }

    // -----------------------------------------------------------------------
    // Rows
    // -----------------------------------------------------------------------

    #[test]
    fn create_materializes_relations() {
        let store = InMemoryEventStore::new();
        let node = store.create(definition("e1")).unwrap();
        assert_eq!(node.relations.len(), 2);

        let read_back = store.get(&key("e1")).unwrap();
        assert_eq!(read_back, node);
        assert_eq!(read_back.relations.responses.len(), 1);
    }

    #[test]
    fn duplicate_create_is_rejected() {
        let store = InMemoryEventStore::new();
        store.create(definition("e1")).unwrap();
        assert_eq!(
            store.create(definition("e1")).unwrap_err(),
            StoreError::AlreadyExists(key("e1"))
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn invalid_definition_is_rejected() {
        let store = InMemoryEventStore::new();
        let mut def = definition("e1");
        def.own_uri = "e1.local".into();
        assert!(matches!(
            store.create(def),
            Err(StoreError::Invalid(TypeError::InvalidUri { .. }))
        ));
    }

    #[test]
    fn relation_at_two_uris_is_rejected() {
        let store = InMemoryEventStore::new();
        let mut def = definition("e1");
        def.relations.insert(
            RelationKind::Milestone,
            RelationTarget::new("w1", "e2", "http://elsewhere.local"),
        );
        assert!(matches!(
            store.create(def),
            Err(StoreError::Invalid(TypeError::ConflictingUri { .. }))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn delete_cascades_relation_rows() {
        let store = InMemoryEventStore::new();
        store.create(definition("e1")).unwrap();
        store.create(definition("e3")).unwrap();

        store.delete(&key("e1")).unwrap();
        assert_eq!(store.get(&key("e1")), Err(StoreError::NotFound(key("e1"))));
        assert!(store.inner.read().unwrap().relation_rows(&key("e1")).next().is_none());
        assert_eq!(store.get(&key("e3")).unwrap().relations.len(), 2);

        // Re-creating starts from a clean slate.
        let recreated = store.create(definition("e1")).unwrap();
        assert_eq!(recreated.relations.len(), 2);
    }

    #[test]
    fn delete_refuses_locked_node() {
        let store = InMemoryEventStore::new();
        store.create(definition("e1")).unwrap();
        store.set_lock(&key("e1"), "e9").unwrap();
        assert!(matches!(
            store.delete(&key("e1")),
            Err(StoreError::Locked { owner, .. }) if owner == "e9"
        ));
    }

    #[test]
    fn orphaned_relation_rows_are_a_consistency_error() {
        let store = InMemoryEventStore::new();
        store.create(definition("e1")).unwrap();
        store.inner.write().unwrap().nodes.remove(&key("e1"));

        assert!(matches!(store.get(&key("e1")), Err(StoreError::Consistency(_))));
        assert!(matches!(
            store.create(definition("e1")),
            Err(StoreError::Consistency(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Lock column
    // -----------------------------------------------------------------------

    #[test]
    fn set_lock_is_check_and_set() {
        let store = InMemoryEventStore::new();
        store.create(definition("e1")).unwrap();

        store.set_lock(&key("e1"), "A").unwrap();
        store.set_lock(&key("e1"), "A").unwrap();
        assert!(matches!(
            store.set_lock(&key("e1"), "B"),
            Err(StoreError::Locked { owner, .. }) if owner == "A"
        ));
    }

    #[test]
    fn release_checks_owner() {
        let store = InMemoryEventStore::new();
        store.create(definition("e1")).unwrap();
        store.release_lock(&key("e1"), "A").unwrap();

        store.set_lock(&key("e1"), "A").unwrap();
        assert!(store.release_lock(&key("e1"), "B").is_err());
        store.release_lock(&key("e1"), "A").unwrap();
        assert_eq!(store.get(&key("e1")).unwrap().lock_owner, None);
    }

    #[test]
    fn concurrent_lockers_have_exactly_one_winner() {
        let store = Arc::new(InMemoryEventStore::new());
        store.create(definition("e1")).unwrap();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.set_lock(&key("e1"), &format!("owner-{i}")).is_ok())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert!(store.get(&key("e1")).unwrap().lock_owner.is_some());
    }

    // -----------------------------------------------------------------------
    // State
    // -----------------------------------------------------------------------

    #[test]
    fn execute_then_reset() {
        let store = InMemoryEventStore::new();
        store.create(definition("e1")).unwrap();
        store.set_lock(&key("e1"), "X").unwrap();

        let state = store.execute(&key("e1")).unwrap();
        assert!(state.executed);
        assert!(matches!(
            store.execute(&key("e1")),
            Err(StoreError::NotExecutable { .. })
        ));

        let node = store.reset(&key("e1")).unwrap();
        assert!(!node.executed);
        assert_eq!(node.lock_owner, None);
        assert_eq!(node.relations.len(), 2);
    }

    #[test]
    fn setters_ignore_lock() {
        let store = InMemoryEventStore::new();
        store.create(definition("e1")).unwrap();
        store.set_lock(&key("e1"), "someone-else").unwrap();

        let state = store.set_pending(&key("e1"), true).unwrap();
        assert!(state.pending);
        let state = store.set_included(&key("e1"), false).unwrap();
        assert!(!state.included);

        assert!(matches!(
            store.execute(&key("e1")),
            Err(StoreError::NotExecutable { .. })
        ));
    }
}
