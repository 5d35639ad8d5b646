use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::key::EventKey;

/// The five DCR relation types an event can hold towards other events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Condition,
    Response,
    Inclusion,
    Exclusion,
    Milestone,
}

impl RelationKind {
    /// Relation types whose targets are locked before an execution commits,
    /// in the order they are locked.
    pub const LOCK_ORDER: [RelationKind; 4] = [
        RelationKind::Response,
        RelationKind::Inclusion,
        RelationKind::Exclusion,
        RelationKind::Milestone,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Condition => "condition",
            Self::Response => "response",
            Self::Inclusion => "inclusion",
            Self::Exclusion => "exclusion",
            Self::Milestone => "milestone",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The far end of a relation: another event node and the base URI it is served from.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationTarget {
    pub workflow_id: String,
    pub event_id: String,
    pub uri: String,
}

impl RelationTarget {
    pub fn new(
        workflow_id: impl Into<String>,
        event_id: impl Into<String>,
        uri: impl Into<String>,
    ) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            event_id: event_id.into(),
            uri: uri.into(),
        }
    }

    pub fn key(&self) -> EventKey {
        EventKey::new(self.workflow_id.clone(), self.event_id.clone())
    }

    pub fn validate(&self) -> Result<(), TypeError> {
        self.key().validate()?;
        validate_uri("uri", &self.uri)
    }
}

impl fmt::Display for RelationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.workflow_id, self.event_id, self.uri)
    }
}

/// All outgoing relations of one event.
///
/// Sets are ordered, so iteration order is stable across calls and restarts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relations {
    #[serde(default)]
    pub conditions: BTreeSet<RelationTarget>,
    #[serde(default)]
    pub responses: BTreeSet<RelationTarget>,
    #[serde(default)]
    pub inclusions: BTreeSet<RelationTarget>,
    #[serde(default)]
    pub exclusions: BTreeSet<RelationTarget>,
    #[serde(default)]
    pub milestones: BTreeSet<RelationTarget>,
}

impl Relations {
    pub fn get(&self, kind: RelationKind) -> &BTreeSet<RelationTarget> {
        match kind {
            RelationKind::Condition => &self.conditions,
            RelationKind::Response => &self.responses,
            RelationKind::Inclusion => &self.inclusions,
            RelationKind::Exclusion => &self.exclusions,
            RelationKind::Milestone => &self.milestones,
        }
    }

    pub fn get_mut(&mut self, kind: RelationKind) -> &mut BTreeSet<RelationTarget> {
        match kind {
            RelationKind::Condition => &mut self.conditions,
            RelationKind::Response => &mut self.responses,
            RelationKind::Inclusion => &mut self.inclusions,
            RelationKind::Exclusion => &mut self.exclusions,
            RelationKind::Milestone => &mut self.milestones,
        }
    }

    /// Add a target under the given relation kind.
    pub fn insert(&mut self, kind: RelationKind, target: RelationTarget) -> bool {
        self.get_mut(kind).insert(target)
    }

    /// Total number of relation rows across all kinds.
    pub fn len(&self) -> usize {
        self.conditions.len()
            + self.responses.len()
            + self.inclusions.len()
            + self.exclusions.len()
            + self.milestones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Targets to lock before an execution, in [`RelationKind::LOCK_ORDER`] and
    /// then set order. A node reachable through several relation kinds is
    /// listed once, at its first position, and `skip` (the executing node
    /// itself) is never listed.
    pub fn lock_targets(&self, skip: &EventKey) -> Vec<RelationTarget> {
        let mut seen = HashSet::new();
        let mut targets = Vec::new();
        for kind in RelationKind::LOCK_ORDER {
            for target in self.get(kind) {
                let key = target.key();
                if &key == skip || !seen.insert(key) {
                    continue;
                }
                targets.push(target.clone());
            }
        }
        targets
    }

    /// Every target must be well formed, and one event must not be named at
    /// two different uris since relations are addressed by key alone.
    pub fn validate(&self) -> Result<(), TypeError> {
        let mut uris: HashMap<EventKey, &str> = HashMap::new();
        for kind in [RelationKind::Condition]
            .into_iter()
            .chain(RelationKind::LOCK_ORDER)
        {
            for target in self.get(kind) {
                target.validate()?;
                let first = *uris.entry(target.key()).or_insert(&target.uri);
                if first != target.uri {
                    return Err(TypeError::ConflictingUri {
                        event: target.key().to_string(),
                        first: first.to_string(),
                        second: target.uri.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

pub(crate) fn validate_uri(field: &'static str, value: &str) -> Result<(), TypeError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(TypeError::InvalidUri {
            field,
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(event: &str) -> RelationTarget {
        RelationTarget::new("w1", event, format!("http://{event}.local:8080"))
    }

    #[test]
    fn lock_targets_follow_kind_order() {
        let mut relations = Relations::default();
        relations.insert(RelationKind::Milestone, target("m"));
        relations.insert(RelationKind::Exclusion, target("x"));
        relations.insert(RelationKind::Inclusion, target("i"));
        relations.insert(RelationKind::Response, target("r"));
        relations.insert(RelationKind::Condition, target("c"));

        let ids: Vec<_> = relations
            .lock_targets(&EventKey::new("w1", "self"))
            .into_iter()
            .map(|t| t.event_id)
            .collect();
        assert_eq!(ids, vec!["r", "i", "x", "m"]);
    }

    #[test]
    fn lock_targets_dedupe_and_skip_self() {
        let mut relations = Relations::default();
        relations.insert(RelationKind::Response, target("b"));
        relations.insert(RelationKind::Response, target("a"));
        relations.insert(RelationKind::Exclusion, target("a"));
        relations.insert(RelationKind::Exclusion, target("self"));

        let ids: Vec<_> = relations
            .lock_targets(&EventKey::new("w1", "self"))
            .into_iter()
            .map(|t| t.event_id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn len_counts_every_set() {
        let mut relations = Relations::default();
        assert!(relations.is_empty());
        relations.insert(RelationKind::Condition, target("c"));
        relations.insert(RelationKind::Milestone, target("c"));
        assert_eq!(relations.len(), 2);
    }

    #[test]
    fn validate_rejects_non_http_uri() {
        let mut relations = Relations::default();
        relations.insert(RelationKind::Condition, RelationTarget::new("w1", "c", "ftp://c"));
        assert!(matches!(
            relations.validate(),
            Err(TypeError::InvalidUri { field: "uri", .. })
        ));
    }

    #[test]
    fn validate_rejects_one_event_at_two_uris() {
        let mut relations = Relations::default();
        relations.insert(RelationKind::Response, RelationTarget::new("w1", "b", "http://n1"));
        relations.insert(RelationKind::Response, RelationTarget::new("w1", "b", "http://n2"));
        assert!(matches!(
            relations.validate(),
            Err(TypeError::ConflictingUri { ref event, .. }) if event == "w1/b"
        ));

        let mut across_kinds = Relations::default();
        across_kinds.insert(RelationKind::Condition, RelationTarget::new("w1", "b", "http://n1"));
        across_kinds.insert(RelationKind::Exclusion, RelationTarget::new("w1", "b", "http://n2"));
        assert!(across_kinds.validate().is_err());

        let mut same_uri = Relations::default();
        same_uri.insert(RelationKind::Condition, RelationTarget::new("w1", "b", "http://n1"));
        same_uri.insert(RelationKind::Exclusion, RelationTarget::new("w1", "b", "http://n1"));
        assert!(same_uri.validate().is_ok());
    }

    #[test]
    fn missing_sets_deserialize_as_empty() {
        let relations: Relations =
            serde_json::from_str(r#"{"responses":[{"workflow_id":"w1","event_id":"e2","uri":"http://e2"}]}"#)
                .unwrap();
        assert_eq!(relations.responses.len(), 1);
        assert!(relations.conditions.is_empty());
    }

    #[test]
    fn kind_display() {
        assert_eq!(RelationKind::Exclusion.to_string(), "exclusion");
        assert_eq!(
            serde_json::to_string(&RelationKind::Milestone).unwrap(),
            "\"milestone\""
        );
    }
}
