use std::collections::{BTreeMap, BTreeSet};

use dcr_types::EventAddress;
use serde::{Deserialize, Serialize};

/// Body of `PUT /events/{wf}/{id}/executed`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub roles: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub workflow_id: String,
    pub event_id: String,
    pub executed: bool,
    /// Timestamp of the `ExecuteFinished` record.
    pub history_timestamp: u64,
}

/// Body of the included/pending notices a peer sends when one of its
/// relations fires.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub sender: EventAddress,
    /// Timestamp of the sender's own record for this interaction.
    #[serde(default)]
    pub sender_timestamp: Option<u64>,
}

impl Notification {
    pub fn new(sender: EventAddress, sender_timestamp: Option<u64>) -> Self {
        Self {
            sender,
            sender_timestamp,
        }
    }
}

/// Query string of the condition and milestone checks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckQuery {
    pub sender_workflow_id: String,
    pub sender_event_id: String,
    #[serde(default)]
    pub sender_timestamp: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResponse {
    /// Whether the asking event may run as far as this relation is concerned.
    pub satisfied: bool,
    /// Timestamp the answering event assigned to the check.
    pub timestamp: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampResponse {
    pub timestamp: u64,
}

/// Composite state read, with the derived executable flag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStateDto {
    pub workflow_id: String,
    pub event_id: String,
    pub name: String,
    pub executed: bool,
    pub included: bool,
    pub pending: bool,
    pub executable: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Roles of the logged-in user, keyed by workflow id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub roles: BTreeMap<String, Vec<String>>,
}

impl LoginResponse {
    pub fn roles_for(&self, workflow_id: &str) -> &[String] {
        self.roles.get(workflow_id).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// What the registry knows about one event regardless of who is asking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    pub event_id: String,
    pub name: String,
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

/// An [`EventSummary`] plus the address of the node serving it, which only
/// the registry fills in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    #[serde(flatten)]
    pub summary: EventSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDirectory {
    pub workflow_id: String,
    pub name: String,
    #[serde(default)]
    pub events: Vec<DirectoryEntry>,
}

impl WorkflowDirectory {
    pub fn find(&self, event_id: &str) -> Option<&DirectoryEntry> {
        self.events.iter().find(|e| e.summary.event_id == event_id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_entry_flattens_summary() {
        let json = r#"{
            "workflow_id": "w1",
            "name": "Hospital",
            "events": [
                {"event_id": "e1", "name": "Admit", "roles": ["nurse"], "uri": "http://n1:8001"},
                {"event_id": "e2", "name": "Discharge"}
            ]
        }"#;
        let dir: WorkflowDirectory = serde_json::from_str(json).unwrap();

        let admit = dir.find("e1").unwrap();
        assert_eq!(admit.summary.name, "Admit");
        assert!(admit.summary.roles.contains("nurse"));
        assert_eq!(admit.uri.as_deref(), Some("http://n1:8001"));

        let discharge = dir.find("e2").unwrap();
        assert!(discharge.uri.is_none());
        assert!(dir.find("e3").is_none());
    }

    #[test]
    fn entry_without_uri_omits_field() {
        let entry = DirectoryEntry {
            summary: EventSummary {
                event_id: "e1".into(),
                name: "Admit".into(),
                roles: BTreeSet::new(),
            },
            uri: None,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("uri").is_none());
        assert_eq!(json["event_id"], "e1");
    }

    #[test]
    fn notification_timestamp_is_optional() {
        let n: Notification = serde_json::from_str(
            r#"{"sender":{"workflow_id":"w1","event_id":"e1","uri":"http://e1"}}"#,
        )
        .unwrap();
        assert_eq!(n.sender.event_id, "e1");
        assert_eq!(n.sender_timestamp, None);
    }

    #[test]
    fn login_roles_lookup() {
        let mut login = LoginResponse::default();
        login.roles.insert("w1".into(), vec!["nurse".into()]);
        assert_eq!(login.roles_for("w1"), ["nurse".to_string()]);
        assert!(login.roles_for("w2").is_empty());
    }
}
