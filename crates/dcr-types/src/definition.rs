use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::key::EventKey;
use crate::relation::{validate_uri, Relations};

/// Definition an event node is created from.
///
/// The `executed`/`included`/`pending` flags are both the starting state and
/// the snapshot a reset returns to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDefinition {
    pub workflow_id: String,
    pub event_id: String,
    pub name: String,
    pub own_uri: String,
    #[serde(default)]
    pub roles: BTreeSet<String>,
    #[serde(default)]
    pub executed: bool,
    #[serde(default = "default_included")]
    pub included: bool,
    #[serde(default)]
    pub pending: bool,
    #[serde(default)]
    pub relations: Relations,
}

fn default_included() -> bool {
    true
}

impl EventDefinition {
    pub fn key(&self) -> EventKey {
        EventKey::new(self.workflow_id.clone(), self.event_id.clone())
    }

    pub fn validate(&self) -> Result<(), TypeError> {
        self.key().validate()?;
        if self.name.trim().is_empty() {
            return Err(TypeError::MissingField("name"));
        }
        validate_uri("own_uri", &self.own_uri)?;
        self.relations.validate()
    }
}
