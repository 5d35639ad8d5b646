use dcr_types::EventKey;

/// Route templates served by an event node (axum path syntax).
pub mod routes {
    pub const HEALTH: &str = "/health";
    pub const EVENTS: &str = "/events";
    pub const EVENT: &str = "/events/:workflow_id/:event_id";
    pub const RESET: &str = "/events/:workflow_id/:event_id/reset";
    pub const EXECUTED_BY: &str = "/events/:workflow_id/:event_id/executed/:sender_id";
    pub const CONDITION: &str = "/events/:workflow_id/:event_id/condition";
    pub const MILESTONE: &str = "/events/:workflow_id/:event_id/milestone";
    pub const STATE: &str = "/events/:workflow_id/:event_id/state/:sender_id";
    /// `GET` reads inclusion for the sender id in the last segment; `PUT`
    /// sets it from the bool there.
    pub const INCLUDED: &str = "/events/:workflow_id/:event_id/included/:value";
    pub const SET_PENDING: &str = "/events/:workflow_id/:event_id/pending/:value";
    pub const EXECUTE: &str = "/events/:workflow_id/:event_id/executed";
    pub const LOCK: &str = "/events/:workflow_id/:event_id/lock";
    pub const UNLOCK: &str = "/events/:workflow_id/:event_id/lock/:sender_id";
    pub const EVENT_HISTORY: &str = "/events/:workflow_id/:event_id/history";
    pub const WORKFLOW_HISTORY: &str = "/history/:workflow_id";
}

/// A concrete call against one event node, rendered to path segments so the
/// caller can percent-encode ids when joining them onto the node's URI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventRoute<'a> {
    Events,
    Event,
    Reset,
    ExecutedBy(&'a str),
    IncludedBy(&'a str),
    Condition,
    Milestone,
    State(&'a str),
    SetIncluded(bool),
    SetPending(bool),
    Execute,
    Lock,
    Unlock(&'a str),
    History,
}

impl EventRoute<'_> {
    pub fn segments(&self, key: &EventKey) -> Vec<String> {
        if let Self::Events = self {
            return vec!["events".into()];
        }

        let mut segments = vec![
            "events".to_string(),
            key.workflow_id.clone(),
            key.event_id.clone(),
        ];
        let tail: &[&str] = match self {
            Self::Events | Self::Event => &[],
            Self::Reset => &["reset"],
            Self::ExecutedBy(sender) => &["executed", sender],
            Self::IncludedBy(sender) => &["included", sender],
            Self::Condition => &["condition"],
            Self::Milestone => &["milestone"],
            Self::State(sender) => &["state", sender],
            Self::SetIncluded(value) => &["included", bool_segment(*value)],
            Self::SetPending(value) => &["pending", bool_segment(*value)],
            Self::Execute => &["executed"],
            Self::Lock => &["lock"],
            Self::Unlock(sender) => &["lock", sender],
            Self::History => &["history"],
        };
        segments.extend(tail.iter().map(|s| s.to_string()));
        segments
    }
}

/// Routes of the central registry the nodes consult.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryRoute<'a> {
    Login,
    Workflow(&'a str),
}

impl RegistryRoute<'_> {
    pub fn segments(&self) -> Vec<String> {
        match self {
            Self::Login => vec!["login".into()],
            Self::Workflow(id) => vec!["workflows".into(), id.to_string()],
        }
    }
}

fn bool_segment(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> EventKey {
        EventKey::new("w1", "e1")
    }

    fn joined(route: EventRoute<'_>) -> String {
        format!("/{}", route.segments(&key()).join("/"))
    }

    #[test]
    fn event_routes_render() {
        assert_eq!(joined(EventRoute::Events), "/events");
        assert_eq!(joined(EventRoute::Event), "/events/w1/e1");
        assert_eq!(joined(EventRoute::ExecutedBy("e2")), "/events/w1/e1/executed/e2");
        assert_eq!(joined(EventRoute::SetPending(true)), "/events/w1/e1/pending/true");
        assert_eq!(joined(EventRoute::SetIncluded(false)), "/events/w1/e1/included/false");
        assert_eq!(joined(EventRoute::Unlock("e2")), "/events/w1/e1/lock/e2");
        assert_eq!(joined(EventRoute::State("e2")), "/events/w1/e1/state/e2");
    }

    #[test]
    fn registry_routes_render() {
        assert_eq!(RegistryRoute::Login.segments(), vec!["login"]);
        assert_eq!(RegistryRoute::Workflow("w1").segments(), vec!["workflows", "w1"]);
    }

    #[test]
    fn templates_share_prefix() {
        assert!(routes::UNLOCK.starts_with(routes::LOCK));
        assert!(routes::EVENT.starts_with(routes::EVENTS));
    }
}
