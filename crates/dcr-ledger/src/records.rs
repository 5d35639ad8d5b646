use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dcr_types::EventKey;

use crate::error::LedgerError;

/// What happened in a history record.
///
/// Cross-node interactions come in pairs: the initiator writes the active
/// form (`Includes`, `SetsPending`, `ChecksCondition`, …) and the receiver
/// the passive one (`IncludedBy`, `SetPendingBy`, `CheckedConditionBy`, …).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HistoryKind {
    Includes,
    IncludedBy,
    Excludes,
    ExcludedBy,
    SetsPending,
    SetPendingBy,
    ChecksCondition,
    CheckedConditionBy,
    ChecksMilestone,
    CheckedMilestoneBy,
    ExecuteStart,
    ExecuteFinished,
    ExecuteFailed,
}

impl HistoryKind {
    /// The record kind the other side of this interaction writes.
    pub fn counterpart_kind(&self) -> Option<HistoryKind> {
        match self {
            Self::Includes => Some(Self::IncludedBy),
            Self::IncludedBy => Some(Self::Includes),
            Self::Excludes => Some(Self::ExcludedBy),
            Self::ExcludedBy => Some(Self::Excludes),
            Self::SetsPending => Some(Self::SetPendingBy),
            Self::SetPendingBy => Some(Self::SetsPending),
            Self::ChecksCondition => Some(Self::CheckedConditionBy),
            Self::CheckedConditionBy => Some(Self::ChecksCondition),
            Self::ChecksMilestone => Some(Self::CheckedMilestoneBy),
            Self::CheckedMilestoneBy => Some(Self::ChecksMilestone),
            Self::ExecuteStart | Self::ExecuteFinished | Self::ExecuteFailed => None,
        }
    }

    /// Whether this is the initiating side of a cross-node interaction.
    pub fn is_outgoing(&self) -> bool {
        matches!(
            self,
            Self::Includes
                | Self::Excludes
                | Self::SetsPending
                | Self::ChecksCondition
                | Self::ChecksMilestone
        )
    }
}

/// One row of an event's causal history.
///
/// Everything except `counterpart_timestamp` is immutable once reserved;
/// that field may be filled in once, after the other side has answered.
/// `record_hash` therefore covers every field but `counterpart_timestamp`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub workflow_id: String,
    pub event_id: String,
    pub timestamp: u64,
    pub kind: HistoryKind,
    pub counterpart_id: Option<String>,
    pub counterpart_timestamp: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub recorded_at: DateTime<Utc>,
    #[serde(with = "opt_hash_hex")]
    pub prev_hash: Option<[u8; 32]>,
    #[serde(with = "hash_hex")]
    pub record_hash: [u8; 32],
}

impl HistoryRecord {
    /// A record ready for reservation. Timestamp and hashes are assigned by
    /// the ledger.
    pub fn new(key: &EventKey, kind: HistoryKind) -> Self {
        Self {
            workflow_id: key.workflow_id.clone(),
            event_id: key.event_id.clone(),
            timestamp: 0,
            kind,
            counterpart_id: None,
            counterpart_timestamp: None,
            message: None,
            recorded_at: Utc::now(),
            prev_hash: None,
            record_hash: [0; 32],
        }
    }

    pub fn with_counterpart(
        mut self,
        counterpart_id: impl Into<String>,
        counterpart_timestamp: Option<u64>,
    ) -> Self {
        self.counterpart_id = Some(counterpart_id.into());
        self.counterpart_timestamp = counterpart_timestamp;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn key(&self) -> EventKey {
        EventKey::new(self.workflow_id.clone(), self.event_id.clone())
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.record_hash)
    }

    /// Recompute the hash over the immutable fields.
    pub fn compute_hash(&self) -> Result<[u8; 32], LedgerError> {
        let hashed = HashedFields {
            workflow_id: &self.workflow_id,
            event_id: &self.event_id,
            timestamp: self.timestamp,
            kind: self.kind,
            counterpart_id: self.counterpart_id.as_deref(),
            message: self.message.as_deref(),
            recorded_at: &self.recorded_at,
            prev_hash: self.prev_hash,
        };
        let encoded =
            serde_json::to_vec(&hashed).map_err(|e| LedgerError::Serialization(e.to_string()))?;

        let mut hasher = blake3::Hasher::new();
        hasher.update(b"dcr-history-v1:");
        hasher.update(&encoded);
        Ok(*hasher.finalize().as_bytes())
    }
}

#[derive(Serialize)]
struct HashedFields<'a> {
    workflow_id: &'a str,
    event_id: &'a str,
    timestamp: u64,
    kind: HistoryKind,
    counterpart_id: Option<&'a str>,
    message: Option<&'a str>,
    recorded_at: &'a DateTime<Utc>,
    prev_hash: Option<[u8; 32]>,
}

mod hash_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(hash: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(deserializer)?;
        decode(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn decode(s: &str) -> Result<[u8; 32], String> {
        let bytes = hex::decode(s).map_err(|e| e.to_string())?;
        <[u8; 32]>::try_from(bytes.as_slice())
            .map_err(|_| format!("expected 32 bytes, got {}", bytes.len()))
    }
}

mod opt_hash_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        hash: &Option<[u8; 32]>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match hash {
            Some(h) => serializer.serialize_some(&hex::encode(h)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<[u8; 32]>, D::Error> {
        let s = Option::<String>::deserialize(deserializer)?;
        s.map(|s| super::hash_hex::decode(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counterpart_kinds_pair_up() {
        for kind in [
            HistoryKind::Includes,
            HistoryKind::Excludes,
            HistoryKind::SetsPending,
            HistoryKind::ChecksCondition,
            HistoryKind::ChecksMilestone,
        ] {
            let other = kind.counterpart_kind().unwrap();
            assert!(kind.is_outgoing());
            assert!(!other.is_outgoing());
            assert_eq!(other.counterpart_kind(), Some(kind));
        }
        assert_eq!(HistoryKind::ExecuteStart.counterpart_kind(), None);
    }

    #[test]
    fn hash_ignores_counterpart_timestamp() {
        let key = EventKey::new("w1", "e1");
        let record = HistoryRecord::new(&key, HistoryKind::SetsPending).with_counterpart("e2", None);
        let before = record.compute_hash().unwrap();

        let mut amended = record.clone();
        amended.counterpart_timestamp = Some(7);
        assert_eq!(amended.compute_hash().unwrap(), before);

        let mut tampered = record;
        tampered.counterpart_id = Some("e3".into());
        assert_ne!(tampered.compute_hash().unwrap(), before);
    }

    #[test]
    fn json_uses_hex_hashes() {
        let key = EventKey::new("w1", "e1");
        let mut record = HistoryRecord::new(&key, HistoryKind::ExecuteStart);
        record.record_hash = [0xab; 32];
        record.prev_hash = Some([0x01; 32]);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["record_hash"], hex::encode([0xab; 32]));
        assert_eq!(json["prev_hash"], hex::encode([0x01; 32]));
        assert!(json.get("message").is_none());

        let back: HistoryRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
