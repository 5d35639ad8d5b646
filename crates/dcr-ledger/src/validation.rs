use dcr_types::EventKey;

use crate::error::LedgerError;
use crate::records::HistoryRecord;
use crate::traits::HistoryReader;

/// Result of validating one event's history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationReport {
    pub key: EventKey,
    pub record_count: u64,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A specific integrity violation detected during validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub timestamp: u64,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    TimestampGap,
    HashChainBreak,
    HashMismatch,
    ForeignRecord,
}

/// Local integrity checks over a single event's history: gapless
/// timestamps from 1, intact hash links and hashes, and no record filed
/// under the wrong event. Cross-node anomalies are out of its reach.
pub struct HistoryValidator;

impl HistoryValidator {
    pub fn validate_event<R: HistoryReader + ?Sized>(
        reader: &R,
        key: &EventKey,
    ) -> Result<ValidationReport, LedgerError> {
        let records = reader.read_event(key)?;
        Ok(Self::validate_records(key, &records))
    }

    pub fn validate_records(key: &EventKey, records: &[HistoryRecord]) -> ValidationReport {
        let mut violations = Vec::new();

        for (index, record) in records.iter().enumerate() {
            if &record.key() != key {
                violations.push(Violation {
                    timestamp: record.timestamp,
                    kind: ViolationKind::ForeignRecord,
                    description: format!("record belongs to {}", record.key()),
                });
            }

            let expected = (index + 1) as u64;
            if record.timestamp != expected {
                violations.push(Violation {
                    timestamp: record.timestamp,
                    kind: ViolationKind::TimestampGap,
                    description: format!("expected timestamp {expected}, got {}", record.timestamp),
                });
            }

            let expected_prev = index.checked_sub(1).map(|i| records[i].record_hash);
            if record.prev_hash != expected_prev {
                violations.push(Violation {
                    timestamp: record.timestamp,
                    kind: ViolationKind::HashChainBreak,
                    description: "previous hash link mismatch".into(),
                });
            }

            if let Ok(computed) = record.compute_hash() {
                if computed != record.record_hash {
                    violations.push(Violation {
                        timestamp: record.timestamp,
                        kind: ViolationKind::HashMismatch,
                        description: "record hash does not match computed".into(),
                    });
                }
            }
        }

        ValidationReport {
            key: key.clone(),
            record_count: records.len() as u64,
            violations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryHistoryLedger;
    use crate::records::HistoryKind;
    use crate::traits::HistoryWriter;

    fn seeded() -> (InMemoryHistoryLedger, EventKey) {
        let ledger = InMemoryHistoryLedger::new();
        let key = EventKey::new("w1", "e1");
        for kind in [
            HistoryKind::ExecuteStart,
            HistoryKind::ExecuteFinished,
            HistoryKind::SetsPending,
        ] {
            ledger.reserve_next(HistoryRecord::new(&key, kind)).unwrap();
        }
        (ledger, key)
    }

    #[test]
    fn clean_history_is_valid() {
        let (ledger, key) = seeded();
        let report = HistoryValidator::validate_event(&ledger, &key).unwrap();
        assert!(report.is_valid());
        assert_eq!(report.record_count, 3);
    }

    #[test]
    fn backfilled_counterpart_keeps_history_valid() {
        let (ledger, key) = seeded();
        let mut record = ledger.read_event(&key).unwrap()[2].clone();
        record.counterpart_timestamp = Some(11);
        ledger.update_history(&record).unwrap();

        assert!(HistoryValidator::validate_event(&ledger, &key).unwrap().is_valid());
    }

    #[test]
    fn detects_rewritten_record() {
        let (ledger, key) = seeded();
        let mut records = ledger.read_event(&key).unwrap();
        records[1].kind = HistoryKind::ExecuteFailed;

        let report = HistoryValidator::validate_records(&key, &records);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].kind, ViolationKind::HashMismatch);
    }

    #[test]
    fn detects_dropped_record() {
        let (ledger, key) = seeded();
        let mut records = ledger.read_event(&key).unwrap();
        records.remove(1);

        let report = HistoryValidator::validate_records(&key, &records);
        let kinds: Vec<_> = report.violations.iter().map(|v| v.kind.clone()).collect();
        assert_eq!(kinds, vec![ViolationKind::TimestampGap, ViolationKind::HashChainBreak]);
    }

    #[test]
    fn detects_foreign_record() {
        let (ledger, key) = seeded();
        let records = ledger.read_event(&key).unwrap();
        let report = HistoryValidator::validate_records(&EventKey::new("w1", "e9"), &records);
        assert_eq!(report.violations.len(), 3);
        assert!(report
            .violations
            .iter()
            .all(|v| v.kind == ViolationKind::ForeignRecord));
    }
}
