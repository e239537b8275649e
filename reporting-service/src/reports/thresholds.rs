use std::collections::BTreeMap;

use serde::Serialize;
use substation_client::domain::{MeasurementRecord, SequenceLabel};
use time::OffsetDateTime;

/// Alert thresholds. `None` disables the check for that quantity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdRules {
    pub current: Option<f64>,
    pub voltage: Option<f64>,
    pub sequence: BTreeMap<SequenceLabel, f64>,
}

impl Default for ThresholdRules {
    fn default() -> Self {
        Self {
            current: Some(1600.0),
            voltage: Some(500.0),
            sequence: BTreeMap::from([(SequenceLabel::I0, 50.0), (SequenceLabel::V0, 50.0)]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlertKind {
    Current,
    Voltage,
    Sequence,
}

impl AlertKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Voltage => "voltage",
            Self::Sequence => "sequence",
        }
    }
}

/// One measurement that exceeded its threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub kind: AlertKind,
    pub label: &'static str,
    pub value: f64,
    pub threshold: f64,
    pub substation: String,
    pub bay: String,
    pub record_id: i64,
}

/// Compare every child measurement against `rules`, strictly greater-than.
///
/// Alerts follow record order, and within a record: phase currents, phase
/// voltages, then sequence components, each in stored order.
pub fn evaluate_thresholds(records: &[MeasurementRecord], rules: &ThresholdRules) -> Vec<Alert> {
    let mut alerts = Vec::new();

    for r in records {
        let mut raise = |kind, label, value: f64, threshold: f64| {
            if value > threshold {
                alerts.push(Alert {
                    timestamp: r.timestamp,
                    kind,
                    label,
                    value,
                    threshold,
                    substation: r.substation_name.clone(),
                    bay: r.bay_name.clone(),
                    record_id: r.id,
                });
            }
        };

        if let Some(limit) = rules.current {
            for c in &r.phase_currents {
                raise(AlertKind::Current, c.phase.as_str(), c.value, limit);
            }
        }
        if let Some(limit) = rules.voltage {
            for v in &r.phase_voltages {
                raise(AlertKind::Voltage, v.phase.as_str(), v.value, limit);
            }
        }
        for s in &r.sequence_components {
            if let Some(limit) = rules.sequence.get(&s.component) {
                raise(AlertKind::Sequence, s.component.as_str(), s.value, *limit);
            }
        }
    }

    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::fixtures::{line_record, with_current, with_sequence, with_voltage};
    use substation_client::domain::{CurrentPhase, VoltagePhase};
    use time::macros::datetime;

    #[test]
    fn current_above_limit_raises_one_alert() {
        let ts = datetime!(2024-05-01 12:00:00 UTC);
        let r = with_current(line_record(7, ts, "North", "L3"), CurrentPhase::IA, 2000.0);
        let r = with_current(r, CurrentPhase::IB, 900.0);

        let alerts = evaluate_thresholds(&[r], &ThresholdRules::default());
        assert_eq!(
            alerts,
            vec![Alert {
                timestamp: ts,
                kind: AlertKind::Current,
                label: "IA",
                value: 2000.0,
                threshold: 1600.0,
                substation: "North".into(),
                bay: "L3".into(),
                record_id: 7,
            }]
        );
    }

    #[test]
    fn comparison_is_strict() {
        let ts = datetime!(2024-05-01 12:00:00 UTC);
        let at_limit = with_voltage(line_record(1, ts, "A", "B1"), VoltagePhase::VA, 500.0);
        assert!(evaluate_thresholds(&[at_limit], &ThresholdRules::default()).is_empty());

        let above = with_voltage(line_record(2, ts, "A", "B1"), VoltagePhase::VA, 500.0 + 1e-9);
        assert_eq!(evaluate_thresholds(&[above], &ThresholdRules::default()).len(), 1);
    }

    #[test]
    fn alerts_follow_record_then_measurement_order() {
        let rules = ThresholdRules {
            current: Some(1.0),
            voltage: Some(1.0),
            sequence: BTreeMap::from([(SequenceLabel::I2, 1.0)]),
        };
        let r1 = line_record(1, datetime!(2024-05-01 00:00:00 UTC), "A", "B1");
        let r1 = with_sequence(r1, SequenceLabel::I2, 5.0);
        let r1 = with_voltage(r1, VoltagePhase::VC, 5.0);
        let r1 = with_current(r1, CurrentPhase::IB, 5.0);
        let r2 = line_record(2, datetime!(2024-05-02 00:00:00 UTC), "A", "B1");
        let r2 = with_current(r2, CurrentPhase::IA, 5.0);

        let order: Vec<_> = evaluate_thresholds(&[r1, r2], &rules)
            .into_iter()
            .map(|a| (a.record_id, a.label))
            .collect();
        assert_eq!(order, vec![(1, "IB"), (1, "VC"), (1, "I2"), (2, "IA")]);
    }

    #[test]
    fn components_without_a_rule_and_disabled_checks_are_skipped() {
        let rules = ThresholdRules {
            current: None,
            ..ThresholdRules::default()
        };
        let r = line_record(1, datetime!(2024-05-01 00:00:00 UTC), "A", "B1");
        let r = with_current(r, CurrentPhase::IA, 1e6);
        let r = with_sequence(r, SequenceLabel::I1, 1e6);
        let r = with_sequence(r, SequenceLabel::V0, 50.5);

        let alerts = evaluate_thresholds(&[r], &rules);
        assert_eq!(alerts.len(), 1);
        assert_eq!((alerts[0].kind, alerts[0].label), (AlertKind::Sequence, "V0"));
    }

    #[test]
    fn no_records_no_alerts() {
        assert!(evaluate_thresholds(&[], &ThresholdRules::default()).is_empty());
    }
}
