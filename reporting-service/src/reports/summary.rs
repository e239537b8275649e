use std::collections::BTreeSet;

use serde::Serialize;
use substation_client::domain::MeasurementRecord;
use time::Date;

use super::round2;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    #[serde(with = "iso_date")]
    pub start: Date,
    #[serde(with = "iso_date")]
    pub end: Date,
}

/// Pooled statistics over every phase of one quantity. All zero when empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PooledStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

impl PooledStats {
    fn from_values(mut values: Vec<f64>) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        values.sort_by(f64::total_cmp);
        let n = values.len();
        Self {
            min: round2(values[0]),
            max: round2(values[n - 1]),
            avg: round2(values.iter().sum::<f64>() / n as f64),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStatistics {
    pub total_records: usize,
    pub substations: usize,
    pub bays: usize,
    pub time_range: Option<TimeRange>,
    pub current_stats: PooledStats,
    pub voltage_stats: PooledStats,
}

pub fn summary(records: &[MeasurementRecord]) -> SummaryStatistics {
    let substations: BTreeSet<&str> = records.iter().map(|r| r.substation_name.as_str()).collect();
    let bays: BTreeSet<&str> = records.iter().map(|r| r.bay_name.as_str()).collect();

    let time_range = records
        .iter()
        .map(|r| r.timestamp)
        .min()
        .zip(records.iter().map(|r| r.timestamp).max())
        .map(|(lo, hi)| TimeRange {
            start: lo.date(),
            end: hi.date(),
        });

    let currents = records
        .iter()
        .flat_map(|r| r.phase_currents.iter().map(|c| c.value))
        .collect();
    let voltages = records
        .iter()
        .flat_map(|r| r.phase_voltages.iter().map(|v| v.value))
        .collect();

    SummaryStatistics {
        total_records: records.len(),
        substations: substations.len(),
        bays: bays.len(),
        time_range,
        current_stats: PooledStats::from_values(currents),
        voltage_stats: PooledStats::from_values(voltages),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::fixtures::{line_record, with_current, with_voltage};
    use substation_client::domain::{CurrentPhase, VoltagePhase};
    use time::macros::{date, datetime};

    #[test]
    fn empty_input_reports_zeros() {
        let s = summary(&[]);
        assert_eq!(s.total_records, 0);
        assert_eq!(s.substations, 0);
        assert_eq!(s.bays, 0);
        assert_eq!(s.time_range, None);
        assert_eq!(s.current_stats, PooledStats::default());
        assert_eq!(s.voltage_stats, PooledStats::default());
    }

    #[test]
    fn counts_and_pools_across_records() {
        let r1 = line_record(1, datetime!(2024-02-03 22:15:00 UTC), "North", "L1");
        let r1 = with_current(with_current(r1, CurrentPhase::IA, 100.0), CurrentPhase::IB, 250.556);
        let r2 = line_record(2, datetime!(2024-02-01 06:00:00 UTC), "North", "T1");
        let r2 = with_voltage(r2, VoltagePhase::VA, 66.0);
        let r3 = line_record(3, datetime!(2024-02-02 12:00:00 UTC), "South", "L1");
        let r3 = with_current(r3, CurrentPhase::IC, 50.0);

        let s = summary(&[r1, r2, r3]);
        assert_eq!(s.total_records, 3);
        assert_eq!(s.substations, 2);
        assert_eq!(s.bays, 2);
        assert_eq!(
            s.time_range,
            Some(TimeRange {
                start: date!(2024 - 02 - 01),
                end: date!(2024 - 02 - 03),
            })
        );
        assert_eq!(s.current_stats, PooledStats { min: 50.0, max: 250.56, avg: 133.52 });
        assert_eq!(s.voltage_stats, PooledStats { min: 66.0, max: 66.0, avg: 66.0 });
    }

    #[test]
    fn time_range_serializes_as_iso_dates() {
        let range = TimeRange {
            start: date!(2024 - 01 - 05),
            end: date!(2024 - 12 - 31),
        };
        assert_eq!(
            serde_json::to_value(range).unwrap(),
            serde_json::json!({ "start": "2024-01-05", "end": "2024-12-31" })
        );
    }
}
