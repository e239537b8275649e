use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use substation_client::domain::MeasurementRecord;

use super::round2;

/// Which child measurements to aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementKind {
    Current,
    Voltage,
    Sequence,
}

/// Statistics of one `(substation, bay, label)` group, rounded to 2 decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub substation: String,
    pub bay: String,
    /// Phase (`IA`, `VB`, ...) or sequence component (`I0`, ...).
    pub label: String,
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Sample standard deviation (n - 1); 0 for a single value.
    pub std_dev: f64,
    /// Population standard deviation (n).
    pub population_std_dev: f64,
    /// Mean of the angles present in the group, if any.
    pub mean_angle: Option<f64>,
}

#[derive(Default)]
struct Accumulator {
    values: Vec<f64>,
    angles: Vec<f64>,
}

impl Accumulator {
    fn push(&mut self, value: f64, angle: Option<f64>) {
        self.values.push(value);
        if let Some(a) = angle {
            self.angles.push(a);
        }
    }

    fn finish(mut self, substation: &str, bay: &str, label: &str) -> GroupStats {
        // Sorted summation keeps results independent of record order.
        self.values.sort_by(f64::total_cmp);
        self.angles.sort_by(f64::total_cmp);

        let n = self.values.len();
        let avg = mean(&self.values);
        let sq_dev: f64 = self.values.iter().map(|v| (v - avg).powi(2)).sum();
        let std_dev = if n > 1 { (sq_dev / (n - 1) as f64).sqrt() } else { 0.0 };
        let population_std_dev = (sq_dev / n as f64).sqrt();

        GroupStats {
            substation: substation.to_string(),
            bay: bay.to_string(),
            label: label.to_string(),
            count: n,
            min: round2(self.values[0]),
            max: round2(self.values[n - 1]),
            mean: round2(avg),
            std_dev: round2(std_dev),
            population_std_dev: round2(population_std_dev),
            mean_angle: (!self.angles.is_empty()).then(|| round2(mean(&self.angles))),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Group the child measurements of `kind` by `(substation, bay, label)` and
/// compute per-group statistics.
///
/// Groups come out in lexicographic key order. An empty input, or one with
/// no measurements of `kind`, yields an empty table.
pub fn aggregate(records: &[MeasurementRecord], kind: MeasurementKind) -> Vec<GroupStats> {
    let mut groups: BTreeMap<(&str, &str, &'static str), Accumulator> = BTreeMap::new();

    for r in records {
        let key = |label: &'static str| (r.substation_name.as_str(), r.bay_name.as_str(), label);

        match kind {
            MeasurementKind::Current => {
                for c in &r.phase_currents {
                    groups.entry(key(c.phase.as_str())).or_default().push(c.value, c.angle);
                }
            }
            MeasurementKind::Voltage => {
                for v in &r.phase_voltages {
                    groups.entry(key(v.phase.as_str())).or_default().push(v.value, v.angle);
                }
            }
            MeasurementKind::Sequence => {
                for s in &r.sequence_components {
                    groups.entry(key(s.component.as_str())).or_default().push(s.value, None);
                }
            }
        }
    }

    groups
        .into_iter()
        .map(|((substation, bay, label), acc)| acc.finish(substation, bay, label))
        .collect()
}
