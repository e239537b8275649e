pub mod aggregate;
pub mod filter;
pub mod summary;
pub mod thresholds;
pub mod trend;

pub use aggregate::{aggregate, GroupStats, MeasurementKind};
pub use filter::{query_records, resolve_filter, FilterRequest};
pub use summary::{summary, PooledStats, SummaryStatistics, TimeRange};
pub use thresholds::{evaluate_thresholds, Alert, AlertKind, ThresholdRules};
pub use trend::{
    extract_trend, ParameterSeries, Trend, TrendParameter, TrendPoint, TrendSeries,
};

/// Above this magnitude an `f64` has no fractional digits left to round.
const ROUND2_LIMIT: f64 = 1e15;

/// Round to 2 decimal places for presentation.
pub(crate) fn round2(v: f64) -> f64 {
    if !v.is_finite() || v.abs() >= ROUND2_LIMIT {
        return v;
    }
    (v * 100.0).round() / 100.0
}


#[cfg(test)]
pub(crate) mod fixtures {
    use substation_client::domain::{
        CurrentPhase, ElementReadings, LineReadings, MeasurementRecord, NewMeasurementRecord,
        PhaseCurrent, PhaseVoltage, SequenceComponent, SequenceLabel, VoltagePhase,
    };
    use time::OffsetDateTime;

    pub fn line_record(
        id: i64,
        ts: OffsetDateTime,
        substation: &str,
        bay: &str,
    ) -> MeasurementRecord {
        MeasurementRecord {
            id,
            timestamp: ts,
            substation_name: substation.to_string(),
            bay_name: bay.to_string(),
            voltage_level: "132kV".to_string(),
            relay_type: "P443".to_string(),
            element: ElementReadings::Line(LineReadings {
                active_power: 42.0,
                reactive_power: 7.5,
                ct_ratio: 240.0,
            }),
            phase_currents: Vec::new(),
            phase_voltages: Vec::new(),
            sequence_components: Vec::new(),
        }
    }

    pub fn with_current(
        mut r: MeasurementRecord,
        phase: CurrentPhase,
        value: f64,
    ) -> MeasurementRecord {
        r.phase_currents.push(PhaseCurrent {
            phase,
            value,
            angle: None,
        });
        r
    }

    pub fn with_voltage(
        mut r: MeasurementRecord,
        phase: VoltagePhase,
        value: f64,
    ) -> MeasurementRecord {
        r.phase_voltages.push(PhaseVoltage {
            phase,
            value,
            angle: None,
        });
        r
    }

    pub fn with_sequence(
        mut r: MeasurementRecord,
        component: SequenceLabel,
        value: f64,
    ) -> MeasurementRecord {
        r.sequence_components.push(SequenceComponent { component, value });
        r
    }

    pub fn as_new(r: MeasurementRecord) -> NewMeasurementRecord {
        NewMeasurementRecord {
            timestamp: Some(r.timestamp),
            substation_name: r.substation_name,
            bay_name: r.bay_name,
            voltage_level: r.voltage_level,
            relay_type: r.relay_type,
            element: r.element,
            phase_currents: r.phase_currents,
            phase_voltages: r.phase_voltages,
            sequence_components: r.sequence_components,
        }
    }
}
