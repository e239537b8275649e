use serde::Serialize;
use substation_client::domain::{CurrentPhase, MeasurementRecord, SequenceLabel, VoltagePhase};
use time::OffsetDateTime;

/// A trendable quantity, routed to the child table it lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendParameter {
    Current(CurrentPhase),
    Voltage(VoltagePhase),
    Sequence(SequenceLabel),
}

impl TrendParameter {
    /// Parameters offered to clients for selection.
    pub const VOCABULARY: [&'static str; 12] = [
        "IA", "IB", "IC", "VA", "VB", "VC", "I0", "I1", "I2", "V0", "V1", "V2",
    ];

    /// Sequence labels first, then phase labels by prefix (`I*` currents,
    /// `V*` voltages).
    pub fn classify(name: &str) -> Option<Self> {
        if let Ok(s) = name.parse::<SequenceLabel>() {
            return Some(Self::Sequence(s));
        }
        if name.starts_with('I') {
            return name.parse().ok().map(Self::Current);
        }
        if name.starts_with('V') {
            return name.parse().ok().map(Self::Voltage);
        }
        None
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Current(p) => p.as_str(),
            Self::Voltage(p) => p.as_str(),
            Self::Sequence(s) => s.as_str(),
        }
    }

    fn value_in(self, record: &MeasurementRecord) -> impl Iterator<Item = f64> + '_ {
        let currents = record
            .phase_currents
            .iter()
            .filter(move |c| matches!(self, Self::Current(p) if p == c.phase))
            .map(|c| c.value);
        let voltages = record
            .phase_voltages
            .iter()
            .filter(move |v| matches!(self, Self::Voltage(p) if p == v.phase))
            .map(|v| v.value);
        let sequences = record
            .sequence_components
            .iter()
            .filter(move |s| matches!(self, Self::Sequence(l) if l == s.component))
            .map(|s| s.value);
        currents.chain(voltages).chain(sequences)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSeries {
    pub parameter: &'static str,
    pub points: Vec<TrendPoint>,
}

/// Non-empty series in requested order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSeries {
    pub series: Vec<ParameterSeries>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Trend {
    Plot(TrendSeries),
    NoData,
}

/// Build a time series per requested parameter.
///
/// `records` must already be ascending by timestamp; points keep that order.
pub fn extract_trend<P: AsRef<str>>(records: &[MeasurementRecord], parameters: &[P]) -> Trend {
    let mut wanted: Vec<TrendParameter> = Vec::new();
    for name in parameters {
        let name = name.as_ref();
        match TrendParameter::classify(name) {
            Some(p) if !wanted.contains(&p) => wanted.push(p),
            Some(_) => {}
            None => tracing::debug!(parameter = name, "unknown trend parameter ignored"),
        }
    }

    let series: Vec<ParameterSeries> = wanted
        .into_iter()
        .filter_map(|param| {
            let points: Vec<TrendPoint> = records
                .iter()
                .flat_map(|r| {
                    param
                        .value_in(r)
                        .map(move |value| TrendPoint { timestamp: r.timestamp, value })
                })
                .collect();
            (!points.is_empty()).then(|| ParameterSeries {
                parameter: param.name(),
                points,
            })
        })
        .collect();

    if series.is_empty() {
        Trend::NoData
    } else {
        Trend::Plot(TrendSeries { series })
    }
}
