use std::{fmt, str::FromStr};

use time::OffsetDateTime;

use super::labels::{CurrentPhase, SequenceLabel, UnknownLabel, VoltagePhase};

/// Which kind of bay element a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ElementKind {
    Transformer,
    Line,
}

impl ElementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transformer => "transformer",
            Self::Line => "line",
        }
    }
}

impl FromStr for ElementKind {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transformer" => Ok(Self::Transformer),
            "line" => Ok(Self::Line),
            other => Err(UnknownLabel {
                kind: "element type",
                label: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Two-winding (HV/MV) or three-winding (HV/MV/LV) transformer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum WindingType {
    Two,
    Three,
}

impl WindingType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Two => "two",
            Self::Three => "three",
        }
    }
}

impl FromStr for WindingType {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "two" => Ok(Self::Two),
            "three" => Ok(Self::Three),
            other => Err(UnknownLabel {
                kind: "winding type",
                label: other.to_string(),
            }),
        }
    }
}

/// Readings taken on one transformer winding.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WindingReadings {
    pub ia: f64,
    pub ib: f64,
    pub ic: f64,
    pub ct_ratio: f64,
    /// MW
    pub active_power: f64,
    /// MVAR
    pub reactive_power: f64,
    /// °C
    pub winding_temp: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransformerReadings {
    pub winding_type: WindingType,
    pub oil_temp: f64,
    pub tap_position: i32,
    pub hv: WindingReadings,
    pub mv: WindingReadings,
    /// Present exactly when `winding_type` is [`WindingType::Three`].
    pub lv: Option<WindingReadings>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LineReadings {
    pub active_power: f64,
    pub reactive_power: f64,
    pub ct_ratio: f64,
}

/// Element-specific scalar fields of a record.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "element_type", rename_all = "lowercase"))]
pub enum ElementReadings {
    Transformer(TransformerReadings),
    Line(LineReadings),
}

impl ElementReadings {
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Transformer(_) => ElementKind::Transformer,
            Self::Line(_) => ElementKind::Line,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhaseCurrent {
    pub phase: CurrentPhase,
    pub value: f64,
    pub angle: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhaseVoltage {
    pub phase: VoltagePhase,
    pub value: f64,
    pub angle: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SequenceComponent {
    pub component: SequenceLabel,
    pub value: f64,
}

/// A stored reading event together with its child measurements.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeasurementRecord {
    pub id: i64,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
    pub substation_name: String,
    pub bay_name: String,
    pub voltage_level: String,
    pub relay_type: String,
    pub element: ElementReadings,
    pub phase_currents: Vec<PhaseCurrent>,
    pub phase_voltages: Vec<PhaseVoltage>,
    pub sequence_components: Vec<SequenceComponent>,
}

impl MeasurementRecord {
    pub fn element_kind(&self) -> ElementKind {
        self.element.kind()
    }
}

/// A submission that has not been stored yet.
///
/// `timestamp` falls back to the time of insertion when absent.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMeasurementRecord {
    pub timestamp: Option<OffsetDateTime>,
    pub substation_name: String,
    pub bay_name: String,
    pub voltage_level: String,
    pub relay_type: String,
    pub element: ElementReadings,
    pub phase_currents: Vec<PhaseCurrent>,
    pub phase_voltages: Vec<PhaseVoltage>,
    pub sequence_components: Vec<SequenceComponent>,
}

impl NewMeasurementRecord {
    pub fn into_record(self, id: i64, timestamp: OffsetDateTime) -> MeasurementRecord {
        MeasurementRecord {
            id,
            timestamp,
            substation_name: self.substation_name,
            bay_name: self.bay_name,
            voltage_level: self.voltage_level,
            relay_type: self.relay_type,
            element: self.element,
            phase_currents: self.phase_currents,
            phase_voltages: self.phase_voltages,
            sequence_components: self.sequence_components,
        }
    }
}
