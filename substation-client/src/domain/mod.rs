pub mod filter;
pub mod labels;
pub mod measurement;

pub use filter::{DistinctField, RecordFilter};
pub use labels::{CurrentPhase, SequenceLabel, UnknownLabel, VoltagePhase};
pub use measurement::{
    ElementKind, ElementReadings, LineReadings, MeasurementRecord, NewMeasurementRecord,
    PhaseCurrent, PhaseVoltage, SequenceComponent, TransformerReadings, WindingReadings,
    WindingType,
};
