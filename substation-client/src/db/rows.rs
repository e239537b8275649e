use std::collections::HashMap;

use time::OffsetDateTime;

use crate::domain::{
    CurrentPhase, ElementKind, ElementReadings, LineReadings, MeasurementRecord, PhaseCurrent,
    PhaseVoltage, SequenceComponent, SequenceLabel, TransformerReadings, UnknownLabel,
    VoltagePhase, WindingReadings, WindingType,
};

#[derive(thiserror::Error, Debug)]
pub enum RowMappingError {
    #[error(transparent)]
    Label(#[from] UnknownLabel),
    #[error("record {record_id}: column '{column}' is NULL for a {element} record")]
    MissingColumn {
        record_id: i64,
        column: &'static str,
        element: ElementKind,
    },
}

/// Element-specific columns of `measurement_record`, all nullable except
/// the discriminator.
#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
pub struct ElementColumns {
    pub element_type: String,
    pub winding_type: Option<String>,
    pub oil_temp: Option<f64>,
    pub tap_position: Option<i32>,
    pub hv_ia: Option<f64>,
    pub hv_ib: Option<f64>,
    pub hv_ic: Option<f64>,
    pub mv_ia: Option<f64>,
    pub mv_ib: Option<f64>,
    pub mv_ic: Option<f64>,
    pub lv_ia: Option<f64>,
    pub lv_ib: Option<f64>,
    pub lv_ic: Option<f64>,
    pub hv_ct_ratio: Option<f64>,
    pub mv_ct_ratio: Option<f64>,
    pub lv_ct_ratio: Option<f64>,
    pub hv_active_power: Option<f64>,
    pub hv_reactive_power: Option<f64>,
    pub mv_active_power: Option<f64>,
    pub mv_reactive_power: Option<f64>,
    pub lv_active_power: Option<f64>,
    pub lv_reactive_power: Option<f64>,
    pub hv_winding_temp: Option<f64>,
    pub mv_winding_temp: Option<f64>,
    pub lv_winding_temp: Option<f64>,
    pub active_power: Option<f64>,
    pub reactive_power: Option<f64>,
    pub ct_ratio: Option<f64>,
}

/// Column list matching the field order of [`ElementColumns`].
pub const ELEMENT_COLUMNS: &str = "element_type, winding_type, oil_temp, tap_position, \
    hv_ia, hv_ib, hv_ic, mv_ia, mv_ib, mv_ic, lv_ia, lv_ib, lv_ic, \
    hv_ct_ratio, mv_ct_ratio, lv_ct_ratio, \
    hv_active_power, hv_reactive_power, mv_active_power, mv_reactive_power, \
    lv_active_power, lv_reactive_power, \
    hv_winding_temp, mv_winding_temp, lv_winding_temp, \
    active_power, reactive_power, ct_ratio";

impl From<&ElementReadings> for ElementColumns {
    fn from(element: &ElementReadings) -> Self {
        match element {
            ElementReadings::Line(line) => ElementColumns {
                element_type: ElementKind::Line.as_str().to_string(),
                active_power: Some(line.active_power),
                reactive_power: Some(line.reactive_power),
                ct_ratio: Some(line.ct_ratio),
                ..Default::default()
            },
            ElementReadings::Transformer(t) => {
                let lv = t.lv.as_ref();
                ElementColumns {
                    element_type: ElementKind::Transformer.as_str().to_string(),
                    winding_type: Some(t.winding_type.as_str().to_string()),
                    oil_temp: Some(t.oil_temp),
                    tap_position: Some(t.tap_position),
                    hv_ia: Some(t.hv.ia),
                    hv_ib: Some(t.hv.ib),
                    hv_ic: Some(t.hv.ic),
                    mv_ia: Some(t.mv.ia),
                    mv_ib: Some(t.mv.ib),
                    mv_ic: Some(t.mv.ic),
                    lv_ia: lv.map(|w| w.ia),
                    lv_ib: lv.map(|w| w.ib),
                    lv_ic: lv.map(|w| w.ic),
                    hv_ct_ratio: Some(t.hv.ct_ratio),
                    mv_ct_ratio: Some(t.mv.ct_ratio),
                    lv_ct_ratio: lv.map(|w| w.ct_ratio),
                    hv_active_power: Some(t.hv.active_power),
                    hv_reactive_power: Some(t.hv.reactive_power),
                    mv_active_power: Some(t.mv.active_power),
                    mv_reactive_power: Some(t.mv.reactive_power),
                    lv_active_power: lv.map(|w| w.active_power),
                    lv_reactive_power: lv.map(|w| w.reactive_power),
                    hv_winding_temp: Some(t.hv.winding_temp),
                    mv_winding_temp: Some(t.mv.winding_temp),
                    lv_winding_temp: lv.map(|w| w.winding_temp),
                    active_power: None,
                    reactive_power: None,
                    ct_ratio: None,
                }
            }
        }
    }
}

impl ElementColumns {
    pub fn to_readings(&self, record_id: i64) -> Result<ElementReadings, RowMappingError> {
        let kind: ElementKind = self.element_type.parse()?;
        let req = |column: &'static str, v: Option<f64>| {
            v.ok_or(RowMappingError::MissingColumn {
                record_id,
                column,
                element: kind,
            })
        };

        match kind {
            ElementKind::Line => Ok(ElementReadings::Line(LineReadings {
                active_power: req("active_power", self.active_power)?,
                reactive_power: req("reactive_power", self.reactive_power)?,
                ct_ratio: req("ct_ratio", self.ct_ratio)?,
            })),
            ElementKind::Transformer => {
                let winding_type: WindingType = self
                    .winding_type
                    .as_deref()
                    .ok_or(RowMappingError::MissingColumn {
                        record_id,
                        column: "winding_type",
                        element: kind,
                    })?
                    .parse()?;
                let tap_position = self.tap_position.ok_or(RowMappingError::MissingColumn {
                    record_id,
                    column: "tap_position",
                    element: kind,
                })?;

                let hv = WindingReadings {
                    ia: req("hv_ia", self.hv_ia)?,
                    ib: req("hv_ib", self.hv_ib)?,
                    ic: req("hv_ic", self.hv_ic)?,
                    ct_ratio: req("hv_ct_ratio", self.hv_ct_ratio)?,
                    active_power: req("hv_active_power", self.hv_active_power)?,
                    reactive_power: req("hv_reactive_power", self.hv_reactive_power)?,
                    winding_temp: req("hv_winding_temp", self.hv_winding_temp)?,
                };
                let mv = WindingReadings {
                    ia: req("mv_ia", self.mv_ia)?,
                    ib: req("mv_ib", self.mv_ib)?,
                    ic: req("mv_ic", self.mv_ic)?,
                    ct_ratio: req("mv_ct_ratio", self.mv_ct_ratio)?,
                    active_power: req("mv_active_power", self.mv_active_power)?,
                    reactive_power: req("mv_reactive_power", self.mv_reactive_power)?,
                    winding_temp: req("mv_winding_temp", self.mv_winding_temp)?,
                };
                let lv = match winding_type {
                    WindingType::Two => None,
                    WindingType::Three => Some(WindingReadings {
                        ia: req("lv_ia", self.lv_ia)?,
                        ib: req("lv_ib", self.lv_ib)?,
                        ic: req("lv_ic", self.lv_ic)?,
                        ct_ratio: req("lv_ct_ratio", self.lv_ct_ratio)?,
                        active_power: req("lv_active_power", self.lv_active_power)?,
                        reactive_power: req("lv_reactive_power", self.lv_reactive_power)?,
                        winding_temp: req("lv_winding_temp", self.lv_winding_temp)?,
                    }),
                };

                Ok(ElementReadings::Transformer(TransformerReadings {
                    winding_type,
                    oil_temp: req("oil_temp", self.oil_temp)?,
                    tap_position,
                    hv,
                    mv,
                    lv,
                }))
            }
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MeasurementRecordRow {
    pub id: i64,
    pub ts: OffsetDateTime,
    pub substation_name: String,
    pub bay_name: String,
    pub voltage_level: String,
    pub relay_type: String,
    #[sqlx(flatten)]
    pub element: ElementColumns,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PhaseCurrentRow {
    pub record_id: i64,
    pub phase: String,
    pub value: f64,
    pub angle: Option<f64>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PhaseVoltageRow {
    pub record_id: i64,
    pub phase: String,
    pub value: f64,
    pub angle: Option<f64>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SequenceComponentRow {
    pub record_id: i64,
    pub component: String,
    pub value: f64,
}

/// Child rows of a set of records, keyed by `record_id`.
#[derive(Debug, Default)]
pub struct ChildRows {
    pub currents: HashMap<i64, Vec<PhaseCurrent>>,
    pub voltages: HashMap<i64, Vec<PhaseVoltage>>,
    pub sequences: HashMap<i64, Vec<SequenceComponent>>,
}

impl ChildRows {
    pub fn from_rows(
        currents: Vec<PhaseCurrentRow>,
        voltages: Vec<PhaseVoltageRow>,
        sequences: Vec<SequenceComponentRow>,
    ) -> Result<Self, RowMappingError> {
        let mut children = ChildRows::default();

        for row in currents {
            let phase: CurrentPhase = row.phase.parse()?;
            children.currents.entry(row.record_id).or_default().push(PhaseCurrent {
                phase,
                value: row.value,
                angle: row.angle,
            });
        }
        for row in voltages {
            let phase: VoltagePhase = row.phase.parse()?;
            children.voltages.entry(row.record_id).or_default().push(PhaseVoltage {
                phase,
                value: row.value,
                angle: row.angle,
            });
        }
        for row in sequences {
            let component: SequenceLabel = row.component.parse()?;
            children
                .sequences
                .entry(row.record_id)
                .or_default()
                .push(SequenceComponent {
                    component,
                    value: row.value,
                });
        }

        Ok(children)
    }

    /// Assemble a record, moving its children out of this set.
    pub fn attach(
        &mut self,
        row: MeasurementRecordRow,
    ) -> Result<MeasurementRecord, RowMappingError> {
        let element = row.element.to_readings(row.id)?;
        Ok(MeasurementRecord {
            id: row.id,
            timestamp: row.ts,
            substation_name: row.substation_name,
            bay_name: row.bay_name,
            voltage_level: row.voltage_level,
            relay_type: row.relay_type,
            element,
            phase_currents: self.currents.remove(&row.id).unwrap_or_default(),
            phase_voltages: self.voltages.remove(&row.id).unwrap_or_default(),
            sequence_components: self.sequences.remove(&row.id).unwrap_or_default(),
        })
    }
}
