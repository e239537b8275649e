pub mod csv_writer;

pub use csv_writer::CsvWorkbookWriter;

use std::path::PathBuf;

use substation_client::domain::{ElementReadings, MeasurementRecord, WindingReadings};
use time::{macros::format_description, OffsetDateTime};

use crate::error::ServiceError;

/// Spreadsheet applications cap sheet names at this many characters.
pub const SHEET_NAME_LIMIT: usize = 31;

const FORBIDDEN: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    fn opt(v: Option<f64>) -> Self {
        v.map_or(Self::Empty, Self::Number)
    }

    pub fn render(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(v) => v.to_string(),
            Self::Empty => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Workbook {
    /// Download name without extension.
    pub name: String,
    pub sheets: Vec<Sheet>,
}

/// Persists a built workbook and returns where it ended up.
pub trait TabularWriter {
    fn write(&self, workbook: &Workbook) -> Result<PathBuf, ServiceError>;
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| if FORBIDDEN.contains(&c) { '_' } else { c })
        .collect()
}

/// `{bay}_{id}`, sanitized and cut to [`SHEET_NAME_LIMIT`] characters. The
/// `_{id}` suffix always survives truncation.
pub fn sheet_name(bay: &str, id: i64) -> String {
    let suffix = format!("_{id}");
    let room = SHEET_NAME_LIMIT.saturating_sub(suffix.chars().count());
    let bay: String = sanitize(bay).chars().take(room).collect();
    format!("{bay}{suffix}")
}

fn header(cols: &[&str]) -> Vec<Cell> {
    cols.iter().map(|c| Cell::text(*c)).collect()
}

fn winding_rows(rows: &mut Vec<Vec<Cell>>, prefix: &str, w: &WindingReadings) {
    for (name, value) in [
        ("IA", w.ia),
        ("IB", w.ib),
        ("IC", w.ic),
        ("CT Ratio", w.ct_ratio),
        ("Active Power (MW)", w.active_power),
        ("Reactive Power (MVAR)", w.reactive_power),
        ("Winding Temp", w.winding_temp),
    ] {
        rows.push(vec![Cell::text(format!("{prefix} {name}")), Cell::Number(value)]);
    }
}

fn element_block(element: &ElementReadings) -> Vec<Vec<Cell>> {
    let mut rows = vec![header(&["Field", "Value"])];
    match element {
        ElementReadings::Transformer(t) => {
            rows.push(vec![Cell::text("Element Type"), Cell::text("transformer")]);
            rows.push(vec![Cell::text("Winding Type"), Cell::text(t.winding_type.as_str())]);
            rows.push(vec![Cell::text("Oil Temp"), Cell::Number(t.oil_temp)]);
            rows.push(vec![Cell::text("Tap Position"), Cell::Number(f64::from(t.tap_position))]);
            winding_rows(&mut rows, "HV", &t.hv);
            winding_rows(&mut rows, "MV", &t.mv);
            if let Some(lv) = &t.lv {
                winding_rows(&mut rows, "LV", lv);
            }
        }
        ElementReadings::Line(l) => {
            rows.push(vec![Cell::text("Element Type"), Cell::text("line")]);
            rows.push(vec![Cell::text("Active Power (MW)"), Cell::Number(l.active_power)]);
            rows.push(vec![Cell::text("Reactive Power (MVAR)"), Cell::Number(l.reactive_power)]);
            rows.push(vec![Cell::text("CT Ratio"), Cell::Number(l.ct_ratio)]);
        }
    }
    rows
}

fn record_sheet(r: &MeasurementRecord) -> Sheet {
    let mut rows = element_block(&r.element);

    rows.push(Vec::new());
    rows.push(header(&["Phase", "Value (A)", "Angle"]));
    for c in &r.phase_currents {
        rows.push(vec![Cell::text(c.phase.as_str()), Cell::Number(c.value), Cell::opt(c.angle)]);
    }

    rows.push(Vec::new());
    rows.push(header(&["Phase", "Value (kV)", "Angle"]));
    for v in &r.phase_voltages {
        rows.push(vec![Cell::text(v.phase.as_str()), Cell::Number(v.value), Cell::opt(v.angle)]);
    }

    rows.push(Vec::new());
    rows.push(header(&["Component", "Value"]));
    for s in &r.sequence_components {
        rows.push(vec![Cell::text(s.component.as_str()), Cell::Number(s.value)]);
    }

    Sheet {
        name: sheet_name(&r.bay_name, r.id),
        rows,
    }
}

/// Flatten `records` into a workbook named after the first record's
/// substation and `generated_at`.
pub fn build_workbook(
    records: &[MeasurementRecord],
    generated_at: OffsetDateTime,
) -> Result<Workbook, ServiceError> {
    let Some(first) = records.first() else {
        return Err(ServiceError::NotFound("no records selected for export".to_string()));
    };

    let ts_format = format_description!("[year]-[month]-[day] [hour]:[minute]");
    let mut summary = vec![header(&[
        "ID",
        "Timestamp",
        "Substation",
        "Bay",
        "Voltage Level",
        "Relay Type",
    ])];
    for r in records {
        let ts = r
            .timestamp
            .format(ts_format)
            .map_err(|e| ServiceError::Compute(format!("timestamp formatting failed: {e}")))?;
        summary.push(vec![
            Cell::Number(r.id as f64),
            Cell::Text(ts),
            Cell::text(&r.substation_name),
            Cell::text(&r.bay_name),
            Cell::text(&r.voltage_level),
            Cell::text(&r.relay_type),
        ]);
    }

    let mut sheets = vec![Sheet {
        name: "Summary".to_string(),
        rows: summary,
    }];
    sheets.extend(records.iter().map(record_sheet));

    let stamp = generated_at
        .format(format_description!("[year][month][day]_[hour][minute]"))
        .map_err(|e| ServiceError::Compute(format!("timestamp formatting failed: {e}")))?;

    Ok(Workbook {
        name: sanitize(&format!("{}_substation_data_{stamp}", first.substation_name)),
        sheets,
    })
}
