use std::collections::HashMap;

use substation_client::domain::{
    CurrentPhase, ElementKind, ElementReadings, LineReadings, NewMeasurementRecord, PhaseCurrent,
    PhaseVoltage, SequenceComponent, SequenceLabel, TransformerReadings, VoltagePhase,
    WindingReadings, WindingType,
};
use time::{format_description::well_known::Rfc3339, macros::datetime, OffsetDateTime};

use crate::error::ServiceError;

struct Form<'a> {
    fields: &'a HashMap<String, String>,
}

impl<'a> Form<'a> {
    /// Trimmed value, `None` when absent or blank.
    fn text(&self, field: &str) -> Option<&'a str> {
        self.fields
            .get(field)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, field: &str) -> Result<&'a str, ServiceError> {
        self.text(field).ok_or_else(|| ServiceError::missing_field(field))
    }

    fn number(&self, field: &str) -> Result<f64, ServiceError> {
        let raw = self.required(field)?;
        parse_finite(field, raw)
    }

    fn optional_number(&self, field: &str) -> Result<Option<f64>, ServiceError> {
        self.text(field).map(|raw| parse_finite(field, raw)).transpose()
    }

    fn integer(&self, field: &str) -> Result<i32, ServiceError> {
        let raw = self.required(field)?;
        raw.parse().map_err(|_| ServiceError::invalid_number(field, raw))
    }
}

/// Largest accepted magnitude for a submitted reading.
const MAX_MAGNITUDE: f64 = 1e12;

fn parse_finite(field: &str, raw: &str) -> Result<f64, ServiceError> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v.abs() <= MAX_MAGNITUDE => Ok(v),
        Ok(v) if v.is_finite() => Err(ServiceError::Validation(format!(
            "value for field '{field}' is out of range: '{raw}'"
        ))),
        _ => Err(ServiceError::invalid_number(field, raw)),
    }
}

fn invalid_choice(field: &str, e: impl std::fmt::Display) -> ServiceError {
    ServiceError::Validation(format!("invalid value for field '{field}': {e}"))
}

fn winding(form: &Form<'_>, prefix: &str) -> Result<WindingReadings, ServiceError> {
    let f = |name: &str| form.number(&format!("{prefix}_{name}"));
    Ok(WindingReadings {
        ia: f("ia")?,
        ib: f("ib")?,
        ic: f("ic")?,
        ct_ratio: f("ct_ratio")?,
        active_power: f("active_power")?,
        reactive_power: f("reactive_power")?,
        winding_temp: f("winding_temp")?,
    })
}

fn transformer(form: &Form<'_>) -> Result<TransformerReadings, ServiceError> {
    let raw = form.required("winding_type")?;
    let winding_type: WindingType = raw.parse().map_err(|e| invalid_choice("winding_type", e))?;

    Ok(TransformerReadings {
        winding_type,
        oil_temp: form.number("oil_temp")?,
        tap_position: form.integer("tap_position")?,
        hv: winding(form, "hv")?,
        mv: winding(form, "mv")?,
        lv: match winding_type {
            WindingType::Three => Some(winding(form, "lv")?),
            WindingType::Two => None,
        },
    })
}

/// Children of a line submission: every phase and sequence label is required.
type LineChildren = (Vec<PhaseCurrent>, Vec<PhaseVoltage>, Vec<SequenceComponent>);

fn line_children(form: &Form<'_>) -> Result<LineChildren, ServiceError> {
    let mut currents = Vec::with_capacity(CurrentPhase::ALL.len());
    for &phase in CurrentPhase::ALL {
        currents.push(PhaseCurrent {
            phase,
            value: form.number(&format!("{phase}_value"))?,
            angle: form.optional_number(&format!("{phase}_angle"))?,
        });
    }

    let mut voltages = Vec::with_capacity(VoltagePhase::ALL.len());
    for &phase in VoltagePhase::ALL {
        voltages.push(PhaseVoltage {
            phase,
            value: form.number(&format!("{phase}_value"))?,
            angle: form.optional_number(&format!("{phase}_angle"))?,
        });
    }

    let mut sequences = Vec::with_capacity(SequenceLabel::ALL.len());
    for &component in SequenceLabel::ALL {
        sequences.push(SequenceComponent {
            component,
            value: form.number(&format!("{component}_value"))?,
        });
    }

    Ok((currents, voltages, sequences))
}

fn timestamp(form: &Form<'_>) -> Result<Option<OffsetDateTime>, ServiceError> {
    let Some(raw) = form.text("timestamp") else {
        return Ok(None);
    };
    let ts = OffsetDateTime::parse(raw, &Rfc3339)
        .map_err(|e| ServiceError::Validation(format!("invalid timestamp '{raw}': {e}")))?;

    let min_ts = datetime!(2000-01-01 00:00:00 UTC);
    let max_ts = datetime!(2100-01-01 00:00:00 UTC);
    if ts < min_ts || ts > max_ts {
        return Err(ServiceError::Validation(format!(
            "timestamp '{raw}' out of allowed range"
        )));
    }

    Ok(Some(ts.to_offset(time::UtcOffset::UTC)))
}

/// Parse a submitted form into a record ready for insertion.
///
/// Nothing touches the store until parsing has succeeded.
pub fn parse_submission(
    fields: &HashMap<String, String>,
) -> Result<NewMeasurementRecord, ServiceError> {
    let form = Form { fields };

    let kind: ElementKind = form
        .required("element_type")?
        .parse()
        .map_err(|e| invalid_choice("element_type", e))?;

    let substation_name = form.required("substation_name")?.to_string();
    let bay_name = form.required("bay_name")?.to_string();
    let voltage_level = form.required("voltage_level")?.to_string();
    let relay_type = form.required("relay_type")?.to_string();
    let timestamp = timestamp(&form)?;

    let (element, (phase_currents, phase_voltages, sequence_components)) = match kind {
        ElementKind::Transformer => (
            ElementReadings::Transformer(transformer(&form)?),
            (Vec::new(), Vec::new(), Vec::new()),
        ),
        ElementKind::Line => (
            ElementReadings::Line(LineReadings {
                active_power: form.number("active_power")?,
                reactive_power: form.number("reactive_power")?,
                ct_ratio: form.number("ct_ratio")?,
            }),
            line_children(&form)?,
        ),
    };

    Ok(NewMeasurementRecord {
        timestamp,
        substation_name,
        bay_name,
        voltage_level,
        relay_type,
        element,
        phase_currents,
        phase_voltages,
        sequence_components,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDING_FIELDS: [&str; 7] = [
        "ia",
        "ib",
        "ic",
        "ct_ratio",
        "active_power",
        "reactive_power",
        "winding_temp",
    ];

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn line_form() -> HashMap<String, String> {
        let mut f = form(&[
            ("element_type", "line"),
            ("substation_name", "North"),
            ("bay_name", "L3"),
            ("voltage_level", "132kV"),
            ("relay_type", "P443"),
            ("active_power", "42.5"),
            ("reactive_power", "-3"),
            ("ct_ratio", "240"),
        ]);
        for label in [
            "IA", "IB", "IC", "IN", "VA", "VB", "VC", "VN", "I0", "I1", "I2", "V0", "V1", "V2",
        ] {
            f.insert(format!("{label}_value"), "10.5".into());
        }
        f.insert("IA_angle".into(), "-120".into());
        f
    }

    fn transformer_form(winding_type: &str) -> HashMap<String, String> {
        let mut f = form(&[
            ("element_type", "transformer"),
            ("substation_name", "North"),
            ("bay_name", "T1"),
            ("voltage_level", "132/33kV"),
            ("relay_type", "P643"),
            ("winding_type", winding_type),
            ("oil_temp", "61.5"),
            ("tap_position", "9"),
        ]);
        for prefix in ["hv", "mv"] {
            for name in WINDING_FIELDS {
                f.insert(format!("{prefix}_{name}"), "1.25".into());
            }
        }
        f
    }

    fn validation_message(err: ServiceError) -> String {
        match err {
            ServiceError::Validation(msg) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn line_submission_produces_all_children() {
        let rec = parse_submission(&line_form()).unwrap();
        assert_eq!(rec.phase_currents.len(), 4);
        assert_eq!(rec.phase_voltages.len(), 4);
        assert_eq!(rec.sequence_components.len(), 6);
        assert_eq!(rec.phase_currents[0].angle, Some(-120.0));
        assert_eq!(rec.phase_currents[1].angle, None);
        assert_eq!(rec.timestamp, None);
        assert!(matches!(rec.element, ElementReadings::Line(l) if l.reactive_power == -3.0));
    }

    #[test]
    fn missing_field_is_named() {
        let mut f = line_form();
        f.remove("VN_value");
        let msg = validation_message(parse_submission(&f).unwrap_err());
        assert_eq!(msg, "missing required field: VN_value");

        let mut f = line_form();
        f.insert("bay_name".into(), "   ".into());
        let msg = validation_message(parse_submission(&f).unwrap_err());
        assert!(msg.contains("bay_name"), "{msg}");
    }

    #[test]
    fn non_numeric_value_names_field_and_value() {
        let mut f = line_form();
        f.insert("IB_value".into(), "abc".into());
        let msg = validation_message(parse_submission(&f).unwrap_err());
        assert!(msg.contains("IB_value") && msg.contains("abc"), "{msg}");

        let mut f = line_form();
        f.insert("I0_value".into(), "NaN".into());
        assert!(parse_submission(&f).is_err());
    }

    #[test]
    fn huge_finite_value_is_rejected() {
        let mut f = line_form();
        f.insert("VA_value".into(), "1e308".into());
        let msg = validation_message(parse_submission(&f).unwrap_err());
        assert!(msg.contains("VA_value") && msg.contains("out of range"), "{msg}");

        f.insert("VA_value".into(), "-1e12".into());
        assert!(parse_submission(&f).is_ok());
    }

    #[test]
    fn two_winding_transformer_has_no_lv_and_no_children() {
        let rec = parse_submission(&transformer_form("two")).unwrap();
        let ElementReadings::Transformer(t) = rec.element else {
            panic!("expected transformer");
        };
        assert_eq!(t.winding_type, WindingType::Two);
        assert_eq!(t.tap_position, 9);
        assert_eq!(t.hv.winding_temp, 1.25);
        assert!(t.lv.is_none());
        assert!(rec.phase_currents.is_empty() && rec.sequence_components.is_empty());
    }

    #[test]
    fn three_winding_transformer_requires_lv_fields() {
        let err = parse_submission(&transformer_form("three")).unwrap_err();
        assert!(validation_message(err).contains("lv_ia"));

        let mut f = transformer_form("three");
        for name in WINDING_FIELDS {
            f.insert(format!("lv_{name}"), "2".into());
        }
        let rec = parse_submission(&f).unwrap();
        assert!(matches!(rec.element, ElementReadings::Transformer(t) if t.lv.is_some()));
    }

    #[test]
    fn fractional_tap_position_is_rejected() {
        let mut f = transformer_form("two");
        f.insert("tap_position".into(), "9.5".into());
        assert!(validation_message(parse_submission(&f).unwrap_err()).contains("tap_position"));
    }

    #[test]
    fn unknown_element_type_is_rejected() {
        let mut f = line_form();
        f.insert("element_type".into(), "busbar".into());
        let msg = validation_message(parse_submission(&f).unwrap_err());
        assert!(msg.contains("busbar"), "{msg}");
    }

    #[test]
    fn explicit_timestamp_is_normalised_to_utc() {
        let mut f = line_form();
        f.insert("timestamp".into(), "2024-06-01T10:30:00+02:00".into());
        let rec = parse_submission(&f).unwrap();
        assert_eq!(rec.timestamp, Some(datetime!(2024-06-01 08:30:00 UTC)));

        f.insert("timestamp".into(), "1999-12-31T23:59:59Z".into());
        assert!(parse_submission(&f).is_err());
    }
}
