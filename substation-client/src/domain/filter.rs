use time::OffsetDateTime;

use super::measurement::MeasurementRecord;

/// Normalized record predicate.
///
/// `start` is inclusive and `end` exclusive. `None` fields impose no
/// constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub start: Option<OffsetDateTime>,
    pub end: Option<OffsetDateTime>,
    pub substation: Option<String>,
    pub bay: Option<String>,
}

impl RecordFilter {
    pub fn matches(&self, record: &MeasurementRecord) -> bool {
        if let Some(start) = self.start {
            if record.timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if record.timestamp >= end {
                return false;
            }
        }
        if let Some(substation) = &self.substation {
            if &record.substation_name != substation {
                return false;
            }
        }
        if let Some(bay) = &self.bay {
            if &record.bay_name != bay {
                return false;
            }
        }
        true
    }
}

/// Record columns that can be listed as distinct values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistinctField {
    Substation,
    Bay,
}

impl DistinctField {
    pub fn column(self) -> &'static str {
        match self {
            Self::Substation => "substation_name",
            Self::Bay => "bay_name",
        }
    }

    pub fn value_of(self, record: &MeasurementRecord) -> &str {
        match self {
            Self::Substation => &record.substation_name,
            Self::Bay => &record.bay_name,
        }
    }
}
