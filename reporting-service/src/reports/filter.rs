use serde::{Deserialize, Serialize};
use substation_client::domain::{MeasurementRecord, RecordFilter};
use time::{macros::format_description, Date};

use crate::{error::ServiceError, store::RecordStore};

/// Raw report filter as submitted by a client. Blank values are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRequest {
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub substation: Option<String>,
    #[serde(default)]
    pub bay: Option<String>,
}

fn non_blank(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(field: &str, raw: &str) -> Result<Date, ServiceError> {
    Date::parse(raw, format_description!("[year]-[month]-[day]")).map_err(|e| {
        ServiceError::Validation(format!("invalid date for field '{field}': '{raw}' ({e})"))
    })
}

/// Turn a raw request into a record predicate.
///
/// `end_date` covers the whole day: the bound is midnight of the next day,
/// exclusive. All dates are UTC.
pub fn resolve_filter(req: &FilterRequest) -> Result<RecordFilter, ServiceError> {
    let start = non_blank(&req.start_date)
        .map(|raw| parse_date("start_date", raw))
        .transpose()?
        .map(|d| d.midnight().assume_utc());

    let end = match non_blank(&req.end_date) {
        Some(raw) => {
            let day = parse_date("end_date", raw)?;
            let next = day.next_day().ok_or_else(|| {
                ServiceError::Validation(format!("end_date '{raw}' is out of range"))
            })?;
            Some(next.midnight().assume_utc())
        }
        None => None,
    };

    Ok(RecordFilter {
        start,
        end,
        substation: non_blank(&req.substation).map(str::to_string),
        bay: non_blank(&req.bay).map(str::to_string),
    })
}

/// Resolve `req` and fetch the matching records, ascending by timestamp.
pub async fn query_records<S>(
    store: &S,
    req: &FilterRequest,
) -> Result<Vec<MeasurementRecord>, ServiceError>
where
    S: RecordStore + ?Sized,
{
    let filter = resolve_filter(req)?;
    let records = store.query(&filter).await?;
    tracing::debug!(?filter, records = records.len(), "records filtered");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        reports::fixtures::{as_new, line_record},
        store::MemoryRecordStore,
    };
    use time::macros::datetime;

    fn req(start: Option<&str>, end: Option<&str>) -> FilterRequest {
        FilterRequest {
            start_date: start.map(str::to_string),
            end_date: end.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn empty_request_has_no_constraints() {
        let filter = resolve_filter(&FilterRequest::default()).unwrap();
        assert_eq!(filter, RecordFilter::default());
    }

    #[test]
    fn blank_fields_are_treated_as_omitted() {
        let filter = resolve_filter(&FilterRequest {
            start_date: Some("".into()),
            end_date: Some("  ".into()),
            substation: Some("".into()),
            bay: None,
        })
        .unwrap();
        assert_eq!(filter, RecordFilter::default());
    }

    #[test]
    fn end_date_includes_the_whole_day() {
        let filter = resolve_filter(&req(Some("2024-03-01"), Some("2024-03-31"))).unwrap();
        assert_eq!(filter.start, Some(datetime!(2024-03-01 00:00:00 UTC)));
        assert_eq!(filter.end, Some(datetime!(2024-04-01 00:00:00 UTC)));
    }

    #[test]
    fn malformed_date_names_the_field() {
        let err = resolve_filter(&req(None, Some("31/03/2024"))).unwrap_err();
        match err {
            ServiceError::Validation(msg) => assert!(msg.contains("end_date"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn query_returns_matching_records_in_time_order() {
        let store = MemoryRecordStore::new();
        for (ts, bay) in [
            (datetime!(2024-03-02 08:00:00 UTC), "B1"),
            (datetime!(2024-03-01 23:30:00 UTC), "B1"),
            (datetime!(2024-03-01 10:00:00 UTC), "B2"),
            (datetime!(2024-02-28 10:00:00 UTC), "B1"),
        ] {
            store
                .insert(as_new(line_record(0, ts, "A", bay)))
                .await
                .unwrap();
        }

        let mut request = req(Some("2024-03-01"), Some("2024-03-02"));
        request.bay = Some("B1".into());
        let records = query_records(&store, &request).await.unwrap();

        let stamps: Vec<_> = records.iter().map(|r| r.timestamp).collect();
        assert_eq!(
            stamps,
            vec![
                datetime!(2024-03-01 23:30:00 UTC),
                datetime!(2024-03-02 08:00:00 UTC),
            ]
        );

        let none = query_records(&store, &req(Some("2030-01-01"), None)).await.unwrap();
        assert!(none.is_empty());
    }
}
