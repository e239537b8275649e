use anyhow::Result;
use sqlx::{postgres::PgPool, query_builder::Separated, PgConnection, Postgres, QueryBuilder};
use time::OffsetDateTime;

use super::rows::{
    ChildRows, ElementColumns, MeasurementRecordRow, PhaseCurrentRow, PhaseVoltageRow,
    SequenceComponentRow, ELEMENT_COLUMNS,
};
use crate::domain::{DistinctField, MeasurementRecord, NewMeasurementRecord, RecordFilter};

fn select_records() -> QueryBuilder<'static, Postgres> {
    QueryBuilder::new(format!(
        "SELECT id, ts, substation_name, bay_name, voltage_level, relay_type, {ELEMENT_COLUMNS} \
         FROM measurement_record"
    ))
}

fn push_element_binds(sep: &mut Separated<'_, '_, Postgres, &'static str>, c: ElementColumns) {
    sep.push_bind(c.element_type)
        .push_bind(c.winding_type)
        .push_bind(c.oil_temp)
        .push_bind(c.tap_position)
        .push_bind(c.hv_ia)
        .push_bind(c.hv_ib)
        .push_bind(c.hv_ic)
        .push_bind(c.mv_ia)
        .push_bind(c.mv_ib)
        .push_bind(c.mv_ic)
        .push_bind(c.lv_ia)
        .push_bind(c.lv_ib)
        .push_bind(c.lv_ic)
        .push_bind(c.hv_ct_ratio)
        .push_bind(c.mv_ct_ratio)
        .push_bind(c.lv_ct_ratio)
        .push_bind(c.hv_active_power)
        .push_bind(c.hv_reactive_power)
        .push_bind(c.mv_active_power)
        .push_bind(c.mv_reactive_power)
        .push_bind(c.lv_active_power)
        .push_bind(c.lv_reactive_power)
        .push_bind(c.hv_winding_temp)
        .push_bind(c.mv_winding_temp)
        .push_bind(c.lv_winding_temp)
        .push_bind(c.active_power)
        .push_bind(c.reactive_power)
        .push_bind(c.ct_ratio);
}

/// Insert a record and all of its child measurements in one transaction.
///
/// Nothing is written unless every insert succeeds.
pub async fn insert_record(
    pool: &PgPool,
    record: &NewMeasurementRecord,
    ts: OffsetDateTime,
) -> Result<i64> {
    let mut tx = pool.begin().await?;

    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "INSERT INTO measurement_record \
         (ts, substation_name, bay_name, voltage_level, relay_type, {ELEMENT_COLUMNS}) VALUES ("
    ));
    {
        let mut sep = builder.separated(", ");
        sep.push_bind(ts)
            .push_bind(record.substation_name.clone())
            .push_bind(record.bay_name.clone())
            .push_bind(record.voltage_level.clone())
            .push_bind(record.relay_type.clone());
        push_element_binds(&mut sep, ElementColumns::from(&record.element));
    }
    builder.push(") RETURNING id");

    let id: i64 = builder.build_query_scalar().fetch_one(&mut *tx).await?;

    if !record.phase_currents.is_empty() {
        let mut b = QueryBuilder::<Postgres>::new(
            "INSERT INTO phase_current (record_id, phase, value, angle) ",
        );
        b.push_values(&record.phase_currents, |mut row, c| {
            row.push_bind(id)
                .push_bind(c.phase.as_str())
                .push_bind(c.value)
                .push_bind(c.angle);
        });
        b.build().execute(&mut *tx).await?;
    }

    if !record.phase_voltages.is_empty() {
        let mut b = QueryBuilder::<Postgres>::new(
            "INSERT INTO phase_voltage (record_id, phase, value, angle) ",
        );
        b.push_values(&record.phase_voltages, |mut row, v| {
            row.push_bind(id)
                .push_bind(v.phase.as_str())
                .push_bind(v.value)
                .push_bind(v.angle);
        });
        b.build().execute(&mut *tx).await?;
    }

    if !record.sequence_components.is_empty() {
        let mut b = QueryBuilder::<Postgres>::new(
            "INSERT INTO sequence_component (record_id, component, value) ",
        );
        b.push_values(&record.sequence_components, |mut row, s| {
            row.push_bind(id)
                .push_bind(s.component.as_str())
                .push_bind(s.value);
        });
        b.build().execute(&mut *tx).await?;
    }

    tx.commit().await?;
    Ok(id)
}

/// Load the child measurements of `rows` and assemble full records,
/// preserving the order of `rows`.
async fn attach_children(
    conn: &mut PgConnection,
    rows: Vec<MeasurementRecordRow>,
) -> Result<Vec<MeasurementRecord>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();

    let currents = sqlx::query_as::<_, PhaseCurrentRow>(
        "SELECT record_id, phase, value, angle FROM phase_current \
         WHERE record_id = ANY($1) ORDER BY id",
    )
    .bind(&ids[..])
    .fetch_all(&mut *conn)
    .await?;

    let voltages = sqlx::query_as::<_, PhaseVoltageRow>(
        "SELECT record_id, phase, value, angle FROM phase_voltage \
         WHERE record_id = ANY($1) ORDER BY id",
    )
    .bind(&ids[..])
    .fetch_all(&mut *conn)
    .await?;

    let sequences = sqlx::query_as::<_, SequenceComponentRow>(
        "SELECT record_id, component, value FROM sequence_component \
         WHERE record_id = ANY($1) ORDER BY id",
    )
    .bind(&ids[..])
    .fetch_all(&mut *conn)
    .await?;

    let mut children = ChildRows::from_rows(currents, voltages, sequences)?;
    let records = rows
        .into_iter()
        .map(|row| children.attach(row))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Run `builder` and its child lookups against one repeatable-read snapshot.
async fn fetch_snapshot(
    pool: &PgPool,
    mut builder: QueryBuilder<'_, Postgres>,
) -> Result<Vec<MeasurementRecord>> {
    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
        .execute(&mut *tx)
        .await?;

    let rows: Vec<MeasurementRecordRow> = builder.build_query_as().fetch_all(&mut *tx).await?;
    let records = attach_children(&mut tx, rows).await?;

    tx.commit().await?;
    Ok(records)
}

/// Records matching `filter`, ascending by timestamp.
pub async fn filtered_records(
    pool: &PgPool,
    filter: &RecordFilter,
) -> Result<Vec<MeasurementRecord>> {
    let mut builder = select_records();
    builder.push(" WHERE TRUE");

    if let Some(start) = filter.start {
        builder.push(" AND ts >= ").push_bind(start);
    }
    if let Some(end) = filter.end {
        builder.push(" AND ts < ").push_bind(end);
    }
    if let Some(substation) = &filter.substation {
        builder.push(" AND substation_name = ").push_bind(substation.clone());
    }
    if let Some(bay) = &filter.bay {
        builder.push(" AND bay_name = ").push_bind(bay.clone());
    }
    builder.push(" ORDER BY ts, id");

    fetch_snapshot(pool, builder).await
}

/// Records with the given ids, ascending by id. Unknown ids are skipped.
pub async fn records_by_ids(pool: &PgPool, ids: &[i64]) -> Result<Vec<MeasurementRecord>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder = select_records();
    builder
        .push(" WHERE id = ANY(")
        .push_bind(ids.to_vec())
        .push(") ORDER BY id");

    fetch_snapshot(pool, builder).await
}

/// Most recent records first.
pub async fn recent_records(pool: &PgPool, limit: i64) -> Result<Vec<MeasurementRecord>> {
    let mut builder = select_records();
    builder
        .push(" ORDER BY ts DESC, id DESC LIMIT ")
        .push_bind(limit);

    fetch_snapshot(pool, builder).await
}

/// Distinct values of a record column, sorted.
pub async fn distinct_values(pool: &PgPool, field: DistinctField) -> Result<Vec<String>> {
    let column = field.column();
    let sql = format!("SELECT DISTINCT {column} FROM measurement_record ORDER BY {column}");

    let values = sqlx::query_scalar::<_, String>(&sql).fetch_all(pool).await?;
    Ok(values)
}

/// Delete a record and its children. Returns `false` if no such record exists.
pub async fn delete_record(pool: &PgPool, id: i64) -> Result<bool> {
    let mut tx = pool.begin().await?;

    for table in ["phase_current", "phase_voltage", "sequence_component"] {
        sqlx::query(&format!("DELETE FROM {table} WHERE record_id = $1"))
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    let deleted = sqlx::query("DELETE FROM measurement_record WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;
    Ok(deleted > 0)
}
