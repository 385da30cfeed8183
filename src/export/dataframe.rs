//! Build typed `polars` data frames from dataset rows.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use futures_util::TryStreamExt;
use polars::prelude::*;
use serde_json::Value;
use tracing::info;

use crate::models::{primary_keys, value_to_text, DatasetName, FieldDoc, FieldType, Query, Row};
use crate::{DeveloperApiClient, Result};

/// A data frame plus the names of its index (primary-key) columns.
///
/// Index columns come first in the frame, in documented order.
#[derive(Debug, Clone)]
pub struct IndexedFrame {
    /// The typed frame
    pub frame: DataFrame,
    /// Primary-key column names
    pub index: Vec<String>,
}

/// Query `dataset` and build an [`IndexedFrame`] typed from its docs.
pub async fn to_dataframe(
    client: &DeveloperApiClient,
    dataset: impl Into<DatasetName>,
    query: Query,
) -> Result<IndexedFrame> {
    let dataset = dataset.into();
    let docs = client.docs(&dataset).await?;
    let rows: Vec<Row> = client.query(&dataset, query).try_collect().await?;

    let indexed = build_frame(&docs, &rows)?;
    info!(
        %dataset,
        rows = indexed.frame.height(),
        columns = indexed.frame.width(),
        "built data frame"
    );
    Ok(indexed)
}

/// Build a frame from already-fetched rows.
///
/// Documented fields are coerced by [`FieldType`]; values that do not parse
/// become null. Fields present in rows but missing from `docs` are kept as
/// strings, after the documented ones.
pub fn build_frame(docs: &[FieldDoc], rows: &[Row]) -> Result<IndexedFrame> {
    let mut fields: Vec<(String, FieldType)> = docs
        .iter()
        .map(|d| (d.name.clone(), d.field_type()))
        .collect();
    let mut known: HashSet<String> = fields.iter().map(|(n, _)| n.clone()).collect();
    for row in rows {
        for key in row.keys() {
            if known.insert(key.clone()) {
                fields.push((key.clone(), FieldType::String));
            }
        }
    }

    let index = primary_keys(docs);
    let (mut ordered, rest): (Vec<_>, Vec<_>) =
        fields.into_iter().partition(|(name, _)| index.contains(name));
    ordered.sort_by_key(|(name, _)| index.iter().position(|k| k == name));
    ordered.extend(rest);

    let columns = ordered
        .iter()
        .map(|(name, field_type)| build_column(name, *field_type, rows))
        .collect::<Result<Vec<Column>>>()?;

    Ok(IndexedFrame {
        frame: DataFrame::new(columns)?,
        index,
    })
}

fn build_column(name: &str, field_type: FieldType, rows: &[Row]) -> Result<Column> {
    let values = rows.iter().map(|row| row.get(name));

    let series = match field_type {
        FieldType::String => Series::new(
            name.into(),
            values
                .map(|v| v.and_then(value_to_text))
                .collect::<Vec<Option<String>>>(),
        ),
        FieldType::Integer => Series::new(
            name.into(),
            values.map(|v| v.and_then(as_i64)).collect::<Vec<Option<i64>>>(),
        ),
        FieldType::Float => Series::new(
            name.into(),
            values.map(|v| v.and_then(as_f64)).collect::<Vec<Option<f64>>>(),
        ),
        FieldType::Datetime => Series::new(
            name.into(),
            values
                .map(|v| v.and_then(as_timestamp_nanos))
                .collect::<Vec<Option<i64>>>(),
        )
        .cast(&DataType::Datetime(TimeUnit::Nanoseconds, None))?,
    };

    Ok(series.into_column())
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            })
        }
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_timestamp_nanos(value: &Value) -> Option<i64> {
    let s = value.as_str()?.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.timestamp_nanos_opt();
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return naive.and_utc().timestamp_nanos_opt();
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .and_then(|dt| dt.and_utc().timestamp_nanos_opt())
}
