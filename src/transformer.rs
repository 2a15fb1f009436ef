use std::sync::Arc;

use chrono::{DateTime, NaiveDate};
use log::{error, info};
use serde_json::Value;

use crate::clock::TimeProvider;
use crate::error::{PipelineError, Result};
use crate::exchange_rate::ExchangeRateRow;
use crate::snapshot::RateSnapshot;

/// Turns a [`RateSnapshot`] into rows stamped with the run's timestamps.
pub struct Transformer {
    clock: Arc<dyn TimeProvider>,
    original_timezone: String,
    target_timezone: String,
}

impl Transformer {
    pub fn new(
        clock: Arc<dyn TimeProvider>,
        original_timezone: impl Into<String>,
        target_timezone: impl Into<String>,
    ) -> Transformer {
        Transformer {
            clock,
            original_timezone: original_timezone.into(),
            target_timezone: target_timezone.into(),
        }
    }

    /// Returns `Ok(None)` when the snapshot is missing or malformed; that
    /// case is logged here and is not an error for the caller. The clock is
    /// only consulted once the snapshot is known to be usable.
    pub fn transform(
        &self,
        snapshot: Option<&RateSnapshot>,
    ) -> Result<Option<Vec<ExchangeRateRow>>> {
        let parsed = snapshot
            .ok_or_else(|| PipelineError::DataShape("no snapshot to process".to_string()))
            .and_then(|snapshot| {
                let rates = get_rates(snapshot)?;
                let reference_date = snapshot
                    .reference_date
                    .as_deref()
                    .map(parse_reference_date)
                    .transpose()?;
                Ok((reference_date, rates))
            });

        let (reference_date, rates) = match parsed {
            Ok(parsed) => parsed,
            Err(PipelineError::DataShape(reason)) => {
                error!("Invalid or empty data received for processing: {}", reason);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let created_at = self.clock.now(&self.original_timezone)?;
        let created_at_converted = self.clock.convert(&created_at, &self.target_timezone)?;
        let reference_date = reference_date.unwrap_or_else(|| created_at.date_naive());

        let rows: Vec<ExchangeRateRow> = rates
            .into_iter()
            .map(|(currency, rate)| ExchangeRateRow {
                currency,
                rate,
                reference_date,
                created_at,
                created_at_converted,
            })
            .collect();

        info!("Processed {} exchange rates for {}.", rows.len(), reference_date);

        Ok(Some(rows))
    }
}

fn get_rates(snapshot: &RateSnapshot) -> Result<Vec<(String, f64)>> {
    let rates = snapshot
        .rates
        .as_ref()
        .ok_or_else(|| PipelineError::DataShape("snapshot has no 'rates' field".to_string()))?
        .as_object()
        .ok_or_else(|| PipelineError::DataShape("'rates' is not an object".to_string()))?;

    rates
        .iter()
        .map(|(code, value)| Ok((code.to_string(), parse_rate(code, value)?)))
        .collect()
}

fn parse_rate(code: &str, value: &Value) -> Result<f64> {
    let rate = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => normalize_decimal_string(text.trim()).parse::<f64>().ok(),
        _ => None,
    };

    rate.ok_or_else(|| {
        PipelineError::DataShape(format!("rate for {} is not numeric: {}", code, value))
    })
}

fn normalize_decimal_string(s: &str) -> String {
    s.replace(',', ".")
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp, keeping only the date.
fn parse_reference_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|ts| ts.date_naive()))
        .map_err(|_| PipelineError::DataShape(format!("unrecognised reference date: {}", raw)))
}
