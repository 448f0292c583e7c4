//! Group footer summaries
//!
//! Number fields summarise to sum, average, min and max; date fields to their
//! earliest and latest values. Values that do not parse are left out of the
//! calculation but still counted in `count`.

use crate::field::{Field, FieldType};
use crate::row::Row;
use crate::value::{parse_date, parse_number};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Shown for any metric of a summary with no usable values.
pub const EMPTY_SENTINEL: &str = "-";

const DATE_DISPLAY_FORMAT: &str = "%b %-d, %Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryKind {
    Number,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SummaryValue {
    Number(f64),
    Date(NaiveDateTime),
}

impl SummaryValue {
    fn display(&self) -> String {
        match self {
            SummaryValue::Number(n) => n.to_string(),
            SummaryValue::Date(d) => d.format(DATE_DISPLAY_FORMAT).to_string(),
        }
    }
}

/// Aggregates over one field of one group.
///
/// `count` covers every item; `valid_count` only the items whose value parsed.
/// With `valid_count == 0` every metric is `None`; so are `sum` and `average`
/// when the total overflows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryResult {
    #[serde(rename = "type")]
    pub kind: SummaryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<SummaryValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<SummaryValue>,
    pub count: usize,
    pub valid_count: usize,
}

/// A footer metric a user can pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryMetric {
    Sum,
    Average,
    Min,
    Max,
    Count,
    /// Date alias of `Min`
    Earliest,
    /// Date alias of `Max`
    Latest,
}

const NUMBER_METRICS: &[SummaryMetric] = &[
    SummaryMetric::Sum,
    SummaryMetric::Average,
    SummaryMetric::Min,
    SummaryMetric::Max,
    SummaryMetric::Count,
];

const DATE_METRICS: &[SummaryMetric] = &[
    SummaryMetric::Earliest,
    SummaryMetric::Latest,
    SummaryMetric::Count,
];

/// Metrics offered for a field type; empty for types without summaries.
pub fn get_available_metrics(field_type: FieldType) -> &'static [SummaryMetric] {
    match field_type {
        FieldType::Number => NUMBER_METRICS,
        FieldType::Date => DATE_METRICS,
        _ => &[],
    }
}

/// Summarise `field` over `items`. `None` for fields that are neither number
/// nor date.
pub fn get_field_summary<'a, I>(items: I, field: &Field) -> Option<SummaryResult>
where
    I: IntoIterator<Item = &'a Row>,
{
    match field.field_type {
        FieldType::Number => Some(number_summary(items, &field.id)),
        FieldType::Date => Some(date_summary(items, &field.id)),
        _ => None,
    }
}

fn number_summary<'a, I>(items: I, field_id: &str) -> SummaryResult
where
    I: IntoIterator<Item = &'a Row>,
{
    let mut count = 0;
    let mut values = Vec::new();
    for row in items {
        count += 1;
        if let Ok(n) = parse_number(row.value(field_id)) {
            values.push(n);
        }
    }

    let mut result = SummaryResult {
        kind: SummaryKind::Number,
        sum: None,
        average: None,
        min: None,
        max: None,
        count,
        valid_count: values.len(),
    };
    if values.is_empty() {
        return result;
    }

    let sum: f64 = values.iter().sum();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    // Finite values can still overflow when added up
    if sum.is_finite() {
        result.sum = Some(sum);
        result.average = Some(sum / values.len() as f64);
    }
    result.min = Some(SummaryValue::Number(min));
    result.max = Some(SummaryValue::Number(max));
    result
}

fn date_summary<'a, I>(items: I, field_id: &str) -> SummaryResult
where
    I: IntoIterator<Item = &'a Row>,
{
    let mut count = 0;
    let mut valid_count = 0;
    let mut earliest: Option<NaiveDateTime> = None;
    let mut latest: Option<NaiveDateTime> = None;
    for row in items {
        count += 1;
        if let Ok(d) = parse_date(row.value(field_id)) {
            valid_count += 1;
            earliest = Some(earliest.map_or(d, |e| e.min(d)));
            latest = Some(latest.map_or(d, |l| l.max(d)));
        }
    }

    SummaryResult {
        kind: SummaryKind::Date,
        sum: None,
        average: None,
        min: earliest.map(SummaryValue::Date),
        max: latest.map(SummaryValue::Date),
        count,
        valid_count,
    }
}

/// Summaries for every summarisable field, keyed by field id.
pub fn summarize_fields(items: &[&Row], fields: &[Field]) -> BTreeMap<String, SummaryResult> {
    fields
        .iter()
        .filter_map(|field| {
            get_field_summary(items.iter().copied(), field).map(|summary| (field.id.clone(), summary))
        })
        .collect()
}

/// Display string for one metric of a summary.
///
/// The `count` metric reports how many values contributed (`valid_count`),
/// not how many rows the group holds.
pub fn format_summary_value(summary: &SummaryResult, metric: SummaryMetric) -> String {
    if summary.valid_count == 0 {
        return EMPTY_SENTINEL.to_string();
    }

    let formatted = match metric {
        SummaryMetric::Sum => summary.sum.map(format_number),
        SummaryMetric::Average => summary.average.map(|avg| format!("{:.2}", avg)),
        SummaryMetric::Min | SummaryMetric::Earliest => summary.min.as_ref().map(SummaryValue::display),
        SummaryMetric::Max | SummaryMetric::Latest => summary.max.as_ref().map(SummaryValue::display),
        SummaryMetric::Count => Some(summary.valid_count.to_string()),
    };
    formatted.unwrap_or_else(|| EMPTY_SENTINEL.to_string())
}

/// en-US style number: thousands separators, at most three decimals,
/// trailing zeros dropped.
pub fn format_number(value: f64) -> String {
    let rounded = format!("{:.3}", value.abs());
    let (int_part, frac_part) = rounded.split_once('.').unwrap_or((rounded.as_str(), ""));
    let frac = frac_part.trim_end_matches('0');

    let mut out = String::with_capacity(rounded.len() + int_part.len() / 3 + 1);
    let is_zero = int_part.chars().all(|c| c == '0') && frac.is_empty();
    if value < 0.0 && !is_zero {
        out.push('-');
    }
    let digits = int_part.len();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (digits - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if !frac.is_empty() {
        out.push('.');
        out.push_str(frac);
    }
    out
}
