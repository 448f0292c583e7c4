//! Board and calendar layouts
//!
//! A board lays rows out in columns by a select or status field; a calendar
//! buckets them by day of a date field. Both take rows that are already
//! filtered and sorted and keep that order inside each column or day.

use crate::field::{Field, FieldIndex};
use crate::grouping::UNCATEGORIZED;
use crate::row::Row;
use crate::value::parse_date;
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardColumn<'a> {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub items: Vec<&'a Row>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarDay<'a> {
    pub date: NaiveDate,
    pub items: Vec<&'a Row>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Calendar<'a> {
    /// Days that have at least one row, earliest first
    pub days: Vec<CalendarDay<'a>>,
    /// Rows whose date is missing or unreadable
    pub unscheduled: Vec<&'a Row>,
}

/// Columns for `field_id`.
///
/// Every configured option gets a column, in option order, even when empty.
/// Values that are not among the options follow in first-appearance order,
/// and rows without a value end up in a trailing `Uncategorized` column that
/// only exists when it has rows. An unknown field yields a single
/// `Uncategorized` column holding everything.
pub fn build_board<'a, I>(rows: I, fields: &[Field], field_id: &str) -> Vec<BoardColumn<'a>>
where
    I: IntoIterator<Item = &'a Row>,
{
    let index = FieldIndex::new(fields);
    let field = index.get(field_id);
    if field.is_none() {
        log::debug!("board uses unknown field '{}'", field_id);
    }

    let mut columns: IndexMap<String, BoardColumn<'a>> = IndexMap::new();
    if let Some(field) = field {
        for option in &field.settings.options {
            columns.entry(option.name.clone()).or_insert_with(|| BoardColumn {
                value: option.name.clone(),
                color: option.color.clone(),
                items: Vec::new(),
            });
        }
    }

    let mut uncategorized = Vec::new();
    for row in rows {
        if field.is_none() || row.is_blank(field_id) {
            uncategorized.push(row);
            continue;
        }
        let value = row.value(field_id).trim();
        columns
            .entry(value.to_string())
            .or_insert_with(|| BoardColumn {
                value: value.to_string(),
                color: None,
                items: Vec::new(),
            })
            .items
            .push(row);
    }

    let mut board: Vec<BoardColumn<'a>> = columns.into_values().collect();
    if !uncategorized.is_empty() {
        board.push(BoardColumn {
            value: UNCATEGORIZED.to_string(),
            color: None,
            items: uncategorized,
        });
    }
    board
}

/// Bucket rows by the calendar day of `field_id`.
pub fn build_calendar<'a, I>(rows: I, field_id: &str) -> Calendar<'a>
where
    I: IntoIterator<Item = &'a Row>,
{
    let mut days: BTreeMap<NaiveDate, Vec<&'a Row>> = BTreeMap::new();
    let mut unscheduled = Vec::new();

    for row in rows {
        match parse_date(row.value(field_id)) {
            Ok(dt) => days.entry(dt.date()).or_default().push(row),
            Err(_) => unscheduled.push(row),
        }
    }

    Calendar {
        days: days
            .into_iter()
            .map(|(date, items)| CalendarDay { date, items })
            .collect(),
        unscheduled,
    }
}
