//! Multi-key row ordering
//!
//! Sorting never reorders rows that compare equal: `sort_rows` is a stable sort,
//! so rows that tie on every rule keep the order they came in.

use crate::field::{Field, FieldIndex, FieldType};
use crate::row::Row;
use crate::value::{parse_as, parse_date};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Sort order specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first
    #[default]
    Asc,
    /// Largest first
    Desc,
}

/// A single sort key specifying a field and direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortRule {
    pub field_id: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortRule {
    pub fn ascending(field_id: impl Into<String>) -> Self {
        SortRule {
            field_id: field_id.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn descending(field_id: impl Into<String>) -> Self {
        SortRule {
            field_id: field_id.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Order rows by `rules`, first rule primary.
///
/// Number and date fields compare by their parsed value; a value that does not
/// parse counts as the lowest possible value, so it leads an ascending sort and
/// trails a descending one. Every other type compares its raw string
/// case-sensitively. Rules on unknown fields are skipped.
///
/// With no rules the rows come back newest first by `created_at`.
pub fn sort_rows<'a, I>(rows: I, rules: &[SortRule], fields: &[Field]) -> Vec<&'a Row>
where
    I: IntoIterator<Item = &'a Row>,
{
    let mut sorted: Vec<&'a Row> = rows.into_iter().collect();

    if rules.is_empty() {
        sorted.sort_by(|a, b| compare_created(a, b).reverse());
        return sorted;
    }

    let index = FieldIndex::new(fields);
    let keys: Vec<(&SortRule, FieldType)> = rules
        .iter()
        .filter_map(|rule| match index.get(&rule.field_id) {
            Some(field) => Some((rule, field.field_type)),
            None => {
                log::debug!("sort skips unknown field '{}'", rule.field_id);
                None
            }
        })
        .collect();

    sorted.sort_by(|a, b| {
        for (rule, field_type) in &keys {
            let cmp = compare_by_rule(a, b, rule, *field_type);
            if cmp != Ordering::Equal {
                return cmp;
            }
        }
        Ordering::Equal
    });
    sorted
}

/// Compare two rows according to one rule
pub fn compare_by_rule(a: &Row, b: &Row, rule: &SortRule, field_type: FieldType) -> Ordering {
    let raw_a = a.value(&rule.field_id);
    let raw_b = b.value(&rule.field_id);

    let base_cmp = if field_type.is_number_like() || field_type.is_date_like() {
        let ta = parse_as(field_type, raw_a).ok();
        let tb = parse_as(field_type, raw_b).ok();
        compare_lowest_none(ta, tb, |x, y| x.compare(y).unwrap_or(Ordering::Equal))
    } else {
        raw_a.cmp(raw_b)
    };

    match rule.direction {
        SortDirection::Asc => base_cmp,
        SortDirection::Desc => base_cmp.reverse(),
    }
}

fn compare_created(a: &Row, b: &Row) -> Ordering {
    let da = a.created_at.as_deref().and_then(|s| parse_date(s).ok());
    let db = b.created_at.as_deref().and_then(|s| parse_date(s).ok());
    compare_lowest_none(da, db, |x, y| x.cmp(y))
}

fn compare_lowest_none<T, F>(a: Option<T>, b: Option<T>, cmp: F) -> Ordering
where
    F: Fn(&T, &T) -> Ordering,
{
    match (a, b) {
        (Some(x), Some(y)) => cmp(&x, &y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
