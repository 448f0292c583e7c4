//! Filter rules and filter trees
//!
//! A view's filter is a tree of `FilterGroup`s. Each group combines its own
//! rules and the results of its subgroups with a single AND/OR operator.
//! Evaluation is fail-closed: a value that cannot be read the way the operator
//! needs makes the rule fail, it never raises.
//!
//! # Examples
//!
//! ```
//! use dbview::{apply_filters, EvalContext, Field, FieldType, FilterGroup, FilterOperator, FilterRule, Row};
//!
//! let fields = vec![Field::new("age", "Age", FieldType::Number)];
//! let rows = vec![
//!     Row::new("1", "a").with("age", "25"),
//!     Row::new("2", "b").with("age", "40"),
//!     Row::new("3", "c").with("age", "abc"),
//! ];
//! let filter = FilterGroup::and("root")
//!     .rule(FilterRule::new("r1", "age", FilterOperator::IsGreaterThan, "30"));
//!
//! let passed = apply_filters(&rows, &filter, &fields, &EvalContext::now());
//! assert_eq!(passed.len(), 1);
//! assert_eq!(passed[0].id, "2");
//! ```

use crate::field::{Field, FieldIndex, FieldType};
use crate::row::Row;
use crate::value::{parse_as, parse_date};
use chrono::{Datelike, Days, Local, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Stored operand that stands for the signed-in user.
pub const CURRENT_USER_TOKEN: &str = "me";

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    IsEmpty,
    IsNotEmpty,
    IsGreaterThan,
    IsLessThan,
    IsBetween,
    IsToday,
    IsThisWeek,
    IsThisMonth,
    IsPastDue,
    IsFuture,
    /// Anything a newer client stored that this build does not know.
    #[serde(other)]
    Unknown,
}

use FilterOperator as Op;

const TEXT_OPERATORS: &[FilterOperator] = &[
    Op::Equals,
    Op::NotEquals,
    Op::Contains,
    Op::NotContains,
    Op::StartsWith,
    Op::EndsWith,
    Op::IsEmpty,
    Op::IsNotEmpty,
];

const NUMBER_OPERATORS: &[FilterOperator] = &[
    Op::Equals,
    Op::NotEquals,
    Op::IsGreaterThan,
    Op::IsLessThan,
    Op::IsBetween,
    Op::IsEmpty,
    Op::IsNotEmpty,
];

const OPTION_OPERATORS: &[FilterOperator] = &[Op::Equals, Op::NotEquals, Op::IsEmpty, Op::IsNotEmpty];

const LIST_OPERATORS: &[FilterOperator] = &[
    Op::Equals,
    Op::NotEquals,
    Op::Contains,
    Op::NotContains,
    Op::IsEmpty,
    Op::IsNotEmpty,
];

const DATE_OPERATORS: &[FilterOperator] = &[
    Op::Equals,
    Op::NotEquals,
    Op::IsGreaterThan,
    Op::IsLessThan,
    Op::IsBetween,
    Op::IsToday,
    Op::IsThisWeek,
    Op::IsThisMonth,
    Op::IsPastDue,
    Op::IsFuture,
    Op::IsEmpty,
    Op::IsNotEmpty,
];

const CHECKBOX_OPERATORS: &[FilterOperator] = &[Op::Equals, Op::NotEquals];

const PRESENCE_OPERATORS: &[FilterOperator] = &[Op::IsEmpty, Op::IsNotEmpty];

impl FilterOperator {
    /// Operators offered for a field type, in menu order.
    pub fn operators_for(field_type: FieldType) -> &'static [FilterOperator] {
        match field_type {
            FieldType::Text | FieldType::Url | FieldType::Email | FieldType::Phone => TEXT_OPERATORS,
            FieldType::Number => NUMBER_OPERATORS,
            FieldType::Select | FieldType::Status => OPTION_OPERATORS,
            FieldType::MultiSelect
            | FieldType::Person
            | FieldType::Relation
            | FieldType::Formula
            | FieldType::Rollup => LIST_OPERATORS,
            FieldType::Date | FieldType::CreatedTime | FieldType::LastEditedTime => DATE_OPERATORS,
            FieldType::Checkbox => CHECKBOX_OPERATORS,
            FieldType::Files => PRESENCE_OPERATORS,
        }
    }

    pub fn is_compatible_with(self, field_type: FieldType) -> bool {
        Self::operators_for(field_type).contains(&self)
    }

    /// Whether the rule needs a `value` operand to mean anything.
    pub fn requires_value(self) -> bool {
        !matches!(
            self,
            Op::IsEmpty
                | Op::IsNotEmpty
                | Op::IsToday
                | Op::IsThisWeek
                | Op::IsThisMonth
                | Op::IsPastDue
                | Op::IsFuture
                | Op::Unknown
        )
    }

    /// Operator with the opposite outcome, where one exists.
    pub fn negated(self) -> Option<FilterOperator> {
        match self {
            Op::Equals => Some(Op::NotEquals),
            Op::NotEquals => Some(Op::Equals),
            Op::Contains => Some(Op::NotContains),
            Op::NotContains => Some(Op::Contains),
            Op::IsEmpty => Some(Op::IsNotEmpty),
            Op::IsNotEmpty => Some(Op::IsEmpty),
            _ => None,
        }
    }
}

/// How a group combines its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

/// A single comparison against one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRule {
    pub id: String,
    pub field_id: String,
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: String,
    /// Upper bound for `is_between`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value2: Option<String>,
}

impl FilterRule {
    pub fn new(
        id: impl Into<String>,
        field_id: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<String>,
    ) -> Self {
        FilterRule {
            id: id.into(),
            field_id: field_id.into(),
            operator,
            value: value.into(),
            value2: None,
        }
    }

    pub fn between(
        id: impl Into<String>,
        field_id: impl Into<String>,
        low: impl Into<String>,
        high: impl Into<String>,
    ) -> Self {
        FilterRule {
            value2: Some(high.into()),
            ..FilterRule::new(id, field_id, Op::IsBetween, low)
        }
    }
}

/// A node of the filter tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterGroup {
    pub id: String,
    #[serde(default)]
    pub operator: LogicalOperator,
    #[serde(default)]
    pub rules: Vec<FilterRule>,
    #[serde(default)]
    pub groups: Vec<FilterGroup>,
}

impl FilterGroup {
    pub fn new(id: impl Into<String>, operator: LogicalOperator) -> Self {
        FilterGroup {
            id: id.into(),
            operator,
            rules: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn and(id: impl Into<String>) -> Self {
        Self::new(id, LogicalOperator::And)
    }

    pub fn or(id: impl Into<String>) -> Self {
        Self::new(id, LogicalOperator::Or)
    }

    pub fn rule(mut self, rule: FilterRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn group(mut self, group: FilterGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// A group with no rules and no subgroups passes every row.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.groups.is_empty()
    }

    /// Number of rules in the whole tree.
    pub fn rule_count(&self) -> usize {
        self.rules.len() + self.groups.iter().map(FilterGroup::rule_count).sum::<usize>()
    }

    fn collect_stale<'g>(&'g self, fields: &FieldIndex<'_>, out: &mut Vec<&'g str>) {
        for rule in &self.rules {
            if fields.get(&rule.field_id).is_none() {
                out.push(&rule.field_id);
            }
        }
        for group in &self.groups {
            group.collect_stale(fields, out);
        }
    }
}

/// Per-evaluation context for the operators that depend on who is asking
/// and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalContext {
    pub today: NaiveDate,
    #[serde(default)]
    pub current_user_id: Option<String>,
    #[serde(default = "default_week_start")]
    pub week_start: Weekday,
}

fn default_week_start() -> Weekday {
    Weekday::Sun
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::now()
    }
}

impl EvalContext {
    /// Context pinned to the local wall-clock date.
    pub fn now() -> Self {
        Self::on(Local::now().date_naive())
    }

    pub fn on(today: NaiveDate) -> Self {
        EvalContext {
            today,
            current_user_id: None,
            week_start: default_week_start(),
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.current_user_id = Some(user_id.into());
        self
    }

    pub fn with_week_start(mut self, week_start: Weekday) -> Self {
        self.week_start = week_start;
        self
    }

    /// The operand an equality rule compares against. The current-user token
    /// resolves to `current_user_id`, or to nothing when nobody is signed in.
    fn resolve_operand<'v>(&'v self, value: &'v str) -> Option<&'v str> {
        if value == CURRENT_USER_TOKEN {
            self.current_user_id.as_deref()
        } else {
            Some(value)
        }
    }

    /// First and last day of the week containing `today`, or `None` when the
    /// week runs past the ends of the calendar.
    pub fn week_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let offset = (7 + self.today.weekday().num_days_from_monday()
            - self.week_start.num_days_from_monday())
            % 7;
        let start = self.today.checked_sub_days(Days::new(u64::from(offset)))?;
        let end = start.checked_add_days(Days::new(6))?;
        Some((start, end))
    }
}

/// Evaluate one rule against one row.
pub fn evaluate_rule(row: &Row, rule: &FilterRule, field: &Field, ctx: &EvalContext) -> bool {
    let raw = row.value(&field.id);

    match rule.operator {
        Op::Equals => ctx.resolve_operand(&rule.value).map_or(false, |v| raw == v),
        Op::NotEquals => ctx.resolve_operand(&rule.value).map_or(false, |v| raw != v),
        Op::Contains => contains_ci(raw, &rule.value),
        Op::NotContains => !contains_ci(raw, &rule.value),
        Op::StartsWith => raw.to_lowercase().starts_with(&rule.value.to_lowercase()),
        Op::EndsWith => raw.to_lowercase().ends_with(&rule.value.to_lowercase()),
        Op::IsEmpty => row.is_blank(&field.id),
        Op::IsNotEmpty => !row.is_blank(&field.id),
        Op::IsGreaterThan => {
            compare_operand(field.field_type, raw, &rule.value) == Some(Ordering::Greater)
        }
        Op::IsLessThan => compare_operand(field.field_type, raw, &rule.value) == Some(Ordering::Less),
        Op::IsBetween => is_between(field.field_type, raw, &rule.value, rule.value2.as_deref()),
        Op::IsToday => date_of(raw).map_or(false, |d| d == ctx.today),
        Op::IsThisWeek => match (ctx.week_range(), date_of(raw)) {
            (Some((start, end)), Some(d)) => d >= start && d <= end,
            _ => false,
        },
        Op::IsThisMonth => date_of(raw)
            .map_or(false, |d| d.year() == ctx.today.year() && d.month() == ctx.today.month()),
        Op::IsPastDue => date_of(raw).map_or(false, |d| d < ctx.today),
        Op::IsFuture => date_of(raw).map_or(false, |d| d > ctx.today),
        Op::Unknown => false,
    }
}

/// Evaluate a filter tree against one row.
///
/// Rules and subgroup results are siblings combined with the group's single
/// operator. Rules that reference a field missing from `fields` are skipped;
/// a group left with no members passes.
pub fn evaluate_group(row: &Row, group: &FilterGroup, fields: &[Field], ctx: &EvalContext) -> bool {
    evaluate_indexed(row, group, &FieldIndex::new(fields), ctx)
}

fn evaluate_indexed(row: &Row, group: &FilterGroup, fields: &FieldIndex<'_>, ctx: &EvalContext) -> bool {
    let rule_results = group.rules.iter().filter_map(|rule| {
        fields
            .get(&rule.field_id)
            .map(|field| evaluate_rule(row, rule, field, ctx))
    });
    let group_results = group
        .groups
        .iter()
        .map(|child| evaluate_indexed(row, child, fields, ctx));
    let mut results = rule_results.chain(group_results).peekable();

    if results.peek().is_none() {
        return true;
    }
    match group.operator {
        LogicalOperator::And => results.all(|passed| passed),
        LogicalOperator::Or => results.any(|passed| passed),
    }
}

/// Keep the rows that pass `group`, in input order.
pub fn apply_filters<'a, I>(rows: I, group: &FilterGroup, fields: &[Field], ctx: &EvalContext) -> Vec<&'a Row>
where
    I: IntoIterator<Item = &'a Row>,
{
    if group.is_empty() {
        return rows.into_iter().collect();
    }

    let index = FieldIndex::new(fields);
    let mut stale = Vec::new();
    group.collect_stale(&index, &mut stale);
    if !stale.is_empty() {
        log::debug!("filter '{}' skips rules on unknown fields {:?}", group.id, stale);
    }

    rows.into_iter()
        .filter(|row| evaluate_indexed(row, group, &index, ctx))
        .collect()
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn date_of(raw: &str) -> Option<NaiveDate> {
    parse_date(raw).ok().map(|dt| dt.date())
}

/// Ordering of a stored value against a rule operand, read as numbers or
/// dates depending on the field. `None` when either side does not parse or
/// the field type has no ordering.
fn compare_operand(field_type: FieldType, raw: &str, operand: &str) -> Option<Ordering> {
    if !(field_type.is_number_like() || field_type.is_date_like()) {
        return None;
    }
    let a = parse_as(field_type, raw).ok()?;
    let b = parse_as(field_type, operand).ok()?;
    a.compare(&b)
}

fn is_between(field_type: FieldType, raw: &str, low: &str, high: Option<&str>) -> bool {
    let Some(high) = high else {
        return false;
    };
    let (Some(to_low), Some(to_high)) = (
        compare_operand(field_type, raw, low),
        compare_operand(field_type, raw, high),
    ) else {
        return false;
    };
    // Bounds may be stored in either order.
    let bounds_reversed = compare_operand(field_type, low, high) == Some(Ordering::Greater);
    if bounds_reversed {
        to_low != Ordering::Greater && to_high != Ordering::Less
    } else {
        to_low != Ordering::Less && to_high != Ordering::Greater
    }
}
