//! View pipeline
//!
//! A view is a saved way of looking at a database: a layout plus the search,
//! filter, sort and grouping settings the user picked. [`compute_view`] runs
//! those settings over the rows in a fixed order (search, filter, sort, then
//! layout) and returns a [`ViewModel`] that borrows from the input rows.
//!
//! # Examples
//!
//! ```
//! use dbview::{compute_view, EvalContext, Field, FieldType, Row, ViewConfig};
//!
//! let fields = vec![Field::new("score", "Score", FieldType::Number)];
//! let rows = vec![
//!     Row::new("1", "Write docs").with("score", "10"),
//!     Row::new("2", "Fix bug").with("score", "30"),
//! ];
//! let config = ViewConfig::from_json(r#"{"sorts":[{"field_id":"score","direction":"desc"}]}"#).unwrap();
//!
//! let view = compute_view(&rows, &fields, &config, &EvalContext::now());
//! assert_eq!(view.visible_rows, 2);
//! assert_eq!(view.summaries["score"].sum, Some(40.0));
//! ```

use crate::board::{build_board, build_calendar, BoardColumn, Calendar};
use crate::error::ViewError;
use crate::field::{Field, FieldType};
use crate::filter::{apply_filters, EvalContext, FilterGroup};
use crate::grouping::{create_multi_level_groups, FlattenedGroup, GroupKey, GroupingConfig};
use crate::row::Row;
use crate::sort::{sort_rows, SortRule};
use crate::summary::{summarize_fields, SummaryResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewLayout {
    #[default]
    Table,
    List,
    Kanban,
    Calendar,
}

/// Everything a saved view remembers about how to show its rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    #[serde(default)]
    pub layout: ViewLayout,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub filter: FilterGroup,
    #[serde(default)]
    pub sorts: Vec<SortRule>,
    #[serde(default)]
    pub grouping: GroupingConfig,
    #[serde(default)]
    pub collapsed_groups: HashSet<GroupKey>,
    /// Column field of a kanban view
    #[serde(default)]
    pub board_field_id: Option<String>,
    /// Date field of a calendar view
    #[serde(default)]
    pub calendar_field_id: Option<String>,
}

impl ViewConfig {
    pub fn from_json(json: &str) -> Result<Self, ViewError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_layout(mut self, layout: ViewLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Field the board is laid out by: the configured one, else the primary
    /// grouping field, else the first select or status field.
    fn board_field<'f>(&'f self, fields: &'f [Field]) -> Option<&'f str> {
        self.board_field_id
            .as_deref()
            .or_else(|| self.grouping.effective_levels().first().map(|l| l.field_id.as_str()))
            .or_else(|| {
                fields
                    .iter()
                    .find(|f| f.field_type.is_option_like())
                    .map(|f| f.id.as_str())
            })
    }

    /// Field the calendar is laid out by: the configured one, else the first
    /// date field.
    fn calendar_field<'f>(&'f self, fields: &'f [Field]) -> Option<&'f str> {
        self.calendar_field_id.as_deref().or_else(|| {
            fields
                .iter()
                .find(|f| f.field_type == FieldType::Date)
                .map(|f| f.id.as_str())
        })
    }
}

/// One group header with the footer summaries of its rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSection<'a> {
    #[serde(flatten)]
    pub group: FlattenedGroup<'a>,
    pub summaries: BTreeMap<String, SummaryResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewBody<'a> {
    Rows { rows: Vec<&'a Row> },
    Groups { groups: Vec<GroupSection<'a>> },
    Board { field_id: String, columns: Vec<BoardColumn<'a>> },
    Calendar { field_id: String, calendar: Calendar<'a> },
}

/// Render-ready result of one view computation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewModel<'a> {
    pub total_rows: usize,
    /// Rows left after search and filters
    pub visible_rows: usize,
    /// Whole-view summaries keyed by field id
    pub summaries: BTreeMap<String, SummaryResult>,
    pub body: ViewBody<'a>,
}

/// Rows whose title or any text property contains `term`, ignoring case.
///
/// A blank term matches everything.
pub fn search_rows<'a, I>(rows: I, term: &str, fields: &[Field]) -> Vec<&'a Row>
where
    I: IntoIterator<Item = &'a Row>,
{
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return rows.into_iter().collect();
    }

    let searchable: Vec<&str> = fields
        .iter()
        .filter(|f| f.field_type.is_text_like() && !f.is_title())
        .map(|f| f.id.as_str())
        .collect();

    rows.into_iter()
        .filter(|row| {
            row.title.to_lowercase().contains(&needle)
                || searchable
                    .iter()
                    .any(|id| row.value(id).to_lowercase().contains(&needle))
        })
        .collect()
}

/// Run the whole view pipeline over `rows`.
///
/// Layouts that need a field fall back to a flat list when none is available.
pub fn compute_view<'a>(
    rows: &'a [Row],
    fields: &[Field],
    config: &ViewConfig,
    ctx: &EvalContext,
) -> ViewModel<'a> {
    let searched = search_rows(rows, config.search.as_deref().unwrap_or(""), fields);
    let filtered = apply_filters(searched, &config.filter, fields, ctx);
    let sorted = sort_rows(filtered, &config.sorts, fields);
    let summaries = summarize_fields(&sorted, fields);
    let visible_rows = sorted.len();

    let body = match config.layout {
        ViewLayout::Table | ViewLayout::List if config.grouping.is_active() => {
            grouped_body(sorted, fields, config)
        }
        ViewLayout::Table | ViewLayout::List => ViewBody::Rows { rows: sorted },
        ViewLayout::Kanban => match config.board_field(fields) {
            Some(field_id) => ViewBody::Board {
                field_id: field_id.to_string(),
                columns: build_board(sorted, fields, field_id),
            },
            None => {
                log::debug!("kanban view has no select field, showing rows");
                ViewBody::Rows { rows: sorted }
            }
        },
        ViewLayout::Calendar => match config.calendar_field(fields) {
            Some(field_id) => ViewBody::Calendar {
                field_id: field_id.to_string(),
                calendar: build_calendar(sorted, field_id),
            },
            None => {
                log::debug!("calendar view has no date field, showing rows");
                ViewBody::Rows { rows: sorted }
            }
        },
    };

    log::debug!("computed {:?} view: {} of {} rows", config.layout, visible_rows, rows.len());

    ViewModel {
        total_rows: rows.len(),
        visible_rows,
        summaries,
        body,
    }
}

fn grouped_body<'a>(sorted: Vec<&'a Row>, fields: &[Field], config: &ViewConfig) -> ViewBody<'a> {
    let groups = create_multi_level_groups(sorted, fields, &config.grouping, &config.collapsed_groups)
        .into_iter()
        .map(|group| {
            let summaries = summarize_fields(&group.items, fields);
            GroupSection { group, summaries }
        })
        .collect();
    ViewBody::Groups { groups }
}
