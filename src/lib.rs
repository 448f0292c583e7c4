//! dbview - Database View Engine
//!
//! Turns the rows and fields of a user-defined database into what a view
//! renders: rows narrowed by a filter tree, ordered by sort rules, partitioned
//! into nested groups and summarised per group. Every stage is a pure function
//! over borrowed rows, so calling the pipeline again with the same inputs gives
//! the same output.
//!
//! Property values stay strings at the edges; [`value::parse_as`] turns them
//! into numbers, dates and booleans where an operation needs a typed value.

pub mod board;
pub mod error;
pub mod field;
pub mod filter;
pub mod grouping;
pub mod query;
pub mod row;
pub mod sort;
pub mod summary;
pub mod value;
pub mod view;

pub use board::{build_board, build_calendar, BoardColumn, Calendar, CalendarDay};
pub use error::ViewError;
pub use field::{Field, FieldIndex, FieldSettings, FieldType, SelectOption, TITLE_FIELD_ID};
pub use filter::{
    apply_filters, evaluate_group, evaluate_rule, EvalContext, FilterGroup, FilterOperator,
    FilterRule, LogicalOperator,
};
pub use grouping::{
    create_multi_level_groups, FlattenedGroup, GroupKey, GroupingConfig, GroupingLevel,
    UNCATEGORIZED,
};
pub use query::parse_filter;
pub use row::Row;
pub use sort::{sort_rows, SortDirection, SortRule};
pub use summary::{
    format_summary_value, get_available_metrics, get_field_summary, SummaryKind, SummaryMetric,
    SummaryResult, SummaryValue, EMPTY_SENTINEL,
};
pub use value::{parse_as, ParseError, TypedValue};
pub use view::{compute_view, search_rows, ViewBody, ViewConfig, ViewLayout, ViewModel};

// HTTP server modules - only when server feature is enabled
#[cfg(feature = "server")]
pub mod messages;
#[cfg(feature = "server")]
pub mod server;

#[cfg(test)]
mod integration_tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::HashSet;

    fn ids(rows: &[&Row]) -> Vec<String> {
        rows.iter().map(|r| r.id.clone()).collect()
    }

    fn ctx() -> EvalContext {
        EvalContext::on(NaiveDate::from_ymd_opt(2024, 6, 12).unwrap())
    }

    fn task_fields() -> Vec<Field> {
        vec![
            Field::new("status", "Status", FieldType::Status).with_options(["Todo", "Doing", "Done"]),
            Field::new("age", "Age", FieldType::Number),
            Field::new("due", "Due", FieldType::Date),
            Field::new("owner", "Owner", FieldType::Person),
        ]
    }

    fn task_rows() -> Vec<Row> {
        vec![
            Row::new("1", "Alpha").with("status", "Done").with("age", "25").with("due", "2024-06-01"),
            Row::new("2", "Beta").with("status", "Todo").with("age", "40").with("owner", "u1"),
            Row::new("3", "Gamma").with("age", "abc").with("due", "2024-06-20"),
            Row::new("4", "Delta").with("status", "Doing").with("age", "31").with("owner", "u2"),
            Row::new("5", "Epsilon").with("status", "Todo").with("due", "2024-06-12"),
        ]
    }

    #[test]
    fn test_grouping_scenario() {
        let rows = vec![
            Row::new("1", "").with("status", "Done"),
            Row::new("2", "").with("status", "Todo"),
            Row::new("3", ""),
        ];
        let groups = create_multi_level_groups(
            &rows,
            &task_fields(),
            &GroupingConfig::by(["status"]),
            &HashSet::new(),
        );

        assert_eq!(groups.len(), 3);
        let summary: Vec<(&str, usize)> = groups
            .iter()
            .map(|g| (g.group_value.as_str(), g.items.len()))
            .collect();
        assert_eq!(summary, vec![("Done", 1), ("Todo", 1), ("Uncategorized", 1)]);
    }

    #[test]
    fn test_greater_than_fails_closed() {
        let rows = vec![
            Row::new("a", "").with("age", "25"),
            Row::new("b", "").with("age", "40"),
            Row::new("c", "").with("age", "abc"),
        ];
        let group = FilterGroup::and("root").rule(FilterRule::new(
            "r1",
            "age",
            FilterOperator::IsGreaterThan,
            "30",
        ));
        let passed = apply_filters(&rows, &group, &task_fields(), &ctx());
        assert_eq!(ids(&passed), vec!["b"]);
    }

    #[test]
    fn test_summary_scenario() {
        let rows = vec![
            Row::new("a", "").with("age", "10"),
            Row::new("b", "").with("age", "20"),
            Row::new("c", "").with("age", "x"),
        ];
        let field = Field::new("age", "Age", FieldType::Number);
        let summary = get_field_summary(&rows, &field).unwrap();
        assert_eq!(summary.sum, Some(30.0));
        assert_eq!(summary.average, Some(15.0));
        assert_eq!(summary.count, 3);
        assert_eq!(summary.valid_count, 2);
    }

    #[test]
    fn test_sort_scenario() {
        let rows = vec![
            Row::new("0", "").with("score", "5"),
            Row::new("1", "").with("score", "20"),
            Row::new("2", "").with("score", "5"),
        ];
        let fields = vec![Field::new("score", "Score", FieldType::Number)];
        let sorted = sort_rows(&rows, &[SortRule::descending("score")], &fields);
        assert_eq!(ids(&sorted), vec!["1", "0", "2"]);
    }

    #[test]
    fn test_filter_idempotence() {
        let rows = task_rows();
        let fields = task_fields();
        let group = FilterGroup::or("root")
            .rule(FilterRule::new("r1", "status", FilterOperator::Equals, "Todo"))
            .group(
                FilterGroup::and("g1")
                    .rule(FilterRule::new("r2", "age", FilterOperator::IsGreaterThan, "20"))
                    .rule(FilterRule::new("r3", "due", FilterOperator::IsPastDue, "")),
            );

        let once = apply_filters(&rows, &group, &fields, &ctx());
        let twice = apply_filters(once.clone(), &group, &fields, &ctx());
        assert_eq!(ids(&once), vec!["1", "2", "5"]);
        assert_eq!(ids(&once), ids(&twice));
    }

    #[test]
    fn test_empty_group_passes_everything_through() {
        let rows = task_rows();
        let passed = apply_filters(&rows, &FilterGroup::and("root"), &task_fields(), &ctx());
        assert_eq!(ids(&passed), vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn test_and_narrows_or_widens() {
        let rows = task_rows();
        let fields = task_fields();
        let r1 = FilterRule::new("r1", "age", FilterOperator::IsGreaterThan, "30");
        let r2 = FilterRule::new("r2", "owner", FilterOperator::IsNotEmpty, "");

        let only_r1 = apply_filters(&rows, &FilterGroup::and("a").rule(r1.clone()), &fields, &ctx());
        let only_r2 = apply_filters(&rows, &FilterGroup::and("b").rule(r2.clone()), &fields, &ctx());
        let both = apply_filters(
            &rows,
            &FilterGroup::and("c").rule(r1.clone()).rule(r2.clone()),
            &fields,
            &ctx(),
        );
        let either = apply_filters(&rows, &FilterGroup::or("d").rule(r1).rule(r2), &fields, &ctx());

        for row in &both {
            assert!(only_r1.contains(row) && only_r2.contains(row));
        }
        for row in only_r1.iter().chain(only_r2.iter()) {
            assert!(either.contains(row));
        }
        assert_eq!(ids(&both), vec!["2", "4"]);
    }

    #[test]
    fn test_sorting_sorted_rows_is_identity() {
        let rows = task_rows();
        let fields = task_fields();
        let rules = [SortRule::ascending("status"), SortRule::descending("due")];
        let sorted = sort_rows(&rows, &rules, &fields);
        let again = sort_rows(sorted.clone(), &rules, &fields);
        assert_eq!(ids(&sorted), ids(&again));
    }

    #[test]
    fn test_leaf_groups_partition_rows() {
        let rows = task_rows();
        let config = GroupingConfig::by(["status", "owner"]);
        let collapsed: HashSet<GroupKey> = [GroupKey::new(["Todo"])].into_iter().collect();

        // Collapse hides headers but not membership
        let visible = create_multi_level_groups(&rows, &task_fields(), &config, &collapsed);
        assert!(!visible
            .iter()
            .any(|g| g.level > 0 && g.group_path.segments()[0] == "Todo"));

        let expanded = create_multi_level_groups(&rows, &task_fields(), &config, &HashSet::new());
        let mut leaf_ids: Vec<String> = expanded
            .iter()
            .filter(|g| !g.has_children)
            .flat_map(|g| g.items.iter().map(|r| r.id.clone()))
            .collect();
        leaf_ids.sort();
        assert_eq!(leaf_ids, vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn test_empty_summary_shows_sentinel() {
        let field = Field::new("age", "Age", FieldType::Number);
        let rows: Vec<Row> = Vec::new();
        let summary = get_field_summary(&rows, &field).unwrap();
        assert_eq!(summary.valid_count, 0);
        for metric in get_available_metrics(FieldType::Number) {
            assert_eq!(format_summary_value(&summary, *metric), EMPTY_SENTINEL);
        }
    }

    #[test]
    fn test_stale_references_are_no_ops() {
        let rows = task_rows();
        let fields = task_fields();
        let group = FilterGroup::and("root").rule(FilterRule::new(
            "r1",
            "deleted_field",
            FilterOperator::Equals,
            "x",
        ));
        assert_eq!(apply_filters(&rows, &group, &fields, &ctx()).len(), rows.len());

        let groups = create_multi_level_groups(
            &rows,
            &fields,
            &GroupingConfig::by(["deleted_field"]),
            &HashSet::new(),
        );
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].group_value, UNCATEGORIZED);
        assert_eq!(groups[0].items.len(), rows.len());
    }

    #[test]
    fn test_query_drives_the_view() {
        let rows = task_rows();
        let fields = task_fields();
        let filter = parse_filter("status = 'Todo' OR age > 30", &fields).unwrap();
        let config = ViewConfig {
            filter,
            sorts: vec![SortRule::ascending("title")],
            ..ViewConfig::default()
        };
        let view = compute_view(&rows, &fields, &config, &ctx());
        match view.body {
            ViewBody::Rows { rows } => assert_eq!(ids(&rows), vec!["2", "4", "5"]),
            other => panic!("expected rows, got {:?}", other),
        }
    }
}
