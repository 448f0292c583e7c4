/// Grouping Example
///
/// This example demonstrates:
/// - Grouping rows by two levels
/// - Collapsing a group while keeping its footer totals
/// - Formatting footer summaries

use dbview::{
    create_multi_level_groups, format_summary_value, get_available_metrics, get_field_summary,
    sort_rows, Field, FieldType, GroupKey, GroupingConfig, Row, SortRule,
};
use std::collections::HashSet;

fn main() {
    println!("=== dbview Grouping Example ===\n");

    let fields = vec![
        Field::new("region", "Region", FieldType::Select),
        Field::new("stage", "Stage", FieldType::Status),
        Field::new("amount", "Amount", FieldType::Number),
        Field::new("close", "Close Date", FieldType::Date),
    ];

    let deals = vec![
        ("Acme renewal", "EMEA", "Won", "12000", "2024-03-02"),
        ("Globex pilot", "AMER", "Open", "4500", "2024-04-18"),
        ("Initech upsell", "EMEA", "Open", "8250.5", "2024-05-01"),
        ("Umbrella", "AMER", "Won", "30000", "2024-02-11"),
        ("Hooli", "", "Open", "n/a", ""),
        ("Stark expansion", "AMER", "Open", "15000", "2024-06-30"),
    ];
    let rows: Vec<Row> = deals
        .into_iter()
        .enumerate()
        .map(|(i, (title, region, stage, amount, close))| {
            Row::new(i.to_string(), title)
                .with("region", region)
                .with("stage", stage)
                .with("amount", amount)
                .with("close", close)
        })
        .collect();

    // Sort first, grouping keeps row order
    let sorted = sort_rows(&rows, &[SortRule::descending("amount")], &fields);
    let config = GroupingConfig::by(["region", "stage"]);
    let amount = &fields[2];
    let close = &fields[3];

    println!("1. Expanded:");
    let groups = create_multi_level_groups(sorted.iter().copied(), &fields, &config, &HashSet::new());
    for group in &groups {
        let indent = "   ".repeat(group.level + 1);
        println!("{}{} ({} deals)", indent, group.group_value, group.items.len());
        if !group.has_children {
            for row in &group.items {
                println!("{}   - {} {}", indent, row.title, row.value("amount"));
            }
        }
    }

    println!("\n2. With AMER collapsed:");
    let collapsed: HashSet<GroupKey> = [GroupKey::new(["AMER"])].into_iter().collect();
    let groups = create_multi_level_groups(sorted.iter().copied(), &fields, &config, &collapsed);
    for group in &groups {
        let marker = if group.is_collapsed { "+" } else { "-" };
        let indent = "   ".repeat(group.level + 1);
        print!("{}{} {}", indent, marker, group.group_value);

        if let Some(summary) = get_field_summary(group.items.iter().copied(), amount) {
            let parts: Vec<String> = get_available_metrics(amount.field_type)
                .iter()
                .map(|metric| format!("{:?}={}", metric, format_summary_value(&summary, *metric)))
                .collect();
            print!("  [{}]", parts.join(", "));
        }
        if let Some(summary) = get_field_summary(group.items.iter().copied(), close) {
            let parts: Vec<String> = get_available_metrics(close.field_type)
                .iter()
                .map(|metric| format!("{:?}={}", metric, format_summary_value(&summary, *metric)))
                .collect();
            print!("  [{}]", parts.join(", "));
        }
        println!();
    }

    println!("\n=== Example Complete ===");
}
