/// Views Example
///
/// This example demonstrates:
/// - Describing fields and rows of a task database
/// - Writing a filter as a query expression
/// - Computing table, kanban and calendar views of the same rows
/// - Reading whole-view summaries

use chrono::NaiveDate;
use dbview::{
    compute_view, parse_filter, EvalContext, Field, FieldType, Row, SortRule, ViewBody, ViewConfig,
    ViewLayout,
};

fn main() {
    println!("=== dbview Views Example ===\n");

    // 1. Describe the database
    println!("1. Creating task database...");
    let fields = vec![
        Field::new("status", "Status", FieldType::Status).with_options(["Todo", "In Progress", "Done"]),
        Field::new("estimate", "Estimate", FieldType::Number),
        Field::new("due", "Due Date", FieldType::Date),
        Field::new("assignee", "Assignee", FieldType::Person),
    ];

    let tasks = vec![
        ("Write launch post", "Todo", "3", "2024-06-14", "ana"),
        ("Fix login bug", "In Progress", "5", "2024-06-10", "ben"),
        ("Update pricing page", "Done", "2", "2024-06-03", "ana"),
        ("Plan offsite", "Todo", "", "2024-06-28", "cleo"),
        ("Migrate database", "In Progress", "13", "2024-06-21", "ben"),
    ];
    let rows: Vec<Row> = tasks
        .into_iter()
        .enumerate()
        .map(|(i, (title, status, estimate, due, assignee))| {
            Row::new(format!("task-{}", i + 1), title)
                .with("status", status)
                .with("estimate", estimate)
                .with("due", due)
                .with("assignee", assignee)
        })
        .collect();
    println!("   {} rows, {} fields\n", rows.len(), fields.len());

    let ctx = EvalContext::on(NaiveDate::from_ymd_opt(2024, 6, 12).unwrap()).with_user("ben");

    // 2. Filter with a query expression
    println!("2. Filtering with: status != 'Done' AND (assignee = ME OR `Due Date` IS THIS_WEEK)");
    let filter = match parse_filter(
        "status != 'Done' AND (assignee = ME OR `Due Date` IS THIS_WEEK)",
        &fields,
    ) {
        Ok(filter) => filter,
        Err(err) => {
            eprintln!("   {}", err);
            return;
        }
    };
    println!("   compiled to {} rules\n", filter.rule_count());

    // 3. Table view sorted by estimate
    println!("3. Table view, largest estimate first:");
    let table = ViewConfig {
        filter: filter.clone(),
        sorts: vec![SortRule::descending("estimate")],
        ..ViewConfig::default()
    };
    let view = compute_view(&rows, &fields, &table, &ctx);
    if let ViewBody::Rows { rows } = &view.body {
        for row in rows {
            println!("   {:<22} {:>3}", row.title, row.value("estimate"));
        }
    }
    println!("   {} of {} rows visible\n", view.visible_rows, view.total_rows);

    // 4. Kanban view
    println!("4. Kanban view by status:");
    let kanban = ViewConfig::default().with_layout(ViewLayout::Kanban);
    let view = compute_view(&rows, &fields, &kanban, &ctx);
    if let ViewBody::Board { columns, .. } = &view.body {
        for column in columns {
            let titles: Vec<&str> = column.items.iter().map(|r| r.title.as_str()).collect();
            println!("   [{}] {:?}", column.value, titles);
        }
    }
    println!();

    // 5. Calendar view
    println!("5. Calendar view by due date:");
    let calendar = ViewConfig {
        sorts: vec![SortRule::ascending("title")],
        ..ViewConfig::default().with_layout(ViewLayout::Calendar)
    };
    let view = compute_view(&rows, &fields, &calendar, &ctx);
    if let ViewBody::Calendar { calendar, .. } = &view.body {
        for day in &calendar.days {
            let titles: Vec<&str> = day.items.iter().map(|r| r.title.as_str()).collect();
            println!("   {} {:?}", day.date, titles);
        }
    }
    println!();

    // 6. Summaries
    println!("6. Whole-view summaries:");
    if let Some(estimate) = view.summaries.get("estimate") {
        println!(
            "   estimate: sum {:?}, average {:?}, {} of {} values",
            estimate.sum, estimate.average, estimate.valid_count, estimate.count
        );
    }

    println!("\n=== Example Complete ===");
}
