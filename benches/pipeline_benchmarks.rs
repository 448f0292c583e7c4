use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use chrono::NaiveDate;
use dbview::*;
use std::collections::HashSet;

const STATUSES: [&str; 4] = ["Todo", "Doing", "Review", "Done"];
const PRIORITIES: [&str; 3] = ["Low", "Medium", "High"];

fn fields() -> Vec<Field> {
    vec![
        Field::new("status", "Status", FieldType::Status).with_options(STATUSES),
        Field::new("priority", "Priority", FieldType::Select).with_options(PRIORITIES),
        Field::new("estimate", "Estimate", FieldType::Number),
        Field::new("due", "Due", FieldType::Date),
        Field::new("notes", "Notes", FieldType::Text),
    ]
}

fn rows(size: usize) -> Vec<Row> {
    (0..size)
        .map(|i| {
            let mut row = Row::new(i.to_string(), format!("Task {}", i))
                .with("priority", PRIORITIES[i % 3])
                .with("estimate", format!("{}", (i * 7) % 40))
                .with("due", format!("2024-{:02}-{:02}", i % 12 + 1, i % 28 + 1))
                .with("notes", format!("note for item_{}", i))
                .created(format!("2024-01-01T00:00:{:02}Z", i % 60));
            // Every fifth row has no status
            if i % 5 != 0 {
                row = row.with("status", STATUSES[i % 4]);
            }
            row
        })
        .collect()
}

fn ctx() -> EvalContext {
    EvalContext::on(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
}

fn filter_tree() -> FilterGroup {
    FilterGroup::or("root")
        .rule(FilterRule::new("r1", "status", FilterOperator::Equals, "Done"))
        .group(
            FilterGroup::and("g1")
                .rule(FilterRule::new("r2", "estimate", FilterOperator::IsGreaterThan, "10"))
                .rule(FilterRule::new("r3", "notes", FilterOperator::Contains, "ITEM_1")),
        )
}

fn bench_apply_filters(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_filters");
    let fields = fields();
    let tree = filter_tree();

    for size in [100, 1000, 10000].iter() {
        let rows = rows(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| apply_filters(black_box(&rows), &tree, &fields, &ctx()));
        });
    }
    group.finish();
}

fn bench_sort_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort_rows");
    let fields = fields();
    let rules = [SortRule::ascending("priority"), SortRule::descending("due")];

    for size in [100, 1000, 10000].iter() {
        let rows = rows(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| sort_rows(black_box(&rows), &rules, &fields));
        });
    }
    group.finish();
}

fn bench_multi_level_groups(c: &mut Criterion) {
    let mut group = c.benchmark_group("multi_level_groups");
    let fields = fields();
    let config = GroupingConfig::by(["status", "priority"]);
    let collapsed: HashSet<GroupKey> = [GroupKey::new(["Done"])].into_iter().collect();

    for size in [100, 1000, 10000].iter() {
        let rows = rows(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| create_multi_level_groups(black_box(&rows), &fields, &config, &collapsed));
        });
    }
    group.finish();
}

fn bench_field_summary(c: &mut Criterion) {
    let mut group = c.benchmark_group("field_summary");
    let estimate = Field::new("estimate", "Estimate", FieldType::Number);
    let due = Field::new("due", "Due", FieldType::Date);

    for size in [100, 1000, 10000].iter() {
        let rows = rows(*size);
        group.bench_with_input(BenchmarkId::new("number", size), size, |b, _| {
            b.iter(|| get_field_summary(black_box(&rows), &estimate));
        });
        group.bench_with_input(BenchmarkId::new("date", size), size, |b, _| {
            b.iter(|| get_field_summary(black_box(&rows), &due));
        });
    }
    group.finish();
}

fn bench_compute_view(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_view");
    let fields = fields();
    let config = ViewConfig {
        search: Some("task".to_string()),
        filter: filter_tree(),
        sorts: vec![SortRule::descending("estimate")],
        grouping: GroupingConfig::by(["status"]),
        ..ViewConfig::default()
    };

    for size in [100, 1000, 10000].iter() {
        let rows = rows(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| compute_view(black_box(&rows), &fields, &config, &ctx()));
        });
    }
    group.finish();
}

fn bench_parse_filter(c: &mut Criterion) {
    let fields = fields();
    c.bench_function("parse_filter", |b| {
        b.iter(|| {
            parse_filter(
                black_box("status = 'Done' OR (estimate BETWEEN 5 AND 20 AND NOT notes CONTAINS 'draft')"),
                &fields,
            )
        });
    });
}

criterion_group!(
    benches,
    bench_apply_filters,
    bench_sort_rows,
    bench_multi_level_groups,
    bench_field_summary,
    bench_compute_view,
    bench_parse_filter,
);

criterion_main!(benches);
