//! End-to-end comparisons over DataFusion tables.

mod common;

use arrow::array::{Decimal128Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field};
use common::{contacts, customers, descriptor, ledger, register, FixedEngine};
use datafusion::prelude::SessionContext;
use std::sync::Arc;
use term_reconcile::compare::{
    compare_null_patterns, compare_row_counts, diff_schemas, fetch_columns, NullPatternStatus,
};
use term_reconcile::core::{
    ColumnDescriptor, ComparisonKind, ComparisonOptions, ComparisonSuite, ComponentOutcome,
    MismatchKind, SemanticType, VerdictStatus,
};
use term_reconcile::params::{ComparisonParameters, TableRowsParameters};

#[tokio::test]
async fn test_extra_column_in_target() {
    let source_ctx = SessionContext::new();
    register(
        &source_ctx,
        "people",
        vec![
            Field::new("id", DataType::Int32, true),
            Field::new("name", DataType::Utf8, true),
        ],
        vec![
            Arc::new(arrow::array::Int32Array::from(vec![1, 2])),
            Arc::new(StringArray::from(vec!["a", "b"])),
        ],
    );
    let target_ctx = SessionContext::new();
    register(
        &target_ctx,
        "people",
        vec![
            Field::new("id", DataType::Int32, true),
            Field::new("name", DataType::Utf8, true),
            Field::new("extra", DataType::Utf8, true),
        ],
        vec![
            Arc::new(arrow::array::Int32Array::from(vec![1, 2])),
            Arc::new(StringArray::from(vec!["a", "b"])),
            Arc::new(StringArray::from(vec![None::<&str>, None])),
        ],
    );
    let source = descriptor(source_ctx, "people");
    let target = descriptor(target_ctx, "people");

    let diff = diff_schemas(
        &fetch_columns(&source).await.unwrap(),
        &fetch_columns(&target).await.unwrap(),
    );
    let extra: Vec<_> = diff.extra_in_target.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(extra, vec!["extra"]);
    assert!(diff.missing_in_target.is_empty());
    assert!(diff.type_mismatches.is_empty());
    assert!(diff.precision_mismatches.is_empty());
    assert!(diff.length_mismatches.is_empty());
    assert!(diff.nullability_mismatches.is_empty());

    let verdict = ComparisonSuite::builder("schema")
        .kind(ComparisonKind::Schema)
        .build()
        .run(&source, &target)
        .await
        .unwrap();
    assert_eq!(verdict.status, VerdictStatus::Fail);
    assert_eq!(verdict.sample_mismatches.len(), 1);
    assert_eq!(verdict.sample_mismatches[0].kind, MismatchKind::ExtraInTarget);
    assert_eq!(verdict.sample_mismatches[0].column.as_deref(), Some("extra"));
}

#[tokio::test]
async fn test_row_count_outside_tolerance() {
    let source = FixedEngine::with_count(1200).into_table("orders");
    let target = FixedEngine::with_count(8).into_table("orders");

    let result = compare_row_counts(&source, &target, None, 0.0).await.unwrap();
    assert!(!result.within_tolerance);
    assert_eq!(result.delta, 1192);

    // Same data, same answer
    let again = compare_row_counts(&source, &target, None, 0.0).await.unwrap();
    assert_eq!(result, again);
}

#[tokio::test]
async fn test_row_count_filter_and_tolerance() {
    let source = descriptor(customers(100), "customers");
    let target = descriptor(customers(97), "customers");

    let strict = compare_row_counts(&source, &target, None, 0.0).await.unwrap();
    assert!(!strict.within_tolerance);
    let tolerant = compare_row_counts(&source, &target, None, 0.05).await.unwrap();
    assert!(tolerant.within_tolerance);

    let filtered = compare_row_counts(&source, &target, Some("id <= 50"), 0.0)
        .await
        .unwrap();
    assert_eq!(filtered.source_count, 50);
    assert!(filtered.within_tolerance);
}

#[tokio::test]
async fn test_null_pattern_divergence() {
    let source = descriptor(contacts(1000, 0), "contacts");
    let target = descriptor(contacts(7, 4), "contacts");
    let diff = diff_schemas(
        &fetch_columns(&source).await.unwrap(),
        &fetch_columns(&target).await.unwrap(),
    );

    let results = compare_null_patterns(&source, &target, &diff.shared_columns, 0.0)
        .await
        .unwrap();
    let phone = results.iter().find(|r| r.column_name == "phone").unwrap();
    assert_eq!(phone.source_null_ratio, 0.0);
    assert!((phone.target_null_ratio - 0.571).abs() < 0.001);
    assert_eq!(phone.status, NullPatternStatus::Divergent);

    let id = results.iter().find(|r| r.column_name == "id").unwrap();
    assert_eq!(id.status, NullPatternStatus::Match);
}

fn people(sizes: Vec<Option<&str>>) -> SessionContext {
    let ctx = SessionContext::new();
    let rows = sizes.len() as i64;
    register(
        &ctx,
        "people",
        vec![
            Field::new("id", DataType::Int64, false),
            Field::new("first name", DataType::Utf8, true),
            Field::new("order-date", DataType::Utf8, true),
            Field::new("Größe", DataType::Utf8, true),
        ],
        vec![
            Arc::new(Int64Array::from((1..=rows).collect::<Vec<_>>())),
            Arc::new(StringArray::from(vec![Some("Ada"); sizes.len()])),
            Arc::new(StringArray::from(vec![Some("2024-01-01"); sizes.len()])),
            Arc::new(StringArray::from(sizes)),
        ],
    );
    ctx
}

#[tokio::test]
async fn test_catalog_names_with_spaces_and_punctuation() {
    let source = descriptor(people(vec![Some("M"), Some("L"), None]), "people");
    let target = descriptor(people(vec![Some("M"), Some("L"), None]), "people");

    let verdict = ComparisonSuite::builder("people")
        .kinds(ComparisonKind::SMOKE)
        .build()
        .run(&source, &target)
        .await
        .unwrap();
    assert_eq!(verdict.status, VerdictStatus::Pass, "{}", verdict.message);

    match &verdict.component_results[&ComparisonKind::NullPattern] {
        ComponentOutcome::NullPattern(results) => {
            let names: Vec<_> = results.iter().map(|r| r.column_name.as_str()).collect();
            assert_eq!(names, vec!["id", "first name", "order-date", "Größe"]);
            let size = &results[3];
            assert_eq!(size.source_null_count, 1);
            assert_eq!(size.status, NullPatternStatus::Match);
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    // Joining on the first column also quotes catalog names verbatim
    let verdict = ComparisonSuite::builder("people_values")
        .kind(ComparisonKind::ColumnValues)
        .options(ComparisonOptions::new().with_compare_column("id"))
        .build()
        .run(&source, &target)
        .await
        .unwrap();
    assert_eq!(verdict.status, VerdictStatus::Pass);
}

#[tokio::test]
async fn test_divergent_catalog_name_column() {
    let source = descriptor(people(vec![Some("M"), Some("L"), Some("S"), Some("XL")]), "people");
    let target = descriptor(people(vec![None, None, Some("S"), Some("XL")]), "people");
    let diff = diff_schemas(
        &fetch_columns(&source).await.unwrap(),
        &fetch_columns(&target).await.unwrap(),
    );

    let results = compare_null_patterns(&source, &target, &diff.shared_columns, 0.0)
        .await
        .unwrap();
    let size = results.iter().find(|r| r.column_name == "Größe").unwrap();
    assert_eq!(size.target_null_ratio, 0.5);
    assert_eq!(size.status, NullPatternStatus::Divergent);
}

#[tokio::test]
async fn test_fully_null_column_matches() {
    let source = descriptor(contacts(10, 10), "contacts");
    let target = descriptor(contacts(3, 3), "contacts");
    let diff = diff_schemas(
        &fetch_columns(&source).await.unwrap(),
        &fetch_columns(&target).await.unwrap(),
    );

    let results = compare_null_patterns(&source, &target, &diff.shared_columns, 0.0)
        .await
        .unwrap();
    let phone = results.iter().find(|r| r.column_name == "phone").unwrap();
    assert_eq!(phone.source_null_ratio, 1.0);
    assert_eq!(phone.target_null_ratio, 1.0);
    assert_eq!(phone.status, NullPatternStatus::Match);
}

#[tokio::test]
async fn test_empty_target_has_zero_ratio() {
    let source = descriptor(contacts(5, 0), "contacts");
    let target = descriptor(contacts(0, 0), "contacts");
    let diff = diff_schemas(
        &fetch_columns(&source).await.unwrap(),
        &fetch_columns(&target).await.unwrap(),
    );

    let results = compare_null_patterns(&source, &target, &diff.shared_columns, 0.0)
        .await
        .unwrap();
    for result in &results {
        assert_eq!(result.target_total, 0);
        assert_eq!(result.target_null_ratio, 0.0);
        assert_eq!(result.status, NullPatternStatus::Match);
    }
}

#[tokio::test]
async fn test_decimal_column_round_trip() {
    let ctx = SessionContext::new();
    register(
        &ctx,
        "products",
        vec![
            Field::new("id", DataType::Int64, false),
            Field::new("price", DataType::Decimal128(10, 2), false),
        ],
        vec![
            Arc::new(Int64Array::from(vec![1])),
            Arc::new(
                Decimal128Array::from(vec![995_i128])
                    .with_precision_and_scale(10, 2)
                    .unwrap(),
            ),
        ],
    );

    let columns = fetch_columns(&descriptor(ctx, "products")).await.unwrap();
    let price = &columns[1];
    assert_eq!(price.name, "price");
    assert_eq!(price.declared_type, SemanticType::Decimal);
    assert_eq!(price.numeric_precision, Some(10));
    assert_eq!(price.numeric_scale, Some(2));
    assert!(!price.is_nullable);
}

#[tokio::test]
async fn test_cross_engine_schema_uses_normalized_types() {
    let source = descriptor(customers(3), "customers");
    let target = FixedEngine {
        columns: vec![
            ColumnDescriptor::from_native("ID", "bigint").not_null().at_position(1),
            ColumnDescriptor::from_native("name", "character varying")
                .with_max_length(120)
                .at_position(2),
        ],
        count: 3,
        ..FixedEngine::default()
    }
    .into_table("customers");

    let verdict = ComparisonSuite::builder("cross_engine")
        .kinds(ComparisonKind::SMOKE)
        .build()
        .run(&source, &target)
        .await
        .unwrap();
    assert_eq!(verdict.status, VerdictStatus::Pass, "{}", verdict.message);
    match &verdict.component_results[&ComparisonKind::NullPattern] {
        ComponentOutcome::NullPattern(results) => assert_eq!(results.len(), 2),
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn test_null_only_value_differences_warn() {
    let source = descriptor(ledger(vec![Some(10.0), Some(20.0), Some(30.0)]), "ledger");
    let target = descriptor(ledger(vec![Some(10.0), None, Some(30.0)]), "ledger");

    let verdict = ComparisonSuite::builder("values")
        .kind(ComparisonKind::ColumnValues)
        .options(ComparisonOptions::new().with_column_compare("id", "amount"))
        .build()
        .run(&source, &target)
        .await
        .unwrap();
    assert_eq!(verdict.status, VerdictStatus::Warn);
    assert_eq!(verdict.sample_mismatches[0].kind, MismatchKind::NullMismatch);
    assert_eq!(verdict.sample_mismatches[0].severity, VerdictStatus::Warn);
}

#[tokio::test]
async fn test_value_tolerance() {
    let source = descriptor(ledger(vec![Some(100.0), Some(200.0)]), "ledger");
    let target = descriptor(ledger(vec![Some(100.5), Some(200.0)]), "ledger");

    let run = |tolerance: f64| {
        ComparisonSuite::builder("values")
            .kind(ComparisonKind::ColumnValues)
            .options(
                ComparisonOptions::new()
                    .with_column_compare("id", "amount")
                    .with_value_tolerance(tolerance),
            )
            .build()
    };
    let strict = run(0.0).run(&source, &target).await.unwrap();
    assert_eq!(strict.status, VerdictStatus::Fail);
    let loose = run(0.01).run(&source, &target).await.unwrap();
    assert_eq!(loose.status, VerdictStatus::Pass);
}

#[tokio::test]
async fn test_smoke_suite_collects_failures_in_order() {
    let source = descriptor(contacts(10, 0), "contacts");
    let target = descriptor(contacts(6, 3), "contacts");

    let verdict = ComparisonSuite::builder("smoke")
        .kinds(ComparisonKind::SMOKE)
        .options(ComparisonOptions::new().with_sample_cap(5))
        .build()
        .run(&source, &target)
        .await
        .unwrap();

    assert_eq!(verdict.status, VerdictStatus::Fail);
    assert_eq!(
        verdict.component_status(ComparisonKind::Schema),
        Some(VerdictStatus::Pass)
    );
    let kinds: Vec<_> = verdict.sample_mismatches.iter().map(|r| r.kind).collect();
    assert_eq!(
        kinds,
        vec![MismatchKind::RowCountDelta, MismatchKind::NullDivergence]
    );
    assert!(verdict.message.starts_with("FAIL: "));
}

#[tokio::test]
async fn test_missing_table_is_error_component() {
    let source = descriptor(customers(3), "customers");
    let target = descriptor(SessionContext::new(), "customers");

    let verdict = ComparisonSuite::builder("missing")
        .kinds(ComparisonKind::SMOKE)
        .build()
        .run(&source, &target)
        .await
        .unwrap();
    assert_eq!(verdict.status, VerdictStatus::Error);
    assert!(matches!(
        verdict.component_results[&ComparisonKind::Schema],
        ComponentOutcome::Error(_)
    ));
    assert!(matches!(
        verdict.component_results[&ComparisonKind::RowCount],
        ComponentOutcome::Error(_)
    ));
}

#[tokio::test]
async fn test_driven_by_test_definition_strings() {
    let kind: ComparisonKind = "ROW_COUNT_VALIDATION".parse().unwrap();
    let params = ComparisonParameters::parse(
        "source_table=customers;target_table=customers;tolerance_percent=5",
    )
    .unwrap();
    let (source, target) = params
        .tables(
            Arc::new(term_reconcile::engine::DataFusionEngine::new(customers(100))),
            Arc::new(term_reconcile::engine::DataFusionEngine::new(customers(96))),
        )
        .unwrap();

    let verdict = ComparisonSuite::builder("ROW_COUNT_VALIDATION")
        .kind(kind)
        .options(params.to_options())
        .build()
        .run(&source, &target)
        .await
        .unwrap();
    assert_eq!(verdict.status, VerdictStatus::Pass);

    let rows = TableRowsParameters::parse("table_name=public.customers,min_rows=5").unwrap();
    let table = rows
        .table(Arc::new(term_reconcile::engine::DataFusionEngine::new(customers(3))))
        .unwrap();
    let verdict = ComparisonSuite::builder("TABLE_ROWS")
        .kind("TABLE_ROWS".parse().unwrap())
        .options(rows.to_options())
        .build()
        .run(&table, &table)
        .await
        .unwrap();
    assert_eq!(verdict.status, VerdictStatus::Fail);
}

#[tokio::test]
async fn test_verdict_serializes_reporting_contract() {
    let source = descriptor(customers(4), "customers");
    let target = descriptor(customers(4), "customers");
    let verdict = ComparisonSuite::builder("json")
        .kinds(ComparisonKind::SMOKE)
        .build()
        .run(&source, &target)
        .await
        .unwrap();

    let json: serde_json::Value = serde_json::from_str(&verdict.to_json().unwrap()).unwrap();
    for field in [
        "status",
        "component_results",
        "message",
        "sample_mismatches",
        "duration_ms",
    ] {
        assert!(json.get(field).is_some(), "missing {field}");
    }
    assert_eq!(json["status"], "PASS");
    assert!(json["component_results"]["schema"]["schema"]["shared_columns"].is_array());
    assert_eq!(
        json["component_results"]["null_pattern"]["null_pattern"][0]["status"],
        "MATCH"
    );
}
