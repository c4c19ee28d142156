//! Integration tests for uploads that arrive as Arrow batches or DataFusion
//! query results.

mod common;

use std::sync::Arc;

use arrow::array::{Float64Array, Int32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::prelude::SessionContext;
use serde_json::json;
use tabstat::engine::EngineArg;
use tabstat::prelude::*;

fn measurements() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("height", DataType::Float64, true),
        Field::new("weight", DataType::Int32, true),
        Field::new("site", DataType::Utf8, true),
    ]));
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Float64Array::from(vec![
                Some(160.0),
                Some(172.5),
                None,
                Some(181.0),
                Some(168.0),
            ])),
            Arc::new(Int32Array::from(vec![
                Some(55),
                Some(70),
                Some(64),
                Some(82),
                None,
            ])),
            Arc::new(StringArray::from(vec!["north", "south", "north", "south", "north"])),
        ],
    )
    .unwrap()
}

#[tokio::test]
async fn test_record_batches_feed_a_correlation() {
    let dataset = Dataset::from_record_batches(&[measurements()]).unwrap();
    assert_eq!(dataset.len(), 5);
    assert_eq!(dataset.cell(2, "height"), Some(&CellValue::Empty));

    let engine = common::scripted(vec![(
        "pearson_correlation",
        json!({"r": 0.97, "pValue": 0.03}),
    )]);
    let router = common::router(&engine);
    let result = router
        .dispatch(
            "pearson-correlation",
            &dataset,
            &common::params(VariableRoles::new().with_all(Role::Variables, ["height", "weight"])),
        )
        .await;
    assert!(result.is_success(), "{:?}", result.error());

    let calls = engine.calls().await;
    assert_eq!(
        calls[0].args,
        vec![
            EngineArg::Numbers(vec![160.0, 172.5, 181.0]),
            EngineArg::Numbers(vec![55.0, 70.0, 82.0]),
        ]
    );
}

#[tokio::test]
async fn test_dataframe_query_becomes_dataset() {
    let ctx = SessionContext::new();
    ctx.register_batch("measurements", measurements()).unwrap();
    let df = ctx
        .sql("SELECT height, site FROM measurements WHERE site = 'north'")
        .await
        .unwrap();

    let dataset = Dataset::from_dataframe(df).await.unwrap();
    assert_eq!(dataset.len(), 3);
    assert_eq!(dataset.cell(0, "site"), Some(&CellValue::Text("north".to_string())));
    assert_eq!(dataset.cell(0, "height"), Some(&CellValue::Number(160.0)));
    assert!(!dataset.has_column("weight"));
}

#[tokio::test]
async fn test_json_rows_with_mixed_cells() {
    let dataset = Dataset::from_json_rows(
        r#"[
            {"score": "4.5", "arm": "a"},
            {"score": null, "arm": "a"},
            {"score": 6, "arm": 1},
            {"score": "  ", "arm": "b"}
        ]"#,
    )
    .unwrap();
    assert_eq!(dataset.len(), 4);
    assert!(dataset.cell(1, "score").unwrap().is_missing());
    assert!(dataset.cell(3, "score").unwrap().is_missing());
    assert_eq!(dataset.cell(2, "arm").unwrap().as_label(), Some("1".to_string()));

    let err = Dataset::from_json_rows("{\"not\": \"an array\"}").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}
