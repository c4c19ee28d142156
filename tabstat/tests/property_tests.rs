//! Property-based tests for the extraction pipeline, the router and the
//! result schema validator.
//!
//! ## Properties
//!
//! - Alignment: every extracted column has the same length and position i
//!   of each comes from the same source record
//! - Filtering drops a row only when one of its cells is invalid, and never
//!   keeps more rows after a cell is invalidated
//! - A row-major matrix is the transpose of its column-major twin
//! - Dispatch always yields a result; only unregistered ids are unsupported
//! - Method-id normalization is idempotent
//! - Adding a field to a result never lowers its completeness score, and
//!   removing a required one always makes it invalid

use std::sync::Arc;

use proptest::prelude::*;
use tabstat::extract::{ColumnRequest, Extractor, MatrixBuilder};
use tabstat::prelude::*;
use tabstat::result::{CategoryDetails, ComparisonDetails, ConfidenceInterval};
use tabstat::validator::normalize;

/// A cell that is a number, a numeric string, blank text or missing.
fn cell_strategy() -> impl Strategy<Value = CellValue> {
    prop_oneof![
        4 => (-1.0e6f64..1.0e6).prop_map(CellValue::Number),
        1 => (-1000i32..1000).prop_map(|n| CellValue::Text(n.to_string())),
        1 => Just(CellValue::Text("n/a".to_string())),
        1 => Just(CellValue::Empty),
    ]
}

fn table_strategy(columns: usize) -> impl Strategy<Value = Vec<Vec<CellValue>>> {
    (1usize..40).prop_flat_map(move |rows| {
        prop::collection::vec(prop::collection::vec(cell_strategy(), rows), columns)
    })
}

fn dataset(columns: &[Vec<CellValue>]) -> Dataset {
    Dataset::from_columns(
        columns
            .iter()
            .enumerate()
            .map(|(i, values)| (format!("c{i}"), values.clone())),
    )
}

fn requests(count: usize) -> Vec<ColumnRequest> {
    (0..count)
        .map(|i| ColumnRequest::numeric(Role::Variables, format!("c{i}")))
        .collect()
}

/// The value a numeric request yields for `cell`, or `None` when it is invalid.
fn coerced(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Number(n) => Some(*n).filter(|n| n.is_finite()),
        CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Aligned length, with "no valid rows" counted as zero.
fn aligned_len(columns: &[Vec<CellValue>]) -> usize {
    Extractor::new(ExtractionMode::Filtering)
        .extract(&dataset(columns), &requests(columns.len()))
        .map(|aligned| aligned.len())
        .unwrap_or(0)
}

fn comparison_output(fields: [bool; 6]) -> AnalysisOutput {
    let method = MethodId::from_id("independent-t-test").unwrap();
    let mut out = AnalysisOutput::new(
        method,
        CategoryDetails::Comparison(ComparisonDetails::default()),
    );
    if fields[0] {
        out.statistic = Some(2.0);
    }
    if fields[1] {
        out.p_value = Some(0.04);
    }
    if fields[2] {
        out.interpretation = "Groups differ.".to_string();
    }
    if fields[3] {
        out.effect_size = Some(0.5);
    }
    if fields[4] {
        out.df = Some(18.0);
    }
    if fields[5] {
        out.confidence = Some(ConfidenceInterval {
            lower: 0.1,
            upper: 0.9,
            level: 0.95,
        });
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_extracted_columns_share_one_length(columns in table_strategy(3)) {
        let rows = columns[0].len();
        let kept: Vec<usize> = match Extractor::new(ExtractionMode::Filtering)
            .extract(&dataset(&columns), &requests(3))
        {
            Ok(aligned) => {
                for i in 0..3 {
                    prop_assert_eq!(aligned.numbers(i).unwrap().len(), aligned.len());
                }
                prop_assert_eq!(aligned.source_rows().len(), aligned.len());
                prop_assert!(aligned.source_rows().windows(2).all(|w| w[0] < w[1]));

                // Position i of every array comes from record source_rows[i].
                for (i, row) in aligned.source_rows().iter().enumerate() {
                    for (c, column) in columns.iter().enumerate() {
                        prop_assert_eq!(Some(aligned.numbers(c).unwrap()[i]), coerced(&column[*row]));
                    }
                }
                aligned.source_rows().to_vec()
            }
            Err(_) => Vec::new(),
        };

        // A row is dropped only when one of its requested cells is invalid.
        for row in (0..rows).filter(|r| !kept.contains(r)) {
            prop_assert!(
                columns.iter().any(|column| coerced(&column[row]).is_none()),
                "row {} was dropped with only valid cells",
                row
            );
        }
    }

    #[test]
    fn test_invalidating_a_cell_never_adds_rows(
        columns in table_strategy(2),
        column in 0usize..2,
        row_seed in any::<usize>(),
    ) {
        let before = aligned_len(&columns);
        let mut damaged = columns.clone();
        let row = row_seed % damaged[column].len();
        damaged[column][row] = CellValue::Text("invalid".to_string());
        prop_assert!(aligned_len(&damaged) <= before);
    }

    #[test]
    fn test_row_major_is_transposed_column_major(
        values in prop::collection::vec(prop::collection::vec(-100.0f64..100.0, 8), 1..5)
    ) {
        let columns: Vec<Vec<CellValue>> = values
            .iter()
            .map(|col| col.iter().copied().map(CellValue::Number).collect())
            .collect();
        let aligned = Extractor::new(ExtractionMode::Strict)
            .extract(&dataset(&columns), &requests(columns.len()))
            .unwrap();
        let features: Vec<String> = (0..columns.len()).map(|i| format!("c{i}")).collect();
        let builder = MatrixBuilder::new(&aligned);
        let rows = builder.row_major(&features).unwrap();
        let cols = builder.column_major(&features).unwrap();

        prop_assert_eq!(rows.n_samples(), 8);
        prop_assert_eq!(rows.n_features(), columns.len());
        let transposed = rows.transpose();
        prop_assert_eq!(transposed.data(), cols.data());
        prop_assert_eq!(cols.data(), values.as_slice());
    }

    #[test]
    fn test_dispatch_never_panics(method_id in "[a-z\\-]{0,24}") {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let router = Router::new(Arc::new(ScriptedEngine::ready()));
            let dataset = Dataset::from_columns(vec![("x", vec![1.0, 2.0, 3.0])]);
            let params = AnalysisParams::new(VariableRoles::new().with(Role::Variables, "x"));
            let result = router.dispatch(&method_id, &dataset, &params).await;
            let registered = MethodId::from_id(&method_id).is_some();
            match result {
                CalculatorResult::Success(_) => prop_assert!(registered),
                CalculatorResult::Failure { error, kind } => {
                    prop_assert!(!error.is_empty());
                    prop_assert_eq!(error.contains("unsupported method"), !registered);
                    prop_assert_eq!(kind == ErrorKind::Unsupported, !registered);
                }
            }
            Ok(())
        })?;
    }

    #[test]
    fn test_normalize_is_idempotent(method_id in "[A-Za-z0-9 _\\-']{0,32}") {
        let once = normalize(&method_id);
        prop_assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_adding_a_field_never_lowers_the_score(
        fields in prop::array::uniform6(any::<bool>()),
        extra in 0usize..6,
    ) {
        let validator = ResultSchemaValidator::new();
        let before = validator.validate(&comparison_output(fields), "independent-t-test");
        let mut more = fields;
        more[extra] = true;
        let after = validator.validate(&comparison_output(more), "independent-t-test");
        prop_assert!(after.score >= before.score);
        prop_assert!(after.missing_required.len() <= before.missing_required.len());
    }

    #[test]
    fn test_removing_a_required_field_invalidates(
        recommended in prop::array::uniform3(any::<bool>()),
        removed in 0usize..3,
    ) {
        let mut fields = [true, true, true, recommended[0], recommended[1], recommended[2]];
        let validator = ResultSchemaValidator::new();
        prop_assert!(validator.validate(&comparison_output(fields), "independent-t-test").valid);

        fields[removed] = false;
        let report = validator.validate(&comparison_output(fields), "independent-t-test");
        let path = ["statistic", "pValue", "interpretation"][removed];
        prop_assert!(!report.valid);
        prop_assert_eq!(report.missing_required, vec![path.to_string()]);
        prop_assert!(report.suggestions.contains(&format!("Add required field '{path}'")));
    }
}

#[tokio::test]
async fn test_every_supported_method_is_routed() {
    let router = Router::new(Arc::new(ScriptedEngine::ready()));
    let dataset = Dataset::from_columns(vec![("x", vec![1.0, 2.0, 3.0])]);
    let params = AnalysisParams::new(VariableRoles::new().with(Role::Variables, "x"));

    let methods = router.supported_methods();
    assert_eq!(methods.len(), 55);
    for method_id in methods {
        let result = router.dispatch(method_id, &dataset, &params).await;
        if let Some(error) = result.error() {
            assert!(
                !error.contains("unsupported method"),
                "{method_id} was not routed: {error}"
            );
            assert_ne!(result.error_kind(), Some(ErrorKind::Unsupported), "{method_id}");
        }
    }
}
