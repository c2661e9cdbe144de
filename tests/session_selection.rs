//! Selection Tests
//!
//! Tests for what a managed query reads:
//! - column selection and its if_not_empty guard
//! - additive ranges and points
//! - value conditions
//! - column access errors
//! - selection is frozen once the query is submitted

use std::collections::BTreeMap;
use std::sync::Arc;

use arrayquery::engine::memory::ArrayStore;
use arrayquery::engine::{
    Array, ArraySchema, Attribute, ConditionOp, Datatype, Dimension, EngineError, Layout,
    QueryCondition, QueryStatus, QueryType, Scalar,
};
use arrayquery::{BufferError, ColumnBuffer, ErrorKind, ManagedQuery, SessionError};

// =============================================================================
// Test Utilities
// =============================================================================

fn variants_store() -> Arc<ArrayStore> {
    let schema = ArraySchema::sparse()
        .with_dimension(Dimension::new("pos", Datatype::UInt32).with_domain(0u32, 1000u32))
        .with_attribute(Attribute::new("qual", Datatype::Float64))
        .with_attribute(Attribute::new("label", Datatype::StringUtf8).nullable());
    let store = ArrayStore::create("mem://variants", schema).unwrap();
    let rows = (0..10u32).map(|pos| {
        let mut row = BTreeMap::new();
        row.insert("pos".to_string(), Some(Scalar::from(pos)));
        row.insert("qual".to_string(), Some(Scalar::from(pos as f64 * 1.5)));
        let label = (pos % 3 != 0).then(|| Scalar::from(format!("v{}", pos)));
        row.insert("label".to_string(), label);
        row
    });
    store.insert_rows(rows).unwrap();
    store
}

fn session(store: &Arc<ArrayStore>) -> ManagedQuery {
    let array: Arc<dyn Array> = store.open(QueryType::Read);
    ManagedQuery::new(array, "selection").unwrap()
}

fn read_positions(session: &mut ManagedQuery) -> Vec<u32> {
    assert_eq!(session.submit().unwrap(), QueryStatus::Complete);
    let mut positions = session.data::<u32>("pos").unwrap().to_vec();
    positions.sort_unstable();
    positions
}

// =============================================================================
// Column Selection
// =============================================================================

#[test]
fn test_if_not_empty_keeps_existing_selection() {
    let store = variants_store();
    let mut session = session(&store);

    session.select_columns(&["pos", "qual"], true).unwrap();
    session.select_columns(&["label"], true).unwrap();
    assert_eq!(session.selected_columns(), &["pos", "qual"]);
}

#[test]
fn test_if_not_empty_honored_after_empty_selection() {
    let store = variants_store();
    let mut session = session(&store);

    session.select_columns::<&str>(&[], true).unwrap();
    assert!(session.selected_columns().is_empty());
    session.select_columns(&["label"], true).unwrap();
    assert_eq!(session.selected_columns(), &["label"]);
}

#[test]
fn test_select_columns_replaces_without_guard() {
    let store = variants_store();
    let mut session = session(&store);

    session.select_columns(&["pos", "qual"], false).unwrap();
    session.select_columns(&["label", "label"], false).unwrap();
    assert_eq!(session.selected_columns(), &["label"]);
}

#[test]
fn test_select_unknown_column() {
    let store = variants_store();
    let mut session = session(&store);

    let err = session.select_columns(&["depth"], false).unwrap_err();
    assert_eq!(
        err,
        SessionError::Engine(EngineError::UnknownColumn("depth".into()))
    );
    assert!(session.selected_columns().is_empty());
}

#[test]
fn test_empty_selection_reads_all_columns() {
    let store = variants_store();
    let mut session = session(&store);
    session.submit().unwrap();

    let names: Vec<&str> = session.buffers().names().collect();
    assert_eq!(names, vec!["pos", "qual", "label"]);
    assert_eq!(session.selected_columns(), &["pos", "qual", "label"]);
}

#[test]
fn test_selected_and_attached_columns_are_read() {
    let store = variants_store();
    let mut session = session(&store);
    session.select_columns(&["pos"], false).unwrap();
    let qual = ColumnBuffer::fixed("qual", Datatype::Float64, 16);
    session.set_column_data("qual", Arc::new(qual)).unwrap();
    session.submit().unwrap();

    assert!(session.buffers().contains("pos"));
    assert!(session.buffers().contains("qual"));
    assert!(!session.buffers().contains("label"));
    assert_eq!(session.data::<f64>("qual").unwrap().len(), 10);
}

// =============================================================================
// Ranges and Points
// =============================================================================

#[test]
fn test_ranges_accumulate_into_union() {
    let store = variants_store();
    let mut session = session(&store);
    assert!(!session.is_range_set());

    session.select_ranges("pos", [(1u32, 2u32)]).unwrap();
    session.select_ranges("pos", [(5u32, 6u32)]).unwrap();
    assert!(session.is_range_set());

    assert_eq!(read_positions(&mut session), vec![1, 2, 5, 6]);
}

#[test]
fn test_points_and_ranges_mix() {
    let store = variants_store();
    let mut session = session(&store);

    session.select_points("pos", [0u32, 9]).unwrap();
    session.select_point("pos", 4u32).unwrap();
    session.select_ranges("pos", [(6u32, 7u32)]).unwrap();

    assert_eq!(read_positions(&mut session), vec![0, 4, 6, 7, 9]);
}

#[test]
fn test_string_dimension_points() {
    let schema = ArraySchema::sparse()
        .with_dimension(Dimension::new("contig", Datatype::StringAscii))
        .with_dimension(Dimension::new("pos", Datatype::UInt32))
        .with_attribute(Attribute::new("depth", Datatype::UInt16));
    let store = ArrayStore::create("mem://contigs", schema).unwrap();
    let rows = [("chr1", 1u32, 30u16), ("chr2", 5, 12), ("chrX", 7, 4)]
        .into_iter()
        .map(|(contig, pos, depth)| {
            BTreeMap::from([
                ("contig".to_string(), Some(Scalar::from(contig))),
                ("pos".to_string(), Some(Scalar::from(pos))),
                ("depth".to_string(), Some(Scalar::from(depth))),
            ])
        });
    store.insert_rows(rows).unwrap();

    let mut session = session(&store);
    session.select_points("contig", ["chr1", "chrX"]).unwrap();
    session.submit().unwrap();

    assert_eq!(session.strings("contig").unwrap(), vec!["chr1", "chrX"]);
    assert_eq!(session.string_view("contig", 1).unwrap(), "chrX");
    assert_eq!(session.data::<u16>("depth").unwrap(), &[30, 4]);
}

#[test]
fn test_invalid_ranges_are_engine_errors() {
    let store = variants_store();
    let mut session = session(&store);

    assert!(matches!(
        session.select_ranges("pos", [(5u32, 1u32)]),
        Err(SessionError::Engine(EngineError::InvalidRange { .. }))
    ));
    assert!(matches!(
        session.select_point("pos", 5000u32),
        Err(SessionError::Engine(EngineError::OutOfDomain { .. }))
    ));
    assert!(matches!(
        session.select_point("pos", "ten"),
        Err(SessionError::Engine(EngineError::CoordinateType { .. }))
    ));
    assert!(matches!(
        session.select_point("chrom", 1),
        Err(SessionError::Engine(EngineError::UnknownDimension(_)))
    ));
    assert!(!session.is_range_set());
}

// =============================================================================
// Conditions and Layout
// =============================================================================

#[test]
fn test_condition_filters_values() {
    let store = variants_store();
    let mut session = session(&store);
    session
        .set_condition(&QueryCondition::new("qual", ConditionOp::Ge, 6.0))
        .unwrap();
    assert_eq!(read_positions(&mut session), vec![4, 5, 6, 7, 8, 9]);
}

#[test]
fn test_condition_replaces_previous() {
    let store = variants_store();
    let mut session = session(&store);
    session
        .set_condition(&QueryCondition::new("qual", ConditionOp::Ge, 6.0))
        .unwrap();
    session
        .set_condition(&QueryCondition::is_null("label"))
        .unwrap();
    assert_eq!(read_positions(&mut session), vec![0, 3, 6, 9]);
}

#[test]
fn test_condition_on_unknown_field() {
    let store = variants_store();
    let mut session = session(&store);
    let err = session
        .set_condition(&QueryCondition::new("depth", ConditionOp::Eq, 1))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Engine);
}

#[test]
fn test_row_major_layout_sorts_results() {
    let schema = ArraySchema::sparse()
        .with_dimension(Dimension::new("pos", Datatype::Int64))
        .with_attribute(Attribute::new("n", Datatype::Int8));
    let store = ArrayStore::create("mem://unsorted", schema).unwrap();
    let rows = [9i64, -3, 4].into_iter().map(|pos| {
        BTreeMap::from([
            ("pos".to_string(), Some(Scalar::from(pos))),
            ("n".to_string(), Some(Scalar::from(1))),
        ])
    });
    store.insert_rows(rows).unwrap();

    let mut session = session(&store);
    session.set_layout(Layout::RowMajor).unwrap();
    session.submit().unwrap();
    assert_eq!(session.data::<i64>("pos").unwrap(), &[-3, 4, 9]);
}

// =============================================================================
// Column Access Errors
// =============================================================================

#[test]
fn test_missing_column_names_session_and_column() {
    let store = variants_store();
    let mut session = session(&store);
    session.select_columns(&["pos"], false).unwrap();
    session.submit().unwrap();

    let err = session.data::<i32>("missing_col").unwrap_err();
    assert_eq!(
        err,
        SessionError::ColumnNotFound {
            session: "selection".into(),
            column: "missing_col".into(),
        }
    );
    let message = err.to_string();
    assert!(message.contains("selection"));
    assert!(message.contains("missing_col"));
    assert!(matches!(
        session.strings("qual"),
        Err(SessionError::ColumnNotFound { .. })
    ));
}

#[test]
fn test_incompatible_type_view() {
    let store = variants_store();
    let mut session = session(&store);
    session.submit().unwrap();

    let err = session.data::<i32>("pos").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    assert!(matches!(
        err,
        SessionError::Buffer {
            source: BufferError::TypeMismatch { requested: "i32", stored: Datatype::UInt32, .. },
            ..
        }
    ));
    assert!(session.data::<f32>("qual").is_err());
    assert!(session.data::<f64>("qual").is_ok());
}

#[test]
fn test_string_access_errors() {
    let store = variants_store();
    let mut session = session(&store);
    session.submit().unwrap();

    assert_eq!(
        session.strings("qual").unwrap_err().kind(),
        ErrorKind::InvalidColumnKind
    );
    assert_eq!(
        session.string_view("label", 10).unwrap_err().kind(),
        ErrorKind::OutOfRange
    );
    assert_eq!(session.string_view("label", 1).unwrap(), "v1");

    let label = session.buffers().at("label").unwrap();
    assert!(label.is_null(0).unwrap());
    assert_eq!(label.scalar_at(1).unwrap(), Some(Scalar::from("v1")));
}

// =============================================================================
// Frozen Selection
// =============================================================================

#[test]
fn test_selection_after_submit_is_rejected() {
    let store = variants_store();
    let mut session = session(&store);
    session.select_columns(&["pos"], false).unwrap();
    session.submit().unwrap();

    let violations = [
        session.select_columns(&["qual"], false).unwrap_err(),
        session.select_columns(&["qual"], true).unwrap_err(),
        session.select_ranges("pos", [(1u32, 2u32)]).unwrap_err(),
        session.select_point("pos", 1u32).unwrap_err(),
        session.set_layout(Layout::RowMajor).unwrap_err(),
        session
            .set_condition(&QueryCondition::is_null("label"))
            .unwrap_err(),
    ];
    for err in violations {
        assert_eq!(err.kind(), ErrorKind::StateViolation, "{}", err);
    }
    assert_eq!(session.selected_columns(), &["pos"]);
    assert!(!session.is_range_set());
}

#[test]
fn test_write_on_read_session_is_rejected() {
    let store = variants_store();
    let mut session = session(&store);
    let err = session.submit_write().unwrap_err();
    assert!(matches!(err, SessionError::StateViolation { .. }));
}

#[test]
fn test_submit_after_finalize_is_rejected() {
    let store = variants_store();
    let mut session = session(&store);
    session.finalize().unwrap();
    session.finalize().unwrap();

    assert_eq!(session.submit().unwrap_err().kind(), ErrorKind::StateViolation);
    let buffer = Arc::new(ColumnBuffer::fixed("pos", Datatype::UInt32, 1));
    assert!(session.set_column_data("pos", buffer).is_err());
}

#[test]
fn test_session_identity() {
    let store = variants_store();
    let first = session(&store);
    let second = session(&store);
    assert_ne!(first.id(), second.id());
    assert_eq!(first.name(), "selection");
    assert_eq!(first.array().uri(), "mem://variants");
    assert!(first.schema().is_sparse());

    let array: Arc<dyn Array> = store.open(QueryType::Read);
    let unnamed = ManagedQuery::new(array, "").unwrap();
    assert_eq!(unnamed.name(), "unnamed");
}
