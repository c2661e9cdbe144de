//! CLI command implementations
//!
//! Both commands load an array snapshot into the in-memory engine. `query`
//! drives a managed read session page by page and reports each page.

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::config::QueryConfig;
use crate::engine::memory::ArrayStore;
use crate::engine::{Array, ArraySchema, QueryType, Scalar};
use crate::query::{ManagedQuery, SessionError, SessionResult};

use super::args::{Command, QueryArgs};
use super::errors::{CliError, CliResult};
use super::io::{write_line, write_pretty};

/// Final line of a paged read
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuerySummary {
    pub total_cells: usize,
    pub pages: usize,
    pub results_complete: bool,
}

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Schema { array } => schema(&array),
        Command::Query(args) => {
            let mut stdout = io::stdout().lock();
            query(&args, &mut stdout)?;
            stdout.flush()?;
            Ok(())
        }
    }
}

/// Print the schema of a snapshot
pub fn schema(path: &Path) -> CliResult<()> {
    let store = ArrayStore::load(path)?;
    let schema = serde_json::to_value(store.schema().as_ref())?;
    write_pretty(&json!({ "uri": store.uri(), "schema": schema }))
}

/// Run a paged read, writing one line per page and a summary line
pub fn query<W: Write>(args: &QueryArgs, out: &mut W) -> CliResult<QuerySummary> {
    let store = ArrayStore::load(&args.array)?;
    let array: Arc<dyn Array> = store.open(QueryType::Read);

    let mut config = QueryConfig::from_env()?;
    if let Some(bytes) = args.buffer_bytes {
        config = config.with_init_buffer_bytes(bytes);
    }

    let mut session = ManagedQuery::with_config(array, args.name.as_str(), config)?;
    let schema = session.schema();
    if !args.columns.is_empty() {
        session.select_columns(args.columns.as_slice(), false)?;
    }
    for arg in &args.ranges {
        let (dim, lo, hi) = parse_range(&schema, arg)?;
        session.select_ranges(&dim, [(lo, hi)])?;
    }
    for arg in &args.points {
        let (dim, value) = parse_point(&schema, arg)?;
        session.select_point(&dim, value)?;
    }
    if let Some(layout) = args.layout {
        session.set_layout(layout)?;
    }

    // Pages are written as they arrive; only the current one is held.
    let mut pages = 0;
    let total_cells = session.for_each_page(|session, cells| -> CliResult<()> {
        let rows = page_rows(session, cells)?;
        pages += 1;
        write_line(out, &json!({ "page": pages, "cells": cells, "rows": rows }))
    })?;

    let summary = QuerySummary {
        total_cells,
        pages,
        results_complete: session.results_complete(),
    };
    write_line(out, &serde_json::to_value(&summary)?)?;
    info!(
        session = session.name(),
        total_cells, pages = summary.pages, "query finished"
    );
    Ok(summary)
}

/// Rows of the current page keyed by column name; nulls become JSON null
fn page_rows(session: &ManagedQuery, cells: usize) -> SessionResult<Vec<Value>> {
    let buffers = session.buffers();
    (0..cells)
        .map(|index| {
            let mut row = Map::new();
            for (name, buffer) in buffers.iter() {
                let value = buffer
                    .scalar_at(index)
                    .map_err(|source| SessionError::Buffer {
                        session: session.name().to_string(),
                        source,
                    })?;
                row.insert(name.to_string(), value.map_or(Value::Null, |v| v.to_json()));
            }
            Ok(Value::Object(row))
        })
        .collect()
}

/// Parses `dim=lo:hi` against the dimension's datatype
fn parse_range(schema: &ArraySchema, arg: &str) -> CliResult<(String, Scalar, Scalar)> {
    let (dim, bounds) = arg
        .split_once('=')
        .ok_or_else(|| CliError::invalid_argument(format!("range '{}' is not dim=lo:hi", arg)))?;
    let (lo, hi) = bounds
        .split_once(':')
        .ok_or_else(|| CliError::invalid_argument(format!("range '{}' is not dim=lo:hi", arg)))?;
    Ok((
        dim.to_string(),
        parse_coordinate(schema, dim, lo)?,
        parse_coordinate(schema, dim, hi)?,
    ))
}

/// Parses `dim=value` against the dimension's datatype
fn parse_point(schema: &ArraySchema, arg: &str) -> CliResult<(String, Scalar)> {
    let (dim, value) = arg
        .split_once('=')
        .ok_or_else(|| CliError::invalid_argument(format!("point '{}' is not dim=value", arg)))?;
    Ok((dim.to_string(), parse_coordinate(schema, dim, value)?))
}

fn parse_coordinate(schema: &ArraySchema, dim: &str, text: &str) -> CliResult<Scalar> {
    let dimension = schema
        .dimension(dim)
        .ok_or_else(|| CliError::invalid_argument(format!("unknown dimension '{}'", dim)))?;
    Scalar::parse_as(dimension.datatype, text).ok_or_else(|| {
        CliError::invalid_argument(format!(
            "'{}' is not a valid {} coordinate for '{}'",
            text, dimension.datatype, dim
        ))
    })
}
