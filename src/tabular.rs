//! Reader for tabular (CSV) result exports.
//!
//! Every canonical column is optional and detected by its exact header name:
//!
//! | column      | record entry                 |
//! |-------------|------------------------------|
//! | `Node`      | node ids                     |
//! | `X` `Y` `Z` | coordinates (all three)      |
//! | `von_Mises` | [`ScalarField::VonMises`]     |
//! | `S1`        | [`ScalarField::MaxPrincipal`] |
//! | `S3`        | [`ScalarField::MinPrincipal`] |
//! | `USum`      | [`ScalarField::Displacement`] |
//!
//! Other columns are ignored.

use log::debug;
use nalgebra::Point3;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use crate::error::LoadError;
use crate::record::{synthesize_node_ids, ResultRecord, ScalarField};

const NODE_COLUMN: &str = "Node";
const AXIS_COLUMNS: [&str; 3] = ["X", "Y", "Z"];

/// Positions of the recognized columns within the header row.
#[derive(Debug, Default)]
struct Columns {
    node: Option<usize>,
    axes: Option<[usize; 3]>,
    fields: Vec<(ScalarField, usize)>,
}

impl Columns {
    fn detect(headers: &csv::StringRecord) -> Self {
        let position = |name: &str| headers.iter().position(|h| h == name);
        let axes = match AXIS_COLUMNS.map(position) {
            [Some(x), Some(y), Some(z)] => Some([x, y, z]),
            _ => None,
        };
        let fields = ScalarField::ALL
            .into_iter()
            .filter_map(|field| position(field.source_name()).map(|idx| (field, idx)))
            .collect();

        Columns {
            node: position(NODE_COLUMN),
            axes,
            fields,
        }
    }
}

/// Reads a CSV result table into a [`ResultRecord`].
pub fn read_table(path: &Path) -> Result<ResultRecord, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|source| csv_error(path, source))?
        .clone();
    let columns = Columns::detect(&headers);
    debug!(
        "{}: node column {}, coordinates {}, fields [{}]",
        path.display(),
        if columns.node.is_some() { "found" } else { "missing" },
        if columns.axes.is_some() { "found" } else { "missing" },
        columns
            .fields
            .iter()
            .map(|(field, _)| field.source_name())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let mut node_ids = Vec::new();
    let mut coordinates = Vec::new();
    let mut values: Vec<Vec<f64>> = vec![Vec::new(); columns.fields.len()];
    let mut row_count = 0;

    for row in reader.records() {
        let row = row.map_err(|source| csv_error(path, source))?;
        let line = row
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(row_count + 2);

        if let Some(idx) = columns.node {
            node_ids.push(parse_node_id(path, line, &row[idx])?);
        }
        if let Some([x, y, z]) = columns.axes {
            coordinates.push(Point3::new(
                parse_value(path, line, "X", &row[x])?,
                parse_value(path, line, "Y", &row[y])?,
                parse_value(path, line, "Z", &row[z])?,
            ));
        }
        for ((field, idx), column) in columns.fields.iter().zip(values.iter_mut()) {
            column.push(parse_value(path, line, field.source_name(), &row[*idx])?);
        }
        row_count += 1;
    }

    if columns.node.is_none() {
        node_ids = synthesize_node_ids(row_count);
    }
    let coordinates = columns.axes.map(|_| coordinates);
    let scalar_fields: BTreeMap<_, _> = columns
        .fields
        .iter()
        .map(|(field, _)| *field)
        .zip(values)
        .collect();

    ResultRecord::new(node_ids, coordinates, scalar_fields).map_err(|source| {
        LoadError::InvalidRecord {
            path: path.to_path_buf(),
            source,
        }
    })
}

fn csv_error(path: &Path, source: csv::Error) -> LoadError {
    LoadError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

/// Blank cells are rejected rather than read as missing values.
fn parse_value(path: &Path, line: usize, column: &str, cell: &str) -> Result<f64, LoadError> {
    if cell.is_empty() {
        return Err(LoadError::parse(path, line, format!("column {column}: empty cell")));
    }
    cell.parse::<f64>().map_err(|_| {
        LoadError::parse(path, line, format!("column {column}: '{cell}' is not a number"))
    })
}

/// Node ids are integers; exports that write them as `12.0` are accepted too.
fn parse_node_id(path: &Path, line: usize, cell: &str) -> Result<i64, LoadError> {
    if let Ok(id) = cell.parse::<i64>() {
        return Ok(id);
    }
    match cell.parse::<f64>() {
        Ok(value) if value.fract() == 0.0 && value.abs() < i64::MAX as f64 => Ok(value as i64),
        _ => Err(LoadError::parse(
            path,
            line,
            format!("column {NODE_COLUMN}: '{cell}' is not a node id"),
        )),
    }
}
