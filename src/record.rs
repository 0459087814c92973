//! The canonical in-memory form of an FEA result file.
//!
//! Every supported input schema is normalized into a [`ResultRecord`]: a list of
//! node identifiers, optional node coordinates and up to four named scalar fields.
//! A field that the source file does not provide is absent from the record; it is
//! never filled with zeros or NaNs.

use nalgebra::Point3;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::error::RecordError;

/// The scalar fields the loader knows how to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarField {
    /// Equivalent (von Mises) stress in MPa.
    VonMises,
    /// Maximum principal stress (S1) in MPa.
    MaxPrincipal,
    /// Minimum principal stress (S3) in MPa.
    MinPrincipal,
    /// Displacement magnitude (USum).
    Displacement,
}

impl ScalarField {
    /// All fields, in canonical order.
    pub const ALL: [ScalarField; 4] = [
        ScalarField::VonMises,
        ScalarField::MaxPrincipal,
        ScalarField::MinPrincipal,
        ScalarField::Displacement,
    ];

    /// Key used for the field inside the record and in reports.
    pub const fn key(self) -> &'static str {
        match self {
            ScalarField::VonMises => "von_mises",
            ScalarField::MaxPrincipal => "max_principal",
            ScalarField::MinPrincipal => "min_principal",
            ScalarField::Displacement => "displacement",
        }
    }

    /// Column / point-data array name used by the solver exports.
    ///
    /// Matching against input files is exact and case-sensitive.
    pub const fn source_name(self) -> &'static str {
        match self {
            ScalarField::VonMises => "von_Mises",
            ScalarField::MaxPrincipal => "S1",
            ScalarField::MinPrincipal => "S3",
            ScalarField::Displacement => "USum",
        }
    }

    /// Resolves an external column or array name to a field.
    pub fn from_source_name(name: &str) -> Option<ScalarField> {
        ScalarField::ALL
            .into_iter()
            .find(|field| field.source_name() == name)
    }
}

impl fmt::Display for ScalarField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Nodes, optional coordinates and scalar fields of one FEA result.
///
/// The record is immutable once built. [`ResultRecord::new`] is the only way to
/// construct one with explicit data and it enforces that every sequence has the
/// same length and that node ids are unique.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    node_ids: Vec<i64>,
    coordinates: Option<Vec<Point3<f64>>>,
    scalar_fields: BTreeMap<ScalarField, Vec<f64>>,
}

impl ResultRecord {
    /// Builds a record, checking lengths against `node_ids` and id uniqueness.
    pub fn new(
        node_ids: Vec<i64>,
        coordinates: Option<Vec<Point3<f64>>>,
        scalar_fields: BTreeMap<ScalarField, Vec<f64>>,
    ) -> Result<Self, RecordError> {
        let expected = node_ids.len();

        if let Some(coordinates) = &coordinates {
            if coordinates.len() != expected {
                return Err(RecordError::LengthMismatch {
                    what: "coordinates".into(),
                    expected,
                    got: coordinates.len(),
                });
            }
        }
        for (field, values) in &scalar_fields {
            if values.len() != expected {
                return Err(RecordError::LengthMismatch {
                    what: field.key().into(),
                    expected,
                    got: values.len(),
                });
            }
        }

        let mut seen = HashSet::with_capacity(expected);
        for &id in &node_ids {
            if !seen.insert(id) {
                return Err(RecordError::DuplicateNodeId(id));
            }
        }

        Ok(ResultRecord {
            node_ids,
            coordinates,
            scalar_fields,
        })
    }

    /// Builds a record holding a single field, with node ids `0..N-1`.
    pub fn from_field(field: ScalarField, values: Vec<f64>) -> Self {
        ResultRecord {
            node_ids: synthesize_node_ids(values.len()),
            coordinates: None,
            scalar_fields: BTreeMap::from([(field, values)]),
        }
    }

    /// Number of nodes (N).
    pub fn node_count(&self) -> usize {
        self.node_ids.len()
    }

    pub fn node_ids(&self) -> &[i64] {
        &self.node_ids
    }

    pub fn coordinates(&self) -> Option<&[Point3<f64>]> {
        self.coordinates.as_deref()
    }

    /// Values of `field`, or `None` when the source did not provide it.
    pub fn field(&self, field: ScalarField) -> Option<&[f64]> {
        self.scalar_fields.get(&field).map(Vec::as_slice)
    }

    pub fn has_field(&self, field: ScalarField) -> bool {
        self.scalar_fields.contains_key(&field)
    }

    /// The fields present in this record, in canonical order.
    pub fn fields(&self) -> impl Iterator<Item = ScalarField> + '_ {
        self.scalar_fields.keys().copied()
    }
}

/// Node ids for sources that do not carry explicit ones.
pub(crate) fn synthesize_node_ids(count: usize) -> Vec<i64> {
    (0..count as i64).collect()
}
