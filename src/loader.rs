//! Loading of FEA result files into a [`ResultRecord`].
//!
//! The format is picked from the file extension:
//!
//! - `.csv`: tabular export with optional named columns, see [`crate::tabular`].
//! - `.vtk`: point set with attached point data, read through a [`MeshReader`].
//!
//! # Example
//!
//! ```no_run
//! use implant_stress::{load, ScalarField};
//!
//! let record = load("results/plate.csv").unwrap();
//! if let Some(stress) = record.field(ScalarField::VonMises) {
//!     println!("{} nodes with von Mises stress", stress.len());
//! }
//! ```

use log::info;
use nalgebra::Point3;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::LoadError;
use crate::record::{synthesize_node_ids, ResultRecord, ScalarField};
use crate::tabular::read_table;
use crate::vtk::LegacyVtkReader;

/// Supported result file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultFormat {
    /// Comma separated table, one row per node.
    Tabular,
    /// Point set with named point-data arrays.
    Mesh,
}

impl ResultFormat {
    /// Detect format from the file extension, ignoring case.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Tabular),
            "vtk" => Some(Self::Mesh),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Tabular => "CSV",
            Self::Mesh => "VTK",
        }
    }
}

/// Points and single-component point-data arrays read from a mesh file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointMesh {
    pub points: Vec<Point3<f64>>,
    /// Arrays keyed by their name in the file, each one value per point.
    pub point_data: BTreeMap<String, Vec<f64>>,
}

/// Capability to read a mesh or point-cloud file.
///
/// The loader only needs points and named point data, so any mesh library can
/// be plugged in behind this trait.
pub trait MeshReader {
    fn read_mesh(&self, path: &Path) -> Result<PointMesh, LoadError>;
}

/// Loads result files, dispatching on [`ResultFormat`].
pub struct ResultLoader {
    mesh_reader: Option<Box<dyn MeshReader>>,
}

impl Default for ResultLoader {
    fn default() -> Self {
        ResultLoader::with_mesh_reader(LegacyVtkReader)
    }
}

impl ResultLoader {
    /// A loader that reads meshes with `reader`.
    pub fn with_mesh_reader<R: MeshReader + 'static>(reader: R) -> Self {
        ResultLoader {
            mesh_reader: Some(Box::new(reader)),
        }
    }

    /// A loader without mesh support; mesh files fail with
    /// [`LoadError::ReaderUnavailable`].
    pub fn without_mesh_reader() -> Self {
        ResultLoader { mesh_reader: None }
    }

    /// Reads `path` into a [`ResultRecord`].
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<ResultRecord, LoadError> {
        let path = path.as_ref();
        let format = ResultFormat::from_path(path).ok_or_else(|| LoadError::UnsupportedFormat {
            extension: path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("(none)")
                .to_string(),
        })?;
        info!("Loading {} results from {}", format.name(), path.display());

        let record = match format {
            ResultFormat::Tabular => read_table(path)?,
            ResultFormat::Mesh => {
                let reader = self
                    .mesh_reader
                    .as_deref()
                    .ok_or_else(|| LoadError::ReaderUnavailable {
                        path: path.to_path_buf(),
                        format: format.name(),
                    })?;
                record_from_mesh(path, reader.read_mesh(path)?)?
            }
        };

        info!(
            "Loaded {} nodes with fields [{}]",
            record.node_count(),
            record.fields().map(ScalarField::key).collect::<Vec<_>>().join(", ")
        );
        Ok(record)
    }
}

/// Loads `path` with the default loader.
pub fn load<P: AsRef<Path>>(path: P) -> Result<ResultRecord, LoadError> {
    ResultLoader::default().load(path)
}

/// Copies the recognized point-data arrays into a record with ids `0..N-1`.
fn record_from_mesh(path: &Path, mut mesh: PointMesh) -> Result<ResultRecord, LoadError> {
    let scalar_fields = ScalarField::ALL
        .into_iter()
        .filter_map(|field| {
            mesh.point_data
                .remove(field.source_name())
                .map(|values| (field, values))
        })
        .collect();
    let node_ids = synthesize_node_ids(mesh.points.len());

    ResultRecord::new(node_ids, Some(mesh.points), scalar_fields).map_err(|source| {
        LoadError::InvalidRecord {
            path: path.to_path_buf(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecordError;

    /// Reader returning a fixed mesh, whatever the path.
    struct FixedMesh(PointMesh);

    impl MeshReader for FixedMesh {
        fn read_mesh(&self, _path: &Path) -> Result<PointMesh, LoadError> {
            Ok(self.0.clone())
        }
    }

    fn mesh(arrays: &[(&str, Vec<f64>)]) -> PointMesh {
        PointMesh {
            points: vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)],
            point_data: arrays
                .iter()
                .map(|(name, values)| (name.to_string(), values.clone()))
                .collect(),
        }
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ResultFormat::from_path("plate.csv"), Some(ResultFormat::Tabular));
        assert_eq!(ResultFormat::from_path("plate.CSV"), Some(ResultFormat::Tabular));
        assert_eq!(ResultFormat::from_path("/runs/7/plate.vtk"), Some(ResultFormat::Mesh));
        assert_eq!(ResultFormat::from_path("plate.vtu"), None);
        assert_eq!(ResultFormat::from_path("plate"), None);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = load("plate.rst").unwrap_err();
        assert!(err.is_unsupported_format());
        assert!(matches!(err, LoadError::UnsupportedFormat { extension } if extension == "rst"));

        let err = load("plate").unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFormat { extension } if extension == "(none)"));
    }

    #[test]
    fn test_mesh_without_reader_is_load_failure() {
        let err = ResultLoader::without_mesh_reader().load("plate.vtk").unwrap_err();
        match &err {
            LoadError::ReaderUnavailable { path, format } => {
                assert_eq!(path, Path::new("plate.vtk"));
                assert_eq!(*format, "VTK");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            err.to_string(),
            "no reader available for VTK files, cannot load plate.vtk"
        );
        assert!(!err.is_unsupported_format());
    }

    #[test]
    fn test_mesh_arrays_map_to_fields() {
        let loader = ResultLoader::with_mesh_reader(FixedMesh(mesh(&[
            ("von_Mises", vec![5.0, 6.0]),
            ("USum", vec![0.1, 0.2]),
            ("s1", vec![1.0, 1.0]),
            ("Temperature", vec![37.0, 37.0]),
        ])));
        let record = loader.load("plate.vtk").expect("mesh loads");

        assert_eq!(record.node_ids(), &[0, 1]);
        assert_eq!(record.coordinates().map(<[_]>::len), Some(2));
        assert_eq!(
            record.fields().collect::<Vec<_>>(),
            vec![ScalarField::VonMises, ScalarField::Displacement]
        );
        assert_eq!(record.field(ScalarField::Displacement), Some(&[0.1, 0.2][..]));
    }

    #[test]
    fn test_mesh_array_length_mismatch() {
        let loader = ResultLoader::with_mesh_reader(FixedMesh(mesh(&[("S3", vec![1.0])])));
        let err = loader.load("plate.vtk").unwrap_err();
        match err {
            LoadError::InvalidRecord { source, .. } => assert_eq!(
                source,
                RecordError::LengthMismatch { what: "min_principal".into(), expected: 2, got: 1 }
            ),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
