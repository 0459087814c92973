//! Reader for legacy ASCII VTK files (`.vtk`).
//!
//! Only what the loader needs is extracted: the point set and the
//! single-component point-data arrays. Topology, cell data and multi-component
//! attributes are skipped. Binary legacy files are rejected.

use log::debug;
use nalgebra::Point3;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::LoadError;
use crate::loader::{MeshReader, PointMesh};

/// Largest structured or rectilinear grid synthesized without point data of
/// the same length backing it.
const MAX_UNBACKED_GRID_POINTS: usize = 1 << 20;

/// [`MeshReader`] for the legacy VTK file format, ASCII variant.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyVtkReader;

impl MeshReader for LegacyVtkReader {
    fn read_mesh(&self, path: &Path) -> Result<PointMesh, LoadError> {
        let bytes = fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let text = String::from_utf8_lossy(&bytes);
        parse_legacy_vtk(path, &text)
    }
}

/// Which attribute section the parser is in.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Geometry,
    PointData(usize),
    CellData(usize),
}

impl Section {
    fn len(self) -> Option<usize> {
        match self {
            Section::Geometry => None,
            Section::PointData(n) | Section::CellData(n) => Some(n),
        }
    }
}

/// Whitespace separated tokens, each tagged with its 1-based line number.
struct Tokens<'a> {
    path: &'a Path,
    items: Vec<(usize, &'a str)>,
    pos: usize,
}

impl<'a> Tokens<'a> {
    fn new<I>(path: &'a Path, lines: I) -> Self
    where
        I: Iterator<Item = (usize, &'a str)>,
    {
        let mut items = Vec::new();
        let mut in_metadata = false;
        for (line, text) in lines {
            let trimmed = text.trim();
            if in_metadata {
                in_metadata = !trimmed.is_empty();
                continue;
            }
            if trimmed.eq_ignore_ascii_case("METADATA") {
                in_metadata = true;
                continue;
            }
            items.extend(trimmed.split_whitespace().map(|token| (line, token)));
        }
        Tokens { path, items, pos: 0 }
    }

    fn next(&mut self) -> Option<(usize, &'a str)> {
        let item = self.items.get(self.pos).copied();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    fn peek(&self) -> Option<&'a str> {
        self.items.get(self.pos).map(|(_, token)| *token)
    }

    fn last_line(&self) -> usize {
        self.items.last().map(|(line, _)| *line).unwrap_or(1)
    }

    fn error(&self, line: usize, message: impl Into<String>) -> LoadError {
        LoadError::parse(self.path, line, message)
    }

    fn word(&mut self, what: &str) -> Result<(usize, &'a str), LoadError> {
        self.next().ok_or_else(|| {
            self.error(self.last_line(), format!("unexpected end of file, expected {what}"))
        })
    }

    fn count(&mut self, what: &str) -> Result<usize, LoadError> {
        let (line, token) = self.word(what)?;
        token
            .parse()
            .map_err(|_| self.error(line, format!("expected {what}, got '{token}'")))
    }

    fn number(&mut self, what: &str) -> Result<f64, LoadError> {
        let (line, token) = self.word(what)?;
        token
            .parse()
            .map_err(|_| self.error(line, format!("expected {what}, got '{token}'")))
    }

    fn remaining(&self) -> usize {
        self.items.len() - self.pos
    }

    fn numbers(&mut self, n: usize, what: &str) -> Result<Vec<f64>, LoadError> {
        if self.remaining() < n {
            return Err(self.error(
                self.last_line(),
                format!("unexpected end of file while reading {what}"),
            ));
        }
        (0..n).map(|_| self.number(what)).collect()
    }

    /// `a * b` for counts read from the file.
    fn product(&self, line: usize, a: usize, b: usize, what: &str) -> Result<usize, LoadError> {
        a.checked_mul(b)
            .ok_or_else(|| self.error(line, format!("{what} too large")))
    }

    fn triple(&mut self, what: &str) -> Result<[f64; 3], LoadError> {
        Ok([self.number(what)?, self.number(what)?, self.number(what)?])
    }

    fn skip(&mut self, n: usize, what: &str) -> Result<(), LoadError> {
        if self.remaining() < n {
            return Err(self.error(
                self.last_line(),
                format!("unexpected end of file while reading {what}"),
            ));
        }
        self.pos += n;
        Ok(())
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), LoadError> {
        let (line, token) = self.word(keyword)?;
        if token.eq_ignore_ascii_case(keyword) {
            Ok(())
        } else {
            Err(self.error(line, format!("expected {keyword}, got '{token}'")))
        }
    }

    /// Skips a topology block in either the classic or the 5.x offsets layout.
    fn skip_topology(&mut self, keyword: &str) -> Result<(), LoadError> {
        let count = self.count("cell count")?;
        let size = self.count("cell list size")?;
        if self.peek().is_some_and(|t| t.eq_ignore_ascii_case("OFFSETS")) {
            self.skip(2, "OFFSETS header")?;
            self.skip(count, "cell offsets")?;
            self.expect_keyword("CONNECTIVITY")?;
            self.word("connectivity data type")?;
            self.skip(size, "cell connectivity")
        } else {
            self.skip(size, keyword)
        }
    }
}

/// Geometry sources a dataset may define points with.
#[derive(Debug, Default)]
struct Geometry {
    points: Option<Vec<Point3<f64>>>,
    dimensions: Option<(usize, [usize; 3])>,
    origin: Option<[f64; 3]>,
    spacing: Option<[f64; 3]>,
    axes: [Option<Vec<f64>>; 3],
}

impl Geometry {
    /// The explicit points, or the grid points synthesized from the axes or
    /// the dimensions. A grid larger than `limit` points is rejected.
    fn into_points(
        self,
        path: &Path,
        limit: usize,
    ) -> Result<Option<Vec<Point3<f64>>>, LoadError> {
        if self.points.is_some() {
            return Ok(self.points);
        }
        let line = self.dimensions.map_or(1, |(line, _)| line);
        let check = |count: Option<usize>| match count {
            Some(n) if n <= limit => Ok(n),
            _ => Err(LoadError::parse(
                path,
                line,
                "grid too large for the point data in the file",
            )),
        };
        if let [Some(xs), Some(ys), Some(zs)] = &self.axes {
            check(xs.len().checked_mul(ys.len()).and_then(|n| n.checked_mul(zs.len())))?;
            return Ok(Some(
                zs.iter()
                    .flat_map(|&z| {
                        ys.iter()
                            .flat_map(move |&y| xs.iter().map(move |&x| Point3::new(x, y, z)))
                    })
                    .collect(),
            ));
        }
        let Some((_, [nx, ny, nz])) = self.dimensions else {
            return Ok(None);
        };
        let count = check(nx.checked_mul(ny).and_then(|n| n.checked_mul(nz)))?;
        let origin = self.origin.unwrap_or([0.0; 3]);
        let spacing = self.spacing.unwrap_or([1.0; 3]);
        let mut points = Vec::with_capacity(count);
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    points.push(Point3::new(
                        origin[0] + spacing[0] * i as f64,
                        origin[1] + spacing[1] * j as f64,
                        origin[2] + spacing[2] * k as f64,
                    ));
                }
            }
        }
        Ok(Some(points))
    }
}

/// Parses the text of a legacy VTK file.
pub fn parse_legacy_vtk(path: &Path, text: &str) -> Result<PointMesh, LoadError> {
    let mut lines = text.lines().enumerate().map(|(idx, line)| (idx + 1, line));

    match lines.next() {
        Some((_, line)) if line.trim_start().to_ascii_lowercase().starts_with("# vtk datafile") => {}
        _ => return Err(LoadError::parse(path, 1, "missing '# vtk DataFile' header")),
    }
    let _title = lines.next();
    match lines.next().map(|(line, text)| (line, text.trim())) {
        Some((_, encoding)) if encoding.eq_ignore_ascii_case("ASCII") => {}
        Some((line, encoding)) if encoding.eq_ignore_ascii_case("BINARY") => {
            return Err(LoadError::parse(
                path,
                line,
                "binary legacy VTK files are not supported, export as ASCII",
            ))
        }
        Some((line, encoding)) => {
            return Err(LoadError::parse(
                path,
                line,
                format!("expected ASCII or BINARY, got '{encoding}'"),
            ))
        }
        None => return Err(LoadError::parse(path, 3, "missing ASCII/BINARY line")),
    }

    let mut tokens = Tokens::new(path, lines);
    let mut geometry = Geometry::default();
    let mut section = Section::Geometry;
    let mut declared_points: Option<(usize, usize)> = None;
    let mut point_data = BTreeMap::new();

    while let Some((line, keyword)) = tokens.next() {
        let keyword: Cow<'_, str> = if keyword.bytes().any(|b| b.is_ascii_lowercase()) {
            Cow::Owned(keyword.to_ascii_uppercase())
        } else {
            Cow::Borrowed(keyword)
        };
        match keyword.as_ref() {
            "DATASET" => {
                let (_, kind) = tokens.word("dataset type")?;
                debug!("{}: dataset {kind}", path.display());
            }
            "POINTS" => {
                let n = tokens.count("point count")?;
                tokens.word("point data type")?;
                let len = tokens.product(line, n, 3, "point count")?;
                let coords = tokens.numbers(len, "point coordinate")?;
                geometry.points = Some(
                    coords
                        .chunks_exact(3)
                        .map(|c| Point3::new(c[0], c[1], c[2]))
                        .collect(),
                );
            }
            "DIMENSIONS" => {
                let dims = [
                    tokens.count("dimension")?,
                    tokens.count("dimension")?,
                    tokens.count("dimension")?,
                ];
                tokens.product(line, dims[0], dims[1], "grid dimensions")
                    .and_then(|n| tokens.product(line, n, dims[2], "grid dimensions"))?;
                geometry.dimensions = Some((line, dims));
            }
            "ORIGIN" => geometry.origin = Some(tokens.triple("origin")?),
            "SPACING" | "ASPECT_RATIO" => geometry.spacing = Some(tokens.triple("spacing")?),
            "X_COORDINATES" | "Y_COORDINATES" | "Z_COORDINATES" => {
                let axis = usize::from(keyword.as_bytes()[0] - b'X');
                let n = tokens.count("coordinate count")?;
                tokens.word("coordinate data type")?;
                geometry.axes[axis] = Some(tokens.numbers(n, "coordinate")?);
            }
            "CELLS" | "POLYGONS" | "LINES" | "VERTICES" | "TRIANGLE_STRIPS" => {
                tokens.skip_topology(&keyword)?;
            }
            "CELL_TYPES" => {
                let n = tokens.count("cell type count")?;
                tokens.skip(n, "CELL_TYPES")?;
            }
            "POINT_DATA" => {
                let n = tokens.count("point data count")?;
                declared_points = Some((line, n));
                section = Section::PointData(n);
            }
            "CELL_DATA" => section = Section::CellData(tokens.count("cell data count")?),
            "SCALARS" => {
                let len = attribute_len(&tokens, section, line, "SCALARS")?;
                let (_, name) = tokens.word("array name")?;
                tokens.word("scalar data type")?;
                let components = match tokens.peek().map(str::parse::<usize>) {
                    Some(Ok(n)) => {
                        tokens.next();
                        n
                    }
                    _ => 1,
                };
                if tokens.peek().is_some_and(|t| t.eq_ignore_ascii_case("LOOKUP_TABLE")) {
                    tokens.skip(2, "LOOKUP_TABLE")?;
                }
                let total = tokens.product(line, len, components, "SCALARS array")?;
                let values = tokens.numbers(total, name)?;
                if matches!(section, Section::PointData(_)) && components == 1 {
                    point_data.insert(name.to_string(), values);
                }
            }
            "LOOKUP_TABLE" => {
                tokens.word("lookup table name")?;
                let size = tokens.count("lookup table size")?;
                tokens.skip(tokens.product(line, size, 4, "LOOKUP_TABLE")?, "LOOKUP_TABLE")?;
            }
            "VECTORS" | "NORMALS" | "TENSORS" | "TENSORS6" => {
                let len = attribute_len(&tokens, section, line, &keyword)?;
                tokens.skip(2, "attribute header")?;
                let width = match keyword.as_ref() {
                    "TENSORS" => 9,
                    "TENSORS6" => 6,
                    _ => 3,
                };
                tokens.skip(tokens.product(line, len, width, &keyword)?, &keyword)?;
            }
            "TEXTURE_COORDINATES" => {
                let len = attribute_len(&tokens, section, line, "TEXTURE_COORDINATES")?;
                tokens.word("array name")?;
                let dim = tokens.count("texture dimension")?;
                tokens.word("texture data type")?;
                let total = tokens.product(line, len, dim, "TEXTURE_COORDINATES")?;
                tokens.skip(total, "TEXTURE_COORDINATES")?;
            }
            "COLOR_SCALARS" => {
                let len = attribute_len(&tokens, section, line, "COLOR_SCALARS")?;
                tokens.word("array name")?;
                let width = tokens.count("color component count")?;
                tokens.skip(tokens.product(line, len, width, "COLOR_SCALARS")?, "COLOR_SCALARS")?;
            }
            "FIELD" => {
                tokens.word("field name")?;
                let arrays = tokens.count("field array count")?;
                for _ in 0..arrays {
                    let (array_line, name) = tokens.word("array name")?;
                    let components = tokens.count("component count")?;
                    let tuples = tokens.count("tuple count")?;
                    tokens.word("array data type")?;
                    let total = tokens.product(array_line, components, tuples, "FIELD array")?;
                    let values = tokens.numbers(total, name)?;
                    if matches!(section, Section::PointData(_)) && components == 1 {
                        point_data.insert(name.to_string(), values);
                    }
                }
            }
            other => return Err(tokens.error(line, format!("unexpected keyword '{other}'"))),
        }
    }

    let backed = point_data.values().map(Vec::len).max().unwrap_or(0);
    let points = geometry
        .into_points(path, backed.max(MAX_UNBACKED_GRID_POINTS))?
        .ok_or_else(|| LoadError::parse(path, 1, "file defines no point set"))?;
    if let Some((line, n)) = declared_points {
        if n != points.len() {
            return Err(LoadError::parse(
                path,
                line,
                format!("POINT_DATA declares {n} points but the point set has {}", points.len()),
            ));
        }
    }
    debug!(
        "{}: {} points, point data [{}]",
        path.display(),
        points.len(),
        point_data.keys().cloned().collect::<Vec<_>>().join(", ")
    );

    Ok(PointMesh { points, point_data })
}

fn attribute_len(
    tokens: &Tokens<'_>,
    section: Section,
    line: usize,
    keyword: &str,
) -> Result<usize, LoadError> {
    section
        .len()
        .ok_or_else(|| tokens.error(line, format!("{keyword} outside POINT_DATA or CELL_DATA")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn parse(text: &str) -> Result<PointMesh, LoadError> {
        parse_legacy_vtk(Path::new("test.vtk"), text)
    }

    const UNSTRUCTURED: &str = "# vtk DataFile Version 3.0
plate results
ASCII
DATASET UNSTRUCTURED_GRID
POINTS 4 float
0 0 0  1 0 0
0 1 0  0 0 1
CELLS 1 5
4 0 1 2 3
CELL_TYPES 1
10
POINT_DATA 4
SCALARS von_Mises float 1
LOOKUP_TABLE default
10.0 20.0 30.0 40.0
VECTORS U float
0 0 0 0 0 0 0 0 0 0 0 0
FIELD FieldData 2
S1 1 4 double
1 2 3 4
Stress 6 4 double
0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0
CELL_DATA 1
SCALARS USum float
LOOKUP_TABLE default
7.0
";

    #[test]
    fn test_reads_points_and_point_scalars() {
        let mesh = parse(UNSTRUCTURED).expect("mesh parses");
        assert_eq!(mesh.points.len(), 4);
        assert_eq!(mesh.points[3], Point3::new(0.0, 0.0, 1.0));
        assert_eq!(mesh.point_data["von_Mises"], vec![10.0, 20.0, 30.0, 40.0]);
        assert_eq!(mesh.point_data["S1"], vec![1.0, 2.0, 3.0, 4.0]);
        assert!(!mesh.point_data.contains_key("Stress"), "multi-component arrays are skipped");
        assert!(!mesh.point_data.contains_key("USum"), "cell data is not point data");
        assert!(!mesh.point_data.contains_key("U"));
    }

    #[test]
    fn test_reads_vtk5_offsets_layout_and_metadata() {
        let text = "# vtk DataFile Version 5.1
vtk output
ASCII
DATASET UNSTRUCTURED_GRID
POINTS 3 float
0 0 0 1 0 0 0 1 0
METADATA
INFORMATION 0

CELLS 2 3
OFFSETS vtktypeint64
0 3
CONNECTIVITY vtktypeint64
0 1 2
CELL_TYPES 1
5
POINT_DATA 3
SCALARS S3 double 1
LOOKUP_TABLE default
-1.5 -2.5 -3.5
";
        let mesh = parse(text).expect("mesh parses");
        assert_eq!(mesh.points.len(), 3);
        assert_eq!(mesh.point_data["S3"], vec![-1.5, -2.5, -3.5]);
    }

    #[test]
    fn test_structured_points_are_synthesized() {
        let text = "# vtk DataFile Version 3.0
grid
ASCII
DATASET STRUCTURED_POINTS
DIMENSIONS 2 2 1
ORIGIN 1 1 0
SPACING 0.5 2 1
POINT_DATA 4
SCALARS von_Mises float
LOOKUP_TABLE default
1 2 3 4
";
        let mesh = parse(text).expect("mesh parses");
        assert_eq!(mesh.points.len(), 4);
        assert_relative_eq!(mesh.points[1].x, 1.5);
        assert_relative_eq!(mesh.points[2].y, 3.0);
    }

    #[test]
    fn test_rectilinear_grid_points() {
        let text = "# vtk DataFile Version 3.0
grid
ASCII
DATASET RECTILINEAR_GRID
DIMENSIONS 2 1 1
X_COORDINATES 2 float
0 5
Y_COORDINATES 1 float
1
Z_COORDINATES 1 float
2
";
        let mesh = parse(text).expect("mesh parses");
        assert_eq!(mesh.points, vec![Point3::new(0.0, 1.0, 2.0), Point3::new(5.0, 1.0, 2.0)]);
        assert!(mesh.point_data.is_empty());
    }

    #[test]
    fn test_rejects_binary_and_bad_header() {
        let err = parse("# vtk DataFile Version 3.0\nx\nBINARY\n").unwrap_err();
        assert!(err.to_string().contains("binary"), "{err}");

        let err = parse("solid plate\n").unwrap_err();
        assert!(matches!(err, LoadError::Parse { line: 1, .. }), "{err:?}");
    }

    #[test]
    fn test_point_data_count_must_match() {
        let text = "# vtk DataFile Version 3.0
t
ASCII
DATASET POLYDATA
POINTS 2 float
0 0 0 1 1 1
POINT_DATA 3
SCALARS von_Mises float 1
LOOKUP_TABLE default
1 2 3
";
        let err = parse(text).unwrap_err();
        assert!(matches!(err, LoadError::Parse { line: 7, .. }), "{err:?}");
    }

    fn header(body: &str) -> String {
        format!("# vtk DataFile Version 3.0\nt\nASCII\n{body}")
    }

    fn assert_parse_error(text: &str, needle: &str) {
        match parse(text) {
            Err(LoadError::Parse { message, .. }) => {
                assert!(message.contains(needle), "{message}")
            }
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_huge_point_count_fails_cleanly() {
        let overflowing = header("DATASET POLYDATA\nPOINTS 9223372036854775807 float\n0 0 0\n");
        assert_parse_error(&overflowing, "too large");

        let unbacked = header("DATASET POLYDATA\nPOINTS 1000000000000 float\n0 0 0\n");
        assert_parse_error(&unbacked, "unexpected end of file");
    }

    #[test]
    fn test_overflowing_dimensions_fail_cleanly() {
        let text = header("DATASET STRUCTURED_POINTS\nDIMENSIONS 4294967296 4294967296 2\n");
        assert_parse_error(&text, "too large");
    }

    #[test]
    fn test_huge_grid_without_data_fails_cleanly() {
        let text = header("DATASET STRUCTURED_POINTS\nDIMENSIONS 100000 100000 10\n");
        assert_parse_error(&text, "too large");
    }

    #[test]
    fn test_overflowing_array_size_fails_cleanly() {
        let text = header(
            "DATASET RECTILINEAR_GRID\nDIMENSIONS 2 1 1\nX_COORDINATES 2 float\n0 1\n\
             Y_COORDINATES 1 float\n0\nZ_COORDINATES 1 float\n0\n\
             POINT_DATA 2\nSCALARS v float 9223372036854775807\n1 2\n",
        );
        assert_parse_error(&text, "too large");
    }

    #[test]
    fn test_truncated_array_fails() {
        let text = "# vtk DataFile Version 3.0
t
ASCII
DATASET POLYDATA
POINTS 2 float
0 0 0 1 1 1
POINT_DATA 2
SCALARS von_Mises float 1
LOOKUP_TABLE default
1
";
        let err = parse(text).unwrap_err();
        assert!(err.to_string().contains("unexpected end of file"), "{err}");
    }
}
