// src/lib.rs

#[cfg(feature = "wasm")]
use wasm_bindgen::prelude::*;

pub mod app_logic;
pub mod config;
pub mod error;
pub mod loader;
pub mod material;
pub mod output;
pub mod plot;
pub mod record;
pub mod report;
pub mod stress;
pub mod tabular;
pub mod vtk;

pub use config::{load_config, Config, HistogramConfig};
pub use error::{AnalysisError, LoadError, RecordError};
pub use loader::{load, MeshReader, PointMesh, ResultFormat, ResultLoader};
pub use material::{MaterialLimits, MaterialLookup, MaterialTable};
pub use record::{ResultRecord, ScalarField};
pub use stress::{AnalysisReport, StressAnalyzer, StressStats};
pub use vtk::LegacyVtkReader;

// When the "wasm" feature is enabled, expose the statistics to the host environment.
// The ten values come back flat, in `StressStats` field order.
#[cfg(feature = "wasm")]
#[wasm_bindgen]
pub fn stress_statistics(von_mises: &[f64], material: &str) -> Result<Vec<f64>, JsValue> {
    let limits = MaterialTable::builtin().lookup(material).limits;
    let stats =
        StressStats::compute(von_mises, &limits).map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(stats.entries().iter().map(|(_, value)| *value).collect())
}
