//! Strength limits of the materials an implant model is made of.

use anyhow::{anyhow, Result};
use log::warn;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Entry used when a material name is not in the table.
pub const FALLBACK_MATERIAL: &str = "bone";

const BONE_LIMITS: MaterialLimits = MaterialLimits::new(80.0, 120.0);

/// Yield and ultimate strength of a material, in MPa.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaterialLimits {
    /// Stress at which permanent deformation begins.
    pub yield_stress: f64,
    /// Stress at which the material is expected to fracture.
    pub ultimate_stress: f64,
}

impl MaterialLimits {
    pub const fn new(yield_stress: f64, ultimate_stress: f64) -> Self {
        MaterialLimits {
            yield_stress,
            ultimate_stress,
        }
    }

    /// Validates the limits.
    ///
    /// Both stresses must be finite and positive, and the ultimate stress may
    /// not be lower than the yield stress.
    pub fn validate(&self) -> Result<()> {
        if !(self.yield_stress.is_finite() && self.yield_stress > 0.0) {
            return Err(anyhow!("yield_stress must be greater than 0.0, got {}", self.yield_stress));
        }
        if !(self.ultimate_stress.is_finite() && self.ultimate_stress > 0.0) {
            return Err(anyhow!("ultimate_stress must be greater than 0.0, got {}", self.ultimate_stress));
        }
        if self.ultimate_stress < self.yield_stress {
            return Err(anyhow!(
                "ultimate_stress ({}) must not be lower than yield_stress ({})",
                self.ultimate_stress,
                self.yield_stress
            ));
        }
        Ok(())
    }
}

/// Result of looking a material up in a [`MaterialTable`].
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialLookup {
    /// Name the caller asked for.
    pub requested: String,
    /// Table entry the limits come from.
    pub resolved: String,
    pub limits: MaterialLimits,
    /// `true` when `requested` was unknown and the bone entry was used.
    pub fallback: bool,
}

/// Immutable name → limits table.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialTable {
    entries: BTreeMap<String, MaterialLimits>,
}

impl Default for MaterialTable {
    fn default() -> Self {
        MaterialTable::builtin()
    }
}

impl MaterialTable {
    /// Cortical bone, titanium plate, nickel-titanium plate and titanium screws.
    pub fn builtin() -> Self {
        let entries = [
            (FALLBACK_MATERIAL, BONE_LIMITS),
            ("titanium", MaterialLimits::new(800.0, 900.0)),
            ("niti", MaterialLimits::new(195.0, 754.0)),
            ("screw", MaterialLimits::new(800.0, 900.0)),
        ]
        .into_iter()
        .map(|(name, limits)| (name.to_string(), limits))
        .collect();
        MaterialTable { entries }
    }

    /// A copy of this table where `overrides` replace or extend the entries.
    ///
    /// Names are lower-cased; each name and each set of limits is validated.
    pub fn with_overrides(&self, overrides: &BTreeMap<String, MaterialLimits>) -> Result<Self> {
        let name_pattern = Regex::new(r"^[a-z][a-z0-9_]*$")?;
        let mut entries = self.entries.clone();
        for (name, limits) in overrides {
            let name = name.to_lowercase();
            if !name_pattern.is_match(&name) {
                return Err(anyhow!(
                    "material name '{name}' must start with a letter and contain only letters, digits and '_'"
                ));
            }
            limits
                .validate()
                .map_err(|e| anyhow!("material '{name}': {e}"))?;
            entries.insert(name, *limits);
        }
        Ok(MaterialTable { entries })
    }

    /// Strict, case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<MaterialLimits> {
        self.entries.get(&name.to_lowercase()).copied()
    }

    /// Case-insensitive lookup falling back to [`FALLBACK_MATERIAL`].
    ///
    /// The fallback is logged and flagged in the returned [`MaterialLookup`] so
    /// a mistyped name does not pass unnoticed.
    pub fn lookup(&self, name: &str) -> MaterialLookup {
        let key = name.to_lowercase();
        if let Some(limits) = self.entries.get(&key) {
            return MaterialLookup {
                requested: name.to_string(),
                resolved: key,
                limits: *limits,
                fallback: false,
            };
        }

        warn!("Unknown material '{name}', using {FALLBACK_MATERIAL} limits");
        let limits = self
            .entries
            .get(FALLBACK_MATERIAL)
            .copied()
            .unwrap_or(BONE_LIMITS);
        MaterialLookup {
            requested: name.to_string(),
            resolved: FALLBACK_MATERIAL.to_string(),
            limits,
            fallback: true,
        }
    }

    /// Material names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_limits() {
        let table = MaterialTable::builtin();
        assert_eq!(table.get("bone"), Some(MaterialLimits::new(80.0, 120.0)));
        assert_eq!(table.get("titanium"), Some(MaterialLimits::new(800.0, 900.0)));
        assert_eq!(table.get("niti"), Some(MaterialLimits::new(195.0, 754.0)));
        assert_eq!(table.get("screw"), Some(MaterialLimits::new(800.0, 900.0)));
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["bone", "niti", "screw", "titanium"]);
        for name in table.names() {
            assert!(table.get(name).unwrap().validate().is_ok());
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let lookup = MaterialTable::builtin().lookup("TiTaNiUm");
        assert!(!lookup.fallback);
        assert_eq!(lookup.resolved, "titanium");
        assert_eq!(lookup.requested, "TiTaNiUm");
        assert_eq!(lookup.limits.yield_stress, 800.0);
    }

    #[test]
    fn test_unknown_material_falls_back_to_bone() {
        let table = MaterialTable::builtin();
        let lookup = table.lookup("titanuim");
        assert!(lookup.fallback);
        assert_eq!(lookup.resolved, "bone");
        assert_eq!(lookup.limits, table.lookup("bone").limits);
        assert_eq!(table.get("titanuim"), None);
    }

    #[test]
    fn test_overrides_replace_and_extend() {
        let overrides = BTreeMap::from([
            ("Titanium".to_string(), MaterialLimits::new(880.0, 950.0)),
            ("peek".to_string(), MaterialLimits::new(100.0, 110.0)),
        ]);
        let table = MaterialTable::builtin().with_overrides(&overrides).expect("valid overrides");
        assert_eq!(table.get("titanium"), Some(MaterialLimits::new(880.0, 950.0)));
        assert_eq!(table.get("peek"), Some(MaterialLimits::new(100.0, 110.0)));
        assert_eq!(table.get("bone"), Some(MaterialLimits::new(80.0, 120.0)));
    }

    #[test]
    fn test_invalid_overrides_are_rejected() {
        let bad_limits = BTreeMap::from([("bone".to_string(), MaterialLimits::new(120.0, 80.0))]);
        assert!(MaterialTable::builtin().with_overrides(&bad_limits).is_err());

        let bad_name = BTreeMap::from([("../bone".to_string(), MaterialLimits::new(80.0, 120.0))]);
        assert!(MaterialTable::builtin().with_overrides(&bad_name).is_err());

        let zero = MaterialLimits::new(0.0, 10.0);
        assert!(zero.validate().is_err());
        assert!(MaterialLimits::new(f64::NAN, 10.0).validate().is_err());
    }
}
