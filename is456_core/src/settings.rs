//! # Design Settings
//!
//! Run-wide options for the engines and the orchestration layer: bar and
//! stirrup catalogues, serviceability level, ductile detailing, strict mode
//! and the cost rates used by the optimizer.
//!
//! Settings are plain serde data. Every field has a default, so a TOML file
//! only needs the values it changes:
//!
//! ```toml
//! ductile_detailing = true
//! serviceability_level = "B"
//!
//! [cost]
//! steel_per_kg = 80.0
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};
use crate::materials::rebar::is_standard_diameter;

/// How far the serviceability checks go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ServiceabilityLevel {
    /// Span/depth check plus an Annex F crack-width calculation
    #[default]
    A,
    /// Span/depth check plus bar-spacing crack control only
    B,
}

/// Options shared by every design in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignSettings {
    /// Longitudinal bar diameters the detailer may use (mm), in preference order
    pub bar_diameters: Vec<u32>,
    /// Stirrup diameters to try, smallest first (mm)
    pub stirrup_diameters: Vec<u32>,
    /// Stirrup leg counts to try, fewest first
    pub stirrup_legs: Vec<u32>,
    /// Smallest stirrup spacing accepted before escalating the stirrup (mm)
    pub min_stirrup_spacing_mm: f64,
    /// Nominal maximum aggregate size (mm)
    pub aggregate_size_mm: f64,
    /// Maximum layers of tension bars
    pub max_layers: u32,
    /// Hanger bar diameter when no compression steel is needed (mm)
    pub hanger_diameter_mm: u32,
    /// Number of hanger bars
    pub hanger_count: u32,
    /// Apply IS 13920 ductile detailing rules
    pub ductile_detailing: bool,
    /// Serviceability level
    pub serviceability_level: ServiceabilityLevel,
    /// Limiting surface crack width (mm)
    pub crack_width_limit_mm: f64,
    /// Raise a compliance error instead of returning a failing design
    pub strict: bool,
    /// Redesign with a deeper section when deflection or crack width fails
    pub auto_deepen: bool,
    /// Also deepen for flexure, shear and bar layout failures
    pub deepen_for_strength: bool,
    /// Depth increment per redesign iteration (mm)
    pub deepen_step_mm: f64,
    /// Maximum redesign iterations
    pub max_redesign_iterations: u32,
    /// Bars above the minimum count the optimizer enumerates
    pub optimizer_extra_bars: u32,
    /// Cost rates
    pub cost: CostTable,
}

impl Default for DesignSettings {
    fn default() -> Self {
        DesignSettings {
            bar_diameters: vec![12, 16, 20, 25, 32],
            stirrup_diameters: vec![8, 10, 12],
            stirrup_legs: vec![2, 4],
            min_stirrup_spacing_mm: 75.0,
            aggregate_size_mm: 20.0,
            max_layers: 2,
            hanger_diameter_mm: 12,
            hanger_count: 2,
            ductile_detailing: false,
            serviceability_level: ServiceabilityLevel::A,
            crack_width_limit_mm: 0.3,
            strict: false,
            auto_deepen: true,
            deepen_for_strength: false,
            deepen_step_mm: 25.0,
            max_redesign_iterations: 8,
            optimizer_extra_bars: 2,
            cost: CostTable::default(),
        }
    }
}

impl DesignSettings {
    /// Parse settings from TOML; missing keys take their defaults
    pub fn from_toml_str(source: &str) -> CalcResult<Self> {
        let settings: DesignSettings =
            toml::from_str(source).map_err(|e| CalcError::SerializationError {
                reason: format!("Invalid settings TOML: {e}"),
            })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Builder: enable or disable ductile detailing
    pub fn with_ductile(mut self, ductile: bool) -> Self {
        self.ductile_detailing = ductile;
        self
    }

    /// Builder: set the serviceability level
    pub fn with_serviceability(mut self, level: ServiceabilityLevel) -> Self {
        self.serviceability_level = level;
        self
    }

    /// Builder: enable strict mode
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Validate catalogue and limits.
    pub fn validate(&self) -> CalcResult<()> {
        if self.bar_diameters.is_empty() {
            return Err(CalcError::invalid_input(
                "bar_diameters",
                "[]",
                "At least one bar diameter is required",
            ));
        }
        if self.stirrup_diameters.is_empty() || self.stirrup_legs.is_empty() {
            return Err(CalcError::invalid_input(
                "stirrup_diameters",
                format!("{:?} / {:?}", self.stirrup_diameters, self.stirrup_legs),
                "At least one stirrup diameter and leg count are required",
            ));
        }
        for &dia in self
            .bar_diameters
            .iter()
            .chain(self.stirrup_diameters.iter())
            .chain(std::iter::once(&self.hanger_diameter_mm))
        {
            if !is_standard_diameter(dia) {
                return Err(CalcError::invalid_input(
                    "bar_diameters",
                    dia.to_string(),
                    "Not a standard bar diameter",
                ));
            }
        }
        if self.stirrup_legs.iter().any(|&legs| legs < 2 || legs % 2 != 0) {
            return Err(CalcError::invalid_input(
                "stirrup_legs",
                format!("{:?}", self.stirrup_legs),
                "Closed stirrups need an even number of legs (2 or more)",
            ));
        }
        if self.max_layers == 0 || self.hanger_count < 2 {
            return Err(CalcError::invalid_input(
                "max_layers",
                format!("{} / hangers {}", self.max_layers, self.hanger_count),
                "Need at least one layer and two hanger bars",
            ));
        }
        let positive = [
            ("min_stirrup_spacing_mm", self.min_stirrup_spacing_mm),
            ("aggregate_size_mm", self.aggregate_size_mm),
            ("crack_width_limit_mm", self.crack_width_limit_mm),
            ("deepen_step_mm", self.deepen_step_mm),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(CalcError::invalid_input(
                    field,
                    value.to_string(),
                    "Must be positive",
                ));
            }
        }
        self.cost.validate()
    }
}

/// Unit rates for the cost optimizer.
///
/// ## JSON Example
///
/// ```json
/// {
///   "steel_per_kg": 72.0,
///   "diameter_factors": { "25": 1.05, "32": 1.1 },
///   "concrete_per_m3": 6500.0,
///   "formwork_per_m2": 500.0,
///   "currency": "INR"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostTable {
    /// Reinforcement rate per kg
    pub steel_per_kg: f64,
    /// Multiplier on the steel rate keyed by bar diameter in mm ("25").
    /// Missing diameters use 1.0.
    pub diameter_factors: BTreeMap<String, f64>,
    /// Concrete rate per m³
    pub concrete_per_m3: f64,
    /// Formwork rate per m² of contact area
    pub formwork_per_m2: f64,
    /// Currency label for reports
    pub currency: String,
}

impl Default for CostTable {
    fn default() -> Self {
        CostTable {
            steel_per_kg: 72.0,
            diameter_factors: BTreeMap::from([("25".to_string(), 1.05), ("32".to_string(), 1.1)]),
            concrete_per_m3: 6500.0,
            formwork_per_m2: 500.0,
            currency: "INR".to_string(),
        }
    }
}

impl CostTable {
    /// Steel rate for a given diameter
    pub fn steel_rate(&self, diameter_mm: u32) -> f64 {
        let factor = self
            .diameter_factors
            .get(&diameter_mm.to_string())
            .copied()
            .unwrap_or(1.0);
        self.steel_per_kg * factor
    }

    /// Rates must be non-negative
    pub fn validate(&self) -> CalcResult<()> {
        let rates = [
            ("steel_per_kg", self.steel_per_kg),
            ("concrete_per_m3", self.concrete_per_m3),
            ("formwork_per_m2", self.formwork_per_m2),
        ];
        for (field, value) in rates
            .into_iter()
            .chain(self.diameter_factors.values().map(|&f| ("diameter_factors", f)))
        {
            if !value.is_finite() || value < 0.0 {
                return Err(CalcError::invalid_input(
                    field,
                    value.to_string(),
                    "Rates must be finite and non-negative",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(DesignSettings::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let settings = DesignSettings::from_toml_str(
            r#"
            ductile_detailing = true
            serviceability_level = "B"

            [cost]
            steel_per_kg = 80.0
            "#,
        )
        .unwrap();
        assert!(settings.ductile_detailing);
        assert_eq!(settings.serviceability_level, ServiceabilityLevel::B);
        assert_eq!(settings.cost.steel_per_kg, 80.0);
        assert_eq!(settings.cost.concrete_per_m3, 6500.0);
        assert_eq!(settings.bar_diameters, vec![12, 16, 20, 25, 32]);
        assert!(settings.auto_deepen);
        assert!(!settings.deepen_for_strength);
    }

    #[test]
    fn test_auto_deepen_opt_out() {
        let settings = DesignSettings::from_toml_str("auto_deepen = false").unwrap();
        assert!(!settings.auto_deepen);
    }

    #[test]
    fn test_non_standard_diameter_rejected() {
        let err = DesignSettings::from_toml_str("bar_diameters = [18]").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }

    #[test]
    fn test_odd_legs_rejected() {
        let settings = DesignSettings {
            stirrup_legs: vec![3],
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_steel_rate_factor() {
        let cost = CostTable::default();
        assert_eq!(cost.steel_rate(16), 72.0);
        assert!((cost.steel_rate(32) - 79.2).abs() < 1e-9);
    }

    #[test]
    fn test_diameter_factor_keys_in_toml() {
        let settings = DesignSettings::from_toml_str(
            r#"
            [cost.diameter_factors]
            20 = 1.02
            "#,
        )
        .unwrap();
        assert!((settings.cost.steel_rate(20) - 72.0 * 1.02).abs() < 1e-9);
    }
}
