//! # Materials
//!
//! Concrete and reinforcing-steel grades recognised by IS 456, plus the
//! standard rebar catalogue.
//!
//! Grades are closed enums: a value outside the standard set cannot be
//! represented, so engines never see an unrecognised grade. Parsing from
//! strings or raw strengths goes through [`ConcreteGrade::from_str_flexible`],
//! [`SteelGrade::from_str_flexible`] or [`MaterialProperties::from_strengths`],
//! all of which fail with [`CalcError::Material`].
//!
//! ## Example
//!
//! ```rust
//! use is456_core::materials::{ConcreteGrade, MaterialProperties, SteelGrade};
//!
//! let mat = MaterialProperties::new(ConcreteGrade::M20, SteelGrade::Fe415);
//! assert_eq!(mat.fck(), 20.0);
//! assert_eq!(mat.fy(), 415.0);
//!
//! let parsed = MaterialProperties::from_strengths(25.0, 500.0).unwrap();
//! assert_eq!(parsed.concrete, ConcreteGrade::M25);
//! ```

pub mod rebar;

pub use rebar::{bar_area_mm2, bar_unit_weight_kg_per_m, STANDARD_BAR_DIAMETERS};

use serde::{Deserialize, Serialize};

use crate::clauses::Clause;
use crate::errors::{CalcError, CalcResult};

/// Modulus of elasticity of reinforcing steel (N/mm²), IS 456 Cl. 5.6.3
pub const ES_N_MM2: f64 = 200_000.0;

/// Ultimate compressive strain in concrete, IS 456 Cl. 38.1(b)
pub const CONCRETE_ULTIMATE_STRAIN: f64 = 0.0035;

/// Concrete grades per IS 456 Table 2 (characteristic cube strength)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConcreteGrade {
    M15,
    M20,
    M25,
    M30,
    M35,
    M40,
    M45,
    M50,
}

impl ConcreteGrade {
    /// All concrete grades, weakest first
    pub const ALL: [ConcreteGrade; 8] = [
        ConcreteGrade::M15,
        ConcreteGrade::M20,
        ConcreteGrade::M25,
        ConcreteGrade::M30,
        ConcreteGrade::M35,
        ConcreteGrade::M40,
        ConcreteGrade::M45,
        ConcreteGrade::M50,
    ];

    /// Characteristic compressive strength fck (N/mm²)
    pub fn fck(&self) -> f64 {
        match self {
            ConcreteGrade::M15 => 15.0,
            ConcreteGrade::M20 => 20.0,
            ConcreteGrade::M25 => 25.0,
            ConcreteGrade::M30 => 30.0,
            ConcreteGrade::M35 => 35.0,
            ConcreteGrade::M40 => 40.0,
            ConcreteGrade::M45 => 45.0,
            ConcreteGrade::M50 => 50.0,
        }
    }

    /// Short-term modulus of elasticity Ec = 5000·√fck (N/mm²), Cl. 6.2.3.1
    pub fn ec_n_mm2(&self) -> f64 {
        5000.0 * self.fck().sqrt()
    }

    /// Look up a grade by its exact fck value
    pub fn from_fck(fck: f64) -> CalcResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|g| (g.fck() - fck).abs() < 1e-9)
            .ok_or_else(|| {
                CalcError::material(
                    format!("fck={fck}"),
                    "Not a standard concrete grade (M15-M50)",
                    Clause::FlexureAssumptions.citation(),
                )
            })
    }

    /// Parse from common string representations ("M20", "m 20", "20")
    pub fn from_str_flexible(s: &str) -> CalcResult<Self> {
        let cleaned = s.trim().to_uppercase().replace([' ', '-'], "");
        let digits = cleaned.strip_prefix('M').unwrap_or(&cleaned);
        let fck: f64 = digits.parse().map_err(|_| {
            CalcError::material(
                s,
                "Unrecognised concrete grade",
                Clause::FlexureAssumptions.citation(),
            )
        })?;
        Self::from_fck(fck)
    }

    /// Next stronger grade, if any
    pub fn next_stronger(&self) -> Option<Self> {
        let idx = Self::ALL.iter().position(|g| g == self)?;
        Self::ALL.get(idx + 1).copied()
    }

    /// Next weaker grade, if any
    pub fn next_weaker(&self) -> Option<Self> {
        let idx = Self::ALL.iter().position(|g| g == self)?;
        idx.checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }

    /// Display name (e.g., "M20")
    pub fn display_name(&self) -> &'static str {
        match self {
            ConcreteGrade::M15 => "M15",
            ConcreteGrade::M20 => "M20",
            ConcreteGrade::M25 => "M25",
            ConcreteGrade::M30 => "M30",
            ConcreteGrade::M35 => "M35",
            ConcreteGrade::M40 => "M40",
            ConcreteGrade::M45 => "M45",
            ConcreteGrade::M50 => "M50",
        }
    }
}

impl std::fmt::Display for ConcreteGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Reinforcing steel grades per IS 432 / IS 1786
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SteelGrade {
    /// Mild steel plain bars
    Fe250,
    /// High-yield strength deformed bars
    Fe415,
    Fe500,
    Fe550,
}

impl SteelGrade {
    /// All steel grades, weakest first
    pub const ALL: [SteelGrade; 4] = [
        SteelGrade::Fe250,
        SteelGrade::Fe415,
        SteelGrade::Fe500,
        SteelGrade::Fe550,
    ];

    /// Characteristic yield strength fy (N/mm²)
    pub fn fy(&self) -> f64 {
        match self {
            SteelGrade::Fe250 => 250.0,
            SteelGrade::Fe415 => 415.0,
            SteelGrade::Fe500 => 500.0,
            SteelGrade::Fe550 => 550.0,
        }
    }

    /// Deformed (ribbed) bars get the 60% bond-stress increase of Cl. 26.2.1.1
    pub fn is_deformed(&self) -> bool {
        !matches!(self, SteelGrade::Fe250)
    }

    /// Table key used in the design tables (e.g., "Fe415")
    pub fn display_name(&self) -> &'static str {
        match self {
            SteelGrade::Fe250 => "Fe250",
            SteelGrade::Fe415 => "Fe415",
            SteelGrade::Fe500 => "Fe500",
            SteelGrade::Fe550 => "Fe550",
        }
    }

    /// Look up a grade by its exact fy value
    pub fn from_fy(fy: f64) -> CalcResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|g| (g.fy() - fy).abs() < 1e-9)
            .ok_or_else(|| {
                CalcError::material(
                    format!("fy={fy}"),
                    "Not a standard steel grade (Fe250/Fe415/Fe500/Fe550)",
                    Clause::FlexureAssumptions.citation(),
                )
            })
    }

    /// Parse from common string representations ("Fe415", "fe 415", "415")
    pub fn from_str_flexible(s: &str) -> CalcResult<Self> {
        let cleaned = s.trim().to_uppercase().replace([' ', '-'], "");
        let digits = cleaned.strip_prefix("FE").unwrap_or(&cleaned);
        let fy: f64 = digits.parse().map_err(|_| {
            CalcError::material(
                s,
                "Unrecognised steel grade",
                Clause::FlexureAssumptions.citation(),
            )
        })?;
        Self::from_fy(fy)
    }

    /// Design stress (N/mm²) at a given strain, IS 456 Fig. 23.
    ///
    /// Mild steel is elastic-perfectly plastic. Cold-worked deformed bars
    /// follow the multi-linear curve: the stress/strain points at
    /// 0.80, 0.85, 0.90, 0.95, 0.975 and 1.0 × 0.87fy carry inelastic
    /// strains of 0, 0.0001, 0.0003, 0.0007, 0.001 and 0.002.
    pub fn design_stress(&self, strain: f64) -> f64 {
        let fyd = 0.87 * self.fy();
        let strain = strain.abs();
        if !self.is_deformed() {
            return (strain * ES_N_MM2).min(fyd);
        }

        const STRESS_RATIOS: [f64; 6] = [0.80, 0.85, 0.90, 0.95, 0.975, 1.0];
        const INELASTIC: [f64; 6] = [0.0, 0.0001, 0.0003, 0.0007, 0.001, 0.002];

        let points: Vec<(f64, f64)> = STRESS_RATIOS
            .iter()
            .zip(INELASTIC.iter())
            .map(|(ratio, inelastic)| {
                let stress = ratio * fyd;
                (stress / ES_N_MM2 + inelastic, stress)
            })
            .collect();

        let (first_strain, _) = points[0];
        if strain <= first_strain {
            return strain * ES_N_MM2;
        }
        for pair in points.windows(2) {
            let (e0, s0) = pair[0];
            let (e1, s1) = pair[1];
            if strain <= e1 {
                return s0 + (s1 - s0) * (strain - e0) / (e1 - e0);
            }
        }
        fyd
    }
}

impl std::fmt::Display for SteelGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Concrete + steel pair used for one design.
///
/// ## JSON Example
///
/// ```json
/// { "concrete": "M20", "steel": "Fe415" }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterialProperties {
    /// Concrete grade
    pub concrete: ConcreteGrade,
    /// Reinforcing steel grade
    pub steel: SteelGrade,
}

impl MaterialProperties {
    /// Create from grades
    pub fn new(concrete: ConcreteGrade, steel: SteelGrade) -> Self {
        MaterialProperties { concrete, steel }
    }

    /// Create from raw strengths; fails for non-standard values
    pub fn from_strengths(fck: f64, fy: f64) -> CalcResult<Self> {
        Ok(MaterialProperties {
            concrete: ConcreteGrade::from_fck(fck)?,
            steel: SteelGrade::from_fy(fy)?,
        })
    }

    /// Characteristic concrete strength (N/mm²)
    pub fn fck(&self) -> f64 {
        self.concrete.fck()
    }

    /// Characteristic steel yield strength (N/mm²)
    pub fn fy(&self) -> f64 {
        self.steel.fy()
    }

    /// Display name (e.g., "M20 / Fe415")
    pub fn display_name(&self) -> String {
        format!("{} / {}", self.concrete, self.steel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_parsing() {
        assert_eq!(ConcreteGrade::from_str_flexible("m 25").unwrap(), ConcreteGrade::M25);
        assert_eq!(ConcreteGrade::from_str_flexible("30").unwrap(), ConcreteGrade::M30);
        assert_eq!(SteelGrade::from_str_flexible("fe-500").unwrap(), SteelGrade::Fe500);
        assert!(ConcreteGrade::from_str_flexible("M22").is_err());
        assert!(SteelGrade::from_str_flexible("A992").is_err());
    }

    #[test]
    fn test_non_standard_strength_is_material_error() {
        let err = MaterialProperties::from_strengths(22.0, 415.0).unwrap_err();
        assert_eq!(err.error_code(), "MATERIAL_ERROR");
        assert!(err.clause().is_some());
    }

    #[test]
    fn test_grade_serialization() {
        let mat = MaterialProperties::new(ConcreteGrade::M20, SteelGrade::Fe415);
        let json = serde_json::to_string(&mat).unwrap();
        assert_eq!(json, r#"{"concrete":"M20","steel":"Fe415"}"#);
    }

    #[test]
    fn test_design_stress_curve_fe415() {
        let steel = SteelGrade::Fe415;
        // Elastic branch
        assert!((steel.design_stress(0.001) - 200.0).abs() < 1e-9);
        // First knee: 0.8 × 361.05 = 288.84 at strain 0.001444
        assert!((steel.design_stress(288.84 / ES_N_MM2) - 288.84).abs() < 1e-6);
        // Fully yielded
        assert!((steel.design_stress(0.01) - 0.87 * 415.0).abs() < 1e-9);
        // Between knees the curve is monotonic
        assert!(steel.design_stress(0.0025) > steel.design_stress(0.0020));
    }

    #[test]
    fn test_design_stress_mild_steel() {
        let steel = SteelGrade::Fe250;
        assert!((steel.design_stress(0.0005) - 100.0).abs() < 1e-9);
        assert!((steel.design_stress(0.003) - 217.5).abs() < 1e-9);
    }

    #[test]
    fn test_next_stronger_grade() {
        assert_eq!(ConcreteGrade::M20.next_stronger(), Some(ConcreteGrade::M25));
        assert_eq!(ConcreteGrade::M50.next_stronger(), None);
        assert_eq!(ConcreteGrade::M20.next_weaker(), Some(ConcreteGrade::M15));
        assert_eq!(ConcreteGrade::M15.next_weaker(), None);
    }
}
