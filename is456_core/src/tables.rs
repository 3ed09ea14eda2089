//! # IS 456 Design Tables
//!
//! Tabulated code values (Table 19 τc, Table 20 τc,max, xu,max/d ratios,
//! bond stress, σcbc, basic span/depth ratios, flanged-beam reduction) held
//! in one immutable [`DesignTables`] value.
//!
//! Engines never reach for module-level state: every lookup goes through a
//! `&DesignTables` passed in by the caller. The standard tables ship as an
//! embedded TOML document and are parsed once on first use; tests or callers
//! can build synthetic tables with [`DesignTables::from_toml_str`].
//!
//! ## Example
//!
//! ```rust
//! use is456_core::tables::DesignTables;
//!
//! let tables = DesignTables::standard().unwrap();
//! // M20 concrete, 1% steel → τc = 0.62 N/mm²
//! assert!((tables.tau_c(20.0, 1.0) - 0.62).abs() < 1e-9);
//! ```

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::clauses::Clause;
use crate::errors::{CalcError, CalcResult};
use crate::materials::SteelGrade;

/// Embedded standard tables
const STANDARD_TABLES_TOML: &str = include_str!("../data/is456_tables.toml");

static STANDARD_TABLES: Lazy<CalcResult<DesignTables>> =
    Lazy::new(|| DesignTables::from_toml_str(STANDARD_TABLES_TOML));

/// Table 19: τc against tension steel percentage, one row per concrete grade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShearStrengthTable {
    /// Steel percentages (ascending)
    pub pt: Vec<f64>,
    /// One row per tabulated grade (ascending fck)
    pub grades: Vec<ShearStrengthRow>,
}

/// One concrete grade row of Table 19
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShearStrengthRow {
    pub fck: f64,
    pub tau_c: Vec<f64>,
}

/// Table 20 row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaxShearRow {
    pub fck: f64,
    pub tau_c_max: f64,
}

/// Design bond stress row (plain bars in tension)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BondStressRow {
    pub fck: f64,
    pub tau_bd: f64,
}

/// Table 21 row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BendingCompressionRow {
    pub fck: f64,
    pub sigma_cbc: f64,
}

/// Basic span/effective-depth ratios of Cl. 23.2.1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpanDepthRatios {
    pub cantilever: f64,
    pub simply_supported: f64,
    pub continuous: f64,
}

/// Fig. 6 flanged-beam reduction curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlangeReductionCurve {
    pub web_ratio: Vec<f64>,
    pub factor: Vec<f64>,
}

/// All tabulated data the engines consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignTables {
    pub shear_strength: ShearStrengthTable,
    pub max_shear_stress: Vec<MaxShearRow>,
    /// Keyed by steel grade name (e.g., "Fe415")
    pub xu_max_ratio: BTreeMap<String, f64>,
    pub bond_stress: Vec<BondStressRow>,
    pub bending_compression: Vec<BendingCompressionRow>,
    pub span_depth: SpanDepthRatios,
    pub flange_reduction: FlangeReductionCurve,
}

impl DesignTables {
    /// The standard IS 456:2000 tables (parsed once, then shared)
    pub fn standard() -> CalcResult<&'static DesignTables> {
        STANDARD_TABLES.as_ref().map_err(Clone::clone)
    }

    /// Parse and validate tables from a TOML document
    pub fn from_toml_str(source: &str) -> CalcResult<Self> {
        let tables: DesignTables =
            toml::from_str(source).map_err(|e| CalcError::SerializationError {
                reason: format!("Invalid design table TOML: {e}"),
            })?;
        tables.validate()?;
        Ok(tables)
    }

    /// Check table shapes and ordering
    pub fn validate(&self) -> CalcResult<()> {
        let pt = &self.shear_strength.pt;
        check_ascending("shear_strength.pt", pt)?;

        let grades: Vec<f64> = self.shear_strength.grades.iter().map(|r| r.fck).collect();
        check_ascending("shear_strength.grades", &grades)?;
        for row in &self.shear_strength.grades {
            if row.tau_c.len() != pt.len() {
                return Err(CalcError::table(
                    "shear_strength",
                    format!(
                        "Row for fck={} has {} values, expected {}",
                        row.fck,
                        row.tau_c.len(),
                        pt.len()
                    ),
                ));
            }
        }

        let fck: Vec<f64> = self.max_shear_stress.iter().map(|r| r.fck).collect();
        check_ascending("max_shear_stress", &fck)?;
        let fck: Vec<f64> = self.bond_stress.iter().map(|r| r.fck).collect();
        check_ascending("bond_stress", &fck)?;
        let fck: Vec<f64> = self.bending_compression.iter().map(|r| r.fck).collect();
        check_ascending("bending_compression", &fck)?;

        for (grade, ratio) in &self.xu_max_ratio {
            if *ratio <= 0.0 || *ratio >= 1.0 {
                return Err(CalcError::table(
                    "xu_max_ratio",
                    format!("Ratio for {grade} must lie in (0, 1), got {ratio}"),
                ));
            }
        }

        check_ascending("flange_reduction.web_ratio", &self.flange_reduction.web_ratio)?;
        if self.flange_reduction.factor.len() != self.flange_reduction.web_ratio.len() {
            return Err(CalcError::table(
                "flange_reduction",
                "web_ratio and factor must have the same length",
            ));
        }
        Ok(())
    }

    /// Design shear strength τc (N/mm²) for a concrete strength and tension
    /// steel percentage. Interpolates in pt, then in fck. pt outside the
    /// tabulated range is clamped (Table 19 gives no values beyond it) and
    /// grades above the last row use that row.
    pub fn tau_c(&self, fck: f64, pt_percent: f64) -> f64 {
        let table = &self.shear_strength;
        let rows = &table.grades;
        let row_value = |row: &ShearStrengthRow| interpolate(&table.pt, &row.tau_c, pt_percent);
        if rows.is_empty() {
            return 0.0;
        }

        let first = &rows[0];
        let last = &rows[rows.len() - 1];
        if fck <= first.fck {
            return row_value(first);
        }
        if fck >= last.fck {
            return row_value(last);
        }
        for pair in rows.windows(2) {
            let (lo, hi) = (&pair[0], &pair[1]);
            if fck <= hi.fck {
                let t = (fck - lo.fck) / (hi.fck - lo.fck);
                return row_value(lo) + t * (row_value(hi) - row_value(lo));
            }
        }
        row_value(last)
    }

    /// Maximum shear stress τc,max (N/mm²), Table 20
    pub fn tau_c_max(&self, fck: f64) -> f64 {
        let xs: Vec<f64> = self.max_shear_stress.iter().map(|r| r.fck).collect();
        let ys: Vec<f64> = self.max_shear_stress.iter().map(|r| r.tau_c_max).collect();
        interpolate(&xs, &ys, fck)
    }

    /// Limiting neutral-axis depth ratio xu,max/d for a steel grade
    pub fn xu_max_ratio(&self, steel: SteelGrade) -> CalcResult<f64> {
        self.xu_max_ratio
            .get(steel.display_name())
            .copied()
            .ok_or_else(|| {
                CalcError::material(
                    steel.display_name(),
                    "No xu,max/d ratio tabulated for this steel grade",
                    Clause::FlexureAssumptions.citation(),
                )
            })
    }

    /// Design bond stress τbd (N/mm²) for plain bars in tension
    pub fn tau_bd(&self, fck: f64) -> f64 {
        let xs: Vec<f64> = self.bond_stress.iter().map(|r| r.fck).collect();
        let ys: Vec<f64> = self.bond_stress.iter().map(|r| r.tau_bd).collect();
        interpolate(&xs, &ys, fck)
    }

    /// Permissible compressive stress in bending σcbc (N/mm²)
    pub fn sigma_cbc(&self, fck: f64) -> f64 {
        let xs: Vec<f64> = self.bending_compression.iter().map(|r| r.fck).collect();
        let ys: Vec<f64> = self.bending_compression.iter().map(|r| r.sigma_cbc).collect();
        interpolate(&xs, &ys, fck)
    }

    /// Modular ratio m = 280 / (3 σcbc), Annex B-1.3
    pub fn modular_ratio(&self, fck: f64) -> f64 {
        280.0 / (3.0 * self.sigma_cbc(fck))
    }

    /// Flanged-beam reduction factor for a web/flange width ratio (Fig. 6)
    pub fn flange_reduction(&self, web_ratio: f64) -> f64 {
        interpolate(
            &self.flange_reduction.web_ratio,
            &self.flange_reduction.factor,
            web_ratio,
        )
    }
}

fn check_ascending(name: &str, values: &[f64]) -> CalcResult<()> {
    if values.is_empty() {
        return Err(CalcError::table(name, "Table must not be empty"));
    }
    if values.windows(2).any(|w| w[1] <= w[0]) {
        return Err(CalcError::table(name, "Keys must be strictly ascending"));
    }
    Ok(())
}

/// Linear interpolation in a table with ascending keys, clamped at both ends.
pub fn interpolate(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    debug_assert_eq!(xs.len(), ys.len());
    let n = xs.len().min(ys.len());
    if n == 0 {
        return 0.0;
    }
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[n - 1] {
        return ys[n - 1];
    }
    for i in 1..n {
        if x <= xs[i] {
            let t = (x - xs[i - 1]) / (xs[i] - xs[i - 1]);
            return ys[i - 1] + t * (ys[i] - ys[i - 1]);
        }
    }
    ys[n - 1]
}
