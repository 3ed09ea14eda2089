//! # Design Inputs
//!
//! Plain structured data handed to the engines by import adapters or UIs:
//! beam geometry, section shape, support condition and factored load cases.
//! Everything is in millimetres, kilonewtons and kilonewton-metres.
//!
//! ## JSON Example
//!
//! ```json
//! {
//!   "span_mm": 4000.0,
//!   "width_mm": 230.0,
//!   "total_depth_mm": 450.0,
//!   "effective_depth_mm": 400.0,
//!   "clear_cover_mm": 25.0,
//!   "section": { "shape": "Rectangular" },
//!   "support": "SimplySupported"
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::clauses::Clause;
use crate::errors::{CalcError, CalcResult};

/// Cross-section shape. Flanged variants carry the flange dimensions; the
/// web width is always [`BeamGeometry::width_mm`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "shape")]
pub enum SectionShape {
    /// Plain rectangle b × D
    #[default]
    Rectangular,
    /// Flange on both sides of the web
    TBeam {
        flange_width_mm: f64,
        flange_depth_mm: f64,
    },
    /// Flange on one side of the web (edge beam)
    LBeam {
        flange_width_mm: f64,
        flange_depth_mm: f64,
    },
}

impl SectionShape {
    /// Flange width and depth, if flanged
    pub fn flange(&self) -> Option<(f64, f64)> {
        match *self {
            SectionShape::Rectangular => None,
            SectionShape::TBeam {
                flange_width_mm,
                flange_depth_mm,
            }
            | SectionShape::LBeam {
                flange_width_mm,
                flange_depth_mm,
            } => Some((flange_width_mm, flange_depth_mm)),
        }
    }

    /// Short name for reports
    pub fn display_name(&self) -> &'static str {
        match self {
            SectionShape::Rectangular => "Rectangular",
            SectionShape::TBeam { .. } => "T-beam",
            SectionShape::LBeam { .. } => "L-beam",
        }
    }
}

/// End restraint, used for span/depth ratios and anchorage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SupportCondition {
    #[default]
    SimplySupported,
    Continuous,
    Cantilever,
}

/// Beam geometry. Immutable once built; variations produce new values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeamGeometry {
    /// Effective span (mm)
    pub span_mm: f64,
    /// Web width b (mm)
    pub width_mm: f64,
    /// Overall depth D (mm)
    pub total_depth_mm: f64,
    /// Effective depth d to the tension steel centroid (mm)
    pub effective_depth_mm: f64,
    /// Clear cover to the stirrups (mm)
    pub clear_cover_mm: f64,
    /// Section shape
    #[serde(default)]
    pub section: SectionShape,
    /// Support condition
    #[serde(default)]
    pub support: SupportCondition,
    /// Depth d' of the compression steel centroid from the top face.
    /// Defaults to D - d.
    #[serde(default)]
    pub compression_steel_depth_mm: Option<f64>,
}

impl BeamGeometry {
    /// Rectangular, simply supported beam
    pub fn new(
        span_mm: f64,
        width_mm: f64,
        total_depth_mm: f64,
        effective_depth_mm: f64,
        clear_cover_mm: f64,
    ) -> Self {
        BeamGeometry {
            span_mm,
            width_mm,
            total_depth_mm,
            effective_depth_mm,
            clear_cover_mm,
            section: SectionShape::Rectangular,
            support: SupportCondition::SimplySupported,
            compression_steel_depth_mm: None,
        }
    }

    /// Builder: set section shape
    pub fn with_section(mut self, section: SectionShape) -> Self {
        self.section = section;
        self
    }

    /// Builder: set support condition
    pub fn with_support(mut self, support: SupportCondition) -> Self {
        self.support = support;
        self
    }

    /// Copy with overall and effective depth both increased by `delta_mm`
    pub fn deepened(&self, delta_mm: f64) -> Self {
        BeamGeometry {
            total_depth_mm: self.total_depth_mm + delta_mm,
            effective_depth_mm: self.effective_depth_mm + delta_mm,
            ..*self
        }
    }

    /// Depth of compression steel centroid d' (mm)
    pub fn d_prime_mm(&self) -> f64 {
        self.compression_steel_depth_mm
            .unwrap_or(self.total_depth_mm - self.effective_depth_mm)
    }

    /// Distance between points of zero moment l0 (mm), Cl. 23.1.2
    pub fn zero_moment_span_mm(&self) -> f64 {
        match self.support {
            SupportCondition::Continuous => 0.7 * self.span_mm,
            SupportCondition::SimplySupported | SupportCondition::Cantilever => self.span_mm,
        }
    }

    /// Effective compression flange width (mm). Equals the web width for
    /// rectangular sections; capped by the actual flange width otherwise.
    pub fn effective_flange_width_mm(&self) -> f64 {
        let l0 = self.zero_moment_span_mm();
        let bw = self.width_mm;
        match self.section {
            SectionShape::Rectangular => bw,
            SectionShape::TBeam {
                flange_width_mm,
                flange_depth_mm,
            } => (l0 / 6.0 + bw + 6.0 * flange_depth_mm).min(flange_width_mm),
            SectionShape::LBeam {
                flange_width_mm,
                flange_depth_mm,
            } => (l0 / 12.0 + bw + 3.0 * flange_depth_mm).min(flange_width_mm),
        }
    }

    /// Validate dimensions against positivity and code limits.
    pub fn validate(&self) -> CalcResult<()> {
        let positive = [
            ("span_mm", self.span_mm),
            ("width_mm", self.width_mm),
            ("total_depth_mm", self.total_depth_mm),
            ("effective_depth_mm", self.effective_depth_mm),
            ("clear_cover_mm", self.clear_cover_mm),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(CalcError::dimension(
                    field,
                    value,
                    "Must be a positive, finite length",
                    Clause::FlexureAssumptions.citation(),
                ));
            }
        }

        if self.effective_depth_mm >= self.total_depth_mm {
            return Err(CalcError::dimension(
                "effective_depth_mm",
                self.effective_depth_mm,
                format!(
                    "Effective depth must be less than overall depth {}",
                    self.total_depth_mm
                ),
                Clause::FlexureAssumptions.citation(),
            ));
        }

        if self.clear_cover_mm >= self.total_depth_mm - self.effective_depth_mm {
            return Err(CalcError::dimension(
                "clear_cover_mm",
                self.clear_cover_mm,
                format!(
                    "Cover leaves no room for bars below d (D - d = {})",
                    self.total_depth_mm - self.effective_depth_mm
                ),
                Clause::NominalCover.citation(),
            ));
        }

        if let Some(d_prime) = self.compression_steel_depth_mm {
            if !d_prime.is_finite() || d_prime <= 0.0 || d_prime >= self.effective_depth_mm {
                return Err(CalcError::dimension(
                    "compression_steel_depth_mm",
                    d_prime,
                    "Compression steel depth must lie between 0 and d",
                    Clause::DoublyReinforced.citation(),
                ));
            }
        }

        if let Some((bf, df)) = self.section.flange() {
            if !bf.is_finite() || bf < self.width_mm {
                return Err(CalcError::dimension(
                    "flange_width_mm",
                    bf,
                    "Flange width must be at least the web width",
                    Clause::EffectiveFlangeWidth.citation(),
                ));
            }
            if !df.is_finite() || df <= 0.0 || df >= self.total_depth_mm {
                return Err(CalcError::dimension(
                    "flange_depth_mm",
                    df,
                    "Flange depth must lie between 0 and D",
                    Clause::FlangedSection.citation(),
                ));
            }
        }

        // Lateral stability, Cl. 23.3
        let b = self.width_mm;
        let d = self.effective_depth_mm;
        let (width_factor, slenderness_factor) = match self.support {
            SupportCondition::Cantilever => (25.0, 100.0),
            _ => (60.0, 250.0),
        };
        let limit = (width_factor * b).min(slenderness_factor * b * b / d);
        if self.span_mm > limit {
            return Err(CalcError::dimension(
                "span_mm",
                self.span_mm,
                format!("Exceeds lateral stability limit of {limit:.0} mm for b = {b}"),
                Clause::LateralStability.citation(),
            ));
        }

        Ok(())
    }
}

/// One factored load case.
///
/// ## JSON Example
///
/// ```json
/// { "label": "1.5(DL+LL)", "mu_knm": 80.0, "vu_kn": 95.0 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadCase {
    /// Case label (e.g., "1.5(DL+LL)")
    pub label: String,
    /// Factored bending moment Mu (kN·m)
    pub mu_knm: f64,
    /// Factored shear force Vu at the support face (kN)
    pub vu_kn: f64,
    /// Unfactored service moment (kN·m). Defaults to Mu / 1.5.
    #[serde(default)]
    pub service_moment_knm: Option<f64>,
}

impl LoadCase {
    /// Create a load case
    pub fn new(label: impl Into<String>, mu_knm: f64, vu_kn: f64) -> Self {
        LoadCase {
            label: label.into(),
            mu_knm,
            vu_kn,
            service_moment_knm: None,
        }
    }

    /// Builder: set an explicit service moment
    pub fn with_service_moment(mut self, service_moment_knm: f64) -> Self {
        self.service_moment_knm = Some(service_moment_knm);
        self
    }

    /// Service moment used for crack-width checks (kN·m)
    pub fn service_moment(&self) -> f64 {
        self.service_moment_knm.unwrap_or(self.mu_knm / 1.5)
    }

    /// Validate forces
    pub fn validate(&self) -> CalcResult<()> {
        let values = [
            ("mu_knm", self.mu_knm),
            ("vu_kn", self.vu_kn),
            ("service_moment_knm", self.service_moment()),
        ];
        for (field, value) in values {
            if !value.is_finite() || value < 0.0 {
                return Err(CalcError::invalid_input(
                    format!("{}.{field}", self.label),
                    value.to_string(),
                    "Forces must be finite and non-negative",
                ));
            }
        }
        Ok(())
    }
}

/// Validate a non-empty list of load cases
pub fn validate_load_cases(cases: &[LoadCase]) -> CalcResult<()> {
    if cases.is_empty() {
        return Err(CalcError::invalid_input(
            "load_cases",
            "[]",
            "At least one load case is required",
        ));
    }
    cases.iter().try_for_each(LoadCase::validate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beam() -> BeamGeometry {
        BeamGeometry::new(4000.0, 230.0, 450.0, 400.0, 25.0)
    }

    #[test]
    fn test_valid_geometry() {
        assert!(beam().validate().is_ok());
    }

    #[test]
    fn test_effective_depth_must_be_less_than_depth() {
        let mut g = beam();
        g.effective_depth_mm = 460.0;
        let err = g.validate().unwrap_err();
        assert_eq!(err.error_code(), "DIMENSION_ERROR");
    }

    #[test]
    fn test_negative_width_rejected() {
        let mut g = beam();
        g.width_mm = -230.0;
        assert!(g.validate().is_err());
    }

    #[test]
    fn test_lateral_stability_limit() {
        // 60 × 150 = 9000 mm
        let g = BeamGeometry::new(9500.0, 150.0, 450.0, 400.0, 25.0);
        let err = g.validate().unwrap_err();
        assert_eq!(err.clause(), Some("IS 456:2000 Cl. 23.3"));
    }

    #[test]
    fn test_effective_flange_width() {
        let g = beam().with_section(SectionShape::TBeam {
            flange_width_mm: 2000.0,
            flange_depth_mm: 120.0,
        });
        // l0/6 + bw + 6Df = 666.7 + 230 + 720
        assert!((g.effective_flange_width_mm() - 1616.67).abs() < 0.01);

        let l = beam().with_section(SectionShape::LBeam {
            flange_width_mm: 600.0,
            flange_depth_mm: 120.0,
        });
        assert_eq!(l.effective_flange_width_mm(), 600.0);
    }

    #[test]
    fn test_flange_narrower_than_web_rejected() {
        let g = beam().with_section(SectionShape::TBeam {
            flange_width_mm: 200.0,
            flange_depth_mm: 120.0,
        });
        assert!(g.validate().is_err());
    }

    #[test]
    fn test_deepened_keeps_cover() {
        let g = beam().deepened(50.0);
        assert_eq!(g.total_depth_mm, 500.0);
        assert_eq!(g.effective_depth_mm, 450.0);
        assert_eq!(g.d_prime_mm(), 50.0);
    }

    #[test]
    fn test_load_case_defaults() {
        let case = LoadCase::new("ULS", 90.0, 60.0);
        assert_eq!(case.service_moment(), 60.0);
        assert!(validate_load_cases(&[]).is_err());
        assert!(validate_load_cases(&[LoadCase::new("bad", -1.0, 0.0)]).is_err());
    }

    #[test]
    fn test_geometry_json_defaults() {
        let json = r#"{"span_mm":4000,"width_mm":230,"total_depth_mm":450,
                       "effective_depth_mm":400,"clear_cover_mm":25}"#;
        let g: BeamGeometry = serde_json::from_str(json).unwrap();
        assert_eq!(g.section, SectionShape::Rectangular);
        assert_eq!(g.support, SupportCondition::SimplySupported);
    }
}
