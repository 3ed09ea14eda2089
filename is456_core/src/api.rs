//! # Orchestration API
//!
//! Stable entry points that compose the engines into single calls:
//!
//! - [`design_beam_is456`] - size reinforcement for a set of load cases
//! - [`check_beam_is456`] - verify reinforcement the engineer supplied
//! - [`optimize_beam_cost`] - cheapest compliant tension bars
//! - [`smart_analyze_design`] - design, cost, sensitivity and
//!   constructability in one report
//!
//! Every function returns [`ApiError`] on failure, never a raw engine
//! error. A design that simply does not work (section too small, no
//! compliant arrangement) is a normal result with `passed == false`, unless
//! strict mode is on.
//!
//! The free functions use the standard IS 456 tables. [`Designer`] takes
//! injected tables for testing or project-specific data.
//!
//! ## Example
//!
//! ```rust
//! use is456_core::api::{design_beam_is456, BeamDesignInput};
//! use is456_core::calculations::inputs::{BeamGeometry, LoadCase};
//! use is456_core::materials::{ConcreteGrade, MaterialProperties, SteelGrade};
//! use is456_core::settings::DesignSettings;
//!
//! let input = BeamDesignInput {
//!     label: "B1".to_string(),
//!     geometry: BeamGeometry::new(4000.0, 230.0, 450.0, 400.0, 25.0),
//!     materials: MaterialProperties::new(ConcreteGrade::M20, SteelGrade::Fe415),
//!     load_cases: vec![LoadCase::new("ULS", 80.0, 90.0)],
//! };
//! let result = design_beam_is456(&input, &DesignSettings::default()).unwrap();
//! assert!(result.passed);
//! ```

use serde::{Deserialize, Serialize};

use crate::calculations::compliance::{
    aggregate, governing_demand, CheckCategory, ComplianceSummary, GoverningDemand,
};
use crate::calculations::detailing::{
    detail_provided, generate_detailing, DetailingRequest, DetailingResult, ProvidedReinforcement,
};
use crate::calculations::flexure::FlexureResult;
use crate::calculations::geometry3d::{derive_geometry, Geometry3D};
use crate::calculations::inputs::{validate_load_cases, BeamGeometry, LoadCase};
use crate::calculations::optimizer::{optimize_cost, OptimalDesign, OptimizationRequest};
use crate::calculations::shear::ShearResult;
use crate::errors::{ApiError, CalcError, CalcResult};
use crate::materials::MaterialProperties;
use crate::settings::DesignSettings;
use crate::smart::{DefaultConstructabilityScorer, SmartReport};
use crate::tables::DesignTables;

/// Serviceability failures that trigger a redesign with a deeper section
const SERVICEABILITY_CURABLE: [&str; 2] = ["Deflection", "CrackWidth"];

/// Strength and layout failures a deeper section can also cure
const STRENGTH_CURABLE: [&str; 3] = ["Flexure", "Shear", "Detailing"];

fn depth_curable(category: &str, settings: &DesignSettings) -> bool {
    SERVICEABILITY_CURABLE.contains(&category)
        || (settings.deepen_for_strength && STRENGTH_CURABLE.contains(&category))
}

/// One beam to design.
///
/// ## JSON Example
///
/// ```json
/// {
///   "label": "B1",
///   "geometry": {
///     "span_mm": 4000, "width_mm": 230, "total_depth_mm": 450,
///     "effective_depth_mm": 400, "clear_cover_mm": 25
///   },
///   "materials": { "concrete": "M20", "steel": "Fe415" },
///   "load_cases": [{ "label": "ULS", "mu_knm": 80, "vu_kn": 90 }]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamDesignInput {
    #[serde(default)]
    pub label: String,
    pub geometry: BeamGeometry,
    pub materials: MaterialProperties,
    pub load_cases: Vec<LoadCase>,
}

impl BeamDesignInput {
    pub fn validate(&self) -> CalcResult<()> {
        self.geometry.validate()?;
        validate_load_cases(&self.load_cases)
    }
}

/// A beam with reinforcement already chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamCheckInput {
    #[serde(flatten)]
    pub design: BeamDesignInput,
    pub provided: ProvidedReinforcement,
}

/// One pass of the re-design loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedesignStep {
    pub iteration: u32,
    pub total_depth_mm: f64,
    pub effective_depth_mm: f64,
    pub passed: bool,
    pub failed_categories: Vec<String>,
}

/// Complete design or check outcome for one beam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamDesignResult {
    pub label: String,
    /// Geometry the result applies to; deeper than the input after
    /// auto-deepening
    pub geometry: BeamGeometry,
    pub materials: MaterialProperties,
    pub demand: GoverningDemand,
    /// Flexure of the case needing the most tension steel
    pub flexure: FlexureResult,
    /// Shear of the governing shear case
    pub shear: ShearResult,
    /// `None` when no arrangement fits the section
    pub detailing: Option<DetailingResult>,
    pub compliance: ComplianceSummary,
    pub geometry3d: Option<Geometry3D>,
    /// Every case can be designed and detailed
    pub design_achievable: bool,
    /// Achievable and every check passes
    pub passed: bool,
    pub redesign_history: Vec<RedesignStep>,
    pub warnings: Vec<String>,
}

impl BeamDesignResult {
    /// Failing categories, plus "Detailing" when nothing could be laid out
    pub fn failed_categories(&self) -> Vec<String> {
        let mut failed = self.compliance.failed_categories();
        if self.detailing.is_none() {
            failed.push("Detailing".to_string());
        }
        failed
    }

    fn strict_error(&self) -> CalcError {
        let first_failure = self.compliance.checks.iter().find(|c| !c.passed);
        CalcError::compliance(
            self.failed_categories(),
            first_failure
                .map(|c| format!("{}: {}", c.category, c.message))
                .unwrap_or_else(|| "No buildable bar arrangement".to_string()),
            first_failure
                .map(|c| c.clause.clone())
                .unwrap_or_else(|| crate::clauses::Clause::BarSpacing.citation()),
        )
    }
}

/// Design runner holding the tables and settings for a session.
#[derive(Debug, Clone)]
pub struct Designer<'a> {
    tables: &'a DesignTables,
    settings: DesignSettings,
}

impl Designer<'static> {
    /// Runner on the standard IS 456 tables
    pub fn standard(settings: DesignSettings) -> Result<Self, ApiError> {
        let tables = DesignTables::standard()?;
        Designer::with_tables(tables, settings)
    }
}

impl<'a> Designer<'a> {
    /// Runner on injected tables
    pub fn with_tables(
        tables: &'a DesignTables,
        settings: DesignSettings,
    ) -> Result<Self, ApiError> {
        tables.validate()?;
        settings.validate()?;
        Ok(Designer { tables, settings })
    }

    pub fn tables(&self) -> &'a DesignTables {
        self.tables
    }

    pub fn settings(&self) -> &DesignSettings {
        &self.settings
    }

    /// Design reinforcement, deepening the section if enabled.
    pub fn design(&self, input: &BeamDesignInput) -> Result<BeamDesignResult, ApiError> {
        tracing::info!(beam = %input.label, cases = input.load_cases.len(), "design started");
        let result = self.design_with_redesign(input)?;
        self.finish(result).map_err(ApiError::from)
    }

    /// Check supplied reinforcement.
    pub fn check(&self, input: &BeamCheckInput) -> Result<BeamDesignResult, ApiError> {
        tracing::info!(beam = %input.design.label, "check started");
        let design = &input.design;
        design.validate()?;
        let detailing = detail_provided(
            &design.geometry,
            &design.materials,
            &input.provided,
            &self.settings,
            self.tables,
        )?;
        let result = self.compose(design, &design.geometry, Some(detailing), Vec::new())?;
        self.finish(result).map_err(ApiError::from)
    }

    /// Cheapest compliant tension bars for the beam as given.
    pub fn optimize(&self, input: &BeamDesignInput) -> Result<OptimalDesign, ApiError> {
        tracing::info!(beam = %input.label, "optimization started");
        input.validate()?;
        let request = OptimizationRequest {
            geometry: &input.geometry,
            materials: &input.materials,
            load_cases: &input.load_cases,
            settings: &self.settings,
            tables: self.tables,
        };
        let optimal = optimize_cost(&request, &self.settings.cost)?;
        if self.settings.strict && !optimal.feasible {
            let chosen = optimal.chosen();
            return Err(CalcError::compliance(
                chosen.failed_categories.clone(),
                optimal
                    .diagnostic
                    .clone()
                    .unwrap_or_else(|| "No compliant arrangement".to_string()),
                optimal
                    .compliance
                    .checks
                    .iter()
                    .find(|c| !c.passed)
                    .map(|c| c.clause.clone())
                    .unwrap_or_default(),
            )
            .into());
        }
        Ok(optimal)
    }

    /// Design plus cost, sensitivity and constructability with the default
    /// scorer.
    pub fn smart(&self, input: &BeamDesignInput) -> Result<SmartReport, ApiError> {
        self.smart_with(input, &DefaultConstructabilityScorer::default())
    }

    fn design_with_redesign(&self, input: &BeamDesignInput) -> CalcResult<BeamDesignResult> {
        input.validate()?;
        let settings = &self.settings;
        let mut geometry = input.geometry;
        let mut history = Vec::new();
        let mut iteration = 0;

        loop {
            let mut result = self.design_once(input, &geometry)?;
            let failed = result.failed_categories();
            history.push(RedesignStep {
                iteration,
                total_depth_mm: geometry.total_depth_mm,
                effective_depth_mm: geometry.effective_depth_mm,
                passed: result.passed,
                failed_categories: failed.clone(),
            });

            let curable =
                !failed.is_empty() && failed.iter().all(|c| depth_curable(c, settings));
            let retry = settings.auto_deepen
                && !result.passed
                && curable
                && iteration < settings.max_redesign_iterations;
            if !retry {
                if settings.auto_deepen && !result.passed && curable {
                    result.warnings.push(format!(
                        "Auto-deepen stopped after {iteration} iteration(s) at D = {:.0} mm",
                        geometry.total_depth_mm
                    ));
                }
                result.redesign_history = history;
                return Ok(result);
            }

            let next = geometry.deepened(settings.deepen_step_mm);
            if let Err(e) = next.validate() {
                result.warnings.push(format!("Auto-deepen stopped: {e}"));
                result.redesign_history = history;
                return Ok(result);
            }
            tracing::debug!(
                iteration,
                total_depth_mm = next.total_depth_mm,
                failed = ?failed,
                "deepening section"
            );
            geometry = next;
            iteration += 1;
        }
    }

    pub(crate) fn design_once(
        &self,
        input: &BeamDesignInput,
        geometry: &BeamGeometry,
    ) -> CalcResult<BeamDesignResult> {
        let demand = governing_demand(&input.load_cases, geometry, &input.materials, self.tables)?;
        let request = DetailingRequest {
            geometry,
            materials: &input.materials,
            ast_required_mm2: demand.ast_required_mm2,
            asc_required_mm2: demand.asc_required_mm2,
            vu_kn: demand.vu_kn,
            mu_knm: demand.mu_knm,
            settings: &self.settings,
            tables: self.tables,
        };
        let mut warnings = Vec::new();
        let detailing = match generate_detailing(&request, None) {
            Ok(detailing) => Some(detailing),
            Err(e @ CalcError::Configuration { .. }) => {
                warnings.push(e.to_string());
                None
            }
            Err(e) => return Err(e),
        };
        self.compose(input, geometry, detailing, warnings)
    }

    fn compose(
        &self,
        input: &BeamDesignInput,
        geometry: &BeamGeometry,
        detailing: Option<DetailingResult>,
        mut warnings: Vec<String>,
    ) -> CalcResult<BeamDesignResult> {
        let demand = governing_demand(&input.load_cases, geometry, &input.materials, self.tables)?;
        let compliance = aggregate(
            &input.load_cases,
            geometry,
            &input.materials,
            detailing.as_ref(),
            &self.settings,
            self.tables,
        )?;
        let geometry3d = detailing
            .as_ref()
            .map(|d| derive_geometry(d, geometry))
            .transpose()?;
        if let Some(d) = &detailing {
            warnings.extend(d.warnings.iter().cloned());
        }

        let shear_index = compliance
            .governing(CheckCategory::Shear)
            .map(|c| c.governing_case_index)
            .unwrap_or(0);
        let flexure = compliance.cases[demand.flexure_case_index].flexure.clone();
        let shear = compliance.cases[shear_index].shear.clone();
        let design_achievable = detailing.is_some()
            && compliance
                .cases
                .iter()
                .all(|c| c.flexure.design_achievable && c.shear.section_adequate());
        let passed = design_achievable && compliance.passed;

        Ok(BeamDesignResult {
            label: input.label.clone(),
            geometry: *geometry,
            materials: input.materials,
            demand,
            flexure,
            shear,
            detailing,
            compliance,
            geometry3d,
            design_achievable,
            passed,
            redesign_history: Vec::new(),
            warnings,
        })
    }

    fn finish(&self, result: BeamDesignResult) -> CalcResult<BeamDesignResult> {
        if result.passed {
            tracing::info!(beam = %result.label, "design passed");
            return Ok(result);
        }
        tracing::warn!(
            beam = %result.label,
            failed = ?result.failed_categories(),
            "design does not comply"
        );
        if self.settings.strict {
            return Err(result.strict_error());
        }
        Ok(result)
    }
}

/// Design a beam on the standard tables
pub fn design_beam_is456(
    input: &BeamDesignInput,
    settings: &DesignSettings,
) -> Result<BeamDesignResult, ApiError> {
    Designer::standard(settings.clone())?.design(input)
}

/// Check supplied reinforcement on the standard tables
pub fn check_beam_is456(
    input: &BeamCheckInput,
    settings: &DesignSettings,
) -> Result<BeamDesignResult, ApiError> {
    Designer::standard(settings.clone())?.check(input)
}

/// Cost-optimize tension bars on the standard tables
pub fn optimize_beam_cost(
    input: &BeamDesignInput,
    settings: &DesignSettings,
) -> Result<OptimalDesign, ApiError> {
    Designer::standard(settings.clone())?.optimize(input)
}

/// Full smart report with the default constructability scorer
pub fn smart_analyze_design(
    input: &BeamDesignInput,
    settings: &DesignSettings,
) -> Result<SmartReport, ApiError> {
    Designer::standard(settings.clone())?.smart(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::{ConcreteGrade, SteelGrade};

    fn input(span_mm: f64, mu_knm: f64, vu_kn: f64) -> BeamDesignInput {
        BeamDesignInput {
            label: "B1".to_string(),
            geometry: BeamGeometry::new(span_mm, 230.0, 450.0, 400.0, 25.0),
            materials: MaterialProperties::new(ConcreteGrade::M20, SteelGrade::Fe415),
            load_cases: vec![LoadCase::new("ULS", mu_knm, vu_kn)],
        }
    }

    fn provided(count: u32) -> ProvidedReinforcement {
        ProvidedReinforcement {
            bottom_count: count,
            bottom_diameter_mm: 16,
            bottom_layers: 1,
            top_count: 2,
            top_diameter_mm: 12,
            stirrup_diameter_mm: 8,
            stirrup_legs: 2,
            stirrup_spacing_mm: 150.0,
            support_stirrup_spacing_mm: None,
        }
    }

    #[test]
    fn test_design_scenario_one() {
        let result =
            design_beam_is456(&input(4000.0, 80.0, 90.0), &DesignSettings::default()).unwrap();
        assert!(result.passed, "{:?}", result.failed_categories());
        assert!((result.flexure.ast_required_mm2 - 649.3).abs() < 1.0);
        let detailing = result.detailing.as_ref().unwrap();
        assert_eq!(detailing.bottom.description(), "4-16φ");
        assert!(detailing.bottom.area_mm2 >= result.flexure.ast_required_mm2);
        assert!(detailing.bottom.clear_spacing_mm >= 25.0);
        assert!(result.geometry3d.is_some());
        assert_eq!(result.redesign_history.len(), 1);
    }

    #[test]
    fn test_flexure_passes_just_below_mu_lim() {
        let near_limit = BeamDesignInput {
            label: "B2".to_string(),
            geometry: BeamGeometry::new(6000.0, 300.0, 600.0, 550.0, 25.0),
            materials: MaterialProperties::new(ConcreteGrade::M20, SteelGrade::Fe415),
            load_cases: vec![LoadCase::new("ULS", 250.0, 100.0)],
        };
        let result = design_beam_is456(&near_limit, &DesignSettings::default()).unwrap();
        assert!(result.flexure.mu_lim_knm > 250.0);
        let flexure = result.compliance.governing(CheckCategory::Flexure).unwrap();
        assert!(flexure.passed, "{}", flexure.message);
    }

    #[test]
    fn test_design_idempotent() {
        let settings = DesignSettings::default();
        let a = design_beam_is456(&input(4000.0, 80.0, 90.0), &settings).unwrap();
        let b = design_beam_is456(&input(4000.0, 80.0, 90.0), &settings).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_invalid_geometry_is_wrapped() {
        let mut bad = input(4000.0, 80.0, 90.0);
        bad.geometry.effective_depth_mm = 500.0;
        let err = design_beam_is456(&bad, &DesignSettings::default()).unwrap_err();
        assert_eq!(err.code, "DIMENSION_ERROR");
        assert!(!err.suggestion.is_empty());
        assert_ne!(err.clause, "n/a");
    }

    #[test]
    fn test_section_inadequate_is_a_result() {
        let result =
            design_beam_is456(&input(4000.0, 80.0, 300.0), &DesignSettings::default()).unwrap();
        assert!(!result.passed);
        assert!(!result.design_achievable);
        assert!(result.failed_categories().contains(&"Shear".to_string()));
    }

    #[test]
    fn test_strict_mode_raises_compliance() {
        let settings = DesignSettings::default().with_strict(true);
        let err = design_beam_is456(&input(4000.0, 80.0, 300.0), &settings).unwrap_err();
        assert_eq!(err.code, "COMPLIANCE_ERROR");
        match err.details {
            CalcError::Compliance { failed_checks, .. } => {
                assert!(failed_checks.contains(&"Shear".to_string()))
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_deflection_fails_when_deepening_disabled() {
        let settings = DesignSettings {
            auto_deepen: false,
            ..DesignSettings::default()
        };
        let result = design_beam_is456(&input(11000.0, 80.0, 60.0), &settings).unwrap();
        assert!(!result.passed);
        assert!(result.failed_categories().contains(&"Deflection".to_string()));
        assert_eq!(result.redesign_history.len(), 1);
    }

    #[test]
    fn test_default_design_deepens_for_deflection() {
        let result =
            design_beam_is456(&input(11000.0, 80.0, 60.0), &DesignSettings::default()).unwrap();
        assert!(result.passed, "{:?}", result.redesign_history);
        assert!(result.geometry.total_depth_mm > 450.0);
        assert!(result.redesign_history[0]
            .failed_categories
            .contains(&"Deflection".to_string()));
    }

    #[test]
    fn test_strength_failure_not_deepened_by_default() {
        let result =
            design_beam_is456(&input(4000.0, 80.0, 300.0), &DesignSettings::default()).unwrap();
        assert_eq!(result.geometry.total_depth_mm, 450.0);
        assert_eq!(result.redesign_history.len(), 1);

        let settings = DesignSettings {
            deepen_for_strength: true,
            ..DesignSettings::default()
        };
        let deepened = design_beam_is456(&input(4000.0, 80.0, 300.0), &settings).unwrap();
        assert!(deepened.geometry.total_depth_mm > 450.0);
    }

    #[test]
    fn test_auto_deepen_cures_deflection() {
        let settings = DesignSettings {
            auto_deepen: true,
            ..DesignSettings::default()
        };
        let result = design_beam_is456(&input(11000.0, 80.0, 60.0), &settings).unwrap();
        assert!(result.passed, "{:?}", result.redesign_history);
        assert!(result.geometry.total_depth_mm > 450.0);
        assert!(result.redesign_history.len() > 1);
        assert!(!result.redesign_history[0].passed);
        let step = result.redesign_history.last().unwrap();
        assert_eq!(step.total_depth_mm, result.geometry.total_depth_mm);
        assert!(step.passed);
    }

    #[test]
    fn test_check_provided_reinforcement() {
        let base = input(4000.0, 80.0, 90.0);
        let ok = check_beam_is456(
            &BeamCheckInput {
                design: base.clone(),
                provided: provided(4),
            },
            &DesignSettings::default(),
        )
        .unwrap();
        assert!(ok.passed, "{:?}", ok.failed_categories());

        let short = check_beam_is456(
            &BeamCheckInput {
                design: base,
                provided: provided(3),
            },
            &DesignSettings::default(),
        )
        .unwrap();
        assert!(!short.passed);
        assert!(short.failed_categories().contains(&"Flexure".to_string()));
    }

    #[test]
    fn test_check_input_json() {
        let json = r#"{
            "label": "B2",
            "geometry": {
                "span_mm": 4000, "width_mm": 230, "total_depth_mm": 450,
                "effective_depth_mm": 400, "clear_cover_mm": 25
            },
            "materials": { "concrete": "M20", "steel": "Fe415" },
            "load_cases": [{ "label": "ULS", "mu_knm": 80, "vu_kn": 90 }],
            "provided": {
                "bottom_count": 4, "bottom_diameter_mm": 16,
                "top_count": 2, "top_diameter_mm": 12,
                "stirrup_diameter_mm": 8, "stirrup_legs": 2, "stirrup_spacing_mm": 150
            }
        }"#;
        let parsed: BeamCheckInput = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.design.label, "B2");
        assert_eq!(parsed.provided.bottom_layers, 1);
        let result = check_beam_is456(&parsed, &DesignSettings::default()).unwrap();
        assert!(result.passed);
    }

    #[test]
    fn test_optimize_via_api() {
        let optimal =
            optimize_beam_cost(&input(4000.0, 80.0, 90.0), &DesignSettings::default()).unwrap();
        assert!(optimal.feasible);
        assert!(optimal.compliance.passed);
    }

    #[test]
    fn test_injected_tables() {
        let tables = DesignTables::standard().unwrap().clone();
        let designer = Designer::with_tables(&tables, DesignSettings::default()).unwrap();
        let result = designer.design(&input(4000.0, 80.0, 90.0)).unwrap();
        assert!(result.passed);
    }
}
