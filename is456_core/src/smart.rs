//! # Smart Analysis
//!
//! One report that puts a design next to its cost-optimal alternative, its
//! sensitivity to the main section parameters and a constructability score.
//!
//! ## Sensitivity
//!
//! The section is re-designed, without auto-deepening, for:
//!
//! - width ±10%
//! - overall depth ±10% (effective depth moves with it, cover unchanged)
//! - concrete one grade weaker and one grade stronger
//!
//! ## Constructability
//!
//! Scoring is pluggable through [`ConstructabilityScorer`]. The
//! [`DefaultConstructabilityScorer`] starts from 100 and deducts:
//!
//! | Condition | Deduction |
//! |-----------|-----------|
//! | Each distinct bar diameter beyond two | `diameter_penalty` |
//! | Each tension layer beyond the first | `layer_penalty` |
//! | Clear spacing under `comfortable_spacing_mm` | linear, up to `congestion_penalty` |
//! | Stirrup spacing below `tight_stirrup_spacing_mm` | `tight_stirrup_penalty` |
//! | More than two stirrup legs | `multi_leg_penalty` |
//!
//! The result is clamped to 0..=100.

use serde::{Deserialize, Serialize};

use crate::api::{BeamDesignInput, BeamDesignResult, Designer};
use crate::calculations::detailing::DetailingResult;
use crate::calculations::inputs::BeamGeometry;
use crate::calculations::optimizer::{
    cost_breakdown, optimize_cost, CostBreakdown, OptimalDesign, OptimizationRequest,
};
use crate::errors::{ApiError, CalcError};

/// One deduction applied by a scorer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorePenalty {
    pub reason: String,
    pub points: f64,
}

/// Constructability verdict, 0 (unbuildable) to 100 (trivial)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructabilityScore {
    pub score: f64,
    pub penalties: Vec<ScorePenalty>,
}

impl ConstructabilityScore {
    /// Score from 100 minus the penalties, clamped
    pub fn from_penalties(penalties: Vec<ScorePenalty>) -> Self {
        let deducted: f64 = penalties.iter().map(|p| p.points).sum();
        ConstructabilityScore {
            score: (100.0 - deducted).clamp(0.0, 100.0),
            penalties,
        }
    }
}

/// Scores how easy a detailed beam is to build.
///
/// Implementations must be deterministic: the same detailing always gives
/// the same score.
pub trait ConstructabilityScorer {
    /// Name shown in reports
    fn name(&self) -> &str;

    fn score(&self, detailing: &DetailingResult, geometry: &BeamGeometry) -> ConstructabilityScore;
}

/// Penalty-based scorer; see the module docs for the rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultConstructabilityScorer {
    pub diameter_penalty: f64,
    pub layer_penalty: f64,
    pub congestion_penalty: f64,
    /// Clear spacing at which concreting is easy (mm)
    pub comfortable_spacing_mm: f64,
    pub tight_stirrup_penalty: f64,
    pub tight_stirrup_spacing_mm: f64,
    pub multi_leg_penalty: f64,
}

impl Default for DefaultConstructabilityScorer {
    fn default() -> Self {
        DefaultConstructabilityScorer {
            diameter_penalty: 8.0,
            layer_penalty: 12.0,
            congestion_penalty: 20.0,
            comfortable_spacing_mm: 40.0,
            tight_stirrup_penalty: 10.0,
            tight_stirrup_spacing_mm: 100.0,
            multi_leg_penalty: 5.0,
        }
    }
}

impl ConstructabilityScorer for DefaultConstructabilityScorer {
    fn name(&self) -> &str {
        "default"
    }

    fn score(
        &self,
        detailing: &DetailingResult,
        _geometry: &BeamGeometry,
    ) -> ConstructabilityScore {
        let mut penalties = Vec::new();

        let diameters = detailing.distinct_diameters().len();
        if diameters > 2 {
            penalties.push(ScorePenalty {
                reason: format!("{diameters} bar diameters"),
                points: (diameters - 2) as f64 * self.diameter_penalty,
            });
        }

        let bottom = &detailing.bottom;
        if bottom.layers > 1 {
            penalties.push(ScorePenalty {
                reason: format!("{} layers of tension bars", bottom.layers),
                points: (bottom.layers - 1) as f64 * self.layer_penalty,
            });
        }

        let band = self.comfortable_spacing_mm - bottom.min_clear_spacing_mm;
        if band > 0.0 && bottom.clear_spacing_mm < self.comfortable_spacing_mm {
            let congestion =
                ((self.comfortable_spacing_mm - bottom.clear_spacing_mm) / band).clamp(0.0, 1.0);
            penalties.push(ScorePenalty {
                reason: format!("Clear bar spacing {:.0} mm", bottom.clear_spacing_mm),
                points: congestion * self.congestion_penalty,
            });
        }

        let tightest = detailing
            .stirrup_zones
            .iter()
            .map(|z| z.spacing_mm)
            .fold(f64::INFINITY, f64::min);
        if tightest < self.tight_stirrup_spacing_mm {
            penalties.push(ScorePenalty {
                reason: format!("Stirrups at {tightest:.0} mm"),
                points: self.tight_stirrup_penalty,
            });
        }

        if detailing.stirrup.legs > 2 {
            penalties.push(ScorePenalty {
                reason: format!("{}-legged stirrups", detailing.stirrup.legs),
                points: self.multi_leg_penalty,
            });
        }

        ConstructabilityScore::from_penalties(penalties)
    }
}

/// Parameter varied in a sensitivity run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensitivityParameter {
    Width,
    Depth,
    ConcreteGrade,
}

/// Outcome of one varied design
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityCase {
    pub parameter: SensitivityParameter,
    /// e.g. "-10%" or "M25"
    pub variation: String,
    /// New width or depth (mm), or fck (N/mm²)
    pub value: f64,
    pub passed: bool,
    pub max_utilization: Option<f64>,
    /// Change from the base design's max utilization
    pub utilization_change: Option<f64>,
    pub ast_required_mm2: Option<f64>,
    pub failed_categories: Vec<String>,
    /// Set when the varied input itself was rejected
    pub error: Option<String>,
}

/// Design, cost and robustness of one beam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmartReport {
    pub label: String,
    pub design: BeamDesignResult,
    /// Cost of the designed detailing
    pub design_cost: Option<CostBreakdown>,
    /// `None` when no arrangement could be laid out
    pub optimization: Option<OptimalDesign>,
    /// Design cost minus optimized cost, when both are compliant
    pub savings: Option<f64>,
    pub sensitivity: Vec<SensitivityCase>,
    /// Every sensitivity variation passes
    pub robust: bool,
    pub constructability: Option<ConstructabilityScore>,
    pub scorer: String,
    pub recommendations: Vec<String>,
}

impl<'a> Designer<'a> {
    /// Smart report with a caller-supplied constructability scorer.
    pub fn smart_with(
        &self,
        input: &BeamDesignInput,
        scorer: &dyn ConstructabilityScorer,
    ) -> Result<SmartReport, ApiError> {
        tracing::info!(beam = %input.label, scorer = scorer.name(), "smart analysis started");
        let design = self.design(input)?;
        let settings = self.settings();

        // Optimize and vary the section the design settled on
        let settled = BeamDesignInput {
            geometry: design.geometry,
            ..input.clone()
        };

        let design_cost = design
            .detailing
            .as_ref()
            .map(|d| cost_breakdown(d, &design.geometry, &settings.cost));

        let request = OptimizationRequest {
            geometry: &settled.geometry,
            materials: &settled.materials,
            load_cases: &settled.load_cases,
            settings,
            tables: self.tables(),
        };
        let optimization = match optimize_cost(&request, &settings.cost) {
            Ok(optimal) => Some(optimal),
            Err(CalcError::Configuration { .. }) => None,
            Err(e) => return Err(e.into()),
        };

        let savings = match (&design_cost, &optimization) {
            (Some(cost), Some(optimal)) if design.passed && optimal.feasible => {
                Some(cost.total_cost - optimal.chosen().cost.total_cost)
            }
            _ => None,
        };

        let sensitivity = self.sensitivity(&settled, &design);
        let robust = sensitivity.iter().all(|s| s.passed);
        let constructability = design
            .detailing
            .as_ref()
            .map(|d| scorer.score(d, &design.geometry));

        let recommendations = recommend(
            &design,
            optimization.as_ref(),
            savings,
            &sensitivity,
            constructability.as_ref(),
        );

        tracing::info!(
            beam = %input.label,
            robust,
            score = constructability.as_ref().map(|c| c.score),
            "smart analysis finished"
        );

        Ok(SmartReport {
            label: input.label.clone(),
            design,
            design_cost,
            optimization,
            savings,
            sensitivity,
            robust,
            constructability,
            scorer: scorer.name().to_string(),
            recommendations,
        })
    }

    fn sensitivity(
        &self,
        input: &BeamDesignInput,
        base: &BeamDesignResult,
    ) -> Vec<SensitivityCase> {
        let geometry = input.geometry;
        let mut variants: Vec<(SensitivityParameter, String, f64, BeamDesignInput)> = Vec::new();

        for factor in [0.9, 1.1] {
            let label = format!("{:+.0}%", (factor - 1.0) * 100.0);
            let mut varied = input.clone();
            varied.geometry.width_mm = geometry.width_mm * factor;
            let width = varied.geometry.width_mm;
            variants.push((SensitivityParameter::Width, label.clone(), width, varied));

            let mut varied = input.clone();
            varied.geometry = geometry.deepened(geometry.total_depth_mm * (factor - 1.0));
            let depth = varied.geometry.total_depth_mm;
            variants.push((SensitivityParameter::Depth, label, depth, varied));
        }
        let grades = [
            input.materials.concrete.next_weaker(),
            input.materials.concrete.next_stronger(),
        ];
        for grade in grades.into_iter().flatten() {
            let mut varied = input.clone();
            varied.materials.concrete = grade;
            variants.push((
                SensitivityParameter::ConcreteGrade,
                grade.to_string(),
                grade.fck(),
                varied,
            ));
        }

        let base_utilization = base.compliance.max_utilization();
        variants
            .into_iter()
            .map(|(parameter, variation, value, varied)| {
                let outcome = varied
                    .validate()
                    .and_then(|_| self.design_once(&varied, &varied.geometry));
                match outcome {
                    Ok(result) => {
                        let utilization = result.compliance.max_utilization();
                        SensitivityCase {
                            parameter,
                            variation,
                            value,
                            passed: result.passed,
                            max_utilization: Some(utilization),
                            utilization_change: Some(utilization - base_utilization),
                            ast_required_mm2: Some(result.demand.ast_required_mm2),
                            failed_categories: result.failed_categories(),
                            error: None,
                        }
                    }
                    Err(e) => SensitivityCase {
                        parameter,
                        variation,
                        value,
                        passed: false,
                        max_utilization: None,
                        utilization_change: None,
                        ast_required_mm2: None,
                        failed_categories: Vec::new(),
                        error: Some(e.to_string()),
                    },
                }
            })
            .collect()
    }
}

fn recommend(
    design: &BeamDesignResult,
    optimization: Option<&OptimalDesign>,
    savings: Option<f64>,
    sensitivity: &[SensitivityCase],
    constructability: Option<&ConstructabilityScore>,
) -> Vec<String> {
    let mut notes = Vec::new();

    if !design.passed {
        notes.push(format!(
            "Design fails {}; revise the section before detailing",
            design.failed_categories().join(", ")
        ));
    }

    if let (Some(saved), Some(optimal)) = (savings, optimization) {
        if saved > 1e-6 {
            let chosen = optimal.chosen();
            notes.push(format!(
                "Use {} to save {saved:.0} {}",
                chosen.description, chosen.cost.currency
            ));
        }
    }
    if optimization.is_some_and(|o| !o.feasible) {
        notes.push("No compliant bar arrangement exists for this section".to_string());
    }

    for case in sensitivity.iter().filter(|c| !c.passed) {
        let parameter = match case.parameter {
            SensitivityParameter::Width => "width",
            SensitivityParameter::Depth => "depth",
            SensitivityParameter::ConcreteGrade => "concrete grade",
        };
        let reason = match &case.error {
            Some(error) => error.clone(),
            None => format!("fails {}", case.failed_categories.join(", ")),
        };
        notes.push(format!("Sensitive to {parameter} ({}): {reason}", case.variation));
    }

    if let Some(score) = constructability.filter(|s| s.score < 60.0) {
        notes.push(format!(
            "Constructability score {:.0}: consider fewer bar sizes or a wider section",
            score.score
        ));
    }
    notes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::inputs::LoadCase;
    use crate::materials::{ConcreteGrade, MaterialProperties, SteelGrade};
    use crate::settings::DesignSettings;

    fn input() -> BeamDesignInput {
        BeamDesignInput {
            label: "B1".to_string(),
            geometry: BeamGeometry::new(4000.0, 230.0, 450.0, 400.0, 25.0),
            materials: MaterialProperties::new(ConcreteGrade::M20, SteelGrade::Fe415),
            load_cases: vec![LoadCase::new("ULS", 80.0, 90.0)],
        }
    }

    struct FixedScorer;

    impl ConstructabilityScorer for FixedScorer {
        fn name(&self) -> &str {
            "fixed"
        }

        fn score(
            &self,
            _detailing: &DetailingResult,
            _geometry: &BeamGeometry,
        ) -> ConstructabilityScore {
            ConstructabilityScore {
                score: 42.0,
                penalties: Vec::new(),
            }
        }
    }

    #[test]
    fn test_smart_report() {
        let designer = Designer::standard(DesignSettings::default()).unwrap();
        let report = designer.smart(&input()).unwrap();
        assert!(report.design.passed);
        assert!(report.design_cost.is_some());
        let optimal = report.optimization.as_ref().unwrap();
        assert!(optimal.feasible);
        // The optimizer never does worse than the default detailing
        assert!(report.savings.unwrap() >= -1e-6);
        assert_eq!(report.sensitivity.len(), 6);
        assert_eq!(report.scorer, "default");
    }

    #[test]
    fn test_sensitivity_variations() {
        let designer = Designer::standard(DesignSettings::default()).unwrap();
        let report = designer.smart(&input()).unwrap();
        let deeper = report
            .sensitivity
            .iter()
            .find(|s| s.parameter == SensitivityParameter::Depth && s.variation == "+10%")
            .unwrap();
        assert!((deeper.value - 495.0).abs() < 1e-9);
        assert!(deeper.passed);
        assert!(deeper.ast_required_mm2.unwrap() < report.design.demand.ast_required_mm2);

        let grades: Vec<&str> = report
            .sensitivity
            .iter()
            .filter(|s| s.parameter == SensitivityParameter::ConcreteGrade)
            .map(|s| s.variation.as_str())
            .collect();
        assert_eq!(grades, vec!["M15", "M25"]);
    }

    #[test]
    fn test_default_score_scenario_one() {
        let designer = Designer::standard(DesignSettings::default()).unwrap();
        let design = designer.design(&input()).unwrap();
        let detailing = design.detailing.as_ref().unwrap();
        let score = DefaultConstructabilityScorer::default().score(detailing, &design.geometry);
        // 16 + 12 + 8 mm bars and 33 mm clear spacing
        assert!(score.score > 70.0 && score.score < 100.0, "{score:?}");
        assert!(score.penalties.iter().any(|p| p.reason.contains("bar diameters")));
    }

    #[test]
    fn test_pluggable_scorer() {
        let designer = Designer::standard(DesignSettings::default()).unwrap();
        let report = designer.smart_with(&input(), &FixedScorer).unwrap();
        assert_eq!(report.scorer, "fixed");
        assert_eq!(report.constructability.unwrap().score, 42.0);
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.contains("Constructability score 42")));
    }

    #[test]
    fn test_score_clamped() {
        let score = ConstructabilityScore::from_penalties(vec![ScorePenalty {
            reason: "everything".to_string(),
            points: 250.0,
        }]);
        assert_eq!(score.score, 0.0);
    }
}
