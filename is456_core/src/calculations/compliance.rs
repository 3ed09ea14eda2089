//! # Compliance Aggregation
//!
//! Runs every engine over every load case and reduces the results to one
//! verdict per check category. Each category reports its governing case: a
//! failing case beats a passing one, then the highest utilization wins, and
//! on equal footing the first case in input order is kept.
//!
//! With a [`DetailingResult`] the checks use the provided bars (moment
//! capacity, stirrup capacity, actual bar spacing). Without one they use the
//! required areas and the preferred arrangement for each case.

use serde::{Deserialize, Serialize};

use crate::calculations::detailing::{
    compare_preference, enumerate_arrangements, BarArrangement, BarPosition, DetailingResult,
    LayoutParams,
};
use crate::calculations::ductile::{apply_ductile_rules, check_ductility, DuctilityCheck};
use crate::calculations::flexure::{compute_flexure, moment_capacity, FlexureResult};
use crate::calculations::inputs::{validate_load_cases, BeamGeometry, LoadCase};
use crate::calculations::serviceability::{
    check_crack_width, check_deflection, CrackWidthCheck, DeflectionCheck,
};
use crate::calculations::shear::{
    compute_shear, meets_minimum_reinforcement, shear_capacity_kn, ShearResult,
};
use crate::errors::CalcResult;
use crate::materials::rebar::bar_area_mm2;
use crate::materials::MaterialProperties;
use crate::settings::DesignSettings;
use crate::tables::DesignTables;

/// Check categories, in report order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CheckCategory {
    Flexure,
    Shear,
    Ductility,
    Deflection,
    CrackWidth,
}

impl CheckCategory {
    pub const ALL: [CheckCategory; 5] = [
        CheckCategory::Flexure,
        CheckCategory::Shear,
        CheckCategory::Ductility,
        CheckCategory::Deflection,
        CheckCategory::CrackWidth,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            CheckCategory::Flexure => "Flexure",
            CheckCategory::Shear => "Shear",
            CheckCategory::Ductility => "Ductility",
            CheckCategory::Deflection => "Deflection",
            CheckCategory::CrackWidth => "CrackWidth",
        }
    }
}

impl std::fmt::Display for CheckCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// One category verdict for one case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseOutcome {
    pub category: CheckCategory,
    /// Demand / capacity; above 1.0 means failure for capacity checks
    pub utilization: f64,
    pub passed: bool,
    pub message: String,
    pub clause: String,
}

/// Everything computed for one load case, kept for audit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseEvaluation {
    pub case_index: usize,
    pub label: String,
    pub flexure: FlexureResult,
    pub shear: ShearResult,
    pub ductility: Option<DuctilityCheck>,
    pub deflection: DeflectionCheck,
    pub crack: CrackWidthCheck,
    pub outcomes: Vec<CaseOutcome>,
}

impl CaseEvaluation {
    pub fn outcome(&self, category: CheckCategory) -> Option<&CaseOutcome> {
        self.outcomes.iter().find(|o| o.category == category)
    }
}

/// Category verdict over all cases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCheck {
    pub category: CheckCategory,
    pub passed: bool,
    pub governing_case_index: usize,
    pub governing_case_label: String,
    pub utilization: f64,
    pub message: String,
    pub clause: String,
}

/// Compliance verdict for a beam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceSummary {
    /// Every category passes for its governing case
    pub passed: bool,
    /// One entry per applicable category, in category order
    pub checks: Vec<CategoryCheck>,
    /// Per-case results
    pub cases: Vec<CaseEvaluation>,
    /// Checks ran against provided bars
    pub detailing_checked: bool,
}

impl ComplianceSummary {
    /// Verdict for a category, if it was checked
    pub fn governing(&self, category: CheckCategory) -> Option<&CategoryCheck> {
        self.checks.iter().find(|c| c.category == category)
    }

    /// Names of failing categories
    pub fn failed_categories(&self) -> Vec<String> {
        self.checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.category.to_string())
            .collect()
    }

    /// Highest utilization across categories
    pub fn max_utilization(&self) -> f64 {
        self.checks
            .iter()
            .map(|c| c.utilization)
            .fold(0.0, f64::max)
    }

    /// Category with the highest utilization
    pub fn governing_check(&self) -> Option<&CategoryCheck> {
        self.checks.iter().fold(None, |best: Option<&CategoryCheck>, c| match best {
            Some(b) if b.utilization >= c.utilization => Some(b),
            _ => Some(c),
        })
    }
}

/// Largest demand over all load cases, taken per quantity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoverningDemand {
    pub mu_knm: f64,
    pub vu_kn: f64,
    pub ast_required_mm2: f64,
    pub asc_required_mm2: f64,
    /// Case with the largest tension steel requirement
    pub flexure_case_index: usize,
}

/// Envelope of flexural steel and shear over the load cases.
///
/// Each quantity is maximised on its own; ties keep the earlier case.
pub fn governing_demand(
    load_cases: &[LoadCase],
    geometry: &BeamGeometry,
    materials: &MaterialProperties,
    tables: &DesignTables,
) -> CalcResult<GoverningDemand> {
    validate_load_cases(load_cases)?;
    let mut demand = GoverningDemand {
        mu_knm: 0.0,
        vu_kn: 0.0,
        ast_required_mm2: 0.0,
        asc_required_mm2: 0.0,
        flexure_case_index: 0,
    };
    for (index, case) in load_cases.iter().enumerate() {
        let flexure = compute_flexure(geometry, materials, case.mu_knm, tables)?;
        if index == 0 || flexure.ast_required_mm2 > demand.ast_required_mm2 {
            demand.ast_required_mm2 = flexure.ast_required_mm2;
            demand.flexure_case_index = index;
        }
        demand.asc_required_mm2 = demand.asc_required_mm2.max(flexure.asc_required_mm2);
        demand.mu_knm = demand.mu_knm.max(case.mu_knm);
        demand.vu_kn = demand.vu_kn.max(case.vu_kn);
    }
    Ok(demand)
}

/// Tension bars a case is checked with when no detailing is given
fn provisional_bars(
    geometry: &BeamGeometry,
    settings: &DesignSettings,
    ast_required_mm2: f64,
) -> BarArrangement {
    let first_stirrup = settings.stirrup_diameters.first().copied().unwrap_or(8);
    let params = LayoutParams::new(geometry, first_stirrup, settings.aggregate_size_mm);
    let mut options = enumerate_arrangements(
        BarPosition::Bottom,
        ast_required_mm2,
        &params,
        &settings.bar_diameters,
        settings.optimizer_extra_bars,
        settings.max_layers,
    );
    options.sort_by(compare_preference);
    options.into_iter().next().unwrap_or_else(|| {
        // Nothing fits: lay out the largest bars anyway so spacing can be reported
        let dia = settings.bar_diameters.iter().copied().max().unwrap_or(32);
        let count = ((ast_required_mm2 / bar_area_mm2(dia)).ceil() as u32).max(2);
        BarArrangement::layout(
            BarPosition::Bottom,
            count,
            dia,
            settings.max_layers,
            ast_required_mm2,
            &params,
        )
    })
}

/// Run all checks for every load case and aggregate per category.
pub fn aggregate(
    load_cases: &[LoadCase],
    geometry: &BeamGeometry,
    materials: &MaterialProperties,
    detailing: Option<&DetailingResult>,
    settings: &DesignSettings,
    tables: &DesignTables,
) -> CalcResult<ComplianceSummary> {
    validate_load_cases(load_cases)?;
    geometry.validate()?;

    let cases = load_cases
        .iter()
        .enumerate()
        .map(|(index, case)| {
            evaluate_case(index, case, geometry, materials, detailing, settings, tables)
        })
        .collect::<CalcResult<Vec<_>>>()?;

    let checks: Vec<CategoryCheck> = CheckCategory::ALL
        .iter()
        .filter_map(|&category| governing_check(category, &cases))
        .collect();
    let passed = checks.iter().all(|c| c.passed);

    let summary = ComplianceSummary {
        passed,
        checks,
        cases,
        detailing_checked: detailing.is_some(),
    };

    if passed {
        tracing::info!(
            cases = load_cases.len(),
            max_utilization = summary.max_utilization(),
            "compliance passed"
        );
    } else {
        tracing::warn!(failed = ?summary.failed_categories(), "compliance failed");
    }
    Ok(summary)
}

fn governing_check(category: CheckCategory, cases: &[CaseEvaluation]) -> Option<CategoryCheck> {
    let mut worst: Option<(&CaseEvaluation, &CaseOutcome)> = None;
    for case in cases {
        let Some(outcome) = case.outcome(category) else {
            continue;
        };
        let replace = match worst {
            None => true,
            Some((_, current)) => {
                (current.passed && !outcome.passed)
                    || (current.passed == outcome.passed
                        && outcome.utilization > current.utilization)
            }
        };
        if replace {
            worst = Some((case, outcome));
        }
    }

    worst.map(|(case, outcome)| CategoryCheck {
        category,
        passed: outcome.passed,
        governing_case_index: case.case_index,
        governing_case_label: case.label.clone(),
        utilization: outcome.utilization,
        message: outcome.message.clone(),
        clause: outcome.clause.clone(),
    })
}

fn evaluate_case(
    index: usize,
    case: &LoadCase,
    geometry: &BeamGeometry,
    materials: &MaterialProperties,
    detailing: Option<&DetailingResult>,
    settings: &DesignSettings,
    tables: &DesignTables,
) -> CalcResult<CaseEvaluation> {
    let flexure = compute_flexure(geometry, materials, case.mu_knm, tables)?;
    let mut outcomes = Vec::with_capacity(CheckCategory::ALL.len());

    let (bars, ast_provided, asc_provided, effective_depth) = match detailing {
        Some(detail) => {
            let asc = if detail.top.is_hanger { 0.0 } else { detail.top.area_mm2 };
            (
                detail.bottom.clone(),
                detail.bottom.area_mm2,
                asc,
                detail.effective_depth_mm(geometry),
            )
        }
        None => (
            provisional_bars(geometry, settings, flexure.ast_required_mm2),
            flexure.ast_required_mm2,
            flexure.asc_required_mm2,
            geometry.effective_depth_mm,
        ),
    };

    // Flexure
    let flexure_outcome = if !flexure.design_achievable {
        CaseOutcome {
            category: CheckCategory::Flexure,
            utilization: (flexure.ast_required_mm2 / flexure.ast_max_mm2)
                .max(flexure.mu_knm / flexure.mu_lim_knm)
                .max(1.0),
            passed: false,
            message: flexure
                .diagnostic
                .clone()
                .unwrap_or_else(|| "Design not achievable".to_string()),
            clause: flexure.clause.clone(),
        }
    } else if detailing.is_some() {
        let capacity = moment_capacity(
            geometry,
            materials,
            ast_provided,
            asc_provided,
            effective_depth,
            tables,
        )?;
        let utilization = (case.mu_knm / capacity.capacity_knm)
            .max(flexure.ast_required_mm2 / ast_provided);
        let spacing_ok = bars.fits();
        let passed = utilization <= 1.0 + 1e-9 && spacing_ok;
        let message = if !spacing_ok {
            format!(
                "{} clear spacing {:.1} mm below {:.0} mm",
                bars.description(),
                bars.clear_spacing_mm,
                bars.min_clear_spacing_mm
            )
        } else {
            format!(
                "Mu = {:.1} kN·m, capacity {:.1} kN·m with {}",
                case.mu_knm,
                capacity.capacity_knm,
                bars.description()
            )
        };
        CaseOutcome {
            category: CheckCategory::Flexure,
            utilization,
            passed,
            message,
            clause: flexure.clause.clone(),
        }
    } else {
        CaseOutcome {
            category: CheckCategory::Flexure,
            utilization: flexure.ast_required_mm2 / flexure.ast_max_mm2,
            passed: true,
            message: format!(
                "Ast required {:.0} mm² (max {:.0} mm²)",
                flexure.ast_required_mm2, flexure.ast_max_mm2
            ),
            clause: flexure.clause.clone(),
        }
    };
    outcomes.push(flexure_outcome);

    // Shear
    let pt = 100.0 * ast_provided / (geometry.width_mm * geometry.effective_depth_mm);
    let mut shear = compute_shear(geometry, materials, case.vu_kn, pt, tables, settings)?;
    if settings.ductile_detailing {
        shear = apply_ductile_rules(&shear, geometry);
    }
    let shear_outcome = match detailing {
        _ if !shear.section_adequate() => CaseOutcome {
            category: CheckCategory::Shear,
            utilization: shear.stress_ratio(),
            passed: false,
            message: shear
                .diagnostic
                .clone()
                .unwrap_or_else(|| "Section inadequate in shear".to_string()),
            clause: shear.clause.clone(),
        },
        Some(detail) => {
            let support_spacing = detail.support_spacing_mm();
            let capacity = shear_capacity_kn(
                geometry,
                materials,
                tables,
                pt,
                &detail.stirrup,
                support_spacing,
            );
            let utilization = if capacity > 0.0 { case.vu_kn / capacity } else { 1.0 };
            let widest = detail
                .stirrup_zones
                .iter()
                .map(|z| z.spacing_mm)
                .fold(0.0, f64::max);
            let minimum_ok =
                meets_minimum_reinforcement(geometry, materials, &detail.stirrup, widest);
            let confinement_ok = match shear.confinement {
                Some(zone) => support_spacing <= zone.spacing_mm + 1e-9,
                None => true,
            };
            let passed = utilization <= 1.0 + 1e-9 && minimum_ok && confinement_ok;
            let message = if !minimum_ok {
                format!("Stirrup spacing {widest:.0} mm exceeds the minimum-reinforcement limit")
            } else if !confinement_ok {
                format!(
                    "Support stirrup spacing {support_spacing:.0} mm exceeds the confinement limit"
                )
            } else {
                format!(
                    "Vu = {:.1} kN, capacity {capacity:.1} kN with {}-legged {} mm @ {:.0}",
                    case.vu_kn,
                    detail.stirrup.legs,
                    detail.stirrup.diameter_mm,
                    support_spacing
                )
            };
            CaseOutcome {
                category: CheckCategory::Shear,
                utilization,
                passed,
                message,
                clause: shear.clause.clone(),
            }
        }
        None => CaseOutcome {
            category: CheckCategory::Shear,
            utilization: shear.stress_ratio(),
            passed: true,
            message: format!(
                "τv = {:.2} N/mm², τc = {:.2}, τc,max = {:.2}",
                shear.tau_v_n_mm2, shear.tau_c_n_mm2, shear.tau_c_max_n_mm2
            ),
            clause: shear.clause.clone(),
        },
    };
    outcomes.push(shear_outcome);

    // Ductility
    let ductility = settings
        .ductile_detailing
        .then(|| check_ductility(geometry, materials, ast_provided));
    if let Some(check) = &ductility {
        outcomes.push(CaseOutcome {
            category: CheckCategory::Ductility,
            utilization: check.utilization,
            passed: check.passes(),
            message: if check.messages.is_empty() {
                "IS 13920 geometry and steel limits met".to_string()
            } else {
                check.messages.join("; ")
            },
            clause: check.clause.clone(),
        });
    }

    // Deflection
    let deflection = check_deflection(
        geometry,
        materials,
        flexure.ast_required_mm2,
        ast_provided,
        asc_provided,
        tables,
    );
    outcomes.push(CaseOutcome {
        category: CheckCategory::Deflection,
        utilization: deflection.utilization,
        passed: deflection.passed,
        message: format!(
            "l/d = {:.1}, allowable {:.1}",
            deflection.actual_ratio, deflection.allowable_ratio
        ),
        clause: deflection.clause.clone(),
    });

    // Crack width
    let crack = check_crack_width(
        geometry,
        materials,
        &bars,
        case.service_moment(),
        settings.serviceability_level,
        settings.crack_width_limit_mm,
        tables,
    );
    outcomes.push(CaseOutcome {
        category: CheckCategory::CrackWidth,
        utilization: crack.utilization,
        passed: crack.passed,
        message: match crack.crack_width_mm {
            Some(w) => format!("Crack width {w:.3} mm, limit {:.2} mm", crack.limit_mm),
            None => format!(
                "Clear spacing {:.0} mm, limit {:.0} mm",
                crack.actual_clear_spacing_mm, crack.max_clear_spacing_mm
            ),
        },
        clause: crack.clause.clone(),
    });

    tracing::debug!(
        case = %case.label,
        failed = outcomes.iter().filter(|o| !o.passed).count(),
        "case evaluated"
    );

    Ok(CaseEvaluation {
        case_index: index,
        label: case.label.clone(),
        flexure,
        shear,
        ductility,
        deflection,
        crack,
        outcomes,
    })
}
