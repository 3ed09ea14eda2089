//! # Rebar Cost Optimizer
//!
//! Plain enumeration over buildable tension-bar arrangements. Every
//! candidate is fully detailed and re-checked against all load cases, since
//! a different bar count shifts the steel percentage and with it the
//! design shear strength.
//!
//! ## Selection
//!
//! 1. Compliant candidates only, lowest total cost
//! 2. Equal cost (within 1e-6): fewer distinct bar diameters
//! 3. Still equal: enumeration order
//!
//! When nothing complies the result is flagged infeasible and carries the
//! least-violating candidate (fewest failed categories, then lowest
//! utilization, then cost) for diagnosis.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::calculations::compliance::{aggregate, governing_demand, ComplianceSummary};
use crate::calculations::detailing::{
    compare_preference, enumerate_arrangements, generate_detailing, BarArrangement, BarPosition,
    DetailingRequest, DetailingResult, LayoutParams,
};
use crate::calculations::inputs::{BeamGeometry, LoadCase};
use crate::clauses::Clause;
use crate::errors::{CalcError, CalcResult};
use crate::materials::MaterialProperties;
use crate::settings::{CostTable, DesignSettings};
use crate::tables::DesignTables;
use crate::units::mm_to_m;

const COST_TOLERANCE: f64 = 1e-6;

/// Cost of one detailed beam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub steel_weight_kg: f64,
    pub steel_cost: f64,
    pub concrete_volume_m3: f64,
    pub concrete_cost: f64,
    pub formwork_area_m2: f64,
    pub formwork_cost: f64,
    pub total_cost: f64,
    /// Total cost per metre of span
    pub cost_per_m: f64,
    pub currency: String,
}

/// Price a detailed beam.
///
/// Steel is priced per bar mark with the diameter factor applied. Concrete
/// and formwork follow the section shape; the top face is left unformed.
pub fn cost_breakdown(
    detailing: &DetailingResult,
    geometry: &BeamGeometry,
    cost: &CostTable,
) -> CostBreakdown {
    let steel_weight_kg = detailing.total_steel_weight_kg();
    let steel_cost: f64 = detailing
        .bar_marks
        .iter()
        .map(|m| m.total_weight_kg * cost.steel_rate(m.diameter_mm))
        .sum();

    let span_m = mm_to_m(geometry.span_mm);
    let (area_mm2, formed_perimeter_mm) = match geometry.section.flange() {
        Some((flange_width, flange_depth)) => (
            geometry.width_mm * (geometry.total_depth_mm - flange_depth)
                + flange_width * flange_depth,
            flange_width + 2.0 * geometry.total_depth_mm,
        ),
        None => (
            geometry.width_mm * geometry.total_depth_mm,
            geometry.width_mm + 2.0 * geometry.total_depth_mm,
        ),
    };
    let concrete_volume_m3 = area_mm2 / 1e6 * span_m;
    let formwork_area_m2 = mm_to_m(formed_perimeter_mm) * span_m;
    let concrete_cost = concrete_volume_m3 * cost.concrete_per_m3;
    let formwork_cost = formwork_area_m2 * cost.formwork_per_m2;
    let total_cost = steel_cost + concrete_cost + formwork_cost;

    CostBreakdown {
        steel_weight_kg,
        steel_cost,
        concrete_volume_m3,
        concrete_cost,
        formwork_area_m2,
        formwork_cost,
        total_cost,
        cost_per_m: if span_m > 0.0 { total_cost / span_m } else { 0.0 },
        currency: cost.currency.clone(),
    }
}

/// One enumerated arrangement with its verdict. The detailing itself is
/// only kept for the chosen candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateDesign {
    pub index: usize,
    pub bottom: BarArrangement,
    /// e.g. "4-16φ + 2-12φ top, 8φ 2L @ 150"
    pub description: String,
    pub cost: CostBreakdown,
    pub distinct_diameters: usize,
    pub compliant: bool,
    pub failed_categories: Vec<String>,
    pub max_utilization: f64,
}

/// Optimizer outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimalDesign {
    /// At least one candidate passed every check
    pub feasible: bool,
    /// Index into `candidates` of the chosen (or best-effort) design
    pub chosen_index: usize,
    /// Detailing of the chosen candidate
    pub detailing: DetailingResult,
    /// Compliance of the chosen candidate
    pub compliance: ComplianceSummary,
    pub candidates: Vec<CandidateDesign>,
    /// Arrangements dropped because no stirrup layout fitted them
    pub skipped: usize,
    pub diagnostic: Option<String>,
}

impl OptimalDesign {
    pub fn chosen(&self) -> &CandidateDesign {
        &self.candidates[self.chosen_index]
    }

    pub fn compliant_count(&self) -> usize {
        self.candidates.iter().filter(|c| c.compliant).count()
    }
}

/// Everything the optimizer needs besides the cost rates.
#[derive(Debug, Clone, Copy)]
pub struct OptimizationRequest<'a> {
    pub geometry: &'a BeamGeometry,
    pub materials: &'a MaterialProperties,
    pub load_cases: &'a [LoadCase],
    pub settings: &'a DesignSettings,
    pub tables: &'a DesignTables,
}

fn describe(detailing: &DetailingResult) -> String {
    let top = if detailing.top.is_hanger {
        format!("{} hangers", detailing.top.description())
    } else {
        format!("{} top", detailing.top.description())
    };
    format!(
        "{} + {top}, {}φ {}L @ {:.0}",
        detailing.bottom.description(),
        detailing.stirrup.diameter_mm,
        detailing.stirrup.legs,
        detailing.support_spacing_mm()
    )
}

fn cheaper(a: &CandidateDesign, b: &CandidateDesign) -> Ordering {
    let cost = a.cost.total_cost - b.cost.total_cost;
    if cost.abs() > COST_TOLERANCE {
        return cost.partial_cmp(&0.0).unwrap_or(Ordering::Equal);
    }
    a.distinct_diameters
        .cmp(&b.distinct_diameters)
        .then(a.index.cmp(&b.index))
}

fn least_violating(a: &CandidateDesign, b: &CandidateDesign) -> Ordering {
    a.failed_categories
        .len()
        .cmp(&b.failed_categories.len())
        .then(
            a.max_utilization
                .partial_cmp(&b.max_utilization)
                .unwrap_or(Ordering::Equal),
        )
        .then_with(|| cheaper(a, b))
}

/// Find the cheapest compliant tension-bar arrangement.
///
/// Fails only on invalid input or when no arrangement can be laid out at
/// all. A design with no compliant option comes back with
/// `feasible == false`.
pub fn optimize_cost(request: &OptimizationRequest, cost: &CostTable) -> CalcResult<OptimalDesign> {
    let OptimizationRequest {
        geometry,
        materials,
        load_cases,
        settings,
        tables,
    } = *request;
    geometry.validate()?;
    settings.validate()?;
    cost.validate()?;

    let demand = governing_demand(load_cases, geometry, materials, tables)?;
    let first_stirrup = settings.stirrup_diameters.first().copied().unwrap_or(8);
    let params = LayoutParams::new(geometry, first_stirrup, settings.aggregate_size_mm);
    let mut arrangements = enumerate_arrangements(
        BarPosition::Bottom,
        demand.ast_required_mm2,
        &params,
        &settings.bar_diameters,
        settings.optimizer_extra_bars,
        settings.max_layers,
    );
    arrangements.sort_by(compare_preference);

    let detailing_request = DetailingRequest {
        geometry,
        materials,
        ast_required_mm2: demand.ast_required_mm2,
        asc_required_mm2: demand.asc_required_mm2,
        vu_kn: demand.vu_kn,
        mu_knm: demand.mu_knm,
        settings,
        tables,
    };

    let mut candidates = Vec::with_capacity(arrangements.len());
    let mut evaluated: Vec<(DetailingResult, ComplianceSummary)> = Vec::new();
    let mut skipped = 0;

    for arrangement in &arrangements {
        let detailing = match generate_detailing(&detailing_request, Some(arrangement)) {
            Ok(d) => d,
            Err(CalcError::Configuration { .. }) => {
                skipped += 1;
                continue;
            }
            Err(e) => return Err(e),
        };
        let compliance = aggregate(
            load_cases,
            geometry,
            materials,
            Some(&detailing),
            settings,
            tables,
        )?;
        candidates.push(CandidateDesign {
            index: candidates.len(),
            bottom: detailing.bottom.clone(),
            description: describe(&detailing),
            cost: cost_breakdown(&detailing, geometry, cost),
            distinct_diameters: detailing.distinct_diameters().len(),
            compliant: compliance.passed,
            failed_categories: compliance.failed_categories(),
            max_utilization: compliance.max_utilization(),
        });
        evaluated.push((detailing, compliance));
    }

    let feasible = candidates.iter().any(|c| c.compliant);
    let chosen = if feasible {
        candidates.iter().filter(|c| c.compliant).min_by(|a, b| cheaper(a, b))
    } else {
        candidates.iter().min_by(|a, b| least_violating(a, b))
    };
    let Some(chosen_index) = chosen.map(|c| c.index) else {
        return Err(CalcError::configuration(
            demand.ast_required_mm2,
            params.available_width_mm(),
            "No bar arrangement fits the section width",
            Clause::BarSpacing.citation(),
        ));
    };

    let diagnostic = (!feasible).then(|| {
        let best = &candidates[chosen_index];
        format!(
            "No compliant arrangement among {} candidates; best effort {} fails {}",
            candidates.len(),
            best.description,
            best.failed_categories.join(", ")
        )
    });

    // `evaluated` and `candidates` are pushed together
    let (detailing, compliance) = evaluated.swap_remove(chosen_index);

    match &diagnostic {
        Some(message) => tracing::warn!(%message, "optimizer found no compliant design"),
        None => tracing::info!(
            candidates = candidates.len(),
            chosen = %candidates[chosen_index].description,
            total_cost = candidates[chosen_index].cost.total_cost,
            "optimizer selected design"
        ),
    }

    Ok(OptimalDesign {
        feasible,
        chosen_index,
        detailing,
        compliance,
        candidates,
        skipped,
        diagnostic,
    })
}
