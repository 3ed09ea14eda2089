//! # Reinforcement Detailing
//!
//! Turns required steel areas into buildable bar layouts: bar count and
//! diameter, layers, clear spacing, top bars, stirrup zones, development and
//! lap lengths, and bar marks for schedule consumers.
//!
//! ## Layout Rules
//!
//! - Available width `b − 2·cover − 2·stirrup`
//! - Clear spacing ≥ max(bar diameter, aggregate + 5, 25) (Cl. 26.3.2)
//! - A second layer needs at least 4 bars; vertical gap between layers
//!   ≥ max(15, ⅔·aggregate, bar diameter)
//! - Development length `Ld = φ·0.87·fy / (4·τbd)`, τbd raised 60% for
//!   deformed bars and a further 25% in compression (Cl. 26.2.1)
//! - Lap length max(Ld, 30φ) in tension, max(Ld, 24φ) in compression
//!
//! ## Example
//!
//! ```rust
//! use is456_core::calculations::detailing::{
//!     enumerate_arrangements, BarPosition, LayoutParams,
//! };
//! use is456_core::calculations::inputs::BeamGeometry;
//!
//! let geometry = BeamGeometry::new(4000.0, 230.0, 450.0, 400.0, 25.0);
//! let params = LayoutParams::new(&geometry, 8, 20.0);
//! let options = enumerate_arrangements(
//!     BarPosition::Bottom, 650.0, &params, &[12, 16, 20], 2, 2,
//! );
//! assert!(options.iter().all(|a| a.area_mm2 >= 650.0 && a.fits()));
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::calculations::ductile::{
    apply_ductile_rules, confinement_spacing_with_bars, FIRST_HOOP_OFFSET_MM,
};
use crate::calculations::flexure::moment_capacity;
use crate::calculations::inputs::{BeamGeometry, SupportCondition};
use crate::calculations::shear::{
    compute_shear, required_spacing_mm, round_down_spacing, StirrupChoice,
};
use crate::clauses::Clause;
use crate::errors::{CalcError, CalcResult};
use crate::materials::rebar::{bar_area_mm2, bar_unit_weight_kg_per_m, is_standard_diameter};
use crate::materials::MaterialProperties;
use crate::settings::DesignSettings;
use crate::tables::DesignTables;

/// Which face the bars sit against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarPosition {
    /// Tension face (sagging)
    Bottom,
    /// Compression face: compression steel or hanger bars
    Top,
}

/// Section data needed to lay out bars
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParams {
    pub width_mm: f64,
    pub total_depth_mm: f64,
    pub clear_cover_mm: f64,
    pub stirrup_diameter_mm: u32,
    pub aggregate_size_mm: f64,
}

impl LayoutParams {
    pub fn new(geometry: &BeamGeometry, stirrup_diameter_mm: u32, aggregate_size_mm: f64) -> Self {
        LayoutParams {
            width_mm: geometry.width_mm,
            total_depth_mm: geometry.total_depth_mm,
            clear_cover_mm: geometry.clear_cover_mm,
            stirrup_diameter_mm,
            aggregate_size_mm,
        }
    }

    /// Width inside the stirrups (mm)
    pub fn available_width_mm(&self) -> f64 {
        self.width_mm - 2.0 * (self.clear_cover_mm + self.stirrup_diameter_mm as f64)
    }

    /// Distance from a face to the centre of an outer-layer bar (mm)
    pub fn face_to_bar_centre_mm(&self, diameter_mm: u32) -> f64 {
        self.clear_cover_mm + self.stirrup_diameter_mm as f64 + diameter_mm as f64 / 2.0
    }
}

/// Minimum horizontal clear spacing between bars (mm)
pub fn min_clear_spacing_mm(diameter_mm: u32, aggregate_size_mm: f64) -> f64 {
    (diameter_mm as f64).max(aggregate_size_mm + 5.0).max(25.0)
}

/// Minimum vertical gap between bar layers (mm)
pub fn vertical_layer_gap_mm(diameter_mm: u32, aggregate_size_mm: f64) -> f64 {
    15.0_f64
        .max(2.0 * aggregate_size_mm / 3.0)
        .max(diameter_mm as f64)
}

/// Split `count` bars into layers, fullest layer first
fn split_layers(count: u32, layers: u32) -> Vec<u32> {
    let layers = layers.max(1);
    let base = count / layers;
    let extra = count % layers;
    (0..layers).map(|i| base + u32::from(i < extra)).collect()
}

/// One group of identical longitudinal bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarArrangement {
    pub position: BarPosition,
    /// Total number of bars
    pub count: u32,
    pub diameter_mm: u32,
    pub layers: u32,
    /// Bars in each layer, outermost first
    pub bars_per_layer: Vec<u32>,
    /// Area provided (mm²)
    pub area_mm2: f64,
    /// Area the arrangement was chosen for (mm²)
    pub required_area_mm2: f64,
    /// Clear spacing in the fullest layer (mm)
    pub clear_spacing_mm: f64,
    /// Minimum clear spacing allowed (mm)
    pub min_clear_spacing_mm: f64,
    /// Clear gap between layers (mm)
    pub vertical_gap_mm: f64,
    /// Distance from the near face to the bar group centroid (mm)
    pub centroid_from_face_mm: f64,
    pub stirrup_diameter_mm: u32,
    pub clear_cover_mm: f64,
    /// Nominal hanger bars, not designed steel
    pub is_hanger: bool,
}

impl BarArrangement {
    /// Lay out `count` bars in `layers` layers. Always succeeds; use
    /// [`BarArrangement::fits`] to see whether the layout is buildable.
    pub fn layout(
        position: BarPosition,
        count: u32,
        diameter_mm: u32,
        layers: u32,
        required_area_mm2: f64,
        params: &LayoutParams,
    ) -> Self {
        let bars_per_layer = split_layers(count, layers);
        let dia = diameter_mm as f64;
        let widest = bars_per_layer.first().copied().unwrap_or(0);
        let available = params.available_width_mm();
        let clear_spacing = if widest > 1 {
            (available - widest as f64 * dia) / (widest - 1) as f64
        } else {
            available - dia
        };
        let gap = vertical_layer_gap_mm(diameter_mm, params.aggregate_size_mm);

        let outer = params.face_to_bar_centre_mm(diameter_mm);
        let moment: f64 = bars_per_layer
            .iter()
            .enumerate()
            .map(|(i, &n)| n as f64 * (outer + i as f64 * (dia + gap)))
            .sum();
        let centroid = if count > 0 { moment / count as f64 } else { outer };

        BarArrangement {
            position,
            count,
            diameter_mm,
            layers: bars_per_layer.len() as u32,
            bars_per_layer,
            area_mm2: count as f64 * bar_area_mm2(diameter_mm),
            required_area_mm2,
            clear_spacing_mm: clear_spacing,
            min_clear_spacing_mm: min_clear_spacing_mm(diameter_mm, params.aggregate_size_mm),
            vertical_gap_mm: gap,
            centroid_from_face_mm: centroid,
            stirrup_diameter_mm: params.stirrup_diameter_mm,
            clear_cover_mm: params.clear_cover_mm,
            is_hanger: false,
        }
    }

    /// Nominal hanger bars at the top face
    pub fn hangers(count: u32, diameter_mm: u32, params: &LayoutParams) -> Self {
        let mut bars = Self::layout(BarPosition::Top, count, diameter_mm, 1, 0.0, params);
        bars.is_hanger = true;
        bars
    }

    /// Same bars laid out again with different section data
    pub fn relayout(&self, params: &LayoutParams) -> Self {
        let mut bars = Self::layout(
            self.position,
            self.count,
            self.diameter_mm,
            self.layers,
            self.required_area_mm2,
            params,
        );
        bars.is_hanger = self.is_hanger;
        bars
    }

    /// Buildable: two or more bars per layer, four or more bars before a
    /// second layer, clear spacing met
    pub fn fits(&self) -> bool {
        let layers_ok = self.bars_per_layer.iter().all(|&n| n >= 2)
            && (self.layers == 1 || self.count >= 4);
        layers_ok && self.clear_spacing_mm >= self.min_clear_spacing_mm - 1e-9
    }

    /// Clear spacing shortfall (mm), zero when spacing is met
    pub fn spacing_shortfall_mm(&self) -> f64 {
        (self.min_clear_spacing_mm - self.clear_spacing_mm).max(0.0)
    }

    /// Distance from the near face to the centre of each layer (mm)
    pub fn layer_offsets_mm(&self) -> Vec<f64> {
        let outer =
            self.clear_cover_mm + self.stirrup_diameter_mm as f64 + self.diameter_mm as f64 / 2.0;
        (0..self.layers)
            .map(|i| outer + i as f64 * (self.diameter_mm as f64 + self.vertical_gap_mm))
            .collect()
    }

    /// Centre-to-centre spacing in the fullest layer (mm)
    pub fn centre_spacing_mm(&self) -> f64 {
        self.clear_spacing_mm + self.diameter_mm as f64
    }

    /// Depth from the far face to the centroid, i.e. effective depth for
    /// bottom bars or d' for top bars measured from the bottom
    pub fn depth_from_far_face_mm(&self, total_depth_mm: f64) -> f64 {
        total_depth_mm - self.centroid_from_face_mm
    }

    /// Schedule text, e.g. "4-16φ" or "3+2-20φ"
    pub fn description(&self) -> String {
        let counts: Vec<String> = self.bars_per_layer.iter().map(|n| n.to_string()).collect();
        format!("{}-{}φ", counts.join("+"), self.diameter_mm)
    }
}

/// Preference order for default selection: fewer layers, then less steel,
/// then fewer bars
pub fn compare_preference(a: &BarArrangement, b: &BarArrangement) -> std::cmp::Ordering {
    a.layers
        .cmp(&b.layers)
        .then(a.area_mm2.total_cmp(&b.area_mm2))
        .then(a.count.cmp(&b.count))
}

/// All buildable arrangements that provide at least `required_area_mm2`.
///
/// For each diameter, counts run from the minimum that covers the area up to
/// `extra_bars` more. A count that does not fit in one layer is tried in
/// more layers, up to `max_layers`. Order is diameter, then count.
pub fn enumerate_arrangements(
    position: BarPosition,
    required_area_mm2: f64,
    params: &LayoutParams,
    diameters: &[u32],
    extra_bars: u32,
    max_layers: u32,
) -> Vec<BarArrangement> {
    let mut found = Vec::new();
    for &dia in diameters {
        let area = bar_area_mm2(dia);
        let mut n_min = ((required_area_mm2 / area).ceil() as u32).max(2);
        while (n_min as f64) * area < required_area_mm2 {
            n_min += 1;
        }
        for count in n_min..=n_min + extra_bars {
            for layers in 1..=max_layers.max(1) {
                let bars =
                    BarArrangement::layout(position, count, dia, layers, required_area_mm2, params);
                if bars.fits() {
                    found.push(bars);
                    break;
                }
            }
        }
    }
    found
}

/// Stress state of a bar for anchorage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarStress {
    Tension,
    Compression,
}

/// Development length Ld (mm), Cl. 26.2.1
pub fn development_length_mm(
    diameter_mm: u32,
    materials: &MaterialProperties,
    tables: &DesignTables,
    stress: BarStress,
) -> f64 {
    let mut tau_bd = tables.tau_bd(materials.fck());
    if materials.steel.is_deformed() {
        tau_bd *= 1.6;
    }
    if stress == BarStress::Compression {
        tau_bd *= 1.25;
    }
    diameter_mm as f64 * 0.87 * materials.fy() / (4.0 * tau_bd)
}

/// Lap splice length (mm), Cl. 26.2.5.1
pub fn lap_length_mm(
    diameter_mm: u32,
    materials: &MaterialProperties,
    tables: &DesignTables,
    stress: BarStress,
) -> f64 {
    let ld = development_length_mm(diameter_mm, materials, tables, stress);
    let minimum = match stress {
        BarStress::Tension => 30.0,
        BarStress::Compression => 24.0,
    } * diameter_mm as f64;
    ld.max(minimum)
}

/// Where along the span a stirrup zone lies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneKind {
    /// Next to a support face
    Support,
    /// Between support zones
    Midspan,
    /// Whole span at one spacing
    FullSpan,
}

/// A length of beam with uniform stirrup spacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StirrupZone {
    pub kind: ZoneKind,
    pub start_mm: f64,
    pub end_mm: f64,
    pub spacing_mm: f64,
    pub diameter_mm: u32,
    pub legs: u32,
    /// Stirrups placed in this zone
    pub count: u32,
}

impl StirrupZone {
    fn contains(&self, x: f64, is_last: bool) -> bool {
        x >= self.start_mm && (x < self.end_mm || (is_last && x <= self.end_mm + 1e-9))
    }
}

/// A scheduled bar group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarMark {
    /// Mark, e.g. "B1"
    pub mark: String,
    pub description: String,
    pub diameter_mm: u32,
    pub count: u32,
    /// Length of one bar as cut (mm)
    pub cut_length_mm: f64,
    pub unit_weight_kg_per_m: f64,
    pub total_weight_kg: f64,
}

impl BarMark {
    fn new(
        mark: &str,
        description: String,
        diameter_mm: u32,
        count: u32,
        cut_length_mm: f64,
    ) -> Self {
        let unit = bar_unit_weight_kg_per_m(diameter_mm);
        BarMark {
            mark: mark.to_string(),
            description,
            diameter_mm,
            count,
            cut_length_mm,
            unit_weight_kg_per_m: unit,
            total_weight_kg: count as f64 * cut_length_mm / 1000.0 * unit,
        }
    }
}

/// Complete detailing of one beam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailingResult {
    pub span_mm: f64,
    /// Tension bars
    pub bottom: BarArrangement,
    /// Compression or hanger bars
    pub top: BarArrangement,
    pub stirrup: StirrupChoice,
    /// Zones in span order
    pub stirrup_zones: Vec<StirrupZone>,
    /// Stirrup positions from the left support face (mm)
    pub stirrup_positions_mm: Vec<f64>,
    /// Tension development length of the bottom bars (mm)
    pub development_length_mm: f64,
    /// Compression development length of the top bars (mm)
    pub compression_development_length_mm: f64,
    /// Tension lap length of the bottom bars (mm)
    pub lap_length_mm: f64,
    /// Bottom bar extension past each support face (mm)
    pub anchorage_mm: f64,
    pub bar_marks: Vec<BarMark>,
    pub ductile: bool,
    pub warnings: Vec<String>,
    pub clause: String,
}

impl DetailingResult {
    /// Total reinforcement weight (kg)
    pub fn total_steel_weight_kg(&self) -> f64 {
        self.bar_marks.iter().map(|m| m.total_weight_kg).sum()
    }

    /// Distinct bar diameters used, stirrups included
    pub fn distinct_diameters(&self) -> BTreeSet<u32> {
        self.bar_marks.iter().map(|m| m.diameter_mm).collect()
    }

    /// Stirrup spacing in the first zone (mm)
    pub fn support_spacing_mm(&self) -> f64 {
        self.stirrup_zones
            .first()
            .map(|z| z.spacing_mm)
            .unwrap_or(0.0)
    }

    /// Effective depth to the bottom bar centroid (mm)
    pub fn effective_depth_mm(&self, geometry: &BeamGeometry) -> f64 {
        self.bottom
            .depth_from_far_face_mm(geometry.total_depth_mm)
            .min(geometry.effective_depth_mm)
    }
}

/// Demand passed to [`generate_detailing`].
#[derive(Debug, Clone, Copy)]
pub struct DetailingRequest<'a> {
    pub geometry: &'a BeamGeometry,
    pub materials: &'a MaterialProperties,
    /// Governing tension steel (mm²)
    pub ast_required_mm2: f64,
    /// Governing compression steel (mm²)
    pub asc_required_mm2: f64,
    /// Governing support shear (kN)
    pub vu_kn: f64,
    /// Governing factored moment (kN·m); zero skips the capacity check
    pub mu_knm: f64,
    pub settings: &'a DesignSettings,
    pub tables: &'a DesignTables,
}

/// Detail a beam for its governing demand.
///
/// With `bottom_choice` the given tension bars are used as-is; otherwise the
/// preferred buildable arrangement whose moment capacity covers `mu_knm` is
/// chosen. When every buildable arrangement falls short, the preferred one is
/// returned with a warning. Fails with a configuration error when no
/// arrangement fits the width.
pub fn generate_detailing(
    request: &DetailingRequest,
    bottom_choice: Option<&BarArrangement>,
) -> CalcResult<DetailingResult> {
    let geometry = request.geometry;
    let settings = request.settings;
    geometry.validate()?;
    if !request.ast_required_mm2.is_finite() || request.ast_required_mm2 < 0.0 {
        return Err(CalcError::invalid_input(
            "ast_required_mm2",
            request.ast_required_mm2.to_string(),
            "Required steel must be finite and non-negative",
        ));
    }

    let first_stirrup = settings.stirrup_diameters.first().copied().unwrap_or(8);
    let base_params = LayoutParams::new(geometry, first_stirrup, settings.aggregate_size_mm);

    let mut candidates = match bottom_choice {
        Some(choice) => vec![choice.clone()],
        None => enumerate_arrangements(
            BarPosition::Bottom,
            request.ast_required_mm2,
            &base_params,
            &settings.bar_diameters,
            settings.optimizer_extra_bars,
            settings.max_layers,
        ),
    };
    candidates.sort_by(compare_preference);

    if candidates.is_empty() {
        return Err(no_arrangement_error(request.ast_required_mm2, &base_params));
    }

    let mut short_of_moment: Option<DetailingResult> = None;
    for candidate in &candidates {
        let pt = 100.0 * candidate.area_mm2 / (geometry.width_mm * geometry.effective_depth_mm);
        let mut shear = compute_shear(
            geometry,
            request.materials,
            request.vu_kn,
            pt,
            request.tables,
            settings,
        )?;
        if settings.ductile_detailing {
            shear = apply_ductile_rules(&shear, geometry);
        }

        let mut warnings = Vec::new();
        let stirrup = match shear.stirrup {
            Some(stirrup) => stirrup,
            None => {
                warnings.push(
                    shear
                        .diagnostic
                        .clone()
                        .unwrap_or_else(|| "Section inadequate in shear".to_string()),
                );
                StirrupChoice::new(
                    settings.stirrup_diameters.last().copied().unwrap_or(first_stirrup),
                    settings.stirrup_legs.last().copied().unwrap_or(2),
                )
            }
        };
        if let Some(note) = shear.diagnostic.as_ref().filter(|_| shear.stirrup.is_some()) {
            warnings.push(note.clone());
        }

        let params = LayoutParams::new(geometry, stirrup.diameter_mm, settings.aggregate_size_mm);
        let bottom = candidate.relayout(&params);
        if !bottom.fits() {
            if bottom_choice.is_none() {
                continue;
            }
            warnings.push(format!(
                "{} does not meet the clear spacing of {:.0} mm",
                bottom.description(),
                bottom.min_clear_spacing_mm
            ));
        }

        let top = top_bars(request, &params)?;
        let shortfall = match bottom_choice {
            Some(_) => None,
            None => moment_shortfall(request, &bottom, &top)?,
        };
        if shortfall.is_some() && short_of_moment.is_some() {
            continue;
        }
        let support_spacing = match (shear.support_spacing_mm(), shear.confinement) {
            (Some(_), Some(zone)) => {
                confinement_spacing_with_bars(&zone, bottom.diameter_mm.min(top.diameter_mm))
            }
            (Some(spacing), None) => spacing,
            (None, _) => settings.min_stirrup_spacing_mm,
        };

        let zones = stirrup_zones(request, &stirrup, pt, support_spacing);
        let mut detailing = assemble(request, bottom, top, stirrup, zones, warnings);
        match shortfall {
            None => return Ok(detailing),
            Some(capacity) => {
                tracing::debug!(
                    bars = %detailing.bottom.description(),
                    capacity_knm = capacity,
                    "arrangement below governing moment"
                );
                detailing.warnings.push(format!(
                    "{} resists {:.1} kN·m, below Mu = {:.1} kN·m",
                    detailing.bottom.description(),
                    capacity,
                    request.mu_knm
                ));
                short_of_moment = Some(detailing);
            }
        }
    }

    match short_of_moment {
        Some(detailing) => Ok(detailing),
        None => Err(no_arrangement_error(request.ast_required_mm2, &base_params)),
    }
}

/// Capacity of the bars when it falls below the governing moment.
///
/// Uses the same strain-compatibility capacity and bar-centroid depth as the
/// compliance flexure check.
fn moment_shortfall(
    request: &DetailingRequest,
    bottom: &BarArrangement,
    top: &BarArrangement,
) -> CalcResult<Option<f64>> {
    if request.mu_knm <= 0.0 {
        return Ok(None);
    }
    let geometry = request.geometry;
    let asc = if top.is_hanger { 0.0 } else { top.area_mm2 };
    let d = bottom
        .depth_from_far_face_mm(geometry.total_depth_mm)
        .min(geometry.effective_depth_mm);
    let capacity =
        moment_capacity(geometry, request.materials, bottom.area_mm2, asc, d, request.tables)?;
    if request.mu_knm <= capacity.capacity_knm * (1.0 + 1e-9) {
        Ok(None)
    } else {
        Ok(Some(capacity.capacity_knm))
    }
}

fn no_arrangement_error(ast_required_mm2: f64, params: &LayoutParams) -> CalcError {
    CalcError::configuration(
        ast_required_mm2,
        params.available_width_mm(),
        "No bar arrangement satisfies clear spacing within the available width",
        Clause::BarSpacing.citation(),
    )
}

fn top_bars(request: &DetailingRequest, params: &LayoutParams) -> CalcResult<BarArrangement> {
    let settings = request.settings;
    if request.asc_required_mm2 <= 0.0 {
        return Ok(BarArrangement::hangers(
            settings.hanger_count,
            settings.hanger_diameter_mm,
            params,
        ));
    }
    let mut options = enumerate_arrangements(
        BarPosition::Top,
        request.asc_required_mm2,
        params,
        &settings.bar_diameters,
        settings.optimizer_extra_bars,
        settings.max_layers,
    );
    options.sort_by(compare_preference);
    options
        .into_iter()
        .next()
        .ok_or_else(|| no_arrangement_error(request.asc_required_mm2, params))
}

/// Shear at distance `x_mm` from the support, linear shear diagram
fn shear_at(request: &DetailingRequest, x_mm: f64) -> f64 {
    let span = request.geometry.span_mm;
    let fraction = match request.geometry.support {
        SupportCondition::Cantilever => 1.0 - x_mm / span,
        _ => 1.0 - 2.0 * x_mm / span,
    };
    request.vu_kn * fraction.max(0.0)
}

fn stirrup_zones(
    request: &DetailingRequest,
    stirrup: &StirrupChoice,
    pt: f64,
    support_spacing: f64,
) -> Vec<StirrupZone> {
    let geometry = request.geometry;
    let span = geometry.span_mm;
    let d = geometry.effective_depth_mm;
    let zone_length = 2.0 * d;
    let support_spacing = support_spacing.max(5.0);

    let mut mid_spacing = required_spacing_mm(
        geometry,
        request.materials,
        request.tables,
        shear_at(request, zone_length),
        pt,
        stirrup,
    )
    .unwrap_or(support_spacing);
    if request.settings.ductile_detailing {
        mid_spacing = mid_spacing.min(round_down_spacing(d / 2.0));
    }
    let mid_spacing = mid_spacing.max(support_spacing);

    let zone = |kind, start_mm, end_mm, spacing_mm| StirrupZone {
        kind,
        start_mm,
        end_mm,
        spacing_mm,
        diameter_mm: stirrup.diameter_mm,
        legs: stirrup.legs,
        count: 0,
    };

    match geometry.support {
        SupportCondition::Cantilever if span > zone_length => vec![
            zone(ZoneKind::Support, 0.0, zone_length, support_spacing),
            zone(ZoneKind::Midspan, zone_length, span, mid_spacing),
        ],
        SupportCondition::SimplySupported | SupportCondition::Continuous
            if span > 2.0 * zone_length =>
        {
            vec![
                zone(ZoneKind::Support, 0.0, zone_length, support_spacing),
                zone(ZoneKind::Midspan, zone_length, span - zone_length, mid_spacing),
                zone(ZoneKind::Support, span - zone_length, span, support_spacing),
            ]
        }
        _ => vec![zone(ZoneKind::FullSpan, 0.0, span, support_spacing)],
    }
}

/// Stirrup positions along the span. Never leaves a gap wider than the
/// spacing of the zone the gap starts in, and steps onto a tighter zone at
/// its boundary.
fn place_stirrups(zones: &mut [StirrupZone], span_mm: f64) -> Vec<f64> {
    let first = FIRST_HOOP_OFFSET_MM.min(span_mm / 2.0);
    let last = span_mm - first;
    let mut positions = vec![first];
    let mut x = first;
    let zone_count = zones.len();

    let zone_index = |zones: &[StirrupZone], x: f64| -> usize {
        zones
            .iter()
            .position(|z| x >= z.start_mm && x < z.end_mm)
            .unwrap_or(zone_count.saturating_sub(1))
    };

    while zone_count > 0 {
        let i = zone_index(&*zones, x);
        let current = &zones[i];
        let mut next = x + current.spacing_mm;
        if let Some(following) = zones.get(i + 1) {
            if next > current.end_mm && following.spacing_mm < current.spacing_mm {
                next = current.end_mm;
            }
        }
        if next >= last - 1e-9 {
            if last - x > 1e-6 {
                positions.push(last);
            }
            break;
        }
        positions.push(next);
        x = next;
    }

    for (i, zone) in zones.iter_mut().enumerate() {
        let is_last = i + 1 == zone_count;
        zone.count = positions.iter().filter(|&&p| zone.contains(p, is_last)).count() as u32;
    }
    positions
}

fn assemble(
    request: &DetailingRequest,
    bottom: BarArrangement,
    top: BarArrangement,
    stirrup: StirrupChoice,
    mut zones: Vec<StirrupZone>,
    warnings: Vec<String>,
) -> DetailingResult {
    let geometry = request.geometry;
    let materials = request.materials;
    let tables = request.tables;
    let span = geometry.span_mm;

    let ld = development_length_mm(bottom.diameter_mm, materials, tables, BarStress::Tension);
    let ld_c = development_length_mm(top.diameter_mm, materials, tables, BarStress::Compression);
    let lap = lap_length_mm(bottom.diameter_mm, materials, tables, BarStress::Tension);

    // Cl. 26.2.3.3(c): Ld/3 past a simple support; full Ld into continuity
    let (anchorage, anchored_ends) = match geometry.support {
        SupportCondition::SimplySupported => (ld / 3.0, 2.0),
        SupportCondition::Continuous => (ld, 2.0),
        SupportCondition::Cantilever => (ld, 1.0),
    };
    let bar_length = span + anchored_ends * anchorage;

    let positions = place_stirrups(&mut zones, span);

    let cover = geometry.clear_cover_mm;
    let hook = (10.0 * stirrup.diameter_mm as f64).max(75.0);
    let stirrup_length = 2.0 * (geometry.width_mm - 2.0 * cover)
        + 2.0 * (geometry.total_depth_mm - 2.0 * cover)
        + 2.0 * hook;
    let loops_per_position = (stirrup.legs / 2).max(1);

    let bar_marks = vec![
        BarMark::new(
            "B1",
            format!("Bottom bars {}", bottom.description()),
            bottom.diameter_mm,
            bottom.count,
            bar_length,
        ),
        BarMark::new(
            "T1",
            if top.is_hanger {
                format!("Hanger bars {}", top.description())
            } else {
                format!("Top bars {}", top.description())
            },
            top.diameter_mm,
            top.count,
            bar_length,
        ),
        BarMark::new(
            "S1",
            format!("{}-legged stirrups {}φ", stirrup.legs, stirrup.diameter_mm),
            stirrup.diameter_mm,
            positions.len() as u32 * loops_per_position,
            stirrup_length,
        ),
    ];

    tracing::debug!(
        bottom = %bottom.description(),
        top = %top.description(),
        stirrups = positions.len(),
        "detailing generated"
    );

    DetailingResult {
        span_mm: span,
        bottom,
        top,
        stirrup,
        stirrup_zones: zones,
        stirrup_positions_mm: positions,
        development_length_mm: ld,
        compression_development_length_mm: ld_c,
        lap_length_mm: lap,
        anchorage_mm: anchorage,
        bar_marks,
        ductile: request.settings.ductile_detailing,
        warnings,
        clause: Clause::BarSpacing.citation(),
    }
}

/// Reinforcement an engineer has already chosen, for checking.
///
/// ## JSON Example
///
/// ```json
/// {
///   "bottom_count": 4, "bottom_diameter_mm": 16,
///   "top_count": 2, "top_diameter_mm": 12,
///   "stirrup_diameter_mm": 8, "stirrup_legs": 2, "stirrup_spacing_mm": 150
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvidedReinforcement {
    pub bottom_count: u32,
    pub bottom_diameter_mm: u32,
    #[serde(default = "default_layers")]
    pub bottom_layers: u32,
    pub top_count: u32,
    pub top_diameter_mm: u32,
    pub stirrup_diameter_mm: u32,
    pub stirrup_legs: u32,
    /// Spacing away from the supports (mm)
    pub stirrup_spacing_mm: f64,
    /// Closer spacing within 2d of each support (mm)
    #[serde(default)]
    pub support_stirrup_spacing_mm: Option<f64>,
}

fn default_layers() -> u32 {
    1
}

impl ProvidedReinforcement {
    pub fn validate(&self) -> CalcResult<()> {
        if self.bottom_count < 2 || self.top_count < 2 {
            return Err(CalcError::invalid_input(
                "bottom_count",
                format!("{} / top {}", self.bottom_count, self.top_count),
                "At least two bars are needed at each face",
            ));
        }
        for dia in [
            self.bottom_diameter_mm,
            self.top_diameter_mm,
            self.stirrup_diameter_mm,
        ] {
            if !is_standard_diameter(dia) {
                return Err(CalcError::invalid_input(
                    "diameter_mm",
                    dia.to_string(),
                    "Not a standard bar diameter",
                ));
            }
        }
        if self.bottom_layers == 0 || self.stirrup_legs < 2 {
            return Err(CalcError::invalid_input(
                "bottom_layers",
                format!("{} / legs {}", self.bottom_layers, self.stirrup_legs),
                "Need at least one layer and two stirrup legs",
            ));
        }
        let spacings =
            std::iter::once(self.stirrup_spacing_mm).chain(self.support_stirrup_spacing_mm);
        for spacing in spacings {
            if !spacing.is_finite() || spacing <= 0.0 {
                return Err(CalcError::invalid_input(
                    "stirrup_spacing_mm",
                    spacing.to_string(),
                    "Stirrup spacing must be positive",
                ));
            }
        }
        Ok(())
    }
}

/// Build a detailing record from reinforcement the engineer supplied.
///
/// Nothing is re-selected: arrangements that violate spacing are kept and
/// left for the compliance checks to flag.
pub fn detail_provided(
    geometry: &BeamGeometry,
    materials: &MaterialProperties,
    provided: &ProvidedReinforcement,
    settings: &DesignSettings,
    tables: &DesignTables,
) -> CalcResult<DetailingResult> {
    geometry.validate()?;
    provided.validate()?;

    let params =
        LayoutParams::new(geometry, provided.stirrup_diameter_mm, settings.aggregate_size_mm);
    let bottom = BarArrangement::layout(
        BarPosition::Bottom,
        provided.bottom_count,
        provided.bottom_diameter_mm,
        provided.bottom_layers,
        0.0,
        &params,
    );
    let top = BarArrangement::layout(
        BarPosition::Top,
        provided.top_count,
        provided.top_diameter_mm,
        1,
        0.0,
        &params,
    );
    let stirrup = StirrupChoice::new(provided.stirrup_diameter_mm, provided.stirrup_legs);

    let span = geometry.span_mm;
    let zone_length = 2.0 * geometry.effective_depth_mm;
    let zone = |kind, start_mm, end_mm, spacing_mm| StirrupZone {
        kind,
        start_mm,
        end_mm,
        spacing_mm,
        diameter_mm: stirrup.diameter_mm,
        legs: stirrup.legs,
        count: 0,
    };
    let zones = match provided.support_stirrup_spacing_mm {
        Some(support) if span > 2.0 * zone_length => vec![
            zone(ZoneKind::Support, 0.0, zone_length, support),
            zone(ZoneKind::Midspan, zone_length, span - zone_length, provided.stirrup_spacing_mm),
            zone(ZoneKind::Support, span - zone_length, span, support),
        ],
        Some(support) => vec![zone(ZoneKind::FullSpan, 0.0, span, support)],
        None => vec![zone(ZoneKind::FullSpan, 0.0, span, provided.stirrup_spacing_mm)],
    };

    let mut warnings = Vec::new();
    if !bottom.fits() {
        warnings.push(format!(
            "{} does not meet the clear spacing of {:.0} mm",
            bottom.description(),
            bottom.min_clear_spacing_mm
        ));
    }

    let request = DetailingRequest {
        geometry,
        materials,
        ast_required_mm2: 0.0,
        asc_required_mm2: 0.0,
        vu_kn: 0.0,
        mu_knm: 0.0,
        settings,
        tables,
    };
    Ok(assemble(&request, bottom, top, stirrup, zones, warnings))
}
