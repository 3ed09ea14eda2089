//! # Ductile Detailing (IS 13920)
//!
//! Tightens a shear design for seismic ductility and checks the beam
//! geometry and longitudinal steel limits.
//!
//! ## Rules Applied
//!
//! - Confinement zone of length 2d at each support face; first stirrup at
//!   50 mm; spacing ≤ min(design spacing, 100, d/4) (Cl. 6.3.5)
//! - Spacing elsewhere ≤ d/2
//! - Width ≥ 200 mm and b/D ≥ 0.3 (Cl. 6.1.1, 6.1.2)
//! - Depth ≤ span/4 (Cl. 6.1.3)
//! - `0.24·√fck/fy ≤ Ast/(b·d) ≤ 0.025` (Cl. 6.2.1, 6.2.2)

use serde::{Deserialize, Serialize};

use crate::calculations::inputs::BeamGeometry;
use crate::calculations::shear::{round_down_spacing, ConfinementZone, ShearResult};
use crate::clauses::Clause;
use crate::materials::MaterialProperties;

/// Distance of the first hoop from the support face (mm)
pub const FIRST_HOOP_OFFSET_MM: f64 = 50.0;

const MAX_CONFINEMENT_SPACING_MM: f64 = 100.0;
const MIN_WIDTH_MM: f64 = 200.0;
const MIN_WIDTH_DEPTH_RATIO: f64 = 0.3;
const MAX_STEEL_RATIO: f64 = 0.025;

/// Tighten stirrup spacing for ductile detailing.
///
/// Returns a new result; the input is left untouched. An inadequate section
/// is returned unchanged since no spacing exists to tighten. Spacing is only
/// ever reduced.
pub fn apply_ductile_rules(shear: &ShearResult, geometry: &BeamGeometry) -> ShearResult {
    let Some(spacing) = shear.spacing_mm else {
        return shear.clone();
    };
    let d = geometry.effective_depth_mm;

    let zone_spacing =
        round_down_spacing(spacing.min(MAX_CONFINEMENT_SPACING_MM).min(d / 4.0));
    let general_spacing = round_down_spacing(spacing.min(d / 2.0)).min(spacing);

    let mut result = shear.clone();
    result.spacing_mm = Some(general_spacing);
    result.confinement = Some(ConfinementZone {
        length_mm: 2.0 * d,
        spacing_mm: zone_spacing,
        first_stirrup_offset_mm: FIRST_HOOP_OFFSET_MM,
    });
    result.clause = Clause::DuctileConfinement.citation();

    tracing::debug!(
        design_spacing = spacing,
        zone_spacing,
        general_spacing,
        "ductile stirrup spacing applied"
    );
    result
}

/// Confinement spacing further limited by 8 × the smallest longitudinal bar
pub fn confinement_spacing_with_bars(zone: &ConfinementZone, smallest_bar_mm: u32) -> f64 {
    round_down_spacing(zone.spacing_mm.min(8.0 * smallest_bar_mm as f64)).min(zone.spacing_mm)
}

/// Ductility check on geometry and longitudinal steel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuctilityCheck {
    /// b ≥ 200 mm
    pub width_ok: bool,
    /// b/D ≥ 0.3
    pub width_depth_ratio_ok: bool,
    /// D ≤ span/4
    pub depth_span_ok: bool,
    /// Tension steel above 0.24·√fck/fy
    pub minimum_steel_ok: bool,
    /// Tension steel at most 2.5%
    pub maximum_steel_ok: bool,
    /// Tension steel ratio checked
    pub steel_ratio: f64,
    /// Worst demand/limit ratio across the rules
    pub utilization: f64,
    /// One line per failed rule
    pub messages: Vec<String>,
    pub clause: String,
}

impl DuctilityCheck {
    pub fn passes(&self) -> bool {
        self.width_ok
            && self.width_depth_ratio_ok
            && self.depth_span_ok
            && self.minimum_steel_ok
            && self.maximum_steel_ok
    }
}

/// Check IS 13920 geometry and steel limits for a tension steel area (mm²).
pub fn check_ductility(
    geometry: &BeamGeometry,
    materials: &MaterialProperties,
    ast_mm2: f64,
) -> DuctilityCheck {
    let b = geometry.width_mm;
    let depth = geometry.total_depth_mm;
    let d = geometry.effective_depth_mm;
    let rho = ast_mm2 / (b * d);
    let rho_min = 0.24 * materials.fck().sqrt() / materials.fy();

    let ratios = [
        MIN_WIDTH_MM / b,
        MIN_WIDTH_DEPTH_RATIO / (b / depth),
        depth / (geometry.span_mm / 4.0),
        if rho > 0.0 { rho_min / rho } else { f64::INFINITY },
        rho / MAX_STEEL_RATIO,
    ];
    let utilization = ratios.iter().copied().fold(0.0_f64, f64::max);

    let mut check = DuctilityCheck {
        width_ok: b >= MIN_WIDTH_MM,
        width_depth_ratio_ok: b / depth >= MIN_WIDTH_DEPTH_RATIO,
        depth_span_ok: depth <= geometry.span_mm / 4.0,
        minimum_steel_ok: rho >= rho_min,
        maximum_steel_ok: rho <= MAX_STEEL_RATIO,
        steel_ratio: rho,
        utilization,
        messages: Vec::new(),
        clause: Clause::DuctileGeometry.citation(),
    };

    if !check.width_ok {
        check.messages.push(format!("Width {b:.0} mm is below 200 mm"));
    }
    if !check.width_depth_ratio_ok {
        check
            .messages
            .push(format!("Width/depth ratio {:.2} is below 0.3", b / depth));
    }
    if !check.depth_span_ok {
        check.messages.push(format!(
            "Depth {depth:.0} mm exceeds a quarter of the span ({:.0} mm)",
            geometry.span_mm / 4.0
        ));
    }
    if !check.minimum_steel_ok || !check.maximum_steel_ok {
        check.clause = Clause::DuctileLongitudinal.citation();
        check.messages.push(format!(
            "Tension steel ratio {:.4} outside {rho_min:.4}..{MAX_STEEL_RATIO}",
            rho
        ));
    }
    check
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::shear::compute_shear;
    use crate::materials::{ConcreteGrade, SteelGrade};
    use crate::settings::DesignSettings;
    use crate::tables::DesignTables;

    fn beam() -> BeamGeometry {
        BeamGeometry::new(4000.0, 230.0, 450.0, 400.0, 25.0)
    }

    fn materials() -> MaterialProperties {
        MaterialProperties::new(ConcreteGrade::M20, SteelGrade::Fe415)
    }

    fn shear(vu_kn: f64) -> ShearResult {
        compute_shear(
            &beam(),
            &materials(),
            vu_kn,
            0.87,
            DesignTables::standard().unwrap(),
            &DesignSettings::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_confinement_zone() {
        let base = shear(40.0);
        let r = apply_ductile_rules(&base, &beam());
        let zone = r.confinement.unwrap();
        assert_eq!(zone.length_mm, 800.0);
        // min(300, 100, 400/4)
        assert_eq!(zone.spacing_mm, 100.0);
        assert_eq!(zone.first_stirrup_offset_mm, 50.0);
        // d/2 outside the zone
        assert_eq!(r.spacing_mm, Some(200.0));
        // input untouched
        assert!(base.confinement.is_none());
        assert_eq!(base.spacing_mm, Some(300.0));
    }

    #[test]
    fn test_never_loosens_spacing() {
        let base = shear(200.0);
        let r = apply_ductile_rules(&base, &beam());
        assert!(r.spacing_mm.unwrap() <= base.spacing_mm.unwrap());
        assert!(r.confinement.unwrap().spacing_mm <= base.spacing_mm.unwrap());
    }

    #[test]
    fn test_inadequate_section_unchanged() {
        let base = shear(300.0);
        let r = apply_ductile_rules(&base, &beam());
        assert_eq!(r, base);
    }

    #[test]
    fn test_eight_bar_diameter_cap() {
        let zone = ConfinementZone {
            length_mm: 800.0,
            spacing_mm: 100.0,
            first_stirrup_offset_mm: 50.0,
        };
        assert_eq!(confinement_spacing_with_bars(&zone, 12), 95.0);
        assert_eq!(confinement_spacing_with_bars(&zone, 16), 100.0);
    }

    #[test]
    fn test_ductility_geometry_passes() {
        let check = check_ductility(&beam(), &materials(), 804.0);
        assert!(check.passes(), "{:?}", check.messages);
        assert!(check.utilization <= 1.0);
    }

    #[test]
    fn test_narrow_beam_fails() {
        let narrow = BeamGeometry::new(4000.0, 150.0, 600.0, 550.0, 25.0);
        let check = check_ductility(&narrow, &materials(), 600.0);
        assert!(!check.width_ok);
        assert!(!check.width_depth_ratio_ok);
        assert!(!check.passes());
        assert!(check.utilization > 1.0);
    }

    #[test]
    fn test_steel_limits() {
        // 0.24·√20/415 = 0.00259 → 238 mm² on 230 × 400
        let low = check_ductility(&beam(), &materials(), 200.0);
        assert!(!low.minimum_steel_ok);
        let high = check_ductility(&beam(), &materials(), 2400.0);
        assert!(!high.maximum_steel_ok);
    }
}
