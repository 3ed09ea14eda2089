//! # Shear Design
//!
//! Nominal shear stress against Table 19/20 strengths and vertical stirrup
//! design per IS 456 Cl. 40.
//!
//! - `τv = Vu / (b·d)`
//! - `τv > τc,max`: the section is inadequate; no spacing is produced.
//! - `τv ≤ τc`: minimum stirrups, `sv ≤ 0.87·fy·Asv / (0.4·b)`.
//! - otherwise `Vus = Vu − τc·b·d` and `sv = 0.87·fy·Asv·d / Vus`.
//!
//! Spacing is always capped at `min(0.75·d, 300)` and rounded down to 5 mm.
//! When the spacing drops below the practical minimum the stirrup is
//! escalated through the configured diameters, then leg counts.

use serde::{Deserialize, Serialize};

use crate::calculations::inputs::BeamGeometry;
use crate::clauses::Clause;
use crate::errors::{CalcError, CalcResult};
use crate::materials::rebar::bar_area_mm2;
use crate::materials::MaterialProperties;
use crate::settings::DesignSettings;
use crate::tables::DesignTables;
use crate::units::{kn_to_n, n_to_kn};

/// Stirrup steel stress is not taken above Fe415 (Cl. 40.4)
const MAX_STIRRUP_FY: f64 = 415.0;

/// Absolute cap on stirrup spacing (mm), Cl. 26.5.1.5
const MAX_STIRRUP_SPACING_MM: f64 = 300.0;

/// Outcome of the shear check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShearStatus {
    /// τv ≤ τc: nominal stirrups
    MinimumReinforcement,
    /// τc < τv ≤ τc,max: stirrups designed for Vus
    DesignedReinforcement,
    /// τv > τc,max: increase the section
    SectionInadequate,
}

/// A stirrup bar size and leg count
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StirrupChoice {
    pub diameter_mm: u32,
    pub legs: u32,
    /// Total leg area Asv (mm²)
    pub asv_mm2: f64,
}

impl StirrupChoice {
    pub fn new(diameter_mm: u32, legs: u32) -> Self {
        StirrupChoice {
            diameter_mm,
            legs,
            asv_mm2: legs as f64 * bar_area_mm2(diameter_mm),
        }
    }
}

/// Closely spaced stirrup zone at a support (ductile detailing)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfinementZone {
    /// Zone length from the support face (mm)
    pub length_mm: f64,
    /// Stirrup spacing within the zone (mm)
    pub spacing_mm: f64,
    /// Distance of the first stirrup from the support face (mm)
    pub first_stirrup_offset_mm: f64,
}

/// Shear design result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShearResult {
    /// Factored shear Vu (kN)
    pub vu_kn: f64,
    /// Nominal shear stress τv (N/mm²)
    pub tau_v_n_mm2: f64,
    /// Design shear strength of concrete τc (N/mm²)
    pub tau_c_n_mm2: f64,
    /// Maximum shear stress τc,max (N/mm²)
    pub tau_c_max_n_mm2: f64,
    /// Tension steel percentage used for τc
    pub pt_percent: f64,
    /// Check outcome
    pub status: ShearStatus,
    /// Shear carried by stirrups Vus (kN)
    pub vus_kn: f64,
    /// Selected stirrup, absent when the section is inadequate
    pub stirrup: Option<StirrupChoice>,
    /// Stirrup spacing (mm), absent when the section is inadequate
    pub spacing_mm: Option<f64>,
    /// Code maximum spacing min(0.75d, 300) (mm)
    pub max_spacing_mm: f64,
    /// Minimum-reinforcement rule sets the spacing
    pub minimum_governs: bool,
    /// Support confinement zone, set by ductile detailing
    pub confinement: Option<ConfinementZone>,
    /// Governing clause
    pub clause: String,
    /// Notes (inadequate section, spacing below practical minimum)
    pub diagnostic: Option<String>,
}

impl ShearResult {
    /// Section can carry the shear
    pub fn section_adequate(&self) -> bool {
        self.status != ShearStatus::SectionInadequate
    }

    /// τv / τc,max
    pub fn stress_ratio(&self) -> f64 {
        self.tau_v_n_mm2 / self.tau_c_max_n_mm2
    }

    /// Spacing to detail at the support: confinement spacing when present
    pub fn support_spacing_mm(&self) -> Option<f64> {
        match self.confinement {
            Some(zone) => Some(zone.spacing_mm),
            None => self.spacing_mm,
        }
    }
}

/// Round a spacing down to a 5 mm increment
pub fn round_down_spacing(spacing_mm: f64) -> f64 {
    (spacing_mm / 5.0).floor() * 5.0
}

fn stirrup_fy(materials: &MaterialProperties) -> f64 {
    materials.fy().min(MAX_STIRRUP_FY)
}

/// Code maximum stirrup spacing min(0.75d, 300) (mm)
pub fn max_stirrup_spacing_mm(geometry: &BeamGeometry) -> f64 {
    (0.75 * geometry.effective_depth_mm).min(MAX_STIRRUP_SPACING_MM)
}

/// Spacing limit from the minimum shear reinforcement rule (mm)
fn minimum_reinforcement_spacing(
    geometry: &BeamGeometry,
    materials: &MaterialProperties,
    stirrup: &StirrupChoice,
) -> f64 {
    0.87 * stirrup_fy(materials) * stirrup.asv_mm2 / (0.4 * geometry.width_mm)
}

/// Spacing for one stirrup choice, before rounding, and whether the
/// minimum rule governs it
fn spacing_for(
    geometry: &BeamGeometry,
    materials: &MaterialProperties,
    stirrup: &StirrupChoice,
    vus_n: f64,
) -> (f64, bool) {
    let max_spacing = max_stirrup_spacing_mm(geometry);
    let min_rule = minimum_reinforcement_spacing(geometry, materials, stirrup);
    let strength = if vus_n > 0.0 {
        0.87 * stirrup_fy(materials) * stirrup.asv_mm2 * geometry.effective_depth_mm / vus_n
    } else {
        f64::INFINITY
    };
    let spacing = strength.min(min_rule).min(max_spacing);
    (spacing, min_rule <= strength && min_rule <= max_spacing)
}

fn validate_shear_inputs(vu_kn: f64, pt_percent: f64) -> CalcResult<()> {
    if !vu_kn.is_finite() || vu_kn < 0.0 {
        return Err(CalcError::invalid_input(
            "vu_kn",
            vu_kn.to_string(),
            "Shear force must be finite and non-negative",
        ));
    }
    if !pt_percent.is_finite() || pt_percent < 0.0 {
        return Err(CalcError::invalid_input(
            "pt_percent",
            pt_percent.to_string(),
            "Steel percentage must be finite and non-negative",
        ));
    }
    Ok(())
}

/// Design vertical stirrups for a factored shear.
///
/// `pt_percent` is the tension steel percentage 100·Ast/(b·d) that enters
/// Table 19. Stirrup diameters and legs are tried in the order given by
/// `settings`, diameters first.
pub fn compute_shear(
    geometry: &BeamGeometry,
    materials: &MaterialProperties,
    vu_kn: f64,
    pt_percent: f64,
    tables: &DesignTables,
    settings: &DesignSettings,
) -> CalcResult<ShearResult> {
    geometry.validate()?;
    validate_shear_inputs(vu_kn, pt_percent)?;

    let b = geometry.width_mm;
    let d = geometry.effective_depth_mm;
    let fck = materials.fck();
    let tau_v = kn_to_n(vu_kn) / (b * d);
    let tau_c = tables.tau_c(fck, pt_percent);
    let tau_c_max = tables.tau_c_max(fck);
    let max_spacing = max_stirrup_spacing_mm(geometry);

    let mut result = ShearResult {
        vu_kn,
        tau_v_n_mm2: tau_v,
        tau_c_n_mm2: tau_c,
        tau_c_max_n_mm2: tau_c_max,
        pt_percent,
        status: ShearStatus::SectionInadequate,
        vus_kn: 0.0,
        stirrup: None,
        spacing_mm: None,
        max_spacing_mm: max_spacing,
        minimum_governs: false,
        confinement: None,
        clause: Clause::MaximumShearStress.citation(),
        diagnostic: None,
    };

    if tau_v > tau_c_max {
        result.diagnostic = Some(format!(
            "Section inadequate: τv = {tau_v:.2} N/mm² exceeds τc,max = {tau_c_max:.2} N/mm²"
        ));
        tracing::warn!(vu_kn, tau_v, tau_c_max, "shear section inadequate");
        return Ok(result);
    }

    let vus_n = (kn_to_n(vu_kn) - tau_c * b * d).max(0.0);
    let minimum_only = tau_v <= tau_c;

    let options: Vec<StirrupChoice> = settings
        .stirrup_legs
        .iter()
        .flat_map(|&legs| {
            settings
                .stirrup_diameters
                .iter()
                .map(move |&dia| StirrupChoice::new(dia, legs))
        })
        .collect();

    let mut chosen = None;
    for stirrup in &options {
        let (spacing, min_governs) = spacing_for(geometry, materials, stirrup, vus_n);
        let spacing = round_down_spacing(spacing);
        chosen = Some((*stirrup, spacing, min_governs));
        if minimum_only || spacing >= settings.min_stirrup_spacing_mm {
            break;
        }
    }

    let Some((stirrup, spacing, min_governs)) = chosen else {
        return Err(CalcError::invalid_input(
            "stirrup_diameters",
            "[]",
            "No stirrup options configured",
        ));
    };

    if spacing < settings.min_stirrup_spacing_mm {
        result.diagnostic = Some(format!(
            "Stirrup spacing {spacing:.0} mm is below the practical minimum of {:.0} mm \
             even with {}-legged {} mm stirrups",
            settings.min_stirrup_spacing_mm, stirrup.legs, stirrup.diameter_mm
        ));
        tracing::warn!(vu_kn, spacing, "stirrup spacing below practical minimum");
    }

    result.status = if minimum_only {
        ShearStatus::MinimumReinforcement
    } else {
        ShearStatus::DesignedReinforcement
    };
    result.vus_kn = n_to_kn(vus_n);
    result.stirrup = Some(stirrup);
    result.spacing_mm = Some(spacing);
    result.minimum_governs = minimum_only || min_governs;
    result.clause = if result.minimum_governs {
        Clause::MinimumShearReinforcement.citation()
    } else {
        Clause::ShearReinforcement.citation()
    };

    tracing::debug!(
        vu_kn,
        tau_v,
        tau_c,
        stirrup_dia = stirrup.diameter_mm,
        legs = stirrup.legs,
        spacing,
        "shear designed"
    );
    Ok(result)
}

/// Required spacing for a fixed stirrup, or None if τv > τc,max.
///
/// Used to space stirrups away from the support where the shear is lower.
pub fn required_spacing_mm(
    geometry: &BeamGeometry,
    materials: &MaterialProperties,
    tables: &DesignTables,
    vu_kn: f64,
    pt_percent: f64,
    stirrup: &StirrupChoice,
) -> Option<f64> {
    let b = geometry.width_mm;
    let d = geometry.effective_depth_mm;
    let fck = materials.fck();
    let tau_v = kn_to_n(vu_kn) / (b * d);
    if tau_v > tables.tau_c_max(fck) {
        return None;
    }
    let vus_n = (kn_to_n(vu_kn) - tables.tau_c(fck, pt_percent) * b * d).max(0.0);
    let (spacing, _) = spacing_for(geometry, materials, stirrup, vus_n);
    Some(round_down_spacing(spacing))
}

/// Shear capacity of concrete plus provided stirrups (kN), capped at τc,max·b·d
pub fn shear_capacity_kn(
    geometry: &BeamGeometry,
    materials: &MaterialProperties,
    tables: &DesignTables,
    pt_percent: f64,
    stirrup: &StirrupChoice,
    spacing_mm: f64,
) -> f64 {
    let b = geometry.width_mm;
    let d = geometry.effective_depth_mm;
    let fck = materials.fck();
    let concrete = tables.tau_c(fck, pt_percent) * b * d;
    let steel = if spacing_mm > 0.0 {
        0.87 * stirrup_fy(materials) * stirrup.asv_mm2 * d / spacing_mm
    } else {
        0.0
    };
    n_to_kn((concrete + steel).min(tables.tau_c_max(fck) * b * d))
}

/// Do the provided stirrups meet the minimum shear reinforcement rule?
pub fn meets_minimum_reinforcement(
    geometry: &BeamGeometry,
    materials: &MaterialProperties,
    stirrup: &StirrupChoice,
    spacing_mm: f64,
) -> bool {
    spacing_mm <= minimum_reinforcement_spacing(geometry, materials, stirrup) + 1e-9
        && spacing_mm <= max_stirrup_spacing_mm(geometry) + 1e-9
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::{ConcreteGrade, SteelGrade};

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
    fn test_minimum_stirrups_for_low_shear() {
        let r = shear(40.0);
        assert_eq!(r.status, ShearStatus::MinimumReinforcement);
        assert!(r.minimum_governs);
        // min(394, 0.75·400, 300)
        assert_eq!(r.spacing_mm, Some(300.0));
        assert_eq!(r.stirrup.unwrap().diameter_mm, 8);
    }

    #[test]
    fn test_designed_stirrups() {
        let r = shear(200.0);
        assert_eq!(r.status, ShearStatus::DesignedReinforcement);
        let s = r.spacing_mm.unwrap();
        assert_eq!(s % 5.0, 0.0);
        assert!(s >= 75.0 && s <= r.max_spacing_mm);
        // provided stirrups carry the shear
        let cap = shear_capacity_kn(
            &beam(),
            &materials(),
            DesignTables::standard().unwrap(),
            0.87,
            &r.stirrup.unwrap(),
            s,
        );
        assert!(cap >= 200.0);
    }

    #[test]
    fn test_stirrup_escalates_when_spacing_too_tight() {
        let r = shear(250.0);
        let stirrup = r.stirrup.unwrap();
        assert!(stirrup.diameter_mm > 8 || stirrup.legs > 2);
        assert!(r.spacing_mm.unwrap() >= 75.0);
        assert!(r.diagnostic.is_none());
    }

    #[test]
    fn test_section_inadequate_has_no_spacing() {
        // τc,max·b·d = 2.8 × 230 × 400 = 257.6 kN
        let r = shear(300.0);
        assert_eq!(r.status, ShearStatus::SectionInadequate);
        assert!(r.spacing_mm.is_none());
        assert!(r.stirrup.is_none());
        assert!(!r.section_adequate());
        assert!(r.stress_ratio() > 1.0);
    }

    #[test]
    fn test_spacing_never_exceeds_cap() {
        let shallow = BeamGeometry::new(3000.0, 230.0, 300.0, 260.0, 25.0);
        let r = compute_shear(
            &shallow,
            &materials(),
            10.0,
            0.5,
            DesignTables::standard().unwrap(),
            &DesignSettings::default(),
        )
        .unwrap();
        assert_eq!(r.spacing_mm, Some(195.0));
    }

    #[test]
    fn test_fe500_stirrup_stress_capped() {
        let fe500 = MaterialProperties::new(ConcreteGrade::M20, SteelGrade::Fe500);
        let tables = DesignTables::standard().unwrap();
        let stirrup = StirrupChoice::new(8, 2);
        let a = required_spacing_mm(&beam(), &fe500, tables, 200.0, 0.87, &stirrup);
        let b = required_spacing_mm(&beam(), &materials(), tables, 200.0, 0.87, &stirrup);
        assert_eq!(a, b);
    }

    #[test]
    fn test_round_down_spacing() {
        assert_eq!(round_down_spacing(99.6), 95.0);
        assert_eq!(round_down_spacing(100.0), 100.0);
    }

    #[test]
    fn test_negative_shear_rejected() {
        let err = compute_shear(
            &beam(),
            &materials(),
            -1.0,
            0.5,
            DesignTables::standard().unwrap(),
            &DesignSettings::default(),
        )
        .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }
}
