//! Standard reinforcing bar catalogue (IS 1786 nominal sizes).

use std::f64::consts::PI;

/// Nominal bar diameters stocked in practice (mm)
pub const STANDARD_BAR_DIAMETERS: [u32; 8] = [6, 8, 10, 12, 16, 20, 25, 32];

/// Cross-sectional area of one bar (mm²)
pub fn bar_area_mm2(diameter_mm: u32) -> f64 {
    let d = diameter_mm as f64;
    PI * d * d / 4.0
}

/// Mass per metre of one bar (kg/m), the usual d²/162 rule
pub fn bar_unit_weight_kg_per_m(diameter_mm: u32) -> f64 {
    let d = diameter_mm as f64;
    d * d / 162.0
}

/// Is this one of the stocked diameters?
pub fn is_standard_diameter(diameter_mm: u32) -> bool {
    STANDARD_BAR_DIAMETERS.contains(&diameter_mm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_area() {
        assert!((bar_area_mm2(16) - 201.06).abs() < 0.01);
        assert!((3.0 * bar_area_mm2(16) - 603.19).abs() < 0.01);
    }

    #[test]
    fn test_unit_weight() {
        assert!((bar_unit_weight_kg_per_m(12) - 0.8889).abs() < 1e-3);
        assert!((bar_unit_weight_kg_per_m(16) - 1.5802).abs() < 1e-3);
    }

    #[test]
    fn test_standard_diameters() {
        assert!(is_standard_diameter(25));
        assert!(!is_standard_diameter(18));
    }
}
