//! # Unit Types
//!
//! Type-safe wrappers for the SI units used by IS 456 design. These are
//! plain f64 newtypes so JSON stays clean (just numbers) while conversions
//! between the boundary units and the internal N/mm units stay explicit.
//!
//! ## Unit contract
//!
//! - Length: millimetres (mm) at every boundary, metres only for cost/weight
//! - Force: kilonewtons (kN) at the boundary, newtons internally
//! - Moment: kilonewton-metres (kN·m) at the boundary, N·mm internally
//! - Stress: N/mm² (= MPa) everywhere
//!
//! ## Example
//!
//! ```rust
//! use is456_core::units::{KiloNewtonMetres, NewtonMillimetres};
//!
//! let mu = KiloNewtonMetres(80.0);
//! let mu_nmm: NewtonMillimetres = mu.into();
//! assert_eq!(mu_nmm.0, 80.0e6);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Sub};

// ============================================================================
// Length Units
// ============================================================================

/// Length in millimetres
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Millimetres(pub f64);

/// Length in metres
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metres(pub f64);

impl From<Metres> for Millimetres {
    fn from(m: Metres) -> Self {
        Millimetres(m.0 * 1000.0)
    }
}

impl From<Millimetres> for Metres {
    fn from(mm: Millimetres) -> Self {
        Metres(mm.0 / 1000.0)
    }
}

// ============================================================================
// Force Units
// ============================================================================

/// Force in newtons
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Newtons(pub f64);

/// Force in kilonewtons
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KiloNewtons(pub f64);

impl From<KiloNewtons> for Newtons {
    fn from(kn: KiloNewtons) -> Self {
        Newtons(kn.0 * 1000.0)
    }
}

impl From<Newtons> for KiloNewtons {
    fn from(n: Newtons) -> Self {
        KiloNewtons(n.0 / 1000.0)
    }
}

// ============================================================================
// Moment Units
// ============================================================================

/// Moment in kilonewton-metres
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KiloNewtonMetres(pub f64);

/// Moment in newton-millimetres
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NewtonMillimetres(pub f64);

impl From<KiloNewtonMetres> for NewtonMillimetres {
    fn from(knm: KiloNewtonMetres) -> Self {
        NewtonMillimetres(knm.0 * 1.0e6)
    }
}

impl From<NewtonMillimetres> for KiloNewtonMetres {
    fn from(nmm: NewtonMillimetres) -> Self {
        KiloNewtonMetres(nmm.0 / 1.0e6)
    }
}

// ============================================================================
// Stress Units
// ============================================================================

/// Stress in N/mm² (MPa)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MegaPascals(pub f64);

// ============================================================================
// Arithmetic Implementations (macro to reduce boilerplate)
// ============================================================================

macro_rules! impl_arithmetic {
    ($type:ty) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $type {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl $type {
            /// Get the raw f64 value
            pub fn value(self) -> f64 {
                self.0
            }

            /// Create from raw f64 value
            pub fn new(value: f64) -> Self {
                Self(value)
            }
        }
    };
}

impl_arithmetic!(Millimetres);
impl_arithmetic!(Metres);
impl_arithmetic!(Newtons);
impl_arithmetic!(KiloNewtons);
impl_arithmetic!(KiloNewtonMetres);
impl_arithmetic!(NewtonMillimetres);
impl_arithmetic!(MegaPascals);

/// Convert a boundary moment (kN·m) to N·mm
pub fn knm_to_nmm(knm: f64) -> f64 {
    NewtonMillimetres::from(KiloNewtonMetres(knm)).0
}

/// Convert an internal moment (N·mm) to kN·m
pub fn nmm_to_knm(nmm: f64) -> f64 {
    KiloNewtonMetres::from(NewtonMillimetres(nmm)).0
}

/// Convert a boundary force (kN) to N
pub fn kn_to_n(kn: f64) -> f64 {
    Newtons::from(KiloNewtons(kn)).0
}

/// Convert an internal force (N) to kN
pub fn n_to_kn(n: f64) -> f64 {
    KiloNewtons::from(Newtons(n)).0
}

/// Convert a length in mm to metres
pub fn mm_to_m(mm: f64) -> f64 {
    Metres::from(Millimetres(mm)).0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moment_conversion() {
        assert_eq!(knm_to_nmm(1.5), 1.5e6);
        assert_eq!(nmm_to_knm(80.0e6), 80.0);
    }

    #[test]
    fn test_force_conversion() {
        let v: Newtons = KiloNewtons(120.0).into();
        assert_eq!(v.0, 120_000.0);
        assert_eq!(n_to_kn(2500.0), 2.5);
    }

    #[test]
    fn test_arithmetic() {
        let a = Millimetres(400.0);
        let b = Millimetres(50.0);
        assert_eq!((a + b).0, 450.0);
        assert_eq!((a - b).0, 350.0);
        assert_eq!((a * 2.0).0, 800.0);
        assert_eq!((a / 2.0).0, 200.0);
    }

    #[test]
    fn test_serialization() {
        let span = Millimetres(4000.0);
        let json = serde_json::to_string(&span).unwrap();
        assert_eq!(json, "4000.0");

        let roundtrip: Millimetres = serde_json::from_str(&json).unwrap();
        assert_eq!(span, roundtrip);
    }
}
