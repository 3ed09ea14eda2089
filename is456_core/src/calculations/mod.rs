//! # Design Engines
//!
//! Each engine is a set of pure functions over plain serde types:
//!
//! - [`inputs`] - beam geometry, section shape, support condition, load cases
//! - [`flexure`] - required steel and moment capacity (IS 456 Cl. 38, Annex G)
//! - [`shear`] - stirrup design (Cl. 40)
//! - [`ductile`] - IS 13920 confinement and limits
//! - [`serviceability`] - span/depth and crack control (Cl. 23.2, 35.3.2, Annex F)
//! - [`detailing`] - bar layouts, stirrup zones, anchorage, bar marks
//! - [`compliance`] - all checks over all load cases, governing case per category
//! - [`optimizer`] - cheapest compliant bar arrangement
//! - [`geometry3d`] - viewer coordinates from a detailing
//!
//! Engines take the design tables as an explicit `&DesignTables` argument
//! and never read global state, so identical inputs always give identical
//! results.

pub mod compliance;
pub mod detailing;
pub mod ductile;
pub mod flexure;
pub mod geometry3d;
pub mod inputs;
pub mod optimizer;
pub mod serviceability;
pub mod shear;

pub use compliance::{aggregate, CheckCategory, ComplianceSummary, GoverningDemand};
pub use detailing::{BarArrangement, DetailingResult, ProvidedReinforcement, StirrupZone};
pub use flexure::{compute_flexure, moment_capacity, FlexureResult};
pub use geometry3d::{derive_geometry, Geometry3D};
pub use inputs::{BeamGeometry, LoadCase, SectionShape, SupportCondition};
pub use optimizer::{optimize_cost, CostBreakdown, OptimalDesign};
pub use shear::{compute_shear, ShearResult};
