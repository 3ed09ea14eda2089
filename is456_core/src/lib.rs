//! # is456_core - Reinforced-Concrete Beam Design Engine
//!
//! Designs and checks reinforced-concrete beams to IS 456:2000, with
//! IS 13920 ductile detailing. Every input and output is a plain serde type
//! that serializes cleanly to JSON, so UIs, import adapters and report
//! writers can consume results without adapter-specific types.
//!
//! ## Design Philosophy
//!
//! - **Stateless**: pure functions; identical inputs give identical outputs
//! - **Injected tables**: IS 456 tables are a value passed to every engine
//! - **Rich Errors**: structured errors with clause references
//! - **Failing is a result**: an inadequate section comes back flagged, not
//!   as an error, unless strict mode asks otherwise
//!
//! ## Units
//!
//! Millimetres for lengths, N/mm² for stresses, kN for forces and kN·m for
//! moments. Field names carry the unit (`span_mm`, `mu_knm`).
//!
//! ## Quick Start
//!
//! ```rust
//! use is456_core::api::{design_beam_is456, BeamDesignInput};
//! use is456_core::calculations::{BeamGeometry, LoadCase};
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
//! let json = serde_json::to_string_pretty(&result).unwrap();
//! assert!(json.contains("ast_required_mm2"));
//! ```
//!
//! ## Modules
//!
//! - [`api`] - orchestration entry points
//! - [`calculations`] - flexure, shear, ductile, serviceability, detailing,
//!   compliance, optimizer, geometry engines
//! - [`smart`] - combined cost, sensitivity and constructability report
//! - [`tables`] - IS 456 design tables
//! - [`settings`] - run options and cost rates
//! - [`materials`] - concrete and steel grades, rebar catalogue
//! - [`clauses`] - code clause citations
//! - [`units`] - type-safe unit wrappers
//! - [`errors`] - structured error types
//! - [`project`] / [`file_io`] - project files with atomic saves and locking

pub mod api;
pub mod calculations;
pub mod clauses;
pub mod errors;
pub mod file_io;
pub mod materials;
pub mod project;
pub mod settings;
pub mod smart;
pub mod tables;
pub mod units;

pub use api::{
    check_beam_is456, design_beam_is456, optimize_beam_cost, smart_analyze_design,
    BeamCheckInput, BeamDesignInput, BeamDesignResult, Designer,
};
pub use errors::{ApiError, CalcError, CalcResult};
pub use file_io::{load_project, load_settings, save_project, FileLock};
pub use project::{Project, ProjectMetadata};
pub use settings::{CostTable, DesignSettings, ServiceabilityLevel};
pub use tables::DesignTables;
