//! # Project Data Structures
//!
//! The `Project` struct is the root container for a set of beams designed
//! together. Projects serialize to `.is456.json` files as human-readable JSON.
//!
//! ## Structure
//!
//! ```text
//! Project
//! ├── meta: ProjectMetadata (schema version, engineer, job info, timestamps)
//! ├── settings: DesignSettings (shared by every beam)
//! └── beams: BTreeMap<Uuid, BeamDesignInput>
//! ```
//!
//! Beams are keyed by UUID in a `BTreeMap`, so the file and every batch
//! report list them in the same order on every run.
//!
//! ## Example
//!
//! ```rust
//! use is456_core::project::Project;
//!
//! let project = Project::new("Jane Engineer", "25-042", "ACME Corp");
//! let json = serde_json::to_string_pretty(&project).unwrap();
//! assert!(json.contains("25-042"));
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::BeamDesignInput;
use crate::settings::DesignSettings;

/// Current schema version for project files
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Root project container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub meta: ProjectMetadata,

    /// Settings applied to every beam in the project
    #[serde(default)]
    pub settings: DesignSettings,

    /// Beams, keyed by UUID
    #[serde(default)]
    pub beams: BTreeMap<Uuid, BeamDesignInput>,
}

impl Project {
    /// Create a new empty project.
    ///
    /// # Example
    ///
    /// ```rust
    /// use is456_core::project::Project;
    ///
    /// let project = Project::new("John Doe", "25-001", "Client Corp");
    /// assert_eq!(project.meta.engineer, "John Doe");
    /// assert_eq!(project.beam_count(), 0);
    /// ```
    pub fn new(
        engineer: impl Into<String>,
        job_id: impl Into<String>,
        client: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Project {
            meta: ProjectMetadata {
                version: SCHEMA_VERSION.to_string(),
                engineer: engineer.into(),
                job_id: job_id.into(),
                client: client.into(),
                created: now,
                modified: now,
            },
            settings: DesignSettings::default(),
            beams: BTreeMap::new(),
        }
    }

    /// Add a beam; returns its new UUID
    pub fn add_beam(&mut self, beam: BeamDesignInput) -> Uuid {
        let id = Uuid::new_v4();
        self.beams.insert(id, beam);
        self.touch();
        id
    }

    /// Remove a beam by UUID
    pub fn remove_beam(&mut self, id: &Uuid) -> Option<BeamDesignInput> {
        let beam = self.beams.remove(id);
        if beam.is_some() {
            self.touch();
        }
        beam
    }

    pub fn get_beam(&self, id: &Uuid) -> Option<&BeamDesignInput> {
        self.beams.get(id)
    }

    /// Mutable access; marks the project modified when the beam exists.
    pub fn get_beam_mut(&mut self, id: &Uuid) -> Option<&mut BeamDesignInput> {
        if self.beams.contains_key(id) {
            self.meta.modified = Utc::now();
            self.beams.get_mut(id)
        } else {
            None
        }
    }

    /// First beam with the given label
    pub fn find_by_label(&self, label: &str) -> Option<(&Uuid, &BeamDesignInput)> {
        self.beams.iter().find(|(_, beam)| beam.label == label)
    }

    /// Update the modified timestamp.
    pub fn touch(&mut self) {
        self.meta.modified = Utc::now();
    }

    pub fn beam_count(&self) -> usize {
        self.beams.len()
    }
}

impl Default for Project {
    fn default() -> Self {
        Project::new("", "", "")
    }
}

/// Project metadata stored in the file header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Schema version (for migration compatibility)
    pub version: String,

    /// Name of the responsible engineer
    pub engineer: String,

    /// Job/project number
    pub job_id: String,

    /// Client name
    pub client: String,

    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::inputs::{BeamGeometry, LoadCase};
    use crate::materials::{ConcreteGrade, MaterialProperties, SteelGrade};

    fn beam(label: &str) -> BeamDesignInput {
        BeamDesignInput {
            label: label.to_string(),
            geometry: BeamGeometry::new(4000.0, 230.0, 450.0, 400.0, 25.0),
            materials: MaterialProperties::new(ConcreteGrade::M20, SteelGrade::Fe415),
            load_cases: vec![LoadCase::new("ULS", 80.0, 90.0)],
        }
    }

    #[test]
    fn test_project_creation() {
        let project = Project::new("John Doe", "25-001", "Acme Corp");
        assert_eq!(project.meta.engineer, "John Doe");
        assert_eq!(project.meta.job_id, "25-001");
        assert_eq!(project.meta.client, "Acme Corp");
        assert_eq!(project.meta.version, SCHEMA_VERSION);
    }

    #[test]
    fn test_project_serialization() {
        let mut project = Project::new("Jane Engineer", "25-042", "Test Client");
        project.add_beam(beam("B1"));
        let json = serde_json::to_string_pretty(&project).unwrap();

        assert!(json.contains("Jane Engineer"));
        assert!(json.contains("\"span_mm\""));

        let roundtrip: Project = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip, project);
    }

    #[test]
    fn test_add_remove_beam() {
        let mut project = Project::new("Engineer", "25-001", "Client");
        let id = project.add_beam(beam("B1"));
        assert_eq!(project.beam_count(), 1);
        assert!(project.get_beam(&id).is_some());
        assert_eq!(project.find_by_label("B1").map(|(k, _)| *k), Some(id));

        let removed = project.remove_beam(&id);
        assert!(removed.is_some());
        assert_eq!(project.beam_count(), 0);
        assert!(project.remove_beam(&id).is_none());
    }

    #[test]
    fn test_settings_default_when_missing() {
        let project = Project::new("Engineer", "25-001", "Client");
        let mut value = serde_json::to_value(&project).unwrap();
        value.as_object_mut().unwrap().remove("settings");
        let parsed: Project = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.settings, DesignSettings::default());
    }
}
