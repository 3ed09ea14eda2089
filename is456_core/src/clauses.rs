//! # Code Clause Registry
//!
//! Every rule the engines apply cites the clause it comes from. Results and
//! errors carry the citation string so export modules (BBS, reports) can
//! print it without knowing anything about the engines.
//!
//! ```rust
//! use is456_core::clauses::Clause;
//!
//! assert_eq!(Clause::MinimumTensionSteel.citation(), "IS 456:2000 Cl. 26.5.1.1(a)");
//! ```

use serde::{Deserialize, Serialize};

/// Design code a clause belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeReference {
    /// IS 456:2000 Plain and Reinforced Concrete
    Is456,
    /// IS 13920:2016 Ductile Design and Detailing
    Is13920,
    /// SP 34:1987 Handbook on Concrete Reinforcement and Detailing
    Sp34,
}

impl CodeReference {
    /// Short form for inline references
    pub fn short_form(&self) -> &'static str {
        match self {
            CodeReference::Is456 => "IS 456:2000",
            CodeReference::Is13920 => "IS 13920:2016",
            CodeReference::Sp34 => "SP 34:1987",
        }
    }
}

/// Individual clauses applied by the engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Clause {
    /// Limit state of collapse: flexure assumptions
    FlexureAssumptions,
    /// Singly reinforced rectangular section, Annex G-1.1
    SinglyReinforced,
    /// Doubly reinforced section, Annex G-1.2
    DoublyReinforced,
    /// Flanged section, Annex G-2.2
    FlangedSection,
    /// Effective width of flange
    EffectiveFlangeWidth,
    /// Slenderness limits for lateral stability
    LateralStability,
    /// Minimum tension reinforcement
    MinimumTensionSteel,
    /// Maximum tension/compression reinforcement
    MaximumSteel,
    /// Nominal shear stress and design shear strength, Table 19
    DesignShearStrength,
    /// Maximum shear stress, Table 20
    MaximumShearStress,
    /// Design of shear reinforcement
    ShearReinforcement,
    /// Minimum shear reinforcement
    MinimumShearReinforcement,
    /// Maximum spacing of shear reinforcement
    MaximumStirrupSpacing,
    /// Development length
    DevelopmentLength,
    /// Lap splices
    LapLength,
    /// Minimum distance between individual bars
    BarSpacing,
    /// Maximum distance between bars in tension (crack control)
    MaximumBarSpacing,
    /// Nominal cover
    NominalCover,
    /// Span to effective depth ratio
    SpanDepthRatio,
    /// Crack width calculation, Annex F
    CrackWidth,
    /// Ductile beam geometry
    DuctileGeometry,
    /// Ductile longitudinal reinforcement limits
    DuctileLongitudinal,
    /// Ductile shear reinforcement near supports
    DuctileConfinement,
    /// Bar bending schedule conventions
    BarSchedule,
}

impl Clause {
    /// Which code the clause belongs to
    pub fn code(&self) -> CodeReference {
        match self {
            Clause::DuctileGeometry | Clause::DuctileLongitudinal | Clause::DuctileConfinement => {
                CodeReference::Is13920
            }
            Clause::BarSchedule => CodeReference::Sp34,
            _ => CodeReference::Is456,
        }
    }

    /// Section number within the code
    pub fn section(&self) -> &'static str {
        match self {
            Clause::FlexureAssumptions => "38.1",
            Clause::SinglyReinforced => "Annex G-1.1",
            Clause::DoublyReinforced => "Annex G-1.2",
            Clause::FlangedSection => "Annex G-2.2",
            Clause::EffectiveFlangeWidth => "23.1.2",
            Clause::LateralStability => "23.3",
            Clause::MinimumTensionSteel => "26.5.1.1(a)",
            Clause::MaximumSteel => "26.5.1.1(b)",
            Clause::DesignShearStrength => "40.2, Table 19",
            Clause::MaximumShearStress => "40.2.3, Table 20",
            Clause::ShearReinforcement => "40.4",
            Clause::MinimumShearReinforcement => "26.5.1.6",
            Clause::MaximumStirrupSpacing => "26.5.1.5",
            Clause::DevelopmentLength => "26.2.1",
            Clause::LapLength => "26.2.5.1",
            Clause::BarSpacing => "26.3.2",
            Clause::MaximumBarSpacing => "26.3.3",
            Clause::NominalCover => "26.4",
            Clause::SpanDepthRatio => "23.2.1",
            Clause::CrackWidth => "35.3.2, Annex F",
            Clause::DuctileGeometry => "6.1",
            Clause::DuctileLongitudinal => "6.2",
            Clause::DuctileConfinement => "6.3.5",
            Clause::BarSchedule => "Section 2",
        }
    }

    /// Full citation, e.g. "IS 456:2000 Cl. 26.3.2"
    pub fn citation(&self) -> String {
        format!("{} Cl. {}", self.code().short_form(), self.section())
    }
}

impl std::fmt::Display for Clause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.citation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_citations_name_their_code() {
        assert_eq!(Clause::SpanDepthRatio.citation(), "IS 456:2000 Cl. 23.2.1");
        assert_eq!(Clause::DuctileConfinement.citation(), "IS 13920:2016 Cl. 6.3.5");
        assert!(Clause::BarSchedule.to_string().starts_with("SP 34"));
    }
}
