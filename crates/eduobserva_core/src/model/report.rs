//! AI-generated observation report.
//!
//! # Invariants
//! - All four sections are required; a report is never built from a partial
//!   response.
//! - Reports are derived on demand and never persisted.

use serde::{Deserialize, Serialize};

/// Narrative report generated for one observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiReport {
    pub observed_aspects: String,
    pub improvement_focus: String,
    pub praxis_suggestions: String,
    pub dialogue_proposal: String,
}

impl AiReport {
    /// Returns the text of one section.
    pub fn section(&self, section: ReportSection) -> &str {
        match section {
            ReportSection::ObservedAspects => &self.observed_aspects,
            ReportSection::ImprovementFocus => &self.improvement_focus,
            ReportSection::PraxisSuggestions => &self.praxis_suggestions,
            ReportSection::DialogueProposal => &self.dialogue_proposal,
        }
    }
}

/// Report sections in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportSection {
    ObservedAspects,
    ImprovementFocus,
    PraxisSuggestions,
    DialogueProposal,
}

impl ReportSection {
    pub const ALL: [ReportSection; 4] = [
        Self::ObservedAspects,
        Self::ImprovementFocus,
        Self::PraxisSuggestions,
        Self::DialogueProposal,
    ];

    /// Wire key used in the JSON report schema.
    pub fn key(self) -> &'static str {
        match self {
            Self::ObservedAspects => "observedAspects",
            Self::ImprovementFocus => "improvementFocus",
            Self::PraxisSuggestions => "praxisSuggestions",
            Self::DialogueProposal => "dialogueProposal",
        }
    }

    /// User-facing section heading.
    pub fn title(self) -> &'static str {
        match self {
            Self::ObservedAspects => "Aspectos Observados",
            Self::ImprovementFocus => "Focos de Mejora",
            Self::PraxisSuggestions => "Sugerencias Praxis",
            Self::DialogueProposal => "Diálogo Democrático",
        }
    }
}
