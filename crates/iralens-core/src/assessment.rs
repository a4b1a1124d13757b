//! Structured sub-assessments and the synthesized verdict.
//!
//! Field names match the flattened output columns, so a validated response
//! deserializes straight into these types.

use serde::{Deserialize, Serialize};

/// The four analytical dimensions assessed before synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Lexical,
    Framing,
    Audience,
    IraAlignment,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Self::Lexical,
        Self::Framing,
        Self::Audience,
        Self::IraAlignment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lexical => "lexical",
            Self::Framing => "framing",
            Self::Audience => "audience",
            Self::IraAlignment => "ira_alignment",
        }
    }
}

/// Vocabulary and keyword delta between the two texts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexicalAssessment {
    pub lexical_has_changed: bool,
    pub lexical_summary: String,
}

/// Shift in narrative identity or mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FramingAssessment {
    pub framing_has_changed: bool,
    pub framing_from_narrative: String,
    pub framing_to_narrative: String,
    pub framing_summary: String,
}

/// Shift in the stakeholders the text addresses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudienceAssessment {
    pub audience_has_changed: bool,
    pub audience_primary_audience: String,
    pub audience_summary: String,
}

/// Kind of evidence linking the post-policy text to the Inflation Reduction Act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceType {
    None,
    ExplicitMention,
    TaxCode,
    ConceptualLanguage,
}

impl EvidenceType {
    pub const VALUES: &'static [&'static str] =
        &["none", "explicit_mention", "tax_code", "conceptual_language"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ExplicitMention => "explicit_mention",
            Self::TaxCode => "tax_code",
            Self::ConceptualLanguage => "conceptual_language",
        }
    }
}

/// Explicit or implicit alignment with the Inflation Reduction Act.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IraAlignmentAssessment {
    pub ira_alignment_detected: bool,
    pub ira_evidence_type: EvidenceType,
    /// Terms found in the text, e.g. "Inflation Reduction Act", "45Q", "ITC".
    pub ira_specific_evidence: Vec<String>,
    pub ira_reasoning: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeLevel {
    None,
    Minor,
    Moderate,
    Major,
}

impl ChangeLevel {
    pub const VALUES: &'static [&'static str] = &["none", "minor", "moderate", "major"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Minor => "minor",
            Self::Moderate => "moderate",
            Self::Major => "major",
        }
    }
}

/// Overall verdict, derived from all four sub-assessments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synthesis {
    pub overall_change_level: ChangeLevel,
    /// In `[0, 1]`.
    pub overall_confidence: f64,
    pub overall_synthesis_reasoning: String,
}

/// The complete hierarchical assessment for one company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub lexical: LexicalAssessment,
    pub framing: FramingAssessment,
    pub audience: AudienceAssessment,
    pub ira_alignment: IraAlignmentAssessment,
    pub synthesis: Synthesis,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_values_match_serde_names() {
        for (value, level) in ChangeLevel::VALUES.iter().zip([
            ChangeLevel::None,
            ChangeLevel::Minor,
            ChangeLevel::Moderate,
            ChangeLevel::Major,
        ]) {
            let parsed: ChangeLevel = serde_json::from_value(serde_json::json!(value)).unwrap();
            assert_eq!(parsed, level);
            assert_eq!(level.as_str(), *value);
        }
        for value in EvidenceType::VALUES {
            let parsed: EvidenceType = serde_json::from_value(serde_json::json!(value)).unwrap();
            assert_eq!(parsed.as_str(), *value);
        }
    }

    #[test]
    fn change_levels_are_ordered() {
        assert!(ChangeLevel::None < ChangeLevel::Minor);
        assert!(ChangeLevel::Moderate < ChangeLevel::Major);
    }

    #[test]
    fn ira_assessment_reads_prefixed_fields() {
        let json = serde_json::json!({
            "ira_alignment_detected": true,
            "ira_evidence_type": "tax_code",
            "ira_specific_evidence": ["45Q", "ITC"],
            "ira_reasoning": "Mentions carbon capture credits."
        });
        let parsed: IraAlignmentAssessment = serde_json::from_value(json).unwrap();
        assert!(parsed.ira_alignment_detected);
        assert_eq!(parsed.ira_evidence_type, EvidenceType::TaxCode);
        assert_eq!(parsed.ira_specific_evidence, vec!["45Q", "ITC"]);
    }
}
