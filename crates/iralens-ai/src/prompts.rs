//! Prompt construction for the four sub-assessments and the synthesis step.

use iralens_core::{
    AudienceAssessment, Dimension, FramingAssessment, IraAlignmentAssessment, LexicalAssessment,
};

use crate::service::Prompt;

pub const SYSTEM_PROMPT: &str = "You are a research analyst specializing in corporate \
communications, strategic management and policy analysis. You compare two versions of a \
company's website text: one from before the US Inflation Reduction Act (IRA) and one from \
after. Base every judgement on the texts alone. Respond with ONLY a JSON object containing \
exactly the requested fields.";

/// Characters of each text quoted back in the synthesis prompt.
pub const SYNTHESIS_EXCERPT_CHARS: usize = 500;

/// The first `limit` characters of `text`, cut on a character boundary.
pub fn excerpt(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

fn task(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Lexical => {
            "Assess LEXICAL change: the objective difference in vocabulary and keywords \
             between the two texts. Set lexical_has_changed when terminology changed \
             materially, and summarise the key additions and removals in lexical_summary."
        }
        Dimension::Framing => {
            "Assess STRATEGIC FRAMING: how the company describes its core identity or \
             mission. Describe the pre-IRA narrative in framing_from_narrative and the \
             post-IRA narrative in framing_to_narrative, set framing_has_changed, and \
             summarise the shift in framing_summary (write 'No significant change' if none)."
        }
        Dimension::Audience => {
            "Assess TARGET AUDIENCE: which stakeholders the texts address (for example \
             consumers, B2B customers, investors, policymakers). Name the main audience in \
             audience_primary_audience, set audience_has_changed, and summarise any shift in \
             audience_summary (write 'No significant change' if none)."
        }
        Dimension::IraAlignment => {
            "Assess IRA ALIGNMENT of the post-IRA text. Set ira_alignment_detected, classify \
             the strongest evidence in ira_evidence_type (none, explicit_mention, tax_code or \
             conceptual_language), list specific terms such as 'Inflation Reduction Act', \
             '45Q', 'ITC' or 'domestic content' in ira_specific_evidence (empty if none), and \
             explain in ira_reasoning."
        }
    }
}

/// Prompt for one sub-assessment. Both texts are cut to `prompt_limit`
/// characters.
pub fn dimension_prompt(dimension: Dimension, pre: &str, post: &str, prompt_limit: usize) -> Prompt {
    let user = format!(
        "{task}\n\n\
         ## PRE-IRA TEXT (2022):\n{pre}\n\n\
         ## POST-IRA TEXT (2023):\n{post}\n",
        task = task(dimension),
        pre = excerpt(pre, prompt_limit),
        post = excerpt(post, prompt_limit),
    );
    Prompt {
        system: SYSTEM_PROMPT.to_string(),
        user,
    }
}

/// Prompt for the synthesis step, built from the four accepted
/// sub-assessments plus short excerpts of each text.
pub fn synthesis_prompt(
    lexical: &LexicalAssessment,
    framing: &FramingAssessment,
    audience: &AudienceAssessment,
    ira: &IraAlignmentAssessment,
    pre: &str,
    post: &str,
) -> Prompt {
    let evidence = if ira.ira_specific_evidence.is_empty() {
        "none".to_string()
    } else {
        ira.ira_specific_evidence.join("; ")
    };
    let user = format!(
        "Synthesize the four analyses below into an overall assessment of how much the \
         company's messaging changed. Choose overall_change_level from none, minor, moderate \
         or major, give overall_confidence between 0 and 1, and justify the level in \
         overall_synthesis_reasoning.\n\n\
         ## LEXICAL\nchanged: {lex_changed}\n{lex_summary}\n\n\
         ## FRAMING\nchanged: {fr_changed}\nfrom: {fr_from}\nto: {fr_to}\n{fr_summary}\n\n\
         ## AUDIENCE\nchanged: {au_changed}\nprimary audience: {au_primary}\n{au_summary}\n\n\
         ## IRA ALIGNMENT\ndetected: {ira_detected}\nevidence type: {ira_type}\n\
         evidence: {evidence}\n{ira_reasoning}\n\n\
         ## PRE-IRA EXCERPT:\n{pre}\n\n\
         ## POST-IRA EXCERPT:\n{post}\n",
        lex_changed = lexical.lexical_has_changed,
        lex_summary = lexical.lexical_summary,
        fr_changed = framing.framing_has_changed,
        fr_from = framing.framing_from_narrative,
        fr_to = framing.framing_to_narrative,
        fr_summary = framing.framing_summary,
        au_changed = audience.audience_has_changed,
        au_primary = audience.audience_primary_audience,
        au_summary = audience.audience_summary,
        ira_detected = ira.ira_alignment_detected,
        ira_type = ira.ira_evidence_type.as_str(),
        ira_reasoning = ira.ira_reasoning,
        pre = excerpt(pre, SYNTHESIS_EXCERPT_CHARS),
        post = excerpt(post, SYNTHESIS_EXCERPT_CHARS),
    );
    Prompt {
        system: SYSTEM_PROMPT.to_string(),
        user,
    }
}
