//! Prompt builder: fixed templates with the question and optional citations.

use crate::catalog::DatasetEntry;

/// Which template to wrap the question in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStyle {
    /// Detailed answer for the one-shot `/chat` endpoint.
    Detailed,
    /// Short answer with follow-up questions and a sources footer, for chat sessions.
    Concise,
}

const PREAMBLE: &str =
    "You are an AI assistant specialized in Indian agricultural data from data.gov.in.";

const DETAILED_INSTRUCTIONS: &str = "Please provide a detailed, accurate answer based on what you know about Indian agriculture, climate patterns, and farming practices. If you're making claims about specific data, mention that the user should verify with data.gov.in for the latest statistics.";

const CONCISE_INSTRUCTIONS: &str = "\
IMPORTANT: Keep your answer SHORT and CONCISE (8-10 sentences maximum). Provide the most important points directly.

After your brief answer, suggest 2-3 SPECIFIC follow-up questions related to the topic. Format like this:

**Want to learn more?**
- [Specific follow-up question 1]?
- [Specific follow-up question 2]?
- [Specific follow-up question 3]?

At the very end, list the ACTUAL sources/references you're drawing information from. Include specific organizations, reports, or datasets. Format like this:

---
*Sources: [List actual sources like specific government departments, reports, datasets, or official websites]*";

/// Topics every answer is steered towards.
pub const FOCUS_AREAS: &[&str] = &[
    "Agricultural production and trends",
    "Climate patterns affecting farming",
    "State-wise variations",
    "Crop-specific information",
    "Government policies and initiatives",
];

/// Build the final prompt for `question`.
///
/// Pure function: the same inputs always give the same text. The question is
/// trimmed and included verbatim; each citation appears with its `id`.
///
/// # Example
/// ```
/// use qa_core::{PromptStyle, build_prompt, DATASET_CATALOG};
/// let p = build_prompt(PromptStyle::Concise, "What is MSP?", DATASET_CATALOG);
/// assert!(p.contains("What is MSP?"));
/// assert!(DATASET_CATALOG.iter().all(|d| p.contains(d.id)));
/// ```
pub fn build_prompt(style: PromptStyle, question: &str, citations: &[DatasetEntry]) -> String {
    let mut out = String::with_capacity(2048);
    out.push_str(PREAMBLE);
    out.push_str("\n\nUser Question: ");
    out.push_str(question.trim());
    out.push_str("\n\n");

    out.push_str(match style {
        PromptStyle::Detailed => DETAILED_INSTRUCTIONS,
        PromptStyle::Concise => CONCISE_INSTRUCTIONS,
    });
    out.push_str("\n\n");

    if !citations.is_empty() {
        out.push_str(
            "Reference datasets (cite the matching [id] when your answer relies on one):\n",
        );
        for d in citations {
            out.push_str(&format!(
                "- [{}] {} ({}; {})\n",
                d.id, d.title, d.organization, d.category
            ));
        }
        out.push('\n');
    }

    out.push_str("Focus on:\n");
    for area in FOCUS_AREAS {
        out.push_str("- ");
        out.push_str(area);
        out.push('\n');
    }
    out.push('\n');

    out.push_str(match style {
        PromptStyle::Detailed => "Answer:",
        PromptStyle::Concise => "Answer briefly and on point:",
    });

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DATASET_CATALOG;

    #[test]
    fn detailed_prompt_matches_template_exactly() {
        let expected = "\
You are an AI assistant specialized in Indian agricultural data from data.gov.in.

User Question: What is MSP?

Please provide a detailed, accurate answer based on what you know about Indian agriculture, climate patterns, and farming practices. If you're making claims about specific data, mention that the user should verify with data.gov.in for the latest statistics.

Focus on:
- Agricultural production and trends
- Climate patterns affecting farming
- State-wise variations
- Crop-specific information
- Government policies and initiatives

Answer:";
        assert_eq!(build_prompt(PromptStyle::Detailed, "What is MSP?", &[]), expected);
    }

    #[test]
    fn citations_are_listed_with_ids() {
        let p = build_prompt(PromptStyle::Concise, "What is MSP?", DATASET_CATALOG);
        assert!(p.contains("User Question: What is MSP?\n"));
        for d in DATASET_CATALOG {
            assert!(p.contains(&format!("- [{}] {}", d.id, d.title)), "missing {}", d.id);
        }
        assert!(p.ends_with("Answer briefly and on point:"));
    }

    #[test]
    fn no_citation_block_without_citations() {
        let p = build_prompt(PromptStyle::Concise, "q", &[]);
        assert!(!p.contains("Reference datasets"));
        assert!(p.contains("**Want to learn more?**"));
    }

    #[test]
    fn question_is_trimmed() {
        let p = build_prompt(PromptStyle::Detailed, "\n  Rabi crops?  \n", &[]);
        assert!(p.contains("User Question: Rabi crops?\n\n"));
    }
}
