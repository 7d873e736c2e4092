//! The end-of-session strategic summary.
//!
//! `build_results_prompt` turns a conversation into the summary request,
//! `parse_analysis` turns whatever comes back into an `AnalysisResult`
//! (falling back to a canned one), and `brief` renders it for export.

mod brief;
mod prompt;

pub use brief::{brief_file_name, share_text, Lifeline, SHARE_ATTRIBUTION};
pub use prompt::build_results_prompt;

use serde::{Deserialize, Serialize};

/// Structured summary returned by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub heres_what_im_hearing: String,
    #[serde(default)]
    pub pattern_worth_examining: String,
    #[serde(default)]
    pub question_to_sit_with: String,
    #[serde(default)]
    pub the_close: TheClose,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_recommendation: Option<TemplateRecommendation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TheClose {
    #[serde(default)]
    pub sit_with_it: String,
    #[serde(default)]
    pub keep_thinking: String,
    #[serde(default)]
    pub real_conversation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRecommendation {
    pub tier: String,
    pub name: String,
    pub reason: String,
}

impl AnalysisResult {
    /// Canned result used whenever the model response is unusable.
    pub fn fallback() -> Self {
        Self {
            heres_what_im_hearing: "You described an organization that has the ambition and the budget to make AI work, but something structural keeps pulling you back to pilot mode. The tools are there, the intent is there, but the bridge between experiment and production keeps washing out.".into(),
            pattern_worth_examining: "The Proof-of-Concept Death Spiral: your organization proves AI can work in isolated tests, but the path from proof to production requires organizational changes nobody has been asked to own. So you prove it again. And again.".into(),
            question_to_sit_with: "If your AI pilots keep succeeding but never scaling, is the problem really technical, or is it that nobody in your organization has the mandate to change how work actually gets done?".into(),
            the_close: TheClose {
                sit_with_it: "Take this question to your leadership team this week. The conversation it sparks will tell you more than any consultant could.".into(),
                keep_thinking: "Follow Creative Precision on LinkedIn for ongoing strategic perspective on AI transformation, the kind of thinking that doesn't fit in a vendor pitch.".into(),
                real_conversation: "If this reflection surfaced something worth exploring further, we're happy to think alongside you. Not a pitch, not a demo. Just a thinking partner. Calendar link below.".into(),
            },
            template_recommendation: None,
        }
    }

    /// A result is usable only if it says what was heard and poses a question.
    pub fn is_usable(&self) -> bool {
        !self.heres_what_im_hearing.trim().is_empty() && !self.question_to_sit_with.trim().is_empty()
    }
}

/// Parse a raw summary response, falling back to the canned result.
///
/// Tolerates a surrounding markdown code fence. Never fails.
pub fn parse_analysis(raw: &str) -> AnalysisResult {
    let body = strip_code_fence(raw);
    match serde_json::from_str::<AnalysisResult>(body) {
        Ok(result) if result.is_usable() => result,
        Ok(_) => {
            tracing::warn!("Summary response missing required fields, using fallback");
            AnalysisResult::fallback()
        }
        Err(e) => {
            tracing::warn!("Failed to parse summary response: {}", e);
            AnalysisResult::fallback()
        }
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the optional language tag, e.g. ```json, with or without a newline after it
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    let rest = rest.trim_end();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
