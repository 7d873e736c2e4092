use chrono::NaiveDate;

use crate::AnalysisResult;

const RULE: &str = "═══════════════════════════════════════";

/// Attribution line placed under a shared question.
pub const SHARE_ATTRIBUTION: &str =
    "From a Reflect AI Assessment — free strategic diagnostic for AI leaders.";

impl AnalysisResult {
    /// Render the plain-text strategic brief.
    ///
    /// Empty lines are dropped, so sections are separated only by their
    /// headings.
    pub fn to_brief(&self, date: NaiveDate) -> String {
        let recommendation = self
            .template_recommendation
            .as_ref()
            .map(|rec| {
                [
                    "─── RECOMMENDED NEXT STEP ───".to_string(),
                    String::new(),
                    format!("{} ({})", rec.name, rec.tier),
                    rec.reason.clone(),
                ]
                .join("\n")
            })
            .unwrap_or_default();

        let lines = [
            RULE.to_string(),
            "  YOUR STRATEGIC REFLECTION".to_string(),
            "  Prepared by Reflect AI · Creative Precision".to_string(),
            format!("  {}", date.format("%B %-d, %Y")),
            RULE.to_string(),
            "─── HERE'S WHAT I'M HEARING ───".to_string(),
            self.heres_what_im_hearing.clone(),
            "─── A PATTERN WORTH EXAMINING ───".to_string(),
            self.pattern_worth_examining.clone(),
            "─── A QUESTION TO SIT WITH ───".to_string(),
            format!("\"{}\"", self.question_to_sit_with),
            "─── WHAT NOW? ───".to_string(),
            format!("Sit With It: {}", self.the_close.sit_with_it),
            format!("Keep Thinking: {}", self.the_close.keep_thinking),
            format!("A Real Conversation: {}", self.the_close.real_conversation),
            recommendation,
            RULE.to_string(),
            "  Creative Precision · creativeprecision.co".to_string(),
            RULE.to_string(),
        ];

        lines
            .into_iter()
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn brief_file_name(date: NaiveDate) -> String {
    format!("Reflect_Strategic_Brief_{}.txt", date.format("%Y-%m-%d"))
}

/// Text copied to the clipboard when the user shares their question.
///
/// `base_url` is origin plus path of the landing page.
pub fn share_text(result: &AnalysisResult, base_url: &str) -> String {
    format!(
        "\"{}\"\n\n{}\n{}?utm_source=viral_share",
        result.question_to_sit_with, SHARE_ATTRIBUTION, base_url
    )
}

/// Follow-up links offered on the results page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifeline {
    LinkedIn,
    Calendar,
}

impl Lifeline {
    /// Value of the `type` field in the `lifeline_clicked` event.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::LinkedIn => "linkedin",
            Self::Calendar => "calendar",
        }
    }

    pub fn url(&self) -> &'static str {
        match self {
            Self::LinkedIn => "https://www.linkedin.com/company/creative-precision",
            Self::Calendar => "https://calendly.com",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TemplateRecommendation;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 9).unwrap()
    }

    #[test]
    fn test_brief_sections_in_order() {
        let brief = AnalysisResult::fallback().to_brief(date());
        let hearing = brief.find("HERE'S WHAT I'M HEARING").unwrap();
        let pattern = brief.find("A PATTERN WORTH EXAMINING").unwrap();
        let question = brief.find("A QUESTION TO SIT WITH").unwrap();
        let close = brief.find("WHAT NOW?").unwrap();
        assert!(hearing < pattern && pattern < question && question < close);

        assert!(brief.contains("  March 9, 2025"));
        assert!(brief.contains("Sit With It: Take this question"));
        assert!(!brief.contains("RECOMMENDED NEXT STEP"));
        assert!(!brief.contains("\n\n"));
        assert!(brief.ends_with(RULE));
    }

    #[test]
    fn test_brief_quotes_question() {
        let mut result = AnalysisResult::fallback();
        result.question_to_sit_with = "Who owns this?".into();
        assert!(result.to_brief(date()).contains("\n\"Who owns this?\"\n"));
    }

    #[test]
    fn test_brief_with_recommendation() {
        let mut result = AnalysisResult::fallback();
        result.template_recommendation = Some(TemplateRecommendation {
            tier: "Tier 1".into(),
            name: "Readiness Map".into(),
            reason: "Start here.".into(),
        });
        let brief = result.to_brief(date());
        assert!(brief.contains("─── RECOMMENDED NEXT STEP ───\n\nReadiness Map (Tier 1)\nStart here."));
    }

    #[test]
    fn test_file_name() {
        assert_eq!(
            brief_file_name(date()),
            "Reflect_Strategic_Brief_2025-03-09.txt"
        );
    }

    #[test]
    fn test_share_text() {
        let mut result = AnalysisResult::fallback();
        result.question_to_sit_with = "Q?".into();
        assert_eq!(
            share_text(&result, "https://reflect.example/assess"),
            "\"Q?\"\n\nFrom a Reflect AI Assessment — free strategic diagnostic for AI leaders.\nhttps://reflect.example/assess?utm_source=viral_share"
        );
    }

    #[test]
    fn test_lifelines() {
        assert_eq!(Lifeline::LinkedIn.event_type(), "linkedin");
        assert!(Lifeline::Calendar.url().starts_with("https://"));
    }
}
