//! Post-session results: summary generation, brief export and follow-ups.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use reflect_events::{event_names, SessionUpdate, Telemetry};
use reflect_llm::SummaryApi;
use reflect_results::{
    brief_file_name, build_results_prompt, parse_analysis, share_text, AnalysisResult, Lifeline,
};
use reflect_transcript::{ConversationTurn, Transcript};
use serde_json::json;

/// Ask the model for the structured summary, falling back on any failure.
pub async fn generate_analysis(
    summary: &dyn SummaryApi,
    turns: &[ConversationTurn],
) -> AnalysisResult {
    let prompt = build_results_prompt(turns);
    match summary.generate_summary(&prompt).await {
        Ok(raw) => parse_analysis(&raw),
        Err(e) => {
            tracing::error!("Summary generation failed: {}", e);
            AnalysisResult::fallback()
        }
    }
}

/// The results page: one analysis, its exports and the follow-up actions.
pub struct ResultsPage {
    pub result: AnalysisResult,
    pub turns: Vec<ConversationTurn>,
    pub date: NaiveDate,
    pub telemetry: Telemetry,
}

impl ResultsPage {
    pub fn new(
        result: AnalysisResult,
        turns: Vec<ConversationTurn>,
        date: NaiveDate,
        telemetry: Telemetry,
    ) -> Self {
        telemetry.track(event_names::RESULTS_VIEWED, None);
        Self {
            result,
            turns,
            date,
            telemetry,
        }
    }

    pub fn brief(&self) -> String {
        self.result.to_brief(self.date)
    }

    /// Write the strategic brief into `dir` and return its path.
    pub fn export_brief(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        let path = dir.join(brief_file_name(self.date));
        std::fs::write(&path, self.brief())
            .with_context(|| format!("failed to write {}", path.display()))?;

        self.telemetry.track(event_names::PDF_DOWNLOADED, None);
        self.telemetry.update_session(SessionUpdate {
            downloaded_pdf: Some(true),
            ..Default::default()
        });
        Ok(path)
    }

    /// Write the labelled transcript into `dir` and return its path.
    pub fn export_transcript(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        let mut transcript = Transcript::new();
        for turn in &self.turns {
            transcript.push(turn.clone());
        }
        let path = dir.join(Transcript::download_file_name(self.date));
        std::fs::write(&path, transcript.download_text())
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    pub fn share(&self, base_url: &str) -> String {
        self.telemetry.track(event_names::SHARE_CLICKED, None);
        self.telemetry.update_session(SessionUpdate {
            clicked_share: Some(true),
            ..Default::default()
        });
        share_text(&self.result, base_url)
    }

    pub fn lifeline(&self, lifeline: Lifeline) -> &'static str {
        self.telemetry.track(
            event_names::LIFELINE_CLICKED,
            Some(json!({ "type": lifeline.event_type() })),
        );
        self.telemetry.update_session(SessionUpdate {
            clicked_lifeline: Some(true),
            booked_call: (lifeline == Lifeline::Calendar).then_some(true),
            ..Default::default()
        });
        lifeline.url()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use reflect_events::{InMemoryTelemetry, TelemetrySinkRef};
    use reflect_llm::LlmError;
    use std::sync::Arc;

    struct FixedSummary(Option<&'static str>);

    #[async_trait]
    impl SummaryApi for FixedSummary {
        async fn generate_summary(&self, _prompt: &str) -> reflect_llm::Result<String> {
            self.0
                .map(str::to_string)
                .ok_or(LlmError::EmptyResponse)
        }
    }

    fn turns() -> Vec<ConversationTurn> {
        vec![
            ConversationTurn::model("What are you hoping for?"),
            ConversationTurn::user("Growth."),
        ]
    }

    fn page(sink: &Arc<InMemoryTelemetry>) -> ResultsPage {
        let telemetry = Telemetry::new(Some(sink.clone() as TelemetrySinkRef));
        ResultsPage::new(
            AnalysisResult::fallback(),
            turns(),
            NaiveDate::from_ymd_opt(2025, 3, 9).unwrap(),
            telemetry,
        )
    }

    #[tokio::test]
    async fn test_generate_analysis_parses_response() {
        let raw = r#"{"heres_what_im_hearing":"Heard.","question_to_sit_with":"Why?"}"#;
        let result = generate_analysis(&FixedSummary(Some(raw)), &turns()).await;
        assert_eq!(result.heres_what_im_hearing, "Heard.");
        assert_eq!(result.question_to_sit_with, "Why?");
    }

    #[tokio::test]
    async fn test_generate_analysis_falls_back_on_error() {
        let result = generate_analysis(&FixedSummary(None), &turns()).await;
        assert_eq!(result, AnalysisResult::fallback());
    }

    #[test]
    fn test_export_writes_files_and_tracks_download() {
        let sink = Arc::new(InMemoryTelemetry::new());
        let page = page(&sink);
        let dir = tempfile::tempdir().unwrap();

        let brief = page.export_brief(dir.path()).unwrap();
        let transcript = page.export_transcript(dir.path()).unwrap();

        assert!(brief.ends_with("Reflect_Strategic_Brief_2025-03-09.txt"));
        assert!(transcript.ends_with("Reflect_Assessment_2025-03-09.txt"));
        let text = std::fs::read_to_string(transcript).unwrap();
        assert!(text.contains("Executive:"));
        assert!(text.contains("Growth."));

        assert_eq!(sink.events_named(event_names::RESULTS_VIEWED).len(), 1);
        assert_eq!(sink.events_named(event_names::PDF_DOWNLOADED).len(), 1);
        assert_eq!(
            sink.snapshot().updates[0].1.downloaded_pdf,
            Some(true)
        );
    }

    #[test]
    fn test_lifeline_and_share_are_tracked() {
        let sink = Arc::new(InMemoryTelemetry::new());
        let page = page(&sink);

        assert_eq!(page.lifeline(Lifeline::Calendar), "https://calendly.com");
        let shared = page.share("https://example.com/");
        assert!(shared.ends_with("https://example.com/?utm_source=viral_share"));

        let clicks = sink.events_named(event_names::LIFELINE_CLICKED);
        assert_eq!(clicks[0].event_data["type"], "calendar");
        assert_eq!(sink.events_named(event_names::SHARE_CLICKED).len(), 1);

        let updates = sink.snapshot().updates;
        assert_eq!(updates[0].1.booked_call, Some(true));
        assert_eq!(updates[1].1.clicked_share, Some(true));
    }
}
