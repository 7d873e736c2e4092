use reflect_transcript::{role_prefixed, ConversationTurn};

/// Build the summary request for a finished conversation.
pub fn build_results_prompt(turns: &[ConversationTurn]) -> String {
    format!(
        r#"Analyze the following conversation transcript between an Executive and a Strategic Thought Partner.

TRANSCRIPT:
{transcript}

INSTRUCTIONS:
Return a JSON object (and ONLY a JSON object) with the following keys:
- heres_what_im_hearing: (string) A deep reflection of their situation, in their own language.
- pattern_worth_examining: (string) The structural pattern or circular dependency identified, named.
- question_to_sit_with: (string) One provocative question for their leadership.
- the_close: (object) with string keys sit_with_it, keep_thinking, real_conversation.
- template_recommendation: (optional object) with string keys tier, name, reason.

Ensure the tone is senior, sophisticated, and non-salesy."#,
        transcript = role_prefixed(turns)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_role_prefixed_transcript() {
        let turns = vec![
            ConversationTurn::model("What are you hoping for?"),
            ConversationTurn::user("Shorter sales cycles"),
        ];
        let prompt = build_results_prompt(&turns);
        assert!(prompt.contains("MODEL: What are you hoping for?\nUSER: Shorter sales cycles"));
        assert!(prompt.contains("heres_what_im_hearing"));
        assert!(prompt.contains("template_recommendation"));
    }

    #[test]
    fn test_prompt_with_empty_history() {
        let prompt = build_results_prompt(&[]);
        assert!(prompt.contains("TRANSCRIPT:\n\n"));
    }
}
