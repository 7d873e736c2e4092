//! Incremental sentence segmentation for streamed replies.

use std::collections::HashSet;

use crate::constants::SEGMENT_MERGE_CHARS;

/// Splits a growing reply into speakable units as soon as their boundaries
/// are known.
///
/// Short completed sentences are merged until the merged span is longer than
/// [`SEGMENT_MERGE_CHARS`], except that the last completed sentence of a round
/// is always dispatched. Units already dispatched in this turn are skipped.
#[derive(Debug, Default)]
pub struct SentenceSegmenter {
    buffer: String,
    dispatched: HashSet<String>,
}

impl SentenceSegmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk of model output and return the units ready for synthesis.
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);

        let fragments = split_sentences(&self.buffer);
        if fragments.len() < 2 {
            return Vec::new();
        }

        let last = fragments.len() - 1;
        let mut units = Vec::new();
        let mut combined = String::new();

        for (i, fragment) in fragments[..last].iter().enumerate() {
            let sentence = fragment.trim();
            if sentence.is_empty() {
                continue;
            }
            if !combined.is_empty() {
                combined.push(' ');
            }
            combined.push_str(sentence);

            if (combined.chars().count() > SEGMENT_MERGE_CHARS || i == last - 1)
                && !self.dispatched.contains(&combined)
            {
                self.dispatched.insert(combined.clone());
                units.push(std::mem::take(&mut combined));
            }
        }

        let tail = fragments[last].to_string();
        self.buffer = if combined.is_empty() {
            tail
        } else {
            format!("{combined} {tail}")
        };
        units
    }

    /// Flush whatever is left once the stream has ended.
    pub fn flush(&mut self) -> Option<String> {
        let remaining = std::mem::take(&mut self.buffer).trim().to_string();
        if remaining.is_empty() || self.dispatched.contains(&remaining) {
            return None;
        }
        self.dispatched.insert(remaining.clone());
        Some(remaining)
    }

    /// Forget the buffer and the dispatched set, ready for a new reply.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.dispatched.clear();
    }
}

/// Split after `.`, `!` or `?` wherever a run of whitespace follows.
///
/// The whitespace run is consumed. A trailing boundary yields an empty last
/// fragment.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut fragments = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if c.is_whitespace() && matches!(prev, Some('.' | '!' | '?')) {
            fragments.push(&text[start..idx]);
            let mut end = idx + c.len_utf8();
            while let Some(&(next_idx, next)) = chars.peek() {
                if !next.is_whitespace() {
                    break;
                }
                end = next_idx + next.len_utf8();
                chars.next();
            }
            start = end;
            prev = Some(' ');
            continue;
        }
        prev = Some(c);
    }

    fragments.push(&text[start..]);
    fragments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sentences() {
        assert_eq!(split_sentences("Hi. There"), vec!["Hi.", "There"]);
        assert_eq!(split_sentences("Hi.  \nThere! "), vec!["Hi.", "There!", ""]);
        assert_eq!(split_sentences("3.5 million"), vec!["3.5 million"]);
        assert_eq!(split_sentences("no boundary"), vec!["no boundary"]);
    }

    #[test]
    fn test_streamed_reply_is_fully_dispatched() {
        let mut seg = SentenceSegmenter::new();
        let mut units = Vec::new();
        units.extend(seg.push("Hello there. "));
        units.extend(seg.push("How are you? I"));
        units.extend(seg.push("'m fine."));
        units.extend(seg.flush());

        assert_eq!(units, vec!["Hello there.", "How are you?", "I'm fine."]);
    }

    #[test]
    fn test_short_sentences_merge() {
        let mut seg = SentenceSegmenter::new();
        let units = seg.push("Yes. Right. Now tell me more about that. And");
        assert_eq!(
            units,
            vec!["Yes. Right. Now tell me more about that."]
        );
        assert_eq!(seg.flush().as_deref(), Some("And"));
    }

    #[test]
    fn test_long_sentence_dispatches_before_last() {
        let mut seg = SentenceSegmenter::new();
        let units = seg.push("That is a very long first sentence. Ok. Then");
        assert_eq!(units, vec!["That is a very long first sentence.", "Ok."]);
    }

    #[test]
    fn test_single_short_fragment_is_dispatched() {
        let mut seg = SentenceSegmenter::new();
        assert_eq!(seg.push("Ok. "), vec!["Ok."]);
    }

    #[test]
    fn test_no_duplicate_dispatch() {
        let mut seg = SentenceSegmenter::new();
        assert_eq!(seg.push("Fair enough. "), vec!["Fair enough."]);
        assert!(seg.push("Fair enough. ").is_empty());
        assert_eq!(seg.flush(), None);
    }

    #[test]
    fn test_flush_skips_dispatched_remainder() {
        let mut seg = SentenceSegmenter::new();
        seg.push("Done. ");
        seg.push("Done.");
        assert_eq!(seg.flush(), None);
    }

    #[test]
    fn test_reset() {
        let mut seg = SentenceSegmenter::new();
        seg.push("Again. partial");
        seg.reset();
        assert_eq!(seg.flush(), None);
        assert_eq!(seg.push("Again. "), vec!["Again."]);
    }
}
