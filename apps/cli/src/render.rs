use std::io::Write;

use reflect_session::{SessionNotice, VoiceStatus};
use reflect_transcript::{ConversationTurn, Role};
use tokio::sync::mpsc;

/// Prints session notices as a running conversation.
///
/// Streaming model turns are printed incrementally; `printed` tracks how much
/// of the current turn is already on screen.
#[derive(Default)]
pub struct Renderer {
    printed: usize,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render until the session completes or the channel closes.
    ///
    /// Returns the final transcript if the session completed.
    pub async fn run(
        mut self,
        mut notices: mpsc::UnboundedReceiver<SessionNotice>,
    ) -> Option<Vec<ConversationTurn>> {
        while let Some(notice) = notices.recv().await {
            if let SessionNotice::Completed(turns) = notice {
                println!();
                return Some(turns);
            }
            let out = self.render(&notice);
            if !out.is_empty() {
                print!("{out}");
                let _ = std::io::stdout().flush();
            }
        }
        None
    }

    /// Text to print for one notice. Empty when there is nothing to show.
    pub fn render(&mut self, notice: &SessionNotice) -> String {
        match notice {
            SessionNotice::TurnAppended { turn, .. } => {
                self.printed = turn.text.len();
                match turn.role {
                    Role::User => String::new(),
                    Role::Model if turn.is_streaming => {
                        format!("\n{}: {}", turn.role.display_label(), turn.text)
                    }
                    Role::Model => format!("\n{}: {}\n", turn.role.display_label(), turn.text),
                }
            }
            SessionNotice::TurnUpdated {
                text, is_streaming, ..
            } => {
                let delta = text.get(self.printed..).unwrap_or_default().to_string();
                self.printed = text.len();
                if *is_streaming {
                    delta
                } else {
                    format!("{delta}\n")
                }
            }
            SessionNotice::TurnRemoved { .. } => {
                self.printed = 0;
                "\n(no reply, try again)\n".to_string()
            }
            SessionNotice::StatusChanged(VoiceStatus::Listening) => "[listening]\n".to_string(),
            SessionNotice::VoiceModeChanged(on) => {
                format!("[voice mode {}]\n", if *on { "on" } else { "off" })
            }
            SessionNotice::Banner(Some(message)) => format!("! {message}\n"),
            SessionNotice::Transitioning => "\n[preparing your reflection...]\n".to_string(),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streaming_turn_prints_deltas() {
        let mut renderer = Renderer::new();
        let opened = renderer.render(&SessionNotice::TurnAppended {
            index: 2,
            turn: ConversationTurn::streaming_model(),
        });
        assert_eq!(opened, "\nReflect: ");

        let first = renderer.render(&SessionNotice::TurnUpdated {
            index: 2,
            text: "Tell me ".into(),
            is_streaming: true,
        });
        let last = renderer.render(&SessionNotice::TurnUpdated {
            index: 2,
            text: "Tell me more.".into(),
            is_streaming: false,
        });
        assert_eq!(first, "Tell me ");
        assert_eq!(last, "more.\n");
    }

    #[test]
    fn test_user_turns_are_not_echoed() {
        let mut renderer = Renderer::new();
        let out = renderer.render(&SessionNotice::TurnAppended {
            index: 1,
            turn: ConversationTurn::user("hello"),
        });
        assert!(out.is_empty());
    }

    #[test]
    fn test_banner() {
        let mut renderer = Renderer::new();
        assert_eq!(
            renderer.render(&SessionNotice::Banner(Some("oops".into()))),
            "! oops\n"
        );
        assert!(renderer.render(&SessionNotice::Banner(None)).is_empty());
    }
}
