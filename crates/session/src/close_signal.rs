/// Phrases the model uses when it is ready to wrap up the conversation.
pub const CLOSE_SIGNAL_PHRASES: &[&str] = &[
    "let me synthesize",
    "give me a moment to synthesize",
    "i have what i need",
    "let me pull together",
    "let me reflect on everything",
];

/// Case-insensitive substring match against [`CLOSE_SIGNAL_PHRASES`].
pub fn contains_close_signal(text: &str) -> bool {
    let lower = text.to_lowercase();
    CLOSE_SIGNAL_PHRASES
        .iter()
        .any(|phrase| lower.contains(phrase))
}
