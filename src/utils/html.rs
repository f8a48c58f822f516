// src/utils/html.rs

/// Sanitizes user-authored quiz text with ammonia.
///
/// Safe inline markup (like <b>, <p>) survives; scripts, iframes and event
/// handler attributes are stripped, script bodies included.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Sanitizes and trims; used for every authored quiz, question and answer text.
pub fn clean_text(input: &str) -> String {
    clean_html(input.trim())
}
