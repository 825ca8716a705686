// Description sanitisation and user prompt construction

/// Number of songs requested from the model.
pub const PLAYLIST_SIZE: usize = 12;

/// Longest description forwarded to the model, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 1000;

/// Trim, cap at `MAX_DESCRIPTION_CHARS` characters, then strip markup tags.
pub fn sanitize_description(description: &str) -> String {
    let truncated: String = description.trim().chars().take(MAX_DESCRIPTION_CHARS).collect();
    strip_tags(&truncated)
}

/// Remove anything that looks like an HTML/XML tag. An unterminated `<` drops
/// the rest of the input, matching how browsers treat a broken tag.
pub fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;

    for ch in input.chars() {
        match (in_tag, ch) {
            (false, '<') => in_tag = true,
            (false, c) => out.push(c),
            (true, '>') => in_tag = false,
            (true, _) => {}
        }
    }

    out
}

/// User turn for the curator prompt. The description must already be sanitized.
pub fn build_user_prompt(description: &str) -> String {
    format!(
        "The user has provided the following description of their current vibes:\n\n\
         <user_vibes>\n  {description}\n</user_vibes>\n\n\
         Carefully analyze the user's description, paying attention to:\n\
         - Emotional states (e.g., happy, melancholic, energetic)\n\
         - Atmosphere or setting (e.g., rainy day, beach party, quiet night)\n\
         - Activities or contexts (e.g., workout, studying, road trip)\n\
         - Any specific genre preferences or musical elements mentioned\n\n\
         Based on your analysis, generate a playlist of {PLAYLIST_SIZE} songs that best match the user's vibes."
    )
}
