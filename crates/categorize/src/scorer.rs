/// Confidence that `keyword` identifies the category of `text`, in [0.1, 0.95].
///
/// `text` is the full lowercased input the keyword was found in. Longer
/// keywords score higher, a keyword leading the text gets +0.1, and inputs
/// over 100 characters are scaled by 0.8.
pub fn keyword_confidence(keyword: &str, text: &str) -> f32 {
    let keyword_len = keyword.chars().count() as f32;
    let mut confidence = (keyword_len / 20.0).min(0.9);

    if text == keyword {
        confidence = 0.95;
    }
    if text.starts_with(keyword) {
        confidence += 0.1;
    }
    if text.chars().count() > 100 {
        confidence *= 0.8;
    }

    confidence.clamp(0.1, 0.95)
}
