const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "from", "with", "this", "that", "are", "was", "were", "has", "have",
    "had", "not", "but", "you", "your", "our", "all", "any", "can", "will", "per", "via",
    "into", "out", "off", "its", "inc", "llc", "com", "www", "http", "https", "paid", "payment",
];

/// Up to `max` distinct keywords from `text`, in order of first appearance.
///
/// Punctuation is dropped, the rest is lowercased and split on whitespace;
/// stop words and tokens of two characters or fewer are skipped.
pub fn extract_keywords(text: &str, max: usize) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_')
        .collect();

    let mut keywords: Vec<String> = Vec::new();
    for token in cleaned.split_whitespace() {
        if keywords.len() >= max {
            break;
        }
        if token.chars().count() <= 2 || STOP_WORDS.contains(&token) {
            continue;
        }
        if !keywords.iter().any(|k| k == token) {
            keywords.push(token.to_string());
        }
    }
    keywords
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_punctuation_stop_words_and_short_tokens() {
        let kw = extract_keywords("Paid the PG&E bill, on 4/1 for unit #2!", 10);
        assert_eq!(kw, vec!["pge", "bill", "unit"]);
    }

    #[test]
    fn caps_keyword_count() {
        let kw = extract_keywords("alpha bravo charlie delta echo foxtrot", 3);
        assert_eq!(kw, vec!["alpha", "bravo", "charlie"]);
    }

    #[test]
    fn repeated_tokens_counted_once() {
        let kw = extract_keywords("lawn lawn mowing lawn", 10);
        assert_eq!(kw, vec!["lawn", "mowing"]);
    }

    #[test]
    fn empty_text_has_no_keywords() {
        assert!(extract_keywords("", 10).is_empty());
        assert!(extract_keywords("a an of to", 10).is_empty());
    }
}
