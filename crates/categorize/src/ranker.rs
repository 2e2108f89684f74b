use hearth_core::{CategoryKey, CategorySuggestion};

/// Keep the most confident suggestion per (category, subcategory), sort by
/// confidence descending and truncate to `cap`.
///
/// Entries are replaced only when a strictly higher confidence shows up;
/// scores from different sources are never combined. Ties keep the order in
/// which pairs were first seen.
pub fn rank_suggestions(suggestions: Vec<CategorySuggestion>, cap: usize) -> Vec<CategorySuggestion> {
    let mut best: Vec<CategorySuggestion> = Vec::with_capacity(suggestions.len());
    for suggestion in suggestions {
        let key: CategoryKey = suggestion.key();
        match best.iter_mut().find(|s| s.matches(&key)) {
            Some(existing) if suggestion.confidence > existing.confidence => *existing = suggestion,
            Some(_) => {}
            None => best.push(suggestion),
        }
    }
    best.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    best.truncate(cap);
    best
}
