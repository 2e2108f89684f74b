use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use hearth_core::{CategorizationConfig, CategoryKey, Expense, ExpenseFilter, ExpenseStore, PropertyId};

use crate::keywords::extract_keywords;

/// A manually categorized expense, reduced to what learning needs.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingExample {
    pub text: String,
    pub category_id: String,
    pub subcategory_id: Option<String>,
    pub confidence: f32,
}

/// A keyword cluster that reliably maps to one category.
#[derive(Debug, Clone, PartialEq)]
pub struct LearnedPattern {
    pub keywords: Vec<String>,
    pub category: CategoryKey,
    pub confidence: f32,
    /// Number of expenses in the cluster.
    pub support: usize,
}

/// Learned patterns keyed by their keyword string.
pub type PatternMap = BTreeMap<String, LearnedPattern>;

/// Ground-truth examples: auto-suggested categorizations are skipped.
pub fn training_examples(expenses: &[Expense]) -> Vec<TrainingExample> {
    expenses
        .iter()
        .filter(|e| !e.category.is_auto_suggested)
        .map(|e| {
            let mut parts = vec![e.description.as_str()];
            parts.extend(e.receipt_photos.iter().map(String::as_str));
            TrainingExample {
                text: parts.join(" ").to_lowercase(),
                category_id: e.category.category_id.clone(),
                subcategory_id: e.category.subcategory_id.clone(),
                confidence: e.category.confidence.unwrap_or(1.0),
            }
        })
        .collect()
}

/// Group examples by their exact keyword sequence and keep the groups with
/// at least `min_cluster_size` members. A group's category is its most
/// frequent (category, subcategory) pair.
pub fn build_patterns(expenses: &[Expense], config: &CategorizationConfig) -> PatternMap {
    let mut groups: BTreeMap<String, (Vec<String>, Vec<CategoryKey>)> = BTreeMap::new();
    for example in training_examples(expenses) {
        let keywords = extract_keywords(&example.text, config.max_keywords);
        if keywords.is_empty() {
            continue;
        }
        let key = keywords.join(" ");
        let category = CategoryKey {
            category_id: example.category_id,
            subcategory_id: example.subcategory_id,
        };
        groups
            .entry(key)
            .or_insert_with(|| (keywords, Vec::new()))
            .1
            .push(category);
    }

    groups
        .into_iter()
        .filter(|(_, (_, members))| members.len() >= config.min_cluster_size)
        .filter_map(|(key, (keywords, members))| {
            let (category, count) = most_frequent(&members)?;
            let support = members.len();
            let confidence = (count as f32 / support as f32).min(0.9);
            Some((key, LearnedPattern { keywords, category, confidence, support }))
        })
        .collect()
}

/// Most frequent key and its count; ties go to the key seen first.
fn most_frequent(members: &[CategoryKey]) -> Option<(CategoryKey, usize)> {
    let mut counts: Vec<(&CategoryKey, usize)> = Vec::new();
    for member in members {
        match counts.iter_mut().find(|(k, _)| *k == member) {
            Some((_, n)) => *n += 1,
            None => counts.push((member, 1)),
        }
    }
    let mut best: Option<(&CategoryKey, usize)> = None;
    for (key, n) in counts {
        if best.map_or(true, |(_, m)| n > m) {
            best = Some((key, n));
        }
    }
    best.map(|(k, n)| (k.clone(), n))
}

// ── Cache ────────────────────────────────────────────────────────────────────

/// Learned patterns per property. Entries live until invalidated, e.g. when
/// a property's expenses are re-seeded or a categorization is corrected.
#[derive(Debug, Default)]
pub struct PatternCache {
    entries: RwLock<HashMap<PropertyId, Arc<PatternMap>>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, property_id: &PropertyId) -> Option<Arc<PatternMap>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(property_id)
            .cloned()
    }

    pub fn insert(&self, property_id: PropertyId, patterns: Arc<PatternMap>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(property_id, patterns);
    }

    pub fn invalidate(&self, property_id: &PropertyId) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(property_id);
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Learner ──────────────────────────────────────────────────────────────────

pub struct HistoricalPatternLearner<S: ExpenseStore> {
    store: S,
    cache: Arc<PatternCache>,
    config: CategorizationConfig,
}

impl<S: ExpenseStore> HistoricalPatternLearner<S> {
    pub fn new(store: S, cache: Arc<PatternCache>, config: CategorizationConfig) -> Self {
        Self { store, cache, config }
    }

    pub fn cache(&self) -> &PatternCache {
        &self.cache
    }

    /// Learned patterns for `property_id`. A failed or timed-out read is
    /// logged and yields an empty map, which is not cached.
    pub async fn learn(&self, property_id: &PropertyId) -> Arc<PatternMap> {
        if let Some(cached) = self.cache.get(property_id) {
            return cached;
        }

        let filter = ExpenseFilter::for_property(property_id).manual_only();
        let timeout = self.config.io_timeout();
        let expenses = match tokio::time::timeout(timeout, self.store.get_expenses(&filter)).await {
            Ok(Ok(expenses)) => expenses,
            Ok(Err(e)) => {
                tracing::warn!(property = %property_id, error = %e, "historical expenses unavailable");
                return Arc::new(PatternMap::new());
            }
            Err(_) => {
                tracing::warn!(property = %property_id, ?timeout, "historical expense read timed out");
                return Arc::new(PatternMap::new());
            }
        };

        let patterns = Arc::new(build_patterns(&expenses, &self.config));
        tracing::debug!(
            property = %property_id,
            examples = expenses.len(),
            patterns = patterns.len(),
            "learned categorization patterns"
        );
        self.cache.insert(property_id.clone(), Arc::clone(&patterns));
        patterns
    }
}
