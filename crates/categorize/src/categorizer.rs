use std::sync::Arc;

use chrono::Utc;
use hearth_core::{
    CategorizationConfig, CategorizationFeedback, CategoryKey, CategorySuggestion, ExpenseStore,
    FeedbackSignal, FeedbackSink, PatternDictionary, PropertyId, SuggestionReason,
};
use hearth_ocr::{OcrAnalysisResult, OcrBackend, ReceiptBatch, ReceiptFetcher, ReceiptPipeline};

use crate::keywords::extract_keywords;
use crate::learner::{HistoricalPatternLearner, PatternCache, PatternMap};
use crate::ranker::rank_suggestions;
use crate::scorer::keyword_confidence;

/// Free text describing one expense to categorize.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorizationRequest {
    pub property_id: PropertyId,
    pub merchant_name: Option<String>,
    pub description: String,
    pub receipt_text: Option<String>,
}

impl CategorizationRequest {
    pub fn new(property_id: &PropertyId, description: &str) -> Self {
        Self {
            property_id: property_id.clone(),
            merchant_name: None,
            description: description.to_string(),
            receipt_text: None,
        }
    }

    pub fn with_merchant(mut self, merchant_name: &str) -> Self {
        self.merchant_name = Some(merchant_name.to_string());
        self
    }

    pub fn with_receipt_text(mut self, receipt_text: &str) -> Self {
        self.receipt_text = Some(receipt_text.to_string());
        self
    }

    /// Merchant, description and receipt text joined and lowercased.
    pub fn combined_text(&self) -> String {
        [
            self.merchant_name.as_deref(),
            Some(self.description.as_str()),
            self.receipt_text.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
    }
}

/// Suggests categories for expenses from the keyword dictionary, patterns
/// learned from the property's history, and receipt OCR hints.
pub struct Categorizer<'d, S: ExpenseStore, K: FeedbackSink> {
    dictionary: &'d PatternDictionary,
    learner: HistoricalPatternLearner<S>,
    feedback: K,
    config: CategorizationConfig,
}

impl<S: ExpenseStore, K: FeedbackSink> Categorizer<'static, S, K> {
    /// Categorizer over the built-in dictionary with a private pattern cache.
    pub fn new(store: S, feedback: K, config: CategorizationConfig) -> Self {
        Self::with_dictionary(
            PatternDictionary::builtin(),
            store,
            feedback,
            Arc::new(PatternCache::new()),
            config,
        )
    }
}

impl<'d, S: ExpenseStore, K: FeedbackSink> Categorizer<'d, S, K> {
    pub fn with_dictionary(
        dictionary: &'d PatternDictionary,
        store: S,
        feedback: K,
        cache: Arc<PatternCache>,
        config: CategorizationConfig,
    ) -> Self {
        let learner = HistoricalPatternLearner::new(store, cache, config.clone());
        Self { dictionary, learner, feedback, config }
    }

    pub fn cache(&self) -> &PatternCache {
        self.learner.cache()
    }

    /// Ranked suggestions for `request`, at most `max_suggestions` of them.
    /// History that cannot be read only removes the learned suggestions.
    pub async fn suggest(&self, request: &CategorizationRequest) -> Vec<CategorySuggestion> {
        self.suggest_with_hints(request, std::iter::empty()).await
    }

    /// Run the receipt images through `pipeline` first, then categorize with
    /// the recognized text, merchant name and category hints folded in.
    pub async fn suggest_with_receipts<F, R>(
        &self,
        request: &CategorizationRequest,
        pipeline: &ReceiptPipeline<'_, F, R>,
        receipt_urls: &[String],
    ) -> (Vec<CategorySuggestion>, ReceiptBatch)
    where
        F: ReceiptFetcher,
        R: OcrBackend,
    {
        let batch = pipeline.process_receipts(receipt_urls).await;

        let mut enriched = request.clone();
        if enriched.merchant_name.is_none() {
            enriched.merchant_name = batch.merchant_name().map(str::to_string);
        }
        let ocr_text = batch.combined_text();
        if !ocr_text.is_empty() {
            enriched.receipt_text = Some(match enriched.receipt_text.take() {
                Some(existing) => format!("{existing}\n{ocr_text}"),
                None => ocr_text,
            });
        }

        let suggestions = self.suggest_with_hints(&enriched, batch.analyses()).await;
        (suggestions, batch)
    }

    async fn suggest_with_hints<'a>(
        &self,
        request: &CategorizationRequest,
        analyses: impl Iterator<Item = &'a OcrAnalysisResult>,
    ) -> Vec<CategorySuggestion> {
        let text = request.combined_text();
        let mut suggestions = self.pattern_suggestions(&text);
        suggestions.extend(self.ocr_hint_suggestions(analyses));

        let patterns = self.learner.learn(&request.property_id).await;
        let input_keywords = extract_keywords(&text, self.config.max_keywords);
        suggestions.extend(self.historical_suggestions(&patterns, &input_keywords));

        let ranked = rank_suggestions(suggestions, self.config.max_suggestions);
        tracing::debug!(
            property = %request.property_id,
            suggestions = ranked.len(),
            top = ?ranked.first().map(CategorySuggestion::key),
            "categorized expense"
        );
        ranked
    }

    /// Dictionary suggestions for lowercased `text`, ranked and capped at
    /// `max_pattern_suggestions`. Keyword hits carry reason `merchant`,
    /// receipt regex hits reason `ocr`.
    pub fn pattern_suggestions(&self, text: &str) -> Vec<CategorySuggestion> {
        let keyword_hits = self.dictionary.keyword_matches(text).into_iter().map(|m| {
            CategorySuggestion::new(
                m.category_id,
                m.subcategory_id,
                keyword_confidence(m.keyword, text),
                SuggestionReason::Merchant,
            )
            .with_terms([m.keyword])
        });
        let regex_hits = self.dictionary.regex_hints(text).into_iter().map(|h| {
            CategorySuggestion::new(
                h.category_id,
                None,
                keyword_confidence(&h.matched, text),
                SuggestionReason::Ocr,
            )
            .with_terms([h.matched])
        });
        rank_suggestions(keyword_hits.chain(regex_hits).collect(), self.config.max_pattern_suggestions)
    }

    /// One suggestion per learned pattern sharing at least one keyword with
    /// the input.
    pub fn historical_suggestions(
        &self,
        patterns: &PatternMap,
        input_keywords: &[String],
    ) -> Vec<CategorySuggestion> {
        if input_keywords.is_empty() {
            return Vec::new();
        }
        patterns
            .values()
            .filter_map(|pattern| {
                let shared: Vec<&String> =
                    pattern.keywords.iter().filter(|k| input_keywords.contains(k)).collect();
                if shared.is_empty() {
                    return None;
                }
                let ratio = shared.len() as f32 / input_keywords.len() as f32;
                let confidence =
                    (ratio * pattern.confidence).min(self.config.historical_confidence_cap);
                Some(
                    CategorySuggestion::new(
                        &pattern.category.category_id,
                        pattern.category.subcategory_id.as_deref(),
                        confidence,
                        SuggestionReason::Pattern,
                    )
                    .with_terms(shared.into_iter().cloned()),
                )
            })
            .collect()
    }

    fn ocr_hint_suggestions<'a>(
        &self,
        analyses: impl Iterator<Item = &'a OcrAnalysisResult>,
    ) -> Vec<CategorySuggestion> {
        analyses
            .flat_map(|analysis| {
                let confidence = analysis.confidence.min(self.config.ocr_hint_confidence_cap);
                analysis.category_hints.iter().map(move |hint| {
                    CategorySuggestion::new(hint, None, confidence, SuggestionReason::Ocr)
                })
            })
            .collect()
    }

    /// Compare the top suggestion with what the user chose and record the
    /// signal. Recording is best-effort: a failing or slow sink is logged and
    /// the signal is still returned. The property's learned patterns are
    /// dropped so the next call relearns from the corrected history.
    pub async fn record_feedback(
        &self,
        original: &[CategorySuggestion],
        chosen: &CategoryKey,
        text: &str,
        property_id: &PropertyId,
    ) -> FeedbackSignal {
        let top = original.first();
        let signal = match top {
            None => FeedbackSignal::NoSuggestion,
            Some(s) if s.matches(chosen) => FeedbackSignal::Accepted,
            Some(_) => FeedbackSignal::Rejected,
        };

        let feedback = CategorizationFeedback {
            property_id: property_id.clone(),
            text: text.to_string(),
            top_suggestion: top.map(CategorySuggestion::key),
            top_confidence: top.map(|s| s.confidence),
            chosen: chosen.clone(),
            signal,
            recorded_at: Utc::now(),
        };

        let timeout = self.config.io_timeout();
        match tokio::time::timeout(timeout, self.feedback.record_feedback(&feedback)).await {
            Ok(Ok(())) => {
                tracing::info!(property = %property_id, %signal, chosen = %chosen, "categorization feedback recorded")
            }
            Ok(Err(e)) => {
                tracing::warn!(property = %property_id, error = %e, "failed to record categorization feedback")
            }
            Err(_) => {
                tracing::warn!(property = %property_id, ?timeout, "categorization feedback timed out")
            }
        }

        self.learner.cache().invalidate(property_id);
        signal
    }
}
