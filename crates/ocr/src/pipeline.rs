use std::collections::HashSet;
use std::time::Duration;

use hearth_core::OcrConfig;
use thiserror::Error;

use crate::extract::ReceiptTextExtractor;
use crate::fetch::{FetchError, ReceiptFetcher};
use crate::hash::ReceiptDigest;
use crate::recognizer::{OcrBackend, OcrError};
use crate::types::OcrAnalysisResult;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("OCR recognition failed: {0}")]
    Ocr(#[from] OcrError),
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

/// One successfully analyzed receipt image.
#[derive(Debug, Clone)]
pub struct ReceiptOutcome {
    pub url: String,
    pub digest: ReceiptDigest,
    pub analysis: OcrAnalysisResult,
}

#[derive(Debug, Clone)]
pub struct FailedReceipt {
    pub url: String,
    pub error: String,
}

/// Result of a multi-receipt run. Failures never abort the batch.
#[derive(Debug, Clone, Default)]
pub struct ReceiptBatch {
    pub results: Vec<ReceiptOutcome>,
    pub failed: Vec<FailedReceipt>,
    /// URLs beyond the per-call cap, not processed.
    pub skipped: Vec<String>,
}

impl ReceiptBatch {
    /// Raw OCR text of every analyzed receipt, in input order.
    pub fn combined_text(&self) -> String {
        self.results
            .iter()
            .map(|r| r.analysis.raw_text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// First merchant name found across the receipts.
    pub fn merchant_name(&self) -> Option<&str> {
        self.results
            .iter()
            .find_map(|r| r.analysis.merchant_name.as_deref())
    }

    pub fn analyses(&self) -> impl Iterator<Item = &OcrAnalysisResult> {
        self.results.iter().map(|r| &r.analysis)
    }
}

/// Orchestrates: fetch → dedup by content hash → OCR → extract, for up to
/// `max_receipts` images per call.
pub struct ReceiptPipeline<'d, F: ReceiptFetcher, R: OcrBackend> {
    fetcher: F,
    recognizer: R,
    extractor: ReceiptTextExtractor<'d>,
    config: OcrConfig,
}

impl<F: ReceiptFetcher, R: OcrBackend> ReceiptPipeline<'static, F, R> {
    pub fn new(fetcher: F, recognizer: R, config: OcrConfig) -> Self {
        Self::with_extractor(fetcher, recognizer, ReceiptTextExtractor::default(), config)
    }
}

impl<'d, F: ReceiptFetcher, R: OcrBackend> ReceiptPipeline<'d, F, R> {
    pub fn with_extractor(
        fetcher: F,
        recognizer: R,
        extractor: ReceiptTextExtractor<'d>,
        config: OcrConfig,
    ) -> Self {
        Self { fetcher, recognizer, extractor, config }
    }

    /// Process receipt images sequentially. Each failure is collected into
    /// `failed` and the batch carries on.
    pub async fn process_receipts(&self, urls: &[String]) -> ReceiptBatch {
        let mut batch = ReceiptBatch::default();
        let cap = self.config.max_receipts;
        if urls.len() > cap {
            tracing::warn!(requested = urls.len(), cap, "receipt batch over cap, extra images skipped");
            batch.skipped = urls[cap..].to_vec();
        }

        let mut seen = HashSet::new();
        for url in urls.iter().take(cap) {
            match self.process_one(url).await {
                Ok(outcome) => {
                    if seen.insert(outcome.digest) {
                        batch.results.push(outcome);
                    } else {
                        tracing::debug!(url = %url, "duplicate receipt image ignored");
                    }
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "receipt processing failed");
                    batch.failed.push(FailedReceipt { url: url.clone(), error: e.to_string() });
                }
            }
        }
        batch
    }

    /// Fetch, recognize and analyze a single image.
    pub async fn process_one(&self, url: &str) -> Result<ReceiptOutcome, PipelineError> {
        let timeout = self.config.io_timeout();
        let bytes = tokio::time::timeout(timeout, self.fetcher.fetch(url))
            .await
            .map_err(|_| PipelineError::Timeout(timeout))??;

        let digest = ReceiptDigest::of(&bytes);
        let text = self.recognizer.recognize(&bytes)?;
        let analysis = self.extractor.analyze(&text);

        Ok(ReceiptOutcome { url: url.to_string(), digest, analysis })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::StaticFetcher;
    use crate::recognizer::MockRecognizer;

    /// Treats the image bytes as the recognized text.
    struct EchoRecognizer;

    impl OcrBackend for EchoRecognizer {
        fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError> {
            String::from_utf8(image_bytes.to_vec()).map_err(|e| OcrError::ImageDecode(e.to_string()))
        }
    }

    struct SlowFetcher;

    impl ReceiptFetcher for SlowFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![1])
        }
    }

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn processes_receipts_and_collects_failures() {
        let fetcher = StaticFetcher::new()
            .with_image("a", "PG&E\nAmount Due: $120.50")
            .with_image("b", vec![0xff, 0xfe]);
        let pipeline = ReceiptPipeline::new(fetcher, EchoRecognizer, OcrConfig::default());

        let batch = pipeline.process_receipts(&urls(&["a", "b", "missing"])).await;

        assert_eq!(batch.results.len(), 1);
        assert_eq!(batch.results[0].analysis.amount_cents, Some(12050));
        assert_eq!(batch.failed.len(), 2);
        assert_eq!(batch.failed[0].url, "b");
        assert_eq!(batch.failed[1].url, "missing");
        assert_eq!(batch.merchant_name(), Some("PG&E"));
    }

    #[tokio::test]
    async fn caps_batch_at_three_images() {
        let fetcher = ["1", "2", "3", "4"]
            .iter()
            .fold(StaticFetcher::new(), |f, u| f.with_image(u, format!("Receipt {u}")));
        let pipeline = ReceiptPipeline::new(fetcher, EchoRecognizer, OcrConfig::default());

        let batch = pipeline.process_receipts(&urls(&["1", "2", "3", "4"])).await;

        assert_eq!(batch.results.len(), 3);
        assert_eq!(batch.skipped, vec!["4".to_string()]);
    }

    #[tokio::test]
    async fn duplicate_images_analyzed_once() {
        let fetcher = StaticFetcher::new()
            .with_image("front", "ACE HARDWARE\nTotal $12.00")
            .with_image("copy", "ACE HARDWARE\nTotal $12.00");
        let pipeline = ReceiptPipeline::new(fetcher, EchoRecognizer, OcrConfig::default());

        let batch = pipeline.process_receipts(&urls(&["front", "copy"])).await;

        assert_eq!(batch.results.len(), 1);
        assert!(batch.failed.is_empty());
        assert_eq!(batch.combined_text(), "ACE HARDWARE\nTotal $12.00");
    }

    #[tokio::test]
    async fn mock_recognizer_drives_extraction() {
        let fetcher = StaticFetcher::new().with_image("x", vec![1, 2, 3]);
        let pipeline = ReceiptPipeline::new(
            fetcher,
            MockRecognizer::new("STATE FARM\nPolicy premium\nTotal: $900.00"),
            OcrConfig::default(),
        );
        let outcome = pipeline.process_one("x").await.unwrap();
        assert_eq!(outcome.digest, ReceiptDigest::of(&[1, 2, 3]));
        assert_eq!(outcome.digest.to_string().len(), 64);
        assert!(outcome.analysis.category_hints.contains("insurance"));
    }

    #[tokio::test]
    async fn slow_fetch_times_out() {
        let config = OcrConfig { io_timeout_ms: 50, ..OcrConfig::default() };
        let pipeline = ReceiptPipeline::new(SlowFetcher, EchoRecognizer, config);
        let err = pipeline.process_one("slow").await.unwrap_err();
        assert!(matches!(err, PipelineError::Timeout(_)));
    }
}
