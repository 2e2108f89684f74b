pub mod extract;
pub mod fetch;
pub mod hash;
pub mod pipeline;
pub mod recognizer;
pub mod types;

pub use extract::ReceiptTextExtractor;
pub use fetch::{FetchError, HttpFetcher, ReceiptFetcher, StaticFetcher};
pub use hash::ReceiptDigest;
pub use pipeline::{FailedReceipt, PipelineError, ReceiptBatch, ReceiptOutcome, ReceiptPipeline};
pub use recognizer::{MockRecognizer, OcrBackend, OcrError};
pub use types::OcrAnalysisResult;
