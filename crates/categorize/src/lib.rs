pub mod categorizer;
pub mod keywords;
pub mod learner;
pub mod ranker;
pub mod scorer;

pub use categorizer::{CategorizationRequest, Categorizer};
pub use keywords::extract_keywords;
pub use learner::{
    build_patterns, training_examples, HistoricalPatternLearner, LearnedPattern, PatternCache,
    PatternMap, TrainingExample,
};
pub use ranker::rank_suggestions;
pub use scorer::keyword_confidence;
