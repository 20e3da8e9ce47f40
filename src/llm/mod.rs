pub mod classifier;
pub mod client;
pub mod matcher;
pub mod retry;

pub use classifier::Classifier;
pub use client::{HttpInference, Inference};
pub use matcher::SimilarityMatcher;
pub use retry::RetryPolicy;
