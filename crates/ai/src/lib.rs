//! Backends that prefer a remote AI engine and degrade to a deterministic local algorithm.
//!
//! Each backend probes its engine once at construction and records the outcome as a
//! [`Capability`]. Every answer carries an [`AnswerMode`] so callers can tell an engine answer
//! from a heuristic one. Falling back is never an error.

pub mod capability;
pub mod error;
pub mod generation;
pub mod prompts;
pub mod similarity;

pub use capability::{AnswerMode, Capability};
pub use error::{AiError, Result};
pub use generation::{
    AnthropicEngine, CompletionEngine, Generation, GenerationConfig, TextGenerator,
};
pub use prompts::PromptPair;
pub use similarity::{
    keyword_search, EmbeddingConfig, Embedder, HttpEmbedder, SearchHit, SearchResults,
    SimilarityBackend, SimilarityIndex,
};
