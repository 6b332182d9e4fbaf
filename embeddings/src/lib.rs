//! # Embeddings
//!
//! This crate provides embedding generation and vector similarity for the
//! CADRAG command retrieval engine.
//!
//! The [`EmbeddingProvider`] trait is the engine's only network-facing
//! capability: everything else in the core is local computation. The
//! default implementation talks to an Ollama server; tests substitute
//! deterministic in-process providers.

pub mod error;
pub mod provider;
pub mod similarity;

pub use error::{EmbeddingError, Result};
pub use provider::{EmbeddingProvider, OllamaProvider};
pub use similarity::cosine_similarity;

/// A dense vector embedding.
pub type Embedding = Vec<f32>;
