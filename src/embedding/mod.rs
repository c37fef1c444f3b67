//! Text-to-vector embedding pipeline.
//!
//! Provides the [`EmbeddingProvider`] trait with two implementations: a
//! remote OpenAI-compatible API client and a local ONNX model
//! (all-MiniLM-L6-v2, 384 dimensions). The provider is created via
//! [`create_provider`] from configuration.

pub mod local;
pub mod openai;

use anyhow::Result;

/// Trait for embedding text into vectors.
///
/// Implementations produce vectors of a fixed dimension reported by
/// [`EmbeddingProvider::dimensions`]. All methods are synchronous — callers
/// in async contexts should use `tokio::task::spawn_blocking`.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of text strings. Implementations may override for batched inference.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Return the number of dimensions this provider produces.
    fn dimensions(&self) -> usize;
}

/// The canonical text composed from a document for embedding. Every code
/// path that embeds a document must use this, so stored vectors stay
/// comparable across upsert, backfill, and re-import.
pub fn document_embedding_text(title: &str, tags: &[String], content: &str) -> String {
    format!("Title: {title}\nTags: {}\nContent: {content}", tags.join(", "))
}

/// Create an embedding provider from config.
///
/// `"openai"` talks to an OpenAI-compatible embeddings endpoint;
/// `"local"` runs ONNX inference and requires model files — run
/// `tome model download` first.
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "openai" => {
            let provider = openai::OpenAiEmbeddingProvider::new(config)?;
            Ok(Box::new(provider))
        }
        "local" => {
            let provider = local::LocalEmbeddingProvider::new(config)?;
            Ok(Box::new(provider))
        }
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: openai, local"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_text_is_deterministic() {
        let tags = vec!["rust".to_string(), "sqlite".to_string()];
        let a = document_embedding_text("My title", &tags, "Body text");
        let b = document_embedding_text("My title", &tags, "Body text");
        assert_eq!(a, b);
        assert_eq!(a, "Title: My title\nTags: rust, sqlite\nContent: Body text");
    }

    #[test]
    fn embedding_text_with_no_tags() {
        let text = document_embedding_text("T", &[], "C");
        assert_eq!(text, "Title: T\nTags: \nContent: C");
    }
}
