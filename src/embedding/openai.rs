//! OpenAI-compatible embeddings API provider.
//!
//! Talks to any `/embeddings` endpoint speaking the OpenAI wire format.
//! The API key comes from the `OPENAI_API_KEY` environment variable; base
//! URL, model, and dimensions come from configuration.

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::EmbeddingProvider;
use crate::config::EmbeddingConfig;

/// Environment variable holding the API key.
const API_KEY_ENV: &str = "OPENAI_API_KEY";

pub struct OpenAiEmbeddingProvider {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .with_context(|| format!("{API_KEY_ENV} is not set"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }
}

impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text])?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("embeddings API returned no data"))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let url = format!("{}/embeddings", self.api_base);
        let request = EmbeddingsRequest {
            model: &self.model,
            input: texts.to_vec(),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .with_context(|| format!("embeddings request to {url} failed"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            anyhow::bail!("embeddings API returned {status}: {body}");
        }

        let mut parsed: EmbeddingsResponse = response
            .json()
            .context("failed to parse embeddings response")?;

        anyhow::ensure!(
            parsed.data.len() == texts.len(),
            "embeddings API returned {} vectors for {} inputs",
            parsed.data.len(),
            texts.len()
        );

        // The API is allowed to reorder; index restores input order.
        parsed.data.sort_by_key(|item| item.index);

        let vectors: Vec<Vec<f32>> = parsed.data.into_iter().map(|item| item.embedding).collect();
        for v in &vectors {
            anyhow::ensure!(
                v.len() == self.dimensions,
                "embeddings API returned {} dimensions, expected {}",
                v.len(),
                self.dimensions
            );
        }

        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
