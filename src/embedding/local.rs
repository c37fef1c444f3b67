//! On-device embeddings through ONNX Runtime.
//!
//! Runs the all-MiniLM-L6-v2 sentence transformer: tokenize, forward pass,
//! attention-masked mean pooling, unit-length output. Model and tokenizer
//! files live under the configured cache dir and are fetched by
//! `tome model download`.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;

use super::EmbeddingProvider;
use crate::config::EmbeddingConfig;

/// Output width of all-MiniLM-L6-v2.
pub const LOCAL_EMBEDDING_DIM: usize = 384;

/// The model was trained with 256-token sequences; longer inputs truncate.
const MAX_TOKENS: usize = 256;

pub struct LocalEmbeddingProvider {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
}

// Safety: Tokenizer is Send+Sync; the Session only runs under the Mutex.
unsafe impl Send for LocalEmbeddingProvider {}
unsafe impl Sync for LocalEmbeddingProvider {}

impl LocalEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let dir = crate::config::expand_tilde(&config.cache_dir);
        let model_path = dir.join("model.onnx");
        let tokenizer_path = dir.join("tokenizer.json");
        for path in [&model_path, &tokenizer_path] {
            anyhow::ensure!(
                path.exists(),
                "{} is missing. Run `tome model download` first.",
                path.display()
            );
        }

        let session = Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
            .map_err(ort::Error::<()>::from)?
            .with_intra_threads(4)
            .map_err(ort::Error::<()>::from)?
            .commit_from_file(&model_path)
            .map_err(ort::Error::<()>::from)
            .context("failed to load ONNX model")?;
        let tokenizer = build_tokenizer(&tokenizer_path)?;

        tracing::info!(dir = %dir.display(), "local embedding model ready");

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
        })
    }
}

fn build_tokenizer(path: &Path) -> Result<Tokenizer> {
    let mut tokenizer = Tokenizer::from_file(path)
        .map_err(|e| anyhow::anyhow!("failed to load tokenizer: {e}"))?;
    tokenizer
        .with_truncation(Some(tokenizers::TruncationParams {
            max_length: MAX_TOKENS,
            ..Default::default()
        }))
        .map_err(|e| anyhow::anyhow!("failed to set truncation: {e}"))?;
    tokenizer.with_padding(Some(tokenizers::PaddingParams {
        strategy: tokenizers::PaddingStrategy::BatchLongest,
        ..Default::default()
    }));
    Ok(tokenizer)
}

impl EmbeddingProvider for LocalEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut batch = self.embed_batch(&[text])?;
        batch
            .pop()
            .ok_or_else(|| anyhow::anyhow!("inference returned no rows"))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("tokenization failed: {e}"))?;
        let rows = encodings.len();
        let cols = encodings[0].get_ids().len();

        let mut ids = Vec::with_capacity(rows * cols);
        let mut mask = Vec::with_capacity(rows * cols);
        for encoding in &encodings {
            ids.extend(encoding.get_ids().iter().map(|&t| t as i64));
            mask.extend(encoding.get_attention_mask().iter().map(|&m| m as i64));
        }

        let shape = vec![rows as i64, cols as i64];
        let input_ids = Tensor::from_array((shape.clone(), ids.into_boxed_slice()))?;
        let attention_mask =
            Tensor::from_array((shape.clone(), mask.clone().into_boxed_slice()))?;
        // Single-sentence inputs: segment ids are all zero.
        let token_type_ids =
            Tensor::from_array((shape, vec![0i64; rows * cols].into_boxed_slice()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("session lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs! {
            "input_ids" => input_ids,
            "attention_mask" => attention_mask,
            "token_type_ids" => token_type_ids,
        })?;

        // Output naming differs between ONNX exports of this model.
        let hidden = outputs
            .get("token_embeddings")
            .or_else(|| outputs.get("last_hidden_state"))
            .unwrap_or_else(|| &outputs[0]);
        let (out_shape, data) = hidden
            .try_extract_tensor::<f32>()
            .context("failed to extract hidden-state tensor")?;
        let dims: &[i64] = &out_shape;
        anyhow::ensure!(
            dims == [rows as i64, cols as i64, LOCAL_EMBEDDING_DIM as i64],
            "unexpected hidden-state shape {dims:?}, expected [{rows}, {cols}, {LOCAL_EMBEDDING_DIM}]"
        );

        let mut out = Vec::with_capacity(rows);
        for (row, mask_row) in mask.chunks(cols).enumerate() {
            out.push(pool_row(data, row, cols, mask_row));
        }
        Ok(out)
    }

    fn dimensions(&self) -> usize {
        LOCAL_EMBEDDING_DIM
    }
}

/// Mean-pool one sequence over its unmasked tokens, then scale to unit length.
fn pool_row(data: &[f32], row: usize, cols: usize, mask_row: &[i64]) -> Vec<f32> {
    let mut pooled = vec![0.0f32; LOCAL_EMBEDDING_DIM];
    let mut kept = 0usize;
    for (token, &m) in mask_row.iter().enumerate() {
        if m == 0 {
            continue;
        }
        let start = (row * cols + token) * LOCAL_EMBEDDING_DIM;
        for (acc, &v) in pooled.iter_mut().zip(&data[start..start + LOCAL_EMBEDDING_DIM]) {
            *acc += v;
        }
        kept += 1;
    }
    if kept > 0 {
        let inv = 1.0 / kept as f32;
        for v in &mut pooled {
            *v *= inv;
        }
    }
    normalize_in_place(&mut pooled);
    pooled
}

fn normalize_in_place(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
