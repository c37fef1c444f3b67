pub mod embed;
pub mod export;
pub mod import;
pub mod search;
pub mod stats;

use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::AsyncWriteExt;

const MODEL_URL: &str =
    "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/onnx/model.onnx";
const TOKENIZER_URL: &str =
    "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/tokenizer.json";

/// Fetch the ONNX embedding model and tokenizer into the cache directory.
pub async fn model_download(config: &tome::config::EmbeddingConfig) -> Result<()> {
    let cache_dir = tome::config::expand_tilde(&config.cache_dir);
    std::fs::create_dir_all(&cache_dir)
        .with_context(|| format!("failed to create cache dir: {}", cache_dir.display()))?;

    let downloads = [
        ("model.onnx (~90MB)", MODEL_URL, cache_dir.join("model.onnx")),
        ("tokenizer.json", TOKENIZER_URL, cache_dir.join("tokenizer.json")),
    ];
    for (label, url, dest) in downloads {
        if dest.exists() {
            println!("{label} already present at {}", dest.display());
            continue;
        }
        println!("Downloading {label}...");
        download_file(url, &dest).await?;
        println!("Saved to {}", dest.display());
    }

    println!("Local embedding model ready.");
    Ok(())
}

/// Streaming download with a progress bar. The file lands under a `.tmp`
/// name first so an interrupted download never leaves a partial model.
async fn download_file(url: &str, dest: &Path) -> Result<()> {
    let mut response = reqwest::get(url)
        .await
        .with_context(|| format!("HTTP request failed for {url}"))?
        .error_for_status()
        .with_context(|| format!("download failed for {url}"))?;

    let pb = match response.content_length() {
        Some(total) => {
            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("  {bar:40} {bytes}/{total_bytes} ({eta})")
                    .expect("valid template"),
            );
            pb
        }
        None => ProgressBar::new_spinner(),
    };

    let tmp = dest.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp)
        .await
        .with_context(|| format!("failed to create {}", tmp.display()))?;
    while let Some(chunk) = response.chunk().await.context("error reading response")? {
        file.write_all(&chunk).await.context("error writing file")?;
        pb.inc(chunk.len() as u64);
    }
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp, dest)
        .await
        .context("failed to move downloaded file into place")?;
    pb.finish_and_clear();
    Ok(())
}
