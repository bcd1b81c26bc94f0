//! docqa-embed
//!
//! Sentence embeddings for chunks and queries. `SentenceEmbedder` runs a
//! BERT-family sentence-transformer (all-MiniLM-L6-v2 by default) through
//! candle; `FakeEmbedder` is a hash-based stand-in for tests and offline
//! development, selected with `embedding.provider = "fake"` or
//! `APP_USE_FAKE_EMBEDDINGS=1`.
use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use tokenizers::Tokenizer;

use docqa_core::config::{EmbeddingProvider, EmbeddingSettings};
use docqa_core::traits::Embedder;

mod device;
mod pool;
mod tokenize;

pub use device::select_device;
pub use pool::masked_mean_l2;
pub use tokenize::tokenize_batch;

const DEFAULT_MODEL_DIR: &str = "models/all-MiniLM-L6-v2";

pub struct SentenceEmbedder { model: BertModel, tokenizer: Tokenizer, device: Device, dim: usize, max_len: usize, batch_size: usize, pad_id: u32 }

impl SentenceEmbedder {
    pub fn load(settings: &EmbeddingSettings) -> Result<Self> {
        let device = select_device();
        let model_dir = resolve_model_dir(settings.model_dir.as_deref())?;
        tracing::info!(model_dir = %model_dir.display(), "loading sentence embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let pad_id = tokenizer.token_to_id("[PAD]").unwrap_or(0);

        let config_path = model_dir.join("config.json");
        let config: BertConfig = serde_json::from_str(
            &std::fs::read_to_string(&config_path).with_context(|| format!("reading {}", config_path.display()))?,
        )?;
        if config.hidden_size != settings.dimension {
            return Err(anyhow!("model hidden size {} does not match embedding.dimension {}", config.hidden_size, settings.dimension));
        }

        let weights = load_weights(&model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DTYPE, &device);
        let model = BertModel::load(vb, &config)?;
        tracing::info!(dim = config.hidden_size, "sentence embedding model loaded");
        Ok(Self { model, tokenizer, device, dim: config.hidden_size, max_len: settings.max_len, batch_size: settings.batch_size.max(1), pad_id })
    }

    fn embed_non_blank(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_batch(&self.tokenizer, texts, self.max_len, self.pad_id, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let out: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_vec2()?;
        tracing::debug!(batch = texts.len(), elapsed_ms = start.elapsed().as_millis() as u64, "embedded batch");
        Ok(out)
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        return Ok(candle_core::safetensors::load(&safetensors, device)?);
    }
    let pickle = model_dir.join("pytorch_model.bin");
    if pickle.exists() {
        let weights = candle_core::pickle::read_all(&pickle)?;
        return weights
            .into_iter()
            .map(|(name, t)| Ok((name, t.to_device(device)?)))
            .collect();
    }
    Err(anyhow!("No model.safetensors or pytorch_model.bin in {}", model_dir.display()))
}

impl Embedder for SentenceEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = vec![vec![0f32; self.dim]; texts.len()];
        let pending: Vec<(usize, &str)> = texts.iter().enumerate().filter(|(_, t)| !t.trim().is_empty()).map(|(i, t)| (i, t.as_str())).collect();
        for batch in pending.chunks(self.batch_size) {
            let inputs: Vec<&str> = batch.iter().map(|(_, t)| *t).collect();
            for ((i, _), v) in batch.iter().zip(self.embed_non_blank(&inputs)?) { out[*i] = v; }
        }
        Ok(out)
    }
}

/// Deterministic bag-of-words hashing embedder. Texts sharing words land
/// close together, which is enough to exercise retrieval without a model.
pub struct FakeEmbedder { dim: usize }

impl FakeEmbedder { pub fn new(dim: usize) -> Self { Self { dim } } }

impl FakeEmbedder {
    fn embed_one(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher}; use twox_hash::XxHash64;
        if self.dim == 0 { return Vec::new(); }
        let mut v = vec![0f32; self.dim];
        let tokens = text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()).map(str::to_lowercase);
        for (i, token) in tokens.enumerate() { let mut hasher = XxHash64::with_seed(0); token.hash(&mut hasher); let h = hasher.finish(); let idx = (h as usize) % self.dim; let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32); v[idx] += 0.5 + val + (i as f32 % 3.0) * 0.01; }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 { for x in &mut v { *x /= norm; } }
        v
    }
}

impl Embedder for FakeEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> { Ok(texts.iter().map(|t| self.embed_one(t)).collect()) }
}

pub fn use_fake_embeddings(settings: &EmbeddingSettings) -> bool {
    let forced = std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
    forced || settings.provider == EmbeddingProvider::Fake
}

pub fn get_default_embedder(settings: &EmbeddingSettings) -> docqa_core::Result<Box<dyn Embedder>> {
    if use_fake_embeddings(settings) {
        tracing::info!(dim = settings.dimension, "using FakeEmbedder");
        return Ok(Box::new(FakeEmbedder::new(settings.dimension)));
    }
    let model = SentenceEmbedder::load(settings).map_err(|e| docqa_core::Error::EmbeddingUnavailable(format!("{e:#}")))?;
    Ok(Box::new(model))
}

fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    if let Some(dir) = configured { let p = docqa_core::config::expand_path(dir); if p.exists() { return Ok(p); } tracing::warn!(dir, "configured embedding.model_dir does not exist"); }
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) { let p = PathBuf::from(&dir); if p.exists() { tracing::debug!(var, dir = %p.display(), "model dir from environment"); return Ok(p); } }
    }
    let local = Path::new(DEFAULT_MODEL_DIR); if local.exists() { return Ok(local.to_path_buf()); }
    Err(anyhow!("Could not locate sentence embedding model directory (set embedding.model_dir or APP_MODEL_DIR)"))
}
