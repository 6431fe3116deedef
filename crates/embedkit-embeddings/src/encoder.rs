//! Candle BERT sentence encoder shared by both loaders.
//!
//! Mean-pools the last hidden state over real tokens and normalizes the
//! result to unit length.

use std::sync::Arc;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::cache::ModelPaths;
use crate::error::EmbeddingError;
use crate::loader::{check_dimension, check_finite, LoaderKind};
use crate::model::Embedding;

/// Maximum sequence length
pub const MAX_SEQ_LENGTH: usize = 256;

/// Loaded BERT-family encoder.
pub struct BertEncoder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    hidden_size: usize,
}

impl BertEncoder {
    /// Load from explicit file paths onto `device`.
    pub fn load(paths: &ModelPaths, device: Device) -> Result<Self, EmbeddingError> {
        info!(path = ?paths.weights, device = device_label(&device), "Loading encoder...");

        let config_str = std::fs::read_to_string(&paths.config)?;
        let config: BertConfig = serde_json::from_str(&config_str)
            .map_err(|e| EmbeddingError::ModelNotFound(format!("Invalid config: {}", e)))?;
        let hidden_size = read_hidden_size(&config_str)?;

        let tokenizer = Tokenizer::from_file(&paths.tokenizer)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;

        // SAFETY: the weights file is opened read-only and must not be
        // modified while the model is alive.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[paths.weights.clone()], DType::F32, &device)?
        };

        let model = BertModel::load(vb, &config)?;

        info!(
            dim = hidden_size,
            max_seq = MAX_SEQ_LENGTH,
            "Encoder loaded successfully"
        );

        Ok(Self {
            model,
            tokenizer,
            device,
            hidden_size,
        })
    }

    /// Width of the pooled output.
    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Mean pooling over token embeddings (excluding padding)
    fn mean_pooling(
        &self,
        embeddings: &Tensor,
        attention_mask: &Tensor,
    ) -> Result<Tensor, EmbeddingError> {
        let mask = attention_mask
            .unsqueeze(2)?
            .broadcast_as(embeddings.shape())?;
        let mask_f32 = mask.to_dtype(DType::F32)?;

        let masked = embeddings.broadcast_mul(&mask_f32)?;
        let sum = masked.sum(1)?;

        let mask_sum = mask_f32.sum(1)?;
        let mask_sum = mask_sum.clamp(1e-9, f64::MAX)?;

        let mean = sum.broadcast_div(&mask_sum)?;
        Ok(mean)
    }

    /// Encode a batch of texts. Blocking.
    pub fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        debug!(count = texts.len(), "Embedding batch");

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(MAX_SEQ_LENGTH);

        let mut input_ids: Vec<u32> = Vec::with_capacity(texts.len() * max_len);
        let mut attention_masks: Vec<u32> = Vec::with_capacity(texts.len() * max_len);

        for encoding in &encodings {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();

            let truncated_len = ids.len().min(max_len);
            let mut padded_ids = ids[..truncated_len].to_vec();
            let mut padded_mask = mask[..truncated_len].to_vec();

            padded_ids.resize(max_len, 0);
            padded_mask.resize(max_len, 0);

            input_ids.extend(padded_ids);
            attention_masks.extend(padded_mask);
        }

        let batch_size = texts.len();
        let input_ids = Tensor::from_vec(input_ids, (batch_size, max_len), &self.device)?;
        let attention_mask = Tensor::from_vec(attention_masks, (batch_size, max_len), &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;

        let output = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        let pooled = self.mean_pooling(&output, &attention_mask)?;
        let pooled_vec: Vec<Vec<f32>> = pooled.to_vec2()?;

        let embeddings: Vec<Embedding> = pooled_vec.into_iter().map(Embedding::new).collect();

        debug!(
            count = embeddings.len(),
            dim = self.hidden_size,
            "Batch complete"
        );

        Ok(embeddings)
    }
}

/// An encoder bound to the dimension its descriptor declares.
#[derive(Clone)]
pub(crate) struct LoadedEncoder {
    pub encoder: Arc<BertEncoder>,
    pub dimension: usize,
    pub kind: LoaderKind,
}

impl LoadedEncoder {
    /// Wrap `encoder`, failing if its width differs from `dimension`.
    pub fn new(
        encoder: BertEncoder,
        dimension: usize,
        kind: LoaderKind,
    ) -> Result<Self, EmbeddingError> {
        if encoder.hidden_size() != dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: dimension,
                actual: encoder.hidden_size(),
            });
        }
        Ok(Self {
            encoder: Arc::new(encoder),
            dimension,
            kind,
        })
    }

    /// Run inference on a blocking thread and verify output lengths and values.
    pub async fn embed(&self, texts: Vec<String>) -> Result<Vec<Embedding>, EmbeddingError> {
        let encoder = self.encoder.clone();
        let embeddings = tokio::task::spawn_blocking(move || {
            let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
            encoder.embed_batch(&refs)
        })
        .await
        .map_err(|e| EmbeddingError::Task(e.to_string()))??;

        for embedding in &embeddings {
            check_dimension(self.dimension, embedding)?;
            check_finite(self.kind, embedding)?;
        }
        Ok(embeddings)
    }
}

/// Short label for logs.
pub fn device_label(device: &Device) -> &'static str {
    if device.is_cuda() {
        "cuda"
    } else if device.is_metal() {
        "metal"
    } else {
        "cpu"
    }
}

fn read_hidden_size(config_json: &str) -> Result<usize, EmbeddingError> {
    let value: serde_json::Value = serde_json::from_str(config_json)
        .map_err(|e| EmbeddingError::ModelNotFound(format!("Invalid config: {}", e)))?;
    value
        .get("hidden_size")
        .and_then(serde_json::Value::as_u64)
        .map(|v| v as usize)
        .ok_or_else(|| EmbeddingError::ModelNotFound("config.json has no hidden_size".into()))
}
