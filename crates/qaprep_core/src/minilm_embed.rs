//! Local sentence encoder: all-MiniLM-L6-v2 (BERT encoder, post-norm),
//! safetensors weights, mean pooling over tokens, L2-normalised output.

use anyhow::{bail, Result};
use candle_core::{DType, Device, Module, Tensor, D};
use candle_nn::{LayerNorm, LayerNormConfig, Linear, VarBuilder};
use std::path::Path;

use crate::embed::EmbeddingProvider;

struct EncoderConfig {
    hidden_size: usize,
    intermediate_size: usize,
    num_heads: usize,
    num_layers: usize,
    vocab_size: usize,
    max_positions: usize,
    type_vocab_size: usize,
    layer_norm_eps: f64,
}

const MINILM_L6_V2: EncoderConfig = EncoderConfig {
    hidden_size: 384,
    intermediate_size: 1536,
    num_heads: 12,
    num_layers: 6,
    vocab_size: 30522,
    max_positions: 512,
    type_vocab_size: 2,
    layer_norm_eps: 1e-12,
};

fn load_norm(vb: VarBuilder, size: usize, eps: f64) -> Result<LayerNorm> {
    let config = LayerNormConfig {
        eps,
        ..Default::default()
    };
    candle_nn::layer_norm(size, config, vb).map_err(Into::into)
}

struct Attention {
    query: Linear,
    key: Linear,
    value: Linear,
    dense: Linear,
    norm: LayerNorm,
    num_heads: usize,
    head_dim: usize,
}

impl Attention {
    fn load(vb: VarBuilder, config: &EncoderConfig) -> Result<Self> {
        let h = config.hidden_size;
        let self_vb = vb.pp("self");
        let out_vb = vb.pp("output");

        Ok(Self {
            query: candle_nn::linear(h, h, self_vb.pp("query"))?,
            key: candle_nn::linear(h, h, self_vb.pp("key"))?,
            value: candle_nn::linear(h, h, self_vb.pp("value"))?,
            dense: candle_nn::linear(h, h, out_vb.pp("dense"))?,
            norm: load_norm(out_vb.pp("LayerNorm"), h, config.layer_norm_eps)?,
            num_heads: config.num_heads,
            head_dim: h / config.num_heads,
        })
    }

    fn split_heads(&self, proj: &Linear, x: &Tensor) -> Result<Tensor> {
        let (batch, seq_len, _) = x.dims3()?;
        proj.forward(x)?
            .reshape((batch, seq_len, self.num_heads, self.head_dim))?
            .transpose(1, 2)
            .map_err(Into::into)
    }

    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let (batch, seq_len, _) = x.dims3()?;

        let q = self.split_heads(&self.query, x)?;
        let k = self.split_heads(&self.key, x)?;
        let v = self.split_heads(&self.value, x)?;

        let scale = 1.0 / (self.head_dim as f64).sqrt();
        let scores = q.matmul(&k.t()?)?.affine(scale, 0.0)?;
        let weights = candle_nn::ops::softmax(&scores, D::Minus1)?;
        let context = weights.matmul(&v)?.transpose(1, 2)?.contiguous()?.reshape((
            batch,
            seq_len,
            self.num_heads * self.head_dim,
        ))?;

        // Residual + post-norm, BERT-style.
        let out = (x + self.dense.forward(&context)?)?;
        self.norm.forward(&out).map_err(Into::into)
    }
}

struct FeedForward {
    up: Linear,
    down: Linear,
    norm: LayerNorm,
}

impl FeedForward {
    fn load(vb: VarBuilder, config: &EncoderConfig) -> Result<Self> {
        Ok(Self {
            up: candle_nn::linear(
                config.hidden_size,
                config.intermediate_size,
                vb.pp("intermediate").pp("dense"),
            )?,
            down: candle_nn::linear(
                config.intermediate_size,
                config.hidden_size,
                vb.pp("output").pp("dense"),
            )?,
            norm: load_norm(
                vb.pp("output").pp("LayerNorm"),
                config.hidden_size,
                config.layer_norm_eps,
            )?,
        })
    }

    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let h = self.down.forward(&self.up.forward(x)?.gelu_erf()?)?;
        let out = (x + h)?;
        self.norm.forward(&out).map_err(Into::into)
    }
}

struct EncoderLayer {
    attention: Attention,
    ffn: FeedForward,
}

impl EncoderLayer {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        self.ffn.forward(&self.attention.forward(x)?)
    }
}

struct SentenceEncoder {
    word_embeddings: Tensor,
    position_embeddings: Tensor,
    token_type_embeddings: Tensor,
    embedding_norm: LayerNorm,
    layers: Vec<EncoderLayer>,
    config: EncoderConfig,
}

impl SentenceEncoder {
    fn load(path: &Path, device: &Device) -> Result<Self> {
        let config = MINILM_L6_V2;
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[path], DType::F32, device)? };

        let emb_vb = vb.pp("embeddings");
        let word_embeddings = emb_vb
            .pp("word_embeddings")
            .get((config.vocab_size, config.hidden_size), "weight")?;
        let position_embeddings = emb_vb
            .pp("position_embeddings")
            .get((config.max_positions, config.hidden_size), "weight")?;
        let token_type_embeddings = emb_vb
            .pp("token_type_embeddings")
            .get((config.type_vocab_size, config.hidden_size), "weight")?;
        let embedding_norm = load_norm(
            emb_vb.pp("LayerNorm"),
            config.hidden_size,
            config.layer_norm_eps,
        )?;

        let mut layers = Vec::with_capacity(config.num_layers);
        for i in 0..config.num_layers {
            let layer_vb = vb.pp("encoder").pp("layer").pp(i.to_string());
            layers.push(EncoderLayer {
                attention: Attention::load(layer_vb.pp("attention"), &config)?,
                ffn: FeedForward::load(layer_vb, &config)?,
            });
        }

        Ok(Self {
            word_embeddings,
            position_embeddings,
            token_type_embeddings,
            embedding_norm,
            layers,
            config,
        })
    }

    fn forward(&self, token_ids: &[u32]) -> Result<Vec<f32>> {
        let device = self.word_embeddings.device();
        let seq_len = token_ids.len();

        if seq_len == 0 {
            bail!("cannot embed an empty token sequence");
        }
        if seq_len > self.config.max_positions {
            bail!(
                "input length {seq_len} exceeds max {}",
                self.config.max_positions
            );
        }

        let ids = Tensor::new(token_ids, device)?;
        let word_emb = self.word_embeddings.index_select(&ids, 0)?;

        let position_ids: Vec<u32> = (0..seq_len as u32).collect();
        let position_ids = Tensor::new(position_ids.as_slice(), device)?;
        let pos_emb = self.position_embeddings.index_select(&position_ids, 0)?;

        let token_type_ids = Tensor::zeros(seq_len, DType::U32, device)?;
        let type_emb = self.token_type_embeddings.index_select(&token_type_ids, 0)?;

        let mut hidden = ((word_emb + pos_emb)? + type_emb)?;
        hidden = self.embedding_norm.forward(&hidden)?;
        hidden = hidden.unsqueeze(0)?;

        for layer in &self.layers {
            hidden = layer.forward(&hidden)?;
        }

        // Mean pooling over the sequence, then L2 normalise.
        let pooled = hidden.mean(1)?.squeeze(0)?;
        let norm: f32 = pooled.sqr()?.sum_all()?.sqrt()?.to_scalar()?;
        let pooled = if norm > 0.0 {
            pooled.affine(1.0 / f64::from(norm), 0.0)?
        } else {
            pooled
        };

        pooled.to_vec1::<f32>().map_err(Into::into)
    }
}

pub struct MiniLmEmbeddingProvider {
    encoder: SentenceEncoder,
    tokenizer: tokenizers::Tokenizer,
}

impl MiniLmEmbeddingProvider {
    pub fn load(model_path: &Path, tokenizer_path: &Path) -> Result<Self> {
        let encoder = SentenceEncoder::load(model_path, &Device::Cpu)?;
        let tokenizer = tokenizers::Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow::anyhow!("load tokenizer: {e}"))?;
        Ok(Self { encoder, tokenizer })
    }
}

const PROGRESS_EVERY: usize = 50;

impl EmbeddingProvider for MiniLmEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("tokenize: {e}"))?;
        self.encoder.forward(encoding.get_ids())
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for (i, text) in texts.iter().enumerate() {
            out.push(self.embed(text)?);
            if (i + 1) % PROGRESS_EVERY == 0 {
                eprintln!("embedded {}/{}", i + 1, texts.len());
            }
        }
        Ok(out)
    }
}
