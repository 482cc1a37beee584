//! ONNX Runtime adapter for the pre-trained topic classifier.
//!
//! The artifact is a directory with `model.onnx`, `tokenizer.json`, and
//! `labels.txt` (one taxonomy label per line, in the model's output
//! order). The model is loaded once at process start and never mutated;
//! scoring takes the session behind a mutex so [`TopicScorer::score`]
//! stays `&self` and safe from concurrent tasks.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Tensor;
use thiserror::Error;
use tokenizers::Tokenizer;
use tracing::info;

use wdtopic_core::{LabelScoreMap, ScoreError, TopicScorer};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model artifact missing: {0}")]
    ArtifactMissing(PathBuf),
    #[error("failed to load tokenizer: {0}")]
    Tokenizer(String),
    #[error("onnx session error: {0}")]
    Session(#[from] ort::Error),
    #[error("failed to read labels: {0}")]
    Labels(#[from] std::io::Error),
    #[error("labels.txt is empty")]
    NoLabels,
    #[error("model output shape {got:?} does not match {expected} labels")]
    OutputShape { expected: usize, got: Vec<i64> },
    #[error("model session lock poisoned")]
    Poisoned,
}

/// The loaded classifier artifact.
#[derive(Debug)]
pub struct TopicModel {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    labels: Vec<String>,
}

impl TopicModel {
    /// Load the artifact from a directory containing `model.onnx`,
    /// `tokenizer.json`, and `labels.txt`.
    ///
    /// Startup-fatal for the binaries: they refuse to serve or process
    /// anything until this has succeeded.
    pub fn load(model_dir: &Path) -> Result<Self, ModelError> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let labels_path = model_dir.join("labels.txt");

        for path in [&model_path, &tokenizer_path, &labels_path] {
            if !path.exists() {
                return Err(ModelError::ArtifactMissing(path.clone()));
            }
        }

        let session = Session::builder()?.commit_from_file(&model_path)?;
        let tokenizer =
            Tokenizer::from_file(&tokenizer_path).map_err(|e| ModelError::Tokenizer(e.to_string()))?;
        let labels = parse_labels(&std::fs::read_to_string(&labels_path)?)?;

        info!(
            labels = labels.len(),
            model = %model_path.display(),
            "loaded topic model"
        );
        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            labels,
        })
    }

    /// Taxonomy labels in model output order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    fn score_tokens(&self, tokens: &[String]) -> Result<LabelScoreMap, ModelError> {
        let text = tokens.join(" ");
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| ModelError::Tokenizer(e.to_string()))?;

        let mut input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let mut attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        // Zero-claim items tokenize to nothing; the session still needs
        // a non-empty sequence.
        if input_ids.is_empty() {
            input_ids.push(0);
            attention_mask.push(1);
        }

        let seq_len = input_ids.len();
        let shape = [1i64, seq_len as i64];
        let ids_tensor = Tensor::from_array((shape, input_ids.into_boxed_slice()))?;
        let mask_tensor = Tensor::from_array((shape, attention_mask.into_boxed_slice()))?;

        let mut session = self.session.lock().map_err(|_| ModelError::Poisoned)?;
        let outputs = session.run(ort::inputs![
            "input_ids" => ids_tensor,
            "attention_mask" => mask_tensor,
        ])?;

        let (output_shape, logits) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: &[i64] = output_shape;
        if dims.last().copied() != Some(self.labels.len() as i64)
            || logits.len() != self.labels.len()
        {
            return Err(ModelError::OutputShape {
                expected: self.labels.len(),
                got: dims.to_vec(),
            });
        }

        Ok(self
            .labels
            .iter()
            .zip(logits)
            .map(|(label, &logit)| (label.clone(), sigmoid(logit)))
            .collect())
    }
}

impl TopicScorer for TopicModel {
    fn score(&self, tokens: &[String]) -> Result<LabelScoreMap, ScoreError> {
        self.score_tokens(tokens)
            .map_err(|e| ScoreError::Inference(e.to_string()))
    }
}

/// Parse `labels.txt`: one label per line, blank lines ignored, legacy
/// `__label__` prefixes stripped.
fn parse_labels(contents: &str) -> Result<Vec<String>, ModelError> {
    let labels: Vec<String> = contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| l.trim_start_matches("__label__").to_string())
        .collect();
    if labels.is_empty() {
        return Err(ModelError::NoLabels);
    }
    Ok(labels)
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
