use std::path::Path;

use tracing::{info, warn};

use super::FeatureTable;
use crate::config::ToneConfig;
use crate::errors::PipelineError;
use crate::ingestion::read_corpus;
use crate::metrics::median;

/// Sentiment classes produced by a tone classifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToneClass {
    /// Positive tone, scored `+confidence`.
    Positive,
    /// Negative tone, scored `-confidence`.
    Negative,
    /// Neutral tone, scored zero.
    Neutral,
}

impl ToneClass {
    /// Parse a classifier label case-insensitively by substring.
    pub fn from_label(label: &str) -> Self {
        let lowered = label.to_lowercase();
        if lowered.contains("positive") {
            Self::Positive
        } else if lowered.contains("negative") {
            Self::Negative
        } else {
            Self::Neutral
        }
    }

    /// `+confidence`, `-confidence`, or zero.
    pub fn signed(&self, confidence: f64) -> f64 {
        match self {
            Self::Positive => confidence,
            Self::Negative => -confidence,
            Self::Neutral => 0.0,
        }
    }
}

/// Classifies one text chunk into a class with its confidence.
pub trait ToneClassifier {
    fn classify(&self, chunk: &str) -> Result<(ToneClass, f64), PipelineError>;
}

/// Consecutive chunks of at most `max_chars` characters.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in text.char_indices() {
        if count == max_chars {
            chunks.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        chunks.push(&text[start..]);
    }
    chunks
}

/// Median signed confidence over chunks; zero without a classifier or text.
pub fn document_tone(
    classifier: Option<&dyn ToneClassifier>,
    text: &str,
    max_chars: usize,
) -> Result<f64, PipelineError> {
    let Some(classifier) = classifier else {
        return Ok(0.0);
    };
    if text.trim().is_empty() {
        return Ok(0.0);
    }
    let mut values = Vec::new();
    for chunk in chunk_text(text, max_chars) {
        let (class, confidence) = classifier.classify(chunk)?;
        values.push(class.signed(confidence));
    }
    Ok(median(&values).unwrap_or(0.0))
}

/// Load the configured classifier, or `None` (with a warning) when unavailable.
pub fn load_classifier(config: &ToneConfig) -> Option<Box<dyn ToneClassifier>> {
    #[cfg(feature = "finbert")]
    {
        let Some(model_dir) = config.model_dir.as_deref() else {
            warn!("[ecb_tone:tone] no model directory given; scoring every document 0.0");
            return None;
        };
        match finbert::FinbertClassifier::load(model_dir, config.max_tokens) {
            Ok(classifier) => Some(Box::new(classifier)),
            Err(err) => {
                warn!("[ecb_tone:tone] classifier unavailable ({err}); scoring every document 0.0");
                None
            }
        }
    }
    #[cfg(not(feature = "finbert"))]
    {
        warn!(
            "[ecb_tone:tone] built without the `finbert` feature (model dir {:?}); scoring every document 0.0",
            config.model_dir
        );
        None
    }
}

/// Score texts with an optional classifier.
pub fn score_texts<S: AsRef<str>>(
    classifier: Option<&dyn ToneClassifier>,
    texts: &[S],
    max_chars: usize,
) -> Result<Vec<f64>, PipelineError> {
    texts
        .iter()
        .map(|text| document_tone(classifier, text.as_ref(), max_chars))
        .collect()
}

/// Score every corpus document and write the feature CSV.
pub fn score_corpus(
    corpus: &Path,
    output: &Path,
    score_column: &str,
    config: &ToneConfig,
) -> Result<FeatureTable, PipelineError> {
    let rows = read_corpus(corpus)?;
    let classifier = load_classifier(config);
    let texts: Vec<&str> = rows.iter().map(|row| row.text_clean.as_str()).collect();
    let scores = score_texts(classifier.as_deref(), &texts, config.max_chars)?;
    let doc_ids = rows.iter().map(|row| row.doc_id.clone()).collect();
    let table = FeatureTable::from_scores(score_column, doc_ids, scores);
    table.write(output)?;
    info!(
        "[ecb_tone:tone] wrote {} rows to {} ({})",
        table.len(),
        output.display(),
        if classifier.is_some() {
            "classifier ok"
        } else {
            "fallback 0.0"
        }
    );
    Ok(table)
}

#[cfg(feature = "finbert")]
mod finbert {
    use std::path::Path;
    use std::sync::Mutex;

    use ort::session::Session;
    use ort::value::TensorRef;
    use tracing::info;

    use super::{ToneClass, ToneClassifier};
    use crate::constants::scoring::{DEFAULT_TONE_MODEL, FINBERT_LABELS};
    use crate::errors::PipelineError;

    /// FinBERT-tone ONNX export plus its tokenizer.
    ///
    /// `model_dir` holds `model.onnx` and `tokenizer.json`. The session sits
    /// behind a mutex because `Session::run` takes `&mut self`.
    pub struct FinbertClassifier {
        session: Mutex<Session>,
        tokenizer: tokenizers::Tokenizer,
        max_tokens: usize,
    }

    impl FinbertClassifier {
        /// Load `model.onnx` and `tokenizer.json` from `model_dir`.
        pub fn load(model_dir: &Path, max_tokens: usize) -> Result<Self, PipelineError> {
            let model_path = model_dir.join("model.onnx");
            let tokenizer_path = model_dir.join("tokenizer.json");
            for path in [&model_path, &tokenizer_path] {
                if !path.is_file() {
                    return Err(PipelineError::MissingInput(path.clone()));
                }
            }

            let session = Session::builder()
                .map_err(|e: ort::Error| PipelineError::Model(e.to_string()))?
                .with_intra_threads(2)
                .map_err(|e: ort::Error| PipelineError::Model(e.to_string()))?
                .commit_from_file(&model_path)
                .map_err(|e: ort::Error| PipelineError::Model(format!("onnx load failed: {e}")))?;
            let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| PipelineError::Model(format!("tokenizer load failed: {e}")))?;

            info!(
                "[ecb_tone:tone] {} loaded from {}",
                DEFAULT_TONE_MODEL,
                model_dir.display()
            );
            Ok(Self {
                session: Mutex::new(session),
                tokenizer,
                max_tokens: max_tokens.max(2),
            })
        }

        /// Token ids, mask, and type ids truncated to `max_tokens`, keeping the final `[SEP]`.
        fn encode(&self, text: &str) -> Result<[Vec<i64>; 3], PipelineError> {
            let encoding = self
                .tokenizer
                .encode(text, true)
                .map_err(|e| PipelineError::Model(format!("tokenization failed: {e}")))?;
            let widen = |values: &[u32]| -> Vec<i64> {
                let mut out: Vec<i64> = values.iter().map(|&v| i64::from(v)).collect();
                if out.len() > self.max_tokens {
                    let last = out[out.len() - 1];
                    out.truncate(self.max_tokens - 1);
                    out.push(last);
                }
                out
            };
            Ok([
                widen(encoding.get_ids()),
                widen(encoding.get_attention_mask()),
                widen(encoding.get_type_ids()),
            ])
        }
    }

    impl ToneClassifier for FinbertClassifier {
        fn classify(&self, chunk: &str) -> Result<(ToneClass, f64), PipelineError> {
            let [ids, mask, types] = self.encode(chunk)?;
            let seq_len = ids.len();
            let shape = |values: Vec<i64>| {
                ndarray::Array2::from_shape_vec((1, seq_len), values)
                    .map_err(|e| PipelineError::Model(e.to_string()))
            };
            let (ids, mask, types) = (shape(ids)?, shape(mask)?, shape(types)?);
            let ids_tensor = TensorRef::from_array_view(&ids)
                .map_err(|e| PipelineError::Model(e.to_string()))?;
            let mask_tensor = TensorRef::from_array_view(&mask)
                .map_err(|e| PipelineError::Model(e.to_string()))?;
            let type_tensor = TensorRef::from_array_view(&types)
                .map_err(|e| PipelineError::Model(e.to_string()))?;

            let mut session = self
                .session
                .lock()
                .map_err(|_| PipelineError::Model("session lock poisoned".to_string()))?;
            let outputs = session
                .run(ort::inputs![ids_tensor, mask_tensor, type_tensor])
                .map_err(|e| PipelineError::Model(format!("inference failed: {e}")))?;
            let (_, logits) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| PipelineError::Model(format!("output extraction: {e}")))?;
            if logits.len() < FINBERT_LABELS.len() {
                return Err(PipelineError::Model(format!(
                    "expected {} logits, got {}",
                    FINBERT_LABELS.len(),
                    logits.len()
                )));
            }

            let probs = softmax(&logits[..FINBERT_LABELS.len()]);
            let (best, confidence) = probs
                .iter()
                .copied()
                .enumerate()
                .fold((0, f64::MIN), |acc, (idx, p)| if p > acc.1 { (idx, p) } else { acc });
            Ok((ToneClass::from_label(FINBERT_LABELS[best]), confidence))
        }
    }

    fn softmax(logits: &[f32]) -> Vec<f64> {
        let max = logits.iter().copied().fold(f32::MIN, f32::max);
        let exps: Vec<f64> = logits.iter().map(|&l| f64::from(l - max).exp()).collect();
        let sum: f64 = exps.iter().sum();
        exps.into_iter().map(|e| e / sum).collect()
    }

}
