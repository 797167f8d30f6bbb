use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;

use rayon::prelude::*;
use regex::Regex;
use tracing::info;

use super::FeatureTable;
use crate::config::TfidfConfig;
use crate::errors::PipelineError;
use crate::ingestion::read_corpus;
use crate::types::Term;

static RE_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w\w+\b").unwrap());

/// Lowercased word tokens of two or more word characters.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    RE_TOKEN
        .find_iter(&lowered)
        .map(|token| token.as_str().to_string())
        .collect()
}

/// Space-joined n-grams of consecutive tokens, shortest first.
pub fn ngrams(tokens: &[String], min_n: usize, max_n: usize) -> Vec<Term> {
    let mut terms = Vec::new();
    for n in min_n.max(1)..=max_n {
        if n == 1 {
            terms.extend(tokens.iter().cloned());
        } else {
            terms.extend(tokens.windows(n).map(|window| window.join(" ")));
        }
    }
    terms
}

/// Sparse row: `(term index, weight)` sorted by index.
pub type SparseRow = Vec<(usize, f64)>;

/// Weight of `term` in `row`, zero when absent.
pub fn weight(row: &SparseRow, term: usize) -> f64 {
    row.binary_search_by_key(&term, |(idx, _)| *idx)
        .map(|pos| row[pos].1)
        .unwrap_or(0.0)
}

/// TF-IDF vectorizer with document-frequency pruning and smooth idf.
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    ngram_min: usize,
    ngram_max: usize,
    min_df: usize,
    max_df: f64,
    max_features: Option<usize>,
    vocabulary: HashMap<Term, usize>,
    terms: Vec<Term>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    /// Unfitted vectorizer with the given settings.
    pub fn new(config: &TfidfConfig) -> Self {
        Self {
            ngram_min: config.ngram_min,
            ngram_max: config.ngram_max,
            min_df: config.min_df,
            max_df: config.max_df,
            max_features: config.max_features,
            vocabulary: HashMap::new(),
            terms: Vec::new(),
            idf: Vec::new(),
        }
    }

    /// Terms of one document, as counted by the vectorizer.
    pub fn analyze(&self, text: &str) -> Vec<Term> {
        ngrams(&tokenize(text), self.ngram_min, self.ngram_max)
    }

    /// Fitted terms in index order (sorted).
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Index of a fitted term.
    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    /// Fit vocabulary and idf on analysed documents.
    ///
    /// Keeps terms with `min_df <= df <= max_df * n_docs`, then the
    /// `max_features` most frequent ones by total count.
    pub fn fit(&mut self, documents: &[Vec<Term>]) -> Result<(), PipelineError> {
        let n_docs = documents.len();
        let max_doc_count = self.max_df * n_docs as f64;

        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        let mut total_freq: HashMap<&str, usize> = HashMap::new();
        for doc in documents {
            let mut unique: HashSet<&str> = HashSet::new();
            for term in doc {
                *total_freq.entry(term.as_str()).or_insert(0) += 1;
                if unique.insert(term.as_str()) {
                    *doc_freq.entry(term.as_str()).or_insert(0) += 1;
                }
            }
        }

        let mut kept: Vec<&str> = doc_freq
            .iter()
            .filter(|(_, df)| **df >= self.min_df && **df as f64 <= max_doc_count)
            .map(|(term, _)| *term)
            .collect();
        kept.sort_unstable();
        if let Some(limit) = self.max_features
            && kept.len() > limit
        {
            // Sorting is stable, so equal counts keep alphabetical order.
            kept.sort_by_key(|term| std::cmp::Reverse(total_freq.get(term).copied().unwrap_or(0)));
            kept.truncate(limit);
            kept.sort_unstable();
        }
        if kept.is_empty() {
            return Err(PipelineError::EmptyVocabulary {
                min_df: self.min_df,
                max_df: self.max_df,
            });
        }

        self.terms = kept.iter().map(|term| term.to_string()).collect();
        self.vocabulary = self
            .terms
            .iter()
            .enumerate()
            .map(|(idx, term)| (term.clone(), idx))
            .collect();
        self.idf = kept
            .iter()
            .map(|term| {
                let df = doc_freq.get(term).copied().unwrap_or(0) as f64;
                ((1.0 + n_docs as f64) / (1.0 + df)).ln() + 1.0
            })
            .collect();
        Ok(())
    }

    /// L2-normalized tf-idf row for one analysed document.
    pub fn transform(&self, document: &[Term]) -> SparseRow {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for term in document {
            if let Some(&idx) = self.vocabulary.get(term) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }
        let mut row: SparseRow = counts
            .into_iter()
            .map(|(idx, tf)| (idx, tf * self.idf[idx]))
            .collect();
        row.sort_unstable_by_key(|(idx, _)| *idx);
        let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in &mut row {
                *w /= norm;
            }
        }
        row
    }

    /// Analyse, fit, and transform; rows keep input order.
    pub fn fit_transform<S: AsRef<str> + Sync>(
        &mut self,
        texts: &[S],
    ) -> Result<Vec<SparseRow>, PipelineError> {
        let analyzer = &*self;
        let documents: Vec<Vec<Term>> = texts
            .par_iter()
            .map(|text| analyzer.analyze(text.as_ref()))
            .collect();
        self.fit(&documents)?;
        let vectorizer = &*self;
        Ok(documents
            .par_iter()
            .map(|doc| vectorizer.transform(doc))
            .collect())
    }
}

/// Raw lexical scores plus the seeds found in the vocabulary.
#[derive(Clone, Debug, PartialEq)]
pub struct SeedScores {
    /// Hawkish minus dovish mean weight per document.
    pub scores: Vec<f64>,
    /// Hawkish seeds found in the vocabulary.
    pub hawkish_present: Vec<Term>,
    /// Dovish seeds found in the vocabulary.
    pub dovish_present: Vec<Term>,
}

fn present_seeds(vectorizer: &TfidfVectorizer, seeds: &[Term]) -> Vec<(Term, usize)> {
    seeds
        .iter()
        .filter_map(|seed| vectorizer.term_index(seed).map(|idx| (seed.clone(), idx)))
        .collect()
}

fn mean_weight(row: &SparseRow, seeds: &[(Term, usize)]) -> f64 {
    if seeds.is_empty() {
        return 0.0;
    }
    seeds.iter().map(|(_, idx)| weight(row, *idx)).sum::<f64>() / seeds.len() as f64
}

/// Mean hawkish seed weight minus mean dovish seed weight, per document.
pub fn score_texts<S: AsRef<str> + Sync>(
    texts: &[S],
    config: &TfidfConfig,
) -> Result<SeedScores, PipelineError> {
    config.validate()?;
    let mut vectorizer = TfidfVectorizer::new(config);
    let rows = vectorizer.fit_transform(texts)?;
    let hawkish = present_seeds(&vectorizer, &config.hawkish_seeds);
    let dovish = present_seeds(&vectorizer, &config.dovish_seeds);
    let scores = rows
        .par_iter()
        .map(|row| mean_weight(row, &hawkish) - mean_weight(row, &dovish))
        .collect();
    Ok(SeedScores {
        scores,
        hawkish_present: hawkish.into_iter().map(|(term, _)| term).collect(),
        dovish_present: dovish.into_iter().map(|(term, _)| term).collect(),
    })
}

/// Score every corpus document and write the feature CSV.
pub fn score_corpus(
    corpus: &Path,
    output: &Path,
    config: &TfidfConfig,
) -> Result<FeatureTable, PipelineError> {
    let rows = read_corpus(corpus)?;
    let texts: Vec<&str> = rows.iter().map(|row| row.text_clean.as_str()).collect();
    let seeds = score_texts(&texts, config)?;
    let doc_ids = rows.iter().map(|row| row.doc_id.clone()).collect();
    let table = FeatureTable::from_scores(&config.score_column, doc_ids, seeds.scores);
    table.write(output)?;
    info!(
        "[ecb_tone:tfidf] wrote {} rows to {} | seeds found: +{} {:?} / -{} {:?}",
        table.len(),
        output.display(),
        seeds.hawkish_present.len(),
        seeds.hawkish_present,
        seeds.dovish_present.len(),
        seeds.dovish_present
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(min_df: usize, max_df: f64) -> TfidfConfig {
        TfidfConfig::default().with_min_df(min_df).with_max_df(max_df)
    }

    #[test]
    fn tokens_skip_single_characters_and_lowercase() {
        assert_eq!(tokenize("A Rate HIKE, 2% x"), vec!["rate", "hike"]);
        assert_eq!(
            ngrams(&tokenize("above target now"), 1, 2),
            vec!["above", "target", "now", "above target", "target now"]
        );
    }

    #[test]
    fn pruning_respects_min_and_max_df() {
        let texts = ["rates rates hike", "rates cut", "rates hike"];
        let mut cfg = config(2, 0.9);
        cfg.ngram_max = 1;
        let mut vectorizer = TfidfVectorizer::new(&cfg);
        vectorizer.fit_transform(&texts).unwrap();
        // `rates` is in every document (3 > 0.9 * 3); `cut` is in one.
        assert_eq!(vectorizer.terms(), &["hike".to_string()]);
    }

    #[test]
    fn rows_are_l2_normalized_with_smooth_idf() {
        let texts = ["alpha beta", "alpha", "gamma"];
        let mut vectorizer = TfidfVectorizer::new(&config(1, 1.0).with_max_features(None));
        let rows = vectorizer.fit_transform(&texts).unwrap();
        for row in &rows {
            let norm: f64 = row.iter().map(|(_, w)| w * w).sum();
            assert!((norm - 1.0).abs() < 1e-12);
        }
        let alpha = vectorizer.term_index("alpha").unwrap();
        let beta = vectorizer.term_index("beta").unwrap();
        // idf(alpha) = ln(4/3) + 1, idf(beta) = ln(4/2) + 1
        let ratio = weight(&rows[0], beta) / weight(&rows[0], alpha);
        let expected = ((2.0f64).ln() + 1.0) / ((4.0f64 / 3.0).ln() + 1.0);
        assert!((ratio - expected).abs() < 1e-12);
    }

    #[test]
    fn max_features_keeps_most_frequent_terms() {
        let texts = ["inflation inflation cut", "inflation easing", "cut easing"];
        let mut vectorizer =
            TfidfVectorizer::new(&config(1, 1.0).with_max_features(Some(2)));
        vectorizer.fit(&texts.iter().map(|t| tokenize(t)).collect::<Vec<_>>()).unwrap();
        assert_eq!(vectorizer.terms(), &["cut".to_string(), "inflation".to_string()]);
    }

    #[test]
    fn empty_vocabulary_is_an_error() {
        let texts = ["one", "two"];
        let err = score_texts(&texts, &config(5, 0.9)).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyVocabulary { min_df: 5, .. }));
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let err = score_texts(&["a b"], &config(1, 1.5)).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn absent_seeds_score_zero_and_sides_subtract() {
        let mut cfg = config(1, 1.0);
        cfg.ngram_max = 1;
        let texts = ["hike hike now", "easing now", "plain now words"];
        let seeds = score_texts(&texts, &cfg).unwrap();
        assert_eq!(seeds.hawkish_present, vec!["hike".to_string()]);
        assert_eq!(seeds.dovish_present, vec!["easing".to_string()]);
        assert!(seeds.scores[0] > 0.0);
        assert!(seeds.scores[1] < 0.0);
        assert_eq!(seeds.scores[2], 0.0);
    }
}
