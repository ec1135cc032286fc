//! Serve-time half of the ticket classifier: a fitted TF-IDF vectorizer and a
//! logistic regression head, read from the JSON document the offline training
//! job exports. Nothing here fits parameters; the artifact is taken as-is.

use crate::domain::model::{ClassificationResult, LabelDistribution};
use crate::domain::ports::DepartmentModel;
use crate::utils::error::{Result, TriageError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Same token rule as the training side: runs of two or more word characters.
const TOKEN_PATTERN: &str = r"\b\w\w+\b";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactDocument {
    pub vectorizer: VectorizerParams,
    pub classifier: ClassifierParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    L1,
    L2,
}

fn default_norm() -> Option<Norm> {
    Some(Norm::L2)
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorizerParams {
    pub vocabulary: HashMap<String, usize>,
    pub idf: Vec<f64>,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    #[serde(default = "default_true")]
    pub lowercase: bool,
    #[serde(default)]
    pub stop_words: Vec<String>,
    #[serde(default = "default_norm")]
    pub norm: Option<Norm>,
    #[serde(default)]
    pub sublinear_tf: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultiClass {
    #[default]
    Multinomial,
    Ovr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierParams {
    pub classes: Vec<String>,
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
    #[serde(default)]
    pub multi_class: MultiClass,
}

/// Sparse feature vector: (feature index, weight), sorted by index.
pub type SparseVector = Vec<(usize, f64)>;

#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    params: VectorizerParams,
    stop_words: HashSet<String>,
    token_re: Regex,
}

impl TfidfVectorizer {
    pub fn new(params: VectorizerParams) -> std::result::Result<Self, String> {
        let (min_n, max_n) = params.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(format!("invalid ngram_range ({}, {})", min_n, max_n));
        }
        if params.idf.is_empty() {
            return Err("idf vector is empty".to_string());
        }
        if let Some((term, idx)) = params
            .vocabulary
            .iter()
            .find(|(_, idx)| **idx >= params.idf.len())
        {
            return Err(format!(
                "vocabulary term '{}' has index {} beyond idf length {}",
                term,
                idx,
                params.idf.len()
            ));
        }

        let token_re = Regex::new(TOKEN_PATTERN).map_err(|e| e.to_string())?;
        let stop_words = params.stop_words.iter().cloned().collect();

        Ok(Self {
            params,
            stop_words,
            token_re,
        })
    }

    pub fn n_features(&self) -> usize {
        self.params.idf.len()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.params.vocabulary.len()
    }

    fn analyze(&self, text: &str) -> Vec<String> {
        let text = if self.params.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        let tokens: Vec<&str> = self
            .token_re
            .find_iter(&text)
            .map(|m| m.as_str())
            .filter(|t| !self.stop_words.contains(*t))
            .collect();

        let (min_n, max_n) = self.params.ngram_range;
        let mut terms = Vec::new();
        for n in min_n..=max_n.min(tokens.len()) {
            for window in tokens.windows(n) {
                terms.push(window.join(" "));
            }
        }
        terms
    }

    pub fn transform(&self, text: &str) -> SparseVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for term in self.analyze(text) {
            if let Some(&idx) = self.params.vocabulary.get(&term) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let mut vector: SparseVector = counts
            .into_iter()
            .map(|(idx, tf)| {
                let tf = if self.params.sublinear_tf { 1.0 + tf.ln() } else { tf };
                (idx, tf * self.params.idf[idx])
            })
            .collect();

        let norm = match self.params.norm {
            Some(Norm::L2) => vector.iter().map(|(_, v)| v * v).sum::<f64>().sqrt(),
            Some(Norm::L1) => vector.iter().map(|(_, v)| v.abs()).sum::<f64>(),
            None => 0.0,
        };
        if norm > 0.0 {
            for (_, v) in vector.iter_mut() {
                *v /= norm;
            }
        }
        vector
    }
}

#[derive(Debug, Clone)]
pub struct LogisticRegression {
    params: ClassifierParams,
}

impl LogisticRegression {
    pub fn new(params: ClassifierParams, n_features: usize) -> std::result::Result<Self, String> {
        let n_classes = params.classes.len();
        if n_classes < 2 {
            return Err(format!("expected at least 2 classes, found {}", n_classes));
        }
        let unique: HashSet<&String> = params.classes.iter().collect();
        if unique.len() != n_classes {
            return Err("class labels are not unique".to_string());
        }

        let expected_rows = if n_classes == 2 { 1 } else { n_classes };
        if params.coef.len() != expected_rows {
            return Err(format!(
                "coef has {} rows, expected {} for {} classes",
                params.coef.len(),
                expected_rows,
                n_classes
            ));
        }
        if params.intercept.len() != expected_rows {
            return Err(format!(
                "intercept has {} entries, expected {}",
                params.intercept.len(),
                expected_rows
            ));
        }
        if let Some(row) = params.coef.iter().find(|row| row.len() != n_features) {
            return Err(format!(
                "coef row has {} columns but the vectorizer produces {} features",
                row.len(),
                n_features
            ));
        }

        Ok(Self { params })
    }

    pub fn classes(&self) -> &[String] {
        &self.params.classes
    }

    fn decision(&self, x: &SparseVector) -> Vec<f64> {
        self.params
            .coef
            .iter()
            .zip(&self.params.intercept)
            .map(|(row, b)| x.iter().map(|&(idx, v)| row[idx] * v).sum::<f64>() + b)
            .collect()
    }

    /// Probabilities aligned with `classes()`; always sums to 1.
    pub fn predict_proba(&self, x: &SparseVector) -> Vec<f64> {
        let scores = self.decision(x);

        if self.params.classes.len() == 2 {
            let p1 = sigmoid(scores[0]);
            return vec![1.0 - p1, p1];
        }

        match self.params.multi_class {
            MultiClass::Multinomial => softmax(&scores),
            MultiClass::Ovr => {
                let probs: Vec<f64> = scores.iter().map(|&s| sigmoid(s)).collect();
                let total: f64 = probs.iter().sum();
                if total > 0.0 {
                    probs.iter().map(|p| p / total).collect()
                } else {
                    // every sigmoid underflowed; softmax keeps the ranking
                    softmax(&scores)
                }
            }
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.iter().map(|e| e / total).collect()
}

/// Index of the largest value; earliest index wins ties.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

/// Loaded vectorizer + classifier pair.
#[derive(Debug, Clone)]
pub struct TicketPipeline {
    vectorizer: TfidfVectorizer,
    classifier: LogisticRegression,
}

impl TicketPipeline {
    pub fn from_document(doc: ArtifactDocument) -> std::result::Result<Self, String> {
        let vectorizer = TfidfVectorizer::new(doc.vectorizer)?;
        let classifier = LogisticRegression::new(doc.classifier, vectorizer.n_features())?;
        Ok(Self {
            vectorizer,
            classifier,
        })
    }

    /// Parse and validate a serialized artifact. `source` only labels errors.
    pub fn from_json(source: &str, bytes: &[u8]) -> Result<Self> {
        let load_error = |message: String| TriageError::ArtifactLoad {
            path: source.to_string(),
            message,
        };

        let doc: ArtifactDocument =
            serde_json::from_slice(bytes).map_err(|e| load_error(e.to_string()))?;
        Self::from_document(doc).map_err(load_error)
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vectorizer.vocabulary_size()
    }

    fn probabilities(&self, text: &str) -> Vec<f64> {
        let x = self.vectorizer.transform(text);
        self.classifier.predict_proba(&x)
    }
}

impl DepartmentModel for TicketPipeline {
    fn labels(&self) -> &[String] {
        self.classifier.classes()
    }

    fn predict(&self, text: &str) -> String {
        let probs = self.probabilities(text);
        self.classifier.classes()[argmax(&probs)].clone()
    }

    fn classify(&self, text: &str) -> ClassificationResult {
        let probs = self.probabilities(text);
        let best = argmax(&probs);
        ClassificationResult {
            label: self.classifier.classes()[best].clone(),
            confidence: probs[best],
        }
    }

    fn predict_distribution(&self, text: &str) -> LabelDistribution {
        self.classifier
            .classes()
            .iter()
            .cloned()
            .zip(self.probabilities(text))
            .collect()
    }
}
