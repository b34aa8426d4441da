use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result, anyhow};
use derive_more::{AsRef, Deref, Display, Into};
use linfa::prelude::*;
use linfa_clustering::Dbscan;
use log::debug;
use ndarray::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{
    model::{ClusterInfoRow, KeywordRepr, TopicId},
    subcluster::{Clusterer, ClusteringRun},
};

/// Tokenize review text into lowercase word tokens, dropping stopwords and
/// single-character tokens. The token alphabet matches what the upstream
/// preprocessing step leaves behind (letters, digits, whitespace).
pub fn tokenize(text: &str) -> Vec<String> {
    let re = Regex::new(r"[a-z0-9]+").expect("Failed to compile regex!");
    re.find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_owned())
        .filter(|w| w.len() >= 2 && !is_stopword(w))
        .collect()
}

fn is_stopword(word: &str) -> bool {
    matches!(
        word,
        "an" | "the" | "is" | "it" | "of" | "to" | "in" | "for" | "on" | "with" | "at" | "by"
            | "from" | "as" | "or" | "and" | "but" | "not" | "be" | "are" | "was" | "were"
            | "been" | "have" | "has" | "had" | "do" | "does" | "did" | "will" | "would"
            | "could" | "should" | "may" | "might" | "can" | "this" | "that" | "these"
            | "those" | "there" | "here" | "when" | "what" | "which" | "who" | "how" | "all"
            | "each" | "every" | "both" | "more" | "most" | "other" | "some" | "such" | "no"
            | "nor" | "only" | "own" | "same" | "so" | "than" | "too" | "very" | "just"
            | "because" | "about" | "into" | "through" | "before" | "after" | "again" | "then"
            | "once" | "any" | "its" | "your" | "our" | "their" | "his" | "her" | "my" | "if"
            | "up" | "out" | "also" | "me" | "you" | "they" | "them" | "we" | "us" | "im"
            | "ive" | "dont" | "didnt" | "cant" | "wont" | "get" | "got"
    )
}

/// A term-frequency feature matrix over a fixed vocabulary.
///
/// Rows are l2-normalized so that DBSCAN's euclidean tolerance behaves the
/// same regardless of review length.
#[derive(Debug, Clone, PartialEq)]
pub struct TermMatrix {
    vocabulary: Vec<String>,
    features: Array2<f32>,
    doc_tokens: Vec<Vec<String>>,
}

impl TermMatrix {
    /// Vectorize `texts`, keeping only terms that occur in at least
    /// `min_doc_freq` documents. Returns `None` when nothing survives the
    /// cutoff, which callers treat the same as a run with zero clusters.
    pub fn vectorize(texts: &[String], min_doc_freq: usize) -> Option<Self> {
        let doc_tokens: Vec<Vec<String>> = texts.iter().map(|t| tokenize(t)).collect();

        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        for tokens in &doc_tokens {
            let distinct: HashSet<&str> = tokens.iter().map(String::as_str).collect();
            for term in distinct {
                *doc_freq.entry(term).or_default() += 1;
            }
        }

        let mut vocabulary: Vec<String> = doc_freq
            .iter()
            .filter(|(_, df)| **df >= min_doc_freq)
            .map(|(term, _)| (*term).to_owned())
            .collect();
        vocabulary.sort();

        if vocabulary.is_empty() {
            return None;
        }

        let index: HashMap<&str, usize> = vocabulary
            .iter()
            .enumerate()
            .map(|(i, term)| (term.as_str(), i))
            .collect();

        let mut features = Array2::<f32>::zeros((texts.len(), vocabulary.len()));
        for (row, tokens) in doc_tokens.iter().enumerate() {
            for token in tokens {
                if let Some(&col) = index.get(token.as_str()) {
                    features[[row, col]] += 1.0;
                }
            }
            let norm = features.row(row).dot(&features.row(row)).sqrt();
            if norm > 0.0 {
                features.row_mut(row).mapv_inplace(|v| v / norm);
            }
        }

        Some(Self {
            vocabulary,
            features,
            doc_tokens,
        })
    }

    pub fn num_docs(&self) -> usize {
        self.features.nrows()
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    fn features(&self) -> &Array2<f32> {
        &self.features
    }

    /// Ranked keywords for one group of rows: in-vocabulary terms ordered by
    /// total occurrence count, ties broken alphabetically for determinism.
    fn top_terms(&self, rows: &[usize], limit: usize) -> Vec<String> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for &row in rows {
            for token in &self.doc_tokens[row] {
                if self.vocabulary.binary_search(token).is_ok() {
                    *counts.entry(token.as_str()).or_default() += 1;
                }
            }
        }
        let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
            .into_iter()
            .take(limit)
            .map(|(term, _)| term.to_owned())
            .collect()
    }
}

/// The in-process clustering collaborator: term-frequency vectors fed to
/// DBSCAN, with per-cluster keywords extracted from the same matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct DbscanClusterer {
    min_cluster_size: ClusterSize,
    tolerance: DbscanEpsilon,
    min_doc_freq: usize,
    top_n_words: usize,
}

impl DbscanClusterer {
    pub fn new(
        min_cluster_size: ClusterSize,
        tolerance: DbscanEpsilon,
        min_doc_freq: usize,
        top_n_words: usize,
    ) -> Self {
        Self {
            min_cluster_size,
            tolerance,
            min_doc_freq,
            top_n_words,
        }
    }
}

impl Clusterer for DbscanClusterer {
    fn cluster(&self, texts: &[String]) -> Result<ClusteringRun> {
        let Some(matrix) = TermMatrix::vectorize(texts, self.min_doc_freq) else {
            debug!(
                "no term passed the document-frequency cutoff ({}); treating all {} records as noise",
                self.min_doc_freq,
                texts.len()
            );
            return Ok(ClusteringRun::all_noise(texts.len()));
        };

        let cluster_assignments = Dbscan::params(self.min_cluster_size.into())
            .tolerance(self.tolerance.into())
            .transform(matrix.features())
            .with_context(|| "DbscanClusterer::cluster()")?;

        let mut assignments = Vec::with_capacity(texts.len());
        let mut members: HashMap<TopicId, Vec<usize>> = HashMap::new();
        for (row, assignment) in cluster_assignments.iter().enumerate() {
            let id = match assignment {
                Some(cluster) => TopicId::from(*cluster as i64),
                None => TopicId::NOISE,
            };
            assignments.push(id);
            members.entry(id).or_default().push(row);
        }

        let mut cluster_info: Vec<ClusterInfoRow> = members
            .iter()
            .map(|(id, rows)| {
                ClusterInfoRow::new(
                    *id,
                    KeywordRepr::Structured(matrix.top_terms(rows, self.top_n_words)),
                )
            })
            .collect();
        cluster_info.sort_by_key(|row| row.id);

        Ok(ClusteringRun {
            assignments,
            cluster_info,
        })
    }
}

/// Newtype for the DBSCAN minimum-cluster-size hyperparameter, which must
/// be >= 2.
#[derive(
    Debug, Copy, Clone, Hash, PartialEq, Eq, Into, AsRef, Deref, Serialize, Deserialize, Display,
)]
pub struct ClusterSize(usize);

impl ClusterSize {
    pub const MIN: ClusterSize = ClusterSize(2);

    /// Attempt to create a new instance given a `usize`, checking the
    /// `size >= ClusterSize::MIN` invariant.
    pub fn try_new(size: usize) -> Result<Self> {
        if size < Self::MIN.0 {
            Err(anyhow!(
                "Invalid cluster size {}; must be >= {}.",
                size,
                Self::MIN
            ))
        } else {
            Ok(Self(size))
        }
    }
}

impl TryFrom<usize> for ClusterSize {
    type Error = anyhow::Error;

    fn try_from(value: usize) -> std::result::Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

/// Newtype for the DBSCAN tolerance (epsilon), which must be > 0.
#[derive(
    Debug, Copy, Clone, PartialEq, PartialOrd, Into, AsRef, Deref, Serialize, Deserialize, Display,
)]
pub struct DbscanEpsilon(f32);

impl DbscanEpsilon {
    pub const MIN: DbscanEpsilon = DbscanEpsilon(0.0);

    /// Attempt to create a new value from the given `f32`, checking the
    /// `epsilon > 0.0` invariant.
    pub fn try_new(epsilon: f32) -> Result<Self> {
        if epsilon > Self::MIN.0 {
            Ok(Self(epsilon))
        } else {
            Err(anyhow!(
                "Invalid tolerance {}; must be > {}.",
                epsilon,
                Self::MIN
            ))
        }
    }
}

impl TryFrom<f32> for DbscanEpsilon {
    type Error = anyhow::Error;

    fn try_from(value: f32) -> std::result::Result<Self, Self::Error> {
        Self::try_new(value)
    }
}
