mod paths;

use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use paths::AppData;
use serde::Deserialize;

use crate::qj::model::TopicId;

/// Get or create a subdirectory under the app data dir.
/// - [`subpath`]: If Some(P), a subdirectory will be created if necessary
///   and returned. If None, the root app data directory will be returned.
pub fn get_or_create_app_data_path<P: AsRef<Path>>(subpath: Option<P>) -> Result<PathBuf> {
    AppData::get_data_path(subpath)
}

/// Default output location for the hierarchical pass when the run config
/// doesn't name one.
pub fn get_or_create_deep_analysis_path() -> Result<PathBuf> {
    get_or_create_app_data_path(Some("deep_analysis"))
}

/// Settings for the flat labeling pass, assembled from CLI flags.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelConfig {
    /// The clustering run's summary table (id + Representation per cluster).
    pub topic_info_path: PathBuf,

    /// Per-review topic assignments to label.
    pub input_path: PathBuf,

    /// Where the labeled table lands.
    pub output_path: PathBuf,

    /// Label for clusters with no usable keywords and for records whose id
    /// isn't covered by the map.
    pub default_label: String,
}

/// Run configuration for the hierarchical subcluster pass, loaded from a
/// TOML file so a run is reproducible without machine-specific paths baked
/// into the code.
///
/// ```toml
/// input_path = "data/deep_analysis/topics_2_7_24.csv"
/// target_topics = [2, 7, 24]
/// min_cluster_size = 8
/// tolerance = 0.8
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubclusterFileConfig {
    pub input_path: PathBuf,

    /// Directory for per-topic output files. Defaults to the platform app
    /// data dir.
    pub output_dir: Option<PathBuf>,

    /// Path of the merged table. Defaults to
    /// `<output_dir>/combined_with_subtopics.csv`.
    pub combined_output: Option<PathBuf>,

    /// Top-level topics selected for deeper analysis, in processing order.
    pub target_topics: Vec<i64>,

    #[serde(default = "default_text_column")]
    pub text_column: String,

    #[serde(default = "default_fallback_label")]
    pub fallback_label: String,

    /// DBSCAN minimum cluster size. Smaller finds finer subtopics.
    #[serde(default = "default_min_cluster_size")]
    pub min_cluster_size: usize,

    /// DBSCAN tolerance over l2-normalized term-frequency vectors.
    #[serde(default = "default_tolerance")]
    pub tolerance: f32,

    /// Ignore terms occurring in fewer documents than this.
    #[serde(default = "default_min_doc_freq")]
    pub min_doc_freq: usize,

    /// Keywords reported per discovered subtopic.
    #[serde(default = "default_top_n_words")]
    pub top_n_words: usize,
}

fn default_text_column() -> String {
    "processed_content".to_owned()
}

fn default_fallback_label() -> String {
    "other / outlier".to_owned()
}

fn default_min_cluster_size() -> usize {
    8
}

fn default_tolerance() -> f32 {
    0.8
}

fn default_min_doc_freq() -> usize {
    3
}

fn default_top_n_words() -> usize {
    10
}

impl SubclusterFileConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let body = read_to_string(path)
            .with_context(|| format!("reading run config {}", path.display()))?;
        toml::from_str(&body).with_context(|| format!("parsing run config {}", path.display()))
    }

    pub fn target_topic_ids(&self) -> Vec<TopicId> {
        self.target_topics.iter().map(|&id| id.into()).collect()
    }

    /// Resolve the output directory, creating it if needed.
    pub fn resolve_output_dir(&self) -> Result<PathBuf> {
        match &self.output_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("creating output dir {}", dir.display()))?;
                Ok(dir.clone())
            }
            None => get_or_create_deep_analysis_path(),
        }
    }

    /// Resolve the combined-output path against the output directory.
    pub fn resolve_combined_output(&self, output_dir: &Path) -> PathBuf {
        self.combined_output
            .clone()
            .unwrap_or_else(|| output_dir.join("combined_with_subtopics.csv"))
    }
}
