use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use log::{info, warn};

use super::{
    labels::{LabelFallback, LabelMapOptions, TOPIC_COLUMNS, build_label_map},
    model::{ClusterInfoRow, TopicId},
    table::Table,
};

/// Column added by the hierarchical pass for the second-level cluster id.
pub const SUBTOPIC_ID_COLUMN: &str = "subtopic_id";

/// Column added by the hierarchical pass for the second-level label.
pub const SUBTOPIC_LABEL_COLUMN: &str = "subtopic_label";

/// The external clustering collaborator.
///
/// One call is one self-contained clustering run: each input text gets an id
/// (starting at -1 for noise, then 0, 1, 2, ...) and the run reports its own
/// keyword table. The call is synchronous and potentially long; there is no
/// cancellation, the run either completes or the process dies.
pub trait Clusterer {
    fn cluster(&self, texts: &[String]) -> Result<ClusteringRun>;
}

/// Output of one clustering run: one id per input text, plus the run's
/// per-cluster keyword summary.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringRun {
    pub assignments: Vec<TopicId>,
    pub cluster_info: Vec<ClusterInfoRow>,
}

impl ClusteringRun {
    /// A degenerate run in which nothing clustered.
    pub fn all_noise(len: usize) -> Self {
        Self {
            assignments: vec![TopicId::NOISE; len],
            cluster_info: Vec::new(),
        }
    }

    /// Number of discovered (non-noise) clusters.
    pub fn num_signal_clusters(&self) -> usize {
        self.cluster_info
            .iter()
            .filter(|row| row.id.is_signal())
            .count()
    }
}

/// Settings for one run of the hierarchical pass.
///
/// `target_topics` is a deliberate manual curation step, not an algorithmic
/// selection: the analyst picks which top-level topics deserve a deeper look.
#[derive(Debug, Clone, PartialEq)]
pub struct SubclusterOptions {
    /// Top-level topic ids to re-cluster, in processing order.
    pub target_topics: Vec<TopicId>,

    /// Column holding the text to cluster on.
    pub text_column: String,

    /// Label for subtopic ids the run's label map doesn't cover, and for
    /// the subtopic noise cluster.
    pub fallback_label: String,

    /// Directory receiving one `topic_<id>_subtopics.csv` per processed
    /// topic. Writing per topic means one topic's failure can't lose
    /// already-completed output.
    pub output_dir: PathBuf,
}

/// Re-cluster each target topic's records into subtopics and merge the
/// results back into one combined table.
///
/// Per target id, in the order given: select the topic's rows, drop rows
/// without usable text, run `clusterer` on what's left, label that run's
/// clusters (noise overridden to the fallback label), attach
/// `subtopic_id` + `subtopic_label`, and persist the augmented subset.
///
/// The combined result is the per-id outputs in processing order, followed
/// by all rows whose topic is not targeted, unchanged (their two new columns
/// stay empty). Rows belonging to a targeted topic that had to be skipped —
/// no records, no usable text, or a run with zero clusters — are dropped
/// from the combined result; that is accepted behavior, not an accident.
pub fn subcluster(
    table: &Table,
    options: &SubclusterOptions,
    clusterer: &impl Clusterer,
) -> Result<Table> {
    let topic_col = table.require_column_any(&TOPIC_COLUMNS)?;
    let text_col = table.require_column(&options.text_column)?;

    let mut headers = table.headers().to_vec();
    headers.push(SUBTOPIC_ID_COLUMN.to_owned());
    headers.push(SUBTOPIC_LABEL_COLUMN.to_owned());
    let mut combined = Table::new(headers.clone());

    for &target in &options.target_topics {
        let selected: Vec<usize> = (0..table.len())
            .filter(|&row| table.topic_at(row, topic_col) == Some(target))
            .collect();
        if selected.is_empty() {
            info!("no reviews found for topic {target}, skipping");
            continue;
        }

        // Rows with empty processed text can't be clustered.
        let usable: Vec<usize> = selected
            .iter()
            .copied()
            .filter(|&row| !table.value(row, text_col).trim().is_empty())
            .collect();
        if usable.is_empty() {
            warn!("topic {target}: all {} rows lack usable text, skipping", selected.len());
            continue;
        }

        let texts: Vec<String> = usable
            .iter()
            .map(|&row| table.value(row, text_col).to_owned())
            .collect();

        info!("fitting subtopic run for topic {target} on {} reviews", texts.len());
        let run = clusterer
            .cluster(&texts)
            .with_context(|| format!("subtopic clustering for topic {target}"))?;
        // One id per text is the collaborator's contract; zipping a short
        // vector would silently mislabel rows.
        ensure!(
            run.assignments.len() == texts.len(),
            "clusterer returned {} assignments for {} texts (topic {target})",
            run.assignments.len(),
            texts.len()
        );
        if run.num_signal_clusters() == 0 {
            warn!("topic {target}: clustering found no subtopics, skipping");
            continue;
        }

        let label_map = build_label_map(
            &run.cluster_info,
            &LabelMapOptions {
                fallback: LabelFallback::PerTopic,
                noise_override: Some(options.fallback_label.clone()),
            },
        );

        let mut augmented = Table::new(headers.clone());
        for (&row, subtopic) in usable.iter().zip(&run.assignments) {
            let label = label_map
                .get(subtopic)
                .map(ToString::to_string)
                .unwrap_or_else(|| options.fallback_label.clone());
            let mut cells = table.rows()[row].clone();
            cells.push(subtopic.to_string());
            cells.push(label);
            augmented.push_row(cells);
        }

        let out_path = per_topic_path(&options.output_dir, target);
        augmented
            .write_csv(&out_path)
            .with_context(|| format!("saving subtopics for topic {target}"))?;
        info!("saved subtopics for topic {target} to {}", out_path.display());

        for row in augmented.rows() {
            combined.push_row(row.clone());
        }
    }

    // Untouched passthrough: everything whose topic is not targeted,
    // including rows with no parseable topic at all.
    for row in 0..table.len() {
        let topic = table.topic_at(row, topic_col);
        let targeted = topic.is_some_and(|id| options.target_topics.contains(&id));
        if !targeted {
            let mut cells = table.rows()[row].clone();
            cells.push(String::new());
            cells.push(String::new());
            combined.push_row(cells);
        }
    }

    Ok(combined)
}

/// Where one topic's augmented subset lands.
pub fn per_topic_path(output_dir: &Path, topic: TopicId) -> PathBuf {
    output_dir.join(format!("topic_{topic}_subtopics.csv"))
}
