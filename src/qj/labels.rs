use log::warn;

use super::{
    model::{ClusterInfoRow, KeywordRepr, Label, LabelMap, TopicId},
    table::{Table, TableError},
};

/// Column names accepted for a per-record topic assignment, in preference
/// order.
pub const TOPIC_COLUMNS: [&str; 2] = ["topic", "Topic"];

/// The label written by the flat pass.
pub const PAIN_POINT_COLUMN: &str = "pain_point_label";

/// The column holding a cluster's ranked keyword list in a run's summary
/// output.
pub const REPRESENTATION_COLUMN: &str = "Representation";

/// Synthesize a descriptive label from a ranked keyword list.
///
/// The label is a pure function of the first three usable keywords' literal
/// text, pressed into one of three fixed templates. No paraphrasing, no
/// inference beyond concatenation:
///
/// - `["food"]` → `"food related issues"`
/// - `["food", "cold"]` → `"food and cold related issues"`
/// - `["food", "cold", "driver", ...]` → `"food, cold and driver related issues"`
///
/// With no usable keyword at all, `fallback` is returned verbatim; callers
/// pick the fallback text ("general issues" in the flat pass, a
/// per-subtopic name in the hierarchical one).
pub fn synthesize_label(keywords: &[String], fallback: &str) -> Label {
    let top: Vec<&str> = keywords
        .iter()
        .map(|w| w.trim())
        .filter(|w| !w.is_empty())
        .take(3)
        .collect();

    let core = match top.as_slice() {
        [] => return fallback.into(),
        [w] => (*w).to_owned(),
        [w1, w2] => format!("{w1} and {w2}"),
        [w1, w2, w3] => format!("{w1}, {w2} and {w3}"),
        _ => unreachable!("take(3) bounds the keyword window"),
    };

    format!("{core} related issues").into()
}

/// What to label a cluster whose keyword representation yields nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum LabelFallback {
    /// One fixed string for every such cluster.
    Fixed(String),
    /// `subtopic_<id>`, so empty subtopics stay distinguishable in the
    /// per-topic output files.
    PerTopic,
}

impl LabelFallback {
    fn text_for(&self, id: TopicId) -> String {
        match self {
            Self::Fixed(text) => text.clone(),
            Self::PerTopic => format!("subtopic_{id}"),
        }
    }
}

/// Options for [`build_label_map`].
#[derive(Debug, Clone, PartialEq)]
pub struct LabelMapOptions {
    /// Label for clusters with no usable keywords.
    pub fallback: LabelFallback,

    /// When set, the noise id (-1) maps to this string regardless of its
    /// keywords. The hierarchical pass sets it ("other / outlier"); the flat
    /// pass labels noise from its own keywords like any other cluster.
    pub noise_override: Option<String>,
}

impl Default for LabelMapOptions {
    fn default() -> Self {
        Self {
            fallback: LabelFallback::Fixed("general issues".to_owned()),
            noise_override: None,
        }
    }
}

/// Build the total id → label map for one clustering run.
///
/// Every id present in `rows` gets an entry, noise included. Duplicate ids
/// are an input contract violation; we keep the last one and say so.
pub fn build_label_map(rows: &[ClusterInfoRow], options: &LabelMapOptions) -> LabelMap {
    let mut map = LabelMap::default();
    for row in rows {
        let label = match (&options.noise_override, row.id.is_noise()) {
            (Some(noise_label), true) => noise_label.as_str().into(),
            _ => synthesize_label(
                &row.representation.keywords(),
                &options.fallback.text_for(row.id),
            ),
        };
        if map.insert(row.id, label).is_some() {
            warn!(
                "duplicate cluster id {} in cluster info; keeping the last entry",
                row.id
            );
        }
    }
    map
}

/// Extract [`ClusterInfoRow`]s from a run's summary table as read from disk.
///
/// The id column may be `topic` or `Topic`; the keyword column is
/// `Representation`, carried as its literal textual encoding. Rows whose id
/// cell doesn't parse are dropped with a notice.
pub fn cluster_info_rows(table: &Table) -> Result<Vec<ClusterInfoRow>, TableError> {
    let id_col = table.require_column_any(&TOPIC_COLUMNS)?;
    let rep_col = table.require_column(REPRESENTATION_COLUMN)?;

    let mut rows = Vec::with_capacity(table.len());
    for i in 0..table.len() {
        let Some(id) = table.topic_at(i, id_col) else {
            warn!(
                "cluster info row {} has unparseable id '{}'; dropping it",
                i,
                table.value(i, id_col)
            );
            continue;
        };
        rows.push(ClusterInfoRow::new(
            id,
            KeywordRepr::RawText(table.value(i, rep_col).to_owned()),
        ));
    }
    Ok(rows)
}

/// Attach one label column to a table of per-record topic assignments.
///
/// A pure map over rows: order and count are preserved, existing columns
/// untouched. An id absent from `map` gets `missing_label` rather than
/// failing the pass; a labeled record is strictly more useful downstream
/// than a dropped one.
pub fn apply_labels(
    table: &mut Table,
    label_column: &str,
    map: &LabelMap,
    missing_label: &str,
) -> Result<(), TableError> {
    let topic_col = table.require_column_any(&TOPIC_COLUMNS)?;

    let labels: Vec<String> = (0..table.len())
        .map(|i| {
            table
                .topic_at(i, topic_col)
                .and_then(|id| map.get(&id))
                .map(ToString::to_string)
                .unwrap_or_else(|| missing_label.to_owned())
        })
        .collect();

    table.add_column(label_column, labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|w| (*w).to_owned()).collect()
    }

    #[test]
    fn test_synthesize_label_templates() {
        assert_eq!(
            synthesize_label(&[], "general issues").to_string(),
            "general issues"
        );
        assert_eq!(
            synthesize_label(&words(&["food"]), "general issues").to_string(),
            "food related issues"
        );
        assert_eq!(
            synthesize_label(&words(&["food", "cold"]), "general issues").to_string(),
            "food and cold related issues"
        );
        assert_eq!(
            synthesize_label(&words(&["food", "cold", "driver"]), "general issues").to_string(),
            "food, cold and driver related issues"
        );
    }

    #[test]
    fn test_synthesize_label_truncates_to_three() {
        let keywords = words(&["food", "cold", "driver", "late", "refund"]);
        assert_eq!(
            synthesize_label(&keywords, "general issues").to_string(),
            "food, cold and driver related issues"
        );
    }

    #[test]
    fn test_synthesize_label_skips_blank_keywords() {
        let keywords = words(&["", "  ", "tip", "charge"]);
        assert_eq!(
            synthesize_label(&keywords, "general issues").to_string(),
            "tip and charge related issues"
        );
    }

    #[test]
    fn test_synthesize_label_is_deterministic() {
        let keywords = words(&["gift", "card"]);
        assert_eq!(
            synthesize_label(&keywords, "x"),
            synthesize_label(&keywords, "x")
        );
    }

    fn info(rows: &[(i64, &str)]) -> Vec<ClusterInfoRow> {
        rows.iter()
            .map(|(id, rep)| {
                ClusterInfoRow::new(TopicId::from(*id), KeywordRepr::RawText((*rep).to_owned()))
            })
            .collect()
    }

    #[test]
    fn test_build_label_map_is_total() {
        let rows = info(&[
            (-1, "['app', 'order']"),
            (0, "['food', 'cold', 'driver']"),
            (1, "not a list at all"),
        ]);
        let map = build_label_map(&rows, &LabelMapOptions::default());

        assert_eq!(map.len(), 3);
        assert_eq!(
            map.sorted_ids(),
            vec![TopicId::NOISE, TopicId::from(0), TopicId::from(1)]
        );
        assert_eq!(
            map.get(&TopicId::NOISE).unwrap().to_string(),
            "app and order related issues"
        );
        assert_eq!(
            map.get(&TopicId::from(0)).unwrap().to_string(),
            "food, cold and driver related issues"
        );
        // parse failure recovers to the default, never a hard failure
        assert_eq!(map.get(&TopicId::from(1)).unwrap().to_string(), "general issues");
    }

    #[test]
    fn test_build_label_map_noise_override() {
        let rows = info(&[(-1, "['misc', 'stuff']"), (0, "['refund']")]);
        let options = LabelMapOptions {
            fallback: LabelFallback::PerTopic,
            noise_override: Some("other / outlier".to_owned()),
        };
        let map = build_label_map(&rows, &options);

        assert_eq!(map.get(&TopicId::NOISE).unwrap().to_string(), "other / outlier");
        assert_eq!(map.get(&TopicId::from(0)).unwrap().to_string(), "refund related issues");
    }

    #[test]
    fn test_build_label_map_per_topic_fallback() {
        let rows = info(&[(4, "[]")]);
        let options = LabelMapOptions {
            fallback: LabelFallback::PerTopic,
            noise_override: None,
        };
        let map = build_label_map(&rows, &options);
        assert_eq!(map.get(&TopicId::from(4)).unwrap().to_string(), "subtopic_4");
    }

    #[test]
    fn test_build_label_map_duplicate_last_wins() {
        let rows = info(&[(2, "['first']"), (2, "['second']")]);
        let map = build_label_map(&rows, &LabelMapOptions::default());
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&TopicId::from(2)).unwrap().to_string(), "second related issues");
    }

    #[test]
    fn test_build_label_map_rebuild_is_equal() {
        let rows = info(&[(-1, "['a']"), (0, "['b', 'c']")]);
        let options = LabelMapOptions::default();
        assert_eq!(
            build_label_map(&rows, &options),
            build_label_map(&rows, &options)
        );
    }

    fn assignments() -> Table {
        let mut t = Table::new(vec!["content".to_owned(), "topic".to_owned()]);
        t.push_row(vec!["cold food".to_owned(), "0".to_owned()]);
        t.push_row(vec!["rude driver".to_owned(), "1".to_owned()]);
        t.push_row(vec!["weird".to_owned(), "-1".to_owned()]);
        t.push_row(vec!["mystery".to_owned(), "99".to_owned()]);
        t.push_row(vec!["no topic".to_owned(), "".to_owned()]);
        t
    }

    #[test]
    fn test_apply_labels_preserves_order_and_count() {
        let mut table = assignments();
        let rows_before = table.rows().to_vec();

        let map = build_label_map(
            &info(&[(-1, "['misc']"), (0, "['food', 'cold']"), (1, "['driver']")]),
            &LabelMapOptions::default(),
        );
        apply_labels(&mut table, PAIN_POINT_COLUMN, &map, "general issues").unwrap();

        assert_eq!(table.len(), rows_before.len());
        let label_col = table.require_column(PAIN_POINT_COLUMN).unwrap();
        assert_eq!(table.value(0, label_col), "food and cold related issues");
        assert_eq!(table.value(1, label_col), "driver related issues");
        assert_eq!(table.value(2, label_col), "misc related issues");
        // id missing from the map and unparseable id both recover locally
        assert_eq!(table.value(3, label_col), "general issues");
        assert_eq!(table.value(4, label_col), "general issues");

        for (row, old) in table.rows().iter().zip(rows_before) {
            assert_eq!(&row[..old.len()], &old[..]);
        }
    }

    #[test]
    fn test_apply_labels_requires_topic_column() {
        let mut table = Table::new(vec!["content".to_owned()]);
        table.push_row(vec!["hello".to_owned()]);
        let err = apply_labels(&mut table, PAIN_POINT_COLUMN, &LabelMap::default(), "x")
            .unwrap_err();
        assert!(matches!(err, TableError::MissingColumn { .. }));
    }

    #[test]
    fn test_cluster_info_rows_from_table() {
        let mut t = Table::new(vec![
            "Topic".to_owned(),
            "Count".to_owned(),
            "Representation".to_owned(),
        ]);
        t.push_row(vec!["-1".to_owned(), "40".to_owned(), "['app', 'order']".to_owned()]);
        t.push_row(vec!["0".to_owned(), "25".to_owned(), "['food', 'cold']".to_owned()]);
        t.push_row(vec!["oops".to_owned(), "1".to_owned(), "['x']".to_owned()]);

        let rows = cluster_info_rows(&t).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, TopicId::NOISE);
        assert_eq!(rows[1].representation.keywords(), vec!["food", "cold"]);
    }
}
