use std::collections::HashMap;

use derive_more::{AsRef, Display, From, Into, IntoIterator};
use serde::{Deserialize, Serialize};

/// Numeric id of a topic within one clustering run.
///
/// Ids are only meaningful inside the run that produced them. In particular,
/// second-level (subtopic) ids are scoped to their parent topic: subtopic 3
/// under topic 2 and subtopic 3 under topic 7 are unrelated clusters that
/// happen to share a number. Never compare subtopic ids across parents.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    From,
    Into,
    Display,
    Serialize,
    Deserialize,
)]
pub struct TopicId(i64);

impl TopicId {
    /// The id reserved for records the clustering run could not assign
    /// to any discovered cluster.
    pub const NOISE: Self = TopicId(-1);

    /// If true... you guessed it... we're noise
    pub fn is_noise(&self) -> bool {
        *self == Self::NOISE
    }

    /// I can't believe it's not noise!
    pub fn is_signal(&self) -> bool {
        !self.is_noise()
    }

    /// Coerce a textual cell to a topic id.
    ///
    /// Topic columns round-tripped through CSV sometimes come back as floats
    /// ("2.0"), so integral floats are accepted. Anything else is treated as
    /// missing, not as an error.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        trimmed
            .parse::<i64>()
            .ok()
            .or_else(|| {
                trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.fract() == 0.0 && f.is_finite())
                    .map(|f| f as i64)
            })
            .map(TopicId)
    }
}

/// A short human-readable pain-point label.
#[derive(
    Default,
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Display,
    From,
    AsRef,
    Serialize,
    Deserialize,
)]
#[as_ref(str, String)]
#[serde(transparent)]
pub struct Label(String);

impl From<&str> for Label {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Total mapping from topic id to label for one clustering run.
///
/// "Total" is the operative word: every id reported by the run, including
/// [`TopicId::NOISE`], resolves to some label once the map is built.
#[derive(Debug, Clone, PartialEq, Default, From, Into, IntoIterator)]
pub struct LabelMap(HashMap<TopicId, Label>);

impl LabelMap {
    pub fn insert(&mut self, id: TopicId, label: Label) -> Option<Label> {
        self.0.insert(id, label)
    }

    pub fn get(&self, id: &TopicId) -> Option<&Label> {
        self.0.get(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Ids covered by the map, sorted ascending (noise first).
    pub fn sorted_ids(&self) -> Vec<TopicId> {
        let mut ids: Vec<TopicId> = self.0.keys().copied().collect();
        ids.sort();
        ids
    }
}

/// The keyword field of a cluster-info row, resolved once at ingestion.
///
/// A run executed in-process hands us an already-structured sequence; a run
/// read back from disk hands us the literal textual encoding of one (a
/// bracketed, comma-separated, quoted list). Both resolve through
/// [`KeywordRepr::keywords`]; a raw string that doesn't look like a list
/// resolves to no keywords at all, which callers turn into a fallback label.
#[derive(Debug, Clone, PartialEq, From)]
pub enum KeywordRepr {
    Structured(Vec<String>),
    RawText(String),
}

impl KeywordRepr {
    /// The ranked keywords, most representative first. Empty or
    /// whitespace-only entries are dropped.
    pub fn keywords(&self) -> Vec<String> {
        match self {
            Self::Structured(words) => words
                .iter()
                .map(|w| w.trim())
                .filter(|w| !w.is_empty())
                .map(str::to_owned)
                .collect(),
            Self::RawText(raw) => Self::parse_raw(raw),
        }
    }

    /// Crude but robust parse of a textual list encoding: require the outer
    /// brackets, split on commas, strip quotes. Anything that isn't
    /// bracket-delimited counts as a failed parse and yields no keywords.
    fn parse_raw(raw: &str) -> Vec<String> {
        let trimmed = raw.trim();
        let Some(inner) = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
        else {
            return Vec::new();
        };
        inner
            .split(',')
            .map(|w| w.trim().trim_matches(['\'', '"']).trim())
            .filter(|w| !w.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

/// One row of a clustering run's summary output: a cluster id and its
/// ranked keyword representation.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterInfoRow {
    pub id: TopicId,
    pub representation: KeywordRepr,
}

impl ClusterInfoRow {
    pub fn new<R>(id: TopicId, representation: R) -> Self
    where
        R: Into<KeywordRepr>,
    {
        Self {
            id,
            representation: representation.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_id_parse() {
        assert_eq!(TopicId::parse("2"), Some(TopicId::from(2)));
        assert_eq!(TopicId::parse(" -1 "), Some(TopicId::NOISE));
        assert_eq!(TopicId::parse("7.0"), Some(TopicId::from(7)));
        assert_eq!(TopicId::parse(""), None);
        assert_eq!(TopicId::parse("   "), None);
        assert_eq!(TopicId::parse("banana"), None);
        assert_eq!(TopicId::parse("2.5"), None);
        assert_eq!(TopicId::parse("NaN"), None);
    }

    #[test]
    fn test_topic_id_noise() {
        assert!(TopicId::NOISE.is_noise());
        assert!(!TopicId::NOISE.is_signal());
        assert!(TopicId::from(0).is_signal());
    }

    #[test]
    fn test_keyword_repr_structured() {
        let repr = KeywordRepr::Structured(vec![
            "food".to_owned(),
            "  ".to_owned(),
            "cold".to_owned(),
        ]);
        assert_eq!(repr.keywords(), vec!["food", "cold"]);
    }

    #[test]
    fn test_keyword_repr_raw_list() {
        let repr = KeywordRepr::RawText("['food', 'cold', 'driver', 'late']".to_owned());
        assert_eq!(repr.keywords(), vec!["food", "cold", "driver", "late"]);
    }

    #[test]
    fn test_keyword_repr_raw_double_quoted() {
        let repr = KeywordRepr::RawText(r#"["refund", "support"]"#.to_owned());
        assert_eq!(repr.keywords(), vec!["refund", "support"]);
    }

    #[test]
    fn test_keyword_repr_raw_empty_list() {
        let repr = KeywordRepr::RawText("[]".to_owned());
        assert!(repr.keywords().is_empty());
    }

    #[test]
    fn test_keyword_repr_raw_not_a_list() {
        let repr = KeywordRepr::RawText("general chatter".to_owned());
        assert!(repr.keywords().is_empty());
    }

    #[test]
    fn test_label_map_sorted_ids() {
        let mut map = LabelMap::default();
        map.insert(TopicId::from(3), "three".into());
        map.insert(TopicId::NOISE, "noise".into());
        map.insert(TopicId::from(0), "zero".into());
        assert_eq!(
            map.sorted_ids(),
            vec![TopicId::NOISE, TopicId::from(0), TopicId::from(3)]
        );
    }
}
