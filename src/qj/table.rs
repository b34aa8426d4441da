use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};
use log::warn;
use thiserror::Error;

use super::model::TopicId;

/// Errors from reading, writing, or reshaping a [`Table`].
#[derive(Debug, Error)]
pub enum TableError {
    #[error("expected a column named one of {wanted:?}, but found columns: {found:?}")]
    MissingColumn {
        wanted: Vec<String>,
        found: Vec<String>,
    },

    #[error("column '{name}' has {got} values but the table has {expected} rows")]
    ColumnLength {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to flush {path}")]
    Flush {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// An in-memory delimited table: one header row plus string cells.
///
/// Columns are carried verbatim so that a pass can add its own columns
/// without knowing (or damaging) whatever else the upstream scripts put in
/// the file. Typed access happens at the call site via [`Table::topic_at`]
/// and friends, not at parse time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Read a whole CSV file into memory. UTF-8, one header row.
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let path = path.as_ref();
        let wrap = |source| TableError::Read {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(wrap)?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(wrap)?
            .iter()
            .map(str::to_owned)
            .collect();

        let mut rows = Vec::new();
        let mut truncated = 0usize;
        for record in reader.records() {
            let record = record.map_err(wrap)?;
            let mut row: Vec<String> = record.iter().map(str::to_owned).collect();
            // Ragged rows are normalized to the header rather than
            // rejected; short rows do show up in hand-edited exports.
            // Short rows are padded, long rows lose their headerless tail.
            if row.len() > headers.len() {
                truncated += 1;
            }
            row.resize(headers.len(), String::new());
            rows.push(row);
        }
        if truncated > 0 {
            warn!(
                "{truncated} rows in {} had more cells than the header; dropped the extras",
                path.display()
            );
        }

        Ok(Self { headers, rows })
    }

    /// Write the table as UTF-8 CSV: one header row, no synthetic row index.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), TableError> {
        let path = path.as_ref();
        let wrap = |source| TableError::Write {
            path: path.to_path_buf(),
            source,
        };

        let mut writer = WriterBuilder::new().from_path(path).map_err(wrap)?;
        writer.write_record(&self.headers).map_err(wrap)?;
        for row in &self.rows {
            writer.write_record(row).map_err(wrap)?;
        }
        writer.flush().map_err(|source| TableError::Flush {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        debug_assert_eq!(row.len(), self.headers.len());
        self.rows.push(row);
    }

    /// Index of the named column, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Index of the first present column among `names`.
    ///
    /// Topic assignment files in the wild carry either `topic` or `Topic`,
    /// so lookups take the candidates in preference order.
    pub fn require_column_any(&self, names: &[&str]) -> Result<usize, TableError> {
        names
            .iter()
            .find_map(|name| self.column_index(name))
            .ok_or_else(|| TableError::MissingColumn {
                wanted: names.iter().map(|n| (*n).to_owned()).collect(),
                found: self.headers.clone(),
            })
    }

    pub fn require_column(&self, name: &str) -> Result<usize, TableError> {
        self.require_column_any(&[name])
    }

    /// Cell value at (row, column). Out-of-range columns read as empty,
    /// matching the padding behavior of [`Table::read_csv`].
    pub fn value(&self, row: usize, col: usize) -> &str {
        self.rows[row].get(col).map(String::as_str).unwrap_or("")
    }

    /// Topic id of a row, coerced from text. Unparseable cells are missing,
    /// never an error; they're excluded from any target-id match.
    pub fn topic_at(&self, row: usize, topic_col: usize) -> Option<TopicId> {
        TopicId::parse(self.value(row, topic_col))
    }

    /// Append one column. The whole pass is a map over rows, so the new
    /// column must cover every row exactly once.
    pub fn add_column(&mut self, name: &str, values: Vec<String>) -> Result<(), TableError> {
        if values.len() != self.rows.len() {
            return Err(TableError::ColumnLength {
                name: name.to_owned(),
                expected: self.rows.len(),
                got: values.len(),
            });
        }
        self.headers.push(name.to_owned());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs::read_to_string;

    use tempfile::tempdir;

    use super::*;

    fn sample() -> Table {
        let mut t = Table::new(vec![
            "content".to_owned(),
            "score".to_owned(),
            "topic".to_owned(),
        ]);
        t.push_row(vec!["cold food".to_owned(), "1".to_owned(), "2".to_owned()]);
        t.push_row(vec!["app crashed".to_owned(), "2".to_owned(), "-1".to_owned()]);
        t.push_row(vec!["late, again".to_owned(), "1".to_owned(), "".to_owned()]);
        t
    }

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let table = sample();
        table.write_csv(&path).unwrap();
        let back = Table::read_csv(&path).unwrap();

        assert_eq!(back, table);
    }

    #[test]
    fn test_write_has_no_index_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");

        sample().write_csv(&path).unwrap();
        let text = read_to_string(&path).unwrap();
        assert!(text.starts_with("content,score,topic"));
    }

    #[test]
    fn test_column_lookup() {
        let table = sample();
        assert_eq!(table.column_index("score"), Some(1));
        assert_eq!(table.column_index("Score"), None);
        assert!(table.require_column_any(&["Topic", "topic"]).is_ok());

        let err = table.require_column("pain_point_label").unwrap_err();
        assert!(matches!(err, TableError::MissingColumn { .. }));
    }

    #[test]
    fn test_topic_coercion() {
        let table = sample();
        let topic_col = table.require_column("topic").unwrap();
        assert_eq!(table.topic_at(0, topic_col), Some(TopicId::from(2)));
        assert_eq!(table.topic_at(1, topic_col), Some(TopicId::NOISE));
        assert_eq!(table.topic_at(2, topic_col), None);
    }

    #[test]
    fn test_add_column_preserves_rows() {
        let mut table = sample();
        let before: Vec<Vec<String>> = table.rows().to_vec();

        table
            .add_column("label", vec!["a".to_owned(), "b".to_owned(), "c".to_owned()])
            .unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.headers().last().map(String::as_str), Some("label"));
        for (row, old) in table.rows().iter().zip(before) {
            assert_eq!(&row[..old.len()], &old[..]);
        }
    }

    #[test]
    fn test_add_column_length_mismatch() {
        let mut table = sample();
        let err = table
            .add_column("label", vec!["only one".to_owned()])
            .unwrap_err();
        assert!(matches!(err, TableError::ColumnLength { .. }));
    }

    #[test]
    fn test_ragged_rows_are_padded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ragged.csv");
        std::fs::write(&path, "a,b,c\n1,2\n4,5,6\n").unwrap();

        let table = Table::read_csv(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.value(0, 2), "");
        assert_eq!(table.value(1, 2), "6");
    }

    #[test]
    fn test_overlong_rows_keep_header_cells_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wide.csv");
        std::fs::write(&path, "a,b\n1,2,3,4\n5,6\n").unwrap();

        let table = Table::read_csv(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.headers(), ["a", "b"]);
        assert_eq!(table.rows()[0], vec!["1".to_owned(), "2".to_owned()]);
        assert_eq!(table.rows()[1], vec!["5".to_owned(), "6".to_owned()]);
    }
}
