use std::fmt::Display;

use derive_more::IntoIterator;

use crate::qj::table::{Table, TableError};

/// Per-label prevalence counts for one labeled table column, most common
/// first.
#[derive(Debug, Clone, PartialEq, IntoIterator)]
pub struct LabelCounts {
    column: String,
    #[into_iterator(owned, ref)]
    counts: Vec<(String, usize)>,
}

impl LabelCounts {
    /// Count distinct values of `column` across the whole table. Ties are
    /// broken alphabetically so the ordering is stable.
    pub fn from_column(table: &Table, column: &str) -> Result<Self, TableError> {
        let col = table.require_column(column)?;

        let mut counts: std::collections::HashMap<&str, usize> = Default::default();
        for row in 0..table.len() {
            *counts.entry(table.value(row, col)).or_default() += 1;
        }

        let mut counts: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(label, n)| (label.to_owned(), n))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Ok(Self {
            column: column.to_owned(),
            counts,
        })
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, n)| n).sum()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// The counts as a writable stats table: label, count, percent.
    pub fn to_table(&self) -> Table {
        let total = self.total().max(1) as f64;
        let mut table = Table::new(vec![
            self.column.clone(),
            "count".to_owned(),
            "percent".to_owned(),
        ]);
        for (label, n) in &self.counts {
            table.push_row(vec![
                label.clone(),
                n.to_string(),
                format!("{:.2}", *n as f64 / total * 100.0),
            ]);
        }
        table
    }
}

impl Display for LabelCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} counts ({} rows):", self.column, self.total())?;
        for (label, n) in &self.counts {
            let shown = if label.is_empty() { "(unlabeled)" } else { label };
            writeln!(f, "  {:>7}  {}", n, shown)?;
        }
        write!(f, "")
    }
}
