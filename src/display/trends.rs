use std::collections::HashMap;
use std::fmt::Display;

use derive_more::{Display as DisplayDerive, IntoIterator};
use log::warn;
use regex::Regex;

use crate::qj::table::{Table, TableError};

/// A calendar month bucket, parsed from the leading `YYYY-MM` of a
/// timestamp cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, DisplayDerive)]
#[display("{year:04}-{month:02}")]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    /// Parse the month out of a timestamp cell ("2024-03-12 10:33:00" →
    /// 2024-03). Anything without a leading `YYYY-MM`, or with a month
    /// outside 1..=12, is treated as missing.
    pub fn parse(raw: &str) -> Option<Self> {
        let re = Regex::new(r"^(\d{4})-(\d{2})").expect("Failed to compile regex!");
        let captures = re.captures(raw.trim())?;
        let year: i32 = captures[1].parse().ok()?;
        let month: u32 = captures[2].parse().ok()?;
        (1..=12).contains(&month).then_some(Self { year, month })
    }
}

/// Monthly prevalence of each label: how many reviews per (month, label)
/// pair, ordered by month then label.
#[derive(Debug, Clone, PartialEq, IntoIterator)]
pub struct MonthlyCounts {
    label_column: String,
    #[into_iterator(owned, ref)]
    counts: Vec<(Month, String, usize)>,
}

impl MonthlyCounts {
    /// Bucket every row by the month of its timestamp cell and count
    /// distinct values of `label_column` per bucket. Rows whose timestamp
    /// doesn't yield a month are dropped with a notice, the same way the
    /// prevalence pass keeps going past bad rows.
    pub fn from_columns(
        table: &Table,
        timestamp_column: &str,
        label_column: &str,
    ) -> Result<Self, TableError> {
        let ts_col = table.require_column(timestamp_column)?;
        let label_col = table.require_column(label_column)?;

        let mut buckets: HashMap<(Month, &str), usize> = HashMap::new();
        let mut dropped = 0usize;
        for row in 0..table.len() {
            let Some(month) = Month::parse(table.value(row, ts_col)) else {
                dropped += 1;
                continue;
            };
            *buckets.entry((month, table.value(row, label_col))).or_default() += 1;
        }
        if dropped > 0 {
            warn!(
                "dropped {dropped} of {} rows with unparseable '{timestamp_column}' values",
                table.len()
            );
        }

        let mut counts: Vec<(Month, String, usize)> = buckets
            .into_iter()
            .map(|((month, label), n)| (month, label.to_owned(), n))
            .collect();
        counts.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        Ok(Self {
            label_column: label_column.to_owned(),
            counts,
        })
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// The counts as a writable trends table: month, label, count.
    pub fn to_table(&self) -> Table {
        let mut table = Table::new(vec![
            "month".to_owned(),
            self.label_column.clone(),
            "count".to_owned(),
        ]);
        for (month, label, n) in &self.counts {
            table.push_row(vec![month.to_string(), label.clone(), n.to_string()]);
        }
        table
    }
}

impl Display for MonthlyCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "monthly {} counts:", self.label_column)?;
        for (month, label, n) in &self.counts {
            let shown = if label.is_empty() { "(unlabeled)" } else { label };
            writeln!(f, "  {month}  {n:>7}  {shown}")?;
        }
        write!(f, "")
    }
}
