//! Declarative schema mapping
//!
//! The instrument exports name their columns inconsistently (sheet-title
//! headers, blank headers, localized labels), so every source workflow
//! carried its own renaming block. Here the mapping from source columns to
//! canonical fields is one declarative [`SchemaMap`], resolved against the
//! header row once, before any data row is read.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// How to find one canonical field in the source table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnSelector {
    /// Match a header cell (trimmed, case-insensitive)
    Name(String),
    /// Zero-based column position
    Index(usize),
}

impl ColumnSelector {
    fn resolve(&self, headers: &[String]) -> Option<usize> {
        match self {
            ColumnSelector::Name(name) => headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name.trim())),
            ColumnSelector::Index(idx) if *idx < headers.len() => Some(*idx),
            ColumnSelector::Index(_) => None,
        }
    }
}

/// Mapping from source columns to the canonical record fields.
///
/// `date`, `time` and `animal` are required; the metric columns are probed
/// and simply absent from every record when unresolved. Energy expenditure
/// additionally carries an explicit positional fallback, a convention of the
/// merged exports where the column exists but its header cell is blank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaMap {
    pub date: ColumnSelector,
    pub time: ColumnSelector,
    pub animal: ColumnSelector,
    pub rer: Option<ColumnSelector>,
    pub activity: Option<ColumnSelector>,
    pub feed: Option<ColumnSelector>,
    pub vo2: Option<ColumnSelector>,
    pub energy: Option<ColumnSelector>,
    /// Used for energy expenditure when `energy` resolves to nothing and the
    /// table is wide enough
    pub energy_fallback_index: Option<usize>,
}

impl Default for SchemaMap {
    fn default() -> Self {
        Self {
            date: ColumnSelector::Name("Date".to_string()),
            time: ColumnSelector::Name("Time".to_string()),
            animal: ColumnSelector::Name("Animal".to_string()),
            rer: Some(ColumnSelector::Name("RER".to_string())),
            activity: Some(ColumnSelector::Name("XT+YT".to_string())),
            feed: Some(ColumnSelector::Name("Feed".to_string())),
            vo2: Some(ColumnSelector::Name("VO2(1)".to_string())),
            energy: Some(ColumnSelector::Name("EE".to_string())),
            energy_fallback_index: Some(16),
        }
    }
}

impl SchemaMap {
    /// Positional mapping for the merged calorimetry export, whose header row
    /// repeats the sheet title and leaves most metric headers blank.
    pub fn merged_export() -> Self {
        Self {
            date: ColumnSelector::Index(0),
            time: ColumnSelector::Index(1),
            animal: ColumnSelector::Index(2),
            rer: Some(ColumnSelector::Index(13)),
            activity: Some(ColumnSelector::Index(14)),
            feed: Some(ColumnSelector::Index(15)),
            vo2: Some(ColumnSelector::Name("VO2(1)".to_string())),
            energy: Some(ColumnSelector::Index(16)),
            energy_fallback_index: Some(16),
        }
    }

    /// Resolve the mapping against a header row.
    pub(crate) fn resolve(&self, headers: &[String]) -> Result<ResolvedSchema, PipelineError> {
        let date = self
            .date
            .resolve(headers)
            .ok_or_else(|| PipelineError::MissingColumn("date".to_string()))?;
        let time = self
            .time
            .resolve(headers)
            .ok_or_else(|| PipelineError::MissingColumn("time".to_string()))?;
        let animal = self
            .animal
            .resolve(headers)
            .ok_or_else(|| PipelineError::MissingColumn("animal".to_string()))?;

        let resolve_opt = |sel: &Option<ColumnSelector>| sel.as_ref().and_then(|s| s.resolve(headers));

        let energy = resolve_opt(&self.energy).or_else(|| {
            self.energy_fallback_index
                .filter(|idx| *idx < headers.len())
        });

        Ok(ResolvedSchema {
            date,
            time,
            animal,
            rer: resolve_opt(&self.rer),
            activity: resolve_opt(&self.activity),
            feed: resolve_opt(&self.feed),
            vo2: resolve_opt(&self.vo2),
            energy,
        })
    }
}

/// Column indices after resolving a [`SchemaMap`] against one header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedSchema {
    pub date: usize,
    pub time: usize,
    pub animal: usize,
    pub rer: Option<usize>,
    pub activity: Option<usize>,
    pub feed: Option<usize>,
    pub vo2: Option<usize>,
    pub energy: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_resolve_by_name_is_case_insensitive() {
        let schema = SchemaMap::default();
        let resolved = schema
            .resolve(&headers(&["date", " TIME ", "animal", "rer"]))
            .unwrap();
        assert_eq!(resolved.date, 0);
        assert_eq!(resolved.time, 1);
        assert_eq!(resolved.animal, 2);
        assert_eq!(resolved.rer, Some(3));
    }

    #[test]
    fn test_missing_required_column_is_fatal() {
        let schema = SchemaMap::default();
        let err = schema
            .resolve(&headers(&["Date", "Time", "RER"]))
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn(ref c) if c == "animal"));
    }

    #[test]
    fn test_missing_optional_column_resolves_to_none() {
        let schema = SchemaMap::default();
        let resolved = schema
            .resolve(&headers(&["Date", "Time", "Animal"]))
            .unwrap();
        assert_eq!(resolved.rer, None);
        assert_eq!(resolved.feed, None);
        // Table too narrow for the positional fallback as well
        assert_eq!(resolved.energy, None);
    }

    #[test]
    fn test_energy_positional_fallback() {
        // 17 columns, none of them named EE: energy falls back to index 16
        let mut names: Vec<String> = (0..17).map(|i| format!("col{i}")).collect();
        names[0] = "Date".to_string();
        names[1] = "Time".to_string();
        names[2] = "Animal".to_string();
        let resolved = SchemaMap::default().resolve(&names).unwrap();
        assert_eq!(resolved.energy, Some(16));
    }

    #[test]
    fn test_named_energy_wins_over_fallback() {
        let resolved = SchemaMap::default()
            .resolve(&headers(&[
                "Date", "Time", "Animal", "EE", "a", "b", "c", "d", "e", "f", "g", "h", "i",
                "j", "k", "l", "m",
            ]))
            .unwrap();
        assert_eq!(resolved.energy, Some(3));
    }

    #[test]
    fn test_index_selector_out_of_range() {
        let schema = SchemaMap::merged_export();
        // Only three columns: the positional metric selectors resolve to None
        let resolved = schema.resolve(&headers(&["x", "y", "z"])).unwrap();
        assert_eq!(resolved.rer, None);
        assert_eq!(resolved.energy, None);
    }
}
