//! Fuzzy Column Matcher
//!
//! Scores column names from every CSV dataset in the workspace against a
//! query string, or against a fixed table of domain naming patterns.
//! Headers are read through the shared [`HeaderCache`].

use crate::header_cache::HeaderCache;
use crate::similarity::ratio;
use crate::workspace::DiscoveredDataset;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Domain patterns and the column spellings that count as each
pub const PATTERN_MAPPINGS: &[(&str, &[&str])] = &[
    (
        "cell_line",
        &["cell_line", "cellline", "cell_line_name", "cell_line_id", "cellline_name", "cell"],
    ),
    (
        "drug",
        &["drug", "compound", "treatment", "agent", "drug_name", "compound_name", "name"],
    ),
    (
        "dose",
        &["dose", "concentration", "dosage", "amount", "conc", "ic50", "ec50"],
    ),
    (
        "time",
        &["time", "duration", "hours", "days", "timepoint", "time_point"],
    ),
    (
        "viability",
        &["viability", "response", "effect", "inhibition", "survival", "auc"],
    ),
    (
        "gene",
        &["gene", "gene_symbol", "gene_name", "target", "gene_id", "symbol"],
    ),
    (
        "expression",
        &["expression", "fpkm", "tpm", "counts", "read_count", "value"],
    ),
];

/// A column similar to an ad-hoc query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMatch {
    pub dataset: String,
    pub column: String,
    pub full_path: String,
    pub similarity_score: u8,
}

/// A column that looks like one of the domain patterns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMatch {
    pub dataset: String,
    pub column: String,
    pub similarity: u8,
}

/// Pattern name to every qualifying hit, in first-hit order
pub type ColumnPatterns = IndexMap<String, Vec<PatternMatch>>;

pub struct ColumnMatcher<'a> {
    cache: &'a HeaderCache,
    pattern_threshold: i64,
}

impl<'a> ColumnMatcher<'a> {
    pub fn new(cache: &'a HeaderCache, pattern_threshold: i64) -> Self {
        Self {
            cache,
            pattern_threshold,
        }
    }

    /// Every (dataset, column) pair in discovery order.
    fn known_columns(&self) -> Vec<(DiscoveredDataset, String)> {
        let mut columns = Vec::new();
        for dataset in self.cache.workspace().discover_csv() {
            let Some(headers) = self.cache.get_headers(&dataset.relative_path) else {
                continue;
            };
            for column in headers {
                columns.push((dataset.clone(), column));
            }
        }
        columns
    }

    /// Columns scoring at least `threshold` against `target`, best first.
    /// Equal scores keep discovery order.
    pub fn find_similar_columns(&self, target: &str, threshold: i64) -> Vec<ColumnMatch> {
        let mut matches: Vec<ColumnMatch> = self
            .known_columns()
            .into_iter()
            .filter_map(|(dataset, column)| {
                let score = ratio(target, &column);
                (i64::from(score) >= threshold).then(|| ColumnMatch {
                    dataset: dataset.name,
                    full_path: dataset.full_path.to_string_lossy().to_string(),
                    column,
                    similarity_score: score,
                })
            })
            .collect();

        matches.sort_by(|a, b| b.similarity_score.cmp(&a.similarity_score));
        debug!("{} column(s) similar to '{}' at >= {}", matches.len(), target, threshold);
        matches
    }

    /// Bucket every column under each pattern it resembles. A column can
    /// land under several patterns, and once per matching variant.
    pub fn get_column_patterns(&self) -> ColumnPatterns {
        let mut patterns = ColumnPatterns::new();

        for (dataset, column) in self.known_columns() {
            for (pattern, variants) in PATTERN_MAPPINGS {
                for variant in *variants {
                    let score = ratio(variant, &column);
                    if i64::from(score) < self.pattern_threshold {
                        continue;
                    }
                    patterns
                        .entry(pattern.to_string())
                        .or_default()
                        .push(PatternMatch {
                            dataset: dataset.name.clone(),
                            column: column.clone(),
                            similarity: score,
                        });
                }
            }
        }

        patterns
    }
}
