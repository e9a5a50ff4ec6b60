//! Dataset Summary Builder
//!
//! Two independent passes over a dataset:
//!
//! 1. A streaming pass in bounded chunks that accumulates row count, memory
//!    estimate, null counts and duplicate rows. Duplicates are detected within
//!    a chunk only; identical rows that land in different chunks are not
//!    counted. Column type labels come from the last chunk read.
//! 2. A fresh read of the leading `sample_rows` rows that feeds the numeric
//!    and categorical statistics. Those statistics describe the sample, not
//!    the whole file; `sample_rows` in the result says how many rows they
//!    cover.

use crate::config::ToolkitConfig;
use crate::error::{DatasetError, Result};
use crate::frame::{chunk_to_frame, duplicated_row_count};
use crate::header_cache::HeaderCache;
use crate::table::{read_excel, read_head, Chunk, ColumnType, CsvChunkReader};
use crate::workspace::DatasetFormat;
use indexmap::IndexMap;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const TOP_VALUES: usize = 5;
const COUNT_COLUMN: &str = "__value_count";

/// Descriptive statistics of one numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub p25: Option<f64>,
    #[serde(rename = "50%")]
    pub p50: Option<f64>,
    #[serde(rename = "75%")]
    pub p75: Option<f64>,
    pub max: Option<f64>,
}

impl NumericStats {
    /// Describe a numeric series. Nulls are skipped; `std` uses one degree of
    /// freedom and quantiles interpolate linearly.
    pub fn from_series(series: &Series) -> Result<Self> {
        let values = series.cast(&DataType::Float64)?;
        let values = values.f64()?;
        let count = values.len() - values.null_count();
        let quantile = |q: f64| values.quantile(q, QuantileInterpolOptions::Linear);

        Ok(Self {
            count,
            mean: values.mean(),
            std: if count > 1 { values.std(1) } else { None },
            min: values.min(),
            p25: quantile(0.25)?,
            p50: quantile(0.5)?,
            p75: quantile(0.75)?,
            max: values.max(),
        })
    }
}

/// Frequency profile of one non-numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalStats {
    pub unique_count: usize,
    pub top_values: IndexMap<String, usize>,
}

impl CategoricalStats {
    /// Value counts of a text column, most frequent first. Equal counts keep
    /// first-seen order.
    pub fn from_series(series: &Series) -> Result<Self> {
        let name = series.name();
        let counts = DataFrame::new(vec![series.cast(&DataType::String)?])?
            .lazy()
            .filter(col(name).is_not_null())
            .group_by_stable([col(name)])
            .agg([len().alias(COUNT_COLUMN)])
            .sort_by_exprs(
                vec![col(COUNT_COLUMN)],
                SortMultipleOptions::default()
                    .with_order_descending(true)
                    .with_maintain_order(true),
            )
            .collect()?;

        let values = counts.column(name)?.str()?;
        let totals = counts.column(COUNT_COLUMN)?.cast(&DataType::UInt64)?;
        let top_values = values
            .into_iter()
            .zip(totals.u64()?.into_iter())
            .take(TOP_VALUES)
            .filter_map(|(value, count)| Some((value?.to_string(), count? as usize)))
            .collect();

        Ok(Self {
            unique_count: counts.height(),
            top_values,
        })
    }
}

/// Structural and statistical overview of one dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub file_path: String,
    pub columns: Vec<String>,
    pub shape: (usize, usize),
    pub memory_usage: u64,
    pub null_counts: IndexMap<String, usize>,
    pub null_percentages: IndexMap<String, Option<f64>>,
    pub duplicated_rows: usize,
    pub dtypes: IndexMap<String, String>,
    pub sample_rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_summary: Option<IndexMap<String, NumericStats>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categorical_summary: Option<IndexMap<String, CategoricalStats>>,
}

/// Running totals of the streaming pass
struct ChunkTotals {
    rows: usize,
    memory: u64,
    nulls: IndexMap<String, usize>,
    duplicated: usize,
    last_types: Option<Vec<(String, ColumnType)>>,
    chunks: usize,
}

impl ChunkTotals {
    fn new() -> Self {
        Self {
            rows: 0,
            memory: 0,
            nulls: IndexMap::new(),
            duplicated: 0,
            last_types: None,
            chunks: 0,
        }
    }

    fn add(&mut self, chunk: &Chunk) -> Result<()> {
        let df = chunk_to_frame(chunk)?;
        self.rows += df.height();
        self.memory += chunk.memory_usage();
        for series in df.get_columns() {
            *self.nulls.entry(series.name().to_string()).or_insert(0) += series.null_count();
        }
        self.duplicated += duplicated_row_count(&df)?;
        self.last_types = Some(
            chunk
                .columns()
                .iter()
                .cloned()
                .zip(chunk.types().iter().copied())
                .collect(),
        );
        self.chunks += 1;
        Ok(())
    }
}

/// Round half to even at two decimals.
fn round2(v: f64) -> f64 {
    (v * 100.0).round_ties_even() / 100.0
}

pub struct SummaryBuilder {
    chunk_rows: usize,
    sample_rows: usize,
}

impl SummaryBuilder {
    pub fn new(config: &ToolkitConfig) -> Self {
        Self {
            chunk_rows: config.chunk_rows.max(1),
            sample_rows: config.sample_rows,
        }
    }

    pub fn build(&self, cache: &HeaderCache, path: &str) -> Result<DatasetSummary> {
        let (full_path, format) = cache.workspace().locate(path)?;
        let headers = cache.get_headers(path).ok_or(DatasetError::HeaderReadFailure)?;

        let mut totals = ChunkTotals::new();
        match format {
            DatasetFormat::Csv => {
                for chunk in CsvChunkReader::open(&full_path, self.chunk_rows)? {
                    totals.add(&chunk?)?;
                }
            }
            DatasetFormat::Excel => totals.add(&read_excel(&full_path, None)?)?,
        }
        debug!("Streamed {} chunk(s) from {}", totals.chunks, path);

        let n_rows = totals.rows;
        let null_counts = if totals.nulls.is_empty() {
            headers.iter().map(|h| (h.clone(), 0)).collect()
        } else {
            totals.nulls
        };
        let null_percentages = null_counts
            .iter()
            .map(|(name, nulls)| {
                let pct = (n_rows > 0).then(|| round2(*nulls as f64 / n_rows as f64 * 100.0));
                (name.clone(), pct)
            })
            .collect();
        let dtypes = match totals.last_types {
            Some(types) => types
                .into_iter()
                .map(|(name, ty)| (name, ty.as_str().to_string()))
                .collect(),
            None => headers
                .iter()
                .map(|h| (h.clone(), ColumnType::Object.as_str().to_string()))
                .collect(),
        };

        let sample = read_head(&full_path, format, self.sample_rows)?;
        let (numeric_summary, categorical_summary) = sample_statistics(&sample)?;

        info!(
            "Summarized {}: {} rows x {} columns, {} duplicated",
            path,
            n_rows,
            headers.len(),
            totals.duplicated
        );

        Ok(DatasetSummary {
            file_path: path.to_string(),
            shape: (n_rows, headers.len()),
            columns: headers,
            memory_usage: totals.memory,
            null_counts,
            null_percentages,
            duplicated_rows: totals.duplicated,
            dtypes,
            sample_rows: sample.len(),
            numeric_summary,
            categorical_summary,
        })
    }
}

type SampleStatistics = (
    Option<IndexMap<String, NumericStats>>,
    Option<IndexMap<String, CategoricalStats>>,
);

fn sample_statistics(sample: &Chunk) -> Result<SampleStatistics> {
    let df = chunk_to_frame(sample)?;
    let mut numeric = IndexMap::new();
    let mut categorical = IndexMap::new();

    for (series, ty) in df.get_columns().iter().zip(sample.types()) {
        match ty {
            t if t.is_numeric() => {
                numeric.insert(series.name().to_string(), NumericStats::from_series(series)?);
            }
            ColumnType::Object => {
                categorical.insert(series.name().to_string(), CategoricalStats::from_series(series)?);
            }
            _ => {}
        }
    }

    Ok((
        (!numeric.is_empty()).then_some(numeric),
        (!categorical.is_empty()).then_some(categorical),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::Workspace;
    use std::fs;

    fn setup(files: &[(&str, &str)]) -> (tempfile::TempDir, HeaderCache) {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in files {
            fs::write(dir.path().join(name), body).unwrap();
        }
        let cache = HeaderCache::new(Workspace::new(dir.path()));
        (dir, cache)
    }

    fn builder(chunk_rows: usize, sample_rows: usize) -> SummaryBuilder {
        let config = ToolkitConfig::new("unused")
            .with_chunk_rows(chunk_rows)
            .with_sample_rows(sample_rows);
        SummaryBuilder::new(&config)
    }

    #[test]
    fn test_numeric_stats() {
        let stats = NumericStats::from_series(&Series::new("n", &[4i64, 1, 3, 2])).unwrap();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean, Some(2.5));
        assert_eq!(stats.min, Some(1.0));
        assert_eq!(stats.p25, Some(1.75));
        assert_eq!(stats.p50, Some(2.5));
        assert_eq!(stats.p75, Some(3.25));
        assert_eq!(stats.max, Some(4.0));
        let std = stats.std.unwrap();
        assert!((std - 1.2909944487358056).abs() < 1e-12);

        let single = NumericStats::from_series(&Series::new("n", &[Some(7.0), None])).unwrap();
        assert_eq!(single.count, 1);
        assert_eq!(single.std, None);
        assert_eq!(single.p75, Some(7.0));

        let none = NumericStats::from_series(&Series::new("n", &[None::<f64>, None])).unwrap();
        assert_eq!(none.count, 0);
        assert_eq!(none.mean, None);
        assert_eq!(none.p50, None);
    }

    #[test]
    fn test_categorical_top_values_order() {
        let values = [
            Some("b"), Some("a"), Some("b"), Some("c"), Some("a"),
            Some("d"), Some("e"), Some("f"), None, Some("b"),
        ];
        let stats = CategoricalStats::from_series(&Series::new("s", &values)).unwrap();
        assert_eq!(stats.unique_count, 6);
        let keys: Vec<&str> = stats.top_values.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "a", "c", "d", "e"]);
        assert_eq!(stats.top_values["b"], 3);
        assert_eq!(stats.top_values["a"], 2);
    }

    #[test]
    fn test_round_half_even() {
        assert_eq!(round2(33.333333), 33.33);
        assert_eq!(round2(50.0), 50.0);
        assert_eq!(round2(66.666666), 66.67);
    }

    #[test]
    fn test_duplicates_across_chunks_are_not_detected() {
        let (_dir, cache) = setup(&[("d.csv", "a,b\n1,x\n2,y\n1,x\n1,x\n")]);

        let whole = builder(10, 1000).build(&cache, "d.csv").unwrap();
        assert_eq!(whole.duplicated_rows, 2);

        // chunks: [1x,2y] [1x,1x] -> only the repeat inside the second chunk
        let chunked = builder(2, 1000).build(&cache, "d.csv").unwrap();
        assert_eq!(chunked.duplicated_rows, 1);
        assert_eq!(chunked.shape, (4, 2));
    }

    #[test]
    fn test_dtypes_come_from_last_chunk() {
        let (_dir, cache) = setup(&[("d.csv", "v\n1\n2\nabc\n")]);
        let summary = builder(2, 1000).build(&cache, "d.csv").unwrap();
        assert_eq!(summary.dtypes["v"], "object");

        let (_dir2, cache2) = setup(&[("d.csv", "v\nabc\n1\n2\n")]);
        let summary = builder(1, 1000).build(&cache2, "d.csv").unwrap();
        assert_eq!(summary.dtypes["v"], "int64");
    }

    #[test]
    fn test_statistics_use_sample_only() {
        let (_dir, cache) = setup(&[("d.csv", "n,s\n1,a\n2,a\n3,b\n100,c\n")]);
        let summary = builder(10, 2).build(&cache, "d.csv").unwrap();

        assert_eq!(summary.shape, (4, 2));
        assert_eq!(summary.sample_rows, 2);
        let numeric = summary.numeric_summary.unwrap();
        assert_eq!(numeric["n"].count, 2);
        assert_eq!(numeric["n"].max, Some(2.0));
        let categorical = summary.categorical_summary.unwrap();
        assert_eq!(categorical["s"].unique_count, 1);
        assert_eq!(categorical["s"].top_values["a"], 2);
    }

    #[test]
    fn test_null_percentages() {
        let (_dir, cache) = setup(&[("d.csv", "a,b\n1,\n,\n3,x\n")]);
        let summary = builder(10, 1000).build(&cache, "d.csv").unwrap();

        assert_eq!(summary.null_counts["a"], 1);
        assert_eq!(summary.null_counts["b"], 2);
        assert_eq!(summary.null_percentages["a"], Some(33.33));
        assert_eq!(summary.null_percentages["b"], Some(66.67));
    }

    #[test]
    fn test_renamed_duplicate_headers_stay_distinct() {
        let (_dir, cache) = setup(&[("d.csv", "a,a.1,a\n1,,3\n4,5,\n")]);
        let summary = builder(10, 1000).build(&cache, "d.csv").unwrap();

        assert_eq!(summary.columns, vec!["a", "a.1", "a.1.1"]);
        assert_eq!(summary.shape, (2, 3));
        assert_eq!(summary.null_counts.len(), 3);
        assert_eq!(summary.dtypes.len(), 3);
        assert_eq!(summary.null_counts["a.1"], 1);
        assert_eq!(summary.null_counts["a.1.1"], 1);
        let numeric = summary.numeric_summary.unwrap();
        assert_eq!(numeric["a.1"].max, Some(5.0));
    }

    #[test]
    fn test_header_only_file() {
        let (_dir, cache) = setup(&[("d.csv", "a,b\n")]);
        let summary = builder(10, 1000).build(&cache, "d.csv").unwrap();

        assert_eq!(summary.shape, (0, 2));
        assert_eq!(summary.null_counts["a"], 0);
        assert_eq!(summary.null_percentages["a"], None);
        assert_eq!(summary.dtypes["b"], "object");
        assert_eq!(summary.numeric_summary, None);
    }

    #[test]
    fn test_errors() {
        let (_dir, cache) = setup(&[]);
        let b = builder(10, 1000);
        assert!(matches!(
            b.build(&cache, "notes.txt"),
            Err(DatasetError::UnsupportedFileType)
        ));
        assert!(matches!(
            b.build(&cache, "missing.csv"),
            Err(DatasetError::HeaderReadFailure)
        ));
    }
}
