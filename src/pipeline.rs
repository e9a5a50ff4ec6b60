//! Pipeline - declarative table operations
//!
//! A pipeline is a JSON list of steps, each tagged with `"op"`. Steps run
//! in order on an in-memory copy of the dataset and the final table is
//! returned as row objects. Nothing is written back to disk.
//!
//! ```json
//! [
//!   {"op": "filter", "column": "dose", "cmp": "gt", "value": 1.0},
//!   {"op": "derive", "name": "ratio", "left": "response", "arith": "div", "right": "dose"},
//!   {"op": "sort", "column": "ratio", "descending": true},
//!   {"op": "head", "n": 10}
//! ]
//! ```

use crate::error::{DatasetError, Result};
use crate::frame::{frame_to_records, json_literal, load_dataset, require_column, require_numeric};
use crate::workspace::Workspace;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    IsNull,
    NotNull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Right-hand side of a `derive` step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Number(f64),
    Column(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggFunc {
    Sum,
    Mean,
    Median,
    Min,
    Max,
    Count,
    NUnique,
}

impl AggFunc {
    fn as_str(&self) -> &'static str {
        match self {
            AggFunc::Sum => "sum",
            AggFunc::Mean => "mean",
            AggFunc::Median => "median",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
            AggFunc::Count => "count",
            AggFunc::NUnique => "n_unique",
        }
    }

    fn needs_numbers(&self) -> bool {
        matches!(self, AggFunc::Sum | AggFunc::Mean | AggFunc::Median)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    pub column: String,
    pub agg: AggFunc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PipelineStep {
    Select {
        columns: Vec<String>,
    },
    Drop {
        columns: Vec<String>,
    },
    Rename {
        from: String,
        to: String,
    },
    Filter {
        column: String,
        cmp: Comparison,
        #[serde(default)]
        value: Option<Value>,
    },
    Sort {
        column: String,
        #[serde(default)]
        descending: bool,
    },
    Head {
        n: usize,
    },
    DropNulls {
        #[serde(default)]
        columns: Option<Vec<String>>,
    },
    Unique,
    Derive {
        name: String,
        left: String,
        #[serde(rename = "arith")]
        op: ArithOp,
        right: Operand,
    },
    Aggregate {
        #[serde(default)]
        group_by: Vec<String>,
        aggregations: Vec<Aggregation>,
    },
}

impl PipelineStep {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineStep::Select { .. } => "select",
            PipelineStep::Drop { .. } => "drop",
            PipelineStep::Rename { .. } => "rename",
            PipelineStep::Filter { .. } => "filter",
            PipelineStep::Sort { .. } => "sort",
            PipelineStep::Head { .. } => "head",
            PipelineStep::DropNulls { .. } => "drop_nulls",
            PipelineStep::Unique => "unique",
            PipelineStep::Derive { .. } => "derive",
            PipelineStep::Aggregate { .. } => "aggregate",
        }
    }

    /// Apply this step to `df`, checking column references first.
    pub fn apply(&self, df: DataFrame) -> Result<DataFrame> {
        let out = match self {
            PipelineStep::Select { columns } => {
                require_all(&df, columns)?;
                df.lazy().select(columns.iter().map(|c| col(c)).collect::<Vec<_>>())
            }
            PipelineStep::Drop { columns } => {
                require_all(&df, columns)?;
                df.lazy().select([all().exclude(columns.clone())])
            }
            PipelineStep::Rename { from, to } => {
                require_column(&df, from)?;
                df.lazy().rename([from.as_str()], [to.as_str()])
            }
            PipelineStep::Filter { column, cmp, value } => {
                require_column(&df, column)?;
                let predicate = comparison(col(column), *cmp, value.as_ref())?;
                df.lazy().filter(predicate)
            }
            PipelineStep::Sort { column, descending } => {
                require_column(&df, column)?;
                df.lazy().sort_by_exprs(
                    vec![col(column)],
                    SortMultipleOptions::default()
                        .with_order_descending(*descending)
                        .with_maintain_order(true),
                )
            }
            PipelineStep::Head { n } => df.lazy().limit(*n as IdxSize),
            PipelineStep::DropNulls { columns } => {
                let subset = match columns {
                    Some(columns) => {
                        require_all(&df, columns)?;
                        Some(columns.iter().map(|c| col(c)).collect())
                    }
                    None => None,
                };
                df.lazy().drop_nulls(subset)
            }
            PipelineStep::Unique => df.lazy().unique_stable(None, UniqueKeepStrategy::First),
            PipelineStep::Derive {
                name,
                left,
                op,
                right,
            } => {
                require_numeric(&df, left)?;
                let rhs = match right {
                    Operand::Number(n) => lit(*n),
                    Operand::Column(c) => {
                        require_numeric(&df, c)?;
                        col(c)
                    }
                };
                let lhs = col(left).cast(DataType::Float64);
                let expr = match op {
                    ArithOp::Add => lhs + rhs,
                    ArithOp::Sub => lhs - rhs,
                    ArithOp::Mul => lhs * rhs,
                    ArithOp::Div => lhs / rhs,
                };
                df.lazy().with_column(expr.alias(name))
            }
            PipelineStep::Aggregate {
                group_by,
                aggregations,
            } => {
                if aggregations.is_empty() {
                    return Err(DatasetError::InvalidParameter(
                        "aggregate needs at least one aggregation".to_string(),
                    ));
                }
                require_all(&df, group_by)?;
                let mut exprs = Vec::with_capacity(aggregations.len());
                for a in aggregations {
                    if a.agg.needs_numbers() {
                        require_numeric(&df, &a.column)?;
                    } else {
                        require_column(&df, &a.column)?;
                    }
                    exprs.push(aggregate(&a.column, a.agg));
                }

                if group_by.is_empty() {
                    df.lazy().select(exprs)
                } else {
                    let keys: Vec<Expr> = group_by.iter().map(|c| col(c)).collect();
                    df.lazy()
                        .group_by_stable(keys)
                        .agg(exprs)
                }
            }
        };

        Ok(out.collect()?)
    }
}

fn require_all(df: &DataFrame, columns: &[String]) -> Result<()> {
    for c in columns {
        require_column(df, c)?;
    }
    Ok(())
}

fn comparison(column: Expr, cmp: Comparison, value: Option<&Value>) -> Result<Expr> {
    let rhs = || match value {
        Some(v) if !v.is_null() => json_literal(v),
        _ => Err(DatasetError::InvalidParameter(format!(
            "filter '{:?}' needs a value",
            cmp
        ))),
    };

    Ok(match cmp {
        Comparison::Eq => column.eq(rhs()?),
        Comparison::Ne => column.neq(rhs()?),
        Comparison::Gt => column.gt(rhs()?),
        Comparison::Ge => column.gt_eq(rhs()?),
        Comparison::Lt => column.lt(rhs()?),
        Comparison::Le => column.lt_eq(rhs()?),
        Comparison::IsNull => column.is_null(),
        Comparison::NotNull => column.is_not_null(),
    })
}

fn aggregate(column: &str, agg: AggFunc) -> Expr {
    let c = col(column);
    let expr = match agg {
        AggFunc::Sum => c.sum(),
        AggFunc::Mean => c.mean(),
        AggFunc::Median => c.median(),
        AggFunc::Min => c.min(),
        AggFunc::Max => c.max(),
        AggFunc::Count => c.count(),
        AggFunc::NUnique => c.n_unique(),
    };
    expr.alias(&format!("{}_{}", column, agg.as_str()))
}

/// Parse a JSON step list.
pub fn parse_steps(steps: &Value) -> Result<Vec<PipelineStep>> {
    serde_json::from_value(steps.clone())
        .map_err(|e| DatasetError::InvalidParameter(format!("Invalid pipeline: {}", e)))
}

/// Run `steps` over the dataset at `path` and return the resulting rows.
pub fn run_pipeline(workspace: &Workspace, path: &str, steps: &[PipelineStep]) -> Result<Vec<Value>> {
    let (_, mut df) = load_dataset(workspace, path)?;

    for (idx, step) in steps.iter().enumerate() {
        df = step.apply(df)?;
        debug!(
            "Step {} ({}) -> {} rows, {} columns",
            idx + 1,
            step.name(),
            df.height(),
            df.width()
        );
    }

    info!("Pipeline on {} finished with {} row(s)", path, df.height());
    frame_to_records(&mut df)
}
