use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dataset_toolkit::{DatasetToolkit, ToolkitConfig};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "dataset-toolkit")]
#[command(about = "Inspect, match and transform tabular datasets in a workspace")]
struct Cli {
    /// Workspace directory holding the datasets
    #[arg(short, long, env = "DATASETS_DIR")]
    workspace: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the tool catalog
    Tools,
    /// Call any tool with JSON parameters
    Call {
        tool: String,
        /// Parameters as a JSON object
        #[arg(default_value = "{}")]
        params: String,
    },
    /// List CSV datasets
    List,
    /// Summarize a dataset
    Info { path: String },
    /// Show the first rows of a dataset
    Sample {
        path: String,
        #[arg(short = 'n', long, default_value_t = 5)]
        rows: usize,
    },
    /// Find columns resembling a name
    Similar {
        target: String,
        #[arg(short, long)]
        threshold: Option<i64>,
    },
    /// Group columns under the domain patterns
    Patterns,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = ToolkitConfig::from_env();
    if let Some(workspace) = cli.workspace {
        config.workspace_root = workspace;
    }
    info!("Workspace: {}", config.workspace_root.display());
    let toolkit = DatasetToolkit::new(config);

    let output = match cli.command {
        Commands::Tools => serde_json::to_value(toolkit.list_tools())?,
        Commands::Call { tool, params } => {
            let params: Value = serde_json::from_str(&params)
                .with_context(|| format!("Parameters for {} are not valid JSON", tool))?;
            toolkit.call(&tool, &params)
        }
        Commands::List => toolkit.call("list_datasets", &json!({})),
        Commands::Info { path } => toolkit.call("get_dataset_info", &json!({ "file_path": path })),
        Commands::Sample { path, rows } => toolkit.call(
            "get_data_sample",
            &json!({ "file_path": path, "n_rows": rows }),
        ),
        Commands::Similar { target, threshold } => toolkit.call(
            "find_similar_columns",
            &json!({ "target_column": target, "threshold": threshold }),
        ),
        Commands::Patterns => toolkit.call("get_column_patterns", &json!({})),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
