use dataset_toolkit::{DatasetToolkit, ToolkitConfig};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

fn write(root: &Path, name: &str, body: &str) {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, body).unwrap();
}

fn setup(files: &[(&str, &str)]) -> (tempfile::TempDir, DatasetToolkit) {
    let dir = tempfile::tempdir().unwrap();
    for (name, body) in files {
        write(dir.path(), name, body);
    }
    let toolkit = DatasetToolkit::new(ToolkitConfig::new(dir.path()));
    (dir, toolkit)
}

const TRIAL: &str = "cell_line,Dose,response\nMCF7,1.0,0.8\nA549,2.0,0.4\nMCF7,1.0,0.8\n";

#[test]
fn test_trial_summary() {
    let (_dir, toolkit) = setup(&[("trial.csv", TRIAL)]);

    let info = toolkit.call("get_dataset_info", &json!({"file_path": "trial.csv"}));
    assert_eq!(info["shape"], json!([3, 3]));
    assert_eq!(info["duplicated_rows"], 1);
    assert_eq!(
        info["null_counts"],
        json!({"cell_line": 0, "Dose": 0, "response": 0})
    );
    assert_eq!(info["columns"], json!(["cell_line", "Dose", "response"]));
    assert_eq!(info["dtypes"]["Dose"], "float64");
    assert_eq!(info["dtypes"]["cell_line"], "object");
    assert_eq!(info["numeric_summary"]["Dose"]["count"], 3);
    assert_eq!(info["categorical_summary"]["cell_line"]["unique_count"], 2);
    assert_eq!(info["categorical_summary"]["cell_line"]["top_values"]["MCF7"], 2);
}

#[test]
fn test_summary_is_idempotent() {
    let (_dir, toolkit) = setup(&[("trial.csv", TRIAL)]);
    let first = toolkit.call("get_dataset_info", &json!({"file_path": "trial.csv"}));
    let second = toolkit.call("get_dataset_info", &json!({"file_path": "trial.csv"}));
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    assert_eq!(toolkit.header_cache().reads(), 1);
}

#[test]
fn test_null_counts_bounded_by_cells() {
    let (_dir, toolkit) = setup(&[("gaps.csv", "a,b,c\n1,,x\n,,\nNA,2,y\n4,5,\n")]);

    let info = toolkit.get_dataset_info("gaps.csv").unwrap();
    let (rows, cols) = info.shape;
    assert_eq!((rows, cols), (4, 3));
    let total: usize = info.null_counts.values().sum();
    assert!(total <= rows * cols);
    assert_eq!(info.null_counts["a"], 2);
    assert_eq!(info.null_percentages["b"], Some(50.0));
}

#[test]
fn test_unsupported_extensions() {
    let (_dir, toolkit) = setup(&[("notes.json", "{}")]);
    let expected = json!({"error": "Unsupported file type"});

    assert_eq!(toolkit.call("get_dataset_info", &json!({"file_path": "notes.json"})), expected);
    assert_eq!(toolkit.call("get_data_sample", &json!({"file_path": "notes.json"})), expected);
    assert_eq!(toolkit.call("remove_duplicates", &json!({"file_path": "notes.json"})), expected);
}

#[test]
fn test_exact_threshold_lookup() {
    let (_dir, toolkit) = setup(&[
        ("trial.csv", TRIAL),
        ("more/doses.csv", "dose,dosage,DOSE_2\n1,2,3\n"),
    ]);

    let hits = toolkit.find_similar_columns("dose", Some(100));
    let columns: Vec<&str> = hits.iter().map(|m| m.column.as_str()).collect();
    assert_eq!(columns, vec!["dose", "Dose"]);
    assert!(hits.iter().all(|m| m.column.eq_ignore_ascii_case("dose")));
}

#[test]
fn test_ic50_pattern() {
    let (_dir, toolkit) = setup(&[("screen.csv", "IC50,drug_name\n0.3,taxol\n")]);

    let patterns = toolkit.call("get_column_patterns", &json!({}));
    let dose = patterns["dose"].as_array().unwrap();
    assert!(dose.iter().any(|m| {
        m["column"] == "IC50" && m["similarity"].as_u64().unwrap() >= 70
    }));
    assert!(patterns["drug"]
        .as_array()
        .unwrap()
        .iter()
        .any(|m| m["column"] == "drug_name" && m["similarity"] == 100));
}

#[test]
fn test_list_datasets_is_csv_only() {
    let (_dir, toolkit) = setup(&[
        ("b.csv", "x\n1\n"),
        ("nested/a.csv", "y\n2\n"),
        ("sheet.xlsx", "not a workbook"),
    ]);
    assert_eq!(toolkit.call("list_datasets", &Value::Null), json!(["b.csv", "a.csv"]));
}

#[test]
fn test_transform_tools_write_processed_files() {
    let (dir, toolkit) = setup(&[("trial.csv", TRIAL)]);

    let out = toolkit.call("remove_duplicates", &json!({"file_path": "trial.csv"}));
    assert!(out["message"]
        .as_str()
        .unwrap()
        .starts_with("Duplicates removed successfully"));
    let processed = fs::read_to_string(dir.path().join("trial_processed.csv")).unwrap();
    assert_eq!(processed.lines().count(), 3);

    let out = toolkit.call(
        "create_interaction_terms",
        &json!({"file_path": "trial.csv", "col1": "Dose", "col2": "response"}),
    );
    assert!(out.get("error").is_none(), "{}", out);
    let processed = fs::read_to_string(dir.path().join("trial_processed.csv")).unwrap();
    assert_eq!(processed.lines().next(), Some("cell_line,Dose,response,Dose*response"));

    let out = toolkit.call(
        "create_interaction_terms",
        &json!({"file_path": "trial.csv", "col1": "Dose", "col2": "cell_line"}),
    );
    assert_eq!(out, json!({"error": "Column 'cell_line' is not numeric."}));

    // source untouched
    assert_eq!(fs::read_to_string(dir.path().join("trial.csv")).unwrap(), TRIAL);
}

#[test]
fn test_fill_with_constant() {
    let (dir, toolkit) = setup(&[("gaps.csv", "a,b\n1,x\n,y\n3,\n")]);

    let out = toolkit.call(
        "handle_missing_values",
        &json!({"file_path": "gaps.csv", "strategy": "constant", "value": "0"}),
    );
    assert!(out["output_path"].as_str().unwrap().ends_with("gaps_processed.csv"));

    let info = toolkit.get_dataset_info("gaps_processed.csv").unwrap();
    assert!(info.null_counts.values().all(|n| *n == 0));
    assert!(dir.path().join("gaps.csv").exists());
}

#[test]
fn test_pipeline_and_histogram() {
    let (_dir, toolkit) = setup(&[("trial.csv", TRIAL)]);

    let rows = toolkit.call(
        "run_pipeline",
        &json!({
            "file_path": "trial.csv",
            "steps": [
                {"op": "unique"},
                {"op": "aggregate", "group_by": ["cell_line"],
                 "aggregations": [{"column": "Dose", "agg": "max"}]},
                {"op": "sort", "column": "Dose_max", "descending": true}
            ]
        }),
    );
    assert_eq!(
        rows,
        json!([
            {"cell_line": "A549", "Dose_max": 2.0},
            {"cell_line": "MCF7", "Dose_max": 1.0}
        ])
    );

    let hist = toolkit.call(
        "histogram",
        &json!({"file_path": "trial.csv", "column": "Dose", "bins": 2}),
    );
    assert_eq!(hist["counts"], json!([2, 1]));
    assert_eq!(hist["bin_edges"], json!([1.0, 1.5, 2.0]));
}

fn workbook_workspace() -> (tempfile::TempDir, DatasetToolkit) {
    let dir = tempfile::tempdir().unwrap();
    let fixture = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/screen.xlsx");
    fs::create_dir_all(dir.path().join("plates")).unwrap();
    fs::copy(fixture, dir.path().join("plates/screen.xlsx")).unwrap();
    // chunk size has no effect on workbooks, which are read whole
    let toolkit = DatasetToolkit::new(ToolkitConfig::new(dir.path()).with_chunk_rows(1));
    (dir, toolkit)
}

#[test]
fn test_workbook_headers_are_cached() {
    let (_dir, toolkit) = workbook_workspace();

    let headers = toolkit.header_cache().get_headers("plates/screen.xlsx").unwrap();
    assert_eq!(headers, vec!["cell_line", "plate", "dose", "response"]);
    toolkit.header_cache().get_headers("plates/screen.xlsx");
    assert_eq!(toolkit.header_cache().reads(), 1);
}

#[test]
fn test_workbook_summary() {
    let (_dir, toolkit) = workbook_workspace();

    let info = toolkit.call("get_dataset_info", &json!({"file_path": "plates/screen.xlsx"}));
    assert_eq!(info["shape"], json!([3, 4]));
    assert_eq!(
        info["null_counts"],
        json!({"cell_line": 0, "plate": 0, "dose": 0, "response": 1})
    );
    assert_eq!(info["null_percentages"]["response"], 33.33);
    assert_eq!(info["duplicated_rows"], 1);
    assert_eq!(info["dtypes"]["plate"], "int64");
    assert_eq!(info["dtypes"]["dose"], "float64");
    // one chunk: a single index charge plus three 8-byte columns and
    // three boxed short strings
    assert_eq!(info["memory_usage"], 128 + 3 * 24 + 3 * (8 + 49 + 4));
    assert_eq!(info["numeric_summary"]["response"]["count"], 2);
    assert_eq!(info["categorical_summary"]["cell_line"]["top_values"]["A549"], 2);
}

#[test]
fn test_workbook_sample() {
    let (_dir, toolkit) = workbook_workspace();

    let rows = toolkit.call(
        "get_data_sample",
        &json!({"file_path": "plates/screen.xlsx", "n_rows": 2}),
    );
    assert_eq!(
        rows,
        json!([
            {"cell_line": "A549", "plate": 1, "dose": 1.0, "response": 0.5},
            {"cell_line": "MCF7", "plate": 2, "dose": 2.5, "response": null}
        ])
    );
    // spreadsheets are summarized but not listed
    assert_eq!(toolkit.call("list_datasets", &Value::Null), json!([]));
}

#[test]
fn test_renamed_duplicate_headers_keep_every_column() {
    let (_dir, toolkit) = setup(&[("dup.csv", "a,a.1,a\n1,,3\n4,5,\n")]);

    let info = toolkit.call("get_dataset_info", &json!({"file_path": "dup.csv"}));
    assert_eq!(info["columns"], json!(["a", "a.1", "a.1.1"]));
    assert_eq!(info["null_counts"].as_object().unwrap().len(), 3);

    let rows = toolkit.call("get_data_sample", &json!({"file_path": "dup.csv"}));
    assert_eq!(rows[1], json!({"a": 4, "a.1": 5.0, "a.1.1": null}));
}
