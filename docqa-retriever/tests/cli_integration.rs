use anyhow::Result;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Run the CLI binary against the index inside `temp_dir`
fn run_cli(temp_dir: &TempDir, args: &[&str]) -> Result<Output> {
    let config_path = temp_dir.path().join("docqa.toml");
    if !config_path.exists() {
        write_config(&config_path)?;
    }

    let output = Command::new(env!("CARGO_BIN_EXE_docqa-retriever"))
        .arg("--config")
        .arg(&config_path)
        .arg("--index-dir")
        .arg(temp_dir.path().join("index"))
        .args(args)
        .env("RUST_LOG", "error")
        .output()?;
    Ok(output)
}

fn write_config(path: &Path) -> Result<()> {
    std::fs::write(
        path,
        r#"
[chunking]
chunk_size = 20
chunk_overlap = 5

[embedding]
provider = "hashing"
dimension = 256

[retrieval]
top_k = 3
"#,
    )?;
    Ok(())
}

fn populate_docs(temp_dir: &TempDir) -> Result<()> {
    let docs = temp_dir.path().join("docs");
    std::fs::create_dir_all(&docs)?;
    std::fs::write(docs.join("nature.txt"), "The sky is blue. The grass is green.")?;
    std::fs::write(docs.join("ignored.md"), "Markdown is not picked up by ingest.")?;
    Ok(())
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_cli_help() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output = run_cli(&temp_dir, &["--help"])?;

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("ingest"));
    assert!(out.contains("query"));
    assert!(out.contains("status"));
    Ok(())
}

#[test]
fn test_cli_query_without_index() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output = run_cli(&temp_dir, &["query", "What color is the sky?"])?;

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Error: Index not found"));
    Ok(())
}

#[test]
fn test_cli_ingest_query_status() -> Result<()> {
    let temp_dir = TempDir::new()?;
    populate_docs(&temp_dir)?;
    let docs_dir = temp_dir.path().join("docs");

    let output = run_cli(
        &temp_dir,
        &["ingest", "--docs-dir", docs_dir.to_str().unwrap_or_default()],
    )?;
    assert!(output.status.success(), "ingest failed: {}", stderr(&output));
    assert!(stdout(&output).contains("Ingested 3 chunks from 1 documents"));

    let output = run_cli(
        &temp_dir,
        &["query", "What color is the sky?", "--top-k", "1", "--show-sources"],
    )?;
    assert!(output.status.success(), "query failed: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("nature.txt_chunk_0"));
    assert!(out.contains("Source: nature.txt"));

    let output = run_cli(
        &temp_dir,
        &["query", "What color is the sky?", "-k", "1", "--format", "json"],
    )?;
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let results = parsed.as_array().cloned().unwrap_or_default();
    assert_eq!(results.len(), 1);
    assert!(results[0]["text"].as_str().unwrap_or_default().contains("sky"));

    let output = run_cli(&temp_dir, &["query", "sky", "--format", "context"])?;
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("--- SOURCE 1 ---"));
    assert!(out.contains("Source: nature.txt"));

    let output = run_cli(&temp_dir, &["status", "--format", "json"])?;
    assert!(output.status.success());
    let status: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(status["exists"], true);
    assert_eq!(status["vectors"], 3);
    assert_eq!(status["kind"], "hnsw");
    assert_eq!(status["dimension"], 256);
    Ok(())
}

#[test]
fn test_cli_zero_results_and_blank_question() -> Result<()> {
    let temp_dir = TempDir::new()?;
    populate_docs(&temp_dir)?;
    let docs_dir = temp_dir.path().join("docs");
    let output = run_cli(
        &temp_dir,
        &["ingest", "--docs-dir", docs_dir.to_str().unwrap_or_default()],
    )?;
    assert!(output.status.success());

    let output = run_cli(&temp_dir, &["query", "sky", "--threshold", "1.5"])?;
    assert!(output.status.success());
    assert!(stdout(&output).contains("No relevant context found."));

    let output = run_cli(&temp_dir, &["query", "   "])?;
    assert!(output.status.success());
    assert!(stdout(&output).contains("Please provide a question."));
    Ok(())
}

#[test]
fn test_cli_ingest_files_and_empty_corpus() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let upload = temp_dir.path().join("faq.md");
    std::fs::write(&upload, "Refunds are processed within five business days.")?;
    let bad = temp_dir.path().join("scan.pdf");
    std::fs::write(&bad, b"%PDF-1.7")?;

    let output = run_cli(
        &temp_dir,
        &[
            "ingest-files",
            upload.to_str().unwrap_or_default(),
            bad.to_str().unwrap_or_default(),
        ],
    )?;
    assert!(output.status.success(), "ingest-files failed: {}", stderr(&output));
    assert!(stdout(&output).contains("from 1 of 2 files"));

    let output = run_cli(&temp_dir, &["ingest-files", bad.to_str().unwrap_or_default()])?;
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Error: No valid text chunks"));
    Ok(())
}

#[test]
fn test_cli_status_without_index() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output = run_cli(&temp_dir, &["status"])?;
    assert!(output.status.success());
    assert!(stdout(&output).contains("No index at"));
    Ok(())
}

#[test]
fn test_cli_rejects_invalid_config() -> Result<()> {
    let temp_dir = TempDir::new()?;
    std::fs::write(
        temp_dir.path().join("docqa.toml"),
        "[chunking]\nchunk_size = 0\n",
    )?;
    let output = run_cli(&temp_dir, &["status"])?;
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Invalid configuration"));
    Ok(())
}
