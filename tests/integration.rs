use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn rag_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("rag");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let docs_dir = root.join("docs");
    fs::create_dir_all(&docs_dir).unwrap();
    fs::write(
        docs_dir.join("cats.txt"),
        "The cat sat on the mat. The dog ran fast.",
    )
    .unwrap();
    fs::write(docs_dir.join("add_fn.py"), "def add(a, b): return a + b").unwrap();

    let config_content = format!(
        r#"[store]
path = "{}/data/index.db"

[chunking]
chunk_size = 100
chunk_overlap = 10

[retrieval]
k = 4

[embedding]
provider = "hashing"
dims = 384
"#,
        root.display()
    );

    let config_path = config_dir.join("rag.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_rag(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = rag_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run rag binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn ingest_corpus(config_path: &Path, docs_dir: &Path) {
    let (stdout, stderr, success) = run_rag(
        config_path,
        &[
            "ingest",
            docs_dir.to_str().unwrap(),
            "--ext",
            "txt",
            "--ext",
            "py",
        ],
    );
    assert!(
        success,
        "ingest failed: stdout={}, stderr={}",
        stdout, stderr
    );
}

#[test]
fn test_init_creates_store() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_rag(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data").join("index.db").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_rag(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_rag(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_ingest_reports_documents_and_chunks() {
    let (tmp, config_path) = setup_test_env();
    let docs_dir = tmp.path().join("docs");

    run_rag(&config_path, &["init"]);
    let (stdout, stderr, success) = run_rag(
        &config_path,
        &[
            "ingest",
            docs_dir.to_str().unwrap(),
            "--ext",
            "txt",
            "--ext",
            "py",
        ],
    );
    assert!(
        success,
        "ingest failed: stdout={}, stderr={}",
        stdout, stderr
    );
    assert!(stdout.contains("2 document(s)"));
    assert!(stdout.contains("2 chunk(s)"));
}

#[test]
fn test_ingest_dry_run_writes_nothing() {
    let (tmp, config_path) = setup_test_env();
    let docs_dir = tmp.path().join("docs");

    run_rag(&config_path, &["init"]);
    let (stdout, _, success) = run_rag(
        &config_path,
        &[
            "ingest",
            docs_dir.to_str().unwrap(),
            "--ext",
            "txt",
            "--ext",
            "py",
            "--dry-run",
        ],
    );
    assert!(success);
    assert!(stdout.contains("Dry run"));
    assert!(stdout.contains("2 document(s)"));

    let (stats, _, _) = run_rag(&config_path, &["stats"]);
    assert!(
        stats.contains("Entries:    0"),
        "Dry run should leave the store empty, got: {}",
        stats
    );
}

#[test]
fn test_reingest_overwrites_instead_of_duplicating() {
    let (tmp, config_path) = setup_test_env();
    let docs_dir = tmp.path().join("docs");

    run_rag(&config_path, &["init"]);
    ingest_corpus(&config_path, &docs_dir);
    ingest_corpus(&config_path, &docs_dir);

    let (stats, _, _) = run_rag(&config_path, &["stats"]);
    assert!(
        stats.contains("Entries:    2"),
        "Re-ingest should overwrite, got: {}",
        stats
    );
}

#[test]
fn test_ingest_empty_directory_fails() {
    let (tmp, config_path) = setup_test_env();
    let empty_dir = tmp.path().join("empty");
    fs::create_dir_all(&empty_dir).unwrap();

    run_rag(&config_path, &["init"]);
    let (_, stderr, success) = run_rag(&config_path, &["ingest", empty_dir.to_str().unwrap()]);
    assert!(!success, "Ingesting an empty directory should fail");
    assert!(
        stderr.contains("no documents"),
        "Should report no documents, got: {}",
        stderr
    );
}

#[test]
fn test_query_ranks_prose_over_code_for_prose_question() {
    let (tmp, config_path) = setup_test_env();
    let docs_dir = tmp.path().join("docs");

    run_rag(&config_path, &["init"]);
    ingest_corpus(&config_path, &docs_dir);

    let (stdout, stderr, success) = run_rag(&config_path, &["query", "Where did the cat sit?"]);
    assert!(success, "query failed: stderr={}", stderr);
    assert!(stdout.contains("no generation model active"));

    let cat_pos = stdout
        .find("cat sat on the mat")
        .expect("cat chunk should appear in the answer context");
    let code_pos = stdout
        .find("def add")
        .expect("code chunk should appear in the answer context");
    assert!(
        cat_pos < code_pos,
        "Prose chunk should outrank code chunk, got: {}",
        stdout
    );
    assert!(stdout.contains("Sources:"));
}

#[test]
fn test_query_deterministic() {
    let (tmp, config_path) = setup_test_env();
    let docs_dir = tmp.path().join("docs");

    run_rag(&config_path, &["init"]);
    ingest_corpus(&config_path, &docs_dir);

    let (stdout1, _, _) = run_rag(&config_path, &["query", "cat"]);
    let (stdout2, _, _) = run_rag(&config_path, &["query", "cat"]);
    assert_eq!(
        stdout1, stdout2,
        "Query results should be deterministic across runs"
    );
}

#[test]
fn test_query_empty_store() {
    let (_tmp, config_path) = setup_test_env();

    run_rag(&config_path, &["init"]);
    let (stdout, _, success) = run_rag(&config_path, &["query", "anything"]);
    assert!(success, "Query on an empty store should not fail");
    assert!(stdout.contains("No relevant context was found"));
}

#[test]
fn test_query_k_limits_sources() {
    let (tmp, config_path) = setup_test_env();
    let docs_dir = tmp.path().join("docs");

    run_rag(&config_path, &["init"]);
    ingest_corpus(&config_path, &docs_dir);

    let (stdout, _, success) = run_rag(&config_path, &["query", "cat", "--k", "1"]);
    assert!(success);
    let source_lines = stdout
        .lines()
        .filter(|l| l.trim_start().starts_with('['))
        .count();
    assert_eq!(source_lines, 1, "Expected one source line, got: {}", stdout);
}

#[test]
fn test_query_k_zero_rejected() {
    let (tmp, config_path) = setup_test_env();
    let docs_dir = tmp.path().join("docs");

    run_rag(&config_path, &["init"]);
    ingest_corpus(&config_path, &docs_dir);

    let (_, stderr, success) = run_rag(&config_path, &["query", "cat", "--k", "0"]);
    assert!(!success, "--k 0 should be rejected");
    assert!(
        stderr.contains("--k"),
        "Should mention the --k bound, got: {}",
        stderr
    );
}

#[test]
fn test_stats_reports_collection_state() {
    let (tmp, config_path) = setup_test_env();
    let docs_dir = tmp.path().join("docs");

    run_rag(&config_path, &["init"]);
    ingest_corpus(&config_path, &docs_dir);

    let (stdout, _, success) = run_rag(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("document_chunks"));
    assert!(stdout.contains("384"));
    assert!(stdout.contains("Entries:    2"));
}

#[test]
fn test_snapshot_writes_json_file() {
    let (tmp, config_path) = setup_test_env();
    let docs_dir = tmp.path().join("docs");
    let out_dir = tmp.path().join("out");

    run_rag(&config_path, &["init"]);
    ingest_corpus(&config_path, &docs_dir);

    let (stdout, _, success) = run_rag(&config_path, &["snapshot", out_dir.to_str().unwrap()]);
    assert!(success);
    assert!(stdout.contains("Snapshot written"));

    let snapshot_path = out_dir.join("index_snapshot.json");
    assert!(snapshot_path.exists());
    let parsed: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&snapshot_path).unwrap()).unwrap();
    assert_eq!(parsed["entry_count"], 2);
    assert_eq!(parsed["collection"], "document_chunks");
}

#[test]
fn test_invalid_chunk_overlap_rejected() {
    let (tmp, _) = setup_test_env();
    let config_path = tmp.path().join("config").join("bad.toml");
    fs::write(
        &config_path,
        format!(
            r#"[store]
path = "{}/data/index.db"

[chunking]
chunk_size = 10
chunk_overlap = 10
"#,
            tmp.path().display()
        ),
    )
    .unwrap();

    let (_, stderr, success) = run_rag(&config_path, &["init"]);
    assert!(!success, "Overlap >= chunk size should be rejected");
    assert!(
        stderr.contains("chunk_overlap"),
        "Should mention chunk_overlap, got: {}",
        stderr
    );
}

#[test]
fn test_missing_config_fails() {
    let (tmp, _) = setup_test_env();
    let missing = tmp.path().join("nope.toml");

    let (_, stderr, success) = run_rag(&missing, &["init"]);
    assert!(!success, "Missing config should fail");
    assert!(
        stderr.contains("config"),
        "Should mention config, got: {}",
        stderr
    );
}
