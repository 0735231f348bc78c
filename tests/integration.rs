use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const CORPUS: &str = "Fever in infants is defined as a rectal temperature of 38 degrees Celsius or higher.\n\n\
Neonatal jaundice is caused by elevated bilirubin and usually appears in the first week of life.\n\n\
Kawasaki disease is a vasculitis of childhood that can lead to coronary artery aneurysms.\n\n\
Croup is a viral infection of the upper airway that produces a characteristic barking cough.\n\n\
Treatment of dehydration in children relies on oral rehydration solution when tolerated.\n";

/// Number of chunks `CORPUS` yields at `max_chunk_size = 120`.
const CORPUS_CHUNKS: usize = 4;

fn medrag_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("medrag");
    path
}

fn setup_test_env(embedding_provider: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::create_dir_all(root.join("data")).unwrap();
    fs::write(root.join("data").join("nelson.txt"), CORPUS).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/medrag.sqlite"

[corpus]
source_label = "Nelson Textbook of Pediatrics"

[chunking]
max_chunk_size = 120

[retrieval]
top_k = 3

[embedding]
provider = "{}"
dims = 64
batch_size = 2
max_retries = 0

[generation]
provider = "disabled"

[server]
bind = "127.0.0.1:0"

[logging]
level = "warn"
"#,
        root.display(),
        embedding_provider
    );

    let config_path = config_dir.join("medrag.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn corpus_path(tmp: &TempDir) -> String {
    tmp.path()
        .join("data")
        .join("nelson.txt")
        .to_str()
        .unwrap()
        .to_string()
}

fn run_medrag(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = medrag_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("OPENAI_API_KEY")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run medrag binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env("hashing");

    let (stdout, stderr, success) = run_medrag(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data").join("medrag.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env("hashing");

    let (_, _, success1) = run_medrag(&config_path, &["init"]);
    assert!(success1, "First init failed");
    let (_, _, success2) = run_medrag(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_invalid_config_rejected() {
    let (_tmp, config_path) = setup_test_env("hashing");
    let content = fs::read_to_string(&config_path).unwrap();
    fs::write(
        &config_path,
        content.replace("provider = \"disabled\"", "provider = \"disabled\"\ntemperature = 3.0"),
    )
    .unwrap();

    let (_, stderr, success) = run_medrag(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("temperature"), "stderr: {}", stderr);
}

#[test]
fn test_ingest_indexes_all_chunks() {
    let (tmp, config_path) = setup_test_env("hashing");
    run_medrag(&config_path, &["init"]);

    let corpus = corpus_path(&tmp);
    let (stdout, stderr, success) = run_medrag(&config_path, &["ingest", &corpus]);
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains(&format!("chunks: {}", CORPUS_CHUNKS)));
    assert!(stdout.contains(&format!("inserted: {}", CORPUS_CHUNKS)));
    assert!(stdout.contains(&format!("last sequence index: {}", CORPUS_CHUNKS - 1)));
    assert!(stdout.contains("ok"));

    let (stats, _, success) = run_medrag(&config_path, &["stats"]);
    assert!(success);
    assert!(stats.contains(&format!("Passages:    {}", CORPUS_CHUNKS)));
    assert!(stats.contains("Dims:        64"));
    assert!(stats.contains("Model:       hashing"));
}

#[test]
fn test_ingest_resume_skips_indexed_chunks() {
    let (tmp, config_path) = setup_test_env("hashing");
    run_medrag(&config_path, &["init"]);
    let corpus = corpus_path(&tmp);

    run_medrag(&config_path, &["ingest", &corpus]);
    let (stdout, stderr, success) = run_medrag(&config_path, &["ingest", &corpus]);
    assert!(success, "resume failed: {}", stderr);
    assert!(stdout.contains("inserted: 0"), "got: {}", stdout);
    assert!(stdout.contains(&format!("skipped (already indexed): {}", CORPUS_CHUNKS)));

    let (stats, _, _) = run_medrag(&config_path, &["stats"]);
    assert!(stats.contains(&format!("Passages:    {}", CORPUS_CHUNKS)));
}

#[test]
fn test_ingest_full_rebuilds() {
    let (tmp, config_path) = setup_test_env("hashing");
    run_medrag(&config_path, &["init"]);
    let corpus = corpus_path(&tmp);

    run_medrag(&config_path, &["ingest", &corpus]);
    let (stdout, _, success) = run_medrag(&config_path, &["ingest", &corpus, "--full"]);
    assert!(success);
    assert!(stdout.contains(&format!("inserted: {}", CORPUS_CHUNKS)));

    let (stats, _, _) = run_medrag(&config_path, &["stats"]);
    assert!(stats.contains(&format!("Passages:    {}", CORPUS_CHUNKS)));
}

#[test]
fn test_ingest_refuses_changed_corpus_without_full() {
    let (tmp, config_path) = setup_test_env("hashing");
    run_medrag(&config_path, &["init"]);
    let corpus = corpus_path(&tmp);
    run_medrag(&config_path, &["ingest", &corpus]);

    fs::write(&corpus, format!("{}\nMeasles presents with fever and rash.\n", CORPUS)).unwrap();
    let (_, stderr, success) = run_medrag(&config_path, &["ingest", &corpus]);
    assert!(!success);
    assert!(stderr.contains("--full"), "stderr: {}", stderr);

    let (_, _, success) = run_medrag(&config_path, &["ingest", &corpus, "--full"]);
    assert!(success);
}

#[test]
fn test_ingest_json_progress() {
    let (tmp, config_path) = setup_test_env("hashing");
    run_medrag(&config_path, &["init"]);
    let corpus = corpus_path(&tmp);

    let (_, stderr, success) = run_medrag(&config_path, &["ingest", &corpus, "--json"]);
    assert!(success);
    let events: Vec<serde_json::Value> = stderr
        .lines()
        .filter_map(|l| serde_json::from_str(l).ok())
        .filter(|v: &serde_json::Value| v["event"] == "progress")
        .collect();
    assert!(events.iter().any(|e| e["phase"] == "chunked"));
    let last = events.last().unwrap();
    assert_eq!(last["phase"], "embedding");
    assert_eq!(last["n"], CORPUS_CHUNKS as u64);
    assert_eq!(last["total"], CORPUS_CHUNKS as u64);
}

#[test]
fn test_ingest_requires_embedding_provider() {
    let (tmp, config_path) = setup_test_env("disabled");
    run_medrag(&config_path, &["init"]);
    let corpus = corpus_path(&tmp);

    let (_, stderr, success) = run_medrag(&config_path, &["ingest", &corpus]);
    assert!(!success);
    assert!(stderr.contains("disabled"), "stderr: {}", stderr);
}

#[test]
fn test_search_ranks_matching_passage_first() {
    let (tmp, config_path) = setup_test_env("hashing");
    run_medrag(&config_path, &["init"]);
    run_medrag(&config_path, &["ingest", &corpus_path(&tmp)]);

    let (stdout, stderr, success) =
        run_medrag(&config_path, &["search", "What defines fever in infants?"]);
    assert!(success, "search failed: {}", stderr);
    let first = stdout.lines().next().unwrap_or_default();
    assert!(first.starts_with("1. "), "got: {}", stdout);
    assert!(first.contains("(passage 0)"), "got: {}", stdout);
    assert!(stdout.contains("rectal temperature"));
    assert!(!stdout.contains("4. "), "top_k = 3 should cap results: {}", stdout);
}

#[test]
fn test_search_empty_index() {
    let (_tmp, config_path) = setup_test_env("hashing");
    run_medrag(&config_path, &["init"]);

    let (stdout, _, success) = run_medrag(&config_path, &["search", "fever"]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_search_dimension_mismatch_fails() {
    let (tmp, config_path) = setup_test_env("hashing");
    run_medrag(&config_path, &["init"]);
    run_medrag(&config_path, &["ingest", &corpus_path(&tmp)]);

    let content = fs::read_to_string(&config_path).unwrap();
    fs::write(&config_path, content.replace("dims = 64", "dims = 32")).unwrap();

    let (_, stderr, success) = run_medrag(&config_path, &["search", "fever"]);
    assert!(!success);
    assert!(stderr.contains("dimension mismatch"), "stderr: {}", stderr);
}

#[test]
fn test_ask_with_disabled_generator_fails() {
    let (tmp, config_path) = setup_test_env("hashing");
    run_medrag(&config_path, &["init"]);
    run_medrag(&config_path, &["ingest", &corpus_path(&tmp)]);

    let (_, stderr, success) = run_medrag(&config_path, &["ask", "What defines fever?"]);
    assert!(!success);
    assert!(stderr.contains("generation"), "stderr: {}", stderr);

    let (history, _, success) = run_medrag(&config_path, &["history"]);
    assert!(success);
    assert!(history.contains("No exchanges recorded."));
}
