use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn chainchat_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("chainchat");
    path
}

fn setup_test_env(bind: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    // Preprocessed chunk corpus, one file per schema generation.
    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();
    fs::write(
        data_dir.join("fundamentals.json"),
        r#"[
            { "text": "Inventory turnover ratio measures how many times stock is sold and replaced.", "source": "fundamentals.pdf" },
            { "text": "Safety stock protects service levels against demand variability.", "source": "fundamentals.pdf" }
        ]"#,
    )
    .unwrap();
    fs::write(
        data_dir.join("strategy.json"),
        r#"[
            { "id": 0, "content": "Demand forecasting accuracy drives aggregate planning decisions.", "metadata": { "source": "strategy.pdf" } }
        ]"#,
    )
    .unwrap();

    let config_content = format!(
        r#"[chunks]
paths = ["{root}/data/fundamentals.json", "{root}/data/strategy.json"]

[retrieval]
strategy = "lexical"
max_results = 5

[model]
name = "gpt-4o-mini"
temperature = 0.7

[server]
bind = "{bind}"
"#,
        root = root.display(),
        bind = bind,
    );

    let config_path = root.join("chainchat.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_chainchat(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = chainchat_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env("OPENAI_API_KEY", "test-key")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run chainchat binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_chunks_stats_counts_both_schemas() {
    let (_tmp, config_path) = setup_test_env("127.0.0.1:0");

    let (stdout, stderr, success) = run_chainchat(&config_path, &["chunks", "stats"]);
    assert!(success, "stats failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("total chunks: 3"));
    assert!(stdout.contains("fundamentals.pdf: 2"));
    assert!(stdout.contains("strategy.pdf: 1"));
}

#[test]
fn test_chunks_stats_fails_on_missing_file() {
    let (tmp, config_path) = setup_test_env("127.0.0.1:0");
    fs::remove_file(tmp.path().join("data/strategy.json")).unwrap();

    let (_, stderr, success) = run_chainchat(&config_path, &["chunks", "stats"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read chunk file"));
}

#[test]
fn test_invalid_retrieval_strategy_rejected_at_startup() {
    let (_tmp, config_path) = setup_test_env("127.0.0.1:0");
    let content = fs::read_to_string(&config_path).unwrap();
    fs::write(
        &config_path,
        content.replace("strategy = \"lexical\"", "strategy = \"hybrid\""),
    )
    .unwrap();

    let (_, stderr, success) = run_chainchat(&config_path, &["chunks", "stats"]);
    assert!(!success);
    assert!(stderr.contains("Unknown retrieval strategy"));
}

#[test]
fn test_missing_config_file_is_fatal() {
    let binary = chainchat_binary();
    let output = Command::new(&binary)
        .args(["--config", "/nonexistent/chainchat.toml", "chunks", "stats"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to read config file"));
}

#[test]
fn test_ask_surfaces_invocation_failure() {
    let (_tmp, config_path) = setup_test_env("127.0.0.1:0");
    // Point the model at an unroutable endpoint; the error must surface
    // within one request cycle.
    let content = fs::read_to_string(&config_path).unwrap();
    fs::write(
        &config_path,
        content.replace(
            "name = \"gpt-4o-mini\"",
            "name = \"gpt-4o-mini\"\nbase_url = \"http://127.0.0.1:1\"\ntimeout_secs = 5",
        ),
    )
    .unwrap();

    let (_, stderr, success) =
        run_chainchat(&config_path, &["ask", "What is inventory turnover?"]);
    assert!(!success);
    assert!(stderr.contains("Model request"));
}

#[test]
fn test_serve_health_endpoint() {
    let bind = "127.0.0.1:39217";
    let (_tmp, config_path) = setup_test_env(bind);

    let binary = chainchat_binary();
    let mut child = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .arg("serve")
        .env("OPENAI_API_KEY", "test-key")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .unwrap();

    let url = format!("http://{}/health", bind);
    let client = reqwest::blocking::Client::new();
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut health: Option<serde_json::Value> = None;

    while Instant::now() < deadline {
        if let Ok(resp) = client.get(&url).send() {
            if resp.status().is_success() {
                health = resp.json().ok();
                break;
            }
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    child.kill().unwrap();
    let _ = child.wait();

    let health = health.expect("server never became healthy");
    assert_eq!(health["status"], "ok");
}
