use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn larder_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("larder");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    fs::create_dir_all(root.join("config")).unwrap();
    fs::create_dir_all(root.join("data")).unwrap();

    fs::write(
        root.join("recipes_with_tags.json"),
        r#"[
  {"name": "Chicken Tikka Masala", "reference": "https://example.com/ctm", "tags": ["Indian", "Chicken", "Curry"]},
  {"name": "Shakshuka", "reference": "https://example.com/shakshuka", "tags": ["Middle Eastern", "Eggs"]},
  {"name": "Pho", "reference": "https://example.com/pho", "tags": ["Vietnamese", "Soup"]}
]"#,
    )
    .unwrap();

    let config_content = format!(
        r#"[db]
path = "{root}/data/larder.sqlite"

[server]
bind = "127.0.0.1:0"

[auth]
mode = "disabled"

[seed]
path = "{root}/recipes_with_tags.json"
"#,
        root = root.display()
    );

    let config_path = root.join("config/larder.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_larder(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = larder_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run larder binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_larder(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_larder(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_larder(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_seed_and_export_roundtrip() {
    let (tmp, config_path) = setup_test_env();

    run_larder(&config_path, &["init"]);
    let (stdout, stderr, success) = run_larder(&config_path, &["seed"]);
    assert!(success, "seed failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Seeded 3 recipes"));

    let export_path = tmp.path().join("export.json");
    let (_, stderr, success) = run_larder(
        &config_path,
        &["export", "--output", export_path.to_str().unwrap()],
    );
    assert!(success, "export failed: stderr={}", stderr);

    let exported: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&export_path).unwrap()).unwrap();
    let rows = exported.as_array().unwrap();
    assert_eq!(rows.len(), 3);

    // Seeded rows must round-trip their fields through the store.
    let pho = rows
        .iter()
        .find(|r| r["name"] == "Pho")
        .expect("Pho missing from export");
    assert_eq!(pho["reference"], "https://example.com/pho");
    assert_eq!(pho["version"], 1);
    assert_eq!(pho["tags"][0], "Vietnamese");
}

#[test]
fn test_seed_refuses_nonempty_store() {
    let (_tmp, config_path) = setup_test_env();

    run_larder(&config_path, &["init"]);
    let (_, _, success1) = run_larder(&config_path, &["seed"]);
    assert!(success1, "First seed failed");

    let (_, stderr, success2) = run_larder(&config_path, &["seed"]);
    assert!(!success2, "Second seed should refuse a non-empty store");
    assert!(stderr.contains("refusing to seed"));
}

#[test]
fn test_export_to_stdout() {
    let (_tmp, config_path) = setup_test_env();

    run_larder(&config_path, &["init"]);
    run_larder(&config_path, &["seed"]);

    let (stdout, stderr, success) = run_larder(&config_path, &["export"]);
    assert!(success, "export failed: stderr={}", stderr);
    let rows: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 3);
}

#[test]
fn test_tag_fixture_requires_provider() {
    let (tmp, config_path) = setup_test_env();

    let input = tmp.path().join("recipes_with_tags.json");
    let output = tmp.path().join("tagged.json");
    let (_, stderr, success) = run_larder(
        &config_path,
        &[
            "tag-fixture",
            input.to_str().unwrap(),
            output.to_str().unwrap(),
        ],
    );
    assert!(!success, "tag-fixture should fail with provider disabled");
    assert!(stderr.contains("generation.provider"));
}

#[test]
fn test_missing_config_fails() {
    let (tmp, _) = setup_test_env();
    let missing = tmp.path().join("nope.toml");
    let (_, stderr, success) = run_larder(&missing, &["init"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}
