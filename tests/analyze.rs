use std::path::Path;
use std::process::{Command, Output};

const ACTIVITY: &str = r#"{
  "repositoryId": "acme/web",
  "commits": [
    {"author": {"name": "Alice", "email": "alice@example.com"}, "message": "Add auth middleware",
     "timestamp": "2024-03-01T10:00:00Z", "changedPaths": ["src/auth/mod.rs"]},
    {"author": {"name": "Alice", "email": "alice@example.com"}, "message": "Reviewed Bob's PR",
     "timestamp": "2024-03-02T10:00:00Z", "changedPaths": ["src/api/users.rs"]},
    {"author": {"name": "Bob", "email": "bob@example.com"}, "message": "Merged users endpoint",
     "timestamp": "2024-03-03T10:00:00Z", "changedPaths": ["src/api/users.rs", "README.md"]}
  ],
  "contributors": {
    "alice@example.com": {"identity": "alice@example.com", "displayName": "Alice",
      "email": "alice@example.com", "commitCount": 2, "lastCommitTimestamp": "2024-03-02T10:00:00Z"},
    "bob@example.com": {"identity": "bob@example.com", "displayName": "Bob",
      "email": "bob@example.com", "commitCount": 1, "lastCommitTimestamp": "2024-03-03T10:00:00Z"}
  },
  "files": {
    "README.md": ["bob@example.com"],
    "src/api/users.rs": ["alice@example.com", "bob@example.com"],
    "src/auth/mod.rs": ["alice@example.com"]
  }
}"#;

fn lore(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_lore"))
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap()
}

fn workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("activity.json"), ACTIVITY).unwrap();
    dir
}

#[test]
fn analyze_emits_json_analysis() {
    let dir = workspace();
    let output = lore(
        dir.path(),
        &["analyze", "--activity", "activity.json", "--format", "json"],
    );
    assert!(
        output.status.success(),
        "lore analyze failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["repository"], "acme/web");
    assert_eq!(json["totalFiles"], 3);
    assert_eq!(json["expertProfiles"][0]["name"], "Alice");
    assert_eq!(json["expertProfiles"][0]["expertisePercent"], 100);
    assert_eq!(json["expertProfiles"][1]["expertisePercent"], 50);
    assert!(!json["managementInsights"].as_array().unwrap().is_empty());
}

#[test]
fn analyze_is_deterministic() {
    let dir = workspace();
    let args = ["analyze", "--activity", "activity.json", "--format", "json"];
    let first = lore(dir.path(), &args);
    let second = lore(dir.path(), &args);
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn analyze_text_lists_experts_and_insights() {
    let dir = workspace();
    let output = lore(
        dir.path(),
        &["analyze", "--activity", "activity.json", "--color", "never"],
    );
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Expertise analysis: acme/web"));
    assert!(stdout.contains("Alice"));
    assert!(stdout.contains("Insights:"));
}

#[test]
fn analyze_rejects_empty_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("empty.json"), r#"{"repositoryId": "acme/empty"}"#).unwrap();
    let output = lore(dir.path(), &["analyze", "--activity", "empty.json"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no contributors"), "stderr: {stderr}");
}

#[test]
fn analyze_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let output = lore(dir.path(), &["analyze", "--activity", "nope.json"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not found"));
}

#[test]
fn invalid_config_table_fails() {
    let dir = workspace();
    std::fs::write(
        dir.path().join(".lore.toml"),
        "[ownership]\nmedium_from = 0.9\nhigh_from = 0.1\n",
    )
    .unwrap();
    let output = lore(dir.path(), &["analyze", "--activity", "activity.json"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("configuration error"));
}

#[test]
fn experts_from_saved_analysis() {
    let dir = workspace();
    let saved = lore(
        dir.path(),
        &["analyze", "--activity", "activity.json", "--format", "json"],
    );
    assert!(saved.status.success());
    std::fs::write(dir.path().join("analysis.json"), &saved.stdout).unwrap();

    let output = lore(
        dir.path(),
        &[
            "experts",
            "./src/api/users.rs",
            "--analysis",
            "analysis.json",
            "--format",
            "json",
        ],
    );
    assert!(
        output.status.success(),
        "lore experts failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let experts = json["experts"].as_array().unwrap();
    assert_eq!(experts.len(), 2);
    assert_eq!(experts[0]["identity"], "alice@example.com");
}

#[test]
fn experts_unknown_path_fails() {
    let dir = workspace();
    let output = lore(
        dir.path(),
        &["experts", "src/missing.rs", "--activity", "activity.json"],
    );
    assert!(!output.status.success());
}

#[test]
fn fingerprint_is_stable_hex() {
    let dir = workspace();
    let first = lore(dir.path(), &["fingerprint", "--activity", "activity.json"]);
    let second = lore(dir.path(), &["fingerprint", "--activity", "activity.json"]);
    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);

    let digest = String::from_utf8_lossy(&first.stdout).trim().to_string();
    assert_eq!(digest.len(), 64);
    assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
}
