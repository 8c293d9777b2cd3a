use std::process::{Command, Output};
use tempfile::TempDir;

/// Run the binary in an empty directory, without credentials or reachable hosts
fn run_chef(dir: &TempDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_engageny-chef"))
        .args(args)
        .current_dir(dir.path())
        .env_remove("GOOGLE_APPLICATION_CREDENTIALS")
        .env_remove("RUST_LOG")
        .env("CHEF_BASE_URL", "http://127.0.0.1:9")
        .env("CHEF_TRANSLATE_ENDPOINT", "http://127.0.0.1:9/translate")
        .output()
        .unwrap()
}

#[test]
fn test_missing_credentials_fails_before_network() {
    let dir = TempDir::new().unwrap();
    let output = run_chef(&dir, &["--token=abc123", "lang=es"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("GOOGLE_APPLICATION_CREDENTIALS"), "stderr: {stderr}");
    assert!(!dir.path().join(".webcache").exists());
    assert!(!dir.path().join("chefdata").exists());
}

#[test]
fn test_reset_keeps_caches_when_credentials_are_missing() {
    let dir = TempDir::new().unwrap();
    let web_cache = dir.path().join(".webcache");
    std::fs::create_dir_all(&web_cache).unwrap();
    std::fs::write(web_cache.join("page"), "cached").unwrap();

    let output = run_chef(&dir, &["--reset", "lang=es"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("GOOGLE_APPLICATION_CREDENTIALS"), "stderr: {stderr}");
    assert_eq!(std::fs::read_to_string(web_cache.join("page")).unwrap(), "cached");
}

#[test]
fn test_missing_lang_lists_supported_languages() {
    let dir = TempDir::new().unwrap();
    let output = run_chef(&dir, &["--token=abc123"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("`lang` is a required argument, choose from one of: ar, bn, en, es, zh-cn, zh-tw"),
        "stderr: {stderr}"
    );
}

#[test]
fn test_unreadable_credentials_file() {
    let dir = TempDir::new().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_engageny-chef"))
        .arg("lang=es")
        .current_dir(dir.path())
        .env("GOOGLE_APPLICATION_CREDENTIALS", dir.path().join("missing.json"))
        .env("CHEF_BASE_URL", "http://127.0.0.1:9")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Credentials error"), "stderr: {stderr}");
}

#[test]
fn test_malformed_option_is_rejected() {
    let dir = TempDir::new().unwrap();
    let output = run_chef(&dir, &["lang"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("expected key=value"), "stderr: {stderr}");
}
