use std::fs;
use tempfile::TempDir;

use docctx_core::config::{Config, EstimatorKind};
use docctx_core::Error;

#[test]
fn load_for_env_merges_overlay_file() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("config.toml"), "[retrieval]\ntop_k = 8\ntoken_budget = 1500\n").unwrap();
    fs::write(dir.join("config.prod.toml"), "[retrieval]\ntop_k = 20\nestimator = \"heuristic\"\n").unwrap();

    let settings = Config::load_for_env(dir, "prod").expect("load").retrieval().expect("retrieval");

    assert_eq!(settings.top_k, 20, "overlay wins over base file");
    assert_eq!(settings.token_budget, 1500, "base file value survives");
    assert_eq!(settings.estimator, EstimatorKind::Heuristic);
    assert_eq!(settings.chars_per_token, 4, "unset keys keep defaults");
}

#[test]
fn missing_files_fall_back_to_defaults() {
    let tmp = TempDir::new().unwrap();
    let settings = Config::load_for_env(tmp.path(), "dev").expect("load").retrieval().expect("retrieval");
    assert_eq!(settings.top_k, 12);
    assert_eq!(settings.model, "gpt-4o");
}

#[test]
fn invalid_weight_fails_fast() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("config.toml"), "[retrieval]\nlexical_weight = 1.5\n").unwrap();

    let err = Config::load_for_env(tmp.path(), "test").expect("load").retrieval().unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)), "got {err}");
}

#[test]
fn malformed_value_is_a_config_error() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("config.toml"), "[retrieval]\ntop_k = \"many\"\n").unwrap();

    let err = Config::load_for_env(tmp.path(), "test").expect("load").retrieval().unwrap_err();
    assert!(matches!(err, Error::Config(_)), "got {err}");
}

#[test]
fn tokenizer_path_expands_env_vars() {
    std::env::set_var("DOCCTX_TEST_MODELS", "/opt/models");
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("config.toml"),
        "[retrieval]\nestimator = \"huggingface\"\ntokenizer_path = \"${DOCCTX_TEST_MODELS}/tokenizer.json\"\n",
    )
    .unwrap();

    let settings = Config::load_for_env(tmp.path(), "test").expect("load").retrieval().expect("retrieval");
    assert_eq!(settings.tokenizer_path().expect("path"), std::path::PathBuf::from("/opt/models/tokenizer.json"));
}

#[test]
fn tracing_installs_once() {
    docctx_core::logging::init_tracing("info");
    // a second install in the same process is refused, not a panic
    assert!(!docctx_core::logging::init_tracing("debug"));
}
