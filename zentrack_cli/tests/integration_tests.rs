//! Integration tests for the zentrack binary.
//!
//! These tests verify end-to-end behavior including:
//! - Assessment from answers, intervals and interval files
//! - Journal logging and dry runs
//! - Model artifact caching and retraining
//! - History analytics

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to create a test data directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Helper to get the CLI binary, isolated from any user config
fn cli(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("zentrack"));
    cmd.env("XDG_CONFIG_HOME", temp_dir.path().join("config"))
        .env("RUST_LOG", "warn")
        .arg("--data-dir")
        .arg(temp_dir.path().join("data"));
    cmd
}

const SCENARIO_A: &str = "800,810,790,805,795,815,800,790,805,800";

#[test]
fn test_cli_help() {
    let temp_dir = setup_test_dir();
    cli(&temp_dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("stress assessment"));
}

#[test]
fn test_assess_high_answers_json() {
    let temp_dir = setup_test_dir();

    let output = cli(&temp_dir)
        .args(["assess", "--answers", "3,3,3,3,3,3,3,3,3", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).expect("stdout should be JSON");
    assert_eq!(json["stress_level"], "High");
    assert_eq!(json["anxiety_score"], 27);
    assert_eq!(json["therapy_recommendation"]["primary"], "chatbot");
    assert_eq!(json["model_kind"], "random_forest");

    let p = &json["probabilities"];
    let total: f64 = ["low", "moderate", "high"]
        .iter()
        .map(|k| p[*k].as_f64().unwrap())
        .sum();
    assert!((total - 100.0).abs() <= 0.1);
}

#[test]
fn test_assess_intervals_reports_no_score() {
    let temp_dir = setup_test_dir();

    let output = cli(&temp_dir)
        .args(["assess", "--rr", SCENARIO_A, "--json", "--dry-run"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["hrv_features"]["mean_hr"], 74.91);
    assert!(json["anxiety_score"].is_null());
}

#[test]
fn test_assess_from_rr_file() {
    let temp_dir = setup_test_dir();
    let rr_path = temp_dir.path().join("rr.txt");
    fs::write(&rr_path, SCENARIO_A.replace(',', "\n")).unwrap();

    cli(&temp_dir)
        .arg("assess")
        .arg("--rr-file")
        .arg(&rr_path)
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("mean HR 74.91 bpm"))
        .stdout(predicate::str::contains("Anxiety score: not provided"));
}

#[test]
fn test_assess_logs_to_journal() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir)
        .args(["assess", "--answers", "0,0,1,0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Assessment logged"));

    let journal = temp_dir.path().join("data").join("assessments.jsonl");
    let content = fs::read_to_string(&journal).expect("Failed to read journal");
    assert_eq!(content.lines().count(), 1);
    assert!(content.contains("\"stress_level\":\"Low\""));
}

#[test]
fn test_dry_run_does_not_log() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir)
        .args(["assess", "--score", "20", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run"));

    assert!(!temp_dir.path().join("data").join("assessments.jsonl").exists());
}

#[test]
fn test_missing_input_fails() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir)
        .arg("assess")
        .assert()
        .failure()
        .stderr(predicate::str::contains("MissingInput"));
}

#[test]
fn test_short_series_fails() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir)
        .args(["assess", "--rr", "800,810,790"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("InsufficientData"));
}

#[test]
fn test_invalid_model_kind_fails() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir)
        .args(["--model-kind", "knn", "assess", "--score", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("InvalidModelKind"));
}

#[test]
fn test_train_then_load() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir)
        .args(["--model-kind", "svm", "train"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Trained svm model"));

    let models = temp_dir.path().join("data").join("models");
    assert!(models.join("stress_model_svm.json").exists());
    assert!(models.join("stress_scaler_svm.json").exists());

    cli(&temp_dir)
        .args(["--model-kind", "svm", "train"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded stored svm model"));

    cli(&temp_dir)
        .args(["--model-kind", "svm", "train", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Trained svm model"));
}

#[test]
fn test_corrupt_artifact_is_retrained() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir).arg("train").assert().success();

    let model_path = temp_dir
        .path()
        .join("data")
        .join("models")
        .join("stress_model_random_forest.json");
    fs::write(&model_path, "{ truncated").unwrap();

    cli(&temp_dir)
        .arg("train")
        .assert()
        .success()
        .stdout(predicate::str::contains("Trained random_forest model"));

    let reloaded = fs::read_to_string(&model_path).unwrap();
    assert!(serde_json::from_str::<serde_json::Value>(&reloaded).is_ok());
}

#[test]
fn test_history_summarizes_journal() {
    let temp_dir = setup_test_dir();

    for answers in ["3,3,3,3,3,3,3,3,3", "0,0,1,0", "3,3,3,3,3,3,3,3,3"] {
        cli(&temp_dir)
            .args(["assess", "--answers", answers])
            .assert()
            .success();
    }

    let output = cli(&temp_dir)
        .args(["history", "--days", "7", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["total_sessions"], 3);
    assert_eq!(json["stress_distribution"]["High"], 2);
    assert_eq!(json["stress_distribution"]["Low"], 1);
    assert_eq!(json["average_anxiety_score"], 18.33);
    assert_eq!(json["period_days"], 7);
    assert_eq!(json["timeline"].as_array().unwrap().len(), 3);
}

#[test]
fn test_history_with_huge_window() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir)
        .args(["assess", "--score", "5"])
        .assert()
        .success();

    cli(&temp_dir)
        .args(["history", "--days", "100000000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Last 100000000 days: 1 assessments"));
}

#[test]
fn test_history_empty() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("Last 30 days: 0 assessments"));
}

#[test]
fn test_recommend_known_and_unknown_levels() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir)
        .args(["recommend", "moderate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Yoga Therapy"));

    cli(&temp_dir)
        .args(["recommend", "Extreme"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Your stress level is moderate"));
}
