// CLI integration tests: exit codes, output formats, input handling

mod utils;

use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;
use utils::clean_normal_sample;

fn statguard() -> assert_cmd::Command {
    assert_cmd::cargo::cargo_bin_cmd!("statguard")
}

fn write_input(dir: &TempDir, name: &str, value: &serde_json::Value) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, serde_json::to_string(value).unwrap()).unwrap();
    path
}

fn clean_two_groups() -> serde_json::Value {
    serde_json::json!([
        clean_normal_sample(40, 10.0, 2.0, 1),
        clean_normal_sample(40, 11.0, 2.0, 2),
    ])
}

#[test]
fn test_clean_data_exits_zero() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(&tmp, "clean.json", &clean_two_groups());

    statguard()
        .args(["evaluate", "--test", "t_test", "--input"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("✅ PROCEED: t_test"))
        .stdout(predicate::str::contains("Confidence score: 1.00"));
}

#[test]
fn test_critical_violation_exits_two() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(&tmp, "tiny.json", &serde_json::json!([1.0, 2.0, 3.0]));

    statguard()
        .args(["evaluate", "-t", "t_test", "-i"])
        .arg(&input)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("❌ BLOCKED: t_test"))
        .stdout(predicate::str::contains("[CRITICAL] sample_size"));
}

#[test]
fn test_unknown_family_exits_one() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(&tmp, "data.json", &serde_json::json!([1.0, 2.0, 3.0]));

    statguard()
        .args(["evaluate", "--test", "z_test", "--input"])
        .arg(&input)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown test family: 'z_test'"));
}

#[test]
fn test_invalid_json_exits_one() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("broken.json");
    fs::write(&path, "{not json").unwrap();

    statguard()
        .args(["evaluate", "--test", "t_test", "--input"])
        .arg(&path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Input is not valid JSON"));
}

#[test]
fn test_shape_mismatch_exits_one() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(&tmp, "single.json", &serde_json::json!([1.0, 2.0, 3.0, 4.0, 5.0]));

    statguard()
        .args(["evaluate", "--test", "regression", "--input"])
        .arg(&input)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("expects"));
}

#[test]
fn test_json_format() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(&tmp, "tiny.json", &serde_json::json!([1.0, 2.0, 3.0]));

    let output = statguard()
        .args(["evaluate", "--test", "t_test", "--format", "json", "--input"])
        .arg(&input)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));

    let verdict: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(verdict["can_proceed"], false);
    assert_eq!(verdict["test_family"], "t_test");
    assert_eq!(verdict["violations"][0]["assumption"], "sample_size");
    assert!(verdict["policy_fingerprint"].as_str().unwrap().len() == 64);
}

#[test]
fn test_envelope_from_stdin() {
    let envelope = serde_json::json!({
        "test": "t_test",
        "alpha": 0.01,
        "data": clean_two_groups(),
    });

    let output = statguard()
        .args(["evaluate", "--format", "json"])
        .write_stdin(serde_json::to_string(&envelope).unwrap())
        .output()
        .unwrap();
    assert!(output.status.success());

    let verdict: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(verdict["alpha"], 0.01);
    assert_eq!(verdict["can_proceed"], true);
}

#[test]
fn test_flag_overrides_envelope_family() {
    let tmp = TempDir::new().unwrap();
    let envelope = serde_json::json!({"test": "regression", "data": [1.0, 2.0, 3.0]});
    let input = write_input(&tmp, "envelope.json", &envelope);

    // bootstrap accepts any shape and only checks independence
    statguard()
        .args(["evaluate", "--test", "bootstrap", "--input"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("✅ PROCEED: bootstrap"));
}

#[test]
fn test_missing_family_exits_one() {
    statguard()
        .arg("evaluate")
        .write_stdin("[1, 2, 3]")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No test family given"));
}

#[test]
fn test_requirements_lists_every_family() {
    statguard()
        .arg("requirements")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "regression       sample_size, linearity, homoscedasticity, normality, independence, outliers",
        ))
        .stdout(predicate::str::contains("bootstrap        independence"));
}

#[test]
fn test_requirements_single_family() {
    statguard()
        .args(["requirements", "--test", "welch_t_test"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sample_size, normality, independence, outliers"))
        .stdout(predicate::str::contains("anova").not());
}

#[test]
fn test_policy_prints_toml_with_fingerprint() {
    statguard()
        .args(["policy", "--preset", "strict"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("# fingerprint: "))
        .stdout(predicate::str::contains("significance_level = 0.1"));
}

#[test]
fn test_policy_file_changes_verdict() {
    let tmp = TempDir::new().unwrap();
    let policy = tmp.path().join("policy.toml");
    fs::write(
        &policy,
        r#"
[sample_size]
critical_floor = 2
recommended_min = 3
"#,
    )
    .unwrap();
    let input = write_input(&tmp, "data.json", &serde_json::json!({"values": [1.0, 2.0, 3.0]}));

    statguard()
        .args(["evaluate", "--test", "t_test", "--input"])
        .arg(&input)
        .arg("--policy")
        .arg(&policy)
        .assert()
        .success();
}

#[test]
fn test_invalid_policy_file_exits_one() {
    let tmp = TempDir::new().unwrap();
    let policy = tmp.path().join("policy.toml");
    fs::write(&policy, "significance_level = 2.0\n").unwrap();

    statguard()
        .args(["policy", "--policy"])
        .arg(&policy)
        .assert()
        .code(1);
}

#[test]
fn test_diagnostics_payload() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(&tmp, "groups.json", &serde_json::json!([[1, 2, 3], [4, 5, 6, 7]]));

    let output = statguard()
        .args(["diagnostics", "--input"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success());

    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["groups"].as_array().unwrap().len(), 2);
    assert_eq!(payload["qq_plot"].as_array().unwrap().len(), 7);
}

#[test]
fn test_diagnostics_unrecognized_shape_is_empty() {
    let output = statguard()
        .arg("diagnostics")
        .write_stdin(r#"{"unexpected": true}"#)
        .output()
        .unwrap();
    assert!(output.status.success());

    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(payload["groups"].as_array().unwrap().is_empty());
    assert!(payload["qq_plot"].as_array().unwrap().is_empty());
}

#[test]
fn test_debug_logs_to_stderr() {
    statguard()
        .args(["--debug", "evaluate", "--test", "bootstrap"])
        .write_stdin("[1, 2, 3, 4, 5]")
        .assert()
        .success()
        .stderr(predicate::str::contains("verdict"));
}
