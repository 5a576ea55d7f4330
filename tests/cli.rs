use std::fs;
use std::process::Command;

use tempfile::tempdir;

fn cohort() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_cohort"));
    command.env("RUST_LOG", "error");
    command
}

#[test]
fn generate_writes_one_csv_row_per_student() {
    let output = cohort()
        .args(["generate", "--size", "5", "--seed", "42"])
        .output()
        .expect("run cohort cli");
    assert!(output.status.success(), "CLI exited with {:?}", output.status);

    let stdout = String::from_utf8(output.stdout).expect("utf-8 output");
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 6);
    assert!(lines[0].starts_with("student_id,name,class,"));
    assert!(lines[5].starts_with("S1004,"));
}

#[test]
fn generate_to_file_is_reproducible() {
    let tmp = tempdir().expect("temporary directory");
    let first = tmp.path().join("first.csv");
    let second = tmp.path().join("second.csv");

    for path in [&first, &second] {
        let status = cohort()
            .args(["generate", "--size", "40", "--seed", "-9", "--output"])
            .arg(path)
            .status()
            .expect("run cohort cli");
        assert!(status.success(), "CLI exited with status {status:?}");
    }
    let a = fs::read_to_string(&first).expect("read first csv");
    let b = fs::read_to_string(&second).expect("read second csv");
    assert_eq!(a, b);
    assert_eq!(a.lines().count(), 41);
}

#[test]
fn analyze_emits_parseable_toml_honoring_the_config_file() {
    let tmp = tempdir().expect("temporary directory");
    let config_path = tmp.path().join("cohort.toml");
    fs::write(
        &config_path,
        "[population]\nsize = 90\nseed = 8\n\n[clustering]\nclusters = 2\n",
    )
    .expect("write config");

    let output = cohort()
        .args(["analyze", "--format", "toml", "--config"])
        .arg(&config_path)
        .output()
        .expect("run cohort cli");
    assert!(output.status.success(), "CLI exited with {:?}", output.status);

    let text = String::from_utf8(output.stdout).expect("utf-8 output");
    let value: toml::Value = toml::from_str(&text).expect("valid TOML report");
    assert_eq!(value["population_size"].as_integer(), Some(90));
    assert_eq!(value["seed"].as_integer(), Some(8));
    assert_eq!(value["clustering"]["clusters"].as_integer(), Some(2));
}

#[test]
fn sweep_prints_one_line_per_seed_in_order() {
    let output = cohort()
        .args(["sweep", "--size", "50", "--seeds", "3,1,2"])
        .output()
        .expect("run cohort cli");
    assert!(output.status.success(), "CLI exited with {:?}", output.status);

    let stdout = String::from_utf8(output.stdout).expect("utf-8 output");
    let seeds: Vec<&str> = stdout
        .lines()
        .map(|l| l.split_whitespace().nth(1).expect("seed column"))
        .collect();
    assert_eq!(seeds, ["3", "1", "2"]);
}

#[test]
fn predict_reports_a_score_in_range() {
    let output = cohort()
        .args([
            "predict",
            "--size",
            "120",
            "--comprehension",
            "85",
            "--attention",
            "80",
            "--focus",
            "82",
            "--retention",
            "78",
            "--engagement-time",
            "90",
        ])
        .output()
        .expect("run cohort cli");
    assert!(output.status.success(), "CLI exited with {:?}", output.status);

    let stdout = String::from_utf8(output.stdout).expect("utf-8 output");
    let score: f64 = stdout
        .split_whitespace()
        .nth(3)
        .and_then(|s| s.parse().ok())
        .expect("numeric prediction");
    assert!((0.0..=100.0).contains(&score));
}

#[test]
fn invalid_config_fails_with_an_error_message() {
    let tmp = tempdir().expect("temporary directory");
    let config_path = tmp.path().join("bad.toml");
    fs::write(&config_path, "[regression]\nlearning_rate = -1.0\n").expect("write config");

    let output = cohort()
        .args(["analyze", "--config"])
        .arg(&config_path)
        .output()
        .expect("run cohort cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).expect("utf-8 output");
    assert!(stderr.contains("Error:"), "stderr was: {stderr}");
    assert!(stderr.contains("regression.learning_rate"));
}
