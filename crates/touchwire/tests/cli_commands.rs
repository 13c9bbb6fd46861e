#![cfg(feature = "cli")]

use std::process::Command;

fn touchwire() -> Command {
    Command::new(env!("CARGO_BIN_EXE_touchwire"))
}

#[test]
fn version_prints_the_package_version() {
    let output = touchwire()
        .arg("version")
        .output()
        .expect("version should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("touchwire {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn extended_version_lists_features() {
    let output = touchwire()
        .args(["version", "--extended"])
        .output()
        .expect("version should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("name: touchwire"));
    assert!(stdout.contains("features: engine=true, sim=true, cli=true"));
}

#[test]
fn identify_reports_the_simulated_device() {
    let output = touchwire()
        .args(["--format", "json", "--log-level", "error", "identify"])
        .output()
        .expect("identify should run");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("identify output should be json");
    assert_eq!(value["part_number"], "TW4150");
    assert_eq!(value["mode_name"], "APPLICATION_FIRMWARE");
    // Device cap of 256 bounds the unbounded configured write size.
    assert_eq!(value["write_chunk_size"], 256);
    assert_eq!(value["application"]["max_x"], 719);
}

#[test]
fn identify_works_with_tight_chunk_bounds() {
    let output = touchwire()
        .args([
            "--format",
            "json",
            "--log-level",
            "error",
            "identify",
            "--rd-chunk",
            "9",
            "--wr-chunk",
            "8",
        ])
        .output()
        .expect("identify should run");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("identify output should be json");
    assert_eq!(value["part_number"], "TW4150");
    assert_eq!(value["write_chunk_size"], 8);
}

#[test]
fn monitor_prints_the_scripted_reports() {
    let output = touchwire()
        .args([
            "--format",
            "pretty",
            "--log-level",
            "error",
            "monitor",
            "--reports",
            "4",
            "--interval-ms",
            "5",
        ])
        .output()
        .expect("monitor should run");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let reports: Vec<&str> = stdout
        .lines()
        .filter(|line| line.starts_with("report "))
        .collect();
    assert_eq!(reports.len(), 4, "stdout: {stdout}");
    assert!(reports[0].contains("TOUCH"));
    assert!(reports[1].contains("DELTA"));
}

#[test]
fn exercise_sweep_passes_end_to_end() {
    let output = touchwire()
        .args([
            "--format",
            "json",
            "--log-level",
            "error",
            "exercise",
            "--payload-max",
            "128",
        ])
        .output()
        .expect("exercise should run");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("exercise output should be json");
    assert_eq!(value["overall"], "pass");
    assert_eq!(value["rows"].as_array().map(Vec::len), Some(20));
}

#[test]
fn unknown_subcommand_fails_with_usage_error() {
    let output = touchwire()
        .arg("frobnicate")
        .output()
        .expect("spawn should work");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("frobnicate"));
}
