use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn etc(file: &str) -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../etc")).join(file)
}

// Small rig: short travel and quick ramps so the simulation stays cheap.
const SMALL_RIG: &str = r#"
[pins]
top_limit = 42
bottom_limit = 39
left_limit = 41
right_limit = 38
top_spray = 34
bottom_spray = 35
status_led = 13

[axes.horizontal]
drivers = [{ enable = 25, dir = 23, step = 24 }]
min_delay_us = 100
max_delay_us = 400
ramp_steps = 4
stroke_gap = 10

[axes.vertical]
drivers = [{ enable = 28, dir = 27, step = 26 }]
min_delay_us = 100
max_delay_us = 400
ramp_steps = 4
stroke_gap = 10

[run]
passes = [{ home = "up" }]
"#;

fn write(dir: &tempfile::TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, text).unwrap();
    path
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["check"], 0, "top_limit", "stdout")]
#[case(&["spray-plan", "--strokes", "3"], 0, "stroke 3: both", "stdout")]
#[case(&["simulate", "--scenario"], 0, "simulation complete: 2 strokes", "stdout")]
#[case(&["run"], 1, "no GPIO backend", "stderr")]
#[case(&["bogus"], 2, "unrecognized subcommand", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let mut cmd = Command::cargo_bin("stainer").unwrap();

    // Always include the reference config to avoid relying on the cwd
    cmd.arg("--config").arg(etc("stainer.toml"));
    for a in args {
        cmd.arg(a);
    }
    if args.last() == Some(&"--scenario") {
        cmd.arg(etc("scenario.toml"));
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
fn shipped_scenario_reports_both_strokes_as_json() {
    let out = Command::cargo_bin("stainer")
        .unwrap()
        .arg("--json")
        .arg("--config")
        .arg(etc("stainer.toml"))
        .arg("simulate")
        .arg("--scenario")
        .arg(etc("scenario.toml"))
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("stdout is one JSON object");
    assert_eq!(v["counters"]["horizontal"], 2);
    assert_eq!(v["counters"]["vertical"], 0);
    let strokes = v["passes"][0]["strokes"].as_array().unwrap();
    assert_eq!(strokes.len(), 2);
    assert!(strokes.iter().all(|s| s["endpoint"] == "right"));
    assert!(strokes.iter().all(|s| s["spray"] == "top-only"));
    assert_eq!(v["simulation"]["pending_taps"], 0);
    // Second transition stopped on the bottom limit.
    assert_eq!(v["simulation"]["vertical_position"], 5000);
}

#[rstest]
fn missing_operator_trips_the_watchdog() {
    let dir = tempdir().unwrap();
    let cfg = write(&dir, "rig.toml", SMALL_RIG);
    let scenario = write(
        &dir,
        "idle.toml",
        "switch_wait_ms = 500\nblink_cycles = 1\n[horizontal]\nlength = 30\nstart = 15\n[vertical]\nlength = 25\nstart = 5\n",
    );

    Command::cargo_bin("stainer")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("simulate")
        .arg("--scenario")
        .arg(&scenario)
        .assert()
        .code(8)
        .stderr(predicate::str::contains("exceeded the watchdog"));
}

#[rstest]
fn watchdog_fault_as_json_carries_details() {
    let dir = tempdir().unwrap();
    let cfg = write(&dir, "rig.toml", SMALL_RIG);
    let scenario = write(
        &dir,
        "idle.toml",
        "switch_wait_ms = 500\nblink_cycles = 1\n[horizontal]\nlength = 30\nstart = 15\n[vertical]\nlength = 25\nstart = 5\n",
    );

    let out = Command::cargo_bin("stainer")
        .unwrap()
        .args(["--json", "--config"])
        .arg(&cfg)
        .arg("simulate")
        .arg("--scenario")
        .arg(&scenario)
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(8));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["reason"], "WaitTimeout");
    assert_eq!(v["details"]["switch_wait_ms"], 500);
}

#[rstest]
fn strict_rig_halts_when_a_transition_hits_the_boundary() {
    let dir = tempdir().unwrap();
    let cfg = write(
        &dir,
        "rig.toml",
        &format!("{SMALL_RIG}\n").replace(
            "[run]\n",
            "[run]\nstrictness = \"strict\"\n",
        ),
    );
    // Vertical travel 15 with gap 10: the second transition runs into the
    // bottom limit after 5 steps. Strokes are passive, so the head is moved
    // by hand.
    let scenario = write(
        &dir,
        "short.toml",
        r#"
taps = ["left", "left", "right", "right", "right", "left"]
tap_press_ms = 300
tap_release_ms = 300
switch_wait_ms = 5000
blink_cycles = 1
stroke_mode = "passive"
[horizontal]
length = 30
start = 15
[vertical]
length = 15
start = 5
"#,
    );

    Command::cargo_bin("stainer")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("simulate")
        .arg("--scenario")
        .arg(&scenario)
        .assert()
        .code(7)
        .stderr(predicate::str::contains("boundary limit tripped"));
}

#[rstest]
fn invalid_config_is_explained() {
    let dir = tempdir().unwrap();
    let cfg = write(
        &dir,
        "bad.toml",
        &SMALL_RIG.replacen("min_delay_us = 100", "min_delay_us = 900", 1),
    );

    Command::cargo_bin("stainer")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "axes.horizontal.min_delay_us must be <= max_delay_us",
        ));
}

#[rstest]
fn check_json_lists_pins() {
    let out = Command::cargo_bin("stainer")
        .unwrap()
        .arg("--json")
        .arg("--config")
        .arg(etc("stainer.toml"))
        .arg("check")
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["ok"], true);
    assert_eq!(v["pins"]["top_limit"], 42);
    assert_eq!(v["pins"]["vertical[1].step"], 30);
    assert_eq!(v["passes"], serde_json::json!(["up", "left"]));
}

#[rstest]
fn log_file_is_written() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("stainer.log");
    let cfg = write(
        &dir,
        "rig.toml",
        &format!(
            "{SMALL_RIG}\n[logging]\nfile = \"{}\"\nlevel = \"debug\"\n",
            log.display()
        ),
    );

    Command::cargo_bin("stainer")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("spray-plan")
        .arg("--strokes")
        .arg("1")
        .assert()
        .success();

    let text = fs::read_to_string(&log).expect("log file created");
    assert!(text.contains("config loaded"));
}
