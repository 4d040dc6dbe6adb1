use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;
use similar::{ChangeTag, TextDiff};

fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf()
}

fn fixture_dir() -> PathBuf {
    project_root().join("fixtures")
}

fn golden_dir() -> PathBuf {
    project_root().join("golden")
}

fn update_golden() -> bool {
    std::env::var("UPDATE_GOLDEN").is_ok()
}

fn diff_strings(expected: &str, actual: &str) -> String {
    let diff = TextDiff::from_lines(expected, actual);
    let mut out = String::new();
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-",
            ChangeTag::Insert => "+",
            ChangeTag::Equal => " ",
        };
        out.push_str(&format!("{sign}{change}"));
    }
    out
}

/// Run the binary against the fixture directory and readings, in the
/// default America/Halifax zone.
fn run(args: &[&str]) -> Output {
    let fixtures = fixture_dir();
    let (command, rest) = args.split_first().expect("subcommand required");

    Command::new(env!("CARGO_BIN_EXE_counterbucket"))
        .arg(command)
        .arg("--directory")
        .arg(fixtures.join("directory.json"))
        .arg("--data")
        .arg(fixtures.join("readings.jsonl"))
        .args(rest)
        .env_remove("COUNTERBUCKET_DIRECTORY")
        .env_remove("COUNTERBUCKET_DATA")
        .env_remove("COUNTERBUCKET_TZ")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute counterbucket")
}

fn run_json(args: &[&str]) -> Value {
    let mut full = args.to_vec();
    full.extend(["--output-format", "json"]);
    let output = run(&full);
    assert!(
        output.status.success(),
        "counterbucket failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("Output is not valid JSON")
}

const GOLDEN_CASES: &[(&str, &[&str])] = &[
    ("report_day", &["report", "--date", "2023-07-21", "--period", "day"]),
    ("report_week", &["report", "--date", "2023-07-19", "--period", "week"]),
    ("report_empty", &["report", "--date", "20230723"]),
    ("records_day", &["records", "--date", "2023-07-21", "--width", "day"]),
    ("series_day", &["series", "--start", "2023-07-21", "--period", "day"]),
];

#[test]
fn golden_text_output() {
    let golden = golden_dir();

    for (name, args) in GOLDEN_CASES {
        let golden_path = golden.join(format!("{name}.txt"));
        let output = run(args);

        assert!(
            output.status.success(),
            "counterbucket failed for {}: {}",
            name,
            String::from_utf8_lossy(&output.stderr)
        );

        let actual = String::from_utf8(output.stdout).expect("Output is not valid UTF-8");

        if update_golden() {
            fs::create_dir_all(&golden).ok();
            fs::write(&golden_path, &actual)
                .unwrap_or_else(|e| panic!("Failed to write golden file {golden_path:?}: {e}"));
            eprintln!("Updated golden file: {golden_path:?}");
            continue;
        }

        let expected = fs::read_to_string(&golden_path).unwrap_or_else(|e| {
            panic!(
                "Golden file {golden_path:?} not found: {e}\n\
                 Hint: Run with UPDATE_GOLDEN=1 to generate golden files"
            )
        });

        if actual != expected {
            let diff = diff_strings(&expected, &actual);
            panic!(
                "Golden test mismatch for {name}:\n\n\
                 {diff}\n\n\
                 Run with UPDATE_GOLDEN=1 to refresh snapshots"
            );
        }
    }
}

#[test]
fn series_hourly_json() {
    let series = run_json(&[
        "series", "--start", "2023-07-21", "--period", "day", "--split", "hour",
    ]);
    let series = series.as_array().unwrap();

    let ids: Vec<&str> = series.iter().map(|s| s["id"].as_str().unwrap()).collect();
    assert_eq!(ids, ["a", "b", "c", "z"]);

    let apple = &series[0];
    assert_eq!(apple["total"], 75);
    assert_eq!(apple["buckets"].as_array().unwrap().len(), 24);
    assert_eq!(apple["buckets"][8]["start"], "2023-07-21T08:00:00-03:00");
    assert_eq!(apple["buckets"][8]["value"], 40);
    assert_eq!(apple["buckets"][17]["value"], 35);
    assert_eq!(apple["last_non_zero"], "2023-07-21T20:00:00Z");

    let cherry = &series[2];
    assert!(cherry["buckets"].as_array().unwrap().is_empty());
    assert_eq!(cherry["last"], "2023-07-21T13:00:00Z");
    assert_eq!(cherry["last_non_zero"], "2023-07-15T15:00:00Z");
}

#[test]
fn walking_mode_selects_other_counters() {
    let series = run_json(&["series", "--start", "2023-07-21", "--mode", "walking"]);
    let series = series.as_array().unwrap();

    assert_eq!(series.len(), 1);
    assert_eq!(series[0]["id"], "w");
    assert_eq!(series[0]["name"], "Waterfront Walkway");
    assert_eq!(series[0]["total"], 999);
}

#[test]
fn records_json() {
    let records = run_json(&["records", "--date", "2023-07-21", "--width", "day"]);

    assert_eq!(records["before"], "2023-07-21T00:00:00-03:00");
    assert_eq!(records["width"], "day");
    assert_eq!(records["sum"], "year_to_date");
    assert_eq!(records["total"], 95);
    assert_eq!(records["counters"]["a"], "year_to_date");
    assert_eq!(records["counters"]["b"], "all_time");
    assert!(records["counters"].get("c").is_none());
}

#[test]
fn yearly_records_have_no_year_to_date() {
    // Every 2023 reading falls in one year period; a and b beat their 2022
    // and empty histories outright.
    let records = run_json(&["records", "--date", "2023-07-21", "--width", "year"]);

    assert_eq!(records["counters"]["a"], "all_time");
    assert_eq!(records["counters"]["b"], "all_time");
    assert_eq!(records["counters"]["c"], "all_time");
    assert_eq!(records["sum"], "none");
}

#[test]
fn report_json() {
    let report = run_json(&["report", "--date", "2023-07-21"]);

    assert_eq!(report["period"], "Fri Jul 21");
    assert_eq!(report["total"], 95);
    assert_eq!(report["record"], "year_to_date");
    assert_eq!(report["counters"][0]["name"], "Apple");
    assert_eq!(report["counters"][1]["record"], "all_time");
    assert_eq!(report["missing"][1]["id"], "c");
    assert_eq!(report["missing"][1]["last_seen"], "2023-07-15T15:00:00Z");
    assert_eq!(
        report["notes"],
        serde_json::json!(["** all-time record", "* year-to-date record"])
    );
}

#[test]
fn reading_at_period_end_is_missing_not_zero() {
    // z's only reading is stamped exactly at the end of Jul 21, so the day
    // bucket is empty while last_non_zero equals the period end.
    let report = run_json(&["report", "--date", "2023-07-21"]);

    let present: Vec<&str> = report["counters"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(present, ["a", "b"]);

    let missing: Vec<&str> = report["missing"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(missing, ["Alder Way", "Cherry Lane"]);
    assert_eq!(report["missing"][0]["last_seen"], "2023-07-22T03:00:00Z");
}

#[test]
fn invalid_width_is_input_error() {
    let output = run(&["records", "--date", "2023-07-21", "--width", "decade"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("decade"));
}

#[test]
fn invalid_timezone_json_envelope() {
    let output = run(&[
        "report",
        "--date",
        "2023-07-21",
        "--tz",
        "Mars/Olympus",
        "--output-format",
        "json",
    ]);
    assert_eq!(output.status.code(), Some(2));

    let envelope: Value = serde_json::from_slice(&output.stderr).expect("stderr is not JSON");
    assert_eq!(envelope["exit_code"], 2);
    assert!(envelope["error"].as_str().unwrap().contains("Mars/Olympus"));
}

#[test]
fn missing_data_file_is_input_error() {
    let output = Command::new(env!("CARGO_BIN_EXE_counterbucket"))
        .args(["report", "--date", "2023-07-21"])
        .arg("--directory")
        .arg(fixture_dir().join("directory.json"))
        .arg("--data")
        .arg(fixture_dir().join("no-such-file.jsonl"))
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute counterbucket");

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to open data file"));
}
