use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
    process::Command,
};

#[derive(Deserialize)]
struct Series {
    i: Vec<f64>,
    d: Vec<f64>,
}

#[derive(Deserialize)]
struct DailyChange {
    d: Vec<f64>,
}

#[derive(Deserialize)]
struct Lockdown {
    triggered: bool,
    day: Option<usize>,
}

#[derive(Deserialize)]
struct FinalTotals {
    day: Option<usize>,
    deaths: f64,
}

#[derive(Deserialize)]
struct Results {
    series: Series,
    daily_change: DailyChange,
    lockdown: Lockdown,
    final_totals: FinalTotals,
}

fn run_bin(args: &[&str]) -> bool {
    let bin = PathBuf::from(env!("CARGO_BIN_EXE_contagio"));

    let output = Command::new(bin)
        .args(args)
        .output()
        .expect("failed to execute command");

    output.status.success()
}

fn read_results(path: PathBuf) -> Results {
    let bytes = fs::read(&path).expect("failed to read results file");
    rmp_serde::from_slice(&bytes).expect("failed to deserialize results")
}

fn write_config(sim_dir: &Path, days_per_file: usize) {
    let config_contents = String::new()
        + "[model]\n"
        + "mu_s = 0.0\n"
        + "mu_e = 0.0\n"
        + "mu_i = 0.018\n"
        + "mu_r = 0.0\n"
        + "nu = 0.0\n"
        + "gamma = 0.07142857142857142\n"
        + "sigma = 0.05555555555555555\n"
        + "b_e_init = 3.0\n"
        + "b_e_final = 0.5\n"
        + "eta = 0.0011\n"
        + "b_i = 0.01\n"
        + "delta = 0.0001\n"
        + "\n"
        + "[init]\n"
        + "n_pop = 1368000000.0\n"
        + "n_exposed = 8.0\n"
        + "\n"
        + "[lockdown]\n"
        + "threshold = 1000.0\n"
        + "effectiveness = 28.0\n"
        + "\n"
        + "[output]\n"
        + "n_days = 1000\n"
        + &format!("days_per_file = {days_per_file}\n");

    fs::write(sim_dir.join("config.toml"), config_contents).expect("failed to write config file");
}

#[test]
fn basic_workflow() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("basic_workflow");

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");

    write_config(&test_dir, 400);

    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    assert!(run_bin(&["--sim-dir", test_dir_str, "create"]));
    assert!(run_bin(&["--sim-dir", test_dir_str, "create"]));

    assert!(run_bin(&["--sim-dir", test_dir_str, "resume", "--run-idx", "0"]));
    assert!(run_bin(&["--sim-dir", test_dir_str, "resume", "--run-idx", "0"]));
    assert!(!run_bin(&["--sim-dir", test_dir_str, "resume", "--run-idx", "0"]));

    assert!(run_bin(&["--sim-dir", test_dir_str, "analyze"]));

    let full = read_results(test_dir.join("run-0000").join("results.msgpack"));
    assert_eq!(full.series.i.len(), 1000);
    assert_eq!(full.series.d.len(), 1000);
    assert_eq!(full.daily_change.d.len(), 999);
    assert!(full.lockdown.triggered);
    assert_eq!(full.lockdown.day, Some(23));
    assert_eq!(full.final_totals.day, Some(999));
    assert!((full.final_totals.deaths - 4371.07536149025).abs() < 1e-3);

    let partial = read_results(test_dir.join("run-0001").join("results.msgpack"));
    assert_eq!(partial.series.i.len(), 400);
    assert_eq!(partial.series.i[..], full.series.i[..400]);
    assert_eq!(partial.final_totals.day, Some(399));

    assert!(run_bin(&["--sim-dir", test_dir_str, "clean"]));
    assert!(!test_dir.join("run-0000").exists());

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn rejects_invalid_config() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("rejects_invalid_config");

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");

    fs::write(test_dir.join("config.toml"), "[model]\nmu_s = 0.0\n")
        .expect("failed to write config file");

    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    assert!(!run_bin(&["--sim-dir", test_dir_str, "create"]));
    assert!(!test_dir.join("run-0000").exists());

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn resumed_run_matches_uninterrupted_run() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("resumed_run");
    let split_dir = test_dir.join("split");
    let whole_dir = test_dir.join("whole");

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir_all(&split_dir).expect("failed to create split directory");
    fs::create_dir_all(&whole_dir).expect("failed to create whole directory");

    write_config(&split_dir, 300);
    write_config(&whole_dir, 1000);

    let split_str = split_dir.to_str().expect("failed to convert path to string");
    let whole_str = whole_dir.to_str().expect("failed to convert path to string");

    assert!(run_bin(&["--sim-dir", split_str, "create"]));
    for _ in 0..3 {
        assert!(run_bin(&["--sim-dir", split_str, "resume", "--run-idx", "0"]));
    }
    assert!(run_bin(&["--sim-dir", split_str, "analyze"]));

    assert!(run_bin(&["--sim-dir", whole_str, "create"]));
    assert!(run_bin(&["--sim-dir", whole_str, "analyze"]));

    let split = read_results(split_dir.join("run-0000").join("results.msgpack"));
    let whole = read_results(whole_dir.join("run-0000").join("results.msgpack"));

    assert_eq!(split.series.i.len(), 1000);
    assert_eq!(split.series.i, whole.series.i);
    assert_eq!(split.series.d, whole.series.d);
    assert_eq!(split.daily_change.d, whole.daily_change.d);
    assert_eq!(split.lockdown.day, whole.lockdown.day);
    assert_eq!(split.final_totals.deaths, whole.final_totals.deaths);

    fs::remove_dir_all(&test_dir).ok();
}
