use assert_cmd::Command;
use predicates::prelude::*;

/// The binary, isolated from any `vkmatmul.toml` and `VKMATMUL_*` variables.
fn vkmatmul(dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("vkmatmul").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("VKMATMUL_MATRIX_SIZE")
        .env_remove("VKMATMUL_KERNEL_PATH")
        .env_remove("VKMATMUL_ENABLE_VALIDATION")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_works() {
    let dir = tempfile::tempdir().unwrap();
    vkmatmul(&dir).arg("--help").assert().success();
}

#[test]
fn version_works() {
    let dir = tempfile::tempdir().unwrap();
    vkmatmul(&dir).arg("--version").assert().success();
}

#[test]
fn help_mentions_core_subcommands() {
    let dir = tempfile::tempdir().unwrap();
    let out = vkmatmul(&dir).arg("--help").assert().success().get_output().stdout.clone();
    let s = String::from_utf8(out).unwrap();
    for needle in ["gpu", "sequential", "cpu", "compare", "info", "--config"] {
        assert!(s.contains(needle), "help missing `{needle}`");
    }
}

#[test]
fn invalid_command_fails() {
    let dir = tempfile::tempdir().unwrap();
    vkmatmul(&dir).arg("nonexistent-command").assert().failure();
}

#[test]
fn sequential_prints_top_left_block() {
    let dir = tempfile::tempdir().unwrap();
    vkmatmul(&dir)
        .args(["--log-level", "error", "sequential", "--size", "4", "--print-limit", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("C[0][0] = "))
        .stdout(predicate::str::contains("C[1][1] = "))
        .stdout(predicate::str::contains("C[2][0]").not());
}

#[test]
fn cpu_writes_raw_binary() {
    let dir = tempfile::tempdir().unwrap();
    vkmatmul(&dir)
        .args(["--log-level", "error", "cpu", "--size", "8", "--output", "cpu.bin", "--print-limit", "0"])
        .assert()
        .success();
    assert_eq!(std::fs::metadata(dir.path().join("cpu.bin")).unwrap().len(), 8 * 8 * 4);
}

#[test]
fn baselines_write_identical_files() {
    let dir = tempfile::tempdir().unwrap();
    for (cmd, file) in [("sequential", "seq.bin"), ("cpu", "par.bin")] {
        vkmatmul(&dir)
            .args(["--log-level", "error", cmd, "-n", "12", "--seed", "99", "-o", file])
            .assert()
            .success();
    }
    let seq = std::fs::read(dir.path().join("seq.bin")).unwrap();
    let par = std::fs::read(dir.path().join("par.bin")).unwrap();
    assert_eq!(seq, par);
}

#[test]
fn json_report_is_parseable() {
    let dir = tempfile::tempdir().unwrap();
    let out = vkmatmul(&dir)
        .args(["--log-level", "error", "cpu", "--size", "3", "--format", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["backend"], "cpu");
    assert_eq!(v["matrix_size"], 3);
    assert_eq!(v["preview"].as_array().unwrap().len(), 3);
}

#[test]
fn config_show_prints_sections() {
    let dir = tempfile::tempdir().unwrap();
    vkmatmul(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[compute]"))
        .stdout(predicate::str::contains("matrix_size = 1024"))
        .stdout(predicate::str::contains("[logging]"));
}

#[test]
fn config_file_in_working_directory_is_used() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("vkmatmul.toml"), "[compute]\nmatrix_size = 5\n").unwrap();
    vkmatmul(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("matrix_size = 5"));
}

#[test]
fn env_override_reaches_config() {
    let dir = tempfile::tempdir().unwrap();
    vkmatmul(&dir)
        .env("VKMATMUL_MATRIX_SIZE", "48")
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("matrix_size = 48"));
}

#[test]
fn invalid_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("bad.toml"), "[compute]\nmatrix_size = 0\n").unwrap();
    vkmatmul(&dir)
        .args(["--config", "bad.toml", "config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("matrix_size must be > 0"));
}

#[test]
fn workgroup_size_key_rejected() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("wg.toml"), "[compute]\nworkgroup_size = 32\n").unwrap();
    vkmatmul(&dir)
        .args(["--config", "wg.toml", "config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown field"));
}

#[test]
fn zero_size_fails() {
    let dir = tempfile::tempdir().unwrap();
    vkmatmul(&dir).args(["sequential", "--size", "0"]).assert().failure().code(1);
}

#[test]
#[cfg(target_pointer_width = "64")]
fn oversized_size_fails_before_allocating() {
    let dir = tempfile::tempdir().unwrap();
    vkmatmul(&dir)
        .args(["cpu", "--size", "4294967295"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("overflows"));
}

#[test]
fn compare_rejects_gpu_baseline() {
    let dir = tempfile::tempdir().unwrap();
    vkmatmul(&dir).args(["compare", "--size", "2", "--baseline", "gpu"]).assert().failure().code(1);
}

#[test]
fn completions_generate() {
    let dir = tempfile::tempdir().unwrap();
    vkmatmul(&dir)
        .args(["--completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("vkmatmul"));
}

#[test]
#[ignore = "requires a Vulkan device and compiled kernel"]
fn compare_passes_on_gpu() {
    let dir = tempfile::tempdir().unwrap();
    vkmatmul(&dir)
        .args(["compare", "--size", "64"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PASS"));
}
