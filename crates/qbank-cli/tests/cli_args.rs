use assert_cmd::Command;
use predicates::prelude::*;

fn cmd() -> Command {
    Command::cargo_bin("qbank").unwrap()
}

#[test]
fn help_flag_lists_subcommands() {
    let assert = cmd().arg("--help").assert().success();
    let mut out = predicate::str::contains("probe").boxed();
    for name in [
        "render",
        "segment",
        "crop",
        "stitch",
        "append",
        "attach-images",
        "answers",
        "latex",
        "distribute",
        "validate",
        "images",
        "export",
    ] {
        out = out.and(predicate::str::contains(name)).boxed();
    }
    assert.stdout(out);
}

#[test]
fn render_subcommand_help() {
    cmd()
        .args(["render", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FILE"))
        .stdout(predicate::str::contains("--pages"))
        .stdout(predicate::str::contains("--scale"));
}

#[test]
fn crop_requires_manifest() {
    cmd()
        .arg("crop")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--manifest"));
}

#[test]
fn no_args_shows_usage() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn validate_requires_bank_argument() {
    cmd()
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("BANK"));
}

#[test]
fn missing_config_file_is_error() {
    cmd()
        .args(["--config", "/nonexistent/qbank.toml", "validate", "bank.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn render_missing_pdf_is_error() {
    cmd()
        .args(["render", "/nonexistent/exam.pdf", "--out", "pages"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("file not found"));
}
