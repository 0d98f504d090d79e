use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_subcommands() {
    let mut cmd = Command::cargo_bin("llms-harvest").expect("binary");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run").and(predicate::str::contains("collections")));
}

#[test]
fn run_help_documents_the_sampling_strategies() {
    let mut cmd = Command::cargo_bin("llms-harvest").expect("binary");
    cmd.args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("first").and(predicate::str::contains("spread")));
}

#[test]
fn unknown_strategy_is_rejected() {
    let mut cmd = Command::cargo_bin("llms-harvest").expect("binary");
    cmd.args(["run", "--strategy", "zigzag"]).assert().failure();
}
