//! End-to-end smoke tests of the `prolog` binary (spec.md §6 "CLI &
//! persisted state"). Grounded on the teacher's own `test_prolog_interpreter.rs`
//! shape: write a temp `.pl` file, run the compiled binary against it with
//! `assert_cmd`, assert on stdout.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::Builder;

#[test]
fn consults_a_file_and_runs_a_goal_flag() {
    let mut file = Builder::new().suffix(".pl").tempfile().expect("could not create temp file");
    writeln!(file, "parent(john, mary).").unwrap();
    let path = file.path();

    let mut cmd = Command::cargo_bin("prolog").expect("could not find prolog binary");
    cmd.arg(path)
        .arg("-g")
        .arg("parent(john, X), write(X), nl")
        .arg("--no-tty")
        .assert()
        .success()
        .stdout(predicate::str::contains("mary"));
}

#[test]
fn halt_with_a_nonzero_code_sets_the_exit_status() {
    let mut file = Builder::new().suffix(".pl").tempfile().expect("could not create temp file");
    writeln!(file, "main :- write(bye), nl, halt(2).").unwrap();
    let path = file.path();

    let mut cmd = Command::cargo_bin("prolog").expect("could not find prolog binary");
    cmd.arg(path)
        .arg("-g")
        .arg("main")
        .arg("--no-tty")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("bye"));
}

#[test]
fn a_failing_goal_flag_does_not_crash_the_process() {
    let mut file = Builder::new().suffix(".pl").tempfile().expect("could not create temp file");
    writeln!(file, "never(true) :- fail.").unwrap();
    let path = file.path();

    let mut cmd = Command::cargo_bin("prolog").expect("could not find prolog binary");
    cmd.arg(path).arg("-g").arg("never(true)").arg("--no-tty").assert().failure();
}
