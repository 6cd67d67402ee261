//! End-to-end tests driving the built `gopiler` binary (spec.md §6).

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn gopiler_bin() -> Command {
    Command::cargo_bin("gopiler").unwrap()
}

fn source_file(contents: &str) -> NamedTempFile {
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    f
}

#[test]
fn missing_file_flag_is_a_usage_error() {
    gopiler_bin().assert().failure();
}

#[test]
fn unreadable_source_path_exits_nonzero() {
    gopiler_bin()
        .args(["-f", "/nonexistent/path/to/source.gop"])
        .assert()
        .failure();
}

#[test]
fn well_formed_program_compiles_successfully() {
    let file = source_file("{ int a a = 3 print(a) }$");
    gopiler_bin()
        .args(["-f", file.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("PASS"));
}

#[test]
fn compile_error_is_reported_but_process_still_exits_zero() {
    // spec.md §6: per-program compile failures are not fatal to the
    // process; only I/O failure reading the source file itself is.
    let file = source_file("{ int a string a }$");
    gopiler_bin()
        .args(["-f", file.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("FAIL"));
}

#[test]
fn verbose_flag_surfaces_debug_diagnostics() {
    let file = source_file("{}$");
    gopiler_bin()
        .args(["-f", file.path().to_str().unwrap(), "-v"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DEBUG"));
}

#[test]
fn quiet_mode_drops_debug_diagnostics() {
    let file = source_file("{}$");
    gopiler_bin()
        .args(["-f", file.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("DEBUG").not());
}

#[test]
fn two_programs_in_one_file_both_compile() {
    let file = source_file("{}$ {}$");
    gopiler_bin()
        .args(["-f", file.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("program 1"))
        .stdout(predicate::str::contains("program 2"));
}

#[test]
fn empty_source_file_warns_and_exits_zero() {
    let file = source_file("");
    gopiler_bin()
        .args(["-f", file.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("WARN"));
}
