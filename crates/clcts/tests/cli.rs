//! Command-line behaviour that does not depend on a working OpenCL device.

use assert_cmd::Command;
use predicates::prelude::*;

fn clcts() -> Command {
    let mut cmd = Command::cargo_bin("clcts").unwrap();
    cmd.env_remove("CL_DEVICE_TYPE")
        .env_remove("CL_PLATFORM_INDEX")
        .env_remove("CL_DEVICE_INDEX")
        .env_remove("CL_CONFORMANCE_RESULTS_FILENAME")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_works() {
    clcts()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--device-type").and(predicate::str::contains("--list")));
}

#[test]
fn list_prints_the_basic_suite() {
    clcts()
        .arg("--list")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Test names:\n"))
        .stdout(predicate::str::contains("\tint_add\n"))
        .stdout(predicate::str::contains("\twork_group_reduce (requires OpenCL 2.0)\n"))
        .stdout(predicate::str::contains("\tdouble_add (requires cl_khr_fp64)\n"))
        .stdout(predicate::str::contains("\timage_copy [not implemented]\n"));
}

#[test]
fn unknown_test_names_are_a_harness_failure() {
    clcts()
        .arg("no_such_test")
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("did not match any test names"));
}

#[test]
fn selecting_an_unimplemented_test_fails() {
    clcts()
        .arg("image_copy")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("missing implementation"));
}

#[test]
fn selecting_a_test_twice_fails() {
    clcts()
        .args(["int_add", "int*"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("has already been selected"));
}

#[test]
fn bad_device_type_in_environment_fails() {
    clcts()
        .env("CL_DEVICE_TYPE", "toaster")
        .arg("int_add")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("CL_DEVICE_TYPE"));
}

#[test]
fn seed_and_randomize_conflict() {
    clcts().args(["--seed", "1", "--randomize"]).assert().failure();
}

#[test]
fn unreadable_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    clcts()
        .arg("--config")
        .arg(dir.path().join("missing.toml"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("failed to read config file"));
}
