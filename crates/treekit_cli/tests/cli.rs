use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn treekit() -> Command {
    Command::cargo_bin("treekit").unwrap()
}

fn build_sample(root: &Path) {
    fs::create_dir_all(root.join("sub")).unwrap();
    fs::write(root.join("a.txt"), "alpha").unwrap();
    fs::write(root.join("b.log"), "log").unwrap();
    fs::write(root.join("sub/c.txt"), "charlie").unwrap();
}

#[test]
fn help_lists_subcommands() {
    treekit()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("copy"))
        .stdout(predicate::str::contains("delete"))
        .stdout(predicate::str::contains("profile"));
}

#[test]
fn copy_selects_by_pattern() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    build_sample(&src);

    treekit()
        .arg("copy")
        .arg(&src)
        .arg(&dst)
        .args(["-p", "*.txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[COPY_TREE]"))
        .stdout(predicate::str::contains("copied=2"))
        .stdout(predicate::str::contains("not_copied=1"));

    assert!(dst.join("a.txt").exists());
    assert!(dst.join("sub/c.txt").exists());
    assert!(!dst.join("b.log").exists());
}

#[test]
fn find_prints_paths_in_walk_order() {
    let tmp = tempfile::tempdir().unwrap();
    build_sample(tmp.path());

    let output = treekit()
        .arg("find")
        .arg(tmp.path())
        .args(["--pattern", "*.txt"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let l_files: Vec<&str> = stdout.lines().filter(|l| !l.ends_with('/')).collect();
    assert_eq!(l_files.len(), 2);
    assert!(l_files[0].ends_with("a.txt"));
    assert!(l_files[1].ends_with("c.txt"));
}

#[test]
fn profile_json_reports_counters() {
    let tmp = tempfile::tempdir().unwrap();
    build_sample(tmp.path());

    let output = treekit()
        .arg("profile")
        .arg(tmp.path())
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["operation"], "profile_tree");
    assert_eq!(value["counts"]["cnt_files_regular"], 3);
    assert_eq!(value["counts"]["n_bytes_regular"], 15);
}

#[test]
fn null_scope_is_a_configuration_error() {
    treekit()
        .args(["find", "/this/root/does/not/exist", "--no-parent", "--no-subtree"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid scope"));
}

#[test]
fn missing_root_fails() {
    treekit()
        .args(["delete", "/this/root/does/not/exist"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn invalid_mode_is_rejected_by_argument_parsing() {
    treekit()
        .args(["find", ".", "--mode", "999"])
        .assert()
        .code(2);
}

#[test]
fn delete_by_pattern_keeps_directories() {
    let tmp = tempfile::tempdir().unwrap();
    build_sample(tmp.path());

    treekit()
        .arg("delete")
        .arg(tmp.path())
        .args(["-p", "*.txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[DELETE_TREE]"));

    assert!(!tmp.path().join("a.txt").exists());
    assert!(!tmp.path().join("sub/c.txt").exists());
    assert!(tmp.path().join("b.log").exists());
    assert!(tmp.path().join("sub").is_dir());
}

#[test]
fn delete_subdirs_keeps_root_files() {
    let tmp = tempfile::tempdir().unwrap();
    build_sample(tmp.path());

    treekit()
        .arg("delete-subdirs")
        .arg(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("[DELETE_SUBDIRECTORIES] dirs_deleted=1"));

    assert!(!tmp.path().join("sub").exists());
    assert!(tmp.path().join("a.txt").exists());
}

#[test]
fn apply_runs_steps_in_order() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    build_sample(&src);

    treekit()
        .arg("apply")
        .arg(&src)
        .arg(&dst)
        .args(["--op", "copy", "--op", "delete-source", "-p", "*.log"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ops_applied=2"));

    assert!(dst.join("b.log").exists());
    assert!(!src.join("b.log").exists());
    assert!(src.join("a.txt").exists());
}
