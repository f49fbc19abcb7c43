use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use filetime::{FileTime, set_file_mtime};
use treekit_io_tree::{
    EnumSelectCriterionMode, SpecCopyTreeOptions, SpecDeleteTreeOptions, SpecFileTypeFilter,
    SpecFindTreeOptions, SpecMoveTreeOptions, SpecOperationScope, SpecSelectionCriteria,
    TreeOpError, copy_tree, delete_tree, find_tree, move_tree,
};

fn write_text(path: &Path, txt: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, txt).expect("write text");
}

fn build_sample(root: &Path) {
    write_text(&root.join("a.txt"), "alpha");
    write_text(&root.join("b.log"), "log");
    write_text(&root.join("sub/c.txt"), "charlie");
}

fn rel_paths(root: &Path, l_paths: &[PathBuf]) -> Vec<String> {
    l_paths
        .iter()
        .map(|p| {
            p.strip_prefix(root)
                .unwrap_or(p)
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect()
}

#[test]
fn copy_scenario_txt_only() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    build_sample(&src);

    let spec_options = SpecCopyTreeOptions {
        criteria: SpecSelectionCriteria::with_patterns(["*.txt"]),
        ..SpecCopyTreeOptions::default()
    };
    let report = copy_tree(&src, &dst, spec_options).expect("copy tree");

    assert!(dst.join("a.txt").exists());
    assert!(dst.join("sub/c.txt").exists());
    assert!(!dst.join("b.log").exists());
    assert_eq!(report.cnt_files_copied, 2);
    assert_eq!(report.cnt_files_not_copied, 1);
    assert_eq!(report.n_bytes_not_copied, 3);
    assert!(report.is_consistent());
    assert_eq!(report.error_count(), 0);
}

#[test]
fn find_is_idempotent() {
    let tmp = tempfile::tempdir().expect("tempdir");
    build_sample(tmp.path());

    let report_first = find_tree(tmp.path(), SpecFindTreeOptions::default()).expect("find");
    let report_second = find_tree(tmp.path(), SpecFindTreeOptions::default()).expect("find");
    assert_eq!(report_first.dirs.paths(), report_second.dirs.paths());
    assert_eq!(report_first.files.paths(), report_second.files.paths());
    assert_eq!(
        rel_paths(tmp.path(), &report_first.files.paths()),
        vec!["a.txt", "b.log", "sub/c.txt"]
    );
}

#[test]
fn copy_partition_matches_unfiltered_find() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let src = tmp.path().join("src");
    build_sample(&src);
    write_text(&src.join("sub/deep/d.md"), "d");

    let report_find = find_tree(&src, SpecFindTreeOptions::default()).expect("find");
    let spec_options = SpecCopyTreeOptions {
        criteria: SpecSelectionCriteria::with_patterns(["*.txt", "*.md"]),
        ..SpecCopyTreeOptions::default()
    };
    let report_copy = copy_tree(&src, tmp.path().join("dst"), spec_options).expect("copy");

    assert_eq!(report_copy.cnt_files_processed, report_find.files.len() as u64);
    assert_eq!(
        report_copy.cnt_files_copied + report_copy.cnt_files_not_copied,
        report_find.files.len() as u64
    );
}

#[test]
fn default_criteria_copy_every_eligible_file() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let src = tmp.path().join("src");
    build_sample(&src);

    let report = copy_tree(&src, tmp.path().join("dst"), SpecCopyTreeOptions::default())
        .expect("copy tree");
    assert_eq!(report.cnt_files_copied, 3);
    assert_eq!(report.cnt_files_not_copied, 0);
}

#[test]
fn subtree_only_never_touches_root_files() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path().join("root");
    build_sample(&root);

    let spec_options = SpecFindTreeOptions {
        scope: SpecOperationScope::subtree_only(),
        ..SpecFindTreeOptions::default()
    };
    let report = find_tree(&root, spec_options).expect("find");
    assert_eq!(rel_paths(&root, &report.files.paths()), vec!["sub/c.txt"]);
    assert!(!report.dirs.paths().contains(&root));

    let spec_options = SpecDeleteTreeOptions {
        scope: SpecOperationScope::subtree_only(),
        ..SpecDeleteTreeOptions::default()
    };
    let report = delete_tree(&root, spec_options).expect("delete");
    assert_eq!(report.cnt_files_deleted, 1);
    assert!(root.join("a.txt").exists());
    assert!(root.join("b.log").exists());
}

#[test]
fn null_scope_rejected_before_filesystem_access() {
    let scope = SpecOperationScope {
        if_include_parent_directory: false,
        if_include_subtree: false,
    };
    let path_missing = Path::new("/this/root/does/not/exist");

    let err = find_tree(
        path_missing,
        SpecFindTreeOptions {
            scope,
            ..SpecFindTreeOptions::default()
        },
    )
    .expect_err("null scope");
    assert!(matches!(err, TreeOpError::InvalidScope { .. }));
    assert!(err.is_configuration_error());

    let err = copy_tree(
        path_missing,
        "/this/target/does/not/exist",
        SpecCopyTreeOptions {
            scope,
            ..SpecCopyTreeOptions::default()
        },
    )
    .expect_err("null scope");
    assert!(matches!(err, TreeOpError::InvalidScope { .. }));
    assert!(!Path::new("/this/target/does/not/exist").exists());
}

#[test]
fn delete_older_than_with_nothing_old_is_a_no_op() {
    let tmp = tempfile::tempdir().expect("tempdir");
    build_sample(tmp.path());

    let spec_options = SpecDeleteTreeOptions {
        criteria: SpecSelectionCriteria {
            time_older_than: Some(SystemTime::UNIX_EPOCH + Duration::from_secs(1_000)),
            ..SpecSelectionCriteria::default()
        },
        ..SpecDeleteTreeOptions::default()
    };
    let report = delete_tree(tmp.path(), spec_options).expect("delete");

    assert_eq!(report.cnt_files_deleted, 0);
    assert_eq!(report.cnt_files_remaining, 3);
    assert!(!report.is_aborted());
    assert!(tmp.path().join("sub").is_dir());
    assert!(tmp.path().join("a.txt").exists());
}

#[test]
fn delete_by_age_and_name_with_or() {
    let tmp = tempfile::tempdir().expect("tempdir");
    build_sample(tmp.path());
    let t_old = FileTime::from_unix_time(1_600_000_000, 0);
    set_file_mtime(tmp.path().join("b.log"), t_old).expect("set mtime");

    let t_cutoff = SystemTime::UNIX_EPOCH + Duration::from_secs(1_650_000_000);
    let spec_options = SpecDeleteTreeOptions {
        criteria: SpecSelectionCriteria {
            patterns_file_name: vec!["c.*".to_string()],
            time_older_than: Some(t_cutoff),
            rule_combine: EnumSelectCriterionMode::Or,
            ..SpecSelectionCriteria::default()
        },
        ..SpecDeleteTreeOptions::default()
    };
    let report = delete_tree(tmp.path(), spec_options).expect("delete");

    assert_eq!(report.cnt_files_deleted, 2);
    assert!(!tmp.path().join("b.log").exists());
    assert!(!tmp.path().join("sub/c.txt").exists());
    assert!(tmp.path().join("a.txt").exists());
}

#[test]
fn move_keeps_each_file_in_exactly_one_place() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    build_sample(&src);

    let report_before = find_tree(&src, SpecFindTreeOptions::default()).expect("find");
    let spec_options = SpecMoveTreeOptions {
        criteria: SpecSelectionCriteria::with_patterns(["*.txt"]),
        ..SpecMoveTreeOptions::default()
    };
    let report = move_tree(&src, &dst, spec_options).expect("move");
    assert_eq!(report.cnt_files_moved, 2);

    for record in &report_before.files {
        let path_rel = record.path.strip_prefix(&src).expect("under src");
        let b_in_src = src.join(path_rel).exists();
        let b_in_dst = dst.join(path_rel).exists();
        assert!(b_in_src ^ b_in_dst, "{} must exist exactly once", path_rel.display());
    }
}

#[test]
fn type_filter_regular_only_skips_symlinks() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let src = tmp.path().join("src");
    build_sample(&src);
    #[cfg(unix)]
    std::os::unix::fs::symlink("a.txt", src.join("a_link")).expect("symlink");

    let spec_options = SpecCopyTreeOptions {
        file_types: SpecFileTypeFilter::regular_only(),
        ..SpecCopyTreeOptions::default()
    };
    let dst = tmp.path().join("dst");
    let report = copy_tree(&src, &dst, spec_options).expect("copy");
    assert_eq!(report.cnt_files_copied, 3);
    assert!(!dst.join("a_link").exists());
    #[cfg(unix)]
    assert_eq!(report.cnt_files_not_copied, 1);
}
