#![forbid(unsafe_code)]
mod cli;

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Args, EnumCommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;
use treekit_io_tree::{
    SpecCopyTreeOptions, SpecDeleteTreeOptions, SpecExecuteTreeOpsOptions, SpecFileTypeFilter,
    SpecFindTreeOptions, SpecMoveTreeOptions, SpecOpError, SpecProfileTreeOptions, TreeOpError,
    copy_tree, delete_subdirectories, delete_tree, execute_tree_ops, find_tree, move_tree,
    profile_tree,
};

const EXIT_REPORTED_ERRORS: u8 = 1;
const EXIT_CONFIGURATION: u8 = 2;

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);
    tracing::debug!("{:?}", args.command);

    match run_app(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_REPORTED_ERRORS),
        Err(e) => {
            eprintln!("treekit: {e:#}");
            let b_is_config = e
                .downcast_ref::<TreeOpError>()
                .is_some_and(TreeOpError::is_configuration_error);
            if b_is_config {
                ExitCode::from(EXIT_CONFIGURATION)
            } else {
                ExitCode::from(EXIT_REPORTED_ERRORS)
            }
        }
    }
}

fn init_tracing(n_verbose: u8) {
    let level_default = match n_verbose {
        0 => "off",
        1 => "warn",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Runs one subcommand. `Ok(false)` means the operation finished but
/// recorded errors (or aborted).
fn run_app(args: Args) -> Result<bool> {
    let b_json = args.json;
    match args.command {
        EnumCommand::Copy {
            source,
            target,
            select,
            copy_empty_dirs,
            on_conflict,
            no_preserve,
        } => {
            let spec_options = SpecCopyTreeOptions {
                scope: select.scope.to_scope(),
                file_types: select.to_file_types(SpecFileTypeFilter::default()),
                criteria: select.to_criteria(),
                if_copy_empty_dirs: copy_empty_dirs,
                rule_conflict_file: on_conflict,
                if_preserve_metadata: !no_preserve,
                if_collect_results: false,
            };
            let report = copy_tree(&source, &target, spec_options)
                .with_context(|| format!("copy {} -> {}", source.display(), target.display()))?;
            if b_json {
                print_json(json!({
                    "operation": "copy_tree",
                    "counts": report.to_dict(),
                    "errors": error_lines(&report.errors),
                }))?;
            } else {
                println!("{report}");
                print_errors(&report.errors);
            }
            Ok(report.error_count() == 0)
        }
        EnumCommand::Move {
            source,
            target,
            select,
            copy_empty_dirs,
            delete_empty_dirs,
            on_conflict,
        } => {
            let spec_options = SpecMoveTreeOptions {
                scope: select.scope.to_scope(),
                file_types: select.to_file_types(SpecFileTypeFilter::default()),
                criteria: select.to_criteria(),
                if_copy_empty_dirs: copy_empty_dirs,
                if_delete_empty_source_dirs: delete_empty_dirs,
                rule_conflict_file: on_conflict,
                if_collect_results: false,
            };
            let report = move_tree(&source, &target, spec_options)
                .with_context(|| format!("move {} -> {}", source.display(), target.display()))?;
            if b_json {
                print_json(json!({
                    "operation": "move_tree",
                    "counts": report.to_dict(),
                    "errors": error_lines(&report.errors),
                }))?;
            } else {
                println!("{report}");
                print_errors(&report.errors);
            }
            Ok(report.error_count() == 0)
        }
        EnumCommand::Delete { root, select } => {
            let spec_options = SpecDeleteTreeOptions {
                scope: select.scope.to_scope(),
                file_types: select.to_file_types(SpecFileTypeFilter::default()),
                criteria: select.to_criteria(),
                if_collect_results: false,
            };
            let report = delete_tree(&root, spec_options)
                .with_context(|| format!("delete in {}", root.display()))?;
            if b_json {
                print_json(json!({
                    "operation": "delete_tree",
                    "counts": report.to_dict(),
                    "errors": error_lines(&report.errors),
                    "fatal": report.fatal.as_ref().map(ToString::to_string),
                }))?;
            } else {
                println!("{report}");
                print_errors(&report.errors);
                if let Some(e) = &report.fatal {
                    eprintln!("aborted: {e}");
                }
            }
            Ok(report.error_count() == 0)
        }
        EnumCommand::DeleteSubdirs { root } => {
            let report = delete_subdirectories(&root)
                .with_context(|| format!("delete subdirectories of {}", root.display()))?;
            if b_json {
                let l_dirs: Vec<String> =
                    report.dirs_deleted.iter().map(|p| display_path(p)).collect();
                print_json(json!({
                    "operation": "delete_subdirectories",
                    "counts": report.to_dict(),
                    "dirs": l_dirs,
                    "errors": error_lines(&report.errors),
                }))?;
            } else {
                println!("{report}");
                print_errors(&report.errors);
            }
            Ok(report.error_count() == 0)
        }
        EnumCommand::Apply {
            source,
            target,
            ops,
            select,
            no_preserve,
        } => {
            let spec_options = SpecExecuteTreeOpsOptions {
                scope: select.scope.to_scope(),
                file_types: select.to_file_types(SpecFileTypeFilter::default()),
                criteria: select.to_criteria(),
                file_ops: ops,
                if_preserve_metadata: !no_preserve,
            };
            let report = execute_tree_ops(&source, &target, spec_options)
                .with_context(|| format!("apply {} -> {}", source.display(), target.display()))?;
            if b_json {
                print_json(json!({
                    "operation": "execute_tree_ops",
                    "counts": report.to_dict(),
                    "errors": error_lines(&report.errors),
                }))?;
            } else {
                println!("{report}");
                print_errors(&report.errors);
            }
            Ok(report.error_count() == 0)
        }
        EnumCommand::Find { root, select } => {
            let spec_options = SpecFindTreeOptions {
                scope: select.scope.to_scope(),
                file_types: select.to_file_types(SpecFileTypeFilter::all()),
                criteria: select.to_criteria(),
            };
            let report = find_tree(&root, spec_options)
                .with_context(|| format!("find in {}", root.display()))?;
            if b_json {
                let l_dirs: Vec<String> = report.dirs.iter().map(|d| display_path(&d.path)).collect();
                let l_files: Vec<String> =
                    report.files.iter().map(|f| display_path(&f.path)).collect();
                print_json(json!({
                    "operation": "find_tree",
                    "counts": report.to_dict(),
                    "dirs": l_dirs,
                    "files": l_files,
                    "errors": error_lines(&report.errors),
                }))?;
            } else {
                for node in &report.dirs {
                    println!("{}/", display_path(&node.path));
                }
                for record in &report.files {
                    println!("{}", display_path(&record.path));
                }
                print_errors(&report.errors);
            }
            Ok(report.error_count() == 0)
        }
        EnumCommand::Profile { root, scope } => {
            let spec_options = SpecProfileTreeOptions {
                scope: scope.to_scope(),
            };
            let report = profile_tree(&root, spec_options)
                .with_context(|| format!("profile {}", root.display()))?;
            if b_json {
                print_json(json!({
                    "operation": "profile_tree",
                    "counts": report.to_dict(),
                    "errors": error_lines(&report.errors),
                }))?;
            } else {
                println!("{report}");
                print_errors(&report.errors);
            }
            Ok(report.error_count() == 0)
        }
    }
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn error_lines(errors: &[SpecOpError]) -> Vec<String> {
    errors.iter().map(ToString::to_string).collect()
}

fn print_errors(errors: &[SpecOpError]) {
    for e in errors {
        eprintln!("error: {e}");
    }
}

fn print_json(value: serde_json::Value) -> Result<()> {
    let txt = serde_json::to_string_pretty(&value).context("failed to serialize report")?;
    println!("{txt}");
    Ok(())
}
