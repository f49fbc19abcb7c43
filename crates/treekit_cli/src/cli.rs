use std::path::PathBuf;
use std::time::SystemTime;

use chrono::{DateTime, NaiveDate};
use clap::{ArgAction, Args as ClapArgs, Parser, Subcommand};
use treekit_io_tree::{
    EnumFileConflictStrategy, EnumFileOperation, EnumPatternMode, EnumSelectCriterionMode, SpecFileMode,
    SpecFileTypeFilter, SpecOperationScope, SpecSelectionCriteria,
};

#[derive(Parser, Debug)]
#[command(
    name = "treekit",
    version,
    about = "Selective copy, move, delete and find over directory trees"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: EnumCommand,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Log verbosity: -v warnings, -vv debug, -vvv trace (RUST_LOG overrides)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum EnumCommand {
    /// Copy selected files into the same layout under TARGET
    Copy {
        source: PathBuf,
        target: PathBuf,
        #[command(flatten)]
        select: SelectArgs,
        /// Create every visited directory, even without copied files
        #[arg(long)]
        copy_empty_dirs: bool,
        /// Existing destination files: overwrite, skip or error
        #[arg(long, default_value = "overwrite")]
        on_conflict: EnumFileConflictStrategy,
        /// Do not carry permissions, timestamps or xattrs over
        #[arg(long)]
        no_preserve: bool,
    },
    /// Move selected files into the same layout under TARGET
    Move {
        source: PathBuf,
        target: PathBuf,
        #[command(flatten)]
        select: SelectArgs,
        /// Create every visited directory, even without moved files
        #[arg(long)]
        copy_empty_dirs: bool,
        /// Remove source directories left empty
        #[arg(long)]
        delete_empty_dirs: bool,
        /// Existing destination files: overwrite, skip or error
        #[arg(long, default_value = "overwrite")]
        on_conflict: EnumFileConflictStrategy,
    },
    /// Delete selected files (directories are kept)
    Delete {
        root: PathBuf,
        #[command(flatten)]
        select: SelectArgs,
    },
    /// Remove every subdirectory of ROOT, keeping the files directly in it
    DeleteSubdirs { root: PathBuf },
    /// Apply file steps, in order, to every selected file
    Apply {
        source: PathBuf,
        target: PathBuf,
        /// Step to apply (repeatable): copy, link, link-or-copy, copy-or-link,
        /// move, delete-source, delete-destination, delete-both,
        /// create-destination-dir, create-destination-file
        #[arg(long = "op", action = ArgAction::Append, required = true)]
        ops: Vec<EnumFileOperation>,
        #[command(flatten)]
        select: SelectArgs,
        /// Do not carry permissions, timestamps or xattrs over
        #[arg(long)]
        no_preserve: bool,
    },
    /// List directories and selected files
    Find {
        root: PathBuf,
        #[command(flatten)]
        select: SelectArgs,
    },
    /// Count files and bytes per file kind
    Profile {
        root: PathBuf,
        #[command(flatten)]
        scope: ScopeArgs,
    },
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct ScopeArgs {
    /// Leave out the root directory and its own files
    #[arg(long)]
    pub no_parent: bool,

    /// Do not descend below the root directory
    #[arg(long)]
    pub no_subtree: bool,
}

impl ScopeArgs {
    pub fn to_scope(&self) -> SpecOperationScope {
        SpecOperationScope {
            if_include_parent_directory: !self.no_parent,
            if_include_subtree: !self.no_subtree,
        }
    }
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct SelectArgs {
    /// File name pattern (repeatable; any may match)
    #[arg(short = 'p', long = "pattern", action = ArgAction::Append)]
    pub patterns: Vec<String>,

    /// How patterns are read: glob, regex or literal
    #[arg(long, default_value = "glob")]
    pub pattern_mode: EnumPatternMode,

    /// Files modified before this time (RFC 3339 or YYYY-MM-DD)
    #[arg(long, value_parser = parse_time)]
    pub older_than: Option<SystemTime>,

    /// Files modified after this time (RFC 3339 or YYYY-MM-DD)
    #[arg(long, value_parser = parse_time)]
    pub newer_than: Option<SystemTime>,

    /// Files with exactly these permission bits (644 or rw-r--r--)
    #[arg(long)]
    pub mode: Option<SpecFileMode>,

    /// Match when any criterion matches instead of all
    #[arg(long)]
    pub any: bool,

    /// File kinds, comma separated: regular, symlink, other
    #[arg(long, value_parser = parse_types)]
    pub types: Option<SpecFileTypeFilter>,

    #[command(flatten)]
    pub scope: ScopeArgs,
}

impl SelectArgs {
    pub fn to_criteria(&self) -> SpecSelectionCriteria {
        SpecSelectionCriteria {
            patterns_file_name: self.patterns.clone(),
            rule_pattern: self.pattern_mode,
            time_older_than: self.older_than,
            time_newer_than: self.newer_than,
            mode_equals: self.mode,
            rule_combine: if self.any {
                EnumSelectCriterionMode::Or
            } else {
                EnumSelectCriterionMode::And
            },
        }
    }

    pub fn to_file_types(&self, default: SpecFileTypeFilter) -> SpecFileTypeFilter {
        self.types.unwrap_or(default)
    }
}

/// RFC 3339 timestamp, or a bare date taken as midnight UTC.
pub fn parse_time(value: &str) -> Result<SystemTime, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(SystemTime::from(dt));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| format!("invalid time `{value}` ({e}); expected RFC 3339 or YYYY-MM-DD"))?;
    let dt = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| format!("invalid date `{value}`"))?
        .and_utc();
    Ok(SystemTime::from(dt))
}

/// Comma separated list of `regular`, `symlink`, `other` (or `all`).
pub fn parse_types(value: &str) -> Result<SpecFileTypeFilter, String> {
    let mut file_types = SpecFileTypeFilter {
        if_regular: false,
        if_symlink: false,
        if_other_non_regular: false,
    };
    for token in value.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match token.to_ascii_lowercase().as_str() {
            "regular" | "file" => file_types.if_regular = true,
            "symlink" | "link" => file_types.if_symlink = true,
            "other" => file_types.if_other_non_regular = true,
            "all" => file_types = SpecFileTypeFilter::all(),
            _ => {
                return Err(format!(
                    "unknown file type `{token}`. Expected one of: ['regular', 'symlink', 'other', 'all']"
                ));
            }
        }
    }
    if !file_types.is_valid() {
        return Err("at least one file type is required".to_string());
    }
    Ok(file_types)
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use clap::Parser;

    use super::{Args, EnumCommand, parse_time, parse_types};
    use treekit_io_tree::{
        EnumFileOperation, EnumPatternMode, EnumSelectCriterionMode, SpecFileTypeFilter,
    };

    #[test]
    fn parse_time_accepts_rfc3339_and_dates() {
        let t_date = parse_time("2020-01-02").expect("date");
        assert_eq!(
            t_date,
            SystemTime::UNIX_EPOCH + Duration::from_secs(1_577_923_200)
        );
        let t_full = parse_time("2020-01-02T00:00:10Z").expect("rfc3339");
        assert_eq!(t_full, t_date + Duration::from_secs(10));
        assert!(parse_time("yesterday").is_err());
    }

    #[test]
    fn parse_types_reads_lists() {
        assert_eq!(
            parse_types("regular").expect("types"),
            SpecFileTypeFilter::regular_only()
        );
        assert_eq!(parse_types("all").expect("types"), SpecFileTypeFilter::all());
        let file_types = parse_types("symlink, other").expect("types");
        assert!(!file_types.if_regular && file_types.if_symlink && file_types.if_other_non_regular);
        assert!(parse_types("socket").is_err());
        assert!(parse_types("").is_err());
    }

    #[test]
    fn copy_arguments_map_onto_options() {
        let args = Args::parse_from([
            "treekit",
            "copy",
            "src",
            "dst",
            "-p",
            "*.txt",
            "--pattern",
            "*.md",
            "--any",
            "--pattern-mode",
            "regex",
            "--mode",
            "644",
            "--no-parent",
        ]);
        let EnumCommand::Copy { select, .. } = args.command else {
            panic!("expected copy");
        };
        let criteria = select.to_criteria();
        assert_eq!(criteria.patterns_file_name, vec!["*.txt", "*.md"]);
        assert_eq!(criteria.rule_combine, EnumSelectCriterionMode::Or);
        assert_eq!(criteria.rule_pattern, EnumPatternMode::Regex);
        assert_eq!(criteria.mode_equals.map(|m| m.bits()), Some(0o644));
        assert!(!select.scope.to_scope().if_include_parent_directory);
    }

    #[test]
    fn apply_keeps_step_order() {
        let args = Args::parse_from([
            "treekit",
            "apply",
            "src",
            "dst",
            "--op",
            "copy",
            "--op",
            "delete-source",
        ]);
        let EnumCommand::Apply { ops, .. } = args.command else {
            panic!("expected apply");
        };
        assert_eq!(
            ops,
            vec![EnumFileOperation::CopyByIo, EnumFileOperation::DeleteSourceFile]
        );
        assert!(Args::try_parse_from(["treekit", "apply", "src", "dst"]).is_err());
        assert!(Args::try_parse_from(["treekit", "apply", "src", "dst", "--op", "rename"]).is_err());
    }
}
