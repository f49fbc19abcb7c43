//! Operation options, selection filters and top-level error types.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::SystemTime;

use crate::classify::EnumEntryKind;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Logical operation name attached to every error and log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumTreeOperation {
    CopyTree,
    MoveTree,
    DeleteTree,
    FindTree,
    ProfileTree,
    DeleteSubdirectories,
    ExecuteTreeOps,
}

impl EnumTreeOperation {
    /// Stable snake_case name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CopyTree => "copy_tree",
            Self::MoveTree => "move_tree",
            Self::DeleteTree => "delete_tree",
            Self::FindTree => "find_tree",
            Self::ProfileTree => "profile_tree",
            Self::DeleteSubdirectories => "delete_subdirectories",
            Self::ExecuteTreeOps => "execute_tree_ops",
        }
    }

    /// Prefix used by report summaries, e.g. `[COPY_TREE]`.
    pub fn report_prefix(self) -> String {
        format!("[{}]", self.as_str().to_ascii_uppercase())
    }
}

impl fmt::Display for EnumTreeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pattern matching mode for file name patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumPatternMode {
    /// Shell-like wildcards (`*`, `?`, character classes).
    #[default]
    Glob,
    /// Regular expression pattern.
    Regex,
    /// Substring match.
    Literal,
}

impl FromStr for EnumPatternMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "glob" => Ok(Self::Glob),
            "regex" => Ok(Self::Regex),
            "literal" => Ok(Self::Literal),
            _ => Err(format!(
                "Invalid pattern mode: `{value}`. Expected one of: ['glob', 'regex', 'literal']"
            )),
        }
    }
}

/// How active selection sub-criteria are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumSelectCriterionMode {
    /// Every active sub-criterion must match.
    #[default]
    And,
    /// At least one active sub-criterion must match.
    Or,
}

impl FromStr for EnumSelectCriterionMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "and" => Ok(Self::And),
            "or" => Ok(Self::Or),
            _ => Err(format!(
                "Invalid select criterion mode: `{value}`. Expected one of: ['and', 'or']"
            )),
        }
    }
}

impl fmt::Display for EnumSelectCriterionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => f.write_str("AND"),
            Self::Or => f.write_str("OR"),
        }
    }
}

/// Existing destination file conflict policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumFileConflictStrategy {
    /// Keep destination file and leave the source file uncopied.
    Skip,
    /// Replace destination file with source file.
    #[default]
    Overwrite,
    /// Record an error and leave the source file uncopied.
    Error,
}

impl FromStr for EnumFileConflictStrategy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "overwrite" => Ok(Self::Overwrite),
            "error" => Ok(Self::Error),
            _ => Err(format!(
                "Invalid file conflict strategy: `{value}`. Expected one of: ['skip', 'overwrite', 'error']"
            )),
        }
    }
}

/// One step applied to every selected file by `execute_tree_ops`.
///
/// "Destination" is the path with the same relative location under the
/// target root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumFileOperation {
    /// Copy contents (symlinks are recreated).
    CopyByIo,
    /// Hard-link the source at the destination.
    CopyByHardLink,
    /// Hard link first, content copy if linking fails.
    CopyByHardLinkThenIo,
    /// Content copy first, hard link if copying fails.
    CopyByIoThenHardLink,
    /// Copy, then remove the source. A source that cannot be removed takes
    /// the copy back.
    MoveSourceToDestination,
    DeleteSourceFile,
    DeleteDestinationFile,
    /// Destination first, then source; both are attempted.
    DeleteSourceAndDestinationFiles,
    /// Create the destination directory, even without writing a file.
    CreateDestinationDir,
    /// Create (or truncate) an empty destination file.
    CreateDestinationFile,
}

impl EnumFileOperation {
    const ARR_ALL: [Self; 10] = [
        Self::CopyByIo,
        Self::CopyByHardLink,
        Self::CopyByHardLinkThenIo,
        Self::CopyByIoThenHardLink,
        Self::MoveSourceToDestination,
        Self::DeleteSourceFile,
        Self::DeleteDestinationFile,
        Self::DeleteSourceAndDestinationFiles,
        Self::CreateDestinationDir,
        Self::CreateDestinationFile,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CopyByIo => "copy",
            Self::CopyByHardLink => "link",
            Self::CopyByHardLinkThenIo => "link-or-copy",
            Self::CopyByIoThenHardLink => "copy-or-link",
            Self::MoveSourceToDestination => "move",
            Self::DeleteSourceFile => "delete-source",
            Self::DeleteDestinationFile => "delete-destination",
            Self::DeleteSourceAndDestinationFiles => "delete-both",
            Self::CreateDestinationDir => "create-destination-dir",
            Self::CreateDestinationFile => "create-destination-file",
        }
    }

    /// Whether the step writes below the target root.
    pub fn writes_destination(self) -> bool {
        !matches!(
            self,
            Self::DeleteSourceFile | Self::DeleteDestinationFile | Self::DeleteSourceAndDestinationFiles
        )
    }
}

impl FromStr for EnumFileOperation {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value_norm = value.trim().to_ascii_lowercase().replace('_', "-");
        Self::ARR_ALL
            .into_iter()
            .find(|op| op.as_str() == value_norm)
            .ok_or_else(|| {
                let l_names: Vec<&str> = Self::ARR_ALL.iter().map(|op| op.as_str()).collect();
                format!("Invalid file operation: `{value}`. Expected one of: {l_names:?}")
            })
    }
}

impl fmt::Display for EnumFileOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FileMode

/// Symbol table for the nine `rwx` positions, owner first.
const ARR_MODE_SYMBOLS: [(char, u32); 9] = [
    ('r', 0o400),
    ('w', 0o200),
    ('x', 0o100),
    ('r', 0o040),
    ('w', 0o020),
    ('x', 0o010),
    ('r', 0o004),
    ('w', 0o002),
    ('x', 0o001),
];

/// Special bits carried by the execute positions (`s`/`S`, `s`/`S`, `t`/`T`).
const ARR_MODE_SPECIAL: [(usize, char, u32); 3] = [(2, 's', 0o4000), (5, 's', 0o2000), (8, 't', 0o1000)];

const N_MODE_BITS_MAX: u32 = 0o7777;

/// Failure to parse a permission mode string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid file mode `{input}`: {reason}")]
pub struct ParseModeError {
    /// Raw input text.
    pub input: String,
    /// What was wrong with it.
    pub reason: String,
}

/// Unix permission bits used by the mode-equality criterion.
///
/// Accepts octal (`644`, `0644`, `0o644`) and symbolic (`rw-r--r--`,
/// `-rw-r--r--`, `drwxr-xr-x`) notation. The entry type character of the
/// ten character form is ignored; only permission bits are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpecFileMode {
    bits: u32,
}

impl SpecFileMode {
    /// Build from raw permission bits (`0..=0o7777`).
    pub fn new(bits: u32) -> Result<Self, ParseModeError> {
        if bits > N_MODE_BITS_MAX {
            return Err(ParseModeError {
                input: format!("{bits:o}"),
                reason: "permission bits exceed 0o7777".to_string(),
            });
        }
        Ok(Self { bits })
    }

    /// Permission bits.
    pub fn bits(self) -> u32 {
        self.bits
    }

    /// Exact equality against the permission part of a raw `st_mode`.
    pub fn matches_mode(self, mode_raw: u32) -> bool {
        mode_raw & N_MODE_BITS_MAX == self.bits
    }

    fn parse_octal(input: &str, digits: &str) -> Result<Self, ParseModeError> {
        if digits.is_empty() || !digits.chars().all(|c| ('0'..='7').contains(&c)) {
            return Err(ParseModeError {
                input: input.to_string(),
                reason: "expected octal digits 0-7".to_string(),
            });
        }
        let bits = u32::from_str_radix(digits, 8).map_err(|e| ParseModeError {
            input: input.to_string(),
            reason: e.to_string(),
        })?;
        Self::new(bits).map_err(|e| ParseModeError {
            input: input.to_string(),
            reason: e.reason,
        })
    }

    fn parse_symbolic(input: &str, symbols: &[char]) -> Result<Self, ParseModeError> {
        let mut bits = 0_u32;
        for (n_idx, c_symbol) in symbols.iter().copied().enumerate() {
            let (c_expected, n_bit) = ARR_MODE_SYMBOLS[n_idx];
            if c_symbol == c_expected {
                bits |= n_bit;
                continue;
            }
            if c_symbol == '-' {
                continue;
            }
            let special = ARR_MODE_SPECIAL
                .iter()
                .find(|(n_pos, c_special, _)| {
                    *n_pos == n_idx && c_symbol.to_ascii_lowercase() == *c_special
                });
            match special {
                Some((_, c_special, n_special)) => {
                    bits |= n_special;
                    // Lower case also carries the execute bit.
                    if c_symbol == *c_special {
                        bits |= n_bit;
                    }
                }
                None => {
                    return Err(ParseModeError {
                        input: input.to_string(),
                        reason: format!("unexpected symbol `{c_symbol}` at position {}", n_idx + 1),
                    });
                }
            }
        }
        Ok(Self { bits })
    }
}

impl FromStr for SpecFileMode {
    type Err = ParseModeError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let value = input.trim();
        if let Some(digits) = value.strip_prefix("0o") {
            return Self::parse_octal(input, digits);
        }
        if value.chars().all(|c| c.is_ascii_digit()) {
            return Self::parse_octal(input, value);
        }

        let l_symbols: Vec<char> = value.chars().collect();
        match l_symbols.len() {
            9 => Self::parse_symbolic(input, &l_symbols),
            10 if "-dlpcbs".contains(l_symbols[0]) => Self::parse_symbolic(input, &l_symbols[1..]),
            _ => Err(ParseModeError {
                input: input.to_string(),
                reason: "expected octal digits or 9/10 character symbolic notation".to_string(),
            }),
        }
    }
}

impl fmt::Display for SpecFileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut txt = String::with_capacity(9);
        for (n_idx, (c_symbol, n_bit)) in ARR_MODE_SYMBOLS.iter().enumerate() {
            let b_has_bit = self.bits & n_bit != 0;
            let special = ARR_MODE_SPECIAL
                .iter()
                .find(|(n_pos, _, n_special)| *n_pos == n_idx && self.bits & n_special != 0);
            let c_out = match (special, b_has_bit) {
                (Some((_, c_special, _)), true) => *c_special,
                (Some((_, c_special, _)), false) => c_special.to_ascii_uppercase(),
                (None, true) => *c_symbol,
                (None, false) => '-',
            };
            txt.push(c_out);
        }
        f.write_str(&txt)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Filters

/// File characteristics filter: name patterns, modification time bounds and
/// permission mode.
///
/// A sub-criterion at its zero value (empty pattern list, `None` bound) is
/// inactive. With no active sub-criterion every file matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecSelectionCriteria {
    /// Patterns applied to the file basename; a file matches if any matches.
    pub patterns_file_name: Vec<String>,
    /// Pattern interpretation mode.
    pub rule_pattern: EnumPatternMode,
    /// Match files modified strictly before this instant.
    pub time_older_than: Option<SystemTime>,
    /// Match files modified strictly after this instant.
    pub time_newer_than: Option<SystemTime>,
    /// Match files whose permission bits equal this mode.
    pub mode_equals: Option<SpecFileMode>,
    /// Combination of the active sub-criteria.
    pub rule_combine: EnumSelectCriterionMode,
}

impl SpecSelectionCriteria {
    /// Criteria selecting files whose names match any of `patterns`.
    pub fn with_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns_file_name: patterns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// True when at least one non-empty name pattern is present.
    pub fn are_patterns_active(&self) -> bool {
        self.patterns_file_name.iter().any(|p| !p.is_empty())
    }

    /// True when any sub-criterion is active.
    pub fn is_active(&self) -> bool {
        self.are_patterns_active()
            || self.time_older_than.is_some()
            || self.time_newer_than.is_some()
            || self.mode_equals.is_some()
    }
}

/// File type selection. Directories are structural and never filtered here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecFileTypeFilter {
    /// Select regular files.
    pub if_regular: bool,
    /// Select symbolic links.
    pub if_symlink: bool,
    /// Select devices, pipes, sockets.
    pub if_other_non_regular: bool,
}

impl SpecFileTypeFilter {
    /// Every non-directory kind.
    pub const fn all() -> Self {
        Self {
            if_regular: true,
            if_symlink: true,
            if_other_non_regular: true,
        }
    }

    /// Regular files only.
    pub const fn regular_only() -> Self {
        Self {
            if_regular: true,
            if_symlink: false,
            if_other_non_regular: false,
        }
    }

    /// At least one kind is selected.
    pub fn is_valid(&self) -> bool {
        self.if_regular || self.if_symlink || self.if_other_non_regular
    }

    /// Whether an entry of `kind` passes the filter.
    pub fn accepts(&self, kind: EnumEntryKind) -> bool {
        match kind {
            EnumEntryKind::Directory => false,
            EnumEntryKind::Regular => self.if_regular,
            EnumEntryKind::Symlink => self.if_symlink,
            EnumEntryKind::OtherNonRegular => self.if_other_non_regular,
        }
    }
}

impl Default for SpecFileTypeFilter {
    fn default() -> Self {
        Self {
            if_regular: true,
            if_symlink: true,
            if_other_non_regular: false,
        }
    }
}

/// Which part of the tree an operation covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecOperationScope {
    /// Include the root directory itself (and its own files).
    pub if_include_parent_directory: bool,
    /// Include every descendant directory.
    pub if_include_subtree: bool,
}

impl SpecOperationScope {
    /// Root and all descendants.
    pub const fn full_tree() -> Self {
        Self {
            if_include_parent_directory: true,
            if_include_subtree: true,
        }
    }

    /// Root directory only.
    pub const fn parent_only() -> Self {
        Self {
            if_include_parent_directory: true,
            if_include_subtree: false,
        }
    }

    /// Descendants only; files directly in the root are excluded.
    pub const fn subtree_only() -> Self {
        Self {
            if_include_parent_directory: false,
            if_include_subtree: true,
        }
    }

    /// Both flags false selects nothing.
    pub fn is_null_set(&self) -> bool {
        !self.if_include_parent_directory && !self.if_include_subtree
    }
}

impl Default for SpecOperationScope {
    fn default() -> Self {
        Self::full_tree()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Options

/// Input options for `copy_tree`.
#[derive(Debug, Clone)]
pub struct SpecCopyTreeOptions {
    /// Traversal scope.
    pub scope: SpecOperationScope,
    /// File kinds eligible for copying.
    pub file_types: SpecFileTypeFilter,
    /// File characteristics filter.
    pub criteria: SpecSelectionCriteria,
    /// Create every visited target directory, even without qualifying files.
    pub if_copy_empty_dirs: bool,
    /// Conflict behavior for destination files.
    pub rule_conflict_file: EnumFileConflictStrategy,
    /// Carry permissions, timestamps and xattrs over to copies.
    pub if_preserve_metadata: bool,
    /// Record created directories and copied files in the report.
    pub if_collect_results: bool,
}

impl Default for SpecCopyTreeOptions {
    fn default() -> Self {
        Self {
            scope: SpecOperationScope::default(),
            file_types: SpecFileTypeFilter::default(),
            criteria: SpecSelectionCriteria::default(),
            if_copy_empty_dirs: false,
            rule_conflict_file: EnumFileConflictStrategy::Overwrite,
            if_preserve_metadata: true,
            if_collect_results: false,
        }
    }
}

/// Input options for `move_tree`.
#[derive(Debug, Clone, Default)]
pub struct SpecMoveTreeOptions {
    /// Traversal scope.
    pub scope: SpecOperationScope,
    /// File kinds eligible for moving.
    pub file_types: SpecFileTypeFilter,
    /// File characteristics filter.
    pub criteria: SpecSelectionCriteria,
    /// Create every visited target directory, even without qualifying files.
    pub if_copy_empty_dirs: bool,
    /// Remove source directories left with no entries.
    pub if_delete_empty_source_dirs: bool,
    /// Conflict behavior for destination files.
    pub rule_conflict_file: EnumFileConflictStrategy,
    /// Record created directories and moved files in the report.
    pub if_collect_results: bool,
}

/// Input options for `delete_tree`.
#[derive(Debug, Clone, Default)]
pub struct SpecDeleteTreeOptions {
    /// Traversal scope.
    pub scope: SpecOperationScope,
    /// File kinds eligible for deletion.
    pub file_types: SpecFileTypeFilter,
    /// File characteristics filter.
    pub criteria: SpecSelectionCriteria,
    /// Record deleted files in the report.
    pub if_collect_results: bool,
}

/// Input options for `find_tree`.
#[derive(Debug, Clone)]
pub struct SpecFindTreeOptions {
    /// Traversal scope.
    pub scope: SpecOperationScope,
    /// File kinds to report.
    pub file_types: SpecFileTypeFilter,
    /// File characteristics filter.
    pub criteria: SpecSelectionCriteria,
}

impl Default for SpecFindTreeOptions {
    fn default() -> Self {
        Self {
            scope: SpecOperationScope::default(),
            file_types: SpecFileTypeFilter::all(),
            criteria: SpecSelectionCriteria::default(),
        }
    }
}

/// Input options for `execute_tree_ops`.
#[derive(Debug, Clone)]
pub struct SpecExecuteTreeOpsOptions {
    /// Traversal scope.
    pub scope: SpecOperationScope,
    /// File kinds the steps apply to.
    pub file_types: SpecFileTypeFilter,
    /// File characteristics filter.
    pub criteria: SpecSelectionCriteria,
    /// Steps applied in order to every selected file. Must not be empty.
    pub file_ops: Vec<EnumFileOperation>,
    /// Carry permissions, timestamps and xattrs over to content copies.
    pub if_preserve_metadata: bool,
}

impl Default for SpecExecuteTreeOpsOptions {
    fn default() -> Self {
        Self {
            scope: SpecOperationScope::default(),
            file_types: SpecFileTypeFilter::default(),
            criteria: SpecSelectionCriteria::default(),
            file_ops: Vec::new(),
            if_preserve_metadata: true,
        }
    }
}

/// Input options for `profile_tree`.
#[derive(Debug, Clone, Default)]
pub struct SpecProfileTreeOptions {
    /// Traversal scope.
    pub scope: SpecOperationScope,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// One non-fatal (or, for deletes, halting) failure bound to a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecOpError {
    /// Operation during which the failure happened.
    pub operation: EnumTreeOperation,
    /// Failed source or destination path.
    pub path: PathBuf,
    /// User-facing error text.
    pub exception: String,
}

impl fmt::Display for SpecOpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.operation,
            self.path.display(),
            self.exception
        )
    }
}

impl std::error::Error for SpecOpError {}

/// "Top-level call failed" errors (validation / setup stage).
#[derive(Debug, thiserror::Error)]
pub enum TreeOpError {
    /// Both scope flags are false.
    #[error("[{operation}] invalid scope: neither the parent directory nor the subtree is included")]
    InvalidScope { operation: EnumTreeOperation },

    /// No file type is selected.
    #[error("[{operation}] invalid file type filter: regular, symlink and other non-regular are all disabled")]
    EmptyFileTypeFilter { operation: EnumTreeOperation },

    /// `execute_tree_ops` was called without any step.
    #[error("[{operation}] no file operations given")]
    EmptyFileOperations { operation: EnumTreeOperation },

    /// A name pattern failed to compile.
    #[error("[{operation}] invalid pattern `{pattern}`: {message}")]
    InvalidPattern {
        operation: EnumTreeOperation,
        pattern: String,
        message: String,
    },

    /// The operation root does not exist.
    #[error("[{operation}] directory does not exist: {}", .path.display())]
    RootNotFound {
        operation: EnumTreeOperation,
        path: PathBuf,
    },

    /// The operation root exists but is not a directory.
    #[error("[{operation}] not a directory: {}", .path.display())]
    RootNotDirectory {
        operation: EnumTreeOperation,
        path: PathBuf,
    },

    /// The operation root could not be inspected.
    #[error("[{operation}] failed to inspect {}: {error}", .path.display())]
    RootInspectFailed {
        operation: EnumTreeOperation,
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Source and target overlap (one contains the other).
    #[error(
        "[{operation}] source and target directories overlap: {} <-> {}",
        .path_source.display(),
        .path_target.display()
    )]
    SourceTargetOverlap {
        operation: EnumTreeOperation,
        path_source: PathBuf,
        path_target: PathBuf,
    },

    /// Target root could not be prepared.
    #[error("[{operation}] failed to initialize target {}: {message}", .path.display())]
    TargetInitFailed {
        operation: EnumTreeOperation,
        path: PathBuf,
        message: String,
    },
}

impl TreeOpError {
    /// Operation the error belongs to.
    pub fn operation(&self) -> EnumTreeOperation {
        match self {
            Self::InvalidScope { operation }
            | Self::EmptyFileTypeFilter { operation }
            | Self::EmptyFileOperations { operation }
            | Self::InvalidPattern { operation, .. }
            | Self::RootNotFound { operation, .. }
            | Self::RootNotDirectory { operation, .. }
            | Self::RootInspectFailed { operation, .. }
            | Self::SourceTargetOverlap { operation, .. }
            | Self::TargetInitFailed { operation, .. } => *operation,
        }
    }

    /// Configuration errors are raised before the filesystem is touched.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidScope { .. }
                | Self::EmptyFileTypeFilter { .. }
                | Self::EmptyFileOperations { .. }
                | Self::InvalidPattern { .. }
                | Self::SourceTargetOverlap { .. }
        )
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
