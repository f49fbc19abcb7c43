//! `treekit_io_tree` v1:
//! Directory tree operations engine.
//!
//! Selective bulk operations over a local directory tree. Each operation
//! composes a traversal scope, a file type filter and a characteristics
//! filter, walks the tree once and returns a statistics report.
//!
//! Modules:
//! - `copy`       : copy-tree orchestration
//! - `move_tree`  : move-tree (copy then remove source)
//! - `delete`     : delete-tree, delete-subdirectories
//! - `tree_ops`   : ordered per-file steps over a tree
//! - `find`       : find-tree
//! - `profile`    : per-kind counts and sizes
//! - `walk`       : pre-order walker and visitor trait
//! - `select`     : selection criteria evaluation
//! - `classify`   : entry kind classification
//! - `collection` : directory nodes, file records, ordered collections
//! - `spec`       : enums/options/errors
//! - `report`     : per-operation reports and builders
//! - `util`       : single-entry filesystem primitives

pub mod classify;
pub mod collection;
pub mod copy;
pub mod delete;
pub mod find;
pub mod move_tree;
pub mod profile;
pub mod report;
pub mod select;
pub mod spec;
pub mod tree_ops;
pub mod util;
pub mod walk;

pub use classify::{EnumEntryKind, classify, classify_metadata};
pub use collection::{DirCollection, DirectoryNode, FileCollection, FileRecord};
pub use copy::copy_tree;
pub use delete::{delete_subdirectories, delete_tree};
pub use find::find_tree;
pub use move_tree::move_tree;
pub use profile::profile_tree;
pub use report::{
    ReportCopyTree, ReportCopyTreeBuilder, ReportDeleteSubdirectories, ReportDeleteTree,
    ReportDeleteTreeBuilder, ReportExecuteTreeOps, ReportExecuteTreeOpsBuilder, ReportFindTree,
    ReportMoveTree, ReportMoveTreeBuilder, ReportProfileTree,
};
pub use select::SelectionMatcher;
pub use spec::{
    EnumFileConflictStrategy, EnumFileOperation, EnumPatternMode, EnumSelectCriterionMode,
    EnumTreeOperation, ParseModeError, SpecCopyTreeOptions, SpecDeleteTreeOptions,
    SpecExecuteTreeOpsOptions, SpecFileMode, SpecFileTypeFilter, SpecFindTreeOptions,
    SpecMoveTreeOptions, SpecOpError, SpecOperationScope, SpecProfileTreeOptions,
    SpecSelectionCriteria, TreeOpError,
};
pub use tree_ops::execute_tree_ops;
pub use walk::{EnumWalkOutcome, TreeVisitor, walk_tree};
