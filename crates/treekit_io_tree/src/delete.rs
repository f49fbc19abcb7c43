//! Delete-tree: remove selected files, never directories. Also the
//! directory-level counterpart that clears every subdirectory of one root.

use std::fs;
use std::path::Path;

use crate::classify::EnumEntryKind;
use crate::collection::{DirectoryNode, FileRecord};
use crate::report::{ReportDeleteSubdirectories, ReportDeleteTree, ReportDeleteTreeBuilder};
use crate::select::{SelectionMatcher, compile_selection};
use crate::spec::{
    EnumTreeOperation, SpecDeleteTreeOptions, SpecFileTypeFilter, SpecOpError, TreeOpError,
};
use crate::util::{delete_file, read_directory_entries};
use crate::walk::{EnumWalkOutcome, TreeVisitor, absolute_root, inspect_root, walk_tree};

struct DeleteTreeVisitor {
    file_types: SpecFileTypeFilter,
    matcher: SelectionMatcher,
    builder_rm_report: ReportDeleteTreeBuilder,
    b_dir_has_deletions: bool,
}

impl TreeVisitor for DeleteTreeVisitor {
    fn visit_directory(&mut self, _node: &DirectoryNode) -> Result<(), SpecOpError> {
        self.builder_rm_report.add_dir_scanned();
        self.b_dir_has_deletions = false;
        Ok(())
    }

    fn visit_file(&mut self, _node: &DirectoryNode, record: &FileRecord) -> Result<(), SpecOpError> {
        if !self.file_types.accepts(record.kind) || !self.matcher.matches(record) {
            self.builder_rm_report.add_file_remaining(record);
            return Ok(());
        }

        if let Err(e) = delete_file(&record.path) {
            self.builder_rm_report.add_file_remaining(record);
            return Err(SpecOpError {
                operation: EnumTreeOperation::DeleteTree,
                path: record.path.clone(),
                exception: format!("failed to delete file: {e}"),
            });
        }
        if !self.b_dir_has_deletions {
            self.b_dir_has_deletions = true;
            self.builder_rm_report.add_dir_with_deletions();
        }
        self.builder_rm_report.add_file_deleted(record);
        Ok(())
    }

    fn record_error(&mut self, error: SpecOpError) {
        self.builder_rm_report.push_error(error);
    }
}

/// Delete the files under `dir_root` selected by `spec_options`.
///
/// Directories are walked but never removed. The first file that cannot be
/// deleted stops the walk: the returned report carries that failure in
/// [`ReportDeleteTree::fatal`] together with the counters gathered so far.
/// Unreadable directories are non-fatal and only skip their subtree.
pub fn delete_tree<P>(
    dir_root: P,
    spec_options: SpecDeleteTreeOptions,
) -> Result<ReportDeleteTree, TreeOpError>
where
    P: AsRef<Path>,
{
    let enum_operation = EnumTreeOperation::DeleteTree;
    let path_dir_root = dir_root.as_ref();
    let matcher = compile_selection(
        enum_operation,
        spec_options.scope,
        spec_options.file_types,
        &spec_options.criteria,
    )?;
    tracing::debug!("[{enum_operation}] {}", path_dir_root.display());

    let mut visitor = DeleteTreeVisitor {
        file_types: spec_options.file_types,
        matcher,
        builder_rm_report: ReportDeleteTreeBuilder::new(spec_options.if_collect_results),
        b_dir_has_deletions: false,
    };
    let outcome = walk_tree(enum_operation, path_dir_root, spec_options.scope, &mut visitor)?;
    if let EnumWalkOutcome::Halted(e) = outcome {
        visitor.builder_rm_report.set_fatal(e);
    }

    let report = visitor.builder_rm_report.build();
    tracing::debug!("{report}");
    Ok(report)
}

/// Remove every immediate subdirectory of `dir_root`, with all its content.
///
/// Files, symlinks (also those pointing at directories) and other entries
/// directly in `dir_root` are kept, as is `dir_root` itself. A subdirectory
/// that cannot be removed is recorded and the rest are still attempted.
pub fn delete_subdirectories<P>(dir_root: P) -> Result<ReportDeleteSubdirectories, TreeOpError>
where
    P: AsRef<Path>,
{
    let enum_operation = EnumTreeOperation::DeleteSubdirectories;
    let path_dir_root = absolute_root(enum_operation, dir_root.as_ref())?;
    inspect_root(enum_operation, &path_dir_root)?;
    let spec_listing =
        read_directory_entries(&path_dir_root).map_err(|e| TreeOpError::RootInspectFailed {
            operation: enum_operation,
            path: path_dir_root.clone(),
            error: e,
        })?;
    tracing::debug!("[{enum_operation}] {}", path_dir_root.display());

    let mut report = ReportDeleteSubdirectories::default();
    for failure in spec_listing.l_failures {
        match failure.kind {
            Some(kind) if kind != EnumEntryKind::Directory => report.add_entry_kept(),
            _ => report.add_error(
                failure.path,
                format!("failed to inspect entry: {}", failure.error),
            ),
        }
    }
    for record in spec_listing.l_entries {
        if record.kind != EnumEntryKind::Directory {
            report.add_entry_kept();
            continue;
        }
        match fs::remove_dir_all(&record.path) {
            Ok(()) => report.add_dir_deleted(record.path),
            Err(e) => report.add_error(record.path, format!("failed to delete directory: {e}")),
        }
    }

    tracing::debug!("{report}");
    Ok(report)
}
