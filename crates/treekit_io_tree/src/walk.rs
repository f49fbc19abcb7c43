//! Pre-order depth-first tree walker.
//!
//! The walker owns traversal only. Everything an operation does with a
//! directory or file happens in a [`TreeVisitor`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::classify::EnumEntryKind;
use crate::collection::{DirectoryNode, FileRecord};
use crate::spec::{EnumTreeOperation, SpecOpError, SpecOperationScope, TreeOpError};
use crate::util::{SpecEntryFailure, read_directory_entries};

/// Callbacks driven by [`walk_tree`].
///
/// Returning `Err` from a callback halts the walk immediately; the error comes
/// back as [`EnumWalkOutcome::Halted`].
pub trait TreeVisitor {
    /// Called once per directory, before any of its entries.
    fn visit_directory(&mut self, node: &DirectoryNode) -> Result<(), SpecOpError>;

    /// Called for every non-directory entry of `node`, sorted by name.
    fn visit_file(&mut self, node: &DirectoryNode, record: &FileRecord)
    -> Result<(), SpecOpError>;

    /// Called after the subtree of `node` is finished. Not called for
    /// directories whose listing failed.
    fn leave_directory(&mut self, _node: &DirectoryNode) -> Result<(), SpecOpError> {
        Ok(())
    }

    /// Receives non-fatal traversal errors (unreadable directory or entry).
    fn record_error(&mut self, error: SpecOpError);
}

/// How a walk ended when the root itself was valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumWalkOutcome {
    /// Every reachable directory was processed.
    Completed,
    /// A visitor callback returned a fatal error.
    Halted(SpecOpError),
}

impl EnumWalkOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

enum EnumWalkFrame {
    Enter { path: PathBuf, depth: usize },
    Leave(DirectoryNode),
}

/// Absolute form of an operation root. Symlinks are left unresolved.
pub(crate) fn absolute_root(
    operation: EnumTreeOperation,
    path_root: &Path,
) -> Result<PathBuf, TreeOpError> {
    std::path::absolute(path_root).map_err(|e| TreeOpError::RootInspectFailed {
        operation,
        path: path_root.to_path_buf(),
        error: e,
    })
}

/// Resolve `path_root` as an operation root: it must exist and be a directory.
///
/// The root itself is followed if it is a symlink; nothing below it is.
pub(crate) fn inspect_root(
    operation: EnumTreeOperation,
    path_root: &Path,
) -> Result<fs::Metadata, TreeOpError> {
    let meta_root = fs::metadata(path_root).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => TreeOpError::RootNotFound {
            operation,
            path: path_root.to_path_buf(),
        },
        _ => TreeOpError::RootInspectFailed {
            operation,
            path: path_root.to_path_buf(),
            error: e,
        },
    })?;
    if !meta_root.is_dir() {
        return Err(TreeOpError::RootNotDirectory {
            operation,
            path: path_root.to_path_buf(),
        });
    }
    Ok(meta_root)
}

/// Walk `path_root` in pre-order, depth first, entries sorted by name.
///
/// - `scope.if_include_parent_directory`: the root is visited first and its
///   own files are surfaced. Otherwise the walk starts at the root's immediate
///   subdirectories and root files are never surfaced.
/// - `scope.if_include_subtree`: descend below the starting directories.
///
/// Symlinked directories are surfaced as files and never descended into.
/// An unreadable directory is reported through
/// [`TreeVisitor::record_error`] and its subtree skipped.
///
/// Every node and record carries an absolute path, also for a relative
/// `path_root`.
///
/// Fails before any callback when the scope is empty or the root is missing
/// or not a directory.
pub fn walk_tree<V>(
    operation: EnumTreeOperation,
    path_root: &Path,
    scope: SpecOperationScope,
    visitor: &mut V,
) -> Result<EnumWalkOutcome, TreeOpError>
where
    V: TreeVisitor + ?Sized,
{
    if scope.is_null_set() {
        return Err(TreeOpError::InvalidScope { operation });
    }
    let path_root = absolute_root(operation, path_root)?;
    let path_root = path_root.as_path();
    let meta_root = inspect_root(operation, path_root)?;

    let mut l_stack: Vec<EnumWalkFrame> = Vec::new();
    if scope.if_include_parent_directory {
        let node_root = DirectoryNode::new(path_root.to_path_buf(), Some(&meta_root), 0);
        if let Err(e) = visitor.visit_directory(&node_root) {
            return Ok(EnumWalkOutcome::Halted(e));
        }
        if let Some(outcome) = expand_directory(
            operation,
            node_root,
            scope.if_include_subtree,
            visitor,
            &mut l_stack,
        ) {
            return Ok(outcome);
        }
    } else {
        match read_directory_entries(path_root) {
            Ok(spec_listing) => {
                // Root files are out of scope here; only subdirectories count.
                for failure in spec_listing.l_failures {
                    if failure.kind.is_none_or(|k| k == EnumEntryKind::Directory) {
                        visitor.record_error(entry_error(operation, failure));
                    }
                }
                push_subdirectories(&mut l_stack, spec_listing.l_entries, 1);
            }
            Err(e) => visitor.record_error(listing_error(operation, path_root, &e)),
        }
    }

    while let Some(frame) = l_stack.pop() {
        match frame {
            EnumWalkFrame::Leave(node) => {
                if let Err(e) = visitor.leave_directory(&node) {
                    return Ok(EnumWalkOutcome::Halted(e));
                }
            }
            EnumWalkFrame::Enter { path, depth } => {
                let meta_dir = match fs::symlink_metadata(&path) {
                    Ok(v) => v,
                    Err(e) => {
                        visitor.record_error(entry_error(
                            operation,
                            SpecEntryFailure {
                                path,
                                kind: Some(EnumEntryKind::Directory),
                                error: e,
                            },
                        ));
                        continue;
                    }
                };
                let node = DirectoryNode::new(path, Some(&meta_dir), depth);
                if let Err(e) = visitor.visit_directory(&node) {
                    return Ok(EnumWalkOutcome::Halted(e));
                }
                if let Some(outcome) = expand_directory(
                    operation,
                    node,
                    scope.if_include_subtree,
                    visitor,
                    &mut l_stack,
                ) {
                    return Ok(outcome);
                }
            }
        }
    }

    Ok(EnumWalkOutcome::Completed)
}

/// List `node`, surface its files, then schedule its leave hook and (when
/// descending) its subdirectories. Returns `Some` only when the visitor halts.
fn expand_directory<V>(
    operation: EnumTreeOperation,
    node: DirectoryNode,
    if_descend: bool,
    visitor: &mut V,
    l_stack: &mut Vec<EnumWalkFrame>,
) -> Option<EnumWalkOutcome>
where
    V: TreeVisitor + ?Sized,
{
    let spec_listing = match read_directory_entries(&node.path) {
        Ok(v) => v,
        Err(e) => {
            visitor.record_error(listing_error(operation, &node.path, &e));
            return None;
        }
    };
    for failure in spec_listing.l_failures {
        visitor.record_error(entry_error(operation, failure));
    }

    let mut l_subdirs = Vec::new();
    for record in spec_listing.l_entries {
        if record.kind == EnumEntryKind::Directory {
            l_subdirs.push(record);
            continue;
        }
        if let Err(e) = visitor.visit_file(&node, &record) {
            return Some(EnumWalkOutcome::Halted(e));
        }
    }

    let n_depth_child = node.depth + 1;
    l_stack.push(EnumWalkFrame::Leave(node));
    if if_descend {
        push_subdirectories(l_stack, l_subdirs, n_depth_child);
    }
    None
}

fn push_subdirectories(l_stack: &mut Vec<EnumWalkFrame>, l_entries: Vec<FileRecord>, depth: usize) {
    // Reverse so the smallest name is popped first.
    for record in l_entries.into_iter().rev() {
        if record.kind == EnumEntryKind::Directory {
            l_stack.push(EnumWalkFrame::Enter {
                path: record.path,
                depth,
            });
        }
    }
}

fn listing_error(operation: EnumTreeOperation, path_dir: &Path, e: &io::Error) -> SpecOpError {
    SpecOpError {
        operation,
        path: path_dir.to_path_buf(),
        exception: format!("failed to read directory: {e}"),
    }
}

fn entry_error(operation: EnumTreeOperation, failure: SpecEntryFailure) -> SpecOpError {
    SpecOpError {
        operation,
        path: failure.path,
        exception: format!("failed to inspect entry: {}", failure.error),
    }
}
