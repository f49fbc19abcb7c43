//! File characteristics evaluation: name patterns, age bounds, mode.

use std::time::SystemTime;

use globset::{Glob, GlobMatcher};
use regex::Regex;

use crate::collection::FileRecord;
use crate::spec::{
    EnumPatternMode, EnumSelectCriterionMode, EnumTreeOperation, SpecFileMode,
    SpecFileTypeFilter, SpecOperationScope, SpecSelectionCriteria, TreeOpError,
};

////////////////////////////////////////////////////////////////////////////////
// #region PatternMatching

#[derive(Debug, Clone)]
pub(crate) enum TypePatternSeq {
    Literal(Vec<String>),
    Glob(Vec<GlobMatcher>),
    Regex(Vec<Regex>),
}

impl TypePatternSeq {
    fn is_match(&self, value: &str) -> bool {
        match self {
            Self::Literal(v) => v.iter().any(|p| value.contains(p.as_str())),
            Self::Glob(v) => v.iter().any(|p| p.is_match(value)),
            Self::Regex(v) => v.iter().any(|p| p.is_match(value)),
        }
    }
}

fn _compile(
    patterns: &[String],
    rule_pattern: EnumPatternMode,
    operation: EnumTreeOperation,
) -> Result<Option<TypePatternSeq>, TreeOpError> {
    let l_patterns: Vec<&String> = patterns.iter().filter(|p| !p.is_empty()).collect();
    if l_patterns.is_empty() {
        return Ok(None);
    }

    let invalid = |pattern: &str, message: String| TreeOpError::InvalidPattern {
        operation,
        pattern: pattern.to_string(),
        message,
    };

    match rule_pattern {
        EnumPatternMode::Literal => Ok(Some(TypePatternSeq::Literal(
            l_patterns.into_iter().cloned().collect(),
        ))),
        EnumPatternMode::Glob => {
            let mut l_glob = Vec::with_capacity(l_patterns.len());
            for pattern in l_patterns {
                let matcher = Glob::new(pattern)
                    .map_err(|e| invalid(pattern, e.to_string()))?
                    .compile_matcher();
                l_glob.push(matcher);
            }
            Ok(Some(TypePatternSeq::Glob(l_glob)))
        }
        EnumPatternMode::Regex => {
            let mut l_regex = Vec::with_capacity(l_patterns.len());
            for pattern in l_patterns {
                let regex = Regex::new(pattern).map_err(|e| invalid(pattern, e.to_string()))?;
                l_regex.push(regex);
            }
            Ok(Some(TypePatternSeq::Regex(l_regex)))
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Matcher

/// Compiled form of [`SpecSelectionCriteria`].
///
/// Compilation is the only fallible step; matching is pure.
#[derive(Debug, Clone)]
pub struct SelectionMatcher {
    patterns: Option<TypePatternSeq>,
    time_older_than: Option<SystemTime>,
    time_newer_than: Option<SystemTime>,
    mode_equals: Option<SpecFileMode>,
    rule_combine: EnumSelectCriterionMode,
}

impl SelectionMatcher {
    /// Compile `criteria`; pattern syntax errors are configuration errors of
    /// `operation`.
    pub fn compile(
        criteria: &SpecSelectionCriteria,
        operation: EnumTreeOperation,
    ) -> Result<Self, TreeOpError> {
        Ok(Self {
            patterns: _compile(
                &criteria.patterns_file_name,
                criteria.rule_pattern,
                operation,
            )?,
            time_older_than: criteria.time_older_than,
            time_newer_than: criteria.time_newer_than,
            mode_equals: criteria.mode_equals,
            rule_combine: criteria.rule_combine,
        })
    }

    /// Matcher that accepts every file.
    pub fn open() -> Self {
        Self {
            patterns: None,
            time_older_than: None,
            time_newer_than: None,
            mode_equals: None,
            rule_combine: EnumSelectCriterionMode::And,
        }
    }

    /// True when no sub-criterion is active.
    pub fn is_open(&self) -> bool {
        self.patterns.is_none()
            && self.time_older_than.is_none()
            && self.time_newer_than.is_none()
            && self.mode_equals.is_none()
    }

    /// Evaluate the active sub-criteria against one file.
    pub fn matches(&self, record: &FileRecord) -> bool {
        let mut l_results: [Option<bool>; 4] = [None; 4];

        if let Some(patterns) = &self.patterns {
            l_results[0] = Some(patterns.is_match(&record.name));
        }
        if let Some(time_bound) = self.time_older_than {
            l_results[1] = Some(record.modified.is_some_and(|t| t < time_bound));
        }
        if let Some(time_bound) = self.time_newer_than {
            l_results[2] = Some(record.modified.is_some_and(|t| t > time_bound));
        }
        if let Some(mode) = self.mode_equals {
            l_results[3] = Some(mode.matches_mode(record.mode));
        }

        let mut iter_active = l_results.into_iter().flatten().peekable();
        if iter_active.peek().is_none() {
            return true;
        }
        match self.rule_combine {
            EnumSelectCriterionMode::And => iter_active.all(|b| b),
            EnumSelectCriterionMode::Or => iter_active.any(|b| b),
        }
    }
}

/// One-shot evaluation of `criteria` against `record`.
///
/// Prefer [`SelectionMatcher::compile`] when evaluating many files.
pub fn matches(
    record: &FileRecord,
    criteria: &SpecSelectionCriteria,
    operation: EnumTreeOperation,
) -> Result<bool, TreeOpError> {
    Ok(SelectionMatcher::compile(criteria, operation)?.matches(record))
}

/// Validate the three selection axes of a file-selecting operation and
/// compile its criteria. Never touches the filesystem.
pub(crate) fn compile_selection(
    operation: EnumTreeOperation,
    scope: SpecOperationScope,
    file_types: SpecFileTypeFilter,
    criteria: &SpecSelectionCriteria,
) -> Result<SelectionMatcher, TreeOpError> {
    if scope.is_null_set() {
        return Err(TreeOpError::InvalidScope { operation });
    }
    if !file_types.is_valid() {
        return Err(TreeOpError::EmptyFileTypeFilter { operation });
    }
    SelectionMatcher::compile(criteria, operation)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime};

    use super::{SelectionMatcher, compile_selection, matches};
    use crate::classify::EnumEntryKind;
    use crate::collection::FileRecord;
    use crate::spec::{
        EnumPatternMode, EnumSelectCriterionMode, EnumTreeOperation, SpecFileMode,
        SpecFileTypeFilter, SpecOperationScope, SpecSelectionCriteria, TreeOpError,
    };

    const OP: EnumTreeOperation = EnumTreeOperation::FindTree;

    fn record(name: &str, age_secs: u64, mode: u32) -> FileRecord {
        FileRecord {
            path: PathBuf::from("/tree").join(name),
            name: name.to_string(),
            name_os: name.into(),
            kind: EnumEntryKind::Regular,
            size: 1,
            modified: Some(SystemTime::UNIX_EPOCH + Duration::from_secs(age_secs)),
            mode: 0o100000 | mode,
        }
    }

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn empty_criteria_match_everything() {
        let matcher =
            SelectionMatcher::compile(&SpecSelectionCriteria::default(), OP).expect("compile");
        assert!(matcher.is_open());
        assert!(matcher.matches(&record("a.txt", 10, 0o644)));
        assert!(matcher.matches(&record(".hidden", 0, 0)));
        assert!(SelectionMatcher::open().matches(&record("x", 1, 0o600)));
    }

    #[test]
    fn empty_pattern_strings_are_inactive() {
        let criteria = SpecSelectionCriteria::with_patterns([""]);
        let matcher = SelectionMatcher::compile(&criteria, OP).expect("compile");
        assert!(matcher.is_open());
    }

    #[test]
    fn patterns_are_ored() {
        let criteria = SpecSelectionCriteria::with_patterns(["*.txt", "*.md"]);
        let matcher = SelectionMatcher::compile(&criteria, OP).expect("compile");
        assert!(matcher.matches(&record("a.txt", 1, 0o644)));
        assert!(matcher.matches(&record("b.md", 1, 0o644)));
        assert!(!matcher.matches(&record("c.log", 1, 0o644)));
    }

    #[test]
    fn glob_supports_question_mark_and_classes() {
        let criteria = SpecSelectionCriteria::with_patterns(["file?.[ch]"]);
        let matcher = SelectionMatcher::compile(&criteria, OP).expect("compile");
        assert!(matcher.matches(&record("file1.c", 1, 0o644)));
        assert!(matcher.matches(&record("fileX.h", 1, 0o644)));
        assert!(!matcher.matches(&record("file10.c", 1, 0o644)));
        assert!(!matcher.matches(&record("file1.o", 1, 0o644)));
    }

    #[test]
    fn time_bounds_are_strict() {
        let criteria = SpecSelectionCriteria {
            time_older_than: Some(at(100)),
            ..SpecSelectionCriteria::default()
        };
        let matcher = SelectionMatcher::compile(&criteria, OP).expect("compile");
        assert!(matcher.matches(&record("a", 99, 0o644)));
        assert!(!matcher.matches(&record("a", 100, 0o644)));

        let criteria = SpecSelectionCriteria {
            time_newer_than: Some(at(100)),
            ..SpecSelectionCriteria::default()
        };
        let matcher = SelectionMatcher::compile(&criteria, OP).expect("compile");
        assert!(matcher.matches(&record("a", 101, 0o644)));
        assert!(!matcher.matches(&record("a", 100, 0o644)));
    }

    #[test]
    fn and_mode_requires_every_active_criterion() {
        let criteria = SpecSelectionCriteria {
            patterns_file_name: vec!["*.txt".to_string()],
            time_newer_than: Some(at(50)),
            mode_equals: Some(SpecFileMode::new(0o644).expect("mode")),
            ..SpecSelectionCriteria::default()
        };
        let matcher = SelectionMatcher::compile(&criteria, OP).expect("compile");
        assert!(matcher.matches(&record("a.txt", 60, 0o644)));
        assert!(!matcher.matches(&record("a.txt", 40, 0o644)));
        assert!(!matcher.matches(&record("a.txt", 60, 0o600)));
        assert!(!matcher.matches(&record("a.log", 60, 0o644)));
    }

    #[test]
    fn or_mode_requires_any_active_criterion() {
        let criteria = SpecSelectionCriteria {
            patterns_file_name: vec!["*.txt".to_string()],
            time_older_than: Some(at(50)),
            rule_combine: EnumSelectCriterionMode::Or,
            ..SpecSelectionCriteria::default()
        };
        let matcher = SelectionMatcher::compile(&criteria, OP).expect("compile");
        assert!(matcher.matches(&record("a.txt", 60, 0o644)));
        assert!(matcher.matches(&record("a.log", 40, 0o644)));
        assert!(!matcher.matches(&record("a.log", 60, 0o644)));
    }

    #[test]
    fn missing_modification_time_never_matches_time_bounds() {
        let mut rec = record("a", 10, 0o644);
        rec.modified = None;
        let criteria = SpecSelectionCriteria {
            time_older_than: Some(at(100)),
            ..SpecSelectionCriteria::default()
        };
        assert!(!matches(&rec, &criteria, OP).expect("compile"));
    }

    #[test]
    fn regex_and_literal_modes() {
        let criteria = SpecSelectionCriteria {
            patterns_file_name: vec![r"^report_\d+\.csv$".to_string()],
            rule_pattern: EnumPatternMode::Regex,
            ..SpecSelectionCriteria::default()
        };
        assert!(matches(&record("report_01.csv", 1, 0o644), &criteria, OP).expect("ok"));
        assert!(!matches(&record("report_x.csv", 1, 0o644), &criteria, OP).expect("ok"));

        let criteria = SpecSelectionCriteria {
            patterns_file_name: vec!["port".to_string()],
            rule_pattern: EnumPatternMode::Literal,
            ..SpecSelectionCriteria::default()
        };
        assert!(matches(&record("report.csv", 1, 0o644), &criteria, OP).expect("ok"));
    }

    #[test]
    fn invalid_patterns_are_configuration_errors() {
        let criteria = SpecSelectionCriteria::with_patterns(["["]);
        let err = SelectionMatcher::compile(&criteria, OP).expect_err("invalid glob");
        assert!(matches!(err, TreeOpError::InvalidPattern { .. }));
        assert!(err.is_configuration_error());

        let criteria = SpecSelectionCriteria {
            patterns_file_name: vec!["(".to_string()],
            rule_pattern: EnumPatternMode::Regex,
            ..SpecSelectionCriteria::default()
        };
        assert!(SelectionMatcher::compile(&criteria, OP).is_err());
    }

    #[test]
    fn compile_selection_checks_scope_then_types() {
        let scope_null = SpecOperationScope {
            if_include_parent_directory: false,
            if_include_subtree: false,
        };
        let types_empty = SpecFileTypeFilter {
            if_regular: false,
            if_symlink: false,
            if_other_non_regular: false,
        };
        let criteria = SpecSelectionCriteria::default();

        let err = compile_selection(OP, scope_null, types_empty, &criteria).expect_err("scope");
        assert!(matches!(err, TreeOpError::InvalidScope { .. }));
        let err = compile_selection(OP, SpecOperationScope::default(), types_empty, &criteria)
            .expect_err("types");
        assert!(matches!(err, TreeOpError::EmptyFileTypeFilter { .. }));
        assert!(
            compile_selection(
                OP,
                SpecOperationScope::default(),
                SpecFileTypeFilter::default(),
                &criteria
            )
            .is_ok()
        );
    }
}
