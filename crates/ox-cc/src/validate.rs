//! Declared-inclusion checks.
//!
//! The compiler's `.d` output tells us which headers a compile actually
//! consumed; this module decides whether each one was legitimately reachable
//! from the rule's declared sources and directories.

use std::collections::HashSet;
use std::sync::Mutex;

use camino::Utf8PathBuf;
use ox_artifact::Artifact;

use crate::error::ActionError;

/// Diagnostic dump of every validation verdict. Off in normal operation;
/// flip on when chasing an inclusion-policy discrepancy.
pub(crate) const VALIDATION_DEBUG: bool = false;

/// Serializes the multi-line validation dump across actions.
pub(crate) static VALIDATION_DEBUG_LOCK: Mutex<()> = Mutex::new(());

/// A bag of inclusion-policy violations collected during validation.
#[derive(Debug, Default)]
pub struct IncludeProblems {
    paths: Vec<String>,
}

impl IncludeProblems {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: impl Into<String>) {
        self.paths.push(path.into());
    }

    pub fn has_problems(&self) -> bool {
        !self.paths.is_empty()
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// The user-facing report, carrying every offending path.
    pub fn message(&self, label: &str, source_file: &Artifact) -> String {
        let mut message = format!(
            "undeclared inclusion(s) in rule '{label}':\nthis rule is missing dependency \
             declarations for the following files included by '{}':",
            source_file.exec_path()
        );
        for path in &self.paths {
            message.push_str("\n  '");
            message.push_str(path);
            message.push('\'');
        }
        message
    }

    /// Ok when empty, otherwise the fatal undeclared-inclusion error.
    pub fn into_result(self, label: &str, source_file: &Artifact) -> Result<(), ActionError> {
        if !self.has_problems() {
            return Ok(());
        }
        let message = self.message(label, source_file);
        Err(ActionError::UndeclaredInclusions {
            message,
            paths: self.paths,
        })
    }
}

/// Whether an included artifact is covered by a set of declared include
/// directories or declared include sources.
///
/// The simple case is an exact listing in `declared_include_srcs`, or a
/// parent directory contained in `declared_include_dirs`. A trailing `**`
/// segment in a declared dir covers everything beneath its parent. Anything
/// else falls back to walking the on-disk ancestors: a subdirectory of a
/// declared package is fine, but a `BUILD` marker file on the way up means
/// the input belongs to a different package and was never declared here.
pub(crate) fn is_declared_in(
    input: &Artifact,
    declared_include_dirs: &HashSet<Utf8PathBuf>,
    declared_include_srcs: &HashSet<Artifact>,
) -> bool {
    // Listed one by one?
    if declared_include_srcs.contains(input) {
        return true;
    }
    // A derived artifact MUST be listed explicitly, unless it lives under an
    // include link tree.
    if !input.is_source_artifact() && input.root().exec_path().file_name() != Some("include") {
        return false;
    }
    // Quick exact lookup on the parent directory.
    let include_dir = match input.root_relative_path().parent() {
        Some(dir) => dir,
        None => return true,
    };
    if include_dir.as_str().is_empty() || declared_include_dirs.contains(include_dir) {
        return true;
    }
    // Wildcards.
    for declared in declared_include_dirs {
        if declared.file_name() == Some("**") {
            if let Some(parent) = declared.parent() {
                if include_dir.starts_with(parent) {
                    return true;
                }
            }
        }
    }
    // See if it is in a subdir of a declared package. A BUILD file marks a
    // sub-package boundary, not a subdir of a declared package.
    let root = input.root().path();
    let mut dir = match input.path().parent() {
        Some(dir) => dir.to_owned(),
        None => return false,
    };
    loop {
        if dir.join("BUILD").exists() {
            return false;
        }
        dir = match dir.parent() {
            Some(parent) => parent.to_owned(),
            None => return false,
        };
        if dir.as_path() == root {
            return false;
        }
        if let Ok(relative) = dir.strip_prefix(root) {
            if declared_include_dirs.contains(relative) {
                return true;
            }
        }
    }
}
