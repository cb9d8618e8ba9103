//! Path and artifact model for ox
//!
//! Every file the build tracks is an [`Artifact`]: either checked into the
//! workspace (source) or produced by some action (derived). Artifacts carry
//! their root and a root-relative path; the exec path (root's exec prefix
//! joined with the root-relative path) is the identity used for equality,
//! hashing, and cache keys.

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};

/// Returns true iff some prefix in `prefixes` is a segment-aligned path
/// prefix of `path`.
///
/// Segment-aligned means `out/include` is a prefix of `out/include/a.h` but
/// not of `out/includes/a.h`.
pub fn starts_with_any<'a>(
    path: &Utf8Path,
    prefixes: impl IntoIterator<Item = &'a Utf8PathBuf>,
) -> bool {
    prefixes.into_iter().any(|prefix| path.starts_with(prefix))
}

/// Where a set of artifacts is anchored on disk and in the exec root.
///
/// Source roots hold checked-in files and have an empty exec prefix: a source
/// artifact's exec path equals its root-relative path. Output roots hold
/// derived files under a non-empty exec prefix such as `out/bin`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRoot {
    /// Absolute on-disk location of the root.
    path: Utf8PathBuf,
    /// Exec-root-relative prefix. Empty for source roots.
    exec_path: Utf8PathBuf,
    source: bool,
}

impl ArtifactRoot {
    /// A root for checked-in files.
    pub fn source(path: impl Into<Utf8PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            path: path.into(),
            exec_path: Utf8PathBuf::new(),
            source: true,
        })
    }

    /// A root for derived files, mounted at `exec_path` inside the exec root.
    pub fn output(path: impl Into<Utf8PathBuf>, exec_path: impl Into<Utf8PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            path: path.into(),
            exec_path: exec_path.into(),
            source: false,
        })
    }

    /// Absolute on-disk location of the root.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Exec-root-relative prefix of the root. Empty for source roots.
    pub fn exec_path(&self) -> &Utf8Path {
        &self.exec_path
    }

    pub fn is_source_root(&self) -> bool {
        self.source
    }
}

/// What kind of file an [`Artifact`] stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Checked into the workspace.
    Source,
    /// Produced by an action.
    Derived,
    /// An aggregator standing in for a set of real artifacts. Expanded on
    /// demand through a [`MiddlemanExpander`]; never nested.
    Middleman,
}

/// A file tracked by the build.
///
/// Two artifacts with equal exec paths are equal, regardless of root or kind.
#[derive(Debug, Clone)]
pub struct Artifact {
    root: Arc<ArtifactRoot>,
    root_relative: Utf8PathBuf,
    exec_path: Utf8PathBuf,
    kind: ArtifactKind,
}

impl Artifact {
    /// Create an artifact under `root`. The kind follows the root: source
    /// roots yield source artifacts, output roots yield derived ones.
    pub fn new(root: Arc<ArtifactRoot>, root_relative: impl Into<Utf8PathBuf>) -> Self {
        let root_relative = root_relative.into();
        let kind = if root.is_source_root() {
            ArtifactKind::Source
        } else {
            ArtifactKind::Derived
        };
        let exec_path = root.exec_path.join(&root_relative);
        Self {
            root,
            root_relative,
            exec_path,
            kind,
        }
    }

    /// Create a middleman artifact under an output root.
    pub fn middleman(root: Arc<ArtifactRoot>, root_relative: impl Into<Utf8PathBuf>) -> Self {
        let mut artifact = Self::new(root, root_relative);
        artifact.kind = ArtifactKind::Middleman;
        artifact
    }

    pub fn root(&self) -> &Arc<ArtifactRoot> {
        &self.root
    }

    /// Path relative to the artifact's root.
    pub fn root_relative_path(&self) -> &Utf8Path {
        &self.root_relative
    }

    /// Exec-root-relative path: the artifact's identity.
    pub fn exec_path(&self) -> &Utf8Path {
        &self.exec_path
    }

    /// Absolute on-disk location.
    pub fn path(&self) -> Utf8PathBuf {
        self.root.path.join(&self.root_relative)
    }

    pub fn file_name(&self) -> Option<&str> {
        self.root_relative.file_name()
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn is_source_artifact(&self) -> bool {
        self.kind == ArtifactKind::Source
    }

    pub fn is_middleman_artifact(&self) -> bool {
        self.kind == ArtifactKind::Middleman
    }
}

impl PartialEq for Artifact {
    fn eq(&self, other: &Self) -> bool {
        self.exec_path == other.exec_path
    }
}

impl Eq for Artifact {}

impl Hash for Artifact {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.exec_path.hash(state);
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.exec_path)
    }
}

/// Collect the exec paths of a sequence of artifacts.
pub fn exec_paths<'a>(artifacts: impl IntoIterator<Item = &'a Artifact>) -> Vec<Utf8PathBuf> {
    artifacts
        .into_iter()
        .map(|artifact| artifact.exec_path().to_owned())
        .collect()
}

/// Expands middleman artifacts into the concrete artifacts they stand for.
///
/// Implemented by the execution context, which knows the aggregated set.
/// Expansion is a non-recursive set union into `out`: the middleman itself is
/// not added, and middlemen never aggregate other middlemen.
pub trait MiddlemanExpander {
    fn expand(&self, middleman: &Artifact, out: &mut HashSet<Artifact>);
}

#[cfg(test)]
mod tests;
