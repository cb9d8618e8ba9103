//! Test harness for compile-action integration tests
//!
//! Provides an isolated on-disk workspace plus fake implementations of the
//! executor/resolver boundary, so actions can run end to end without a real
//! compiler.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

use ox_artifact::{Artifact, ArtifactRoot, MiddlemanExpander};
use ox_cc::{
    ArtifactResolver, CcToolchain, CompileAction, CompileExecutor, Event, EventHandler,
    ExecError, ExecutionContext, Reply, ResourceSet,
};

/// A temp-dir workspace doubling as the exec root, with one source root at
/// the top and one output root under `out/bin`.
pub struct TestWorkspace {
    _dir: TempDir,
    exec_root: Utf8PathBuf,
    pub source_root: Arc<ArtifactRoot>,
    pub output_root: Arc<ArtifactRoot>,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create workspace temp dir");
        let exec_root =
            Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir");
        let source_root = ArtifactRoot::source(exec_root.clone());
        let output_root = ArtifactRoot::output(exec_root.join("out/bin"), "out/bin");
        Self {
            _dir: dir,
            exec_root,
            source_root,
            output_root,
        }
    }

    pub fn exec_root(&self) -> &Utf8Path {
        &self.exec_root
    }

    /// Write a file under the exec root, creating parent directories.
    pub fn write_file(&self, relative: &str, contents: &str) {
        let path = self.exec_root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create parent dirs");
        }
        std::fs::write(&path, contents).expect("failed to write file");
    }

    pub fn file_exists(&self, relative: &str) -> bool {
        self.exec_root.join(relative).exists()
    }

    pub fn source(&self, relative: &str) -> Artifact {
        Artifact::new(self.source_root.clone(), relative)
    }

    pub fn derived(&self, relative: &str) -> Artifact {
        Artifact::new(self.output_root.clone(), relative)
    }

    pub fn middleman(&self, relative: &str) -> Artifact {
        Artifact::middleman(self.output_root.clone(), relative)
    }
}

pub fn toolchain() -> CcToolchain {
    CcToolchain::new("tools/gcc", "tools/ld")
}

/// Executor that never runs anything; optionally hands back an in-memory
/// `.d` reply.
pub struct FakeExecutor {
    pub reply: Option<Vec<u8>>,
}

impl FakeExecutor {
    pub fn replying(contents: &[u8]) -> Self {
        Self {
            reply: Some(contents.to_vec()),
        }
    }
}

impl CompileExecutor for FakeExecutor {
    fn exec_with_reply(
        &self,
        _action: &CompileAction,
        _ctx: &ExecutionContext<'_>,
    ) -> Result<Option<Reply>, ExecError> {
        Ok(self.reply.clone().map(Reply::new))
    }

    fn strategy_locality(&self) -> &str {
        "fake"
    }

    fn needs_include_scanning(&self) -> bool {
        true
    }

    fn estimate_resource_consumption(&self, action: &CompileAction) -> ResourceSet {
        action.estimate_resource_consumption_local()
    }

    fn scanned_include_files(
        &self,
        _action: &CompileAction,
        _ctx: &ExecutionContext<'_>,
    ) -> Result<Vec<Utf8PathBuf>, ExecError> {
        Ok(Vec::new())
    }
}

/// Resolves every exec path to a source artifact under the workspace root.
pub struct ResolveSources {
    pub source_root: Arc<ArtifactRoot>,
}

impl ArtifactResolver for ResolveSources {
    fn resolve_source_artifact(&self, exec_path: &Utf8Path) -> Option<Artifact> {
        Some(Artifact::new(self.source_root.clone(), exec_path))
    }
}

/// Resolves nothing, for exercising unresolvable-input errors.
pub struct ResolveNothing;

impl ArtifactResolver for ResolveNothing {
    fn resolve_source_artifact(&self, _exec_path: &Utf8Path) -> Option<Artifact> {
        None
    }
}

/// Resolves everything except a deny-listed set of exec paths.
pub struct ResolveExcept {
    pub source_root: Arc<ArtifactRoot>,
    pub deny: HashSet<Utf8PathBuf>,
}

impl ArtifactResolver for ResolveExcept {
    fn resolve_source_artifact(&self, exec_path: &Utf8Path) -> Option<Artifact> {
        if self.deny.contains(exec_path) {
            return None;
        }
        Some(Artifact::new(self.source_root.clone(), exec_path))
    }
}

/// Expander for builds with no middlemen.
pub struct NoMiddlemen;

impl MiddlemanExpander for NoMiddlemen {
    fn expand(&self, _middleman: &Artifact, _out: &mut HashSet<Artifact>) {}
}

/// Expands every middleman to the same configured artifact set.
pub struct ExpandTo(pub Vec<Artifact>);

impl MiddlemanExpander for ExpandTo {
    fn expand(&self, _middleman: &Artifact, out: &mut HashSet<Artifact>) {
        out.extend(self.0.iter().cloned());
    }
}

/// Event handler that records everything it sees.
#[derive(Default)]
pub struct CollectedEvents(pub Mutex<Vec<Event>>);

impl CollectedEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.0.lock().expect("events lock"))
    }
}

impl EventHandler for CollectedEvents {
    fn handle(&self, event: Event) {
        self.0.lock().expect("events lock").push(event);
    }
}
