//! Boundary interfaces the compile-action core calls out to.
//!
//! The core never runs a compiler, resolves an artifact, or prints to a
//! terminal itself. Executors, resolvers, middleman expanders, and event
//! handlers are shared across actions and must be thread-safe; the traits
//! here are the whole contract.

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

use ox_artifact::{Artifact, MiddlemanExpander};

use crate::action::CompileAction;

/// Errors from the execution backend.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("compiler exited with status {exit_code}: {stderr}")]
    CommandFailed { exit_code: i32, stderr: String },

    #[error("failed to launch compiler: {0}")]
    Spawn(String),

    /// The executor was interrupted; the action propagates this to the
    /// scheduler unchanged.
    #[error("interrupted")]
    Interrupted,
}

/// An in-memory `.d` payload from an executor that never wrote the file to
/// disk. Contents are latin-1 bytes in Make rule syntax.
#[derive(Debug, Clone)]
pub struct Reply {
    contents: Vec<u8>,
}

impl Reply {
    pub fn new(contents: Vec<u8>) -> Self {
        Self { contents }
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }
}

/// Estimated resources for running an action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceSet {
    pub memory_mb: f64,
    pub cpu_usage: f64,
    pub io_usage: f64,
}

impl ResourceSet {
    pub const fn new(memory_mb: f64, cpu_usage: f64, io_usage: f64) -> Self {
        Self {
            memory_mb,
            cpu_usage,
            io_usage,
        }
    }
}

/// Severity of a build event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Info,
    Warning,
    Error,
}

/// A user-visible build event.
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    /// Where the owning rule was declared.
    pub location: String,
    pub message: String,
    /// Label of the owning rule.
    pub label: String,
}

/// Sink for user-visible build events. Implementations must be thread-safe;
/// many actions report concurrently.
pub trait EventHandler: Sync {
    fn handle(&self, event: Event);
}

/// Resolves an exec path to a source artifact, if one exists under any
/// source root.
pub trait ArtifactResolver: Sync {
    fn resolve_source_artifact(&self, exec_path: &Utf8Path) -> Option<Artifact>;
}

/// Determines which artifacts, if any, accompany each included file into the
/// live input set, beyond the included file itself.
///
/// Some execution backends need sidecar files per header; most do not.
pub trait IncludeResolver: Send + Sync {
    fn inputs_for_included_file(
        &self,
        included: &Artifact,
        resolver: &dyn ArtifactResolver,
    ) -> Vec<Artifact>;
}

/// Include resolver that never adds auxiliary inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoidIncludeResolver;

impl IncludeResolver for VoidIncludeResolver {
    fn inputs_for_included_file(
        &self,
        _included: &Artifact,
        _resolver: &dyn ArtifactResolver,
    ) -> Vec<Artifact> {
        Vec::new()
    }
}

/// The execution backend for compile actions.
///
/// `exec_with_reply` runs the assembled command and may hand the `.d`
/// contents back in memory instead of writing them to disk.
pub trait CompileExecutor: Sync {
    fn exec_with_reply(
        &self,
        action: &CompileAction,
        ctx: &ExecutionContext<'_>,
    ) -> Result<Option<Reply>, ExecError>;

    /// Human-readable locality of the strategy, e.g. "local" or "remote".
    fn strategy_locality(&self) -> &str;

    /// Whether this strategy relies on the core's include discovery.
    fn needs_include_scanning(&self) -> bool;

    fn estimate_resource_consumption(&self, action: &CompileAction) -> ResourceSet;

    /// Include files found by scanning the action's known inputs, for
    /// observers that shadow the action remotely.
    fn scanned_include_files(
        &self,
        action: &CompileAction,
        ctx: &ExecutionContext<'_>,
    ) -> Result<Vec<Utf8PathBuf>, ExecError>;
}

/// Everything an action needs from its surroundings while executing.
pub struct ExecutionContext<'a> {
    /// Absolute root all exec paths are relative to.
    pub exec_root: &'a Utf8Path,
    pub executor: &'a dyn CompileExecutor,
    pub artifact_resolver: &'a dyn ArtifactResolver,
    pub middleman_expander: &'a dyn MiddlemanExpander,
    pub event_handler: &'a dyn EventHandler,
    /// Include full failure detail in executor errors.
    pub verbose_failures: bool,
}
