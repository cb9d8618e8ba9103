//! C/C++ compile actions for ox
//!
//! This crate models a single C/C++ compile step as a reproducible function
//! of its declared inputs. It assembles the compiler command line from the
//! layered configuration, discovers the true input set from the compiler's
//! `.d` output, enforces the declared-inclusion policy, and publishes a
//! stable action key for the build cache.
//!
//! No compiler runs in here: execution is delegated through the
//! [`exec::CompileExecutor`] boundary, and the wider action graph, scheduler,
//! and artifact transport live elsewhere.

pub mod action;
pub mod command_line;
pub mod context;
pub mod depfile;
pub mod error;
pub mod exec;
pub mod file_types;
pub mod toolchain;
pub mod validate;

use std::collections::BTreeSet;

pub use action::{
    ActionBehavior, ActionOwner, CompileAction, CompileActionBuilder, CompileInfo, DotdFile,
    COMPILE_ACTION_CLASS_ID, FAKE_COMPILE_ACTION_CLASS_ID,
};
pub use command_line::CompileCommandLine;
pub use context::{CompilationContext, ModuleMap};
pub use error::ActionError;
pub use exec::{
    ArtifactResolver, CompileExecutor, Event, EventHandler, EventKind, ExecError,
    ExecutionContext, IncludeResolver, Reply, ResourceSet, VoidIncludeResolver,
};
pub use toolchain::{BuildConfig, CcToolchain, CoptsFilter, PerFileCopt, Tool, FDO_STAMP_MACRO};
pub use validate::IncludeProblems;

/// Active feature strings for a compilation.
///
/// The command-line assembler recognizes [`PARSE_HEADERS`] and
/// [`PREPROCESS_HEADERS`]; toolchains may attach extra options to any
/// feature.
pub type FeatureSet = BTreeSet<String>;

/// Compile C++ headers with `-x c++-header`.
pub const PARSE_HEADERS: &str = "parse_headers";

/// Preprocess C++ headers with `-E -x c++`.
pub const PREPROCESS_HEADERS: &str = "preprocess_headers";
