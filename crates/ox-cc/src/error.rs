//! Error types for compile actions.

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::depfile::DepfileError;
use crate::exec::ExecError;

/// Errors that stop a compile action.
///
/// Everything here is fatal to the action; retry policy belongs to the
/// surrounding scheduler. Soft inclusion-policy violations are not errors,
/// they are reported through the event handler.
#[derive(Debug, Error)]
pub enum ActionError {
    /// One or more discovered inputs fall outside the declared policy.
    /// Carries every offending path, not just the first.
    #[error("{message}")]
    UndeclaredInclusions { message: String, paths: Vec<String> },

    /// The `.d` output was unreadable or malformed.
    #[error("error while parsing .d file for '{source_file}': {source}")]
    Dotd {
        source_file: Utf8PathBuf,
        #[source]
        source: DepfileError,
    },

    /// The dotd file is virtual but the executor returned no in-memory reply.
    #[error("no in-memory .d reply for virtual dotd file '{dotd}'")]
    MissingDotdReply { dotd: Utf8PathBuf },

    /// The executor failed, enriched with the owning rule's label.
    #[error("C/C++ compilation of rule '{label}' failed: {source}")]
    Execution {
        label: String,
        #[source]
        source: ExecError,
    },

    /// Execution was interrupted; propagated without wrapping so the
    /// scheduler can tell cancellation from failure.
    #[error("C/C++ compilation interrupted")]
    Interrupted,

    /// Could not create an empty coverage-notes placeholder.
    #[error("error creating file '{path}': {source}")]
    OutputMaterialization {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A C++ header was handed to the action without a feature that says how
    /// to compile it. The action must not be constructed in this state.
    #[error(
        "header source '{source_file}' requires the parse_headers or preprocess_headers feature"
    )]
    HeaderCompileUnsupported { source_file: Utf8PathBuf },
}
