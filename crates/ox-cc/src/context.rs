//! Compilation context: the declared inclusion policy for a compile.

use camino::Utf8PathBuf;
use ox_artifact::Artifact;

/// Clang module map configuration enabling strict declared-use checking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleMap {
    name: String,
    artifact: Artifact,
}

impl ModuleMap {
    pub fn new(name: impl Into<String>, artifact: Artifact) -> Self {
        Self {
            name: name.into(),
            artifact,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }
}

/// Immutable bundle of everything the rule declared about inclusions.
///
/// Built once per target before any action is constructed, then shared.
/// The quote/user/system include dirs feed the command line; the declared
/// dirs, warn dirs, and sources are the authority the inclusion validator
/// checks discovered inputs against.
#[derive(Debug, Clone, Default)]
pub struct CompilationContext {
    quote_include_dirs: Vec<Utf8PathBuf>,
    include_dirs: Vec<Utf8PathBuf>,
    system_include_dirs: Vec<Utf8PathBuf>,
    declared_include_dirs: Vec<Utf8PathBuf>,
    declared_include_warn_dirs: Vec<Utf8PathBuf>,
    declared_include_srcs: Vec<Artifact>,
    pregrepped_headers: Vec<(Artifact, Artifact)>,
    compilation_prerequisites: Vec<Artifact>,
    defines: Vec<String>,
    module_map: Option<ModuleMap>,
}

impl CompilationContext {
    pub fn builder() -> CompilationContextBuilder {
        CompilationContextBuilder {
            context: Self::default(),
        }
    }

    /// Directories searched via `-iquote`.
    pub fn quote_include_dirs(&self) -> &[Utf8PathBuf] {
        &self.quote_include_dirs
    }

    /// Directories searched via `-I`.
    pub fn include_dirs(&self) -> &[Utf8PathBuf] {
        &self.include_dirs
    }

    /// Directories searched via `-isystem`.
    pub fn system_include_dirs(&self) -> &[Utf8PathBuf] {
        &self.system_include_dirs
    }

    /// Directories headers may legitimately come from. Entries may end in a
    /// `**` wildcard segment.
    pub fn declared_include_dirs(&self) -> &[Utf8PathBuf] {
        &self.declared_include_dirs
    }

    /// Like [`declared_include_dirs`](Self::declared_include_dirs), but a hit
    /// here only warns instead of failing the action.
    pub fn declared_include_warn_dirs(&self) -> &[Utf8PathBuf] {
        &self.declared_include_warn_dirs
    }

    /// Header files declared one by one; matched exactly.
    pub fn declared_include_srcs(&self) -> &[Artifact] {
        &self.declared_include_srcs
    }

    /// Pairs of (generated header, pregrepped include list) the include
    /// scanner may consult instead of grepping the header itself.
    pub fn pregrepped_headers(&self) -> &[(Artifact, Artifact)] {
        &self.pregrepped_headers
    }

    /// Artifacts that are live for every action using this context.
    pub fn compilation_prerequisites(&self) -> &[Artifact] {
        &self.compilation_prerequisites
    }

    /// Preprocessor defines, without the `-D` prefix.
    pub fn defines(&self) -> &[String] {
        &self.defines
    }

    pub fn module_map(&self) -> Option<&ModuleMap> {
        self.module_map.as_ref()
    }
}

/// Builder for [`CompilationContext`].
#[derive(Debug, Default)]
pub struct CompilationContextBuilder {
    context: CompilationContext,
}

impl CompilationContextBuilder {
    pub fn add_quote_include_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.context.quote_include_dirs.push(dir.into());
        self
    }

    pub fn add_include_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.context.include_dirs.push(dir.into());
        self
    }

    pub fn add_system_include_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.context.system_include_dirs.push(dir.into());
        self
    }

    pub fn add_declared_include_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.context.declared_include_dirs.push(dir.into());
        self
    }

    pub fn add_declared_include_warn_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.context.declared_include_warn_dirs.push(dir.into());
        self
    }

    pub fn add_declared_include_src(mut self, artifact: Artifact) -> Self {
        self.context.declared_include_srcs.push(artifact);
        self
    }

    pub fn add_pregrepped_header(mut self, header: Artifact, greps: Artifact) -> Self {
        self.context.pregrepped_headers.push((header, greps));
        self
    }

    pub fn add_compilation_prerequisite(mut self, artifact: Artifact) -> Self {
        self.context.compilation_prerequisites.push(artifact);
        self
    }

    pub fn add_define(mut self, define: impl Into<String>) -> Self {
        self.context.defines.push(define.into());
        self
    }

    pub fn module_map(mut self, module_map: ModuleMap) -> Self {
        self.context.module_map = Some(module_map);
        self
    }

    pub fn build(self) -> CompilationContext {
        self.context
    }
}
