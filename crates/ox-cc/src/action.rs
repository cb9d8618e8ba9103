//! The C/C++ compile action.
//!
//! A [`CompileAction`] is created once per (source, output) pair, publishes
//! its action key before execution, hands the assembled command to an
//! executor, then rebuilds its live input set from the `.d` output and
//! validates every discovered input against the declared-inclusion policy.
//!
//! ## Mutability
//!
//! The action is thread-compatible: different actions run concurrently, but
//! no operation on one instance is reentrant. The only state that changes
//! after construction is the live input set, mutated under the action's own
//! lock — once from static data at construction and once from the `.d` after
//! execution. The action key folds only fields frozen before execution, so
//! it is stable across input discovery.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ox_artifact::{starts_with_any, Artifact, MiddlemanExpander};
use ox_cache::{compile_action_key, ActionKey};

use crate::command_line::CompileCommandLine;
use crate::context::CompilationContext;
use crate::depfile;
use crate::error::ActionError;
use crate::exec::{
    ArtifactResolver, CompileExecutor, Event, EventHandler, EventKind, ExecError,
    ExecutionContext, IncludeResolver, Reply, ResourceSet, VoidIncludeResolver,
};
use crate::file_types;
use crate::toolchain::{BuildConfig, CcToolchain, CoptsFilter, Tool};
use crate::validate::{is_declared_in, IncludeProblems, VALIDATION_DEBUG, VALIDATION_DEBUG_LOCK};
use crate::FeatureSet;

/// Identity of the plain compile behavior in the action cache.
pub const COMPILE_ACTION_CLASS_ID: Uuid = Uuid::from_u128(0x5fe1_6a38_9c74_44b7_a204_a1b5_cc9f_2a68);

/// Identity of the fake-compile behavior (writes a placeholder object).
pub const FAKE_COMPILE_ACTION_CLASS_ID: Uuid =
    Uuid::from_u128(0x8d9b_2e41_0f36_4c8a_b7d5_3e90_17ac_66f4);

/// Execution-time behavior of a compile action.
///
/// Variants never share an action-class id: the id feeds the action key, so
/// two behaviors can never collide in the cache even when their command
/// lines agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionBehavior {
    Compile,
    FakeCompile,
}

impl ActionBehavior {
    pub fn class_id(self) -> Uuid {
        match self {
            ActionBehavior::Compile => COMPILE_ACTION_CLASS_ID,
            ActionBehavior::FakeCompile => FAKE_COMPILE_ACTION_CLASS_ID,
        }
    }
}

/// The rule that emitted this action.
#[derive(Debug, Clone)]
pub struct ActionOwner {
    pub label: String,
    /// Where the rule was declared, for event reporting.
    pub location: String,
}

impl ActionOwner {
    pub fn new(label: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            location: location.into(),
        }
    }
}

/// A reference to a `.d` file. Either a real on-disk artifact, or a virtual
/// exec path whose contents only ever exist as an in-memory reply. Exactly
/// one of the two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DotdFile {
    Artifact(Artifact),
    VirtualExecPath(Utf8PathBuf),
}

impl DotdFile {
    /// The on-disk artifact, if this dotd is real.
    pub fn artifact(&self) -> Option<&Artifact> {
        match self {
            DotdFile::Artifact(artifact) => Some(artifact),
            DotdFile::VirtualExecPath(_) => None,
        }
    }

    /// The exec path regardless of mode; safe to put on a command line.
    pub fn safe_exec_path(&self) -> &Utf8Path {
        match self {
            DotdFile::Artifact(artifact) => artifact.exec_path(),
            DotdFile::VirtualExecPath(exec_path) => exec_path,
        }
    }

    /// The absolute on-disk location, if this dotd is real.
    pub fn on_disk_path(&self) -> Option<Utf8PathBuf> {
        self.artifact().map(Artifact::path)
    }
}

/// The observability record emitted for extra actions that shadow a compile.
///
/// Until inputs are known this lists only the source plus the declared
/// include sources; afterwards, the full live input set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileInfo {
    pub tool: String,
    pub compiler_options: Vec<String>,
    pub output_file: String,
    pub source_file: String,
    pub sources_and_headers: Vec<String>,
}

struct LiveInputs {
    inputs: Vec<Artifact>,
    known: bool,
}

/// Action that represents one C/C++ compilation step.
pub struct CompileAction {
    owner: ActionOwner,
    behavior: ActionBehavior,
    command_line: CompileCommandLine,
    mandatory_inputs: Vec<Artifact>,
    optional_inputs: Vec<Artifact>,
    output_file: Artifact,
    gcno_file: Option<Artifact>,
    dwo_file: Option<Artifact>,
    dotd_file: DotdFile,
    config: Arc<BuildConfig>,
    toolchain: Arc<CcToolchain>,
    context: Arc<CompilationContext>,
    extra_system_include_prefixes: Vec<Utf8PathBuf>,
    include_resolver: Arc<dyn IncludeResolver>,
    action_class_id: Uuid,
    live: Mutex<LiveInputs>,
}

impl CompileAction {
    pub fn builder(
        owner: ActionOwner,
        source_file: Artifact,
        output_file: Artifact,
        dotd_file: DotdFile,
        toolchain: Arc<CcToolchain>,
        config: Arc<BuildConfig>,
        context: Arc<CompilationContext>,
    ) -> CompileActionBuilder {
        CompileActionBuilder {
            owner,
            behavior: ActionBehavior::Compile,
            features: FeatureSet::new(),
            source_file,
            source_label: None,
            mandatory_inputs: Vec::new(),
            optional_inputs: Vec::new(),
            output_file,
            gcno_file: None,
            dwo_file: None,
            dotd_file,
            config,
            toolchain,
            context,
            copts: Vec::new(),
            plugin_opts: Vec::new(),
            copts_filter: CoptsFilter::allow_all(),
            extra_system_include_prefixes: Vec::new(),
            enable_modules: false,
            fdo_build_stamp: None,
            include_resolver: Arc::new(VoidIncludeResolver),
            action_class_id: None,
        }
    }

    fn live(&self) -> MutexGuard<'_, LiveInputs> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn owner(&self) -> &ActionOwner {
        &self.owner
    }

    pub fn behavior(&self) -> ActionBehavior {
        self.behavior
    }

    pub fn action_class_id(&self) -> Uuid {
        self.action_class_id
    }

    /// The c/cc source handed to the compiler.
    pub fn source_file(&self) -> &Artifact {
        self.command_line.source_file()
    }

    /// Where the compiler puts its result.
    pub fn output_file(&self) -> &Artifact {
        &self.output_file
    }

    /// The debug-info sidecar under Fission, when enabled.
    pub fn dwo_file(&self) -> Option<&Artifact> {
        self.dwo_file.as_ref()
    }

    /// The coverage-notes output under instrumentation, when enabled.
    pub fn gcno_file(&self) -> Option<&Artifact> {
        self.gcno_file.as_ref()
    }

    pub fn dotd_file(&self) -> &DotdFile {
        &self.dotd_file
    }

    pub fn context(&self) -> &CompilationContext {
        &self.context
    }

    pub fn toolchain(&self) -> &CcToolchain {
        &self.toolchain
    }

    pub fn build_config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn plugin_opts(&self) -> &[String] {
        self.command_line.plugin_opts()
    }

    pub fn extra_system_include_prefixes(&self) -> &[Utf8PathBuf] {
        &self.extra_system_include_prefixes
    }

    pub fn mandatory_inputs(&self) -> &[Artifact] {
        &self.mandatory_inputs
    }

    /// The live input set. A superset of mandatory inputs, compilation
    /// prerequisites, and optional inputs — except transiently after
    /// [`update_inputs_from_cache`](Self::update_inputs_from_cache), which
    /// is allowed to restore a smaller set.
    pub fn inputs(&self) -> Vec<Artifact> {
        self.live().inputs.clone()
    }

    /// False until the `.d`-driven updater has run, unless include scanning
    /// is disabled toolchain-wide (then inputs are known from construction).
    pub fn inputs_known(&self) -> bool {
        self.live().known
    }

    /// Compile actions always discover inputs beyond their static set.
    pub fn discovers_inputs(&self) -> bool {
        true
    }

    pub fn primary_input(&self) -> &Artifact {
        self.source_file()
    }

    pub fn primary_output(&self) -> &Artifact {
        &self.output_file
    }

    /// Declared outputs: object file, on-disk dotd, coverage notes, dwo.
    pub fn outputs(&self) -> Vec<Artifact> {
        let mut outputs = vec![self.output_file.clone()];
        if let Some(dotd) = self.dotd_file.artifact() {
            outputs.push(dotd.clone());
        }
        if let Some(gcno) = &self.gcno_file {
            outputs.push(gcno.clone());
        }
        if let Some(dwo) = &self.dwo_file {
            outputs.push(dwo.clone());
        }
        outputs
    }

    pub fn builtin_include_directories(&self) -> &[Utf8PathBuf] {
        &self.toolchain.builtin_include_directories
    }

    pub fn quote_include_dirs(&self) -> &[Utf8PathBuf] {
        self.context.quote_include_dirs()
    }

    /// Context include dirs plus any `-Idir` copts (combined form only).
    pub fn include_dirs(&self) -> Vec<Utf8PathBuf> {
        let mut dirs = self.context.include_dirs().to_vec();
        for opt in self.command_line.copts() {
            if let Some(dir) = opt.strip_prefix("-I") {
                if !dir.is_empty() {
                    dirs.push(Utf8PathBuf::from(dir));
                }
            }
        }
        dirs
    }

    /// Context system include dirs plus any `-isystemdir` copts.
    pub fn system_include_dirs(&self) -> Vec<Utf8PathBuf> {
        let mut dirs = self.context.system_include_dirs().to_vec();
        for opt in self.command_line.copts() {
            if let Some(dir) = opt.strip_prefix("-isystem") {
                if !dir.is_empty() {
                    dirs.push(Utf8PathBuf::from(dir));
                }
            }
        }
        dirs
    }

    /// The operands of every `-include` option on the command line.
    pub fn cmdline_includes(&self) -> Vec<String> {
        let argv = self.argv();
        let mut includes = Vec::new();
        let mut args = argv.into_iter();
        while let Some(arg) = args.next() {
            if arg == "-include" {
                if let Some(operand) = args.next() {
                    includes.push(operand);
                }
            }
        }
        includes
    }

    /// Sources the include scanner starts from.
    pub fn include_scanner_sources(&self) -> Vec<Utf8PathBuf> {
        vec![self.source_file().exec_path().to_owned()]
    }

    /// Generated files the include scanner may legally see, mapped to their
    /// pregrepped include list when one exists.
    pub fn scanner_file_map(&self) -> BTreeMap<Utf8PathBuf, Option<Utf8PathBuf>> {
        let mut map = BTreeMap::new();
        for artifact in self.context.declared_include_srcs() {
            if !artifact.is_source_artifact() {
                map.insert(artifact.path(), None);
            }
        }
        for (header, greps) in self.context.pregrepped_headers() {
            map.insert(header.path(), Some(greps.path()));
        }
        map
    }

    pub fn defines(&self) -> &[String] {
        self.context.defines()
    }

    /// Environment for the compiler subprocess. Under coverage, `PWD` is
    /// pinned so absolute paths the compiler embeds stay hermetic.
    pub fn environment(&self) -> Vec<(String, String)> {
        let mut env = self.config.default_shell_env.clone();
        if self.config.code_coverage {
            env.retain(|(key, _)| key != "PWD");
            env.push(("PWD".to_string(), "/proc/self/cwd".to_string()));
        }
        env
    }

    /// The command and arguments for the compiler subprocess.
    pub fn argv(&self) -> Vec<String> {
        self.command_line.argv(&self.context, &self.toolchain)
    }

    pub fn compiler_options(&self) -> Vec<String> {
        self.command_line
            .compiler_options(&self.context, &self.toolchain)
    }

    /// Declared include sources as exec paths in a stable order. The order
    /// carries no meaning, but the action key needs one.
    pub fn declared_include_srcs_in_stable_order(&self) -> Vec<Utf8PathBuf> {
        let mut paths = ox_artifact::exec_paths(self.context.declared_include_srcs());
        paths.sort();
        paths
    }

    /// The action key: stable for a given action identity, independent of
    /// anything that happens after construction (in particular, of input
    /// discovery).
    pub fn compute_key(&self) -> ActionKey {
        // Argv captures everything that affects the object file. The
        // declared-inclusion fields are folded in because they change the
        // validation verdict even when argv does not.
        compile_action_key(
            self.action_class_id,
            &self.argv(),
            self.context.declared_include_dirs(),
            self.context.declared_include_warn_dirs(),
            &self.declared_include_srcs_in_stable_order(),
            &self.extra_system_include_prefixes,
        )
    }

    pub fn progress_message(&self) -> String {
        format!("Compiling {}", self.source_file().exec_path())
    }

    pub fn mnemonic(&self) -> &'static str {
        "CcCompile"
    }

    pub fn describe_strategy(&self, executor: &dyn CompileExecutor) -> String {
        executor.strategy_locality().to_string()
    }

    pub fn needs_include_scanning(&self, executor: &dyn CompileExecutor) -> bool {
        executor.needs_include_scanning()
    }

    pub fn estimate_resource_consumption(&self, executor: &dyn CompileExecutor) -> ResourceSet {
        executor.estimate_resource_consumption(self)
    }

    /// Resource estimate for local execution: mostly I/O wait, about half a
    /// core of real work.
    pub fn estimate_resource_consumption_local(&self) -> ResourceSet {
        ResourceSet::new(200.0, 0.5, 0.0)
    }

    /// Include files for observers that shadow this action remotely,
    /// gathered by scanning the known inputs.
    pub fn additional_files_for_extra_action(
        &self,
        ctx: &ExecutionContext<'_>,
    ) -> Result<Vec<Utf8PathBuf>, ExecError> {
        ctx.executor.scanned_include_files(self, ctx)
    }

    /// The observability record for extra actions.
    pub fn extra_action_info(&self) -> CompileInfo {
        let sources_and_headers = if self.inputs_known() {
            self.inputs()
                .iter()
                .map(|artifact| artifact.exec_path().to_string())
                .collect()
        } else {
            std::iter::once(self.source_file().exec_path().to_string())
                .chain(
                    self.context
                        .declared_include_srcs()
                        .iter()
                        .map(|artifact| artifact.exec_path().to_string()),
                )
                .collect()
        };
        CompileInfo {
            tool: self.toolchain.tool_path(Tool::Gcc).to_string(),
            compiler_options: self.compiler_options(),
            output_file: self.output_file.exec_path().to_string(),
            source_file: self.source_file().exec_path().to_string(),
            sources_and_headers,
        }
    }

    /// Run the compile: delegate to the executor, normalize coverage-notes
    /// outputs, rebuild the live input set from the `.d`, then validate
    /// every discovered input. The in-memory reply is released before
    /// validation; it can be large.
    pub fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<(), ActionError> {
        let reply = ctx
            .executor
            .exec_with_reply(self, ctx)
            .map_err(|source| match source {
                ExecError::Interrupted => ActionError::Interrupted,
                source => {
                    if ctx.verbose_failures {
                        tracing::error!(argv = ?self.argv(), "compile command failed");
                    }
                    ActionError::Execution {
                        label: self.owner.label.clone(),
                        source,
                    }
                }
            })?;
        self.ensure_coverage_notes_files_exist()?;
        self.update_action_inputs(ctx.exec_root, ctx.artifact_resolver, reply.as_ref())?;
        drop(reply);
        self.validate_inclusions(ctx.middleman_expander, ctx.event_handler)
    }

    /// The compiler only writes `.gcno` files for non-empty translation
    /// units. Create empty ones so the output set never depends on the
    /// contents of the inputs.
    pub fn ensure_coverage_notes_files_exist(&self) -> Result<(), ActionError> {
        for output in self.outputs() {
            let name = output.file_name().unwrap_or_default();
            if file_types::is_coverage_notes(name) && !output.path().exists() {
                let path = output.path();
                std::fs::write(&path, b"").map_err(|source| {
                    ActionError::OutputMaterialization { path, source }
                })?;
            }
        }
        Ok(())
    }

    /// Recalculate the live input set from the `.d` output.
    ///
    /// On failure the partially-rebuilt set is still published and
    /// `inputs_known` stays false, so callers never observe the previous
    /// set as if it were fresh.
    pub fn update_action_inputs(
        &self,
        exec_root: &Utf8Path,
        artifact_resolver: &dyn ArtifactResolver,
        reply: Option<&Reply>,
    ) -> Result<(), ActionError> {
        if !self.toolchain.scan_includes {
            return Ok(());
        }
        self.live().known = false;

        let mut inputs: Vec<Artifact> = Vec::new();
        inputs.extend(self.mandatory_inputs.iter().cloned());
        inputs.extend(self.optional_inputs.iter().cloned());
        inputs.extend(self.context.compilation_prerequisites().iter().cloned());

        let result = self.populate_action_inputs(exec_root, artifact_resolver, reply, &mut inputs);

        let mut live = self.live();
        live.inputs = dedup_by_exec_path(inputs);
        if result.is_ok() {
            live.known = true;
        }
        result
    }

    fn populate_action_inputs(
        &self,
        exec_root: &Utf8Path,
        artifact_resolver: &dyn ArtifactResolver,
        reply: Option<&Reply>,
        inputs: &mut Vec<Artifact>,
    ) -> Result<(), ActionError> {
        let dependencies = self.process_depset(reply)?;

        let mut system_include_prefixes: Vec<Utf8PathBuf> = self
            .toolchain
            .builtin_include_directories
            .iter()
            .filter(|dir| dir.is_absolute())
            .cloned()
            .collect();
        system_include_prefixes.extend(self.extra_system_include_prefixes.iter().cloned());

        let mut problems = IncludeProblems::new();
        let allowed_derived_inputs = self.allowed_derived_inputs_map();
        for dependency in dependencies {
            let exec_path = if dependency.is_absolute() {
                // Absolute includes from system paths are fine. The compiler
                // is handed only relative paths otherwise, so anything else
                // absolute is a non-hermetic include — unless it points back
                // into the exec root, which we tolerate by stripping.
                if starts_with_any(&dependency, &system_include_prefixes) {
                    continue;
                }
                match dependency.strip_prefix(exec_root) {
                    Ok(relative) => relative.to_owned(),
                    Err(_) => {
                        problems.add(dependency.as_str());
                        continue;
                    }
                }
            } else {
                dependency
            };

            let artifact = allowed_derived_inputs
                .get(&exec_path)
                .cloned()
                .or_else(|| artifact_resolver.resolve_source_artifact(&exec_path));
            match artifact {
                Some(artifact) => {
                    // Some execution backends need extra files per included
                    // file; those ride along into the live set.
                    let auxiliary = self
                        .include_resolver
                        .inputs_for_included_file(&artifact, artifact_resolver);
                    inputs.push(artifact);
                    inputs.extend(auxiliary);
                }
                None => problems.add(exec_path.as_str()),
            }
        }
        problems.into_result(&self.owner.label, self.source_file())
    }

    fn process_depset(&self, reply: Option<&Reply>) -> Result<Vec<Utf8PathBuf>, ActionError> {
        let source_file = self.source_file().exec_path().to_owned();
        if let Some(reply) = reply {
            return depfile::parse_depfile_bytes(reply.contents()).map_err(|source| {
                ActionError::Dotd {
                    source_file,
                    source,
                }
            });
        }
        match &self.dotd_file {
            DotdFile::Artifact(artifact) => {
                depfile::parse_depfile(&artifact.path()).map_err(|source| ActionError::Dotd {
                    source_file,
                    source,
                })
            }
            DotdFile::VirtualExecPath(exec_path) => Err(ActionError::MissingDotdReply {
                dotd: exec_path.clone(),
            }),
        }
    }

    /// Exec path → artifact for every derived file this action may legally
    /// consume without the resolver's help.
    fn allowed_derived_inputs_map(&self) -> HashMap<Utf8PathBuf, Artifact> {
        let mut map = HashMap::new();
        let derived = self
            .mandatory_inputs
            .iter()
            .chain(self.context.declared_include_srcs())
            .chain(self.context.compilation_prerequisites())
            .filter(|artifact| !artifact.is_source_artifact());
        for artifact in derived {
            map.insert(artifact.exec_path().to_owned(), artifact.clone());
        }
        let source = self.source_file();
        if !source.is_source_artifact() {
            map.insert(source.exec_path().to_owned(), source.clone());
        }
        map
    }

    /// Restore the live input set from exec paths persisted by the build
    /// cache.
    ///
    /// Paths that no longer resolve are dropped silently: the rule may have
    /// stopped referencing them, and if one still mattered the change
    /// detector sees the difference and forces re-execution. This is the one
    /// path that may leave the live set smaller than mandatory inputs plus
    /// prerequisites plus optional inputs.
    pub fn update_inputs_from_cache(
        &self,
        artifact_resolver: &dyn ArtifactResolver,
        input_paths: &[Utf8PathBuf],
    ) {
        let allowed_derived_inputs = self.allowed_derived_inputs_map();
        let mut inputs = Vec::new();
        for exec_path in input_paths {
            let artifact = allowed_derived_inputs
                .get(exec_path)
                .cloned()
                .or_else(|| artifact_resolver.resolve_source_artifact(exec_path));
            if let Some(artifact) = artifact {
                inputs.push(artifact);
            }
        }
        let mut live = self.live();
        live.inputs = inputs;
        live.known = true;
    }

    /// Enforce that every include visited during the compile was properly
    /// declared by the rule.
    ///
    /// Inputs under a warn dir (but no strict dir) produce a WARNING event;
    /// anything else undeclared fails the action with the full offending
    /// list.
    pub fn validate_inclusions(
        &self,
        middleman_expander: &dyn MiddlemanExpander,
        event_handler: &dyn EventHandler,
    ) -> Result<(), ActionError> {
        if !self.toolchain.scan_includes || !self.inputs_known() {
            return Ok(());
        }

        let mut errors = IncludeProblems::new();
        let mut warnings = IncludeProblems::new();

        let mut allowed_includes: HashSet<Artifact> = HashSet::new();
        for input in &self.mandatory_inputs {
            if input.is_middleman_artifact() {
                middleman_expander.expand(input, &mut allowed_includes);
            }
            allowed_includes.insert(input.clone());
        }
        allowed_includes.extend(self.optional_inputs.iter().cloned());

        let mut ignore_dirs = self.toolchain.builtin_include_directories.clone();
        ignore_dirs.extend(self.extra_system_include_prefixes.iter().cloned());
        ignore_dirs.extend(self.context.system_include_dirs().iter().cloned());

        let declared_include_dirs: HashSet<Utf8PathBuf> =
            self.context.declared_include_dirs().iter().cloned().collect();
        let warn_include_dirs: HashSet<Utf8PathBuf> = self
            .context
            .declared_include_warn_dirs()
            .iter()
            .cloned()
            .collect();
        let declared_include_srcs: HashSet<Artifact> =
            self.context.declared_include_srcs().iter().cloned().collect();
        let prerequisites: HashSet<Artifact> = self
            .context
            .compilation_prerequisites()
            .iter()
            .cloned()
            .collect();
        let no_srcs = HashSet::new();

        for input in self.inputs() {
            // Fixed inputs are not includes; skip them.
            if prerequisites.contains(&input) || allowed_includes.contains(&input) {
                continue;
            }
            // Headers from built-in include directories are always fine.
            if starts_with_any(input.exec_path(), &ignore_dirs) {
                continue;
            }
            if !is_declared_in(&input, &declared_include_dirs, &declared_include_srcs) {
                // Declared include sources were already matched above; the
                // warn-dir check carries none of its own.
                if is_declared_in(&input, &warn_include_dirs, &no_srcs) {
                    warnings.add(input.path().as_str());
                } else {
                    errors.add(input.path().as_str());
                }
            }
        }

        if VALIDATION_DEBUG && (errors.has_problems() || warnings.has_problems()) {
            let _guard = VALIDATION_DEBUG_LOCK
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            tracing::debug!(
                source = %self.source_file().exec_path(),
                errors = ?errors.paths(),
                warnings = ?warnings.paths(),
                declared_include_dirs = ?self.context.declared_include_dirs(),
                declared_include_warn_dirs = ?self.context.declared_include_warn_dirs(),
                "inclusion validation problems"
            );
        }

        if warnings.has_problems() {
            event_handler.handle(Event {
                kind: EventKind::Warning,
                location: self.owner.location.clone(),
                message: warnings.message(&self.owner.label, self.source_file()),
                label: self.owner.label.clone(),
            });
        }
        errors.into_result(&self.owner.label, self.source_file())
    }
}

fn dedup_by_exec_path(inputs: Vec<Artifact>) -> Vec<Artifact> {
    let mut seen = HashSet::new();
    inputs
        .into_iter()
        .filter(|artifact| seen.insert(artifact.exec_path().to_owned()))
        .collect()
}

/// Builder for [`CompileAction`]. Start from [`CompileAction::builder`].
pub struct CompileActionBuilder {
    owner: ActionOwner,
    behavior: ActionBehavior,
    features: FeatureSet,
    source_file: Artifact,
    source_label: Option<String>,
    mandatory_inputs: Vec<Artifact>,
    optional_inputs: Vec<Artifact>,
    output_file: Artifact,
    gcno_file: Option<Artifact>,
    dwo_file: Option<Artifact>,
    dotd_file: DotdFile,
    config: Arc<BuildConfig>,
    toolchain: Arc<CcToolchain>,
    context: Arc<CompilationContext>,
    copts: Vec<String>,
    plugin_opts: Vec<String>,
    copts_filter: CoptsFilter,
    extra_system_include_prefixes: Vec<Utf8PathBuf>,
    enable_modules: bool,
    fdo_build_stamp: Option<String>,
    include_resolver: Arc<dyn IncludeResolver>,
    action_class_id: Option<Uuid>,
}

impl CompileActionBuilder {
    pub fn behavior(mut self, behavior: ActionBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn features(mut self, features: FeatureSet) -> Self {
        self.features = features;
        self
    }

    pub fn feature(mut self, feature: &str) -> Self {
        self.features.insert(feature.to_string());
        self
    }

    /// Label of the rule the source file is generated by, for per-file
    /// copt matching.
    pub fn source_label(mut self, label: impl Into<String>) -> Self {
        self.source_label = Some(label.into());
        self
    }

    /// Files that must be present for the compilation to succeed. The
    /// source file itself is always included.
    pub fn mandatory_inputs(mut self, inputs: Vec<Artifact>) -> Self {
        self.mandatory_inputs = inputs;
        self
    }

    pub fn optional_inputs(mut self, inputs: Vec<Artifact>) -> Self {
        self.optional_inputs = inputs;
        self
    }

    pub fn gcno_file(mut self, gcno: Artifact) -> Self {
        self.gcno_file = Some(gcno);
        self
    }

    pub fn dwo_file(mut self, dwo: Artifact) -> Self {
        self.dwo_file = Some(dwo);
        self
    }

    pub fn copts(mut self, copts: Vec<String>) -> Self {
        self.copts = copts;
        self
    }

    pub fn plugin_opts(mut self, plugin_opts: Vec<String>) -> Self {
        self.plugin_opts = plugin_opts;
        self
    }

    pub fn copts_filter(mut self, filter: CoptsFilter) -> Self {
        self.copts_filter = filter;
        self
    }

    pub fn extra_system_include_prefixes(mut self, prefixes: Vec<Utf8PathBuf>) -> Self {
        self.extra_system_include_prefixes = prefixes;
        self
    }

    pub fn enable_modules(mut self, enable: bool) -> Self {
        self.enable_modules = enable;
        self
    }

    pub fn fdo_build_stamp(mut self, stamp: impl Into<String>) -> Self {
        self.fdo_build_stamp = Some(stamp.into());
        self
    }

    pub fn include_resolver(mut self, resolver: Arc<dyn IncludeResolver>) -> Self {
        self.include_resolver = resolver;
        self
    }

    /// Override the action-class id. Defaults to the id of the configured
    /// behavior.
    pub fn action_class_id(mut self, id: Uuid) -> Self {
        self.action_class_id = Some(id);
        self
    }

    pub fn build(self) -> Result<CompileAction, ActionError> {
        let mut mandatory_inputs = self.mandatory_inputs;
        if !mandatory_inputs.contains(&self.source_file) {
            mandatory_inputs.insert(0, self.source_file.clone());
        }

        let command_line = CompileCommandLine::new(
            self.source_file,
            self.source_label,
            self.output_file.clone(),
            Some(self.dotd_file.clone()),
            self.copts,
            self.copts_filter,
            self.plugin_opts,
            self.gcno_file.is_some(),
            self.features,
            self.fdo_build_stamp,
            self.enable_modules,
        )?;

        // The initial live set comes from static data; the updater replaces
        // it after execution.
        let mut initial_inputs: Vec<Artifact> = Vec::new();
        initial_inputs.extend(self.optional_inputs.iter().cloned());
        initial_inputs.extend(self.context.compilation_prerequisites().iter().cloned());
        initial_inputs.extend(mandatory_inputs.iter().cloned());

        let inputs_known = !self.toolchain.scan_includes;

        Ok(CompileAction {
            owner: self.owner,
            behavior: self.behavior,
            command_line,
            mandatory_inputs,
            optional_inputs: self.optional_inputs,
            output_file: self.output_file,
            gcno_file: self.gcno_file,
            dwo_file: self.dwo_file,
            dotd_file: self.dotd_file,
            config: self.config,
            toolchain: self.toolchain,
            context: self.context,
            extra_system_include_prefixes: self.extra_system_include_prefixes,
            include_resolver: self.include_resolver,
            action_class_id: self
                .action_class_id
                .unwrap_or_else(|| self.behavior.class_id()),
            live: Mutex::new(LiveInputs {
                inputs: dedup_by_exec_path(initial_inputs),
                known: inputs_known,
            }),
        })
    }
}
