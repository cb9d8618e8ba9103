//! Command-line assembly for compile actions.
//!
//! [`CompileCommandLine`] is a pure function from the layered configuration
//! to argv: no I/O, no global state, and byte-stable output. The emission
//! order is observable — it feeds the action key — so nothing here may be
//! reordered.

use camino::Utf8Path;

use ox_artifact::Artifact;

use crate::action::DotdFile;
use crate::context::CompilationContext;
use crate::error::ActionError;
use crate::file_types;
use crate::toolchain::{CcToolchain, CoptsFilter, Tool, FDO_STAMP_MACRO};
use crate::{FeatureSet, PARSE_HEADERS, PREPROCESS_HEADERS};

/// How a C++ header source is handed to the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderMode {
    NotAHeader,
    /// `-x c++-header`, from the `parse_headers` feature.
    Parse,
    /// `-E -x c++`, from the `preprocess_headers` feature.
    Preprocess,
}

/// The compile command line for one translation unit.
#[derive(Debug, Clone)]
pub struct CompileCommandLine {
    source_file: Artifact,
    source_label: Option<String>,
    output_file: Artifact,
    dotd_file: Option<DotdFile>,
    copts: Vec<String>,
    copts_filter: CoptsFilter,
    plugin_opts: Vec<String>,
    instrumented: bool,
    features: FeatureSet,
    fdo_build_stamp: Option<String>,
    enable_modules: bool,
    header_mode: HeaderMode,
}

impl CompileCommandLine {
    /// Resolves the header-compile mode up front: a C++ header source with
    /// neither `parse_headers` nor `preprocess_headers` active is rejected
    /// here, so argv assembly itself cannot fail.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source_file: Artifact,
        source_label: Option<String>,
        output_file: Artifact,
        dotd_file: Option<DotdFile>,
        copts: Vec<String>,
        copts_filter: CoptsFilter,
        plugin_opts: Vec<String>,
        instrumented: bool,
        features: FeatureSet,
        fdo_build_stamp: Option<String>,
        enable_modules: bool,
    ) -> Result<Self, ActionError> {
        let header_mode = if file_types::is_cpp_header(source_file.exec_path().as_str()) {
            if features.contains(PARSE_HEADERS) {
                HeaderMode::Parse
            } else if features.contains(PREPROCESS_HEADERS) {
                HeaderMode::Preprocess
            } else {
                return Err(ActionError::HeaderCompileUnsupported {
                    source_file: source_file.exec_path().to_owned(),
                });
            }
        } else {
            HeaderMode::NotAHeader
        };

        Ok(Self {
            source_file,
            source_label,
            output_file,
            dotd_file,
            copts,
            copts_filter,
            plugin_opts,
            instrumented,
            features,
            fdo_build_stamp,
            enable_modules,
            header_mode,
        })
    }

    pub fn source_file(&self) -> &Artifact {
        &self.source_file
    }

    pub fn output_file(&self) -> &Artifact {
        &self.output_file
    }

    pub fn dotd_file(&self) -> Option<&DotdFile> {
        self.dotd_file.as_ref()
    }

    pub fn copts(&self) -> &[String] {
        &self.copts
    }

    pub fn plugin_opts(&self) -> &[String] {
        &self.plugin_opts
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    /// The full argv, compiling to the action's own output file.
    pub fn argv(&self, context: &CompilationContext, toolchain: &CcToolchain) -> Vec<String> {
        self.argv_for_output(context, toolchain, self.output_file.exec_path())
    }

    /// The full argv with `-o` redirected, for behavior variants that write
    /// somewhere else. Everything but the `-o` operand is unchanged.
    pub fn argv_for_output(
        &self,
        context: &CompilationContext,
        toolchain: &CcToolchain,
        output: &Utf8Path,
    ) -> Vec<String> {
        let mut argv = vec![toolchain.tool_path(Tool::Gcc).to_string()];
        argv.extend(self.compiler_options(context, toolchain));
        argv.push("-c".to_string());
        argv.push(self.source_file.exec_path().to_string());
        argv.push("-o".to_string());
        argv.push(output.to_string());
        argv
    }

    /// Every option between the compiler executable and `-c`.
    pub fn compiler_options(
        &self,
        context: &CompilationContext,
        toolchain: &CcToolchain,
    ) -> Vec<String> {
        let mut options = Vec::new();

        match self.header_mode {
            HeaderMode::NotAHeader => {}
            HeaderMode::Parse => {
                options.push("-x".to_string());
                options.push("c++-header".to_string());
            }
            HeaderMode::Preprocess => {
                options.push("-E".to_string());
                options.push("-x".to_string());
                options.push("c++".to_string());
            }
        }

        // "-iquote" is gcc-specific; compilers without it would need "-I".
        for dir in context.quote_include_dirs() {
            options.push("-iquote".to_string());
            options.push(dir.to_string());
        }
        for dir in context.include_dirs() {
            options.push(format!("-I{dir}"));
        }
        for dir in context.system_include_dirs() {
            options.push("-isystem".to_string());
            options.push(dir.to_string());
        }

        // Plugin options go before the toolchain options: -fplugin must
        // precede any -plugin-arg.
        options.extend(self.plugin_opts.iter().cloned());
        self.add_filtered(&mut options, toolchain.compiler_options_for(&self.features));

        if self.instrumented {
            self.add_filtered(
                &mut options,
                ["-fprofile-arcs", "-ftest-coverage"]
                    .iter()
                    .map(|s| s.to_string()),
            );
        }

        let source_name = self.source_file.exec_path().as_str();
        if file_types::is_c_source(source_name) {
            self.add_filtered(&mut options, toolchain.c_options.iter().cloned());
        }
        if file_types::is_cpp_source(source_name) || file_types::is_cpp_header(source_name) {
            self.add_filtered(&mut options, toolchain.cxx_options_for(&self.features));
        }

        // Explicit copts are never filtered; user intent wins.
        options.extend(self.copts.iter().cloned());

        for warning in &toolchain.c_warnings {
            options.push(format!("-W{warning}"));
        }
        for define in context.defines() {
            options.push(format!("-D{define}"));
        }

        if let Some(stamp) = &self.fdo_build_stamp {
            options.push(format!("-D{FDO_STAMP_MACRO}=\"{stamp}\""));
        }

        options.extend(toolchain.unfiltered_options_for(&self.features));

        // The compiler randomizes the names of anonymous-namespace symbols
        // with external linkage; seeding with the output path keeps them
        // stable per translation unit.
        options.push(format!("-frandom-seed={}", self.output_file.exec_path()));

        for per_file in &toolchain.per_file_copts {
            if per_file.matches(self.source_label.as_deref(), self.source_file.exec_path()) {
                options.extend(per_file.options().iter().cloned());
            }
        }

        // -MD writes user and system includes as a side effect of the normal
        // compile; -MF names the file. -M/-MM alone would subvert .o output.
        if let Some(dotd) = &self.dotd_file {
            options.push("-MD".to_string());
            options.push("-MF".to_string());
            options.push(dotd.safe_exec_path().to_string());
        }

        if self.enable_modules {
            if let Some(module_map) = context.module_map() {
                options.push("-Xclang-only=-fmodule-maps".to_string());
                options.push("-Xclang-only=-fmodules-strict-decluse".to_string());
                options.push(format!("-Xclang-only=-fmodule-name={}", module_map.name()));
                options.push(format!(
                    "-Xclang-only=-fmodule-map-file={}",
                    module_map.artifact().exec_path()
                ));
            }
        }

        let output_name = self.output_file.file_name().unwrap_or_default();
        if file_types::is_assembler(output_name) {
            options.push("-S".to_string());
        } else if file_types::is_preprocessed(output_name) {
            options.push("-E".to_string());
        }

        if toolchain.fission {
            options.push("-gsplit-dwarf".to_string());
        }

        options
    }

    fn add_filtered(&self, out: &mut Vec<String>, options: impl IntoIterator<Item = String>) {
        out.extend(
            options
                .into_iter()
                .filter(|option| self.copts_filter.retains(option)),
        );
    }
}
