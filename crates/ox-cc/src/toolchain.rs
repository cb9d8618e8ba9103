//! Toolchain and build configuration for C/C++ compilation.
//!
//! [`CcToolchain`] is the crosstool half of the layered configuration:
//! tool paths, built-in include directories, and the option lists the
//! command-line assembler folds in. [`BuildConfig`] is the build-wide half:
//! coverage mode and the shell environment actions run under.

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;

use crate::FeatureSet;

/// Well-known toolchain tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tool {
    Gcc,
    Ld,
}

/// The preprocessor macro FDO build stamps are defined under.
pub const FDO_STAMP_MACRO: &str = "BUILD_FDO_TYPE";

/// Drops compiler options matching a configured pattern.
///
/// Explicit per-rule copts are never run through this filter; user intent
/// wins over the blanket exclusion.
#[derive(Debug, Clone, Default)]
pub struct CoptsFilter {
    exclude: Option<Regex>,
}

impl CoptsFilter {
    /// A filter that keeps everything.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// A filter that drops options matching `pattern`.
    pub fn excluding(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            exclude: Some(Regex::new(pattern)?),
        })
    }

    /// Returns true if `option` survives the filter.
    pub fn retains(&self, option: &str) -> bool {
        match &self.exclude {
            Some(exclude) => !exclude.is_match(option),
            None => true,
        }
    }
}

/// Options applied only to sources whose label or file name matches a
/// filter, from the `--per_file_copt` family of flags.
#[derive(Debug, Clone)]
pub struct PerFileCopt {
    filter: Regex,
    options: Vec<String>,
}

impl PerFileCopt {
    pub fn new(pattern: &str, options: Vec<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            filter: Regex::new(pattern)?,
            options,
        })
    }

    /// True if this block applies to the given source, identified by its
    /// owning label (when known) or its exec path.
    pub fn matches(&self, label: Option<&str>, source_exec_path: &Utf8Path) -> bool {
        if let Some(label) = label {
            if self.filter.is_match(label) {
                return true;
            }
        }
        self.filter.is_match(source_exec_path.as_str())
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }
}

/// The crosstool configuration a compile action draws its flags from.
///
/// The `feature_*` maps attach extra options to named features; lookups
/// combine the base list with the entries for every active feature, in
/// feature-name order.
#[derive(Debug, Clone)]
pub struct CcToolchain {
    pub gcc: Utf8PathBuf,
    pub ld: Utf8PathBuf,
    /// Compiler-internal include directories; headers found under these are
    /// exempt from the declared-inclusion policy.
    pub builtin_include_directories: Vec<Utf8PathBuf>,
    pub compiler_options: Vec<String>,
    pub c_options: Vec<String>,
    pub cxx_options: Vec<String>,
    /// Options exempt from the copts filter.
    pub unfiltered_compiler_options: Vec<String>,
    /// Warning names, emitted as `-W<name>`.
    pub c_warnings: Vec<String>,
    pub feature_compiler_options: BTreeMap<String, Vec<String>>,
    pub feature_cxx_options: BTreeMap<String, Vec<String>>,
    pub feature_unfiltered_options: BTreeMap<String, Vec<String>>,
    pub per_file_copts: Vec<PerFileCopt>,
    /// Whether the build discovers true inputs from `.d` output. When off,
    /// actions are constructed with their inputs already known.
    pub scan_includes: bool,
    /// Split debug info into `.dwo` sidecar files.
    pub fission: bool,
}

impl CcToolchain {
    pub fn new(gcc: impl Into<Utf8PathBuf>, ld: impl Into<Utf8PathBuf>) -> Self {
        Self {
            gcc: gcc.into(),
            ld: ld.into(),
            builtin_include_directories: Vec::new(),
            compiler_options: Vec::new(),
            c_options: Vec::new(),
            cxx_options: Vec::new(),
            unfiltered_compiler_options: Vec::new(),
            c_warnings: Vec::new(),
            feature_compiler_options: BTreeMap::new(),
            feature_cxx_options: BTreeMap::new(),
            feature_unfiltered_options: BTreeMap::new(),
            per_file_copts: Vec::new(),
            scan_includes: true,
            fission: false,
        }
    }

    pub fn tool_path(&self, tool: Tool) -> &Utf8Path {
        match tool {
            Tool::Gcc => &self.gcc,
            Tool::Ld => &self.ld,
        }
    }

    /// Base compiler options plus those of every active feature.
    pub fn compiler_options_for(&self, features: &FeatureSet) -> Vec<String> {
        combine(&self.compiler_options, &self.feature_compiler_options, features)
    }

    /// C++ options plus those of every active feature.
    pub fn cxx_options_for(&self, features: &FeatureSet) -> Vec<String> {
        combine(&self.cxx_options, &self.feature_cxx_options, features)
    }

    /// Options exempt from the copts filter, plus those of every active
    /// feature.
    pub fn unfiltered_options_for(&self, features: &FeatureSet) -> Vec<String> {
        combine(
            &self.unfiltered_compiler_options,
            &self.feature_unfiltered_options,
            features,
        )
    }
}

fn combine(
    base: &[String],
    per_feature: &BTreeMap<String, Vec<String>>,
    features: &FeatureSet,
) -> Vec<String> {
    let mut options = base.to_vec();
    for feature in features {
        if let Some(extra) = per_feature.get(feature) {
            options.extend(extra.iter().cloned());
        }
    }
    options
}

/// Build-wide configuration shared by all actions.
#[derive(Debug, Clone, Default)]
pub struct BuildConfig {
    pub code_coverage: bool,
    /// Ordered key/value pairs every action's environment starts from.
    pub default_shell_env: Vec<(String, String)>,
}

impl BuildConfig {
    pub fn new() -> Self {
        Self::default()
    }
}
