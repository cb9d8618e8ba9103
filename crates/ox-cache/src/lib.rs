//! Action key computation for ox build artifacts.
//!
//! This crate centralizes the key computation for compile actions so the
//! scheduler (for cache lookups) and the executors (for cache storage) can
//! never disagree on what an action's identity is.
//!
//! Action keys are blake3 hashes of every input that can change either the
//! compiler invocation or the inclusion-validation verdict.

use camino::Utf8PathBuf;
use std::fmt;
use uuid::Uuid;

/// Current action key schema version for C/C++ compilation.
/// Bump this when the key format changes.
pub const CC_ACTION_KEY_VERSION: u32 = 1;

/// A blake3-based action key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionKey(pub [u8; 32]);

impl ActionKey {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActionKey({})", self.to_hex())
    }
}

/// Compute the key for a C/C++ compile action.
///
/// The argv section alone captures every change that affects the object file.
/// The declared-inclusion sections are folded in as well because the
/// validation verdict can change even when the command line does not, and the
/// cache must not replay a result whose validation would now differ.
///
/// Argv order is observable and hashed as given. Declared include sources are
/// sorted here; their order carries no meaning but the key needs stability.
pub fn compile_action_key(
    action_class_id: Uuid,
    argv: &[String],
    declared_include_dirs: &[Utf8PathBuf],
    declared_include_warn_dirs: &[Utf8PathBuf],
    declared_include_srcs: &[Utf8PathBuf],
    extra_system_include_prefixes: &[Utf8PathBuf],
) -> ActionKey {
    let mut hasher = blake3::Hasher::new();

    hasher.update(b"cc-compile-v");
    hasher.update(&CC_ACTION_KEY_VERSION.to_le_bytes());
    hasher.update(b"\n");

    hasher.update(b"action_class:");
    hasher.update(action_class_id.as_bytes());
    hasher.update(b"\n");

    hasher.update(b"argv:");
    for arg in argv {
        hasher.update(arg.as_bytes());
        hasher.update(b"\0");
    }
    hasher.update(b"\n");

    update_paths(&mut hasher, b"declared_include_dirs:", declared_include_dirs);
    update_paths(
        &mut hasher,
        b"declared_include_warn_dirs:",
        declared_include_warn_dirs,
    );

    let mut srcs = declared_include_srcs.to_vec();
    srcs.sort();
    update_paths(&mut hasher, b"declared_include_srcs:", &srcs);

    update_paths(
        &mut hasher,
        b"extra_system_include_prefixes:",
        extra_system_include_prefixes,
    );

    ActionKey(*hasher.finalize().as_bytes())
}

fn update_paths(hasher: &mut blake3::Hasher, label: &[u8], paths: &[Utf8PathBuf]) {
    hasher.update(label);
    for path in paths {
        hasher.update(path.as_str().as_bytes());
        hasher.update(b"\0");
    }
    hasher.update(b"\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(items: &[&str]) -> Vec<Utf8PathBuf> {
        items.iter().map(Utf8PathBuf::from).collect()
    }

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    const CLASS_ID: Uuid = Uuid::from_bytes([7; 16]);

    #[test]
    fn key_is_deterministic() {
        let argv = args(&["gcc", "-c", "pkg/x.cc", "-o", "pkg/x.o"]);
        let dirs = paths(&["pkg"]);
        let srcs = paths(&["pkg/x.h"]);

        let key1 = compile_action_key(CLASS_ID, &argv, &dirs, &[], &srcs, &[]);
        let key2 = compile_action_key(CLASS_ID, &argv, &dirs, &[], &srcs, &[]);

        assert_eq!(key1, key2);
        assert_eq!(key1.to_hex().len(), 64);
    }

    #[test]
    fn key_changes_with_action_class() {
        let argv = args(&["gcc", "-c", "pkg/x.cc"]);

        let key1 = compile_action_key(Uuid::from_bytes([1; 16]), &argv, &[], &[], &[], &[]);
        let key2 = compile_action_key(Uuid::from_bytes([2; 16]), &argv, &[], &[], &[], &[]);

        assert_ne!(key1, key2);
    }

    #[test]
    fn key_is_sensitive_to_argv_order() {
        let key1 = compile_action_key(CLASS_ID, &args(&["-a", "-b"]), &[], &[], &[], &[]);
        let key2 = compile_action_key(CLASS_ID, &args(&["-b", "-a"]), &[], &[], &[], &[]);

        assert_ne!(key1, key2);
    }

    #[test]
    fn key_changes_with_each_declared_section() {
        let argv = args(&["gcc"]);
        let base = compile_action_key(CLASS_ID, &argv, &[], &[], &[], &[]);

        let with_dirs = compile_action_key(CLASS_ID, &argv, &paths(&["pkg"]), &[], &[], &[]);
        let with_warn = compile_action_key(CLASS_ID, &argv, &[], &paths(&["pkg"]), &[], &[]);
        let with_srcs = compile_action_key(CLASS_ID, &argv, &[], &[], &paths(&["pkg/x.h"]), &[]);
        let with_prefixes = compile_action_key(CLASS_ID, &argv, &[], &[], &[], &paths(&["/usr"]));

        assert_ne!(base, with_dirs);
        assert_ne!(base, with_warn);
        assert_ne!(base, with_srcs);
        assert_ne!(base, with_prefixes);

        // The same path must hash differently depending on which section it
        // lands in, otherwise a dir-to-warn-dir move would not invalidate.
        assert_ne!(with_dirs, with_warn);
    }

    #[test]
    fn declared_srcs_order_does_not_matter() {
        let argv = args(&["gcc"]);

        let key1 = compile_action_key(CLASS_ID, &argv, &[], &[], &paths(&["a.h", "b.h"]), &[]);
        let key2 = compile_action_key(CLASS_ID, &argv, &[], &[], &paths(&["b.h", "a.h"]), &[]);

        assert_eq!(key1, key2);
    }
}
