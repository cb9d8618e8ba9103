//! Input-set updater behavior: dotd sources, the absolute-path policy,
//! resolver fallbacks, and the cache-restore path.

mod harness;

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use harness::{toolchain, ResolveExcept, ResolveNothing, ResolveSources, TestWorkspace};
use ox_artifact::Artifact;
use ox_cc::{
    ActionError, ActionOwner, ArtifactResolver, BuildConfig, CcToolchain, CompilationContext,
    CompileAction, DotdFile, IncludeResolver, Reply,
};

fn owner() -> ActionOwner {
    ActionOwner::new("//pkg:lib", "pkg/BUILD:3")
}

fn action_with(
    ws: &TestWorkspace,
    toolchain: CcToolchain,
    context: CompilationContext,
    dotd: DotdFile,
) -> CompileAction {
    CompileAction::builder(
        owner(),
        ws.source("pkg/x.cc"),
        ws.derived("pkg/x.o"),
        dotd,
        Arc::new(toolchain),
        Arc::new(BuildConfig::new()),
        Arc::new(context),
    )
    .build()
    .expect("action")
}

fn virtual_dotd() -> DotdFile {
    DotdFile::VirtualExecPath("out/bin/pkg/x.d".into())
}

#[test]
fn absolute_system_prefix_is_skipped() {
    let ws = TestWorkspace::new();
    let mut tc = toolchain();
    tc.builtin_include_directories = vec![Utf8PathBuf::from("/usr/include")];

    let action = action_with(&ws, tc, CompilationContext::default(), virtual_dotd());
    let resolver = ResolveSources {
        source_root: ws.source_root.clone(),
    };
    let reply = Reply::new(b"out/bin/pkg/x.o: pkg/x.cc /usr/include/stdio.h".to_vec());

    action
        .update_action_inputs(ws.exec_root(), &resolver, Some(&reply))
        .expect("system header is skipped");

    assert!(action.inputs_known());
    assert!(!action
        .inputs()
        .iter()
        .any(|input| input.exec_path().as_str().contains("stdio.h")));
}

#[test]
fn absolute_path_under_exec_root_is_normalized() {
    let ws = TestWorkspace::new();
    let action = action_with(
        &ws,
        toolchain(),
        CompilationContext::default(),
        virtual_dotd(),
    );
    let resolver = ResolveSources {
        source_root: ws.source_root.clone(),
    };
    let contents = format!("out/bin/pkg/x.o: pkg/x.cc {}/pkg/x.h", ws.exec_root());
    let reply = Reply::new(contents.into_bytes());

    action
        .update_action_inputs(ws.exec_root(), &resolver, Some(&reply))
        .expect("exec-root path is stripped");

    assert!(action.inputs().contains(&ws.source("pkg/x.h")));
}

#[test]
fn absolute_path_elsewhere_is_fatal() {
    let ws = TestWorkspace::new();
    let action = action_with(
        &ws,
        toolchain(),
        CompilationContext::default(),
        virtual_dotd(),
    );
    let resolver = ResolveSources {
        source_root: ws.source_root.clone(),
    };
    let reply = Reply::new(b"out/bin/pkg/x.o: pkg/x.cc /elsewhere/y.h".to_vec());

    let err = action
        .update_action_inputs(ws.exec_root(), &resolver, Some(&reply))
        .unwrap_err();

    match err {
        ActionError::UndeclaredInclusions { paths, .. } => {
            assert_eq!(paths, vec!["/elsewhere/y.h".to_string()]);
        }
        other => panic!("expected undeclared inclusions, got {other:?}"),
    }
    // The failed rebuild still publishes what it had, but never as "known".
    assert!(!action.inputs_known());
    assert!(action.inputs().contains(&ws.source("pkg/x.cc")));
}

#[test]
fn unresolvable_dependency_is_fatal() {
    let ws = TestWorkspace::new();
    let action = action_with(
        &ws,
        toolchain(),
        CompilationContext::default(),
        virtual_dotd(),
    );
    let reply = Reply::new(b"out/bin/pkg/x.o: mystery/m.h".to_vec());

    let err = action
        .update_action_inputs(ws.exec_root(), &ResolveNothing, Some(&reply))
        .unwrap_err();

    match err {
        ActionError::UndeclaredInclusions { paths, .. } => {
            assert_eq!(paths, vec!["mystery/m.h".to_string()]);
        }
        other => panic!("expected undeclared inclusions, got {other:?}"),
    }
}

#[test]
fn derived_dependencies_come_from_the_allowed_map() {
    let ws = TestWorkspace::new();
    let generated = ws.derived("gen/config.h");
    let context = CompilationContext::builder()
        .add_declared_include_src(generated.clone())
        .build();
    let action = action_with(&ws, toolchain(), context, virtual_dotd());
    // The resolver knows nothing; the declared derived header must be found
    // through the allowed-derived-inputs map.
    let reply = Reply::new(b"out/bin/pkg/x.o: pkg/x.cc out/bin/gen/config.h".to_vec());

    let err = action.update_action_inputs(ws.exec_root(), &ResolveNothing, Some(&reply));
    assert!(err.is_err(), "pkg/x.cc itself is not resolvable here");

    let resolver = ResolveExcept {
        source_root: ws.source_root.clone(),
        deny: [Utf8PathBuf::from("out/bin/gen/config.h")].into_iter().collect(),
    };
    action
        .update_action_inputs(ws.exec_root(), &resolver, Some(&reply))
        .expect("derived header resolves through the allowed map");

    assert!(action.inputs().contains(&generated));
}

#[test]
fn dotd_is_read_from_disk_without_a_reply() {
    let ws = TestWorkspace::new();
    ws.write_file("out/bin/pkg/x.d", "out/bin/pkg/x.o: pkg/x.cc pkg/x.h\n");

    let action = action_with(
        &ws,
        toolchain(),
        CompilationContext::default(),
        DotdFile::Artifact(ws.derived("pkg/x.d")),
    );
    let resolver = ResolveSources {
        source_root: ws.source_root.clone(),
    };

    action
        .update_action_inputs(ws.exec_root(), &resolver, None)
        .expect("on-disk dotd parses");

    assert!(action.inputs().contains(&ws.source("pkg/x.h")));
}

#[test]
fn in_memory_reply_wins_over_the_artifact() {
    let ws = TestWorkspace::new();
    ws.write_file("out/bin/pkg/x.d", "out/bin/pkg/x.o: pkg/stale.h\n");

    let action = action_with(
        &ws,
        toolchain(),
        CompilationContext::default(),
        DotdFile::Artifact(ws.derived("pkg/x.d")),
    );
    let resolver = ResolveSources {
        source_root: ws.source_root.clone(),
    };
    let reply = Reply::new(b"out/bin/pkg/x.o: pkg/fresh.h".to_vec());

    action
        .update_action_inputs(ws.exec_root(), &resolver, Some(&reply))
        .expect("reply parses");

    let inputs = action.inputs();
    assert!(inputs.contains(&ws.source("pkg/fresh.h")));
    assert!(!inputs.contains(&ws.source("pkg/stale.h")));
}

#[test]
fn virtual_dotd_without_reply_is_fatal() {
    let ws = TestWorkspace::new();
    let action = action_with(
        &ws,
        toolchain(),
        CompilationContext::default(),
        virtual_dotd(),
    );
    let resolver = ResolveSources {
        source_root: ws.source_root.clone(),
    };

    let err = action
        .update_action_inputs(ws.exec_root(), &resolver, None)
        .unwrap_err();

    assert!(matches!(err, ActionError::MissingDotdReply { .. }));
}

#[test]
fn malformed_dotd_is_fatal() {
    let ws = TestWorkspace::new();
    let action = action_with(
        &ws,
        toolchain(),
        CompilationContext::default(),
        virtual_dotd(),
    );
    let resolver = ResolveSources {
        source_root: ws.source_root.clone(),
    };
    let reply = Reply::new(b"this is not a make rule".to_vec());

    let err = action
        .update_action_inputs(ws.exec_root(), &resolver, Some(&reply))
        .unwrap_err();

    assert!(matches!(err, ActionError::Dotd { .. }));
    assert!(!action.inputs_known());
}

#[test]
fn include_resolver_auxiliary_inputs_ride_along() {
    struct WithSidecars;

    impl IncludeResolver for WithSidecars {
        fn inputs_for_included_file(
            &self,
            included: &Artifact,
            resolver: &dyn ArtifactResolver,
        ) -> Vec<Artifact> {
            let sidecar = format!("{}.meta", included.exec_path());
            resolver
                .resolve_source_artifact(Utf8Path::new(&sidecar))
                .into_iter()
                .collect()
        }
    }

    let ws = TestWorkspace::new();
    let action = CompileAction::builder(
        owner(),
        ws.source("pkg/x.cc"),
        ws.derived("pkg/x.o"),
        virtual_dotd(),
        Arc::new(toolchain()),
        Arc::new(BuildConfig::new()),
        Arc::new(CompilationContext::default()),
    )
    .include_resolver(Arc::new(WithSidecars))
    .build()
    .expect("action");

    let resolver = ResolveSources {
        source_root: ws.source_root.clone(),
    };
    let reply = Reply::new(b"out/bin/pkg/x.o: pkg/x.h".to_vec());

    action
        .update_action_inputs(ws.exec_root(), &resolver, Some(&reply))
        .expect("update with auxiliary inputs");

    let inputs = action.inputs();
    assert!(inputs.contains(&ws.source("pkg/x.h")));
    assert!(inputs.contains(&ws.source("pkg/x.h.meta")));
}

#[test]
fn cache_restore_drops_unresolved_paths() {
    let ws = TestWorkspace::new();
    let action = action_with(
        &ws,
        toolchain(),
        CompilationContext::default(),
        virtual_dotd(),
    );
    let resolver = ResolveExcept {
        source_root: ws.source_root.clone(),
        deny: [Utf8PathBuf::from("gone/z.h")].into_iter().collect(),
    };

    action.update_inputs_from_cache(
        &resolver,
        &[Utf8PathBuf::from("pkg/x.h"), Utf8PathBuf::from("gone/z.h")],
    );

    // The restored set is exactly what resolved — smaller than the usual
    // mandatory-superset, by design.
    let inputs = action.inputs();
    assert!(action.inputs_known());
    assert_eq!(inputs, vec![ws.source("pkg/x.h")]);
    assert!(!inputs.contains(&ws.source("pkg/x.cc")));
}

#[test]
fn disabled_include_scanning_fixes_inputs_at_construction() {
    let ws = TestWorkspace::new();
    let mut tc = toolchain();
    tc.scan_includes = false;

    let action = action_with(&ws, tc, CompilationContext::default(), virtual_dotd());
    assert!(action.inputs_known());

    // The updater is a no-op; even a broken reply is never read.
    let resolver = ResolveSources {
        source_root: ws.source_root.clone(),
    };
    let reply = Reply::new(b"garbage".to_vec());
    action
        .update_action_inputs(ws.exec_root(), &resolver, Some(&reply))
        .expect("no-op when scanning is disabled");

    assert!(action.inputs().contains(&ws.source("pkg/x.cc")));
}

#[test]
fn initial_inputs_cover_static_sets() {
    let ws = TestWorkspace::new();
    let prerequisite = ws.source("pkg/prereq.h");
    let optional = ws.source("pkg/opt.h");
    let context = CompilationContext::builder()
        .add_compilation_prerequisite(prerequisite.clone())
        .build();

    let action = CompileAction::builder(
        owner(),
        ws.source("pkg/x.cc"),
        ws.derived("pkg/x.o"),
        virtual_dotd(),
        Arc::new(toolchain()),
        Arc::new(BuildConfig::new()),
        Arc::new(context),
    )
    .optional_inputs(vec![optional.clone()])
    .build()
    .expect("action");

    let inputs = action.inputs();
    assert!(inputs.contains(&ws.source("pkg/x.cc")));
    assert!(inputs.contains(&prerequisite));
    assert!(inputs.contains(&optional));
    assert!(action.mandatory_inputs().contains(&ws.source("pkg/x.cc")));
}
