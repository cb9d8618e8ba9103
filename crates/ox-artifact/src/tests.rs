use super::*;

fn source_root() -> Arc<ArtifactRoot> {
    ArtifactRoot::source("/work/src")
}

fn output_root() -> Arc<ArtifactRoot> {
    ArtifactRoot::output("/work/out/bin", "out/bin")
}

#[test]
fn source_exec_path_is_root_relative() {
    let artifact = Artifact::new(source_root(), "pkg/x.cc");

    assert_eq!(artifact.exec_path(), Utf8Path::new("pkg/x.cc"));
    assert_eq!(artifact.path(), Utf8PathBuf::from("/work/src/pkg/x.cc"));
    assert!(artifact.is_source_artifact());
}

#[test]
fn derived_exec_path_includes_root_prefix() {
    let artifact = Artifact::new(output_root(), "pkg/x.o");

    assert_eq!(artifact.exec_path(), Utf8Path::new("out/bin/pkg/x.o"));
    assert_eq!(artifact.path(), Utf8PathBuf::from("/work/out/bin/pkg/x.o"));
    assert!(!artifact.is_source_artifact());
    assert_eq!(artifact.kind(), ArtifactKind::Derived);
}

#[test]
fn equality_is_by_exec_path() {
    let a = Artifact::new(source_root(), "pkg/x.h");
    let b = Artifact::new(ArtifactRoot::source("/elsewhere"), "pkg/x.h");

    assert_eq!(a, b);

    let mut set = HashSet::new();
    set.insert(a);
    assert!(set.contains(&b));
}

#[test]
fn middleman_keeps_derived_root() {
    let artifact = Artifact::middleman(output_root(), "internal/libdeps");

    assert!(artifact.is_middleman_artifact());
    assert!(!artifact.is_source_artifact());
}

#[test]
fn starts_with_any_is_segment_aligned() {
    let prefixes = vec![
        Utf8PathBuf::from("out/include"),
        Utf8PathBuf::from("/usr/lib/gcc"),
    ];

    assert!(starts_with_any(
        Utf8Path::new("out/include/a.h"),
        &prefixes
    ));
    assert!(starts_with_any(
        Utf8Path::new("/usr/lib/gcc/x86/stddef.h"),
        &prefixes
    ));
    assert!(!starts_with_any(
        Utf8Path::new("out/includes/a.h"),
        &prefixes
    ));
    assert!(!starts_with_any(Utf8Path::new("pkg/x.h"), &prefixes));
}

#[test]
fn exec_paths_preserves_order() {
    let artifacts = vec![
        Artifact::new(source_root(), "pkg/b.h"),
        Artifact::new(source_root(), "pkg/a.h"),
    ];

    assert_eq!(
        exec_paths(&artifacts),
        vec![Utf8PathBuf::from("pkg/b.h"), Utf8PathBuf::from("pkg/a.h")]
    );
}

#[test]
fn file_name_of_root_level_artifact() {
    let artifact = Artifact::new(source_root(), "x.cc");

    assert_eq!(artifact.file_name(), Some("x.cc"));
    assert_eq!(artifact.root_relative_path().parent(), Some(Utf8Path::new("")));
}
