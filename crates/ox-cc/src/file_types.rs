//! File-type predicates for C/C++ compilation.
//!
//! All matching is on the file name suffix of an exec path. `.C` (uppercase)
//! counts as C++ the way the GNU toolchain treats it.

/// `.c` — a C translation unit.
pub fn is_c_source(name: &str) -> bool {
    name.ends_with(".c")
}

/// `.cc`, `.cpp`, `.cxx`, `.C` — a C++ translation unit.
pub fn is_cpp_source(name: &str) -> bool {
    name.ends_with(".cc") || name.ends_with(".cpp") || name.ends_with(".cxx") || name.ends_with(".C")
}

/// `.h`, `.hh`, `.hpp`, `.hxx`, `.inc` — a header.
pub fn is_cpp_header(name: &str) -> bool {
    name.ends_with(".h")
        || name.ends_with(".hh")
        || name.ends_with(".hpp")
        || name.ends_with(".hxx")
        || name.ends_with(".inc")
}

/// `.s` — assembler output, including position-independent `.pic.s`.
pub fn is_assembler(name: &str) -> bool {
    name.ends_with(".s")
}

/// `.i`, `.ii` and their `.pic.` variants — preprocessed output.
pub fn is_preprocessed(name: &str) -> bool {
    name.ends_with(".i") || name.ends_with(".ii")
}

/// `.gcno` — coverage notes emitted under instrumentation.
pub fn is_coverage_notes(name: &str) -> bool {
    name.ends_with(".gcno")
}
