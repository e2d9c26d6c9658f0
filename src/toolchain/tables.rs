//! Per-platform toolchain tables.
//!
//! Compile rules read the file-scope flag groups (`$cflags`, `$ccflags`,
//! `$cxxflags`, `$linkflags`, `$arflags`) and the per-edge bindings
//! (`$flags`, `$defines`, `$includes`, `$ldflags`, `$libs`).

use super::Rule;
use crate::variant::Platform;

/// Names of the rules every toolchain table provides.
pub mod names {
    /// C compilation.
    pub const CC: &str = "cc";
    /// C++ compilation.
    pub const CXX: &str = "cxx";
    /// Executable linking.
    pub const LINK: &str = "link";
    /// Static archive creation.
    pub const ARCHIVE: &str = "ar";
    /// Test execution producing a stamp file.
    pub const TEST: &str = "test";
    /// Source code generation.
    pub const GENERATE: &str = "meta";
    /// Regeneration of the build description.
    pub const CONFIGURE: &str = "configure";
}

pub(super) fn toolchain(platform: Platform) -> Vec<Rule> {
    match platform {
        Platform::Linux => linux(),
        Platform::Windows => windows(),
    }
}

fn linux() -> Vec<Rule> {
    vec![
        Rule::new(
            names::CC,
            "clang -MMD -MF $out.d $cflags $ccflags $flags $defines $includes -c $in -o $out",
        )
        .with_description("CC $in")
        .with_depfile("$out.d", "gcc"),
        Rule::new(
            names::CXX,
            "clang++ -MMD -MF $out.d $cflags $cxxflags $flags $defines $includes -c $in -o $out",
        )
        .with_description("CXX $in")
        .with_depfile("$out.d", "gcc"),
        Rule::new(names::LINK, "clang++ $linkflags $ldflags -o $out $in $libs")
            .with_description("LINK $out"),
        Rule::new(names::ARCHIVE, "rm -f $out && ar -rcs $arflags $flags $out $in")
            .with_description("LIB $out"),
        Rule::new(names::TEST, "$in && touch $out").with_description("TEST $in"),
    ]
}

fn windows() -> Vec<Rule> {
    vec![
        Rule::new(
            names::CC,
            "clang -D_DLL -MMD -MF $out.d $cflags $ccflags $flags $defines $includes -c $in -o $out",
        )
        .with_description("CC $in")
        .with_depfile("$out.d", "gcc"),
        Rule::new(
            names::CXX,
            "clang++ -D_DLL -MMD -MF $out.d $cflags $cxxflags $flags $defines $includes -c $in -o $out",
        )
        .with_description("CXX $in")
        .with_depfile("$out.d", "gcc"),
        Rule::new(
            names::LINK,
            "clang++ -Wl,-nodefaultlib:libcmt -D_DLL -lmsvcrt $linkflags $ldflags -o $out $in $libs",
        )
        .with_description("LINK $out"),
        Rule::new(
            names::ARCHIVE,
            "lld-link.exe /lib \"/OUT:$out\" /nologo $arflags $flags $in",
        )
        .with_description("LIB $out"),
        Rule::new(names::TEST, "cmd /c \"$in && type nul > $out\"").with_description("TEST $in"),
    ]
}

/// Rules whose commands are identical on every platform.
pub(super) fn common() -> Vec<Rule> {
    vec![
        Rule::new(
            names::GENERATE,
            "$codegen $genflags --public $public --internal $internal $in",
        )
        .with_description("META $in"),
        Rule::new(names::CONFIGURE, "$configure")
            .with_description("CONFIGURE")
            .as_generator(),
    ]
}
