//! End-to-end validation of build file generation.
//!
//! A small library/executable project is lowered with a fixed variant and
//! snapshotted with `insta`. The same project is then configured inside a
//! temporary directory and checked with `ninja -n` when Ninja is installed.

mod common;

use anyhow::{Context, Result, ensure};
use camino::Utf8Path;
use insta::{Settings, assert_snapshot};
use kiln::runner;
use kiln::variant::{Invocation, Platform};
use rstest::rstest;
use std::fs;
use test_support::{Project, manifest_yaml, ninja, variant};

const CORE_APP: &str = concat!(
    "generator: tools/meta\n",
    "default: app\n",
    "flags:\n",
    "  - { group: common, values: -Wall }\n",
    "  - { group: cxx, values: -std=c++20 }\n",
    "targets:\n",
    "  - name: core\n",
    "    kind: library\n",
    "    root: core\n",
    "    include_paths:\n",
    "      - { value: ., public: true }\n",
    "    defines:\n",
    "      - { value: CORE_API=1, public: true }\n",
    "    generate: [core.cpp]\n",
    "    cxx: [core.cpp, memory.cpp]\n",
    "  - name: app\n",
    "    kind: executable\n",
    "    root: app\n",
    "    deps: [core]\n",
    "    libs: [m]\n",
    "    cxx: [main.cpp]\n",
);

#[test]
fn core_app_snapshot() -> Result<()> {
    let fixed = variant(Platform::Linux, Utf8Path::new(common::SOURCE_DIR));
    let ninja = common::render(&manifest_yaml(CORE_APP), &fixed)?;

    let mut settings = Settings::new();
    settings.set_snapshot_path(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/snapshots/ninja"));
    settings.bind(|| {
        assert_snapshot!("core_app_ninja", ninja);
    });
    Ok(())
}

#[rstest]
#[case(Platform::Linux)]
#[case(Platform::Windows)]
fn emission_is_byte_identical_across_runs(#[case] platform: Platform) -> Result<()> {
    let fixed = variant(platform, Utf8Path::new(common::SOURCE_DIR));
    let yaml = manifest_yaml(CORE_APP);
    let first = common::render(&yaml, &fixed)?;
    let second = common::render(&yaml, &fixed)?;
    ensure!(first == second, "two runs produced different output");
    Ok(())
}

#[test]
fn windows_names_follow_the_platform() -> Result<()> {
    let fixed = variant(Platform::Windows, Utf8Path::new(common::SOURCE_DIR));
    let ninja = common::render(&manifest_yaml(CORE_APP), &fixed)?;
    for expected in [
        "build $builddir/obj/core/core.cpp.obj: cxx $root/core/core.cpp",
        "build $builddir/lib/core.lib: ar",
        "build $builddir/bin/app.exe: link $builddir/obj/app/main.cpp.obj $builddir/lib/core.lib",
        "lld-link.exe /lib",
        "default $builddir/bin/app.exe",
    ] {
        ensure!(ninja.contains(expected), "missing {expected:?} in:\n{ninja}");
    }
    Ok(())
}

#[test]
fn ninja_accepts_the_generated_file() -> Result<()> {
    if let Err(err) = ninja::ninja_installed() {
        eprintln!("skipping test: {err}");
        return Ok(());
    }
    // Without a generator the project needs nothing but its sources.
    let body = CORE_APP
        .replace("generator: tools/meta\n", "")
        .replace("    generate: [core.cpp]\n", "");
    let project = Project::with_body(&body)?;
    let root = project.root();
    for source in ["core/core.cpp", "core/memory.cpp", "app/main.cpp"] {
        let path = root.join(source);
        fs::create_dir_all(path.parent().context("source parent")?)?;
        fs::write(&path, "int placeholder;\n")?;
    }
    let program = root.join("kiln");
    fs::write(&program, "")?;

    let mut configured = variant(Platform::Linux, root);
    configured.invocation = Invocation::new(program, Vec::new(), root);
    let content = runner::generate_ninja(&configured, &project.manifest_path())?;
    runner::write_ninja_file(&configured.build_file(), &content)?;

    let output = ninja::dry_run(&project.build_dir(), &[])?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    ensure!(
        output.status.success(),
        "ninja -n failed:\n{stdout}\n{}",
        String::from_utf8_lossy(&output.stderr)
    );
    ensure!(
        stdout.contains("LINK") && stdout.contains("bin/app"),
        "unexpected plan:\n{stdout}"
    );
    Ok(())
}
