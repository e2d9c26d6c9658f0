//! Layering of `KILN_*` environment variables beneath command-line flags.

use anyhow::{Result, ensure};
use kiln::cli::{self, Cli};
use kiln::variant::{Platform, RenderBackend};
use rstest::rstest;
use test_support::env_lock::EnvLock;
use test_support::env_var_guard::EnvVarGuard;

const LAYERED: [&str; 5] = [
    "KILN_RENDER",
    "KILN_DEBUG",
    "KILN_OPTIMIZE",
    "KILN_PLATFORM",
    "KILN_OUT",
];

/// Clear every layered variable so the host environment cannot leak in.
fn clean_env() -> Vec<EnvVarGuard> {
    LAYERED.into_iter().map(EnvVarGuard::remove).collect()
}

fn merged(args: &[&str]) -> Result<Cli> {
    let (parsed, matches) = cli::parse_from(args.iter().copied())?;
    Ok(cli::merge_with_config(&parsed, &matches)?)
}

#[test]
fn environment_fills_unset_switches() -> Result<()> {
    let _lock = EnvLock::acquire();
    let _clean = clean_env();
    let _render = EnvVarGuard::set("KILN_RENDER", "d3d11");
    let _debug = EnvVarGuard::set("KILN_DEBUG", "true");
    let _platform = EnvVarGuard::set("KILN_PLATFORM", "windows");

    let cli = merged(&["kiln"])?;
    ensure!(cli.render == RenderBackend::D3d11, "{cli:?}");
    ensure!(cli.debug);
    ensure!(!cli.optimize);
    ensure!(cli.platform == Some(Platform::Windows));
    ensure!(cli.replay_args().contains(&String::from("--debug")));
    Ok(())
}

#[rstest]
#[case(&["kiln", "--render", "opengl"], RenderBackend::OpenGl)]
#[case(&["kiln"], RenderBackend::D3d11)]
fn typed_flags_beat_the_environment(
    #[case] args: &[&str],
    #[case] expected: RenderBackend,
) -> Result<()> {
    let _lock = EnvLock::acquire();
    let _clean = clean_env();
    let _render = EnvVarGuard::set("KILN_RENDER", "d3d11");

    let cli = merged(args)?;
    ensure!(cli.render == expected, "{cli:?}");
    Ok(())
}

#[test]
fn defaults_apply_without_any_layer() -> Result<()> {
    let _lock = EnvLock::acquire();
    let _clean = clean_env();

    let cli = merged(&["kiln"])?;
    ensure!(cli == Cli::default(), "{cli:?}");
    Ok(())
}
