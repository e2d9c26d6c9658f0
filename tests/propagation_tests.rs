//! Attribute propagation and link ordering through the public graph API.

use anyhow::{Context, Result, ensure};
use kiln::graph::{
    Attribute, GraphError, Language, TargetGraph, TargetId, TargetKind, Visibility,
};
use rstest::rstest;

fn library(graph: &mut TargetGraph, name: &str) -> Result<TargetId> {
    let id = graph.declare_target(name, TargetKind::Library, &format!("$root/{name}"))?;
    graph.add_source(id, Language::Cxx, &format!("{name}.cpp"))?;
    Ok(id)
}

fn define(name: &str) -> Attribute {
    Attribute::Define(name.to_owned())
}

/// Chain `lib0 <- lib1 <- ... <- app` where every edge has `visibility` and
/// each library exports a define named after itself.
fn chain(length: usize, visibility: Visibility) -> Result<(TargetGraph, TargetId)> {
    let mut graph = TargetGraph::new();
    let mut previous: Option<TargetId> = None;
    for index in 0..length {
        let name = format!("lib{index}");
        let id = library(&mut graph, &name)?;
        graph.add_attribute(id, define(&name.to_uppercase()), Visibility::Public)?;
        graph.add_attribute(id, define(&format!("{}_PRIVATE", name.to_uppercase())), Visibility::Private)?;
        if let Some(dep) = previous {
            graph.add_dependency(id, dep, visibility)?;
        }
        previous = Some(id);
    }
    let app = graph.declare_target("app", TargetKind::Executable, "$root/app")?;
    if let Some(dep) = previous {
        graph.add_dependency(app, dep, Visibility::Public)?;
    }
    Ok((graph, app))
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(5)]
fn public_attributes_reach_every_public_dependent(#[case] length: usize) -> Result<()> {
    let (graph, app) = chain(length, Visibility::Public)?;
    let resolved = graph.resolve()?;
    let defines: Vec<_> = resolved.effective(app).defines().collect();
    for index in 0..length {
        let public = format!("LIB{index}");
        let private = format!("LIB{index}_PRIVATE");
        ensure!(defines.contains(&public.as_str()), "{public} missing from {defines:?}");
        ensure!(!defines.contains(&private.as_str()), "{private} leaked into {defines:?}");
    }
    Ok(())
}

#[rstest]
#[case(2)]
#[case(4)]
fn private_edges_still_carry_public_attributes(#[case] length: usize) -> Result<()> {
    let (graph, app) = chain(length, Visibility::Private)?;
    let resolved = graph.resolve()?;
    let defines: Vec<_> = resolved.effective(app).defines().collect();
    for index in 0..length {
        let public = format!("LIB{index}");
        let private = format!("LIB{index}_PRIVATE");
        ensure!(defines.contains(&public.as_str()), "{public} missing from {defines:?}");
        ensure!(!defines.contains(&private.as_str()), "{private} leaked into {defines:?}");
    }
    ensure!(resolved.link_libraries(app).len() == length);
    Ok(())
}

#[test]
fn include_reaches_past_a_private_middle_edge() -> Result<()> {
    let mut graph = TargetGraph::new();
    let d = library(&mut graph, "d")?;
    graph.add_attribute(d, Attribute::IncludePath("d_inc".into()), Visibility::Public)?;
    let b = library(&mut graph, "b")?;
    graph.add_dependency(b, d, Visibility::Private)?;
    let a = graph.declare_target("a", TargetKind::Executable, "$root/a")?;
    graph.add_dependency(a, b, Visibility::Public)?;

    let resolved = graph.resolve()?;
    let includes: Vec<_> = resolved.effective(a).include_paths().collect();
    ensure!(includes == ["d_inc"], "unexpected includes {includes:?}");
    Ok(())
}

#[test]
fn relative_include_paths_are_forwarded_verbatim() -> Result<()> {
    let mut graph = TargetGraph::new();
    let core = library(&mut graph, "core")?;
    graph.add_attribute(core, Attribute::IncludePath(".".into()), Visibility::Public)?;
    let app = graph.declare_target("app", TargetKind::Executable, "$root/app")?;
    graph.add_dependency(app, core, Visibility::Public)?;
    let resolved = graph.resolve()?;
    let includes: Vec<_> = resolved.effective(app).include_paths().collect();
    ensure!(includes == ["."], "unexpected includes {includes:?}");
    Ok(())
}

#[test]
fn diamond_dependencies_link_each_library_once() -> Result<()> {
    let mut graph = TargetGraph::new();
    let base = library(&mut graph, "base")?;
    graph.add_attribute(base, define("BASE"), Visibility::Public)?;
    let left = library(&mut graph, "left")?;
    let right = library(&mut graph, "right")?;
    graph.add_dependency(left, base, Visibility::Public)?;
    graph.add_dependency(right, base, Visibility::Public)?;
    let app = graph.declare_target("app", TargetKind::Executable, "$root/app")?;
    graph.add_dependency(app, left, Visibility::Public)?;
    graph.add_dependency(app, right, Visibility::Public)?;

    let resolved = graph.resolve()?;
    let defines: Vec<_> = resolved.effective(app).defines().collect();
    ensure!(defines == ["BASE"], "define should appear once: {defines:?}");
    let order: Vec<_> = resolved
        .link_libraries(app)
        .iter()
        .map(|id| graph.target(*id).map(|t| t.name().to_owned()))
        .collect::<Result<_, _>>()?;
    let position = |name: &str| order.iter().position(|n| n == name).context(name.to_owned());
    ensure!(order.len() == 3, "unexpected closure {order:?}");
    ensure!(position("left")? < position("base")?);
    ensure!(position("right")? < position("base")?);
    Ok(())
}

#[test]
fn two_target_cycle_is_rejected_with_both_names() {
    let mut graph = TargetGraph::new();
    let x = graph
        .declare_target("x", TargetKind::Library, "$root/x")
        .expect("declare x");
    let y = graph
        .declare_target("y", TargetKind::Library, "$root/y")
        .expect("declare y");
    graph.add_dependency(x, y, Visibility::Public).expect("x -> y");
    graph.add_dependency(y, x, Visibility::Private).expect("y -> x");
    let err = graph.resolve().expect_err("cycle must be rejected");
    assert_eq!(
        err,
        GraphError::DependencyCycle {
            cycle: vec!["x".into(), "y".into(), "x".into()],
        }
    );
}

#[rstest]
#[case(TargetKind::Library, false)]
#[case(TargetKind::Executable, false)]
#[case(TargetKind::Test, true)]
fn only_tests_may_depend_on_executables(#[case] kind: TargetKind, #[case] allowed: bool) {
    let mut graph = TargetGraph::new();
    let app = graph
        .declare_target("app", TargetKind::Executable, "$root/app")
        .expect("declare app");
    let dependent = graph
        .declare_target("dependent", kind, "$root/dependent")
        .expect("declare dependent");
    let result = graph.add_dependency(dependent, app, Visibility::Private);
    assert_eq!(result.is_ok(), allowed, "{result:?}");
}
