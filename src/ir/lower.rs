//! Lowering of a resolved target graph into a [`BuildPlan`].
//!
//! Targets are visited in declaration order. Each produces, in this order,
//! its generate edges, one compile edge per source unit, and then an archive
//! edge (libraries), a link edge (executables and tests) and a test run edge
//! (tests). A regeneration edge and the `all` alias close the plan.

use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use tracing::debug;

use super::{
    BuildEdge, BuildPlan, Binding, EdgeKind, IrGenError, PHONY_RULE, Value, cycle,
};
use crate::graph::codegen::relative_key;
use crate::graph::{FlagGroup, Language, ResolvedGraph, Target, TargetId, TargetKind};
use crate::ninja_gen::escape;
use crate::toolchain::{RuleRegistry, names};
use crate::variant::{BUILD_FILE_NAME, Platform, Variant};

/// Alias covering every final artefact.
pub const ALL_TARGET: &str = "all";

impl BuildPlan {
    /// Lower `resolved` into a build plan for `variant`.
    ///
    /// # Errors
    ///
    /// Returns an [`IrGenError`] when a target generates code without a
    /// generator tool, an edge uses an unregistered rule, two edges share an
    /// output, the edges form a cycle or a value contains a line break.
    pub fn lower(
        resolved: &ResolvedGraph<'_>,
        registry: &RuleRegistry,
        variant: &Variant,
    ) -> Result<Self, IrGenError> {
        let graph = resolved.graph();
        let tool = variant
            .generator
            .as_ref()
            .map(ToString::to_string)
            .or_else(|| graph.generator_tool().map(str::to_owned));

        let mut lowering = Lowering {
            resolved,
            platform: variant.platform,
            tool: tool.as_deref(),
            edges: Vec::new(),
        };
        let mut artefacts = Vec::with_capacity(graph.len());
        for (id, target) in graph.targets() {
            artefacts.push(lowering.lower_target(id, target)?);
        }

        let mut regen_inputs: IndexSet<String> = IndexSet::new();
        regen_inputs.insert(variant.invocation.program.to_string());
        regen_inputs.extend(graph.config_inputs().map(str::to_owned));
        regen_inputs.extend(variant.invocation.config_files.iter().map(ToString::to_string));
        let mut regen = BuildEdge::new(
            EdgeKind::Regenerate,
            names::CONFIGURE,
            vec![BUILD_FILE_NAME.to_owned()],
            Vec::new(),
        );
        regen.implicit_inputs = regen_inputs.into_iter().collect();
        lowering.edges.push(regen);

        let finals = artefacts.iter().flatten().cloned().collect_vec();
        lowering.edges.push(BuildEdge::new(
            EdgeKind::Phony,
            PHONY_RULE,
            vec![ALL_TARGET.to_owned()],
            finals,
        ));

        let default = graph
            .default_target()
            .and_then(|id| artefacts.get(id.index()).cloned().flatten())
            .unwrap_or_else(|| ALL_TARGET.to_owned());

        let mut variables = vec![
            Binding::verbatim("builddir", "."),
            Binding::verbatim("root", escape::escape_literal(variant.source_dir.as_str())),
        ];
        if let Some(path) = &tool {
            variables.push(Binding::words("codegen", [path.as_str()]));
        }
        variables.push(Binding::verbatim("configure", configure_command(variant)));
        for group in FlagGroup::ALL {
            variables.push(Binding::words(group.variable(), graph.global_flags(group)));
        }

        let plan = Self {
            platform: variant.platform,
            variables,
            rules: registry.iter().cloned().collect(),
            edges: lowering.edges,
            default,
        };
        plan.check_rules(registry)?;
        plan.check_line_breaks()?;
        plan.check_outputs()?;
        plan.check_cycles()?;
        debug!(
            edges = plan.edges.len(),
            rules = plan.rules.len(),
            default = %plan.default,
            "lowered build plan"
        );
        Ok(plan)
    }

    fn check_rules(&self, registry: &RuleRegistry) -> Result<(), IrGenError> {
        for edge in self.edges.iter().filter(|edge| edge.rule != PHONY_RULE) {
            registry
                .lookup(&edge.rule)
                .map_err(|source| IrGenError::UnknownRule {
                    output: edge.outputs.first().cloned().unwrap_or_default(),
                    source,
                })?;
        }
        Ok(())
    }

    fn check_line_breaks(&self) -> Result<(), IrGenError> {
        let bindings = self
            .variables
            .iter()
            .chain(self.edges.iter().flat_map(|edge| &edge.bindings));
        for binding in bindings {
            let texts: Vec<&str> = match &binding.value {
                Value::Words(words) => words.iter().map(String::as_str).collect(),
                Value::Verbatim(text) => vec![text.as_str()],
            };
            if let Some(bad) = texts.into_iter().find(|text| has_line_break(text)) {
                return Err(IrGenError::LineBreak {
                    name: binding.name.clone(),
                    value: bad.to_owned(),
                });
            }
        }
        for edge in &self.edges {
            if let Some(bad) = edge
                .all_outputs()
                .chain(edge.all_inputs())
                .find(|path| has_line_break(path))
            {
                return Err(IrGenError::LineBreak {
                    name: String::from("path"),
                    value: bad.to_owned(),
                });
            }
        }
        Ok(())
    }

    fn check_outputs(&self) -> Result<(), IrGenError> {
        let mut counts: IndexMap<&str, usize> = IndexMap::new();
        for output in self.edges.iter().flat_map(BuildEdge::all_outputs) {
            *counts.entry(output).or_default() += 1;
        }
        let duplicates = counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(output, _)| output.to_owned())
            .collect_vec();
        if duplicates.is_empty() {
            Ok(())
        } else {
            Err(IrGenError::DuplicateOutput {
                outputs: duplicates,
            })
        }
    }

    fn check_cycles(&self) -> Result<(), IrGenError> {
        let producers: IndexMap<&str, &BuildEdge> = self
            .edges
            .iter()
            .flat_map(|edge| edge.all_outputs().map(move |output| (output, edge)))
            .collect();
        let found = cycle::find_cycle(self.edges.iter().map(edge_key), |output| {
            producers
                .get(output)
                .map(|edge| {
                    edge.all_inputs()
                        .filter_map(|input| producers.get(input).map(|dep| edge_key(dep)))
                        .collect()
                })
                .unwrap_or_default()
        });
        match found {
            Some(cycle) => Err(IrGenError::CircularDependency {
                cycle: cycle.into_iter().map(str::to_owned).collect(),
            }),
            None => Ok(()),
        }
    }
}

/// Node identifying an edge during cycle detection.
fn edge_key(edge: &BuildEdge) -> &str {
    edge.outputs.first().map_or("", String::as_str)
}

fn has_line_break(text: &str) -> bool {
    text.contains(['\n', '\r'])
}

/// Command replaying the configuration run from its original directory.
fn configure_command(variant: &Variant) -> String {
    let platform = variant.platform;
    let invocation = &variant.invocation;
    let program = std::iter::once(invocation.program.as_str())
        .chain(invocation.args.iter().map(String::as_str))
        .map(|word| escape::quote_literal(platform, word))
        .join(" ");
    let dir = escape::quote_literal(platform, invocation.working_dir.as_str());
    match platform {
        Platform::Linux => format!("cd {dir} && {program}"),
        Platform::Windows => format!("cmd /c cd /d {dir} && {program}"),
    }
}

struct Lowering<'r, 'g> {
    resolved: &'r ResolvedGraph<'g>,
    platform: Platform,
    tool: Option<&'r str>,
    edges: Vec<BuildEdge>,
}

impl Lowering<'_, '_> {
    /// Lower one target, returning its final artefact if it has one.
    fn lower_target(
        &mut self,
        id: TargetId,
        target: &Target,
    ) -> Result<Option<String>, IrGenError> {
        let generated = self.lower_generators(target)?;
        let objects = self.lower_sources(id, target, &generated);

        let artefact = match target.kind() {
            TargetKind::Library => self.lower_archive(id, target, objects),
            TargetKind::Executable => Some(self.lower_link(id, target, objects)),
            TargetKind::Test => {
                let binary = self.lower_link(id, target, objects);
                let stamp = format!("$builddir/test/{}.passed", target.name());
                self.edges.push(BuildEdge::new(
                    EdgeKind::Test,
                    names::TEST,
                    vec![stamp.clone()],
                    vec![binary],
                ));
                Some(stamp)
            }
        };
        debug!(
            target_name = target.name(),
            artefact = artefact.as_deref().unwrap_or("-"),
            "lowered target"
        );
        Ok(artefact)
    }

    /// Emit generate edges, returning `(source, outputs)` pairs.
    fn lower_generators(&mut self, target: &Target) -> Result<Vec<(String, [String; 2])>, IrGenError> {
        if target.generators().is_empty() {
            return Ok(Vec::new());
        }
        let Some(tool) = self.tool else {
            return Err(IrGenError::MissingGeneratorTool {
                target: target.name().to_owned(),
            });
        };
        let codegen_root = self.resolved.graph().codegen_root();
        let mut generated = Vec::with_capacity(target.generators().len());
        for decl in target.generators() {
            let outputs = decl.outputs(codegen_root);
            let mut edge = BuildEdge::new(
                EdgeKind::Generate,
                names::GENERATE,
                outputs.to_vec(),
                vec![decl.source.clone()],
            );
            edge.implicit_inputs.push(tool.to_owned());
            let [public, internal] = &outputs;
            edge.bindings = vec![
                Binding::words("genflags", decl.flags.iter().map(String::as_str)),
                Binding::words("public", [public.as_str()]),
                Binding::words("internal", [internal.as_str()]),
            ];
            self.edges.push(edge);
            generated.push((decl.source.clone(), outputs));
        }
        Ok(generated)
    }

    /// Emit compile edges, returning the object paths.
    fn lower_sources(
        &mut self,
        id: TargetId,
        target: &Target,
        generated: &[(String, [String; 2])],
    ) -> Vec<String> {
        let effective = self.resolved.effective(id);
        let defines = effective.defines().map(|d| format!("-D{d}")).collect_vec();
        let includes = effective
            .include_paths()
            .map(|p| format!("-I{p}"))
            .collect_vec();

        let mut objects = Vec::with_capacity(target.sources().len());
        for unit in target.sources() {
            let object = format!(
                "$builddir/obj/{}/{}.{}",
                target.name(),
                relative_key(&unit.declared),
                self.platform.object_extension()
            );
            let rule = match unit.language {
                Language::C => names::CC,
                Language::Cxx => names::CXX,
            };
            let mut edge = BuildEdge::new(
                EdgeKind::Compile,
                rule,
                vec![object.clone()],
                vec![unit.path.clone()],
            );
            for (source, outputs) in generated {
                let slot = if *source == unit.path {
                    &mut edge.implicit_inputs
                } else {
                    &mut edge.order_only
                };
                slot.extend(outputs.iter().cloned());
            }
            let flags = effective
                .flags(FlagGroup::Common)
                .chain(effective.flags(unit.language.flag_group()));
            edge.bindings = vec![
                Binding::words("flags", flags),
                Binding::words("defines", defines.iter().map(String::as_str)),
                Binding::words("includes", includes.iter().map(String::as_str)),
            ];
            self.edges.push(edge);
            objects.push(object);
        }
        objects
    }

    fn lower_archive(
        &mut self,
        id: TargetId,
        target: &Target,
        objects: Vec<String>,
    ) -> Option<String> {
        let archive = archive_path(self.platform, target)?;
        let mut edge = BuildEdge::new(EdgeKind::Archive, names::ARCHIVE, vec![archive.clone()], objects);
        edge.bindings = vec![Binding::words(
            "flags",
            self.resolved.effective(id).flags(FlagGroup::Archive),
        )];
        self.edges.push(edge);
        Some(archive)
    }

    fn lower_link(&mut self, id: TargetId, target: &Target, objects: Vec<String>) -> String {
        let binary = format!(
            "$builddir/bin/{}{}",
            target.name(),
            self.platform.executable_suffix()
        );
        let graph = self.resolved.graph();
        let archives = self
            .resolved
            .link_libraries(id)
            .iter()
            .filter_map(|lib| graph.target(*lib).ok())
            .filter_map(|lib| archive_path(self.platform, lib));
        let inputs = objects.into_iter().chain(archives).collect_vec();
        let effective = self.resolved.effective(id);
        let mut edge = BuildEdge::new(EdgeKind::Link, names::LINK, vec![binary.clone()], inputs);
        edge.bindings = vec![
            Binding::words("ldflags", effective.flags(FlagGroup::Link)),
            Binding::words("libs", effective.libraries().map(|lib| format!("-l{lib}"))),
        ];
        self.edges.push(edge);
        binary
    }
}

/// Static archive of a library, or `None` for libraries without sources.
fn archive_path(platform: Platform, target: &Target) -> Option<String> {
    (target.kind() == TargetKind::Library && !target.sources().is_empty())
        .then(|| format!("$builddir/lib/{}", platform.archive_file_name(target.name())))
}
