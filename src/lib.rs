//! Kiln core library.
//!
//! Kiln turns a declarative description of C and C++ targets into a Ninja
//! build file. The pipeline is strictly staged:
//!
//! 1. [`cli`] and [`variant`] fix the platform, render backend and build
//!    switches for the run.
//! 2. [`toolchain`] selects the rule table for the platform.
//! 3. [`manifest`] parses the `Kilnfile` ([`ast`]) and declares its targets
//!    in a [`graph::TargetGraph`].
//! 4. [`graph`] propagates public attributes along dependency edges and
//!    computes link closures.
//! 5. [`ir`] lowers the resolved graph into a [`ir::BuildPlan`].
//! 6. [`ninja_gen`] prints the plan and [`runner`] writes it atomically.

pub mod ast;
pub mod cli;
pub mod graph;
pub mod ir;
pub mod manifest;
pub mod ninja_gen;
pub mod runner;
pub mod toolchain;
pub mod variant;
