// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Forms Tasks
//!
//! Drives a [`forms_registry::Registry`] through a YAML plan:
//! - plan model (accounts, ordered steps)
//! - reference resolution (`$name` bindings, account aliases)
//! - best-effort execution with a per-step report

pub mod plan;
pub mod report;
pub mod runner;

pub use plan::{Literal, Op, Plan, Ref, Step, TypeSpec};
pub use report::{RunReport, StepOutcome, StepOutput, StepReport};
pub use runner::{run_plan, Binding, Runner, TaskError};
