// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Plan file models.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use forms_registry::ResponseValue;
use serde::{Deserialize, Serialize};

/// A task plan: named accounts plus an ordered list of steps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    /// Account aliases (`alias -> 0x address`).
    #[serde(default)]
    pub accounts: BTreeMap<String, String>,
    /// Steps, executed in order.
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Plan {
    /// Parse a plan from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let plan: Self = serde_yaml::from_str(yaml)?;
        Ok(plan)
    }

    /// Read and parse a plan file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read plan {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("parse plan {}", path.display()))
    }
}

/// One step of a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Optional label shown in the report.
    #[serde(default)]
    pub name: Option<String>,
    /// Calling identity: an account alias or a `0x` address.
    #[serde(rename = "as", default)]
    pub caller: Option<String>,
    /// Stores the step's generated identifier under this name.
    #[serde(default)]
    pub bind: Option<String>,
    /// The registry operation.
    #[serde(flatten)]
    pub op: Op,
}

impl Step {
    /// Label used in logs and the report.
    pub fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.op.name().to_owned())
    }
}

/// Registry operation named by a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    /// Create a form (owner only).
    CreateForm {
        /// Form title.
        title: String,
        /// Form description.
        #[serde(default)]
        description: String,
    },
    /// Append a question (owner only).
    AddQuestion {
        /// Target form.
        form: Ref,
        /// Question title.
        title: String,
        /// Question description.
        #[serde(default)]
        description: String,
        /// Informational required flag.
        #[serde(default)]
        required: bool,
        /// Declared response type.
        response_type: TypeSpec,
    },
    /// Grant one responder (owner only).
    AddResponder {
        /// Target form.
        form: Ref,
        /// Account alias, `$binding` or `0x` address.
        responder: String,
    },
    /// Grant several responders (owner only).
    AddResponders {
        /// Target form.
        form: Ref,
        /// Account aliases, `$bindings` or `0x` addresses.
        responders: Vec<String>,
    },
    /// Encode `value` for the question's type and submit it.
    SubmitResponse {
        /// Target form.
        form: Ref,
        /// Target question.
        question: Ref,
        /// Literal answer.
        value: Literal,
    },
    /// Read form details.
    GetForm {
        /// Target form.
        form: Ref,
    },
    /// Read question details.
    GetQuestion {
        /// Target form.
        form: Ref,
        /// Target question.
        question: Ref,
    },
    /// Check allow-list membership.
    IsAllowedResponder {
        /// Target form.
        form: Ref,
        /// Account alias, `$binding` or `0x` address.
        responder: String,
    },
    /// Read a question's response history.
    GetResponseHistory {
        /// Target form.
        form: Ref,
        /// Target question.
        question: Ref,
    },
    /// List every form.
    GetAllForms,
}

impl Op {
    /// Operation name as written in plans.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreateForm { .. } => "create_form",
            Self::AddQuestion { .. } => "add_question",
            Self::AddResponder { .. } => "add_responder",
            Self::AddResponders { .. } => "add_responders",
            Self::SubmitResponse { .. } => "submit_response",
            Self::GetForm { .. } => "get_form",
            Self::GetQuestion { .. } => "get_question",
            Self::IsAllowedResponder { .. } => "is_allowed_responder",
            Self::GetResponseHistory { .. } => "get_response_history",
            Self::GetAllForms => "get_all_forms",
        }
    }

    /// Returns `true` for operations that change registry state.
    pub const fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::CreateForm { .. }
                | Self::AddQuestion { .. }
                | Self::AddResponder { .. }
                | Self::AddResponders { .. }
                | Self::SubmitResponse { .. }
        )
    }
}

/// Identifier operand: a literal number or a `$binding`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ref {
    /// Literal form id or question index.
    Id(u64),
    /// `$name` of an earlier step's `bind`.
    Var(String),
}

/// Response type operand: a name (`numeric`, `text`) or a raw wire tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeSpec {
    /// Raw wire tag.
    Tag(u8),
    /// Type name.
    Name(String),
}

/// Literal answer as written in a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    /// Integer literal.
    Int(u64),
    /// String literal.
    Text(String),
}

impl From<&Literal> for ResponseValue {
    fn from(lit: &Literal) -> Self {
        match lit {
            Literal::Int(n) => Self::Numeric(*n),
            Literal::Text(s) => Self::Text(s.clone()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parses_steps_with_flattened_ops() {
        let plan = Plan::from_yaml_str(
            r#"
accounts:
  owner: "0x0000000000000000000000000000000000000001"
steps:
  - op: create_form
    as: owner
    title: Test Form
    bind: survey
  - op: add_question
    as: owner
    form: $survey
    title: Q1
    required: true
    response_type: numeric
  - op: submit_response
    as: owner
    form: 1
    question: 0
    value: 46
  - op: get_all_forms
"#,
        )
        .unwrap();
        assert_eq!(plan.accounts.len(), 1);
        assert_eq!(plan.steps.len(), 4);
        assert_eq!(plan.steps[0].bind.as_deref(), Some("survey"));
        match &plan.steps[1].op {
            Op::AddQuestion {
                form,
                required,
                response_type,
                description,
                ..
            } => {
                assert_eq!(form, &Ref::Var("$survey".into()));
                assert!(*required);
                assert_eq!(response_type, &TypeSpec::Name("numeric".into()));
                assert!(description.is_empty());
            }
            other => panic!("unexpected op {other:?}"),
        }
        match &plan.steps[2].op {
            Op::SubmitResponse { form, value, .. } => {
                assert_eq!(form, &Ref::Id(1));
                assert_eq!(value, &Literal::Int(46));
            }
            other => panic!("unexpected op {other:?}"),
        }
        assert!(plan.steps[3].caller.is_none());
        assert_eq!(plan.steps[3].label(), "get_all_forms");
    }

    #[test]
    fn quoted_numbers_stay_text() {
        let plan = Plan::from_yaml_str(
            r#"
steps:
  - op: submit_response
    form: 1
    question: 0
    value: "46"
"#,
        )
        .unwrap();
        match &plan.steps[0].op {
            Op::SubmitResponse { value, .. } => assert_eq!(value, &Literal::Text("46".into())),
            other => panic!("unexpected op {other:?}"),
        }
    }

    #[test]
    fn unknown_op_is_a_parse_error() {
        assert!(Plan::from_yaml_str("steps:\n  - op: delete_form\n").is_err());
    }

    #[test]
    fn mutations_are_classified() {
        assert!(Op::CreateForm {
            title: String::new(),
            description: String::new()
        }
        .is_mutation());
        assert!(!Op::GetAllForms.is_mutation());
    }
}
