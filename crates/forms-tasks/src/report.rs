// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Run report models.

use forms_registry::{
    Address, FormDetails, FormId, QuestionDetails, QuestionIndex, ResponseHistory, SubmitReceipt,
};
use serde::Serialize;

/// What a successful step produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepOutput {
    /// `create_form`.
    FormCreated {
        /// Generated form id.
        form_id: FormId,
    },
    /// `add_question`.
    QuestionAdded {
        /// Target form.
        form_id: FormId,
        /// Generated question index.
        question_index: QuestionIndex,
    },
    /// `add_responder` / `add_responders`.
    RespondersAdded {
        /// Target form.
        form_id: FormId,
        /// Addresses granted, in plan order.
        responders: Vec<Address>,
    },
    /// `submit_response`.
    ResponseSubmitted(SubmitReceipt),
    /// `get_form`.
    Form(FormDetails),
    /// `get_question`.
    Question(QuestionDetails),
    /// `is_allowed_responder`.
    Allowed {
        /// Target form.
        form_id: FormId,
        /// Queried address.
        responder: Address,
        /// Membership result.
        allowed: bool,
    },
    /// `get_response_history`.
    History(ResponseHistory),
    /// `get_all_forms`.
    Forms {
        /// Every form, in creation order.
        forms: Vec<FormDetails>,
    },
}

/// Final state of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    /// The step ran.
    Ok {
        /// Produced value.
        output: StepOutput,
    },
    /// The step was rejected; the registry is unchanged by it.
    Failed {
        /// Stable registry error kind, when the registry rejected the call.
        #[serde(skip_serializing_if = "Option::is_none")]
        kind: Option<&'static str>,
        /// Rendered error.
        error: String,
    },
}

impl StepOutcome {
    /// Returns `true` for [`StepOutcome::Ok`].
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

/// One line of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    /// Zero-based position in the plan.
    pub index: usize,
    /// Step name, or the op name when unnamed.
    pub name: String,
    /// Result.
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// Outcome of a whole plan run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Per-step results, in plan order.
    pub steps: Vec<StepReport>,
    /// Number of steps that ran.
    pub succeeded: usize,
    /// Number of steps that were rejected.
    pub failed: usize,
}

impl RunReport {
    /// Record a step result and update the counters.
    pub fn push(&mut self, step: StepReport) {
        if step.outcome.is_ok() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.steps.push(step);
    }

    /// Returns `true` when no step failed.
    pub const fn all_ok(&self) -> bool {
        self.failed == 0
    }

    /// Report for the step at `index`.
    pub fn step(&self, index: usize) -> Option<&StepReport> {
        self.steps.get(index)
    }

    /// Pretty-printed JSON rendering.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
