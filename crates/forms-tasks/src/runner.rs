// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Best-effort plan execution.

use std::collections::BTreeMap;

use forms_registry::{
    encode, Address, AddressParseError, Clock, CodecError, FormId, Question, QuestionIndex,
    Registry, RegistryError, ResponseType, ResponseValue,
};

use crate::plan::{Op, Plan, Ref, Step, TypeSpec};
use crate::report::{RunReport, StepOutcome, StepOutput, StepReport};

/// Errors raised while resolving or executing a single step.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The registry rejected the call.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// `$name` was never bound (or its binding step failed).
    #[error("[FORMS_TASK_UNBOUND] reference {0} is not bound")]
    Unbound(String),
    /// A string operand that is neither `$name` nor a number.
    #[error("[FORMS_TASK_BAD_REFERENCE] {0:?} is not a $reference")]
    BadReference(String),
    /// `$name` is bound to a value of the wrong shape.
    #[error("[FORMS_TASK_BINDING_KIND] {name} is bound to {found}, expected {expected}")]
    BindingKind {
        /// Reference name.
        name: String,
        /// Expected binding shape.
        expected: &'static str,
        /// Actual binding shape.
        found: &'static str,
    },
    /// An account operand that is not an alias, binding or address.
    #[error("[FORMS_TASK_BAD_ACCOUNT] {text:?}: {source}")]
    BadAccount {
        /// Operand as written.
        text: String,
        /// Parse failure.
        #[source]
        source: AddressParseError,
    },
    /// A mutating step without `as:`.
    #[error("[FORMS_TASK_MISSING_CALLER] {op} needs an `as:` caller")]
    MissingCaller {
        /// Operation name.
        op: &'static str,
    },
    /// A response type name that is not recognized.
    #[error(transparent)]
    ResponseType(#[from] CodecError),
    /// An identifier too large for a question index.
    #[error("[FORMS_TASK_INDEX_RANGE] {0} does not fit a question index")]
    IndexRange(u64),
}

impl TaskError {
    /// Registry error kind, when the registry rejected the call.
    pub const fn registry_kind(&self) -> Option<&'static str> {
        match self {
            Self::Registry(err) => Some(err.kind()),
            _ => None,
        }
    }
}

/// Value stored by a step's `bind:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Form id, question index or history position.
    Id(u64),
    /// Account address.
    Account(Address),
}

impl Binding {
    const fn shape(&self) -> &'static str {
        match self {
            Self::Id(_) => "an id",
            Self::Account(_) => "an account",
        }
    }
}

/// Executes plan steps against a registry, carrying `$name` bindings
/// forward between steps.
pub struct Runner<'r, C> {
    registry: &'r mut Registry<C>,
    accounts: BTreeMap<String, Address>,
    bindings: BTreeMap<String, Binding>,
}

impl<'r, C: Clock> Runner<'r, C> {
    /// Prepare a runner; every account alias in `plan` must parse.
    pub fn new(registry: &'r mut Registry<C>, plan: &Plan) -> Result<Self, TaskError> {
        let mut accounts = BTreeMap::new();
        for (alias, text) in &plan.accounts {
            let address = text.parse().map_err(|source| TaskError::BadAccount {
                text: text.clone(),
                source,
            })?;
            accounts.insert(alias.clone(), address);
        }
        Ok(Self {
            registry,
            accounts,
            bindings: BTreeMap::new(),
        })
    }

    /// Current value bound to `name` (without the `$`).
    pub fn binding(&self, name: &str) -> Option<Binding> {
        self.bindings.get(name).copied()
    }

    /// Run every step in order. A failing step is logged and recorded; the
    /// remaining steps still run.
    pub fn run(&mut self, plan: &Plan) -> RunReport {
        let mut report = RunReport::default();
        for (index, step) in plan.steps.iter().enumerate() {
            let name = step.label();
            let outcome = match self.run_step(step) {
                Ok(output) => {
                    tracing::debug!(index, step = %name, "step ok");
                    StepOutcome::Ok { output }
                }
                Err(err) => {
                    tracing::warn!(index, step = %name, error = %err, "step failed");
                    StepOutcome::Failed {
                        kind: err.registry_kind(),
                        error: err.to_string(),
                    }
                }
            };
            report.push(StepReport {
                index,
                name,
                outcome,
            });
        }
        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failed,
            "plan finished"
        );
        report
    }

    /// Resolve and execute one step, then apply its `bind:`.
    pub fn run_step(&mut self, step: &Step) -> Result<StepOutput, TaskError> {
        if step.caller.is_some() && !step.op.is_mutation() {
            tracing::debug!(op = step.op.name(), "`as:` ignored on a read step");
        }
        let output = self.execute(step)?;
        if let Some(name) = &step.bind {
            match bindable(&output) {
                Some(value) => {
                    self.bindings.insert(name.clone(), value);
                }
                None => {
                    tracing::warn!(
                        bind = %name,
                        op = step.op.name(),
                        "step produces nothing to bind"
                    );
                }
            }
        }
        Ok(output)
    }

    fn execute(&mut self, step: &Step) -> Result<StepOutput, TaskError> {
        match &step.op {
            Op::CreateForm { title, description } => {
                let caller = self.caller(step)?;
                let form_id = self
                    .registry
                    .create_form(&caller, title.as_str(), description.as_str())?;
                Ok(StepOutput::FormCreated { form_id })
            }
            Op::AddQuestion {
                form,
                title,
                description,
                required,
                response_type,
            } => {
                let caller = self.caller(step)?;
                let form_id = self.form_id(form)?;
                let question = Question::new(
                    title.as_str(),
                    description.as_str(),
                    *required,
                    resolve_type(response_type)?,
                );
                let question_index =
                    self.registry
                        .add_question_to_form(&caller, form_id, question)?;
                Ok(StepOutput::QuestionAdded {
                    form_id,
                    question_index,
                })
            }
            Op::AddResponder { form, responder } => {
                let caller = self.caller(step)?;
                let form_id = self.form_id(form)?;
                let responder = self.account(responder)?;
                self.registry.add_responder(&caller, form_id, responder)?;
                Ok(StepOutput::RespondersAdded {
                    form_id,
                    responders: vec![responder],
                })
            }
            Op::AddResponders { form, responders } => {
                let caller = self.caller(step)?;
                let form_id = self.form_id(form)?;
                let responders = responders
                    .iter()
                    .map(|r| self.account(r))
                    .collect::<Result<Vec<_>, _>>()?;
                self.registry
                    .add_responders(&caller, form_id, &responders)?;
                Ok(StepOutput::RespondersAdded {
                    form_id,
                    responders,
                })
            }
            Op::SubmitResponse {
                form,
                question,
                value,
            } => {
                let caller = self.caller(step)?;
                let form_id = self.form_id(form)?;
                let question_index = self.question_index(question)?;
                // Same rejection order as the registry: form, responder, then
                // question and value.
                self.registry.form(form_id)?;
                self.registry.guard().require_responder(form_id, &caller)?;
                let declared = self
                    .registry
                    .question_details(form_id, question_index)?
                    .response_type;
                let raw = encode(&ResponseValue::from(value), declared)
                    .map_err(RegistryError::from)?;
                let receipt = self
                    .registry
                    .submit_response(&caller, form_id, question_index, &raw)?;
                Ok(StepOutput::ResponseSubmitted(receipt))
            }
            Op::GetForm { form } => {
                let form_id = self.form_id(form)?;
                Ok(StepOutput::Form(self.registry.form_details(form_id)?))
            }
            Op::GetQuestion { form, question } => {
                let form_id = self.form_id(form)?;
                let question_index = self.question_index(question)?;
                Ok(StepOutput::Question(
                    self.registry.question_details(form_id, question_index)?,
                ))
            }
            Op::IsAllowedResponder { form, responder } => {
                let form_id = self.form_id(form)?;
                let responder = self.account(responder)?;
                Ok(StepOutput::Allowed {
                    form_id,
                    responder,
                    allowed: self.registry.is_allowed_responder(form_id, &responder),
                })
            }
            Op::GetResponseHistory { form, question } => {
                let form_id = self.form_id(form)?;
                let question_index = self.question_index(question)?;
                Ok(StepOutput::History(
                    self.registry.response_history(form_id, question_index)?,
                ))
            }
            Op::GetAllForms => Ok(StepOutput::Forms {
                forms: self.registry.all_forms(),
            }),
        }
    }

    fn caller(&self, step: &Step) -> Result<Address, TaskError> {
        let text = step.caller.as_deref().ok_or(TaskError::MissingCaller {
            op: step.op.name(),
        })?;
        self.account(text)
    }

    /// Alias, `$binding` or literal `0x` address.
    fn account(&self, text: &str) -> Result<Address, TaskError> {
        if let Some(address) = self.accounts.get(text) {
            return Ok(*address);
        }
        if let Some(name) = text.strip_prefix('$') {
            return match self.bindings.get(name) {
                Some(Binding::Account(address)) => Ok(*address),
                Some(other) => Err(TaskError::BindingKind {
                    name: text.to_owned(),
                    expected: "an account",
                    found: other.shape(),
                }),
                None => Err(TaskError::Unbound(text.to_owned())),
            };
        }
        text.parse().map_err(|source| TaskError::BadAccount {
            text: text.to_owned(),
            source,
        })
    }

    fn id(&self, reference: &Ref) -> Result<u64, TaskError> {
        match reference {
            Ref::Id(id) => Ok(*id),
            Ref::Var(text) => {
                let name = text
                    .strip_prefix('$')
                    .ok_or_else(|| TaskError::BadReference(text.clone()))?;
                match self.bindings.get(name) {
                    Some(Binding::Id(id)) => Ok(*id),
                    Some(other) => Err(TaskError::BindingKind {
                        name: text.clone(),
                        expected: "an id",
                        found: other.shape(),
                    }),
                    None => Err(TaskError::Unbound(text.clone())),
                }
            }
        }
    }

    fn form_id(&self, reference: &Ref) -> Result<FormId, TaskError> {
        self.id(reference)
    }

    fn question_index(&self, reference: &Ref) -> Result<QuestionIndex, TaskError> {
        let id = self.id(reference)?;
        QuestionIndex::try_from(id).map_err(|_| TaskError::IndexRange(id))
    }
}

fn resolve_type(spec: &TypeSpec) -> Result<ResponseType, TaskError> {
    match spec {
        TypeSpec::Tag(tag) => Ok(ResponseType::from(*tag)),
        TypeSpec::Name(name) => Ok(name.parse()?),
    }
}

fn bindable(output: &StepOutput) -> Option<Binding> {
    match output {
        StepOutput::FormCreated { form_id } => Some(Binding::Id(*form_id)),
        StepOutput::QuestionAdded { question_index, .. } => {
            u64::try_from(*question_index).ok().map(Binding::Id)
        }
        StepOutput::RespondersAdded { responders, .. } => {
            responders.last().copied().map(Binding::Account)
        }
        StepOutput::ResponseSubmitted(receipt) => {
            u64::try_from(receipt.position).ok().map(Binding::Id)
        }
        StepOutput::Form(_)
        | StepOutput::Question(_)
        | StepOutput::Allowed { .. }
        | StepOutput::History(_)
        | StepOutput::Forms { .. } => None,
    }
}

/// Run `plan` against `registry` and return the per-step report.
///
/// Fails only when the plan's account table is malformed; step failures
/// are reported, not returned.
pub fn run_plan<C: Clock>(
    registry: &mut Registry<C>,
    plan: &Plan,
) -> Result<RunReport, TaskError> {
    let mut runner = Runner::new(registry, plan)?;
    Ok(runner.run(plan))
}
