// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The registry aggregate and its operations.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::codec::{self, ResponseType, ResponseValue};
use crate::events::{EventLog, RegistryEvent};
use crate::{
    Address, Clock, FormId, Guard, QuestionIndex, RegistryError, SystemClock, Timestamp,
};

/// Id of the form stored in vector slot `slot`.
pub(crate) fn form_id_at(slot: usize) -> FormId {
    FormId::try_from(slot)
        .unwrap_or(FormId::MAX)
        .saturating_add(1)
}

/// Vector slot holding form `form_id` (ids start at 1).
pub(crate) fn form_slot(form_id: FormId) -> Option<usize> {
    form_id
        .checked_sub(1)
        .and_then(|slot| usize::try_from(slot).ok())
}

/// Question definition. Immutable once appended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Prompt title.
    pub title: String,
    /// Prompt description.
    pub description: String,
    /// Informational flag; submissions are never rejected for it.
    pub required: bool,
    /// Declared payload type for every response to this question.
    pub response_type: ResponseType,
}

impl Question {
    /// Build a question definition.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        required: bool,
        response_type: ResponseType,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            required,
            response_type,
        }
    }
}

/// One decoded, timestamped answer in a question's history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEntry {
    /// Decoded value.
    pub value: ResponseValue,
    /// Commit time (non-decreasing within one history).
    pub timestamp: Timestamp,
    /// Identity that submitted the answer.
    pub responder: Address,
}

/// A form: metadata, ordered questions, allow-list and per-question histories.
#[derive(Clone, Debug)]
pub struct Form {
    pub(crate) id: FormId,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) questions: Vec<Question>,
    pub(crate) responders: HashSet<Address>,
    // Parallel to `questions`.
    pub(crate) histories: Vec<Vec<ResponseEntry>>,
}

impl Form {
    pub(crate) fn new(id: FormId, title: String, description: String) -> Self {
        Self {
            id,
            title,
            description,
            questions: Vec::new(),
            responders: HashSet::new(),
            histories: Vec::new(),
        }
    }

    /// Form id.
    pub fn id(&self) -> FormId {
        self.id
    }

    /// Form title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Form description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Questions in insertion order.
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Number of questions.
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Granted responders (unordered).
    pub fn responders(&self) -> impl Iterator<Item = &Address> {
        self.responders.iter()
    }

    /// O(1) allow-list membership test.
    pub fn has_responder(&self, who: &Address) -> bool {
        self.responders.contains(who)
    }

    /// History of question `index`, if it exists.
    pub fn history(&self, index: QuestionIndex) -> Option<&[ResponseEntry]> {
        self.histories.get(index).map(Vec::as_slice)
    }

    fn check_index(&self, index: QuestionIndex) -> Result<(), RegistryError> {
        if index < self.questions.len() {
            Ok(())
        } else {
            Err(RegistryError::InvalidQuestionIndex {
                form_id: self.id,
                index,
                count: self.questions.len(),
            })
        }
    }

    fn details(&self) -> FormDetails {
        FormDetails {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            questions: self
                .questions
                .iter()
                .enumerate()
                .map(|(index, q)| QuestionDetails::from_question(index, q))
                .collect(),
            questions_count: self.questions.len(),
        }
    }
}

/// Read model returned by [`Registry::form_details`] and [`Registry::all_forms`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormDetails {
    /// Form id.
    pub id: FormId,
    /// Form title.
    pub title: String,
    /// Form description.
    pub description: String,
    /// Questions in insertion order.
    pub questions: Vec<QuestionDetails>,
    /// Number of questions.
    pub questions_count: usize,
}

/// Read model returned by [`Registry::question_details`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDetails {
    /// Question index within its form.
    pub id: QuestionIndex,
    /// Prompt title.
    pub title: String,
    /// Prompt description.
    pub description: String,
    /// Informational required flag.
    pub required: bool,
    /// Declared response type.
    pub response_type: ResponseType,
}

impl QuestionDetails {
    fn from_question(id: QuestionIndex, q: &Question) -> Self {
        Self {
            id,
            title: q.title.clone(),
            description: q.description.clone(),
            required: q.required,
            response_type: q.response_type,
        }
    }
}

/// Index-aligned response values and timestamps of one question.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHistory {
    /// Decoded values in submission order.
    pub responses: Vec<ResponseValue>,
    /// Commit times, same length and order as `responses`.
    pub timestamps: Vec<Timestamp>,
}

impl ResponseHistory {
    fn from_entries<'a>(entries: impl Iterator<Item = &'a ResponseEntry>) -> Self {
        let (responses, timestamps): (Vec<_>, Vec<_>) = entries
            .map(|e| (e.value.clone(), e.timestamp))
            .unzip();
        Self {
            responses,
            timestamps,
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    /// Returns `true` if nothing has been submitted.
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

/// Outcome of a successful [`Registry::submit_response`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    /// Target form.
    pub form_id: FormId,
    /// Target question.
    pub question_index: QuestionIndex,
    /// Position of the new entry in the question's history.
    pub position: usize,
    /// Recorded commit time.
    pub timestamp: Timestamp,
    /// The decoded value that was stored.
    pub value: ResponseValue,
}

/// Forms registry.
///
/// Single-writer aggregate: every mutation takes `&mut self` and either
/// commits fully or fails without side effects. Wrap it in a
/// [`SharedRegistry`](crate::SharedRegistry) to serve concurrent callers.
#[derive(Debug)]
pub struct Registry<C = SystemClock> {
    pub(crate) owner: Address,
    pub(crate) forms: Vec<Form>,
    pub(crate) events: EventLog,
    pub(crate) clock: C,
}

impl Registry<SystemClock> {
    /// Create an empty registry owned by `owner`, stamped by the system clock.
    pub fn new(owner: Address) -> Self {
        Self::with_clock(owner, SystemClock)
    }
}

impl<C: Clock> Registry<C> {
    /// Create an empty registry owned by `owner` using `clock` for timestamps.
    pub fn with_clock(owner: Address, clock: C) -> Self {
        Self {
            owner,
            forms: Vec::new(),
            events: EventLog::new(),
            clock,
        }
    }

    /// Registry owner.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Authorization view over the current state.
    pub fn guard(&self) -> Guard<'_> {
        Guard::new(&self.owner, &self.forms)
    }

    /// Notification log.
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// The clock used for timestamps.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// All forms in creation order.
    pub fn forms(&self) -> &[Form] {
        &self.forms
    }

    /// Number of forms created so far.
    pub fn form_count(&self) -> usize {
        self.forms.len()
    }

    /// Look up a form by id.
    pub fn form(&self, form_id: FormId) -> Result<&Form, RegistryError> {
        form_slot(form_id)
            .and_then(|slot| self.forms.get(slot))
            .ok_or(RegistryError::FormNotFound(form_id))
    }

    fn form_mut(&mut self, form_id: FormId) -> Result<&mut Form, RegistryError> {
        form_slot(form_id)
            .and_then(|slot| self.forms.get_mut(slot))
            .ok_or(RegistryError::FormNotFound(form_id))
    }

    /// Create a form. Owner only.
    pub fn create_form(
        &mut self,
        caller: &Address,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<FormId, RegistryError> {
        self.guard().require_owner(caller)?;
        let form_id = form_id_at(self.forms.len());
        self.forms
            .push(Form::new(form_id, title.into(), description.into()));
        let now = self.clock.now();
        self.events
            .append(now, RegistryEvent::FormCreated { form_id });
        Ok(form_id)
    }

    /// Append a question to a form. Owner only.
    ///
    /// The new question's index equals the form's question count before the
    /// call.
    pub fn add_question_to_form(
        &mut self,
        caller: &Address,
        form_id: FormId,
        question: Question,
    ) -> Result<QuestionIndex, RegistryError> {
        self.guard().require_owner(caller)?;
        let form = self.form_mut(form_id)?;
        let question_index = form.questions.len();
        form.questions.push(question);
        form.histories.push(Vec::new());
        let now = self.clock.now();
        self.events.append(
            now,
            RegistryEvent::QuestionCreated {
                form_id,
                question_index,
            },
        );
        Ok(question_index)
    }

    /// Grant a single responder. Owner only; re-granting is a no-op insert.
    pub fn add_responder(
        &mut self,
        caller: &Address,
        form_id: FormId,
        responder: Address,
    ) -> Result<(), RegistryError> {
        self.add_responders(caller, form_id, &[responder])
    }

    /// Grant several responders. Owner only.
    ///
    /// Emits one `ResponderAdded` per supplied address, duplicates included.
    pub fn add_responders(
        &mut self,
        caller: &Address,
        form_id: FormId,
        responders: &[Address],
    ) -> Result<(), RegistryError> {
        self.guard().require_owner(caller)?;
        let form = self.form_mut(form_id)?;
        form.responders.extend(responders.iter().copied());
        let now = self.clock.now();
        for responder in responders {
            self.events.append(
                now,
                RegistryEvent::ResponderAdded {
                    form_id,
                    responder: *responder,
                },
            );
        }
        Ok(())
    }

    /// Append a raw response to a question's history. Allowed responders only.
    ///
    /// Checks run in this order, each with its own error: form exists, caller
    /// is an allowed responder, question index is in range, payload decodes
    /// under the question's response type.
    pub fn submit_response(
        &mut self,
        caller: &Address,
        form_id: FormId,
        question_index: QuestionIndex,
        raw: &[u8],
    ) -> Result<SubmitReceipt, RegistryError> {
        let form = self.form(form_id)?;
        self.guard()
            .require_responder(form_id, caller)
            .inspect_err(|_| {
                tracing::debug!(form_id, %caller, "response rejected: not an allowed responder");
            })?;
        form.check_index(question_index)?;
        let value = codec::decode(raw, form.questions[question_index].response_type)?;

        let now = self.clock.now();
        let form = self.form_mut(form_id)?;
        let history = &mut form.histories[question_index];
        let timestamp = history.last().map_or(now, |last| now.max(last.timestamp));
        history.push(ResponseEntry {
            value: value.clone(),
            timestamp,
            responder: *caller,
        });
        let position = history.len() - 1;
        self.events.append(
            timestamp,
            RegistryEvent::ResponseSubmitted {
                form_id,
                question_index,
                responder: *caller,
            },
        );
        Ok(SubmitReceipt {
            form_id,
            question_index,
            position,
            timestamp,
            value,
        })
    }

    /// Form metadata and its questions.
    pub fn form_details(&self, form_id: FormId) -> Result<FormDetails, RegistryError> {
        self.form(form_id).map(Form::details)
    }

    /// A single question's definition.
    pub fn question_details(
        &self,
        form_id: FormId,
        question_index: QuestionIndex,
    ) -> Result<QuestionDetails, RegistryError> {
        let form = self.form(form_id)?;
        form.check_index(question_index)?;
        Ok(QuestionDetails::from_question(
            question_index,
            &form.questions[question_index],
        ))
    }

    /// Returns `true` iff `who` may respond to `form_id` (`false` for unknown forms).
    pub fn is_allowed_responder(&self, form_id: FormId, who: &Address) -> bool {
        self.guard().is_allowed_responder(form_id, who)
    }

    /// Returns `true` iff `who` is the registry owner.
    pub fn is_owner(&self, who: &Address) -> bool {
        self.guard().is_owner(who)
    }

    /// Full history of a question, shared across all responders.
    pub fn response_history(
        &self,
        form_id: FormId,
        question_index: QuestionIndex,
    ) -> Result<ResponseHistory, RegistryError> {
        Ok(ResponseHistory::from_entries(
            self.entries(form_id, question_index)?.iter(),
        ))
    }

    /// The subset of a question's history submitted by `responder`.
    pub fn responses_by(
        &self,
        form_id: FormId,
        question_index: QuestionIndex,
        responder: &Address,
    ) -> Result<ResponseHistory, RegistryError> {
        Ok(ResponseHistory::from_entries(
            self.entries(form_id, question_index)?
                .iter()
                .filter(|e| e.responder == *responder),
        ))
    }

    /// Raw history entries of a question.
    pub fn entries(
        &self,
        form_id: FormId,
        question_index: QuestionIndex,
    ) -> Result<&[ResponseEntry], RegistryError> {
        let form = self.form(form_id)?;
        form.check_index(question_index)?;
        Ok(&form.histories[question_index])
    }

    /// Every form ever created, in creation order.
    pub fn all_forms(&self) -> Vec<FormDetails> {
        self.forms.iter().map(Form::details).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ManualClock;
    use std::sync::Arc;

    fn owner() -> Address {
        Address::from_low_u64(1)
    }

    fn alice() -> Address {
        Address::from_low_u64(100)
    }

    fn registry() -> (Registry<Arc<ManualClock>>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Timestamp(1_000)));
        (Registry::with_clock(owner(), Arc::clone(&clock)), clock)
    }

    fn numeric_question() -> Question {
        Question::new("Q1", "D1", true, ResponseType::Numeric)
    }

    #[test]
    fn form_slot_maps_ids_from_one() {
        assert_eq!(form_slot(0), None);
        assert_eq!(form_slot(1), Some(0));
        assert_eq!(form_slot(3), Some(2));
    }

    #[test]
    fn question_indices_follow_count() {
        let (mut reg, _) = registry();
        let form = reg.create_form(&owner(), "f", "d").unwrap();
        for expected in 0..3 {
            let before = reg.form(form).unwrap().question_count();
            let index = reg
                .add_question_to_form(&owner(), form, numeric_question())
                .unwrap();
            assert_eq!(index, expected);
            assert_eq!(index, before);
            assert_eq!(reg.form(form).unwrap().question_count(), before + 1);
        }
    }

    #[test]
    fn owner_is_checked_before_form_existence() {
        let (mut reg, _) = registry();
        let err = reg
            .add_question_to_form(&alice(), 9, numeric_question())
            .unwrap_err();
        assert_eq!(err, RegistryError::NotOwner { caller: alice() });
        let err = reg
            .add_question_to_form(&owner(), 9, numeric_question())
            .unwrap_err();
        assert_eq!(err, RegistryError::FormNotFound(9));
    }

    #[test]
    fn submit_checks_form_then_responder_then_index_then_value() {
        let (mut reg, _) = registry();
        assert_eq!(
            reg.submit_response(&alice(), 1, 5, b"x").unwrap_err(),
            RegistryError::FormNotFound(1)
        );

        let form = reg.create_form(&owner(), "f", "d").unwrap();
        reg.add_question_to_form(&owner(), form, numeric_question())
            .unwrap();
        assert_eq!(
            reg.submit_response(&alice(), form, 5, b"x").unwrap_err().kind(),
            "NotAllowedResponder"
        );

        reg.add_responder(&owner(), form, alice()).unwrap();
        assert_eq!(
            reg.submit_response(&alice(), form, 5, b"x").unwrap_err(),
            RegistryError::InvalidQuestionIndex {
                form_id: form,
                index: 5,
                count: 1
            }
        );
        assert_eq!(
            reg.submit_response(&alice(), form, 0, b"x").unwrap_err().kind(),
            "InvalidValueKind"
        );
        assert!(reg.response_history(form, 0).unwrap().is_empty());
    }

    #[test]
    fn timestamps_never_go_backwards_within_a_history() {
        let (mut reg, clock) = registry();
        let form = reg.create_form(&owner(), "f", "d").unwrap();
        reg.add_question_to_form(&owner(), form, numeric_question())
            .unwrap();
        reg.add_responder(&owner(), form, alice()).unwrap();

        reg.submit_response(&alice(), form, 0, &1u64.to_be_bytes())
            .unwrap();
        clock.set(Timestamp(500));
        let receipt = reg
            .submit_response(&alice(), form, 0, &2u64.to_be_bytes())
            .unwrap();
        assert_eq!(receipt.timestamp, Timestamp(1_000));
        assert_eq!(receipt.position, 1);

        let history = reg.response_history(form, 0).unwrap();
        assert_eq!(history.timestamps, vec![Timestamp(1_000), Timestamp(1_000)]);
    }

    #[test]
    fn failed_calls_do_not_log_events() {
        let (mut reg, _) = registry();
        let _ = reg.create_form(&alice(), "f", "d");
        let _ = reg.add_responders(&owner(), 3, &[alice()]);
        assert!(reg.events().is_empty());
        assert_eq!(reg.form_count(), 0);
    }

    #[test]
    fn regranting_is_idempotent_but_logged() {
        let (mut reg, _) = registry();
        let form = reg.create_form(&owner(), "f", "d").unwrap();
        reg.add_responders(&owner(), form, &[alice(), alice()])
            .unwrap();
        reg.add_responder(&owner(), form, alice()).unwrap();
        assert_eq!(reg.form(form).unwrap().responders().count(), 1);
        assert_eq!(reg.events().named("ResponderAdded").count(), 3);
    }
}
