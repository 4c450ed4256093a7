// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Serializable registry state.
//!
//! The registry does not pick a persistence medium. [`RegistrySnapshot`] is
//! the serde model callers write wherever they like; restoring validates the
//! invariants that the live registry would otherwise guarantee by
//! construction.

use serde::{Deserialize, Serialize};

use crate::events::EventLog;
use crate::registry::{form_id_at, form_slot, Form};
use crate::{Address, Clock, FormId, Question, QuestionIndex, Registry, ResponseEntry};

/// Full registry state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// Registry owner.
    pub owner: Address,
    /// Forms in creation order.
    pub forms: Vec<FormSnapshot>,
    /// Notification log.
    #[serde(default)]
    pub events: EventLog,
}

/// One form inside a [`RegistrySnapshot`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSnapshot {
    /// Form id.
    pub id: FormId,
    /// Form title.
    pub title: String,
    /// Form description.
    pub description: String,
    /// Questions with their histories, in index order.
    pub questions: Vec<QuestionSnapshot>,
    /// Allow-list, sorted for stable output.
    pub responders: Vec<Address>,
}

/// One question with its history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSnapshot {
    /// Question definition.
    #[serde(flatten)]
    pub question: Question,
    /// Response history in submission order.
    #[serde(default)]
    pub history: Vec<ResponseEntry>,
}

/// Invariant violations found while restoring a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    /// Form ids are not dense from 1.
    #[error("[FORMS_SNAPSHOT_ID_GAP] expected form id {expected}, found {found}")]
    IdGap {
        /// Id the position requires.
        expected: FormId,
        /// Id present in the snapshot.
        found: FormId,
    },
    /// A history goes back in time.
    #[error("[FORMS_SNAPSHOT_TIME_REGRESSION] form {form_id} question {question_index} entry {position} is older than its predecessor")]
    TimeRegression {
        /// Form holding the history.
        form_id: FormId,
        /// Question holding the history.
        question_index: QuestionIndex,
        /// Offending entry.
        position: usize,
    },
    /// A stored value does not fit its question's response type.
    #[error("[FORMS_SNAPSHOT_VALUE_KIND] form {form_id} question {question_index} entry {position} does not fit the question's response type")]
    ValueKind {
        /// Form holding the history.
        form_id: FormId,
        /// Question holding the history.
        question_index: QuestionIndex,
        /// Offending entry.
        position: usize,
    },
    /// An event names a form the snapshot does not contain.
    #[error("[FORMS_SNAPSHOT_DANGLING_EVENT] event {seq} refers to missing form {form_id}")]
    DanglingEvent {
        /// Sequence number of the event.
        seq: u64,
        /// Form the event names.
        form_id: FormId,
    },
    /// Event sequence numbers are not dense from 0.
    #[error("[FORMS_SNAPSHOT_EVENT_GAP] expected event seq {expected}, found {found}")]
    EventGap {
        /// Sequence number the position requires.
        expected: u64,
        /// Sequence number present in the snapshot.
        found: u64,
    },
}

impl<C: Clock> Registry<C> {
    /// Persistable copy of the current state.
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            owner: self.owner,
            forms: self.forms.iter().map(FormSnapshot::from_form).collect(),
            events: self.events.clone(),
        }
    }

    /// Rebuild a registry from a snapshot, validating its invariants.
    pub fn from_snapshot(snapshot: RegistrySnapshot, clock: C) -> Result<Self, SnapshotError> {
        let form_count = snapshot.forms.len();
        for (expected, record) in (0u64..).zip(snapshot.events.iter()) {
            if record.seq != expected {
                return Err(SnapshotError::EventGap {
                    expected,
                    found: record.seq,
                });
            }
            let form_id = record.event.form_id();
            if form_slot(form_id).is_none_or(|slot| slot >= form_count) {
                return Err(SnapshotError::DanglingEvent {
                    seq: record.seq,
                    form_id,
                });
            }
        }

        let mut forms = Vec::with_capacity(form_count);
        for (position, form) in snapshot.forms.into_iter().enumerate() {
            let expected = form_id_at(position);
            if form.id != expected {
                return Err(SnapshotError::IdGap {
                    expected,
                    found: form.id,
                });
            }
            forms.push(form.into_form()?);
        }

        Ok(Self {
            owner: snapshot.owner,
            forms,
            events: snapshot.events,
            clock,
        })
    }
}

impl FormSnapshot {
    fn from_form(form: &Form) -> Self {
        let mut responders: Vec<Address> = form.responders.iter().copied().collect();
        responders.sort_unstable();
        Self {
            id: form.id,
            title: form.title.clone(),
            description: form.description.clone(),
            questions: form
                .questions
                .iter()
                .zip(&form.histories)
                .map(|(question, history)| QuestionSnapshot {
                    question: question.clone(),
                    history: history.clone(),
                })
                .collect(),
            responders,
        }
    }

    fn into_form(self) -> Result<Form, SnapshotError> {
        let mut form = Form::new(self.id, self.title, self.description);
        form.responders.extend(self.responders);
        for (question_index, q) in self.questions.into_iter().enumerate() {
            if let Some(position) = q
                .history
                .windows(2)
                .position(|pair| pair[1].timestamp < pair[0].timestamp)
            {
                return Err(SnapshotError::TimeRegression {
                    form_id: form.id,
                    question_index,
                    position: position + 1,
                });
            }
            if let Some(position) = q
                .history
                .iter()
                .position(|entry| !q.question.response_type.admits(&entry.value))
            {
                return Err(SnapshotError::ValueKind {
                    form_id: form.id,
                    question_index,
                    position,
                });
            }
            form.questions.push(q.question);
            form.histories.push(q.history);
        }
        Ok(form)
    }
}
