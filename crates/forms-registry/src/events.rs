// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Append-only log of registry lifecycle notifications.
//!
//! Operations return their generated identifiers directly; the log is the
//! secondary channel. It records every committed mutation, in commit order,
//! with dense sequence numbers starting at 0. Failed calls never append.

use serde::{Deserialize, Serialize};

use crate::{Address, FormId, QuestionIndex, Timestamp};

/// A lifecycle notification emitted by a committed mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum RegistryEvent {
    /// A form was created.
    FormCreated {
        /// Generated form id.
        form_id: FormId,
    },
    /// A question was appended to a form.
    QuestionCreated {
        /// Owning form.
        form_id: FormId,
        /// Generated question index.
        question_index: QuestionIndex,
    },
    /// A responder was granted on a form (emitted even if already granted).
    ResponderAdded {
        /// Target form.
        form_id: FormId,
        /// Granted identity.
        responder: Address,
    },
    /// A response was appended to a question's history.
    ResponseSubmitted {
        /// Target form.
        form_id: FormId,
        /// Target question.
        question_index: QuestionIndex,
        /// Submitting identity.
        responder: Address,
    },
}

impl RegistryEvent {
    /// Event name as exposed to log scanners (`"FormCreated"`, ...).
    pub const fn name(&self) -> &'static str {
        match self {
            Self::FormCreated { .. } => "FormCreated",
            Self::QuestionCreated { .. } => "QuestionCreated",
            Self::ResponderAdded { .. } => "ResponderAdded",
            Self::ResponseSubmitted { .. } => "ResponseSubmitted",
        }
    }

    /// Form the event refers to.
    pub const fn form_id(&self) -> FormId {
        match self {
            Self::FormCreated { form_id }
            | Self::QuestionCreated { form_id, .. }
            | Self::ResponderAdded { form_id, .. }
            | Self::ResponseSubmitted { form_id, .. } => *form_id,
        }
    }
}

/// One entry of the [`EventLog`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Dense sequence number (position in the log).
    pub seq: u64,
    /// Time the event was committed.
    pub at: Timestamp,
    /// The notification itself.
    #[serde(flatten)]
    pub event: RegistryEvent,
}

/// Append-only notification sink.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if nothing has been logged.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate records in commit order.
    pub fn iter(&self) -> std::slice::Iter<'_, EventRecord> {
        self.records.iter()
    }

    /// Records with `seq >= from`, in commit order.
    pub fn since(&self, from: u64) -> &[EventRecord] {
        usize::try_from(from)
            .ok()
            .and_then(|start| self.records.get(start..))
            .unwrap_or(&[])
    }

    /// Records whose event has the given name.
    pub fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a EventRecord> + 'a {
        self.records.iter().filter(move |r| r.event.name() == name)
    }

    /// Most recent record with the given name.
    pub fn last_named(&self, name: &str) -> Option<&EventRecord> {
        self.records.iter().rev().find(|r| r.event.name() == name)
    }

    pub(crate) fn append(&mut self, at: Timestamp, event: RegistryEvent) -> u64 {
        let seq = u64::try_from(self.records.len()).unwrap_or(u64::MAX);
        tracing::debug!(
            seq,
            event = event.name(),
            form_id = event.form_id(),
            "registry event"
        );
        self.records.push(EventRecord { seq, at, event });
        seq
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a EventRecord;
    type IntoIter = std::slice::Iter<'a, EventRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
