// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Registry error kinds.

use crate::{Address, CodecError, FormId, QuestionIndex};

/// Errors returned by registry operations.
///
/// A failed operation never mutates the registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// An owner-gated operation was called by someone else.
    #[error("[FORMS_NOT_OWNER] caller {caller} is not the owner")]
    NotOwner {
        /// The rejected caller.
        caller: Address,
    },
    /// The referenced form does not exist.
    #[error("[FORMS_FORM_NOT_FOUND] form {0} does not exist")]
    FormNotFound(FormId),
    /// The question index is outside the form's current question list.
    #[error("[FORMS_INVALID_QUESTION_INDEX] question {index} is out of range for form {form_id} ({count} questions)")]
    InvalidQuestionIndex {
        /// Target form.
        form_id: FormId,
        /// Rejected index.
        index: QuestionIndex,
        /// Number of questions the form has.
        count: usize,
    },
    /// The caller is not on the form's responder allow-list.
    #[error("[FORMS_NOT_ALLOWED_RESPONDER] {caller} is not an allowed responder for form {form_id}")]
    NotAllowedResponder {
        /// Target form.
        form_id: FormId,
        /// The rejected caller.
        caller: Address,
    },
    /// The raw payload does not fit the question's response type.
    #[error(transparent)]
    InvalidValueKind(#[from] CodecError),
}

impl RegistryError {
    /// Stable kind name, independent of the error's payload.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotOwner { .. } => "NotOwner",
            Self::FormNotFound(_) => "FormNotFound",
            Self::InvalidQuestionIndex { .. } => "InvalidQuestionIndex",
            Self::NotAllowedResponder { .. } => "NotAllowedResponder",
            Self::InvalidValueKind(_) => "InvalidValueKind",
        }
    }
}
