// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Lock-guarded registry handle for concurrent callers.
//!
//! The write lock is the serialization boundary: each mutation holds it for
//! the whole call, so mutations apply one at a time in a total order. Reads
//! share the read lock and only ever observe committed state.

use std::sync::{Arc, PoisonError, RwLock};

use crate::{
    Address, Clock, FormId, Question, QuestionIndex, Registry, RegistryError, RegistrySnapshot,
    ResponseHistory, SubmitReceipt, SystemClock,
};

/// Cloneable handle over one [`Registry`].
#[derive(Debug)]
pub struct SharedRegistry<C = SystemClock> {
    inner: Arc<RwLock<Registry<C>>>,
}

impl<C> Clone for SharedRegistry<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Clock> SharedRegistry<C> {
    /// Wrap a registry.
    pub fn new(registry: Registry<C>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(registry)),
        }
    }

    /// Run `f` against a consistent, committed view.
    pub fn read<R>(&self, f: impl FnOnce(&Registry<C>) -> R) -> R {
        // Operations are atomic per call, so a poisoned lock still guards
        // consistent state.
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// Run `f` with exclusive access.
    pub fn write<R>(&self, f: impl FnOnce(&mut Registry<C>) -> R) -> R {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// See [`Registry::create_form`].
    pub fn create_form(
        &self,
        caller: &Address,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<FormId, RegistryError> {
        self.write(|r| r.create_form(caller, title, description))
    }

    /// See [`Registry::add_question_to_form`].
    pub fn add_question_to_form(
        &self,
        caller: &Address,
        form_id: FormId,
        question: Question,
    ) -> Result<QuestionIndex, RegistryError> {
        self.write(|r| r.add_question_to_form(caller, form_id, question))
    }

    /// See [`Registry::add_responders`].
    pub fn add_responders(
        &self,
        caller: &Address,
        form_id: FormId,
        responders: &[Address],
    ) -> Result<(), RegistryError> {
        self.write(|r| r.add_responders(caller, form_id, responders))
    }

    /// See [`Registry::submit_response`].
    pub fn submit_response(
        &self,
        caller: &Address,
        form_id: FormId,
        question_index: QuestionIndex,
        raw: &[u8],
    ) -> Result<SubmitReceipt, RegistryError> {
        self.write(|r| r.submit_response(caller, form_id, question_index, raw))
    }

    /// See [`Registry::is_allowed_responder`].
    pub fn is_allowed_responder(&self, form_id: FormId, who: &Address) -> bool {
        self.read(|r| r.is_allowed_responder(form_id, who))
    }

    /// See [`Registry::response_history`].
    pub fn response_history(
        &self,
        form_id: FormId,
        question_index: QuestionIndex,
    ) -> Result<ResponseHistory, RegistryError> {
        self.read(|r| r.response_history(form_id, question_index))
    }

    /// Persistable copy of the current state.
    pub fn snapshot(&self) -> RegistrySnapshot {
        self.read(Registry::snapshot)
    }

    /// Take the registry back if this is the last handle.
    pub fn into_inner(self) -> Result<Registry<C>, Self> {
        match Arc::try_unwrap(self.inner) {
            Ok(lock) => Ok(lock.into_inner().unwrap_or_else(PoisonError::into_inner)),
            Err(inner) => Err(Self { inner }),
        }
    }
}
