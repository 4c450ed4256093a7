// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Forms registry core.
//!
//! A single owner defines forms, appends typed questions to them, and grants
//! responders per form. Granted responders append answers that accumulate into
//! an immutable, timestamped history per (form, question).
//!
//! # Identifier Policy
//!
//! Form ids are dense and start at 1: the `n`-th form ever created has id `n`.
//! Question indices are 0-based positions in their form's question list. Forms
//! and questions are never removed, so neither kind of identifier is reused.
//!
//! # Atomicity
//!
//! Every operation validates all of its preconditions before it touches state.
//! A failed call returns the specific [`RegistryError`] and leaves the registry
//! (including its [`EventLog`]) exactly as it was.
#![forbid(unsafe_code)]

mod address;
pub mod clock;
pub mod codec;
mod error;
pub mod events;
pub mod guard;
mod registry;
pub mod shared;
pub mod snapshot;

pub use address::{Address, AddressParseError};
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use codec::{decode, encode, CodecError, ResponseType, ResponseValue};
pub use error::RegistryError;
pub use events::{EventLog, EventRecord, RegistryEvent};
pub use guard::Guard;
pub use registry::{
    Form, FormDetails, Question, QuestionDetails, Registry, ResponseEntry, ResponseHistory,
    SubmitReceipt,
};
pub use shared::SharedRegistry;
pub use snapshot::{RegistrySnapshot, SnapshotError};

/// Sequential form identifier (first form is `1`).
pub type FormId = u64;

/// 0-based position of a question within its form.
pub type QuestionIndex = usize;
