// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Authorization guard.
//!
//! Pure predicates over registry state. The `is_*` reads never fail; a missing
//! form simply has no responders. The `require_*` forms turn a failed check
//! into the matching [`RegistryError`] for mutating operations.

use crate::registry::Form;
use crate::{Address, FormId, RegistryError};

/// Read-only view used to authorize callers.
#[derive(Clone, Copy, Debug)]
pub struct Guard<'a> {
    owner: &'a Address,
    forms: &'a [Form],
}

impl<'a> Guard<'a> {
    pub(crate) fn new(owner: &'a Address, forms: &'a [Form]) -> Self {
        Self { owner, forms }
    }

    /// Returns `true` iff `caller` is the registry owner.
    pub fn is_owner(&self, caller: &Address) -> bool {
        self.owner == caller
    }

    /// Returns `true` iff `caller` is on the allow-list of `form_id`.
    ///
    /// Unknown forms yield `false`, never an error.
    pub fn is_allowed_responder(&self, form_id: FormId, caller: &Address) -> bool {
        crate::registry::form_slot(form_id)
            .and_then(|slot| self.forms.get(slot))
            .is_some_and(|form| form.has_responder(caller))
    }

    /// Fails with [`RegistryError::NotOwner`] unless `caller` is the owner.
    pub fn require_owner(&self, caller: &Address) -> Result<(), RegistryError> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            Err(RegistryError::NotOwner { caller: *caller })
        }
    }

    /// Fails with [`RegistryError::NotAllowedResponder`] unless `caller` may
    /// respond to `form_id`.
    pub fn require_responder(&self, form_id: FormId, caller: &Address) -> Result<(), RegistryError> {
        if self.is_allowed_responder(form_id, caller) {
            Ok(())
        } else {
            Err(RegistryError::NotAllowedResponder {
                form_id,
                caller: *caller,
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::{Address, ManualClock, Registry, RegistryError, Timestamp};

    fn owner() -> Address {
        Address::from_low_u64(1)
    }

    #[test]
    fn owner_check_is_exact() {
        let registry = Registry::with_clock(owner(), ManualClock::new(Timestamp(0)));
        let guard = registry.guard();
        assert!(guard.is_owner(&owner()));
        assert!(!guard.is_owner(&Address::from_low_u64(2)));
        assert_eq!(
            guard.require_owner(&Address::from_low_u64(2)),
            Err(RegistryError::NotOwner {
                caller: Address::from_low_u64(2)
            })
        );
    }

    #[test]
    fn responder_check_is_false_for_missing_form() {
        let registry = Registry::with_clock(owner(), ManualClock::new(Timestamp(0)));
        let guard = registry.guard();
        assert!(!guard.is_allowed_responder(0, &owner()));
        assert!(!guard.is_allowed_responder(42, &owner()));
    }

    #[test]
    fn responder_check_follows_allow_list() {
        let mut registry = Registry::with_clock(owner(), ManualClock::new(Timestamp(0)));
        let form = registry.create_form(&owner(), "f", "").unwrap();
        let alice = Address::from_low_u64(10);
        registry.add_responder(&owner(), form, alice).unwrap();
        let guard = registry.guard();
        assert!(guard.is_allowed_responder(form, &alice));
        assert!(!guard.is_allowed_responder(form, &owner()));
        assert!(guard.require_responder(form, &alice).is_ok());
    }
}
