//! # Admission Locks
//!
//! Single-admission gate keyed by message id.
//!
//! A successful `try_acquire` takes two holds: one for the code path doing
//! the admission (released once the deferred records are cleared) and one
//! for the admitted task (released by its completion handler). The lock is
//! free again only when both are gone, so a fast task cannot reopen the
//! gate while its deferred record still exists.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use shared_types::MessageId;

const HOLDS_PER_ADMISSION: u8 = 2;

#[derive(Debug, Default)]
pub struct AdmissionLocks {
    holds: DashMap<MessageId, u8>,
}

impl AdmissionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock. Returns false if another path holds it.
    pub fn try_acquire(&self, message_id: &MessageId) -> bool {
        match self.holds.entry(message_id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(HOLDS_PER_ADMISSION);
                true
            }
        }
    }

    /// Drop one hold. Unknown ids are ignored.
    pub fn release(&self, message_id: &MessageId) {
        if let Entry::Occupied(mut held) = self.holds.entry(message_id.clone()) {
            if *held.get() <= 1 {
                held.remove();
            } else {
                *held.get_mut() -= 1;
            }
        }
    }

    /// Drop every hold (admission did not happen).
    pub fn abandon(&self, message_id: &MessageId) {
        self.holds.remove(message_id);
    }

    pub fn is_held(&self, message_id: &MessageId) -> bool {
        self.holds.contains_key(message_id)
    }

    pub fn len(&self) -> usize {
        self.holds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails() {
        let locks = AdmissionLocks::new();
        let id = MessageId::from("m-1");
        assert!(locks.try_acquire(&id));
        assert!(!locks.try_acquire(&id));
    }

    #[test]
    fn test_free_after_both_holds_released() {
        let locks = AdmissionLocks::new();
        let id = MessageId::from("m-1");
        assert!(locks.try_acquire(&id));

        locks.release(&id);
        assert!(locks.is_held(&id));
        locks.release(&id);
        assert!(!locks.is_held(&id));
        assert!(locks.try_acquire(&id));
    }

    #[test]
    fn test_abandon_and_unknown_release() {
        let locks = AdmissionLocks::new();
        let id = MessageId::from("m-1");
        locks.release(&id);
        assert!(locks.is_empty());

        assert!(locks.try_acquire(&id));
        locks.abandon(&id);
        assert!(locks.is_empty());
    }
}
