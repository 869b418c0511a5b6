//! Resource participants and the enlistment set.

use std::fmt;
use std::sync::Arc;

use crate::error::{ParticipantError, RollbackFailure};

/// Result of a participant hook.
pub type ParticipantResult = Result<(), ParticipantError>;

/// External state that commits or rolls back with a transaction.
///
/// A participant enlists into the current transaction before doing its work.
/// `start` runs at enlistment, then exactly one of `commit` or `rollback`
/// runs once the transaction reaches its outcome.
pub trait ResourceParticipant: Send + Sync {
    /// Name used in logs and failure reports.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn start(&self) -> ParticipantResult;

    fn commit(&self) -> ParticipantResult;

    fn rollback(&self) -> ParticipantResult;
}

/// Ordered, duplicate-free set of participants.
///
/// Membership is by instance: enlisting the same `Arc` twice is a no-op.
#[derive(Default, Clone)]
pub struct Enlistments {
    members: Vec<Arc<dyn ResourceParticipant>>,
}

impl Enlistments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, participant: &Arc<dyn ResourceParticipant>) -> bool {
        self.members.iter().any(|m| same_instance(m, participant))
    }

    /// Add a participant; returns false if it was already a member.
    pub fn insert(&mut self, participant: Arc<dyn ResourceParticipant>) -> bool {
        if self.contains(&participant) {
            return false;
        }
        self.members.push(participant);
        true
    }

    /// Move every member of `other` to the end of this set, keeping order.
    pub fn absorb(&mut self, other: Enlistments) {
        for participant in other.members {
            self.insert(participant);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ResourceParticipant>> {
        self.members.iter()
    }

    /// Commit every member in order.
    ///
    /// Returns how many committed, plus every failure. A failure does not
    /// stop the remaining members from being attempted.
    pub fn commit_all(&self) -> (usize, Vec<ParticipantError>) {
        let mut committed = 0;
        let mut failures = Vec::new();
        for participant in &self.members {
            match participant.commit() {
                Ok(()) => committed += 1,
                Err(e) => {
                    tracing::warn!(participant = participant.name(), error = %e, "participant commit failed");
                    failures.push(e);
                }
            }
        }
        (committed, failures)
    }

    /// Roll back every member once, in order, collecting every failure.
    pub fn rollback_all(&self) -> Result<(), RollbackFailure> {
        let mut failures = Vec::new();
        for participant in &self.members {
            if let Err(e) = participant.rollback() {
                tracing::warn!(participant = participant.name(), error = %e, "participant rollback failed");
                failures.push(e);
            }
        }
        match RollbackFailure::from_failures(failures) {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Enlistments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.members.iter().map(|m| m.name()))
            .finish()
    }
}

fn same_instance(a: &Arc<dyn ResourceParticipant>, b: &Arc<dyn ResourceParticipant>) -> bool {
    // Compare data pointers only; vtable pointers may differ across codegen units.
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}
