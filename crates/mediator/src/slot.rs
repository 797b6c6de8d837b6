use crate::error::MediatorError;
use crate::Mediator;
use std::sync::{Arc, PoisonError, RwLock, Weak};

/// Holds a collaborator's back-reference to the mediator it was registered with.
///
/// The reference is weak: the mediator owns its collaborators, so a strong handle in the other
/// direction would keep both alive forever.
#[derive(Default)]
pub struct MediatorSlot {
    inner: RwLock<Option<Weak<dyn Mediator>>>,
}

impl MediatorSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `mediator`, replacing any earlier registration.
    pub fn set(&self, mediator: Weak<dyn Mediator>) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(mediator);
    }

    /// Returns the registered mediator if it is still alive.
    pub fn get(&self) -> Result<Arc<dyn Mediator>, MediatorError> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(weak) => weak.upgrade().ok_or(MediatorError::Detached),
            None => Err(MediatorError::Unbound),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.get().is_ok()
    }
}

impl std::fmt::Debug for MediatorSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediatorSlot")
            .field("bound", &self.is_bound())
            .finish()
    }
}
