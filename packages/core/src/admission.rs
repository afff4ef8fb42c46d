use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// How many builds may hold a workspace and a subprocess at the same time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AdmissionPolicy {
    #[default]
    Unbounded,
    Bounded(usize),
}

#[derive(Clone)]
pub struct Admission {
    slots: Option<Arc<Semaphore>>,
}

/// Held for the duration of one build. Dropping it frees the slot.
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: Option<OwnedSemaphorePermit>,
}

impl Admission {
    pub fn new(policy: AdmissionPolicy) -> Self {
        let slots = match policy {
            AdmissionPolicy::Unbounded => None,
            AdmissionPolicy::Bounded(limit) => Some(Arc::new(Semaphore::new(limit))),
        };
        Self { slots }
    }

    /// Waits until a slot is free. Never waits under `Unbounded`.
    pub async fn admit(&self) -> AdmissionPermit {
        let permit = match &self.slots {
            // The semaphore is never closed, so acquisition only fails if that changes.
            Some(slots) => Arc::clone(slots).acquire_owned().await.ok(),
            None => None,
        };
        AdmissionPermit { _permit: permit }
    }

    /// Free slots, or `None` when admission is unbounded.
    pub fn available(&self) -> Option<usize> {
        self.slots.as_ref().map(|s| s.available_permits())
    }
}
