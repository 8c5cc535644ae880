use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

type CancelCallback = Box<dyn FnOnce() + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CancelRegistration(u64);

#[derive(Default)]
struct TokenState {
    cancelled: AtomicBool,
    next_id: AtomicU64,
    callbacks: Mutex<Vec<(CancelRegistration, CancelCallback)>>,
}

/// Cancellation signal shared between a pick operation and the code that may
/// abort it. Callbacks registered with [`CancellationToken::on_cancel`] run
/// synchronously inside the first [`CancellationToken::cancel`] call.
#[derive(Clone, Default)]
pub struct CancellationToken {
    state: Arc<TokenState>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the token. Only the first call runs the callbacks.
    pub fn cancel(&self) {
        if self.state.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        // Callbacks run without the lock held so they may touch the token
        let callbacks = std::mem::take(&mut *self.callbacks());
        for (_, callback) in callbacks {
            callback();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
    }

    /// Runs `callback` when the token fires, or right away if it already has.
    pub fn on_cancel(&self, callback: impl FnOnce() + Send + 'static) -> CancelRegistration {
        let id = CancelRegistration(self.state.next_id.fetch_add(1, Ordering::Relaxed));
        {
            let mut callbacks = self.callbacks();
            if !self.is_cancelled() {
                callbacks.push((id, Box::new(callback)));
                return id;
            }
        }
        callback();
        id
    }

    /// Drops a callback that has not run yet. Returns false if it already ran
    /// or was removed.
    pub fn unregister(&self, id: CancelRegistration) -> bool {
        let mut callbacks = self.callbacks();
        let before = callbacks.len();
        callbacks.retain(|(existing, _)| *existing != id);
        callbacks.len() != before
    }

    pub fn callback_count(&self) -> usize {
        self.callbacks().len()
    }

    fn callbacks(&self) -> std::sync::MutexGuard<'_, Vec<(CancelRegistration, CancelCallback)>> {
        self.state.callbacks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("callbacks", &self.callback_count())
            .finish()
    }
}
