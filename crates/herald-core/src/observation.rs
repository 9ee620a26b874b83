//! Per-execution-context observation store
//!
//! Records the most recent (request, result) pair per execution context so
//! failure reporting can ask "what was the last call here?" without access
//! to the call stack that made it.
//!
//! A context is the current tokio task when there is one, otherwise the
//! current thread. Slots live in a process-wide map; a context only ever
//! writes its own slot. A thread's slot is dropped when the thread exits.
//! Task slots stay until cleared.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::thread::{self, ThreadId};

/// Key of one observation slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Task(tokio::task::Id),
    Thread(ThreadId),
}

impl Scope {
    /// The calling task, or the calling thread outside any task
    pub fn current() -> Self {
        match tokio::task::try_id() {
            Some(id) => Scope::Task(id),
            None => Scope::Thread(thread::current().id()),
        }
    }
}

impl From<ThreadId> for Scope {
    fn from(id: ThreadId) -> Self {
        Scope::Thread(id)
    }
}

impl From<tokio::task::Id> for Scope {
    fn from(id: tokio::task::Id) -> Self {
        Scope::Task(id)
    }
}

/// One completed lifecycle
#[derive(Debug, Clone, PartialEq)]
pub struct Observation<Q, R> {
    pub request: Q,
    pub result: R,
}

type Slots<Q, R> = RwLock<HashMap<Scope, Observation<Q, R>>>;

/// Cleanups run when the owning thread exits, one per store
#[derive(Default)]
struct ExitHooks(HashMap<usize, Box<dyn FnOnce()>>);

impl Drop for ExitHooks {
    fn drop(&mut self) {
        for (_, hook) in self.0.drain() {
            hook();
        }
    }
}

thread_local! {
    static EXIT_HOOKS: RefCell<ExitHooks> = RefCell::default();
}

/// "Last call" store, one slot per task or thread
pub struct ObservationStore<Q, R> {
    slots: Arc<Slots<Q, R>>,
}

impl<Q, R> fmt::Debug for ObservationStore<Q, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservationStore")
            .field("slots", &self.len())
            .finish()
    }
}

impl<Q, R> Default for ObservationStore<Q, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Q, R> ObservationStore<Q, R> {
    pub fn new() -> Self {
        Self {
            slots: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Empty the calling context's slot
    pub fn clear_current(&self) {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&Scope::current());
    }

    /// Empty every slot
    pub fn clear_all(&self) {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of contexts with a recorded observation
    pub fn len(&self) -> usize {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_slot<T>(&self, scope: Scope, f: impl FnOnce(&Observation<Q, R>) -> T) -> Option<T> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&scope)
            .map(f)
    }
}

impl<Q: 'static, R: 'static> ObservationStore<Q, R> {
    /// Overwrite the calling context's slot
    pub fn record(&self, request: Q, result: R) {
        let scope = Scope::current();
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(scope, Observation { request, result });

        if let Scope::Thread(id) = scope {
            self.remove_on_thread_exit(id);
        }
    }

    fn remove_on_thread_exit(&self, id: ThreadId) {
        let key = Arc::as_ptr(&self.slots) as usize;
        let slots: Weak<Slots<Q, R>> = Arc::downgrade(&self.slots);
        // fails only while the thread is already tearing down
        let _ = EXIT_HOOKS.try_with(|hooks| {
            hooks.borrow_mut().0.entry(key).or_insert_with(|| {
                let hook: Box<dyn FnOnce()> = Box::new(move || {
                    if let Some(slots) = slots.upgrade() {
                        slots
                            .write()
                            .unwrap_or_else(PoisonError::into_inner)
                            .remove(&Scope::Thread(id));
                    }
                });
                hook
            });
        });
    }
}

impl<Q: Clone, R: Clone> ObservationStore<Q, R> {
    /// The calling context's last observation
    pub fn last(&self) -> Option<Observation<Q, R>> {
        self.with_slot(Scope::current(), Observation::clone)
    }

    /// Another context's last observation
    pub fn last_for(&self, scope: impl Into<Scope>) -> Option<Observation<Q, R>> {
        self.with_slot(scope.into(), Observation::clone)
    }

    pub fn last_request(&self) -> Option<Q> {
        self.with_slot(Scope::current(), |o| o.request.clone())
    }

    pub fn last_result(&self) -> Option<R> {
        self.with_slot(Scope::current(), |o| o.result.clone())
    }
}
