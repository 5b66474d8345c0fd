//! Suppression of trace output.
//!
//! A logger carries one [`MuteState`]: a global mute flag, a count of live
//! [`MuteGuard`]s and a set of individually muted kinds. The logger is muted
//! while the flag is set or any guard is alive. The state is shared behind
//! an `Arc`, so the session path and broker callbacks can hold the same
//! logger and suppress it from different threads; guards may be dropped in
//! any order.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::event::EventKind;

#[derive(Debug, Default)]
struct MuteInner {
    muted: AtomicBool,
    guards: AtomicUsize,
    kinds: Mutex<HashSet<EventKind>>,
}

/// Mute flag and selectively muted kinds of one logger.
#[derive(Debug, Clone, Default)]
pub struct MuteState {
    inner: Arc<MuteInner>,
}

impl MuteState {
    /// Unmuted state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether everything is muted, by the flag or by a live guard.
    pub fn is_muted(&self) -> bool {
        self.inner.muted.load(Ordering::SeqCst) || self.inner.guards.load(Ordering::SeqCst) > 0
    }

    /// Set the mute flag and return its previous value.
    ///
    /// Live guards keep the logger muted regardless of the flag.
    pub fn set_muted(&self, muted: bool) -> bool {
        self.inner.muted.swap(muted, Ordering::SeqCst)
    }

    /// Mute one kind.
    pub fn mute_kind(&self, kind: EventKind) {
        self.inner.kinds.lock().insert(kind);
    }

    /// Unmute one kind.
    pub fn unmute_kind(&self, kind: EventKind) {
        self.inner.kinds.lock().remove(&kind);
    }

    /// Kinds muted individually, sorted.
    pub fn muted_kinds(&self) -> Vec<EventKind> {
        let mut kinds: Vec<_> = self.inner.kinds.lock().iter().copied().collect();
        kinds.sort();
        kinds
    }

    /// Whether an event of `kind` would be dropped.
    pub fn suppresses(&self, kind: EventKind) -> bool {
        self.is_muted() || self.inner.kinds.lock().contains(&kind)
    }

    /// Mute until the returned guard is dropped.
    ///
    /// Guards nest and overlap: the logger stays muted until the last one
    /// is gone, and the mute flag is left untouched.
    pub fn suppress(&self) -> MuteGuard {
        self.inner.guards.fetch_add(1, Ordering::SeqCst);
        MuteGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Number of live guards.
    pub fn active_guards(&self) -> usize {
        self.inner.guards.load(Ordering::SeqCst)
    }
}

/// Keeps a logger muted until dropped.
#[derive(Debug)]
#[must_use = "the logger is unmuted again as soon as the guard is dropped"]
pub struct MuteGuard {
    inner: Arc<MuteInner>,
}

impl Drop for MuteGuard {
    fn drop(&mut self) {
        self.inner.guards.fetch_sub(1, Ordering::SeqCst);
    }
}
