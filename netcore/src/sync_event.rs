//! `SyncEvent`: a condition-variable-backed one-shot/broadcast event.
//!
//! Mirrors the reusable synchronization event from the original Threads
//! library this core is ported from: a notify policy (wake one vs. wake
//! all), a reset policy (auto-clear on first successful waiter vs. manual
//! `reset()`), and an optional externally-owned flag so two events can share
//! a single boolean (used by the TCP read/close interlock).

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Who gets woken when [`SyncEvent::signal`] is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyPolicy {
    /// Wake exactly one waiter.
    One,
    /// Wake every waiter. Forces [`ResetPolicy::Manual`].
    All,
}

/// Who clears the signal after a successful wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetPolicy {
    /// The last waiter to observe the signal clears it before returning.
    Auto,
    /// The signal stays set until an explicit [`SyncEvent::reset`].
    Manual,
}

/// Shared flag storage: either an internal `bool` or caller-supplied
/// get/set accessors so two `SyncEvent`s can observe the same underlying
/// state (the connect/close interlock in `netapp::tcp::Connection` does
/// this).
enum Flag {
    Owned(bool),
    External {
        get: Box<dyn Fn() -> bool + Send>,
        set: Box<dyn Fn(bool) + Send>,
    },
}

impl Flag {
    fn get(&self) -> bool {
        match self {
            Self::Owned(b) => *b,
            Self::External { get, .. } => get(),
        }
    }

    fn set(&mut self, value: bool) {
        match self {
            Self::Owned(b) => *b = value,
            Self::External { set, .. } => set(value),
        }
    }
}

struct Inner {
    flag: Flag,
}

/// A binary event with configurable notify/reset semantics.
///
/// Operations are infallible barring OS-level panics: there is no failure
/// mode to report at this layer.
pub struct SyncEvent {
    state: Mutex<Inner>,
    condvar: Condvar,
    notify: NotifyPolicy,
    reset_policy: ResetPolicy,
}

impl SyncEvent {
    /// Create an event with internal storage for the signalled flag.
    #[must_use]
    pub fn new(notify: NotifyPolicy, reset_policy: ResetPolicy, initially_signalled: bool) -> Self {
        let reset_policy = match notify {
            NotifyPolicy::All => ResetPolicy::Manual,
            NotifyPolicy::One => reset_policy,
        };
        Self {
            state: Mutex::new(Inner {
                flag: Flag::Owned(initially_signalled),
            }),
            condvar: Condvar::new(),
            notify,
            reset_policy,
        }
    }

    /// Create an event whose signalled state is backed by external
    /// accessors instead of an owned boolean.
    pub fn with_external_flag(
        notify: NotifyPolicy,
        reset_policy: ResetPolicy,
        get: impl Fn() -> bool + Send + 'static,
        set: impl Fn(bool) + Send + 'static,
    ) -> Self {
        let reset_policy = match notify {
            NotifyPolicy::All => ResetPolicy::Manual,
            NotifyPolicy::One => reset_policy,
        };
        Self {
            state: Mutex::new(Inner {
                flag: Flag::External {
                    get: Box::new(get),
                    set: Box::new(set),
                },
            }),
            condvar: Condvar::new(),
            notify,
            reset_policy,
        }
    }

    /// Block until signalled.
    pub fn wait(&self) {
        let mut guard = self.state.lock();
        while !guard.flag.get() {
            self.condvar.wait(&mut guard);
        }
        if self.reset_policy == ResetPolicy::Auto {
            guard.flag.set(false);
        }
    }

    /// Block until signalled or `duration` elapses, whichever comes first.
    ///
    /// Returns `true` if the signal was observed before the deadline.
    pub fn wait_for(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut guard = self.state.lock();
        loop {
            if guard.flag.get() {
                if self.reset_policy == ResetPolicy::Auto {
                    guard.flag.set(false);
                }
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let timed_out = self.condvar.wait_for(&mut guard, deadline - now).timed_out();
            if timed_out && !guard.flag.get() {
                return false;
            }
        }
    }

    /// Set the flag and wake one (or all, per notify policy) waiter.
    pub fn signal(&self) {
        {
            let mut guard = self.state.lock();
            guard.flag.set(true);
        }
        match self.notify {
            NotifyPolicy::One => {
                self.condvar.notify_one();
            }
            NotifyPolicy::All => {
                self.condvar.notify_all();
            }
        }
    }

    /// Clear the flag. A no-op under [`ResetPolicy::Auto`] (the last
    /// successful waiter already cleared it).
    pub fn reset(&self) {
        if self.reset_policy == ResetPolicy::Manual {
            let mut guard = self.state.lock();
            guard.flag.set(false);
        }
    }

    /// Current signalled state without blocking.
    #[must_use]
    pub fn is_signalled(&self) -> bool {
        self.state.lock().flag.get()
    }
}
