//! Frame synchronization signal.
//!
//! An auto-reset, single-slot condition: the producer sets it, exactly one
//! waiter consumes (and thereby clears) it. Closing the signal releases every
//! current and future waiter with [`SignalClosed`], which is how session
//! teardown unwinds the dispatch task.
//!
//! The session uses two independent instances — `capture_ready` (hardware to
//! dispatch task) and `frame_presented` (dispatch task to main loop) — so no
//! two consumers ever compete for one slot.

use std::sync::{Condvar, Mutex};

use thiserror::Error;

/// Returned from [`FrameSignal::wait`] once the signal has been closed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("frame signal closed")]
pub struct SignalClosed;

#[derive(Default)]
struct SignalState {
    set: bool,
    closed: bool,
}

pub struct FrameSignal {
    state: Mutex<SignalState>,
    cond: Condvar,
}

impl Default for FrameSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSignal {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SignalState::default()),
            cond: Condvar::new(),
        }
    }

    /// Set the signal. A single pending or future wait consumes it; multiple
    /// sets before a wait still release only one.
    pub fn signal(&self) {
        let mut state = self.state.lock().unwrap();
        state.set = true;
        self.cond.notify_one();
    }

    /// Block until the signal is set, then clear it (auto-reset) before
    /// returning. Fails once the signal has been closed.
    pub fn wait(&self) -> Result<(), SignalClosed> {
        let mut state = self.state.lock().unwrap();
        loop {
            if state.closed {
                return Err(SignalClosed);
            }
            if state.set {
                state.set = false;
                return Ok(());
            }
            state = self.cond.wait(state).unwrap();
        }
    }

    /// Non-blocking variant: consume the signal if set.
    pub fn try_wait(&self) -> Result<bool, SignalClosed> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(SignalClosed);
        }
        let was_set = state.set;
        state.set = false;
        Ok(was_set)
    }

    /// Close the signal, releasing all waiters. Irreversible.
    pub fn close(&self) {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
        self.cond.notify_all();
    }
}
