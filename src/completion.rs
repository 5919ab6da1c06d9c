// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

use std::{
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

/// How long a power request waits for the gmux to signal completion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitPolicy {
    Bounded(Duration),
    Unbounded,
}

impl Default for WaitPolicy {
    fn default() -> Self { WaitPolicy::Bounded(Duration::from_millis(200)) }
}

#[derive(Default)]
struct Slot {
    armed: bool,
    done:  bool,
}

/// Single-slot signal resolved by the interrupt bridge when the last
/// requested power transition has finished.
///
/// Completions are only accepted while the slot is armed, so a notification
/// that arrives after its request timed out cannot satisfy a later request
/// unless that request has already been issued.
#[derive(Default)]
pub struct Completion {
    slot: Mutex<Slot>,
    cond: Condvar,
}

impl Completion {
    fn slot(&self) -> MutexGuard<'_, Slot> { self.slot.lock().unwrap_or_else(PoisonError::into_inner) }

    /// Arms the signal for a new request.
    pub fn reset(&self) {
        let mut slot = self.slot();
        slot.armed = true;
        slot.done = false;
    }

    /// Disarms the signal without resolving it.
    pub fn cancel(&self) {
        let mut slot = self.slot();
        slot.armed = false;
        slot.done = false;
    }

    /// Resolves an armed signal. Returns `false` if nothing was waiting for it.
    pub fn complete(&self) -> bool {
        let mut slot = self.slot();
        if !slot.armed {
            return false;
        }

        slot.armed = false;
        slot.done = true;
        self.cond.notify_all();
        true
    }

    /// Blocks until the signal is resolved. Returns `false` on timeout, leaving
    /// the signal disarmed.
    pub fn wait(&self, policy: WaitPolicy) -> bool {
        let slot = self.slot();
        match policy {
            WaitPolicy::Bounded(timeout) => {
                let (mut slot, _) = self
                    .cond
                    .wait_timeout_while(slot, timeout, |slot| !slot.done)
                    .unwrap_or_else(PoisonError::into_inner);

                if slot.done {
                    slot.done = false;
                    true
                } else {
                    slot.armed = false;
                    false
                }
            }
            WaitPolicy::Unbounded => {
                let mut slot = self
                    .cond
                    .wait_while(slot, |slot| !slot.done)
                    .unwrap_or_else(PoisonError::into_inner);
                slot.done = false;
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, thread, time::Instant};

    const SHORT: WaitPolicy = WaitPolicy::Bounded(Duration::from_millis(20));

    #[test]
    fn unarmed_completion_is_ignored() {
        let completion = Completion::default();
        assert!(!completion.complete());
        assert!(!completion.wait(SHORT));
    }

    #[test]
    fn completion_before_wait_is_kept() {
        let completion = Completion::default();
        completion.reset();
        assert!(completion.complete());
        assert!(completion.wait(SHORT));
    }

    #[test]
    fn bounded_wait_times_out() {
        let completion = Completion::default();
        completion.reset();

        let start = Instant::now();
        assert!(!completion.wait(SHORT));
        assert!(start.elapsed() < Duration::from_secs(2));

        // A late notification for the timed out request must not leak into the next one.
        assert!(!completion.complete());
        completion.reset();
        assert!(!completion.wait(SHORT));
    }

    #[test]
    fn completion_from_another_thread() {
        let completion = Arc::new(Completion::default());
        completion.reset();

        let notifier = {
            let completion = completion.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                completion.complete()
            })
        };

        assert!(completion.wait(WaitPolicy::Unbounded));
        assert!(notifier.join().unwrap());
    }

    #[test]
    fn cancel_disarms() {
        let completion = Completion::default();
        completion.reset();
        completion.cancel();
        assert!(!completion.complete());
    }
}
