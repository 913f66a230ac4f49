//! Bounded event queue: (handler, opaque payload pointer) pairs pushed
//! from any context and drained once per foreground pass.

use crate::config::EVENTS_MAX;
use crate::queue::{Full, Queue};

/// A unary foreground callable taking the event's payload pointer.
pub type EventHandler = fn(*const u8);

/// A one-shot callable plus its opaque payload. The kernel only stores
/// and forwards `payload`; it never dereferences or frees it. The caller
/// guarantees `payload` outlives the drain of this event.
#[derive(Clone, Copy)]
pub struct Event {
    pub handler: EventHandler,
    pub payload: *const u8,
}

/// The bounded event queue.
pub struct EventQueue {
    queue: Queue<Event, EVENTS_MAX>,
}

impl EventQueue {
    pub const fn new() -> Self {
        Self { queue: Queue::new() }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Enqueues `event`. Fails without modifying the queue if already at
    /// `EVENTS_MAX`.
    pub fn push(&mut self, event: Event) -> Result<(), Full> {
        self.queue.push(event)
    }

    /// Invokes and removes every event present at the moment this is
    /// called — exactly one drain cycle. Events pushed by a handler
    /// during this call are left queued for the next call, so handlers
    /// cannot starve the rest of the foreground pass.
    pub fn drain(&mut self) {
        let snapshot = self.queue.len();
        for _ in 0..snapshot {
            if let Some(event) = self.queue.pop() {
                (event.handler)(event.payload);
            }
        }
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicPtr, AtomicU32, Ordering};

    static CALLS: AtomicU32 = AtomicU32::new(0);
    static LAST_PAYLOAD: AtomicPtr<u8> = AtomicPtr::new(core::ptr::null_mut());

    fn h0(payload: *const u8) {
        CALLS.fetch_add(1, Ordering::Relaxed);
        LAST_PAYLOAD.store(payload as *mut u8, Ordering::Relaxed);
    }

    fn reset() {
        CALLS.store(0, Ordering::Relaxed);
        LAST_PAYLOAD.store(core::ptr::null_mut(), Ordering::Relaxed);
    }

    #[test]
    fn scenario_s4_event_delivery() {
        reset();
        let d0: u8 = 0x12;
        let mut q = EventQueue::new();
        q.push(Event {
            handler: h0,
            payload: &d0 as *const u8,
        })
        .unwrap();

        q.drain();
        assert_eq!(CALLS.load(Ordering::Relaxed), 1);
        assert_eq!(LAST_PAYLOAD.load(Ordering::Relaxed), &d0 as *const u8 as *mut u8);

        q.drain();
        assert_eq!(CALLS.load(Ordering::Relaxed), 1); // no further invocation
    }

    #[test]
    fn push_reports_full_at_capacity() {
        let mut q = EventQueue::new();
        for _ in 0..EVENTS_MAX {
            q.push(Event {
                handler: h0,
                payload: core::ptr::null(),
            })
            .unwrap();
        }
        assert!(q.push(Event {
            handler: h0,
            payload: core::ptr::null(),
        })
        .is_err());
    }

    #[test]
    fn drain_is_bounded_to_the_snapshot_at_entry() {
        reset();
        let mut q = EventQueue::new();
        q.push(Event {
            handler: h0,
            payload: core::ptr::null(),
        })
        .unwrap();

        q.drain();
        assert_eq!(CALLS.load(Ordering::Relaxed), 1);

        // An event pushed after a drain call is left for the *next* call,
        // never retroactively serviced by the call that already returned.
        q.push(Event {
            handler: h0,
            payload: core::ptr::null(),
        })
        .unwrap();
        assert_eq!(q.len(), 1);
        assert_eq!(CALLS.load(Ordering::Relaxed), 1);
    }
}
