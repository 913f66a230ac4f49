//! Publish/subscribe message router: a static table of (type, handler)
//! listeners fanned out against typed, payload-bearing messages.

use crate::config::{EVENTS_MAX, LISTENERS_MAX, MessageType};
use crate::queue::{Full, Queue};

/// A unary foreground callable taking the message's payload pointer.
/// Identical signature to [`crate::event::EventHandler`].
pub type MessageHandler = fn(*const u8);

/// A registered (type, handler) subscription. Identity is the pair:
/// duplicates are silently ignored on registration.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct MessageListener {
    pub message_type: MessageType,
    pub handler: MessageHandler,
}

/// A transient published value: type plus opaque payload pointer. Not
/// stored after fan-out.
#[derive(Clone, Copy)]
pub struct Message {
    pub message_type: MessageType,
    pub payload: *const u8,
}

/// The static listener table plus the internal queue of not-yet-fanned-out
/// publications.
pub struct MessageRouter {
    listeners: [Option<MessageListener>; LISTENERS_MAX],
    count: u8,
    pending: Queue<Message, EVENTS_MAX>,
}

impl MessageRouter {
    pub const fn new() -> Self {
        Self {
            listeners: [None; LISTENERS_MAX],
            count: 0,
            pending: Queue::new(),
        }
    }

    /// Registers `handler` for `message_type`. Idempotent: re-registering
    /// the same pair is a no-op. Fails if the listener table is full.
    pub fn register(&mut self, listener: MessageListener) -> Result<(), ()> {
        let count = self.count as usize;
        if (0..count).any(|i| self.listeners[i] == Some(listener)) {
            return Ok(());
        }
        if count >= LISTENERS_MAX {
            return Err(());
        }
        self.listeners[count] = Some(listener);
        self.count += 1;
        Ok(())
    }

    /// Removes the listener registered for `(type, handler)`, if any,
    /// shifting survivors down to preserve relative order.
    pub fn unregister(&mut self, listener: MessageListener) {
        let count = self.count as usize;
        let found = (0..count).find(|&i| self.listeners[i] == Some(listener));
        let Some(pos) = found else { return };

        for i in pos..count - 1 {
            self.listeners[i] = self.listeners[i + 1];
        }
        self.listeners[count - 1] = None;
        self.count -= 1;
    }

    /// Number of listeners currently registered for `message_type`.
    pub fn listener_count(&self, message_type: MessageType) -> u8 {
        let count = self.count as usize;
        (0..count)
            .filter(|&i| self.listeners[i].map_or(false, |l| l.message_type == message_type))
            .count() as u8
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Queues `message` for fan-out on the next [`Self::drain`]. Fails
    /// without modifying the queue if the internal queue is already full.
    pub fn publish(&mut self, message: Message) -> Result<(), Full> {
        self.pending.push(message)
    }

    /// Fans out every message queued at the moment this is called —
    /// exactly one drain cycle, interleaved with (and using the same
    /// snapshot discipline as) [`crate::event::EventQueue::drain`].
    /// Every listener currently registered for a message's type is
    /// invoked once, in registration order.
    pub fn drain(&mut self) {
        let snapshot = self.pending.len();
        for _ in 0..snapshot {
            let Some(message) = self.pending.pop() else {
                break;
            };
            let count = self.count as usize;
            for i in 0..count {
                if let Some(listener) = self.listeners[i] {
                    if listener.message_type == message.message_type {
                        (listener.handler)(message.payload);
                    }
                }
            }
        }
    }
}

impl Default for MessageRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicPtr, AtomicU32, Ordering};

    static CALLS_H0: AtomicU32 = AtomicU32::new(0);
    static CALLS_H1: AtomicU32 = AtomicU32::new(0);
    static CALLS_H2: AtomicU32 = AtomicU32::new(0);
    static LAST_PAYLOAD: AtomicPtr<u8> = AtomicPtr::new(core::ptr::null_mut());

    fn h0(p: *const u8) {
        CALLS_H0.fetch_add(1, Ordering::Relaxed);
        LAST_PAYLOAD.store(p as *mut u8, Ordering::Relaxed);
    }
    fn h1(_p: *const u8) {
        CALLS_H1.fetch_add(1, Ordering::Relaxed);
    }
    fn h2(p: *const u8) {
        CALLS_H2.fetch_add(1, Ordering::Relaxed);
        LAST_PAYLOAD.store(p as *mut u8, Ordering::Relaxed);
    }

    fn reset() {
        CALLS_H0.store(0, Ordering::Relaxed);
        CALLS_H1.store(0, Ordering::Relaxed);
        CALLS_H2.store(0, Ordering::Relaxed);
        LAST_PAYLOAD.store(core::ptr::null_mut(), Ordering::Relaxed);
    }

    #[test]
    fn register_is_idempotent() {
        let mut r = MessageRouter::new();
        let listener = MessageListener {
            message_type: MessageType::System,
            handler: h0,
        };
        for _ in 0..5 {
            r.register(listener).unwrap();
        }
        assert_eq!(r.listener_count(MessageType::System), 1);
    }

    #[test]
    fn register_signals_error_when_full() {
        fn mk(handler: MessageHandler) -> MessageListener {
            MessageListener {
                message_type: MessageType::System,
                handler,
            }
        }
        fn h_a(_p: *const u8) {}
        fn h_b(_p: *const u8) {}
        fn h_c(_p: *const u8) {}
        fn h_d(_p: *const u8) {}
        fn h_e(_p: *const u8) {}
        fn h_f(_p: *const u8) {}
        fn h_g(_p: *const u8) {}
        fn h_h(_p: *const u8) {}
        fn h_i(_p: *const u8) {}
        fn h_j(_p: *const u8) {}
        fn h_k(_p: *const u8) {}
        let handlers: [MessageHandler; 11] =
            [h_a, h_b, h_c, h_d, h_e, h_f, h_g, h_h, h_i, h_j, h_k];
        assert!(handlers.len() > LISTENERS_MAX);

        let mut r = MessageRouter::new();
        for h in handlers.iter().take(LISTENERS_MAX) {
            r.register(mk(*h)).unwrap();
        }
        assert!(r.register(mk(handlers[LISTENERS_MAX])).is_err());
    }

    #[test]
    fn scenario_s5_fan_out_and_removal() {
        reset();
        let mut r = MessageRouter::new();
        let l0 = MessageListener {
            message_type: MessageType::System,
            handler: h0,
        };
        let l1 = MessageListener {
            message_type: MessageType::Sensor,
            handler: h1,
        };
        let l2 = MessageListener {
            message_type: MessageType::System,
            handler: h2,
        };
        r.register(l0).unwrap();
        r.register(l1).unwrap();
        r.register(l2).unwrap();

        assert_eq!(r.listener_count(MessageType::System), 2);
        assert_eq!(r.listener_count(MessageType::Sensor), 1);

        let d: u8 = 7;
        r.publish(Message {
            message_type: MessageType::System,
            payload: &d,
        })
        .unwrap();
        r.drain();

        assert_eq!(CALLS_H0.load(Ordering::Relaxed), 1);
        assert_eq!(CALLS_H2.load(Ordering::Relaxed), 1);
        assert_eq!(CALLS_H1.load(Ordering::Relaxed), 0);

        r.unregister(l1);
        r.publish(Message {
            message_type: MessageType::Sensor,
            payload: &d,
        })
        .unwrap();
        r.drain();

        assert_eq!(CALLS_H1.load(Ordering::Relaxed), 0);
        assert_eq!(r.listener_count(MessageType::System), 2);
        assert_eq!(r.listener_count(MessageType::Sensor), 0);
    }
}
