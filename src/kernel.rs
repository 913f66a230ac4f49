//! The scheduler kernel: state machine, tick-handler wiring, foreground
//! loop, sleep/wake coordination, and error reporting.
//!
//! [`Kernel`] is a plain, directly testable struct — construct one and
//! drive it with a [`Hal`] implementation, no global state required. The
//! free functions at the bottom of this module wrap a single process-wide
//! instance for firmware entry points, mirroring the way this crate's
//! teacher keeps a `static mut` scheduler behind a thin free-function API.

use core::sync::atomic::{AtomicU8, Ordering};

use crate::config::MessageType;
use crate::error::{debug_assert_invariant, ErrorKind};
use crate::event::{Event, EventHandler, EventQueue};
use crate::hal::{Hal, Vector};
use crate::message::{Message, MessageHandler, MessageListener, MessageRouter};
use crate::task::{TaskHandler, TaskTable};

/// The scheduler's state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SchedulerState {
    Idle = 0,
    Running = 1,
    Stopped = 2,
    Error = 3,
}

impl SchedulerState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => SchedulerState::Idle,
            1 => SchedulerState::Running,
            2 => SchedulerState::Stopped,
            _ => SchedulerState::Error,
        }
    }
}

/// The scheduler kernel. Holds the task table, event queue, message
/// router, and a reference to the HAL it was initialized with.
pub struct Kernel {
    hal: Option<&'static mut dyn Hal>,
    tasks: TaskTable,
    events: EventQueue,
    router: MessageRouter,
    wake: bool,
    state: AtomicU8,
    ms_per_tick: u16,
}

impl Kernel {
    pub const fn new() -> Self {
        Self {
            hal: None,
            tasks: TaskTable::new(),
            events: EventQueue::new(),
            router: MessageRouter::new(),
            wake: false,
            state: AtomicU8::new(SchedulerState::Idle as u8),
            ms_per_tick: 0,
        }
    }

    pub fn status(&self) -> SchedulerState {
        SchedulerState::from_u8(self.state.load(Ordering::Relaxed))
    }

    fn set_state(&self, s: SchedulerState) {
        self.state.store(s as u8, Ordering::Relaxed);
    }

    /// Latches a fatal error: transitions to `Error` and reports through
    /// the HAL's error callback exactly once per latch.
    fn latch_error(&mut self, kind: ErrorKind) {
        if self.status() != SchedulerState::Error {
            self.set_state(SchedulerState::Error);
            if let Some(hal) = self.hal.as_mut() {
                hal.on_error(kind);
            }
        }
    }

    /// Runs `f` with global interrupts disabled, re-enabling them on
    /// return. The sole critical-section primitive in this crate — every
    /// mutating path through shared task/event/message state, including
    /// the foreground drain of queues the tick interrupt also writes to,
    /// goes through here.
    fn with_critical_section<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        if let Some(hal) = self.hal.as_mut() {
            hal.disable_global();
        }
        let result = f(self);
        if let Some(hal) = self.hal.as_mut() {
            hal.enable_global();
        }
        result
    }

    /// Brings the HAL tick source up: configure interval, install the
    /// tick handler, unmask and start. Shared by [`Self::init`] and
    /// [`Self::start`].
    fn bring_up(&mut self, tick_ms: u16) {
        if let Some(hal) = self.hal.as_mut() {
            hal.set_interval(tick_ms);
            hal.set_handler(Vector::Tick, tick_handler);
            hal.enable(Vector::Tick);
            hal.start();
        }
    }

    /// Zeros the task table, configures the HAL tick source with
    /// `tick_ms`, installs the tick handler, and enters `Running`.
    /// Refuses (→ `Error`) if `tick_ms == 0` or the state is not `Idle`.
    pub fn init(&mut self, hal: &'static mut dyn Hal, tick_ms: u16) -> Result<(), ErrorKind> {
        if self.status() != SchedulerState::Idle {
            self.latch_error(ErrorKind::AccessNotPermitted);
            return Err(ErrorKind::AccessNotPermitted);
        }

        self.hal = Some(hal);

        if tick_ms == 0 {
            self.latch_error(ErrorKind::InvalidParameters);
            return Err(ErrorKind::InvalidParameters);
        }

        self.tasks = TaskTable::new();
        self.events = EventQueue::new();
        self.router = MessageRouter::new();
        self.wake = false;
        self.ms_per_tick = tick_ms;

        self.bring_up(tick_ms);
        self.set_state(SchedulerState::Running);
        Ok(())
    }

    /// Enables the tick interrupt and starts the tick source. Idempotent
    /// if already `Running`. A no-op from `Idle` or `Error`.
    pub fn start(&mut self) {
        match self.status() {
            SchedulerState::Running | SchedulerState::Stopped => {
                let tick_ms = self.ms_per_tick;
                self.bring_up(tick_ms);
                self.set_state(SchedulerState::Running);
            }
            SchedulerState::Idle | SchedulerState::Error => {}
        }
    }

    /// Stops the tick source and disables the tick interrupt. Idempotent
    /// if already `Stopped`.
    pub fn stop(&mut self) {
        match self.status() {
            SchedulerState::Running => {
                if let Some(hal) = self.hal.as_mut() {
                    hal.stop();
                    hal.disable(Vector::Tick);
                }
                self.set_state(SchedulerState::Stopped);
            }
            SchedulerState::Stopped | SchedulerState::Idle | SchedulerState::Error => {}
        }
    }

    /// Returns to `Idle`, clearing all tables and status. The only path
    /// out of `Error`.
    pub fn deinit(&mut self) {
        if let Some(hal) = self.hal.as_mut() {
            hal.stop();
            hal.disable(Vector::Tick);
        }
        self.tasks = TaskTable::new();
        self.events = EventQueue::new();
        self.router = MessageRouter::new();
        self.wake = false;
        self.ms_per_tick = 0;
        self.hal = None;
        self.set_state(SchedulerState::Idle);
    }

    pub fn task_count(&self) -> u8 {
        self.tasks.count()
    }

    pub fn task_period(&self, id: u8) -> u16 {
        self.tasks.period(id)
    }

    pub fn create_task(&mut self, period_ms: u16, handler: TaskHandler) {
        if self.status() == SchedulerState::Error {
            return;
        }
        self.with_critical_section(|k| {
            if k.tasks.create_task(period_ms, handler).is_err() {
                k.latch_error(ErrorKind::InsufficientResources);
            }
        });
    }

    pub fn delete_task(&mut self, handler: TaskHandler) {
        if self.status() == SchedulerState::Error {
            return;
        }
        self.with_critical_section(|k| k.tasks.delete_task(handler));
    }

    pub fn push_event(&mut self, handler: EventHandler, payload: *const u8) {
        if self.status() == SchedulerState::Error {
            return;
        }
        self.with_critical_section(|k| match k.events.push(Event { handler, payload }) {
            Ok(()) => {
                k.wake = true;
                if let Some(hal) = k.hal.as_mut() {
                    hal.wake_up();
                }
            }
            Err(_) => k.latch_error(ErrorKind::InsufficientResources),
        });
    }

    pub fn register_listener(&mut self, message_type: MessageType, handler: MessageHandler) {
        if self.status() == SchedulerState::Error {
            return;
        }
        self.with_critical_section(|k| {
            if k
                .router
                .register(MessageListener {
                    message_type,
                    handler,
                })
                .is_err()
            {
                k.latch_error(ErrorKind::InsufficientResources);
            }
        });
    }

    pub fn unregister_listener(&mut self, message_type: MessageType, handler: MessageHandler) {
        if self.status() == SchedulerState::Error {
            return;
        }
        self.with_critical_section(|k| {
            k.router.unregister(MessageListener {
                message_type,
                handler,
            })
        });
    }

    pub fn listener_count(&self, message_type: MessageType) -> u8 {
        self.router.listener_count(message_type)
    }

    pub fn publish(&mut self, message_type: MessageType, payload: *const u8) {
        if self.status() == SchedulerState::Error {
            return;
        }
        self.with_critical_section(|k| {
            match k.router.publish(Message {
                message_type,
                payload,
            }) {
                Ok(()) => {
                    k.wake = true;
                    if let Some(hal) = k.hal.as_mut() {
                        hal.wake_up();
                    }
                }
                Err(_) => k.latch_error(ErrorKind::InsufficientResources),
            }
        });
    }

    /// The tick ISR body: advances the tick accumulator and, if any task
    /// became pending, raises the wake flag. Mutates only `TaskStatus`
    /// entries and the wake flag — no critical section, no allocation.
    pub fn on_tick(&mut self) {
        debug_assert_invariant!(self, (self.tasks.count() as usize) <= crate::config::TASKS_MAX);
        let ms_per_tick = self.ms_per_tick;
        if self.tasks.tick(ms_per_tick) {
            self.wake = true;
            if let Some(hal) = self.hal.as_mut() {
                hal.wake_up();
            }
        }
    }

    /// One foreground pass: drain events and messages (bounded to what
    /// was present at entry), run pending tasks in ascending ID order,
    /// then sleep if the pass was fully idle.
    pub fn main_loop(&mut self) {
        let had_events = !self.events.is_empty();
        self.with_critical_section(|k| k.events.drain());

        let had_messages = self.router.pending_len() > 0;
        self.with_critical_section(|k| k.router.drain());

        let mut ran_task = false;
        let count = self.tasks.count() as usize;
        for id in 0..count {
            if self.tasks.is_pending(id) {
                self.with_critical_section(|k| k.tasks.clear_pending(id));
                self.tasks.run_task(id);
                ran_task = true;
            }
        }

        if had_events || had_messages || ran_task {
            return;
        }

        self.with_critical_section(|k| {
            if !k.wake {
                if let Some(hal) = k.hal.as_mut() {
                    hal.sleep();
                }
            }
            k.wake = false;
        });
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Process-wide singleton, for firmware entry points.
// ---------------------------------------------------------------------------

static mut KERNEL: Kernel = Kernel::new();

#[no_mangle]
pub static mut KERNEL_PTR: *mut Kernel = core::ptr::null_mut();

/// Installs `hal` and initializes the process-wide kernel instance. Must
/// be called before any other free function in this module.
pub fn init(hal: &'static mut dyn Hal, tick_ms: u16) -> Result<(), ErrorKind> {
    unsafe {
        KERNEL_PTR = core::ptr::addr_of_mut!(KERNEL);
        (*KERNEL_PTR).init(hal, tick_ms)
    }
}

pub fn deinit() {
    unsafe { (*KERNEL_PTR).deinit() }
}

pub fn start() {
    unsafe { (*KERNEL_PTR).start() }
}

pub fn stop() {
    unsafe { (*KERNEL_PTR).stop() }
}

pub fn status() -> SchedulerState {
    unsafe { (*KERNEL_PTR).status() }
}

pub fn create_task(period_ms: u16, handler: TaskHandler) {
    unsafe { (*KERNEL_PTR).create_task(period_ms, handler) }
}

pub fn delete_task(handler: TaskHandler) {
    unsafe { (*KERNEL_PTR).delete_task(handler) }
}

pub fn task_count() -> u8 {
    unsafe { (*KERNEL_PTR).task_count() }
}

pub fn task_period(id: u8) -> u16 {
    unsafe { (*KERNEL_PTR).task_period(id) }
}

pub fn push_event(handler: EventHandler, payload: *const u8) {
    unsafe { (*KERNEL_PTR).push_event(handler, payload) }
}

pub fn register_listener(message_type: MessageType, handler: MessageHandler) {
    unsafe { (*KERNEL_PTR).register_listener(message_type, handler) }
}

pub fn unregister_listener(message_type: MessageType, handler: MessageHandler) {
    unsafe { (*KERNEL_PTR).unregister_listener(message_type, handler) }
}

pub fn listener_count(message_type: MessageType) -> u8 {
    unsafe { (*KERNEL_PTR).listener_count(message_type) }
}

pub fn publish(message_type: MessageType, payload: *const u8) {
    unsafe { (*KERNEL_PTR).publish(message_type, payload) }
}

pub fn main_loop() {
    unsafe { (*KERNEL_PTR).main_loop() }
}

/// Installed into the HAL's tick vector by [`init`].
#[no_mangle]
pub extern "C" fn tick_handler() {
    unsafe { (*KERNEL_PTR).on_tick() }
}
