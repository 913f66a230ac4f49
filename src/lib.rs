//! A cooperative task and event scheduler for single-core microcontrollers.
//!
//! ## Overview
//!
//! The kernel drives three independent mechanisms from one foreground loop:
//!
//! - **Periodic tasks**: a static table of `(period, handler)` pairs,
//!   advanced by a tick interrupt and run to completion in the foreground.
//! - **Events**: one-shot `(handler, payload)` pairs pushed from any
//!   context (interrupt or foreground) and drained once per pass.
//! - **Messages**: a publish/subscribe router fanning typed, payload-bearing
//!   messages out to every listener registered for that type.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                    Application Code                     │
//! ├────────────────────────────────────────────────────────┤
//! │                 Kernel API (kernel.rs)                  │
//! │   init() · create_task() · push_event() · publish()     │
//! ├──────────────┬────────────────────┬───────────────────┤
//! │  Task Table  │   Event Queue      │  Message Router   │
//! │  task.rs     │   event.rs         │  message.rs       │
//! │  ─ tick()    │   ─ push()         │  ─ publish()      │
//! │  ─ run_task()│   ─ drain()        │  ─ drain()        │
//! ├──────────────┴────────────────────┴───────────────────┤
//! │              Bounded Queue (queue.rs)                    │
//! ├────────────────────────────────────────────────────────┤
//! │            Hardware Abstraction (hal.rs)                │
//! │    TickSource · InterruptController · System            │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Memory model
//!
//! - **No heap**: all state is statically allocated.
//! - **No `alloc`**: pure `core`, plus `std` under `#[cfg(test)]` only.
//! - **Fixed-size tables**: tasks, events, and listeners are each bounded
//!   by a compile-time constant in [`config`].
//! - **Critical sections**: bracketed through whatever [`hal::InterruptController`]
//!   the kernel was installed with — no fixed interrupt controller assumed.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod error;
pub mod queue;
pub mod task;
pub mod event;
pub mod message;
pub mod hal;
pub mod kernel;
