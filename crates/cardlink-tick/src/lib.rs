//! The consumer side of Cardlink: one tick, many producers.
//!
//! Network I/O happens on background tasks, but room and match state must
//! only ever be touched by a single consumer. This crate provides the two
//! pieces that make that work:
//!
//! - [`dispatch_queue`]: a producer/consumer pair per channel. Transport
//!   tasks [`enqueue`](Dispatcher::enqueue) decoded events; the consumer
//!   [`drain`](DispatchQueue::drain)s them once per tick.
//! - [`TickScheduler`]: a fixed-rate clock (default 60 Hz) that tells the
//!   consumer when to drain and how much time (`dt`) to advance timers by.
//!
//! # Integration
//!
//! ```ignore
//! let mut scheduler = TickScheduler::new(TickConfig::default());
//! loop {
//!     let tick = scheduler.wait_for_tick().await;
//!     control_queue.drain(|ev| session.handle_line_event(ev));
//!     datagram_queue.drain(|ev| session.handle_datagram_event(ev));
//!     session.tick(tick.dt);
//!     scheduler.record_tick_end();
//! }
//! ```

mod queue;
mod scheduler;

pub use queue::{DispatchQueue, Dispatcher, DrainReport, dispatch_queue};
pub use scheduler::{TickConfig, TickInfo, TickStats, TickPolicy, TickScheduler};
