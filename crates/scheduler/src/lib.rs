//! Kiosk Scheduler Library
//!
//! Cancellation tokens and repeating timers for the kiosk display.
//!
//! Every recurring activity of the kiosk (page advancement, document reload,
//! widget refresh) is an explicit [`PeriodicTask`] that can be stopped on its
//! own or together with its siblings through a [`TimerSet`]. In-flight
//! renders are stopped cooperatively through [`CancellationToken`]s.
//!
//! # Example
//!
//! ```no_run
//! use kiosk_scheduler::{CancellationToken, TimerSet};
//! use std::time::Duration;
//!
//! # async fn demo() {
//! let timers = TimerSet::new();
//! timers.every("advance-0", Duration::from_secs(15), || {
//!     // advance slot 0
//! });
//!
//! let token = CancellationToken::new();
//! token.cancel();
//!
//! // Stop everything on shutdown
//! timers.stop_all();
//! # }
//! ```

mod cancel;
mod periodic;

// Re-export public API
pub use cancel::{CancellationRegistry, CancellationToken};
pub use periodic::{PeriodicTask, TimerId, TimerSet};
