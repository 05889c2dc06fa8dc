//! Session supervision: PTY lifecycle, bounded concurrency, the poll loop.

mod manager;
mod poll;
mod pty;
mod session;

pub use manager::{SessionSummary, Supervisor};
pub use poll::{run_poll_loop, POLL_INTERVAL};
