//! Live-message streaming: rate-limited edit-in-place with overflow
//! rollover.

mod controller;
mod limits;

pub use controller::StreamingController;
pub use limits::{EditLimiter, RateLimitConfig};
