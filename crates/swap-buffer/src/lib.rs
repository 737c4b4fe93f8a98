//! Lock-Free Triple Buffer
//!
//! Hands the most recent value from a producer thread to a consumer thread
//! without locks, blocking, or allocation after construction. Both sides
//! always hold a private slot; a third slot is in flight between them.

mod buffer;

pub use buffer::{Consumer, Producer, SwapBuffer};
