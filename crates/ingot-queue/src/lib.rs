//! Ingot Queue
//!
//! The in-memory dispatch core of the Ingot control plane: pipeline
//! producers push workflow tasks, agents poll for work matching their
//! filters, and a serialised dispatcher mediates between the two while
//! tracking dependencies and execution leases.
//!
//! Everything here is volatile by design. Durability and transport live in
//! the layers wrapping this crate; the queue itself is a pure data
//! structure and control algorithm behind one mutex.

pub mod config;
pub mod fifo;
pub mod filter;
pub mod queue;

pub use config::QueueConfig;
pub use fifo::Fifo;
pub use queue::{FilterFn, Queue, QueueInfo, QueueStats};
