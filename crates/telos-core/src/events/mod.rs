//! Typed events and the broadcast bus
//!
//! Every component emits through one bus; observers (the monitor bridge, the
//! CLI) subscribe without entering the critical path. Slow subscribers lag
//! and drop rather than block producers.

mod bus;
mod types;


pub use bus::EventBus;
pub use types::AgentEvent;
