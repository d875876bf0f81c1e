//! Task supervision for webhook reconciliation and the background loops.
//!
//! - [`dispatch`]: decodes deliveries and runs reconciliation in capped,
//!   tracked tasks
//! - [`periodic`]: the configuration reload loop and the bulk scan loop

pub mod dispatch;
pub mod periodic;

pub use dispatch::{Dispatched, Dispatcher, IgnoreReason};
pub use periodic::{join_loops, run_config_reload, run_scan_loop};
