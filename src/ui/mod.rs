//! Terminal user interface
//!
//! - `monitor` - full-screen progress view driven by installer events

pub mod monitor;

pub use monitor::{MonitorState, run_monitored};
