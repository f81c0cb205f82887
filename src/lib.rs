//! wrtpilot: turns natural-language requests into policy-checked OpenWrt
//! command plans and runs them with bounded timeouts.

pub mod ai;
pub mod audit;
pub mod cancel;
pub mod config;
pub mod error;
pub mod executor;
pub mod facts;
pub mod pipeline;
pub mod plan;
pub mod policy;
pub mod session;
pub mod ui;

pub use error::{ExecutionFailure, Result, WrtPilotError};
