pub mod batch;
pub mod runner;
pub mod termination;

pub use batch::{ExecutionBatch, ExecutionResult};
pub use runner::{ExecutionEngine, ExecutorConfig, DEFAULT_TIMEOUT};
