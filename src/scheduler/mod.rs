//! Scheduling of test executions across mappings.
//!
//! - **RunCoordinator**: resolves mappings, discovers tests and drives the executor
//! - **WorkerPool**: bounds the number of concurrent executions
//! - **RetryPolicy**: decides which outcomes get another attempt
//! - **OrderedBuffer**: restores discovery order of out-of-order completions
//!
//! # Architecture
//!
//! ```text
//!   names ──► MappingRegistry ──► discover ──► filter / capabilities
//!                                                     │
//!                      ┌──────────────────────────────┼──────────────────┐
//!                      ▼                              ▼                  ▼
//!                 ┌─────────┐                    ┌─────────┐        ┌─────────┐
//!                 │ slot 1  │                    │ slot 2  │        │ slot N  │
//!                 └────┬────┘                    └────┬────┘        └────┬────┘
//!                      └──────────────► OrderedBuffer ◄──────────────────┘
//!                                             │
//!                                             ▼
//!                                         RunReport
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use suite_runner::scheduler::RunCoordinator;
//! use suite_runner::runner::{RunConfig, TestExecutor};
//!
//! let config = RunConfig::new().with_workers(4).with_retries(1);
//! let executor = Arc::new(TestExecutor::from_config(&config));
//! let coordinator = RunCoordinator::new(registry, executor, config);
//! let report = coordinator.run(&["cpp", "java"], None).await?;
//! ```

pub mod coordinator;
pub mod ordered;
pub mod retry;
pub mod worker_pool;

pub use coordinator::{RunCoordinator, CANCELLED_BEFORE_START};
pub use ordered::OrderedBuffer;
pub use retry::RetryPolicy;
pub use worker_pool::{PoolError, PoolStats, WorkerPool, WorkerSlot};
