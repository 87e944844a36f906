//! tlab-bench - batched vs. direct allocation of short-lived objects
//!
//! Compares a bump-pointer arena ("thread-local allocation buffer") that
//! reserves one buffer per reclamation cycle against one heap reservation
//! per object. Both sit behind an [`AllocationContext`] that reclaims every
//! `reclaim_interval` objects.

// Core modules
pub mod allocator;
pub mod context;
pub mod errors;
pub mod payload;

// Driver and ambient stack
pub mod bench;
pub mod config;
pub mod frontend;
pub mod logging;

// Re-export commonly used items
pub use allocator::{Arena, DirectAllocator, GlobalHeap, Heap, ObjectSpan, Strategy, StrategyKind};
pub use bench::{compare, run, run_config, Comparison, RunReport};
pub use config::BenchConfig;
pub use context::{AllocationContext, ContextState, ContextStats};
pub use errors::{AllocError, BenchError, ConfigError, HeapFault};
pub use logging::{init_logging, LogConfig, LogFormat, LogOutput};
pub use payload::Payload;
