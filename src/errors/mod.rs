//! Error types for allocation, configuration and the benchmark driver.

use thiserror::Error;

/// Failures surfaced by an allocation strategy or the allocation context.
///
/// None of these are recovered internally: every failure aborts the call
/// that produced it and is handed back unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    /// The arena cannot fit another object before the next reset.
    #[error("arena out of space: need {requested} bytes at offset {top}, capacity {capacity}")]
    OutOfSpace {
        /// Bytes requested by the allocation.
        requested: usize,
        /// Cursor position when the request was made.
        top: usize,
        /// Total arena capacity.
        capacity: usize,
    },

    /// The backing heap refused a reservation.
    #[error("heap reservation of {size} bytes failed")]
    OutOfMemory {
        /// Size of the refused reservation.
        size: usize,
    },

    /// A release during bulk reclamation failed; the context is now faulted.
    #[error("reclamation failed at tracked slot {slot}")]
    ReclaimFailed {
        /// Index in the tracking list of the entry whose release failed.
        slot: usize,
    },
}

impl AllocError {
    /// Short machine-readable name, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OutOfSpace { .. } => "out_of_space",
            Self::OutOfMemory { .. } => "out_of_memory",
            Self::ReclaimFailed { .. } => "reclaim_failed",
        }
    }
}

/// Fault reported by a [`Heap`](crate::allocator::Heap) when a release fails.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("heap refused to release block at {address:#x}")]
pub struct HeapFault {
    pub address: usize,
}

/// Invalid benchmark configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("object_size must be non-zero")]
    ZeroObjectSize,

    #[error("reclaim_interval must be non-zero")]
    ZeroReclaimInterval,

    #[error("payload of {payload} bytes does not fit in {object_size}-byte objects")]
    PayloadTooLarge { payload: usize, object_size: usize },

    #[error("unknown strategy '{0}' (expected 'arena' or 'direct')")]
    UnknownStrategy(String),

    #[error("unknown log level '{0}' (expected trace, debug, info, warn or error)")]
    UnknownLogLevel(String),

    #[error("failed to parse config: {0}")]
    Parse(String),
}

/// Top-level error for the driver and CLI.
#[derive(Error, Debug)]
pub enum BenchError {
    #[error(transparent)]
    Alloc(#[from] AllocError),

    /// A run stopped because object request number `request` (1-based) failed.
    #[error("run aborted at request {request}: {source}")]
    Aborted {
        request: u64,
        #[source]
        source: AllocError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode report: {0}")]
    Report(#[from] serde_json::Error),
}

impl BenchError {
    /// The allocation failure behind this error, if there is one.
    pub fn alloc_error(&self) -> Option<&AllocError> {
        match self {
            Self::Alloc(err) | Self::Aborted { source: err, .. } => Some(err),
            _ => None,
        }
    }
}

pub type Result<T, E = BenchError> = std::result::Result<T, E>;
