//! Allocation strategies - bump arena vs. per-object heap allocation
//!
//! Design: one [`Strategy`] trait, two implementations chosen once when the
//! allocation context is built:
//! 1. [`Arena`]: one buffer reservation per cycle, O(1) bulk reset
//! 2. [`DirectAllocator`]: one reservation per object, O(n) release
//!
//! The context is generic over the strategy, so the hot path is
//! monomorphised and never branches on which strategy is active.

mod arena;
mod direct;
mod heap;


pub use arena::{Arena, ObjectSpan};
pub use direct::{DirectAllocator, DirectHandle};
pub use heap::{GlobalHeap, Heap};

use crate::errors::{AllocError, ConfigError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which reclamation strategy a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Bump allocation from one buffer, released all at once.
    #[serde(alias = "tlab")]
    Arena,
    /// One heap block per object, released individually.
    #[serde(alias = "malloc")]
    Direct,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 2] = [StrategyKind::Arena, StrategyKind::Direct];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arena => "arena",
            Self::Direct => "direct",
        }
    }
}

impl Default for StrategyKind {
    fn default() -> Self {
        StrategyKind::Arena
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "arena" | "tlab" => Ok(Self::Arena),
            "direct" | "malloc" => Ok(Self::Direct),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

/// A source of fixed-size objects that can give them all back in one go.
///
/// Handles are the strategy's private record of an outstanding object. The
/// allocation context stores them in its tracking list and hands them back
/// to [`Strategy::reclaim`]; callers only ever see the object bytes.
pub trait Strategy {
    /// Record of one outstanding object.
    type Handle: fmt::Debug;

    const KIND: StrategyKind;

    /// Hand out one object. The returned bytes stay valid until the next
    /// reclamation.
    fn allocate(&mut self) -> Result<(Self::Handle, &mut [u8]), AllocError>;

    /// Reclaim every outstanding object.
    ///
    /// Implementations take each handle out of its slot before releasing it,
    /// so a slot is never released twice even when reclamation stops early.
    /// On failure the error names the slot whose release failed.
    ///
    /// # Safety
    ///
    /// Every `Some` handle in `outstanding` must have been produced by
    /// `allocate` on this same strategy instance and not reclaimed since.
    unsafe fn reclaim(&mut self, outstanding: &mut [Option<Self::Handle>]) -> Result<(), AllocError>;

    /// Size in bytes of every object this strategy hands out.
    fn object_size(&self) -> usize;

    /// Underlying heap reservations made so far.
    fn reservations(&self) -> u64;

    /// Underlying heap releases made so far.
    fn releases(&self) -> u64;
}
