//! Run reports and strategy comparisons

use crate::allocator::StrategyKind;
use crate::context::ContextStats;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Outcome of one completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub strategy: StrategyKind,
    pub iterations: u64,
    pub object_size: usize,
    pub reclaim_interval: usize,
    pub threads: usize,
    #[serde(flatten)]
    pub stats: ContextStats,
    pub elapsed_ns: u64,
    pub ns_per_object: f64,
}

impl RunReport {
    pub fn new(
        strategy: StrategyKind,
        iterations: u64,
        object_size: usize,
        reclaim_interval: usize,
        threads: usize,
        stats: ContextStats,
        elapsed: Duration,
    ) -> Self {
        Self {
            strategy,
            iterations,
            object_size,
            reclaim_interval,
            threads,
            stats,
            elapsed_ns: u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX),
            ns_per_object: nanos_per_object(elapsed, stats.objects_allocated),
        }
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_ns)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "strategy:       {}", self.strategy)?;
        writeln!(f, "objects:        {}", self.stats.objects_allocated)?;
        writeln!(f, "object size:    {} bytes", self.object_size)?;
        writeln!(f, "cycle length:   {} objects", self.reclaim_interval)?;
        if self.threads > 1 {
            writeln!(f, "threads:        {}", self.threads)?;
        }
        writeln!(f, "reclamations:   {}", self.stats.reclamations)?;
        writeln!(
            f,
            "heap calls:     {} reserve / {} release",
            self.stats.reservations, self.stats.releases
        )?;
        writeln!(f, "elapsed:        {:.3?}", self.elapsed())?;
        write!(f, "per object:     {:.2} ns", self.ns_per_object)
    }
}

/// Arena and direct runs over the same configuration.
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub arena: RunReport,
    pub direct: RunReport,
    /// Direct time per object divided by arena time per object; above 1.0
    /// means batching won.
    pub speedup: f64,
}

impl Comparison {
    pub fn new(arena: RunReport, direct: RunReport) -> Self {
        let speedup = if arena.ns_per_object > 0.0 {
            direct.ns_per_object / arena.ns_per_object
        } else {
            0.0
        };
        Self { arena, direct, speedup }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.arena)?;
        writeln!(f)?;
        writeln!(f, "{}", self.direct)?;
        writeln!(f)?;
        write!(f, "arena speedup:  {:.2}x", self.speedup)
    }
}

pub(crate) fn nanos_per_object(elapsed: Duration, objects: u64) -> f64 {
    if objects == 0 {
        0.0
    } else {
        elapsed.as_nanos() as f64 / objects as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(strategy: StrategyKind, objects: u64, elapsed_ns: u64) -> RunReport {
        let stats = ContextStats {
            objects_allocated: objects,
            ..ContextStats::default()
        };
        RunReport::new(strategy, objects, 10, 10, 1, stats, Duration::from_nanos(elapsed_ns))
    }

    #[test]
    fn nanos_per_object_handles_zero() {
        assert_eq!(nanos_per_object(Duration::from_nanos(100), 0), 0.0);
        assert_eq!(nanos_per_object(Duration::from_nanos(100), 4), 25.0);
    }

    #[test]
    fn speedup_is_direct_over_arena() {
        let comparison = Comparison::new(
            report(StrategyKind::Arena, 100, 1_000),
            report(StrategyKind::Direct, 100, 3_000),
        );
        assert!((comparison.speedup - 3.0).abs() < 1e-9);
    }

    #[test]
    fn report_serializes_flat_stats() {
        let json = serde_json::to_value(report(StrategyKind::Arena, 20, 400)).unwrap();
        assert_eq!(json["strategy"], "arena");
        assert_eq!(json["objects_allocated"], 20);
        assert_eq!(json["ns_per_object"], 20.0);
    }

    #[test]
    fn display_mentions_strategy_and_rate() {
        let text = report(StrategyKind::Direct, 4, 100).to_string();
        assert!(text.contains("strategy:       direct"));
        assert!(text.contains("25.00 ns"));
    }
}
