//! Benchmark driver - request, write, abandon
//!
//! Each run requests `iterations` objects from one allocation context,
//! writes the payload into each and drops the view straight away, then
//! closes the trailing cycle. The configured strategy is chosen once here;
//! everything below [`run`] is monomorphised per strategy.

mod report;

pub use report::{Comparison, RunReport};

use crate::allocator::{Arena, DirectAllocator, Strategy, StrategyKind};
use crate::config::BenchConfig;
use crate::context::{AllocationContext, ContextStats};
use crate::errors::{BenchError, Result};
use crate::logging::{log_alloc_failed, log_run_complete};
use crate::payload::Payload;
use std::time::Instant;
use tracing::{info, warn};

/// Build an arena-backed context from `config`.
pub fn arena_context(config: &BenchConfig) -> Result<AllocationContext<Arena>> {
    let arena = Arena::new(config.arena_capacity(), config.object_size);
    Ok(AllocationContext::new(arena, config.reclaim_interval)?)
}

/// Build a direct-allocation context from `config`.
pub fn direct_context(config: &BenchConfig) -> Result<AllocationContext<DirectAllocator>> {
    let direct = DirectAllocator::new(config.object_size)?;
    Ok(AllocationContext::new(direct, config.reclaim_interval)?)
}

/// Drive `ctx` for `iterations` requests, then reclaim what is left.
///
/// The first failed request aborts the run; objects already handed out are
/// not rolled back.
pub fn run<S: Strategy>(
    ctx: &mut AllocationContext<S>,
    iterations: u64,
    payload: &Payload,
) -> Result<RunReport> {
    let _span = tracing::debug_span!("run", strategy = S::KIND.as_str(), iterations).entered();
    let before = ctx.stats();
    let start = Instant::now();

    for request in 1..=iterations {
        match ctx.request_object() {
            Ok(object) => {
                payload.write_into(object);
                std::hint::black_box(object);
            }
            Err(source) => {
                log_alloc_failed(S::KIND.as_str(), request, &source);
                return Err(BenchError::Aborted { request, source });
            }
        }
    }
    ctx.finish()?;

    let elapsed = start.elapsed();
    let stats = ctx.stats().since(&before);
    log_run_complete(S::KIND.as_str(), iterations, stats.reclamations, elapsed);

    Ok(RunReport::new(
        S::KIND,
        iterations,
        ctx.strategy().object_size(),
        ctx.reclaim_interval(),
        1,
        stats,
        elapsed,
    ))
}

/// Run the strategy named in `config`.
pub fn run_config(config: &BenchConfig) -> Result<RunReport> {
    run_strategy(config, config.strategy)
}

/// Run `kind` with every other setting taken from `config`.
pub fn run_strategy(config: &BenchConfig, kind: StrategyKind) -> Result<RunReport> {
    config.validate()?;

    if kind == StrategyKind::Arena && !config.batching_is_sound() {
        warn!(
            object_size = config.object_size,
            reclaim_interval = config.reclaim_interval,
            arena_capacity = config.arena_capacity(),
            "Arena smaller than one reclamation cycle; the run will run out of space"
        );
    }

    if config.threads > 1 {
        return run_threads(config, kind);
    }

    match kind {
        StrategyKind::Arena => run(&mut arena_context(config)?, config.iterations, &config.payload),
        StrategyKind::Direct => run(&mut direct_context(config)?, config.iterations, &config.payload),
    }
}

/// Run `config.threads` independent contexts side by side, splitting the
/// iterations between them.
///
/// Each thread builds and owns its context, so arenas are never shared.
pub fn run_threads(config: &BenchConfig, kind: StrategyKind) -> Result<RunReport> {
    let threads = config.threads.max(1);
    let shares = split_iterations(config.iterations, threads);
    let start = Instant::now();

    let results: Vec<Result<RunReport>> = std::thread::scope(|scope| {
        let handles: Vec<_> = shares
            .iter()
            .map(|&share| {
                scope.spawn(move || match kind {
                    StrategyKind::Arena => run(&mut arena_context(config)?, share, &config.payload),
                    StrategyKind::Direct => run(&mut direct_context(config)?, share, &config.payload),
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect()
    });

    let mut stats = ContextStats::default();
    for result in results {
        stats.merge(&result?.stats);
    }

    Ok(RunReport::new(
        kind,
        config.iterations,
        config.object_size,
        config.reclaim_interval,
        threads,
        stats,
        start.elapsed(),
    ))
}

/// Run both strategies on the same configuration.
pub fn compare(config: &BenchConfig) -> Result<Comparison> {
    let arena = run_strategy(config, StrategyKind::Arena)?;
    let direct = run_strategy(config, StrategyKind::Direct)?;
    info!(
        arena_ns_per_object = arena.ns_per_object,
        direct_ns_per_object = direct.ns_per_object,
        "Comparison complete"
    );
    Ok(Comparison::new(arena, direct))
}

/// Split `total` as evenly as possible; earlier shares take the remainder.
fn split_iterations(total: u64, parts: usize) -> Vec<u64> {
    let parts_u64 = parts as u64;
    let base = total / parts_u64;
    let extra = total % parts_u64;
    (0..parts_u64)
        .map(|i| base + u64::from(i < extra))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(strategy: StrategyKind, iterations: u64) -> BenchConfig {
        BenchConfig {
            strategy,
            iterations,
            ..BenchConfig::default()
        }
    }

    #[test]
    fn split_iterations_covers_total() {
        assert_eq!(split_iterations(10, 3), vec![4, 3, 3]);
        assert_eq!(split_iterations(2, 4), vec![1, 1, 0, 0]);
        assert_eq!(split_iterations(9, 1), vec![9]);
    }

    #[test]
    fn run_config_uses_configured_strategy() {
        let report = run_config(&small_config(StrategyKind::Direct, 30)).unwrap();
        assert_eq!(report.strategy, StrategyKind::Direct);
        assert_eq!(report.stats.objects_allocated, 30);
        assert_eq!(report.stats.reservations, 30);
        assert_eq!(report.stats.releases, 30);
    }

    #[test]
    fn run_config_rejects_invalid_config() {
        let config = BenchConfig {
            object_size: 0,
            iterations: 1,
            ..BenchConfig::default()
        };
        assert!(matches!(run_config(&config), Err(BenchError::Config(_))));
    }

    #[test]
    fn threaded_run_sums_per_thread_cycles() {
        let config = BenchConfig {
            threads: 3,
            ..small_config(StrategyKind::Arena, 60)
        };
        let report = run_config(&config).unwrap();

        assert_eq!(report.threads, 3);
        assert_eq!(report.stats.objects_allocated, 60);
        // 20 objects per thread, two cycles each.
        assert_eq!(report.stats.reclamations, 6);
        assert_eq!(report.stats.reservations, 6);
    }

    #[test]
    fn compare_runs_both_strategies() {
        let comparison = compare(&small_config(StrategyKind::Arena, 100)).unwrap();
        assert_eq!(comparison.arena.strategy, StrategyKind::Arena);
        assert_eq!(comparison.direct.strategy, StrategyKind::Direct);
        assert_eq!(comparison.arena.stats.reservations, 10);
        assert_eq!(comparison.direct.stats.reservations, 100);
    }
}
