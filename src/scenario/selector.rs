//! Scenario selection.
//!
//! # Responsibilities
//! - Walk a route's scenarios in ascending-priority groups
//! - Keep the scenarios of the first group whose rules match
//! - Pick one of them by weight
//! - Fall back to the default, then the first scenario, then a built-in
//!
//! # Design Decisions
//! - The default scenario is never a group member and never weighted
//! - Randomness comes from an injected [`RandomSource`] so tests can
//!   replay draws deterministically

use std::sync::{Mutex, OnceLock};

use axum::http::StatusCode;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::routing::table::{CompiledRoute, CompiledScenario};
use crate::scenario::rules::{self, MatchContext};

/// Source of uniformly distributed integers.
pub trait RandomSource: Send + Sync {
    /// A value in `[0, n)`. Callers never pass zero.
    fn next_below(&self, n: u64) -> u64;
}

/// Thread-local generator used in production.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_below(&self, n: u64) -> u64 {
        rand::thread_rng().gen_range(0..n)
    }
}

/// Reproducible generator for tests and replays.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_below(&self, n: u64) -> u64 {
        self.rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .gen_range(0..n)
    }
}

/// Choose the scenario answering a request.
pub fn select<'a>(
    route: &'a CompiledRoute,
    ctx: &MatchContext<'_>,
    random: &dyn RandomSource,
) -> &'a CompiledScenario {
    let groups = route.priority_order.chunk_by(|a, b| {
        route.scenarios[*a].priority == route.scenarios[*b].priority
    });

    for group in groups {
        let candidates: Vec<&CompiledScenario> = group
            .iter()
            .map(|&i| &route.scenarios[i])
            .filter(|s| rules::matches(s.rules.as_ref(), ctx))
            .collect();

        if let Some(picked) = weighted_pick(&candidates, random) {
            return picked;
        }
    }

    if let Some(default) = &route.default {
        return default;
    }
    route
        .priority_order
        .first()
        .map(|&i| &route.scenarios[i])
        .unwrap_or_else(|| fallback_scenario())
}

/// Weighted choice preserving candidate order. Non-positive weights count as 1.
pub fn weighted_pick<'a>(
    candidates: &[&'a CompiledScenario],
    random: &dyn RandomSource,
) -> Option<&'a CompiledScenario> {
    let weight = |s: &CompiledScenario| s.weight.max(1);

    let total = candidates
        .iter()
        .fold(0u64, |acc, s| acc.saturating_add(weight(*s)));
    if total == 0 {
        return None;
    }

    let draw = random.next_below(total);
    let mut acc = 0u64;
    for candidate in candidates {
        acc = acc.saturating_add(weight(*candidate));
        if draw < acc {
            return Some(*candidate);
        }
    }
    candidates.first().copied()
}

/// Served when a route has no scenarios at all.
pub fn fallback_scenario() -> &'static CompiledScenario {
    static FALLBACK: OnceLock<CompiledScenario> = OnceLock::new();
    FALLBACK.get_or_init(|| CompiledScenario {
        name: "fallback".to_string(),
        priority: i64::MAX,
        rules: None,
        status: StatusCode::OK,
        headers: Vec::new(),
        body: "{}".to_string(),
        latency_ms: 0,
        error_rate_pct: 0,
        weight: 1,
    })
}
