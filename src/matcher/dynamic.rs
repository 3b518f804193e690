//! Dynamic matcher (§4.2.5): Kuhn-Munkres for small inputs, Walkinshaw
//! beyond the threshold. Scores are supplied by the caller (typically the
//! dynamic scorer).

use either::Either;

use crate::combiner::Combiners;
use crate::error::Result;
use crate::graph::Graph;
use crate::matcher::{FallbackHook, KuhnMunkresMatcher, Matcher, Matching, NoFallback, WalkinshawMatcher};
use crate::scorer::Scores;

const DEFAULT_SIZE_THRESHOLD: usize = 45;

pub struct DynamicMatcher<H = NoFallback> {
    pub tau: f64,
    pub rho: f64,
    pub fallback: H,
    pub size_threshold: usize,
}

impl DynamicMatcher<NoFallback> {
    pub fn new(tau: f64, rho: f64) -> Self {
        Self {
            tau,
            rho,
            fallback: NoFallback,
            size_threshold: DEFAULT_SIZE_THRESHOLD,
        }
    }
}

impl<H> DynamicMatcher<H> {
    pub fn with_fallback(tau: f64, rho: f64, fallback: H) -> Self {
        Self {
            tau,
            rho,
            fallback,
            size_threshold: DEFAULT_SIZE_THRESHOLD,
        }
    }

    pub fn with_threshold(tau: f64, rho: f64, fallback: H, size_threshold: usize) -> Self {
        Self { tau, rho, fallback, size_threshold }
    }
}

impl<S, T, H: FallbackHook<S, T> + Clone> Matcher<S, T> for DynamicMatcher<H> {
    fn compute(&self, left: &Graph<S, T>, right: &Graph<S, T>, scores: &Scores, combiners: &Combiners<S, T>) -> Result<Matching> {
        let size = left.len().max(right.len());
        let chosen: Either<KuhnMunkresMatcher, WalkinshawMatcher<H>> = if size > self.size_threshold {
            tracing::debug!("dynamic matcher picked walkinshaw for size {size}");
            Either::Right(WalkinshawMatcher::with_fallback(self.tau, self.rho, self.fallback.clone()))
        } else {
            tracing::debug!("dynamic matcher picked kuhn-munkres for size {size}");
            Either::Left(KuhnMunkresMatcher)
        };
        match chosen {
            Either::Left(m) => m.compute(left, right, scores, combiners),
            Either::Right(m) => m.compute(left, right, scores, combiners),
        }
    }
}
