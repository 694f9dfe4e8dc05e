use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, warn};

use crate::classifier::{ClassifierConfig, Verdict, classify};
use crate::fetch::{FetchOutcome, StrategyId};
use crate::pacing::PacingConfig;
use crate::traits::StrategyRegistry;

/// One rung of a cascade: the strategy tried and what the classifier
/// made of its output.
#[derive(Debug, Clone, Serialize)]
pub struct CascadeAttempt {
    pub strategy: StrategyId,
    pub outcome: FetchOutcome,
    pub verdict: Verdict,
}

/// Result of running the cascade for one URL.
#[derive(Debug, Clone, Serialize)]
pub struct CascadeResult {
    pub url: String,
    pub attempts: Vec<CascadeAttempt>,
    /// Index into `attempts` of the accepted outcome, if any rung
    /// produced usable content.
    pub accepted: Option<usize>,
    pub elapsed_ms: u64,
}

impl CascadeResult {
    pub fn accepted_attempt(&self) -> Option<&CascadeAttempt> {
        self.accepted.map(|i| &self.attempts[i])
    }

    /// Verdict of the last rung tried, for failure reporting.
    pub fn last_verdict(&self) -> Option<Verdict> {
        self.attempts.last().map(|a| a.verdict)
    }

    pub fn is_exhausted(&self) -> bool {
        self.accepted.is_none()
    }
}

/// Controls whether the cascade keeps escalating after a given verdict.
///
/// The default falls through on every obstacle: a paywalled page seen
/// by plain HTTP may still render cleanly in a browser. Opting out per
/// verdict short-circuits the cascade for obstacles known to affect
/// every strategy equally (a dead link stays dead in a browser).
#[derive(Debug, Clone, Default)]
pub struct FallbackPolicy {
    stop_on: Vec<Verdict>,
}

impl FallbackPolicy {
    pub fn stop_on(mut self, verdict: Verdict) -> Self {
        if !self.stop_on.contains(&verdict) {
            self.stop_on.push(verdict);
        }
        self
    }

    pub fn should_continue(&self, verdict: Verdict) -> bool {
        !self.stop_on.contains(&verdict)
    }
}

/// Tries fetch strategies in order until one yields usable content.
///
/// Strategy invocation failures never abort the cascade: timeouts and
/// transport errors become failed outcomes classified as [`Verdict::Dead`]
/// on that rung, and the next strategy gets its turn.
#[derive(Debug, Clone)]
pub struct CascadeDispatcher<R> {
    registry: R,
    classifier: ClassifierConfig,
    policy: FallbackPolicy,
    pacing: PacingConfig,
}

impl<R: StrategyRegistry> CascadeDispatcher<R> {
    pub fn new(registry: R, classifier: ClassifierConfig) -> Self {
        Self {
            registry,
            classifier,
            policy: FallbackPolicy::default(),
            pacing: PacingConfig::disabled(),
        }
    }

    pub fn with_policy(mut self, policy: FallbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Delay window applied between rungs of one cascade.
    pub fn with_pacing(mut self, pacing: PacingConfig) -> Self {
        self.pacing = pacing;
        self
    }

    /// Runs the cascade for one URL. `order` overrides the registry's
    /// default order when non-empty. Unavailable strategies are skipped
    /// without consuming a rung.
    pub async fn fetch(
        &self,
        url: &str,
        order: Option<&[StrategyId]>,
        timeout: Duration,
    ) -> CascadeResult {
        let started = Instant::now();
        let default_order;
        let order = match order {
            Some(order) if !order.is_empty() => order,
            _ => {
                default_order = self.registry.default_order();
                &default_order
            }
        };

        let mut attempts = Vec::new();
        let mut accepted = None;

        for strategy in order {
            if !self.registry.is_available(strategy).await {
                debug!(url, strategy = %strategy, "strategy unavailable, skipping");
                continue;
            }

            if !attempts.is_empty() {
                let delay = self.pacing.sample();
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }

            let attempt_started = Instant::now();
            let outcome = match self.registry.invoke(strategy, url, timeout).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(url, strategy = %strategy, error = %e, "strategy invocation failed");
                    FetchOutcome::failed(
                        strategy.clone(),
                        e.to_string(),
                        attempt_started.elapsed().as_millis() as u64,
                    )
                }
            };

            let verdict = classify(&outcome, &self.classifier);
            debug!(
                url,
                strategy = %strategy,
                verdict = %verdict,
                status = ?outcome.status_code,
                elapsed_ms = outcome.elapsed_ms,
                "cascade attempt"
            );
            attempts.push(CascadeAttempt {
                strategy: strategy.clone(),
                outcome,
                verdict,
            });

            if verdict.is_usable() {
                accepted = Some(attempts.len() - 1);
                break;
            }
            if !self.policy.should_continue(verdict) {
                break;
            }
        }

        CascadeResult {
            url: url.to_string(),
            attempts,
            accepted,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }
}
