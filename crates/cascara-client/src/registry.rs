use std::time::Duration;

use cascara_core::error::AppError;
use cascara_core::fetch::{FetchOutcome, StrategyId};
use cascara_core::traits::StrategyRegistry;

use crate::http::HttpStrategy;

/// Concrete strategy registry wiring the built-in fetch strategies.
///
/// `http` is always present. `browser` only resolves when the crate is
/// built with the `browser` feature and a [`BrowserStrategy`] has been
/// attached; otherwise it reports unavailable and the cascade skips it.
///
/// [`BrowserStrategy`]: crate::BrowserStrategy
#[derive(Clone)]
pub struct FetcherRegistry {
    http: HttpStrategy,
    #[cfg(feature = "browser")]
    browser: Option<crate::BrowserStrategy>,
    order: Vec<StrategyId>,
}

impl FetcherRegistry {
    pub fn new() -> Result<Self, AppError> {
        Ok(Self {
            http: HttpStrategy::new()?,
            #[cfg(feature = "browser")]
            browser: None,
            order: vec![StrategyId::from("http"), StrategyId::from("browser")],
        })
    }

    /// Replaces the escalation order strategies are tried in.
    pub fn with_order(mut self, order: Vec<StrategyId>) -> Self {
        self.order = order;
        self
    }

    /// Allows fetches to private/reserved IPs (local testing).
    pub fn allow_private_urls(mut self) -> Self {
        self.http = self.http.allow_private_urls();
        self
    }

    #[cfg(feature = "browser")]
    pub fn with_browser(mut self, browser: crate::BrowserStrategy) -> Self {
        self.browser = Some(browser);
        self
    }
}

impl StrategyRegistry for FetcherRegistry {
    fn default_order(&self) -> Vec<StrategyId> {
        self.order.clone()
    }

    async fn is_available(&self, strategy: &StrategyId) -> bool {
        match strategy.0.as_str() {
            "http" => true,
            #[cfg(feature = "browser")]
            "browser" => self.browser.is_some(),
            _ => false,
        }
    }

    async fn invoke(
        &self,
        strategy: &StrategyId,
        url: &str,
        timeout: Duration,
    ) -> Result<FetchOutcome, AppError> {
        match strategy.0.as_str() {
            "http" => Ok(self.http.fetch(url, timeout).await),
            #[cfg(feature = "browser")]
            "browser" => match &self.browser {
                Some(browser) => Ok(browser.fetch(url, timeout).await),
                None => Err(AppError::StrategyUnavailable(strategy.0.clone())),
            },
            _ => Err(AppError::StrategyUnavailable(strategy.0.clone())),
        }
    }
}
