//! Obstacle (poison-pill) classifier.
//!
//! Judges whether a fetch outcome is a usable page, a block, or a dead
//! end. The checks run in a fixed priority order — patterns overlap
//! (anti-bot lists contain "rate limit"-adjacent text, login markers
//! look like paywalls), so the ordering is itself part of the contract.

use std::fmt;
use std::str::FromStr;

use regex::{RegexSet, RegexSetBuilder};
use serde::{Deserialize, Serialize};

use crate::fetch::FetchOutcome;

/// Categorical judgment of a fetch outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Usable,
    Blocked,
    Paywalled,
    RateLimited,
    AntiBot,
    Dead,
    ContentTooShort,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Usable => "usable",
            Verdict::Blocked => "blocked",
            Verdict::Paywalled => "paywalled",
            Verdict::RateLimited => "rate_limited",
            Verdict::AntiBot => "anti_bot",
            Verdict::Dead => "dead",
            Verdict::ContentTooShort => "content_too_short",
        }
    }

    pub fn is_usable(&self) -> bool {
        matches!(self, Verdict::Usable)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "usable" => Ok(Verdict::Usable),
            "blocked" => Ok(Verdict::Blocked),
            "paywalled" => Ok(Verdict::Paywalled),
            "rate_limited" => Ok(Verdict::RateLimited),
            "anti_bot" => Ok(Verdict::AntiBot),
            "dead" => Ok(Verdict::Dead),
            "content_too_short" => Ok(Verdict::ContentTooShort),
            _ => Err(format!("Unknown verdict: {s}")),
        }
    }
}

// Default pattern sets per category. Note the anti-bot set must not
// contain rate-limit phrasing — rate limiting has its own category and
// its own fallback semantics.

const ANTI_BOT_PATTERNS: &[&str] = &[
    r"cloudflare",
    r"cf-browser-verification",
    r"cf_chl_opt",
    r"cf-turnstile",
    r"g-recaptcha",
    r"h-captcha",
    r"captcha",
    r"verify\s+you\s+are\s+(a\s+)?human",
    r"access\s+denied",
    r"bot\s+detection",
];

const PAYWALL_PATTERNS: &[&str] = &[
    r"subscribe\s+to\s+(read|continue|access)",
    r"premium\s+content",
    r"members?\s+only",
    r"sign\s+in\s+to\s+read",
    r"this\s+article\s+is\s+for\s+subscribers",
    r#"class="paywall""#,
    r#"class="subscriber-only""#,
    r"data-paywall",
    r#"id="paywall""#,
];

const RATE_LIMIT_PATTERNS: &[&str] = &[
    r"rate\s*limit",
    r"too\s+many\s+requests",
    r"request\s+limit\s+exceeded",
    r"slow\s+down",
    r"try\s+again\s+(later|in\s+\d+)",
    r"temporarily\s+blocked",
    r"quota\s+exceeded",
    r"throttl(ed|ing)",
];

const DEAD_LINK_PATTERNS: &[&str] = &[
    r"page\s+not\s+found",
    r"404\s+error",
    r"404\s*[-–]\s*not\s+found",
    r"this\s+page\s+does\s?n.?t\s+exist",
    r"article\s+not\s+found",
    r"content\s+not\s+found",
    r"sorry,\s+we\s+could\s?n.?t\s+find",
    r"<title[^>]*>[^<]*(404|not\s+found)[^<]*</title>",
];

const LOGIN_PATTERNS: &[&str] = &[
    r"please\s+(log|sign)\s*in",
    r"(log|sign)\s*in\s+to\s+(view|read|continue)",
    r"create\s+an?\s+account\s+to",
    r"members?\s+only\s+content",
];

/// Injected configuration for the classifier: length threshold, blocked
/// status codes, and one compiled pattern set per category.
///
/// The classifier itself is pure and stateless — it takes this struct
/// as a parameter, never a global, so it can be unit-tested against
/// literal HTML fixtures with custom pattern sets.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Content shorter than this (in characters) is ContentTooShort,
    /// regardless of what keywords it contains.
    pub min_content_length: usize,

    /// HTTP status codes treated as Blocked (429 may be refined to
    /// RateLimited when rate-limit text is also present).
    pub blocked_status_codes: Vec<u16>,

    anti_bot: RegexSet,
    paywall: RegexSet,
    rate_limit: RegexSet,
    dead_link: RegexSet,
    login: RegexSet,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self::from_patterns(
            ANTI_BOT_PATTERNS,
            PAYWALL_PATTERNS,
            RATE_LIMIT_PATTERNS,
            DEAD_LINK_PATTERNS,
            LOGIN_PATTERNS,
        )
        .expect("default patterns must compile")
    }
}

impl ClassifierConfig {
    /// Build a config from externally supplied pattern lists.
    ///
    /// Patterns are matched case-insensitively against the raw content.
    pub fn from_patterns(
        anti_bot: &[&str],
        paywall: &[&str],
        rate_limit: &[&str],
        dead_link: &[&str],
        login: &[&str],
    ) -> Result<Self, regex::Error> {
        let compile = |patterns: &[&str]| {
            RegexSetBuilder::new(patterns)
                .case_insensitive(true)
                .build()
        };

        Ok(Self {
            min_content_length: 500,
            blocked_status_codes: vec![403, 429, 503],
            anti_bot: compile(anti_bot)?,
            paywall: compile(paywall)?,
            rate_limit: compile(rate_limit)?,
            dead_link: compile(dead_link)?,
            login: compile(login)?,
        })
    }

    pub fn with_min_content_length(mut self, min: usize) -> Self {
        self.min_content_length = min;
        self
    }

    pub fn with_blocked_status_codes(mut self, codes: Vec<u16>) -> Self {
        self.blocked_status_codes = codes;
        self
    }
}

/// Classify a fetch outcome. First match wins.
///
/// Priority order (a contract, since patterns overlap):
/// 1. no content / transport failure  → Dead
/// 2. content below minimum length    → ContentTooShort
/// 3. blocked status code             → Blocked (429 + rate-limit text → RateLimited)
/// 4. anti-bot / CAPTCHA markers      → AntiBot
/// 5. paywall markers                 → Paywalled
/// 6. rate-limit markers              → RateLimited
/// 7. dead-link / 404 markers         → Dead
/// 8. login-required markers          → Blocked
/// 9. otherwise                       → Usable
///
/// The length check deliberately precedes all text-pattern checks:
/// short error pages often contain misleading keywords.
pub fn classify(outcome: &FetchOutcome, config: &ClassifierConfig) -> Verdict {
    if outcome.is_transport_failure() {
        return Verdict::Dead;
    }

    if outcome.content_len() < config.min_content_length {
        return Verdict::ContentTooShort;
    }

    let body = &outcome.body;

    if let Some(status) = outcome.status_code
        && config.blocked_status_codes.contains(&status)
    {
        if status == 429 && config.rate_limit.is_match(body) {
            return Verdict::RateLimited;
        }
        return Verdict::Blocked;
    }

    if config.anti_bot.is_match(body) {
        return Verdict::AntiBot;
    }
    if config.paywall.is_match(body) {
        return Verdict::Paywalled;
    }
    if config.rate_limit.is_match(body) {
        return Verdict::RateLimited;
    }
    if config.dead_link.is_match(body) {
        return Verdict::Dead;
    }
    if config.login.is_match(body) {
        return Verdict::Blocked;
    }

    Verdict::Usable
}
