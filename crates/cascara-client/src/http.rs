use std::net::IpAddr;
use std::time::{Duration, Instant};

use cascara_core::error::AppError;
use cascara_core::fetch::{FetchOutcome, StrategyId};
use rand::prelude::IndexedRandom;
use reqwest::Client;
use url::Url;

/// Browser-like User-Agent strings, rotated per request so bulk runs do
/// not present a single fingerprint.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:127.0) Gecko/20100101 Firefox/127.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
];

/// Plain HTTP fetch strategy using reqwest.
///
/// Non-2xx responses are not errors here: the status and body are both
/// inputs to obstacle classification, so they come back as a normal
/// [`FetchOutcome`]. Only transport-level failures (DNS, connect,
/// timeout) produce a failed outcome.
///
/// By default, SSRF protection is **enabled** — requests to
/// private/reserved IP ranges are blocked. Use
/// [`allow_private_urls`](Self::allow_private_urls) to disable this for
/// local testing against a loopback server.
#[derive(Clone)]
pub struct HttpStrategy {
    id: StrategyId,
    client: Client,
    ssrf_protection: bool,
}

impl HttpStrategy {
    pub fn new() -> Result<Self, AppError> {
        let client = Client::builder()
            // per-request UA set in fetch(); this is the fallback
            .user_agent(USER_AGENTS[0])
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            id: StrategyId::from("http"),
            client,
            ssrf_protection: true,
        })
    }

    /// Disable SSRF protection, allowing requests to private/reserved IPs.
    pub fn allow_private_urls(mut self) -> Self {
        self.ssrf_protection = false;
        self
    }

    pub fn id(&self) -> &StrategyId {
        &self.id
    }

    /// Fetches the URL, folding every failure into the outcome.
    pub async fn fetch(&self, url: &str, timeout: Duration) -> FetchOutcome {
        let started = Instant::now();

        if self.ssrf_protection {
            if let Err(e) = validate_url(url).await {
                return FetchOutcome::failed(
                    self.id.clone(),
                    e.to_string(),
                    started.elapsed().as_millis() as u64,
                );
            }
        }

        let user_agent = {
            let mut rng = rand::rng();
            USER_AGENTS.choose(&mut rng).copied().unwrap_or(USER_AGENTS[0])
        };

        let response = match self
            .client
            .get(url)
            .timeout(timeout)
            .header(reqwest::header::USER_AGENT, user_agent)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let message = if e.is_timeout() {
                    format!("timed out after {}ms", timeout.as_millis())
                } else if e.is_connect() {
                    format!("connection failed: {e}")
                } else {
                    e.to_string()
                };
                return FetchOutcome::failed(
                    self.id.clone(),
                    message,
                    started.elapsed().as_millis() as u64,
                );
            }
        };

        let status = response.status().as_u16();
        match response.text().await {
            Ok(body) => FetchOutcome {
                strategy: self.id.clone(),
                status_code: Some(status),
                body,
                elapsed_ms: started.elapsed().as_millis() as u64,
                error: None,
            },
            Err(e) => FetchOutcome {
                strategy: self.id.clone(),
                status_code: Some(status),
                body: String::new(),
                elapsed_ms: started.elapsed().as_millis() as u64,
                error: Some(format!("failed to read response body: {e}")),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Validate a URL to prevent server-side request forgery (SSRF).
///
/// 1. Only allow `http` and `https` schemes.
/// 2. Resolve the hostname via DNS.
/// 3. Reject if any resolved IP is private/reserved.
async fn validate_url(url: &str) -> Result<(), AppError> {
    let parsed = Url::parse(url).map_err(|e| AppError::HttpError(format!("Invalid URL: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(AppError::HttpError(format!(
                "URL scheme '{scheme}' is not allowed (only http/https)"
            )));
        }
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| AppError::HttpError("URL has no host".to_string()))?;

    // IP literal: check directly without DNS
    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_private_ip(ip) {
            return Err(AppError::HttpError(format!(
                "SSRF blocked: {host} resolves to private/reserved IP"
            )));
        }
        return Ok(());
    }

    let port = parsed.port().unwrap_or(match parsed.scheme() {
        "https" => 443,
        _ => 80,
    });
    let addr = format!("{host}:{port}");
    let addrs: Vec<_> = tokio::net::lookup_host(&addr)
        .await
        .map_err(|e| AppError::NetworkError(format!("DNS resolution failed for {host}: {e}")))?
        .collect();

    if addrs.is_empty() {
        return Err(AppError::NetworkError(format!(
            "DNS resolution returned no addresses for {host}"
        )));
    }

    for socket_addr in &addrs {
        if is_private_ip(socket_addr.ip()) {
            return Err(AppError::HttpError(format!(
                "SSRF blocked: {host} resolves to private/reserved IP {}",
                socket_addr.ip()
            )));
        }
    }

    Ok(())
}

/// Check if an IP address is in a private/reserved/link-local range.
fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()           // 127.0.0.0/8
                || v4.is_private()     // 10/8, 172.16/12, 192.168/16
                || v4.is_link_local()  // 169.254.0.0/16 (cloud metadata!)
                || v4.is_unspecified() // 0.0.0.0
                || v4.is_broadcast()   // 255.255.255.255
                || v4.is_documentation() // 192.0.2.0/24, 198.51.100.0/24, 203.0.113.0/24
                || v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64 // 100.64.0.0/10 (CGN)
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()       // ::1
                || v6.is_unspecified() // ::
                // fe80::/10 (link-local)
                || (v6.segments()[0] & 0xFFC0) == 0xFE80
                // fc00::/7 (unique local)
                || (v6.segments()[0] & 0xFE00) == 0xFC00
                // IPv4-mapped IPv6 (::ffff:x.x.x.x) — check the embedded v4
                || match v6.to_ipv4_mapped() {
                    Some(v4) => is_private_ip(IpAddr::V4(v4)),
                    None => false,
                }
        }
    }
}
