//! Per-action rate limiting keyed by client IP.
//!
//! Handlers call [`enforce`] with one of the policies below. The store is a
//! trait object on the application state; the in-memory implementation uses
//! governor keyed limiters, one per policy.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::num::NonZeroU32;
use std::time::Duration;

use axum::http::HeaderMap;
use governor::clock::{Clock, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};

use crate::error::AppError;
use crate::state::AppState;

/// Keys kept per limiter before stale entries are pruned.
const PRUNE_THRESHOLD: usize = 10_000;

/// A named limit: at most `limit` requests per `window` per client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub action: &'static str,
    pub limit: u32,
    pub window: Duration,
}

/// Order creation: 10 per minute.
pub const ORDERS_CREATE: RateLimitPolicy = RateLimitPolicy {
    action: "orders:create",
    limit: 10,
    window: Duration::from_secs(60),
};

/// Account registration: 5 per 10 minutes.
pub const AUTH_REGISTER: RateLimitPolicy = RateLimitPolicy {
    action: "auth:register",
    limit: 5,
    window: Duration::from_secs(10 * 60),
};

/// Login attempts: 10 per minute.
pub const AUTH_LOGIN: RateLimitPolicy = RateLimitPolicy {
    action: "auth:login",
    limit: 10,
    window: Duration::from_secs(60),
};

/// Admin order notes: 30 per minute.
pub const ADMIN_NOTES: RateLimitPolicy = RateLimitPolicy {
    action: "admin:notes",
    limit: 30,
    window: Duration::from_secs(60),
};

/// Every policy the storefront enforces.
pub const POLICIES: [RateLimitPolicy; 4] = [ORDERS_CREATE, AUTH_REGISTER, AUTH_LOGIN, ADMIN_NOTES];

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited { retry_after: Duration },
}

/// Storage for rate limit counters.
pub trait RateLimitStore: Send + Sync {
    /// Count one request for `key` under `policy`.
    fn check(&self, policy: &RateLimitPolicy, key: &str) -> RateLimitDecision;
}

/// In-process rate limit store. Counters are per instance.
pub struct GovernorRateLimitStore {
    limiters: HashMap<&'static str, DefaultKeyedRateLimiter<String>>,
}

impl GovernorRateLimitStore {
    /// Create a store with one limiter per policy.
    ///
    /// The burst equals the policy limit and replenishes evenly over the window.
    #[must_use]
    pub fn new(policies: &[RateLimitPolicy]) -> Self {
        let limiters = policies
            .iter()
            .filter_map(|policy| {
                let quota = quota_for(policy)?;
                Some((policy.action, RateLimiter::keyed(quota)))
            })
            .collect();

        Self { limiters }
    }
}

impl Default for GovernorRateLimitStore {
    fn default() -> Self {
        Self::new(&POLICIES)
    }
}

fn quota_for(policy: &RateLimitPolicy) -> Option<Quota> {
    let limit = NonZeroU32::new(policy.limit)?;
    let period = policy.window.checked_div(policy.limit)?;
    Some(Quota::with_period(period)?.allow_burst(limit))
}

impl RateLimitStore for GovernorRateLimitStore {
    fn check(&self, policy: &RateLimitPolicy, key: &str) -> RateLimitDecision {
        let Some(limiter) = self.limiters.get(policy.action) else {
            tracing::warn!(action = policy.action, "No limiter registered for policy");
            return RateLimitDecision::Allowed;
        };

        if limiter.len() > PRUNE_THRESHOLD {
            limiter.retain_recent();
        }

        match limiter.check_key(&key.to_string()) {
            Ok(()) => RateLimitDecision::Allowed,
            Err(not_until) => RateLimitDecision::Limited {
                retry_after: not_until.wait_time_from(DefaultClock::default().now()),
            },
        }
    }
}

/// Best-effort client IP from proxy headers.
///
/// Checks Cloudflare's `CF-Connecting-IP`, then the first `X-Forwarded-For`
/// entry, then `X-Real-IP`, then Fly.io's `Fly-Client-IP`. Falls back to
/// `0.0.0.0`, which puts all unidentified clients in one bucket.
#[must_use]
pub fn client_ip(headers: &HeaderMap) -> IpAddr {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    header("cf-connecting-ip")
        .and_then(|s| s.trim().parse().ok())
        .or_else(|| {
            header("x-forwarded-for")
                .and_then(|s| s.split(',').next())
                .and_then(|s| s.trim().parse().ok())
        })
        .or_else(|| header("x-real-ip").and_then(|s| s.trim().parse().ok()))
        .or_else(|| header("fly-client-ip").and_then(|s| s.trim().parse().ok()))
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Count a request against `policy`, keyed by `"<action>:<client ip>"`.
///
/// # Errors
///
/// Returns `AppError::RateLimited` when the client is over the limit.
pub fn enforce(
    state: &AppState,
    policy: &RateLimitPolicy,
    headers: &HeaderMap,
) -> Result<(), AppError> {
    let ip = client_ip(headers);
    let key = format!("{}:{ip}", policy.action);

    match state.rate_limiter().check(policy, &key) {
        RateLimitDecision::Allowed => Ok(()),
        RateLimitDecision::Limited { retry_after } => {
            tracing::warn!(action = policy.action, %ip, "Rate limit exceeded");
            Err(AppError::RateLimited {
                retry_after_secs: retry_after_secs(retry_after),
            })
        }
    }
}

/// Whole seconds to wait, rounded up and at least one.
fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    secs.max(1)
}
