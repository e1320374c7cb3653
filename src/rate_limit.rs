use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tracing::{debug, warn};

use crate::config::RateLimitConfig;
use crate::error::ApiError;

/// Per-IP request ceiling over a time window.
pub struct IpRateLimiter {
    limiter: DefaultKeyedRateLimiter<IpAddr>,
    window: Duration,
    trust_forwarded_for: bool,
}

impl IpRateLimiter {
    /// Allows at most `max_requests` per IP in any `window_secs` span. A spent
    /// allowance comes back one request per window.
    pub fn new(cfg: &RateLimitConfig) -> anyhow::Result<Self> {
        let max = NonZeroU32::new(cfg.max_requests)
            .ok_or_else(|| anyhow::anyhow!("RATE_LIMIT_MAX must be greater than zero"))?;
        let window = Duration::from_secs(cfg.window_secs.max(1));
        let quota = Quota::with_period(window)
            .ok_or_else(|| anyhow::anyhow!("rate limit window too short"))?
            .allow_burst(max);
        Ok(Self {
            limiter: RateLimiter::keyed(quota),
            window,
            trust_forwarded_for: cfg.trust_forwarded_for,
        })
    }

    pub fn check(&self, ip: IpAddr) -> bool {
        self.limiter.check_key(&ip).is_ok()
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Number of client addresses currently tracked.
    pub fn tracked(&self) -> usize {
        self.limiter.len()
    }

    /// Forgets addresses whose allowance has fully refilled.
    pub fn prune(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    fn client_ip(&self, req: &Request) -> IpAddr {
        let forwarded = self
            .trust_forwarded_for
            .then(|| {
                req.headers()
                    .get("x-forwarded-for")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.split(',').next())
                    .and_then(|ip| ip.trim().parse().ok())
            })
            .flatten();

        forwarded
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }
}

/// Prunes idle addresses once per window for as long as the server runs.
pub fn spawn_pruner(limiter: Arc<IpRateLimiter>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(limiter.window());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let before = limiter.tracked();
            limiter.prune();
            debug!(before, after = limiter.tracked(), "pruned rate limit keys");
        }
    })
}

pub async fn enforce(
    State(limiter): State<Arc<IpRateLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    let ip = limiter.client_ip(&req);
    if !limiter.check(ip) {
        warn!(ip = %ip, "rate limit exceeded");
        return ApiError::RateLimited.into_response();
    }
    next.run(req).await
}
