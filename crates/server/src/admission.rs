//! Per-client admission control for the lookup route.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use governor::clock::{Clock, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use namewatch_core::Error;

use crate::error::ApiError;

/// Token bucket per client address.
///
/// Each client may burst `requests` lookups; one slot comes back every `window`.
/// Clients are keyed by socket peer unless forwarded headers are trusted.
#[derive(Clone)]
pub struct RateLimitState {
    limiter: Arc<DefaultKeyedRateLimiter<IpAddr>>,
    burst: NonZeroU32,
    trust_forwarded: bool,
}

impl RateLimitState {
    pub fn new(requests: u32, window: Duration) -> Self {
        let burst = NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::with_period(window)
            .unwrap_or_else(|| Quota::per_minute(burst))
            .allow_burst(burst);

        Self { limiter: Arc::new(RateLimiter::keyed(quota)), burst, trust_forwarded: false }
    }

    /// Key clients by `X-Forwarded-For` / `X-Real-IP` when a proxy sets them.
    pub fn with_forwarded_headers(mut self, trust: bool) -> Self {
        self.trust_forwarded = trust;
        self
    }

    pub fn trusts_forwarded_headers(&self) -> bool {
        self.trust_forwarded
    }

    pub fn burst(&self) -> u32 {
        self.burst.get()
    }

    /// Take one slot for `client`.
    ///
    /// # Errors
    ///
    /// `Error::RateLimited` carrying the whole seconds until a slot frees up (at least 1).
    pub fn check(&self, client: IpAddr) -> Result<(), Error> {
        self.limiter.check_key(&client).map_err(|not_until| {
            let retry_after_secs = not_until
                .wait_time_from(DefaultClock::default().now())
                .as_secs()
                .max(1);
            Error::RateLimited { retry_after_secs }
        })
    }

    /// Forget clients whose buckets have fully refilled; returns how many remain tracked.
    pub fn prune(&self) -> usize {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        self.limiter.len()
    }
}

/// Originating client address.
///
/// The socket peer, unless `trust_forwarded` is set, in which case the first
/// `X-Forwarded-For` hop, then `X-Real-IP`, win over the peer.
pub fn client_ip(request: &Request, trust_forwarded: bool) -> IpAddr {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    if !trust_forwarded {
        return peer;
    }

    let headers = request.headers();

    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|h| h.to_str().ok())
        && let Some(Ok(ip)) = forwarded.split(',').next().map(|first| first.trim().parse())
    {
        return ip;
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|h| h.to_str().ok())
        && let Ok(ip) = real_ip.trim().parse()
    {
        return ip;
    }

    peer
}

/// Reject over-quota clients before the handler runs.
pub async fn rate_limit(State(state): State<RateLimitState>, request: Request, next: Next) -> Result<Response, ApiError> {
    let client = client_ip(&request, state.trusts_forwarded_headers());

    if let Err(err) = state.check(client) {
        tracing::info!(client = %client, error = %err, "request rejected by rate limiter");
        return Err(err.into());
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::routing::get;
    use tower::ServiceExt;

    fn request_with(headers: &[(&str, &str)]) -> Request {
        let mut builder = axum::http::Request::builder().uri("/api/search/foo");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn from_peer(mut req: Request, peer: [u8; 4]) -> Request {
        req.extensions_mut().insert(ConnectInfo(SocketAddr::from((peer, 4000))));
        req
    }

    fn limited_app(state: RateLimitState) -> Router {
        Router::new()
            .route("/api/search/{name}", get(|| async { "ok" }))
            .route_layer(axum::middleware::from_fn_with_state(state, rate_limit))
    }

    #[test]
    fn test_burst_then_reject() {
        let state = RateLimitState::new(10, Duration::from_secs(60));
        let client: IpAddr = "203.0.113.7".parse().unwrap();

        for i in 0..10 {
            assert!(state.check(client).is_ok(), "request {} should be admitted", i + 1);
        }
        match state.check(client) {
            Err(Error::RateLimited { retry_after_secs }) => assert!((1..=60).contains(&retry_after_secs)),
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[test]
    fn test_clients_are_independent() {
        let state = RateLimitState::new(1, Duration::from_secs(60));
        let a: IpAddr = "203.0.113.1".parse().unwrap();
        let b: IpAddr = "203.0.113.2".parse().unwrap();

        assert!(state.check(a).is_ok());
        assert!(state.check(a).is_err());
        assert!(state.check(b).is_ok());
    }

    #[test]
    fn test_zero_requests_clamped_to_one() {
        let state = RateLimitState::new(0, Duration::from_secs(60));
        assert_eq!(state.burst(), 1);
    }

    #[test]
    fn test_prune_keeps_exhausted_buckets() {
        let state = RateLimitState::new(2, Duration::from_secs(60));
        state.check("198.51.100.1".parse().unwrap()).unwrap();
        assert_eq!(state.prune(), 1);
    }

    #[test]
    fn test_client_ip_prefers_forwarded_for_when_trusted() {
        let req = from_peer(
            request_with(&[("x-forwarded-for", "198.51.100.4, 10.0.0.1"), ("x-real-ip", "192.0.2.9")]),
            [10, 0, 0, 1],
        );
        assert_eq!(client_ip(&req, true), "198.51.100.4".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_client_ip_falls_back_to_real_ip_when_trusted() {
        let req = request_with(&[("x-forwarded-for", "garbage"), ("x-real-ip", "192.0.2.9")]);
        assert_eq!(client_ip(&req, true), "192.0.2.9".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_client_ip_ignores_headers_by_default() {
        let req = from_peer(
            request_with(&[("x-forwarded-for", "198.51.100.4"), ("x-real-ip", "192.0.2.9")]),
            [192, 0, 2, 33],
        );
        assert_eq!(client_ip(&req, false), "192.0.2.33".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_client_ip_uses_peer_address() {
        let req = from_peer(request_with(&[]), [192, 0, 2, 33]);
        assert_eq!(client_ip(&req, false), "192.0.2.33".parse::<IpAddr>().unwrap());
        assert_eq!(client_ip(&req, true), "192.0.2.33".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_rotating_forwarded_for_from_one_peer_is_still_limited() {
        let app = limited_app(RateLimitState::new(10, Duration::from_secs(60)));

        let mut admitted = 0;
        for i in 0..50 {
            let forwarded = format!("10.0.0.{i}");
            let req = from_peer(request_with(&[("x-forwarded-for", forwarded.as_str())]), [192, 0, 2, 1]);
            if app.clone().oneshot(req).await.unwrap().status() == StatusCode::OK {
                admitted += 1;
            }
        }

        assert_eq!(admitted, 10);
    }

    #[tokio::test]
    async fn test_trusted_forwarded_for_keys_clients_separately() {
        let app = limited_app(RateLimitState::new(1, Duration::from_secs(60)).with_forwarded_headers(true));

        for i in 0..5 {
            let forwarded = format!("10.0.0.{i}");
            let req = from_peer(request_with(&[("x-forwarded-for", forwarded.as_str())]), [192, 0, 2, 1]);
            assert_eq!(app.clone().oneshot(req).await.unwrap().status(), StatusCode::OK);
        }

        let again = from_peer(request_with(&[("x-forwarded-for", "10.0.0.0")]), [192, 0, 2, 1]);
        assert_eq!(app.oneshot(again).await.unwrap().status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
