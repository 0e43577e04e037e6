//! Tower middleware enforcing the limiter at HTTP ingress.
//!
//! Identity sources, in order: `X-Api-Key` (only when an upstream layer has
//! validated it and attached [`ApiKeyAttributes`]), an [`AuthenticatedUser`]
//! extension, then `X-Forwarded-For`, `X-Real-IP` and finally the socket
//! address. An unvalidated key header is ignored.
//!
//! Every response carries `X-RateLimit-{Limit,Remaining,Reset}-<Window>` and
//! `X-RateLimit-Tier`. Rejections are `429` with `Retry-After` and a JSON body.

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, HeaderMap, HeaderName, HeaderValue, Request, StatusCode},
    response::Response,
};
use rand::Rng;
use serde_json::{json, Map, Value};
use shared_types::ErrorCode;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tower::{Layer, Service};
use tracing::warn;

use crate::identifier::{ApiKeyAttributes, AuthenticatedUser, RequestIdentity};
use crate::limiter::{Decision, SlidingWindowLimiter};

/// Header carrying a raw API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Rate limit layer.
#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: Arc<SlidingWindowLimiter>,
}

impl RateLimitLayer {
    #[must_use]
    pub fn new(limiter: Arc<SlidingWindowLimiter>) -> Self {
        Self { limiter }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            limiter: Arc::clone(&self.limiter),
        }
    }
}

/// Rate limit service.
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    limiter: Arc<SlidingWindowLimiter>,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let limiter = Arc::clone(&self.limiter);
        // The clone may not be ready; swap so the polled one serves this call.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let identity = request_identity(&req);
            let decision = limiter.check(&identity).await;

            if decision.allowed {
                let mut response = inner.call(req).await?;
                apply_headers(response.headers_mut(), &decision);
                return Ok(response);
            }

            let delay = limiter.config().reject_delay.map(|delay| {
                Duration::from_millis(rand::thread_rng().gen_range(delay.min_ms..=delay.max_ms))
            });
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            warn!(
                ip = %identity.ip,
                path = %req.uri().path(),
                tier = %decision.tier,
                retry_after = decision.retry_after,
                "request rejected by rate limiter"
            );
            Ok(rejection_response(&decision))
        })
    }
}

/// Gather identity attributes from headers and upstream extensions.
#[must_use]
pub fn request_identity<B>(req: &Request<B>) -> RequestIdentity {
    let mut identity = RequestIdentity::from_ip(extract_client_ip(req));
    if let Some(user) = req.extensions().get::<AuthenticatedUser>() {
        identity = identity.with_user(*user);
    }
    let validated = req.extensions().get::<ApiKeyAttributes>().copied();
    let key = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty());
    if let (Some(attributes), Some(key)) = (validated, key) {
        identity = identity.with_api_key(key, attributes.tier);
    }
    identity
}

/// Client address: proxy headers first, then the connection.
#[must_use]
pub fn extract_client_ip<B>(req: &Request<B>) -> IpAddr {
    if let Some(forwarded) = req.headers().get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            // first hop is the original client
            if let Some(first_ip) = forwarded_str.split(',').next() {
                if let Ok(ip) = first_ip.trim().parse::<IpAddr>() {
                    return ip;
                }
            }
        }
    }

    if let Some(real_ip) = req.headers().get("x-real-ip") {
        if let Ok(real_ip_str) = real_ip.to_str() {
            if let Ok(ip) = real_ip_str.trim().parse::<IpAddr>() {
                return ip;
            }
        }
    }

    if let Some(connect_info) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return connect_info.0.ip();
    }

    IpAddr::from([127, 0, 0, 1])
}

fn set_header(headers: &mut HeaderMap, name: String, value: HeaderValue) {
    match HeaderName::try_from(name) {
        Ok(name) => {
            headers.insert(name, value);
        }
        Err(e) => warn!(error = %e, "invalid rate limit header name"),
    }
}

/// Per-window quota headers plus the tier.
pub fn apply_headers(headers: &mut HeaderMap, decision: &Decision) {
    for status in &decision.windows {
        let window = status.window.name();
        set_header(
            headers,
            format!("x-ratelimit-limit-{window}"),
            HeaderValue::from(status.limit),
        );
        set_header(
            headers,
            format!("x-ratelimit-remaining-{window}"),
            HeaderValue::from(status.remaining),
        );
        set_header(
            headers,
            format!("x-ratelimit-reset-{window}"),
            HeaderValue::from(status.reset_at),
        );
    }
    headers.insert(
        HeaderName::from_static("x-ratelimit-tier"),
        HeaderValue::from_static(decision.tier.as_str()),
    );
}

/// Structured 429.
#[must_use]
pub fn rejection_response(decision: &Decision) -> Response {
    let retry_after = decision.retry_after.unwrap_or(1);
    let mut limits = Map::new();
    let mut reset_times = Map::new();
    for status in &decision.windows {
        let window = status.window.to_string();
        limits.insert(window.clone(), Value::from(status.limit));
        reset_times.insert(window, Value::from(status.reset_at));
    }
    let body = json!({
        "success": false,
        "error_code": ErrorCode::RateLimitExceeded.as_str(),
        "message": format!("Rate limit exceeded. Retry in {retry_after} seconds."),
        "retry_after": retry_after,
        "tier": decision.tier,
        "limits": limits,
        "reset_times": reset_times,
    });

    let mut response = Response::new(Body::from(serde_json::to_vec(&body).unwrap_or_default()));
    *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
    apply_headers(headers, decision);
    response
}
