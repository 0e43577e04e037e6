//! Bearer authentication middleware.
//!
//! Reads `Authorization: Bearer <token>`, validates it against the
//! [`IdentityProvider`] and inserts [`AuthenticatedUser`] into the request
//! extensions for the rate limiter and handlers. Requests without the header
//! pass through anonymously; a present but unusable header is rejected.
//!
//! An `X-Api-Key` header is checked the same way. Issued keys get
//! [`ApiKeyAttributes`] attached so the limiter may bucket by key; unknown
//! keys are ignored and the caller is limited by user or address instead.

use axum::{
    body::Body,
    http::{header, Request},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tm_03_rate_limiter::{ApiKeyAttributes, AuthenticatedUser, API_KEY_HEADER};
use tower::{Layer, Service};
use tracing::{debug, warn};

use super::error::ApiError;
use crate::adapters::IdentityProvider;

/// Authentication layer
#[derive(Clone)]
pub struct AuthLayer {
    provider: Arc<dyn IdentityProvider>,
}

impl AuthLayer {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            provider: Arc::clone(&self.provider),
        }
    }
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService<S> {
    inner: S,
    provider: Arc<dyn IdentityProvider>,
}

/// Token from an `Authorization` header value, if it is a bearer credential.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

fn api_key(req: &Request<Body>) -> Option<String> {
    req.headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_owned)
}

impl<S> Service<Request<Body>> for AuthService<S>
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

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let provider = Arc::clone(&self.provider);
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            if let Some(key) = api_key(&req) {
                match provider.validate_api_key(&key).await {
                    Ok(Some(attributes)) => {
                        req.extensions_mut().insert::<ApiKeyAttributes>(attributes);
                    }
                    Ok(None) => debug!("unknown api key ignored"),
                    Err(e) => warn!(error = %e, "api key check failed"),
                }
            }

            let header = match req.headers().get(header::AUTHORIZATION) {
                None => return inner.call(req).await,
                Some(value) => value.to_str().ok().map(str::to_owned),
            };
            let Some(token) = header.as_deref().and_then(bearer_token) else {
                debug!("malformed authorization header");
                return Ok(ApiError::InvalidToken.into_response());
            };

            match provider.validate(token).await {
                Ok(Some(user)) => {
                    debug!(user = %user.id, "request authenticated");
                    req.extensions_mut().insert::<AuthenticatedUser>(user);
                    inner.call(req).await
                }
                Ok(None) => Ok(ApiError::InvalidToken.into_response()),
                Err(e) => {
                    warn!(error = %e, "identity check failed");
                    Ok(ApiError::IdentityUnavailable.into_response())
                }
            }
        })
    }
}
