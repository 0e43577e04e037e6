//! # HTTP Ingress Flows
//!
//! Admission control, authentication and the structured error contract as
//! seen by a client.

#[cfg(test)]
mod tests {
    use super::super::fixtures::{config, result, TestNode, ORGANISER_TOKEN};
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use node_runtime::container::ApiKeyGrant;
    use serde_json::json;
    use tm_03_rate_limiter::{RateLimitConfig, Tier, Window, API_KEY_HEADER};
    use tower::ServiceExt;

    fn limited(limit: u64) -> node_runtime::NodeConfig {
        let mut config = config();
        config.rate_limit = RateLimitConfig::single_window(Window::Minute, limit);
        config
    }

    #[tokio::test]
    async fn test_limit_then_reject_then_recover() {
        let node = TestNode::start(limited(5)).await;

        for remaining in (0..5).rev() {
            let (status, headers, _) = node.get("/tournaments/1/standings").await;
            // Unknown tournament, but admitted.
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(headers["x-ratelimit-limit-minute"], "5");
            assert_eq!(
                headers["x-ratelimit-remaining-minute"],
                remaining.to_string().as_str()
            );
            assert_eq!(headers["x-ratelimit-tier"], "trial");
            node.clock.advance_secs(1);
        }

        let (status, headers, body) = node.get("/tournaments/1/standings").await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        let retry_after: u64 = headers["retry-after"].to_str().unwrap().parse().unwrap();
        assert_eq!(retry_after, 55);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error_code"], json!("RATE_LIMIT_EXCEEDED"));
        assert_eq!(body["retry_after"], json!(55));

        node.clock.advance_secs(55);
        let (status, _, _) = node.get("/tournaments/1/standings").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        node.stop().await;
    }

    #[tokio::test]
    async fn test_health_is_never_limited() {
        let node = TestNode::start(limited(1)).await;

        for _ in 0..5 {
            let (status, headers, body) = node.get("/health").await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["status"], json!("healthy"));
            assert!(headers.get("x-ratelimit-tier").is_none());
        }

        node.stop().await;
    }

    #[tokio::test]
    async fn test_authenticated_user_gets_own_bucket_and_tier() {
        let node = TestNode::start(limited(1)).await;

        let (status, _, _) = node.get("/tournaments/1/standings").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _, _) = node.get("/tournaments/1/standings").await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

        // Same address, but the bearer token moves the request to a user bucket.
        let (status, headers, _) = node
            .request(
                Method::GET,
                "/tournaments/1/standings",
                Some(ORGANISER_TOKEN),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(headers["x-ratelimit-tier"], "business");

        node.stop().await;
    }

    async fn get_with_key(node: &TestNode, key: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .uri("/tournaments/1/standings")
            .header(API_KEY_HEADER, key)
            .body(Body::empty())
            .unwrap();
        let response = node.router.clone().oneshot(request).await.unwrap();
        let tier = response
            .headers()
            .get("x-ratelimit-tier")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        (response.status(), tier)
    }

    #[tokio::test]
    async fn test_made_up_api_keys_do_not_escape_the_limit() {
        let mut config = limited(2);
        config.auth.api_keys = vec![ApiKeyGrant {
            key: "partner-key".to_string(),
            tier: Some(Tier::Business),
        }];
        let node = TestNode::start(config).await;

        let mut admitted = 0;
        for i in 0..10 {
            let (status, tier) = get_with_key(&node, &format!("made-up-{i}")).await;
            if status != StatusCode::TOO_MANY_REQUESTS {
                admitted += 1;
                assert_eq!(tier, "trial");
            }
        }
        assert_eq!(admitted, 2);

        // An issued key gets its own bucket and tier.
        let (status, tier) = get_with_key(&node, "partner-key").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(tier, "business");

        node.stop().await;
    }

    #[tokio::test]
    async fn test_store_outage_fails_open() {
        let node = TestNode::start(limited(1)).await;
        node.container.store.set_available(false);

        for _ in 0..3 {
            let (status, _, body) = node.get("/tournaments/1/standings").await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body["error_code"], json!("NOT_FOUND"));
        }
        assert_eq!(node.container.limiter.stats().snapshot().fail_open, 3);

        node.stop().await;
    }

    #[tokio::test]
    async fn test_writes_require_authentication() {
        let node = TestNode::start(config()).await;
        let body = serde_json::to_value(result(1, 42, 10, 20, 1, 0)).unwrap();

        let (status, _, response) = node
            .request(Method::POST, "/matches", None, Some(&body))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(response["error_code"], json!("UNAUTHORIZED"));

        let (status, _, response) = node
            .request(Method::POST, "/matches", Some("stolen"), Some(&body))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(response["success"], json!(false));

        let (status, _, _) = node
            .request(Method::POST, "/tournaments/42/recalculate", None, None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(node.container.results.is_empty());

        node.stop().await;
    }

    #[tokio::test]
    async fn test_bad_match_submissions() {
        let node = TestNode::start(config()).await;

        let (status, _, body) = node
            .request(
                Method::POST,
                "/matches",
                Some(ORGANISER_TOKEN),
                Some(&json!({"match_id": 1})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], json!("BAD_REQUEST"));

        let (status, body) = node.post_match(&result(2, 42, 10, 10, 1, 0)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], json!("BAD_REQUEST"));

        let (status, _) = node.post_match(&result(3, 42, 10, 20, 1, 0)).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let (status, body) = node.post_match(&result(3, 42, 10, 20, 1, 0)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error_code"], json!("BAD_REQUEST"));
        assert_eq!(node.container.results.len(), 1);

        let (status, _, body) = node.get("/tournaments/not-a-number/standings").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], json!("BAD_REQUEST"));

        node.stop().await;
    }

    #[tokio::test]
    async fn test_metrics_exposition() {
        let node = TestNode::start(config()).await;
        node.get("/tournaments/5/statistics").await;

        let (status, _, body) = node.get("/metrics").await;
        assert_eq!(status, StatusCode::OK);
        let text = body.as_str().unwrap();
        assert!(text.contains("tournament_http_requests_total"));
        assert!(text.contains("/tournaments/:id/statistics"));
        assert!(text.contains("rate_limiter"));

        node.stop().await;
    }
}
