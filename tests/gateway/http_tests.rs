// tests/gateway/http_tests.rs

#[cfg(test)]
mod tests {
    use crate::{ScriptedCache, limiter_with, start_time};
    use quota_gate::{AppState, ForwardedOrPeer, ManualClock, server};
    use reqwest::StatusCode;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use tokio::sync::oneshot;

    struct TestServer {
        addr: SocketAddr,
        cache: Arc<ScriptedCache>,
        shutdown: Option<oneshot::Sender<()>>,
    }

    impl TestServer {
        // limit 3 per 30s, records kept 5 minutes
        async fn start() -> Self {
            let cache = Arc::new(ScriptedCache::new());
            let limiter = limiter_with(cache.clone(), ManualClock::new(start_time()), 3, 30, 5);
            let state = Arc::new(AppState::new(
                Arc::new(limiter),
                Arc::new(ForwardedOrPeer::default()),
            ));

            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let (tx, rx) = oneshot::channel::<()>();
            tokio::spawn(async move {
                server::serve(listener, state, async move {
                    let _ = rx.await;
                })
                .await
                .unwrap();
            });

            Self {
                addr,
                cache,
                shutdown: Some(tx),
            }
        }

        fn url(&self, path: &str) -> String {
            format!("http://{}{}", self.addr, path)
        }

        async fn hit(&self, forwarded_for: Option<&str>) -> reqwest::Response {
            let mut req = reqwest::Client::new().get(self.url("/rate-limiter"));
            if let Some(ip) = forwarded_for {
                req = req.header("X-Forwarded-For", ip);
            }
            req.send().await.unwrap()
        }
    }

    impl Drop for TestServer {
        fn drop(&mut self) {
            if let Some(tx) = self.shutdown.take() {
                let _ = tx.send(());
            }
        }
    }

    #[tokio::test]
    async fn admits_then_rejects() {
        let server = TestServer::start().await;

        for remaining in ["2", "1", "0"] {
            let res = server.hit(Some("192.168.1.1")).await;
            assert_eq!(res.status(), StatusCode::OK);
            assert_eq!(res.headers()["x-ratelimit-limit"], "3");
            assert_eq!(res.headers()["x-ratelimit-remaining"], remaining);
            assert_eq!(res.text().await.unwrap(), "Request allowed");
        }

        let res = server.hit(Some("192.168.1.1")).await;
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(res.headers()["retry-after"], "30");
        assert_eq!(res.text().await.unwrap(), "rate limit exceeded");
    }

    #[tokio::test]
    async fn forwarded_clients_have_separate_quotas() {
        let server = TestServer::start().await;
        for _ in 0..3 {
            server.hit(Some("192.168.1.1")).await;
        }
        assert_eq!(
            server.hit(Some("192.168.1.1")).await.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(server.hit(Some("192.168.1.2")).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn peer_address_is_used_without_header() {
        let server = TestServer::start().await;
        assert_eq!(server.hit(None).await.status(), StatusCode::OK);
        assert!(server.cache.raw("127.0.0.1").await.is_some());
    }

    #[tokio::test]
    async fn cache_failure_is_a_server_error() {
        let server = TestServer::start().await;
        server.cache.fail_gets(true);

        let res = server.hit(Some("192.168.1.1")).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.text().await.unwrap(), "Internal Server Error");
    }

    #[tokio::test]
    async fn malformed_record_is_a_server_error() {
        let server = TestServer::start().await;
        server
            .cache
            .seed("192.168.1.1", r#"{"LastSeen":"2025-01-27T18:00:02Z","Count":}"#)
            .await;

        let res = server.hit(Some("192.168.1.1")).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn reset_endpoint_reopens_quota() {
        let server = TestServer::start().await;
        for _ in 0..3 {
            server.hit(Some("192.168.1.1")).await;
        }

        let res = reqwest::Client::new()
            .delete(server.url("/rate-limiter/192.168.1.1"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert_eq!(server.hit(Some("192.168.1.1")).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_and_metrics_are_served() {
        let server = TestServer::start().await;
        server.hit(Some("192.168.1.1")).await;

        let health = reqwest::get(server.url("/health")).await.unwrap();
        assert_eq!(health.status(), StatusCode::OK);
        assert!(health.text().await.unwrap().contains("\"status\":\"healthy\""));

        let metrics = reqwest::get(server.url("/metrics")).await.unwrap();
        assert_eq!(metrics.status(), StatusCode::OK);
        assert!(
            metrics
                .text()
                .await
                .unwrap()
                .contains("quota_gate_requests_total")
        );
    }
}
