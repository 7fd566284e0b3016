use std::collections::BTreeMap;
use std::time::Duration;

use jobscout_core::{Error, FetchBackend, FetchRequest, FetchResponse, Result};

pub mod embed;
pub mod extract;
pub mod filter;
pub mod intent;
pub mod pipeline;
pub mod rank;
pub mod salary;
pub mod store;

/// Immutable per-session header set, fixed at fetcher construction.
///
/// Listing sites vary their markup per client; a stable browser-like session
/// keeps page variants predictable across one orchestration run.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub user_agent: String,
    pub headers: BTreeMap<String, String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(
            "Accept".to_string(),
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8"
                .to_string(),
        );
        Self {
            user_agent:
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                    .to_string(),
            headers,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocalFetcher {
    client: reqwest::Client,
    session: SessionConfig,
}

impl LocalFetcher {
    pub fn new(session: SessionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(session.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(10))
            // Safety defaults: avoid “hang forever” on DNS/TLS/body stalls.
            // Per-request timeouts (FetchRequest.timeout_ms) can still override this.
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Fetch(e.to_string()))?;
        Ok(Self { client, session })
    }

    fn apply_headers(
        &self,
        mut rb: reqwest::RequestBuilder,
        extra: &BTreeMap<String, String>,
    ) -> reqwest::RequestBuilder {
        for (k, v) in self.session.headers.iter().chain(extra.iter()) {
            if let (Ok(name), Ok(value)) = (
                reqwest::header::HeaderName::from_bytes(k.as_bytes()),
                reqwest::header::HeaderValue::from_str(v),
            ) {
                rb = rb.header(name, value);
            }
        }
        rb
    }
}

#[async_trait::async_trait]
impl FetchBackend for LocalFetcher {
    async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse> {
        let url = url::Url::parse(&req.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let mut rb = self.client.get(url);
        if let Some(to) = req.timeout() {
            rb = rb.timeout(to);
        }
        rb = self.apply_headers(rb, &req.headers);

        let resp = rb.send().await.map_err(|e| Error::Fetch(e.to_string()))?;
        let final_url = resp.url().to_string();
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?
            .to_vec();

        Ok(FetchResponse {
            url: req.url.clone(),
            final_url,
            status,
            content_type,
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::header, http::StatusCode, routing::get, Router};
    use std::net::SocketAddr;

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn fetches_body_and_status() {
        let app = Router::new().route(
            "/",
            get(|| async { ([(header::CONTENT_TYPE, "text/html")], "<html>hi</html>") }),
        );
        let addr = serve(app).await;

        let fetcher = LocalFetcher::new(SessionConfig::default()).unwrap();
        let req = FetchRequest::get(format!("http://{addr}/"));
        let resp = fetcher.fetch(&req).await.unwrap();
        assert!(resp.is_success());
        assert_eq!(resp.text_lossy(), "<html>hi</html>");
        assert_eq!(resp.content_type.as_deref(), Some("text/html"));
    }

    #[tokio::test]
    async fn session_headers_are_applied() {
        let app = Router::new().route(
            "/",
            get(|headers: axum::http::HeaderMap| async move {
                let ua = headers
                    .get(header::USER_AGENT)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                let accept = headers
                    .get(header::ACCEPT)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                format!("ua={ua} accept={accept}")
            }),
        );
        let addr = serve(app).await;

        let fetcher = LocalFetcher::new(SessionConfig::default()).unwrap();
        let resp = fetcher
            .fetch(&FetchRequest::get(format!("http://{addr}/")))
            .await
            .unwrap();
        let body = resp.text_lossy();
        assert!(body.contains("ua=Mozilla/5.0"), "body={body}");
        assert!(body.contains("accept=text/html"), "body={body}");
    }

    #[tokio::test]
    async fn non_success_status_is_data_not_error() {
        let app = Router::new().route(
            "/missing",
            get(|| async { (StatusCode::NOT_FOUND, "gone") }),
        );
        let addr = serve(app).await;

        let fetcher = LocalFetcher::new(SessionConfig::default()).unwrap();
        let resp = fetcher
            .fetch(&FetchRequest::get(format!("http://{addr}/missing")))
            .await
            .unwrap();
        assert!(!resp.is_success());
        assert_eq!(resp.status, 404);
    }

    #[tokio::test]
    async fn timeout_surfaces_as_fetch_error() {
        let app = Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let addr = serve(app).await;

        let fetcher = LocalFetcher::new(SessionConfig::default()).unwrap();
        let mut req = FetchRequest::get(format!("http://{addr}/slow"));
        req.timeout_ms = Some(100);
        let err = fetcher.fetch(&req).await.unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));
    }

    #[tokio::test]
    async fn invalid_url_is_rejected() {
        let fetcher = LocalFetcher::new(SessionConfig::default()).unwrap();
        let err = fetcher
            .fetch(&FetchRequest::get("not a url"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }
}
