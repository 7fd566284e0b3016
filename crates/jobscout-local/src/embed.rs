//! Text-embedding backends.
//!
//! Two interchangeable clients behind `EmbeddingBackend`: a local Ollama
//! `/api/embed` endpoint (opt-in) and any OpenAI-compatible `/v1/embeddings`
//! server. Both batch all texts into a single request; the response must carry
//! one vector per input, in input order.

use jobscout_core::{EmbeddingBackend, Error, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_EMBED_TIMEOUT_MS: u64 = 20_000;

fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_bool(key: &str) -> bool {
    env(key)
        .and_then(|s| s.parse::<bool>().ok())
        .unwrap_or(false)
}

#[derive(Debug, Clone)]
pub struct OllamaEmbeddings {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaEmbeddings {
    pub fn from_env(client: reqwest::Client) -> Result<Self> {
        // Opt-in: don't accidentally start calling localhost if the user didn't ask for it.
        if !env_bool("JOBSCOUT_OLLAMA_ENABLE") {
            return Err(Error::NotConfigured(
                "JOBSCOUT_OLLAMA_ENABLE is not set (or false)".to_string(),
            ));
        }
        let base_url =
            env("JOBSCOUT_OLLAMA_BASE_URL").unwrap_or_else(|| "http://127.0.0.1:11434".to_string());
        let model =
            env("JOBSCOUT_OLLAMA_EMBED_MODEL").unwrap_or_else(|| "nomic-embed-text".to_string());
        Ok(Self {
            client,
            base_url,
            model,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint_embed(&self) -> String {
        format!("{}/api/embed", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone, Serialize)]
struct OllamaEmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OllamaEmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

#[async_trait::async_trait]
impl EmbeddingBackend for OllamaEmbeddings {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let req = OllamaEmbedRequest {
            model: self.model.clone(),
            input: texts.to_vec(),
        };
        let resp = self
            .client
            .post(self.endpoint_embed())
            .timeout(std::time::Duration::from_millis(DEFAULT_EMBED_TIMEOUT_MS))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(&req)
            .send()
            .await
            .map_err(|e| Error::EmbeddingUnavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::EmbeddingUnavailable(format!(
                "ollama embed HTTP {status}"
            )));
        }

        let parsed: OllamaEmbedResponse = resp
            .json()
            .await
            .map_err(|e| Error::EmbeddingUnavailable(e.to_string()))?;
        if parsed.embeddings.len() != texts.len() {
            return Err(Error::EmbeddingUnavailable(format!(
                "ollama embed returned {} vectors for {} inputs",
                parsed.embeddings.len(),
                texts.len()
            )));
        }
        Ok(parsed.embeddings)
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiCompatEmbeddings {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiCompatEmbeddings {
    pub fn from_env(client: reqwest::Client) -> Result<Self> {
        let base_url = env("JOBSCOUT_OPENAI_COMPAT_BASE_URL").ok_or_else(|| {
            Error::NotConfigured("missing JOBSCOUT_OPENAI_COMPAT_BASE_URL".to_string())
        })?;
        let api_key = env("JOBSCOUT_OPENAI_COMPAT_API_KEY");
        let model = env("JOBSCOUT_OPENAI_COMPAT_EMBED_MODEL")
            .unwrap_or_else(|| "text-embedding-3-small".to_string());
        Ok(Self {
            client,
            base_url,
            api_key,
            model,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint_embeddings(&self) -> String {
        format!("{}/v1/embeddings", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone, Serialize)]
struct OpenAiEmbeddingsRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiEmbeddingsResponse {
    #[serde(default)]
    data: Vec<OpenAiEmbeddingRow>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiEmbeddingRow {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait::async_trait]
impl EmbeddingBackend for OpenAiCompatEmbeddings {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let req = OpenAiEmbeddingsRequest {
            model: self.model.clone(),
            input: texts.to_vec(),
        };

        let mut rb = self
            .client
            .post(self.endpoint_embeddings())
            .timeout(std::time::Duration::from_millis(DEFAULT_EMBED_TIMEOUT_MS))
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(k) = &self.api_key {
            rb = rb.header(reqwest::header::AUTHORIZATION, format!("Bearer {k}"));
        }

        let resp = rb
            .json(&req)
            .send()
            .await
            .map_err(|e| Error::EmbeddingUnavailable(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::EmbeddingUnavailable(format!(
                "embeddings HTTP {status}"
            )));
        }

        let parsed: OpenAiEmbeddingsResponse = resp
            .json()
            .await
            .map_err(|e| Error::EmbeddingUnavailable(e.to_string()))?;
        if parsed.data.len() != texts.len() {
            return Err(Error::EmbeddingUnavailable(format!(
                "embeddings returned {} vectors for {} inputs",
                parsed.data.len(),
                texts.len()
            )));
        }
        // Providers may reorder rows; `index` is authoritative.
        let mut rows = parsed.data;
        rows.sort_by_key(|r| r.index);
        Ok(rows.into_iter().map(|r| r.embedding).collect())
    }
}

/// Pick whichever backend the environment configures: Ollama first (explicit
/// opt-in), then OpenAI-compatible.
pub fn from_env_auto(client: reqwest::Client) -> Result<Box<dyn EmbeddingBackend>> {
    match OllamaEmbeddings::from_env(client.clone()) {
        Ok(b) => Ok(Box::new(b)),
        Err(_) => match OpenAiCompatEmbeddings::from_env(client) {
            Ok(b) => Ok(Box::new(b)),
            Err(_) => Err(Error::NotConfigured(
                "no embeddings backend (set JOBSCOUT_OLLAMA_ENABLE or JOBSCOUT_OPENAI_COMPAT_BASE_URL)"
                    .to_string(),
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};
    use std::net::SocketAddr;
    use std::sync::Mutex;

    // Env vars are process-global; serialize tests that mutate them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    struct EnvGuard {
        k: &'static str,
        prev: Option<String>,
    }

    impl EnvGuard {
        fn set(k: &'static str, v: &str) -> Self {
            let prev = std::env::var(k).ok();
            std::env::set_var(k, v);
            Self { k, prev }
        }

        fn unset(k: &'static str) -> Self {
            let prev = std::env::var(k).ok();
            std::env::remove_var(k);
            Self { k, prev }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(v) = self.prev.take() {
                std::env::set_var(self.k, v);
            } else {
                std::env::remove_var(self.k);
            }
        }
    }

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[test]
    fn unconfigured_backends_report_not_configured() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _g1 = EnvGuard::unset("JOBSCOUT_OLLAMA_ENABLE");
        let _g2 = EnvGuard::unset("JOBSCOUT_OPENAI_COMPAT_BASE_URL");

        assert!(matches!(
            OllamaEmbeddings::from_env(reqwest::Client::new()),
            Err(Error::NotConfigured(_))
        ));
        assert!(matches!(
            OpenAiCompatEmbeddings::from_env(reqwest::Client::new()),
            Err(Error::NotConfigured(_))
        ));
        assert!(matches!(
            from_env_auto(reqwest::Client::new()),
            Err(Error::NotConfigured(_))
        ));
    }

    #[test]
    fn parses_minimal_openai_shape() {
        let js = r#"
        {
          "data": [
            {"index": 1, "embedding": [0.5, 0.5]},
            {"index": 0, "embedding": [1.0, 0.0]}
          ]
        }
        "#;
        let parsed: OpenAiEmbeddingsResponse = serde_json::from_str(js).unwrap();
        assert_eq!(parsed.data.len(), 2);
        assert_eq!(parsed.data[0].index, 1);
    }

    #[test]
    fn parses_minimal_ollama_shape() {
        let js = r#"{ "embeddings": [[0.1, 0.2], [0.3, 0.4]] }"#;
        let parsed: OllamaEmbedResponse = serde_json::from_str(js).unwrap();
        assert_eq!(parsed.embeddings.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn openai_compat_rows_are_reordered_by_index() {
        let app = Router::new().route(
            "/v1/embeddings",
            post(|| async {
                Json(serde_json::json!({
                    "data": [
                        {"index": 1, "embedding": [0.0, 1.0]},
                        {"index": 0, "embedding": [1.0, 0.0]}
                    ]
                }))
            }),
        );
        let addr = serve(app).await;

        let backend = OpenAiCompatEmbeddings {
            client: reqwest::Client::new(),
            base_url: format!("http://{addr}"),
            api_key: None,
            model: "test-model".to_string(),
        };
        let vecs = backend
            .embed(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(vecs[0], vec![1.0, 0.0]);
        assert_eq!(vecs[1], vec![0.0, 1.0]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn http_error_maps_to_embedding_unavailable() {
        let app = Router::new().route(
            "/v1/embeddings",
            post(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let addr = serve(app).await;

        let backend = OpenAiCompatEmbeddings {
            client: reqwest::Client::new(),
            base_url: format!("http://{addr}"),
            api_key: None,
            model: "test-model".to_string(),
        };
        let err = backend.embed(&["a".to_string()]).await.unwrap_err();
        assert!(matches!(err, Error::EmbeddingUnavailable(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn vector_count_mismatch_is_an_error() {
        let app = Router::new().route(
            "/api/embed",
            post(|| async { Json(serde_json::json!({ "embeddings": [[0.1]] })) }),
        );
        let addr = serve(app).await;

        let backend = OllamaEmbeddings {
            client: reqwest::Client::new(),
            base_url: format!("http://{addr}"),
            model: "test-model".to_string(),
        };
        let err = backend
            .embed(&["a".to_string(), "b".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmbeddingUnavailable(_)));
    }

    #[tokio::test]
    async fn empty_input_short_circuits_without_a_request() {
        // No server at this address; an actual request would fail.
        let backend = OllamaEmbeddings {
            client: reqwest::Client::new(),
            base_url: "http://127.0.0.1:1".to_string(),
            model: "test-model".to_string(),
        };
        assert!(backend.embed(&[]).await.unwrap().is_empty());
    }
}
