//! Remote seed source.
//!
//! Fetches the initial task list from a JSON endpoint shaped like
//! `{ "todos": [ { "id": 1, "todo": "...", "completed": false } ] }`.
//! One GET, one attempt; the source never touches the store.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::SeedConfig;
use crate::error::{Error, Result};
use crate::task::SeedTask;

/// Default endpoint serving seed todos
pub const DEFAULT_SEED_URL: &str = "https://dummyjson.com/todos";

const ERROR_BODY_EXCERPT: usize = 200;

/// Provider of the tasks used to populate an empty store.
#[async_trait]
pub trait SeedSource: Send + Sync {
    /// Fetch the seed tasks. Fails with [`Error::Network`] or [`Error::Decode`].
    async fn fetch_seed_tasks(&self) -> Result<Vec<SeedTask>>;
}

#[derive(Debug, Deserialize)]
struct TodosResponse {
    todos: Vec<RemoteTodo>,
}

#[derive(Debug, Deserialize)]
struct RemoteTodo {
    id: i64,
    todo: String,
    completed: bool,
}

/// Decode a seed payload. Unknown extra fields are ignored.
///
/// Remote ids must be positive; local tasks own the negative range.
pub fn decode_seed_response(body: &[u8]) -> Result<Vec<SeedTask>> {
    let response: TodosResponse =
        serde_json::from_slice(body).map_err(|err| Error::Decode(err.to_string()))?;
    response
        .todos
        .into_iter()
        .map(|todo| {
            if todo.id <= 0 {
                return Err(Error::Decode(format!(
                    "todo id {} is not positive",
                    todo.id
                )));
            }
            Ok(SeedTask {
                id: todo.id,
                text: todo.todo,
                completed: todo.completed,
            })
        })
        .collect()
}

/// Seed source backed by an HTTP GET.
#[derive(Debug, Clone)]
pub struct HttpSeedSource {
    url: String,
    client: reqwest::Client,
}

impl HttpSeedSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &SeedConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|err| Error::InvalidConfig(format!("seed http client: {err}")))?;
        Ok(Self {
            url: config.url.clone(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Default for HttpSeedSource {
    fn default() -> Self {
        Self::new(DEFAULT_SEED_URL)
    }
}

#[async_trait]
impl SeedSource for HttpSeedSource {
    async fn fetch_seed_tasks(&self) -> Result<Vec<SeedTask>> {
        tracing::debug!(url = %self.url, "fetching seed tasks");

        let response = self.client.get(&self.url).send().await.map_err(|err| {
            tracing::warn!(error = %err, "seed request failed");
            Error::Network(format!("request to {} failed: {err}", self.url))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(ERROR_BODY_EXCERPT).collect();
            tracing::warn!(status = %status, "seed endpoint returned error");
            return Err(Error::Network(if excerpt.is_empty() {
                format!("HTTP {status}")
            } else {
                format!("HTTP {status}: {excerpt}")
            }));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| Error::Network(format!("reading seed response failed: {err}")))?;
        let tasks = decode_seed_response(&body)?;
        tracing::debug!(count = tasks.len(), "decoded seed tasks");
        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_maps_todos_and_ignores_extra_fields() {
        let body = br#"{
            "todos": [
                {"id": 1, "todo": "Buy milk", "completed": false, "userId": 26},
                {"id": 2, "todo": "Walk dog", "completed": true, "userId": 48}
            ],
            "total": 254, "skip": 0, "limit": 30
        }"#;

        let tasks = decode_seed_response(body).expect("decode");
        assert_eq!(
            tasks,
            vec![
                SeedTask {
                    id: 1,
                    text: "Buy milk".to_string(),
                    completed: false,
                },
                SeedTask {
                    id: 2,
                    text: "Walk dog".to_string(),
                    completed: true,
                },
            ]
        );
    }

    #[test]
    fn decode_accepts_empty_list() {
        let tasks = decode_seed_response(br#"{"todos": []}"#).expect("decode");
        assert!(tasks.is_empty());
    }

    #[test]
    fn decode_rejects_wrong_shapes() {
        let cases: [&[u8]; 7] = [
            br#"[]"#,
            br#"{"items": []}"#,
            br#"{"todos": [{"id": 1, "todo": "x"}]}"#,
            br#"{"todos": [{"id": "1", "todo": "x", "completed": false}]}"#,
            b"not json",
            br#"{"todos": [{"id": 0, "todo": "x", "completed": false}]}"#,
            br#"{"todos": [{"id": -9223372036854775808, "todo": "x", "completed": false}]}"#,
        ];
        for body in cases {
            let err = decode_seed_response(body).expect_err("should fail");
            assert!(matches!(err, Error::Decode(_)), "unexpected: {err:?}");
        }
    }

    #[test]
    fn from_config_uses_configured_url() {
        let config = SeedConfig {
            url: "http://127.0.0.1:9/todos".to_string(),
            ..SeedConfig::default()
        };
        let source = HttpSeedSource::from_config(&config).expect("source");
        assert_eq!(source.url(), "http://127.0.0.1:9/todos");
        assert_eq!(HttpSeedSource::default().url(), DEFAULT_SEED_URL);
    }
}
