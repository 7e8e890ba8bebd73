//! etcd v2 keys API client.
//!
//! # Responsibilities
//! - Address keys as `{endpoint}/v2/keys{key}`
//! - Fail over between cluster endpoints on connection errors
//! - Translate etcd error bodies into `StoreError`
//! - Long-poll watches with index tracking
//!
//! # Design Decisions
//! - Endpoints are shuffled once so a fleet of builders spreads its load
//! - The last endpoint that answered is tried first on the next request
//! - Any HTTP answer is authoritative; only transport failures move on
//! - Watches carry no request timeout (they block until a change)

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::config::StoreConfig;
use crate::store::node::Node;
use crate::store::{KeyValueStore, StoreError, StoreResult, StoreWatch, WatchEvent};

/// etcd error codes (see the v2 API's `error.go`).
const CODE_KEY_NOT_FOUND: u64 = 100;
const CODE_WATCHER_CLEARED: u64 = 400;
const CODE_EVENT_INDEX_CLEARED: u64 = 401;

/// Successful keys API response.
#[derive(Debug, Deserialize)]
struct KeysResponse {
    action: String,
    #[serde(default)]
    node: Node,
}

/// Error body returned with non-2xx statuses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "errorCode")]
    error_code: u64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    cause: String,
}

struct EtcdInner {
    client: reqwest::Client,
    endpoints: Vec<Url>,
    preferred: AtomicUsize,
    request_timeout: Duration,
}

/// Store backed by an etcd cluster.
#[derive(Clone)]
pub struct EtcdStore {
    inner: Arc<EtcdInner>,
}

impl EtcdStore {
    /// Create a client for the configured cluster.
    ///
    /// No request is made; see `lifecycle::startup` for the connectivity probe.
    pub fn new(config: &StoreConfig) -> StoreResult<Self> {
        let mut endpoints = config
            .endpoints
            .iter()
            .map(|e| {
                Url::parse(e.trim()).map_err(|err| StoreError::InvalidEndpoint(format!("{}: {}", e, err)))
            })
            .collect::<StoreResult<Vec<_>>>()?;
        if endpoints.is_empty() {
            return Err(StoreError::InvalidEndpoint("no endpoints configured".to_string()));
        }
        endpoints.shuffle(&mut rand::thread_rng());

        let mut builder = reqwest::Client::builder();
        builder = match &config.socks_proxy {
            Some(proxy) => {
                let proxy = reqwest::Proxy::all(format!("socks5://{}", proxy))
                    .map_err(|e| StoreError::Client(e.to_string()))?;
                builder.proxy(proxy)
            }
            None => builder.no_proxy(),
        };
        let client = builder.build().map_err(|e| StoreError::Client(e.to_string()))?;

        tracing::debug!(
            endpoints = ?endpoints.iter().map(Url::as_str).collect::<Vec<_>>(),
            socks_proxy = ?config.socks_proxy,
            "etcd client created"
        );

        Ok(Self {
            inner: Arc::new(EtcdInner {
                client,
                endpoints,
                preferred: AtomicUsize::new(0),
                request_timeout: config.request_timeout(),
            }),
        })
    }
}

impl EtcdInner {
    /// Send a keys API request, failing over between endpoints.
    ///
    /// Returns the status and raw body of the first endpoint that answered.
    async fn send(
        &self,
        method: Method,
        key: &str,
        query: &[(&str, String)],
        form: Option<&[(&str, &str)]>,
        timeout: Option<Duration>,
    ) -> StoreResult<(StatusCode, String)> {
        let count = self.endpoints.len();
        let start = self.preferred.load(Ordering::Relaxed);
        let mut last_error = String::new();

        for offset in 0..count {
            let idx = (start + offset) % count;
            let url = key_url(&self.endpoints[idx], key)?;

            let mut request = self.client.request(method.clone(), url).query(query);
            if let Some(form) = form {
                request = request.form(form);
            }
            if let Some(timeout) = timeout {
                request = request.timeout(timeout);
            }

            match request.send().await {
                Ok(response) => {
                    self.preferred.store(idx, Ordering::Relaxed);
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .map_err(|e| StoreError::Transient(format!("reading response: {}", e)))?;
                    return Ok((status, body));
                }
                Err(e) => {
                    tracing::warn!(
                        endpoint = %self.endpoints[idx],
                        key = %key,
                        error = %e,
                        "etcd request failed, trying next endpoint"
                    );
                    last_error = e.to_string();
                }
            }
        }

        Err(StoreError::Transient(format!(
            "all {} etcd endpoints failed, last error: {}",
            count, last_error
        )))
    }

    async fn request(
        &self,
        method: Method,
        key: &str,
        query: &[(&str, String)],
        form: Option<&[(&str, &str)]>,
    ) -> StoreResult<KeysResponse> {
        let (status, body) = self
            .send(method, key, query, form, Some(self.request_timeout))
            .await?;
        if !status.is_success() {
            return Err(error_from_response(status, &body));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

/// Build `{endpoint}/v2/keys/{segments...}` with each segment escaped.
fn key_url(endpoint: &Url, key: &str) -> StoreResult<Url> {
    let mut url = endpoint.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| StoreError::InvalidEndpoint(endpoint.to_string()))?;
        segments.pop_if_empty().extend(["v2", "keys"]);
        let parts: Vec<&str> = key.split('/').filter(|s| !s.is_empty()).collect();
        if parts.is_empty() {
            segments.push("");
        } else {
            segments.extend(parts);
        }
    }
    Ok(url)
}

fn error_from_response(status: StatusCode, body: &str) -> StoreError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(err) => match err.error_code {
            CODE_KEY_NOT_FOUND => StoreError::NotFound(err.cause),
            CODE_EVENT_INDEX_CLEARED => StoreError::IndexCleared(format!("{} ({})", err.message, err.cause)),
            CODE_WATCHER_CLEARED | 300..=399 => {
                StoreError::Transient(format!("{} ({})", err.message, err.cause))
            }
            code => StoreError::Api {
                code,
                message: err.message,
                cause: err.cause,
            },
        },
        Err(_) if status.is_server_error() => {
            StoreError::Transient(format!("HTTP {}: {}", status, body.trim()))
        }
        Err(_) => StoreError::Api {
            code: u64::from(status.as_u16()),
            message: body.trim().to_string(),
            cause: String::new(),
        },
    }
}

#[async_trait]
impl KeyValueStore for EtcdStore {
    async fn get(&self, path: &str, recursive: bool) -> StoreResult<Node> {
        let query = [("recursive", recursive.to_string())];
        let response = self.inner.request(Method::GET, path, &query, None).await?;
        Ok(response.node)
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.inner
            .request(Method::PUT, key, &[], Some(&[("value", value)]))
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str, recursive: bool) -> StoreResult<()> {
        let query = [("recursive", recursive.to_string())];
        self.inner.request(Method::DELETE, key, &query, None).await?;
        Ok(())
    }

    fn watch(&self, prefix: &str) -> Box<dyn StoreWatch> {
        Box::new(EtcdWatch {
            inner: self.inner.clone(),
            prefix: prefix.to_string(),
            wait_index: None,
        })
    }
}

/// Long-polling recursive watch.
struct EtcdWatch {
    inner: Arc<EtcdInner>,
    prefix: String,
    /// Next index to wait from; `None` waits for the next change after now.
    wait_index: Option<u64>,
}

#[async_trait]
impl StoreWatch for EtcdWatch {
    async fn next(&mut self) -> StoreResult<WatchEvent> {
        loop {
            let mut query = vec![("wait", "true".to_string()), ("recursive", "true".to_string())];
            if let Some(index) = self.wait_index {
                query.push(("waitIndex", index.to_string()));
            }

            let (status, body) = self
                .inner
                .send(Method::GET, &self.prefix, &query, None, None)
                .await?;

            if !status.is_success() {
                let err = error_from_response(status, &body);
                if matches!(err, StoreError::IndexCleared(_)) {
                    self.wait_index = None;
                }
                return Err(err);
            }
            // etcd closes idle long polls with an empty body
            if body.trim().is_empty() {
                continue;
            }

            let response: KeysResponse = serde_json::from_str(&body)?;
            let index = response.node.modified_index;
            self.wait_index = Some(index + 1);
            return Ok(WatchEvent {
                action: response.action,
                key: response.node.key,
                index,
            });
        }
    }
}
