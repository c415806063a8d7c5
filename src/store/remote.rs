use reqwest::StatusCode;
use reqwest::header::{ETAG, HeaderMap, IF_MATCH, IF_NONE_MATCH};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RemoteConfig;
use crate::error::StoreError;
use crate::section::SectionKey;
use crate::store::{SectionStore, StoredSection};

/// 外部内容 API：`GET/PUT {api_url}/api/{endpoint}`
#[derive(Clone)]
pub struct HttpSectionStore {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    endpoints: Arc<HashMap<String, String>>,
}

impl HttpSectionStore {
    pub fn new(config: &RemoteConfig) -> Result<Self, StoreError> {
        let mut store = Self::with_base_url(
            &config.resolved_api_url(),
            config.resolved_token(),
            Duration::from_secs(config.timeout_secs.max(1)),
        )?;
        store.endpoints = Arc::new(config.endpoints.clone());
        Ok(store)
    }

    pub fn with_base_url(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            endpoints: Arc::default(),
        })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn api_url(&self, endpoint: &str) -> String {
        format!("{}/api/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    pub fn section_url(&self, key: SectionKey) -> String {
        let endpoint = self
            .endpoints
            .get(key.as_str())
            .map(String::as_str)
            .unwrap_or_else(|| key.endpoint());
        self.api_url(endpoint)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl SectionStore for HttpSectionStore {
    async fn fetch_section(&self, key: SectionKey) -> Result<Option<StoredSection>, StoreError> {
        let url = self.section_url(key);
        tracing::debug!("GET {url}");
        let response = self.authorize(self.client.get(&url)).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let etag = etag_version(response.headers());
        let body: Value = response.json().await?;
        let payload = Payload::unwrap(body, etag)?;
        Ok(Some(StoredSection {
            key,
            data: payload.data,
            version: payload.version.unwrap_or(0),
            updated_at: payload
                .updated_at
                .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
        }))
    }

    async fn save_section(
        &self,
        key: SectionKey,
        data: &Value,
        expected_version: Option<u64>,
    ) -> Result<StoredSection, StoreError> {
        let url = self.section_url(key);
        tracing::debug!("PUT {url}");
        let mut request = self.authorize(self.client.put(&url)).json(data);
        // 版本 0 表示上游不做版本控制；没有版本时只允许创建，避免覆盖未加载到的内容
        match expected_version {
            Some(0) => {}
            Some(version) => request = request.header(IF_MATCH, format!("\"{version}\"")),
            None => request = request.header(IF_NONE_MATCH, "*"),
        }
        let response = request.send().await?;

        let status = response.status();
        if status == StatusCode::CONFLICT || status == StatusCode::PRECONDITION_FAILED {
            return Err(StoreError::Conflict {
                key,
                expected: expected_version,
                actual: etag_version(response.headers()),
            });
        }
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let etag = etag_version(response.headers());
        let text = response.text().await?;
        let payload = if text.trim().is_empty() {
            Payload {
                data: data.clone(),
                version: etag,
                updated_at: None,
            }
        } else {
            let mut payload = Payload::unwrap(serde_json::from_str(&text)?, etag)?;
            // 部分接口只返回 {success: true}
            if !payload.data.is_object() {
                payload.data = data.clone();
            }
            payload
        };

        let version = payload.version.unwrap_or(match expected_version {
            Some(0) | None => 0,
            Some(v) => v + 1,
        });
        Ok(StoredSection {
            key,
            data: payload.data,
            version,
            updated_at: payload
                .updated_at
                .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
        })
    }
}

/// 去掉响应外层的 `{success, data, version}` 包装
struct Payload {
    data: Value,
    version: Option<u64>,
    updated_at: Option<String>,
}

impl Payload {
    fn unwrap(body: Value, etag: Option<u64>) -> Result<Self, StoreError> {
        let Value::Object(mut map) = body else {
            return Ok(Self {
                data: body,
                version: etag,
                updated_at: None,
            });
        };

        if map.get("success") == Some(&Value::Bool(false)) {
            let message = map
                .get("message")
                .or_else(|| map.get("error"))
                .and_then(Value::as_str)
                .unwrap_or("success = false")
                .to_string();
            return Err(StoreError::Status {
                status: 200,
                body: message,
            });
        }

        if !map.contains_key("data") {
            // 只有 {success: true} 的回执不算内容
            let data = if map.contains_key("success") {
                Value::Null
            } else {
                Value::Object(map)
            };
            return Ok(Self {
                data,
                version: etag,
                updated_at: None,
            });
        }

        let version = map.get("version").and_then(Value::as_u64).or(etag);
        let updated_at = map
            .get("updatedAt")
            .or_else(|| map.get("updated_at"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let data = map.remove("data").unwrap_or(Value::Null);
        Ok(Self {
            data,
            version,
            updated_at,
        })
    }
}

/// 解析形如 `"3"`、`W/"3"` 的数字 ETag
fn etag_version(headers: &HeaderMap) -> Option<u64> {
    let raw = headers.get(ETAG)?.to_str().ok()?;
    raw.trim()
        .trim_start_matches("W/")
        .trim_matches('"')
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::{HeaderMap as AxumHeaders, StatusCode as AxumStatus};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use serde_json::json;

    use crate::section::editor::SectionEditor;
    use crate::sections::impact::ImpactSection;

    async fn spawn_upstream(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn store(base: &str, token: Option<&str>) -> HttpSectionStore {
        HttpSectionStore::with_base_url(base, token.map(str::to_string), Duration::from_secs(5))
            .unwrap()
    }

    #[test]
    fn endpoint_overrides_take_precedence() {
        let mut config = RemoteConfig {
            api_url: "http://cms.example.org/".into(),
            token: String::new(),
            timeout_secs: 3,
            endpoints: HashMap::new(),
        };
        config.endpoints.insert("careers".into(), "openings".into());
        let store = HttpSectionStore::new(&config).unwrap();
        assert!(store.section_url(SectionKey::Careers).ends_with("/api/openings"));
        assert!(store.section_url(SectionKey::Causes).ends_with("/api/causeImpact"));
    }

    #[test]
    fn etag_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert(ETAG, "W/\"12\"".parse().unwrap());
        assert_eq!(etag_version(&headers), Some(12));
        headers.insert(ETAG, "\"abc\"".parse().unwrap());
        assert_eq!(etag_version(&headers), None);
    }

    #[tokio::test]
    async fn fetch_unwraps_envelope_and_sends_token() {
        let router = Router::new().route(
            "/api/impact",
            get(|headers: AxumHeaders| async move {
                let authorized = headers
                    .get("authorization")
                    .is_some_and(|v| v == "Bearer secret");
                if !authorized {
                    return AxumStatus::UNAUTHORIZED.into_response();
                }
                axum::Json(json!({
                    "success": true,
                    "data": { "title": "From API" },
                    "version": 7
                }))
                .into_response()
            }),
        );
        let base = spawn_upstream(router).await;

        let stored = store(&base, Some("secret"))
            .fetch_section(SectionKey::Impact)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.data["title"], "From API");
        assert_eq!(stored.version, 7);

        let err = store(&base, None)
            .fetch_section(SectionKey::Impact)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Status { status: 401, .. }));
    }

    #[tokio::test]
    async fn missing_endpoint_is_none() {
        let base = spawn_upstream(Router::new()).await;
        let fetched = store(&base, None).fetch_section(SectionKey::Cta).await.unwrap();
        assert!(fetched.is_none());
    }

    #[tokio::test]
    async fn precondition_failed_is_a_conflict() {
        let router = Router::new().route(
            "/api/cta",
            axum::routing::put(|| async {
                (AxumStatus::PRECONDITION_FAILED, [("etag", "\"4\"")], "stale")
            }),
        );
        let base = spawn_upstream(router).await;
        let err = store(&base, None)
            .save_section(SectionKey::Cta, &json!({ "heading": "x" }), Some(3))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Conflict { expected: Some(3), actual: Some(4), .. }
        ));
    }

    #[tokio::test]
    async fn unversioned_save_only_creates() {
        let router = Router::new().route(
            "/api/impact",
            axum::routing::put(|headers: AxumHeaders| async move {
                if headers.get("if-none-match").is_some_and(|v| v == "*") {
                    (AxumStatus::PRECONDITION_FAILED, [("etag", "\"6\"")]).into_response()
                } else {
                    AxumStatus::NO_CONTENT.into_response()
                }
            }),
        );
        let base = spawn_upstream(router).await;
        let err = store(&base, None)
            .save_section(SectionKey::Impact, &json!({ "title": "Defaults" }), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Conflict { expected: None, actual: Some(6), .. }
        ));
    }

    #[tokio::test]
    async fn save_reads_version_from_etag() {
        let router = Router::new().route(
            "/api/jobs",
            axum::routing::put(|headers: AxumHeaders, body: axum::Json<Value>| async move {
                assert_eq!(headers.get("if-match").unwrap(), "\"2\"");
                ([("etag", "\"3\"")], body)
            }),
        );
        let base = spawn_upstream(router).await;
        let stored = store(&base, None)
            .save_section(SectionKey::Careers, &json!({ "title": "Join" }), Some(2))
            .await
            .unwrap();
        assert_eq!(stored.version, 3);
        assert_eq!(stored.data["title"], "Join");
    }

    #[tokio::test]
    async fn unreachable_upstream_falls_back_to_defaults() {
        // 绑定后立即释放端口，连接会被拒绝
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let store = store(&format!("http://{addr}"), None);
        let editor = SectionEditor::<ImpactSection>::load(&store).await;
        assert_eq!(editor.data().title, "Our Global Impact");
        assert!(editor.notice().is_some());
    }
}
