//! JSON-RPC client for the Quobyte API server.
//!
//! Every call is a `POST` of a JSON-RPC 2.0 request to the API URL with HTTP
//! basic authentication. The reply carries either `result` or `error`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{ApiError, CreateVolumeRequest, RETRY_INTERACTIVE, VolumeApi};

#[derive(Serialize)]
struct RpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: &'static str,
    method: &'a str,
    params: &'a P,
}

#[derive(Deserialize)]
struct RpcResponse<R> {
    result: Option<R>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Serialize)]
struct ResolveVolumeNameRequest<'a> {
    volume_name: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    tenant_domain: &'a str,
    retry: &'static str,
}

#[derive(Serialize, Deserialize)]
struct VolumeUuid {
    #[serde(default)]
    volume_uuid: String,
}

/// Check that `api_url` is an absolute `http`/`https` URL.
pub fn validate_api_url(api_url: &str) -> Result<Url, ApiError> {
    let invalid = |reason: String| ApiError::InvalidUrl {
        url: api_url.to_owned(),
        reason,
    };
    let url = Url::parse(api_url).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        "http" | "https" => Err(invalid("host is not set".to_owned())),
        // `host:port` parses with the host as scheme.
        _ => Err(invalid("scheme is not set".to_owned())),
    }
}

/// Client for the Quobyte management API.
pub struct QuobyteClient {
    client: Client,
    url: Url,
    username: String,
    password: String,
}

impl QuobyteClient {
    /// Create a client for the API server at `api_url`.
    ///
    /// `timeout` bounds every request end to end.
    pub fn new(
        api_url: &str,
        username: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let url = validate_api_url(api_url)?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url,
            username: username.into(),
            password: password.into(),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Issue one JSON-RPC call. `Ok(None)` means the server replied with an
    /// empty `result`.
    async fn call<P, R>(&self, method: &str, params: &P) -> Result<Option<R>, ApiError>
    where
        P: Serialize + Sync,
        R: DeserializeOwned + Send,
    {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: "0",
            method,
            params,
        };

        let response = self
            .client
            .post(self.url.clone())
            .basic_auth(&self.username, Some(&self.password))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        let reply: RpcResponse<R> = serde_json::from_slice(&body).map_err(|e| {
            ApiError::Decode(format!(
                "HTTP {status}: {e}: {}",
                String::from_utf8_lossy(&body)
            ))
        })?;

        if let Some(err) = reply.error {
            debug!(method, code = err.code, message = %err.message, "API call failed");
            return Err(ApiError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        Ok(reply.result)
    }

    async fn resolve_volume_name(&self, name: &str, tenant: &str) -> Result<String, ApiError> {
        let params = ResolveVolumeNameRequest {
            volume_name: name,
            tenant_domain: tenant,
            retry: RETRY_INTERACTIVE,
        };
        let reply: Option<VolumeUuid> = self.call("resolveVolumeName", &params).await?;
        match reply {
            Some(VolumeUuid { volume_uuid }) if !volume_uuid.is_empty() => Ok(volume_uuid),
            _ => Err(ApiError::Decode(format!(
                "resolveVolumeName returned no UUID for {name}"
            ))),
        }
    }
}

#[async_trait]
impl VolumeApi for QuobyteClient {
    #[instrument(skip(self, req), fields(name = %req.name, tenant = %req.tenant_id))]
    async fn create_volume(&self, req: &CreateVolumeRequest) -> Result<String, ApiError> {
        let reply: Option<VolumeUuid> = self.call("createVolume", req).await?;
        let uuid = reply.map(|r| r.volume_uuid).unwrap_or_default();
        debug!(%uuid, "volume created");
        Ok(uuid)
    }

    #[instrument(skip(self))]
    async fn delete_volume_by_name(&self, name: &str, tenant: &str) -> Result<(), ApiError> {
        let uuid = self.resolve_volume_name(name, tenant).await?;
        let _: Option<serde_json::Value> = self
            .call(
                "deleteVolume",
                &VolumeUuid {
                    volume_uuid: uuid.clone(),
                },
            )
            .await?;
        debug!(%uuid, "volume deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::http::HeaderMap;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};

    use super::*;

    #[derive(Default)]
    struct FakeServer {
        calls: Mutex<Vec<Value>>,
        auth: Mutex<Vec<String>>,
    }

    async fn handle(
        State(state): State<Arc<FakeServer>>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
            state.auth.lock().unwrap().push(auth.to_owned());
        }
        state.calls.lock().unwrap().push(body.clone());

        let reply = match body["method"].as_str() {
            Some("createVolume") if body["params"]["name"] == "taken" => json!({
                "jsonrpc": "2.0", "id": "0",
                "error": {"code": -32000, "message": "ENTITY_EXISTS_ALREADY/POSIX_ERROR_NONE"},
            }),
            Some("createVolume") => json!({
                "jsonrpc": "2.0", "id": "0",
                "result": {"volume_uuid": "uuid-1"},
            }),
            Some("resolveVolumeName") if body["params"]["volume_name"] == "ghost" => json!({
                "jsonrpc": "2.0", "id": "0",
                "error": {"code": -32001, "message": "ENTITY_NOT_FOUND/POSIX_ERROR_ENOENT"},
            }),
            Some("resolveVolumeName") => json!({
                "jsonrpc": "2.0", "id": "0",
                "result": {"volume_uuid": "uuid-2"},
            }),
            Some("deleteVolume") => json!({"jsonrpc": "2.0", "id": "0", "result": {}}),
            _ => json!({"jsonrpc": "2.0", "id": "0", "error": {"code": -32601, "message": "no such method"}}),
        };
        Json(reply)
    }

    async fn spawn_fake() -> (QuobyteClient, Arc<FakeServer>) {
        let state = Arc::new(FakeServer::default());
        let app = Router::new()
            .route("/", post(handle))
            .with_state(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = QuobyteClient::new(
            &format!("http://{addr}"),
            "admin",
            "secret",
            Duration::from_secs(5),
        )
        .unwrap();
        (client, state)
    }

    #[test]
    fn api_url_requires_scheme() {
        assert!(validate_api_url("http://localhost:7860").is_ok());
        assert!(validate_api_url("https://api.example.com").is_ok());

        let err = validate_api_url("localhost:7860").unwrap_err();
        assert!(err.to_string().contains("scheme is not set"));
        assert!(validate_api_url("not a url").is_err());
    }

    #[tokio::test]
    async fn create_volume_sends_jsonrpc_request() {
        let (client, server) = spawn_fake().await;

        let uuid = client
            .create_volume(&CreateVolumeRequest {
                name: "data".into(),
                root_user_id: "root".into(),
                root_group_id: "root".into(),
                configuration_name: "BASE".into(),
                tenant_id: String::new(),
                retry: RETRY_INTERACTIVE.into(),
            })
            .await
            .unwrap();
        assert_eq!(uuid, "uuid-1");

        let calls = server.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0]["jsonrpc"], "2.0");
        assert_eq!(calls[0]["method"], "createVolume");
        assert_eq!(calls[0]["params"]["configuration_name"], "BASE");
        assert!(calls[0]["params"].get("tenant_id").is_none());

        let auth = server.auth.lock().unwrap();
        assert!(auth[0].starts_with("Basic "));
    }

    #[tokio::test]
    async fn duplicate_create_is_reported_as_entity_exists() {
        let (client, _server) = spawn_fake().await;

        let err = client
            .create_volume(&CreateVolumeRequest {
                name: "taken".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(err.is_entity_exists());
        assert_eq!(
            err.to_string(),
            "ERROR Code: -32000, Message: ENTITY_EXISTS_ALREADY/POSIX_ERROR_NONE"
        );
    }

    #[tokio::test]
    async fn delete_by_name_resolves_then_deletes() {
        let (client, server) = spawn_fake().await;

        client.delete_volume_by_name("data", "tenant-a").await.unwrap();

        let calls = server.calls.lock().unwrap();
        let methods: Vec<_> = calls.iter().map(|c| c["method"].clone()).collect();
        assert_eq!(methods, vec![json!("resolveVolumeName"), json!("deleteVolume")]);
        assert_eq!(calls[0]["params"]["tenant_domain"], "tenant-a");
        assert_eq!(calls[1]["params"]["volume_uuid"], "uuid-2");
    }

    #[tokio::test]
    async fn delete_unknown_volume_fails() {
        let (client, server) = spawn_fake().await;

        let err = client.delete_volume_by_name("ghost", "").await.unwrap_err();
        assert!(matches!(err, ApiError::Rpc { code: -32001, .. }));
        assert!(!err.is_entity_exists());
        assert_eq!(server.calls.lock().unwrap().len(), 1);
    }
}
