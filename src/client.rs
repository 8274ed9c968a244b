use crate::directory::{DirectoryError, Removal, WaypointDirectory};
use crate::domain::{Coordinates, Waypoint};
use crate::geodesy::{DistanceBearing, DistanceUnit};
use crate::rpc::protocol::{JsonRpcId, JsonRpcRequest, JsonRpcResponse, methods};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, instrument, warn};

#[derive(Clone, Debug, Deserialize)]
pub struct ClientConfig {
    url: String,
    retry_ms: u64,
    retry_max_delay_ms: u64,
    max_retries: usize,
    #[serde(with = "humantime_serde")]
    timeout: Duration,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        ClientConfig {
            url: url.into(),
            retry_ms: 100,
            retry_max_delay_ms: 2_000,
            max_retries: 3,
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_retries(mut self, retry_ms: u64, retry_max_delay_ms: u64, max_retries: usize) -> Self {
        self.retry_ms = retry_ms;
        self.retry_max_delay_ms = retry_max_delay_ms;
        self.max_retries = max_retries;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// A remote directory reached through the JSON-RPC server.
///
/// Transport failures are retried with an exponential backoff, errors reported by the directory never are.
#[derive(Debug)]
pub struct DirectoryClient {
    http: Client,
    config: ClientConfig,
    next_id: AtomicI64,
}

pub fn new_client(config: ClientConfig) -> Result<DirectoryClient, ClientError> {
    let http = Client::builder().timeout(config.timeout()).build()?;

    Ok(DirectoryClient {
        http,
        config,
        next_id: AtomicI64::new(1),
    })
}

impl DirectoryClient {
    #[instrument(skip(self, params))]
    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ClientError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(JsonRpcId::Number(id), method, params);

        let strategy = ExponentialBackoff::from_millis(self.config.retry_ms)
            .factor(2)
            .max_delay(self.config.retry_max_delay())
            .map(jitter)
            .take(self.config.max_retries);

        let response = RetryIf::spawn(
            strategy,
            || self.send(&request),
            |error: &ClientError| {
                let retry = error.is_transport();
                if retry {
                    warn!("⚠️ {}. Retrying...", error);
                }
                retry
            },
        )
        .await?;

        if let Some(error) = response.error {
            debug!(code = error.code, "Call failed: {}", error.message);
            return Err(match error.to_directory_error() {
                Some(directory_error) => ClientError::Directory(directory_error),
                None => ClientError::Rpc {
                    code: error.code,
                    message: error.message,
                },
            });
        }

        // A `null` result deserializes as an absent one
        serde_json::from_value(response.result.unwrap_or(Value::Null)).map_err(ClientError::InvalidResponse)
    }

    async fn send(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, ClientError> {
        let body = self
            .http
            .post(self.config.url())
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        serde_json::from_str(&body).map_err(ClientError::InvalidResponse)
    }
}

#[async_trait]
impl WaypointDirectory for DirectoryClient {
    type Error = ClientError;

    async fn list_names(&self) -> Result<Vec<String>, ClientError> {
        self.call(methods::LIST_NAMES, Value::Null).await
    }

    async fn get_active(&self) -> Result<Option<String>, ClientError> {
        self.call(methods::GET_ACTIVE, Value::Null).await
    }

    async fn set_active(&self, name: &str) -> Result<(), ClientError> {
        self.call(methods::SET_ACTIVE, json!([name])).await
    }

    async fn get(&self, name: &str) -> Result<Waypoint, ClientError> {
        self.call(methods::GET, json!([name])).await
    }

    async fn select_and_get(&self, name: &str) -> Result<Waypoint, ClientError> {
        let mut point: HashMap<String, Coordinates> =
            self.call(methods::legacy::GET_JSON_POINT_FROM_LIBRARY, json!([name])).await?;

        match point.remove(name) {
            Some(coordinates) => Ok(Waypoint { name: name.to_string(), coordinates }),
            None => Err(ClientError::InvalidResponse(serde::de::Error::custom(format!("no point named '{}'", name)))),
        }
    }

    async fn add(&self, waypoint: Waypoint) -> Result<(), ClientError> {
        self.call(methods::ADD, waypoint_params(&waypoint)).await
    }

    async fn modify(&self, waypoint: Waypoint) -> Result<(), ClientError> {
        self.call(methods::MODIFY, waypoint_params(&waypoint)).await
    }

    async fn remove(&self, name: &str) -> Result<Removal, ClientError> {
        self.call(methods::REMOVE, json!([name])).await
    }

    async fn calc_dist_bear(&self, from: &str, to: &str, unit: DistanceUnit) -> Result<DistanceBearing, ClientError> {
        let (distance, bearing): (f64, f64) = self.call(methods::CALC_DIST_BEAR, json!([from, to, unit.to_string()])).await?;
        Ok(DistanceBearing { distance, bearing })
    }

    async fn service_info(&self) -> Result<String, ClientError> {
        self.call(methods::SERVICE_INFO, Value::Null).await
    }

    async fn library_size(&self) -> Result<usize, ClientError> {
        self.call(methods::LIBRARY_SIZE, Value::Null).await
    }

    async fn debug_library(&self) -> Result<(), ClientError> {
        self.call(methods::DEBUG_LIBRARY, Value::Null).await
    }
}

fn waypoint_params(waypoint: &Waypoint) -> Value {
    let coordinates = &waypoint.coordinates;
    json!([waypoint.name, coordinates.latitude, coordinates.longitude, coordinates.elevation])
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error("server returned error {code}: {message}")]
    Rpc { code: i32, message: String },
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(serde_json::Error),
}

impl ClientError {
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::DirectoryService;
    use crate::rpc::protocol::error_codes;
    use crate::rpc::server::serve;
    use mockito::Matcher;
    use pretty_assertions::assert_eq;
    use test_log::test;
    use tokio::net::TcpListener;

    fn fast_retries(url: String) -> ClientConfig {
        ClientConfig::new(url).with_retries(1, 5, 2)
    }

    #[test]
    fn deserializes_a_client_config() -> Result<(), serde_json::Error> {
        let config: ClientConfig = serde_json::from_value(json!({
            "url": "http://localhost:8080",
            "retry_ms": 50,
            "retry_max_delay_ms": 1000,
            "max_retries": 4,
            "timeout": "2s"
        }))?;

        assert_eq!(config.url(), "http://localhost:8080");
        assert_eq!(config.retry_max_delay(), Duration::from_secs(1));
        assert_eq!(config.max_retries, 4);
        assert_eq!(config.timeout(), Duration::from_secs(2));
        Ok(())
    }

    #[test(tokio::test)]
    async fn list_names_sends_a_json_rpc_request() -> Result<(), ClientError> {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(json!({ "jsonrpc": "2.0", "method": "listNames", "params": null })))
            .with_status(200)
            .with_body(r#"{ "jsonrpc": "2.0", "id": 1, "result": ["Camp", "Summit"] }"#)
            .create_async()
            .await;

        let client = new_client(fast_retries(server.url()))?;
        let names = client.list_names().await?;

        mock.assert_async().await;
        assert_eq!(names, vec!["Camp", "Summit"]);
        Ok(())
    }

    #[test(tokio::test)]
    async fn add_sends_positional_params() -> Result<(), ClientError> {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({ "method": "add", "params": ["Camp", 40.0, -105.0, 2500.0] })))
            .with_body(r#"{ "jsonrpc": "2.0", "id": 1, "result": null }"#)
            .create_async()
            .await;

        let client = new_client(fast_retries(server.url()))?;
        client.add(Waypoint::new("Camp", 40.0, -105.0, 2500.0)).await?;

        mock.assert_async().await;
        Ok(())
    }

    #[test(tokio::test)]
    async fn maps_directory_errors_back() -> Result<(), ClientError> {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .with_body(format!(
                r#"{{ "jsonrpc": "2.0", "id": 1, "error": {{ "code": {}, "message": "no waypoint named 'Lake'", "data": {{ "name": "Lake" }} }} }}"#,
                error_codes::NOT_FOUND
            ))
            .expect(1)
            .create_async()
            .await;

        let client = new_client(fast_retries(server.url()))?;
        let result = client.get("Lake").await;

        mock.assert_async().await;
        assert!(matches!(result, Err(ClientError::Directory(DirectoryError::NotFound(name))) if name == "Lake"));
        Ok(())
    }

    #[test(tokio::test)]
    async fn reports_other_rpc_errors() -> Result<(), ClientError> {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_body(r#"{ "jsonrpc": "2.0", "id": 1, "error": { "code": -32601, "message": "unknown method 'listNames'" } }"#)
            .create_async()
            .await;

        let client = new_client(fast_retries(server.url()))?;
        let result = client.list_names().await;

        assert!(matches!(result, Err(ClientError::Rpc { code: -32601, .. })));
        Ok(())
    }

    #[test(tokio::test)]
    async fn retries_transport_failures() -> Result<(), ClientError> {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/").with_status(503).expect(3).create_async().await;

        let client = new_client(fast_retries(server.url()))?;
        let result = client.library_size().await;

        mock.assert_async().await;
        assert!(matches!(result, Err(ClientError::Transport(_))));
        Ok(())
    }

    #[test(tokio::test)]
    async fn does_not_retry_invalid_responses() -> Result<(), ClientError> {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/").with_body("WebServer").expect(1).create_async().await;

        let client = new_client(fast_retries(server.url()))?;
        let result = client.service_info().await;

        mock.assert_async().await;
        assert!(matches!(result, Err(ClientError::InvalidResponse(_))));
        Ok(())
    }

    #[test(tokio::test)]
    async fn works_against_the_real_server() -> Result<(), ClientError> {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("could not bind");
        let address = listener.local_addr().expect("no local address");
        tokio::spawn(serve(listener, DirectoryService::new(), Duration::from_secs(5), std::future::pending()));

        let client = new_client(fast_retries(format!("http://{}", address)))?;

        client.add(Waypoint::new("Origin", 0.0, 0.0, 0.0)).await?;
        client.add(Waypoint::new("East", 0.0, 90.0, 0.0)).await?;
        assert_eq!(client.list_names().await?, vec!["Origin", "East"]);
        assert_eq!(client.get_active().await?, Some("East".to_string()));

        let duplicate = client.add(Waypoint::new("East", 1.0, 1.0, 1.0)).await;
        assert!(matches!(duplicate, Err(ClientError::Directory(DirectoryError::DuplicateName(name))) if name == "East"));

        client.modify(Waypoint::new("Origin", 0.0, 0.0, 12.0)).await?;
        assert_eq!(client.get("Origin").await?, Waypoint::new("Origin", 0.0, 0.0, 12.0));
        assert_eq!(client.select_and_get("Origin").await?, Waypoint::new("Origin", 0.0, 0.0, 12.0));
        assert_eq!(client.get_active().await?, Some("Origin".to_string()));
        client.set_active("East").await?;

        let result = client.calc_dist_bear("Origin", "East", DistanceUnit::Statute).await?;
        assert!((result.distance - 6218.4685).abs() < 1e-3, "distance was {}", result.distance);
        assert!((result.bearing - 90.0).abs() < 1e-9, "bearing was {}", result.bearing);

        client.set_active("Origin").await?;
        let removal = client.remove("Origin").await?;
        assert_eq!(
            removal,
            Removal {
                active: Some("East".to_string()),
                last_entry: false
            }
        );

        assert_eq!(client.library_size().await?, 1);
        assert_eq!(client.service_info().await?, format!("waypoints v{}", env!("CARGO_PKG_VERSION")));
        client.debug_library().await?;

        let missing = client.remove("Origin").await;
        assert!(matches!(missing, Err(ClientError::Directory(DirectoryError::NotFound(_)))));
        Ok(())
    }
}
