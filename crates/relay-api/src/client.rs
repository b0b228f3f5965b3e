// Relay backend REST client
//
// Wraps `reqwest::Client` with `/api/v1` URL construction and the
// backend's `{"detail": ...}` error envelope. Every endpoint returns the
// decoded body; 204 responses map to `()`.

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{
    EnablementCreate, EnablementResponse, EnablementTypeInfo, EnablementUpdate, ErrorBody,
    KnownSource, SourceCreate, SourceResponse, SourceUpdate, TakConfigResponse, TakConfigUpdate,
    TakStatusResponse,
};
use crate::transport::TransportConfig;

const API_PREFIX: &str = "api/v1";

/// HTTP client for the relay backend's configuration API.
///
/// Cheap to clone: `reqwest::Client` is internally reference-counted.
#[derive(Debug, Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RelayClient {
    /// Create a client for the backend rooted at `base_url`
    /// (e.g. `http://localhost:8000`).
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
        })
    }

    /// The backend base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Build `{base}/api/v1/{path}`, preserving any path prefix on the base.
    fn api_url(&self, path: &str) -> Result<Url, Error> {
        let full = format!(
            "{}/{API_PREFIX}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Ok(Url::parse(&full)?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let body = self.send(Method::GET, path, None::<&()>).await?;
        decode(&body)
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        payload: &impl Serialize,
    ) -> Result<T, Error> {
        let body = self.send(Method::POST, path, Some(payload)).await?;
        decode(&body)
    }

    async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        payload: &impl Serialize,
    ) -> Result<T, Error> {
        let body = self.send(Method::PUT, path, Some(payload)).await?;
        decode(&body)
    }

    /// Fire a body-less command (`POST .../start`, `DELETE ...`), discarding
    /// whatever the backend returns on success.
    async fn command(&self, method: Method, path: &str) -> Result<(), Error> {
        self.send(method, path, None::<&()>).await.map(|_| ())
    }

    /// Send one request and return the raw body of a successful response.
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        payload: Option<&B>,
    ) -> Result<String, Error> {
        let url = self.api_url(path)?;
        debug!("{method} {url}");

        let mut request = self.http.request(method, url);
        if let Some(payload) = payload {
            request = request.json(payload);
        }

        let resp = request.send().await.map_err(Error::Transport)?;
        let status = resp.status();
        let body = resp.text().await.map_err(Error::Transport)?;

        if status.is_success() {
            return Ok(body);
        }

        Err(Error::Api {
            status: status.as_u16(),
            message: error_message(status, &body),
        })
    }

    // ── Broker (TAK server) ──────────────────────────────────────────

    pub async fn tak_config(&self) -> Result<TakConfigResponse, Error> {
        self.get("tak/config").await
    }

    pub async fn update_tak_config(
        &self,
        update: &TakConfigUpdate,
    ) -> Result<TakConfigResponse, Error> {
        self.put("tak/config", update).await
    }

    /// Ask the backend to (re)connect to the broker. Returns before the
    /// connection is established; watch the status channel for the effect.
    pub async fn tak_connect(&self) -> Result<(), Error> {
        self.command(Method::POST, "tak/connect").await
    }

    pub async fn tak_disconnect(&self) -> Result<(), Error> {
        self.command(Method::POST, "tak/disconnect").await
    }

    pub async fn tak_status(&self) -> Result<TakStatusResponse, Error> {
        self.get("tak/status").await
    }

    // ── Enablement types ─────────────────────────────────────────────

    pub async fn list_enablement_types(&self) -> Result<Vec<EnablementTypeInfo>, Error> {
        self.get("enablement-types").await
    }

    // ── Enablements ──────────────────────────────────────────────────

    pub async fn list_enablements(&self) -> Result<Vec<EnablementResponse>, Error> {
        self.get("enablements").await
    }

    pub async fn get_enablement(&self, id: i64) -> Result<EnablementResponse, Error> {
        self.get(&format!("enablements/{id}")).await
    }

    pub async fn create_enablement(
        &self,
        body: &EnablementCreate,
    ) -> Result<EnablementResponse, Error> {
        self.post("enablements", body).await
    }

    pub async fn update_enablement(
        &self,
        id: i64,
        body: &EnablementUpdate,
    ) -> Result<EnablementResponse, Error> {
        self.put(&format!("enablements/{id}"), body).await
    }

    pub async fn delete_enablement(&self, id: i64) -> Result<(), Error> {
        self.command(Method::DELETE, &format!("enablements/{id}"))
            .await
    }

    /// Start an enablement's polling job. Asynchronous on the backend side.
    pub async fn start_enablement(&self, id: i64) -> Result<(), Error> {
        self.command(Method::POST, &format!("enablements/{id}/start"))
            .await
    }

    /// Stop an enablement's polling job. Asynchronous on the backend side.
    pub async fn stop_enablement(&self, id: i64) -> Result<(), Error> {
        self.command(Method::POST, &format!("enablements/{id}/stop"))
            .await
    }

    pub async fn known_sources(&self, enablement_id: i64) -> Result<Vec<KnownSource>, Error> {
        self.get(&format!("enablements/{enablement_id}/known-sources"))
            .await
    }

    // ── Sources ──────────────────────────────────────────────────────

    pub async fn list_sources(&self, enablement_id: i64) -> Result<Vec<SourceResponse>, Error> {
        self.get(&format!("enablements/{enablement_id}/sources"))
            .await
    }

    pub async fn create_source(
        &self,
        enablement_id: i64,
        body: &SourceCreate,
    ) -> Result<SourceResponse, Error> {
        self.post(&format!("enablements/{enablement_id}/sources"), body)
            .await
    }

    pub async fn update_source(
        &self,
        enablement_id: i64,
        source_id: i64,
        body: &SourceUpdate,
    ) -> Result<SourceResponse, Error> {
        self.put(
            &format!("enablements/{enablement_id}/sources/{source_id}"),
            body,
        )
        .await
    }

    pub async fn delete_source(&self, enablement_id: i64, source_id: i64) -> Result<(), Error> {
        self.command(
            Method::DELETE,
            &format!("enablements/{enablement_id}/sources/{source_id}"),
        )
        .await
    }
}

// ── Body helpers ─────────────────────────────────────────────────────

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    serde_json::from_str(body).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: body.to_owned(),
    })
}

/// Extract the backend's `detail` message, falling back to the HTTP
/// reason phrase when the body is not the expected envelope.
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body).map_or_else(
        |_| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_owned()
        },
        |parsed| parsed.detail.message(),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn api_url_keeps_base_path_prefix() {
        let client =
            RelayClient::from_reqwest("https://ops.example/relay/", reqwest::Client::new())
                .unwrap();
        assert_eq!(
            client.api_url("enablements/3/start").unwrap().as_str(),
            "https://ops.example/relay/api/v1/enablements/3/start"
        );
    }

    #[test]
    fn error_message_falls_back_to_reason() {
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "<html>oops</html>"),
            "Bad Gateway"
        );
        assert_eq!(
            error_message(StatusCode::NOT_FOUND, r#"{"detail":"Enablement not found"}"#),
            "Enablement not found"
        );
    }
}
