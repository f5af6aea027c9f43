use anyhow::{Result, anyhow};
use std::time::Duration;

use super::protocol::{
    ENDPOINT_FILES, ENDPOINT_FILES_RAW, ENDPOINT_HEALTH, ENDPOINT_STORE_LOCAL, FIELD_FILE,
    FIELD_REPLICA, FIELD_USER_ID, FileEntry, InventoryResponse,
};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const INVENTORY_TIMEOUT: Duration = Duration::from_secs(5);
const HEAD_TIMEOUT: Duration = Duration::from_secs(3);
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(30);
const DELETE_TIMEOUT: Duration = Duration::from_secs(5);

/// How much of a peer's error body is kept for diagnostics.
const BODY_PREFIX_LEN: usize = 200;

/// Typed client for the inter-node endpoints.
///
/// One shared `reqwest::Client` (connection pooling) with per-request
/// timeouts. The client is addressed purely by peer base URLs; it holds no
/// cluster state of its own.
pub struct PeerClient {
    http: reqwest::Client,
}

impl PeerClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    fn raw_url(node_url: &str, user_id: &str, filename: &str) -> String {
        format!(
            "{}{}/{}/{}",
            node_url,
            ENDPOINT_FILES_RAW,
            urlencoding::encode(user_id),
            urlencoding::encode(filename),
        )
    }

    /// `GET /health`; healthy iff the node answers 200 within 5 s.
    pub async fn probe(&self, node_url: &str) -> bool {
        let response = self
            .http
            .get(format!("{}{}", node_url, ENDPOINT_HEALTH))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await;

        matches!(response, Ok(resp) if resp.status() == reqwest::StatusCode::OK)
    }

    /// `GET /files`; a failing or unreachable node degrades to an empty
    /// inventory (the reconciler treats it as holding nothing).
    pub async fn inventory(&self, node_url: &str) -> Vec<FileEntry> {
        let response = self
            .http
            .get(format!("{}{}", node_url, ENDPOINT_FILES))
            .timeout(INVENTORY_TIMEOUT)
            .send()
            .await;

        let Ok(resp) = response else {
            return Vec::new();
        };
        if !resp.status().is_success() {
            return Vec::new();
        }
        match resp.json::<InventoryResponse>().await {
            Ok(body) => body.files,
            Err(e) => {
                tracing::warn!("Malformed inventory from {}: {}", node_url, e);
                Vec::new()
            }
        }
    }

    /// `GET /files/raw/{user}/{file}`; full payload bytes.
    pub async fn raw_get(&self, node_url: &str, user_id: &str, filename: &str) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(Self::raw_url(node_url, user_id, filename))
            .timeout(TRANSFER_TIMEOUT)
            .send()
            .await?;

        let response = Self::check_status(node_url, response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// `HEAD /files/raw/{user}/{file}`; true iff the peer holds the file.
    pub async fn head(&self, node_url: &str, user_id: &str, filename: &str) -> bool {
        let response = self
            .http
            .head(Self::raw_url(node_url, user_id, filename))
            .timeout(HEAD_TIMEOUT)
            .send()
            .await;

        matches!(response, Ok(resp) if resp.status() == reqwest::StatusCode::OK)
    }

    /// Multipart `POST /store-local`. With `replica` set the receiver
    /// stores the payload without re-replicating, which is what breaks
    /// would-be replication cascades.
    pub async fn push(
        &self,
        node_url: &str,
        user_id: &str,
        filename: &str,
        data: Vec<u8>,
        replica: bool,
    ) -> Result<()> {
        let part = reqwest::multipart::Part::bytes(data).file_name(filename.to_string());
        let mut form = reqwest::multipart::Form::new()
            .part(FIELD_FILE, part)
            .text(FIELD_USER_ID, user_id.to_string());
        if replica {
            form = form.text(FIELD_REPLICA, "1");
        }

        let response = self
            .http
            .post(format!("{}{}", node_url, ENDPOINT_STORE_LOCAL))
            .multipart(form)
            .timeout(TRANSFER_TIMEOUT)
            .send()
            .await?;

        Self::check_status(node_url, response).await?;
        Ok(())
    }

    /// `GET /api/files/{user}/{file}/info` on a peer; `None` when the
    /// peer cannot answer.
    pub async fn file_info(
        &self,
        node_url: &str,
        user_id: &str,
        filename: &str,
    ) -> Option<serde_json::Value> {
        let url = format!(
            "{}/api/files/{}/{}/info",
            node_url,
            urlencoding::encode(user_id),
            urlencoding::encode(filename),
        );
        let response = self
            .http
            .get(url)
            .timeout(INVENTORY_TIMEOUT)
            .send()
            .await
            .ok()?;
        if response.status() != reqwest::StatusCode::OK {
            return None;
        }
        response.json().await.ok()
    }

    /// `DELETE /files/raw/{user}/{file}`; removes the peer's local copy
    /// only.
    pub async fn remove(&self, node_url: &str, user_id: &str, filename: &str) -> Result<()> {
        let response = self
            .http
            .delete(Self::raw_url(node_url, user_id, filename))
            .timeout(DELETE_TIMEOUT)
            .send()
            .await?;

        Self::check_status(node_url, response).await?;
        Ok(())
    }

    async fn check_status(
        node_url: &str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let prefix: String = body.chars().take(BODY_PREFIX_LEN).collect();
        Err(anyhow!("peer {} returned {}: {}", node_url, status, prefix))
    }
}

impl Default for PeerClient {
    fn default() -> Self {
        Self::new()
    }
}
