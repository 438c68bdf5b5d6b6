use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::Serialize;

use verifai_shared::{Notification, SyncError, SyncResult};

use super::RemoteNotificationStore;

/// Document-collection client over HTTP.
///
/// The collection is keyed by user id, queryable by equality and creation
/// time, and accepts batched writes; the concrete backend behind the base
/// URL is interchangeable as long as it keeps those semantics.
pub struct HttpRemoteStore {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchReadStateRequest<'a> {
    ids: &'a [String],
    is_read: bool,
}

#[derive(Debug, Serialize)]
struct BatchDeleteRequest<'a> {
    ids: &'a [String],
}

impl HttpRemoteStore {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn decode_page(response: Response) -> SyncResult<Vec<Notification>> {
        response
            .json::<Vec<Notification>>()
            .await
            .map_err(|e| SyncError::remote(format!("malformed notification payload: {e}")))
    }
}

fn map_send_error(e: reqwest::Error) -> SyncError {
    if e.is_connect() || e.is_timeout() {
        SyncError::connectivity(e.to_string())
    } else {
        SyncError::remote(e.to_string())
    }
}

fn check_status(response: Response) -> SyncResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().path().to_string();
    match status {
        StatusCode::NOT_FOUND => Err(SyncError::not_found(url)),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SyncError::permission_denied(url)),
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            Err(SyncError::connectivity(format!("{url}: {status}")))
        }
        _ => Err(SyncError::remote(format!("{url}: unexpected status {status}"))),
    }
}

#[async_trait]
impl RemoteNotificationStore for HttpRemoteStore {
    async fn fetch_page(&self, user_id: &str, limit: i64) -> SyncResult<Vec<Notification>> {
        let response = self
            .client
            .get(self.url("notifications"))
            .query(&[("userId", user_id)])
            .query(&[("orderBy", "createdAt"), ("direction", "desc")])
            .query(&[("limit", limit)])
            .send()
            .await
            .map_err(map_send_error)?;

        Self::decode_page(check_status(response)?).await
    }

    async fn fetch_all(&self) -> SyncResult<Vec<Notification>> {
        let response = self
            .client
            .get(self.url("notifications"))
            .send()
            .await
            .map_err(map_send_error)?;

        Self::decode_page(check_status(response)?).await
    }

    async fn update_read_state(&self, ids: &[String], read: bool) -> SyncResult<()> {
        let response = self
            .client
            .post(self.url("notifications/batch-read"))
            .json(&BatchReadStateRequest { ids, is_read: read })
            .send()
            .await
            .map_err(map_send_error)?;

        check_status(response)?;
        tracing::debug!(count = ids.len(), read, "remote read-state batch applied");
        Ok(())
    }

    async fn mark_all_read(&self, user_id: &str) -> SyncResult<()> {
        let response = self
            .client
            .post(self.url("notifications/mark-all-read"))
            .query(&[("userId", user_id)])
            .send()
            .await
            .map_err(map_send_error)?;

        check_status(response)?;
        Ok(())
    }

    async fn delete(&self, ids: &[String]) -> SyncResult<()> {
        let response = self
            .client
            .post(self.url("notifications/batch-delete"))
            .json(&BatchDeleteRequest { ids })
            .send()
            .await
            .map_err(map_send_error)?;

        check_status(response)?;
        tracing::debug!(count = ids.len(), "remote delete batch applied");
        Ok(())
    }

    async fn delete_all_for_user(&self, user_id: &str) -> SyncResult<()> {
        let response = self
            .client
            .delete(self.url("notifications"))
            .query(&[("userId", user_id)])
            .send()
            .await
            .map_err(map_send_error)?;

        check_status(response)?;
        Ok(())
    }
}
