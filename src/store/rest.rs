//! HTTP implementation of [`RecordStore`] against `/api/now/table`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{QueryOptions, Record, RecordStore, StoreError};
use crate::filter::FilterExpression;

/// Credentials attached to every request.
#[derive(Clone)]
pub enum Auth {
    /// HTTP basic authentication.
    Basic {
        /// Account name.
        username: String,
        /// Account password.
        password: String,
    },
    /// OAuth bearer token.
    Bearer(String),
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::Bearer(_) => f.debug_tuple("Bearer").field(&"<redacted>").finish(),
        }
    }
}

/// Table API client for one ServiceNow instance.
#[derive(Debug, Clone)]
pub struct RestStore {
    base_url: String,
    auth: Auth,
    client: Client,
}

/// Every Table API body is wrapped in `result`.
#[derive(Deserialize, Debug)]
struct Envelope<T> {
    result: T,
}

#[derive(Deserialize, Debug)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize, Debug)]
struct ErrorBody {
    message: Option<String>,
    detail: Option<String>,
}

impl RestStore {
    /// Client for the instance at `base_url`.
    pub fn new(base_url: &str, auth: Auth, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            client,
        })
    }

    /// Instance URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/api/now/table/{}", self.base_url, table)
    }

    fn record_url(&self, table: &str, sys_id: &str) -> String {
        format!("{}/{}", self.table_url(table), sys_id)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("Accept", "application/json");
        match &self.auth {
            Auth::Basic { username, password } => request.basic_auth(username, Some(password)),
            Auth::Bearer(token) => request.bearer_auth(token),
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        self.authorize(request)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))
    }

    /// Turn a non-success response into the matching [`StoreError`].
    async fn check(
        response: Response,
        table: &str,
        sys_id: Option<&str>,
    ) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<ErrorEnvelope>(&body).ok();
        let (message, detail) = match parsed {
            Some(envelope) => (
                envelope.error.message.unwrap_or_else(|| status.to_string()),
                envelope.error.detail,
            ),
            None if body.trim().is_empty() => (status.to_string(), None),
            None => (body, None),
        };

        tracing::debug!(
            status = status.as_u16(),
            table,
            message = message.as_str(),
            "table api error"
        );

        match (status, sys_id) {
            (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => Err(StoreError::Auth {
                status: status.as_u16(),
                message,
            }),
            (StatusCode::NOT_FOUND, Some(sys_id)) => Err(StoreError::NotFound {
                table: table.to_string(),
                sys_id: sys_id.to_string(),
            }),
            _ => Err(StoreError::Remote {
                status: status.as_u16(),
                message,
                detail,
            }),
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, StoreError> {
        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(envelope.result)
    }
}

fn fields_param(fields: &[String]) -> String {
    fields.join(",")
}

#[async_trait]
impl RecordStore for RestStore {
    async fn query(
        &self,
        table: &str,
        filter: Option<&FilterExpression>,
        options: &QueryOptions,
    ) -> Result<Vec<Record>, StoreError> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(query) = filter.and_then(FilterExpression::to_query) {
            params.push(("sysparm_query", query));
        }
        if let Some(limit) = options.limit {
            params.push(("sysparm_limit", limit.to_string()));
        }
        if let Some(offset) = options.offset {
            params.push(("sysparm_offset", offset.to_string()));
        }
        if let Some(fields) = options.fields.as_deref().filter(|f| !f.is_empty()) {
            params.push(("sysparm_fields", fields_param(fields)));
        }
        if let Some(display) = options.display_value {
            params.push(("sysparm_display_value", display.as_param().to_string()));
        }
        if let Some(exclude) = options.exclude_reference_link {
            params.push(("sysparm_exclude_reference_link", exclude.to_string()));
        }

        tracing::debug!(table, ?params, "GET table");
        let request = self.client.get(self.table_url(table)).query(&params);
        let response = Self::check(self.send(request).await?, table, None).await?;
        Self::decode(response).await
    }

    async fn get(
        &self,
        table: &str,
        sys_id: &str,
        fields: Option<&[String]>,
    ) -> Result<Record, StoreError> {
        let mut request = self.client.get(self.record_url(table, sys_id));
        if let Some(fields) = fields.filter(|f| !f.is_empty()) {
            request = request.query(&[("sysparm_fields", fields_param(fields))]);
        }

        tracing::debug!(table, sys_id, "GET record");
        let response = Self::check(self.send(request).await?, table, Some(sys_id)).await?;
        Self::decode(response).await
    }

    async fn create(&self, table: &str, data: &Record) -> Result<Record, StoreError> {
        tracing::debug!(table, fields = data.len(), "POST record");
        let request = self.client.post(self.table_url(table)).json(data);
        let response = Self::check(self.send(request).await?, table, None).await?;
        Self::decode(response).await
    }

    async fn update(&self, table: &str, sys_id: &str, data: &Record) -> Result<Record, StoreError> {
        tracing::debug!(table, sys_id, fields = data.len(), "PATCH record");
        let request = self.client.patch(self.record_url(table, sys_id)).json(data);
        let response = Self::check(self.send(request).await?, table, Some(sys_id)).await?;
        Self::decode(response).await
    }

    async fn delete(&self, table: &str, sys_id: &str) -> Result<(), StoreError> {
        tracing::debug!(table, sys_id, "DELETE record");
        let request = self.client.delete(self.record_url(table, sys_id));
        Self::check(self.send(request).await?, table, Some(sys_id)).await?;
        Ok(())
    }
}
