//! PostgREST table client.
//!
//! Requests go to `{url}/rest/v1/{table}` with the project's public key in
//! `apikey` and either the caller's access token or the public key as the
//! bearer, so row-level security sees the signed-in user.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::debug;

use super::{Columns, Filter, RecordStore, Row, SelectQuery, StoreFailure, StoreResult};

/// Table client bound to one table and one bearer token.
#[derive(Clone)]
pub struct RestStore {
    client: Client,
    base_url: String,
    table: String,
    api_key: SecretString,
    bearer: SecretString,
}

impl RestStore {
    /// Client acting with the public key only.
    pub fn new(client: Client, base_url: &str, table: &str, api_key: SecretString) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            table: table.to_string(),
            bearer: api_key.clone(),
            api_key,
        }
    }

    /// Copy of this client acting as the holder of `access_token`.
    pub fn scoped(&self, access_token: &SecretString) -> Self {
        Self {
            bearer: access_token.clone(),
            ..self.clone()
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", self.api_key.expose_secret())
            .header(
                "Authorization",
                format!("Bearer {}", self.bearer.expose_secret()),
            )
            .header("Accept", "application/json")
    }

    async fn send(&self, builder: RequestBuilder) -> StoreResult<Response> {
        let response = self
            .authorize(builder)
            .send()
            .await
            .map_err(|e| StoreFailure::transport(format!("Backend request failed: {}", e)))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        debug!(status = %status, body = %body, "Backend returned an error");

        Err(serde_json::from_str::<StoreFailure>(&body)
            .unwrap_or_else(|_| StoreFailure::transport(format!("HTTP {}: {}", status, body))))
    }

    /// Rows in a successful response. An empty body (void procedures) has none.
    async fn rows(response: Response) -> StoreResult<Vec<Row>> {
        let body = response
            .bytes()
            .await
            .map_err(|e| StoreFailure::transport(format!("Backend response failed: {}", e)))?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        let value: Value = serde_json::from_slice(&body)
            .map_err(|e| StoreFailure::transport(format!("Invalid backend response: {}", e)))?;
        Ok(into_rows(value))
    }
}

/// Accept either an array of objects or a single object.
fn into_rows(value: Value) -> Vec<Row> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(row) => Some(row),
                _ => None,
            })
            .collect(),
        Value::Object(row) => vec![row],
        _ => Vec::new(),
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// PostgREST query-string operator for a filter.
fn filter_param(filter: &Filter) -> (String, String) {
    match filter {
        Filter::Eq(column, value) => (column.clone(), format!("eq.{}", render_value(value))),
        Filter::Contains(column, needle) => {
            (column.clone(), format!("ilike.*{}*", escape_like(needle)))
        }
    }
}

/// Make `needle` match literally inside an `ilike` pattern.
///
/// PostgREST rewrites every `*` to `%` before the pattern reaches Postgres,
/// escaped or not, so a literal star can only be matched as `_`.
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        match c {
            '\\' | '%' | '_' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '*' => escaped.push('_'),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn select_params(query: &SelectQuery) -> Vec<(String, String)> {
    let select = match &query.columns {
        Columns::All => "*".to_string(),
        Columns::Named(columns) => columns.join(","),
    };
    let mut params = vec![("select".to_string(), select)];
    params.extend(query.filters.iter().map(filter_param));
    if let Some(order) = &query.order_desc {
        params.push(("order".to_string(), format!("{}.desc.nullslast", order)));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

#[async_trait]
impl RecordStore for RestStore {
    fn table(&self) -> &str {
        &self.table
    }

    async fn select(&self, query: &SelectQuery) -> StoreResult<Vec<Row>> {
        let builder = self.client.get(self.table_url()).query(&select_params(query));
        let response = self.send(builder).await?;
        Self::rows(response).await
    }

    async fn insert(&self, row: Row) -> StoreResult<()> {
        let builder = self
            .client
            .post(self.table_url())
            .header("Prefer", "return=minimal")
            .json(&row);
        self.send(builder).await?;
        Ok(())
    }

    async fn update(&self, filter: &Filter, patch: Row) -> StoreResult<usize> {
        let builder = self
            .client
            .patch(self.table_url())
            .query(&[filter_param(filter)])
            .header("Prefer", "return=representation")
            .json(&patch);
        let response = self.send(builder).await?;
        Ok(Self::rows(response).await?.len())
    }

    async fn rpc(&self, function: &str, args: Value) -> StoreResult<Vec<Row>> {
        let url = format!(
            "{}/rest/v1/rpc/{}",
            self.base_url,
            urlencoding::encode(function)
        );
        let response = self.send(self.client.post(url).json(&args)).await?;
        Self::rows(response).await
    }
}
