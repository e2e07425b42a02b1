//! HTTP client wrapper for the hosted data service's table API.

use crate::backend::{
    query::{Filter, TableQuery, filter_params},
    types::BackendError,
};
use crate::config::get_config;
use reqwest::{Client, Method};
use serde::{Serialize, de::DeserializeOwned};

const REST_PREFIX: &str = "rest/v1";
const RETURN_REPRESENTATION: &str = "return=representation";

/// Lightweight HTTP client for catalog tables and the auth API.
#[derive(Clone)]
pub struct BackendClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
}

impl BackendClient {
    /// Construct a new client using configuration derived from the environment.
    pub fn new() -> Result<Self, BackendError> {
        let config = get_config();
        Self::from_parts(&config.supabase_url, config.supabase_anon_key.clone())
    }

    /// Construct a client for an explicit service URL and anon key.
    pub fn from_parts(base_url: &str, api_key: impl Into<String>) -> Result<Self, BackendError> {
        let client = Client::builder().user_agent("promptshelf/0.1").build()?;
        let base_url = normalize_base_url(base_url).map_err(BackendError::InvalidUrl)?;
        let api_key = api_key.into();
        tracing::debug!(
            url = %base_url,
            has_api_key = !api_key.is_empty(),
            "Initialized backend HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Base URL the client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Read rows from `table`.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &TableQuery,
        token: Option<&str>,
    ) -> Result<Vec<T>, BackendError> {
        let response = self
            .request(Method::GET, &table_path(table), token)
            .query(&query.to_params())
            .send()
            .await?;

        let response = self.ensure_success(response, table, "Table read failed").await?;
        let rows: Vec<T> = response.json().await?;
        tracing::debug!(table, rows = rows.len(), "Table read completed");
        Ok(rows)
    }

    /// Read a single row by its `id` column.
    pub async fn select_by_id<T: DeserializeOwned>(
        &self,
        table: &str,
        id: &str,
        token: Option<&str>,
    ) -> Result<Option<T>, BackendError> {
        let query = TableQuery::new().eq("id", id).range(0, 0);
        let mut rows = self.select(table, &query, token).await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    /// Insert a row and return the stored representation.
    pub async fn insert<B, T>(
        &self,
        table: &str,
        body: &B,
        token: Option<&str>,
    ) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::POST, &table_path(table), token)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(body)
            .send()
            .await?;

        let response = self.ensure_success(response, table, "Insert failed").await?;
        let mut rows: Vec<T> = response.json().await?;
        if rows.is_empty() {
            return Err(BackendError::EmptyResponse {
                table: table.to_string(),
            });
        }
        tracing::debug!(table, "Row inserted");
        Ok(rows.swap_remove(0))
    }

    /// Patch the rows matching `filters`, returning the first updated row.
    ///
    /// `None` means no row matched (missing, or filtered out by ownership).
    pub async fn update_where<B, T>(
        &self,
        table: &str,
        filters: &[Filter],
        patch: &B,
        token: Option<&str>,
    ) -> Result<Option<T>, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::PATCH, &table_path(table), token)
            .header("Prefer", RETURN_REPRESENTATION)
            .query(&filter_params(filters))
            .json(patch)
            .send()
            .await?;

        let response = self.ensure_success(response, table, "Update failed").await?;
        let mut rows: Vec<T> = response.json().await?;
        tracing::debug!(table, matched = rows.len(), "Update completed");
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    /// Delete the rows matching `filters`; `true` when at least one row was removed.
    pub async fn delete_where(
        &self,
        table: &str,
        filters: &[Filter],
        token: Option<&str>,
    ) -> Result<bool, BackendError> {
        let response = self
            .request(Method::DELETE, &table_path(table), token)
            .header("Prefer", RETURN_REPRESENTATION)
            .query(&filter_params(filters))
            .send()
            .await?;

        let response = self.ensure_success(response, table, "Delete failed").await?;
        let rows: Vec<serde_json::Value> = response.json().await?;
        tracing::debug!(table, deleted = rows.len(), "Delete completed");
        Ok(!rows.is_empty())
    }

    pub(crate) fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
    ) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        let bearer = token
            .filter(|value| !value.is_empty())
            .unwrap_or(&self.api_key);
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
    }

    pub(crate) async fn ensure_success(
        &self,
        response: reqwest::Response,
        resource: &str,
        context: &'static str,
    ) -> Result<reqwest::Response, BackendError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = BackendError::UnexpectedStatus { status, body };
            tracing::error!(resource, error = %error, "{context}");
            Err(error)
        }
    }
}

fn table_path(table: &str) -> String {
    format!("{REST_PREFIX}/{table}")
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

pub(crate) fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::query::Direction;
    use httpmock::{
        Method::{DELETE, GET, PATCH, POST},
        MockServer,
    };
    use serde_json::{Value, json};

    fn client_for(server: &MockServer) -> BackendClient {
        BackendClient::from_parts(&server.base_url(), "anon-key").expect("client")
    }

    #[tokio::test]
    async fn select_emits_postgrest_query() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/rest/v1/rules")
                    .header("apikey", "anon-key")
                    .header("authorization", "Bearer anon-key")
                    .query_param("select", "*")
                    .query_param("is_public", "eq.true")
                    .query_param("order", "created_at.desc")
                    .query_param("offset", "0")
                    .query_param("limit", "12");
                then.status(200)
                    .json_body(json!([{ "id": "r1" }, { "id": "r2" }]));
            })
            .await;

        let query = TableQuery::new()
            .eq("is_public", true)
            .order("created_at", Direction::Descending)
            .range(0, 11);
        let rows: Vec<Value> = client_for(&server)
            .select("rules", &query, None)
            .await
            .expect("select");

        mock.assert_async().await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["id"], "r2");
    }

    #[tokio::test]
    async fn select_by_id_returns_none_for_empty_result() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/rest/v1/prompts")
                    .query_param("id", "eq.missing");
                then.status(200).json_body(json!([]));
            })
            .await;

        let row: Option<Value> = client_for(&server)
            .select_by_id("prompts", "missing", None)
            .await
            .expect("select");
        assert!(row.is_none());
    }

    #[tokio::test]
    async fn insert_uses_user_token_and_returns_row() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/rest/v1/prompts")
                    .header("authorization", "Bearer user-token")
                    .header("prefer", "return=representation")
                    .json_body(json!({ "title": "Hello" }));
                then.status(201)
                    .json_body(json!([{ "id": "p1", "title": "Hello" }]));
            })
            .await;

        let row: Value = client_for(&server)
            .insert("prompts", &json!({ "title": "Hello" }), Some("user-token"))
            .await
            .expect("insert");

        mock.assert_async().await;
        assert_eq!(row["id"], "p1");
    }

    #[tokio::test]
    async fn update_where_reports_unmatched_rows() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PATCH)
                    .path("/rest/v1/rules")
                    .query_param("id", "eq.r1")
                    .query_param("user_id", "eq.someone-else");
                then.status(200).json_body(json!([]));
            })
            .await;

        let updated: Option<Value> = client_for(&server)
            .update_where(
                "rules",
                &[Filter::eq("id", "r1"), Filter::eq("user_id", "someone-else")],
                &json!({ "is_public": false }),
                Some("token"),
            )
            .await
            .expect("update");
        assert!(updated.is_none());
    }

    #[tokio::test]
    async fn delete_where_surfaces_status_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/rest/v1/rules");
                then.status(500).body("boom");
            })
            .await;

        let err = client_for(&server)
            .delete_where("rules", &[Filter::eq("id", "r1")], Some("token"))
            .await
            .expect_err("delete should fail");
        match err {
            BackendError::UnexpectedStatus { status, body } => {
                assert_eq!(status.as_u16(), 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn format_endpoint_joins_without_duplicate_slashes() {
        assert_eq!(
            format_endpoint("https://demo.test/", "/rest/v1/rules"),
            "https://demo.test/rest/v1/rules"
        );
    }
}
