//! Table-oriented HTTP client for the PostgREST API.
//!
//! The client owns transport details only: URL and filter encoding, auth
//! headers, and decoding of the response into [`ApiResponse`]. Transport
//! failures (DNS, refused connection, broken body) come back as the outer
//! `RepositoryError`; anything the server answered comes back as the inner
//! `ApiResponse`.

use std::fmt;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::db::config::SupabaseConfig;
use crate::db::repository::{ErrorContext, RepositoryError, RepositoryResult};

/// Outcome of a request the server answered.
pub type ApiResponse<T> = Result<T, ApiError>;

/// Error body returned by PostgREST, plus the HTTP status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    #[serde(skip)]
    pub status: u16,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl ApiError {
    /// Context suitable for attaching to a `RepositoryError`.
    pub fn context(&self, operation: &str, table: &str) -> ErrorContext {
        let mut details = format!("status={}", self.status);
        if let Some(code) = &self.code {
            details.push_str(&format!(", code={}", code));
        }
        if let Some(extra) = &self.details {
            details.push_str(&format!(", detail={}", extra));
        }
        ErrorContext::new(operation)
            .with_entity(table)
            .with_details(details)
    }
}

/// Decode a raw response into an [`ApiResponse`].
///
/// An empty success body decodes as JSON `null`. A success body that does
/// not match `T` is reported as an `ApiError` carrying the original status.
pub fn decode_response<T: DeserializeOwned>(status: u16, body: &[u8]) -> ApiResponse<T> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        b"null".as_slice()
    } else {
        body
    };

    if (200..300).contains(&status) {
        return serde_json::from_slice(body).map_err(|e| ApiError {
            status,
            message: format!("invalid response body: {}", e),
            ..Default::default()
        });
    }

    match serde_json::from_slice::<ApiError>(body) {
        Ok(mut error) if !error.message.is_empty() => {
            error.status = status;
            Err(error)
        }
        _ => Err(ApiError {
            status,
            message: String::from_utf8_lossy(body).trim().to_string(),
            ..Default::default()
        }),
    }
}

/// Query-string builder for table requests.
///
/// ```
/// use escala::db::repositories::rest::Query;
///
/// let q = Query::all().eq("weekday", "segunda").order("start_time.asc");
/// assert_eq!(q.to_string(), "select=*&weekday=eq.segunda&order=start_time.asc");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    params: Vec<(String, String)>,
}

impl Query {
    /// `select=*` with no filters.
    pub fn all() -> Self {
        Self {
            params: vec![("select".to_string(), "*".to_string())],
        }
    }

    /// Add an equality filter (`column=eq.value`).
    pub fn eq(mut self, column: &str, value: impl fmt::Display) -> Self {
        self.params
            .push((column.to_string(), format!("eq.{}", value)));
        self
    }

    /// Set the ordering, e.g. `name.asc` or `start_time.asc,id.asc`.
    pub fn order(mut self, order: &str) -> Self {
        self.params.push(("order".to_string(), order.to_string()));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.params.push(("limit".to_string(), limit.to_string()));
        self
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        f.write_str(&joined.join("&"))
    }
}

/// Thin reqwest wrapper speaking the PostgREST table and RPC conventions.
#[derive(Clone, Debug)]
pub struct TableClient {
    http: Client,
    base_url: String,
    key: String,
    schema: Option<String>,
}

impl TableClient {
    /// Build a client for the given project.
    ///
    /// # Errors
    /// Returns `ConfigurationError` when the URL is not absolute or the
    /// underlying reqwest client cannot be constructed.
    pub fn new(config: &SupabaseConfig) -> RepositoryResult<Self> {
        let base_url = config.url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| {
            RepositoryError::configuration(format!("invalid SUPABASE_URL '{}': {}", base_url, e))
        })?;
        let http = Client::builder().build().map_err(|e| {
            RepositoryError::configuration(format!("failed to build HTTP client: {}", e))
        })?;
        Ok(Self {
            http,
            base_url,
            key: config.key.clone(),
            schema: config.schema.clone(),
        })
    }

    /// `{base}/rest/v1/{table}?{query}`
    pub fn table_url(&self, table: &str, query: &Query) -> RepositoryResult<Url> {
        let raw = format!("{}/rest/v1/{}", self.base_url, table);
        Url::parse_with_params(&raw, query.params())
            .map_err(|e| RepositoryError::configuration(format!("invalid table URL: {}", e)))
    }

    /// `{base}/rest/v1/rpc/{function}`
    pub fn rpc_url(&self, function: &str) -> RepositoryResult<Url> {
        let raw = format!("{}/rest/v1/rpc/{}", self.base_url, function);
        Url::parse(&raw)
            .map_err(|e| RepositoryError::configuration(format!("invalid RPC URL: {}", e)))
    }

    fn headers(&self, representation: bool) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Ok(value) = HeaderValue::from_str(&self.key) {
            headers.insert("apikey", value);
        }
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", self.key)) {
            headers.insert(AUTHORIZATION, value);
        }
        if representation {
            headers.insert("prefer", HeaderValue::from_static("return=representation"));
        }
        if let Some(schema) = self.schema.as_deref() {
            if let Ok(value) = HeaderValue::from_str(schema) {
                headers.insert("accept-profile", value.clone());
                headers.insert("content-profile", value);
            }
        }
        headers
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&(impl Serialize + Sync)>,
        operation: &str,
    ) -> RepositoryResult<ApiResponse<T>> {
        let representation = method != Method::GET;
        log::debug!("PostgREST {} {}", method, url);
        let mut request = self
            .http
            .request(method, url)
            .headers(self.headers(representation));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            RepositoryError::connection_with_context(e.to_string(), ErrorContext::new(operation))
        })?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|e| {
            RepositoryError::connection_with_context(e.to_string(), ErrorContext::new(operation))
        })?;
        Ok(decode_response(status, &bytes))
    }

    /// `GET /rest/v1/{table}`
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &Query,
    ) -> RepositoryResult<ApiResponse<Vec<T>>> {
        let url = self.table_url(table, query)?;
        self.send(Method::GET, url, None::<&()>, "select").await
    }

    /// `POST /rest/v1/{table}` returning the inserted rows.
    pub async fn insert<B, T>(&self, table: &str, body: &B) -> RepositoryResult<ApiResponse<Vec<T>>>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.table_url(table, &Query::all())?;
        self.send(Method::POST, url, Some(body), "insert").await
    }

    /// `PATCH /rest/v1/{table}?{filters}` returning the updated rows.
    pub async fn update<B, T>(
        &self,
        table: &str,
        query: &Query,
        body: &B,
    ) -> RepositoryResult<ApiResponse<Vec<T>>>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.table_url(table, query)?;
        self.send(Method::PATCH, url, Some(body), "update").await
    }

    /// `DELETE /rest/v1/{table}?{filters}` returning the removed rows.
    pub async fn delete<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &Query,
    ) -> RepositoryResult<ApiResponse<Vec<T>>> {
        let url = self.table_url(table, query)?;
        self.send(Method::DELETE, url, None::<&()>, "delete").await
    }

    /// `POST /rest/v1/rpc/{function}` with named arguments.
    pub async fn rpc<B: Serialize + Sync>(
        &self,
        function: &str,
        args: &B,
    ) -> RepositoryResult<ApiResponse<serde_json::Value>> {
        let url = self.rpc_url(function)?;
        self.send(Method::POST, url, Some(args), "rpc").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> TableClient {
        TableClient::new(&SupabaseConfig::new("https://demo.supabase.co/", "anon-key")).unwrap()
    }

    #[test]
    fn test_table_url_encodes_filters() {
        let q = Query::all()
            .eq("activity_code", "disponivel horario")
            .order("name.asc");
        let url = client().table_url("activity_types", &q).unwrap();
        assert_eq!(url.path(), "/rest/v1/activity_types");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("select".to_string(), "*".to_string()),
                ("activity_code".to_string(), "eq.disponivel horario".to_string()),
                ("order".to_string(), "name.asc".to_string()),
            ]
        );
    }

    #[test]
    fn test_rpc_url() {
        let url = client().rpc_url("create_table_if_not_exists").unwrap();
        assert_eq!(
            url.as_str(),
            "https://demo.supabase.co/rest/v1/rpc/create_table_if_not_exists"
        );
    }

    #[test]
    fn test_invalid_base_url_is_configuration_error() {
        let err = TableClient::new(&SupabaseConfig::new("not a url", "k")).unwrap_err();
        assert!(matches!(err, RepositoryError::ConfigurationError { .. }));
    }

    #[test]
    fn test_headers_carry_key_and_prefer() {
        let headers = client().headers(true);
        assert_eq!(headers["apikey"], "anon-key");
        assert_eq!(headers[AUTHORIZATION], "Bearer anon-key");
        assert_eq!(headers["prefer"], "return=representation");
        assert!(!client().headers(false).contains_key("prefer"));
    }

    #[test]
    fn test_decode_success_rows() {
        let rows: ApiResponse<Vec<serde_json::Value>> =
            decode_response(200, br#"[{"id":1},{"id":2}]"#);
        assert_eq!(rows.unwrap().len(), 2);
    }

    #[test]
    fn test_decode_empty_success_body_is_null() {
        let value: ApiResponse<serde_json::Value> = decode_response(204, b"");
        assert_eq!(value.unwrap(), serde_json::Value::Null);
    }

    #[test]
    fn test_decode_postgrest_error() {
        let body = br#"{"code":"23505","details":"Key (code)=(aula) already exists.","hint":null,"message":"duplicate key value violates unique constraint \"activity_types_code_key\""}"#;
        let err = decode_response::<Vec<serde_json::Value>>(409, body).unwrap_err();
        assert_eq!(err.status, 409);
        assert_eq!(err.code.as_deref(), Some("23505"));
        assert!(err.message.starts_with("duplicate key"));
        assert!(err.context("create", "activity_types").to_string().contains("code=23505"));
    }

    #[test]
    fn test_decode_non_json_error() {
        let err = decode_response::<Vec<serde_json::Value>>(502, b"Bad Gateway").unwrap_err();
        assert_eq!(err.status, 502);
        assert_eq!(err.message, "Bad Gateway");
        assert!(err.code.is_none());
    }

    #[test]
    fn test_decode_mismatched_success_body() {
        let err = decode_response::<Vec<serde_json::Value>>(200, br#"{"id":1}"#).unwrap_err();
        assert_eq!(err.status, 200);
        assert!(err.message.starts_with("invalid response body"));
    }
}
