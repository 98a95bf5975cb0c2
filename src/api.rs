//! Remote resource client for the CityTrack HTTP API.
//!
//! Every operation returns `Result<Value, ApiError>`: transport failures,
//! non-2xx statuses and undecodable bodies are all normalized into the one
//! [`ApiError`] shape so callers branch on the result instead of catching
//! anything. Successful bodies pass through undecoded and unvalidated.
//!
//! Authentication is a type transition rather than client mutation: the
//! anonymous [`Client`] can only probe health and log in; a successful login
//! yields an [`AuthedClient`] that carries its bearer token immutably and
//! attaches it to every request.

use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method, RequestBuilder, Url};
use serde_json::{json, Value};
use std::fmt;
use thiserror::Error;
use tracing::warn;

use crate::model::{NewDepartment, NewWorker};

/// Uniform remote-call failure. Transport errors, HTTP error statuses and
/// response-shape errors are distinguishable only by message content.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ApiError(String);

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// The seam the bulk provisioning orchestrator drives; stubbed in tests.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    async fn create_worker(&self, request: &NewWorker) -> ApiResult<Value>;
}

/// Anonymous client: a base endpoint and an HTTP connection pool, no
/// credential.
#[derive(Clone)]
pub struct Client {
    http: HttpClient,
    base_url: Url,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Client holding the bearer token obtained at login.
#[derive(Clone)]
pub struct AuthedClient {
    http: HttpClient,
    base_url: Url,
    token: String,
}

impl fmt::Debug for AuthedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthedClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Successful login: the authenticated client plus the untouched response
/// body (token type, user record, ...).
#[derive(Debug)]
pub struct Login {
    pub client: AuthedClient,
    pub payload: Value,
}

impl Client {
    pub fn new(base_url: Url) -> Self {
        let http = HttpClient::builder()
            .user_agent("citytrack-provisioner/0.1")
            .no_proxy()
            .build()
            .expect("reqwest client");
        Self { http, base_url }
    }

    /// `GET /health/health`. Requires no credential.
    pub async fn health(&self) -> ApiResult<Value> {
        let url = join(&self.base_url, "health/health")?;
        dispatch(self.http.get(url), "health check").await
    }

    /// `POST /admin/login`. A 2xx body without an `access_token` field is
    /// reported as an [`ApiError`] exactly like a transport failure.
    pub async fn login(self, email: &str, password: &str, expected_role: &str) -> ApiResult<Login> {
        let url = join(&self.base_url, "admin/login")?;
        let body = json!({
            "email": email,
            "password": password,
            "expected_role": expected_role,
        });
        let payload = dispatch(
            self.http
                .post(url)
                .header("Content-Type", "application/json")
                .json(&body),
            "admin login",
        )
        .await?;

        let token = match payload.get("access_token").and_then(Value::as_str) {
            Some(token) => token.to_string(),
            None => {
                warn!("login response missing access_token");
                return Err(ApiError::new("admin login: missing access_token"));
            }
        };

        Ok(Login {
            client: AuthedClient {
                http: self.http,
                base_url: self.base_url,
                token,
            },
            payload,
        })
    }
}

impl AuthedClient {
    fn get(&self, path: &str) -> ApiResult<RequestBuilder> {
        let url = join(&self.base_url, path)?;
        Ok(self
            .http
            .get(url)
            .header("Authorization", format!("Bearer {}", self.token)))
    }

    fn send_json(&self, method: Method, path: &str, body: &Value) -> ApiResult<RequestBuilder> {
        let url = join(&self.base_url, path)?;
        Ok(self
            .http
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Content-Type", "application/json")
            .json(body))
    }

    /// `GET /issues` with paging parameters.
    pub async fn get_issues(&self, limit: i64, skip: i64) -> ApiResult<Value> {
        let request = self.get("issues")?.query(&[("limit", limit), ("skip", skip)]);
        dispatch(request, "fetch issues").await
    }

    /// `GET /issues/{id}`.
    pub async fn get_issue(&self, issue_id: &str) -> ApiResult<Value> {
        dispatch(self.get(&format!("issues/{issue_id}"))?, "fetch issue").await
    }

    /// `POST /issues`.
    pub async fn create_issue(&self, payload: &Value) -> ApiResult<Value> {
        dispatch(
            self.send_json(Method::POST, "issues", payload)?,
            "create issue",
        )
        .await
    }

    /// `PUT /issues/{id}`.
    pub async fn update_issue(&self, issue_id: &str, payload: &Value) -> ApiResult<Value> {
        dispatch(
            self.send_json(Method::PUT, &format!("issues/{issue_id}"), payload)?,
            "update issue",
        )
        .await
    }

    /// `GET /admin/departments`. The response shape is remote-defined; see
    /// [`crate::model::normalize_departments`].
    pub async fn list_departments(&self) -> ApiResult<Value> {
        dispatch(self.get("admin/departments")?, "fetch departments").await
    }

    /// `POST /admin/departments`.
    pub async fn create_department(&self, department: &NewDepartment) -> ApiResult<Value> {
        let body = serde_json::to_value(department)
            .map_err(|err| ApiError::new(format!("create department: {err}")))?;
        dispatch(
            self.send_json(Method::POST, "admin/departments", &body)?,
            "create department",
        )
        .await
    }

    /// `GET /admin/members`, optionally scoped to one department.
    ///
    /// When the response is a list it is filtered client-side to entries
    /// whose `role` is `"worker"`; any other shape is returned raw. The
    /// asymmetry is part of the existing contract and kept as-is.
    pub async fn list_workers(&self, department_id: Option<&str>) -> ApiResult<Value> {
        let mut request = self.get("admin/members")?;
        if let Some(id) = department_id {
            request = request.query(&[("department_id", id)]);
        }
        let response = dispatch(request, "fetch workers").await?;
        Ok(filter_workers(response))
    }

    /// `POST /admin/members`.
    pub async fn create_worker(&self, worker: &NewWorker) -> ApiResult<Value> {
        let body = serde_json::to_value(worker)
            .map_err(|err| ApiError::new(format!("create worker: {err}")))?;
        dispatch(
            self.send_json(Method::POST, "admin/members", &body)?,
            "create worker",
        )
        .await
    }

    /// `GET /worker/tasks`: tasks assigned to the caller's own identity.
    pub async fn worker_tasks(&self) -> ApiResult<Value> {
        dispatch(self.get("worker/tasks")?, "fetch worker tasks").await
    }

    /// `POST /issues/{id}/assign`.
    pub async fn assign_issue(&self, issue_id: &str, worker_id: &str) -> ApiResult<Value> {
        let body = json!({ "worker_id": worker_id });
        dispatch(
            self.send_json(Method::POST, &format!("issues/{issue_id}/assign"), &body)?,
            "assign issue",
        )
        .await
    }

    /// `PUT /issues/{id}/resolve`.
    pub async fn resolve_issue(&self, issue_id: &str, payload: &Value) -> ApiResult<Value> {
        dispatch(
            self.send_json(Method::PUT, &format!("issues/{issue_id}/resolve"), payload)?,
            "resolve issue",
        )
        .await
    }

    /// `GET /admin/stats`.
    pub async fn issue_stats(&self) -> ApiResult<Value> {
        dispatch(self.get("admin/stats")?, "fetch stats").await
    }

    /// `GET /admin/stats/heatmap`, optionally scoped to one city.
    pub async fn heatmap(&self, city: Option<&str>) -> ApiResult<Value> {
        let mut request = self.get("admin/stats/heatmap")?;
        if let Some(city) = city {
            request = request.query(&[("city", city)]);
        }
        dispatch(request, "fetch heatmap").await
    }
}

#[async_trait]
impl MemberDirectory for AuthedClient {
    async fn create_worker(&self, request: &NewWorker) -> ApiResult<Value> {
        AuthedClient::create_worker(self, request).await
    }
}

fn join(base_url: &Url, path: &str) -> ApiResult<Url> {
    base_url
        .join(path)
        .map_err(|err| ApiError::new(format!("invalid endpoint {path}: {err}")))
}

/// Issue a request and normalize every failure cause into [`ApiError`].
async fn dispatch(request: RequestBuilder, what: &str) -> ApiResult<Value> {
    let response = match request.send().await {
        Ok(response) => response,
        Err(err) => {
            warn!(%err, what, "request failed");
            return Err(ApiError::new(format!("{what}: {err}")));
        }
    };

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(%status, what, "remote returned error status");
        return Err(ApiError::new(format!("{what}: status {status}: {body}")));
    }

    match response.json::<Value>().await {
        Ok(value) => Ok(value),
        Err(err) => {
            warn!(%err, what, "response body is not valid JSON");
            Err(ApiError::new(format!("{what}: invalid response JSON: {err}")))
        }
    }
}

/// Client-side role filter applied to the member list. Lists keep only
/// objects with `role == "worker"`; non-list responses pass through raw.
fn filter_workers(response: Value) -> Value {
    match response {
        Value::Array(members) => Value::Array(
            members
                .into_iter()
                .filter(|member| member.get("role").and_then(Value::as_str) == Some("worker"))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authed() -> AuthedClient {
        AuthedClient {
            http: HttpClient::new(),
            base_url: Url::parse("https://api.example.test/").unwrap(),
            token: "token".into(),
        }
    }

    #[test]
    fn get_requests_carry_bearer_token() {
        let request = authed().get("admin/departments").unwrap().build().unwrap();
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.url().path(), "/admin/departments");
        assert_eq!(
            request
                .headers()
                .get("Authorization")
                .and_then(|h| h.to_str().ok())
                .unwrap(),
            "Bearer token"
        );
    }

    #[test]
    fn json_requests_set_content_type() {
        let request = authed()
            .send_json(Method::POST, "admin/members", &json!({"name": "x"}))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.url().path(), "/admin/members");
        let headers = request.headers();
        assert_eq!(
            headers
                .get("Content-Type")
                .and_then(|h| h.to_str().ok())
                .unwrap(),
            "application/json"
        );
        assert_eq!(
            headers
                .get("Authorization")
                .and_then(|h| h.to_str().ok())
                .unwrap(),
            "Bearer token"
        );
    }

    #[test]
    fn query_parameters_are_appended() {
        let request = authed()
            .get("issues")
            .unwrap()
            .query(&[("limit", 10i64), ("skip", 0)])
            .build()
            .unwrap();
        assert_eq!(request.url().query(), Some("limit=10&skip=0"));
    }

    #[test]
    fn worker_filter_keeps_only_workers_from_lists() {
        let response = json!([
            {"name": "a", "role": "worker"},
            {"name": "b", "role": "admin"},
            "not-an-object",
            {"name": "c", "role": "worker"},
        ]);
        let filtered = filter_workers(response);
        let members = filtered.as_array().unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0]["name"], "a");
        assert_eq!(members[1]["name"], "c");
    }

    #[test]
    fn worker_filter_passes_non_lists_through() {
        let wrapped = json!({"members": [{"role": "admin"}]});
        assert_eq!(filter_workers(wrapped.clone()), wrapped);
    }
}
