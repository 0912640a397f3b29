//! Supabase REST API Client
//!
//! HTTP client for the hosted backend: GoTrue for authentication and
//! PostgREST for table access.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::query::{Order, TableQuery};
use super::{AuthSession, Backend, BackendError, SignUpOutcome};
use crate::model::{
    Dashboard, DashboardId, NewDashboard, Permission, Profile, RoleId, RoleRecord, User,
};

/// Supabase REST client
pub struct SupabaseClient {
    client: Client,
    config: BackendConfig,
}

/// Connection settings for the hosted backend
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Project URL (e.g., "https://xyzcompany.supabase.co")
    #[serde(default)]
    pub url: String,

    /// Public anon key, sent as `apikey` on every request
    #[serde(default)]
    pub anon_key: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    #[serde(default)]
    pub tables: TableNames,
}

fn default_request_timeout() -> u64 {
    10_000
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            request_timeout_ms: default_request_timeout(),
            tables: TableNames::default(),
        }
    }
}

impl BackendConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            ..Default::default()
        }
    }
}

/// Names of the tables the portal reads and writes
#[derive(Debug, Clone, Deserialize)]
pub struct TableNames {
    #[serde(default = "default_dashboards_table")]
    pub dashboards: String,
    #[serde(default = "default_profiles_table")]
    pub profiles: String,
    #[serde(default = "default_roles_table")]
    pub roles: String,
    #[serde(default = "default_permissions_table")]
    pub permissions: String,
}

fn default_dashboards_table() -> String {
    "dashboards".to_string()
}

fn default_profiles_table() -> String {
    "usuarios".to_string()
}

fn default_roles_table() -> String {
    "user_roles".to_string()
}

fn default_permissions_table() -> String {
    "user_dashboard_permissions".to_string()
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            dashboards: default_dashboards_table(),
            profiles: default_profiles_table(),
            roles: default_roles_table(),
            permissions: default_permissions_table(),
        }
    }
}

impl SupabaseClient {
    /// Create a new client with the given configuration
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url(), path)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url(), table)
    }

    /// Request with `apikey` and bearer headers; the anon key stands in
    /// when there is no user token
    fn request(&self, method: Method, url: &str, token: Option<&str>) -> RequestBuilder {
        let bearer = token.unwrap_or(&self.config.anon_key);
        self.client
            .request(method, url)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(bearer)
    }

    /// Send a request, turning non-success responses into errors
    async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let response = request.send().await.map_err(BackendError::from_reqwest)?;

        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            Err(api_error(status, &text))
        }
    }

    async fn select<T: DeserializeOwned>(
        &self,
        token: &str,
        query: &TableQuery,
    ) -> Result<Vec<T>, BackendError> {
        tracing::debug!(table = query.table(), query = %query.query_string(), "select");

        let request = self
            .request(Method::GET, &self.rest_url(query.table()), Some(token))
            .query(query.params());

        let response = self.send(request).await?;
        response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn insert<B: Serialize + ?Sized>(
        &self,
        token: &str,
        query: &TableQuery,
        body: &B,
        prefer: &str,
    ) -> Result<Response, BackendError> {
        tracing::debug!(table = query.table(), "insert");

        let request = self
            .request(Method::POST, &self.rest_url(query.table()), Some(token))
            .query(query.params())
            .header("Prefer", prefer)
            .json(body);

        self.send(request).await
    }

    async fn delete(&self, token: &str, query: &TableQuery) -> Result<(), BackendError> {
        if !query.has_filter() {
            return Err(BackendError::UnfilteredDelete(query.table().to_string()));
        }

        tracing::debug!(table = query.table(), query = %query.query_string(), "delete");

        let request = self
            .request(Method::DELETE, &self.rest_url(query.table()), Some(token))
            .query(query.params())
            .header("Prefer", "return=minimal");

        self.send(request).await?;
        Ok(())
    }

    fn dashboards(&self) -> TableQuery {
        TableQuery::new(&self.config.tables.dashboards)
            .select("*")
            .order("created_at", Order::Desc)
            .order("id", Order::Desc)
    }

    fn permissions(&self) -> TableQuery {
        TableQuery::new(&self.config.tables.permissions).select("dashboard_id,user_id")
    }
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[async_trait]
impl Backend for SupabaseClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        let request = self
            .request(Method::POST, &self.auth_url("token"), None)
            .query(&[("grant_type", "password")])
            .json(&Credentials { email, password });

        let response = self.send(request).await?;
        response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, BackendError> {
        let request = self
            .request(Method::POST, &self.auth_url("signup"), None)
            .json(&Credentials { email, password });

        let response = self.send(request).await?;
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        parse_sign_up(body)
    }

    async fn sign_out(&self, token: &str) -> Result<(), BackendError> {
        let request = self.request(Method::POST, &self.auth_url("logout"), Some(token));
        self.send(request).await?;
        Ok(())
    }

    async fn current_user(&self, token: &str) -> Result<User, BackendError> {
        let request = self.request(Method::GET, &self.auth_url("user"), Some(token));
        let response = self.send(request).await?;
        response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn list_dashboards(&self, token: &str) -> Result<Vec<Dashboard>, BackendError> {
        self.select(token, &self.dashboards()).await
    }

    async fn dashboards_by_ids(
        &self,
        token: &str,
        ids: &[DashboardId],
    ) -> Result<Vec<Dashboard>, BackendError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.select(token, &self.dashboards().in_list("id", ids)).await
    }

    async fn insert_dashboard(
        &self,
        token: &str,
        dashboard: &NewDashboard,
    ) -> Result<Dashboard, BackendError> {
        let query = TableQuery::new(&self.config.tables.dashboards);
        let response = self
            .insert(token, &query, &[dashboard], "return=representation")
            .await?;

        let mut rows: Vec<Dashboard> = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        rows.pop()
            .ok_or_else(|| BackendError::Decode("insert returned no rows".to_string()))
    }

    async fn delete_dashboard(&self, token: &str, id: DashboardId) -> Result<(), BackendError> {
        let query = TableQuery::new(&self.config.tables.dashboards).eq("id", id);
        self.delete(token, &query).await
    }

    async fn profile(&self, token: &str, user_id: &str) -> Result<Option<Profile>, BackendError> {
        let query = TableQuery::new(&self.config.tables.profiles)
            .select("*")
            .eq("id", user_id)
            .limit(1);
        let mut rows: Vec<Profile> = self.select(token, &query).await?;
        Ok(rows.pop())
    }

    async fn ensure_profile(&self, token: &str, user: &User) -> Result<(), BackendError> {
        let profile = Profile {
            id: user.id.clone(),
            email: user.email.clone(),
            role_id: None,
        };
        let query = TableQuery::new(&self.config.tables.profiles).on_conflict("id");
        self.insert(
            token,
            &query,
            &[profile],
            "resolution=ignore-duplicates,return=minimal",
        )
        .await?;
        Ok(())
    }

    async fn list_profiles(&self, token: &str) -> Result<Vec<Profile>, BackendError> {
        let query = TableQuery::new(&self.config.tables.profiles).select("*");
        self.select(token, &query).await
    }

    async fn role(&self, token: &str, role_id: RoleId) -> Result<Option<RoleRecord>, BackendError> {
        let query = TableQuery::new(&self.config.tables.roles)
            .select("id,name")
            .eq("id", role_id)
            .limit(1);
        let mut rows: Vec<RoleRecord> = self.select(token, &query).await?;
        Ok(rows.pop())
    }

    async fn permissions_for_user(
        &self,
        token: &str,
        user_id: &str,
    ) -> Result<Vec<Permission>, BackendError> {
        self.select(token, &self.permissions().eq("user_id", user_id))
            .await
    }

    async fn list_permissions(&self, token: &str) -> Result<Vec<Permission>, BackendError> {
        self.select(token, &self.permissions()).await
    }

    async fn grant_permission(&self, token: &str, permission: &Permission) -> Result<(), BackendError> {
        let query =
            TableQuery::new(&self.config.tables.permissions).on_conflict("dashboard_id,user_id");
        self.insert(
            token,
            &query,
            &[permission],
            "resolution=ignore-duplicates,return=minimal",
        )
        .await?;
        Ok(())
    }

    async fn revoke_permission(&self, token: &str, permission: &Permission) -> Result<(), BackendError> {
        let query = TableQuery::new(&self.config.tables.permissions)
            .eq("dashboard_id", permission.dashboard_id)
            .eq("user_id", &permission.user_id);
        self.delete(token, &query).await
    }

    async fn revoke_dashboard_permissions(
        &self,
        token: &str,
        dashboard_id: DashboardId,
    ) -> Result<(), BackendError> {
        let query =
            TableQuery::new(&self.config.tables.permissions).eq("dashboard_id", dashboard_id);
        self.delete(token, &query).await
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        let request = self.request(Method::GET, &self.auth_url("health"), None);
        self.send(request).await?;
        Ok(())
    }
}

/// Sign-up answers with a session when the account is active, or with the
/// bare user when email confirmation is pending
fn parse_sign_up(body: serde_json::Value) -> Result<SignUpOutcome, BackendError> {
    let decode = |e: serde_json::Error| BackendError::Decode(e.to_string());

    if body.get("access_token").is_some() {
        let session: AuthSession = serde_json::from_value(body).map_err(decode)?;
        return Ok(SignUpOutcome::SignedIn(session));
    }

    let nested = body.get("user").filter(|u| u.is_object()).cloned();
    let user_value = nested.unwrap_or(body);
    let user: User = serde_json::from_value(user_value).map_err(decode)?;
    Ok(SignUpOutcome::ConfirmationRequired(user))
}

/// Map an error response from GoTrue or PostgREST
fn api_error(status: u16, body: &str) -> BackendError {
    if status == 401 {
        return BackendError::Unauthorized;
    }

    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["msg", "message", "error_description", "error"]
                .iter()
                .find_map(|key| v.get(*key).and_then(|m| m.as_str()).map(str::to_string))
        })
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("Backend returned status {}", status)
            } else {
                body.trim().to_string()
            }
        });

    BackendError::Api { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Query,
        http::{HeaderMap, StatusCode},
        routing::{get, post},
        Json, Router,
    };
    use serde_json::json;
    use std::collections::HashMap;

    async fn spawn_fake(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client_for(url: String) -> SupabaseClient {
        SupabaseClient::new(BackendConfig::new(url, "anon-key")).unwrap()
    }

    fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
        headers.get(name).and_then(|v| v.to_str().ok()).unwrap_or("")
    }

    #[test]
    fn test_default_config() {
        let config = BackendConfig::default();
        assert_eq!(config.request_timeout_ms, 10_000);
        assert_eq!(config.tables.dashboards, "dashboards");
        assert_eq!(config.tables.profiles, "usuarios");
        assert_eq!(config.tables.roles, "user_roles");
        assert_eq!(config.tables.permissions, "user_dashboard_permissions");
    }

    #[test]
    fn test_urls() {
        let client = client_for("https://demo.supabase.co/".to_string());
        assert_eq!(client.auth_url("token"), "https://demo.supabase.co/auth/v1/token");
        assert_eq!(
            client.rest_url("dashboards"),
            "https://demo.supabase.co/rest/v1/dashboards"
        );
    }

    #[test]
    fn test_api_error_messages() {
        let gotrue = api_error(
            400,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert_eq!(gotrue.to_string(), "Invalid login credentials");

        let newer = api_error(400, r#"{"code":400,"error_code":"x","msg":"Email not confirmed"}"#);
        assert_eq!(newer.to_string(), "Email not confirmed");

        let postgrest = api_error(
            409,
            r#"{"code":"23505","details":null,"hint":null,"message":"duplicate key"}"#,
        );
        assert_eq!(postgrest.status(), Some(409));
        assert_eq!(postgrest.to_string(), "duplicate key");

        assert!(matches!(api_error(401, ""), BackendError::Unauthorized));
        assert_eq!(api_error(502, "").to_string(), "Backend returned status 502");
        assert_eq!(api_error(500, "boom").to_string(), "boom");
    }

    #[test]
    fn test_parse_sign_up() {
        let pending = parse_sign_up(json!({"id": "u1", "email": "a@b.c", "aud": "authenticated"}))
            .unwrap();
        assert!(matches!(pending, SignUpOutcome::ConfirmationRequired(u) if u.id == "u1"));

        let active = parse_sign_up(json!({
            "access_token": "t",
            "refresh_token": "r",
            "expires_in": 3600,
            "user": {"id": "u2", "email": "x@y.z"}
        }))
        .unwrap();
        assert!(matches!(active, SignUpOutcome::SignedIn(s) if s.user.id == "u2"));

        let wrapped = parse_sign_up(json!({"user": {"id": "u3"}, "session": null})).unwrap();
        assert!(matches!(wrapped, SignUpOutcome::ConfirmationRequired(u) if u.id == "u3"));
    }

    #[tokio::test]
    async fn test_sign_in_round_trip() {
        let router = Router::new().route(
            "/auth/v1/token",
            post(
                |Query(q): Query<HashMap<String, String>>,
                 headers: HeaderMap,
                 Json(body): Json<serde_json::Value>| async move {
                    assert_eq!(q.get("grant_type").map(String::as_str), Some("password"));
                    assert_eq!(header(&headers, "apikey"), "anon-key");
                    if body["password"] == "secret" {
                        (
                            StatusCode::OK,
                            Json(json!({
                                "access_token": "jwt",
                                "token_type": "bearer",
                                "expires_in": 3600,
                                "refresh_token": "r",
                                "user": {"id": "u1", "email": body["email"]}
                            })),
                        )
                    } else {
                        (
                            StatusCode::BAD_REQUEST,
                            Json(json!({
                                "error": "invalid_grant",
                                "error_description": "Invalid login credentials"
                            })),
                        )
                    }
                },
            ),
        );
        let client = client_for(spawn_fake(router).await);

        let session = client.sign_in("ana@example.com", "secret").await.unwrap();
        assert_eq!(session.access_token, "jwt");
        assert_eq!(session.user.email.as_deref(), Some("ana@example.com"));

        let err = client.sign_in("ana@example.com", "wrong").await.unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.to_string(), "Invalid login credentials");
    }

    #[tokio::test]
    async fn test_table_requests_forward_user_token() {
        let router = Router::new()
            .route(
                "/rest/v1/dashboards",
                get(
                    |Query(q): Query<HashMap<String, String>>, headers: HeaderMap| async move {
                        assert_eq!(header(&headers, "authorization"), "Bearer user-jwt");
                        assert_eq!(q.get("order").map(String::as_str), Some("created_at.desc,id.desc"));
                        assert_eq!(q.get("id").map(String::as_str), Some("in.(1,2)"));
                        Json(json!([{
                            "id": 2,
                            "nome": "Vendas",
                            "descricao": null,
                            "link_power_bi": "https://app.powerbi.com/view?r=2",
                            "created_at": "2024-05-01T08:00:00+00:00"
                        }]))
                    },
                ),
            )
            .route(
                "/rest/v1/user_dashboard_permissions",
                post(
                    |Query(q): Query<HashMap<String, String>>,
                     headers: HeaderMap,
                     Json(body): Json<serde_json::Value>| async move {
                        assert_eq!(
                            q.get("on_conflict").map(String::as_str),
                            Some("dashboard_id,user_id")
                        );
                        assert!(header(&headers, "prefer").contains("ignore-duplicates"));
                        assert_eq!(body[0]["dashboard_id"], 2);
                        assert_eq!(body[0]["user_id"], "u1");
                        StatusCode::CREATED
                    },
                )
                .delete(|Query(q): Query<HashMap<String, String>>| async move {
                    assert_eq!(q.get("dashboard_id").map(String::as_str), Some("eq.2"));
                    assert_eq!(q.get("user_id").map(String::as_str), Some("eq.u1"));
                    StatusCode::NO_CONTENT
                }),
            );
        let client = client_for(spawn_fake(router).await);

        let rows = client.dashboards_by_ids("user-jwt", &[1, 2]).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Vendas");

        let grant = Permission::new(2, "u1");
        client.grant_permission("user-jwt", &grant).await.unwrap();
        client.revoke_permission("user-jwt", &grant).await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_token_is_unauthorized() {
        let router = Router::new().route(
            "/auth/v1/user",
            get(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({"msg": "invalid JWT"})),
                )
            }),
        );
        let client = client_for(spawn_fake(router).await);

        let err = client.current_user("stale").await.unwrap_err();
        assert!(matches!(err, BackendError::Unauthorized));
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        let client = client_for("http://127.0.0.1:1".to_string());
        let err = client.health_check().await.unwrap_err();
        assert!(matches!(err, BackendError::Unavailable | BackendError::Request(_)));
    }

    #[tokio::test]
    async fn test_ensure_profile_ignores_existing_row() {
        let router = Router::new().route(
            "/rest/v1/usuarios",
            post(
                |Query(q): Query<HashMap<String, String>>,
                 headers: HeaderMap,
                 Json(body): Json<serde_json::Value>| async move {
                    assert_eq!(q.get("on_conflict").map(String::as_str), Some("id"));
                    assert!(header(&headers, "prefer").contains("ignore-duplicates"));
                    assert_eq!(header(&headers, "authorization"), "Bearer user-jwt");
                    assert_eq!(body[0]["id"], "u9");
                    assert_eq!(body[0]["email"], "newbie@example.com");
                    assert!(body[0]["role_id"].is_null());
                    StatusCode::CREATED
                },
            ),
        );
        let client = client_for(spawn_fake(router).await);

        let user = User::new("u9", "newbie@example.com");
        client.ensure_profile("user-jwt", &user).await.unwrap();
    }

    #[tokio::test]
    async fn test_unfiltered_delete_is_refused() {
        let client = client_for("http://127.0.0.1:1".to_string());
        let query = TableQuery::new("user_dashboard_permissions");

        let err = client.delete("t", &query).await.unwrap_err();
        assert!(matches!(
            err,
            BackendError::UnfilteredDelete(ref table) if table == "user_dashboard_permissions"
        ));
    }

    #[tokio::test]
    async fn test_empty_id_list_skips_request() {
        let client = client_for("http://127.0.0.1:1".to_string());
        let rows = client.dashboards_by_ids("t", &[]).await.unwrap();
        assert!(rows.is_empty());
    }
}
