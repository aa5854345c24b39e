#![allow(dead_code)]

use std::sync::Arc;

use helpdesk::{api, db, http, Config};
use reqwest::{multipart, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::net;

pub const PASSWORD: &str = "password";

/// Starts the application over a fresh in-memory store on an ephemeral port
/// and returns its base URL.
pub async fn spawn_app() -> String {
    spawn_app_over(Arc::new(db::Memory::new())).await
}

/// Like [`spawn_app`], but over the given store.
pub async fn spawn_app_over(db: Arc<dyn db::Store>) -> String {
    let mut config = toml::from_str::<Config>(
        r#"
        [db]
        url = "memory:"

        [http.server]
        addr = "127.0.0.1:0"

        [http.cors]
        allowed_origins = ["http://localhost:5173"]

        [jwt]
        secret = "test secret"
        expiration_time = "10m"

        [auth]
        password_hash_cost = 4
        "#,
    )
    .expect("invalid test config");
    config.uploads.dir = std::env::temp_dir()
        .join(format!("helpdesk-uploads-{}", uuid::Uuid::new_v4()));

    let state = Arc::new(http::AppState::new(&config, db));
    let app = http::router(&config, state).expect("failed to build router");

    let listener = net::TcpListener::bind(config.http.server.addr)
        .await
        .expect("failed to bind");
    let addr = listener.local_addr().expect("failed to get local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server failed");
    });

    format!("http://{addr}")
}

pub struct Client {
    inner: reqwest::Client,
    base_url: String,
    pub auth_token: Option<String>,
}

impl Client {
    pub fn new(base_url: &str) -> Self {
        Self {
            inner: reqwest::Client::new(),
            base_url: base_url.to_owned(),
            auth_token: None,
        }
    }

    /// Registers a fresh account with `role` and logs it in.
    pub async fn signed_up(
        base_url: &str,
        first_name: &str,
        role: api::user::Role,
    ) -> (Self, api::User) {
        let mut client = Self::new(base_url);
        let email = format!(
            "{}.{}@example.com",
            first_name.to_lowercase(),
            uuid::Uuid::new_v4().simple(),
        );
        client
            .register(&json!({
                "firstName": first_name,
                "lastName": "Tester",
                "email": email,
                "password": PASSWORD,
                "role": role,
                "department": "IT",
            }))
            .await
            .expect("failed to register");
        let token = client
            .login(&email, PASSWORD)
            .await
            .expect("failed to log in");
        client.auth_token = Some(token.token);
        let me = client.me().await.expect("failed to fetch profile");
        (client, me)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut req =
            self.inner.request(method, format!("{}{path}", self.base_url));
        if let Some(token) = &self.auth_token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        req
    }

    async fn read<T: DeserializeOwned>(
        req: RequestBuilder,
    ) -> Result<T, StatusCode> {
        Ok(req
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?
            .json::<T>()
            .await
            .expect("failed to get a response"))
    }

    /// Status and raw JSON body, for comparing error answers.
    pub async fn raw(
        &self,
        method: Method,
        path: &str,
        body: &Value,
    ) -> (StatusCode, Value) {
        let res = self
            .request(method, path)
            .json(body)
            .send()
            .await
            .expect("failed to send a request");
        let status = res.status();
        let body = res.json::<Value>().await.expect("failed to get a response");
        (status, body)
    }

    pub async fn health(&self) -> Result<api::Health, StatusCode> {
        Self::read(self.request(Method::GET, "/health")).await
    }

    pub async fn register(
        &self,
        body: &Value,
    ) -> Result<api::auth::Registered, StatusCode> {
        Self::read(self.request(Method::POST, "/auth/register").json(body))
            .await
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<api::auth::Token, StatusCode> {
        Self::read(self.request(Method::POST, "/auth/login").json(&json!({
            "email": email,
            "password": password,
        })))
        .await
    }

    pub async fn me(&self) -> Result<api::User, StatusCode> {
        Self::read(self.request(Method::GET, "/auth/me")).await
    }

    pub async fn forgot_password(
        &self,
        email: &str,
    ) -> Result<api::auth::ResetRequested, StatusCode> {
        Self::read(
            self.request(Method::POST, "/auth/forgot-password")
                .json(&json!({ "email": email })),
        )
        .await
    }

    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<api::Message, StatusCode> {
        Self::read(self.request(Method::POST, "/auth/reset-password").json(
            &json!({
                "token": token,
                "newPassword": new_password,
            }),
        ))
        .await
    }

    pub async fn list_tickets(
        &self,
        query: &str,
    ) -> Result<Vec<api::Ticket>, StatusCode> {
        Self::read(self.request(Method::GET, &format!("/tickets?{query}")))
            .await
    }

    pub async fn create_ticket(
        &self,
        body: &Value,
    ) -> Result<api::Ticket, StatusCode> {
        Self::read(self.request(Method::POST, "/tickets").json(body)).await
    }

    pub async fn get_ticket(
        &self,
        id: api::ticket::Id,
    ) -> Result<api::ticket::Details, StatusCode> {
        Self::read(self.request(Method::GET, &format!("/tickets/{id}"))).await
    }

    pub async fn update_ticket(
        &self,
        id: api::ticket::Id,
        body: &Value,
    ) -> Result<api::Ticket, StatusCode> {
        Self::read(
            self.request(Method::PUT, &format!("/tickets/{id}")).json(body),
        )
        .await
    }

    pub async fn delete_ticket(
        &self,
        id: api::ticket::Id,
    ) -> Result<api::Message, StatusCode> {
        Self::read(self.request(Method::DELETE, &format!("/tickets/{id}")))
            .await
    }

    pub async fn add_comment(
        &self,
        id: api::ticket::Id,
        comment: &str,
        internal_only: bool,
    ) -> Result<api::ticket::Comment, StatusCode> {
        Self::read(
            self.request(Method::POST, &format!("/tickets/{id}/comments"))
                .json(&json!({
                    "comment": comment,
                    "internalOnly": internal_only,
                })),
        )
        .await
    }

    pub async fn add_attachment(
        &self,
        id: api::ticket::Id,
        file_name: &str,
        contents: &'static [u8],
    ) -> Result<api::ticket::Attachment, StatusCode> {
        let form = multipart::Form::new().part(
            "file",
            multipart::Part::bytes(contents).file_name(file_name.to_owned()),
        );
        Self::read(
            self.request(Method::POST, &format!("/tickets/{id}/attachments"))
                .multipart(form),
        )
        .await
    }

    /// Downloads a file served by the application.
    pub async fn download(&self, path: &str) -> Result<Vec<u8>, StatusCode> {
        Ok(self
            .request(Method::GET, path)
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?
            .bytes()
            .await
            .expect("failed to get a response")
            .to_vec())
    }

    pub async fn list_assets(
        &self,
        query: &str,
    ) -> Result<Vec<api::Asset>, StatusCode> {
        Self::read(self.request(Method::GET, &format!("/assets?{query}")))
            .await
    }

    pub async fn create_asset(
        &self,
        body: &Value,
    ) -> Result<api::Asset, StatusCode> {
        Self::read(self.request(Method::POST, "/assets").json(body)).await
    }

    pub async fn get_asset(
        &self,
        id: api::asset::Id,
    ) -> Result<api::asset::Details, StatusCode> {
        Self::read(self.request(Method::GET, &format!("/assets/{id}"))).await
    }

    pub async fn update_asset(
        &self,
        id: api::asset::Id,
        body: &Value,
    ) -> Result<api::Asset, StatusCode> {
        Self::read(
            self.request(Method::PUT, &format!("/assets/{id}")).json(body),
        )
        .await
    }

    pub async fn get_asset_history(
        &self,
        id: api::asset::Id,
    ) -> Result<Vec<api::asset::HistoryEntry>, StatusCode> {
        Self::read(
            self.request(Method::GET, &format!("/assets/{id}/history")),
        )
        .await
    }

    pub async fn stats_overview(
        &self,
    ) -> Result<api::stats::Overview, StatusCode> {
        Self::read(self.request(Method::GET, "/stats/overview")).await
    }

    pub async fn suggest_response(
        &self,
        ticket_description: &str,
        comments: &[&str],
    ) -> Result<api::Suggestion, StatusCode> {
        Self::read(self.request(Method::POST, "/ai/suggest-response").json(
            &json!({
                "ticketDescription": ticket_description,
                "comments": comments,
            }),
        ))
        .await
    }

    /// Opens the live events stream.
    pub async fn events(&self) -> Result<reqwest::Response, StatusCode> {
        self.request(Method::GET, "/events")
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))
    }
}
