#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use movie_rater::auth::{PasswordHasher, TokenService};
use movie_rater::config::AppConfig;
use movie_rater::database::MemoryStore;
use movie_rater::state::AppState;

pub const PASSWORD: &str = "secretpw";

/// The router over a fresh in-memory store, driven without a socket.
pub struct TestApp {
    pub router: Router,
    pub tokens: Arc<TokenService>,
}

pub fn test_app() -> TestApp {
    let config = AppConfig::development();
    let tokens = TokenService::from_config(&config.security).expect("development token settings");
    let state = AppState::new(Arc::new(MemoryStore::new()), tokens, PasswordHasher::new(4).expect("valid bcrypt cost"));
    TestApp {
        tokens: state.tokens.clone(),
        router: movie_rater::app(state),
    }
}

impl TestApp {
    pub async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<String>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body)),
            None => builder.body(Body::empty()),
        }
        .expect("valid request");

        let response = self.router.clone().oneshot(request).await.expect("infallible router");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("readable body");
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, body)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body.to_string())).await
    }

    /// Register `username` with `<username>@example.com` and return the session body.
    pub async fn register(&self, username: &str) -> Value {
        let (status, body) = self
            .post(
                "/register",
                None,
                json!({ "username": username, "email": email_of(username), "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "register {}: {}", username, body);
        body
    }

    pub async fn access_token(&self, username: &str) -> String {
        self.register(username).await["accessToken"]
            .as_str()
            .expect("accessToken")
            .to_string()
    }

    /// Add a movie and return its id.
    pub async fn add_movie(&self, token: &str, title: &str) -> i64 {
        let (status, body) = self.post("/movie", Some(token), json!({ "title": title })).await;
        assert_eq!(status, StatusCode::CREATED, "add movie: {}", body);

        let (_, movies) = self.get("/movies", Some(token)).await;
        movies
            .as_array()
            .and_then(|movies| movies.iter().rev().find(|m| m["title"] == title))
            .and_then(|m| m["id"].as_i64())
            .expect("movie listed after insert")
    }

    pub async fn movie(&self, token: &str, id: i64) -> Value {
        let (_, movies) = self.get("/movies", Some(token)).await;
        movies
            .as_array()
            .and_then(|movies| movies.iter().find(|m| m["id"] == id))
            .cloned()
            .expect("movie listed")
    }
}

pub fn email_of(username: &str) -> String {
    format!("{}@example.com", username)
}

pub fn error(message: &str) -> Value {
    json!({ "error": message })
}

static SERVER: OnceLock<TestServer> = OnceLock::new();

/// The real binary in `--memory` mode on a free port.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let child = Command::new(env!("CARGO_BIN_EXE_movie-rater"))
            .args(["--memory", "--port", &port.to_string()])
            .env("APP_ENV", "development")
            .env("BCRYPT_COST", "4")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = client.get(format!("{}/health", self.base_url)).send().await {
                if resp.status() == reqwest::StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}
