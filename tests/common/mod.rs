//! Common test utilities for E2E tests

#![allow(dead_code)]

use dreams::{AppState, config};
use reqwest::{Method, StatusCode};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

/// A registered user
pub struct TestUser {
    pub token: String,
    pub id: u64,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        Self::with_persistence(false).await
    }

    /// Create a test server whose snapshot file lives in the temp directory
    pub async fn with_persistence(enabled: bool) -> Self {
        Self::start(enabled, true).await
    }

    /// Create a test server without the reset route, as deployed by default
    pub async fn without_clear() -> Self {
        Self::start(false, false).await
    }

    async fn start(persistence: bool, enable_clear: bool) -> Self {
        let temp_dir = TempDir::new().unwrap();

        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                public_url: "http://localhost:8080".to_string(),
                enable_clear,
            },
            auth: config::AuthConfig {
                session_secret: "test-secret-key-that-is-32-bytes-long".to_string(),
                session_max_age: 604800,
            },
            persistence: config::PersistenceConfig {
                enabled: persistence,
                path: temp_dir.path().join("dreams.json"),
                interval_seconds: 3600,
            },
            media: config::MediaConfig {
                directory: temp_dir.path().join("static"),
                max_bytes: 1024 * 1024,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = dreams::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Send a request with an optional bearer token and JSON body
    ///
    /// GET bodies are sent as query parameters.
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        let mut request = self.client.request(method.clone(), self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request = if method == Method::GET {
            let params: Vec<(String, String)> = body
                .as_object()
                .map(|object| {
                    object
                        .iter()
                        .map(|(key, value)| {
                            let value = match value {
                                Value::String(s) => s.clone(),
                                other => other.to_string(),
                            };
                            (key.clone(), value)
                        })
                        .collect()
                })
                .unwrap_or_default();
            request.query(&params)
        } else {
            request.json(&body)
        };

        let response = request.send().await.expect("request succeeds");
        let status = response.status();
        let body = response.json().await.unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn get(&self, path: &str, token: &str, query: Value) -> (StatusCode, Value) {
        self.call(Method::GET, path, Some(token), query).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, path, Some(token), body).await
    }

    pub async fn put(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::PUT, path, Some(token), body).await
    }

    pub async fn delete(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::DELETE, path, Some(token), body).await
    }

    /// Register a user named `first last` with email `{first}@example.com`
    pub async fn register(&self, first: &str, last: &str) -> TestUser {
        let (status, body) = self
            .call(
                Method::POST,
                "/auth/register/v2",
                None,
                json!({
                    "email": format!("{}@example.com", first.to_lowercase()),
                    "password": "password123",
                    "name_first": first,
                    "name_last": last,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "register failed: {body}");

        TestUser {
            token: body["token"].as_str().unwrap().to_string(),
            id: body["auth_user_id"].as_u64().unwrap(),
        }
    }

    /// Create a channel and return its id
    pub async fn create_channel(&self, owner: &TestUser, name: &str, is_public: bool) -> u64 {
        let (status, body) = self
            .post(
                "/channels/create/v2",
                &owner.token,
                json!({ "name": name, "is_public": is_public }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "channel create failed: {body}");
        body["channel_id"].as_u64().unwrap()
    }

    /// Send a channel message and return its id
    pub async fn send(&self, sender: &TestUser, channel_id: u64, message: &str) -> u64 {
        let (status, body) = self
            .post(
                "/message/send/v2",
                &sender.token,
                json!({ "channel_id": channel_id, "message": message }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "send failed: {body}");
        body["message_id"].as_u64().unwrap()
    }
}
